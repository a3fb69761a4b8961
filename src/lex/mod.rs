
use std::{ascii, borrow::Cow, convert::TryInto, fmt, num::IntErrorKind};

use logos::{Lexer, Logos, Skip};

use crate::error::ParseErrorKind;

const BYTE_ORDER_MARK: char = '\u{feff}';

#[derive(Debug, Clone, Logos, PartialEq, Eq)]
#[logos(extras = TokenExtras)]
#[logos(skip r"([\t\n\v\f\r ]+|//[^\n]*)")]
#[logos(subpattern exponent = r"[eE][+\-]?[0-9]+")]
pub(crate) enum Token<'a> {
    #[regex("[A-Za-z_][A-Za-z0-9_]*")]
    Ident(&'a str),
    #[regex("0", |_| 0)]
    #[regex("0[0-7]+", |lex| int(lex, 8, 1))]
    #[regex("[1-9][0-9]*", |lex| int(lex, 10, 0))]
    #[regex("0[xX][0-9A-Fa-f]+", |lex| int(lex, 16, 2))]
    IntLiteral(u64),
    #[regex(r#"[0-9]+\.[0-9]*(?&exponent)?"#, float)]
    #[regex(r#"[0-9]+(?&exponent)"#, float)]
    #[regex(r#"\.[0-9]+(?&exponent)?"#, float)]
    FloatLiteral(EqFloat),
    #[regex(r#"'|""#, string)]
    StringLiteral(Cow<'a, [u8]>),
    #[token(".")]
    Dot,
    #[token("-")]
    Minus,
    #[token("+")]
    Plus,
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token("[")]
    LeftBracket,
    #[token("]")]
    RightBracket,
    #[token("<")]
    LeftAngleBracket,
    #[token(">")]
    RightAngleBracket,
    #[token(",")]
    Comma,
    #[token("=")]
    Equals,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token("/*", block_comment)]
    BlockComment,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct EqFloat(pub f64);

impl EqFloat {
    fn new(f: f64) -> Self {
        debug_assert!(!f.is_nan());
        EqFloat(f)
    }
}

impl Eq for EqFloat {}

impl<'a> Token<'a> {
    /// Creates a lexer over `source`, skipping a leading byte order mark.
    pub fn lexer_for(source: &'a str) -> Lexer<'a, Token<'a>> {
        let mut lexer = Token::lexer(source);
        if source.starts_with(BYTE_ORDER_MARK) {
            lexer.bump(BYTE_ORDER_MARK.len_utf8());
        }
        lexer
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(value) => write!(f, "{}", value),
            Token::IntLiteral(value) => write!(f, "{}", value),
            Token::FloatLiteral(value) => {
                if value.0.fract() == 0.0 {
                    write!(f, "{:.1}", value.0)
                } else {
                    write!(f, "{}", value.0)
                }
            }
            Token::StringLiteral(bytes) => {
                write!(f, "\"")?;
                for &ch in bytes.as_ref() {
                    write!(f, "{}", ascii::escape_default(ch))?;
                }
                write!(f, "\"")
            }
            Token::Dot => write!(f, "."),
            Token::Minus => write!(f, "-"),
            Token::Plus => write!(f, "+"),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::LeftBrace => write!(f, "{{"),
            Token::RightBrace => write!(f, "}}"),
            Token::LeftBracket => write!(f, "["),
            Token::RightBracket => write!(f, "]"),
            Token::LeftAngleBracket => write!(f, "<"),
            Token::RightAngleBracket => write!(f, ">"),
            Token::Comma => write!(f, ","),
            Token::Equals => write!(f, "="),
            Token::Colon => write!(f, ":"),
            Token::Semicolon => write!(f, ";"),
            Token::BlockComment => write!(f, "/*"),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct TokenExtras {
    pub errors: Vec<ParseErrorKind>,
}

fn int<'a>(lex: &mut Lexer<'a, Token<'a>>, radix: u32, prefix_len: usize) -> u64 {
    debug_assert!(lex.slice().len() > prefix_len);
    let span = lex.span().start + prefix_len..lex.span().end;

    if matches!(lex.remainder().chars().next(), Some(ch) if ch.is_ascii_alphabetic() || ch == '_') {
        let source = lex.source().as_bytes();
        let mut end = span.end + 1;
        while end < source.len() && (source[end].is_ascii_alphanumeric() || source[end] == b'_') {
            end += 1;
        }
        lex.extras
            .errors
            .push(ParseErrorKind::NoSpaceBetweenIntAndIdent {
                span: lex.span().start..end,
            });
    }

    match u64::from_str_radix(&lex.source()[span.clone()], radix) {
        Ok(value) => value,
        Err(err) => {
            debug_assert_eq!(err.kind(), &IntErrorKind::PosOverflow);
            lex.extras
                .errors
                .push(ParseErrorKind::IntegerOutOfRange { span: lex.span() });
            0
        }
    }
}

fn float<'a>(lex: &mut Lexer<'a, Token<'a>>) -> EqFloat {
    EqFloat::new(lex.slice().parse().expect("float literal should match the token regex"))
}

fn block_comment<'a>(lex: &mut Lexer<'a, Token<'a>>) -> Skip {
    match lex.remainder().find("*/") {
        Some(end) => lex.bump(end + 2),
        None => {
            lex.extras
                .errors
                .push(ParseErrorKind::UnterminatedBlockComment { span: lex.span() });
            lex.bump(lex.remainder().len());
        }
    }
    Skip
}

fn string<'a>(lex: &mut Lexer<'a, Token<'a>>) -> Cow<'a, [u8]> {
    #[derive(Logos)]
    #[logos(subpattern hex = r"[0-9A-Fa-f]")]
    enum Part<'a> {
        #[regex(r#"[^\x00\n\\'"]+"#)]
        Text(&'a str),
        #[regex(r#"['"]"#, |lex| lex.slice().as_bytes()[0])]
        Quote(u8),
        #[regex(r#"\\[xX](?&hex)(?&hex)?"#, hex_escape)]
        #[regex(r#"\\[0-7][0-7]?[0-7]?"#, oct_escape)]
        #[regex(r#"\\[abfnrtv?\\'"]"#, char_escape)]
        Byte(u8),
        #[regex(r#"\\u(?&hex)(?&hex)(?&hex)(?&hex)"#, unicode_escape)]
        #[regex(
            r#"\\U(?&hex)(?&hex)(?&hex)(?&hex)(?&hex)(?&hex)(?&hex)(?&hex)"#,
            unicode_escape
        )]
        Char(char),
    }

    fn hex_escape<'a>(lex: &mut Lexer<'a, Part<'a>>) -> Option<u8> {
        u8::from_str_radix(&lex.slice()[2..], 16).ok()
    }

    fn oct_escape<'a>(lex: &mut Lexer<'a, Part<'a>>) -> Option<u8> {
        u32::from_str_radix(&lex.slice()[1..], 8)
            .ok()
            .and_then(|value| value.try_into().ok())
    }

    fn char_escape<'a>(lex: &mut Lexer<'a, Part<'a>>) -> Option<u8> {
        match lex.slice().as_bytes()[1] {
            b'a' => Some(b'\x07'),
            b'b' => Some(b'\x08'),
            b'f' => Some(b'\x0c'),
            b'n' => Some(b'\n'),
            b'r' => Some(b'\r'),
            b't' => Some(b'\t'),
            b'v' => Some(b'\x0b'),
            ch @ (b'?' | b'\\' | b'\'' | b'"') => Some(ch),
            _ => None,
        }
    }

    fn unicode_escape<'a>(lex: &mut Lexer<'a, Part<'a>>) -> Option<char> {
        u32::from_str_radix(&lex.slice()[2..], 16)
            .ok()
            .and_then(char::from_u32)
    }

    let start = lex.span().start;
    let offset = lex.span().end;
    let terminator = lex.slice().as_bytes()[0];

    let mut result: Option<Cow<'a, [u8]>> = None;
    let mut parts = Part::lexer(lex.remainder());

    loop {
        match parts.next() {
            Some(Ok(Part::Text(s))) => match &mut result {
                Some(cow) => cow.to_mut().extend_from_slice(s.as_bytes()),
                None => result = Some(Cow::Borrowed(s.as_bytes())),
            },
            Some(Ok(Part::Quote(quote))) if quote == terminator => break,
            Some(Ok(Part::Quote(byte) | Part::Byte(byte))) => {
                result.get_or_insert_with(Cow::default).to_mut().push(byte)
            }
            Some(Ok(Part::Char(ch))) => {
                let mut buf = [0; 4];
                result
                    .get_or_insert_with(Cow::default)
                    .to_mut()
                    .extend_from_slice(ch.encode_utf8(&mut buf).as_bytes())
            }
            Some(Err(())) => {
                let span = offset + parts.span().start..offset + parts.span().end;
                if parts.slice().contains('\n') {
                    lex.extras
                        .errors
                        .push(ParseErrorKind::UnterminatedString {
                            span: start..span.start,
                        });
                    break;
                }

                match lex.extras.errors.last_mut() {
                    Some(
                        ParseErrorKind::InvalidStringCharacters { span: prev }
                        | ParseErrorKind::InvalidStringEscape { span: prev },
                    ) if prev.end == span.start => prev.end = span.end,
                    _ if parts.slice().starts_with('\\') => lex
                        .extras
                        .errors
                        .push(ParseErrorKind::InvalidStringEscape { span }),
                    _ => lex
                        .extras
                        .errors
                        .push(ParseErrorKind::InvalidStringCharacters { span }),
                }
            }
            None => {
                lex.extras
                    .errors
                    .push(ParseErrorKind::UnterminatedString {
                        span: start..offset + parts.span().end,
                    });
                break;
            }
        }
    }

    lex.bump(parts.span().end);
    result.unwrap_or_default()
}
