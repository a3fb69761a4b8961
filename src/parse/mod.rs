
use std::{fmt::Write, iter::once};

use log::trace;
use logos::{Lexer, Span};

use crate::{
    ast,
    error::ParseErrorKind,
    keyword::Keyword,
    lex::{EqFloat, Token},
};

/// Parses a source file into an AST.
///
/// Recoverable problems are returned alongside the AST. If the file cannot be parsed to the end,
/// for example because a message body is never closed, only the diagnostics are returned.
pub(crate) fn parse(
    source: &str,
) -> Result<(ast::File, Vec<ParseErrorKind>), Vec<ParseErrorKind>> {
    let mut parser = Parser::new(source);
    match parser.parse_file() {
        Ok(file) => Ok((file, parser.lexer.extras.errors)),
        Err(()) => Err(parser.lexer.extras.errors),
    }
}

struct Parser<'a> {
    lexer: Lexer<'a, Token<'a>>,
    peek: Option<(Token<'a>, Span)>,
    /// The number of enclosing bodies that have been opened but not yet closed.
    depth: usize,
    fatal: bool,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Parser {
            lexer: Token::lexer_for(source),
            peek: None,
            depth: 0,
            fatal: false,
        }
    }

    fn parse_file(&mut self) -> Result<ast::File, ()> {
        let mut file = ast::File::default();
        let mut first = true;

        loop {
            match self.peek() {
                Some((Token::Semicolon, _)) => {
                    self.bump();
                }
                Some((tok, _)) => {
                    let stray_brace = tok == Token::RightBrace;
                    if self.parse_statement(&mut file, first).is_err() {
                        if self.fatal {
                            return Err(());
                        }
                        // A `}` with no open body is reported by the failed statement above,
                        // so it can be skipped on its own.
                        if stray_brace {
                            self.bump();
                        } else {
                            self.recover();
                        }
                    }
                    first = false;
                }
                None => break,
            }
        }

        Ok(file)
    }

    fn parse_statement(&mut self, file: &mut ast::File, first: bool) -> Result<(), ()> {
        match self.peek_keyword() {
            Some(Keyword::Syntax) => {
                let (syntax, span) = self.parse_syntax()?;
                if let Some(existing) = &file.syntax_span {
                    self.add_error(ParseErrorKind::DuplicateSyntax {
                        first: existing.clone(),
                        second: span,
                    });
                } else if !first {
                    self.add_error(ParseErrorKind::SyntaxNotFirst { span });
                } else {
                    file.syntax_span = Some(span);
                    if let Some(syntax) = syntax {
                        file.syntax = syntax;
                    }
                }
            }
            Some(Keyword::Package) => {
                let package = self.parse_package()?;
                match &file.package {
                    Some(existing) => self.add_error(ParseErrorKind::DuplicatePackage {
                        first: existing.span.clone(),
                        second: package.span,
                    }),
                    None => file.package = Some(package),
                }
            }
            Some(Keyword::Import) => file.imports.push(self.parse_import()?),
            Some(Keyword::Option) => file.options.push(self.parse_option()?),
            Some(Keyword::Message) => file.messages.push(self.parse_message()?),
            Some(Keyword::Enum) => file.enums.push(self.parse_enum()?),
            Some(Keyword::Extend) => file.extends.push(self.parse_extend()?),
            Some(Keyword::Service) => file.services.push(self.parse_service()?),
            _ => self.unexpected_token(
                "'enum', 'extend', 'import', 'message', 'option', 'package', 'service', 'syntax' or ';'",
            )?,
        }

        Ok(())
    }

    fn parse_syntax(&mut self) -> Result<(Option<ast::Syntax>, Span), ()> {
        let start = self.expect_keyword(Keyword::Syntax)?;
        self.expect_eq(Token::Equals)?;

        let value = self.parse_string()?;
        let syntax = match value.value.as_slice() {
            b"proto2" => Some(ast::Syntax::Proto2),
            b"proto3" => Some(ast::Syntax::Proto3),
            _ => {
                self.add_error(ParseErrorKind::UnknownSyntax {
                    syntax: String::from_utf8_lossy(&value.value).into_owned(),
                    span: value.span,
                });
                None
            }
        };

        let end = self.expect_eq(Token::Semicolon)?;
        Ok((syntax, join_span(&start, &end)))
    }

    fn parse_package(&mut self) -> Result<ast::Package, ()> {
        let start = self.expect_keyword(Keyword::Package)?;

        let name = self.parse_full_ident(&[Token::Semicolon])?;

        let end = self.expect_eq(Token::Semicolon)?;

        Ok(ast::Package {
            name,
            span: join_span(&start, &end),
        })
    }

    fn parse_import(&mut self) -> Result<ast::Import, ()> {
        let start = self.expect_keyword(Keyword::Import)?;

        let kind = match self.peek_keyword() {
            Some(Keyword::Weak) => Some((ast::ImportKind::Weak, self.bump().1)),
            Some(Keyword::Public) => Some((ast::ImportKind::Public, self.bump().1)),
            _ => match self.peek() {
                Some((Token::StringLiteral(_), _)) => None,
                _ => self.unexpected_token("a string literal, 'public' or 'weak'")?,
            },
        };

        let (value, value_span) = self.parse_utf8_string()?;
        if !is_valid_import(&value) {
            self.add_error(ParseErrorKind::InvalidImport {
                span: value_span.clone(),
            });
        }

        let end = self.expect_eq(Token::Semicolon)?;

        Ok(ast::Import {
            kind,
            value,
            value_span,
            span: join_span(&start, &end),
        })
    }

    fn parse_message(&mut self) -> Result<ast::Message, ()> {
        let start = self.expect_keyword(Keyword::Message)?;

        let name = self.parse_ident()?;

        let (body, end) = self.parse_message_body()?;

        Ok(ast::Message {
            name,
            body,
            span: join_span(&start, &end),
        })
    }

    fn parse_message_body(&mut self) -> Result<(ast::MessageBody, Span), ()> {
        let mut body = ast::MessageBody::default();

        let end = self.parse_body("message", |parser| {
            match parser.peek_keyword() {
                Some(Keyword::Message) => body
                    .items
                    .push(ast::MessageItem::Message(parser.parse_message()?)),
                Some(Keyword::Enum) => body.items.push(ast::MessageItem::Enum(parser.parse_enum()?)),
                Some(Keyword::Oneof) => body
                    .items
                    .push(ast::MessageItem::Oneof(parser.parse_oneof()?)),
                Some(Keyword::Extend) => body
                    .items
                    .push(ast::MessageItem::Extend(parser.parse_extend()?)),
                Some(Keyword::Option) => body.options.push(parser.parse_option()?),
                Some(Keyword::Reserved) => body.reserved.push(parser.parse_reserved()?),
                Some(Keyword::Extensions) => body.extensions.push(parser.parse_extensions()?),
                _ => match parser.peek() {
                    Some((Token::Ident(_) | Token::Dot, _)) => body
                        .items
                        .push(ast::MessageItem::Field(parser.parse_field()?)),
                    _ => parser.unexpected_token(
                        "a message field, oneof, reserved range, enum, message, option or '}'",
                    )?,
                },
            }
            Ok(())
        })?;

        Ok((body, end))
    }

    fn parse_field(&mut self) -> Result<ast::Field, ()> {
        let label = match self.peek_keyword() {
            Some(Keyword::Optional) => Some((ast::FieldLabel::Optional, self.bump().1)),
            Some(Keyword::Required) => Some((ast::FieldLabel::Required, self.bump().1)),
            Some(Keyword::Repeated) => Some((ast::FieldLabel::Repeated, self.bump().1)),
            _ => None,
        };

        let kind = self.parse_field_kind()?;

        let name = self.parse_ident()?;

        self.expect_eq(Token::Equals)?;

        let number = self.parse_int()?;

        let options = match self.peek() {
            Some((Token::LeftBracket, _)) => Some(self.parse_options_list()?),
            _ => None,
        };

        let end = self.expect_eq(Token::Semicolon)?;

        let start = match (&label, &kind) {
            (Some((_, span)), _) => span.start,
            (None, ast::FieldKind::Normal { ty_span, .. }) => ty_span.start,
            (None, ast::FieldKind::Map { ty_span, .. }) => ty_span.start,
        };

        Ok(ast::Field {
            label,
            kind,
            name,
            number,
            options,
            span: start..end.end,
        })
    }

    fn parse_field_kind(&mut self) -> Result<ast::FieldKind, ()> {
        if self.peek_keyword() == Some(Keyword::Map) {
            let (_, start) = self.bump();
            self.expect_eq(Token::LeftAngleBracket)?;
            let (key_ty, key_ty_span) = self.parse_field_type(&[Token::Comma])?;
            self.expect_eq(Token::Comma)?;
            let (value_ty, value_ty_span) = self.parse_field_type(&[Token::RightAngleBracket])?;
            let end = self.expect_eq(Token::RightAngleBracket)?;

            Ok(ast::FieldKind::Map {
                key_ty,
                key_ty_span,
                value_ty,
                value_ty_span,
                ty_span: join_span(&start, &end),
            })
        } else {
            let (ty, ty_span) = self.parse_field_type(&[Token::Ident("")])?;
            Ok(ast::FieldKind::Normal { ty, ty_span })
        }
    }

    fn parse_field_type(&mut self, terminators: &[Token]) -> Result<(ast::Ty, Span), ()> {
        if let Some((Token::Ident(ident), span)) = self.peek() {
            if let Some(ty) = ast::Ty::from_scalar_name(ident) {
                self.bump();
                return Ok((ty, span));
            }
        }

        let name = self.parse_type_name(terminators)?;
        let span = name.span();
        Ok((ast::Ty::Named(name), span))
    }

    fn parse_oneof(&mut self) -> Result<ast::Oneof, ()> {
        let start = self.expect_keyword(Keyword::Oneof)?;

        let name = self.parse_ident()?;

        let mut options = Vec::new();
        let mut fields = Vec::new();
        let end = self.parse_body("oneof", |parser| {
            match parser.peek_keyword() {
                Some(Keyword::Option) => options.push(parser.parse_option()?),
                _ => match parser.peek() {
                    Some((Token::Ident(_) | Token::Dot, _)) => fields.push(parser.parse_field()?),
                    _ => parser.unexpected_token("a oneof field, option or '}'")?,
                },
            }
            Ok(())
        })?;

        Ok(ast::Oneof {
            name,
            options,
            fields,
            span: join_span(&start, &end),
        })
    }

    fn parse_extend(&mut self) -> Result<ast::Extend, ()> {
        let start = self.expect_keyword(Keyword::Extend)?;

        let extendee = self.parse_type_name(&[Token::LeftBrace])?;

        let mut fields = Vec::new();
        let end = self.parse_body("extend", |parser| {
            match parser.peek() {
                Some((Token::Ident(_) | Token::Dot, _)) => fields.push(parser.parse_field()?),
                _ => parser.unexpected_token("a field or '}'")?,
            }
            Ok(())
        })?;

        Ok(ast::Extend {
            extendee,
            fields,
            span: join_span(&start, &end),
        })
    }

    fn parse_service(&mut self) -> Result<ast::Service, ()> {
        let start = self.expect_keyword(Keyword::Service)?;

        let name = self.parse_ident()?;

        let mut options = Vec::new();
        let mut methods = Vec::new();
        let end = self.parse_body("service", |parser| {
            match parser.peek_keyword() {
                Some(Keyword::Option) => options.push(parser.parse_option()?),
                Some(Keyword::Rpc) => methods.push(parser.parse_method()?),
                _ => parser.unexpected_token("'rpc', 'option' or '}'")?,
            }
            Ok(())
        })?;

        Ok(ast::Service {
            name,
            options,
            methods,
            span: join_span(&start, &end),
        })
    }

    fn parse_method(&mut self) -> Result<ast::Method, ()> {
        let start = self.expect_keyword(Keyword::Rpc)?;

        let name = self.parse_ident()?;

        self.expect_eq(Token::LeftParen)?;
        let client_streaming = self.bump_if_keyword(Keyword::Stream);
        let input_ty = self.parse_type_name(&[Token::RightParen])?;
        self.expect_eq(Token::RightParen)?;

        self.expect_keyword(Keyword::Returns)?;

        self.expect_eq(Token::LeftParen)?;
        let server_streaming = self.bump_if_keyword(Keyword::Stream);
        let output_ty = self.parse_type_name(&[Token::RightParen])?;
        self.expect_eq(Token::RightParen)?;

        let mut options = Vec::new();
        let end = match self.peek() {
            Some((Token::Semicolon, span)) => {
                self.bump();
                span
            }
            Some((Token::LeftBrace, _)) => self.parse_body("method", |parser| {
                match parser.peek_keyword() {
                    Some(Keyword::Option) => options.push(parser.parse_option()?),
                    _ => parser.unexpected_token("'option' or '}'")?,
                }
                Ok(())
            })?,
            _ => self.unexpected_token("';' or '{'")?,
        };

        Ok(ast::Method {
            name,
            input_ty,
            output_ty,
            options,
            client_streaming,
            server_streaming,
            span: join_span(&start, &end),
        })
    }

    fn parse_enum(&mut self) -> Result<ast::Enum, ()> {
        let start = self.expect_keyword(Keyword::Enum)?;

        let name = self.parse_ident()?;

        let mut options = Vec::new();
        let mut values = Vec::new();
        let mut reserved = Vec::new();
        let end = self.parse_body("enum", |parser| {
            match parser.peek_keyword() {
                Some(Keyword::Option) => options.push(parser.parse_option()?),
                Some(Keyword::Reserved) => reserved.push(parser.parse_reserved()?),
                _ => match parser.peek() {
                    Some((Token::Ident(_), _)) => values.push(parser.parse_enum_value()?),
                    _ => parser.unexpected_token("an enum value, reserved range, option or '}'")?,
                },
            }
            Ok(())
        })?;

        Ok(ast::Enum {
            name,
            options,
            values,
            reserved,
            span: join_span(&start, &end),
        })
    }

    fn parse_enum_value(&mut self) -> Result<ast::EnumValue, ()> {
        let name = self.parse_ident()?;

        self.expect_eq(Token::Equals)?;

        let number = self.parse_int()?;

        let options = match self.peek() {
            Some((Token::LeftBracket, _)) => Some(self.parse_options_list()?),
            _ => None,
        };

        let end = self.expect_eq(Token::Semicolon)?;

        Ok(ast::EnumValue {
            span: name.span.start..end.end,
            name,
            number,
            options,
        })
    }

    fn parse_reserved(&mut self) -> Result<ast::Reserved, ()> {
        let start = self.expect_keyword(Keyword::Reserved)?;

        let kind = match self.peek() {
            Some((Token::IntLiteral(_) | Token::Minus, _)) => {
                ast::ReservedKind::Ranges(self.parse_ranges()?)
            }
            Some((Token::StringLiteral(_) | Token::Ident(_), _)) => {
                ast::ReservedKind::Names(self.parse_reserved_names()?)
            }
            _ => self.unexpected_token("a positive integer or string")?,
        };

        let end = self.expect_eq(Token::Semicolon)?;

        Ok(ast::Reserved {
            kind,
            span: join_span(&start, &end),
        })
    }

    fn parse_extensions(&mut self) -> Result<ast::Extensions, ()> {
        let start = self.expect_keyword(Keyword::Extensions)?;

        let ranges = self.parse_ranges()?;

        let options = match self.peek() {
            Some((Token::LeftBracket, _)) => Some(self.parse_options_list()?),
            _ => None,
        };

        let end = self.expect_eq(Token::Semicolon)?;

        Ok(ast::Extensions {
            ranges,
            options,
            span: join_span(&start, &end),
        })
    }

    fn parse_reserved_names(&mut self) -> Result<Vec<ast::Ident>, ()> {
        let mut names = vec![self.parse_reserved_name()?];
        while self.bump_if_eq(Token::Comma) {
            names.push(self.parse_reserved_name()?);
        }
        Ok(names)
    }

    fn parse_reserved_name(&mut self) -> Result<ast::Ident, ()> {
        match self.peek() {
            Some((Token::Ident(_), _)) => self.parse_ident(),
            _ => {
                let (value, span) = self.parse_utf8_string()?;
                Ok(ast::Ident::new(value, span))
            }
        }
    }

    fn parse_ranges(&mut self) -> Result<Vec<ast::ReservedRange>, ()> {
        let mut ranges = vec![self.parse_range()?];
        while self.bump_if_eq(Token::Comma) {
            ranges.push(self.parse_range()?);
        }
        Ok(ranges)
    }

    fn parse_range(&mut self) -> Result<ast::ReservedRange, ()> {
        let start = self.parse_int()?;

        let end = if self.bump_if_keyword(Keyword::To).is_some() {
            match self.bump_if_keyword(Keyword::Max) {
                Some(span) => ast::ReservedRangeEnd::Max(span),
                None => match self.peek() {
                    Some((Token::IntLiteral(_) | Token::Minus, _)) => {
                        ast::ReservedRangeEnd::Int(self.parse_int()?)
                    }
                    _ => self.unexpected_token("an integer or 'max'")?,
                },
            }
        } else {
            ast::ReservedRangeEnd::None
        };

        Ok(ast::ReservedRange { start, end })
    }

    fn parse_options_list(&mut self) -> Result<ast::OptionList, ()> {
        let start = self.expect_eq(Token::LeftBracket)?;

        let mut options = vec![self.parse_option_body()?];
        let end = loop {
            match self.peek() {
                Some((Token::Comma, _)) => {
                    self.bump();
                    options.push(self.parse_option_body()?);
                }
                Some((Token::RightBracket, span)) => {
                    self.bump();
                    break span;
                }
                _ => self.unexpected_token("',' or ']'")?,
            }
        };

        Ok(ast::OptionList {
            options,
            span: join_span(&start, &end),
        })
    }

    fn parse_option(&mut self) -> Result<ast::Option, ()> {
        let start = self.expect_keyword(Keyword::Option)?;

        let body = self.parse_option_body()?;

        let end = self.expect_eq(Token::Semicolon)?;

        Ok(ast::Option {
            body,
            span: join_span(&start, &end),
        })
    }

    fn parse_option_body(&mut self) -> Result<ast::OptionBody, ()> {
        let mut name = vec![self.parse_option_name_part()?];
        loop {
            match self.peek() {
                Some((Token::Dot, _)) => {
                    self.bump();
                    name.push(self.parse_option_name_part()?);
                }
                Some((Token::Equals, _)) => {
                    self.bump();
                    break;
                }
                _ => self.unexpected_token("'.' or '='")?,
            }
        }

        let value = self.parse_option_value()?;

        Ok(ast::OptionBody { name, value })
    }

    fn parse_option_name_part(&mut self) -> Result<ast::OptionNamePart, ()> {
        match self.peek() {
            Some((Token::LeftParen, start)) => {
                self.bump();
                let name = self.parse_type_name(&[Token::RightParen])?;
                let end = self.expect_eq(Token::RightParen)?;
                Ok(ast::OptionNamePart::Extension(name, join_span(&start, &end)))
            }
            Some((Token::Ident(_), _)) => Ok(ast::OptionNamePart::Ident(self.parse_ident()?)),
            _ => self.unexpected_token("an identifier or '('"),
        }
    }

    fn parse_option_value(&mut self) -> Result<ast::OptionValue, ()> {
        match self.peek() {
            Some((Token::Ident(value), span)) => {
                self.bump();
                Ok(ast::OptionValue::Ident {
                    negative: false,
                    ident: ast::Ident::new(value, span.clone()),
                    span,
                })
            }
            Some((Token::Plus, _)) => {
                self.bump();
                self.parse_signed_value(None)
            }
            Some((Token::Minus, span)) => {
                self.bump();
                self.parse_signed_value(Some(span))
            }
            Some((Token::IntLiteral(_) | Token::FloatLiteral(_), _)) => {
                self.parse_signed_value(None)
            }
            Some((Token::StringLiteral(_), _)) => Ok(ast::OptionValue::String(self.parse_string()?)),
            Some((Token::LeftBrace, _)) => self.parse_aggregate(),
            _ => self.unexpected_token("a constant"),
        }
    }

    fn parse_signed_value(&mut self, minus: Option<Span>) -> Result<ast::OptionValue, ()> {
        let negative = minus.is_some();
        let (tok, span) = match self.peek() {
            Some((tok @ (Token::IntLiteral(_) | Token::FloatLiteral(_) | Token::Ident(_)), span)) => {
                self.bump();
                (tok, span)
            }
            _ => self.unexpected_token("a numeric literal")?,
        };
        let full_span = match &minus {
            Some(minus) => minus.start..span.end,
            None => span.clone(),
        };

        Ok(match tok {
            Token::IntLiteral(value) => ast::OptionValue::Int(ast::Int {
                negative,
                value,
                span: full_span,
            }),
            Token::FloatLiteral(EqFloat(value)) => ast::OptionValue::Float(ast::Float {
                value: if negative { -value } else { value },
                span: full_span,
            }),
            Token::Ident(value) => {
                if negative && value != "inf" && value != "nan" {
                    self.add_error(ParseErrorKind::NegativeIdent {
                        span: full_span.clone(),
                    });
                }
                ast::OptionValue::Ident {
                    negative,
                    ident: ast::Ident::new(value, span),
                    span: full_span,
                }
            }
            _ => unreachable!(),
        })
    }

    fn parse_aggregate(&mut self) -> Result<ast::OptionValue, ()> {
        let start = self.expect_eq(Token::LeftBrace)?;

        let mut depth = 1usize;
        let end = loop {
            match self.peek() {
                Some((Token::LeftBrace, _)) => depth += 1,
                Some((Token::RightBrace, span)) => {
                    depth -= 1;
                    if depth == 0 {
                        self.bump();
                        break span;
                    }
                }
                Some(_) => {}
                None => self.unexpected_token("'}'")?,
            }
            self.bump();
        };

        let text = self.lexer.source()[start.end..end.start].trim().to_owned();
        Ok(ast::OptionValue::Aggregate(text, join_span(&start, &end)))
    }

    fn parse_type_name(&mut self, terminators: &[Token]) -> Result<ast::TypeName, ()> {
        let leading_dot = match self.peek() {
            Some((Token::Dot, span)) => {
                self.bump();
                Some(span)
            }
            Some((Token::Ident(_), _)) => None,
            _ => self.unexpected_token("a type name")?,
        };

        let name = self.parse_full_ident(terminators)?;

        Ok(ast::TypeName { leading_dot, name })
    }

    fn parse_full_ident(&mut self, terminators: &[Token]) -> Result<ast::FullIdent, ()> {
        let mut parts = vec![self.parse_ident()?];

        loop {
            match self.peek() {
                Some((Token::Dot, _)) => {
                    self.bump();
                }
                Some((tok, _)) if is_terminator(&tok, terminators) => {
                    return Ok(ast::FullIdent { parts });
                }
                _ => self.unexpected_token(fmt_expected(
                    once(&Token::Dot).chain(terminators.iter()),
                ))?,
            }

            parts.push(self.parse_ident()?);
        }
    }

    fn parse_ident(&mut self) -> Result<ast::Ident, ()> {
        match self.peek() {
            Some((Token::Ident(value), span)) => {
                self.bump();
                Ok(ast::Ident::new(value, span))
            }
            _ => self.unexpected_token("an identifier"),
        }
    }

    fn parse_int(&mut self) -> Result<ast::Int, ()> {
        let minus = match self.peek() {
            Some((Token::Minus, span)) => {
                self.bump();
                Some(span)
            }
            _ => None,
        };

        match self.peek() {
            Some((Token::IntLiteral(value), span)) => {
                self.bump();
                Ok(ast::Int {
                    negative: minus.is_some(),
                    value,
                    span: match minus {
                        Some(minus) => minus.start..span.end,
                        None => span,
                    },
                })
            }
            _ => self.unexpected_token("an integer"),
        }
    }

    fn parse_string(&mut self) -> Result<ast::String, ()> {
        let (mut value, mut span) = match self.peek() {
            Some((Token::StringLiteral(value), span)) => {
                self.bump();
                (value.into_owned(), span)
            }
            _ => self.unexpected_token("a string literal")?,
        };

        while let Some((Token::StringLiteral(next), next_span)) = self.peek() {
            self.bump();
            value.extend_from_slice(&next);
            span.end = next_span.end;
        }

        Ok(ast::String { value, span })
    }

    fn parse_utf8_string(&mut self) -> Result<(String, Span), ()> {
        let string = self.parse_string()?;
        match String::from_utf8(string.value) {
            Ok(value) => Ok((value, string.span)),
            Err(err) => {
                self.add_error(ParseErrorKind::InvalidUtf8String {
                    span: string.span.clone(),
                });
                Ok((
                    String::from_utf8_lossy(err.as_bytes()).into_owned(),
                    string.span,
                ))
            }
        }
    }

    /// Parses the members of a `{ ... }` block, returning the span of the closing brace.
    ///
    /// Members which fail to parse are skipped. Reaching the end of the file before the closing
    /// brace is fatal.
    fn parse_body(
        &mut self,
        kind: &'static str,
        mut parse_member: impl FnMut(&mut Self) -> Result<(), ()>,
    ) -> Result<Span, ()> {
        let start = self.expect_eq(Token::LeftBrace)?;
        self.depth += 1;

        loop {
            match self.peek() {
                Some((Token::RightBrace, end)) => {
                    self.bump();
                    self.depth -= 1;
                    return Ok(end);
                }
                Some((Token::Semicolon, _)) => {
                    self.bump();
                }
                Some(_) => {
                    if parse_member(self).is_err() {
                        if self.fatal {
                            return Err(());
                        }
                        self.recover();
                    }
                }
                None => {
                    self.add_error(ParseErrorKind::UnterminatedBody { kind, span: start });
                    self.fatal = true;
                    return Err(());
                }
            }
        }
    }

    /// Skips to the end of the current statement: past the next `;`, past a balanced `{ ... }`
    /// block, or up to the `}` closing the enclosing body.
    fn recover(&mut self) {
        if let Some((_, span)) = self.peek() {
            trace!("skipping to end of statement from offset {}", span.start);
        }

        let mut depth = 0usize;
        loop {
            match self.peek() {
                Some((Token::Semicolon, _)) if depth == 0 => {
                    self.bump();
                    return;
                }
                Some((Token::RightBrace, _)) if depth == 0 => return,
                Some((Token::RightBrace, _)) => {
                    self.bump();
                    depth -= 1;
                    if depth == 0 {
                        return;
                    }
                }
                Some((Token::LeftBrace, _)) => {
                    self.bump();
                    depth += 1;
                }
                Some(_) => {
                    self.bump();
                }
                None => return,
            }
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<Span, ()> {
        match self.bump_if_keyword(keyword) {
            Some(span) => Ok(span),
            None => self.unexpected_token(format!("'{}'", keyword)),
        }
    }

    fn bump_if_keyword(&mut self, keyword: Keyword) -> Option<Span> {
        match self.peek() {
            Some((Token::Ident(ident), span)) if ident == keyword.as_str() => {
                self.bump();
                Some(span)
            }
            _ => None,
        }
    }

    fn peek_keyword(&mut self) -> Option<Keyword> {
        match self.peek() {
            Some((Token::Ident(ident), _)) => Keyword::lookup(ident),
            _ => None,
        }
    }

    fn expect_eq(&mut self, t: Token) -> Result<Span, ()> {
        match self.peek() {
            Some((tok, span)) if tok == t => {
                self.bump();
                Ok(span)
            }
            _ => self.unexpected_token(format!("'{}'", t)),
        }
    }

    fn bump_if_eq(&mut self, t: Token) -> bool {
        match self.peek() {
            Some((tok, _)) if tok == t => {
                self.bump();
                true
            }
            _ => false,
        }
    }

    fn bump(&mut self) -> (Token<'a>, Span) {
        self.peek
            .take()
            .expect("called bump without peek returning Some()")
    }

    fn peek(&mut self) -> Option<(Token<'a>, Span)> {
        if self.peek.is_none() {
            self.peek = self.next();
        }
        self.peek.clone()
    }

    fn next(&mut self) -> Option<(Token<'a>, Span)> {
        loop {
            match self.lexer.next() {
                Some(Ok(tok)) => return Some((tok, self.lexer.span())),
                Some(Err(())) => self.add_error(ParseErrorKind::InvalidToken {
                    token: self.lexer.slice().to_owned(),
                    span: self.lexer.span(),
                }),
                None => return None,
            }
        }
    }

    fn unexpected_token<T>(&mut self, expected: impl ToString) -> Result<T, ()> {
        match self.peek() {
            Some((found, span)) => self.add_error(ParseErrorKind::UnexpectedToken {
                expected: expected.to_string(),
                found: found.to_string(),
                span,
            }),
            // Inside a body the missing closing brace is reported instead.
            None if self.depth > 0 => (),
            None => {
                let len = self.lexer.source().len();
                self.add_error(ParseErrorKind::UnexpectedEof {
                    expected: expected.to_string(),
                    span: len..len,
                })
            }
        }
        Err(())
    }

    fn add_error(&mut self, err: ParseErrorKind) {
        self.lexer.extras.errors.push(err);
    }
}

fn join_span(start: &Span, end: &Span) -> Span {
    start.start..end.end
}

fn is_terminator(tok: &Token, terminators: &[Token]) -> bool {
    terminators.iter().any(|t| match (t, tok) {
        (Token::Ident(_), Token::Ident(_)) => true,
        _ => t == tok,
    })
}

fn fmt_expected<'t, 'b: 't>(ts: impl Iterator<Item = &'t Token<'b>>) -> String {
    fn fmt_token(s: &mut String, t: &Token) {
        if let Token::Ident(_) = t {
            s.push_str("an identifier");
        } else {
            let _ = write!(s, "'{}'", t);
        }
    }

    let ts: Vec<_> = ts.collect();

    let mut s = String::with_capacity(32);
    fmt_token(&mut s, ts[0]);
    if ts.len() > 1 {
        for t in &ts[1..ts.len() - 1] {
            s.push_str(", ");
            fmt_token(&mut s, t);
        }
        s.push_str(" or ");
        fmt_token(&mut s, ts[ts.len() - 1]);
    }
    s
}

fn is_valid_import(path: &str) -> bool {
    !path.is_empty()
        && !path.contains('\\')
        && !path.starts_with('/')
        && path
            .split('/')
            .all(|part| !part.is_empty() && part != "." && part != "..")
}
