use std::{fs, path::PathBuf, process::ExitCode};

use clap::Parser;
use miette::{IntoDiagnostic, Report, Result};
use prost::Message;
use prost_types::FileDescriptorSet;

#[derive(Debug, Parser)]
pub struct Args {
    #[clap(value_name = "PROTO_FILES", required = true, value_parser)]
    files: Vec<PathBuf>,
    #[clap(
        short = 'o',
        long = "output",
        visible_alias = "descriptor_set_out",
        value_name = "PATH",
        value_parser
    )]
    output: Option<PathBuf>,
}

pub fn main() -> Result<ExitCode> {
    env_logger::init();
    miette::set_panic_hook();

    let args = Args::parse();

    let mut files = FileDescriptorSet::default();
    let mut failed = false;
    for path in &args.files {
        let parsed = protoparse::parse_file(path)?;
        match parsed.into_result() {
            Ok(descriptor) => files.file.push(descriptor),
            Err(err) => {
                eprintln!("{:?}", Report::new(err));
                failed = true;
            }
        }
    }

    if failed {
        return Ok(ExitCode::FAILURE);
    }

    if let Some(output) = args.output {
        fs::write(output, files.encode_to_vec()).into_diagnostic()?;
    }
    Ok(ExitCode::SUCCESS)
}
