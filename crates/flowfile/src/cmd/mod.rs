use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod pack;
pub mod unpack;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a FlowFile from attributes and content.
    Pack(PackArgs),
    /// Read every FlowFile in a package and print it.
    Unpack(UnpackArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Pack(args) => pack::run(args),
        Command::Unpack(args) => unpack::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct PackArgs {
    /// Attribute to attach (repeatable).
    #[arg(long = "attr", short = 'a', value_name = "KEY=VALUE")]
    pub attrs: Vec<String>,
    /// Raw string content.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read content from file.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
    /// Write the package here instead of stdout.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
    /// Append to an existing package instead of replacing it.
    #[arg(long, requires = "output")]
    pub append: bool,
}

#[derive(Args, Debug)]
pub struct UnpackArgs {
    /// Package file to read, or `-` for stdin.
    pub input: PathBuf,
    /// Write each record's content into this directory.
    #[arg(long, value_name = "DIR")]
    pub extract: Option<PathBuf>,
    /// Reject records whose content is larger than this many bytes.
    #[arg(long, value_name = "BYTES")]
    pub max_content_size: Option<u64>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
