use clap::{Args, Subcommand};
use std::path::PathBuf;

use evstream_session::DEFAULT_MAX_CHUNK_SIZE;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod stream;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Frame a raw audio file as AudioEvent messages.
    Encode(EncodeArgs),
    /// Validate and print the messages in a framed file.
    Decode(DecodeArgs),
    /// Stream an audio file to a peer over a Unix socket and print its results.
    Stream(StreamArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Stream(args) => stream::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Raw audio file to frame.
    #[arg(long, short = 'i')]
    pub input: PathBuf,
    /// Write frames here instead of stdout.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
    /// Largest audio payload per message, in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_CHUNK_SIZE)]
    pub chunk_size: usize,
    /// Do not append the empty end-of-stream message.
    #[arg(long)]
    pub no_end_stream: bool,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// File of concatenated messages ("-" for stdin).
    pub path: PathBuf,
    /// Print classified session events instead of raw messages.
    #[arg(long)]
    pub events: bool,
}

#[derive(Args, Debug)]
pub struct StreamArgs {
    /// Socket path to connect to.
    pub path: PathBuf,
    /// Raw audio file to send.
    #[arg(long, short = 'i')]
    pub input: PathBuf,
    /// Largest audio payload per message, in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_CHUNK_SIZE)]
    pub chunk_size: usize,
    /// Give up when the peer is silent this long (e.g. 30s, 500ms).
    #[arg(long)]
    pub timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn check_chunk_size(chunk_size: usize) -> CliResult<usize> {
    if chunk_size == 0 {
        return Err(CliError::new(USAGE, "--chunk-size must be at least 1"));
    }
    Ok(chunk_size)
}

pub(crate) fn read_input(path: &std::path::Path) -> CliResult<Vec<u8>> {
    std::fs::read(path)
        .map_err(|err| crate::exit::io_error(&format!("read {} failed", path.display()), err))
}
