use std::path::PathBuf;

use ambix::structs::info::FileFormat;
use clap::{Args, Parser as ClapParser, Subcommand, ValueEnum};

#[derive(Debug, ClapParser)]
#[command(
    name         = env!("CARGO_PKG_NAME"),
    version      = env!("CARGO_PKG_VERSION"),
    long_version = concat!(
        env!("CARGO_PKG_VERSION"),
        "\nambix library ", env!("AMBIX_VERSION"),
        "\nbuilt ", env!("BUILD_TIMESTAMP"),
    ),
    author       = env!("CARGO_PKG_AUTHORS"),
    about        = "Tools for inspecting, interleaving and decoding ambix ambisonics files",
    long_about   = None,
)]
pub struct Cli {
    /// Set the log level
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    /// Treat warnings as fatal errors (fail on first warning).
    #[arg(long, global = true)]
    pub strict: bool,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Show progress bars during operations.
    #[arg(long, global = true)]
    pub progress: bool,

    /// Choose an operation to perform.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print file information and the adaptor matrix
    Info(InfoArgs),

    /// Merge several audio files into a single ambix file.
    Interleave(InterleaveArgs),

    /// Reconstruct the full ambisonics set into a plain audio file.
    Decode(DecodeArgs),
}

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Input ambix file.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Presentation to report (default: as stored).
    #[arg(long, value_enum)]
    pub format: Option<Presentation>,

    /// Leading ambisonics channels of a file without adaptor matrix.
    #[arg(long, value_name = "CHANNELS")]
    pub ambi_channels: Option<u32>,

    /// Print a YAML report instead of text.
    #[arg(long)]
    pub yaml: bool,
}

#[derive(Debug, Args)]
pub struct InterleaveArgs {
    /// Output ambix file.
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output: PathBuf,

    /// Force the ambisonics order; remaining channels become extra channels.
    #[arg(short = 'O', long)]
    pub order: Option<u32>,

    /// Adaptor matrix file (.yaml, or CAF with channels as rows).
    #[arg(short = 'X', long, value_name = "FILE", conflicts_with = "fuma")]
    pub matrix: Option<PathBuf>,

    /// Inputs are Furse-Malham B-format; store them with a conversion matrix.
    #[arg(long)]
    pub fuma: bool,

    /// Frames copied per block.
    #[arg(short = 'b', long, default_value_t = 1024)]
    pub blocksize: usize,

    /// Input CAF files; channel 0 of the first file becomes W.
    #[arg(value_name = "INPUT", required = true)]
    pub inputs: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct DecodeArgs {
    /// Input ambix file.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output path; the extension follows the output format.
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output: PathBuf,

    /// Matrix applied to the reconstructed full set (.yaml or CAF).
    #[arg(long, value_name = "FILE", conflicts_with = "fuma")]
    pub premultiply: Option<PathBuf>,

    /// Convert the full set to Furse-Malham B-format.
    #[arg(long)]
    pub fuma: bool,

    /// Leading ambisonics channels of a file without adaptor matrix.
    #[arg(long, value_name = "CHANNELS")]
    pub ambi_channels: Option<u32>,

    /// Audio format for output.
    #[arg(long, value_enum, default_value_t = OutputFormat::Caf)]
    pub format: OutputFormat,

    /// Frames decoded per block.
    #[arg(short = 'b', long, default_value_t = 1024)]
    pub blocksize: usize,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    /// Disable logging output.
    Off,
    /// No output except errors.
    Error,
    /// Show warnings and errors.
    Warn,
    /// Show info, warnings and errors (default).
    Info,
    /// Show debug, info, warnings and errors.
    Debug,
    /// Show all log messages including trace.
    Trace,
}

impl LogLevel {
    /// Convert LogLevel to log::LevelFilter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Colorized human-readable text.
    Plain,
    /// Structured JSON per log record.
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum Presentation {
    /// Full ambisonics set, reconstructed if necessary.
    Basic,
    /// Channels as stored.
    Extended,
}

impl From<Presentation> for FileFormat {
    fn from(value: Presentation) -> Self {
        match value {
            Presentation::Basic => FileFormat::Basic,
            Presentation::Extended => FileFormat::Extended,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum OutputFormat {
    /// Core Audio Format, 32-bit float.
    Caf,
    /// Sony Wave64, 32-bit float.
    W64,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Caf => "caf",
            OutputFormat::W64 => "w64",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn interleave_arguments() {
        let cli = Cli::parse_from([
            "ambixtool", "--strict", "interleave", "-o", "out.caf", "-O", "1", "-b", "256", "a.caf",
            "b.caf",
        ]);
        assert!(cli.strict);
        let Commands::Interleave(args) = cli.command else {
            panic!("expected interleave");
        };
        assert_eq!(args.order, Some(1));
        assert_eq!(args.blocksize, 256);
        assert_eq!(args.inputs.len(), 2);
    }

    #[test]
    fn premultiply_conflicts_with_fuma() {
        let result = Cli::try_parse_from([
            "ambixtool",
            "decode",
            "in.caf",
            "-o",
            "out",
            "--premultiply",
            "m.yaml",
            "--fuma",
        ]);
        assert!(result.is_err());
    }
}
