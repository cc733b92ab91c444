//! CLI argument definitions for the publication runner.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "srh-publish",
    version,
    about = "SRH publication outputs - crosstabs with disclosure control",
    long_about = "Build the sexual and reproductive health publication tables.\n\n\
                  Every output in the catalogue is aggregated from the contacts data,\n\
                  disclosure controlled and written as CSV or JSON."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build the catalogue outputs from a contacts extract.
    Run(RunArgs),

    /// Load and validate a catalogue without reading any data.
    Check(CheckArgs),

    /// List the named filters of the engine configuration.
    Filters(ConfigArgs),
}

#[derive(Parser)]
pub struct ConfigArgs {
    /// Engine configuration overriding the built-in defaults.
    #[arg(long = "config", value_name = "TOML")]
    pub config: Option<PathBuf>,
}

#[derive(Parser)]
pub struct CheckArgs {
    /// Catalogue of outputs to validate.
    #[arg(long = "catalogue", value_name = "TOML")]
    pub catalogue: PathBuf,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Parser)]
pub struct RunArgs {
    /// Contacts extract, one record per contact.
    #[arg(long = "data", value_name = "CSV")]
    pub data: PathBuf,

    /// Population estimates used by rates outputs.
    #[arg(long = "population", value_name = "CSV")]
    pub population: Option<PathBuf>,

    /// Organisation reference used by local authority outputs.
    #[arg(long = "org-ref", value_name = "CSV")]
    pub org_ref: Option<PathBuf>,

    /// Catalogue of outputs to build.
    #[arg(long = "catalogue", value_name = "TOML")]
    pub catalogue: PathBuf,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Directory the output files are written to.
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Output file format.
    #[arg(long = "format", value_enum, default_value = "csv")]
    pub format: OutputFormatArg,

    /// Build only the named outputs.
    #[arg(long = "only", value_name = "NAME", num_args = 1..)]
    pub only: Vec<String>,

    /// Reporting period of the extract, e.g. 2023-24.
    ///
    /// Needed by time series outputs.
    #[arg(long = "period", value_name = "YYYY-YY")]
    pub period: Option<String>,

    /// Field of the extract holding the reporting period. Every record is
    /// checked against --period when set.
    #[arg(long = "period-field", value_name = "FIELD", requires = "period")]
    pub period_field: Option<String>,

    /// Build and report without writing output files.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormatArg {
    Csv,
    Json,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
