use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "transcript-provider",
    about = "Transcript Provider - Fetch YouTube captions and store them as transcripts in DynamoDB",
    version,
    long_about = "Processes one video event: resolves proxy credentials from AWS Secrets Manager, picks the caption track matching the requested caption type, joins its segments into a transcript and writes it to DynamoDB. The result is printed as a JSON envelope."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Process one video event and print the resulting envelope
    Handle {
        /// JSON event file (reads stdin if not specified)
        #[arg(short, long, value_name = "FILE")]
        event: Option<PathBuf>,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// DynamoDB table name (overrides TABLE_NAME)
        #[arg(long, value_name = "TABLE")]
        table_name: Option<String>,

        /// Secrets Manager secret name (overrides SECRET_NAME)
        #[arg(long, value_name = "SECRET")]
        secret_name: Option<String>,

        /// AWS region (overrides AWS_REGION)
        #[arg(long, value_name = "REGION")]
        region: Option<String>,

        /// Caption languages in order of preference, comma separated
        #[arg(long, value_name = "LANGS", value_delimiter = ',')]
        languages: Option<Vec<String>>,
    },

    /// Show or initialize configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Write the default configuration file
        #[arg(long)]
        init: bool,
    },
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    /// Compact single-line JSON
    Json,
    /// Indented JSON
    Pretty,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Pretty => write!(f, "pretty"),
        }
    }
}
