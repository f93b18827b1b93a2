use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use std::io::Read;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use transcript_provider::cli::{Cli, Commands};
use transcript_provider::config::Config;
use transcript_provider::output;
use transcript_provider::transcribe::TranscriptionPipeline;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.json_logs);

    let mut config = Config::load().await?;

    match cli.command {
        Commands::Handle {
            event,
            output,
            format,
            table_name,
            secret_name,
            region,
            languages,
        } => {
            if let Some(table_name) = table_name {
                config.aws.table_name = table_name;
            }
            if let Some(secret_name) = secret_name {
                config.aws.secret_name = secret_name;
            }
            if region.is_some() {
                config.aws.region = region;
            }
            if let Some(languages) = languages {
                config.transcripts.languages = languages;
            }
            config.validate()?;

            let event = read_event(event.as_deref())?;
            let pipeline = TranscriptionPipeline::from_config(&config).await;

            let result = pipeline.handle(event).await;
            tracing::info!("Invocation finished (success: {})", result.is_success());

            match output {
                Some(path) => {
                    output::save_to_file(&result, &path, &format).await?;
                    eprintln!("Result saved to: {}", path.display());
                }
                None => {
                    output::print_to_console(&result, &format)?;
                }
            }
        }
        Commands::Config { show, init } => {
            if init {
                let path = Config::default().save().await?;
                println!("Configuration written to: {}", path.display());
            }
            if show || !init {
                config.display();
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool, json: bool) {
    let default_filter = if verbose {
        "transcript_provider=debug"
    } else {
        "transcript_provider=info"
    };

    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| default_filter.into()),
    );

    // Logs go to stderr, stdout carries only the envelope
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Read the invocation event from a file or stdin
///
/// Text that is not JSON is passed on as a string so it still ends up in the
/// error envelope's payload.
fn read_event(path: Option<&Path>) -> Result<Value> {
    let raw = match path {
        Some(path) => fs_err::read_to_string(path).context("Failed to read event file")?,
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("Failed to read event from stdin")?;
            raw
        }
    };

    Ok(serde_json::from_str(&raw).unwrap_or(Value::String(raw)))
}
