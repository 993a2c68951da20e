//! stayopen CLI - drive a persistent ExifTool worker
//!
//! Usage:
//!   stayopen metadata <files...> [--iterations N] [--arg FLAG]...
//!   stayopen exec <directives...>
//!
//! Examples:
//!   stayopen metadata photo.jpg photo-2.jpg --iterations 1000
//!   stayopen metadata photo.jpg --arg -n --arg -G
//!   stayopen exec -- -s -ImageSize photo.jpg

use clap::{Parser, Subcommand};
use stayopen::config::Settings;
use stayopen::worker::WorkerClient;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Env var holding tracing directives; falls back to `RUST_LOG`.
const LOG_ENV: &str = "STAYOPEN_LOG";

#[derive(Parser)]
#[command(name = "stayopen")]
#[command(about = "stayopen - Query a persistent ExifTool worker")]
#[command(version)]
struct Cli {
    /// Config file (defaults to the standard search locations)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Worker binary, overriding the config file
    #[arg(short, long, global = true)]
    worker: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract JSON metadata for files
    Metadata {
        /// Files to read
        #[arg(required = true)]
        files: Vec<String>,

        /// Repeat the query and log per-iteration latency
        #[arg(short, long, default_value_t = 1)]
        iterations: u32,

        /// Extra flag sent after -json (repeatable)
        #[arg(short, long = "arg", allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Send raw directives and print the response frame
    Exec {
        /// Directive lines, sent in order before -execute
        #[arg(required = true, allow_hyphen_values = true, trailing_var_arg = true)]
        directives: Vec<String>,
    },
}

/// Filter used when neither log env var is set.
fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "stayopen=debug,warn"
    } else {
        "stayopen=info,warn"
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn load_settings(cli: &Cli) -> Result<Settings, String> {
    let mut settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    }
    .map_err(|e| format!("Error loading config: {}", e))?;

    if let Some(worker) = &cli.worker {
        settings.worker.path = worker.clone();
    }
    Ok(settings)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = match load_settings(&cli) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let client = match WorkerClient::spawn_with_settings(&settings).await {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error starting worker: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let code = match cli.command {
        Commands::Metadata {
            files,
            iterations,
            args,
        } => cmd_metadata(&client, &files, &args, iterations).await,
        Commands::Exec { directives } => cmd_exec(&client, &directives).await,
    };

    if let Err(e) = client.close().await {
        eprintln!("Error shutting down worker: {}", e);
        return ExitCode::FAILURE;
    }

    code
}

async fn cmd_metadata(
    client: &WorkerClient,
    files: &[String],
    args: &[String],
    iterations: u32,
) -> ExitCode {
    let start = Instant::now();
    let mut last = Vec::new();

    for i in 0..iterations.max(1) {
        let started = Instant::now();
        match client.get_metadata_with_args(args, files).await {
            Ok(records) => last = records,
            Err(e) => {
                eprintln!("Metadata error: {}", e);
                return ExitCode::FAILURE;
            }
        }
        tracing::info!(iteration = i, elapsed = ?started.elapsed(), "query complete");
    }

    tracing::info!(iterations, elapsed = ?start.elapsed(), "all queries complete");

    match serde_json::to_string_pretty(&last) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error encoding metadata: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn cmd_exec(client: &WorkerClient, directives: &[String]) -> ExitCode {
    let response = match client.execute(directives).await {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Worker error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    print!("{}", response.raw);

    for warning in &response.warnings {
        eprintln!("warning: {}", warning);
    }
    for error in &response.errors {
        eprintln!("error: {}", error);
    }

    if response.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::level_filters::LevelFilter;

    #[test]
    fn test_default_filter_shows_query_latency() {
        let filter = EnvFilter::new(default_directives(false));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
        assert!(default_directives(false).contains("stayopen=info"));

        let verbose = EnvFilter::new(default_directives(true));
        assert_eq!(verbose.max_level_hint(), Some(LevelFilter::DEBUG));
    }
}
