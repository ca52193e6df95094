//! CTS - Conformance test suite runner
//!
//! - `cts run [QUERY]` runs the selected cases and prints outcomes, a summary
//!   and the JSON result tree
//! - `cts list` prints the listing manifest

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use cts_runtime::{builtin_adapter, RunnerConfig, RuntimeResult, TokioHost};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// CTS CLI
#[derive(Parser)]
#[command(name = "cts")]
#[command(about = "CTS - run and list conformance tests", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CTS_CONFIG", global = true)]
    config: Option<String>,

    /// Log level (overrides the configured level)
    #[arg(long, env = "CTS_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the cases a query selects
    Run {
        /// Query such as `cts:examples:` or `cts:examples:basic:`; defaults to the whole suite
        query: Option<String>,

        /// Write the JSON report to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// JSON indentation, 0 for compact output
        #[arg(long)]
        indent: Option<usize>,
    },

    /// Print the listing manifest
    List,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> RuntimeResult<ExitCode> {
    let cli = Cli::parse();
    let config = RunnerConfig::load(cli.config.as_deref())?;

    let level = cli.log_level.unwrap_or_else(|| config.logging.level.clone());
    init_tracing(&level, cli.json || config.logging.json);

    match cli.command {
        Command::Run {
            query,
            output,
            indent,
        } => {
            let query = query.unwrap_or_else(|| config.default_query());
            let adapter = builtin_adapter().with_indent(indent.unwrap_or(config.report.indent));
            let mut host = TokioHost::new();
            let report = adapter.run_str(&query, &mut host).await?;

            for outcome in host.join().await {
                match &outcome.failure {
                    None => println!("[pass] {}", outcome.name),
                    Some(detail) => {
                        println!("[FAIL] {}", outcome.name);
                        for line in detail.lines() {
                            println!("    {}", line);
                        }
                    }
                }
            }
            println!("{}", report.summary);

            match output.or_else(|| config.report.output.as_ref().map(PathBuf::from)) {
                Some(path) => {
                    std::fs::write(&path, &report.json)?;
                    info!(path = %path.display(), "report written");
                }
                None => println!("{}", report.json),
            }

            Ok(if report.all_passed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::List => {
            let listing = builtin_adapter().loader().listing()?;
            println!("{}", listing.to_json(config.report.indent)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(level: &str, json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.to_string().into());

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
