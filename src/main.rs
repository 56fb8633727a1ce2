mod cli;
mod error;
mod export;
mod model;
mod node;
mod orchestrator;
mod text_summary;
mod timefmt;
#[cfg(feature = "tui")]
mod tui;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Logs go to `--log-file` when given, otherwise to stderr outside the TUI.
/// The TUI owns the terminal, so without a log file it runs silent.
fn init_logging(args: &cli::Cli) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    if let Some(path) = args.log_file.as_deref() {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| std::path::Path::new("."));
        let file_name = path
            .file_name()
            .context("--log-file must name a file")?;
        let appender = tracing_appender::rolling::never(dir, file_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_target(false)
            .with_ansi(false)
            .compact()
            .with_writer(writer)
            .init();
        return Ok(Some(guard));
    }

    if !args.is_interactive() {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_target(false)
            .compact()
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(None)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let _log_guard = init_logging(&args)?;

    cli::run(args).await
}
