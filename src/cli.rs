use crate::model::NodeConfig;
use crate::orchestrator::ViewModel;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "ethoscope-runs",
    version,
    about = "Experiment runs, backups and devices from an ethoscope node"
)]
pub struct Cli {
    /// Base URL of the node API
    #[arg(long, default_value = "http://localhost")]
    pub base_url: String,

    /// Print the view model as JSON and exit (no TUI)
    #[arg(long, conflicts_with = "text")]
    pub json: bool,

    /// Print a text summary and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Interval between refresh ticks
    #[arg(long, default_value = "10s")]
    pub refresh_interval: humantime::Duration,

    /// Per-request timeout
    #[arg(long, default_value = "5s")]
    pub timeout: humantime::Duration,

    /// Reload runs, backups and devices on every refresh tick
    #[arg(long)]
    pub auto_refresh: bool,

    /// Write the loaded view model as JSON (with --json or --text)
    #[arg(long)]
    pub export_json: Option<std::path::PathBuf>,

    /// Write logs to this file (the only log output in TUI mode)
    #[arg(long)]
    pub log_file: Option<std::path::PathBuf>,
}

impl Cli {
    pub fn is_interactive(&self) -> bool {
        !self.json && !self.text
    }
}

/// Build a `NodeConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> Result<NodeConfig> {
    let refresh_interval = Duration::from(args.refresh_interval);
    if refresh_interval.is_zero() {
        anyhow::bail!("--refresh-interval must be greater than zero");
    }
    crate::node::parse_base_url(&args.base_url)?;

    Ok(NodeConfig {
        base_url: args.base_url.clone(),
        refresh_interval,
        request_timeout: Duration::from(args.timeout),
        auto_refresh: args.auto_refresh,
        user_agent: format!("ethoscope-runs/{}", env!("CARGO_PKG_VERSION")),
    })
}

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args)?;
    tracing::debug!(?cfg, "configuration");

    if args.is_interactive() {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(cfg).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_once(&args, &cfg).await;
        }
    }

    run_once(&args, &cfg).await
}

fn handle_exports(args: &Cli, vm: &ViewModel) -> Result<Option<String>> {
    match args.export_json.as_deref() {
        Some(path) => {
            crate::export::export_json(path, vm)?;
            Ok(Some(format!("Exported JSON: {}", path.display())))
        }
        None => Ok(None),
    }
}

/// Load every source once and print the result as JSON or text.
async fn run_once(args: &Cli, cfg: &NodeConfig) -> Result<()> {
    let vm = crate::orchestrator::load_snapshot(cfg).await?;
    let (out_tx, out_handle) = spawn_output_writer();

    if args.json {
        let out = serde_json::to_string_pretty(&vm).context("serialize view model")?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    } else {
        let summary =
            crate::text_summary::build_text_summary(&vm, time::OffsetDateTime::now_utc());
        for line in summary.lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }

    let export_result = handle_exports(args, &vm);
    if let Ok(Some(msg)) = &export_result {
        let _ = out_tx.send(OutputLine::Stderr(msg.clone()));
    }

    drop(out_tx);
    let _ = out_handle.await;
    export_result.map(|_| ())
}
