use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast;

use anomalyscope::analysis::SortKey;
use anomalyscope::api::HttpAnomalyApi;
use anomalyscope::config::ScopeConfig;
use anomalyscope::dashboard::Dashboard;
use anomalyscope::notify::{Notification, Severity};
use anomalyscope::render::{JsonSink, RenderSink, TerminalSink};

#[derive(Parser)]
#[command(
    name = "anomalyscope",
    about = "Terminal dashboard for security log-anomaly analysis",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL (overrides config)
    #[arg(long, global = true)]
    server: Option<String>,

    /// JSON output for machine parsing
    #[arg(long, global = true)]
    json: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Table ordering (overrides config)
    #[arg(long, global = true, value_enum)]
    sort: Option<SortKey>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load anomalies and render the dashboard once
    Show,

    /// Upload a log file for analysis, then render the refreshed dashboard
    Upload {
        /// CSV log file (UserID, Timestamp, Action, Resource, IP)
        file: Option<PathBuf>,
    },

    /// Keep the dashboard refreshed until Ctrl-C
    Watch {
        /// Refresh interval in seconds (overrides config)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Download an export of all anomalies
    Export {
        /// Export format, passed through to the backend
        #[arg(long, default_value = "csv")]
        format: String,

        /// Output file path
        #[arg(long, default_value = "anomalies.csv")]
        output: PathBuf,
    },
}

fn init_tracing(config: &ScopeConfig, force_json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if force_json || config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_notification(n: &Notification) {
    let tag = match n.severity {
        Severity::Success => "OK",
        Severity::Danger => "!!",
    };
    eprintln!("[{}] {}", tag, n.message);
}

fn drain_notifications(rx: &mut broadcast::Receiver<Notification>) {
    while let Ok(n) = rx.try_recv() {
        print_notification(&n);
    }
}

fn finish(dashboard: &Dashboard) -> Result<()> {
    match dashboard.state().last_failure() {
        Some(kind) => anyhow::bail!("last action failed ({})", kind),
        None => Ok(()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ScopeConfig::resolve(cli.config.as_deref())?;
    if let Some(server) = cli.server {
        config.backend.base_url = server;
    }
    if let Some(sort) = cli.sort {
        config.dashboard.sort = sort;
    }

    init_tracing(&config, cli.log_json);

    let sink: Box<dyn RenderSink> = if cli.json {
        Box::new(JsonSink::stdout())
    } else {
        Box::new(TerminalSink::stdout())
    };

    match cli.command {
        Commands::Show => {
            let mut dashboard = anomalyscope::connect(&config, sink)?;
            let mut notes = dashboard.notifier().subscribe();
            dashboard.boot();
            dashboard.settle().await;
            drain_notifications(&mut notes);
            finish(&dashboard)?;
        }
        Commands::Upload { file } => {
            let mut dashboard = anomalyscope::connect(&config, sink)?;
            let mut notes = dashboard.notifier().subscribe();
            dashboard.boot();
            dashboard.settle().await;
            drain_notifications(&mut notes);

            tracing::info!(file = ?file, "submitting log file");
            dashboard.submit_file(file);
            dashboard.settle().await;
            drain_notifications(&mut notes);
            finish(&dashboard)?;
        }
        Commands::Watch { interval } => {
            let period = Duration::from_secs(
                interval
                    .unwrap_or(config.dashboard.refresh_interval_secs)
                    .max(1),
            );
            let mut dashboard = anomalyscope::connect(&config, sink)?;
            let mut notes = dashboard.notifier().subscribe();
            tokio::spawn(async move {
                loop {
                    match notes.recv().await {
                        Ok(n) => print_notification(&n),
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            });

            dashboard.boot();
            dashboard
                .watch(period, async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await;
        }
        Commands::Export { format, output } => {
            let api = HttpAnomalyApi::new(&config.backend.base_url, config.backend.timeout())?;
            tracing::info!(%format, output = %output.display(), "exporting anomalies");
            let body = api.export(&format).await.context("export failed")?;
            tokio::fs::write(&output, &body)
                .await
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!("Exported {} bytes to {}", body.len(), output.display());
        }
    }

    Ok(())
}
