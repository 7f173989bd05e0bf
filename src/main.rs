// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use bill_tally::client::DEFAULT_SERVER_URL;
use bill_tally::{
    alerts::DEFAULT_MULTIPLIER, AlertPolicy, BackendClient, CandidateFile, ClientConfig, DashboardModel, Pipeline,
    Renderer, RunOutcome, SegmentCanvas,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

type ClientPipeline = Pipeline<DashboardModel, SegmentCanvas>;

/// Tally bill and receipt images into spending categories
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Bill or receipt images to upload
    files: Vec<PathBuf>,

    /// Base URL of the bill-processing server
    #[arg(long, env = "BILL_TALLY_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    server_url: String,

    /// Request timeout in seconds
    #[arg(long, env = "BILL_TALLY_TIMEOUT_SECS", default_value_t = 120)]
    timeout_secs: u64,

    /// Flag categories above this multiple of the average category spend
    #[arg(long, default_value_t = DEFAULT_MULTIPLIER)]
    alert_multiplier: f64,

    /// Open the interactive dashboard
    #[arg(long)]
    tui: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.tui);

    let client = BackendClient::new(ClientConfig {
        base_url: args.server_url.clone(),
        timeout: Duration::from_secs(args.timeout_secs),
    })
    .context("Failed to build HTTP client")?;

    let pipeline = Pipeline::new(
        Arc::new(client),
        DashboardModel::default(),
        Renderer::new(SegmentCanvas::default(), AlertPolicy::new(args.alert_multiplier)),
    );

    if args.tui {
        run_ui_mode(pipeline, args.files).await
    } else {
        run_once(pipeline, args.files, &args.server_url).await
    }
}

/// Logs would tear through the dashboard, so the TUI runs with logging muted
fn init_tracing(tui: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "bill_tally=info".into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if tui {
        builder.with_writer(std::io::sink).init();
    } else {
        builder.with_writer(std::io::stderr).init();
    }
}

async fn run_once(pipeline: ClientPipeline, paths: Vec<PathBuf>, server_url: &str) -> Result<()> {
    if paths.is_empty() {
        eprintln!("❌ No files given!");
        eprintln!("   Run: bill-tally <IMAGE>...");
        eprintln!("   or open the dashboard with: bill-tally --tui");
        std::process::exit(2);
    }

    println!("🧾 Bill Tally - {} file(s) → {}", paths.len(), server_url);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let files: Vec<CandidateFile> = paths.iter().map(CandidateFile::from_path).collect();
    let outcome = pipeline.submit(files).await;

    let report = {
        let surface = pipeline.surface();
        let surface = surface.lock().unwrap_or_else(PoisonError::into_inner);
        surface.dashboard.report(surface.renderer.chart())
    };
    println!("\n{}", report);

    match outcome {
        RunOutcome::Rendered(_) => {
            println!("✅ Done");
            Ok(())
        }
        RunOutcome::NothingAccepted => {
            eprintln!("❌ No image files to upload");
            std::process::exit(1);
        }
        RunOutcome::Failed(e) => {
            eprintln!("❌ {}", e.alert_text());
            std::process::exit(1);
        }
        RunOutcome::Ignored | RunOutcome::Superseded => Ok(()),
    }
}

#[cfg(feature = "tui")]
async fn run_ui_mode(pipeline: ClientPipeline, paths: Vec<PathBuf>) -> Result<()> {
    println!("🖥️  Loading Bill Tally dashboard...\n");

    let mut app = ui::App::new(pipeline, tokio::runtime::Handle::current());
    app.submit_paths(paths);

    tokio::task::spawn_blocking(move || ui::run_ui(&mut app))
        .await
        .context("Dashboard thread panicked")??;

    println!("\n✅ Dashboard closed");

    Ok(())
}

#[cfg(not(feature = "tui"))]
async fn run_ui_mode(_pipeline: ClientPipeline, _paths: Vec<PathBuf>) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or run one-shot: bill-tally <IMAGE>...");
    std::process::exit(1);
}
