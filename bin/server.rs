// Bill Tally - Processing Server
// POST /process-bills with Axum

use anyhow::{Context, Result};
use bill_tally::extractor::{DEFAULT_EXTRACTOR_URL, DEFAULT_MODEL};
use bill_tally::server::{create_app, AppState, ServerConfig, DEFAULT_BODY_LIMIT};
use bill_tally::{ExtractorConfig, RemoteExtractor};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Extract expenses from bill images and total them by category
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5000", env = "BILL_TALLY_PORT")]
    port: u16,

    /// Directory with the static web assets
    #[arg(long, default_value = "web")]
    static_dir: PathBuf,

    /// OpenAI-compatible chat-completions endpoint used to read bills
    #[arg(long, env = "BILL_TALLY_EXTRACTOR_URL", default_value = DEFAULT_EXTRACTOR_URL)]
    extractor_url: String,

    /// Vision model name
    #[arg(long, env = "BILL_TALLY_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// API key for the extractor endpoint
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Per-image extraction timeout in seconds
    #[arg(long, default_value_t = 60)]
    extractor_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bill_tally=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    println!("🌐 Bill Tally - Processing Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let extractor = RemoteExtractor::new(ExtractorConfig {
        endpoint: args.extractor_url.clone(),
        model: args.model.clone(),
        api_key: args.api_key.clone(),
        timeout: Duration::from_secs(args.extractor_timeout_secs),
    })
    .context("Failed to configure expense extractor")?;
    info!("Extractor: {} ({})", args.extractor_url, args.model);

    if !args.static_dir.exists() {
        tracing::warn!("Static directory {:?} not found; only the API is served", args.static_dir);
    }

    let state = AppState {
        extractor: Arc::new(extractor),
    };
    let config = ServerConfig {
        static_dir: args.static_dir.clone(),
        body_limit: DEFAULT_BODY_LIMIT,
    };
    let app = create_app(state, &config);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    println!("\n🚀 Server running on http://localhost:{}", args.port);
    println!("   API: POST http://localhost:{}/process-bills", args.port);
    println!("   UI:  http://localhost:{}", args.port);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
