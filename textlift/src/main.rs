use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use textlift::api::{create_router, AppState};
use textlift::config::Config;
use textlift::ocr::{pin_engine_threads, TesseractReader, TextReader};

#[derive(Parser)]
#[command(name = "textlift")]
#[command(about = "Upload an image, get its text back")]
struct Args {
    /// Address to bind (overrides TEXTLIFT_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides TEXTLIFT_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Download language data and load the OCR engine before serving
    #[arg(long)]
    warm_up: bool,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "textlift=info,tower_http=debug".into());
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();
    init_tracing();

    if pin_engine_threads() {
        tracing::debug!("OMP_THREAD_LIMIT not set, Tesseract will use one thread");
    }

    let mut config = Config::from_env();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let reader = Arc::new(TesseractReader::new(&config.ocr));
    if args.warm_up {
        tracing::info!("Warming up OCR engine...");
        let probe = warmup_probe(&config)?;
        // Any recognition result is fine, we only want the engine loaded.
        if let Err(e) = reader.read_text(&probe).await {
            tracing::warn!("OCR warm-up failed, will retry on first request: {}", e);
        }
        if let Err(e) = std::fs::remove_file(&probe) {
            tracing::debug!("Could not remove warm-up probe {}: {}", probe.display(), e);
        }
    }

    let state = AppState::new(config.clone(), reader);
    state.store.ensure_dir().await?;
    tracing::info!("Upload directory: {}", state.store.dir().display());

    let cancel_token = CancellationToken::new();

    if state.janitor.interval_secs() > 0 {
        tracing::info!(
            "Starting upload janitor... (interval={}s, max_age={}s)",
            state.janitor.interval_secs(),
            config.storage.max_age_secs
        );
        let janitor = state.janitor.clone();
        let token = cancel_token.child_token();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::info!("Upload janitor shutting down...");
                        break;
                    }
                    _ = tokio::time::sleep(tokio::time::Duration::from_secs(janitor.interval_secs())) => {
                        let report = janitor.run_once().await;
                        if !report.is_clean() {
                            tracing::warn!("Upload janitor finished with {} errors", report.failures.len());
                        }
                    }
                }
            }
        });
    }

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Textlift starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token))
        .await?;

    Ok(())
}

/// A small blank PNG used to force engine initialization at startup.
fn warmup_probe(config: &Config) -> anyhow::Result<std::path::PathBuf> {
    std::fs::create_dir_all(&config.storage.upload_dir)?;
    let path = config.storage.upload_dir.join(".warmup.png");
    image::GrayImage::from_pixel(32, 32, image::Luma([255])).save(&path)?;
    Ok(path)
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, cancelling background tasks...");
    cancel_token.cancel();
}
