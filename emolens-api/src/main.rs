#![warn(unused_extern_crates)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use clap::Parser;
use emolens_img::analyzer::Analyzer;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod server;

const BIND_ADDR: &str = "0.0.0.0:5000";

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory holding the face and emotion model files
    #[arg(short, long, default_value = "models")]
    models: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .init();

    let args = Args::parse();
    let analyzer = Analyzer::new(&args.models)?;
    let app = server::router(Arc::new(Mutex::new(analyzer)));

    info!("emotion detection API starting");
    info!("  GET  /                    - health check");
    info!("  POST /api/analyze-emotion - analyze emotions in image");
    info!("  POST /api/test            - echo endpoint");

    let listener = tokio::net::TcpListener::bind(BIND_ADDR).await?;
    info!("listening on http://{BIND_ADDR}");
    axum::serve(listener, app).await?;

    Ok(())
}
