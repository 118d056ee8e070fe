#![warn(unused_extern_crates)]

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use emolens_img::analyzer::Analyzer;
use emolens_img::annotate::Annotator;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

mod app;
mod video;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory holding the face and emotion model files
    #[arg(short, long, default_value = "models")]
    models: PathBuf,

    /// Camera device index for camera mode
    #[arg(short, long, default_value = "0")]
    camera_index: u32,

    /// Requested camera frame rate
    #[arg(long, default_value = "30")]
    fps: u32,
}

fn main() -> Result<()> {
    let filter = EnvFilter::from_default_env();
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_env_filter(filter)
        .init();

    let args = Args::parse();
    let analyzer = Analyzer::new(&args.models)?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([400.0, 200.0])
            .with_resizable(false),
        ..Default::default()
    };

    eframe::run_native(
        "Emotion Detector",
        options,
        Box::new(move |_cc| {
            Ok(Box::new(app::EmotionApp::new(
                analyzer,
                Annotator::new(),
                args.camera_index,
                args.fps,
            )))
        }),
    )
    .map_err(|e| anyhow::anyhow!("failed to run window: {e}"))
}
