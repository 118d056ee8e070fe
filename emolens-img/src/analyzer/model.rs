use std::path::Path;

use anyhow::Result;
use ort::session::builder::GraphOptimizationLevel;
pub use ort::session::Session;

pub fn initialize_model(model_path: &Path, threads: usize) -> Result<Session> {
    ort::init().commit()?;

    let model = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_parallel_execution(true)?
        .with_inter_threads(threads.saturating_sub(2).max(1))?
        .commit_from_file(model_path)?;

    Ok(model)
}
