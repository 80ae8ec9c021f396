//! Histogram Search
//!
//! Content-based image retrieval: ranks the images of a dataset directory by
//! color-histogram intersection with a query image and keeps the best K.
//!
//! # Architecture
//!
//! - **Histogram**: JPEG decoding and normalized color histograms
//! - **Dataset**: directory listing and contiguous partitioning
//! - **Pipeline**: one worker per partition feeding a bounded channel, drained
//!   by a single top-K selector
//!
//! # Usage
//!
//! ```no_run
//! use histo_search::{run_search, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_file(std::path::Path::new("search.yaml"))?;
//!     let outcome = run_search(&config, "q00.jpg", "imageDataset2_15_20").await?;
//!     for m in &outcome.matches {
//!         println!("{} {:.4}", m.histogram.name().display(), m.score);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod histogram;
pub mod pipeline;

pub use config::Config;
pub use error::HistogramError;
pub use histogram::{extract, intersection, Histogram};
pub use pipeline::{Metrics, Pipeline, PipelineConfig, ScoredCandidate, SearchOutcome, TopK};

use anyhow::Result;

/// Resolve `query` and `dataset` against the configured roots and run a search.
///
/// Fails if the dataset directory cannot be listed or the query image cannot
/// be processed.
pub async fn run_search(config: &Config, query: &str, dataset: &str) -> Result<SearchOutcome> {
    config.validate()?;

    let query_path = config.paths.query_path(query);
    let dataset_path = config.paths.dataset_path(dataset);

    tracing::info!("Query image: {}", query_path.display());
    tracing::info!("Dataset: {}", dataset_path.display());

    let images = dataset::list_images(&dataset_path, &config.paths.extensions)?;
    tracing::info!("Found {} candidate images", images.len());

    let pipeline = Pipeline::new(Metrics::new(), PipelineConfig::from(config));
    pipeline.run(query_path, images).await
}

/// Build a Tokio runtime with the specified configuration.
pub fn build_runtime(worker_threads: Option<usize>) -> Result<tokio::runtime::Runtime> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();

    if let Some(threads) = worker_threads {
        builder.worker_threads(threads);
    }

    builder.enable_all();

    Ok(builder.build()?)
}
