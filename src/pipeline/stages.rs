//! Fan-out/fan-in search pipeline.
//!
//! ```text
//!                ┌──────────┐
//!  partition 0 ─▶│ worker 0 │──┐
//!                └──────────┘  │   bounded    ┌──────────┐
//!       ...          ...       ├──────────────▶│ selector │──▶ ranked top-K
//!                ┌──────────┐  │   channel     └──────────┘
//!  partition k ─▶│ worker k │──┘                    ▲
//!                └──────────┘                       │
//!                ┌──────────┐                       │
//!  query image ─▶│  query   │───────────────────────┘
//!                └──────────┘
//! ```
//!
//! Workers run on the blocking pool and push histograms with backpressure. The
//! orchestrator keeps the original sender and drops it only after every worker
//! has been joined, so the selector sees end-of-stream exactly once, after the
//! last producer is done. The selector is the only owner of the top-K set.

use crate::dataset::partition;
use crate::histogram::{extract, intersection, Histogram};
use crate::pipeline::{Metrics, MetricsReporter, ScoredCandidate, TopK};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Configuration for the search pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of dataset partitions, one worker each
    pub partitions: usize,
    /// Number of results to keep
    pub top_k: usize,
    /// Zero-filled bins ahead of the pixel bins
    pub depth: usize,
    /// Channel buffer size between workers and the selector
    pub channel_capacity: usize,
    /// Enable progress reporting
    pub enable_metrics: bool,
    /// Metrics reporting interval in seconds
    pub metrics_interval_secs: u64,
    /// Optional path to save metrics JSON after run completes
    pub metrics_output_path: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            partitions: 4,
            top_k: 5,
            depth: 10,
            channel_capacity: 64,
            enable_metrics: false,
            metrics_interval_secs: 5,
            metrics_output_path: None,
        }
    }
}

impl From<&crate::Config> for PipelineConfig {
    fn from(config: &crate::Config) -> Self {
        Self {
            partitions: config.search.partitions,
            top_k: config.search.top_k,
            depth: config.search.depth,
            channel_capacity: config.search.channel_capacity,
            enable_metrics: config.processing.enable_metrics,
            metrics_interval_secs: config.processing.metrics_interval_secs,
            metrics_output_path: config.processing.metrics_output_path.clone(),
        }
    }
}

/// Orchestrator states, logged as a run progresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Partitioning,
    Dispatching,
    Draining,
    Selecting,
    Done,
}

/// Result of a search run.
#[derive(Debug)]
pub struct SearchOutcome {
    /// Best matches by descending score
    pub matches: Vec<ScoredCandidate>,
    pub stats: PipelineStats,
}

impl SearchOutcome {
    fn empty(total_images: usize) -> Self {
        Self {
            matches: Vec::new(),
            stats: PipelineStats {
                total_images,
                ..Default::default()
            },
        }
    }
}

/// Search pipeline executor.
pub struct Pipeline {
    metrics: Arc<Metrics>,
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline.
    pub fn new(metrics: Arc<Metrics>, config: PipelineConfig) -> Self {
        Self { metrics, config }
    }

    /// Rank `images` by similarity to the image at `query`.
    ///
    /// Fails if the channel capacity is zero or the query histogram cannot be
    /// computed. Dataset images that cannot be read, decoded or compared are
    /// skipped.
    pub async fn run(&self, query: PathBuf, images: Vec<PathBuf>) -> Result<SearchOutcome> {
        if self.config.channel_capacity == 0 {
            anyhow::bail!("channel_capacity must be at least 1");
        }

        let total_images = images.len();
        let mut state = PipelineState::Idle;
        self.transition(&mut state, PipelineState::Partitioning);

        let groups = partition(images, self.config.partitions);
        if groups.is_empty() {
            tracing::warn!(
                "Nothing to do: {} images across {} partitions",
                total_images,
                self.config.partitions
            );
            self.transition(&mut state, PipelineState::Done);
            return Ok(SearchOutcome::empty(total_images));
        }

        tracing::info!(
            "Searching {} images with {} workers (top {})",
            total_images,
            groups.len(),
            self.config.top_k
        );

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
        let reporter_handle = if self.config.enable_metrics {
            let reporter = MetricsReporter::new(
                self.metrics.clone(),
                self.config.metrics_interval_secs,
                total_images as u64,
            );
            Some(tokio::spawn(reporter.run(shutdown_rx)))
        } else {
            drop(shutdown_rx);
            None
        };

        self.transition(&mut state, PipelineState::Dispatching);
        let partitions = groups.len();
        let (histogram_tx, histogram_rx) = mpsc::channel::<Histogram>(self.config.channel_capacity);

        let query_handle = self.spawn_query_stage(query);
        let workers = self.spawn_worker_stage(groups, &histogram_tx);

        // Close the stream only after every producer has finished
        let join_barrier = tokio::spawn(async move {
            let results = futures::future::join_all(workers).await;
            drop(histogram_tx);
            results
        });

        let query = match query_handle.await {
            Ok(Ok(histogram)) => histogram,
            Ok(Err(e)) => {
                drop(histogram_rx);
                let _ = join_barrier.await;
                Self::stop_reporter(shutdown_tx, reporter_handle).await;
                return Err(e).context("Failed to compute query histogram");
            }
            Err(e) => {
                drop(histogram_rx);
                let _ = join_barrier.await;
                Self::stop_reporter(shutdown_tx, reporter_handle).await;
                anyhow::bail!("Query histogram task panicked: {}", e);
            }
        };

        tracing::debug!("Query histogram ready: {} bins", query.len());

        self.transition(&mut state, PipelineState::Draining);
        let top = self.run_select_stage(&query, histogram_rx).await;

        for (idx, result) in join_barrier.await?.into_iter().enumerate() {
            if let Err(e) = result {
                tracing::error!("Worker {} panicked: {}", idx, e);
            }
        }

        self.transition(&mut state, PipelineState::Selecting);
        let matches = top.into_ranked();

        Self::stop_reporter(shutdown_tx, reporter_handle).await;
        if self.config.enable_metrics {
            MetricsReporter::new(
                self.metrics.clone(),
                self.config.metrics_interval_secs,
                total_images as u64,
            )
            .print_summary();

            if let Some(ref path) = self.config.metrics_output_path {
                if let Err(e) = self.metrics.snapshot().save_to_file(path) {
                    tracing::warn!("Failed to save metrics to {}: {}", path, e);
                }
            }
        }

        let snapshot = self.metrics.snapshot();
        let stats = PipelineStats {
            total_images,
            partitions,
            images_scored: snapshot.histograms_scored as usize,
            images_failed: snapshot.images_failed as usize,
            images_mismatched: snapshot.images_mismatched as usize,
        };

        self.transition(&mut state, PipelineState::Done);
        tracing::info!("Search complete: {}", stats);

        Ok(SearchOutcome { matches, stats })
    }

    fn transition(&self, state: &mut PipelineState, next: PipelineState) {
        tracing::debug!("Pipeline state: {:?} -> {:?}", state, next);
        *state = next;
    }

    async fn stop_reporter(shutdown_tx: mpsc::Sender<()>, handle: Option<JoinHandle<()>>) {
        let _ = shutdown_tx.send(()).await;
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Compute the query histogram on the blocking pool.
    fn spawn_query_stage(
        &self,
        query: PathBuf,
    ) -> JoinHandle<Result<Histogram, crate::HistogramError>> {
        let depth = self.config.depth;
        tokio::task::spawn_blocking(move || extract(&query, depth))
    }

    /// Spawn one blocking worker per partition.
    ///
    /// Each worker gets its own sender clone and drops it when its partition is
    /// exhausted or the receiver goes away.
    fn spawn_worker_stage(
        &self,
        groups: Vec<Vec<PathBuf>>,
        histogram_tx: &mpsc::Sender<Histogram>,
    ) -> Vec<JoinHandle<()>> {
        groups
            .into_iter()
            .enumerate()
            .map(|(worker_id, group)| {
                let tx = histogram_tx.clone();
                let metrics = self.metrics.clone();
                let depth = self.config.depth;

                tokio::task::spawn_blocking(move || {
                    let assigned = group.len();
                    for path in group {
                        let start = Instant::now();
                        let histogram = match extract(&path, depth) {
                            Ok(h) => h,
                            Err(e) => {
                                tracing::warn!("Skipping image: {}", e);
                                metrics.add_image_failed();
                                continue;
                            }
                        };
                        metrics.add_extract_time(start.elapsed());
                        let bytes = std::fs::metadata(&path).map_or(0, |m| m.len());
                        metrics.add_image_extracted(histogram.len(), bytes);

                        if tx.blocking_send(histogram).is_err() {
                            tracing::debug!("Selector dropped, stopping worker {}", worker_id);
                            return;
                        }
                    }
                    tracing::debug!("Worker {} finished {} images", worker_id, assigned);
                })
            })
            .collect()
    }

    /// Drain the histogram stream, scoring each entry into the top-K set.
    async fn run_select_stage(
        &self,
        query: &Histogram,
        mut histogram_rx: mpsc::Receiver<Histogram>,
    ) -> TopK {
        let mut top = TopK::new(self.config.top_k);

        while let Some(histogram) = histogram_rx.recv().await {
            let start = Instant::now();
            match intersection(query, &histogram) {
                Ok(score) => {
                    self.metrics.add_histogram_scored();
                    top.push(ScoredCandidate::new(histogram, score));
                }
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", histogram.name().display(), e);
                    self.metrics.add_image_mismatched();
                }
            }
            self.metrics.add_score_time(start.elapsed());
        }

        top
    }
}

/// Statistics from a pipeline run.
#[derive(Debug, Default)]
pub struct PipelineStats {
    pub total_images: usize,
    pub partitions: usize,
    pub images_scored: usize,
    pub images_failed: usize,
    pub images_mismatched: usize,
}

impl std::fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Scored: {}, Failed: {}, Mismatched: {}, Total: {} ({} partitions)",
            self.images_scored,
            self.images_failed,
            self.images_mismatched,
            self.total_images,
            self.partitions
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.partitions, 4);
        assert_eq!(config.top_k, 5);
        assert_eq!(config.depth, 10);
        assert_eq!(config.channel_capacity, 64);
        assert!(!config.enable_metrics);
    }

    #[test]
    fn test_pipeline_config_from_config() {
        let mut config = crate::Config::default();
        config.search.partitions = 20;
        config.processing.metrics_output_path = Some("m.json".to_string());

        let pipeline_config = PipelineConfig::from(&config);
        assert_eq!(pipeline_config.partitions, 20);
        assert_eq!(pipeline_config.metrics_output_path.as_deref(), Some("m.json"));
    }

    #[test]
    fn test_pipeline_stats_display() {
        let stats = PipelineStats {
            total_images: 20,
            partitions: 4,
            images_scored: 17,
            images_failed: 2,
            images_mismatched: 1,
        };
        let display = format!("{}", stats);
        assert!(display.contains("17"));
        assert!(display.contains("Failed: 2"));
        assert!(display.contains("20"));
    }

    #[tokio::test]
    async fn test_zero_partitions_is_no_work() {
        let config = PipelineConfig {
            partitions: 0,
            ..Default::default()
        };
        let pipeline = Pipeline::new(Metrics::new(), config);

        let outcome = pipeline
            .run(PathBuf::from("missing.jpg"), vec![PathBuf::from("a.jpg")])
            .await
            .unwrap();
        assert!(outcome.matches.is_empty());
        assert_eq!(outcome.stats.total_images, 1);
    }

    #[tokio::test]
    async fn test_empty_dataset_is_no_work() {
        let pipeline = Pipeline::new(Metrics::new(), PipelineConfig::default());
        let outcome = pipeline
            .run(PathBuf::from("missing.jpg"), Vec::new())
            .await
            .unwrap();
        assert!(outcome.matches.is_empty());
        assert_eq!(outcome.stats.images_scored, 0);
    }

    #[tokio::test]
    async fn test_zero_channel_capacity_is_error() {
        let config = PipelineConfig {
            channel_capacity: 0,
            ..Default::default()
        };
        let pipeline = Pipeline::new(Metrics::new(), config);

        let err = pipeline
            .run(PathBuf::from("missing.jpg"), vec![PathBuf::from("a.jpg")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("channel_capacity"));
    }
}
