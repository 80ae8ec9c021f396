//! Throughput monitoring and metrics collection.

use serde::{Serialize, Serializer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::interval;

fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Metrics for a search run.
#[derive(Debug, Default)]
pub struct Metrics {
    /// Dataset images turned into histograms
    pub images_extracted: AtomicU64,

    /// Dataset images skipped because they could not be read or decoded
    pub images_failed: AtomicU64,

    /// Histograms skipped because their length differs from the query's
    pub images_mismatched: AtomicU64,

    /// Histograms compared against the query
    pub histograms_scored: AtomicU64,

    /// Total histogram bins produced by workers
    pub bins_produced: AtomicU64,

    /// Encoded bytes of the dataset images that were extracted
    pub bytes_read: AtomicU64,

    /// Start time
    start_time: Option<Instant>,

    /// Time spent decoding and building histograms (microseconds, summed across workers)
    pub extract_us: AtomicU64,

    /// Time spent scoring against the query (microseconds)
    pub score_us: AtomicU64,
}

impl Metrics {
    /// Create new metrics.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        })
    }

    /// Record a histogram produced by a worker.
    pub fn add_image_extracted(&self, bins: usize, bytes: u64) {
        self.images_extracted.fetch_add(1, Ordering::Relaxed);
        self.bins_produced.fetch_add(bins as u64, Ordering::Relaxed);
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record an image that failed to read or decode.
    pub fn add_image_failed(&self) {
        self.images_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a histogram whose length does not match the query.
    pub fn add_image_mismatched(&self) {
        self.images_mismatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a scored histogram.
    pub fn add_histogram_scored(&self) {
        self.histograms_scored.fetch_add(1, Ordering::Relaxed);
    }

    /// Record extraction time.
    pub fn add_extract_time(&self, duration: Duration) {
        self.extract_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    /// Record scoring time.
    pub fn add_score_time(&self, duration: Duration) {
        self.score_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    /// Get elapsed time since start.
    pub fn elapsed(&self) -> Duration {
        self.start_time.map_or(Duration::ZERO, |t| t.elapsed())
    }

    /// Images finished so far, successful or not.
    pub fn images_done(&self) -> u64 {
        self.images_extracted.load(Ordering::Relaxed) + self.images_failed.load(Ordering::Relaxed)
    }

    /// Get images per second.
    pub fn images_per_second(&self) -> f64 {
        let images = self.images_extracted.load(Ordering::Relaxed);
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            images as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Get a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            images_extracted: self.images_extracted.load(Ordering::Relaxed),
            images_failed: self.images_failed.load(Ordering::Relaxed),
            images_mismatched: self.images_mismatched.load(Ordering::Relaxed),
            histograms_scored: self.histograms_scored.load(Ordering::Relaxed),
            bins_produced: self.bins_produced.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            elapsed: self.elapsed(),
            images_per_second: self.images_per_second(),
            extract_secs: self.extract_us.load(Ordering::Relaxed) as f64 / 1_000_000.0,
            score_secs: self.score_us.load(Ordering::Relaxed) as f64 / 1_000_000.0,
        }
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub images_extracted: u64,
    pub images_failed: u64,
    pub images_mismatched: u64,
    pub histograms_scored: u64,
    pub bins_produced: u64,
    pub bytes_read: u64,
    #[serde(serialize_with = "serialize_duration")]
    pub elapsed: Duration,
    pub images_per_second: f64,
    /// Total time spent extracting (seconds, summed across workers)
    pub extract_secs: f64,
    /// Total time spent scoring (seconds)
    pub score_secs: f64,
}

impl MetricsSnapshot {
    /// Save metrics to a JSON file.
    pub fn save_to_file(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::info!("Metrics saved to {}", path);
        Ok(())
    }
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let total = self.extract_secs + self.score_secs;
        let (extract_pct, score_pct) = if total > 0.0 {
            (self.extract_secs / total * 100.0, self.score_secs / total * 100.0)
        } else {
            (0.0, 0.0)
        };

        write!(
            f,
            "Images: {} extracted, {} failed, {} mismatched | Scored: {} | \
             Rate: {:.1} images/s | Elapsed: {:.1}s | \
             Time: extract {:.0}% | score {:.0}%",
            self.images_extracted,
            self.images_failed,
            self.images_mismatched,
            self.histograms_scored,
            self.images_per_second,
            self.elapsed.as_secs_f64(),
            extract_pct,
            score_pct,
        )
    }
}

/// Periodic metrics reporter.
pub struct MetricsReporter {
    metrics: Arc<Metrics>,
    interval_secs: u64,
    total_images: u64,
}

impl MetricsReporter {
    /// Create a new metrics reporter.
    pub fn new(metrics: Arc<Metrics>, interval_secs: u64, total_images: u64) -> Self {
        Self {
            metrics,
            interval_secs,
            total_images,
        }
    }

    /// Start the periodic reporter.
    pub async fn run(self, mut shutdown: mpsc::Receiver<()>) {
        let mut ticker = interval(Duration::from_secs(self.interval_secs.max(1)));
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let snapshot = self.metrics.snapshot();
                    let progress = if self.total_images > 0 {
                        self.metrics.images_done() as f64 / self.total_images as f64 * 100.0
                    } else {
                        0.0
                    };

                    tracing::info!("[{:.1}%] {}", progress, snapshot);
                }
                _ = shutdown.recv() => {
                    let snapshot = self.metrics.snapshot();
                    tracing::info!("Final: {}", snapshot);
                    break;
                }
            }
        }
    }

    /// Print a final summary.
    pub fn print_summary(&self) {
        let snapshot = self.metrics.snapshot();

        println!("\n=== Search Summary ===");
        println!("Total time: {:.1}s", snapshot.elapsed.as_secs_f64());
        println!("Dataset images: {}", self.total_images);
        println!("Images extracted: {}", snapshot.images_extracted);
        println!("Images skipped (read/decode): {}", snapshot.images_failed);
        println!("Images skipped (length mismatch): {}", snapshot.images_mismatched);
        println!("Histograms scored: {}", snapshot.histograms_scored);
        println!("Bytes read: {:.2} MB", snapshot.bytes_read as f64 / 1_048_576.0);
        println!("Processing rate: {:.1} images/s", snapshot.images_per_second);

        let total = snapshot.extract_secs + snapshot.score_secs;
        if total > 0.0 {
            println!("\n--- Time Breakdown ---");
            println!("Extract: {:>7.2}s ({:>5.1}%)", snapshot.extract_secs, snapshot.extract_secs / total * 100.0);
            println!("Score:   {:>7.2}s ({:>5.1}%)", snapshot.score_secs, snapshot.score_secs / total * 100.0);
        }
        println!("======================\n");
    }
}
