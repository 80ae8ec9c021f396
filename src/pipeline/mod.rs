//! Search pipeline: parallel extraction, streaming scoring and top-K selection.

mod metrics;
mod stages;
mod topk;


pub use metrics::{Metrics, MetricsReporter, MetricsSnapshot};
pub use stages::{Pipeline, PipelineConfig, PipelineState, PipelineStats, SearchOutcome};
pub use topk::{ScoredCandidate, TopK};
