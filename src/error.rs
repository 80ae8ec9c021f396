//! Error types for histogram extraction and comparison.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while building or comparing histograms.
///
/// Extraction errors are per-file: the dataset workers log and skip them, while
/// the orchestrator treats them as fatal for the query image.
#[derive(Debug, Error)]
pub enum HistogramError {
    /// The image file could not be opened or read.
    #[error("failed to read image {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file was read but is not a decodable JPEG.
    #[error("failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Two histograms with different bin counts were compared.
    #[error("histogram length mismatch: query has {query} bins, candidate has {candidate}")]
    LengthMismatch { query: usize, candidate: usize },
}

impl HistogramError {
    /// True for errors raised while reading or decoding a file.
    pub fn is_extraction_error(&self) -> bool {
        matches!(self, HistogramError::Io { .. } | HistogramError::Decode { .. })
    }
}
