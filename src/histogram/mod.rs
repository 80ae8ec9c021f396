//! Color histograms: extraction from images and intersection scoring.

mod extract;
mod score;

pub use extract::{extract, Histogram};
pub use score::intersection;
