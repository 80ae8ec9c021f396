//! Dataset enumeration and partitioning.

mod listing;
mod partition;

pub use listing::list_images;
pub use partition::{partition, partition_sizes};
