//! Region detection: point extraction and density clustering.

pub mod cluster;
pub mod extract;

pub use cluster::{cluster, ClusterLabel, Clustering, DensityClusterer, Region};
pub use extract::{PointExtractor, PointSet};
