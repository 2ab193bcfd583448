//! Resource providers: manifest files and live clusters.

pub mod cluster;
pub mod yaml;

pub use cluster::ClusterProvider;
pub use yaml::{decode_object, parse_manifest, parse_manifest_file};
