use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Deterministic pseudo-random pair in [-1, 1] derived from an id.
/// Used to seed node positions so layouts are reproducible run-to-run.
pub fn stable_pair(id: &str) -> (f32, f32) {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    let hash = hasher.finish();

    let x = ((hash & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    let y = (((hash >> 32) & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    ((x * 2.0) - 1.0, (y * 2.0) - 1.0)
}

/// Extract a cluster number from a display name like "Cluster 7".
/// The second whitespace token is tried; anything non-numeric yields None.
pub fn parse_cluster_number(name: &str) -> Option<u32> {
    name.split_whitespace().nth(1)?.parse().ok()
}
