use std::collections::HashMap;

use crate::util::parse_cluster_number;

/// Partition tier of a graph node: P1 bucket, P2 cluster, P3 aisle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Bucket,
    Cluster,
    Aisle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeKind {
    ClusterToAisle,
    ClusterSimilarity,
    /// Derived in the drilldown panel; never present in loaded documents.
    BucketNeighbor,
}

#[derive(Clone, Debug)]
pub struct GraphNode {
    pub id: String,
    pub kind: NodeKind,
    pub name: String,
    pub cluster_id: Option<u32>,
    pub aisle_name: Option<String>,
}

impl GraphNode {
    /// Numeric cluster identity: the explicit field when present, otherwise
    /// parsed out of the display name ("Cluster 7" -> 7).
    pub fn cluster_number(&self) -> Option<u32> {
        self.cluster_id.or_else(|| parse_cluster_number(&self.name))
    }
}

#[derive(Clone, Debug)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    pub weight: f32,
}

/// Elliptical density proxy for one cluster. Only built when both
/// eigenvalues were supplied; a partial pair never renders.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EllipseShape {
    pub eig1: f32,
    pub eig2: f32,
    pub angle_deg: f32,
}

/// Precomputed GMM layout parameters for one cluster. Centroid coordinates
/// are normalized to [0, 1] on both axes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClusterOverlay {
    pub centroid_x: f32,
    pub centroid_y: f32,
    pub ellipse: Option<EllipseShape>,
}

#[derive(Clone, Debug)]
pub struct BucketEntry {
    pub id: String,
    pub name: String,
}

/// Merged graph model: base topology plus the optional statistical
/// augmentation. Built once at load; never mutated afterwards.
#[derive(Clone, Debug, Default)]
pub struct GraphModel {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    /// Drilldown sets keyed by canonical numeric cluster id. Source keying
    /// is inconsistent (numeric vs string); normalized once at load.
    pub buckets_by_cluster: HashMap<u32, Vec<BucketEntry>>,
    /// Overlay per cluster node id. Empty when augmentation was unavailable.
    pub overlays: HashMap<String, ClusterOverlay>,
    pub augmented: bool,
}

impl GraphModel {
    pub fn aisles(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes
            .iter()
            .filter(|node| node.kind == NodeKind::Aisle)
    }

    pub fn clusters(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes
            .iter()
            .filter(|node| node.kind == NodeKind::Cluster)
    }

    pub fn cluster_buckets(&self, cluster: u32) -> &[BucketEntry] {
        self.buckets_by_cluster
            .get(&cluster)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
