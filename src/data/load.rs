use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use super::model::{
    BucketEntry, ClusterOverlay, EdgeKind, EllipseShape, GraphEdge, GraphModel, GraphNode,
    NodeKind,
};

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct RawDocument {
    #[serde(default)]
    nodes: Vec<RawNode>,
    #[serde(default)]
    links: Vec<RawLink>,
    #[serde(default)]
    drilldown: RawDrilldown,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct RawDrilldown {
    #[serde(default)]
    cluster_to_products: HashMap<String, Vec<RawNode>>,
}

#[derive(Clone, Debug, Deserialize)]
struct RawNode {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    aisle_name: Option<String>,
    #[serde(default)]
    cluster_id: Option<Value>,
    #[serde(default)]
    centroid_x: Option<f32>,
    #[serde(default)]
    centroid_y: Option<f32>,
    #[serde(default)]
    eig1: Option<f32>,
    #[serde(default)]
    eig2: Option<f32>,
    #[serde(default)]
    angle_deg: Option<f32>,
}

#[derive(Clone, Debug, Deserialize)]
struct RawLink {
    source: String,
    target: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default = "default_weight")]
    weight: f32,
}

fn default_weight() -> f32 {
    1.0
}

fn parse_node_kind(raw: &str) -> Option<NodeKind> {
    match raw {
        "P1_Bucket" => Some(NodeKind::Bucket),
        "P2_Cluster" => Some(NodeKind::Cluster),
        "P3_Aisle" => Some(NodeKind::Aisle),
        _ => None,
    }
}

/// Link type spellings vary across exporter versions; all similarity
/// variants collapse to one kind. Types outside the rendered set
/// (e.g. P1_P2 membership links) are tolerated and dropped.
fn parse_edge_kind(raw: &str) -> Option<EdgeKind> {
    match raw {
        "P2_P3" => Some(EdgeKind::ClusterToAisle),
        "P2_P2" | "P2_P2_SIMILARITY" | "P2_P2_Similarity" | "P2_P2_similarity" => {
            Some(EdgeKind::ClusterSimilarity)
        }
        _ => None,
    }
}

/// Canonical numeric form of a drilldown map key. The exporter keys
/// clusters as "3", "3.0", or a plain integer depending on version.
fn parse_cluster_key(raw: &str) -> Option<u32> {
    if let Ok(value) = raw.parse::<u32>() {
        return Some(value);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.fract() == 0.0 && *value >= 0.0)
        .map(|value| value as u32)
}

fn cluster_id_value(value: &Value) -> Option<u32> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .map(|id| id as u32)
            .or_else(|| number.as_f64().and_then(|id| {
                (id.fract() == 0.0 && id >= 0.0).then_some(id as u32)
            })),
        Value::String(text) => parse_cluster_key(text),
        _ => None,
    }
}

fn overlay_from_raw(raw: &RawNode) -> Option<ClusterOverlay> {
    let centroid_x = raw.centroid_x?;
    let centroid_y = raw.centroid_y?;

    let ellipse = match (raw.eig1, raw.eig2) {
        (Some(eig1), Some(eig2)) => Some(EllipseShape {
            eig1,
            eig2,
            angle_deg: raw.angle_deg.unwrap_or(0.0),
        }),
        _ => None,
    };

    Some(ClusterOverlay {
        centroid_x,
        centroid_y,
        ellipse,
    })
}

pub(crate) fn parse_document(raw: &str) -> Result<RawDocument> {
    serde_json::from_str(raw).context("invalid graph document JSON")
}

pub(crate) fn model_from_documents(base: RawDocument, gmm: Option<RawDocument>) -> GraphModel {
    let mut nodes = Vec::with_capacity(base.nodes.len());
    for raw in &base.nodes {
        let Some(kind) = parse_node_kind(&raw.kind) else {
            log::debug!("skipping node {} with unknown type {}", raw.id, raw.kind);
            continue;
        };

        nodes.push(GraphNode {
            id: raw.id.clone(),
            kind,
            name: raw.name.clone(),
            cluster_id: raw.cluster_id.as_ref().and_then(cluster_id_value),
            aisle_name: raw.aisle_name.clone(),
        });
    }

    let edges = base
        .links
        .iter()
        .filter_map(|raw| {
            let kind = parse_edge_kind(&raw.kind)?;
            Some(GraphEdge {
                source: raw.source.clone(),
                target: raw.target.clone(),
                kind,
                weight: raw.weight,
            })
        })
        .collect();

    let mut buckets_by_cluster: HashMap<u32, Vec<BucketEntry>> = HashMap::new();
    for (raw_key, entries) in &base.drilldown.cluster_to_products {
        let Some(key) = parse_cluster_key(raw_key) else {
            log::debug!("skipping drilldown set with non-numeric key {raw_key}");
            continue;
        };

        let buckets = buckets_by_cluster.entry(key).or_default();
        for entry in entries {
            if parse_node_kind(&entry.kind) == Some(NodeKind::Bucket) {
                buckets.push(BucketEntry {
                    id: entry.id.clone(),
                    name: entry.name.clone(),
                });
            }
        }
    }

    let mut overlays = HashMap::new();
    if let Some(gmm) = gmm {
        for raw in &gmm.nodes {
            if parse_node_kind(&raw.kind) != Some(NodeKind::Cluster) {
                continue;
            }
            if let Some(overlay) = overlay_from_raw(raw) {
                overlays.insert(raw.id.clone(), overlay);
            }
        }
    }

    let augmented = !overlays.is_empty();

    GraphModel {
        nodes,
        edges,
        buckets_by_cluster,
        overlays,
        augmented,
    }
}

/// Load and merge the base topology and the optional GMM augmentation.
///
/// The base document is required: any failure there is returned to the
/// caller. The augmentation fails soft; an unreadable or unusable document
/// only produces an unaugmented model.
pub fn load_model(graph_path: &Path, gmm_path: Option<&Path>) -> Result<GraphModel> {
    let base_raw = fs::read_to_string(graph_path)
        .with_context(|| format!("failed to read graph document {}", graph_path.display()))?;
    let base = parse_document(&base_raw)
        .with_context(|| format!("failed to parse graph document {}", graph_path.display()))?;

    let gmm = gmm_path.and_then(|path| {
        let attempt = fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|raw| parse_document(&raw));
        match attempt {
            Ok(document) => Some(document),
            Err(error) => {
                log::warn!(
                    "GMM augmentation unavailable ({}): {error:#}",
                    path.display()
                );
                None
            }
        }
    });

    Ok(model_from_documents(base, gmm))
}
