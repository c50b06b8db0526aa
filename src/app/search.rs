use crate::data::GraphModel;

use super::scene::Scene;

/// Outcome of one search submission, ordered by resolution tier:
/// exact aisle, "cluster N", bare numeric id, aisle substring, bucket
/// substring. The first tier that matches wins; later tiers are never
/// consulted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(in crate::app) enum SearchAction {
    /// Empty query: clear the status line, touch nothing else.
    ClearStatus,
    NotFound,
    FocusAisle(usize),
    FocusCluster {
        index: usize,
        open_panel: bool,
        via_product: bool,
    },
}

pub(in crate::app) fn resolve_query(query: &str, scene: &Scene, model: &GraphModel) -> SearchAction {
    let term = query.trim().to_lowercase();
    if term.is_empty() {
        return SearchAction::ClearStatus;
    }

    if let Some(index) = scene
        .aisles
        .iter()
        .position(|aisle| aisle.name.to_lowercase() == term)
    {
        return SearchAction::FocusAisle(index);
    }

    if let Some(rest) = term.strip_prefix("cluster")
        && let Ok(number) = rest.trim().parse::<u32>()
        && let Some(&index) = scene.index_by_number.get(&number)
    {
        return SearchAction::FocusCluster {
            index,
            open_panel: false,
            via_product: false,
        };
    }

    if let Ok(number) = term.parse::<u32>()
        && let Some(&index) = scene.index_by_number.get(&number)
    {
        return SearchAction::FocusCluster {
            index,
            open_panel: false,
            via_product: false,
        };
    }

    if let Some(index) = scene
        .aisles
        .iter()
        .position(|aisle| aisle.name.to_lowercase().contains(&term))
    {
        return SearchAction::FocusAisle(index);
    }

    // Bucket names resolve to the owning cluster. Keys are walked in
    // sorted order so ties break the same way every time.
    let mut cluster_ids: Vec<u32> = model.buckets_by_cluster.keys().copied().collect();
    cluster_ids.sort_unstable();
    for cluster_id in cluster_ids {
        let buckets = model.cluster_buckets(cluster_id);
        if buckets
            .iter()
            .any(|bucket| bucket.name.to_lowercase().contains(&term))
            && let Some(&index) = scene.index_by_number.get(&cluster_id)
        {
            return SearchAction::FocusCluster {
                index,
                open_panel: true,
                via_product: true,
            };
        }
    }

    SearchAction::NotFound
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{BucketEntry, GraphNode, NodeKind};
    use eframe::egui::vec2;
    use std::collections::HashMap;

    fn node(id: &str, kind: NodeKind, name: &str, cluster_id: Option<u32>) -> GraphNode {
        GraphNode {
            id: id.to_owned(),
            kind,
            name: name.to_owned(),
            cluster_id,
            aisle_name: None,
        }
    }

    fn model() -> GraphModel {
        let mut buckets_by_cluster = HashMap::new();
        buckets_by_cluster.insert(
            7,
            vec![BucketEntry {
                id: "P1_oat_milk".to_owned(),
                name: "Oat Milk 1L".to_owned(),
            }],
        );
        buckets_by_cluster.insert(
            3,
            vec![BucketEntry {
                id: "P1_rye".to_owned(),
                name: "Rye Bread".to_owned(),
            }],
        );

        GraphModel {
            nodes: vec![
                node("P3_Dairy", NodeKind::Aisle, "Dairy & Eggs", None),
                node("P3_Specials", NodeKind::Aisle, "Cluster 7 Specials", None),
                node("P2_3", NodeKind::Cluster, "Cluster 3", Some(3)),
                node("P2_7", NodeKind::Cluster, "Cluster 7", Some(7)),
            ],
            buckets_by_cluster,
            ..GraphModel::default()
        }
    }

    fn scene(model: &GraphModel) -> Scene {
        Scene::build(model, vec2(800.0, 600.0))
    }

    #[test]
    fn empty_query_clears_status() {
        let model = model();
        let scene = scene(&model);
        assert_eq!(resolve_query("   ", &scene, &model), SearchAction::ClearStatus);
    }

    #[test]
    fn exact_aisle_wins_over_everything() {
        let model = model();
        let scene = scene(&model);
        assert_eq!(
            resolve_query("cluster 7 specials", &scene, &model),
            SearchAction::FocusAisle(1)
        );
    }

    #[test]
    fn cluster_prefix_resolves_by_numeric_id_not_aisle_substring() {
        let model = model();
        let scene = scene(&model);

        // An aisle containing the literal text "Cluster 7" must not
        // shadow the numeric-id tier.
        assert_eq!(
            resolve_query("Cluster 7", &scene, &model),
            SearchAction::FocusCluster {
                index: 1,
                open_panel: false,
                via_product: false,
            }
        );
    }

    #[test]
    fn bare_number_resolves_to_cluster() {
        let model = model();
        let scene = scene(&model);
        assert_eq!(
            resolve_query("3", &scene, &model),
            SearchAction::FocusCluster {
                index: 0,
                open_panel: false,
                via_product: false,
            }
        );
    }

    #[test]
    fn unknown_cluster_number_falls_through_to_aisle_substring() {
        let model = model();
        let scene = scene(&model);

        // No cluster 99 exists; "Cluster 99" is not an aisle substring
        // either, so the query misses entirely.
        assert_eq!(
            resolve_query("cluster 99", &scene, &model),
            SearchAction::NotFound
        );

        // But a partial aisle name still matches once numeric tiers miss.
        assert_eq!(
            resolve_query("dairy", &scene, &model),
            SearchAction::FocusAisle(0)
        );
    }

    #[test]
    fn bucket_substring_resolves_to_owning_cluster_and_opens_panel() {
        let model = model();
        let scene = scene(&model);
        assert_eq!(
            resolve_query("oat milk", &scene, &model),
            SearchAction::FocusCluster {
                index: 1,
                open_panel: true,
                via_product: true,
            }
        );
    }

    #[test]
    fn miss_reports_not_found() {
        let model = model();
        let scene = scene(&model);
        assert_eq!(
            resolve_query("plutonium", &scene, &model),
            SearchAction::NotFound
        );
    }
}
