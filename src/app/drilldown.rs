use std::collections::HashSet;

use eframe::egui::{
    self, Align2, Color32, Context, FontId, Rect, Sense, Stroke, Ui, Vec2, vec2,
};

use crate::data::{EdgeKind, GraphModel};
use crate::util::stable_pair;

use super::layout::BUCKET_RADIUS;
use super::physics::{SimParams, Simulation};
use super::scene::{BACKGROUND, ClusterMarker, edge_stroke, with_opacity};
use super::viewport::{PANEL_SCALE_RANGE, Viewport};

/// World-space extent of the panel scene. The simulation centers on the
/// middle of this box; the panel camera maps it to the window body.
const PANEL_WORLD: Vec2 = vec2(860.0, 520.0);
const SEED_SPREAD: f32 = 0.25;

pub(in crate::app) struct BucketMarker {
    pub name: String,
    pub pos: Vec2,
}

/// Per-cluster drilldown: bucket markers, derived nearest-neighbor
/// links, and a scoped simulation plus camera. Dropped wholesale when
/// the panel closes; reopening rebuilds from the model.
pub(in crate::app) struct DrilldownPanel {
    pub cluster_index: usize,
    title: String,
    color: Color32,
    buckets: Vec<BucketMarker>,
    links: Vec<(usize, usize)>,
    sim: Simulation,
    viewport: Viewport,
    drag: Option<usize>,
}

/// Sparse neighborhood: each bucket contributes one undirected link to
/// its nearest neighbor, deduplicated as unordered pairs. Never more
/// links than buckets.
pub(in crate::app) fn nearest_neighbor_links(positions: &[Vec2]) -> Vec<(usize, usize)> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for (i, &pos) in positions.iter().enumerate() {
        let nearest = positions
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .map(|(j, &other)| (j, (other - pos).length_sq()))
            .min_by(|a, b| a.1.total_cmp(&b.1));

        if let Some((j, _)) = nearest {
            let pair = (i.min(j), i.max(j));
            if seen.insert(pair) {
                links.push(pair);
            }
        }
    }

    links
}

impl DrilldownPanel {
    pub fn open(cluster_index: usize, marker: &ClusterMarker, model: &GraphModel) -> Self {
        let entries = marker
            .number
            .map(|number| model.cluster_buckets(number))
            .unwrap_or_default();

        let title = format!(
            "{} - {} - P1 Buckets ({})",
            marker.name,
            marker.aisle_name.as_deref().unwrap_or("Unknown Aisle"),
            entries.len()
        );

        let center = PANEL_WORLD * 0.5;
        let buckets: Vec<BucketMarker> = entries
            .iter()
            .map(|entry| {
                let (jx, jy) = stable_pair(&entry.id);
                BucketMarker {
                    name: entry.name.clone(),
                    pos: center
                        + vec2(
                            jx * PANEL_WORLD.x * SEED_SPREAD,
                            jy * PANEL_WORLD.y * SEED_SPREAD,
                        ),
                }
            })
            .collect();

        let positions: Vec<Vec2> = buckets.iter().map(|bucket| bucket.pos).collect();
        let links = nearest_neighbor_links(&positions);
        let sim = Simulation::new(positions, links.clone(), SimParams::panel(center));

        Self {
            cluster_index,
            title,
            color: marker.color,
            buckets,
            links,
            sim,
            viewport: Viewport::new(PANEL_SCALE_RANGE),
            drag: None,
        }
    }

    /// Returns false once the user closed the window.
    pub fn show(&mut self, ctx: &Context) -> bool {
        let mut open = true;
        egui::Window::new(self.title.clone())
            .id(egui::Id::new("cluster_drilldown"))
            .open(&mut open)
            .collapsible(false)
            .resizable(true)
            .default_size(vec2(720.0, 480.0))
            .show(ctx, |ui| self.body(ui));
        open
    }

    fn body(&mut self, ui: &mut Ui) {
        let size = ui.available_size().max(vec2(480.0, 320.0));
        let (rect, response) = ui.allocate_exact_size(size, Sense::click_and_drag());
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 4.0, BACKGROUND);

        if self.buckets.is_empty() {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "No buckets recorded for this cluster.",
                FontId::proportional(14.0),
                Color32::from_rgb(108, 117, 125),
            );
            return;
        }

        let now = ui.ctx().input(|input| input.time);
        let pointer = ui.input(|input| input.pointer.hover_pos());

        if response.hovered() {
            let scroll = ui.input(|input| input.raw_scroll_delta.y);
            if scroll.abs() > f32::EPSILON {
                let anchor = pointer.unwrap_or_else(|| rect.center());
                let factor = (1.0 + scroll * 0.0018).clamp(0.85, 1.15);
                self.viewport.zoom_at(anchor - rect.min, factor);
            }
        }

        let transform = self.viewport.transform(now);
        let radius = BUCKET_RADIUS * transform.scale;

        let hovered = pointer.and_then(|p| {
            self.buckets
                .iter()
                .enumerate()
                .filter_map(|(index, bucket)| {
                    let distance = transform.world_to_screen(rect, bucket.pos).distance(p);
                    (distance <= radius).then_some((index, distance))
                })
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(index, _)| index)
        });

        if response.drag_started_by(egui::PointerButton::Primary)
            && let Some(index) = hovered
        {
            self.drag = Some(index);
            self.sim.reheat();
        }

        if let Some(index) = self.drag {
            if response.dragged_by(egui::PointerButton::Primary)
                && let Some(p) = pointer
            {
                self.sim.pin(index, transform.screen_to_world(rect, p));
            }
            if response.drag_stopped() {
                self.sim.release(index);
                self.sim.cool();
                self.drag = None;
            }
        } else if response.dragged_by(egui::PointerButton::Primary)
            || response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            self.viewport.pan(response.drag_delta());
        }

        let moving = self.sim.step();
        if moving {
            for (bucket, pos) in self.buckets.iter_mut().zip(self.sim.snapshot()) {
                bucket.pos = pos;
            }
        }
        if moving || response.dragged() {
            ui.ctx().request_repaint();
        }

        let link_stroke = edge_stroke(EdgeKind::BucketNeighbor, 1.0);
        for &(a, b) in &self.links {
            painter.line_segment(
                [
                    transform.world_to_screen(rect, self.buckets[a].pos),
                    transform.world_to_screen(rect, self.buckets[b].pos),
                ],
                link_stroke,
            );
        }

        for (index, bucket) in self.buckets.iter().enumerate() {
            let center = transform.world_to_screen(rect, bucket.pos);
            painter.circle_filled(center, radius, self.color);
            painter.circle_stroke(center, radius, Stroke::new(1.5, Color32::WHITE));
            painter.text(
                center,
                Align2::CENTER_CENTER,
                (index + 1).to_string(),
                FontId::proportional((12.0 * transform.scale).clamp(5.0, 40.0)),
                Color32::WHITE,
            );
        }

        if let (Some(index), Some(p)) = (hovered, pointer) {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });

            let galley = painter.layout_no_wrap(
                self.buckets[index].name.clone(),
                FontId::proportional(13.0),
                Color32::WHITE,
            );
            let origin = p + vec2(14.0, -12.0);
            let bg = Rect::from_min_size(origin, galley.size() + vec2(12.0, 8.0));
            painter.rect_filled(bg, 4.0, with_opacity(Color32::from_rgb(33, 37, 41), 0.9));
            painter.galley(bg.min + vec2(6.0, 4.0), galley, Color32::WHITE);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::BucketEntry;
    use std::collections::HashMap;

    fn marker(number: Option<u32>) -> ClusterMarker {
        ClusterMarker {
            id: "P2_4".to_owned(),
            name: "Cluster 4".to_owned(),
            number,
            aisle_name: Some("Dairy".to_owned()),
            pos: Vec2::ZERO,
            ellipse: None,
            color: Color32::from_rgb(78, 121, 167),
        }
    }

    fn model_with_buckets(count: usize) -> GraphModel {
        let mut buckets_by_cluster = HashMap::new();
        buckets_by_cluster.insert(
            4,
            (0..count)
                .map(|i| BucketEntry {
                    id: format!("P1_b{i}"),
                    name: format!("Bucket {i}"),
                })
                .collect(),
        );
        GraphModel {
            buckets_by_cluster,
            ..GraphModel::default()
        }
    }

    #[test]
    fn panel_builds_markers_and_sparse_links() {
        let model = model_with_buckets(4);
        let panel = DrilldownPanel::open(0, &marker(Some(4)), &model);

        assert_eq!(panel.buckets.len(), 4);
        assert_eq!(panel.title, "Cluster 4 - Dairy - P1 Buckets (4)");
        // One nearest neighbor each, deduplicated: between n/2 and n.
        assert!((2..=4).contains(&panel.links.len()));
    }

    #[test]
    fn empty_bucket_set_is_valid() {
        let model = model_with_buckets(0);
        let panel = DrilldownPanel::open(0, &marker(Some(4)), &model);

        assert!(panel.buckets.is_empty());
        assert!(panel.links.is_empty());
        assert_eq!(panel.title, "Cluster 4 - Dairy - P1 Buckets (0)");
    }

    #[test]
    fn unknown_cluster_number_yields_empty_panel() {
        let model = model_with_buckets(4);
        let panel = DrilldownPanel::open(0, &marker(None), &model);
        assert!(panel.buckets.is_empty());
    }

    #[test]
    fn nearest_neighbor_links_deduplicate_mutual_pairs() {
        // Two tight pairs far apart: mutual nearest neighbors collapse
        // to one link each.
        let positions = vec![
            vec2(0.0, 0.0),
            vec2(1.0, 0.0),
            vec2(100.0, 0.0),
            vec2(101.0, 0.0),
        ];
        let links = nearest_neighbor_links(&positions);
        assert_eq!(links, vec![(0, 1), (2, 3)]);
    }

    #[test]
    fn links_never_exceed_bucket_count() {
        let positions: Vec<Vec2> = (0..9)
            .map(|i| vec2((i % 3) as f32 * 10.0, (i / 3) as f32 * 17.0))
            .collect();
        let links = nearest_neighbor_links(&positions);
        assert!(links.len() <= positions.len());
        for &(a, b) in &links {
            assert!(a < b, "pairs are stored unordered as (min, max)");
        }
    }

    #[test]
    fn seed_positions_are_deterministic() {
        let model = model_with_buckets(5);
        let first = DrilldownPanel::open(0, &marker(Some(4)), &model);
        let second = DrilldownPanel::open(0, &marker(Some(4)), &model);

        for (a, b) in first.buckets.iter().zip(&second.buckets) {
            assert_eq!(a.pos, b.pos);
        }
    }
}
