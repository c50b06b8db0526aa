use std::collections::HashMap;

use eframe::egui::{
    self, Align2, Color32, FontId, Pos2, Rect, Sense, Shape, Stroke, Ui, Vec2, vec2,
};

use crate::data::{EdgeKind, GraphModel};

use super::layout::{
    BOUNDS_PAD, Bounds, CLUSTER_RADIUS, EllipseParams, aisle_grid_positions, bounds_of,
    cluster_position, ellipse_params, fit_transform,
};
use super::physics::{SimParams, Simulation};
use super::viewport::Transform;
use super::{Highlight, ViewModel};

pub(in crate::app) const BACKGROUND: Color32 = Color32::from_rgb(248, 249, 250);
const MARKER_STROKE: Color32 = Color32::WHITE;
const HIGHLIGHT_STROKE: Color32 = Color32::from_rgb(214, 39, 40);
const FALLBACK_AISLE_COLOR: Color32 = Color32::from_rgb(136, 136, 136);
const ELLIPSE_FILL_ALPHA: u8 = 31;
const DIM_MARKER_OPACITY: f32 = 0.15;
const DIM_ELLIPSE_OPACITY: f32 = 0.1;

/// Tableau 10 followed by Category 10; cycled over aisles in sorted
/// name order so an aisle keeps its color across rebuilds.
const AISLE_PALETTE: [Color32; 20] = [
    Color32::from_rgb(78, 121, 167),
    Color32::from_rgb(242, 142, 44),
    Color32::from_rgb(225, 87, 89),
    Color32::from_rgb(118, 183, 178),
    Color32::from_rgb(89, 161, 79),
    Color32::from_rgb(237, 201, 73),
    Color32::from_rgb(175, 122, 161),
    Color32::from_rgb(255, 157, 167),
    Color32::from_rgb(156, 117, 95),
    Color32::from_rgb(186, 176, 171),
    Color32::from_rgb(31, 119, 180),
    Color32::from_rgb(255, 127, 14),
    Color32::from_rgb(44, 160, 44),
    Color32::from_rgb(214, 39, 40),
    Color32::from_rgb(148, 103, 189),
    Color32::from_rgb(140, 86, 75),
    Color32::from_rgb(227, 119, 194),
    Color32::from_rgb(127, 127, 127),
    Color32::from_rgb(188, 189, 34),
    Color32::from_rgb(23, 190, 207),
];

pub(in crate::app) fn with_opacity(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        color.r(),
        color.g(),
        color.b(),
        (color.a() as f32 * factor) as u8,
    )
}

/// Stroke per edge class. Similarity edges thicken with link weight.
pub(in crate::app) fn edge_stroke(kind: EdgeKind, weight: f32) -> Stroke {
    match kind {
        EdgeKind::ClusterToAisle => Stroke::new(
            1.1,
            Color32::from_rgba_unmultiplied(154, 160, 166, 140),
        ),
        EdgeKind::ClusterSimilarity => Stroke::new(
            1.2 + weight.clamp(0.0, 1.0) * 0.8,
            Color32::from_rgba_unmultiplied(13, 110, 253, 90),
        ),
        EdgeKind::BucketNeighbor => Stroke::new(
            2.0,
            Color32::from_rgba_unmultiplied(74, 144, 226, 153),
        ),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum ClusterFilter {
    All,
    Only(u32),
}

impl ClusterFilter {
    fn passes(self, number: Option<u32>) -> bool {
        match self {
            Self::All => true,
            Self::Only(id) => number == Some(id),
        }
    }
}

pub(in crate::app) struct AisleAnchor {
    pub name: String,
    pub pos: Vec2,
}

pub(in crate::app) struct ClusterMarker {
    pub id: String,
    pub name: String,
    pub number: Option<u32>,
    pub aisle_name: Option<String>,
    pub pos: Vec2,
    pub ellipse: Option<EllipseParams>,
    pub color: Color32,
}

impl ClusterMarker {
    pub fn label(&self) -> String {
        self.number.map(|n| n.to_string()).unwrap_or_default()
    }
}

/// Resolved scene edge. `other` indexes aisles for ClusterToAisle and
/// clusters for ClusterSimilarity.
pub(in crate::app) struct SceneEdge {
    pub kind: EdgeKind,
    pub cluster: usize,
    pub other: usize,
    pub weight: f32,
}

/// Built once per loaded model: placed anchors and markers, resolved
/// edges, and the relaxation simulation over the cluster markers.
pub(in crate::app) struct Scene {
    pub container: Vec2,
    pub aisles: Vec<AisleAnchor>,
    pub clusters: Vec<ClusterMarker>,
    pub index_by_number: HashMap<u32, usize>,
    pub edges: Vec<SceneEdge>,
    pub sim: Simulation,
}

impl Scene {
    pub fn build(model: &GraphModel, container: Vec2) -> Self {
        let mut aisle_names: Vec<&str> = model.aisles().map(|a| a.name.as_str()).collect();
        aisle_names.sort_unstable();
        let palette: HashMap<&str, Color32> = aisle_names
            .iter()
            .enumerate()
            .map(|(index, name)| (*name, AISLE_PALETTE[index % AISLE_PALETTE.len()]))
            .collect();

        let grid = aisle_grid_positions(model.aisles().count(), container.x);
        let aisles: Vec<AisleAnchor> = model
            .aisles()
            .zip(grid)
            .map(|(node, pos)| AisleAnchor {
                name: node.name.clone(),
                pos,
            })
            .collect();

        let clusters: Vec<ClusterMarker> = model
            .clusters()
            .map(|node| {
                let overlay = model.overlays.get(&node.id);
                let color = node
                    .aisle_name
                    .as_deref()
                    .and_then(|aisle| palette.get(aisle).copied())
                    .unwrap_or(FALLBACK_AISLE_COLOR);

                ClusterMarker {
                    id: node.id.clone(),
                    name: node.name.clone(),
                    number: node.cluster_number(),
                    aisle_name: node.aisle_name.clone(),
                    pos: cluster_position(overlay, &node.id, container),
                    ellipse: overlay.and_then(|o| o.ellipse.as_ref().map(ellipse_params)),
                    color,
                }
            })
            .collect();

        let mut index_by_number = HashMap::new();
        for (index, marker) in clusters.iter().enumerate() {
            if let Some(number) = marker.number {
                index_by_number.insert(number, index);
            }
        }

        let cluster_by_id: HashMap<&str, usize> = clusters
            .iter()
            .enumerate()
            .map(|(index, marker)| (marker.id.as_str(), index))
            .collect();
        let aisle_by_id: HashMap<String, usize> = model
            .aisles()
            .enumerate()
            .map(|(index, node)| (node.id.clone(), index))
            .collect();

        // Edges with a missing endpoint are unrenderable and dropped here.
        let edges = model
            .edges
            .iter()
            .filter_map(|edge| {
                let (cluster, other) = match edge.kind {
                    EdgeKind::ClusterToAisle => (
                        cluster_by_id.get(edge.source.as_str()).copied()?,
                        aisle_by_id.get(edge.target.as_str()).copied()?,
                    ),
                    EdgeKind::ClusterSimilarity => (
                        cluster_by_id.get(edge.source.as_str()).copied()?,
                        cluster_by_id.get(edge.target.as_str()).copied()?,
                    ),
                    EdgeKind::BucketNeighbor => return None,
                };
                Some(SceneEdge {
                    kind: edge.kind,
                    cluster,
                    other,
                    weight: edge.weight,
                })
            })
            .collect();

        let sim = Simulation::new(
            clusters.iter().map(|marker| marker.pos).collect(),
            Vec::new(),
            SimParams::scene(),
        );

        Self {
            container,
            aisles,
            clusters,
            index_by_number,
            edges,
            sim,
        }
    }

    /// Advance the relaxation and sync marker positions from the
    /// snapshot. Returns whether anything is still moving.
    pub fn tick(&mut self) -> bool {
        let moving = self.sim.step();
        if moving {
            for (marker, pos) in self.clusters.iter_mut().zip(self.sim.snapshot()) {
                marker.pos = pos;
            }
        }
        moving
    }

    pub fn bounds(&self) -> Option<Bounds> {
        let points = self
            .clusters
            .iter()
            .map(|marker| marker.pos)
            .chain(self.aisles.iter().map(|anchor| anchor.pos));
        bounds_of(points, CLUSTER_RADIUS, BOUNDS_PAD)
    }

    fn edge_endpoints(&self, edge: &SceneEdge) -> Option<(Vec2, Vec2)> {
        let from = self.clusters.get(edge.cluster)?.pos;
        let to = match edge.kind {
            EdgeKind::ClusterToAisle => self.aisles.get(edge.other)?.pos,
            EdgeKind::ClusterSimilarity => self.clusters.get(edge.other)?.pos,
            EdgeKind::BucketNeighbor => return None,
        };
        Some((from, to))
    }
}

fn hovered_cluster(
    scene: &Scene,
    transform: Transform,
    rect: Rect,
    pointer: Pos2,
) -> Option<usize> {
    let radius = CLUSTER_RADIUS * transform.scale;
    scene
        .clusters
        .iter()
        .enumerate()
        .filter_map(|(index, marker)| {
            let distance = transform.world_to_screen(rect, marker.pos).distance(pointer);
            (distance <= radius).then_some((index, distance))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(index, _)| index)
}

fn ellipse_points(center: Vec2, params: &EllipseParams) -> Vec<Vec2> {
    const SEGMENTS: usize = 48;
    let angle = params.angle_deg.to_radians();
    let (sin, cos) = angle.sin_cos();

    (0..=SEGMENTS)
        .map(|step| {
            let t = step as f32 / SEGMENTS as f32 * std::f32::consts::TAU;
            let local = vec2(params.rx * t.cos(), params.ry * t.sin());
            center + vec2(local.x * cos - local.y * sin, local.x * sin + local.y * cos)
        })
        .collect()
}

impl ViewModel {
    pub(in crate::app) fn draw_scene(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, BACKGROUND);

        let now = ui.ctx().input(|input| input.time);
        self.ensure_scene(rect.size());

        if response.hovered() {
            let scroll = ui.input(|input| input.raw_scroll_delta.y);
            if scroll.abs() > f32::EPSILON {
                let pointer = ui
                    .input(|input| input.pointer.hover_pos())
                    .unwrap_or_else(|| rect.center());
                let factor = (1.0 + scroll * 0.0018).clamp(0.85, 1.15);
                self.viewport.zoom_at(pointer - rect.min, factor);
            }
        }

        let transform = self.viewport.transform(now);
        if self.viewport.is_animating() {
            ui.ctx().request_repaint();
        }

        // Expire the timed focus highlight.
        let highlighted = match self.highlight {
            Some(Highlight { cluster, until }) if now < until => {
                ui.ctx()
                    .request_repaint_after(std::time::Duration::from_secs_f64(until - now));
                Some(cluster)
            }
            Some(_) => {
                self.highlight = None;
                None
            }
            None => None,
        };

        let filter = self.filter;
        let pointer = ui.input(|input| input.pointer.hover_pos());
        let mut pending_open = None;

        let Some(scene) = self.scene.as_mut() else {
            return;
        };

        let hovered = pointer.and_then(|p| hovered_cluster(scene, transform, rect, p));

        if response.drag_started_by(egui::PointerButton::Primary)
            && let Some(index) = hovered
        {
            self.drag = Some(index);
            scene.sim.reheat();
        }

        if let Some(index) = self.drag {
            if response.dragged_by(egui::PointerButton::Primary)
                && let Some(p) = pointer
            {
                scene.sim.pin(index, transform.screen_to_world(rect, p));
            }
            if response.drag_stopped() {
                scene.sim.release(index);
                scene.sim.cool();
                self.drag = None;
            }
        } else if response.dragged_by(egui::PointerButton::Primary)
            || response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            self.viewport.pan(response.drag_delta());
        }

        let moving = scene.tick();
        if moving || response.dragged() {
            ui.ctx().request_repaint();
        }

        for edge in &scene.edges {
            let Some((from, to)) = scene.edge_endpoints(edge) else {
                continue;
            };
            painter.line_segment(
                [
                    transform.world_to_screen(rect, from),
                    transform.world_to_screen(rect, to),
                ],
                edge_stroke(edge.kind, edge.weight),
            );
        }

        for marker in &scene.clusters {
            let Some(params) = &marker.ellipse else {
                continue;
            };

            let passes = filter.passes(marker.number);
            let opacity = if passes { 1.0 } else { DIM_ELLIPSE_OPACITY };
            let boosted = filter != ClusterFilter::All && passes;
            let stroke_width = if boosted { 3.0 } else { 2.5 };

            let points: Vec<Pos2> = ellipse_points(marker.pos, params)
                .into_iter()
                .map(|world| transform.world_to_screen(rect, world))
                .collect();

            let fill = with_opacity(
                Color32::from_rgba_unmultiplied(
                    marker.color.r(),
                    marker.color.g(),
                    marker.color.b(),
                    ELLIPSE_FILL_ALPHA,
                ),
                opacity,
            );
            painter.add(Shape::convex_polygon(
                points[..points.len() - 1].to_vec(),
                fill,
                Stroke::NONE,
            ));
            painter.extend(Shape::dashed_line(
                &points,
                Stroke::new(stroke_width, with_opacity(marker.color, opacity)),
                8.0,
                4.0,
            ));
        }

        let marker_radius = CLUSTER_RADIUS * transform.scale;
        for (index, marker) in scene.clusters.iter().enumerate() {
            let center = transform.world_to_screen(rect, marker.pos);
            let opacity = if filter.passes(marker.number) {
                1.0
            } else {
                DIM_MARKER_OPACITY
            };

            painter.circle_filled(center, marker_radius, with_opacity(marker.color, opacity));
            let stroke = if highlighted == Some(index) {
                Stroke::new(3.0, HIGHLIGHT_STROKE)
            } else {
                Stroke::new(1.2, with_opacity(MARKER_STROKE, opacity))
            };
            painter.circle_stroke(center, marker_radius, stroke);

            let label = marker.label();
            if !label.is_empty() {
                let font_size = (11.0 * transform.scale).clamp(5.0, 44.0);
                painter.text(
                    center,
                    Align2::CENTER_CENTER,
                    label,
                    FontId::proportional(font_size),
                    with_opacity(Color32::WHITE, opacity),
                );
            }
        }

        if hovered.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
            if response.clicked_by(egui::PointerButton::Primary) && self.drag.is_none() {
                pending_open = hovered;
            }
        }

        if let Some(index) = pending_open {
            self.open_cluster(index, now);
        }
    }

    fn ensure_scene(&mut self, container: Vec2) {
        if self.scene.is_some() {
            return;
        }

        let scene = Scene::build(&self.model, container);
        if let Some(bounds) = scene.bounds() {
            self.viewport.apply(fit_transform(&bounds, container), None);
        }
        self.status = if self.model.augmented {
            "GMM layout active. Drag clusters; click a cluster to explore products.".to_owned()
        } else {
            "GMM layout unavailable: statistical augmentation missing; using fallback placement."
                .to_owned()
        };
        self.scene = Some(scene);
    }

    pub(in crate::app) fn fit_view(&mut self, now: f64) {
        let Some(scene) = &self.scene else {
            return;
        };
        if let Some(bounds) = scene.bounds() {
            let target = fit_transform(&bounds, scene.container);
            self.viewport
                .apply(target, Some((now, super::viewport::FIT_ANIMATION_SECS)));
        }
    }

    pub(in crate::app) fn focus_cluster(&mut self, index: usize, now: f64) {
        let Some(scene) = &self.scene else {
            return;
        };
        let Some(marker) = scene.clusters.get(index) else {
            return;
        };
        self.viewport.focus(
            marker.pos,
            super::viewport::FOCUS_SCALE,
            scene.container,
            now,
        );
        self.highlight = Some(Highlight {
            cluster: index,
            until: now + super::HIGHLIGHT_SECS,
        });
    }

    pub(in crate::app) fn focus_aisle(&mut self, index: usize, now: f64) {
        let Some(scene) = &self.scene else {
            return;
        };
        let Some(anchor) = scene.aisles.get(index) else {
            return;
        };
        self.viewport.focus(
            anchor.pos,
            super::viewport::FOCUS_SCALE,
            scene.container,
            now,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{GraphEdge, GraphNode, NodeKind};

    fn aisle(id: &str, name: &str) -> GraphNode {
        GraphNode {
            id: id.to_owned(),
            kind: NodeKind::Aisle,
            name: name.to_owned(),
            cluster_id: None,
            aisle_name: None,
        }
    }

    fn cluster(id: &str, name: &str, number: Option<u32>, aisle: &str) -> GraphNode {
        GraphNode {
            id: id.to_owned(),
            kind: NodeKind::Cluster,
            name: name.to_owned(),
            cluster_id: number,
            aisle_name: Some(aisle.to_owned()),
        }
    }

    fn unaugmented_model() -> GraphModel {
        GraphModel {
            nodes: vec![
                aisle("P3_Dairy", "Dairy"),
                aisle("P3_Bakery", "Bakery"),
                cluster("P2_1", "Cluster 1", Some(1), "Dairy"),
                cluster("P2_2", "Cluster 2", None, "Bakery"),
                cluster("P2_5", "Cluster 5", Some(5), "Dairy"),
            ],
            edges: vec![
                GraphEdge {
                    source: "P2_1".to_owned(),
                    target: "P3_Dairy".to_owned(),
                    kind: EdgeKind::ClusterToAisle,
                    weight: 1.0,
                },
                GraphEdge {
                    source: "P2_1".to_owned(),
                    target: "P2_5".to_owned(),
                    kind: EdgeKind::ClusterSimilarity,
                    weight: 0.5,
                },
                // Dangling endpoint: must be filtered, not a crash.
                GraphEdge {
                    source: "P2_1".to_owned(),
                    target: "P3_Missing".to_owned(),
                    kind: EdgeKind::ClusterToAisle,
                    weight: 1.0,
                },
            ],
            ..GraphModel::default()
        }
    }

    #[test]
    fn unaugmented_scene_has_markers_but_no_ellipses() {
        let scene = Scene::build(&unaugmented_model(), vec2(800.0, 600.0));

        assert_eq!(scene.clusters.len(), 3);
        assert_eq!(scene.aisles.len(), 2);
        assert!(scene.clusters.iter().all(|marker| marker.ellipse.is_none()));
    }

    #[test]
    fn dangling_edges_are_filtered() {
        let scene = Scene::build(&unaugmented_model(), vec2(800.0, 600.0));
        assert_eq!(scene.edges.len(), 2);
    }

    #[test]
    fn cluster_numbers_fall_back_to_name_parsing() {
        let scene = Scene::build(&unaugmented_model(), vec2(800.0, 600.0));

        // P2_2 has no explicit id; "Cluster 2" parses to 2.
        assert_eq!(scene.index_by_number.get(&2), Some(&1));
        assert_eq!(scene.clusters[1].label(), "2");
    }

    #[test]
    fn aisle_colors_are_deterministic() {
        let first = Scene::build(&unaugmented_model(), vec2(800.0, 600.0));
        let second = Scene::build(&unaugmented_model(), vec2(800.0, 600.0));

        for (a, b) in first.clusters.iter().zip(&second.clusters) {
            assert_eq!(a.color, b.color);
        }

        // Same aisle, same color.
        assert_eq!(first.clusters[0].color, first.clusters[2].color);
        assert_ne!(first.clusters[0].color, first.clusters[1].color);
    }

    #[test]
    fn filter_dimming_is_pure_presentation() {
        assert!(ClusterFilter::All.passes(Some(3)));
        assert!(ClusterFilter::All.passes(None));
        assert!(ClusterFilter::Only(3).passes(Some(3)));
        assert!(!ClusterFilter::Only(3).passes(Some(4)));
        assert!(!ClusterFilter::Only(3).passes(None));
    }

    #[test]
    fn ellipse_outline_respects_rotation() {
        let params = EllipseParams {
            rx: 40.0,
            ry: 10.0,
            angle_deg: 90.0,
        };
        let points = ellipse_points(vec2(0.0, 0.0), &params);

        // Rotated 90 degrees: the major axis lies on y.
        let max_x = points.iter().map(|p| p.x.abs()).fold(0.0_f32, f32::max);
        let max_y = points.iter().map(|p| p.y.abs()).fold(0.0_f32, f32::max);
        assert!(max_y > 39.0);
        assert!(max_x < 11.0);
    }
}
