use eframe::egui::{Vec2, vec2};

use crate::data::{ClusterOverlay, EllipseShape};
use crate::util::stable_pair;

use super::viewport::Transform;

/// Multiplier from eigenvalue (sqrt of variance) to ellipse radius.
pub(in crate::app) const ELLIPSE_RADII_SCALE: f32 = 80.0;
pub(in crate::app) const CLUSTER_RADIUS: f32 = 16.0;
pub(in crate::app) const BUCKET_RADIUS: f32 = 22.0;
/// Margin reserved around the cluster field when mapping centroids.
const PLACEMENT_MARGIN: f32 = 60.0;
/// Extra slack added to the scene bounding box.
pub(in crate::app) const BOUNDS_PAD: f32 = 50.0;
/// Screen-space margin left around a fitted bounding box.
const FIT_MARGIN: f32 = 40.0;

const AISLE_MIN_GAP_X: f32 = 140.0;
const AISLE_GAP_Y: f32 = 180.0;
const AISLE_ORIGIN: f32 = 80.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct EllipseParams {
    pub rx: f32,
    pub ry: f32,
    pub angle_deg: f32,
}

/// Ellipse radii scale linearly with the eigenvalues; rotation is the
/// precomputed angle. Degenerate shapes never reach this point: a cluster
/// with a missing eigenvalue carries no `EllipseShape` at all.
pub(in crate::app) fn ellipse_params(shape: &EllipseShape) -> EllipseParams {
    EllipseParams {
        rx: shape.eig1 * ELLIPSE_RADII_SCALE,
        ry: shape.eig2 * ELLIPSE_RADII_SCALE,
        angle_deg: shape.angle_deg,
    }
}

/// Square-ish grid for aisle anchors. Column count is ceil(sqrt(n));
/// horizontal spacing widens with the container but never collapses
/// below a fixed minimum.
pub(in crate::app) fn aisle_grid_positions(count: usize, width: f32) -> Vec<Vec2> {
    if count == 0 {
        return Vec::new();
    }

    let cols = (count as f32).sqrt().ceil().max(1.0) as usize;
    let gap_x = AISLE_MIN_GAP_X.max(width / cols as f32);

    (0..count)
        .map(|index| {
            let col = (index % cols) as f32;
            let row = (index / cols) as f32;
            vec2(
                AISLE_ORIGIN + col * gap_x,
                AISLE_ORIGIN + row * AISLE_GAP_Y,
            )
        })
        .collect()
}

/// Initial cluster position: the GMM centroid mapped into the margined
/// container when an overlay exists, otherwise the container center plus
/// a deterministic jitter so co-located nodes never start singular.
pub(in crate::app) fn cluster_position(
    overlay: Option<&ClusterOverlay>,
    id: &str,
    container: Vec2,
) -> Vec2 {
    match overlay {
        Some(overlay) => vec2(
            PLACEMENT_MARGIN + overlay.centroid_x * (container.x - PLACEMENT_MARGIN * 2.0),
            PLACEMENT_MARGIN + overlay.centroid_y * (container.y - PLACEMENT_MARGIN * 2.0),
        ),
        None => {
            let (jx, jy) = stable_pair(id);
            container * 0.5 + vec2(jx * 50.0, jy * 50.0)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }
}

/// Axis-aligned box over the given points, expanded by a per-node radius
/// allowance plus fixed padding. None when there are no points.
pub(in crate::app) fn bounds_of(
    points: impl IntoIterator<Item = Vec2>,
    node_radius: f32,
    pad: f32,
) -> Option<Bounds> {
    let mut bounds: Option<Bounds> = None;
    for point in points {
        let bounds = bounds.get_or_insert(Bounds {
            min: point,
            max: point,
        });
        bounds.min = bounds.min.min(point);
        bounds.max = bounds.max.max(point);
    }

    bounds.map(|raw| Bounds {
        min: raw.min - vec2(node_radius + pad, node_radius + pad),
        max: raw.max + vec2(node_radius + pad, node_radius + pad),
    })
}

/// Transform making the whole box visible with a screen margin, centered
/// in the viewport. Pure function of its inputs, so repeated fits without
/// interaction are identical.
pub(in crate::app) fn fit_transform(bounds: &Bounds, viewport: Vec2) -> Transform {
    let width = bounds.width().max(1.0);
    let height = bounds.height().max(1.0);
    let scale = ((viewport.x - FIT_MARGIN) / width).min((viewport.y - FIT_MARGIN) / height);

    Transform {
        scale,
        translate: viewport * 0.5 - bounds.center() * scale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui::{Pos2, Rect};

    #[test]
    fn ellipse_radii_scale_linearly_with_eigenvalues() {
        let base = EllipseShape {
            eig1: 0.5,
            eig2: 0.2,
            angle_deg: 33.0,
        };
        let params = ellipse_params(&base);
        assert_eq!(params.rx, 40.0);
        assert_eq!(params.ry, 16.0);
        assert_eq!(params.angle_deg, 33.0);

        let doubled = ellipse_params(&EllipseShape {
            eig1: 1.0,
            eig2: 0.4,
            angle_deg: 33.0,
        });
        assert_eq!(doubled.rx, params.rx * 2.0);
        assert_eq!(doubled.ry, params.ry * 2.0);
    }

    #[test]
    fn aisle_grid_is_squareish_with_minimum_gap() {
        let positions = aisle_grid_positions(5, 300.0);
        assert_eq!(positions.len(), 5);

        // 5 aisles -> 3 columns; 300 / 3 = 100 < 140 so the minimum wins.
        assert_eq!(positions[0], vec2(80.0, 80.0));
        assert_eq!(positions[1], vec2(220.0, 80.0));
        assert_eq!(positions[3], vec2(80.0, 260.0));

        assert!(aisle_grid_positions(0, 300.0).is_empty());
    }

    #[test]
    fn cluster_position_maps_centroid_into_margined_container() {
        let overlay = ClusterOverlay {
            centroid_x: 0.0,
            centroid_y: 1.0,
            ellipse: None,
        };
        let pos = cluster_position(Some(&overlay), "P2_1", vec2(500.0, 400.0));
        assert_eq!(pos, vec2(60.0, 340.0));

        let mid = ClusterOverlay {
            centroid_x: 0.5,
            centroid_y: 0.5,
            ellipse: None,
        };
        assert_eq!(
            cluster_position(Some(&mid), "P2_1", vec2(500.0, 400.0)),
            vec2(250.0, 200.0)
        );
    }

    #[test]
    fn missing_overlay_jitters_around_center_deterministically() {
        let container = vec2(500.0, 400.0);
        let a = cluster_position(None, "P2_1", container);
        let b = cluster_position(None, "P2_1", container);
        let c = cluster_position(None, "P2_2", container);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!((a - container * 0.5).length() <= 50.0 * std::f32::consts::SQRT_2);
    }

    #[test]
    fn fit_example_from_two_clusters() {
        // Container 300x300, clusters at (50,50) and (250,250), radius 16.
        let bounds = bounds_of(
            [vec2(50.0, 50.0), vec2(250.0, 250.0)],
            CLUSTER_RADIUS,
            0.0,
        )
        .expect("non-empty");
        assert_eq!(bounds.min, vec2(34.0, 34.0));
        assert_eq!(bounds.max, vec2(266.0, 266.0));

        let transform = fit_transform(&bounds, vec2(300.0, 300.0));
        assert!((transform.scale - 260.0 / 232.0).abs() < 0.0001);

        // The box center lands on the viewport center.
        let rect = Rect::from_min_size(Pos2::ZERO, vec2(300.0, 300.0));
        let center_on_screen = transform.world_to_screen(rect, bounds.center());
        assert!((center_on_screen - Pos2::new(150.0, 150.0)).length() < 0.001);

        // Fitting twice without interaction is idempotent.
        let again = fit_transform(&bounds, vec2(300.0, 300.0));
        assert_eq!(transform, again);
    }

    #[test]
    fn bounds_include_padding() {
        let bounds = bounds_of([vec2(0.0, 0.0)], CLUSTER_RADIUS, BOUNDS_PAD).expect("non-empty");
        assert_eq!(bounds.min, vec2(-66.0, -66.0));
        assert_eq!(bounds.max, vec2(66.0, 66.0));

        assert!(bounds_of([], CLUSTER_RADIUS, BOUNDS_PAD).is_none());
    }
}
