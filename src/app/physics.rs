use eframe::egui::{Vec2, vec2};

const ALPHA_MIN: f32 = 0.001;
const DRAG_ALPHA_TARGET: f32 = 0.3;

/// Force parameters for one simulation instance. The main scene and the
/// drilldown panel run separate instances with their own tuning.
#[derive(Clone, Copy, Debug)]
pub(in crate::app) struct SimParams {
    /// Negative repels, like a many-body charge.
    pub charge_strength: f32,
    /// Minimum center distance between two nodes is twice this radius.
    pub collide_radius: f32,
    pub link_distance: f32,
    pub link_strength: f32,
    pub center: Option<Vec2>,
    pub alpha_decay: f32,
    pub velocity_decay: f32,
}

impl SimParams {
    /// Main scene: repulsion and collision only; edges are drawn but do
    /// not constrain the relaxed GMM placement.
    pub fn scene() -> Self {
        Self {
            charge_strength: -40.0,
            collide_radius: 22.0,
            link_distance: 0.0,
            link_strength: 0.0,
            center: None,
            alpha_decay: 0.05,
            velocity_decay: 0.4,
        }
    }

    pub fn panel(center: Vec2) -> Self {
        Self {
            charge_strength: -30.0,
            collide_radius: 26.0,
            link_distance: 80.0,
            link_strength: 0.3,
            center: Some(center),
            alpha_decay: 0.0228,
            velocity_decay: 0.4,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct SimNode {
    pos: Vec2,
    vel: Vec2,
    fixed: Option<Vec2>,
}

/// Iterative relaxation with a geometrically decaying temperature.
/// Each step mutates internal state only; callers pull an immutable
/// position snapshot afterwards.
pub(in crate::app) struct Simulation {
    nodes: Vec<SimNode>,
    links: Vec<(usize, usize)>,
    params: SimParams,
    alpha: f32,
    alpha_target: f32,
}

impl Simulation {
    pub fn new(positions: Vec<Vec2>, links: Vec<(usize, usize)>, params: SimParams) -> Self {
        let node_count = positions.len();
        let nodes = positions
            .into_iter()
            .map(|pos| SimNode {
                pos,
                vel: Vec2::ZERO,
                fixed: None,
            })
            .collect();

        let links = links
            .into_iter()
            .filter(|&(a, b)| a < node_count && b < node_count && a != b)
            .collect();

        Self {
            nodes,
            links,
            params,
            alpha: 1.0,
            alpha_target: 0.0,
        }
    }

    pub fn snapshot(&self) -> Vec<Vec2> {
        self.nodes.iter().map(|node| node.pos).collect()
    }

    /// Pin a node at a position. Pinned nodes do not move on a tick but
    /// keep exerting repulsion, collision, and link forces on neighbors.
    pub fn pin(&mut self, index: usize, pos: Vec2) {
        if let Some(node) = self.nodes.get_mut(index) {
            node.fixed = Some(pos);
        }
    }

    pub fn release(&mut self, index: usize) {
        if let Some(node) = self.nodes.get_mut(index) {
            node.fixed = None;
        }
    }

    /// Hold the temperature up while a drag is active.
    pub fn reheat(&mut self) {
        self.alpha_target = DRAG_ALPHA_TARGET;
        if self.alpha < DRAG_ALPHA_TARGET {
            self.alpha = DRAG_ALPHA_TARGET;
        }
    }

    /// Restore natural decay after a drag ends.
    pub fn cool(&mut self) {
        self.alpha_target = 0.0;
    }

    /// Advance one tick. Returns false once the temperature has decayed
    /// below the floor with no target holding it up; no positions change
    /// after that.
    pub fn step(&mut self) -> bool {
        if self.nodes.len() < 2 {
            return false;
        }

        if self.alpha < ALPHA_MIN && self.alpha_target <= 0.0 {
            return false;
        }

        self.alpha += (self.alpha_target - self.alpha) * self.params.alpha_decay;
        let alpha = self.alpha;

        let repulsion = -self.params.charge_strength;
        let min_distance = self.params.collide_radius * 2.0;
        for i in 0..self.nodes.len() {
            for j in (i + 1)..self.nodes.len() {
                let delta = self.nodes[i].pos - self.nodes[j].pos;
                let distance_sq = delta.length_sq();
                let distance = distance_sq.sqrt();
                let direction = if distance > 0.0001 {
                    delta / distance
                } else {
                    let angle = ((i as f32) * 0.618_034 + (j as f32) * 0.414_214)
                        * std::f32::consts::TAU;
                    vec2(angle.cos(), angle.sin())
                };

                let push = repulsion * alpha / distance_sq.max(1.0);
                self.nodes[i].vel += direction * push;
                self.nodes[j].vel -= direction * push;

                if distance < min_distance {
                    let overlap = (min_distance - distance.max(0.0001)) * 0.5;
                    self.nodes[i].vel += direction * overlap;
                    self.nodes[j].vel -= direction * overlap;
                }
            }
        }

        if self.params.link_strength > 0.0 {
            for &(a, b) in &self.links {
                let delta = self.nodes[b].pos - self.nodes[a].pos;
                let distance = delta.length().max(0.0001);
                let direction = delta / distance;
                let stretch =
                    (distance - self.params.link_distance) * self.params.link_strength * alpha;

                self.nodes[a].vel += direction * (stretch * 0.5);
                self.nodes[b].vel -= direction * (stretch * 0.5);
            }
        }

        if let Some(center) = self.params.center {
            let mut centroid = Vec2::ZERO;
            for node in &self.nodes {
                centroid += node.pos;
            }
            centroid /= self.nodes.len() as f32;

            let shift = center - centroid;
            for node in &mut self.nodes {
                if node.fixed.is_none() {
                    node.pos += shift;
                }
            }
        }

        let velocity_keep = 1.0 - self.params.velocity_decay;
        for node in &mut self.nodes {
            if let Some(pinned) = node.fixed {
                node.pos = pinned;
                node.vel = Vec2::ZERO;
            } else {
                node.vel *= velocity_keep;
                node.pos += node.vel;
            }
        }

        true
    }
}
