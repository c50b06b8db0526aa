use eframe::egui::{Pos2, Rect, Vec2};

pub(in crate::app) const SCENE_SCALE_RANGE: (f32, f32) = (0.3, 6.0);
pub(in crate::app) const PANEL_SCALE_RANGE: (f32, f32) = (0.3, 4.0);
pub(in crate::app) const FIT_ANIMATION_SECS: f32 = 0.65;
pub(in crate::app) const FOCUS_ANIMATION_SECS: f32 = 0.6;
pub(in crate::app) const FOCUS_SCALE: f32 = 1.8;

/// Camera state: screen = origin + translate + world * scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct Transform {
    pub scale: f32,
    pub translate: Vec2,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        translate: Vec2::ZERO,
    };

    pub fn world_to_screen(&self, rect: Rect, world: Vec2) -> Pos2 {
        rect.min + self.translate + world * self.scale
    }

    pub fn screen_to_world(&self, rect: Rect, screen: Pos2) -> Vec2 {
        (screen - rect.min - self.translate) / self.scale
    }

    fn lerp(from: Self, to: Self, t: f32) -> Self {
        Self {
            scale: from.scale + (to.scale - from.scale) * t,
            translate: from.translate + (to.translate - from.translate) * t,
        }
    }
}

struct Animation {
    from: Transform,
    to: Transform,
    start: f64,
    duration: f32,
}

fn ease_cubic_in_out(t: f32) -> f32 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - ((-2.0 * t + 2.0).powi(3)) / 2.0
    }
}

/// Owns one camera: scale clamped to a range plus a translate pair.
/// Gesture-driven and programmatic writes land in the same state; a
/// gesture cancels any in-flight animation (last write wins).
pub(in crate::app) struct Viewport {
    current: Transform,
    min_scale: f32,
    max_scale: f32,
    animation: Option<Animation>,
}

impl Viewport {
    pub fn new((min_scale, max_scale): (f32, f32)) -> Self {
        Self {
            current: Transform::IDENTITY,
            min_scale,
            max_scale,
            animation: None,
        }
    }

    pub fn clamp_scale(&self, scale: f32) -> f32 {
        scale.clamp(self.min_scale, self.max_scale)
    }

    /// Apply a transform, instantly or via a timed eased interpolation.
    pub fn apply(&mut self, target: Transform, animated: Option<(f64, f32)>) {
        let target = Transform {
            scale: self.clamp_scale(target.scale),
            translate: target.translate,
        };

        match animated {
            Some((now, duration)) => {
                self.animation = Some(Animation {
                    from: self.transform(now),
                    to: target,
                    start: now,
                    duration,
                });
            }
            None => {
                self.animation = None;
                self.current = target;
            }
        }
    }

    /// Current transform at a point in time; commits a finished animation.
    pub fn transform(&mut self, now: f64) -> Transform {
        let Some(animation) = &self.animation else {
            return self.current;
        };

        let t = ((now - animation.start) as f32 / animation.duration).clamp(0.0, 1.0);
        if t >= 1.0 {
            self.current = animation.to;
            self.animation = None;
            return self.current;
        }

        Transform::lerp(animation.from, animation.to, ease_cubic_in_out(t))
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    /// Center and zoom on one world position:
    /// translate = viewport_center - position * clamped_scale.
    pub fn focus(&mut self, world: Vec2, target_scale: f32, viewport: Vec2, now: f64) {
        let scale = self.clamp_scale(target_scale);
        let target = Transform {
            scale,
            translate: viewport * 0.5 - world * scale,
        };
        self.apply(target, Some((now, FOCUS_ANIMATION_SECS)));
    }

    /// Pointer-anchored wheel zoom. `pointer` is relative to the scene
    /// rect origin.
    pub fn zoom_at(&mut self, pointer: Vec2, factor: f32) {
        self.animation = None;
        let world = (pointer - self.current.translate) / self.current.scale;
        let scale = self.clamp_scale(self.current.scale * factor);
        self.current = Transform {
            scale,
            translate: pointer - world * scale,
        };
    }

    pub fn pan(&mut self, delta: Vec2) {
        self.animation = None;
        self.current.translate += delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui::vec2;

    #[test]
    fn focus_centers_the_target() {
        let mut viewport = Viewport::new(SCENE_SCALE_RANGE);
        viewport.focus(vec2(100.0, 40.0), FOCUS_SCALE, vec2(800.0, 600.0), 0.0);

        // Jump past the animation and check the committed transform.
        let transform = viewport.transform(10.0);
        assert_eq!(transform.scale, 1.8);
        let rect = Rect::from_min_size(Pos2::ZERO, vec2(800.0, 600.0));
        let screen = transform.world_to_screen(rect, vec2(100.0, 40.0));
        assert!((screen - Pos2::new(400.0, 300.0)).length() < 0.001);
    }

    #[test]
    fn focus_clamps_scale() {
        let mut viewport = Viewport::new(SCENE_SCALE_RANGE);
        viewport.focus(Vec2::ZERO, 50.0, vec2(800.0, 600.0), 0.0);
        assert_eq!(viewport.transform(10.0).scale, 6.0);
    }

    #[test]
    fn animation_interpolates_and_commits() {
        let mut viewport = Viewport::new(SCENE_SCALE_RANGE);
        let target = Transform {
            scale: 2.0,
            translate: vec2(100.0, 0.0),
        };
        viewport.apply(target, Some((0.0, 1.0)));

        let midway = viewport.transform(0.5);
        assert!(midway.scale > 1.0 && midway.scale < 2.0);
        assert!(viewport.is_animating());

        assert_eq!(viewport.transform(1.5), target);
        assert!(!viewport.is_animating());
    }

    #[test]
    fn zoom_at_keeps_pointer_anchored() {
        let mut viewport = Viewport::new(SCENE_SCALE_RANGE);
        viewport.apply(
            Transform {
                scale: 1.0,
                translate: vec2(10.0, 10.0),
            },
            None,
        );

        let pointer = vec2(200.0, 150.0);
        let rect = Rect::from_min_size(Pos2::ZERO, vec2(800.0, 600.0));
        let world_before = viewport.transform(0.0).screen_to_world(rect, Pos2::ZERO + pointer);

        viewport.zoom_at(pointer, 1.5);

        let after = viewport.transform(0.0).world_to_screen(rect, world_before);
        assert!((after - (Pos2::ZERO + pointer)).length() < 0.001);
    }

    #[test]
    fn gesture_cancels_animation() {
        let mut viewport = Viewport::new(SCENE_SCALE_RANGE);
        viewport.apply(
            Transform {
                scale: 3.0,
                translate: Vec2::ZERO,
            },
            Some((0.0, 1.0)),
        );
        assert!(viewport.is_animating());

        viewport.pan(vec2(5.0, 0.0));
        assert!(!viewport.is_animating());
    }
}
