use eframe::egui::{Pos2, Vec2, pos2, vec2};

pub const MIN_SCALE: f32 = 0.1;
pub const MAX_SCALE: f32 = 4.0;
pub const RESET_DURATION_SECS: f32 = 0.75;

/// Pan/zoom state: `screen = world * k + (tx, ty)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportTransform {
    pub k: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ViewportTransform {
    pub const IDENTITY: Self = Self {
        k: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    pub fn new(k: f32, tx: f32, ty: f32) -> Self {
        Self {
            k: clamp_scale(k),
            tx,
            ty,
        }
    }

    pub fn translation(&self) -> Vec2 {
        vec2(self.tx, self.ty)
    }

    pub fn world_to_screen(&self, world: Vec2) -> Pos2 {
        pos2(world.x * self.k + self.tx, world.y * self.k + self.ty)
    }

    pub fn screen_to_world(&self, screen: Pos2) -> Vec2 {
        vec2((screen.x - self.tx) / self.k, (screen.y - self.ty) / self.k)
    }

    /// Scales by `factor` keeping the world point under `focal` fixed.
    pub fn zoom_at(&mut self, factor: f32, focal: Pos2) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let world_before = self.screen_to_world(focal);
        self.k = clamp_scale(self.k * factor);
        self.tx = focal.x - world_before.x * self.k;
        self.ty = focal.y - world_before.y * self.k;
    }

    /// Scales by `factor` around the center of a viewport of `size`.
    pub fn zoom_by(&mut self, factor: f32, size: Vec2) {
        self.zoom_at(factor, (size * 0.5).to_pos2());
    }

    pub fn zoom_to(&mut self, k: f32, tx: f32, ty: f32) {
        *self = Self::new(k, tx, ty);
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.tx += dx;
        self.ty += dy;
    }

    pub fn reset(&mut self) {
        *self = Self::IDENTITY;
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    fn lerp(from: Self, to: Self, t: f32) -> Self {
        Self {
            k: clamp_scale(from.k + (to.k - from.k) * t),
            tx: from.tx + (to.tx - from.tx) * t,
            ty: from.ty + (to.ty - from.ty) * t,
        }
    }
}

fn clamp_scale(k: f32) -> f32 {
    if k.is_finite() {
        k.clamp(MIN_SCALE, MAX_SCALE)
    } else {
        1.0
    }
}

fn ease_cubic_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

#[derive(Clone, Copy, Debug)]
struct Transition {
    from: ViewportTransform,
    to: ViewportTransform,
    elapsed: f32,
    duration: f32,
}

/// The transform of one graph view plus its surface size and any running
/// animated transition.
#[derive(Clone, Debug)]
pub struct Viewport {
    transform: ViewportTransform,
    size: Vec2,
    transition: Option<Transition>,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(vec2(800.0, 600.0))
    }
}

impl Viewport {
    pub fn new(size: Vec2) -> Self {
        Self {
            transform: ViewportTransform::IDENTITY,
            size,
            transition: None,
        }
    }

    pub fn transform(&self) -> ViewportTransform {
        self.transform
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn set_size(&mut self, size: Vec2) {
        self.size = vec2(size.x.max(1.0), size.y.max(1.0));
    }

    /// Applies a user gesture. Cancels any running transition.
    pub fn update(&mut self, change: impl FnOnce(&mut ViewportTransform)) {
        self.transition = None;
        change(&mut self.transform);
    }

    pub fn animate_to(&mut self, target: ViewportTransform, duration: f32) {
        if duration <= 0.0 || self.transform == target {
            self.transition = None;
            self.transform = target;
            return;
        }
        self.transition = Some(Transition {
            from: self.transform,
            to: target,
            elapsed: 0.0,
            duration,
        });
    }

    pub fn is_animating(&self) -> bool {
        self.transition.is_some()
    }

    /// Target the transform is heading to, or the current one when idle.
    pub fn settled_transform(&self) -> ViewportTransform {
        self.transition
            .map(|transition| transition.to)
            .unwrap_or(self.transform)
    }

    /// Advances a running transition. Returns whether it is still running.
    pub fn advance(&mut self, delta_seconds: f32) -> bool {
        let Some(mut transition) = self.transition else {
            return false;
        };

        transition.elapsed += delta_seconds.max(0.0);
        if transition.elapsed >= transition.duration {
            self.transform = transition.to;
            self.transition = None;
            return false;
        }

        let t = ease_cubic_in_out(transition.elapsed / transition.duration);
        self.transform = ViewportTransform::lerp(transition.from, transition.to, t);
        self.transition = Some(transition);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-3
    }

    #[test]
    fn test_identity_mapping() {
        let transform = ViewportTransform::IDENTITY;
        assert_eq!(transform.world_to_screen(vec2(3.0, 4.0)), pos2(3.0, 4.0));
        assert_eq!(transform.screen_to_world(pos2(3.0, 4.0)), vec2(3.0, 4.0));
    }

    #[test]
    fn test_zoom_by_stays_clamped() {
        let mut transform = ViewportTransform::IDENTITY;
        let size = vec2(800.0, 600.0);
        for factor in [2.0, 3.0, 10.0, 0.5, 0.01, 0.2, 0.001, 1.1, 50.0, 0.9] {
            transform.zoom_by(factor, size);
            assert!(transform.k >= MIN_SCALE && transform.k <= MAX_SCALE);
        }
        transform.zoom_by(f32::NAN, size);
        assert!(transform.k >= MIN_SCALE && transform.k <= MAX_SCALE);
    }

    #[test]
    fn test_focal_point_invariant() {
        let mut transform = ViewportTransform::new(1.3, -40.0, 25.0);
        for (factor, focal) in [
            (1.5, pos2(120.0, 80.0)),
            (0.4, pos2(500.0, 10.0)),
            (20.0, pos2(33.0, 450.0)),
            (0.01, pos2(700.0, 300.0)),
        ] {
            let before = transform.screen_to_world(focal);
            transform.zoom_at(factor, focal);
            let after = transform.screen_to_world(focal);
            assert!(close(before, after), "{before:?} != {after:?}");
        }
    }

    #[test]
    fn test_zoom_to_clamps_scale_only() {
        let mut transform = ViewportTransform::IDENTITY;
        transform.zoom_to(9.0, -5000.0, 7000.0);
        assert_eq!(transform.k, MAX_SCALE);
        assert_eq!(transform.translation(), vec2(-5000.0, 7000.0));
    }

    #[test]
    fn test_pan_and_reset() {
        let mut transform = ViewportTransform::new(2.0, 0.0, 0.0);
        transform.pan_by(10.0, -5.0);
        assert_eq!(transform.translation(), vec2(10.0, -5.0));
        transform.reset();
        assert!(transform.is_identity());
    }

    #[test]
    fn test_animated_transition_lands_on_target() {
        let mut viewport = Viewport::new(vec2(400.0, 300.0));
        viewport.update(|transform| transform.zoom_to(3.0, 100.0, 50.0));
        viewport.animate_to(ViewportTransform::IDENTITY, RESET_DURATION_SECS);
        assert!(viewport.is_animating());
        assert!(viewport.settled_transform().is_identity());

        assert!(viewport.advance(0.3));
        let midway = viewport.transform();
        assert!(midway.k < 3.0 && midway.k > 1.0);

        assert!(!viewport.advance(1.0));
        assert!(viewport.transform().is_identity());
    }

    #[test]
    fn test_gesture_cancels_transition() {
        let mut viewport = Viewport::default();
        viewport.update(|transform| transform.pan_by(100.0, 0.0));
        viewport.animate_to(ViewportTransform::IDENTITY, 1.0);
        viewport.update(|transform| transform.pan_by(1.0, 1.0));
        assert!(!viewport.is_animating());
        assert_eq!(viewport.transform().translation(), vec2(101.0, 1.0));
    }
}
