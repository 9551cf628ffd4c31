use rand::Rng;

use super::{Rect, Vec2};

pub const DEFAULT_CAMERA_SPEED: f64 = 13.0;

/// Smoothed follow camera. `speed` divides the remaining distance each tick,
/// so larger values follow more slowly.
#[derive(Debug, Clone)]
pub struct Camera2D {
    scroll: Vec2,
    viewport: Vec2,
    speed: f64,
    screenshake: f64,
}

impl Camera2D {
    pub fn new(viewport: Vec2, speed: f64) -> Self {
        let speed = if speed.is_finite() { speed.max(1.0) } else { DEFAULT_CAMERA_SPEED };
        Self {
            scroll: Vec2::ZERO,
            viewport,
            speed,
            screenshake: 0.0,
        }
    }

    pub fn scroll(&self) -> Vec2 {
        self.scroll
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn screenshake(&self) -> f64 {
        self.screenshake
    }

    fn target_scroll(&self, focus: Vec2) -> Vec2 {
        Vec2::new(
            focus.x - self.viewport.x / 2.0,
            focus.y - self.viewport.y / 2.0,
        )
    }

    pub fn snap_to(&mut self, focus: Vec2) {
        self.scroll = self.target_scroll(focus);
    }

    pub fn follow(&mut self, focus: Vec2) {
        let target = self.target_scroll(focus);
        self.scroll.x += (target.x - self.scroll.x) / self.speed;
        self.scroll.y += (target.y - self.scroll.y) / self.speed;
    }

    /// Whole-pixel scroll used for drawing; truncates toward zero.
    pub fn render_offset(&self) -> (i32, i32) {
        (self.scroll.x as i32, self.scroll.y as i32)
    }

    pub fn view_rect(&self) -> Rect {
        Rect::from_pos_size(self.scroll, self.viewport)
    }

    /// Raises the shake magnitude to at least `amount`.
    pub fn add_shake(&mut self, amount: f64) {
        if amount.is_finite() {
            self.screenshake = self.screenshake.max(amount);
        }
    }

    pub fn decay_shake(&mut self) {
        self.screenshake = (self.screenshake - 1.0).max(0.0);
    }

    /// Random offset in `[-s/2, s/2)` per axis for shake magnitude `s`.
    pub fn shake_offset<R: Rng>(&self, rng: &mut R) -> Vec2 {
        if self.screenshake <= 0.0 {
            return Vec2::ZERO;
        }
        let s = self.screenshake;
        Vec2::new(
            rng.gen::<f64>() * s - s / 2.0,
            rng.gen::<f64>() * s - s / 2.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn follow_closes_a_fraction_of_the_gap() {
        let mut camera = Camera2D::new(Vec2::new(160.0, 120.0), 13.0);
        camera.follow(Vec2::new(80.0 + 130.0, 60.0 - 26.0));

        assert!((camera.scroll().x - 10.0).abs() < 1e-9);
        assert!((camera.scroll().y + 2.0).abs() < 1e-9);
    }

    #[test]
    fn larger_speed_follows_more_slowly() {
        let focus = Vec2::new(500.0, 60.0);
        let mut fast = Camera2D::new(Vec2::new(160.0, 120.0), 4.0);
        let mut slow = Camera2D::new(Vec2::new(160.0, 120.0), 13.0);
        fast.follow(focus);
        slow.follow(focus);

        assert!(fast.scroll().x > slow.scroll().x);
    }

    #[test]
    fn snap_centers_focus_and_render_offset_truncates() {
        let mut camera = Camera2D::new(Vec2::new(160.0, 120.0), 13.0);
        camera.snap_to(Vec2::new(83.7, 59.5));

        assert_eq!(camera.render_offset(), (3, 0));
        camera.snap_to(Vec2::new(78.5, 60.0));
        assert_eq!(camera.render_offset(), (-1, 0));
        assert_eq!(camera.view_rect(), Rect::new(-1.5, 0.0, 160.0, 120.0));
    }

    #[test]
    fn shake_decays_to_zero_and_bounds_offset() {
        let mut camera = Camera2D::new(Vec2::new(160.0, 120.0), 13.0);
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(camera.shake_offset(&mut rng), Vec2::ZERO);

        camera.add_shake(4.0);
        camera.add_shake(2.0);
        assert_eq!(camera.screenshake(), 4.0);
        for _ in 0..50 {
            let offset = camera.shake_offset(&mut rng);
            assert!((-2.0..2.0).contains(&offset.x));
            assert!((-2.0..2.0).contains(&offset.y));
        }

        for _ in 0..6 {
            camera.decay_shake();
        }
        assert_eq!(camera.screenshake(), 0.0);
    }
}
