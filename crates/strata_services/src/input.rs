//! Scripted observer movement for headless sessions

use std::f32::consts::TAU;
use std::time::Duration;
use strata_core::glam::Vec3;

/// Constant-speed walk around a circle on the ground plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkPath {
    pub center: Vec3,
    pub radius: f32,
    /// Radians per second.
    pub speed: f32,
    /// Starting angle in radians.
    pub phase: f32,
}

impl WalkPath {
    pub fn circle(center: Vec3, radius: f32, speed: f32) -> Self {
        Self {
            center,
            radius,
            speed,
            phase: 0.0,
        }
    }

    pub fn with_phase(mut self, phase: f32) -> Self {
        self.phase = phase;
        self
    }

    pub fn position_at(&self, elapsed: Duration) -> Vec3 {
        let angle = self.phase + self.speed * elapsed.as_secs_f32();
        self.center + Vec3::new(self.radius * angle.cos(), 0.0, self.radius * angle.sin())
    }
}

impl Default for WalkPath {
    fn default() -> Self {
        Self::circle(Vec3::ZERO, 0.0, 0.0)
    }
}

/// `count` walkers sharing one circle, evenly spaced around it.
pub fn spread(count: usize, radius: f32, speed: f32) -> Vec<WalkPath> {
    (0..count)
        .map(|i| WalkPath::circle(Vec3::ZERO, radius, speed).with_phase(TAU * i as f32 / count as f32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_stays_on_circle() {
        let path = WalkPath::circle(Vec3::new(5.0, 0.0, -5.0), 3.0, 1.0);
        for ms in [0, 250, 1000, 7777] {
            let pos = path.position_at(Duration::from_millis(ms));
            let offset = pos - path.center;
            assert!((offset.length() - 3.0).abs() < 1e-4);
            assert_eq!(pos.y, 0.0);
        }
    }

    #[test]
    fn test_spread_walkers_start_apart() {
        let paths = spread(4, 10.0, 0.5);
        assert_eq!(paths.len(), 4);
        let start: Vec<Vec3> = paths.iter().map(|p| p.position_at(Duration::ZERO)).collect();
        assert!((start[0] - Vec3::new(10.0, 0.0, 0.0)).length() < 1e-4);
        assert!((start[2] - Vec3::new(-10.0, 0.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_stationary_default() {
        assert_eq!(WalkPath::default().position_at(Duration::from_secs(9)), Vec3::ZERO);
    }
}
