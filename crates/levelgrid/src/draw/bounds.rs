use serde::{Deserialize, Serialize};

use crate::gps::GpsPosition;

/// Axis-aligned rectangle in the viewer level's frame, in tiles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewBounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl ViewBounds {
    /// Square of `radius` tiles on each side of `center`.
    pub fn around(center: GpsPosition, radius: f32) -> Self {
        let radius = if radius.is_finite() { radius.max(0.0) } else { 0.0 };
        Self {
            min_x: center.x - radius,
            max_x: center.x + radius,
            min_y: center.y - radius,
            max_y: center.y + radius,
        }
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        self.intersects_point_radius(x, y, 0.0)
    }

    /// Whether a square of half-size `radius` around `(x, y)` touches the
    /// bounds.
    pub fn intersects_point_radius(&self, x: f32, y: f32, radius: f32) -> bool {
        let radius = radius.max(0.0);
        !(x + radius < self.min_x
            || x - radius > self.max_x
            || y + radius < self.min_y
            || y - radius > self.max_y)
    }

    /// Inclusive tile rectangle covered by the bounds, clamped to a
    /// `width x height` level. `None` when the bounds miss the level.
    pub fn tile_rect(&self, width: u32, height: u32) -> Option<TileRect> {
        if width == 0 || height == 0 {
            return None;
        }
        let x_min = (self.min_x.floor() as i64).max(0);
        let x_max = (self.max_x.ceil() as i64 - 1).min(i64::from(width) - 1);
        let y_min = (self.min_y.floor() as i64).max(0);
        let y_max = (self.max_y.ceil() as i64 - 1).min(i64::from(height) - 1);
        if x_min > x_max || y_min > y_max {
            return None;
        }
        Some(TileRect {
            x_min: x_min as u32,
            x_max: x_max as u32,
            y_min: y_min as u32,
            y_max: y_max as u32,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRect {
    pub x_min: u32,
    pub x_max: u32,
    pub y_min: u32,
    pub y_max: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::LevelId;

    #[test]
    fn around_is_centered_and_inclusive() {
        let bounds = ViewBounds::around(GpsPosition::new(10.0, 4.0, LevelId(0)), 5.0);
        assert!(bounds.contains(5.0, -1.0));
        assert!(bounds.contains(15.0, 9.0));
        assert!(!bounds.contains(15.5, 4.0));
        assert!(bounds.intersects_point_radius(15.5, 4.0, 1.0));
    }

    #[test]
    fn negative_or_nan_radius_collapses_to_a_point() {
        let center = GpsPosition::new(1.0, 1.0, LevelId(0));
        assert_eq!(ViewBounds::around(center, -3.0), ViewBounds::around(center, 0.0));
        let bounds = ViewBounds::around(center, f32::NAN);
        assert!(bounds.contains(1.0, 1.0));
        assert!(!bounds.contains(1.5, 1.0));
    }

    #[test]
    fn tile_rect_clamps_to_level() {
        let bounds = ViewBounds {
            min_x: -2.5,
            max_x: 3.5,
            min_y: 6.0,
            max_y: 20.0,
        };
        assert_eq!(
            bounds.tile_rect(10, 8),
            Some(TileRect {
                x_min: 0,
                x_max: 3,
                y_min: 6,
                y_max: 7,
            })
        );
        let outside = ViewBounds {
            min_x: 12.0,
            max_x: 14.0,
            min_y: 0.0,
            max_y: 2.0,
        };
        assert_eq!(outside.tile_rect(10, 8), None);
    }
}
