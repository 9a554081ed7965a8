use serde::{Deserialize, Serialize};

/// 2D vector used for scales and offsets.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 3D point used for object positions in world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// RGBA color with straight (non-premultiplied) alpha.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// Translucent white used for unselected borders.
    pub const BASE_BORDER: Self = Self::new(1.0, 1.0, 1.0, 0.7);
    /// Yellow highlight applied to the border while an object is selected.
    pub const SELECTED: Self = Self::new(1.0, 1.0, 0.0, 0.8);
    /// Muted grey used for group backing rectangles.
    pub const GROUP_BASE: Self = Self::new(0.4, 0.4, 0.4, 0.55);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BASE_BORDER
    }
}

/// Axis-aligned rectangle in world coordinates. `top` is the larger Y value;
/// layouts treat a bound with `top <= bottom` as degenerate rather than
/// defending against it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl Bounds {
    pub const fn new(left: f32, right: f32, top: f32, bottom: f32) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
        }
    }

    /// Builds a bound from a center point and full extents.
    pub fn from_center(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self {
            left: cx - width / 2.0,
            right: cx + width / 2.0,
            top: cy + height / 2.0,
            bottom: cy - height / 2.0,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.top - self.bottom
    }

    pub fn center_x(&self) -> f32 {
        (self.left + self.right) / 2.0
    }

    pub fn center_y(&self) -> f32 {
        (self.top + self.bottom) / 2.0
    }

    /// Width over height; callers guard against zero-height bounds.
    pub fn aspect(&self) -> f32 {
        (self.width() / self.height()).abs()
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.left && x <= self.right && y >= self.bottom && y <= self.top
    }

    pub fn contains_rect(&self, other: &Self) -> bool {
        other.left >= self.left
            && other.right <= self.right
            && other.bottom >= self.bottom
            && other.top <= self.top
    }

    pub fn intersects(&self, other: &Self) -> bool {
        !(other.left > self.right
            || other.right < self.left
            || other.bottom > self.top
            || other.top < self.bottom)
    }

    /// Scales the bound about its center by `factor`.
    pub fn shrunk(&self, factor: f32) -> Self {
        Self::from_center(
            self.center_x(),
            self.center_y(),
            self.width() * factor,
            self.height() * factor,
        )
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::from_center(0.0, 0.0, 32.0, 18.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_construction_round_trips() {
        let b = Bounds::from_center(2.0, -1.0, 8.0, 4.0);
        assert_eq!(b.left, -2.0);
        assert_eq!(b.right, 6.0);
        assert_eq!(b.top, 1.0);
        assert_eq!(b.bottom, -3.0);
        assert_eq!(b.center_x(), 2.0);
        assert_eq!(b.center_y(), -1.0);
        assert_eq!(b.aspect(), 2.0);
    }

    #[test]
    fn shrunk_preserves_center() {
        let b = Bounds::from_center(1.0, 1.0, 10.0, 10.0).shrunk(0.5);
        assert_eq!(b.center_x(), 1.0);
        assert_eq!(b.center_y(), 1.0);
        assert!((b.width() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn containment_and_intersection() {
        let outer = Bounds::from_center(0.0, 0.0, 10.0, 10.0);
        let inner = Bounds::from_center(1.0, 1.0, 2.0, 2.0);
        let outside = Bounds::from_center(20.0, 0.0, 2.0, 2.0);
        assert!(outer.contains_rect(&inner));
        assert!(outer.intersects(&inner));
        assert!(!outer.contains_rect(&outside));
        assert!(!outer.intersects(&outside));
    }
}
