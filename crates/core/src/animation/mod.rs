use serde::{Deserialize, Serialize};

use crate::geometry::{Color, Vec2, Vec3};

/// Seconds a position or scale change takes to play out.
pub const MOVE_DURATION: f32 = 0.6;
/// Seconds a border/secondary color change takes; deliberately snappier than
/// movement so selection feedback feels immediate.
pub const COLOR_DURATION: f32 = 0.25;
/// Seconds a video re-aspect takes. Aspect runs on its own timer so a stream
/// that reports a new shape mid-flight does not visually snap.
pub const ASPECT_DURATION: f32 = 0.6;

/// Named easing shapes. Each profile supplies the four control values of a
/// cubic Bezier in normalised space (0 at the origin, 1 at the destination);
/// the curve output is then used as the interpolation fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EasingProfile {
    /// Constant velocity from origin to destination.
    Linear,
    /// Gentle acceleration and deceleration.
    #[default]
    Easy,
    /// Fast start that overshoots the destination before settling.
    Aggressive,
}

impl EasingProfile {
    fn control_points(self) -> [f32; 4] {
        match self {
            // These midpoints make the cubic collapse to the identity.
            Self::Linear => [0.0, 1.0 / 3.0, 2.0 / 3.0, 1.0],
            Self::Easy => [0.0, 0.05, 0.95, 1.0],
            Self::Aggressive => [0.0, 0.4, 1.3, 1.0],
        }
    }

    /// Evaluates the profile's Bezier at `t` in [0, 1]. The result may leave
    /// [0, 1] for overshooting profiles.
    pub fn evaluate(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        let [p0, p1, p2, p3] = self.control_points();
        let u = 1.0 - t;
        u * u * u * p0 + 3.0 * u * u * t * p1 + 3.0 * u * t * t * p2 + t * t * t * p3
    }
}

/// Linear interpolation between two values. `f` may fall outside [0, 1];
/// implementations extrapolate so overshooting profiles work.
pub trait Lerp: Copy {
    fn lerp(self, other: Self, f: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp(self, other: Self, f: f32) -> Self {
        self + (other - self) * f
    }
}

impl Lerp for Vec2 {
    fn lerp(self, other: Self, f: f32) -> Self {
        Self {
            x: self.x.lerp(other.x, f),
            y: self.y.lerp(other.y, f),
        }
    }
}

impl Lerp for Vec3 {
    fn lerp(self, other: Self, f: f32) -> Self {
        Self {
            x: self.x.lerp(other.x, f),
            y: self.y.lerp(other.y, f),
            z: self.z.lerp(other.z, f),
        }
    }
}

impl Lerp for Color {
    fn lerp(self, other: Self, f: f32) -> Self {
        Self {
            r: self.r.lerp(other.r, f),
            g: self.g.lerp(other.g, f),
            b: self.b.lerp(other.b, f),
            a: self.a.lerp(other.a, f),
        }
    }
}

/// A quantity with a current and a destination value, eased between the two
/// over a fixed duration. The explicit `animating` flag means the per-frame
/// update never has to compare floats to know whether it is done.
#[derive(Debug, Clone, Copy)]
pub struct Animated<T: Lerp> {
    origin: T,
    current: T,
    destination: T,
    start: f32,
    duration: f32,
    profile: EasingProfile,
    animating: bool,
}

impl<T: Lerp> Animated<T> {
    /// A quantity at rest at `value`.
    pub fn new(value: T, duration: f32) -> Self {
        Self {
            origin: value,
            current: value,
            destination: value,
            start: 0.0,
            duration,
            profile: EasingProfile::default(),
            animating: false,
        }
    }

    pub fn with_profile(mut self, profile: EasingProfile) -> Self {
        self.profile = profile;
        self
    }

    /// The value as of the last `tick`.
    pub fn get(&self) -> T {
        self.current
    }

    /// The value the quantity is heading toward.
    pub fn destination(&self) -> T {
        self.destination
    }

    pub fn is_animating(&self) -> bool {
        self.animating
    }

    pub fn profile(&self) -> EasingProfile {
        self.profile
    }

    /// Begins easing toward `dest`, capturing the current value as the new
    /// origin. A non-positive duration converges immediately.
    pub fn retarget(&mut self, now: f32, dest: T) {
        self.origin = self.current;
        self.destination = dest;
        self.start = now;
        if self.duration > 0.0 {
            self.animating = true;
        } else {
            self.current = dest;
            self.origin = dest;
            self.animating = false;
        }
    }

    /// Moves to `dest` instantly with no animation.
    pub fn snap(&mut self, dest: T) {
        self.origin = dest;
        self.current = dest;
        self.destination = dest;
        self.animating = false;
    }

    /// Advances the quantity to time `now`. A reversed interval (a clock that
    /// went backwards past the start point) is treated as already converged.
    pub fn tick(&mut self, now: f32) {
        if !self.animating {
            return;
        }
        let elapsed = now - self.start;
        if elapsed < 0.0 || elapsed >= self.duration {
            self.current = self.destination;
            self.origin = self.destination;
            self.animating = false;
            return;
        }
        let t = elapsed / self.duration;
        self.current = self.origin.lerp(self.destination, self.profile.evaluate(t));
    }
}
