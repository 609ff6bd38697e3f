//! Planar geometry in a right-handed map frame.
//!
//! `x` points east, `y` points north, `yaw` is measured counter-clockwise from
//! the `x` axis in radians.  "Left" of a heading is therefore the `+90°`
//! direction.

use std::f64::consts::PI;
use std::fmt;

/// A point in the map frame, in metres.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Location {
    pub x: f64,
    pub y: f64,
}

impl Location {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn distance(self, other: Location) -> f64 {
        self.distance_squared(other).sqrt()
    }

    #[inline]
    pub fn distance_squared(self, other: Location) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Translate by `distance` metres along `yaw`.
    #[inline]
    pub fn advanced(self, yaw: f64, distance: f64) -> Location {
        Location::new(self.x + yaw.cos() * distance, self.y + yaw.sin() * distance)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}

/// Position plus heading.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pose {
    pub location: Location,
    /// Heading in radians, counter-clockwise from the `x` axis.
    pub yaw: f64,
}

impl Pose {
    #[inline]
    pub const fn new(x: f64, y: f64, yaw: f64) -> Self {
        Self { location: Location::new(x, y), yaw }
    }

    /// Unit vector along the heading.
    #[inline]
    pub fn forward(&self) -> (f64, f64) {
        (self.yaw.cos(), self.yaw.sin())
    }

    /// Unit vector pointing to the left of the heading.
    #[inline]
    pub fn left(&self) -> (f64, f64) {
        (-self.yaw.sin(), self.yaw.cos())
    }

    /// Express `point` in this pose's frame as `(longitudinal, lateral)`.
    /// Positive lateral offsets lie to the left.
    pub fn to_local(&self, point: Location) -> (f64, f64) {
        let dx = point.x - self.location.x;
        let dy = point.y - self.location.y;
        let (fx, fy) = self.forward();
        let (lx, ly) = self.left();
        (dx * fx + dy * fy, dx * lx + dy * ly)
    }

    /// Inverse of [`to_local`](Self::to_local).
    pub fn to_global(&self, longitudinal: f64, lateral: f64) -> Location {
        let (fx, fy) = self.forward();
        let (lx, ly) = self.left();
        Location::new(
            self.location.x + longitudinal * fx + lateral * lx,
            self.location.y + longitudinal * fy + lateral * ly,
        )
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "x:{:.3} y:{:.3} yaw:{:.2}°",
            self.location.x,
            self.location.y,
            self.yaw.to_degrees()
        )
    }
}

/// Axis-aligned box in the vehicle frame, stored as half extents.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    /// Half of the vehicle length.
    pub half_length: f64,
    /// Half of the vehicle width.
    pub half_width: f64,
}

impl BoundingBox {
    pub const fn new(half_length: f64, half_width: f64) -> Self {
        Self { half_length, half_width }
    }
}

impl Default for BoundingBox {
    /// A mid-size passenger car.
    fn default() -> Self {
        Self::new(2.4, 1.0)
    }
}

/// Wrap an angle into `(-π, π]`.
pub fn normalize_angle(angle: f64) -> f64 {
    let mut a = angle % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a <= -PI {
        a += 2.0 * PI;
    }
    a
}
