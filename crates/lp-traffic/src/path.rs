//! Candidate ego paths.
//!
//! A [`PathGenerator`] connects two oriented, curvature-tagged poses for a
//! given [`Maneuver`].  Paths are arc-length parametrized polylines sampled
//! densely enough to be interpolated linearly.
//!
//! | Type               | Role                                               |
//! |--------------------|----------------------------------------------------|
//! | [`ContinuousPath`] | One generated edge, sampled at generator spacing   |
//! | [`DiscretePath`]   | Concatenation of edges returned by the planner     |
//! | [`PathLike`]       | Common read interface used by the simulator        |

use std::fmt;

use lp_core::{Location, Pose, normalize_angle};

use crate::{PathError, PathResult};

/// Kind of motion an edge represents.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Maneuver {
    KeepLane,
    LeftChange,
    RightChange,
}

impl Maneuver {
    pub const ALL: [Maneuver; 3] = [Maneuver::KeepLane, Maneuver::LeftChange, Maneuver::RightChange];

    pub fn as_str(self) -> &'static str {
        match self {
            Maneuver::KeepLane => "keep lane",
            Maneuver::LeftChange => "left lane change",
            Maneuver::RightChange => "right lane change",
        }
    }
}

impl fmt::Display for Maneuver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pose with the signed path curvature at that pose.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathPoint {
    /// Arc length from the start of the path.
    pub s:         f64,
    pub pose:      Pose,
    pub curvature: f64,
}

/// Read access shared by every path type.
pub trait PathLike {
    fn points(&self) -> &[PathPoint];

    /// Total arc length.
    fn range(&self) -> f64 {
        self.points().last().map_or(0.0, |p| p.s)
    }

    /// Interpolated point at arc length `s`, or `None` outside `[0, range]`.
    fn sample(&self, s: f64) -> Option<PathPoint> {
        interpolate(self.points(), s)
    }
}

fn interpolate(points: &[PathPoint], s: f64) -> Option<PathPoint> {
    let first = points.first()?;
    let last = points.last()?;
    if s < first.s - 1e-9 || s > last.s + 1e-9 {
        return None;
    }
    let upper = points.partition_point(|p| p.s < s);
    if upper == 0 {
        return Some(*first);
    }
    if upper >= points.len() {
        return Some(*last);
    }
    let (a, b) = (&points[upper - 1], &points[upper]);
    let span = b.s - a.s;
    let t = if span > 0.0 { (s - a.s) / span } else { 0.0 };
    let x = a.pose.location.x + t * (b.pose.location.x - a.pose.location.x);
    let y = a.pose.location.y + t * (b.pose.location.y - a.pose.location.y);
    let yaw = a.pose.yaw + t * normalize_angle(b.pose.yaw - a.pose.yaw);
    Some(PathPoint {
        s,
        pose: Pose { location: Location::new(x, y), yaw: normalize_angle(yaw) },
        curvature: a.curvature + t * (b.curvature - a.curvature),
    })
}

/// A single generated edge.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContinuousPath {
    points: Vec<PathPoint>,
}

impl ContinuousPath {
    /// Wrap pre-sampled points.  `s` must be non-decreasing and start at 0.
    pub fn from_points(points: Vec<PathPoint>) -> Self {
        Self { points }
    }

    pub fn start(&self) -> Option<&PathPoint> {
        self.points.first()
    }

    pub fn end(&self) -> Option<&PathPoint> {
        self.points.last()
    }
}

impl PathLike for ContinuousPath {
    fn points(&self) -> &[PathPoint] {
        &self.points
    }
}

/// A chain of edges, as returned by the planner.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DiscretePath {
    points: Vec<PathPoint>,
}

impl DiscretePath {
    pub fn new(path: &impl PathLike) -> Self {
        Self { points: path.points().to_vec() }
    }

    /// Append `other` after the current end, shifting its arc length.
    /// The first point of `other` is dropped when it coincides with the
    /// current end.
    pub fn append(&mut self, other: &impl PathLike) {
        let offset = self.range();
        let end = self.points.last().map(|p| p.pose.location);
        for (i, point) in other.points().iter().enumerate() {
            if i == 0 && end.is_some_and(|e| e.distance(point.pose.location) < 1e-6) {
                continue;
            }
            self.points.push(PathPoint { s: point.s + offset, ..*point });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl PathLike for DiscretePath {
    fn points(&self) -> &[PathPoint] {
        &self.points
    }
}

// ── Generators ────────────────────────────────────────────────────────────────

/// Builds the geometric path of one edge.
pub trait PathGenerator: Send + Sync {
    fn make_path(&self, start: &PathPoint, end: &PathPoint, maneuver: Maneuver) -> PathResult<ContinuousPath>;
}

/// Lateral quintic polynomial `y(x)` in the start pose's frame.
///
/// Boundary conditions: lateral offset, slope and second derivative at both
/// ends, derived from the end poses and their curvatures.  The polynomial is
/// sampled every `spacing` metres along `x`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QuinticPathGenerator {
    pub spacing:       f64,
    pub max_curvature: f64,
    /// Shortest longitudinal distance a path may span.
    pub min_length:    f64,
}

impl Default for QuinticPathGenerator {
    fn default() -> Self {
        Self { spacing: 0.25, max_curvature: 0.2, min_length: 1.0 }
    }
}

#[derive(Clone, Debug)]
struct Quintic {
    a: [f64; 6],
}

impl Quintic {
    fn new(start: [f64; 3], end: [f64; 3], length: f64) -> Self {
        let a0 = start[0];
        let a1 = start[1];
        let a2 = start[2] / 2.0;
        let t = length;
        let (t2, t3, t4, t5) = (t * t, t * t * t, t.powi(4), t.powi(5));
        let m = [
            [t3, t4, t5],
            [3.0 * t2, 4.0 * t3, 5.0 * t4],
            [6.0 * t, 12.0 * t2, 20.0 * t3],
        ];
        let b = [
            end[0] - a0 - a1 * t - a2 * t2,
            end[1] - a1 - 2.0 * a2 * t,
            end[2] - 2.0 * a2,
        ];
        let det = det3(&m);
        let column = |c: usize| {
            let mut mc = m;
            for (row, value) in mc.iter_mut().zip(b) {
                row[c] = value;
            }
            det3(&mc) / det
        };
        Self { a: [a0, a1, a2, column(0), column(1), column(2)] }
    }

    fn value(&self, x: f64) -> f64 {
        self.a.iter().rev().fold(0.0, |acc, &c| acc * x + c)
    }

    fn first(&self, x: f64) -> f64 {
        let a = &self.a;
        a[1] + 2.0 * a[2] * x + 3.0 * a[3] * x * x + 4.0 * a[4] * x.powi(3) + 5.0 * a[5] * x.powi(4)
    }

    fn second(&self, x: f64) -> f64 {
        let a = &self.a;
        2.0 * a[2] + 6.0 * a[3] * x + 12.0 * a[4] * x * x + 20.0 * a[5] * x.powi(3)
    }
}

fn det3(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

impl PathGenerator for QuinticPathGenerator {
    fn make_path(&self, start: &PathPoint, end: &PathPoint, maneuver: Maneuver) -> PathResult<ContinuousPath> {
        let (length, offset) = start.pose.to_local(end.pose.location);
        if length < self.min_length {
            return Err(PathError::Degenerate(length));
        }
        let wrong_side = match maneuver {
            Maneuver::KeepLane => false,
            Maneuver::LeftChange => offset <= 0.0,
            Maneuver::RightChange => offset >= 0.0,
        };
        if wrong_side {
            return Err(PathError::ManeuverMismatch { maneuver: maneuver.as_str(), offset });
        }
        let heading = normalize_angle(end.pose.yaw - start.pose.yaw);
        if heading.abs() >= std::f64::consts::FRAC_PI_2 - 1e-3 {
            return Err(PathError::HeadingOutOfRange(heading));
        }

        let end_slope = heading.tan();
        let end_second = end.curvature * (1.0 + end_slope * end_slope).powf(1.5);
        let poly = Quintic::new([0.0, 0.0, start.curvature], [offset, end_slope, end_second], length);

        let steps = (length / self.spacing).ceil().max(1.0) as usize;
        let mut points = Vec::with_capacity(steps + 1);
        let mut s = 0.0;
        let mut previous: Option<Location> = None;
        let mut peak: f64 = 0.0;
        for i in 0..=steps {
            let x = (i as f64 * self.spacing).min(length);
            let y = poly.value(x);
            let slope = poly.first(x);
            let curvature = poly.second(x) / (1.0 + slope * slope).powf(1.5);
            peak = peak.max(curvature.abs());
            let location = start.pose.to_global(x, y);
            if let Some(prev) = previous {
                s += prev.distance(location);
            }
            previous = Some(location);
            points.push(PathPoint {
                s,
                pose: Pose { location, yaw: normalize_angle(start.pose.yaw + slope.atan()) },
                curvature,
            });
        }
        if peak > self.max_curvature {
            return Err(PathError::CurvatureLimit { peak, limit: self.max_curvature });
        }
        Ok(ContinuousPath::from_points(points))
    }
}
