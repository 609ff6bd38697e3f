//! The road-geometry abstraction consumed by the lattice and the simulator.

use std::fmt;

use lp_core::{Location, Pose, RoadId, WaypointId};

use crate::MapResult;

/// A position on a lane.
///
/// `s` is the arc length from the start of `road`.  Lanes are numbered from
/// the rightmost lane (`0`) increasing to the left.  `pose` sits on the lane
/// centre line and points along the direction of travel.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Waypoint {
    pub id:         WaypointId,
    pub road:       RoadId,
    pub lane:       u32,
    pub s:          f64,
    pub pose:       Pose,
    pub lane_width: f64,
}

impl Waypoint {
    #[inline]
    pub fn location(&self) -> Location {
        self.pose.location
    }

    /// Signed distance from the lane centre line to `location`; positive
    /// values lie to the left of the direction of travel.
    pub fn lateral_offset(&self, location: Location) -> f64 {
        self.pose.to_local(location).1
    }
}

impl fmt::Display for Waypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "waypoint {} road:{} lane:{} s:{:.3} {}",
            self.id.0, self.road.0, self.lane, self.s, self.pose
        )
    }
}

/// Read-only road geometry.
///
/// Implementations must be `Send + Sync` so a single map can be shared
/// between the planner and the parallel edge evaluation.
pub trait RoadMap: Send + Sync {
    /// Nearest discretized waypoint to `location`, or `None` when the location
    /// is off the road.
    fn waypoint(&self, location: Location) -> Option<Waypoint>;

    /// Projection of `location` onto the nearest lane with a continuous `s`.
    /// The returned `id` is that of the nearest discretized waypoint.
    fn project(&self, location: Location) -> Option<Waypoint>;

    /// Waypoints `distance` metres further along the lane.  More than one
    /// candidate is returned at a fork; none at a dead end.
    fn next(&self, waypoint: &Waypoint, distance: f64) -> Vec<Waypoint>;

    /// The waypoint at the same position in the lane to the left, if any.
    fn left(&self, waypoint: &Waypoint) -> Option<Waypoint>;

    /// The waypoint at the same position in the lane to the right, if any.
    fn right(&self, waypoint: &Waypoint) -> Option<Waypoint>;

    fn road_length(&self, road: RoadId) -> MapResult<f64>;

    /// Signed curvature of the lane centre line at `waypoint`.
    fn lane_curvature(&self, _waypoint: &Waypoint) -> f64 {
        0.0
    }
}
