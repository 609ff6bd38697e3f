//! Kinematic state of a single vehicle.

use std::fmt;

use crate::{BoundingBox, Location, Pose, VehicleId};

/// A vehicle as seen by the planner.
///
/// Speeds are in m/s, acceleration in m/s², curvature in 1/m.  `policy_speed`
/// is the speed the vehicle would settle at on a free road.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vehicle {
    pub id:           VehicleId,
    pub bounding_box: BoundingBox,
    pub pose:         Pose,
    pub speed:        f64,
    pub policy_speed: f64,
    pub acceleration: f64,
    pub curvature:    f64,
}

impl Vehicle {
    pub fn new(id: VehicleId, pose: Pose, speed: f64, policy_speed: f64) -> Self {
        Self {
            id,
            bounding_box: BoundingBox::default(),
            pose,
            speed,
            policy_speed,
            acceleration: 0.0,
            curvature: 0.0,
        }
    }

    pub fn with_bounding_box(mut self, bounding_box: BoundingBox) -> Self {
        self.bounding_box = bounding_box;
        self
    }

    pub fn with_acceleration(mut self, acceleration: f64) -> Self {
        self.acceleration = acceleration;
        self
    }

    #[inline]
    pub fn location(&self) -> Location {
        self.pose.location
    }

    /// Centre of the front bumper.
    pub fn head_location(&self) -> Location {
        self.pose.location.advanced(self.pose.yaw, self.bounding_box.half_length)
    }

    /// Centre of the rear bumper.
    pub fn rear_location(&self) -> Location {
        self.pose.location.advanced(self.pose.yaw, -self.bounding_box.half_length)
    }

    #[inline]
    pub fn length(&self) -> f64 {
        2.0 * self.bounding_box.half_length
    }
}

impl fmt::Display for Vehicle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id:{} {} policy:{:.3} speed:{:.3} accel:{:.3} curvature:{:.4}",
            self.id.0, self.pose, self.policy_speed, self.speed, self.acceleration, self.curvature,
        )
    }
}
