//! Planner tuning knobs.

use crate::{PlannerError, PlannerResult};

/// Distances in metres, times in seconds.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PlannerConfig {
    /// Forward simulation step.
    pub time_step:               f64,
    /// Arc length the planned path should cover.
    pub spatial_horizon:         f64,
    /// Longitudinal length of one graph edge.
    pub lookahead:               f64,
    /// Extra lattice range kept beyond the horizon.
    pub lattice_margin:          f64,
    /// Spacing of lattice nodes.
    pub resolution:              f64,
    /// The cached next station counts as reached once the ego is this close.
    pub reach_tolerance:         f64,
    /// Lattice length kept behind the ego when the lattice is shifted.
    pub shift_margin:            f64,
    /// Lane changes shorter than this are never attempted.
    pub min_lane_change_distance: f64,
    /// Largest lane-center offset towards the opposite side tolerated before
    /// a lane change.
    pub lane_center_tolerance:   f64,
    /// Simulated time budget of one edge.
    pub max_edge_duration:       f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            time_step:                0.1,
            spatial_horizon:          100.0,
            lookahead:                50.0,
            lattice_margin:           30.0,
            resolution:               1.0,
            reach_tolerance:          0.5,
            shift_margin:             5.0,
            min_lane_change_distance: 20.0,
            lane_center_tolerance:    0.5,
            max_edge_duration:        5.0,
        }
    }
}

impl PlannerConfig {
    /// Range of the planning lattice.
    pub fn lattice_range(&self) -> f64 {
        self.spatial_horizon + self.lattice_margin
    }

    /// Reject non-positive or mutually inconsistent values.
    pub fn validate(&self) -> PlannerResult<()> {
        let positive = [
            ("time_step", self.time_step),
            ("spatial_horizon", self.spatial_horizon),
            ("lookahead", self.lookahead),
            ("resolution", self.resolution),
            ("reach_tolerance", self.reach_tolerance),
            ("max_edge_duration", self.max_edge_duration),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(PlannerError::Config(format!("{name} must be positive, got {value}")));
            }
        }
        let non_negative = [
            ("lattice_margin", self.lattice_margin),
            ("shift_margin", self.shift_margin),
            ("min_lane_change_distance", self.min_lane_change_distance),
            ("lane_center_tolerance", self.lane_center_tolerance),
        ];
        for (name, value) in non_negative {
            if !(value >= 0.0) {
                return Err(PlannerError::Config(format!("{name} must not be negative, got {value}")));
            }
        }
        if self.lookahead > self.spatial_horizon {
            return Err(PlannerError::Config(format!(
                "lookahead {} exceeds the spatial horizon {}",
                self.lookahead, self.spatial_horizon
            )));
        }
        if self.resolution >= self.lookahead {
            return Err(PlannerError::Config(format!(
                "resolution {} must be finer than the lookahead {}",
                self.resolution, self.lookahead
            )));
        }
        if self.time_step > self.max_edge_duration {
            return Err(PlannerError::Config(format!(
                "time step {} exceeds the edge duration {}",
                self.time_step, self.max_edge_duration
            )));
        }
        Ok(())
    }
}
