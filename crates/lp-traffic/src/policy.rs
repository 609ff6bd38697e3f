//! Plug points of the simulator: how vehicles pick an acceleration, and how a
//! simulated step is priced.

use lp_core::Vehicle;

use crate::{IntelligentDriverModel, Snapshot, TrafficError, TrafficResult};

/// Chooses the acceleration of one vehicle for the next simulation step.
pub trait AccelerationPolicy: Send + Sync {
    fn acceleration(&self, snapshot: &Snapshot, vehicle: &Vehicle) -> TrafficResult<f64>;
}

/// Car following: IDM behind the same-lane lead, free-road IDM otherwise.
#[derive(Clone, Debug, Default)]
pub struct IdmPolicy {
    pub idm: IntelligentDriverModel,
}

impl IdmPolicy {
    pub fn new(idm: IntelligentDriverModel) -> Self {
        Self { idm }
    }
}

impl AccelerationPolicy for IdmPolicy {
    fn acceleration(&self, snapshot: &Snapshot, vehicle: &Vehicle) -> TrafficResult<f64> {
        match snapshot.traffic_lattice().front(vehicle.id)? {
            Some((lead, gap)) => {
                let lead = snapshot.vehicle(lead).ok_or(TrafficError::UnknownVehicle(lead))?;
                self.idm.accel_with_lead(vehicle.speed, vehicle.policy_speed, lead.speed, gap)
            }
            None => self.idm.accel(vehicle.speed, vehicle.policy_speed),
        }
    }
}

/// Every vehicle keeps the acceleration stored in its state.
#[derive(Copy, Clone, Debug, Default)]
pub struct ConstantAccelerationPolicy;

impl AccelerationPolicy for ConstantAccelerationPolicy {
    fn acceleration(&self, _snapshot: &Snapshot, vehicle: &Vehicle) -> TrafficResult<f64> {
        Ok(vehicle.acceleration)
    }
}

/// Prices one simulation step of the ego vehicle.
pub trait StageCost: Send + Sync {
    /// `ego` is the state after the step, `previous_acceleration` the ego
    /// acceleration of the step before, `dt` the step length.
    fn step_cost(&self, ego: &Vehicle, previous_acceleration: f64, dt: f64) -> f64;
}

/// Weights of [`WeightedStageCost`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CostParams {
    /// Weight on squared longitudinal acceleration.
    pub acceleration_weight: f64,
    /// Weight on squared longitudinal jerk.
    pub jerk_weight:         f64,
    /// Weight on squared lateral acceleration `v² κ`.
    pub lateral_weight:      f64,
    /// Weight on the squared relative shortfall from the policy speed.
    pub speed_weight:        f64,
}

impl Default for CostParams {
    fn default() -> Self {
        Self {
            acceleration_weight: 1.0,
            jerk_weight:         0.1,
            lateral_weight:      1.0,
            speed_weight:        0.0,
        }
    }
}

/// Quadratic comfort cost integrated over the step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WeightedStageCost {
    pub params: CostParams,
}

impl WeightedStageCost {
    pub fn new(params: CostParams) -> Self {
        Self { params }
    }
}

impl StageCost for WeightedStageCost {
    fn step_cost(&self, ego: &Vehicle, previous_acceleration: f64, dt: f64) -> f64 {
        if dt <= 0.0 {
            return 0.0;
        }
        let p = &self.params;
        let jerk = (ego.acceleration - previous_acceleration) / dt;
        let lateral = ego.speed * ego.speed * ego.curvature;
        let shortfall = if ego.policy_speed > 0.0 {
            ((ego.policy_speed - ego.speed) / ego.policy_speed).max(0.0)
        } else {
            0.0
        };
        dt * (p.acceleration_weight * ego.acceleration.powi(2)
            + p.jerk_weight * jerk.powi(2)
            + p.lateral_weight * lateral.powi(2)
            + p.speed_weight * shortfall.powi(2))
    }
}
