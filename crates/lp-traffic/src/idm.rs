//! Intelligent Driver Model.
//!
//! Free road:
//!
//! ```text
//! a = a_max * (1 - (v / v0)^δ)
//! ```
//!
//! Behind a lead vehicle at gap `s` closing at `Δv = v - v_lead`:
//!
//! ```text
//! s* = s0 + max(0, v*T + v*Δv / (2 * sqrt(a_max * b)))
//! a  = a_max * (1 - (v / v0)^δ - (s* / s)^2)
//! ```
//!
//! Results are clamped to `[-max_deceleration, a_max]`.

use crate::{TrafficError, TrafficResult};

/// Policy speeds at or below this are rejected.
const MIN_POLICY_SPEED: f64 = 1e-3;

/// Tuning of the car-following model.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct IdmParams {
    /// Desired time headway `T`, in seconds.
    pub time_gap:             f64,
    /// Standstill distance `s0`, in metres.
    pub distance_gap:         f64,
    /// Acceleration exponent `δ`.
    pub exponent:             f64,
    /// Maximum acceleration `a_max`, in m/s².
    pub max_acceleration:     f64,
    /// Comfortable deceleration `b`, in m/s².
    pub comfort_deceleration: f64,
    /// Hard deceleration limit, in m/s².
    pub max_deceleration:     f64,
}

impl Default for IdmParams {
    fn default() -> Self {
        Self {
            time_gap:             1.0,
            distance_gap:         6.0,
            exponent:             4.0,
            max_acceleration:     2.0,
            comfort_deceleration: 3.0,
            max_deceleration:     8.0,
        }
    }
}

/// Stateless car-following model.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IntelligentDriverModel {
    params: IdmParams,
}

impl IntelligentDriverModel {
    pub fn new(params: IdmParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &IdmParams {
        &self.params
    }

    /// Acceleration on a free road.
    pub fn accel(&self, speed: f64, policy_speed: f64) -> TrafficResult<f64> {
        self.check(speed, policy_speed)?;
        Ok(self.clamp(self.params.max_acceleration * self.free_term(speed, policy_speed)))
    }

    /// Acceleration behind a lead vehicle `gap` metres ahead.
    pub fn accel_with_lead(
        &self,
        speed: f64,
        policy_speed: f64,
        lead_speed: f64,
        gap: f64,
    ) -> TrafficResult<f64> {
        self.check(speed, policy_speed)?;
        if lead_speed < 0.0 {
            return Err(TrafficError::InvalidSpeed(lead_speed));
        }
        if gap <= 0.0 {
            return Ok(-self.params.max_deceleration);
        }
        let p = &self.params;
        let closing = speed - lead_speed;
        let desired = p.distance_gap
            + (speed * p.time_gap
                + speed * closing / (2.0 * (p.max_acceleration * p.comfort_deceleration).sqrt()))
            .max(0.0);
        let interaction = (desired / gap).powi(2);
        Ok(self.clamp(p.max_acceleration * (self.free_term(speed, policy_speed) - interaction)))
    }

    fn free_term(&self, speed: f64, policy_speed: f64) -> f64 {
        1.0 - (speed / policy_speed).powf(self.params.exponent)
    }

    fn clamp(&self, accel: f64) -> f64 {
        accel.clamp(-self.params.max_deceleration, self.params.max_acceleration)
    }

    fn check(&self, speed: f64, policy_speed: f64) -> TrafficResult<()> {
        if policy_speed <= MIN_POLICY_SPEED {
            return Err(TrafficError::InvalidPolicySpeed(policy_speed));
        }
        if speed < 0.0 {
            return Err(TrafficError::InvalidSpeed(speed));
        }
        Ok(())
    }
}
