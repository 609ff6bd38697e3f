//! Error types for paths and traffic simulation.

use thiserror::Error;

use lp_core::VehicleId;
use lp_lattice::LatticeError;
use lp_map::MapError;

/// Reasons a path generator cannot connect two poses.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PathError {
    #[error("end pose is {0:.3} m ahead of the start; a path needs forward progress")]
    Degenerate(f64),

    #[error("{maneuver} requested but the end pose is {offset:.3} m to the side")]
    ManeuverMismatch { maneuver: &'static str, offset: f64 },

    #[error("peak curvature {peak:.4} 1/m exceeds the limit {limit:.4} 1/m")]
    CurvatureLimit { peak: f64, limit: f64 },

    #[error("relative heading {0:.3} rad cannot be reached by a lateral polynomial")]
    HeadingOutOfRange(f64),
}

pub type PathResult<T> = Result<T, PathError>;

/// Errors produced by the car-following model and the traffic simulator.
#[derive(Debug, Error)]
pub enum TrafficError {
    #[error("policy speed {0} m/s is too small for the car-following model")]
    InvalidPolicySpeed(f64),

    #[error("speed {0} m/s must not be negative")]
    InvalidSpeed(f64),

    #[error("time step {dt} s and horizon {max_duration} s must be positive")]
    InvalidStep { dt: f64, max_duration: f64 },

    #[error("{0} appears more than once in the snapshot")]
    DuplicateVehicle(VehicleId),

    #[error("{0} is not part of the snapshot")]
    UnknownVehicle(VehicleId),

    #[error("ego {0} could not be placed on the traffic lattice")]
    EgoOffLattice(VehicleId),

    #[error("lattice error: {0}")]
    Lattice(#[from] LatticeError),

    #[error("map error: {0}")]
    Map(#[from] MapError),

    #[error("path error: {0}")]
    Path(#[from] PathError),
}

pub type TrafficResult<T> = Result<T, TrafficError>;
