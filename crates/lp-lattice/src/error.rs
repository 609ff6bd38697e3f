//! Lattice-subsystem error type.

use thiserror::Error;

use lp_core::VehicleId;
use lp_map::MapError;

/// Errors produced by `lp-lattice`.
#[derive(Debug, Error)]
pub enum LatticeError {
    #[error("lattice range {range} m must exceed the resolution {resolution} m")]
    RangeTooShort { range: f64, resolution: f64 },

    #[error("shortening to {requested} m would leave no nodes in the lattice")]
    Exhausted { requested: f64 },

    #[error("no vehicle has a waypoint on the route")]
    NoTraffic,

    #[error("roads {0:?} cannot be ordered along the route")]
    DisconnectedRoads(Vec<u32>),

    #[error("{0} is not tracked by the traffic lattice")]
    UnknownVehicle(VehicleId),

    #[error("vehicles to update {update:?} do not match the tracked vehicles {tracked:?}")]
    VehicleSetMismatch { tracked: Vec<u32>, update: Vec<u32> },

    #[error("the new lattice start {0} is not on the existing lattice")]
    StartOffLattice(String),

    #[error("vehicles collide while registering {0}")]
    Collision(VehicleId),

    #[error("occupancy of {vehicle} is inconsistent: {detail}")]
    InconsistentOccupancy { vehicle: VehicleId, detail: String },

    #[error("map error: {0}")]
    Map(#[from] MapError),
}

pub type LatticeResult<T> = Result<T, LatticeError>;
