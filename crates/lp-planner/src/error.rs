//! Planner error type.

use thiserror::Error;

use lp_core::{StationId, VehicleId};
use lp_lattice::LatticeError;
use lp_map::MapError;
use lp_traffic::TrafficError;

/// Errors produced by `lp-planner`.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("planner configuration error: {0}")]
    Config(String),

    #[error("planning for {expected} but the snapshot ego is {found}")]
    WrongEgo { expected: VehicleId, found: VehicleId },

    #[error("ego is not on the road: {0}")]
    EgoOffRoad(String),

    #[error("ego is not on the planning lattice: {0}")]
    EgoOffLattice(String),

    #[error("ego speed {0} m/s falls outside every speed bin")]
    RootOutOfBins(f64),

    #[error("cannot reach any immediate next nodes\n{snapshot}")]
    NoFrontier { snapshot: String },

    #[error("terminal speed {speed} m/s against policy speed {policy_speed} m/s cannot be scored")]
    InvalidSpeed { speed: f64, policy_speed: f64 },

    #[error("no terminal station in the graph")]
    NoTerminal,

    #[error("the best terminal station {0} has no parent")]
    DegenerateGraph(StationId),

    #[error("{0} has children and is not a terminal station")]
    NotTerminal(StationId),

    #[error("station graph is inconsistent: {0}")]
    CorruptedGraph(String),

    #[error("traffic error: {0}")]
    Traffic(#[from] TrafficError),

    #[error("lattice error: {0}")]
    Lattice(#[from] LatticeError),

    #[error("map error: {0}")]
    Map(#[from] MapError),
}

pub type PlannerResult<T> = Result<T, PlannerError>;
