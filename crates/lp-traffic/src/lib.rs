//! `lp-traffic`: car following, candidate paths, and forward simulation.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                    |
//! |---------------|-------------------------------------------------------------|
//! | [`idm`]       | `IntelligentDriverModel`, `IdmParams`                       |
//! | [`path`]      | `Maneuver`, `PathGenerator`, `QuinticPathGenerator`, paths  |
//! | [`snapshot`]  | `Snapshot` (ego + agents + traffic lattice)                 |
//! | [`policy`]    | `AccelerationPolicy`, `StageCost` and their implementations |
//! | [`simulator`] | `TrafficSimulator`, `SimulationOutcome`, `EgoSample`        |
//! | [`error`]     | `TrafficError`, `PathError`                                 |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on parameters and paths.   |

pub mod error;
pub mod idm;
pub mod path;
pub mod policy;
pub mod simulator;
pub mod snapshot;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{PathError, PathResult, TrafficError, TrafficResult};
pub use idm::{IdmParams, IntelligentDriverModel};
pub use path::{
    ContinuousPath, DiscretePath, Maneuver, PathGenerator, PathLike, PathPoint, QuinticPathGenerator,
};
pub use policy::{
    AccelerationPolicy, ConstantAccelerationPolicy, CostParams, IdmPolicy, StageCost, WeightedStageCost,
};
pub use simulator::{EgoSample, SimulationOutcome, TrafficSimulator};
pub use snapshot::Snapshot;
