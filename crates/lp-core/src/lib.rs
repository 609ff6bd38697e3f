//! `lp-core`: foundational types for the lattice motion planner.
//!
//! This crate is a dependency of every other `lp-*` crate.  It has no `lp-*`
//! dependencies and no mandatory external ones.
//!
//! # What lives here
//!
//! | Module        | Contents                                               |
//! |---------------|--------------------------------------------------------|
//! | [`ids`]       | `VehicleId`, `NodeId`, `StationId`, `RoadId`, `WaypointId` |
//! | [`geometry`]  | `Location`, `Pose`, `BoundingBox`, `normalize_angle`   |
//! | [`vehicle`]   | `Vehicle`                                              |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod geometry;
pub mod ids;
pub mod vehicle;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use geometry::{BoundingBox, Location, Pose, normalize_angle};
pub use ids::{NodeId, RoadId, StationId, VehicleId, WaypointId};
pub use vehicle::Vehicle;
