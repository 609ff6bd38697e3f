//! `lp-lattice`: the road-aligned lattice and vehicle occupancy on it.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                     |
//! |-------------|--------------------------------------------------------------|
//! | [`lattice`] | `Lattice` node arena, `LatticeNode`                          |
//! | [`traffic`] | `TrafficLattice`, `Placement`, `LaneChange`, `TrafficUpdate` |
//! | [`error`]   | `LatticeError`, `LatticeResult<T>`                           |
//!
//! A [`Lattice`] is a grid of discretized road positions: `front`/`back`
//! links follow a lane, `left`/`right` links cross lanes, and every node
//! carries its arc-length distance from the lattice start.  A
//! [`TrafficLattice`] adds vehicle occupancy on top, which yields collision
//! detection and same-lane / adjacent-lane neighbor queries.

pub mod error;
pub mod lattice;
pub mod traffic;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{LatticeError, LatticeResult};
pub use lattice::{Lattice, LatticeNode};
pub use traffic::{
    LaneChange, Placement, TrafficLattice, TrafficUpdate, lattice_start_and_range, vehicle_waypoints,
};
