//! `lp-planner`: incremental station-graph motion planner.
//!
//! # Planning cycle
//!
//! ```text
//! plan_path(ego, snapshot):
//!   ① Lattice   : create the planning lattice, or shift it once the ego
//!                 reached the next station of the previous cycle.
//!   ② Prune     : new root at the ego; re-connect it to the previous
//!                 frontier distance unless that station was reached.
//!   ③ Expand    : breadth first, keep-lane / left / right edges at the
//!                 lookahead, each validated by forward simulation
//!                 (parallel with the `parallel` feature).
//!   ④ Select    : cheapest terminal: cost-to-come + speed + distance cost.
//!   ⑤ Backtrack : optimal parents back to the root, paths merged.
//! ```
//!
//! # Crate layout
//!
//! | Module       | Contents                                                 |
//! |--------------|----------------------------------------------------------|
//! | [`key`]      | `StationKey`, `NodeKey`, `SpeedBinKey`, speed bins       |
//! | [`station`]  | `Station`, parent and child links                        |
//! | [`graph`]    | `StationGraph` arena                                     |
//! | [`edge`]     | `Longitudinal`, `Discard`, edge evaluation               |
//! | [`planner`]  | `LatticePlanner`, terminal costs, trajectory segments    |
//! | [`builder`]  | `PlannerBuilder`                                         |
//! | [`config`]   | `PlannerConfig`                                          |
//! | [`observer`] | `PlannerObserver`, `NoopObserver`                        |
//!
//! # Cargo features
//!
//! | Feature    | Effect                                                 |
//! |------------|--------------------------------------------------------|
//! | `parallel` | Evaluates candidate edges on Rayon's thread pool.      |
//! | `fx-hash`  | FxHash for the station table.                          |
//! | `serde`    | Derives `Serialize`/`Deserialize` on `PlannerConfig`.  |

pub mod builder;
pub mod config;
pub mod edge;
pub mod error;
pub mod graph;
pub mod key;
pub mod observer;
pub mod planner;
pub mod station;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use builder::PlannerBuilder;
pub use config::PlannerConfig;
pub use edge::{DEFAULT_ACCELERATION_OPTIONS, Discard, Longitudinal};
pub use error::{PlannerError, PlannerResult};
pub use graph::StationGraph;
pub use key::{NodeKey, SPEED_BINS, SpeedBinKey, StationKey, speed_bin};
pub use observer::{NoopObserver, PlannerObserver};
pub use planner::{
    Edge, IdmLatticePlanner, LatticePlanner, SpatiotemporalLatticePlanner, TrajectorySegment, merge_segments,
    terminal_distance_cost, terminal_speed_cost,
};
pub use station::{ChildLink, ChildSide, ParentLink, ParentSide, Station};
