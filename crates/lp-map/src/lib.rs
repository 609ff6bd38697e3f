//! `lp-map`: road geometry, route ordering, and a synthetic highway.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                    |
//! |-------------|-------------------------------------------------------------|
//! | [`map`]     | `RoadMap` trait, `Waypoint`                                 |
//! | [`router`]  | `Router` trait, `SequenceRouter`                            |
//! | [`highway`] | `Highway` (straight lanes + R-tree), `HighwayBuilder`       |
//! | [`context`] | `RoadContext` (shared map + router handle)                  |
//! | [`error`]   | `MapError`, `MapResult<T>`                                  |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on `Waypoint`.             |

pub mod context;
pub mod error;
pub mod highway;
pub mod map;
pub mod router;

#[cfg(test)]
mod tests;

pub use context::RoadContext;
pub use error::{MapError, MapResult};
pub use highway::{Highway, HighwayBuilder};
pub use map::{RoadMap, Waypoint};
pub use router::{Router, SequenceRouter};
