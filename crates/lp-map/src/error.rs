//! Map-subsystem error type.

use thiserror::Error;

use lp_core::RoadId;

/// Errors produced by `lp-map`.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("{0} is not on the route")]
    OffRoute(RoadId),

    #[error("{0} not found in map")]
    UnknownRoad(RoadId),

    #[error("look-ahead distance must be positive, got {0}")]
    InvalidDistance(f64),

    #[error("map configuration error: {0}")]
    Config(String),
}

pub type MapResult<T> = Result<T, MapError>;
