//! Shared handle on the map and the router.

use std::fmt;
use std::sync::Arc;

use lp_core::{Location, RoadId};

use crate::{MapResult, RoadMap, Router, Waypoint};

/// The road network as seen by the lattice, the simulator and the planner:
/// geometry plus route ordering.  Cheap to clone.
#[derive(Clone)]
pub struct RoadContext {
    map:    Arc<dyn RoadMap>,
    router: Arc<dyn Router>,
}

impl RoadContext {
    pub fn new(map: Arc<dyn RoadMap>, router: Arc<dyn Router>) -> Self {
        Self { map, router }
    }

    pub fn map(&self) -> &dyn RoadMap {
        self.map.as_ref()
    }

    pub fn router(&self) -> &dyn Router {
        self.router.as_ref()
    }

    #[inline]
    pub fn waypoint(&self, location: Location) -> Option<Waypoint> {
        self.map.waypoint(location)
    }

    #[inline]
    pub fn project(&self, location: Location) -> Option<Waypoint> {
        self.map.project(location)
    }

    /// See [`Router::front_waypoint`].
    pub fn front_waypoint(&self, waypoint: &Waypoint, distance: f64) -> MapResult<Option<Waypoint>> {
        self.router.front_waypoint(self.map.as_ref(), waypoint, distance)
    }

    pub fn road_length(&self, road: RoadId) -> MapResult<f64> {
        self.map.road_length(road)
    }
}

impl fmt::Debug for RoadContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoadContext").finish_non_exhaustive()
    }
}
