//! Route sequencing.
//!
//! A [`Router`] knows the fixed sequence of roads the vehicles drive along.
//! It is consulted to order roads when sizing a lattice and to keep lattice
//! growth and agent motion on the route at road boundaries.

use lp_core::RoadId;

use crate::{MapError, MapResult, RoadMap, Waypoint};

/// Road ordering along a fixed route.
///
/// Every query on a road that is not part of the route fails with
/// [`MapError::OffRoute`].  `Ok(None)` means the route ends there.
pub trait Router: Send + Sync {
    fn has_road(&self, road: RoadId) -> bool;

    fn next_road(&self, road: RoadId) -> MapResult<Option<RoadId>>;

    fn prev_road(&self, road: RoadId) -> MapResult<Option<RoadId>>;

    /// The waypoint `distance` metres ahead of `waypoint` that stays on the
    /// route: a candidate on the same road wins, otherwise the candidate on
    /// the route's next road.  `Ok(None)` when neither exists.
    fn front_waypoint(
        &self,
        map: &dyn RoadMap,
        waypoint: &Waypoint,
        distance: f64,
    ) -> MapResult<Option<Waypoint>> {
        if distance <= 0.0 {
            return Err(MapError::InvalidDistance(distance));
        }
        let candidates = map.next(waypoint, distance);
        if let Some(same) = candidates.iter().find(|c| c.road == waypoint.road) {
            return Ok(Some(same.clone()));
        }
        let Some(next) = self.next_road(waypoint.road)? else {
            return Ok(None);
        };
        Ok(candidates.into_iter().find(|c| c.road == next))
    }
}

/// A [`Router`] over an explicit list of roads.
///
/// With `looped` set the last road is followed by the first one again, which
/// models a closed circuit.
#[derive(Clone, Debug)]
pub struct SequenceRouter {
    roads:  Vec<RoadId>,
    looped: bool,
}

impl SequenceRouter {
    pub fn new(roads: Vec<RoadId>) -> Self {
        Self { roads, looped: false }
    }

    pub fn looped(roads: Vec<RoadId>) -> Self {
        Self { roads, looped: true }
    }

    pub fn roads(&self) -> &[RoadId] {
        &self.roads
    }

    fn position(&self, road: RoadId) -> MapResult<usize> {
        self.roads
            .iter()
            .position(|&r| r == road)
            .ok_or(MapError::OffRoute(road))
    }
}

impl Router for SequenceRouter {
    fn has_road(&self, road: RoadId) -> bool {
        self.roads.contains(&road)
    }

    fn next_road(&self, road: RoadId) -> MapResult<Option<RoadId>> {
        let i = self.position(road)?;
        if i + 1 < self.roads.len() {
            Ok(Some(self.roads[i + 1]))
        } else if self.looped {
            Ok(self.roads.first().copied())
        } else {
            Ok(None)
        }
    }

    fn prev_road(&self, road: RoadId) -> MapResult<Option<RoadId>> {
        let i = self.position(road)?;
        if i > 0 {
            Ok(Some(self.roads[i - 1]))
        } else if self.looped {
            Ok(self.roads.last().copied())
        } else {
            Ok(None)
        }
    }
}
