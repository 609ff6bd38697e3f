//! Synthetic straight multi-lane highway.
//!
//! Roads are laid end to end along the `+x` axis starting at the origin.
//! Lane `l` has its centre line at `y = l * lane_width`, so lane `0` is the
//! rightmost lane and lanes count up to the left.
//!
//! # Spatial index
//!
//! Every discretized waypoint (one per lane every `resolution` metres) is
//! stored in an R-tree (via `rstar`).  Nearest-waypoint and projection
//! queries snap through the index and then refine along the lane.

use std::collections::HashMap;

use rstar::{AABB, PointDistance, RTree, RTreeObject};

use lp_core::{Location, Pose, RoadId, WaypointId};

use crate::{MapError, MapResult, RoadMap, Waypoint};

// ── R-tree waypoint entry ─────────────────────────────────────────────────────

#[derive(Clone)]
struct SampleEntry {
    point: [f64; 2],
    road:  usize,
    lane:  u32,
    index: u32,
}

impl RTreeObject for SampleEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for SampleEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

// ── Highway ───────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
struct RoadSegment {
    id:      RoadId,
    start_x: f64,
    length:  f64,
    samples: u32,
}

/// A straight highway made of consecutive roads sharing the same lane layout.
///
/// Do not construct directly; use [`HighwayBuilder`].
pub struct Highway {
    roads:      Vec<RoadSegment>,
    road_index: HashMap<RoadId, usize>,
    lanes:      u32,
    lane_width: f64,
    resolution: f64,
    index:      RTree<SampleEntry>,
}

impl Highway {
    pub fn lanes(&self) -> u32 {
        self.lanes
    }

    pub fn lane_width(&self) -> f64 {
        self.lane_width
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Road ids in driving order.
    pub fn road_ids(&self) -> Vec<RoadId> {
        self.roads.iter().map(|r| r.id).collect()
    }

    pub fn total_length(&self) -> f64 {
        self.roads.iter().map(|r| r.length).sum()
    }

    /// Map-frame location of the centre of `lane` at `s` metres from the start
    /// of the highway, or `None` outside the highway.
    pub fn location_at(&self, lane: u32, s: f64) -> Option<Location> {
        if lane >= self.lanes || s < 0.0 || s >= self.total_length() {
            return None;
        }
        Some(Location::new(s, self.lane_y(lane)))
    }

    fn lane_y(&self, lane: u32) -> f64 {
        f64::from(lane) * self.lane_width
    }

    fn encode_id(road: RoadId, lane: u32, index: u32) -> WaypointId {
        WaypointId((u64::from(road.0) << 40) | (u64::from(lane) << 32) | u64::from(index))
    }

    /// Move `(road, s)` onto the road that actually contains `s`.
    fn normalize(&self, mut road: usize, mut s: f64) -> Option<(usize, f64)> {
        while s >= self.roads[road].length {
            s -= self.roads[road].length;
            road += 1;
            if road >= self.roads.len() {
                return None;
            }
        }
        while s < 0.0 {
            road = road.checked_sub(1)?;
            s += self.roads[road].length;
        }
        Some((road, s))
    }

    fn make_waypoint(&self, road: usize, lane: u32, s: f64) -> Waypoint {
        let segment = &self.roads[road];
        let mut id_road = road;
        let mut index = (s / self.resolution).round() as u32;
        if index >= segment.samples {
            if road + 1 < self.roads.len() {
                id_road = road + 1;
                index = 0;
            } else {
                index = segment.samples - 1;
            }
        }
        Waypoint {
            id:         Self::encode_id(self.roads[id_road].id, lane, index),
            road:       segment.id,
            lane,
            s,
            pose:       Pose::new(segment.start_x + s, self.lane_y(lane), 0.0),
            lane_width: self.lane_width,
        }
    }

    fn road_position(&self, road: RoadId) -> Option<usize> {
        self.road_index.get(&road).copied()
    }

    fn nearest_sample(&self, location: Location) -> Option<&SampleEntry> {
        let entry = self.index.nearest_neighbor(&[location.x, location.y])?;
        let lateral = (location.y - entry.point[1]).abs();
        let longitudinal = (location.x - entry.point[0]).abs();
        (lateral <= self.lane_width && longitudinal <= self.resolution).then_some(entry)
    }
}

impl RoadMap for Highway {
    fn waypoint(&self, location: Location) -> Option<Waypoint> {
        let entry = self.nearest_sample(location)?;
        let s = f64::from(entry.index) * self.resolution;
        Some(self.make_waypoint(entry.road, entry.lane, s))
    }

    fn project(&self, location: Location) -> Option<Waypoint> {
        let entry = self.nearest_sample(location)?;
        let s = f64::from(entry.index) * self.resolution + (location.x - entry.point[0]);
        let (road, s) = self.normalize(entry.road, s)?;
        Some(self.make_waypoint(road, entry.lane, s))
    }

    fn next(&self, waypoint: &Waypoint, distance: f64) -> Vec<Waypoint> {
        let Some(road) = self.road_position(waypoint.road) else {
            return Vec::new();
        };
        match self.normalize(road, waypoint.s + distance) {
            Some((road, s)) => vec![self.make_waypoint(road, waypoint.lane, s)],
            None => Vec::new(),
        }
    }

    fn left(&self, waypoint: &Waypoint) -> Option<Waypoint> {
        let road = self.road_position(waypoint.road)?;
        (waypoint.lane + 1 < self.lanes)
            .then(|| self.make_waypoint(road, waypoint.lane + 1, waypoint.s))
    }

    fn right(&self, waypoint: &Waypoint) -> Option<Waypoint> {
        let road = self.road_position(waypoint.road)?;
        let lane = waypoint.lane.checked_sub(1)?;
        Some(self.make_waypoint(road, lane, waypoint.s))
    }

    fn road_length(&self, road: RoadId) -> MapResult<f64> {
        self.road_position(road)
            .map(|i| self.roads[i].length)
            .ok_or(MapError::UnknownRoad(road))
    }
}

// ── HighwayBuilder ────────────────────────────────────────────────────────────

/// Construct a [`Highway`] road by road, then call [`build`](Self::build).
///
/// # Example
///
/// ```
/// use lp_core::RoadId;
/// use lp_map::{HighwayBuilder, RoadMap};
///
/// let highway = HighwayBuilder::new(3, 3.5)
///     .road(RoadId(1), 200.0)
///     .road(RoadId(2), 300.0)
///     .build()
///     .unwrap();
/// assert_eq!(highway.total_length(), 500.0);
/// assert_eq!(highway.road_length(RoadId(2)).unwrap(), 300.0);
/// ```
pub struct HighwayBuilder {
    lanes:      u32,
    lane_width: f64,
    resolution: f64,
    roads:      Vec<(RoadId, f64)>,
}

impl HighwayBuilder {
    pub fn new(lanes: u32, lane_width: f64) -> Self {
        Self { lanes, lane_width, resolution: 1.0, roads: Vec::new() }
    }

    /// Spacing of the discretized waypoints (default 1 m).
    pub fn resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    /// Append a road of `length` metres after the previously added ones.
    pub fn road(mut self, id: RoadId, length: f64) -> Self {
        self.roads.push((id, length));
        self
    }

    pub fn build(self) -> MapResult<Highway> {
        if self.lanes == 0 {
            return Err(MapError::Config("a highway needs at least one lane".into()));
        }
        if self.lane_width <= 0.0 || self.resolution <= 0.0 {
            return Err(MapError::Config(format!(
                "lane width ({}) and resolution ({}) must be positive",
                self.lane_width, self.resolution
            )));
        }
        if self.roads.is_empty() {
            return Err(MapError::Config("a highway needs at least one road".into()));
        }

        let mut roads = Vec::with_capacity(self.roads.len());
        let mut road_index = HashMap::with_capacity(self.roads.len());
        let mut start_x = 0.0;
        for (i, &(id, length)) in self.roads.iter().enumerate() {
            if length < self.resolution {
                return Err(MapError::Config(format!(
                    "{id} is shorter ({length} m) than the waypoint resolution"
                )));
            }
            if road_index.insert(id, i).is_some() {
                return Err(MapError::Config(format!("{id} added twice")));
            }
            let samples = (length / self.resolution - 1e-9).ceil() as u32;
            roads.push(RoadSegment { id, start_x, length, samples });
            start_x += length;
        }

        let mut entries = Vec::new();
        for (road, segment) in roads.iter().enumerate() {
            for lane in 0..self.lanes {
                let y = f64::from(lane) * self.lane_width;
                for index in 0..segment.samples {
                    let x = segment.start_x + f64::from(index) * self.resolution;
                    entries.push(SampleEntry { point: [x, y], road, lane, index });
                }
            }
        }

        Ok(Highway {
            roads,
            road_index,
            lanes: self.lanes,
            lane_width: self.lane_width,
            resolution: self.resolution,
            index: RTree::bulk_load(entries),
        })
    }
}
