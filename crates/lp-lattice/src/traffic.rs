//! Vehicle occupancy on top of a [`Lattice`].
//!
//! Each registered vehicle claims the contiguous run of nodes between its
//! rear and head bumpers.  A node holds at most one vehicle; a vehicle whose
//! run overlaps another vehicle's run is a collision.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt;

use tracing::debug;

use lp_core::{NodeId, RoadId, Vehicle, VehicleId};
use lp_map::{RoadContext, Waypoint};

use crate::{Lattice, LatticeError, LatticeResult};

/// Maximum number of rounds used to order the roads touched by traffic.
const ROAD_ORDERING_ROUNDS: usize = 8;

/// Outcome of [`TrafficLattice::add_vehicle`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Placement {
    Added,
    AlreadyTracked,
    /// The vehicle could not be mapped onto the lattice.
    OffLattice,
    /// The vehicle overlaps another one; nothing was claimed.
    Collision,
}

/// Direction of an ongoing lane change.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LaneChange {
    None,
    Left,
    Right,
}

/// Result of re-registering traffic on the lattice.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrafficUpdate {
    pub collision_free: bool,
    /// Vehicles that could not be placed on the lattice any more.
    pub disappeared:    BTreeSet<VehicleId>,
}

/// A lattice plus the vehicles occupying it.
#[derive(Clone, Debug)]
pub struct TrafficLattice {
    lattice:   Lattice,
    occupancy: HashMap<NodeId, VehicleId>,
    vehicles:  BTreeMap<VehicleId, Vec<NodeId>>,
}

impl TrafficLattice {
    /// Build a lattice spanning all `vehicles` and register them.
    ///
    /// Returns the lattice and the vehicles that could not be placed.  Any
    /// collision between the input vehicles is an error.
    pub fn new(
        vehicles: &[Vehicle],
        roads: RoadContext,
        resolution: f64,
    ) -> LatticeResult<(Self, BTreeSet<VehicleId>)> {
        let (start, range) = lattice_start_and_range(&roads, vehicles)?;
        let lattice = Lattice::new(roads, &start, range, resolution)?;
        let mut traffic = Self {
            lattice,
            occupancy: HashMap::new(),
            vehicles: BTreeMap::new(),
        };
        let update = traffic.register_vehicles(vehicles)?;
        if !update.collision_free {
            let culprit = vehicles
                .iter()
                .map(|v| v.id)
                .find(|id| !traffic.vehicles.contains_key(id) && !update.disappeared.contains(id))
                .unwrap_or_default();
            return Err(LatticeError::Collision(culprit));
        }
        Ok((traffic, update.disappeared))
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    pub fn contains(&self, id: VehicleId) -> bool {
        self.vehicles.contains_key(&id)
    }

    /// Tracked vehicle ids in ascending order.
    pub fn vehicle_ids(&self) -> impl Iterator<Item = VehicleId> + '_ {
        self.vehicles.keys().copied()
    }

    /// Nodes claimed by `id`, ordered rear to head.
    pub fn vehicle_nodes(&self, id: VehicleId) -> Option<&[NodeId]> {
        self.vehicles.get(&id).map(Vec::as_slice)
    }

    pub fn rear_node(&self, id: VehicleId) -> LatticeResult<NodeId> {
        self.run(id)?
            .first()
            .copied()
            .ok_or(LatticeError::UnknownVehicle(id))
    }

    pub fn head_node(&self, id: VehicleId) -> LatticeResult<NodeId> {
        self.run(id)?
            .last()
            .copied()
            .ok_or(LatticeError::UnknownVehicle(id))
    }

    pub fn occupant(&self, node: NodeId) -> Option<VehicleId> {
        self.occupancy.get(&node).copied()
    }

    // ── Registration ──────────────────────────────────────────────────────

    /// Claim the nodes covered by `vehicle`.
    pub fn add_vehicle(&mut self, vehicle: &Vehicle) -> LatticeResult<Placement> {
        if self.vehicles.contains_key(&vehicle.id) {
            return Ok(Placement::AlreadyTracked);
        }
        let Some(nodes) = self.vehicle_run(vehicle) else {
            return Ok(Placement::OffLattice);
        };

        let mut claimed = Vec::with_capacity(nodes.len());
        for &node in &nodes {
            match self.occupancy.get(&node) {
                Some(&other) if other != vehicle.id => {
                    for n in &claimed {
                        self.occupancy.remove(n);
                    }
                    debug!(vehicle = vehicle.id.0, other = other.0, "vehicle overlaps on the lattice");
                    return Ok(Placement::Collision);
                }
                Some(_) => {}
                None => {
                    self.occupancy.insert(node, vehicle.id);
                    claimed.push(node);
                }
            }
        }
        self.vehicles.insert(vehicle.id, nodes);
        Ok(Placement::Added)
    }

    /// Release the nodes of `id`.  Returns whether the vehicle was tracked.
    pub fn delete_vehicle(&mut self, id: VehicleId) -> bool {
        let Some(nodes) = self.vehicles.remove(&id) else {
            return false;
        };
        for node in nodes {
            if self.occupancy.get(&node) == Some(&id) {
                self.occupancy.remove(&node);
            }
        }
        true
    }

    /// Re-register `vehicles` after they moved.
    ///
    /// The set of ids must equal the tracked set exactly; otherwise an error
    /// is returned and nothing changes.  The lattice start is moved to the
    /// rearmost vehicle and the range re-sized to cover the frontmost one.
    pub fn move_traffic_forward(&mut self, vehicles: &[Vehicle]) -> LatticeResult<TrafficUpdate> {
        let update: BTreeSet<VehicleId> = vehicles.iter().map(|v| v.id).collect();
        let tracked: BTreeSet<VehicleId> = self.vehicles.keys().copied().collect();
        if update != tracked || update.len() != vehicles.len() {
            return Err(LatticeError::VehicleSetMismatch {
                tracked: tracked.iter().map(|id| id.0).collect(),
                update:  vehicles.iter().map(|v| v.id.0).collect(),
            });
        }

        let (start, range) = lattice_start_and_range(self.lattice.roads(), vehicles)?;
        let start_node = self
            .lattice
            .closest_node(&start, self.lattice.resolution())
            .ok_or_else(|| LatticeError::StartOffLattice(start.to_string()))?;
        let start_distance = self.lattice.node(start_node).map_or(0.0, |n| n.distance);

        self.occupancy.clear();
        self.vehicles.clear();
        self.lattice.shorten(self.lattice.range() - start_distance)?;
        self.lattice.extend(range)?;
        self.register_vehicles(vehicles)
    }

    /// Add every vehicle, stopping at the first collision.
    fn register_vehicles(&mut self, vehicles: &[Vehicle]) -> LatticeResult<TrafficUpdate> {
        let mut update = TrafficUpdate { collision_free: true, disappeared: BTreeSet::new() };
        for vehicle in vehicles {
            match self.add_vehicle(vehicle)? {
                Placement::Added | Placement::AlreadyTracked => {}
                Placement::OffLattice => {
                    update.disappeared.insert(vehicle.id);
                }
                Placement::Collision => {
                    update.collision_free = false;
                    return Ok(update);
                }
            }
        }
        Ok(update)
    }

    /// Nodes from rear to head for `vehicle`, or `None` if any of its
    /// reference points misses the lattice.
    fn vehicle_run(&self, vehicle: &Vehicle) -> Option<Vec<NodeId>> {
        let [rear, mid, head] = vehicle_waypoints(self.lattice.roads(), vehicle)?;
        let tolerance = self.lattice.resolution();
        let rear = self.lattice.closest_node(&rear, tolerance)?;
        let mid = self.lattice.closest_node(&mid, tolerance)?;
        let head = self.lattice.closest_node(&head, tolerance)?;

        let mid_node = self.lattice.node(mid)?;
        let stops = [Some(mid), mid_node.left, mid_node.right];
        let is_stop = |id: NodeId| stops.contains(&Some(id));

        let mut rear_part = Vec::new();
        let mut current = rear;
        while !is_stop(current) {
            rear_part.push(current);
            current = self.lattice.node(current)?.front?;
        }

        let mut head_part = Vec::new();
        let mut current = head;
        while !is_stop(current) {
            head_part.push(current);
            current = self.lattice.node(current)?.back?;
        }
        head_part.reverse();

        rear_part.push(mid);
        rear_part.extend(head_part);
        Some(rear_part)
    }

    fn run(&self, id: VehicleId) -> LatticeResult<&[NodeId]> {
        self.vehicle_nodes(id).ok_or(LatticeError::UnknownVehicle(id))
    }

    fn distance(&self, node: NodeId) -> f64 {
        self.lattice.node(node).map_or(0.0, |n| n.distance)
    }

    // ── Neighbor queries ──────────────────────────────────────────────────

    /// Nearest vehicle ahead in the same lane and the gap to its rear.
    pub fn front(&self, id: VehicleId) -> LatticeResult<Option<(VehicleId, f64)>> {
        let head = self.head_node(id)?;
        Ok(self.scan(id, head, head, true))
    }

    /// Nearest vehicle behind in the same lane and the gap to its head.
    pub fn back(&self, id: VehicleId) -> LatticeResult<Option<(VehicleId, f64)>> {
        let rear = self.rear_node(id)?;
        Ok(self.scan(id, rear, rear, false))
    }

    pub fn left_front(&self, id: VehicleId) -> LatticeResult<Option<(VehicleId, f64)>> {
        let head = self.head_node(id)?;
        let lateral = self.lattice.node(head).and_then(|n| n.left);
        self.lateral_query(id, head, lateral, true)
    }

    pub fn left_back(&self, id: VehicleId) -> LatticeResult<Option<(VehicleId, f64)>> {
        let rear = self.rear_node(id)?;
        let lateral = self.lattice.node(rear).and_then(|n| n.left);
        self.lateral_query(id, rear, lateral, false)
    }

    pub fn right_front(&self, id: VehicleId) -> LatticeResult<Option<(VehicleId, f64)>> {
        let head = self.head_node(id)?;
        let lateral = self.lattice.node(head).and_then(|n| n.right);
        self.lateral_query(id, head, lateral, true)
    }

    pub fn right_back(&self, id: VehicleId) -> LatticeResult<Option<(VehicleId, f64)>> {
        let rear = self.rear_node(id)?;
        let lateral = self.lattice.node(rear).and_then(|n| n.right);
        self.lateral_query(id, rear, lateral, false)
    }

    /// Neighbor search in an adjacent lane.  If the lateral node itself is
    /// taken by another vehicle, the gap is measured between that vehicle's
    /// rear (ahead) or head (behind) and `reference`, and may be negative.
    fn lateral_query(
        &self,
        id: VehicleId,
        reference: NodeId,
        lateral: Option<NodeId>,
        ahead: bool,
    ) -> LatticeResult<Option<(VehicleId, f64)>> {
        let Some(lateral) = lateral else {
            return Ok(None);
        };
        match self.occupant(lateral) {
            Some(other) if other != id => {
                let gap = if ahead {
                    self.distance(self.rear_node(other)?) - self.distance(reference)
                } else {
                    self.distance(reference) - self.distance(self.head_node(other)?)
                };
                Ok(Some((other, gap)))
            }
            _ => Ok(self.scan(id, lateral, reference, ahead)),
        }
    }

    /// Walk from `from` (exclusive) until a node held by another vehicle.
    fn scan(&self, id: VehicleId, from: NodeId, reference: NodeId, ahead: bool) -> Option<(VehicleId, f64)> {
        let step = |n: NodeId| {
            let node = self.lattice.node(n)?;
            if ahead { node.front } else { node.back }
        };
        let mut current = step(from);
        while let Some(node) = current {
            match self.occupant(node) {
                Some(other) if other != id => {
                    let gap = (self.distance(node) - self.distance(reference)).abs();
                    return Some((other, gap));
                }
                _ => current = step(node),
            }
        }
        None
    }

    /// Whether `id` currently straddles two lanes, and towards which side.
    pub fn is_changing_lane(&self, id: VehicleId) -> LatticeResult<LaneChange> {
        let nodes = self.run(id)?;
        let (Some(&rear), Some(&head)) = (nodes.first(), nodes.last()) else {
            return Err(LatticeError::UnknownVehicle(id));
        };
        let mut current = rear;
        for _ in 1..nodes.len() {
            current = self.lattice.node(current).and_then(|n| n.front).ok_or_else(|| {
                LatticeError::InconsistentOccupancy {
                    vehicle: id,
                    detail: format!("lane of rear {rear} ends before the head {head}"),
                }
            })?;
        }
        if current == head {
            return Ok(LaneChange::None);
        }
        let node = self.lattice.node(current);
        if node.and_then(|n| n.left) == Some(head) {
            Ok(LaneChange::Left)
        } else if node.and_then(|n| n.right) == Some(head) {
            Ok(LaneChange::Right)
        } else {
            Err(LatticeError::InconsistentOccupancy {
                vehicle: id,
                detail: format!("head {head} is not beside {current}, reached from rear {rear}"),
            })
        }
    }
}

impl fmt::Display for TrafficLattice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lattice)?;
        for (id, nodes) in &self.vehicles {
            write!(f, "  vehicle {}:", id.0)?;
            for node in nodes {
                write!(f, " {}@{:.1}", node.0, self.distance(*node))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

// ── Lattice sizing ────────────────────────────────────────────────────────────

/// Rear, middle and head waypoints of `vehicle`.
pub fn vehicle_waypoints(roads: &RoadContext, vehicle: &Vehicle) -> Option<[Waypoint; 3]> {
    Some([
        roads.waypoint(vehicle.rear_location())?,
        roads.waypoint(vehicle.location())?,
        roads.waypoint(vehicle.head_location())?,
    ])
}

/// Start waypoint and range of a lattice that covers every vehicle on the
/// route: from the rearmost waypoint to the frontmost one.
pub fn lattice_start_and_range(roads: &RoadContext, vehicles: &[Vehicle]) -> LatticeResult<(Waypoint, f64)> {
    let router = roads.router();
    let mut by_road: BTreeMap<RoadId, Vec<Waypoint>> = BTreeMap::new();
    for vehicle in vehicles {
        let Some(waypoints) = vehicle_waypoints(roads, vehicle) else { continue };
        for wp in waypoints {
            if router.has_road(wp.road) {
                by_road.entry(wp.road).or_default().push(wp);
            }
        }
    }
    for waypoints in by_road.values_mut() {
        waypoints.sort_by(|a, b| a.s.total_cmp(&b.s));
    }
    let first = *by_road.keys().next().ok_or(LatticeError::NoTraffic)?;

    let mut ordered = VecDeque::from([first]);
    let mut pending: BTreeSet<RoadId> = by_road.keys().copied().filter(|&r| r != first).collect();
    for _ in 0..ROAD_ORDERING_ROUNDS {
        if pending.is_empty() {
            break;
        }
        let (Some(&front), Some(&back)) = (ordered.front(), ordered.back()) else { break };
        if let Some(next) = router.next_road(back)? {
            if !ordered.contains(&next) {
                ordered.push_back(next);
                pending.remove(&next);
            }
        }
        if let Some(prev) = router.prev_road(front)? {
            if !ordered.contains(&prev) {
                ordered.push_front(prev);
                pending.remove(&prev);
            }
        }
    }
    if !pending.is_empty() {
        return Err(LatticeError::DisconnectedRoads(pending.iter().map(|r| r.0).collect()));
    }
    while ordered.front().is_some_and(|r| !by_road.contains_key(r)) {
        ordered.pop_front();
    }
    while ordered.back().is_some_and(|r| !by_road.contains_key(r)) {
        ordered.pop_back();
    }

    let (Some(first_road), Some(last_road)) = (ordered.front(), ordered.back()) else {
        return Err(LatticeError::NoTraffic);
    };
    let start = by_road
        .get(first_road)
        .and_then(|w| w.first())
        .cloned()
        .ok_or(LatticeError::NoTraffic)?;
    let end_s = by_road
        .get(last_road)
        .and_then(|w| w.last())
        .map(|w| w.s)
        .ok_or(LatticeError::NoTraffic)?;

    let mut total = 0.0;
    for road in &ordered {
        total += roads.road_length(*road)?;
    }
    let range = total - start.s - (roads.road_length(*last_road)? - end_s);
    Ok((start, range))
}
