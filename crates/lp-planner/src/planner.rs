//! The `LatticePlanner` and its planning cycle.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::debug;

use lp_core::{NodeId, StationId, VehicleId};
use lp_lattice::{Lattice, LatticeNode};
use lp_map::RoadContext;
use lp_traffic::{ContinuousPath, DiscretePath, Maneuver, PathGenerator, Snapshot, StageCost};

use crate::edge::{Arrival, EdgeContext, Evaluation};
use crate::{
    ChildLink, ChildSide, Longitudinal, NodeKey, NoopObserver, ParentLink, ParentSide,
    PlannerConfig, PlannerError, PlannerObserver, PlannerResult, SpeedBinKey, Station, StationGraph,
    StationKey,
};

/// One station per lattice node, car-following edges.
pub type IdmLatticePlanner = LatticePlanner<NodeKey>;

/// One station per lattice node and speed bin, constant-acceleration edges.
pub type SpatiotemporalLatticePlanner = LatticePlanner<SpeedBinKey>;

// ── Results ───────────────────────────────────────────────────────────────────

/// One edge of the selected trajectory.
#[derive(Clone, Debug)]
pub struct TrajectorySegment {
    pub from:         StationId,
    pub to:           StationId,
    pub maneuver:     Maneuver,
    pub path:         ContinuousPath,
    /// Ego acceleration held along the edge, for constant-acceleration edges.
    pub acceleration: Option<f64>,
    pub stage_cost:   f64,
}

/// A parent → child link of the station graph.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Edge {
    pub from:         StationId,
    pub to:           StationId,
    pub maneuver:     Maneuver,
    pub acceleration: Option<f64>,
    pub stage_cost:   f64,
}

/// Concatenate segment paths into one path.
pub fn merge_segments(segments: &[TrajectorySegment]) -> DiscretePath {
    let mut path = DiscretePath::default();
    for segment in segments {
        path.append(&segment.path);
    }
    path
}

// ── Terminal costs ────────────────────────────────────────────────────────────

const SPEED_COST_BANDS: [f64; 10] = [4.0, 4.0, 4.0, 3.0, 3.0, 2.0, 2.0, 1.0, 1.0, 0.0];
const DISTANCE_COST_BANDS: [f64; 10] = [20.0, 20.0, 20.0, 20.0, 20.0, 20.0, 20.0, 20.0, 10.0, 5.0];

fn band(table: &[f64; 10], ratio: f64) -> f64 {
    if ratio >= 1.0 {
        return 0.0;
    }
    let index = (ratio.max(0.0) * 10.0).floor() as usize;
    table[index.min(table.len() - 1)]
}

/// Penalty for ending below the policy speed, in tenths of the policy speed.
pub fn terminal_speed_cost(speed: f64, policy_speed: f64) -> PlannerResult<f64> {
    if speed < 0.0 || policy_speed <= 0.0 {
        return Err(PlannerError::InvalidSpeed { speed, policy_speed });
    }
    Ok(band(&SPEED_COST_BANDS, speed / policy_speed))
}

/// Penalty for ending short of `horizon`, in tenths of the horizon.
pub fn terminal_distance_cost(distance: f64, horizon: f64) -> f64 {
    if horizon <= 0.0 {
        return 0.0;
    }
    band(&DISTANCE_COST_BANDS, distance / horizon)
}

// ── LatticePlanner ────────────────────────────────────────────────────────────

/// Incremental station-graph planner.
///
/// Every call to [`plan_path`](Self::plan_path) runs one cycle:
///
/// 1. **Lattice**: create the planning lattice at the ego, or shift it once
///    the ego reached the station selected in the previous cycle.
/// 2. **Prune**: start a new graph at the ego.  Unless the previous next
///    station was reached, the root is first re-connected to the nodes at
///    that station's distance and the arrivals become the frontier.
/// 3. **Expand**: breadth first from the frontier: each station tries a
///    keep-lane, a left and a right edge `lookahead` metres ahead.  Only
///    stations whose simulated ego arrived on the targeted node expand.
/// 4. **Select**: the terminal with the lowest cost-to-come plus terminal
///    cost wins; ties keep the earlier station.
/// 5. **Backtrack**: follow optimal parents back to the root.
///
/// Use [`PlannerBuilder`][crate::PlannerBuilder] to construct one.
pub struct LatticePlanner<K: StationKey> {
    pub(crate) config:       PlannerConfig,
    pub(crate) roads:        RoadContext,
    pub(crate) generator:    Arc<dyn PathGenerator>,
    pub(crate) longitudinal: Longitudinal,
    pub(crate) cost:         Arc<dyn StageCost>,
    pub(crate) lattice:      Option<Lattice>,
    pub(crate) graph:        StationGraph<K>,
    /// Lattice node of the station after the root in the last selection.
    pub(crate) next_node:    Option<NodeId>,
    pub(crate) selected:     Vec<StationId>,
}

impl<K: StationKey> LatticePlanner<K> {
    // ── Introspection ─────────────────────────────────────────────────────

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn lattice(&self) -> Option<&Lattice> {
        self.lattice.as_ref()
    }

    pub fn graph(&self) -> &StationGraph<K> {
        &self.graph
    }

    pub fn root_station(&self) -> Option<&Station> {
        self.graph.root()
    }

    /// Every station of the last cycle, in creation order.
    pub fn all_nodes(&self) -> impl Iterator<Item = &Station> + '_ {
        self.graph.stations()
    }

    /// Every parent → child link of the last cycle.
    pub fn all_edges(&self) -> Vec<Edge> {
        let mut edges = Vec::new();
        for station in self.graph.stations() {
            for side in [ChildSide::Front, ChildSide::Left, ChildSide::Right] {
                for link in station.children(side).iter().flatten() {
                    edges.push(Edge {
                        from:         station.id(),
                        to:           link.station,
                        maneuver:     side.maneuver(),
                        acceleration: link.acceleration,
                        stage_cost:   link.stage_cost,
                    });
                }
            }
        }
        edges
    }

    /// Stations of the last selected path, root first.
    pub fn selected_stations(&self) -> &[StationId] {
        &self.selected
    }

    /// Forget the lattice and the cached frontier; the next cycle starts
    /// from scratch.
    pub fn reset(&mut self) {
        self.lattice = None;
        self.graph.clear();
        self.next_node = None;
        self.selected.clear();
    }

    // ── Planning ──────────────────────────────────────────────────────────

    /// Plan a path for vehicle `ego` in `snapshot`.
    pub fn plan_path(&mut self, ego: VehicleId, snapshot: &Snapshot) -> PlannerResult<DiscretePath> {
        self.plan_path_with(ego, snapshot, &mut NoopObserver)
    }

    pub fn plan_path_with<O: PlannerObserver>(
        &mut self,
        ego: VehicleId,
        snapshot: &Snapshot,
        observer: &mut O,
    ) -> PlannerResult<DiscretePath> {
        let segments = self.plan_trajectory_with(ego, snapshot, observer)?;
        Ok(merge_segments(&segments))
    }

    /// Plan and return the selected edges, each with its acceleration.
    pub fn plan_trajectory(&mut self, ego: VehicleId, snapshot: &Snapshot) -> PlannerResult<Vec<TrajectorySegment>> {
        self.plan_trajectory_with(ego, snapshot, &mut NoopObserver)
    }

    pub fn plan_trajectory_with<O: PlannerObserver>(
        &mut self,
        ego: VehicleId,
        snapshot: &Snapshot,
        observer: &mut O,
    ) -> PlannerResult<Vec<TrajectorySegment>> {
        observer.on_cycle_start(snapshot.ego());
        if snapshot.ego().id != ego {
            return Err(PlannerError::WrongEgo { expected: ego, found: snapshot.ego().id });
        }

        let reached = self.update_lattice(snapshot)?;
        let frontier = self.prune(snapshot, reached, observer)?;
        self.expand(frontier, observer)?;
        let (terminal, cost) = self.select_terminal()?;
        let (stations, segments) = self.backtrack(terminal)?;

        self.next_node = stations.get(1).and_then(|&id| self.graph.get(id)).map(Station::node);
        self.selected = stations;
        debug!(
            stations = self.graph.len(),
            terminal = %terminal,
            cost,
            segments = segments.len(),
            "planning cycle done"
        );
        observer.on_cycle_end(self.graph.len(), cost);
        Ok(segments)
    }

    /// Total cost of terminal station `id`: cost-to-come plus the terminal
    /// speed and distance costs.
    pub fn terminal_cost(&self, id: StationId) -> PlannerResult<f64> {
        let station = self.station(id)?;
        if station.has_child() {
            return Err(PlannerError::NotTerminal(id));
        }
        let root = self.graph.root().ok_or(PlannerError::NoTerminal)?;
        let ego = station.snapshot().ego();
        let speed_cost = terminal_speed_cost(ego.speed, ego.policy_speed)?;
        let distance = self.lattice_node(station.node())?.distance - self.lattice_node(root.node())?.distance;
        let distance_cost = terminal_distance_cost(distance, self.effective_horizon(root)?);
        Ok(station.cost_to_come() + speed_cost + distance_cost)
    }

    /// The spatial horizon adjusted by how far the root's first child is
    /// from the root, preferring the front child, then left, then right.
    fn effective_horizon(&self, root: &Station) -> PlannerResult<f64> {
        let Some(child) = root.first_child() else {
            return Ok(self.config.spatial_horizon);
        };
        let child = self.station(child.station)?;
        let step = self.lattice_node(child.node())?.distance - self.lattice_node(root.node())?.distance;
        Ok(self.config.spatial_horizon - self.config.lookahead + step)
    }

    // ── Cycle stages ──────────────────────────────────────────────────────

    /// Create or shift the planning lattice.  Returns whether the graph must
    /// start fresh this cycle.
    fn update_lattice(&mut self, snapshot: &Snapshot) -> PlannerResult<bool> {
        let ego = snapshot.ego();
        let waypoint = self
            .roads
            .waypoint(ego.location())
            .ok_or_else(|| PlannerError::EgoOffRoad(ego.to_string()))?;

        if let Some(lattice) = self.lattice.as_mut() {
            if let Some(ego_node) = lattice.closest_node(&waypoint, self.config.resolution) {
                let ego_distance = lattice.node(ego_node).map_or(0.0, |n| n.distance);
                let reached = match self.next_node.and_then(|n| lattice.node(n)) {
                    Some(next) => next.distance - ego_distance < self.config.reach_tolerance,
                    None => true,
                };
                if reached {
                    lattice.shift(ego_distance - self.config.shift_margin)?;
                    debug!(ego_distance, range = lattice.range(), "planning lattice shifted");
                }
                return Ok(reached);
            }
            debug!(ego = %ego.id, "ego left the planning lattice, rebuilding");
        }

        let lattice = Lattice::new(
            self.roads.clone(),
            &waypoint,
            self.config.lattice_range(),
            self.config.resolution,
        )?;
        debug!(nodes = lattice.len(), range = lattice.range(), "planning lattice created");
        self.lattice = Some(lattice);
        Ok(true)
    }

    /// Start a new graph at the ego and return the stations to expand.
    fn prune<O: PlannerObserver>(
        &mut self,
        snapshot: &Snapshot,
        reached: bool,
        observer: &mut O,
    ) -> PlannerResult<Vec<StationId>> {
        self.graph.clear();
        self.selected.clear();

        let ego = snapshot.ego();
        let lattice = self.planning_lattice()?;
        let root_node = self
            .roads
            .waypoint(ego.location())
            .and_then(|wp| lattice.closest_node(&wp, self.config.resolution))
            .ok_or_else(|| PlannerError::EgoOffLattice(ego.to_string()))?;
        let key = K::from_arrival(root_node, ego.speed).ok_or(PlannerError::RootOutOfBins(ego.speed))?;
        let (root, _) = self.graph.insert(key, snapshot.clone());
        observer.on_station_created(self.station(root)?);

        let cached = if reached { None } else { self.next_node };
        let Some(next) = cached else {
            return Ok(vec![root]);
        };
        let distance = self.lattice_node(next)?.distance - self.lattice_node(root_node)?.distance;
        let mut queued = vec![true];
        let frontier = self.connect(root, distance, &mut queued, observer)?;
        if frontier.is_empty() {
            return Err(PlannerError::NoFrontier { snapshot: snapshot.to_string() });
        }
        debug!(distance, frontier = frontier.len(), "frontier re-connected");
        Ok(frontier)
    }

    /// Breadth-first growth of the graph from `frontier`.
    fn expand<O: PlannerObserver>(&mut self, frontier: Vec<StationId>, observer: &mut O) -> PlannerResult<()> {
        let mut queued = vec![false; self.graph.len()];
        for id in &frontier {
            queued[id.index()] = true;
        }
        let mut queue: VecDeque<StationId> = frontier.into();
        while let Some(id) = queue.pop_front() {
            queue.extend(self.connect(id, self.config.lookahead, &mut queued, observer)?);
        }
        Ok(())
    }

    /// Try the keep-lane, left and right edges of station `from`, each
    /// `distance` metres ahead.  Returns the stations that were reached as
    /// targeted and have not been queued before.
    fn connect<O: PlannerObserver>(
        &mut self,
        from: StationId,
        distance: f64,
        queued: &mut Vec<bool>,
        observer: &mut O,
    ) -> PlannerResult<Vec<StationId>> {
        let evaluations = {
            let lattice = self.planning_lattice()?;
            let station = self.station(from)?;
            let node = station.node();
            let targets: Vec<(Maneuver, NodeId)> = [
                (Maneuver::KeepLane, lattice.front(node, distance)),
                (Maneuver::LeftChange, lattice.front_left(node, distance)),
                (Maneuver::RightChange, lattice.front_right(node, distance)),
            ]
            .into_iter()
            .filter_map(|(maneuver, target)| target.map(|t| (maneuver, t)))
            .collect();

            let ctx = EdgeContext {
                config:       &self.config,
                lattice,
                generator:    self.generator.as_ref(),
                longitudinal: &self.longitudinal,
                cost:         self.cost.as_ref(),
            };
            evaluate_all::<K>(&ctx, station, &targets)?
        };

        let mut arrived = Vec::new();
        for (maneuver, results) in evaluations {
            let mut arrivals = Vec::new();
            for result in results {
                match result {
                    Ok(arrival) => arrivals.push(arrival),
                    Err(reason) => {
                        debug!(station = %from, %maneuver, %reason, "edge discarded");
                        observer.on_edge_discarded(from, maneuver, &reason);
                    }
                }
            }
            for arrival in cheapest_per_slot(arrivals) {
                if let Some(id) = self.attach(from, maneuver, arrival, queued, observer)? {
                    arrived.push(id);
                }
            }
        }
        Ok(arrived)
    }

    /// Link `from` to the station of `arrival`, creating it if needed.
    fn attach<O: PlannerObserver>(
        &mut self,
        from: StationId,
        maneuver: Maneuver,
        arrival: Arrival<K>,
        queued: &mut Vec<bool>,
        observer: &mut O,
    ) -> PlannerResult<Option<StationId>> {
        let parent = self.station(from)?;
        let parent_slot = parent.slot();
        let cost_to_come = parent.cost_to_come() + arrival.stage_cost;

        let (child, created) = self.graph.insert(arrival.key, arrival.snapshot.clone());
        if created {
            observer.on_station_created(self.station(child)?);
        }
        self.station_mut(from)?.set_child(
            ChildSide::of(maneuver),
            arrival.key.slot(),
            ChildLink {
                path:         arrival.path,
                acceleration: arrival.acceleration,
                stage_cost:   arrival.stage_cost,
                station:      child,
            },
        );
        self.station_mut(child)?.set_parent(
            ParentSide::of(maneuver),
            parent_slot,
            ParentLink { snapshot: arrival.snapshot, cost_to_come, station: from },
        );

        queued.resize(self.graph.len(), false);
        if arrival.arrived && !queued[child.index()] {
            queued[child.index()] = true;
            return Ok(Some(child));
        }
        Ok(None)
    }

    /// The terminal with the lowest total cost, scanned in creation order.
    fn select_terminal(&self) -> PlannerResult<(StationId, f64)> {
        let mut best: Option<(StationId, f64)> = None;
        for station in self.graph.stations().filter(|s| s.is_terminal()) {
            let cost = self.terminal_cost(station.id())?;
            if best.is_none_or(|(_, lowest)| cost < lowest) {
                best = Some((station.id(), cost));
            }
        }
        let (id, cost) = best.ok_or(PlannerError::NoTerminal)?;
        if self.station(id)?.is_root() {
            return Err(PlannerError::DegenerateGraph(id));
        }
        Ok((id, cost))
    }

    /// Stations from the root to `terminal` and the edges between them.
    fn backtrack(&self, terminal: StationId) -> PlannerResult<(Vec<StationId>, Vec<TrajectorySegment>)> {
        let mut chain = vec![terminal];
        let mut current = terminal;
        while let Some(parent) = self.station(current)?.optimal_parent() {
            if chain.len() > self.graph.len() {
                return Err(PlannerError::CorruptedGraph(format!("optimal parents of {terminal} form a cycle")));
            }
            chain.push(parent.station);
            current = parent.station;
        }
        chain.reverse();

        let segments = chain
            .windows(2)
            .map(|pair| {
                let (from, to) = (pair[0], pair[1]);
                let (side, link) = self
                    .station(from)?
                    .child_to(to)
                    .ok_or_else(|| PlannerError::CorruptedGraph(format!("{to} is not a child of {from}")))?;
                Ok(TrajectorySegment {
                    from,
                    to,
                    maneuver:     side.maneuver(),
                    path:         link.path.clone(),
                    acceleration: link.acceleration,
                    stage_cost:   link.stage_cost,
                })
            })
            .collect::<PlannerResult<Vec<_>>>()?;
        Ok((chain, segments))
    }

    // ── Lookups ───────────────────────────────────────────────────────────

    fn planning_lattice(&self) -> PlannerResult<&Lattice> {
        self.lattice
            .as_ref()
            .ok_or_else(|| PlannerError::CorruptedGraph("no planning lattice".into()))
    }

    fn lattice_node(&self, id: NodeId) -> PlannerResult<&LatticeNode> {
        self.planning_lattice()?
            .node(id)
            .ok_or_else(|| PlannerError::CorruptedGraph(format!("{id} is not on the planning lattice")))
    }

    fn station(&self, id: StationId) -> PlannerResult<&Station> {
        self.graph
            .get(id)
            .ok_or_else(|| PlannerError::CorruptedGraph(format!("unknown {id}")))
    }

    fn station_mut(&mut self, id: StationId) -> PlannerResult<&mut Station> {
        self.graph
            .get_mut(id)
            .ok_or_else(|| PlannerError::CorruptedGraph(format!("unknown {id}")))
    }
}

/// Keep one arrival per child slot: the one with the lowest stage cost, the
/// earliest on ties.  One parent fills each of its child slots at most once,
/// so the link it keeps is the one the child's cost-to-come was scored on.
fn cheapest_per_slot<K: StationKey>(arrivals: Vec<Arrival<K>>) -> Vec<Arrival<K>> {
    let mut best: Vec<Option<Arrival<K>>> = vec![None; K::SLOTS];
    for arrival in arrivals {
        let slot = &mut best[arrival.key.slot()];
        if slot.as_ref().is_none_or(|kept| arrival.stage_cost < kept.stage_cost) {
            *slot = Some(arrival);
        }
    }
    best.into_iter().flatten().collect()
}

/// Evaluate every target of one station.  Results keep the order of
/// `targets`.
fn evaluate_all<K: StationKey>(
    ctx: &EdgeContext<'_>,
    station: &Station,
    targets: &[(Maneuver, NodeId)],
) -> PlannerResult<Vec<(Maneuver, Evaluation<K>)>> {
    #[cfg(not(feature = "parallel"))]
    {
        targets
            .iter()
            .map(|&(maneuver, target)| Ok((maneuver, ctx.evaluate::<K>(station, target, maneuver)?)))
            .collect()
    }

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        targets
            .par_iter()
            .map(|&(maneuver, target)| Ok((maneuver, ctx.evaluate::<K>(station, target, maneuver)?)))
            .collect()
    }
}
