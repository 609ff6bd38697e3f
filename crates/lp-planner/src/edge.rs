//! Evaluation of one candidate edge.
//!
//! Evaluation is pure: it reads the parent station and the lattice, runs the
//! path generator and the traffic simulator on private copies, and reports
//! either an [`Arrival`] per longitudinal option or the reason the edge was
//! dropped.  Nothing in the station graph changes here, so the candidate
//! edges of a station can be evaluated in any order or in parallel.

use std::fmt;

use tracing::debug;

use lp_core::{NodeId, VehicleId};
use lp_lattice::{Lattice, LatticeNode, LatticeResult, TrafficLattice};
use lp_traffic::{
    AccelerationPolicy, ConstantAccelerationPolicy, ContinuousPath, IdmPolicy, Maneuver, PathError,
    PathGenerator, PathPoint, Snapshot, StageCost, TrafficError, TrafficSimulator,
};

use crate::{PlannerConfig, PlannerError, PlannerResult, Station, StationKey};

/// Accelerations tried per edge by the constant-acceleration model, in m/s².
pub const DEFAULT_ACCELERATION_OPTIONS: [f64; 6] = [-8.0, -4.0, -2.0, -1.0, 0.0, 1.0];

/// How the ego's speed evolves along an edge.
#[derive(Clone, Debug)]
pub enum Longitudinal {
    /// Every vehicle follows the car-following model.  One simulation per
    /// edge.
    Idm(IdmPolicy),
    /// The ego holds one of these accelerations for the whole edge; agents
    /// keep theirs.  One simulation per option.
    ConstantAcceleration(Vec<f64>),
}

impl Default for Longitudinal {
    fn default() -> Self {
        Longitudinal::Idm(IdmPolicy::default())
    }
}

/// Why a candidate edge did not make it into the graph.
#[derive(Clone, Debug, PartialEq)]
pub enum Discard {
    TooClose { distance: f64 },
    OffLaneCenter { offset: f64 },
    LaneBlocked { vehicle: VehicleId, gap: f64 },
    Path(PathError),
    Collision { elapsed: f64 },
    Simulation(String),
    OffLattice,
    NoProgress,
    OutOfSpeedBins { speed: f64 },
}

impl fmt::Display for Discard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discard::TooClose { distance } => write!(f, "target only {distance:.1} m ahead"),
            Discard::OffLaneCenter { offset } => {
                write!(f, "ego is {offset:.2} m off its lane center towards the other side")
            }
            Discard::LaneBlocked { vehicle, gap } => write!(f, "{vehicle} blocks the target lane (gap {gap:.2} m)"),
            Discard::Path(e) => write!(f, "no path: {e}"),
            Discard::Collision { elapsed } => write!(f, "collision after {elapsed:.1} s"),
            Discard::Simulation(e) => write!(f, "simulation failed: {e}"),
            Discard::OffLattice => f.write_str("ego ended off the planning lattice"),
            Discard::NoProgress => f.write_str("ego did not move past its start node"),
            Discard::OutOfSpeedBins { speed } => write!(f, "arrival speed {speed:.2} m/s is outside every bin"),
        }
    }
}

/// End state of one simulated edge.
#[derive(Clone, Debug)]
pub(crate) struct Arrival<K> {
    pub key:          K,
    /// Whether the ego ended on the targeted node.
    pub arrived:      bool,
    pub snapshot:     Snapshot,
    pub path:         ContinuousPath,
    pub acceleration: Option<f64>,
    pub stage_cost:   f64,
}

pub(crate) type Evaluation<K> = Vec<Result<Arrival<K>, Discard>>;

type Neighbors = fn(&TrafficLattice, VehicleId) -> LatticeResult<[Option<(VehicleId, f64)>; 2]>;

/// Checks applied before a path is generated.
struct ManeuverRule {
    maneuver:    Maneuver,
    lane_change: bool,
    /// +1 towards the left, -1 towards the right.
    direction:   f64,
    neighbors:   Neighbors,
}

fn no_neighbors(_: &TrafficLattice, _: VehicleId) -> LatticeResult<[Option<(VehicleId, f64)>; 2]> {
    Ok([None, None])
}

fn left_neighbors(traffic: &TrafficLattice, id: VehicleId) -> LatticeResult<[Option<(VehicleId, f64)>; 2]> {
    Ok([traffic.left_front(id)?, traffic.left_back(id)?])
}

fn right_neighbors(traffic: &TrafficLattice, id: VehicleId) -> LatticeResult<[Option<(VehicleId, f64)>; 2]> {
    Ok([traffic.right_front(id)?, traffic.right_back(id)?])
}

static RULES: [ManeuverRule; 3] = [
    ManeuverRule { maneuver: Maneuver::KeepLane, lane_change: false, direction: 0.0, neighbors: no_neighbors },
    ManeuverRule { maneuver: Maneuver::LeftChange, lane_change: true, direction: 1.0, neighbors: left_neighbors },
    ManeuverRule { maneuver: Maneuver::RightChange, lane_change: true, direction: -1.0, neighbors: right_neighbors },
];

fn rule(maneuver: Maneuver) -> &'static ManeuverRule {
    match maneuver {
        Maneuver::KeepLane => &RULES[0],
        Maneuver::LeftChange => &RULES[1],
        Maneuver::RightChange => &RULES[2],
    }
}

/// Everything edge evaluation reads.
pub(crate) struct EdgeContext<'a> {
    pub config:       &'a PlannerConfig,
    pub lattice:      &'a Lattice,
    pub generator:    &'a dyn PathGenerator,
    pub longitudinal: &'a Longitudinal,
    pub cost:         &'a dyn StageCost,
}

impl EdgeContext<'_> {
    /// Evaluate the edge from `from` to lattice node `target`.
    ///
    /// Errors are contract violations only; expected dead ends come back as
    /// [`Discard`]s.
    pub fn evaluate<K: StationKey>(
        &self,
        from: &Station,
        target: NodeId,
        maneuver: Maneuver,
    ) -> PlannerResult<Evaluation<K>> {
        let start_node = self.node(from.node())?;
        let target_node = self.node(target)?;
        let snapshot = from.snapshot();
        let ego = snapshot.ego();
        let rule = rule(maneuver);
        debug_assert_eq!(rule.maneuver, maneuver);

        if rule.lane_change {
            let distance = target_node.distance - start_node.distance;
            if distance < self.config.min_lane_change_distance {
                return Ok(vec![Err(Discard::TooClose { distance })]);
            }
            let offset = snapshot
                .roads()
                .project(ego.location())
                .map(|wp| wp.lateral_offset(ego.location()))
                .ok_or_else(|| PlannerError::EgoOffRoad(ego.to_string()))?;
            if offset * rule.direction < -self.config.lane_center_tolerance {
                return Ok(vec![Err(Discard::OffLaneCenter { offset })]);
            }
            let neighbors = (rule.neighbors)(snapshot.traffic_lattice(), ego.id)?;
            if let Some((vehicle, gap)) = neighbors.into_iter().flatten().find(|&(_, gap)| gap <= 0.0) {
                return Ok(vec![Err(Discard::LaneBlocked { vehicle, gap })]);
            }
        }

        let start = PathPoint { s: 0.0, pose: ego.pose, curvature: ego.curvature };
        let end = PathPoint { s: 0.0, pose: target_node.waypoint.pose, curvature: target_node.curvature };
        let path = match self.generator.make_path(&start, &end, maneuver) {
            Ok(path) => path,
            Err(e) => return Ok(vec![Err(Discard::Path(e))]),
        };

        match self.longitudinal {
            Longitudinal::Idm(policy) => {
                Ok(vec![self.simulate(from, snapshot.clone(), policy, None, &path, target)?])
            }
            Longitudinal::ConstantAcceleration(options) => options
                .iter()
                .map(|&a| {
                    let start = snapshot.clone().with_ego_acceleration(a);
                    self.simulate(from, start, &ConstantAccelerationPolicy, Some(a), &path, target)
                })
                .collect(),
        }
    }

    fn simulate<K: StationKey>(
        &self,
        from: &Station,
        snapshot: Snapshot,
        policy: &dyn AccelerationPolicy,
        acceleration: Option<f64>,
        path: &ContinuousPath,
        target: NodeId,
    ) -> PlannerResult<Result<Arrival<K>, Discard>> {
        let mut sim = TrafficSimulator::new(snapshot, policy, self.cost);
        let outcome = match sim.simulate(path, self.config.time_step, self.config.max_edge_duration) {
            Ok(outcome) => outcome,
            Err(e @ (TrafficError::InvalidPolicySpeed(_) | TrafficError::InvalidSpeed(_))) => return Err(e.into()),
            Err(e) => {
                debug!(station = %from.id(), error = %e, "simulation aborted");
                return Ok(Err(Discard::Simulation(e.to_string())));
            }
        };
        if !outcome.collision_free {
            return Ok(Err(Discard::Collision { elapsed: outcome.elapsed }));
        }

        let snapshot = sim.into_snapshot();
        let ego = snapshot.ego();
        let Some(node) = snapshot
            .roads()
            .waypoint(ego.location())
            .and_then(|wp| self.lattice.closest_node(&wp, self.config.resolution))
        else {
            return Ok(Err(Discard::OffLattice));
        };
        if self.node(node)?.distance <= self.node(from.node())?.distance {
            return Ok(Err(Discard::NoProgress));
        }
        let Some(key) = K::from_arrival(node, ego.speed) else {
            return Ok(Err(Discard::OutOfSpeedBins { speed: ego.speed }));
        };
        Ok(Ok(Arrival {
            key,
            arrived: node == target,
            stage_cost: outcome.stage_cost,
            snapshot,
            path: path.clone(),
            acceleration,
        }))
    }

    fn node(&self, id: NodeId) -> PlannerResult<&LatticeNode> {
        self.lattice
            .node(id)
            .ok_or_else(|| PlannerError::CorruptedGraph(format!("{id} is not on the planning lattice")))
    }
}
