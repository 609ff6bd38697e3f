//! Unit tests for lp-traffic.

use std::sync::Arc;

use lp_core::{BoundingBox, Location, Pose, RoadId, Vehicle, VehicleId};
use lp_map::{HighwayBuilder, RoadContext, SequenceRouter};

use crate::*;

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Three lanes, 3.5 m wide, roads 1 and 2 of 200 m each.
fn roads() -> RoadContext {
    let highway = HighwayBuilder::new(3, 3.5)
        .road(RoadId(1), 200.0)
        .road(RoadId(2), 200.0)
        .build()
        .unwrap();
    RoadContext::new(
        Arc::new(highway),
        Arc::new(SequenceRouter::new(vec![RoadId(1), RoadId(2)])),
    )
}

fn car(id: u32, x: f64, lane: u32, speed: f64, policy: f64) -> Vehicle {
    Vehicle::new(VehicleId(id), Pose::new(x, f64::from(lane) * 3.5, 0.0), speed, policy)
        .with_bounding_box(BoundingBox::new(2.0, 1.0))
}

fn point(x: f64, y: f64) -> PathPoint {
    PathPoint { s: 0.0, pose: Pose::new(x, y, 0.0), curvature: 0.0 }
}

fn straight(from: &Vehicle, length: f64) -> ContinuousPath {
    let start = PathPoint { s: 0.0, pose: from.pose, curvature: 0.0 };
    let end = point(from.pose.location.x + length, from.pose.location.y);
    QuinticPathGenerator::default()
        .make_path(&start, &end, Maneuver::KeepLane)
        .unwrap()
}

fn close(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() < tol
}

// ── IDM ───────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod idm {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_at_policy_speed_on_free_road() {
        let idm = IntelligentDriverModel::default();
        assert_eq!(idm.accel(15.0, 15.0).unwrap(), 0.0);
    }

    #[test]
    fn accelerates_below_and_brakes_above_policy() {
        let idm = IntelligentDriverModel::default();
        assert!(idm.accel(10.0, 15.0).unwrap() > 0.0);
        assert!(idm.accel(20.0, 15.0).unwrap() < 0.0);
        assert!(close(idm.accel(0.0, 15.0).unwrap(), 2.0, 1e-12));
    }

    #[test]
    fn zero_policy_speed_is_rejected() {
        let idm = IntelligentDriverModel::default();
        assert!(matches!(idm.accel(5.0, 0.0), Err(TrafficError::InvalidPolicySpeed(_))));
        assert!(idm.accel_with_lead(5.0, 0.0, 5.0, 30.0).is_err());
    }

    #[test]
    fn negative_speed_is_rejected() {
        let idm = IntelligentDriverModel::default();
        assert!(matches!(idm.accel(-1.0, 10.0), Err(TrafficError::InvalidSpeed(_))));
    }

    #[test]
    fn closed_gap_saturates_braking() {
        let idm = IntelligentDriverModel::default();
        assert_eq!(idm.accel_with_lead(10.0, 15.0, 10.0, 0.0).unwrap(), -8.0);
        assert_eq!(idm.accel_with_lead(10.0, 15.0, 10.0, -2.0).unwrap(), -8.0);
    }

    #[test]
    fn slower_lead_close_ahead_forces_braking() {
        let idm = IntelligentDriverModel::default();
        assert!(idm.accel_with_lead(15.0, 15.0, 5.0, 20.0).unwrap() < 0.0);
    }

    proptest! {
        #[test]
        fn closing_the_gap_never_increases_acceleration(
            speed in 0.0f64..40.0,
            policy in 1.0f64..40.0,
            lead in 0.0f64..40.0,
            gap in 0.1f64..200.0,
            extra in 0.0f64..50.0,
        ) {
            let idm = IntelligentDriverModel::default();
            let near = idm.accel_with_lead(speed, policy, lead, gap).unwrap();
            let far = idm.accel_with_lead(speed, policy, lead, gap + extra).unwrap();
            prop_assert!(near <= far + 1e-12);
        }

        #[test]
        fn acceleration_stays_within_limits(
            speed in 0.0f64..60.0,
            policy in 0.5f64..40.0,
            lead in 0.0f64..40.0,
            gap in -5.0f64..200.0,
        ) {
            let idm = IntelligentDriverModel::default();
            let a = idm.accel_with_lead(speed, policy, lead, gap).unwrap();
            prop_assert!((-8.0..=2.0).contains(&a));
        }
    }
}

// ── Paths ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod paths {
    use super::*;

    #[test]
    fn keep_lane_is_straight() {
        let path = QuinticPathGenerator::default()
            .make_path(&point(0.0, 0.0), &point(30.0, 0.0), Maneuver::KeepLane)
            .unwrap();
        assert!(close(path.range(), 30.0, 1e-9));
        assert!(path.points().iter().all(|p| p.pose.location.y.abs() < 1e-9));
        let mid = path.sample(12.3).unwrap();
        assert!(close(mid.pose.location.x, 12.3, 1e-9));
    }

    #[test]
    fn left_change_ends_on_target() {
        let path = QuinticPathGenerator::default()
            .make_path(&point(0.0, 0.0), &point(40.0, 3.5), Maneuver::LeftChange)
            .unwrap();
        let end = path.end().unwrap();
        assert!(close(end.pose.location.x, 40.0, 1e-9));
        assert!(close(end.pose.location.y, 3.5, 1e-9));
        assert!(close(end.pose.yaw, 0.0, 1e-9));
        assert!(path.range() > 40.0);
        assert!(path.points().iter().any(|p| p.pose.yaw > 0.0));
    }

    #[test]
    fn lane_change_towards_wrong_side_fails() {
        let generator = QuinticPathGenerator::default();
        assert!(matches!(
            generator.make_path(&point(0.0, 0.0), &point(40.0, -3.5), Maneuver::LeftChange),
            Err(PathError::ManeuverMismatch { .. })
        ));
        assert!(generator
            .make_path(&point(0.0, 0.0), &point(40.0, 3.5), Maneuver::RightChange)
            .is_err());
    }

    #[test]
    fn end_behind_start_fails() {
        let generator = QuinticPathGenerator::default();
        assert!(matches!(
            generator.make_path(&point(10.0, 0.0), &point(5.0, 0.0), Maneuver::KeepLane),
            Err(PathError::Degenerate(_))
        ));
    }

    #[test]
    fn abrupt_lane_change_exceeds_curvature() {
        let generator = QuinticPathGenerator::default();
        assert!(matches!(
            generator.make_path(&point(0.0, 0.0), &point(2.0, 3.5), Maneuver::LeftChange),
            Err(PathError::CurvatureLimit { .. })
        ));
    }

    #[test]
    fn discrete_path_appends_with_offset() {
        let generator = QuinticPathGenerator::default();
        let first = generator.make_path(&point(0.0, 0.0), &point(10.0, 0.0), Maneuver::KeepLane).unwrap();
        let second = generator.make_path(&point(10.0, 0.0), &point(20.0, 0.0), Maneuver::KeepLane).unwrap();
        let mut merged = DiscretePath::new(&first);
        merged.append(&second);
        assert!(close(merged.range(), 20.0, 1e-9));
        assert_eq!(merged.points().len(), first.points().len() + second.points().len() - 1);
        assert!(close(merged.sample(15.0).unwrap().pose.location.x, 15.0, 1e-9));
        assert!(merged.sample(20.5).is_none());
    }
}

// ── Snapshot ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod snapshot {
    use super::*;

    #[test]
    fn duplicate_ids_are_rejected() {
        let ego = car(0, 20.0, 1, 10.0, 15.0);
        let result = Snapshot::new(ego, [car(0, 40.0, 1, 10.0, 15.0)], roads(), 1.0);
        assert!(matches!(result, Err(TrafficError::DuplicateVehicle(VehicleId(0)))));
    }

    #[test]
    fn off_map_agents_are_dropped() {
        let ego = car(0, 20.0, 1, 10.0, 15.0);
        let agents = [car(1, 40.0, 1, 10.0, 15.0), car(2, 900.0, 1, 10.0, 15.0)];
        let snapshot = Snapshot::new(ego, agents, roads(), 1.0).unwrap();
        assert!(snapshot.agents().contains_key(&VehicleId(1)));
        assert!(!snapshot.agents().contains_key(&VehicleId(2)));
        assert_eq!(snapshot.vehicles().count(), 2);
    }

    #[test]
    fn off_map_ego_is_an_error() {
        let ego = car(0, 900.0, 1, 10.0, 15.0);
        let result = Snapshot::new(ego, [car(1, 40.0, 1, 10.0, 15.0)], roads(), 1.0);
        assert!(matches!(result, Err(TrafficError::EgoOffLattice(_))));
    }

    #[test]
    fn clones_are_independent() {
        let ego = car(0, 20.0, 1, 10.0, 15.0);
        let original = Snapshot::new(ego, [car(1, 40.0, 1, 10.0, 15.0)], roads(), 1.0).unwrap();
        let policy = IdmPolicy::default();
        let cost = WeightedStageCost::default();
        let mut sim = TrafficSimulator::new(original.clone(), &policy, &cost);
        sim.simulate(&straight(original.ego(), 10.0), 0.1, 5.0).unwrap();
        assert_eq!(original.ego().pose.location.x, 20.0);
        assert!(sim.snapshot().ego().pose.location.x > 20.0);
    }

    #[test]
    fn display_lists_everyone() {
        let ego = car(0, 20.0, 1, 10.0, 15.0);
        let snapshot = Snapshot::new(ego, [car(1, 40.0, 1, 10.0, 15.0)], roads(), 1.0).unwrap();
        let dump = snapshot.to_string();
        assert!(dump.contains("ego: id:0"));
        assert!(dump.contains("id:1"));
        assert!(dump.contains("vehicle 1:"));
    }
}

// ── Simulator ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod simulator {
    use super::*;

    fn run(
        snapshot: Snapshot,
        policy: &dyn AccelerationPolicy,
        length: f64,
    ) -> (SimulationOutcome, Snapshot, Vec<EgoSample>) {
        let cost = WeightedStageCost::default();
        let path = straight(snapshot.ego(), length);
        let mut sim = TrafficSimulator::new(snapshot, policy, &cost);
        let outcome = sim.simulate(&path, 0.1, 5.0).unwrap();
        let trace = sim.trace().to_vec();
        (outcome, sim.into_snapshot(), trace)
    }

    #[test]
    fn free_road_reaches_path_end() {
        let snapshot = Snapshot::new(car(0, 10.0, 1, 10.0, 15.0), [], roads(), 1.0).unwrap();
        let (outcome, end, trace) = run(snapshot, &IdmPolicy::default(), 40.0);
        assert!(outcome.collision_free);
        assert!(outcome.completed);
        assert!(outcome.elapsed < 5.0);
        assert!(outcome.stage_cost > 0.0);
        assert!(close(end.ego().pose.location.x, 50.0, 1e-6));
        assert!(trace.windows(2).all(|w| w[1].speed >= w[0].speed));
        assert!(end.ego().speed > 10.0);
    }

    #[test]
    fn horizon_limits_the_simulation() {
        let snapshot = Snapshot::new(car(0, 10.0, 1, 5.0, 15.0), [], roads(), 1.0).unwrap();
        let (outcome, _, _) = run(snapshot, &IdmPolicy::default(), 150.0);
        assert!(!outcome.completed);
        assert!(close(outcome.elapsed, 5.0, 1e-9));
    }

    #[test]
    fn slower_lead_makes_ego_brake() {
        let ego = car(0, 10.0, 0, 15.0, 15.0);
        let lead = car(1, 34.0, 0, 5.0, 5.0);
        let snapshot = Snapshot::new(ego, [lead], roads(), 1.0).unwrap();
        let (_, initial_gap) = snapshot.traffic_lattice().front(VehicleId(0)).unwrap().unwrap();
        assert!(close(initial_gap, 20.0, 1e-9));

        let (outcome, _, trace) = run(snapshot, &IdmPolicy::default(), 50.0);
        assert!(trace[0].acceleration < 0.0);
        if outcome.collision_free {
            assert!(trace.iter().filter_map(|s| s.lead_gap).all(|gap| gap > 0.0));
        }
    }

    #[test]
    fn driving_into_a_stopped_car_collides() {
        let ego = car(0, 10.0, 0, 20.0, 20.0);
        let stopped = car(1, 30.0, 0, 0.0, 10.0);
        let snapshot = Snapshot::new(ego, [stopped], roads(), 1.0).unwrap();
        let (outcome, _, _) = run(snapshot, &ConstantAccelerationPolicy, 50.0);
        assert!(!outcome.collision_free);
        assert!(outcome.elapsed < 2.0);
    }

    #[test]
    fn constant_acceleration_is_kept() {
        let ego = car(0, 10.0, 1, 10.0, 15.0).with_acceleration(-1.0);
        let snapshot = Snapshot::new(ego, [], roads(), 1.0).unwrap();
        let (_, end, trace) = run(snapshot, &ConstantAccelerationPolicy, 150.0);
        assert!(trace.iter().all(|s| s.acceleration == -1.0));
        assert!(close(end.ego().speed, 5.0, 1e-6));
    }

    #[test]
    fn agents_leaving_the_route_are_removed() {
        let ego = car(0, 350.0, 1, 10.0, 10.0);
        let leaving = car(1, 394.0, 0, 20.0, 20.0);
        let snapshot = Snapshot::new(ego, [leaving], roads(), 1.0).unwrap();
        let (outcome, end, _) = run(snapshot, &IdmPolicy::default(), 30.0);
        assert!(outcome.collision_free);
        assert!(end.agents().is_empty());
        assert!(!end.traffic_lattice().contains(VehicleId(1)));
    }

    #[test]
    fn map_errors_propagate_as_traffic_errors() {
        fn advance(roads: &RoadContext) -> TrafficResult<()> {
            let start = roads.project(Location::new(10.0, 3.5)).ok_or(TrafficError::UnknownVehicle(VehicleId(1)))?;
            roads.front_waypoint(&start, 0.0)?;
            Ok(())
        }
        let err = advance(&roads()).unwrap_err();
        assert!(matches!(err, TrafficError::Map(lp_map::MapError::InvalidDistance(_))));
        assert!(err.to_string().starts_with("map error:"));
    }

    #[test]
    fn non_positive_step_is_rejected() {
        let snapshot = Snapshot::new(car(0, 10.0, 1, 10.0, 15.0), [], roads(), 1.0).unwrap();
        let policy = IdmPolicy::default();
        let cost = WeightedStageCost::default();
        let path = straight(snapshot.ego(), 10.0);
        let mut sim = TrafficSimulator::new(snapshot, &policy, &cost);
        assert!(matches!(sim.simulate(&path, 0.0, 5.0), Err(TrafficError::InvalidStep { .. })));
    }
}
