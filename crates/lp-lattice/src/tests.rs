//! Unit tests for lp-lattice.

use std::sync::Arc;

use lp_core::{BoundingBox, Location, NodeId, Pose, RoadId, Vehicle, VehicleId};
use lp_map::{HighwayBuilder, RoadContext, RoadMap, SequenceRouter};

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

/// A 4 m long car in `lane` centred at `x`.
fn car(id: u32, x: f64, lane: u32) -> Vehicle {
    Vehicle::new(VehicleId(id), Pose::new(x, f64::from(lane) * 3.5, 0.0), 10.0, 15.0)
        .with_bounding_box(BoundingBox::new(2.0, 1.0))
}

fn node_at(lattice: &Lattice, roads: &RoadContext, x: f64, lane: u32) -> NodeId {
    let wp = roads.map().waypoint(Location::new(x, f64::from(lane) * 3.5)).unwrap();
    lattice.closest_node(&wp, lattice.resolution()).unwrap()
}

/// A (x=20), B (x=40) in lane 0 and C (x=30) in lane 1.
fn three_cars() -> Vec<Vehicle> {
    vec![car(1, 20.0, 0), car(2, 40.0, 0), car(3, 30.0, 1)]
}

fn traffic(vehicles: &[Vehicle]) -> TrafficLattice {
    let (traffic, disappeared) = TrafficLattice::new(vehicles, roads(), 1.0).unwrap();
    assert!(disappeared.is_empty());
    traffic
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// ── Lattice ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod lattice {
    use super::*;

    fn ten_metres() -> (Lattice, RoadContext) {
        let roads = roads();
        let start = roads.waypoint(Location::new(0.0, 0.0)).unwrap();
        (Lattice::new(roads.clone(), &start, 10.0, 1.0).unwrap(), roads)
    }

    #[test]
    fn range_must_exceed_resolution() {
        let roads = roads();
        let start = roads.waypoint(Location::new(0.0, 0.0)).unwrap();
        assert!(matches!(
            Lattice::new(roads, &start, 1.0, 1.0),
            Err(LatticeError::RangeTooShort { .. })
        ));
    }

    #[test]
    fn covers_every_lane() {
        let (lattice, _) = ten_metres();
        assert_eq!(lattice.len(), 33);
        assert_eq!(lattice.start_nodes().len(), 3);
        assert!(close(lattice.range(), 10.0));
    }

    #[test]
    fn front_strictly_increases_distance() {
        let (lattice, _) = ten_metres();
        for node in lattice.nodes() {
            if let Some(front) = node.front {
                assert!(lattice.node(front).unwrap().distance > node.distance);
                assert_eq!(lattice.node(front).unwrap().back, Some(node.id));
            }
        }
    }

    #[test]
    fn lateral_links_are_inverse() {
        let (lattice, _) = ten_metres();
        for node in lattice.nodes() {
            if let Some(left) = node.left {
                assert_eq!(lattice.node(left).unwrap().right, Some(node.id));
            }
            if let Some(right) = node.right {
                assert_eq!(lattice.node(right).unwrap().left, Some(node.id));
            }
        }
    }

    #[test]
    fn front_and_back_walk() {
        let (lattice, roads) = ten_metres();
        let start = node_at(&lattice, &roads, 0.0, 1);
        let ahead = lattice.front(start, 7.0).unwrap();
        assert!(close(lattice.node(ahead).unwrap().distance, 7.0));
        assert_eq!(lattice.back(ahead, 7.0), Some(start));
        assert!(lattice.front(start, 11.0).is_none());
        let left = lattice.front_left(start, 3.0).unwrap();
        assert_eq!(lattice.node(left).unwrap().waypoint.lane, 2);
        let right = lattice.front_right(start, 3.0).unwrap();
        assert_eq!(lattice.node(right).unwrap().waypoint.lane, 0);
    }

    #[test]
    fn shift_rebases_and_regrows() {
        let (mut lattice, _) = ten_metres();
        lattice.shift(4.0).unwrap();
        assert_eq!(lattice.len(), 33);
        assert!(close(lattice.range(), 10.0));
        for id in lattice.start_nodes() {
            assert!(close(lattice.node(id).unwrap().waypoint.s, 4.0));
        }
        let min = lattice.nodes().map(|n| n.distance).fold(f64::MAX, f64::min);
        assert!(close(min, 0.0));
    }

    #[test]
    fn shorten_keeps_links_consistent() {
        let (mut lattice, _) = ten_metres();
        lattice.shorten(6.0).unwrap();
        assert_eq!(lattice.len(), 21);
        for node in lattice.nodes() {
            if let Some(back) = node.back {
                assert!(lattice.node(back).is_some());
            }
        }
        for id in lattice.start_nodes() {
            assert!(lattice.node(id).unwrap().back.is_none());
        }
    }

    #[test]
    fn closest_node_respects_tolerance() {
        let (lattice, roads) = ten_metres();
        let far = roads.waypoint(Location::new(50.0, 0.0)).unwrap();
        assert!(lattice.closest_node(&far, 1.0).is_none());
    }

    #[test]
    fn extend_crosses_roads_along_route() {
        let roads = roads();
        let start = roads.waypoint(Location::new(195.0, 0.0)).unwrap();
        let lattice = Lattice::new(roads.clone(), &start, 10.0, 1.0).unwrap();
        let last = node_at(&lattice, &roads, 205.0, 0);
        assert_eq!(lattice.node(last).unwrap().waypoint.road, RoadId(2));
        assert!(close(lattice.node(last).unwrap().distance, 10.0));
    }
}

// ── TrafficLattice ────────────────────────────────────────────────────────────

#[cfg(test)]
mod occupancy {
    use super::*;

    #[test]
    fn sized_from_extreme_vehicles() {
        let (start, range) = lattice_start_and_range(&roads(), &three_cars()).unwrap();
        assert!(close(start.s, 18.0));
        assert!(close(range, 24.0));
    }

    #[test]
    fn each_vehicle_claims_its_length() {
        let t = traffic(&three_cars());
        for id in [1, 2, 3] {
            assert_eq!(t.vehicle_nodes(VehicleId(id)).unwrap().len(), 5);
        }
    }

    #[test]
    fn at_most_one_vehicle_per_node() {
        let t = traffic(&three_cars());
        let mut seen = std::collections::HashSet::new();
        for id in t.vehicle_ids() {
            for node in t.vehicle_nodes(id).unwrap() {
                assert!(seen.insert(*node));
                assert_eq!(t.occupant(*node), Some(id));
            }
        }
    }

    #[test]
    fn re_adding_is_reported() {
        let mut t = traffic(&three_cars());
        assert_eq!(t.add_vehicle(&car(1, 20.0, 0)).unwrap(), Placement::AlreadyTracked);
    }

    #[test]
    fn overlap_is_a_collision_and_claims_nothing() {
        let mut t = traffic(&three_cars());
        let roads = roads();
        let before: Vec<_> = t.lattice().nodes().map(|n| (n.id, t.occupant(n.id))).collect();

        assert_eq!(t.add_vehicle(&car(9, 37.0, 0)).unwrap(), Placement::Collision);

        assert!(!t.contains(VehicleId(9)));
        let after: Vec<_> = t.lattice().nodes().map(|n| (n.id, t.occupant(n.id))).collect();
        assert_eq!(before, after);
        let free = node_at(t.lattice(), &roads, 35.0, 0);
        assert_eq!(t.occupant(free), None);
    }

    #[test]
    fn vehicle_beyond_lattice_is_off_lattice() {
        let mut t = traffic(&three_cars());
        assert_eq!(t.add_vehicle(&car(9, 100.0, 0)).unwrap(), Placement::OffLattice);
    }

    #[test]
    fn overlapping_input_fails_construction() {
        let result = TrafficLattice::new(&[car(1, 20.0, 0), car(2, 22.0, 0)], roads(), 1.0);
        assert!(matches!(result, Err(LatticeError::Collision(VehicleId(2)))));
    }

    #[test]
    fn delete_releases_nodes() {
        let mut t = traffic(&three_cars());
        let nodes = t.vehicle_nodes(VehicleId(2)).unwrap().to_vec();
        assert!(t.delete_vehicle(VehicleId(2)));
        assert!(!t.delete_vehicle(VehicleId(2)));
        assert!(nodes.iter().all(|n| t.occupant(*n).is_none()));
        assert_eq!(t.front(VehicleId(1)).unwrap(), None);
    }
}

#[cfg(test)]
mod neighbors {
    use super::*;

    #[test]
    fn front_and_back_are_symmetric() {
        let t = traffic(&three_cars());
        let (lead, gap) = t.front(VehicleId(1)).unwrap().unwrap();
        assert_eq!(lead, VehicleId(2));
        let (follower, back_gap) = t.back(VehicleId(2)).unwrap().unwrap();
        assert_eq!(follower, VehicleId(1));
        assert!(close(gap, 16.0));
        assert!(close(gap, back_gap));
    }

    #[test]
    fn frontmost_has_no_lead() {
        let t = traffic(&three_cars());
        assert_eq!(t.front(VehicleId(2)).unwrap(), None);
        assert_eq!(t.back(VehicleId(1)).unwrap(), None);
    }

    #[test]
    fn adjacent_lane_queries() {
        let t = traffic(&three_cars());
        assert_eq!(t.left_front(VehicleId(1)).unwrap(), Some((VehicleId(3), 6.0)));
        assert_eq!(t.left_back(VehicleId(1)).unwrap(), None);
        assert_eq!(t.right_back(VehicleId(3)).unwrap(), Some((VehicleId(1), 6.0)));
        assert_eq!(t.right_front(VehicleId(3)).unwrap(), Some((VehicleId(2), 6.0)));
        assert_eq!(t.right_front(VehicleId(1)).unwrap(), None);
    }

    #[test]
    fn alongside_vehicle_gives_non_positive_gap() {
        let t = traffic(&[car(1, 20.0, 0), car(2, 21.0, 1)]);
        let (other, gap) = t.left_front(VehicleId(1)).unwrap().unwrap();
        assert_eq!(other, VehicleId(2));
        assert!(close(gap, -3.0));

        let t = traffic(&[car(1, 20.0, 0), car(2, 19.0, 1)]);
        let (other, gap) = t.left_back(VehicleId(1)).unwrap().unwrap();
        assert_eq!(other, VehicleId(2));
        assert!(close(gap, -3.0));
    }

    #[test]
    fn unknown_vehicle_errors() {
        let t = traffic(&three_cars());
        assert!(matches!(t.front(VehicleId(42)), Err(LatticeError::UnknownVehicle(_))));
    }
}

#[cfg(test)]
mod lane_change {
    use super::*;

    fn straddling(y: f64, yaw: f64) -> Vehicle {
        Vehicle::new(VehicleId(5), Pose::new(100.0, y, yaw), 10.0, 15.0)
            .with_bounding_box(BoundingBox::new(2.0, 1.0))
    }

    #[test]
    fn keeping_lane() {
        let t = traffic(&[car(1, 20.0, 1)]);
        assert_eq!(t.is_changing_lane(VehicleId(1)).unwrap(), LaneChange::None);
    }

    #[test]
    fn drifting_left() {
        let t = traffic(&[straddling(1.9, 0.5)]);
        assert_eq!(t.is_changing_lane(VehicleId(5)).unwrap(), LaneChange::Left);
    }

    #[test]
    fn drifting_right() {
        let t = traffic(&[straddling(1.6, -0.5)]);
        assert_eq!(t.is_changing_lane(VehicleId(5)).unwrap(), LaneChange::Right);
    }
}

#[cfg(test)]
mod move_forward {
    use super::*;

    fn advanced(vehicles: &[Vehicle], dx: f64) -> Vec<Vehicle> {
        vehicles
            .iter()
            .map(|v| {
                let mut v = v.clone();
                v.pose.location.x += dx;
                v
            })
            .collect()
    }

    #[test]
    fn mismatched_ids_fail_without_mutation() {
        let mut t = traffic(&three_cars());
        let len = t.lattice().len();
        let range = t.lattice().range();
        let partial = vec![car(1, 25.0, 0), car(2, 45.0, 0)];

        let err = t.move_traffic_forward(&partial).unwrap_err();
        assert!(matches!(err, LatticeError::VehicleSetMismatch { .. }));
        assert!(err.to_string().contains("[1, 2, 3]"));

        assert_eq!(t.lattice().len(), len);
        assert!(close(t.lattice().range(), range));
        assert_eq!(t.front(VehicleId(1)).unwrap(), Some((VehicleId(2), 16.0)));
    }

    #[test]
    fn unknown_id_in_update_fails() {
        let mut t = traffic(&three_cars());
        let mut update = three_cars();
        update[2].id = VehicleId(99);
        assert!(t.move_traffic_forward(&update).is_err());
        assert!(t.contains(VehicleId(3)));
    }

    #[test]
    fn advancing_traffic_moves_the_start() {
        let mut t = traffic(&three_cars());
        let update = t.move_traffic_forward(&advanced(&three_cars(), 5.0)).unwrap();
        assert!(update.collision_free);
        assert!(update.disappeared.is_empty());

        let rear = t.rear_node(VehicleId(1)).unwrap();
        let rear = t.lattice().node(rear).unwrap();
        assert!(close(rear.distance, 0.0));
        assert!(close(rear.waypoint.s, 23.0));
        assert_eq!(t.front(VehicleId(1)).unwrap(), Some((VehicleId(2), 16.0)));
    }

    #[test]
    fn closing_in_is_a_collision() {
        let mut t = traffic(&[car(1, 20.0, 0), car(2, 30.0, 0)]);
        let moved = vec![car(1, 27.0, 0), car(2, 30.0, 0)];
        let update = t.move_traffic_forward(&moved).unwrap();
        assert!(!update.collision_free);
    }

    #[test]
    fn vehicle_leaving_the_map_disappears() {
        let mut t = traffic(&three_cars());
        let mut moved = three_cars();
        moved[1].pose.location.x = 500.0;
        let update = t.move_traffic_forward(&moved).unwrap();
        assert!(update.collision_free);
        assert!(update.disappeared.contains(&VehicleId(2)));
        assert!(!t.contains(VehicleId(2)));
        assert!(t.contains(VehicleId(1)));
    }
}
