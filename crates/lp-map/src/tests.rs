//! Unit tests for lp-map.

use std::sync::Arc;

use lp_core::{Location, RoadId};

use crate::*;

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Three lanes, 3.5 m wide, over two roads of 100 m and 50 m.
fn two_road_highway() -> Highway {
    HighwayBuilder::new(3, 3.5)
        .road(RoadId(10), 100.0)
        .road(RoadId(20), 50.0)
        .build()
        .unwrap()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[cfg(test)]
mod highway {
    use super::*;

    #[test]
    fn builder_rejects_bad_layout() {
        assert!(HighwayBuilder::new(0, 3.5).road(RoadId(1), 10.0).build().is_err());
        assert!(HighwayBuilder::new(2, 3.5).build().is_err());
        assert!(
            HighwayBuilder::new(2, 3.5)
                .road(RoadId(1), 10.0)
                .road(RoadId(1), 10.0)
                .build()
                .is_err()
        );
    }

    #[test]
    fn waypoint_snaps_to_nearest_sample() {
        let hw = two_road_highway();
        let wp = hw.waypoint(Location::new(12.3, 3.9)).unwrap();
        assert_eq!(wp.road, RoadId(10));
        assert_eq!(wp.lane, 1);
        assert!(close(wp.s, 12.0));
        assert!(close(wp.location().y, 3.5));
    }

    #[test]
    fn waypoint_on_second_road() {
        let hw = two_road_highway();
        let wp = hw.waypoint(Location::new(120.0, 0.0)).unwrap();
        assert_eq!(wp.road, RoadId(20));
        assert!(close(wp.s, 20.0));
    }

    #[test]
    fn off_road_location_has_no_waypoint() {
        let hw = two_road_highway();
        assert!(hw.waypoint(Location::new(10.0, 20.0)).is_none());
    }

    #[test]
    fn project_keeps_continuous_s() {
        let hw = two_road_highway();
        let wp = hw.project(Location::new(42.4, 0.2)).unwrap();
        assert!(close(wp.s, 42.4));
        assert_eq!(wp.id, hw.waypoint(Location::new(42.0, 0.0)).unwrap().id);
    }

    #[test]
    fn next_crosses_road_boundary() {
        let hw = two_road_highway();
        let wp = hw.waypoint(Location::new(98.0, 7.0)).unwrap();
        let next = hw.next(&wp, 5.0);
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].road, RoadId(20));
        assert!(close(next[0].s, 3.0));
        assert_eq!(next[0].lane, 2);
    }

    #[test]
    fn next_past_the_end_is_empty() {
        let hw = two_road_highway();
        let wp = hw.waypoint(Location::new(148.0, 0.0)).unwrap();
        assert!(hw.next(&wp, 5.0).is_empty());
    }

    #[test]
    fn lateral_neighbors() {
        let hw = two_road_highway();
        let mid = hw.waypoint(Location::new(30.0, 3.5)).unwrap();
        let left = hw.left(&mid).unwrap();
        let right = hw.right(&mid).unwrap();
        assert_eq!(left.lane, 2);
        assert_eq!(right.lane, 0);
        assert!(hw.left(&left).is_none());
        assert!(hw.right(&right).is_none());
        assert_ne!(left.id, mid.id);
    }

    #[test]
    fn lateral_offset_is_positive_to_the_left() {
        let hw = two_road_highway();
        let wp = hw.waypoint(Location::new(30.0, 3.5)).unwrap();
        assert!(close(wp.lateral_offset(Location::new(30.0, 4.0)), 0.5));
        assert!(close(wp.lateral_offset(Location::new(30.0, 3.0)), -0.5));
    }

    #[test]
    fn boundary_waypoint_shares_id_with_next_road_start() {
        let hw = two_road_highway();
        let last = hw.waypoint(Location::new(99.0, 0.0)).unwrap();
        let stepped = hw.next(&last, 1.0);
        let start = hw.waypoint(Location::new(100.0, 0.0)).unwrap();
        assert_eq!(stepped[0].id, start.id);
    }

    #[test]
    fn road_length_unknown_road_errors() {
        let hw = two_road_highway();
        assert!(matches!(hw.road_length(RoadId(99)), Err(MapError::UnknownRoad(_))));
    }
}

#[cfg(test)]
mod router {
    use super::*;

    #[test]
    fn sequence_next_and_prev() {
        let r = SequenceRouter::new(vec![RoadId(1), RoadId(2), RoadId(3)]);
        assert_eq!(r.next_road(RoadId(1)).unwrap(), Some(RoadId(2)));
        assert_eq!(r.next_road(RoadId(3)).unwrap(), None);
        assert_eq!(r.prev_road(RoadId(1)).unwrap(), None);
        assert_eq!(r.prev_road(RoadId(3)).unwrap(), Some(RoadId(2)));
    }

    #[test]
    fn looped_route_wraps() {
        let r = SequenceRouter::looped(vec![RoadId(1), RoadId(2)]);
        assert_eq!(r.next_road(RoadId(2)).unwrap(), Some(RoadId(1)));
        assert_eq!(r.prev_road(RoadId(1)).unwrap(), Some(RoadId(2)));
    }

    #[test]
    fn off_route_road_errors() {
        let r = SequenceRouter::new(vec![RoadId(1)]);
        assert!(!r.has_road(RoadId(5)));
        assert!(matches!(r.next_road(RoadId(5)), Err(MapError::OffRoute(RoadId(5)))));
        assert!(matches!(r.prev_road(RoadId(5)), Err(MapError::OffRoute(_))));
    }

    #[test]
    fn front_waypoint_rejects_non_positive_distance() {
        let hw = two_road_highway();
        let r = SequenceRouter::new(vec![RoadId(10), RoadId(20)]);
        let wp = hw.waypoint(Location::new(5.0, 0.0)).unwrap();
        assert!(matches!(
            r.front_waypoint(&hw, &wp, 0.0),
            Err(MapError::InvalidDistance(_))
        ));
    }

    #[test]
    fn front_waypoint_follows_route() {
        let hw = two_road_highway();
        let r = SequenceRouter::new(vec![RoadId(10), RoadId(20)]);
        let wp = hw.waypoint(Location::new(99.0, 0.0)).unwrap();
        let front = r.front_waypoint(&hw, &wp, 2.0).unwrap().unwrap();
        assert_eq!(front.road, RoadId(20));
        assert!(close(front.s, 1.0));
    }

    #[test]
    fn front_waypoint_stops_where_route_ends() {
        let hw = two_road_highway();
        let r = SequenceRouter::new(vec![RoadId(10)]);
        let wp = hw.waypoint(Location::new(99.0, 0.0)).unwrap();
        assert!(r.front_waypoint(&hw, &wp, 2.0).unwrap().is_none());
    }

    #[test]
    fn context_delegates() {
        let hw = Arc::new(two_road_highway());
        let ctx = RoadContext::new(hw, Arc::new(SequenceRouter::new(vec![RoadId(10), RoadId(20)])));
        let wp = ctx.waypoint(Location::new(10.0, 0.0)).unwrap();
        let front = ctx.front_waypoint(&wp, 10.0).unwrap().unwrap();
        assert!(close(front.s, 20.0));
        assert!(close(ctx.road_length(RoadId(20)).unwrap(), 50.0));
    }
}
