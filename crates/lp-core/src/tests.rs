//! Unit tests for lp-core.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::*;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[cfg(test)]
mod ids {
    use super::*;

    #[test]
    fn invalid_is_max() {
        assert_eq!(VehicleId::INVALID.0, u32::MAX);
        assert_eq!(WaypointId::INVALID.0, u64::MAX);
        assert_eq!(NodeId::default(), NodeId::INVALID);
        assert_eq!(StationId::default(), StationId::INVALID);
    }

    #[test]
    fn index_roundtrip() {
        let id = NodeId(17);
        assert_eq!(id.index(), 17);
        assert_eq!(NodeId::try_from(17usize).unwrap(), id);
    }

    #[test]
    fn display_names_type() {
        assert_eq!(VehicleId(3).to_string(), "VehicleId(3)");
        assert_eq!(RoadId(12).to_string(), "RoadId(12)");
    }

    #[test]
    fn ordering_follows_inner() {
        let mut v = vec![StationId(4), StationId(1), StationId(3)];
        v.sort();
        assert_eq!(v, vec![StationId(1), StationId(3), StationId(4)]);
    }
}

#[cfg(test)]
mod geometry {
    use super::*;

    #[test]
    fn local_frame_left_is_positive() {
        let pose = Pose::new(10.0, 0.0, 0.0);
        let (lon, lat) = pose.to_local(Location::new(12.0, 1.5));
        assert!(close(lon, 2.0));
        assert!(close(lat, 1.5));
    }

    #[test]
    fn local_global_inverse() {
        let pose = Pose::new(3.0, -4.0, 0.7);
        let p = Location::new(8.5, 2.25);
        let (lon, lat) = pose.to_local(p);
        let back = pose.to_global(lon, lat);
        assert!(close(back.x, p.x));
        assert!(close(back.y, p.y));
    }

    #[test]
    fn advanced_follows_heading() {
        let p = Location::new(0.0, 0.0).advanced(FRAC_PI_2, 3.0);
        assert!(close(p.x, 0.0));
        assert!(close(p.y, 3.0));
    }

    #[test]
    fn normalize_wraps() {
        assert!(close(normalize_angle(2.5 * PI), FRAC_PI_2));
        assert!(close(normalize_angle(-1.5 * PI), FRAC_PI_2));
        assert!(close(normalize_angle(-FRAC_PI_2), -FRAC_PI_2));
        assert!(close(normalize_angle(2.0 * PI + 0.25), 0.25));
    }
}

#[cfg(test)]
mod vehicle {
    use super::*;

    #[test]
    fn head_and_rear_from_bounding_box() {
        let v = Vehicle::new(VehicleId(0), Pose::new(10.0, 2.0, 0.0), 5.0, 10.0)
            .with_bounding_box(BoundingBox::new(2.0, 1.0));
        assert!(close(v.head_location().x, 12.0));
        assert!(close(v.rear_location().x, 8.0));
        assert!(close(v.length(), 4.0));
    }

    #[test]
    fn display_lists_state() {
        let v = Vehicle::new(VehicleId(7), Pose::new(1.0, 2.0, 0.0), 3.0, 4.0);
        let s = v.to_string();
        assert!(s.starts_with("id:7"));
        assert!(s.contains("speed:3.000"));
        assert!(s.contains("policy:4.000"));
    }
}
