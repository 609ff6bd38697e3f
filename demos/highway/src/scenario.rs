//! Synthetic highway and random traffic.

use std::sync::Arc;

use anyhow::{Context, Result};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use lp_core::{Pose, RoadId, Vehicle, VehicleId};
use lp_map::{Highway, HighwayBuilder, RoadContext, SequenceRouter};

use crate::config::DemoConfig;

/// Longitudinal position of the ego at the start, in metres.
const EGO_START: f64 = 10.0;

/// Free space kept in front of the ego at the start.
const EGO_CLEARANCE: f64 = 25.0;

/// Random bumper-to-bumper spacing between spawned agents of one lane.
const SPACING: std::ops::Range<f64> = 15.0..45.0;

/// Roads are numbered from 1 in route order.
pub fn build_roads(config: &DemoConfig) -> Result<(Arc<Highway>, RoadContext)> {
    let mut builder = HighwayBuilder::new(config.lanes, config.lane_width).resolution(config.planner.resolution);
    let mut route = Vec::with_capacity(config.road_lengths.len());
    for (i, &length) in config.road_lengths.iter().enumerate() {
        let id = RoadId(i as u32 + 1);
        builder = builder.road(id, length);
        route.push(id);
    }
    let highway = Arc::new(builder.build()?);
    let roads = RoadContext::new(highway.clone(), Arc::new(SequenceRouter::new(route)));
    Ok((highway, roads))
}

pub fn spawn_ego(config: &DemoConfig, highway: &Highway) -> Result<Vehicle> {
    let location = highway
        .location_at(config.ego_lane, EGO_START)
        .context("ego start is not on the highway")?;
    Ok(Vehicle::new(
        VehicleId(0),
        Pose { location, yaw: 0.0 },
        config.ego_speed,
        config.ego_policy_speed,
    ))
}

/// Scatter `config.agents` vehicles ahead of the ego, lane by lane, each
/// driving at its own policy speed.
pub fn spawn_agents(config: &DemoConfig, highway: &Highway, ego: &Vehicle) -> Vec<Vehicle> {
    let mut rng = SmallRng::seed_from_u64(config.seed);
    let mut cursor = vec![ego.location().x + EGO_CLEARANCE; config.lanes as usize];
    let mut agents = Vec::with_capacity(config.agents);

    for id in 1..=config.agents {
        let lane = rng.gen_range(0..config.lanes);
        let s = cursor[lane as usize] + rng.gen_range(SPACING);
        let Some(location) = highway.location_at(lane, s) else {
            continue;
        };
        cursor[lane as usize] = s + ego.length();
        let speed = rng.gen_range(config.agent_min_speed..config.agent_max_speed);
        agents.push(Vehicle::new(VehicleId(id as u32), Pose { location, yaw: 0.0 }, speed, speed));
    }
    agents
}
