//! highway: closed-loop drive with the lattice planner.
//!
//! A straight multi-lane highway is filled with randomly spaced agents that
//! follow the car-following model.  Every control period the ego plans a
//! path through the traffic, drives along it, and the world is stepped
//! forward.  Per-cycle statistics and vehicle states are written as CSV.
//!
//! ```text
//! cargo run -p highway --release -- [config.json]
//! RUST_LOG=lp_planner=debug cargo run -p highway
//! ```

mod config;
mod output;
mod scenario;

use std::env;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lp_core::{StationId, Vehicle, VehicleId};
use lp_map::RoadContext;
use lp_planner::{
    DEFAULT_ACCELERATION_OPTIONS, Discard, LatticePlanner, NodeKey, PlannerBuilder, PlannerObserver, SpeedBinKey,
    StationKey, merge_segments,
};
use lp_traffic::{
    DiscretePath, IdmPolicy, IntelligentDriverModel, Maneuver, PathGenerator, PathPoint, QuinticPathGenerator,
    Snapshot, TrafficSimulator, WeightedStageCost,
};

use config::{DemoConfig, Variant};
use output::{CsvOutput, CycleRow};
use scenario::{build_roads, spawn_agents, spawn_ego};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Length of the lane-keeping path driven when planning fails.
const FALLBACK_DISTANCE: f64 = 30.0;

/// Distance kept from the end of the route so the lattice always fits.
const END_MARGIN: f64 = 10.0;

// ── Observer ──────────────────────────────────────────────────────────────────

#[derive(Default)]
struct CycleStats {
    stations:  usize,
    discarded: usize,
    cost:      f64,
}

impl PlannerObserver for CycleStats {
    fn on_edge_discarded(&mut self, _from: StationId, _maneuver: Maneuver, _reason: &Discard) {
        self.discarded += 1;
    }

    fn on_cycle_end(&mut self, stations: usize, cost: f64) {
        self.stations = stations;
        self.cost = cost;
    }
}

// ── Drive loop ────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Summary {
    cycles:        usize,
    failed_plans:  usize,
    lane_changes:  usize,
    distance:      f64,
    time:          f64,
    total_plan_ms: f64,
    max_plan_ms:   f64,
    collision:     bool,
}

/// Keep-lane path from the ego's projection to the waypoint
/// `FALLBACK_DISTANCE` ahead of it.
fn lane_keeping_path(world: &Snapshot, generator: &dyn PathGenerator) -> Result<DiscretePath> {
    let ego = world.ego();
    let roads = world.roads();
    let here = roads.project(ego.location()).context("ego is off the road")?;
    let Some(ahead) = roads.front_waypoint(&here, FALLBACK_DISTANCE)? else {
        bail!("no road {FALLBACK_DISTANCE} m ahead of {here}");
    };
    let start = PathPoint { s: 0.0, pose: ego.pose, curvature: ego.curvature };
    let end = PathPoint { s: 0.0, pose: ahead.pose, curvature: 0.0 };
    Ok(DiscretePath::new(&generator.make_path(&start, &end, Maneuver::KeepLane)?))
}

/// Re-capture the world so its traffic lattice spans the current positions.
fn recapture(ego: Vehicle, agents: Vec<Vehicle>, roads: &RoadContext, resolution: f64) -> Result<Snapshot> {
    Ok(Snapshot::new(ego, agents, roads.clone(), resolution)?)
}

fn drive<K: StationKey>(
    mut planner: LatticePlanner<K>,
    mut world: Snapshot,
    config: &DemoConfig,
    roads: &RoadContext,
    finish_x: f64,
    out: &mut CsvOutput,
) -> Result<Summary> {
    let ego_id: VehicleId = world.ego().id;
    let idm = IdmPolicy::new(IntelligentDriverModel::new(config.idm.clone()));
    let cost = WeightedStageCost::new(config.cost.clone());
    let fallback = QuinticPathGenerator::default();
    let start_x = world.ego().location().x;
    let mut summary = Summary::default();

    for cycle in 0..config.max_cycles {
        if world.ego().location().x >= finish_x {
            info!(cycle, "end of route reached");
            break;
        }

        let mut stats = CycleStats::default();
        let started = Instant::now();
        let (path, maneuver) = match planner.plan_trajectory_with(ego_id, &world, &mut stats) {
            Ok(segments) => {
                let maneuver = segments.first().map_or(Maneuver::KeepLane, |s| s.maneuver);
                (merge_segments(&segments), maneuver)
            }
            Err(e) => {
                warn!(cycle, error = %e, "planning failed, keeping lane");
                summary.failed_plans += 1;
                planner.reset();
                (lane_keeping_path(&world, &fallback)?, Maneuver::KeepLane)
            }
        };
        let plan_ms = started.elapsed().as_secs_f64() * 1e3;
        summary.total_plan_ms += plan_ms;
        summary.max_plan_ms = summary.max_plan_ms.max(plan_ms);
        if maneuver != Maneuver::KeepLane {
            summary.lane_changes += 1;
        }

        let mut sim = TrafficSimulator::new(world.clone(), &idm, &cost);
        let outcome = sim.simulate(&path, config.planner.time_step, config.control_period)?;
        let stepped = sim.into_snapshot();
        summary.time += outcome.elapsed;
        summary.cycles = cycle + 1;

        let row = CycleRow {
            cycle,
            time: summary.time,
            maneuver: maneuver.as_str().to_owned(),
            stations: stats.stations,
            discarded: stats.discarded,
            cost: stats.cost,
            plan_ms,
            collision_free: outcome.collision_free,
        };
        out.write_cycle(&row, &stepped)?;

        if !outcome.collision_free {
            warn!(cycle, time = summary.time, "collision");
            summary.collision = true;
            world = stepped;
            break;
        }
        world = recapture(
            stepped.ego().clone(),
            stepped.agents().values().cloned().collect(),
            roads,
            config.planner.resolution,
        )?;
    }

    summary.distance = world.ego().location().x - start_x;
    Ok(summary)
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("highway=info,lp_planner=warn")),
        )
        .init();

    let path = env::args().nth(1).map(PathBuf::from);
    let config = DemoConfig::load(path.as_deref())?;

    println!("=== highway — lattice planner closed loop ===");
    println!(
        "Variant: {:?}  |  Lanes: {}  |  Agents: {}  |  Seed: {}",
        config.variant, config.lanes, config.agents, config.seed
    );
    println!();

    // 1. Roads and traffic.
    let (highway, roads) = build_roads(&config)?;
    let ego = spawn_ego(&config, &highway)?;
    let agents = spawn_agents(&config, &highway, &ego);
    println!(
        "Highway: {} roads, {:.0} m, {} agents placed",
        config.road_lengths.len(),
        highway.total_length(),
        agents.len()
    );
    let world = recapture(ego, agents, &roads, config.planner.resolution)?;

    // 2. Output.
    let output_dir = Path::new(&config.output_dir);
    let mut out = CsvOutput::new(output_dir)?;

    // 3. Drive.
    let finish_x = highway.total_length() - config.planner.lattice_range() - END_MARGIN;
    let started = Instant::now();
    let summary = match config.variant {
        Variant::Idm => {
            let planner = PlannerBuilder::<NodeKey>::new(roads.clone())
                .config(config.planner.clone())
                .idm(config.idm.clone())
                .stage_cost(WeightedStageCost::new(config.cost.clone()))
                .build()?;
            drive(planner, world, &config, &roads, finish_x, &mut out)?
        }
        Variant::Spatiotemporal => {
            let planner = PlannerBuilder::<SpeedBinKey>::new(roads.clone())
                .config(config.planner.clone())
                .constant_acceleration(DEFAULT_ACCELERATION_OPTIONS.to_vec())
                .stage_cost(WeightedStageCost::new(config.cost.clone()))
                .build()?;
            drive(planner, world, &config, &roads, finish_x, &mut out)?
        }
    };
    out.finish()?;
    let wall = started.elapsed();

    // 4. Summary.
    let mean_plan_ms = if summary.cycles > 0 { summary.total_plan_ms / summary.cycles as f64 } else { 0.0 };
    println!();
    println!("┌──────────────────────────┬──────────────┐");
    println!("│ Cycles                   │ {:>12} │", summary.cycles);
    println!("│ Simulated time (s)       │ {:>12.1} │", summary.time);
    println!("│ Distance driven (m)      │ {:>12.1} │", summary.distance);
    println!("│ Lane changes started     │ {:>12} │", summary.lane_changes);
    println!("│ Failed plans             │ {:>12} │", summary.failed_plans);
    println!("│ Mean plan time (ms)      │ {:>12.2} │", mean_plan_ms);
    println!("│ Max plan time (ms)       │ {:>12.2} │", summary.max_plan_ms);
    println!("│ Collision                │ {:>12} │", if summary.collision { "yes" } else { "no" });
    println!("│ Wall time (s)            │ {:>12.2} │", wall.as_secs_f64());
    println!("└──────────────────────────┴──────────────┘");
    println!();
    println!("Output written to {}/", output_dir.display());
    Ok(())
}
