//! Forward traffic simulation along a candidate ego path.
//!
//! Each step has two phases:
//!
//! 1. **Decide**: every vehicle's acceleration is computed against the same
//!    (pre-step) snapshot, so the order of vehicles does not matter.
//! 2. **Advance**: speeds and positions are integrated; the ego follows the
//!    candidate path, agents follow their lanes via the router, and the
//!    traffic lattice is rebuilt.  Overlapping vehicles end the simulation.

use tracing::debug;

use lp_core::{Pose, VehicleId};

use crate::{AccelerationPolicy, PathLike, Snapshot, StageCost, TrafficError, TrafficResult};

const EPS: f64 = 1e-9;

/// Ego state recorded after every step.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EgoSample {
    pub time:         f64,
    /// Arc length travelled along the simulated path.
    pub distance:     f64,
    pub speed:        f64,
    pub acceleration: f64,
    /// Gap to the same-lane lead, if there is one.
    pub lead_gap:     Option<f64>,
}

/// Result of [`TrafficSimulator::simulate`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SimulationOutcome {
    pub collision_free: bool,
    /// Simulated time in seconds.
    pub elapsed:        f64,
    pub stage_cost:     f64,
    /// Whether the ego reached the end of the path.
    pub completed:      bool,
}

/// Advances its own copy of a [`Snapshot`].
pub struct TrafficSimulator<'p> {
    snapshot: Snapshot,
    policy:   &'p dyn AccelerationPolicy,
    cost:     &'p dyn StageCost,
    trace:    Vec<EgoSample>,
}

impl<'p> TrafficSimulator<'p> {
    pub fn new(snapshot: Snapshot, policy: &'p dyn AccelerationPolicy, cost: &'p dyn StageCost) -> Self {
        Self { snapshot, policy, cost, trace: Vec::new() }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn into_snapshot(self) -> Snapshot {
        self.snapshot
    }

    pub fn trace(&self) -> &[EgoSample] {
        &self.trace
    }

    /// Drive the ego along `path` in steps of `dt` seconds until it reaches
    /// the end of the path, `max_duration` elapses, or vehicles collide.
    pub fn simulate(&mut self, path: &dyn PathLike, dt: f64, max_duration: f64) -> TrafficResult<SimulationOutcome> {
        if dt <= 0.0 || max_duration <= 0.0 {
            return Err(TrafficError::InvalidStep { dt, max_duration });
        }
        let range = path.range();
        let mut outcome = SimulationOutcome {
            collision_free: true,
            elapsed:        0.0,
            stage_cost:     0.0,
            completed:      range <= EPS,
        };
        let mut travelled = 0.0;

        while !outcome.completed && outcome.elapsed < max_duration - EPS {
            let step = dt.min(max_duration - outcome.elapsed);

            // ── Decide ────────────────────────────────────────────────────
            let ego_accel = self.policy.acceleration(&self.snapshot, self.snapshot.ego())?;
            let mut agent_accels = Vec::with_capacity(self.snapshot.agents().len());
            for agent in self.snapshot.agents().values() {
                agent_accels.push((agent.id, self.policy.acceleration(&self.snapshot, agent)?));
            }

            // ── Advance ego ───────────────────────────────────────────────
            let previous_accel = self.snapshot.ego().acceleration;
            let speed = self.snapshot.ego().speed;
            let (mut ds, mut step_time, mut new_speed) = kinematics(speed, ego_accel, step);
            if travelled + ds >= range - EPS {
                ds = range - travelled;
                step_time = time_to_cover(speed, ego_accel, ds, step);
                new_speed = (speed + ego_accel * step_time).max(0.0);
                outcome.completed = true;
            }
            travelled += ds;
            outcome.elapsed += step_time;
            let point = path.sample(travelled.min(range)).or_else(|| path.points().last().copied());
            {
                let ego = self.snapshot.ego_mut();
                if let Some(point) = point {
                    ego.pose = point.pose;
                    ego.curvature = point.curvature;
                }
                ego.speed = new_speed;
                ego.acceleration = ego_accel;
            }
            outcome.stage_cost += self.cost.step_cost(self.snapshot.ego(), previous_accel, step_time);

            // ── Advance agents ────────────────────────────────────────────
            let mut gone = Vec::new();
            for (id, accel) in agent_accels {
                if !self.advance_agent(id, accel, step_time)? {
                    gone.push(id);
                }
            }
            for id in gone {
                self.remove_agent(id);
            }

            // ── Re-register ───────────────────────────────────────────────
            let vehicles: Vec<_> = self.snapshot.vehicles().cloned().collect();
            let update = self.snapshot.traffic_mut().move_traffic_forward(&vehicles)?;
            let ego_id = self.snapshot.ego().id;
            if update.disappeared.contains(&ego_id) {
                return Err(TrafficError::EgoOffLattice(ego_id));
            }
            for id in &update.disappeared {
                self.snapshot.agents_mut().remove(id);
            }
            if !update.collision_free {
                debug!(time = outcome.elapsed, "collision during forward simulation");
                outcome.collision_free = false;
                self.record(outcome.elapsed, travelled, None);
                return Ok(outcome);
            }
            let lead_gap = self.snapshot.traffic_lattice().front(ego_id)?.map(|(_, gap)| gap);
            self.record(outcome.elapsed, travelled, lead_gap);
        }
        Ok(outcome)
    }

    /// Move one agent along its lane.  Returns `false` once it leaves the
    /// route.
    fn advance_agent(&mut self, id: VehicleId, accel: f64, dt: f64) -> TrafficResult<bool> {
        let roads = self.snapshot.roads().clone();
        let Some(agent) = self.snapshot.agents_mut().get_mut(&id) else {
            return Ok(false);
        };
        let (ds, _, speed) = kinematics(agent.speed, accel, dt);
        agent.speed = speed;
        agent.acceleration = accel;
        if ds <= EPS {
            return Ok(true);
        }
        let Some(projected) = roads.project(agent.location()) else {
            return Ok(false);
        };
        let Some(ahead) = roads.front_waypoint(&projected, ds)? else {
            return Ok(false);
        };
        agent.curvature = roads.map().lane_curvature(&ahead);
        agent.pose = Pose { location: ahead.location(), yaw: ahead.pose.yaw };
        Ok(true)
    }

    fn remove_agent(&mut self, id: VehicleId) {
        self.snapshot.agents_mut().remove(&id);
        self.snapshot.traffic_mut().delete_vehicle(id);
    }

    fn record(&mut self, time: f64, distance: f64, lead_gap: Option<f64>) {
        let ego = self.snapshot.ego();
        self.trace.push(EgoSample {
            time,
            distance,
            speed: ego.speed,
            acceleration: ego.acceleration,
            lead_gap,
        });
    }
}

/// Distance, time and final speed of a constant-acceleration step that never
/// reverses: once the speed hits zero the vehicle stays put.
fn kinematics(speed: f64, accel: f64, dt: f64) -> (f64, f64, f64) {
    let end_speed = speed + accel * dt;
    if end_speed >= 0.0 {
        (0.5 * (speed + end_speed) * dt, dt, end_speed)
    } else {
        let stop = speed / -accel;
        (0.5 * speed * stop, dt, 0.0)
    }
}

/// Time needed to cover `distance` starting at `speed` with `accel`, capped
/// at `dt`.
fn time_to_cover(speed: f64, accel: f64, distance: f64, dt: f64) -> f64 {
    if distance <= 0.0 {
        return 0.0;
    }
    let t = if accel.abs() < EPS {
        if speed > EPS { distance / speed } else { dt }
    } else {
        let disc = speed * speed + 2.0 * accel * distance;
        if disc < 0.0 { dt } else { (-speed + disc.sqrt()) / accel }
    };
    t.clamp(0.0, dt)
}
