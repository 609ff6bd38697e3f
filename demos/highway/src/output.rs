//! CSV output: one row per planning cycle, one row per vehicle per cycle.

use std::fs::{self, File};
use std::path::Path;

use anyhow::{Context, Result};
use csv::Writer;

use lp_traffic::Snapshot;

/// Per-cycle statistics.
#[derive(Clone, Debug, Default)]
pub struct CycleRow {
    pub cycle:          usize,
    pub time:           f64,
    pub maneuver:       String,
    pub stations:       usize,
    pub discarded:      usize,
    pub cost:           f64,
    pub plan_ms:        f64,
    pub collision_free: bool,
}

pub struct CsvOutput {
    cycles:   Writer<File>,
    vehicles: Writer<File>,
    finished: bool,
}

impl CsvOutput {
    /// Create `dir` if needed and write the header rows of `cycles.csv` and
    /// `vehicles.csv`.
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

        let mut cycles = Writer::from_path(dir.join("cycles.csv"))?;
        cycles.write_record([
            "cycle",
            "time",
            "ego_x",
            "ego_y",
            "ego_speed",
            "ego_acceleration",
            "maneuver",
            "stations",
            "discarded",
            "cost",
            "plan_ms",
            "collision_free",
        ])?;

        let mut vehicles = Writer::from_path(dir.join("vehicles.csv"))?;
        vehicles.write_record(["cycle", "vehicle_id", "x", "y", "yaw", "speed"])?;

        Ok(Self { cycles, vehicles, finished: false })
    }

    /// Record `row` with the ego state of `snapshot`, and every vehicle.
    pub fn write_cycle(&mut self, row: &CycleRow, snapshot: &Snapshot) -> Result<()> {
        let ego = snapshot.ego();
        self.cycles.write_record(&[
            row.cycle.to_string(),
            format!("{:.2}", row.time),
            format!("{:.3}", ego.location().x),
            format!("{:.3}", ego.location().y),
            format!("{:.3}", ego.speed),
            format!("{:.3}", ego.acceleration),
            row.maneuver.clone(),
            row.stations.to_string(),
            row.discarded.to_string(),
            format!("{:.4}", row.cost),
            format!("{:.3}", row.plan_ms),
            (row.collision_free as u8).to_string(),
        ])?;

        for vehicle in snapshot.vehicles() {
            self.vehicles.write_record(&[
                row.cycle.to_string(),
                vehicle.id.0.to_string(),
                format!("{:.3}", vehicle.location().x),
                format!("{:.3}", vehicle.location().y),
                format!("{:.4}", vehicle.pose.yaw),
                format!("{:.3}", vehicle.speed),
            ])?;
        }
        Ok(())
    }

    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.cycles.flush()?;
        self.vehicles.flush()?;
        Ok(())
    }
}
