//! Demo configuration, optionally read from a JSON file.
//!
//! Every field has a default, so a file only needs the values it changes:
//!
//! ```json
//! { "agents": 30, "variant": "spatiotemporal", "planner": { "lookahead": 40.0 } }
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use lp_planner::PlannerConfig;
use lp_traffic::{CostParams, IdmParams};

/// Which planner drives the ego.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// One station per node, car-following edges.
    #[default]
    Idm,
    /// One station per node and speed bin, constant-acceleration edges.
    Spatiotemporal,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub seed:             u64,
    pub variant:          Variant,
    pub lanes:            u32,
    pub lane_width:       f64,
    /// Lengths of the consecutive roads of the route, in metres.
    pub road_lengths:     Vec<f64>,
    pub agents:           usize,
    pub agent_min_speed:  f64,
    pub agent_max_speed:  f64,
    pub ego_lane:         u32,
    pub ego_speed:        f64,
    pub ego_policy_speed: f64,
    /// Seconds the world advances along each planned path.
    pub control_period:   f64,
    pub max_cycles:       usize,
    pub output_dir:       String,
    pub planner:          PlannerConfig,
    pub idm:              IdmParams,
    pub cost:             CostParams,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            seed:             42,
            variant:          Variant::Idm,
            lanes:            3,
            lane_width:       3.5,
            road_lengths:     vec![500.0, 500.0, 500.0],
            agents:           12,
            agent_min_speed:  8.0,
            agent_max_speed:  14.0,
            ego_lane:         1,
            ego_speed:        10.0,
            ego_policy_speed: 20.0,
            control_period:   0.5,
            max_cycles:       400,
            output_dir:       "output/highway".into(),
            planner:          PlannerConfig::default(),
            idm:              IdmParams::default(),
            cost:             CostParams::default(),
        }
    }
}

impl DemoConfig {
    /// Defaults, overridden by the JSON file at `path` if one is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
                serde_json::from_reader(BufReader::new(file))
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.lanes > 0, "at least one lane is needed");
        ensure!(self.ego_lane < self.lanes, "ego lane {} does not exist", self.ego_lane);
        ensure!(!self.road_lengths.is_empty(), "the route needs at least one road");
        ensure!(
            self.agent_min_speed >= 0.0 && self.agent_min_speed < self.agent_max_speed,
            "agent speed range {}..{} is empty",
            self.agent_min_speed,
            self.agent_max_speed
        );
        ensure!(self.ego_policy_speed > 0.0, "ego policy speed must be positive");
        ensure!(self.control_period > 0.0, "control period must be positive");
        self.planner.validate()?;
        Ok(())
    }
}
