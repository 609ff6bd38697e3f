//! Fluent builder for constructing a [`LatticePlanner`].

use std::marker::PhantomData;
use std::sync::Arc;

use lp_map::RoadContext;
use lp_traffic::{
    IdmParams, IdmPolicy, IntelligentDriverModel, PathGenerator, QuinticPathGenerator, StageCost,
    WeightedStageCost,
};

use crate::{LatticePlanner, Longitudinal, PlannerConfig, PlannerError, PlannerResult, StationGraph, StationKey};

/// Fluent builder for [`LatticePlanner<K>`].
///
/// # Required inputs
///
/// - [`RoadContext`]: map and route the planner works on
///
/// # Optional inputs (have defaults)
///
/// | Method                          | Default                        |
/// |---------------------------------|--------------------------------|
/// | `.config(c)`                    | `PlannerConfig::default()`     |
/// | `.path_generator(g)`            | `QuinticPathGenerator`         |
/// | `.idm(p)`                       | car following, default params  |
/// | `.constant_acceleration(opts)`  | —                              |
/// | `.stage_cost(c)`                | `WeightedStageCost::default()` |
///
/// # Example
///
/// ```rust,ignore
/// let mut planner = PlannerBuilder::<SpeedBinKey>::new(roads)
///     .constant_acceleration(DEFAULT_ACCELERATION_OPTIONS.to_vec())
///     .build()?;
/// let path = planner.plan_path(ego_id, &snapshot)?;
/// ```
pub struct PlannerBuilder<K: StationKey> {
    roads:        RoadContext,
    config:       PlannerConfig,
    generator:    Option<Arc<dyn PathGenerator>>,
    longitudinal: Option<Longitudinal>,
    cost:         Option<Arc<dyn StageCost>>,
    _key:         PhantomData<K>,
}

impl<K: StationKey> PlannerBuilder<K> {
    pub fn new(roads: RoadContext) -> Self {
        Self {
            roads,
            config:       PlannerConfig::default(),
            generator:    None,
            longitudinal: None,
            cost:         None,
            _key:         PhantomData,
        }
    }

    pub fn config(mut self, config: PlannerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn path_generator(mut self, generator: impl PathGenerator + 'static) -> Self {
        self.generator = Some(Arc::new(generator));
        self
    }

    /// Simulate every edge with the car-following model.
    pub fn idm(mut self, params: IdmParams) -> Self {
        self.longitudinal = Some(Longitudinal::Idm(IdmPolicy::new(IntelligentDriverModel::new(params))));
        self
    }

    /// Simulate every edge once per ego acceleration in `options`.
    pub fn constant_acceleration(mut self, options: Vec<f64>) -> Self {
        self.longitudinal = Some(Longitudinal::ConstantAcceleration(options));
        self
    }

    pub fn stage_cost(mut self, cost: impl StageCost + 'static) -> Self {
        self.cost = Some(Arc::new(cost));
        self
    }

    /// Validate inputs and return a planner with an empty graph.
    pub fn build(self) -> PlannerResult<LatticePlanner<K>> {
        self.config.validate()?;

        let longitudinal = self.longitudinal.unwrap_or_default();
        if let Longitudinal::ConstantAcceleration(options) = &longitudinal {
            if options.is_empty() {
                return Err(PlannerError::Config("no acceleration options".into()));
            }
            if let Some(bad) = options.iter().find(|a| !a.is_finite()) {
                return Err(PlannerError::Config(format!("acceleration option {bad} is not finite")));
            }
        }

        Ok(LatticePlanner {
            config:       self.config,
            roads:        self.roads,
            generator:    self.generator.unwrap_or_else(|| Arc::new(QuinticPathGenerator::default())),
            longitudinal,
            cost:         self.cost.unwrap_or_else(|| Arc::new(WeightedStageCost::default())),
            lattice:      None,
            graph:        StationGraph::new(),
            next_node:    None,
            selected:     Vec::new(),
        })
    }
}
