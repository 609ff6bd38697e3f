//! Point-in-time capture of ego, agents, and their lattice occupancy.

use std::collections::BTreeMap;
use std::fmt;

use lp_core::{Vehicle, VehicleId};
use lp_lattice::TrafficLattice;
use lp_map::RoadContext;

use crate::{TrafficError, TrafficResult};

/// Ego vehicle, agent vehicles, and a traffic lattice that reflects exactly
/// that configuration.  Clones are fully independent.
#[derive(Clone, Debug)]
pub struct Snapshot {
    ego:     Vehicle,
    agents:  BTreeMap<VehicleId, Vehicle>,
    traffic: TrafficLattice,
}

impl Snapshot {
    /// Capture `ego` and `agents`, building a traffic lattice at
    /// `resolution` that spans all of them.
    ///
    /// Agents that cannot be placed on the lattice are dropped; an ego that
    /// cannot be placed is an error.
    pub fn new(
        ego: Vehicle,
        agents: impl IntoIterator<Item = Vehicle>,
        roads: RoadContext,
        resolution: f64,
    ) -> TrafficResult<Self> {
        let mut by_id = BTreeMap::new();
        for agent in agents {
            if agent.id == ego.id {
                return Err(TrafficError::DuplicateVehicle(agent.id));
            }
            let id = agent.id;
            if by_id.insert(id, agent).is_some() {
                return Err(TrafficError::DuplicateVehicle(id));
            }
        }
        let mut vehicles = Vec::with_capacity(by_id.len() + 1);
        vehicles.push(ego.clone());
        vehicles.extend(by_id.values().cloned());

        let (traffic, disappeared) = TrafficLattice::new(&vehicles, roads, resolution)?;
        if disappeared.contains(&ego.id) {
            return Err(TrafficError::EgoOffLattice(ego.id));
        }
        by_id.retain(|id, _| !disappeared.contains(id));
        Ok(Self { ego, agents: by_id, traffic })
    }

    pub fn ego(&self) -> &Vehicle {
        &self.ego
    }

    pub fn agents(&self) -> &BTreeMap<VehicleId, Vehicle> {
        &self.agents
    }

    pub fn traffic_lattice(&self) -> &TrafficLattice {
        &self.traffic
    }

    pub fn roads(&self) -> &RoadContext {
        self.traffic.lattice().roads()
    }

    /// Ego or agent with the given id.
    pub fn vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        if id == self.ego.id { Some(&self.ego) } else { self.agents.get(&id) }
    }

    /// Ego first, then agents in ascending id order.
    pub fn vehicles(&self) -> impl Iterator<Item = &Vehicle> + '_ {
        std::iter::once(&self.ego).chain(self.agents.values())
    }

    /// The same snapshot with the ego's stored acceleration replaced.
    pub fn with_ego_acceleration(mut self, acceleration: f64) -> Self {
        self.ego.acceleration = acceleration;
        self
    }

    pub(crate) fn ego_mut(&mut self) -> &mut Vehicle {
        &mut self.ego
    }

    pub(crate) fn agents_mut(&mut self) -> &mut BTreeMap<VehicleId, Vehicle> {
        &mut self.agents
    }

    pub(crate) fn traffic_mut(&mut self) -> &mut TrafficLattice {
        &mut self.traffic
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ego: {}", self.ego)?;
        writeln!(f, "agents:")?;
        for agent in self.agents.values() {
            writeln!(f, "  {agent}")?;
        }
        write!(f, "{}", self.traffic)
    }
}
