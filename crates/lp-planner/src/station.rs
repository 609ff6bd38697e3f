//! Planning-graph vertices.
//!
//! A [`Station`] pairs a lattice node with the ego snapshot of its best
//! arrival.  It records every way it was reached (parent slots, per approach
//! direction) and every edge leaving it (child slots, per maneuver).

use lp_core::{NodeId, StationId};
use lp_traffic::{ContinuousPath, Maneuver, Snapshot};

/// Direction a parent lies in, seen from the child.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ParentSide {
    Left,
    Back,
    Right,
}

impl ParentSide {
    /// Side of the child where a parent reaching it by `maneuver` lies.
    pub fn of(maneuver: Maneuver) -> Self {
        match maneuver {
            Maneuver::KeepLane => ParentSide::Back,
            Maneuver::LeftChange => ParentSide::Right,
            Maneuver::RightChange => ParentSide::Left,
        }
    }
}

/// Direction a child lies in, seen from the parent.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChildSide {
    Left,
    Front,
    Right,
}

impl ChildSide {
    pub fn of(maneuver: Maneuver) -> Self {
        match maneuver {
            Maneuver::KeepLane => ChildSide::Front,
            Maneuver::LeftChange => ChildSide::Left,
            Maneuver::RightChange => ChildSide::Right,
        }
    }

    pub fn maneuver(self) -> Maneuver {
        match self {
            ChildSide::Front => Maneuver::KeepLane,
            ChildSide::Left => Maneuver::LeftChange,
            ChildSide::Right => Maneuver::RightChange,
        }
    }
}

/// One way of reaching a station.
#[derive(Clone, Debug)]
pub struct ParentLink {
    /// Snapshot at the end of the edge from the parent.
    pub snapshot:     Snapshot,
    pub cost_to_come: f64,
    pub station:      StationId,
}

/// One edge leaving a station.
#[derive(Clone, Debug)]
pub struct ChildLink {
    pub path:         ContinuousPath,
    /// Ego acceleration held along the edge, for constant-acceleration edges.
    pub acceleration: Option<f64>,
    pub stage_cost:   f64,
    pub station:      StationId,
}

#[derive(Clone, Debug)]
pub struct Station {
    id:             StationId,
    node:           NodeId,
    slot:           usize,
    snapshot:       Snapshot,
    left_parents:   Vec<Option<ParentLink>>,
    back_parents:   Vec<Option<ParentLink>>,
    right_parents:  Vec<Option<ParentLink>>,
    optimal_parent: Option<ParentLink>,
    left_children:  Vec<Option<ChildLink>>,
    front_children: Vec<Option<ChildLink>>,
    right_children: Vec<Option<ChildLink>>,
}

impl Station {
    /// A station with no links.  `slot` is the station's own key slot and
    /// `slots` the number of slots per direction.
    pub fn new(id: StationId, node: NodeId, slot: usize, slots: usize, snapshot: Snapshot) -> Self {
        Self {
            id,
            node,
            slot,
            snapshot,
            left_parents: vec![None; slots],
            back_parents: vec![None; slots],
            right_parents: vec![None; slots],
            optimal_parent: None,
            left_children: vec![None; slots],
            front_children: vec![None; slots],
            right_children: vec![None; slots],
        }
    }

    pub fn id(&self) -> StationId {
        self.id
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Snapshot of the best known arrival (the root's input snapshot for a
    /// root station).
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn parents(&self, side: ParentSide) -> &[Option<ParentLink>] {
        match side {
            ParentSide::Left => &self.left_parents,
            ParentSide::Back => &self.back_parents,
            ParentSide::Right => &self.right_parents,
        }
    }

    pub fn children(&self, side: ChildSide) -> &[Option<ChildLink>] {
        match side {
            ChildSide::Left => &self.left_children,
            ChildSide::Front => &self.front_children,
            ChildSide::Right => &self.right_children,
        }
    }

    pub fn has_parent(&self) -> bool {
        [&self.left_parents, &self.back_parents, &self.right_parents]
            .into_iter()
            .any(|slots| slots.iter().any(Option::is_some))
    }

    pub fn has_child(&self) -> bool {
        [&self.left_children, &self.front_children, &self.right_children]
            .into_iter()
            .any(|slots| slots.iter().any(Option::is_some))
    }

    pub fn is_root(&self) -> bool {
        !self.has_parent()
    }

    pub fn is_terminal(&self) -> bool {
        !self.has_child()
    }

    pub fn optimal_parent(&self) -> Option<&ParentLink> {
        self.optimal_parent.as_ref()
    }

    /// Cost of the best known way here; zero for a root.
    pub fn cost_to_come(&self) -> f64 {
        self.optimal_parent.as_ref().map_or(0.0, |p| p.cost_to_come)
    }

    /// The child slot leading to `station`, searched front, left, right.
    pub fn child_to(&self, station: StationId) -> Option<(ChildSide, &ChildLink)> {
        [ChildSide::Front, ChildSide::Left, ChildSide::Right]
            .into_iter()
            .find_map(|side| {
                self.children(side)
                    .iter()
                    .flatten()
                    .find(|c| c.station == station)
                    .map(|c| (side, c))
            })
    }

    /// The first child found front, left, right.
    pub fn first_child(&self) -> Option<&ChildLink> {
        [ChildSide::Front, ChildSide::Left, ChildSide::Right]
            .into_iter()
            .find_map(|side| self.children(side).iter().flatten().next())
    }

    pub(crate) fn set_child(&mut self, side: ChildSide, slot: usize, link: ChildLink) {
        let slots = match side {
            ChildSide::Left => &mut self.left_children,
            ChildSide::Front => &mut self.front_children,
            ChildSide::Right => &mut self.right_children,
        };
        slots[slot] = Some(link);
    }

    /// Store a parent link and refresh the optimal parent.
    pub(crate) fn set_parent(&mut self, side: ParentSide, slot: usize, link: ParentLink) {
        let slots = match side {
            ParentSide::Left => &mut self.left_parents,
            ParentSide::Back => &mut self.back_parents,
            ParentSide::Right => &mut self.right_parents,
        };
        slots[slot] = Some(link);
        self.update_optimal_parent();
    }

    /// Without a current optimum the first parent found left, back, right is
    /// taken.  Then every left, right and back parent whose cost is lower or
    /// equal replaces it, in that order.  The winner is copied, and its
    /// arrival snapshot becomes the station snapshot.
    fn update_optimal_parent(&mut self) {
        let mut best = self.optimal_parent.take().or_else(|| {
            [&self.left_parents, &self.back_parents, &self.right_parents]
                .into_iter()
                .flat_map(|slots| slots.iter().flatten())
                .next()
                .cloned()
        });
        for link in [&self.left_parents, &self.right_parents, &self.back_parents]
            .into_iter()
            .flat_map(|slots| slots.iter().flatten())
        {
            if best.as_ref().is_none_or(|b| link.cost_to_come <= b.cost_to_come) {
                best = Some(link.clone());
            }
        }
        if let Some(best) = &best {
            self.snapshot = best.snapshot.clone();
        }
        self.optimal_parent = best;
    }
}
