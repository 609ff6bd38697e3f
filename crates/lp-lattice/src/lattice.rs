//! Road-aligned node lattice.
//!
//! # Data layout
//!
//! Nodes live in an arena (`Vec<Option<LatticeNode>>`) addressed by
//! [`NodeId`]; slots freed by [`Lattice::shorten`] are recycled through a
//! free list.  Each node links to its `front`/`back` neighbors along the lane
//! and its `left`/`right` neighbors across lanes.  A waypoint-id table maps
//! map waypoints to nodes so that lateral and longitudinal growth converge on
//! the same node instead of duplicating it.
//!
//! Node `distance` is the arc length from the lattice start, so all lanes
//! share the same longitudinal axis and `front` strictly increases it.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use tracing::debug;

use lp_core::{NodeId, WaypointId};
use lp_map::{RoadContext, Waypoint};

use crate::{LatticeError, LatticeResult};

/// Tolerance used when comparing node distances.
pub(crate) const EPS: f64 = 1e-6;

/// One discretized road position.
#[derive(Clone, Debug)]
pub struct LatticeNode {
    pub id:        NodeId,
    pub waypoint:  Waypoint,
    /// Arc length from the lattice start, in metres.
    pub distance:  f64,
    pub curvature: f64,
    pub front:     Option<NodeId>,
    pub back:      Option<NodeId>,
    pub left:      Option<NodeId>,
    pub right:     Option<NodeId>,
}

/// Grid of road positions covering `range` metres ahead of the start.
#[derive(Clone, Debug)]
pub struct Lattice {
    roads:       RoadContext,
    nodes:       Vec<Option<LatticeNode>>,
    free:        Vec<NodeId>,
    by_waypoint: HashMap<WaypointId, NodeId>,
    range:       f64,
    resolution:  f64,
}

impl Lattice {
    /// Build a lattice rooted at `start` covering `range` metres.
    ///
    /// Nodes are seeded at `start` and at every lane reachable sideways from
    /// it, then grown forward every `resolution` metres along the route.
    pub fn new(roads: RoadContext, start: &Waypoint, range: f64, resolution: f64) -> LatticeResult<Self> {
        if range <= resolution || resolution <= 0.0 {
            return Err(LatticeError::RangeTooShort { range, resolution });
        }
        let mut lattice = Self {
            roads,
            nodes: Vec::new(),
            free: Vec::new(),
            by_waypoint: HashMap::new(),
            range: 0.0,
            resolution,
        };
        let curvature = lattice.roads.map().lane_curvature(start);
        let (root, _) = lattice.find_or_insert(start.clone(), 0.0, curvature);
        let mut seeded = VecDeque::new();
        lattice.expand_lateral(root, &mut seeded);
        lattice.extend(range)?;
        Ok(lattice)
    }

    // ── Dimensions ────────────────────────────────────────────────────────

    pub fn range(&self) -> f64 {
        self.range
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn roads(&self) -> &RoadContext {
        &self.roads
    }

    // ── Node access ───────────────────────────────────────────────────────

    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&LatticeNode> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    /// Live nodes in arena order.
    pub fn nodes(&self) -> impl Iterator<Item = &LatticeNode> + '_ {
        self.nodes.iter().flatten()
    }

    /// Nodes at distance zero, one per lane.
    pub fn start_nodes(&self) -> Vec<NodeId> {
        self.nodes()
            .filter(|n| n.distance.abs() < EPS)
            .map(|n| n.id)
            .collect()
    }

    /// The node at `waypoint` if it is within `tolerance` metres, otherwise
    /// the node nearest to it within `tolerance`.
    pub fn closest_node(&self, waypoint: &Waypoint, tolerance: f64) -> Option<NodeId> {
        let location = waypoint.location();
        if let Some(&id) = self.by_waypoint.get(&waypoint.id) {
            if let Some(node) = self.node(id) {
                if node.waypoint.location().distance(location) <= tolerance {
                    return Some(id);
                }
            }
        }
        self.nodes()
            .map(|n| (n.id, n.waypoint.location().distance(location)))
            .filter(|&(_, d)| d <= tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    // ── Navigation ────────────────────────────────────────────────────────

    /// The node `distance` metres ahead of `from` in the same lane.
    pub fn front(&self, from: NodeId, distance: f64) -> Option<NodeId> {
        let target = self.node(from)?.distance + distance;
        let mut current = from;
        loop {
            let node = self.node(current)?;
            if node.distance >= target - EPS {
                return Some(current);
            }
            current = node.front?;
        }
    }

    /// The node `distance` metres behind `from` in the same lane.
    pub fn back(&self, from: NodeId, distance: f64) -> Option<NodeId> {
        let target = self.node(from)?.distance - distance;
        let mut current = from;
        loop {
            let node = self.node(current)?;
            if node.distance <= target + EPS {
                return Some(current);
            }
            current = node.back?;
        }
    }

    pub fn front_left(&self, from: NodeId, distance: f64) -> Option<NodeId> {
        self.front(from, distance).and_then(|n| self.node(n)?.left)
    }

    pub fn front_right(&self, from: NodeId, distance: f64) -> Option<NodeId> {
        self.front(from, distance).and_then(|n| self.node(n)?.right)
    }

    // ── Growth ────────────────────────────────────────────────────────────

    /// Grow the lattice forward until it covers `range` metres.  A smaller
    /// `range` than the current one is a no-op.
    pub fn extend(&mut self, range: f64) -> LatticeResult<()> {
        if range <= self.range && !self.is_empty() {
            return Ok(());
        }
        self.range = range.max(self.range);

        let mut queue: VecDeque<NodeId> =
            self.nodes().filter(|n| n.front.is_none()).map(|n| n.id).collect();

        while let Some(id) = queue.pop_front() {
            let Some(node) = self.node(id) else { continue };
            if node.front.is_some() || node.distance + self.resolution > self.range + EPS {
                continue;
            }
            let distance = node.distance + self.resolution;
            let Some(waypoint) = self.roads.front_waypoint(&node.waypoint, self.resolution)? else {
                continue;
            };
            let curvature = self.roads.map().lane_curvature(&waypoint);
            let (front, created) = self.find_or_insert(waypoint, distance, curvature);
            self.link_longitudinal(id, front);
            if created {
                self.expand_lateral(front, &mut queue);
                queue.push_back(front);
            }
        }
        Ok(())
    }

    /// Drop nodes from the back so that at most `range` metres remain, then
    /// re-base distances so the rearmost remaining nodes sit at zero.
    pub fn shorten(&mut self, range: f64) -> LatticeResult<()> {
        if range >= self.range - EPS {
            return Ok(());
        }
        let cut = self.range - range;
        let origin = self
            .nodes()
            .map(|n| n.distance)
            .filter(|&d| d >= cut - EPS)
            .min_by(f64::total_cmp)
            .ok_or(LatticeError::Exhausted { requested: range })?;

        let doomed: Vec<NodeId> = self
            .nodes()
            .filter(|n| n.distance < origin - EPS)
            .map(|n| n.id)
            .collect();
        for id in &doomed {
            self.remove(*id);
        }
        for node in self.nodes.iter_mut().flatten() {
            node.distance -= origin;
        }
        self.range -= origin;
        debug!(removed = doomed.len(), origin, range = self.range, "lattice shortened");
        Ok(())
    }

    /// Move the lattice start forward by `distance` metres, keeping the
    /// current range.
    pub fn shift(&mut self, distance: f64) -> LatticeResult<()> {
        if distance <= 0.0 {
            return Ok(());
        }
        let range = self.range;
        self.shorten(range - distance)?;
        self.extend(range)
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn find_or_insert(&mut self, waypoint: Waypoint, distance: f64, curvature: f64) -> (NodeId, bool) {
        if let Some(&id) = self.by_waypoint.get(&waypoint.id) {
            return (id, false);
        }
        let blank = LatticeNode {
            id: NodeId::INVALID,
            waypoint,
            distance,
            curvature,
            front: None,
            back: None,
            left: None,
            right: None,
        };
        let id = match self.free.pop() {
            Some(id) => id,
            None => {
                self.nodes.push(None);
                NodeId((self.nodes.len() - 1) as u32)
            }
        };
        self.by_waypoint.insert(blank.waypoint.id, id);
        self.nodes[id.index()] = Some(LatticeNode { id, ..blank });
        (id, true)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut LatticeNode> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut)
    }

    fn link_longitudinal(&mut self, back: NodeId, front: NodeId) {
        if let Some(n) = self.node_mut(back) {
            n.front = Some(front);
        }
        if let Some(n) = self.node_mut(front) {
            n.back = Some(back);
        }
    }

    /// Create (or link) the lateral neighbors of `id`, walking outwards on
    /// both sides until the road edge.  New nodes are queued for growth.
    fn expand_lateral(&mut self, id: NodeId, queue: &mut VecDeque<NodeId>) {
        for leftwards in [true, false] {
            let mut current = id;
            loop {
                let Some(node) = self.node(current) else { break };
                let distance = node.distance;
                let neighbor = if leftwards {
                    self.roads.map().left(&node.waypoint)
                } else {
                    self.roads.map().right(&node.waypoint)
                };
                let Some(waypoint) = neighbor else { break };
                let curvature = self.roads.map().lane_curvature(&waypoint);
                let (next, created) = self.find_or_insert(waypoint, distance, curvature);
                if let Some(n) = self.node_mut(current) {
                    if leftwards { n.left = Some(next) } else { n.right = Some(next) }
                }
                if let Some(n) = self.node_mut(next) {
                    if leftwards { n.right = Some(current) } else { n.left = Some(current) }
                }
                if !created {
                    break;
                }
                queue.push_back(next);
                current = next;
            }
        }
    }

    fn remove(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id.index()).and_then(Option::take) else {
            return;
        };
        self.by_waypoint.remove(&node.waypoint.id);
        self.free.push(id);
        if let Some(n) = node.front.and_then(|f| self.node_mut(f)) {
            n.back = None;
        }
        if let Some(n) = node.left.and_then(|l| self.node_mut(l)) {
            n.right = None;
        }
        if let Some(n) = node.right.and_then(|r| self.node_mut(r)) {
            n.left = None;
        }
    }
}

impl fmt::Display for Lattice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "lattice range:{:.3} resolution:{:.3} nodes:{}",
            self.range,
            self.resolution,
            self.len()
        )?;
        for node in self.nodes() {
            writeln!(
                f,
                "  {} d:{:.3} road:{} lane:{} s:{:.3}",
                node.id, node.distance, node.waypoint.road.0, node.waypoint.lane, node.waypoint.s
            )?;
        }
        Ok(())
    }
}
