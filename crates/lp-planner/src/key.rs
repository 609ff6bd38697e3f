//! How stations are told apart.
//!
//! The single-state planner keeps one station per lattice node.  The
//! speed-stratified planner keeps one station per lattice node and speed
//! bin, so a slow and a fast arrival at the same place are searched
//! separately.  Both are expressed through [`StationKey`]; parent and child
//! slots are indexed by [`StationKey::slot`].

use std::fmt::Debug;
use std::hash::Hash;

use lp_core::NodeId;

/// Identity of a station in the station table.
pub trait StationKey: Copy + Eq + Hash + Ord + Debug + Send + Sync + 'static {
    /// Slots per direction in a station's parent and child lists.
    const SLOTS: usize;

    /// Key of an ego arriving at `node` with `speed`, or `None` if such an
    /// arrival cannot be represented.
    fn from_arrival(node: NodeId, speed: f64) -> Option<Self>;

    fn node(&self) -> NodeId;

    /// Slot index in `0..SLOTS`.
    fn slot(&self) -> usize;
}

/// One station per lattice node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(pub NodeId);

impl StationKey for NodeKey {
    const SLOTS: usize = 1;

    fn from_arrival(node: NodeId, _speed: f64) -> Option<Self> {
        Some(Self(node))
    }

    fn node(&self) -> NodeId {
        self.0
    }

    fn slot(&self) -> usize {
        0
    }
}

/// Half-open speed intervals in m/s: 0–30, 30–60 and 60–90 mph.
pub const SPEED_BINS: [(f64, f64); 3] = [(0.0, 13.4112), (13.4112, 26.8224), (26.8224, 40.2336)];

/// Index of the bin containing `speed`.
pub fn speed_bin(speed: f64) -> Option<usize> {
    SPEED_BINS.iter().position(|&(low, high)| speed >= low && speed < high)
}

/// One station per lattice node and speed bin.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpeedBinKey {
    pub node: NodeId,
    pub bin:  u8,
}

impl StationKey for SpeedBinKey {
    const SLOTS: usize = SPEED_BINS.len();

    fn from_arrival(node: NodeId, speed: f64) -> Option<Self> {
        speed_bin(speed).map(|bin| Self { node, bin: bin as u8 })
    }

    fn node(&self) -> NodeId {
        self.node
    }

    fn slot(&self) -> usize {
        self.bin as usize
    }
}
