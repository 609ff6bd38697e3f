//! Arena of stations addressed by [`StationId`], indexed by key.

use lp_core::StationId;
use lp_traffic::Snapshot;

use crate::{Station, StationKey};

#[cfg(not(feature = "fx-hash"))]
type KeyTable<K> = std::collections::HashMap<K, StationId>;
#[cfg(feature = "fx-hash")]
type KeyTable<K> = rustc_hash::FxHashMap<K, StationId>;

/// Stations of one planning cycle.  Ids are dense and assigned in creation
/// order, which is also the iteration order.
#[derive(Clone, Debug)]
pub struct StationGraph<K: StationKey> {
    stations: Vec<Station>,
    keys:     Vec<K>,
    table:    KeyTable<K>,
}

impl<K: StationKey> Default for StationGraph<K> {
    fn default() -> Self {
        Self { stations: Vec::new(), keys: Vec::new(), table: KeyTable::default() }
    }
}

impl<K: StationKey> StationGraph<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn clear(&mut self) {
        self.stations.clear();
        self.keys.clear();
        self.table.clear();
    }

    /// The first station created in the cycle.
    pub fn root(&self) -> Option<&Station> {
        self.stations.first()
    }

    #[inline]
    pub fn get(&self, id: StationId) -> Option<&Station> {
        self.stations.get(id.index())
    }

    pub(crate) fn get_mut(&mut self, id: StationId) -> Option<&mut Station> {
        self.stations.get_mut(id.index())
    }

    pub fn key(&self, id: StationId) -> Option<K> {
        self.keys.get(id.index()).copied()
    }

    pub fn find(&self, key: &K) -> Option<StationId> {
        self.table.get(key).copied()
    }

    /// Stations in creation order.
    pub fn stations(&self) -> impl Iterator<Item = &Station> + '_ {
        self.stations.iter()
    }

    /// Create a station for `key`.  Returns the existing id instead when the
    /// key is already present, with `false`.
    pub(crate) fn insert(&mut self, key: K, snapshot: Snapshot) -> (StationId, bool) {
        if let Some(id) = self.find(&key) {
            return (id, false);
        }
        let id = StationId(self.stations.len() as u32);
        self.stations.push(Station::new(id, key.node(), key.slot(), K::SLOTS, snapshot));
        self.keys.push(key);
        self.table.insert(key, id);
        (id, true)
    }
}
