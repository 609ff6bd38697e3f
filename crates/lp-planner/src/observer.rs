//! Planner observer trait for diagnostics and progress reporting.

use lp_core::{StationId, Vehicle};
use lp_traffic::Maneuver;

use crate::{Discard, Station};

/// Callbacks invoked by [`LatticePlanner`][crate::LatticePlanner] during a
/// planning cycle.
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.
///
/// # Example: discard counter
///
/// ```rust,ignore
/// #[derive(Default)]
/// struct DiscardCounter { discarded: usize }
///
/// impl PlannerObserver for DiscardCounter {
///     fn on_edge_discarded(&mut self, _from: StationId, _m: Maneuver, _why: &Discard) {
///         self.discarded += 1;
///     }
/// }
/// ```
pub trait PlannerObserver {
    /// Called before anything else in a cycle.
    fn on_cycle_start(&mut self, _ego: &Vehicle) {}

    /// Called for every station added to the graph, the root included.
    fn on_station_created(&mut self, _station: &Station) {}

    /// Called for every candidate edge that was rejected or failed.
    fn on_edge_discarded(&mut self, _from: StationId, _maneuver: Maneuver, _reason: &Discard) {}

    /// Called after a path was selected.  `stations` is the size of the
    /// graph, `cost` the total cost of the selected terminal.
    fn on_cycle_end(&mut self, _stations: usize, _cost: f64) {}
}

/// A [`PlannerObserver`] that does nothing.
pub struct NoopObserver;

impl PlannerObserver for NoopObserver {}
