use serde::Deserialize;

use crate::interval::Interval;

/// Immutable per-satellite parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SatelliteType {
    /// Bytes per second produced while imaging.
    pub fill_rate: i64,
    /// Bytes per second sent while downlinking.
    pub drain_rate: i64,
    /// On-board storage in bytes.
    pub capacity: i64,
}

impl SatelliteType {
    /// Capacity in milli-bytes, the unit of all volume bookkeeping.
    /// `rate * milliseconds` lands in the same unit with no division.
    pub fn capacity_milli(&self) -> i64 {
        self.capacity * 1000
    }
}

/// Index-addressed scheduler inputs. Satellite and station indices refer
/// to the positions in the name vectors; both are sorted lexicographically
/// so that runs are reproducible.
#[derive(Debug, Clone, Default)]
pub struct Constellation {
    pub satellite_names: Vec<String>,
    pub station_names: Vec<String>,
    pub types: Vec<SatelliteType>,
    /// Imaging windows over the target region, per satellite, ordered.
    pub imaging_windows: Vec<Vec<Interval>>,
    /// Downlink windows per (station, satellite), ordered.
    pub downlink_windows: Vec<Vec<Vec<Interval>>>,
}

impl Constellation {
    pub fn satellites(&self) -> usize {
        self.satellite_names.len()
    }

    pub fn stations(&self) -> usize {
        self.station_names.len()
    }
}

/// Scheduler tuning knobs, deserializable from the optional `solver`
/// object of the configuration file.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SolverParams {
    /// Storage ratio (against capacity in milli-bytes) above which an
    /// imageable satellite is offered a downlink slot anyway.
    pub full_ratio: f64,
    /// A satellite must hold at least this many milliseconds worth of
    /// drainable data before it is offered a downlink slot.
    pub min_downlink_ms: i64,
    /// Floor on slice length; prevents pathological fragmentation.
    pub min_slice_ms: i64,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            full_ratio: 0.93,
            min_downlink_ms: 5_000,
            min_slice_ms: 1_000,
        }
    }
}

/// The computed schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransmissionResult {
    /// Grand total downlinked, in milli-bytes.
    pub total_data_milli: i64,
    /// Downlink intervals per (station, satellite), ordered and disjoint.
    pub downlink: Vec<Vec<Vec<Interval>>>,
    /// Imaging intervals per satellite, ordered and disjoint.
    pub imaging: Vec<Vec<Interval>>,
    /// Per-slice actions: `assignments[slice][satellite]` is the station
    /// the satellite was downlinking to, or `None`.
    pub assignments: Vec<Vec<Option<usize>>>,
}

impl TransmissionResult {
    pub fn new(stations: usize, satellites: usize) -> Self {
        Self {
            total_data_milli: 0,
            downlink: vec![vec![Vec::new(); satellites]; stations],
            imaging: vec![Vec::new(); satellites],
            assignments: Vec::new(),
        }
    }
}
