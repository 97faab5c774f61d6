//! Event-driven downlink/imaging scheduler.
//!
//! Time is processed as a stream of visibility-window boundary events.
//! Between two consecutive boundaries the visible set is constant; within
//! that span the scheduler cuts slices, matches satellites to stations by
//! maximum bipartite matching in priority order, and lets every unmatched
//! satellite inside an imaging window capture data. A slice ends early
//! when the first involved satellite would run dry or hit capacity.

use log::debug;

use crate::interval::{push_merged, Interval};
use crate::solver::matching::maximum_matching;
use crate::solver::types::{Constellation, SatelliteType, SolverParams, TransmissionResult};
use crate::time::TimeMillis;

/// Assignments recorded by a previous run, replayed verbatim up to
/// `mutate_at`. At that slice the first recorded downlinker that could
/// image instead is unassigned; afterwards matching is recomputed.
#[derive(Debug, Clone, Copy)]
pub struct Replay<'a> {
    pub assignments: &'a [Vec<Option<usize>>],
    pub mutate_at: usize,
}

/// `Close` sorts before `Open`, so windows that touch at an instant are
/// never visible simultaneously.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum EventKind {
    Close,
    Open,
}

#[derive(Clone, Copy, Debug)]
struct Event {
    at: TimeMillis,
    /// End of the window being opened; unused for `Close`.
    until: TimeMillis,
    kind: EventKind,
    /// `None` for imaging windows, `Some(station)` for downlink windows.
    station: Option<usize>,
    satellite: usize,
}

pub fn schedule(
    constellation: &Constellation,
    params: &SolverParams,
    replay: Option<Replay<'_>>,
) -> TransmissionResult {
    let satellites = constellation.satellites();
    let stations = constellation.stations();
    let mut result = TransmissionResult::new(stations, satellites);

    let mut events = collect_events(constellation);
    if satellites == 0 || events.is_empty() {
        return result;
    }
    events.sort_unstable_by_key(|e| (e.at, e.kind, e.station, e.satellite));

    // Per-satellite runtime state. Storage is in milli-bytes.
    let mut storage_used = vec![0i64; satellites];
    // End of the imaging window a satellite currently sits in, 0 otherwise.
    let mut imaging_until = vec![0 as TimeMillis; satellites];
    let mut visible = vec![vec![false; satellites]; stations];
    // Downlink candidates per satellite, rebuilt every slice.
    let mut graph: Vec<Vec<usize>> = vec![Vec::new(); satellites];

    // While `Some`, assignments come from the recording instead of the
    // matcher; cleared once the mutation slice has been passed.
    let mut recorded = replay;

    let mut now = events[0].at;
    let mut next_event = 0;
    let mut slice = 0usize;

    while next_event < events.len() {
        // Consume every event at `now` atomically before slicing onwards.
        while next_event < events.len() && events[next_event].at == now {
            let event = events[next_event];
            match event.station {
                None => {
                    imaging_until[event.satellite] = match event.kind {
                        EventKind::Open => event.until,
                        EventKind::Close => 0,
                    }
                }
                Some(station) => {
                    visible[station][event.satellite] = event.kind == EventKind::Open;
                }
            }
            next_event += 1;
        }
        if next_event == events.len() {
            break;
        }
        if next_event % 1000 == 0 {
            debug!("sweep progress: {}%", next_event * 100 / events.len());
        }
        let boundary = events[next_event].at;

        while now < boundary {
            let paired = match recorded {
                Some(replay) if slice < replay.mutate_at => {
                    match replay.assignments.get(slice) {
                        Some(paired) => paired.clone(),
                        None => {
                            recorded = None;
                            assign(
                                constellation,
                                params,
                                now,
                                &storage_used,
                                &imaging_until,
                                &visible,
                                &mut graph,
                            )
                        }
                    }
                }
                Some(replay) => {
                    recorded = None;
                    let mut paired = match replay.assignments.get(slice) {
                        Some(paired) => paired.clone(),
                        None => return result,
                    };
                    if !unassign_one_downlinker(
                        &mut paired,
                        &storage_used,
                        &imaging_until,
                        &constellation.types,
                    ) {
                        return result;
                    }
                    paired
                }
                None => assign(
                    constellation,
                    params,
                    now,
                    &storage_used,
                    &imaging_until,
                    &visible,
                    &mut graph,
                ),
            };

            // Shorten the slice to the first satellite that runs dry or
            // fills up, floored to avoid pathological fragmentation.
            let proposed = boundary - now;
            let mut slice_ms = proposed;
            for sat in 0..satellites {
                let ty = &constellation.types[sat];
                match paired[sat] {
                    Some(_) => {
                        let drained = storage_used[sat].min(ty.drain_rate * proposed);
                        let drain_time = drained / ty.drain_rate;
                        assert!(
                            drain_time > 0,
                            "satellite {sat} paired with nothing to drain in slice at {now}"
                        );
                        slice_ms = slice_ms.min(drain_time);
                    }
                    None if imaging_until[sat] != 0 => {
                        let headroom = ty.capacity_milli() - storage_used[sat];
                        let filled = headroom.min(ty.fill_rate * proposed);
                        let fill_time = filled / ty.fill_rate;
                        if fill_time > 0 {
                            slice_ms = slice_ms.min(fill_time);
                        }
                    }
                    None => {}
                }
            }
            slice_ms = slice_ms.max(params.min_slice_ms.min(proposed));

            for sat in 0..satellites {
                let ty = &constellation.types[sat];
                if let Some(station) = paired[sat] {
                    // Drain; never more than the satellite holds. The whole
                    // milliseconds actually spent determine the volume so
                    // interval length times rate stays exact.
                    let drained = storage_used[sat].min(ty.drain_rate * slice_ms);
                    let drain_time = drained / ty.drain_rate;
                    assert!(
                        drain_time > 0,
                        "satellite {sat} paired with nothing to drain in slice at {now}"
                    );
                    let moved = drain_time * ty.drain_rate;
                    push_merged(
                        &mut result.downlink[station][sat],
                        Interval::new(now, now + drain_time),
                    );
                    storage_used[sat] -= moved;
                    result.total_data_milli += moved;
                } else if imaging_until[sat] != 0 {
                    // Fill; never beyond capacity.
                    let headroom = ty.capacity_milli() - storage_used[sat];
                    let filled = headroom.min(ty.fill_rate * slice_ms);
                    let fill_time = filled / ty.fill_rate;
                    if fill_time > 0 {
                        let gained = fill_time * ty.fill_rate;
                        push_merged(
                            &mut result.imaging[sat],
                            Interval::new(now, now + fill_time),
                        );
                        storage_used[sat] += gained;
                    }
                }
                assert!(
                    storage_used[sat] >= 0 && storage_used[sat] <= ty.capacity_milli(),
                    "satellite {sat} storage out of bounds in slice at {now}"
                );
            }

            result.assignments.push(paired);
            now += slice_ms;
            slice += 1;
        }
    }
    result
}

/// Builds the candidate graph for the current slice and matches satellites
/// to stations in priority order.
fn assign(
    constellation: &Constellation,
    params: &SolverParams,
    now: TimeMillis,
    storage_used: &[i64],
    imaging_until: &[TimeMillis],
    visible: &[Vec<bool>],
    graph: &mut [Vec<usize>],
) -> Vec<Option<usize>> {
    for candidates in graph.iter_mut() {
        candidates.clear();
    }
    for (station, seen) in visible.iter().enumerate() {
        for (sat, ty) in constellation.types.iter().enumerate() {
            if !seen[sat] {
                continue;
            }
            // Too little data to be worth a slot.
            if storage_used[sat] < ty.drain_rate * params.min_downlink_ms {
                continue;
            }
            // Prefer imaging while storage is not critical; force a
            // downlink once the satellite is near full.
            let nearly_full =
                storage_used[sat] as f64 / ty.capacity_milli() as f64 >= params.full_ratio;
            if imaging_until[sat] == 0 || nearly_full {
                graph[sat].push(station);
            }
        }
    }

    let order = priority_order(now, storage_used, imaging_until, &constellation.types);
    maximum_matching(constellation.stations(), graph, &order)
}

/// Satellites sorted by descending cost: the sooner a satellite fills up
/// and the faster it drains, the earlier it gets a downlink slot. Ties
/// break by index so the order is total.
fn priority_order(
    now: TimeMillis,
    storage_used: &[i64],
    imaging_until: &[TimeMillis],
    types: &[SatelliteType],
) -> Vec<usize> {
    let cost: Vec<f64> = types
        .iter()
        .enumerate()
        .map(|(sat, ty)| {
            let pending_ms = if imaging_until[sat] == 0 {
                0
            } else {
                (imaging_until[sat] - now).max(0)
            };
            let projected = storage_used[sat] + pending_ms * ty.fill_rate;
            projected as f64 / ty.fill_rate as f64 * ty.drain_rate as f64
        })
        .collect();
    let mut order: Vec<usize> = (0..types.len()).collect();
    order.sort_unstable_by(|&a, &b| cost[b].total_cmp(&cost[a]).then(a.cmp(&b)));
    order
}

/// Unassigns the first downlinking satellite that could image instead and
/// still has headroom. Returns false when no such satellite exists.
fn unassign_one_downlinker(
    paired: &mut [Option<usize>],
    storage_used: &[i64],
    imaging_until: &[TimeMillis],
    types: &[SatelliteType],
) -> bool {
    for sat in 0..paired.len() {
        if paired[sat].is_some()
            && imaging_until[sat] != 0
            && storage_used[sat] < types[sat].capacity_milli()
        {
            paired[sat] = None;
            return true;
        }
    }
    false
}

fn collect_events(constellation: &Constellation) -> Vec<Event> {
    let mut events = Vec::new();
    for (station, per_satellite) in constellation.downlink_windows.iter().enumerate() {
        for (satellite, windows) in per_satellite.iter().enumerate() {
            for window in windows {
                if window.is_empty() {
                    continue;
                }
                events.push(Event {
                    at: window.start,
                    until: window.end,
                    kind: EventKind::Open,
                    station: Some(station),
                    satellite,
                });
                events.push(Event {
                    at: window.end,
                    until: 0,
                    kind: EventKind::Close,
                    station: Some(station),
                    satellite,
                });
            }
        }
    }
    for (satellite, windows) in constellation.imaging_windows.iter().enumerate() {
        for window in windows {
            if window.is_empty() {
                continue;
            }
            events.push(Event {
                at: window.start,
                until: window.end,
                kind: EventKind::Open,
                station: None,
                satellite,
            });
            events.push(Event {
                at: window.end,
                until: 0,
                kind: EventKind::Close,
                station: None,
                satellite,
            });
        }
    }
    events
}
