//! Schedule replay checker.
//!
//! Re-reads the emitted `Drop/` and `Camera/` logs together with the
//! original visibility inputs and re-establishes every schedule invariant:
//! containment in visibility windows, pairwise-disjoint actions per
//! satellite and per station, and storage staying within bounds under
//! chronological replay. Returns the recomputed downlink total.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;

use crate::interval::Interval;
use crate::report::{CAMERA_DIR, DROP_DIR};
use crate::solver::types::Constellation;
use crate::time::format_timestamp;
use crate::visibility::parse_access_row;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{}:{line}: {message}", .file.display())]
    Row {
        file: PathBuf,
        line: usize,
        message: String,
    },
    #[error("{}: missing entity name header", .file.display())]
    MissingName { file: PathBuf },
    #[error(
        "{}:{line}: printed duration {printed:?} does not match the interval length {actual} ms",
        .file.display()
    )]
    DurationMismatch {
        file: PathBuf,
        line: usize,
        printed: String,
        actual: i64,
    },
    #[error("unknown satellite {0:?} in schedule output")]
    UnknownSatellite(String),
    #[error("unknown station {0:?} in schedule output")]
    UnknownStation(String),
    #[error("{entity}: interval [{start}, {stop}) lies outside every visibility window")]
    OutsideWindow {
        entity: String,
        start: String,
        stop: String,
    },
    #[error("{entity}: intervals [{first_start}, {first_stop}) and [{second_start}, {second_stop}) overlap")]
    Overlap {
        entity: String,
        first_start: String,
        first_stop: String,
        second_start: String,
        second_stop: String,
    },
    #[error("satellite {name}: storage below zero at {at}")]
    NegativeStorage { name: String, at: String },
    #[error("satellite {name}: storage above capacity at {at}")]
    OverCapacity { name: String, at: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Action {
    Imaging,
    Downlink,
}

/// Checks the schedule under `schedule_dir` against the inputs and
/// returns the total downlinked volume in milli-bytes.
pub fn verify_schedule(schedule_dir: &Path, constellation: &Constellation) -> Result<i64, VerifyError> {
    let sat_index: HashMap<&str, usize> = constellation
        .satellite_names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i))
        .collect();
    let station_index: HashMap<&str, usize> = constellation
        .station_names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i))
        .collect();

    let mut sat_actions: Vec<Vec<(Interval, Action)>> = vec![Vec::new(); constellation.satellites()];
    let mut station_actions: Vec<Vec<Interval>> = vec![Vec::new(); constellation.stations()];

    for (name, rows) in read_logs(&schedule_dir.join(DROP_DIR), "Drop", true)? {
        let &sat = sat_index
            .get(name.as_str())
            .ok_or_else(|| VerifyError::UnknownSatellite(name.clone()))?;
        for (window, partner) in rows {
            let partner = partner.unwrap_or_default();
            let &station = station_index
                .get(partner.as_str())
                .ok_or_else(|| VerifyError::UnknownStation(partner.clone()))?;
            check_containment(&name, &window, &constellation.downlink_windows[station][sat])?;
            sat_actions[sat].push((window, Action::Downlink));
            station_actions[station].push(window);
        }
    }

    for (name, rows) in read_logs(&schedule_dir.join(CAMERA_DIR), "Camera", false)? {
        let &sat = sat_index
            .get(name.as_str())
            .ok_or_else(|| VerifyError::UnknownSatellite(name.clone()))?;
        for (window, _) in rows {
            check_containment(&name, &window, &constellation.imaging_windows[sat])?;
            sat_actions[sat].push((window, Action::Imaging));
        }
    }

    // No two actions of one satellite, and no two downlinks into one
    // station, may overlap.
    for (sat, actions) in sat_actions.iter_mut().enumerate() {
        actions.sort_unstable();
        check_disjoint(
            &constellation.satellite_names[sat],
            actions.iter().map(|(window, _)| *window),
        )?;
    }
    for (station, windows) in station_actions.iter_mut().enumerate() {
        windows.sort_unstable();
        check_disjoint(
            &constellation.station_names[station],
            windows.iter().copied(),
        )?;
    }

    // Chronological replay of fills and drains against capacity.
    let mut total = 0i64;
    for (sat, actions) in sat_actions.iter().enumerate() {
        let ty = constellation.types[sat];
        let name = &constellation.satellite_names[sat];
        let mut stored = 0i64;
        for (window, action) in actions {
            match action {
                Action::Imaging => {
                    stored += window.duration_ms() * ty.fill_rate;
                    if stored > ty.capacity_milli() {
                        return Err(VerifyError::OverCapacity {
                            name: name.clone(),
                            at: format_timestamp(window.end),
                        });
                    }
                }
                Action::Downlink => {
                    let moved = window.duration_ms() * ty.drain_rate;
                    stored -= moved;
                    total += moved;
                    if stored < 0 {
                        return Err(VerifyError::NegativeStorage {
                            name: name.clone(),
                            at: format_timestamp(window.end),
                        });
                    }
                }
            }
        }
    }
    Ok(total)
}

type LogRows = Vec<(Interval, Option<String>)>;

/// Reads every `<prefix>*` log in `dir`. Each file names its satellite on
/// the first line; rows follow the shared access-table grammar with the
/// partner column present only in downlink logs.
fn read_logs(
    dir: &Path,
    prefix: &str,
    with_station: bool,
) -> Result<Vec<(String, LogRows)>, VerifyError> {
    let mut result = Vec::new();
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_stem()
                .and_then(|stem| stem.to_str())
                .map_or(false, |stem| stem.starts_with(prefix))
        })
        .collect();
    paths.sort();

    for path in paths {
        debug!("verifying {}", path.display());
        let content = fs::read_to_string(&path)?;
        let mut lines = content.lines();
        let name = lines
            .next()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| VerifyError::MissingName { file: path.clone() })?
            .to_string();

        let mut rows = Vec::new();
        let mut in_table = false;
        for (index, line) in content.lines().enumerate().skip(1) {
            if line.contains("Start Time (UTCG)") {
                in_table = true;
                continue;
            }
            if !in_table {
                continue;
            }
            let row = parse_access_row(line).map_err(|message| VerifyError::Row {
                file: path.clone(),
                line: index + 1,
                message,
            })?;
            let Some(row) = row else { continue };
            let printed = row.trailing.first().cloned().unwrap_or_default();
            if parse_printed_duration(&printed) != Some(row.window.duration_ms()) {
                return Err(VerifyError::DurationMismatch {
                    file: path.clone(),
                    line: index + 1,
                    printed,
                    actual: row.window.duration_ms(),
                });
            }
            let station = if with_station {
                row.trailing.get(1).cloned()
            } else {
                None
            };
            rows.push((row.window, station));
        }
        result.push((name, rows));
    }
    Ok(result)
}

/// `S.mmm` to milliseconds.
fn parse_printed_duration(text: &str) -> Option<i64> {
    let (secs, millis) = text.split_once('.')?;
    if millis.len() != 3 {
        return None;
    }
    Some(secs.parse::<i64>().ok()? * 1000 + millis.parse::<i64>().ok()?)
}

fn check_containment(
    entity: &str,
    window: &Interval,
    visibility: &[Interval],
) -> Result<(), VerifyError> {
    // Windows are ordered; the only candidate is the last one starting at
    // or before the interval.
    let idx = visibility.partition_point(|w| w.start <= window.start);
    let contained = idx > 0 && visibility[idx - 1].contains(window);
    if contained {
        Ok(())
    } else {
        Err(VerifyError::OutsideWindow {
            entity: entity.to_string(),
            start: format_timestamp(window.start),
            stop: format_timestamp(window.end),
        })
    }
}

fn check_disjoint(
    entity: &str,
    windows: impl Iterator<Item = Interval>,
) -> Result<(), VerifyError> {
    let mut previous: Option<Interval> = None;
    for window in windows {
        if let Some(prev) = previous {
            if prev.overlaps(&window) {
                return Err(VerifyError::Overlap {
                    entity: entity.to_string(),
                    first_start: format_timestamp(prev.start),
                    first_stop: format_timestamp(prev.end),
                    second_start: format_timestamp(window.start),
                    second_stop: format_timestamp(window.end),
                });
            }
        }
        previous = Some(window);
    }
    Ok(())
}
