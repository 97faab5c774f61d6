//! Schedule report writers.
//!
//! Three views of the same schedule under the output directory:
//! `Ground/` per-station transmission tables, `Drop/` per-satellite
//! downlink logs, `Camera/` per-satellite imaging logs. Byte columns are
//! `duration_ms * rate / 1000`; timestamps use the shared wire format.

use std::fs;
use std::path::Path;

use log::info;
use thiserror::Error;

use crate::interval::Interval;
use crate::solver::types::{Constellation, TransmissionResult};
use crate::time::format_timestamp;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub const GROUND_DIR: &str = "Ground";
pub const DROP_DIR: &str = "Drop";
pub const CAMERA_DIR: &str = "Camera";

const GROUND_HEADER: &str = "Access        Start Time (UTCG)           Stop Time (UTCG)        Duration (sec)    Satellite name    Data (Mbytes)";
const DROP_HEADER: &str = "Access        Start Time (UTCG)           Stop Time (UTCG)        Duration (sec)      Station name    Data (Mbytes)";
const CAMERA_HEADER: &str = "Access        Start Time (UTCG)           Stop Time (UTCG)        Duration (sec)    Data (Mbytes)";
const GROUND_RULE: &str = "------    ------------------------    ------------------------    --------------    --------------    -------------";
const CAMERA_RULE: &str = "------    ------------------------    ------------------------    --------------    -------------";

pub fn write_schedule(
    dir: &Path,
    constellation: &Constellation,
    result: &TransmissionResult,
) -> Result<(), ReportError> {
    fs::create_dir_all(dir.join(GROUND_DIR))?;
    fs::create_dir_all(dir.join(DROP_DIR))?;
    fs::create_dir_all(dir.join(CAMERA_DIR))?;
    write_ground(dir, constellation, result)?;
    write_drops(dir, constellation, result)?;
    write_cameras(dir, constellation, result)?;
    info!("schedule written to {}", dir.display());
    Ok(())
}

fn write_ground(
    dir: &Path,
    constellation: &Constellation,
    result: &TransmissionResult,
) -> Result<(), ReportError> {
    for (station, station_name) in constellation.station_names.iter().enumerate() {
        let mut out = String::new();
        for (sat, sat_name) in constellation.satellite_names.iter().enumerate() {
            out.push_str(&format!("{station_name}-To-{sat_name}\n"));
            out.push_str(&"-".repeat(station_name.len() + sat_name.len() + 4));
            out.push('\n');
            out.push_str(GROUND_HEADER);
            out.push('\n');
            out.push_str(GROUND_RULE);
            out.push('\n');
            let drain_rate = constellation.types[sat].drain_rate;
            for (index, window) in result.downlink[station][sat].iter().enumerate() {
                out.push_str(&transfer_row(index, window, sat_name, drain_rate));
            }
            out.push('\n');
        }
        fs::write(
            dir.join(GROUND_DIR).join(format!("Facility-{station_name}.txt")),
            out,
        )?;
    }
    Ok(())
}

fn write_drops(
    dir: &Path,
    constellation: &Constellation,
    result: &TransmissionResult,
) -> Result<(), ReportError> {
    for (sat, sat_name) in constellation.satellite_names.iter().enumerate() {
        // All downlinks of this satellite across stations, chronological.
        let mut rows: Vec<(Interval, usize)> = Vec::new();
        for station in 0..constellation.stations() {
            for window in &result.downlink[station][sat] {
                rows.push((*window, station));
            }
        }
        rows.sort_unstable();

        let mut out = String::new();
        out.push_str(sat_name);
        out.push('\n');
        out.push_str(&"-".repeat(sat_name.len()));
        out.push('\n');
        out.push_str(DROP_HEADER);
        out.push('\n');
        out.push_str(GROUND_RULE);
        out.push('\n');
        let drain_rate = constellation.types[sat].drain_rate;
        for (index, (window, station)) in rows.iter().enumerate() {
            out.push_str(&transfer_row(
                index,
                window,
                &constellation.station_names[*station],
                drain_rate,
            ));
        }
        fs::write(dir.join(DROP_DIR).join(format!("Drop_{sat_name}.txt")), out)?;
    }
    Ok(())
}

fn write_cameras(
    dir: &Path,
    constellation: &Constellation,
    result: &TransmissionResult,
) -> Result<(), ReportError> {
    for (sat, sat_name) in constellation.satellite_names.iter().enumerate() {
        let mut out = String::new();
        out.push_str(sat_name);
        out.push('\n');
        out.push_str(&"-".repeat(sat_name.len()));
        out.push('\n');
        out.push_str(CAMERA_HEADER);
        out.push('\n');
        out.push_str(CAMERA_RULE);
        out.push('\n');
        let fill_rate = constellation.types[sat].fill_rate;
        for (index, window) in result.imaging[sat].iter().enumerate() {
            let duration = window.duration_ms();
            out.push_str(&format!(
                "{:>6}    {:>24}    {:>24}    {:>14}    {:>13}\n",
                index + 1,
                format_timestamp(window.start),
                format_timestamp(window.end),
                fmt_duration(duration),
                duration * fill_rate / 1000,
            ));
        }
        fs::write(
            dir.join(CAMERA_DIR).join(format!("Camera_{sat_name}.txt")),
            out,
        )?;
    }
    Ok(())
}

fn transfer_row(index: usize, window: &Interval, partner: &str, drain_rate: i64) -> String {
    let duration = window.duration_ms();
    format!(
        "{:>6}    {:>24}    {:>24}    {:>14}    {:>14}    {:>13}\n",
        index + 1,
        format_timestamp(window.start),
        format_timestamp(window.end),
        fmt_duration(duration),
        partner,
        duration * drain_rate / 1000,
    )
}

/// Milliseconds as `S.mmm`.
fn fmt_duration(ms: i64) -> String {
    format!("{}.{:03}", ms / 1000, ms % 1000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::types::SatelliteType;

    fn sample() -> (Constellation, TransmissionResult) {
        let constellation = Constellation {
            satellite_names: vec!["KinoSat_110101".into()],
            station_names: vec!["Anadyr1".into()],
            types: vec![SatelliteType {
                fill_rate: 200,
                drain_rate: 100,
                capacity: 10_000,
            }],
            imaging_windows: vec![vec![Interval::new(0, 10_000)]],
            downlink_windows: vec![vec![vec![Interval::new(10_000, 30_000)]]],
        };
        let mut result = TransmissionResult::new(1, 1);
        result.imaging[0].push(Interval::new(0, 10_000));
        result.downlink[0][0].push(Interval::new(10_000, 21_000));
        result.total_data_milli = 11_000 * 100;
        (constellation, result)
    }

    #[test]
    fn writes_all_three_report_families() {
        let (constellation, result) = sample();
        let dir = tempfile::tempdir().unwrap();
        write_schedule(dir.path(), &constellation, &result).unwrap();

        assert!(dir.path().join("Ground/Facility-Anadyr1.txt").exists());
        assert!(dir.path().join("Drop/Drop_KinoSat_110101.txt").exists());
        assert!(dir.path().join("Camera/Camera_KinoSat_110101.txt").exists());
    }

    #[test]
    fn drop_rows_carry_station_and_bytes() {
        let (constellation, result) = sample();
        let dir = tempfile::tempdir().unwrap();
        write_schedule(dir.path(), &constellation, &result).unwrap();

        let text = fs::read_to_string(dir.path().join("Drop/Drop_KinoSat_110101.txt")).unwrap();
        assert!(text.starts_with("KinoSat_110101\n--------------\n"));
        let row = text.lines().last().unwrap();
        assert!(row.contains("1 Jan 1970 00:00:10.000"));
        assert!(row.contains("1 Jan 1970 00:00:21.000"));
        assert!(row.contains("11.000"));
        assert!(row.contains("Anadyr1"));
        // 11 s at 100 B/s.
        assert!(row.trim_end().ends_with("1100"));
    }

    #[test]
    fn camera_rows_use_the_fill_rate() {
        let (constellation, result) = sample();
        let dir = tempfile::tempdir().unwrap();
        write_schedule(dir.path(), &constellation, &result).unwrap();

        let text = fs::read_to_string(dir.path().join("Camera/Camera_KinoSat_110101.txt")).unwrap();
        let row = text.lines().last().unwrap();
        assert!(row.contains("10.000"));
        // 10 s at 200 B/s.
        assert!(row.trim_end().ends_with("2000"));
    }

    #[test]
    fn duration_formatting_pads_millis() {
        assert_eq!(fmt_duration(260_296), "260.296");
        assert_eq!(fmt_duration(11_005), "11.005");
        assert_eq!(fmt_duration(999), "0.999");
        assert_eq!(fmt_duration(1_000), "1.000");
    }
}
