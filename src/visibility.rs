//! Visibility-file parsing and input table assembly.
//!
//! Both input families share one grammar: `-To-` section headers, a column
//! banner containing `Start Time (UTCG)`, then one access row per window.
//! A section ends at a `Min Duration` footer or at the next header. The
//! row parser is shared with the schedule verifier, which reads the same
//! rows with different trailing columns.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use regex::Regex;
use thiserror::Error;

use crate::config::{Config, SatelliteTypeConfig};
use crate::interval::Interval;
use crate::solver::types::{Constellation, SatelliteType};
use crate::time;

/// Station visibility files are named `Facility<station>.txt`.
pub const STATION_FILE_PREFIX: &str = "Facility";
/// Imaging visibility files are named after the target region, which is
/// also the section source they must carry.
pub const TARGET_REGION: &str = "Russia";

#[derive(Debug, Error)]
pub enum InputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{}:{line}: {message}", .file.display())]
    Row {
        file: PathBuf,
        line: usize,
        message: String,
    },
    #[error("{}: section source {found:?}, expected {TARGET_REGION:?}", .file.display())]
    Region { file: PathBuf, found: String },
    #[error("invalid name pattern {pattern:?} for type {name:?}: {source}")]
    Pattern {
        name: String,
        pattern: String,
        source: regex::Error,
    },
    #[error("satellite {0:?} matches no configured satellite type")]
    UnknownSatellite(String),
    #[error("satellite type {0:?} must have positive rates and capacity")]
    InvalidType(String),
}

/// One data row of an access table: index, start, stop, then
/// format-specific trailing columns.
#[derive(Debug, Clone)]
pub struct AccessRow {
    pub window: Interval,
    pub trailing: Vec<String>,
}

/// Parses one access row. Returns `Ok(None)` for lines without any digit
/// (banners, separators, blanks), which the grammar skips.
pub fn parse_access_row(line: &str) -> Result<Option<AccessRow>, String> {
    if !line.chars().any(|c| c.is_ascii_digit()) {
        return Ok(None);
    }
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 10 {
        return Err(format!("expected at least 10 columns, found {}", tokens.len()));
    }
    tokens[0]
        .parse::<usize>()
        .map_err(|_| format!("invalid access index {:?}", tokens[0]))?;
    let start = time::parse_timestamp(&tokens[1..5].join(" ")).map_err(|e| e.to_string())?;
    let stop = time::parse_timestamp(&tokens[5..9].join(" ")).map_err(|e| e.to_string())?;
    if stop < start {
        return Err(format!("window stops before it starts ({stop} < {start})"));
    }
    Ok(Some(AccessRow {
        window: Interval::new(start, stop),
        trailing: tokens[9..].iter().map(|t| t.to_string()).collect(),
    }))
}

/// Parses a visibility file into its section source (the part before
/// `-To-`) and per-partner window lists.
fn parse_windows_file(path: &Path) -> Result<(String, BTreeMap<String, Vec<Interval>>), InputError> {
    let content = fs::read_to_string(path)?;
    let mut source = String::new();
    let mut partner = String::new();
    let mut in_table = false;
    let mut windows: BTreeMap<String, Vec<Interval>> = BTreeMap::new();

    for (index, line) in content.lines().enumerate() {
        if let Some(pos) = line.find("-To-") {
            source = line[..pos].trim().to_string();
            partner = line[pos + 4..].trim().to_string();
            in_table = false;
            continue;
        }
        if line.contains("Start Time (UTCG)") {
            in_table = true;
            continue;
        }
        if line.starts_with("Min Duration") {
            in_table = false;
        }
        if !in_table {
            continue;
        }
        match parse_access_row(line) {
            Ok(Some(row)) => windows.entry(partner.clone()).or_default().push(row.window),
            Ok(None) => {}
            Err(message) => {
                return Err(InputError::Row {
                    file: path.to_path_buf(),
                    line: index + 1,
                    message,
                })
            }
        }
    }
    Ok((source, windows))
}

/// Reads every `Facility*` file in `dir`; station name -> satellite name
/// -> downlink windows.
pub fn load_station_windows(
    dir: &Path,
) -> Result<BTreeMap<String, BTreeMap<String, Vec<Interval>>>, InputError> {
    let mut result = BTreeMap::new();
    for path in list_files(dir, STATION_FILE_PREFIX)? {
        debug!("reading station visibility from {}", path.display());
        let (station, windows) = parse_windows_file(&path)?;
        result.insert(station, windows);
    }
    Ok(result)
}

/// Reads every imaging visibility file in `dir`; satellite name ->
/// imaging windows over the target region. When several files carry a
/// section for the same satellite, the first file (lexicographic order)
/// wins and the later sections are dropped.
pub fn load_imaging_windows(dir: &Path) -> Result<BTreeMap<String, Vec<Interval>>, InputError> {
    let mut result: BTreeMap<String, Vec<Interval>> = BTreeMap::new();
    for path in list_files(dir, TARGET_REGION)? {
        debug!("reading imaging visibility from {}", path.display());
        let (region, windows) = parse_windows_file(&path)?;
        if region != TARGET_REGION {
            return Err(InputError::Region { file: path, found: region });
        }
        for (satellite, list) in windows {
            result.entry(satellite).or_insert(list);
        }
    }
    Ok(result)
}

/// Paths of the `prefix`-named files in `dir`, sorted so that runs are
/// reproducible regardless of directory iteration order.
fn list_files(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>, InputError> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if stem_starts_with(&path, prefix) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Assembles the index-addressed scheduler input. Satellites are indexed
/// from the sorted key set of the imaging table; station sections naming
/// satellites outside that set can never hold data and are skipped.
pub fn build_constellation(
    types_config: &[SatelliteTypeConfig],
    imaging: BTreeMap<String, Vec<Interval>>,
    stations: BTreeMap<String, BTreeMap<String, Vec<Interval>>>,
) -> Result<Constellation, InputError> {
    let mut matchers = Vec::with_capacity(types_config.len());
    for cfg in types_config {
        if cfg.filling_speed <= 0 || cfg.freeing_speed <= 0 || cfg.space <= 0 {
            return Err(InputError::InvalidType(cfg.name.clone()));
        }
        let pattern = Regex::new(&format!("^(?:{})$", cfg.name_regex)).map_err(|source| {
            InputError::Pattern {
                name: cfg.name.clone(),
                pattern: cfg.name_regex.clone(),
                source,
            }
        })?;
        let ty = SatelliteType {
            fill_rate: cfg.filling_speed,
            drain_rate: cfg.freeing_speed,
            capacity: cfg.space,
        };
        matchers.push((pattern, ty));
    }

    let mut satellite_names = Vec::new();
    let mut types = Vec::new();
    let mut imaging_windows = Vec::new();
    let mut index_of: HashMap<String, usize> = HashMap::new();
    for (name, mut windows) in imaging {
        let ty = matchers
            .iter()
            .find(|(pattern, _)| pattern.is_match(&name))
            .map(|(_, ty)| *ty)
            .ok_or_else(|| InputError::UnknownSatellite(name.clone()))?;
        windows.sort_unstable();
        index_of.insert(name.clone(), satellite_names.len());
        satellite_names.push(name);
        types.push(ty);
        imaging_windows.push(windows);
    }

    let mut station_names = Vec::new();
    let mut downlink_windows = Vec::new();
    for (station, per_satellite) in stations {
        let mut rows = vec![Vec::new(); satellite_names.len()];
        for (satellite, mut windows) in per_satellite {
            match index_of.get(&satellite) {
                Some(&sat) => {
                    windows.sort_unstable();
                    rows[sat] = windows;
                }
                None => {
                    warn!("station {station} lists unknown satellite {satellite}; section skipped")
                }
            }
        }
        station_names.push(station);
        downlink_windows.push(rows);
    }

    Ok(Constellation {
        satellite_names,
        station_names,
        types,
        imaging_windows,
        downlink_windows,
    })
}

/// Reads both visibility directories from the configuration and builds
/// the scheduler input.
pub fn load_constellation(config: &Config) -> Result<Constellation, InputError> {
    let imaging = load_imaging_windows(&config.satellite_path)?;
    let stations = load_station_windows(&config.facility_path)?;
    build_constellation(&config.satellites, imaging, stations)
}

fn stem_starts_with(path: &Path, prefix: &str) -> bool {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map_or(false, |stem| stem.starts_with(prefix))
}
