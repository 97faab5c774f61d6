use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::solver::SolverParams;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub satellites: Vec<SatelliteTypeConfig>,
    /// Directory with imaging visibility files for the target region.
    pub satellite_path: PathBuf,
    /// Directory with station-to-satellite visibility files.
    pub facility_path: PathBuf,
    /// Directory the schedule reports are written to.
    pub schedule_path: PathBuf,
    #[serde(default)]
    pub solver: SolverParams,
}

/// One configured satellite type; satellites are assigned a type by full
/// match of their name against `name_regex`.
#[derive(Debug, Clone, Deserialize)]
pub struct SatelliteTypeConfig {
    pub name: String,
    pub name_regex: String,
    /// Bytes per second produced while imaging.
    pub filling_speed: i64,
    /// Bytes per second sent while downlinking.
    pub freeing_speed: i64,
    /// On-board storage in bytes.
    pub space: i64,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"{
        "satellites": [
            {
                "name": "KinoSat",
                "name_regex": "KinoSat_[0-9]+",
                "filling_speed": 4194304,
                "freeing_speed": 1048576,
                "space": 8589934592
            }
        ],
        "satellite_path": "data/russia",
        "facility_path": "data/facilities",
        "schedule_path": "schedule"
    }"#;

    #[test]
    fn parses_minimal_config_with_default_solver_params() {
        let config: Config = serde_json::from_str(MINIMAL).unwrap();
        assert_eq!(config.satellites.len(), 1);
        assert_eq!(config.satellites[0].filling_speed, 4_194_304);
        assert_eq!(config.solver.full_ratio, 0.93);
        assert_eq!(config.solver.min_downlink_ms, 5_000);
        assert_eq!(config.solver.min_slice_ms, 1_000);
    }

    #[test]
    fn solver_params_override_field_wise() {
        let text = MINIMAL.replace(
            "\"schedule_path\": \"schedule\"",
            "\"schedule_path\": \"schedule\", \"solver\": { \"full_ratio\": 0.997 }",
        );
        let config: Config = serde_json::from_str(&text).unwrap();
        assert_eq!(config.solver.full_ratio, 0.997);
        assert_eq!(config.solver.min_downlink_ms, 5_000);
    }

    #[test]
    fn reads_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{MINIMAL}").unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.satellite_path, PathBuf::from("data/russia"));
    }

    #[test]
    fn missing_field_is_a_parse_error() {
        let text = MINIMAL.replace("\"satellite_path\": \"data/russia\",", "");
        assert!(serde_json::from_str::<Config>(&text).is_err());
    }
}
