pub mod greedy;
pub mod improve;
pub mod matching;
pub mod types;
pub mod upper_bound;

pub use greedy::Replay;
pub use types::{Constellation, SatelliteType, SolverParams, TransmissionResult};
