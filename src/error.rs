use thiserror::Error;

use crate::config::SimulationParameters;
use crate::domain::grid2d::GridDimensions2D;
use crate::simulation::ControllerState;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("Invalid grid size: {0}")]
    InvalidGridSize(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed configuration document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Missing configuration entry: inputs.{0}")]
    MissingField(&'static str),

    #[error("Invalid value for inputs.{field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },
}

/// A configuration failure together with the parameters assembled from
/// the entries read before it occurred.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct PartialConfig {
    #[source]
    pub error: ConfigError,
    pub fallback: SimulationParameters,
}

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize run summary: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("Invalid grid dimensions: {0}")]
    InvalidGrid(#[from] GridError),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Lattice is {found:?} but the engine was built for {expected:?}")]
    LatticeMismatch {
        expected: GridDimensions2D,
        found: GridDimensions2D,
    },

    #[error("Cannot run a simulation in state {0:?}")]
    InvalidState(ControllerState),

    #[error("Could not start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),
}
