//! Error type shared by the simulation modules.

use thiserror::Error;

use crate::simulation::brain::Architecture;

/// Errors raised while building, evolving or persisting a simulation.
#[derive(Debug, Error)]
pub enum Error {
    /// Genetic operators were asked to combine brains of different shapes.
    #[error("cannot cross over brains with different architectures: {left} vs {right}")]
    ArchitectureMismatch {
        /// Architecture of the first parent.
        left: Architecture,
        /// Architecture of the second parent.
        right: Architecture,
    },
    /// A brain's weight matrices do not agree with its declared architecture.
    #[error("invalid brain architecture: {0}")]
    InvalidArchitecture(String),
    /// The track raster, checkpoints or start pose are unusable.
    #[error("invalid track: {0}")]
    InvalidTrack(String),
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The tick worker pool could not be started.
    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
    /// Reading or writing a file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// A JSON document could not be encoded or decoded.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
