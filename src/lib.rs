//! # Evodrive - Evolving Track Drivers
//!
//! A generational genetic algorithm that evolves neural-network controllers
//! for agents driving around a fixed 2D track.
//!
//! ## Features
//!
//! - Tick-based agent kinematics with collision against a drivability raster
//! - Three-ray distance sensing with a bounded, compute-once cache
//! - Feed-forward ReLU brains deciding between nine discrete actions
//! - Single-point crossover, Gaussian mutation and elitism with
//!   stagnation-adaptive selection pressure
//! - Parallel tick evaluation and breeding on a fixed worker pool
//! - Save/load of brains and configuration as JSON
//!
//! ## Core Modules
//!
//! - [`simulation::track`] - Track raster and checkpoint gates
//! - [`simulation::sensor`] - Cached ray-cast sensing
//! - [`simulation::agent`] - Agent kinematics and scoring
//! - [`simulation::brain`] - Neural controller and genetic operators
//! - [`simulation::population`] - Generation lifecycle

/// Error type shared by all modules.
pub mod error;

/// Core simulation logic and data structures.
pub mod simulation {
    /// Agent kinematics, collision and checkpoint progress.
    pub mod agent;
    /// Neural controller and matrix-level genetic operators.
    pub mod brain;
    /// Agent and brain pairing with memoized fitness.
    pub mod genome;
    /// Geometric utility functions for headings and distances.
    pub mod geometric_utils;
    /// Hook for observing brain decisions.
    pub mod observer;
    /// Simulation parameters.
    pub mod params;
    /// Generation lifecycle with parallel evaluation and evolution.
    pub mod population;
    /// Ray-cast distance sensing with memoization.
    pub mod sensor;
    /// Drivability raster and checkpoint gates.
    pub mod track;
}
