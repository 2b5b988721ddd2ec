use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Motion, scoring and termination constants for a single agent.
///
/// Times are measured in simulation ticks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KinematicParams {
    /// Upper speed bound (world units per tick).
    pub max_speed: f32,
    /// Speed gained per ACCELERATE action.
    pub acceleration: f32,
    /// Speed lost per DECELERATE action.
    pub deceleration: f32,
    /// Heading change per turning tick, in degrees.
    pub turn_rate: f32,
    /// Heading change per turning tick below `low_speed_threshold`.
    pub low_speed_turn_rate: f32,
    /// Speed below which steering authority is reduced.
    pub low_speed_threshold: f32,
    /// Score gained per tick for each unit of speed.
    pub reward_factor: f32,
    /// Score bonus for reaching the next checkpoint gate.
    pub checkpoint_bonus: f32,
    /// Maximum distance from a gate segment that counts as crossing it.
    ///
    /// Must exceed `max_speed / 2`, otherwise a single tick can step over
    /// the band around the target gate.
    pub checkpoint_tolerance: f32,
    /// Hard lifetime cap.
    pub max_lifetime: u32,
    /// Consecutive stationary ticks before the agent is retired.
    pub idle_timeout: u32,
    /// Length of the early window in which progress must be made.
    pub stall_window: u32,
    /// Gates that must be passed before `stall_window` elapses.
    pub stall_min_checkpoints: u32,
    /// Footprint length along the heading.
    pub footprint_length: f32,
    /// Footprint width across the heading.
    pub footprint_width: f32,
}

impl Default for KinematicParams {
    fn default() -> Self {
        Self {
            max_speed: 5.0,
            acceleration: 0.1,
            deceleration: 0.2,
            turn_rate: 4.0,
            low_speed_turn_rate: 1.0,
            low_speed_threshold: 0.3,
            reward_factor: 100.0,
            checkpoint_bonus: 500.0,
            checkpoint_tolerance: 3.0,
            max_lifetime: 3600,
            idle_timeout: 120,
            stall_window: 900,
            stall_min_checkpoints: 2,
            footprint_length: 20.0,
            footprint_width: 10.0,
        }
    }
}

/// Ray-casting configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SensorParams {
    /// Maximum sight range `R` in raster steps.
    pub max_range: u32,
    /// Angle between the centre ray and each side ray, in degrees.
    pub side_angle: f32,
    /// Maximum number of cached poses.
    pub cache_capacity: usize,
}

impl Default for SensorParams {
    fn default() -> Self {
        Self {
            max_range: 1000,
            side_angle: 45.0,
            cache_capacity: 1_000_000,
        }
    }
}

/// Shape of every brain in the population.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrainParams {
    /// Number of hidden layers.
    pub hidden_layers: usize,
    /// Nodes per hidden layer.
    pub hidden_nodes: usize,
}

impl Default for BrainParams {
    fn default() -> Self {
        Self {
            hidden_layers: 3,
            hidden_nodes: 6,
        }
    }
}

/// One step of the adaptive selection pressure table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PressureStage {
    /// Stage applies once the stagnation counter reaches this value.
    pub min_stagnation: u32,
    /// Per-element mutation probability.
    pub mutation_rate: f32,
    /// Fraction of the ranked generation eligible as parents.
    pub elite_fraction: f32,
}

/// Genetic algorithm configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvolutionParams {
    /// Pressure stages ordered by `min_stagnation`.
    pub stages: Vec<PressureStage>,
}

impl Default for EvolutionParams {
    fn default() -> Self {
        Self {
            stages: vec![
                PressureStage {
                    min_stagnation: 0,
                    mutation_rate: 0.01,
                    elite_fraction: 0.1,
                },
                PressureStage {
                    min_stagnation: 6,
                    mutation_rate: 0.1,
                    elite_fraction: 0.25,
                },
                PressureStage {
                    min_stagnation: 11,
                    mutation_rate: 0.5,
                    elite_fraction: 0.5,
                },
            ],
        }
    }
}

impl EvolutionParams {
    /// Returns the stage active for the given stagnation count.
    ///
    /// Falls back to the first stage when none has been reached yet.
    pub fn stage_for(&self, stagnation: u32) -> PressureStage {
        self.stages
            .iter()
            .rev()
            .find(|stage| stagnation >= stage.min_stagnation)
            .or_else(|| self.stages.first())
            .copied()
            .unwrap_or(PressureStage {
                min_stagnation: 0,
                mutation_rate: 0.0,
                elite_fraction: 1.0,
            })
    }
}

/// Simulation parameters that control a training run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Params {
    /// Number of genomes per generation (elite slot included).
    pub population_size: usize,
    /// Worker threads for tick evaluation; `None` uses available parallelism.
    pub workers: Option<usize>,
    /// Agent kinematics and termination policy.
    pub kinematics: KinematicParams,
    /// Sensor engine configuration.
    pub sensor: SensorParams,
    /// Brain architecture.
    pub brain: BrainParams,
    /// Adaptive genetic operator configuration.
    pub evolution: EvolutionParams,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            population_size: 50,
            workers: None,
            kinematics: KinematicParams::default(),
            sensor: SensorParams::default(),
            brain: BrainParams::default(),
            evolution: EvolutionParams::default(),
        }
    }
}

impl Params {
    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<()> {
        let k = &self.kinematics;
        if self.population_size < 2 {
            return Err(Error::InvalidConfig(format!(
                "population_size must be at least 2, got {}",
                self.population_size
            )));
        }
        if self.workers == Some(0) {
            return Err(Error::InvalidConfig("workers must be non-zero".into()));
        }
        if k.max_speed <= 0.0 || k.acceleration <= 0.0 || k.deceleration <= 0.0 {
            return Err(Error::InvalidConfig(
                "max_speed, acceleration and deceleration must be positive".into(),
            ));
        }
        if k.max_speed >= 2.0 * k.checkpoint_tolerance {
            return Err(Error::InvalidConfig(format!(
                "checkpoint_tolerance {} is too small for max_speed {}, gates could be skipped",
                k.checkpoint_tolerance, k.max_speed
            )));
        }
        if k.footprint_length <= 0.0 || k.footprint_width <= 0.0 {
            return Err(Error::InvalidConfig("footprint must have a positive size".into()));
        }
        if k.max_lifetime == 0 {
            return Err(Error::InvalidConfig("max_lifetime must be non-zero".into()));
        }
        if self.sensor.max_range == 0 {
            return Err(Error::InvalidConfig("sensor max_range must be non-zero".into()));
        }
        if self.sensor.cache_capacity == 0 {
            return Err(Error::InvalidConfig("sensor cache_capacity must be non-zero".into()));
        }
        if self.brain.hidden_layers > 0 && self.brain.hidden_nodes == 0 {
            return Err(Error::InvalidConfig(
                "hidden_nodes must be non-zero when hidden layers are present".into(),
            ));
        }
        if self.evolution.stages.is_empty() {
            return Err(Error::InvalidConfig("at least one pressure stage is required".into()));
        }
        for stage in &self.evolution.stages {
            if !(0.0..=1.0).contains(&stage.mutation_rate) {
                return Err(Error::InvalidConfig(format!(
                    "mutation_rate {} must be between 0.0 and 1.0",
                    stage.mutation_rate
                )));
            }
            if !(stage.elite_fraction > 0.0 && stage.elite_fraction <= 1.0) {
                return Err(Error::InvalidConfig(format!(
                    "elite_fraction {} must be in (0.0, 1.0]",
                    stage.elite_fraction
                )));
            }
        }
        Ok(())
    }

    /// Number of worker threads to use for tick evaluation.
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1)
        })
    }

    /// Saves the parameters to a JSON file.
    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Loads and validates parameters from a JSON file.
    pub fn load_from_file(path: &str) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let params: Self = serde_json::from_str(&json)?;
        params.validate()?;
        Ok(params)
    }
}
