//! Generational population of genomes with parallel evaluation and evolution.
//!
//! Each tick the live genomes are split into contiguous batches, one per
//! worker, and evaluated on a dedicated rayon pool. `install` returns only
//! after every batch finished, which is the tick barrier. When every genome
//! but the elite slot has crashed, [`Population::evolve`] ranks the
//! generation, carries the best-ever brain into slot 0 and breeds the rest.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use rand::Rng;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::agent::{Agent, CrashCause};
use super::brain::{Architecture, Brain};
use super::genome::Genome;
use super::observer::DecisionObserver;
use super::params::{KinematicParams, Params, PressureStage};
use super::sensor::SensorEngine;
use super::track::Track;
use crate::error::{Error, Result};

/// Statistics for one finished generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationSummary {
    /// Index of the generation that was evaluated.
    pub generation: u32,
    /// Ticks it took until the generation was done.
    pub ticks: u32,
    /// Highest fitness within the generation.
    pub max_fitness: f32,
    /// Mean fitness within the generation.
    pub mean_fitness: f32,
    /// Best fitness ever seen, after this generation.
    pub best_fitness: f32,
    /// Generations without improvement, after this generation.
    pub stagnation: u32,
    /// Genomes that completed at least one lap.
    pub laps_completed: usize,
    /// Pressure stage used to breed the next generation.
    pub stage: PressureStage,
}

/// All genomes of the current generation plus the evolutionary record.
pub struct Population {
    params: Params,
    sensors: SensorEngine,
    pool: ThreadPool,
    workers: usize,
    /// Slot 0 holds the elite carried over from the previous generation.
    genomes: Vec<Genome>,
    generation: u32,
    ticks: u32,
    best_fitness: f32,
    best: Option<Genome>,
    stagnation: u32,
    observer: Option<Arc<dyn DecisionObserver>>,
}

impl Population {
    /// Creates generation 0 with random brains.
    pub fn new(track: Arc<Track>, params: Params) -> Result<Self> {
        let architecture = architecture_of(&params);
        let brains = (0..params.population_size)
            .map(|_| Brain::new_random(architecture))
            .collect();
        Self::from_brains(track, params, brains)
    }

    /// Creates generation 0 from the given brains.
    ///
    /// Every brain must match the architecture configured in `params`.
    pub fn from_brains(track: Arc<Track>, params: Params, brains: Vec<Brain>) -> Result<Self> {
        params.validate()?;
        let architecture = architecture_of(&params);
        if let Some(brain) = brains.iter().find(|b| b.architecture() != architecture) {
            return Err(Error::ArchitectureMismatch {
                left: architecture,
                right: brain.architecture(),
            });
        }

        let workers = params.worker_count();
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("tick-worker-{i}"))
            .build()?;
        let sensors = SensorEngine::new(Arc::clone(&track), params.sensor.clone());
        let start = track.start();

        let genomes = brains
            .into_iter()
            .map(|brain| Genome::new(Agent::new(start), brain))
            .collect();

        let mut population = Self {
            params,
            sensors,
            pool,
            workers,
            genomes,
            generation: 0,
            ticks: 0,
            best_fitness: 0.0,
            best: None,
            stagnation: 0,
            observer: None,
        };
        population.sense_all();

        info!(
            genomes = population.genomes.len(),
            workers, "created generation 0"
        );
        Ok(population)
    }

    /// Installs or removes the decision observer.
    pub fn set_observer(&mut self, observer: Option<Arc<dyn DecisionObserver>>) {
        self.observer = observer;
    }

    fn sense_all(&mut self) {
        let sensors = &self.sensors;
        let kinematics = &self.params.kinematics;
        let genomes = &mut self.genomes;
        self.pool.install(|| {
            genomes
                .par_iter_mut()
                .for_each(|genome| genome.sense(sensors, kinematics));
        });
    }

    /// Advances every live genome by one tick.
    ///
    /// A panic while evaluating a genome is logged and crashes only that
    /// genome. Does nothing when no genome is alive.
    pub fn tick(&mut self) {
        let mut live: Vec<(usize, &mut Genome)> = self
            .genomes
            .iter_mut()
            .enumerate()
            .filter(|(_, genome)| !genome.is_crashed())
            .collect();
        if live.is_empty() {
            return;
        }

        let batch_size = live.len().div_ceil(self.workers).max(1);
        let sensors = &self.sensors;
        let kinematics = &self.params.kinematics;
        let observer = self.observer.as_deref();

        self.pool.install(|| {
            live.par_chunks_mut(batch_size).for_each(|batch| {
                for (index, genome) in batch.iter_mut() {
                    let index = *index;
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                        genome.step(index, sensors, kinematics, observer);
                    }));
                    if outcome.is_err() {
                        error!(genome = index, "genome evaluation failed, marking it crashed");
                        genome.agent_mut().crash(CrashCause::Fault);
                    }
                }
            });
        });

        self.ticks += 1;
    }

    /// True once every genome except the elite slot has crashed.
    pub fn is_generation_done(&self) -> bool {
        self.genomes.iter().skip(1).all(Genome::is_crashed)
    }

    /// Memoizes every genome's fitness from its agent's score.
    pub fn evaluate_fitness(&mut self) {
        for genome in &mut self.genomes {
            genome.evaluate_fitness();
        }
    }

    /// Roulette-wheel selection over `pool`.
    pub fn select_parent<'a>(pool: &[&'a Genome]) -> Option<&'a Genome> {
        let total: f32 = pool.iter().copied().map(fitness_of).sum();
        let draw = if total > 0.0 {
            rand::rng().random_range(0.0..total)
        } else {
            0.0
        };
        Self::select_parent_at(pool, draw)
    }

    /// Walks `pool` until the running fitness sum exceeds `draw`.
    ///
    /// Falls back to the first genome when no running sum exceeds it.
    pub fn select_parent_at<'a>(pool: &[&'a Genome], draw: f32) -> Option<&'a Genome> {
        let mut running = 0.0;
        for genome in pool {
            running += fitness_of(genome);
            if running > draw {
                return Some(*genome);
            }
        }
        pool.first().copied()
    }

    /// Replaces the generation with an evolved one.
    ///
    /// Updates the best-ever record and stagnation counter, picks the
    /// breeding pool and the mutation rate from the active pressure stage,
    /// then fills slot 0 with the elite and slots `1..N` with children.
    pub fn evolve(&mut self) -> Result<GenerationSummary> {
        self.evaluate_fitness();

        let len = self.genomes.len();
        let fitnesses: Vec<f32> = self.genomes.iter().map(fitness_of).collect();
        let (best_index, max_fitness) = fitnesses
            .iter()
            .copied()
            .enumerate()
            .fold((0, 0.0f32), |best, (i, fitness)| {
                if fitness > best.1 { (i, fitness) } else { best }
            });
        let mean_fitness = if len == 0 {
            0.0
        } else {
            fitnesses.iter().sum::<f32>() / len as f32
        };

        if max_fitness > self.best_fitness {
            info!(
                generation = self.generation,
                previous = self.best_fitness,
                best = max_fitness,
                "fitness increase"
            );
            self.best_fitness = max_fitness;
            self.best = Some(self.genomes[best_index].clone());
            self.stagnation = 0;
        } else {
            self.stagnation += 1;
            info!(
                generation = self.generation,
                best = self.best_fitness,
                generation_best = max_fitness,
                stagnation = self.stagnation,
                "no fitness increase"
            );
        }

        let stage = self.params.evolution.stage_for(self.stagnation);
        debug!(
            mutation_rate = stage.mutation_rate,
            elite_fraction = stage.elite_fraction,
            "selection pressure"
        );

        let summary = GenerationSummary {
            generation: self.generation,
            ticks: self.ticks,
            max_fitness,
            mean_fitness,
            best_fitness: self.best_fitness,
            stagnation: self.stagnation,
            laps_completed: self
                .genomes
                .iter()
                .filter(|genome| genome.agent().lap_completed())
                .count(),
            stage,
        };

        if len == 0 {
            self.generation += 1;
            self.ticks = 0;
            return Ok(summary);
        }

        let start = self.sensors.track().start();
        let next = {
            let mut ranked: Vec<&Genome> = self.genomes.iter().collect();
            ranked.sort_by(|a, b| fitness_of(b).total_cmp(&fitness_of(a)));
            let pool_size = ((len as f32 * stage.elite_fraction).ceil() as usize).clamp(1, len);
            ranked.truncate(pool_size);

            let elite_brain = match &self.best {
                Some(best) => best.brain().clone(),
                None => self.genomes[rand::rng().random_range(0..len)].brain().clone(),
            };

            let children = self.pool.install(|| {
                (1..len)
                    .into_par_iter()
                    .map(|_| -> Result<Genome> {
                        let brain = match (
                            Self::select_parent(&ranked),
                            Self::select_parent(&ranked),
                        ) {
                            (Some(parent1), Some(parent2)) => Brain::crossover_and_mutate(
                                parent1.brain(),
                                parent2.brain(),
                                stage.mutation_rate,
                            )?,
                            _ => elite_brain.clone(),
                        };
                        Ok(Genome::new(Agent::new(start), brain))
                    })
                    .collect::<Result<Vec<_>>>()
            })?;

            let mut next = Vec::with_capacity(len);
            next.push(Genome::new(Agent::new(start), elite_brain));
            next.extend(children);
            next
        };

        self.genomes = next;
        self.generation += 1;
        self.ticks = 0;
        self.sense_all();

        debug!(cache = %self.sensors.stats(), "sensor cache");
        Ok(summary)
    }

    /// Ticks until the generation is done, then evolves.
    pub fn run_generation(&mut self) -> Result<GenerationSummary> {
        while !self.is_generation_done() {
            self.tick();
        }
        let summary = self.evolve()?;
        info!(
            generation = summary.generation,
            ticks = summary.ticks,
            max = summary.max_fitness,
            mean = summary.mean_fitness,
            best = summary.best_fitness,
            laps = summary.laps_completed,
            "generation done"
        );
        Ok(summary)
    }

    /// Copy of a uniformly random genome's brain paired with a fresh agent.
    pub fn random_genome_copy(&self) -> Option<Genome> {
        if self.genomes.is_empty() {
            return None;
        }
        let index = rand::rng().random_range(0..self.genomes.len());
        let brain = self.genomes[index].brain().clone();
        Some(Genome::new(Agent::new(self.sensors.track().start()), brain))
    }

    /// Genomes of the current generation; index 0 is the elite slot.
    pub fn genomes(&self) -> &[Genome] {
        &self.genomes
    }

    /// Mutable genomes, for drivers and tests.
    pub fn genomes_mut(&mut self) -> &mut [Genome] {
        &mut self.genomes
    }

    /// Current generation index.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Ticks run in the current generation.
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Best fitness ever recorded.
    pub fn best_fitness(&self) -> f32 {
        self.best_fitness
    }

    /// Genome that achieved the best fitness, as it finished.
    pub fn champion(&self) -> Option<&Genome> {
        self.best.as_ref()
    }

    /// Generations since the last improvement.
    pub fn stagnation(&self) -> u32 {
        self.stagnation
    }

    /// Worker threads used per tick.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// The shared sensor engine.
    pub fn sensors(&self) -> &SensorEngine {
        &self.sensors
    }

    /// Parameters of this run.
    pub fn params(&self) -> &Params {
        &self.params
    }
}

/// Drives a single brain from the track start until its agent crashes.
///
/// Fails without driving when the brain is not an agent controller.
pub fn replay(sensors: &SensorEngine, params: &KinematicParams, brain: Brain) -> Result<Genome> {
    brain.validate_controller()?;
    let mut genome = Genome::new(Agent::new(sensors.track().start()), brain);
    genome.sense(sensors, params);
    while !genome.is_crashed() {
        genome.step(0, sensors, params, None);
    }
    genome.evaluate_fitness();
    Ok(genome)
}

fn architecture_of(params: &Params) -> Architecture {
    Architecture::controller(params.brain.hidden_layers, params.brain.hidden_nodes)
}

fn fitness_of(genome: &Genome) -> f32 {
    genome.fitness().unwrap_or_else(|| genome.agent().score())
}
