//! A genome pairs one agent with the brain driving it.

use serde::{Deserialize, Serialize};

use super::agent::Agent;
use super::brain::Brain;
use super::observer::DecisionObserver;
use super::params::KinematicParams;
use super::sensor::SensorEngine;

/// Agent, brain and memoized fitness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genome {
    agent: Agent,
    brain: Brain,
    /// Set once per generation by [`Genome::evaluate_fitness`].
    fitness: Option<f32>,
}

impl Genome {
    /// Pairs a fresh agent with a brain.
    pub fn new(agent: Agent, brain: Brain) -> Self {
        Self {
            agent,
            brain,
            fitness: None,
        }
    }

    /// The simulated vehicle.
    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Mutable access to the vehicle, for drivers and tests.
    pub fn agent_mut(&mut self) -> &mut Agent {
        &mut self.agent
    }

    /// The controller.
    pub fn brain(&self) -> &Brain {
        &self.brain
    }

    /// Whether the agent has crashed.
    pub fn is_crashed(&self) -> bool {
        self.agent.is_crashed()
    }

    /// Fitness from the agent's score, computed on first call and memoized.
    pub fn evaluate_fitness(&mut self) -> f32 {
        let score = self.agent.score();
        *self.fitness.get_or_insert(score)
    }

    /// Memoized fitness, if evaluated.
    pub fn fitness(&self) -> Option<f32> {
        self.fitness
    }

    /// Refreshes the agent's sensor reading from its current pose.
    pub fn sense(&mut self, sensors: &SensorEngine, params: &KinematicParams) {
        if self.agent.is_crashed() {
            return;
        }
        let reading = sensors.sense(&self.agent.sensor_pose(params));
        self.agent.set_sensor_reading(reading);
    }

    /// Runs one tick: decide, act, integrate, then re-sense.
    pub fn step(
        &mut self,
        index: usize,
        sensors: &SensorEngine,
        params: &KinematicParams,
        observer: Option<&dyn DecisionObserver>,
    ) {
        if self.agent.is_crashed() {
            return;
        }

        let inputs = self.agent.brain_inputs();
        let (action, outputs) = self.brain.decide(&inputs);
        if let Some(observer) = observer {
            observer.observe(index, &inputs, &outputs);
        }

        self.agent.apply_action(action, params);
        self.agent.integrate(sensors.track(), params);
        self.sense(sensors, params);
    }
}
