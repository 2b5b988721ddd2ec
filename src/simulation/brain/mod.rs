//! Feed-forward neural controller for agents.
//!
//! A brain is an ordered list of weight matrices, one per layer transition.
//! Each matrix has one row per output unit and one column per input unit plus
//! a trailing bias column. Every transition applies ReLU, the output layer
//! included, so outputs are never negative.

use std::fmt;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::agent::{Action, INPUT_SIZE};
use crate::error::{Error, Result};

pub mod matrix;

/// Layer dimensions of a brain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Architecture {
    /// Input units (without bias).
    pub inputs: usize,
    /// Nodes per hidden layer.
    pub hidden_nodes: usize,
    /// Number of hidden layers.
    pub hidden_layers: usize,
    /// Output units.
    pub outputs: usize,
}

impl Architecture {
    /// Agent controller shape: five inputs, nine actions.
    pub fn controller(hidden_layers: usize, hidden_nodes: usize) -> Self {
        Self {
            inputs: INPUT_SIZE,
            hidden_nodes,
            hidden_layers,
            outputs: Action::COUNT,
        }
    }

    /// `(rows, cols)` of every weight matrix, bias column included.
    pub fn matrix_shapes(&self) -> Vec<(usize, usize)> {
        if self.hidden_layers == 0 {
            return vec![(self.outputs, self.inputs + 1)];
        }
        let mut shapes = Vec::with_capacity(self.hidden_layers + 1);
        shapes.push((self.hidden_nodes, self.inputs + 1));
        for _ in 1..self.hidden_layers {
            shapes.push((self.hidden_nodes, self.hidden_nodes + 1));
        }
        shapes.push((self.outputs, self.hidden_nodes + 1));
        shapes
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} inputs, {}x{} hidden, {} outputs",
            self.inputs, self.hidden_layers, self.hidden_nodes, self.outputs
        )
    }
}

/// Neural network that maps sensed state to an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brain {
    architecture: Architecture,
    weights: Vec<Array2<f32>>,
}

impl Brain {
    /// Creates a brain with every weight uniform in `[-1, 1)`.
    pub fn new_random(architecture: Architecture) -> Self {
        let weights = architecture
            .matrix_shapes()
            .into_iter()
            .map(|(rows, cols)| matrix::random_matrix(rows, cols))
            .collect();
        Self {
            architecture,
            weights,
        }
    }

    /// Creates a brain from explicit matrices, checking their shapes.
    pub fn from_weights(architecture: Architecture, weights: Vec<Array2<f32>>) -> Result<Self> {
        let brain = Self {
            architecture,
            weights,
        };
        brain.validate()?;
        Ok(brain)
    }

    /// Checks that the matrices match the declared architecture.
    pub fn validate(&self) -> Result<()> {
        let expected = self.architecture.matrix_shapes();
        if expected.iter().any(|&(rows, _)| rows == 0) {
            return Err(Error::InvalidArchitecture(format!(
                "{} has an empty layer",
                self.architecture
            )));
        }
        if expected.len() != self.weights.len() {
            return Err(Error::InvalidArchitecture(format!(
                "{} expects {} weight matrices, found {}",
                self.architecture,
                expected.len(),
                self.weights.len()
            )));
        }
        for (i, (shape, weights)) in expected.iter().zip(&self.weights).enumerate() {
            if weights.dim() != *shape {
                return Err(Error::InvalidArchitecture(format!(
                    "matrix {i} is {:?}, expected {:?}",
                    weights.dim(),
                    shape
                )));
            }
        }
        Ok(())
    }

    /// Checks that the brain is well formed and can drive an agent.
    pub fn validate_controller(&self) -> Result<()> {
        self.validate()?;
        if self.architecture.inputs != INPUT_SIZE || self.architecture.outputs != Action::COUNT {
            return Err(Error::InvalidArchitecture(format!(
                "{} cannot drive an agent, expected {} inputs and {} outputs",
                self.architecture,
                INPUT_SIZE,
                Action::COUNT
            )));
        }
        Ok(())
    }

    /// Layer dimensions.
    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    /// Weight matrices in layer order.
    pub fn weights(&self) -> &[Array2<f32>] {
        &self.weights
    }

    /// Runs a forward pass.
    ///
    /// `inputs` must have `architecture().inputs` elements.
    #[inline]
    pub fn output(&self, inputs: &Array1<f32>) -> Array1<f32> {
        let mut current = inputs.clone();
        for weights in &self.weights {
            current = matrix::forward(weights, &current);
        }
        current
    }

    /// Runs a forward pass and decodes the action.
    pub fn decide(&self, inputs: &Array1<f32>) -> (Action, Array1<f32>) {
        let outputs = self.output(inputs);
        (Action::decide(&outputs), outputs)
    }

    /// Creates a child by per-matrix single-point crossover.
    pub fn crossover(parent1: &Brain, parent2: &Brain) -> Result<Self> {
        Self::crossover_and_mutate(parent1, parent2, 0.0)
    }

    /// Creates a child by per-matrix single-point crossover followed by mutation.
    ///
    /// Fails when the parents do not share an architecture.
    pub fn crossover_and_mutate(
        parent1: &Brain,
        parent2: &Brain,
        mutation_rate: f32,
    ) -> Result<Self> {
        if parent1.architecture != parent2.architecture {
            return Err(Error::ArchitectureMismatch {
                left: parent1.architecture,
                right: parent2.architecture,
            });
        }

        let weights = parent1
            .weights
            .iter()
            .zip(&parent2.weights)
            .map(|(w1, w2)| {
                let mut child = matrix::crossover(w1, w2);
                matrix::mutate(&mut child, mutation_rate);
                child
            })
            .collect();

        Ok(Self {
            architecture: parent1.architecture,
            weights,
        })
    }

    /// Mutates every matrix in place.
    pub fn mutate(&mut self, mutation_rate: f32) {
        for weights in &mut self.weights {
            matrix::mutate(weights, mutation_rate);
        }
    }

    /// Encodes the brain as JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decodes and validates a brain from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let brain: Self = serde_json::from_str(json)?;
        brain.validate()?;
        Ok(brain)
    }

    /// Saves the brain to a JSON file.
    pub fn save_to_file(&self, path: &str) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Loads a brain from a JSON file.
    pub fn load_from_file(path: &str) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Loads a brain from a JSON file and checks it is an agent controller.
    pub fn load_controller(path: &str) -> Result<Self> {
        let brain = Self::load_from_file(path)?;
        brain.validate_controller()?;
        Ok(brain)
    }
}
