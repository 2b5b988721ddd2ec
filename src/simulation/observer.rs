//! Observation hook for brain decisions.
//!
//! Observers are notified after every decision and never influence the
//! simulation.

use std::collections::VecDeque;

use ndarray::Array1;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Receives `(inputs, outputs)` pairs as brains decide.
///
/// Called concurrently from the tick workers.
pub trait DecisionObserver: Send + Sync {
    /// Called once per decision of the genome at `genome` index.
    fn observe(&self, genome: usize, inputs: &Array1<f32>, outputs: &Array1<f32>);
}

/// A recorded decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Index of the deciding genome.
    pub genome: usize,
    /// Brain inputs.
    pub inputs: Vec<f32>,
    /// Brain outputs.
    pub outputs: Vec<f32>,
}

/// Observer that keeps the most recent decisions, newest first.
#[derive(Debug)]
pub struct DecisionLog {
    /// Only this genome is recorded when set.
    watched: Option<usize>,
    decisions: Mutex<VecDeque<Decision>>,
    max_decisions: usize,
}

impl Default for DecisionLog {
    fn default() -> Self {
        Self::new(None, 20)
    }
}

impl DecisionLog {
    /// Creates a log with the given capacity, optionally watching one genome.
    pub fn new(watched: Option<usize>, max_decisions: usize) -> Self {
        Self {
            watched,
            decisions: Mutex::new(VecDeque::with_capacity(max_decisions)),
            max_decisions,
        }
    }

    /// Recorded decisions, newest first.
    pub fn decisions(&self) -> Vec<Decision> {
        self.decisions.lock().iter().cloned().collect()
    }

    /// Forgets all decisions.
    pub fn clear(&self) {
        self.decisions.lock().clear();
    }
}

impl DecisionObserver for DecisionLog {
    fn observe(&self, genome: usize, inputs: &Array1<f32>, outputs: &Array1<f32>) {
        if self.watched.is_some_and(|watched| watched != genome) {
            return;
        }
        let mut decisions = self.decisions.lock();
        decisions.push_front(Decision {
            genome,
            inputs: inputs.to_vec(),
            outputs: outputs.to_vec(),
        });
        while decisions.len() > self.max_decisions {
            decisions.pop_back();
        }
    }
}
