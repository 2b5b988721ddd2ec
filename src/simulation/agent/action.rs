//! Discrete control actions and their decoding from brain outputs.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Longitudinal control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Accelerate {
    /// Speed up by one acceleration step.
    Accelerate,
    /// Keep the current speed.
    Idle,
    /// Slow down by one deceleration step.
    Decelerate,
}

/// Steering control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Turn {
    /// Decrease the heading.
    Left,
    /// Keep the heading.
    Straight,
    /// Increase the heading.
    Right,
}

/// One tick's worth of control input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    /// Longitudinal part.
    pub accelerate: Accelerate,
    /// Steering part.
    pub turn: Turn,
}

impl Action {
    /// Number of distinct actions, and of brain outputs.
    pub const COUNT: usize = 9;

    /// Creates an action.
    pub fn new(accelerate: Accelerate, turn: Turn) -> Self {
        Self { accelerate, turn }
    }

    /// Decodes an output index: rows of three share the longitudinal part,
    /// columns share the steering part.
    pub fn from_index(index: usize) -> Self {
        let accelerate = match index {
            0..=2 => Accelerate::Accelerate,
            3..=5 => Accelerate::Idle,
            _ => Accelerate::Decelerate,
        };
        let turn = match index % 3 {
            0 => Turn::Left,
            1 => Turn::Straight,
            _ => Turn::Right,
        };
        Self { accelerate, turn }
    }

    /// Inverse of [`Action::from_index`].
    pub fn index(&self) -> usize {
        let row = match self.accelerate {
            Accelerate::Accelerate => 0,
            Accelerate::Idle => 1,
            Accelerate::Decelerate => 2,
        };
        let col = match self.turn {
            Turn::Left => 0,
            Turn::Straight => 1,
            Turn::Right => 2,
        };
        row * 3 + col
    }

    /// Picks the action with the largest output; ties go to the lowest index.
    pub fn decide(outputs: &Array1<f32>) -> Self {
        Self::from_index(argmax(outputs))
    }
}

/// Index of the first maximum. NaN entries never win.
pub(crate) fn argmax(values: &Array1<f32>) -> usize {
    let mut best = 0;
    let mut best_value = f32::NEG_INFINITY;
    for (i, &value) in values.iter().enumerate() {
        if value > best_value {
            best = i;
            best_value = value;
        }
    }
    best
}
