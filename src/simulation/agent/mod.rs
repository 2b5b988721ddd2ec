//! Agent module containing kinematics, collision and the action vocabulary.

mod action;
mod agent;

// Re-export everything from the agent module
pub use agent::*;

pub use action::{Accelerate, Action, Turn};
