//! Agent kinematics, termination policy, collision and checkpoint scoring.

use geo::{Coord, Point, Polygon, Rect, Rotate, Translate, coord};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use super::action::{Accelerate, Action, Turn};
use crate::simulation::geometric_utils::{Pose, heading_vector, normalize_heading};
use crate::simulation::params::KinematicParams;
use crate::simulation::sensor::SensorReading;
use crate::simulation::track::Track;

/// Number of values in [`Agent::brain_inputs`].
pub const INPUT_SIZE: usize = 5;

/// Why an agent stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrashCause {
    /// The footprint touched a non-drivable cell.
    Collision,
    /// The lifetime cap was reached.
    Lifetime,
    /// The agent stood still for too long.
    Idle,
    /// Too few checkpoints were passed in the early window.
    Stalled,
    /// Evaluating the agent failed unexpectedly.
    Fault,
}

/// One simulated vehicle.
///
/// Once crashed, the agent's state is frozen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pose: Pose,
    speed: f32,
    crash: Option<CrashCause>,
    /// Ticks survived.
    lifetime: u32,
    /// Consecutive ticks at zero speed.
    idle_ticks: u32,
    score: f32,
    /// Index of the gate the agent has to reach next.
    next_checkpoint: usize,
    checkpoints_passed: u32,
    laps: u32,
    sensor: SensorReading,
}

impl Agent {
    /// Creates a stationary agent at `start`.
    pub fn new(start: Pose) -> Self {
        Self {
            pose: Pose::new(start.x, start.y, start.heading),
            speed: 0.0,
            crash: None,
            lifetime: 0,
            idle_ticks: 0,
            score: 0.0,
            next_checkpoint: 0,
            checkpoints_passed: 0,
            laps: 0,
            sensor: SensorReading::default(),
        }
    }

    /// Applies one control action.
    ///
    /// A stopped agent cannot rotate in place, and steering is weaker below
    /// the low speed threshold.
    pub fn apply_action(&mut self, action: Action, params: &KinematicParams) {
        if self.is_crashed() {
            return;
        }

        match action.accelerate {
            Accelerate::Accelerate => {
                self.speed = (self.speed + params.acceleration).min(params.max_speed);
            }
            Accelerate::Decelerate => {
                self.speed = (self.speed - params.deceleration).max(0.0);
            }
            Accelerate::Idle => {}
        }

        if self.speed == 0.0 {
            return;
        }

        let turn_rate = if self.speed < params.low_speed_threshold {
            params.low_speed_turn_rate
        } else {
            params.turn_rate
        };
        let delta = match action.turn {
            Turn::Left => -turn_rate,
            Turn::Straight => 0.0,
            Turn::Right => turn_rate,
        };
        self.pose.heading = normalize_heading(self.pose.heading + delta);
    }

    /// Advances the agent by one tick.
    ///
    /// Termination rules are checked first. Surviving agents then move,
    /// collect the speed reward, try their next gate and are tested for
    /// collision at the new pose.
    pub fn integrate(&mut self, track: &Track, params: &KinematicParams) {
        if self.is_crashed() {
            return;
        }

        if let Some(cause) = self.termination(params) {
            self.crash(cause);
            return;
        }

        let (dx, dy) = heading_vector(self.pose.heading);
        self.pose.x += self.speed * dx;
        self.pose.y += self.speed * dy;
        self.score += self.speed * params.reward_factor;

        self.try_checkpoint(track, params);

        self.lifetime += 1;
        if self.speed == 0.0 {
            self.idle_ticks += 1;
        } else {
            self.idle_ticks = 0;
        }

        if self.collides(track, params) {
            self.crash(CrashCause::Collision);
        }
    }

    fn termination(&self, params: &KinematicParams) -> Option<CrashCause> {
        if self.lifetime >= params.max_lifetime {
            Some(CrashCause::Lifetime)
        } else if self.idle_ticks >= params.idle_timeout {
            Some(CrashCause::Idle)
        } else if self.lifetime >= params.stall_window
            && self.laps == 0
            && self.checkpoints_passed < params.stall_min_checkpoints
        {
            Some(CrashCause::Stalled)
        } else {
            None
        }
    }

    fn try_checkpoint(&mut self, track: &Track, params: &KinematicParams) {
        let checkpoints = track.checkpoints();
        let Some(gate) = checkpoints.get(self.next_checkpoint) else {
            return;
        };
        if gate.distance_to(self.pose.x, self.pose.y) >= params.checkpoint_tolerance {
            return;
        }

        self.score += params.checkpoint_bonus;
        self.checkpoints_passed += 1;
        self.next_checkpoint += 1;
        if self.next_checkpoint >= checkpoints.len() {
            self.next_checkpoint = 0;
            self.laps += 1;
        }
    }

    /// Marks the agent as crashed, freezing its lifetime and score.
    pub fn crash(&mut self, cause: CrashCause) {
        if self.crash.is_none() {
            self.crash = Some(cause);
        }
    }

    /// Oriented rectangle whose rear edge is centred on the agent position.
    pub fn footprint(&self, params: &KinematicParams) -> Polygon<f32> {
        let half = params.footprint_width / 2.0;
        Rect::new(
            coord! { x: 0.0, y: -half },
            coord! { x: params.footprint_length, y: half },
        )
        .to_polygon()
        .rotate_around_point(self.pose.heading, Point::new(0.0, 0.0))
        .translate(self.pose.x, self.pose.y)
    }

    /// Points along the footprint outline, at most one unit apart.
    pub fn footprint_samples(&self, params: &KinematicParams) -> Vec<Coord<f32>> {
        self.footprint(params)
            .exterior()
            .lines()
            .flat_map(|line| {
                let delta = line.delta();
                let steps = delta.x.hypot(delta.y).ceil().max(1.0) as usize;
                (0..steps).map(move |i| line.start + delta * (i as f32 / steps as f32))
            })
            .collect()
    }

    /// Whether any footprint sample lies on a non-drivable or off-raster cell.
    pub fn collides(&self, track: &Track, params: &KinematicParams) -> bool {
        self.footprint_samples(params)
            .iter()
            .any(|c| track.is_drivable_at(c.x, c.y) != Some(true))
    }

    /// Pose the sensor rays start from: the footprint centre.
    pub fn sensor_pose(&self, params: &KinematicParams) -> Pose {
        let (x, y) = self.pose.project(0.0, params.footprint_length / 2.0);
        Pose::new(x, y, self.pose.heading)
    }

    /// Stores the latest sensor reading.
    pub fn set_sensor_reading(&mut self, reading: SensorReading) {
        if !self.is_crashed() {
            self.sensor = reading;
        }
    }

    /// Brain input vector: `[speed, heading, right, ahead, left]`.
    pub fn brain_inputs(&self) -> Array1<f32> {
        Array1::from_vec(vec![
            self.speed,
            self.pose.heading,
            self.sensor.right,
            self.sensor.ahead,
            self.sensor.left,
        ])
    }

    /// Current pose.
    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// Current speed.
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Whether the agent has stopped for good.
    pub fn is_crashed(&self) -> bool {
        self.crash.is_some()
    }

    /// Reason the agent stopped, if it did.
    pub fn crash_cause(&self) -> Option<CrashCause> {
        self.crash
    }

    /// Ticks survived.
    pub fn lifetime(&self) -> u32 {
        self.lifetime
    }

    /// Accumulated score.
    pub fn score(&self) -> f32 {
        self.score
    }

    /// Index of the gate the agent is heading for.
    pub fn next_checkpoint(&self) -> usize {
        self.next_checkpoint
    }

    /// Total gates passed, across laps.
    pub fn checkpoints_passed(&self) -> u32 {
        self.checkpoints_passed
    }

    /// Whether at least one full lap was driven.
    pub fn lap_completed(&self) -> bool {
        self.laps > 0
    }

    /// Completed laps.
    pub fn laps(&self) -> u32 {
        self.laps
    }

    /// Last sensor reading.
    pub fn sensor_reading(&self) -> SensorReading {
        self.sensor
    }
}
