//! Damped spring integration and frame timing.
//!
//! Springs are stepped with semi-implicit Euler: velocity is updated from the
//! spring and damping forces first, then position from the new velocity.
//! Frame deltas are capped so a stalled tab does not explode the simulation.

use web_time::Instant;

use crate::constants::MAX_FRAME_DT;

/// Stiffness and damping of a spring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringParams {
    pub stiffness: f64,
    pub damping: f64,
    pub mass: f64,
    /// Distance and speed under which the spring snaps to rest
    pub precision: f64,
}

impl SpringParams {
    /// Critically damped spring with natural frequency `omega`.
    pub fn critically_damped(omega: f64) -> Self {
        Self {
            stiffness: omega * omega,
            damping: 2.0 * omega,
            mass: 1.0,
            precision: 0.01,
        }
    }
}

impl Default for SpringParams {
    fn default() -> Self {
        Self {
            stiffness: 170.0,
            damping: 26.0,
            mass: 1.0,
            precision: 0.01,
        }
    }
}

/// One-dimensional spring. Velocity is in units per second.
#[derive(Debug, Clone, PartialEq)]
pub struct Spring {
    position: f64,
    velocity: f64,
    target: f64,
    params: SpringParams,
}

impl Spring {
    pub fn new(position: f64, target: f64, params: SpringParams) -> Self {
        Self {
            position,
            velocity: 0.0,
            target,
            params,
        }
    }

    /// Spring resting at `position`.
    pub fn at_rest(position: f64, params: SpringParams) -> Self {
        Self::new(position, position, params)
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// Velocity in units per millisecond.
    pub fn velocity_per_ms(&self) -> f64 {
        self.velocity / 1000.0
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn set_target(&mut self, target: f64) {
        self.target = target;
    }

    pub fn set_velocity(&mut self, velocity: f64) {
        self.velocity = velocity;
    }

    /// Move immediately, without animation.
    pub fn jump_to(&mut self, position: f64) {
        self.position = position;
        self.target = position;
        self.velocity = 0.0;
    }

    pub fn is_settled(&self) -> bool {
        (self.position - self.target).abs() < self.params.precision
            && self.velocity.abs() < self.params.precision
    }

    /// Advance by `dt` seconds. Returns whether the spring is now at rest.
    pub fn step(&mut self, dt: f64) -> bool {
        if self.is_settled() {
            self.position = self.target;
            self.velocity = 0.0;
            return true;
        }

        let dt = dt.clamp(0.0, MAX_FRAME_DT);
        let displacement = self.position - self.target;
        let spring_force = -self.params.stiffness * displacement;
        let damping_force = -self.params.damping * self.velocity;
        let acceleration = (spring_force + damping_force) / self.params.mass;

        self.velocity += acceleration * dt;
        self.position += self.velocity * dt;

        if self.is_settled() {
            self.position = self.target;
            self.velocity = 0.0;
            return true;
        }
        false
    }
}

/// Measures elapsed time between animation frames.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    last: Option<Instant>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the previous tick, capped at the maximum frame delta.
    /// The first tick returns zero.
    pub fn tick(&mut self) -> f64 {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> f64 {
        let dt = self
            .last
            .map(|last| now.saturating_duration_since(last).as_secs_f64())
            .unwrap_or(0.0);
        self.last = Some(now);
        dt.min(MAX_FRAME_DT)
    }

    /// Forget the previous frame, e.g. after an animation went idle.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
