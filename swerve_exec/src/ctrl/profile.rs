//! # Trapezoid motion profile and profiled PID controller
//!
//! The profile limits the velocity and acceleration of a setpoint moving towards a goal. The
//! profiled controller chases that moving setpoint instead of stepping straight to the goal,
//! which keeps large heading changes smooth.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use super::PidController;
use util::maths::input_modulus;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A position and velocity along a one dimensional profile.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileState {
    pub position: f64,
    pub velocity: f64,
}

/// Velocity and acceleration limits of a profile.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileConstraints {
    pub max_velocity: f64,
    pub max_acceleration: f64,
}

/// A trapezoidal velocity profile between two states.
#[derive(Debug, Clone)]
pub struct TrapezoidProfile {
    constraints: ProfileConstraints,

    /// +1 if travelling towards positive positions, -1 otherwise
    direction: f64,

    /// Initial state, in the direction-corrected frame
    initial: ProfileState,

    /// Goal state, in the direction-corrected frame
    goal: ProfileState,

    end_accel_s: f64,
    end_full_speed_s: f64,
    end_decel_s: f64,
}

/// A PID controller which tracks a trapezoid-profiled setpoint towards its goal.
#[derive(Debug, Clone)]
pub struct ProfiledPidController {
    pid: PidController,
    constraints: ProfileConstraints,
    setpoint: ProfileState,
    continuous_range: Option<(f64, f64)>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ProfileConstraints {
    pub fn new(max_velocity: f64, max_acceleration: f64) -> Self {
        Self {
            max_velocity,
            max_acceleration,
        }
    }

    /// Both limits must be finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        self.max_velocity.is_finite()
            && self.max_acceleration.is_finite()
            && self.max_velocity > 0.0
            && self.max_acceleration > 0.0
    }
}

impl TrapezoidProfile {
    /// Build the profile taking `initial` to `goal` under `constraints`.
    pub fn new(constraints: ProfileConstraints, goal: ProfileState, initial: ProfileState) -> Self {
        let direction = if initial.position > goal.position {
            -1.0
        } else {
            1.0
        };

        let mut initial = Self::direct(direction, initial);
        let goal = Self::direct(direction, goal);

        if initial.velocity > constraints.max_velocity {
            initial.velocity = constraints.max_velocity;
        }

        let max_v = constraints.max_velocity;
        let max_a = constraints.max_acceleration;

        // Time and distance the profile would have needed to reach the initial and goal
        // velocities from rest, these are cut off the ends of the full trapezoid.
        let cutoff_begin = initial.velocity / max_a;
        let cutoff_dist_begin = cutoff_begin * cutoff_begin * max_a / 2.0;

        let cutoff_end = goal.velocity / max_a;
        let cutoff_dist_end = cutoff_end * cutoff_end * max_a / 2.0;

        let full_trapezoid_dist =
            cutoff_dist_begin + (goal.position - initial.position) + cutoff_dist_end;
        let mut accel_time = max_v / max_a;

        let mut full_speed_dist = full_trapezoid_dist - accel_time * accel_time * max_a;

        // Triangular profile, max velocity is never reached
        if full_speed_dist < 0.0 {
            accel_time = (full_trapezoid_dist / max_a).sqrt();
            full_speed_dist = 0.0;
        }

        let end_accel_s = accel_time - cutoff_begin;
        let end_full_speed_s = end_accel_s + full_speed_dist / max_v;
        let end_decel_s = end_full_speed_s + accel_time - cutoff_end;

        Self {
            constraints,
            direction,
            initial,
            goal,
            end_accel_s,
            end_full_speed_s,
            end_decel_s,
        }
    }

    /// The state of the profile `t_s` seconds after its start.
    pub fn calculate(&self, t_s: f64) -> ProfileState {
        let max_v = self.constraints.max_velocity;
        let max_a = self.constraints.max_acceleration;
        let mut result = self.initial;

        if t_s < self.end_accel_s {
            result.velocity += t_s * max_a;
            result.position += (self.initial.velocity + t_s * max_a / 2.0) * t_s;
        } else if t_s < self.end_full_speed_s {
            result.velocity = max_v;
            result.position += (self.initial.velocity + self.end_accel_s * max_a / 2.0)
                * self.end_accel_s
                + max_v * (t_s - self.end_accel_s);
        } else if t_s <= self.end_decel_s {
            let time_left = self.end_decel_s - t_s;
            result.velocity = self.goal.velocity + time_left * max_a;
            result.position =
                self.goal.position - (self.goal.velocity + time_left * max_a / 2.0) * time_left;
        } else {
            result = self.goal;
        }

        Self::direct(self.direction, result)
    }

    /// Total time taken by the profile.
    pub fn total_time_s(&self) -> f64 {
        self.end_decel_s
    }

    /// True if the profile has reached its goal at `t_s`.
    pub fn is_finished(&self, t_s: f64) -> bool {
        t_s >= self.total_time_s()
    }

    fn direct(direction: f64, state: ProfileState) -> ProfileState {
        ProfileState {
            position: state.position * direction,
            velocity: state.velocity * direction,
        }
    }
}

impl ProfiledPidController {
    pub fn new(k_p: f64, k_i: f64, k_d: f64, constraints: ProfileConstraints) -> Self {
        Self {
            pid: PidController::new(k_p, k_i, k_d),
            constraints,
            setpoint: ProfileState::default(),
            continuous_range: None,
        }
    }

    /// Treat the input as continuous over `[min, max)`.
    pub fn with_continuous_input(mut self, min: f64, max: f64) -> Self {
        self.pid = self.pid.with_continuous_input(min, max);
        self.continuous_range = Some((min, max));
        self
    }

    /// The current profiled setpoint.
    pub fn setpoint(&self) -> ProfileState {
        self.setpoint
    }

    /// Reset the controller, placing the setpoint at rest on the measurement.
    pub fn reset(&mut self, measurement: f64) {
        self.pid.reset();
        self.setpoint = ProfileState {
            position: measurement,
            velocity: 0.0,
        };
    }

    /// Advance the profile by `dt` towards `goal` and return the controller output.
    ///
    /// The output is the feedback on the profiled setpoint plus the setpoint velocity as a
    /// feedforward term.
    pub fn calculate(&mut self, measurement: f64, goal: f64, dt: f64) -> f64 {
        let mut goal = ProfileState {
            position: goal,
            velocity: 0.0,
        };

        // Express goal and setpoint as the closest equivalent positions to the measurement
        if let Some((min, max)) = self.continuous_range {
            let bound = (max - min) / 2.0;
            goal.position = input_modulus(goal.position - measurement, -bound, bound) + measurement;
            self.setpoint.position =
                input_modulus(self.setpoint.position - measurement, -bound, bound) + measurement;
        }

        let profile = TrapezoidProfile::new(self.constraints, goal, self.setpoint);
        self.setpoint = profile.calculate(dt);

        self.pid.calculate(measurement, self.setpoint.position, Some(dt)) + self.setpoint.velocity
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_trapezoid() {
        let c = ProfileConstraints::new(1.0, 1.0);
        let p = TrapezoidProfile::new(
            c,
            ProfileState {
                position: 3.0,
                velocity: 0.0,
            },
            ProfileState::default(),
        );

        // 1 s accelerating, 2 s cruising, 1 s decelerating
        assert!((p.total_time_s() - 4.0).abs() < 1e-12);

        let s = p.calculate(3.5);
        assert!((s.velocity - 0.5).abs() < 1e-12);
        assert!((s.position - 2.875).abs() < 1e-12);

        let s = p.calculate(0.5);
        assert!((s.velocity - 0.5).abs() < 1e-12);
        assert!((s.position - 0.125).abs() < 1e-12);

        let s = p.calculate(1.5);
        assert!((s.velocity - 1.0).abs() < 1e-12);
        assert!((s.position - 1.0).abs() < 1e-12);

        let s = p.calculate(10.0);
        assert!((s.position - 3.0).abs() < 1e-12);
        assert_eq!(s.velocity, 0.0);
        assert!(p.is_finished(10.0));
    }

    #[test]
    fn test_trapezoid_reverse() {
        let c = ProfileConstraints::new(1.0, 1.0);
        let p = TrapezoidProfile::new(
            c,
            ProfileState {
                position: -3.0,
                velocity: 0.0,
            },
            ProfileState::default(),
        );

        let s = p.calculate(0.5);
        assert!((s.velocity + 0.5).abs() < 1e-12);
        assert!((s.position + 0.125).abs() < 1e-12);
    }

    #[test]
    fn test_triangle() {
        let c = ProfileConstraints::new(10.0, 1.0);
        let p = TrapezoidProfile::new(
            c,
            ProfileState {
                position: 1.0,
                velocity: 0.0,
            },
            ProfileState::default(),
        );

        // Never reaches max velocity, 1 s up and 1 s down
        assert!((p.total_time_s() - 2.0).abs() < 1e-12);
        assert!((p.calculate(1.0).velocity - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_profiled_wraps_goal() {
        use std::f64::consts::PI;

        let mut ctrl = ProfiledPidController::new(1.0, 0.0, 0.0, ProfileConstraints::new(4.0, 4.0))
            .with_continuous_input(-PI, PI);
        ctrl.reset(175f64.to_radians());

        // Goal at -175 is 10 degrees away in the positive direction
        let out = ctrl.calculate(175f64.to_radians(), (-175f64).to_radians(), 0.02);
        assert!(out > 0.0);
    }

    #[test]
    fn test_constraints_valid() {
        assert!(ProfileConstraints::new(4.0, 4.0).is_valid());
        assert!(!ProfileConstraints::new(0.0, 4.0).is_valid());
        assert!(!ProfileConstraints::new(4.0, f64::NAN).is_valid());
    }
}
