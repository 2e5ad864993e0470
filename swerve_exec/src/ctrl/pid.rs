//! # PID controller

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use util::maths::{clamp, input_modulus};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller.
///
/// The controller can either be driven with an error directly (`get`, `get_dt`) or against a
/// setpoint (`calculate`). When continuous input is enabled errors are wrapped so the controller
/// always takes the shortest way around, which is what heading loops need.
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Dervative gain
    k_d: f64,

    /// The range over which the input wraps, if any
    continuous_range: Option<(f64, f64)>,

    /// Minimum and maximum contribution of the integral term to the output.
    integrator_range: (f64, f64),

    /// The current setpoint
    setpoint: f64,

    /// Previous time that the error was passed in
    prev_time_s: Option<f64>,

    /// Previous error
    prev_error: Option<f64>,

    /// The integral accumulation
    integral: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {
    /// Create a new controller with the given gains.
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self {
            k_p,
            k_i,
            k_d,
            continuous_range: None,
            integrator_range: (-1.0, 1.0),
            setpoint: 0.0,
            prev_time_s: None,
            prev_error: None,
            integral: 0.0,
        }
    }

    /// Treat the input as continuous over `[min, max)`, e.g. an angle.
    pub fn with_continuous_input(mut self, min: f64, max: f64) -> Self {
        self.continuous_range = Some((min, max));
        self
    }

    /// Bound the contribution of the integral term to the output.
    pub fn with_integrator_range(mut self, min: f64, max: f64) -> Self {
        self.integrator_range = (min, max);
        self
    }

    /// Set the value the controller drives the measurement towards.
    pub fn set_setpoint(&mut self, setpoint: f64) {
        self.setpoint = setpoint;
    }

    /// Get the current setpoint.
    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    /// Error between the setpoint and the given measurement, wrapped if the input is continuous.
    pub fn error_to(&self, measurement: f64) -> f64 {
        let error = self.setpoint - measurement;

        match self.continuous_range {
            Some((min, max)) => {
                let half = (max - min) / 2.0;
                input_modulus(error, -half, half)
            }
            None => error,
        }
    }

    /// Get the value of the controller for the given error.
    ///
    /// This function is time-aware, `now_s` is the time at which the error was measured and the
    /// delta time is calculated from the previous call.
    pub fn get(&mut self, error: f64, now_s: f64) -> f64 {
        let dt = self.prev_time_s.map(|t0| now_s - t0);
        self.prev_time_s = Some(now_s);

        self.get_dt(error, dt)
    }

    /// Get the value of the controller for the given error and time step.
    ///
    /// If there's no time step (first call) or it isn't positive no integral is accumulated and
    /// the derivative is zero, otherwise a large spike would be produced.
    pub fn get_dt(&mut self, error: f64, dt: Option<f64>) -> f64 {
        let dt = dt.filter(|t| *t > 0.0);

        if let Some(t) = dt {
            self.integral += error * t;

            // Clamp so that the integral contribution stays inside the integrator range
            if self.k_i != 0.0 {
                let (lo, hi) = self.integrator_range;
                let a = lo / self.k_i;
                let b = hi / self.k_i;
                self.integral = clamp(self.integral, a.min(b), a.max(b));
            }
        }

        let deriv = match (self.prev_error, dt) {
            (Some(e), Some(t)) => (error - e) / t,
            _ => 0.0,
        };

        self.prev_error = Some(error);

        self.k_p * error + self.k_i * self.integral + self.k_d * deriv
    }

    /// Drive the measurement towards `setpoint` over the time step `dt`.
    pub fn calculate(&mut self, measurement: f64, setpoint: f64, dt: Option<f64>) -> f64 {
        self.setpoint = setpoint;
        let error = self.error_to(measurement);
        self.get_dt(error, dt)
    }

    /// Clear the integral and derivative history.
    pub fn reset(&mut self) {
        self.prev_time_s = None;
        self.prev_error = None;
        self.integral = 0.0;
    }

    /// Clear only the integral accumulator.
    pub fn reset_integral(&mut self) {
        self.integral = 0.0;
    }

    /// Current integral accumulation.
    pub fn integral(&self) -> f64 {
        self.integral
    }
}
