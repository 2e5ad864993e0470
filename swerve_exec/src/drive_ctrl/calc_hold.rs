//! Hold-in-place calculations for the swerve synthesizer

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::{ModuleState, SwerveDems, SwerveSynth, NUM_MODULES};

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SwerveSynth {
    /// Demands locking the wheels in an X pattern to resist being pushed.
    ///
    /// Each wheel is pointed along the line from the robot centre to the module, with zero speed.
    /// Steering is always allowed, unlike in `synthesize`.
    pub fn hold(&self, measured_angles_rad: &[f64; NUM_MODULES]) -> SwerveDems {
        let mut target = [ModuleState::default(); NUM_MODULES];

        for i in 0..NUM_MODULES {
            let pos = self.module_pos_m[i];
            target[i] = ModuleState::new(0.0, pos[1].atan2(pos[0])).optimize(measured_angles_rad[i]);
        }

        let steer_rad = self.steer_demands(&target, measured_angles_rad, true);

        SwerveDems {
            target,
            steer_rad,
            desaturated: false,
        }
    }
}
