//! # Script steps
//!
//! Steps are built from the script definition before anything runs, so a script with an invalid
//! trajectory or action is rejected as a whole rather than failing part way through.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::Arc;

use comms_if::auto::{AutoAction, AutoScript, AutoStepSpec, TrajectoryStepSpec};

use super::{ActionQueue, AutoError, RotationSchedule, ScheduledAction, MAX_WAIT_S};
use crate::traj_ctrl::Trajectory;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One path to follow, with its heading schedule and the actions to fire along it.
#[derive(Debug, Clone)]
pub struct TrajectoryStep {
    pub trajectory: Arc<Trajectory>,
    pub rotations: RotationSchedule,

    /// Actions keyed on elapsed time in seconds.
    pub time_actions: ActionQueue,

    /// Actions keyed on the completed fraction of the path duration.
    pub fraction_actions: ActionQueue,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A loaded step of an autonomous script.
#[derive(Debug, Clone)]
pub enum AutoStep {
    Trajectory(TrajectoryStep),

    /// Actions run one after the other, immediately.
    Script(Vec<AutoAction>),
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Load and validate every step of a script.
pub fn load_script(script: &AutoScript) -> Result<Vec<AutoStep>, AutoError> {
    script.steps.iter().map(AutoStep::from_spec).collect()
}

/// Check the arguments of an action.
fn validate_action(action: &AutoAction) -> Result<(), AutoError> {
    let invalid = |reason: &str| AutoError::InvalidAction {
        name: action.name(),
        reason: reason.into(),
    };

    match *action {
        AutoAction::Sleep { duration_s } if !(duration_s >= 0.0 && duration_s <= MAX_WAIT_S) => {
            Err(invalid(&format!(
                "duration must be between 0 and {} s",
                MAX_WAIT_S
            )))
        }
        AutoAction::SetAccelLimit { accel_ms2 } if !(accel_ms2.is_finite() && accel_ms2 > 0.0) => {
            Err(invalid("acceleration must be finite and positive"))
        }
        AutoAction::TurnTo { heading_deg } if !heading_deg.is_finite() => {
            Err(invalid("heading must be finite"))
        }
        AutoAction::SetShooterSpeed { rpm } if !rpm.is_finite() => {
            Err(invalid("speed must be finite"))
        }
        AutoAction::SetHoodAngle { angle_deg } if !angle_deg.is_finite() => {
            Err(invalid("angle must be finite"))
        }
        _ => Ok(()),
    }
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl AutoStep {
    pub fn from_spec(spec: &AutoStepSpec) -> Result<Self, AutoError> {
        match spec {
            AutoStepSpec::Trajectory(t) => Ok(AutoStep::Trajectory(TrajectoryStep::from_spec(t)?)),
            AutoStepSpec::Script { actions } => {
                for a in actions {
                    validate_action(a)?;
                }
                Ok(AutoStep::Script(actions.clone()))
            }
        }
    }
}

impl TrajectoryStep {
    /// Create a new trajectory step.
    ///
    /// Turning in place would take the drive off the path, so `turn_to` actions are rejected.
    pub fn new(
        trajectory: Arc<Trajectory>,
        rotations: RotationSchedule,
        time_actions: Vec<ScheduledAction>,
        fraction_actions: Vec<ScheduledAction>,
    ) -> Result<Self, AutoError> {
        for a in time_actions.iter().chain(fraction_actions.iter()) {
            if let AutoAction::TurnTo { .. } = a.action {
                return Err(AutoError::ActionNotAllowed(a.action.name()));
            }
            validate_action(&a.action)?;
        }

        Ok(Self {
            trajectory,
            rotations,
            time_actions: ActionQueue::new(time_actions)?,
            fraction_actions: ActionQueue::new(fraction_actions)?,
        })
    }

    pub fn from_spec(spec: &TrajectoryStepSpec) -> Result<Self, AutoError> {
        Self::new(
            Arc::new(Trajectory::from_states(&spec.states)?),
            RotationSchedule::from_rotations(&spec.rotations)?,
            spec.time_actions.iter().map(ScheduledAction::from).collect(),
            spec.fraction_actions.iter().map(ScheduledAction::from).collect(),
        )
    }

    /// Total number of scheduled actions.
    pub fn num_actions(&self) -> usize {
        self.time_actions.len() + self.fraction_actions.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::auto::{TimedAction, TimedRotation, TrajectoryState};

    fn spec() -> TrajectoryStepSpec {
        let state = |t: f64, x: f64| TrajectoryState {
            time_s: t,
            x_m: x,
            y_m: 0.0,
            heading_deg: 0.0,
            velocity_ms: 1.0,
            accel_ms2: 0.0,
            curvature_radpm: 0.0,
        };

        TrajectoryStepSpec {
            states: vec![state(0.0, 0.0), state(1.0, 1.0)],
            rotations: vec![TimedRotation {
                time_s: 0.0,
                heading_deg: 90.0,
            }],
            time_actions: vec![TimedAction {
                trigger: 0.5,
                action: AutoAction::SetIntake { deployed: true },
            }],
            fraction_actions: vec![],
        }
    }

    #[test]
    fn test_from_spec() {
        let step = TrajectoryStep::from_spec(&spec()).unwrap();
        assert!((step.trajectory.duration_s() - 1.0).abs() < 1e-12);
        assert!((step.rotations.initial_heading_rad() - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert_eq!(step.num_actions(), 1);
    }

    #[test]
    fn test_turn_rejected_in_path() {
        let mut s = spec();
        s.fraction_actions.push(TimedAction {
            trigger: 0.5,
            action: AutoAction::TurnTo { heading_deg: 10.0 },
        });

        assert!(matches!(
            TrajectoryStep::from_spec(&s),
            Err(AutoError::ActionNotAllowed("turn_to"))
        ));
    }

    #[test]
    fn test_script_validation() {
        let script = AutoScript {
            steps: vec![
                AutoStepSpec::Trajectory(spec()),
                AutoStepSpec::Script {
                    actions: vec![AutoAction::Sleep { duration_s: -1.0 }],
                },
            ],
        };
        assert!(matches!(
            load_script(&script),
            Err(AutoError::InvalidAction { name: "sleep", .. })
        ));

        for duration_s in &[1e19, std::f64::INFINITY, std::f64::NAN, MAX_WAIT_S + 1.0] {
            let script = AutoScript {
                steps: vec![AutoStepSpec::Script {
                    actions: vec![AutoAction::Sleep {
                        duration_s: *duration_s,
                    }],
                }],
            };
            assert!(matches!(
                load_script(&script),
                Err(AutoError::InvalidAction { name: "sleep", .. })
            ));
        }

        let script = AutoScript {
            steps: vec![AutoStepSpec::Script {
                actions: vec![AutoAction::Sleep {
                    duration_s: MAX_WAIT_S,
                }],
            }],
        };
        assert!(load_script(&script).is_ok());

        let mut s = spec();
        s.states.clear();
        assert!(matches!(
            TrajectoryStep::from_spec(&s),
            Err(AutoError::TrajError(_))
        ));
    }
}
