//! # Action sink
//!
//! Shooting, intake and the other game piece subsystems sit outside the drive. Scripted actions
//! for them are forwarded to an [`ActionSink`] provided by whoever runs the script.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::auto::AutoAction;
use log::info;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Carries out subsystem actions.
pub trait ActionSink: Send {
    /// Execute the action, blocking until it has been carried out.
    fn execute(&mut self, action: &AutoAction) -> Result<(), ActionError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Sink which only logs the actions it receives, used when no subsystems are attached.
#[derive(Debug, Default)]
pub struct LoggingSink {
    num_executed: usize,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("Action {0} is not supported by this sink")]
    Unsupported(&'static str),

    #[error("Subsystem failed: {0}")]
    SubsystemFailed(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ActionSink for LoggingSink {
    fn execute(&mut self, action: &AutoAction) -> Result<(), ActionError> {
        if !action.is_subsystem_call() {
            return Err(ActionError::Unsupported(action.name()));
        }

        self.num_executed += 1;
        info!("Subsystem action: {:?}", action);
        Ok(())
    }
}

impl LoggingSink {
    pub fn num_executed(&self) -> usize {
        self.num_executed
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_logging_sink() {
        let mut sink = LoggingSink::default();

        sink.execute(&AutoAction::SetIntake { deployed: true }).unwrap();
        assert!(sink
            .execute(&AutoAction::Sleep { duration_s: 1.0 })
            .is_err());
        assert_eq!(sink.num_executed(), 1);
    }
}
