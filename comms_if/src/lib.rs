//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the software: telecommands, the autonomous
//! script contract and the swerve module equipment demands.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod tc;

/// Autonomous script definitions, the contract between script authoring and the drive core
pub mod auto;

/// Command and sensor definitions for equipment (like the swerve modules)
pub mod eqpt;
