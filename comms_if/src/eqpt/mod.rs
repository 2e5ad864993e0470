//! # Equipment Interface
//!
//! This module defines the interface structures exchanged with the drivetrain equipment.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod drive;
