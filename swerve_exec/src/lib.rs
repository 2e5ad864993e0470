//! # Swerve drive library.
//!
//! This library holds the motion control core of the robot, and allows the executable and the
//! benchmarks to access the items defined inside the swerve crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Autonomy - runs autonomous scripts, synchronising scripted actions with path following
pub mod auto;

/// Control primitives - PID controllers and motion profiles shared by the controllers
pub mod ctrl;

/// Global data store for the executable
pub mod data_store;

/// Drive control module - converts drive intent into individual swerve module demands
pub mod drive_ctrl;

/// Heading control module - turns the robot to face a target heading
pub mod head_ctrl;

/// Lead prediction - computes where to aim while the robot is moving
pub mod lead_pred;

/// Localisation - pose types provided by the external pose estimator
pub mod loc;

/// Parameters of the executable
pub mod params;

/// Simulation - a kinematic model of the drivetrain standing in for the hardware
pub mod sim;

/// Trajectory control module - keeps the robot on a pre-computed trajectory
pub mod traj_ctrl;
