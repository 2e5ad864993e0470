//! Main swerve drive executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Main loop:
//!         - System input acquisition from the simulated drivetrain
//!         - Telecommand processing and handling
//!         - Autonomy management
//!         - Drive control processing
//!         - Actuation of the simulated drivetrain
//!         - Archive writing
//!
//! Autonomous scripts run on their own thread, commanding drive control through its handle.
//!
//! # Modules
//!
//! All modules (e.g. `drive_ctrl`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.
//!

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use comms_if::tc::auto::AutoCmd;
use swerve_lib::{
    auto::{AutoMgr, LoggingSink},
    data_store::{DataStore, SafeModeCause},
    loc::Pose,
    params::SwerveExecParams,
    sim::SimDrivetrain,
};

mod tc_processor;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use util::{
    archive::Archived,
    logger::{logger_init, LevelFilter},
    module::State,
    script_interpreter::{PendingTcs, ScriptInterpreter},
    session::Session,
};

// ---------------------------------------------------------------------------
// STRUCTURES
// ---------------------------------------------------------------------------

/// Command line options of the executable.
#[derive(Debug, StructOpt)]
#[structopt(name = "swerve_exec", about = "Swerve drive motion control executable")]
struct Opt {
    /// Timed TC script to replay
    #[structopt(short, long, parse(from_os_str))]
    tc_script: Option<PathBuf>,

    /// Autonomous script to start immediately
    #[structopt(short, long, parse(from_os_str))]
    auto_script: Option<PathBuf>,

    /// Minimum log level, one of trace, debug or info
    #[structopt(short, long, default_value = "debug")]
    log_level: LevelFilter,

    /// Stop after this many seconds
    #[structopt(short, long)]
    duration_s: Option<f64>,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session =
        Session::new("swerve_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(opt.log_level, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Swerve Drive Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI options: {:?}", opt);

    // ---- LOAD PARAMETERS ----

    let exec_params: SwerveExecParams =
        util::params::load("swerve_exec.toml").wrap_err("Could not load exec params")?;

    let cycle_period_s = exec_params.cycle_period_s;
    let cycle_frequency_hz = 1.0 / cycle_period_s;

    info!("Exec parameters loaded");

    // ---- INITIALISE TC SOURCE ----

    let mut tc_script = match opt.tc_script {
        Some(ref path) => {
            info!("Loading TC script from {:?}", path);

            let si = ScriptInterpreter::new(path).wrap_err("Failed to load TC script")?;

            info!(
                "Loaded script lasts {:.02} s and contains {} TCs\n",
                si.get_duration(),
                si.get_num_tcs()
            );

            Some(si)
        }
        None => {
            info!("No TC script provided\n");
            None
        }
    };

    // ---- INITIALISE DATASTORE ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();

    // ---- INITIALISE MODULES ----

    ds.drive_ctrl
        .init("drive_ctrl.toml", &session)
        .wrap_err("Failed to initialise DriveCtrl")?;
    info!("DriveCtrl init complete");

    let [x_m, y_m, heading_rad] = exec_params.sim_start_pose;
    let mut sim = SimDrivetrain::new(
        &ds.drive_ctrl.params().swerve,
        &exec_params.sim,
        Pose::new(x_m, y_m, heading_rad),
    );
    info!("Simulated drivetrain init complete");

    let mut auto_mgr = AutoMgr::new(ds.drive_ctrl.handle(), exec_params.auto);

    if let Some(ref path) = opt.auto_script {
        auto_mgr
            .start_file(path, Box::new(LoggingSink::default()))
            .wrap_err("Failed to start the autonomous script")?;
    }

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let start_instant = Instant::now();
    let cycle_period = Duration::from_secs_f64(cycle_period_s);
    let mut last_cycle_s: Option<f64> = None;

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();
        let time_s = (cycle_start_instant - start_instant).as_secs_f64();

        if let Some(d) = opt.duration_s {
            if time_s > d {
                info!("Run duration of {:.02} s reached, stopping", d);
                break;
            }
        }

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start(cycle_frequency_hz);

        // ---- DATA INPUT ----

        if let Some(t) = last_cycle_s {
            sim.apply(
                &ds.drive_ctrl_output.map(|o| o.dems).unwrap_or_default(),
                time_s - t,
            );
        }
        last_cycle_s = Some(time_s);

        ds.drive_ctrl_input = sim.input_data(time_s);

        // ---- TELECOMMAND PROCESSING ----

        if let Some(ref mut si) = tc_script {
            match si.get_pending_tcs(time_s) {
                PendingTcs::None => (),
                PendingTcs::Some(tc_vec) => {
                    for tc in tc_vec.iter() {
                        // In safe mode only the make unsafe TC is processed
                        if ds.safe && *tc != comms_if::tc::Tc::MakeUnsafe {
                            warn!("In safe mode, ignoring TC {:?}", tc);
                            continue;
                        }
                        tc_processor::exec(&mut ds, tc);
                    }
                }
                // Exit once the script is over and no autonomous script is running
                PendingTcs::EndOfScript => {
                    if !auto_mgr.is_running() {
                        info!("End of TC script reached, stopping");
                        break;
                    }
                }
            }
        }

        // ---- AUTONOMY PROCESSING ----

        match ds.auto_cmd.take() {
            Some(AutoCmd::Run { script_path }) => {
                match auto_mgr.start_file(&script_path, Box::new(LoggingSink::default())) {
                    Ok(()) => info!("Autonomous script {:?} started", script_path),
                    Err(e) => warn!("Could not start autonomous script: {}", e),
                }
            }
            Some(AutoCmd::Kill) => auto_mgr.cancel(),
            None => (),
        }

        if let Some(res) = auto_mgr.poll() {
            match res {
                Ok(outcome) => info!("Autonomous script ended: {:?}", outcome),
                Err(e) => error!("Autonomous script failed: {}", e),
            }
        }

        // ---- CONTROL ALGORITHM PROCESSING ----

        match ds.drive_ctrl.proc(&ds.drive_ctrl_input) {
            Ok((o, r)) => {
                ds.drive_ctrl_output = Some(o);
                ds.drive_ctrl_status_rpt = r;
            }
            Err(e) => {
                // Errors here come from bad inputs, hold the wheels still and carry on
                warn!("Error during DriveCtrl processing: {}", e);
                ds.drive_ctrl_output = None;
            }
        };

        // ---- WRITE ARCHIVES ----

        if let Err(e) = ds.drive_ctrl.write() {
            warn!("Could not write DriveCtrl archives: {}", e);
        }

        if ds.is_1_hz_cycle {
            let pose = sim.pose();
            debug!(
                "Pose: ({:.3}, {:.3}) m, {:.3} rad, mode {:?}",
                pose.position_m[0],
                pose.position_m[1],
                pose.heading_rad,
                ds.drive_ctrl.handle().mode()
            );
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            }
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - cycle_period_s
                );
                ds.num_consec_cycle_overruns += 1;

                if ds.num_consec_cycle_overruns > exec_params.max_consec_cycle_overruns {
                    ds.make_safe(SafeModeCause::CycleOverruns);
                }
            }
        }

        ds.num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    if auto_mgr.is_running() {
        auto_mgr.cancel();
    }
    if let Some(Err(e)) = auto_mgr.join() {
        warn!("Autonomous script failed: {}", e);
    }

    info!("End of execution");

    Ok(())
}
