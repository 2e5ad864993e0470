//! # Trajectory
//!
//! A trajectory is an ordered, immutable list of time stamped samples. It is built once, then
//! shared read-only between the follower and the autonomous executor for one path.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::Serialize;

// Internal
use super::TrajError;
use crate::ctrl::{ProfileConstraints, ProfileState, TrapezoidProfile};
use crate::loc::Pose;
use comms_if::auto::TrajectoryState;
use util::maths::{get_ang_dist_pi, lerp};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Time between samples of generated trajectories.
///
/// Units: seconds
const GEN_SAMPLE_PERIOD_S: f64 = 0.02;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single sample of a trajectory.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct TrajectorySample {
    /// Time since the start of the trajectory.
    ///
    /// Units: seconds
    pub time_s: f64,

    /// Target pose. The heading is the direction of travel.
    pub pose: Pose,

    /// Units: meters/second
    pub velocity_ms: f64,

    /// Units: meters/second^2
    pub accel_ms2: f64,

    /// Units: radians/meter
    pub curvature_radpm: f64,
}

/// A time parameterised trajectory.
#[derive(Debug, Clone)]
pub struct Trajectory {
    samples: Vec<TrajectorySample>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrajectorySample {
    fn is_finite(&self) -> bool {
        self.time_s.is_finite()
            && self.pose.is_finite()
            && self.velocity_ms.is_finite()
            && self.accel_ms2.is_finite()
            && self.curvature_radpm.is_finite()
    }

    /// Linearly interpolate between `self` and `other` by the fraction `t`.
    fn interpolate(&self, other: &Self, t: f64) -> Self {
        let dh = get_ang_dist_pi(other.pose.heading_rad, self.pose.heading_rad);
        let pos = self.pose.position_m + (other.pose.position_m - self.pose.position_m) * t;

        Self {
            time_s: lerp(self.time_s, other.time_s, t),
            pose: Pose::new(pos[0], pos[1], self.pose.heading_rad + dh * t),
            velocity_ms: lerp(self.velocity_ms, other.velocity_ms, t),
            accel_ms2: lerp(self.accel_ms2, other.accel_ms2, t),
            curvature_radpm: lerp(self.curvature_radpm, other.curvature_radpm, t),
        }
    }
}

impl From<&TrajectoryState> for TrajectorySample {
    fn from(s: &TrajectoryState) -> Self {
        Self {
            time_s: s.time_s,
            pose: Pose::new(s.x_m, s.y_m, s.heading_deg.to_radians()),
            velocity_ms: s.velocity_ms,
            accel_ms2: s.accel_ms2,
            curvature_radpm: s.curvature_radpm,
        }
    }
}

impl Trajectory {
    /// Create a new trajectory, checking that the samples are finite and strictly increasing in
    /// time.
    pub fn new(samples: Vec<TrajectorySample>) -> Result<Self, TrajError> {
        if samples.is_empty() {
            return Err(TrajError::Empty);
        }

        for (i, s) in samples.iter().enumerate() {
            if !s.is_finite() {
                return Err(TrajError::NonFinite(i));
            }
            if i > 0 && s.time_s <= samples[i - 1].time_s {
                return Err(TrajError::NonMonotonicTime(i));
            }
        }

        Ok(Self { samples })
    }

    /// Build a trajectory from the states of an autonomous script.
    pub fn from_states(states: &[TrajectoryState]) -> Result<Self, TrajError> {
        Self::new(states.iter().map(TrajectorySample::from).collect())
    }

    /// Generate a straight line trajectory from `start_m` to `end_m`, following a trapezoidal
    /// speed profile which starts and ends at rest.
    pub fn straight_line(
        start_m: Vector2<f64>,
        end_m: Vector2<f64>,
        max_vel_ms: f64,
        max_accel_ms2: f64,
    ) -> Result<Self, TrajError> {
        let constraints = ProfileConstraints::new(max_vel_ms, max_accel_ms2);
        if !constraints.is_valid() {
            return Err(TrajError::GenerationError(format!(
                "invalid constraints {:?}",
                constraints
            )));
        }

        let delta = end_m - start_m;
        let dist_m = delta.norm();
        if !(dist_m > 0.0) {
            return Err(TrajError::GenerationError(
                "start and end points are identical".into(),
            ));
        }

        let dir = delta / dist_m;
        let heading_rad = dir[1].atan2(dir[0]);
        let profile = TrapezoidProfile::new(
            constraints,
            ProfileState {
                position: dist_m,
                velocity: 0.0,
            },
            ProfileState::default(),
        );

        let total_s = profile.total_time_s();
        let num_samples = (total_s / GEN_SAMPLE_PERIOD_S).ceil() as usize;

        let mut samples: Vec<TrajectorySample> = (0..=num_samples)
            .map(|i| {
                let t = (i as f64 * GEN_SAMPLE_PERIOD_S).min(total_s);
                let s = profile.calculate(t);
                let p = start_m + dir * s.position;

                TrajectorySample {
                    time_s: t,
                    pose: Pose::new(p[0], p[1], heading_rad),
                    velocity_ms: s.velocity,
                    accel_ms2: 0.0,
                    curvature_radpm: 0.0,
                }
            })
            .collect();

        // The last step can be clamped onto the end time
        samples.dedup_by(|next, prev| next.time_s <= prev.time_s);

        // Acceleration from the velocity differences
        for i in 0..samples.len() - 1 {
            samples[i].accel_ms2 = (samples[i + 1].velocity_ms - samples[i].velocity_ms)
                / (samples[i + 1].time_s - samples[i].time_s);
        }

        Self::new(samples)
    }

    /// Duration of the trajectory.
    ///
    /// Units: seconds
    pub fn duration_s(&self) -> f64 {
        self.samples.last().map(|s| s.time_s).unwrap_or(0.0)
    }

    pub fn samples(&self) -> &[TrajectorySample] {
        &self.samples
    }

    pub fn initial_pose(&self) -> Pose {
        self.samples[0].pose
    }

    /// Sample the trajectory at `time_s`, interpolating between the neighbouring samples.
    ///
    /// Times outside the trajectory return the first or last sample.
    pub fn sample(&self, time_s: f64) -> TrajectorySample {
        let first = self.samples[0];
        let last = self.samples[self.samples.len() - 1];

        if !(time_s > first.time_s) {
            return first;
        }
        if time_s >= last.time_s {
            return last;
        }

        // Index of the first sample at or after the time, which is at least 1 here
        let hi = self.samples.partition_point(|s| s.time_s < time_s);
        let a = &self.samples[hi - 1];
        let b = &self.samples[hi];

        a.interpolate(b, (time_s - a.time_s) / (b.time_s - a.time_s))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample(t: f64, x: f64, v: f64) -> TrajectorySample {
        TrajectorySample {
            time_s: t,
            pose: Pose::new(x, 0.0, 0.0),
            velocity_ms: v,
            accel_ms2: 0.0,
            curvature_radpm: 0.0,
        }
    }

    #[test]
    fn test_validation() {
        assert_eq!(Trajectory::new(vec![]).unwrap_err(), TrajError::Empty);
        assert_eq!(
            Trajectory::new(vec![sample(0.0, 0.0, 0.0), sample(0.0, 1.0, 0.0)]).unwrap_err(),
            TrajError::NonMonotonicTime(1)
        );
        assert_eq!(
            Trajectory::new(vec![sample(0.0, f64::NAN, 0.0)]).unwrap_err(),
            TrajError::NonFinite(0)
        );
    }

    #[test]
    fn test_sample() {
        let traj = Trajectory::new(vec![
            sample(0.0, 0.0, 0.0),
            sample(1.0, 1.0, 2.0),
            sample(3.0, 2.0, 0.0),
        ])
        .unwrap();

        assert_eq!(traj.duration_s(), 3.0);
        assert_eq!(traj.sample(-1.0).pose.position_m[0], 0.0);
        assert_eq!(traj.sample(10.0).pose.position_m[0], 2.0);

        let s = traj.sample(0.5);
        assert!((s.pose.position_m[0] - 0.5).abs() < 1e-12);
        assert!((s.velocity_ms - 1.0).abs() < 1e-12);

        let s = traj.sample(2.0);
        assert!((s.pose.position_m[0] - 1.5).abs() < 1e-12);
        assert_eq!(traj.sample(1.0).velocity_ms, 2.0);
    }

    #[test]
    fn test_heading_interpolation_wraps() {
        let mut a = sample(0.0, 0.0, 0.0);
        let mut b = sample(1.0, 0.0, 0.0);
        a.pose.heading_rad = 170f64.to_radians();
        b.pose.heading_rad = (-170f64).to_radians();

        let traj = Trajectory::new(vec![a, b]).unwrap();
        let h = traj.sample(0.5).pose.heading_rad;
        assert!((h.abs() - std::f64::consts::PI).abs() < 1e-9);
    }

    #[test]
    fn test_straight_line() {
        let traj =
            Trajectory::straight_line(Vector2::new(1.0, 1.0), Vector2::new(1.0, 4.0), 1.0, 1.0)
                .unwrap();

        // 1 s up to speed, 2 s cruise, 1 s down
        assert!((traj.duration_s() - 4.0).abs() < 1e-9);

        let end = traj.sample(traj.duration_s());
        assert!((end.pose.position_m - Vector2::new(1.0, 4.0)).norm() < 1e-9);
        assert!((end.pose.heading_rad - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert!(end.velocity_ms.abs() < 1e-9);

        let mid = traj.sample(1.5);
        assert!((mid.velocity_ms - 1.0).abs() < 1e-9);
        assert!(traj.sample(0.5).accel_ms2 > 0.0);

        assert!(Trajectory::straight_line(Vector2::zeros(), Vector2::zeros(), 1.0, 1.0).is_err());
        assert!(
            Trajectory::straight_line(Vector2::zeros(), Vector2::new(1.0, 0.0), 0.0, 1.0).is_err()
        );
    }
}
