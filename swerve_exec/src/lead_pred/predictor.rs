//! Target lead predictor

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::Vector2;
use serde::Serialize;

// Internal
use super::{LeadPredError, LeadPredParams, TofParams};
use util::maths::get_ang_dist_pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Empirical projectile time of flight as a function of distance.
#[derive(Debug, Copy, Clone)]
pub struct TimeOfFlightModel {
    params: TofParams,
}

/// Lead predictor
#[derive(Debug, Clone)]
pub struct LeadPredictor {
    params: LeadPredParams,
    tof: TimeOfFlightModel,
    target_pos_m: Vector2<f64>,
}

/// Everything needed to aim and fire from the current state.
#[derive(Debug, Copy, Clone, Serialize)]
pub struct AimSolution {
    /// The aim point, i.e. the robot's position relative to the virtual target.
    ///
    /// Units: meters
    pub aim_point_m: Vector2<f64>,

    /// Distance to the virtual target, used to look up shooter speed and hood angle.
    ///
    /// Units: meters
    pub distance_m: f64,

    /// Units: seconds
    pub time_of_flight_s: f64,

    /// Field heading pointing from the robot towards the virtual target.
    ///
    /// Units: radians
    pub heading_rad: f64,

    /// Rate at which the aim heading is changing, used as heading feedforward.
    ///
    /// Units: radians/second
    pub heading_rate_rads: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TimeOfFlightModel {
    pub fn new(params: TofParams) -> Self {
        Self { params }
    }

    /// Time of flight to a target `distance_m` away.
    ///
    /// Units: seconds
    pub fn time_of_flight_s(&self, distance_m: f64) -> f64 {
        let p = &self.params;
        let slope = if distance_m < p.breakpoint_m {
            p.near_slope_spm
        } else {
            p.far_slope_spm
        };

        p.tof_at_breakpoint_s + slope * (distance_m - p.breakpoint_m)
    }
}

impl LeadPredictor {
    pub fn new(params: &LeadPredParams) -> Self {
        Self {
            params: params.clone(),
            tof: TimeOfFlightModel::new(params.tof),
            target_pos_m: Vector2::new(params.target_pos_m[0], params.target_pos_m[1]),
        }
    }

    pub fn tof_model(&self) -> &TimeOfFlightModel {
        &self.tof
    }

    /// Field position of the real target.
    pub fn target_pos_m(&self) -> Vector2<f64> {
        self.target_pos_m
    }

    /// Position of the robot relative to the target.
    pub fn relative_position(&self, robot_pos_m: &Vector2<f64>) -> Vector2<f64> {
        robot_pos_m - self.target_pos_m
    }

    /// Lookahead to use given the time since the last shot.
    ///
    /// Straight after a shot the lookahead is shortened so the prediction lines up with when the
    /// next ball leaves. Once the base lookahead has passed, or if nothing was fired, the base
    /// value is used.
    pub fn lookahead_s(&self, time_since_shot_s: Option<f64>) -> f64 {
        let base = self.params.base_lookahead_s;

        let lookahead = match time_since_shot_s {
            Some(t) => base - t,
            None => base,
        };

        if lookahead < 0.0 || !lookahead.is_finite() {
            base
        } else {
            lookahead
        }
    }

    /// Predict the aim point.
    ///
    /// # Inputs
    /// - `rel_pos_m`: position of the robot relative to the target
    /// - `vel_ms`: robot velocity, field frame
    /// - `accel_ms2`: robot acceleration, field frame
    /// - `lookahead_s`: how far in the future the ball will leave the robot
    ///
    /// # Outputs
    /// The robot position relative to the virtual target.
    pub fn predict_aim_point(
        &self,
        rel_pos_m: &Vector2<f64>,
        vel_ms: &Vector2<f64>,
        accel_ms2: &Vector2<f64>,
        lookahead_s: f64,
    ) -> Result<Vector2<f64>, LeadPredError> {
        check_finite(rel_pos_m, "relative position")?;
        check_finite(vel_ms, "velocity")?;
        check_finite(accel_ms2, "acceleration")?;
        if !lookahead_s.is_finite() {
            return Err(LeadPredError::NonFiniteInput("lookahead"));
        }
        if lookahead_s < 0.0 {
            return Err(LeadPredError::NegativeLookahead(lookahead_s));
        }

        // Where the robot will be, and how fast it will be going, when the ball leaves
        let proj = rel_pos_m + vel_ms * lookahead_s + accel_ms2 * (0.5 * lookahead_s * lookahead_s);
        let vel_at_launch = vel_ms + accel_ms2 * lookahead_s;

        let mut aim = proj;
        for _ in 0..self.params.num_iterations {
            let tof = self.tof.time_of_flight_s(aim.norm());
            aim = proj + vel_at_launch * tof;
        }

        trace!("Lead prediction: projected {:?}, aim {:?}", proj, aim);

        Ok(aim)
    }

    /// Solve for the full aim solution from the robot's field state.
    pub fn solve(
        &self,
        robot_pos_m: &Vector2<f64>,
        vel_ms: &Vector2<f64>,
        accel_ms2: &Vector2<f64>,
        lookahead_s: f64,
    ) -> Result<AimSolution, LeadPredError> {
        let rel = self.relative_position(robot_pos_m);
        let lookahead_s = lookahead_s + self.params.turn_delay_s;

        let aim = self.predict_aim_point(&rel, vel_ms, accel_ms2, lookahead_s)?;
        let future_aim = self.predict_aim_point(
            &rel,
            vel_ms,
            accel_ms2,
            lookahead_s + self.params.heading_rate_step_s,
        )?;

        let heading_rad = aim_heading(&aim);
        let heading_rate_rads = if self.params.heading_rate_step_s > 0.0 {
            get_ang_dist_pi(aim_heading(&future_aim), heading_rad)
                / self.params.heading_rate_step_s
        } else {
            0.0
        };

        let distance_m = aim.norm();

        Ok(AimSolution {
            aim_point_m: aim,
            distance_m,
            time_of_flight_s: self.tof.time_of_flight_s(distance_m),
            heading_rad,
            heading_rate_rads,
        })
    }
}

/// Heading from the robot towards the target, given the robot position relative to the target.
fn aim_heading(rel_pos_m: &Vector2<f64>) -> f64 {
    (-rel_pos_m[1]).atan2(-rel_pos_m[0])
}

fn check_finite(v: &Vector2<f64>, what: &'static str) -> Result<(), LeadPredError> {
    if v.iter().all(|x| x.is_finite()) {
        Ok(())
    } else {
        Err(LeadPredError::NonFiniteInput(what))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn pred() -> LeadPredictor {
        LeadPredictor::new(&LeadPredParams::default())
    }

    #[test]
    fn test_tof_continuous() {
        let m = TimeOfFlightModel::new(TofParams::default());
        let bp = TofParams::default().breakpoint_m;

        let below = m.time_of_flight_s(bp - 1e-9);
        let above = m.time_of_flight_s(bp + 1e-9);
        assert!((below - above).abs() < 1e-6);
        assert!((m.time_of_flight_s(bp) - 0.738).abs() < 1e-3);

        // Further is always slower
        assert!(m.time_of_flight_s(2.0) < m.time_of_flight_s(3.0));
        assert!(m.time_of_flight_s(4.0) < m.time_of_flight_s(6.0));
    }

    #[test]
    fn test_stationary() {
        let p = pred();
        let rel = Vector2::new(-4.0, 1.5);

        let aim = p
            .predict_aim_point(&rel, &Vector2::zeros(), &Vector2::zeros(), 0.15)
            .unwrap();
        assert_eq!(aim, rel);
    }

    #[test]
    fn test_self_consistent() {
        let p = pred();
        let rel = Vector2::new(-5.0, 2.0);
        let vel = Vector2::new(1.5, -2.0);
        let accel = Vector2::new(0.5, 0.0);
        let t = 0.1;

        let aim = p.predict_aim_point(&rel, &vel, &accel, t).unwrap();

        let proj = rel + vel * t + accel * (0.5 * t * t);
        let v_launch = vel + accel * t;
        let tof = p.tof_model().time_of_flight_s(aim.norm());
        assert!((aim - (proj + v_launch * tof)).norm() < 1e-9);
    }

    #[test]
    fn test_lead_direction() {
        let p = pred();

        // Robot 4 m behind the target driving across it, the virtual target shifts the other way
        let robot = Vector2::new(4.25, 0.0);
        let sol = p
            .solve(&robot, &Vector2::new(0.0, 2.0), &Vector2::zeros(), 0.0)
            .unwrap();

        assert!(sol.aim_point_m[1] > 0.0);
        assert!(sol.heading_rad < 0.0);
        assert!((sol.time_of_flight_s - p.tof_model().time_of_flight_s(sol.distance_m)).abs() < 1e-12);

        // Driving across the target the aim heading keeps swinging
        assert!(sol.heading_rate_rads < 0.0);
    }

    #[test]
    fn test_heading_at_rest() {
        let p = pred();
        let sol = p
            .solve(&Vector2::new(4.25, 4.0), &Vector2::zeros(), &Vector2::zeros(), 0.15)
            .unwrap();

        // Facing from (4.25, 4) towards (8.25, 0)
        assert!((sol.heading_rad - (-std::f64::consts::FRAC_PI_4)).abs() < 1e-12);
        assert!(sol.heading_rate_rads.abs() < 1e-12);
        assert!((sol.distance_m - 32f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_lookahead() {
        let p = pred();
        assert_eq!(p.lookahead_s(None), 0.15);
        assert!((p.lookahead_s(Some(0.05)) - 0.1).abs() < 1e-12);
        assert_eq!(p.lookahead_s(Some(1.0)), 0.15);
    }

    #[test]
    fn test_invalid() {
        let p = pred();
        let z = Vector2::zeros();
        assert!(p
            .predict_aim_point(&Vector2::new(f64::NAN, 0.0), &z, &z, 0.1)
            .is_err());
        assert!(matches!(
            p.predict_aim_point(&z, &z, &z, -1.0),
            Err(LeadPredError::NegativeLookahead(_))
        ));
    }
}
