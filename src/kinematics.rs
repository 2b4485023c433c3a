//! Two-segment leg inverse kinematics for a quadruped.
//!
//! A leg is an upper segment on the hip servo and a lower segment on the
//! knee servo. Given where the foot should be relative to the hip shaft
//! (`x` forward, `h` down), the law of cosines gives both joint angles.
//!
//! Targets the leg cannot reach are reported as
//! [`KinematicsError::Unreachable`] instead of producing NaN angles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which corner of the robot a leg is on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Leg {
    FrontLeft,
    FrontRight,
    RearLeft,
    RearRight,
}

impl Leg {
    pub fn is_front(self) -> bool {
        matches!(self, Leg::FrontLeft | Leg::FrontRight)
    }
}

/// Servo angles in whole degrees.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct JointAngles {
    pub hip: i32,
    pub knee: i32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum KinematicsError {
    /// The foot target is closer or further than the leg can fold or stretch.
    Unreachable { distance: f64, min: f64, max: f64 },
    /// Segment lengths must be positive and finite.
    InvalidGeometry,
}

impl fmt::Display for KinematicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KinematicsError::Unreachable { distance, min, max } => write!(
                f,
                "target at distance {distance:.2} is outside reach {min:.2}..={max:.2}"
            ),
            KinematicsError::InvalidGeometry => write!(f, "leg segment lengths must be positive"),
        }
    }
}

impl std::error::Error for KinematicsError {}

/// Segment lengths of one leg, in any consistent unit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LegGeometry {
    pub upper: f64,
    pub lower: f64,
}

impl LegGeometry {
    pub fn new(upper: f64, lower: f64) -> Self {
        Self { upper, lower }
    }

    fn validate(&self) -> Result<(), KinematicsError> {
        let ok = |l: f64| l.is_finite() && l > 0.0;
        if ok(self.upper) && ok(self.lower) {
            Ok(())
        } else {
            Err(KinematicsError::InvalidGeometry)
        }
    }

    /// Closest and furthest foot distance from the hip shaft.
    pub fn reach(&self) -> (f64, f64) {
        ((self.upper - self.lower).abs(), self.upper + self.lower)
    }

    /// Hip and knee angles in radians, unrounded.
    pub fn solve_radians(&self, x: f64, h: f64) -> Result<(f64, f64), KinematicsError> {
        self.validate()?;

        let b2 = x * x + h * h;
        let b = b2.sqrt();
        let (min, max) = self.reach();
        if !b.is_finite() || b == 0.0 || b < min || b > max {
            return Err(KinematicsError::Unreachable {
                distance: b,
                min,
                max,
            });
        }

        let (u, l) = (self.upper, self.lower);
        // Rounding can push a boundary target a hair past +-1.
        let hip_cos = ((u * u - l * l + b2) / (2.0 * u * b)).clamp(-1.0, 1.0);
        let knee_cos = ((u * u + l * l - b2) / (2.0 * u * l)).clamp(-1.0, 1.0);

        let hip = h.atan2(x) + hip_cos.acos();
        let knee = knee_cos.acos();
        Ok((hip, knee))
    }

    /// Hip and knee angles for a foot at `(x, h)`, in whole degrees.
    pub fn solve(&self, x: f64, h: f64) -> Result<JointAngles, KinematicsError> {
        let (hip, knee) = self.solve_radians(x, h)?;
        Ok(JointAngles {
            hip: hip.to_degrees().round() as i32,
            knee: knee.to_degrees().round() as i32,
        })
    }

    /// [`Self::solve`] with the hip zero point mirrored for rear legs.
    pub fn solve_for(&self, leg: Leg, x: f64, h: f64) -> Result<JointAngles, KinematicsError> {
        let angles = self.solve(x, h)?;
        if leg.is_front() {
            Ok(angles)
        } else {
            Ok(JointAngles {
                hip: 180 - angles.hip,
                knee: angles.knee,
            })
        }
    }

    /// Foot position for the given joint angles in radians.
    ///
    /// `knee` is the inner angle between the segments, so a straight leg
    /// has `knee = PI`.
    pub fn forward_radians(&self, hip: f64, knee: f64) -> (f64, f64) {
        let elbow = (self.upper * hip.cos(), self.upper * hip.sin());
        let lower_dir = hip - std::f64::consts::PI + knee;
        (
            elbow.0 + self.lower * lower_dir.cos(),
            elbow.1 + self.lower * lower_dir.sin(),
        )
    }

    /// [`Self::forward_radians`] for whole-degree angles.
    pub fn forward(&self, angles: JointAngles) -> (f64, f64) {
        self.forward_radians(
            (angles.hip as f64).to_radians(),
            (angles.knee as f64).to_radians(),
        )
    }
}

/// Servo pulse width in microseconds for an angle, 0-180 degrees.
pub fn servo_pulse_us(degrees: i32) -> u32 {
    let degrees = degrees.clamp(0, 180) as u32;
    500 + degrees * 1000 / 90
}
