use posekit_3d::transforms::{rotation_matrix_from_xyz, RigidTransform};
use serde::{Deserialize, Serialize};

/// Size of one keyboard nudge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementStep {
    /// Translation per nudge in meters.
    pub distance_meters: f64,
    /// Rotation per nudge in degrees.
    pub angle_degrees: f64,
}

impl MovementStep {
    /// Step in use before any modifier key has been touched.
    pub const INITIAL: Self = Self::new(0.002, 1.0);

    /// Step with the coarse modifier released.
    pub const FINE: Self = Self::new(0.01, 2.0);

    /// Step with the coarse modifier held.
    pub const COARSE: Self = Self::new(0.05, 90.0);

    /// Create a new movement step.
    pub const fn new(distance_meters: f64, angle_degrees: f64) -> Self {
        Self {
            distance_meters,
            angle_degrees,
        }
    }
}

/// The three movement step sizes an operator switches between.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementSteps {
    /// Step in use before the coarse modifier is first used.
    pub initial: MovementStep,
    /// Step after the coarse modifier is released.
    pub fine: MovementStep,
    /// Step while the coarse modifier is held.
    pub coarse: MovementStep,
}

impl Default for MovementSteps {
    fn default() -> Self {
        Self {
            initial: MovementStep::INITIAL,
            fine: MovementStep::FINE,
            coarse: MovementStep::COARSE,
        }
    }
}

/// A camera frame axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Pointing right in the image.
    X,
    /// Pointing down in the image.
    Y,
    /// Pointing away from the camera.
    Z,
}

impl Axis {
    fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// A single keyboard nudge along or about a camera axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nudge {
    /// Translate along the axis.
    Translate {
        /// The axis to move along.
        axis: Axis,
        /// Move towards the positive direction.
        positive: bool,
    },
    /// Rotate about the axis through the object centre.
    Rotate {
        /// The axis to rotate about.
        axis: Axis,
        /// Rotate counter-clockwise, looking down the axis.
        positive: bool,
    },
}

impl Nudge {
    /// The camera frame motion of this nudge.
    ///
    /// Rotations pivot about `pivot`, the current centre of the object in the camera frame:
    /// `T(pivot) · R · T(-pivot)` with `R = Rx Ry Rz`.
    pub fn incremental(&self, step: &MovementStep, pivot: [f64; 3]) -> RigidTransform {
        match *self {
            Nudge::Translate { axis, positive } => {
                let mut translation = [0.0; 3];
                translation[axis.index()] = signed(step.distance_meters, positive);
                RigidTransform::from_translation(translation)
            }
            Nudge::Rotate { axis, positive } => {
                let mut angles = [0.0; 3];
                angles[axis.index()] = signed(step.angle_degrees.to_radians(), positive);
                RigidTransform::rotation_about(rotation_matrix_from_xyz(&angles), pivot)
            }
        }
    }
}

fn signed(value: f64, positive: bool) -> f64 {
    if positive {
        value
    } else {
        -value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_step_constants() {
        assert_eq!(MovementStep::INITIAL, MovementStep::new(0.002, 1.0));
        assert_eq!(MovementStep::FINE, MovementStep::new(0.01, 2.0));
        assert_eq!(MovementStep::COARSE, MovementStep::new(0.05, 90.0));
        assert_eq!(MovementSteps::default().initial, MovementStep::INITIAL);
    }

    #[test]
    fn test_translate_nudge() {
        let nudge = Nudge::Translate {
            axis: Axis::Y,
            positive: false,
        };
        let t = nudge.incremental(&MovementStep::FINE, [5.0, 5.0, 5.0]);
        assert_eq!(t, RigidTransform::from_translation([0.0, -0.01, 0.0]));
    }

    #[test]
    fn test_rotate_nudge_keeps_pivot_fixed() {
        let pivot = [0.1, -0.2, 0.8];
        let nudge = Nudge::Rotate {
            axis: Axis::Z,
            positive: true,
        };
        let t = nudge.incremental(&MovementStep::COARSE, pivot);

        let moved = t.transform_point(&pivot);
        for i in 0..3 {
            assert_relative_eq!(moved[i], pivot[i], epsilon = 1e-12);
        }

        // a point one unit right of the pivot ends up one unit below it (y down)
        let p = t.transform_point(&[pivot[0] + 1.0, pivot[1], pivot[2]]);
        assert_relative_eq!(p[0], pivot[0], epsilon = 1e-12);
        assert_relative_eq!(p[1], pivot[1] + 1.0, epsilon = 1e-12);
        assert!(t.is_proper(1e-12));
    }
}
