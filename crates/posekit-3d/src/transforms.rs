use crate::linalg;

/// Compute the rotation matrix from an axis and angle.
///
/// # Arguments
///
/// * `axis` - The axis of rotation, normalized internally.
/// * `angle` - The angle of rotation in radians.
///
/// # Returns
///
/// The rotation matrix.
///
/// Example:
///
/// ```
/// use posekit_3d::transforms::axis_angle_to_rotation_matrix;
///
/// let axis = [1.0, 0.0, 0.0];
/// let angle = std::f64::consts::PI / 2.0;
/// let rotation = axis_angle_to_rotation_matrix(&axis, angle).unwrap();
/// assert!((rotation[1][2] + 1.0).abs() < 1e-12);
/// ```
pub fn axis_angle_to_rotation_matrix(
    axis: &[f64; 3],
    angle: f64,
) -> Result<[[f64; 3]; 3], &'static str> {
    // normalize the vector
    let axis_norm = {
        let magnitude = (axis[0].powi(2) + axis[1].powi(2) + axis[2].powi(2)).sqrt();
        match magnitude < 1e-10 {
            true => return Err("cannot compute rotation matrix from a zero vector"),
            false => [
                axis[0] / magnitude,
                axis[1] / magnitude,
                axis[2] / magnitude,
            ],
        }
    };

    let x = axis_norm[0];
    let y = axis_norm[1];
    let z = axis_norm[2];

    let c = angle.cos();
    let s = angle.sin();
    let t = 1.0 - c;

    let m00 = c + x * x * t;
    let m11 = c + y * y * t;
    let m22 = c + z * z * t;

    let tmp1 = x * y * t;
    let tmp2 = z * s;

    let m10 = tmp1 + tmp2;
    let m01 = tmp1 - tmp2;

    let tmp3 = x * z * t;
    let tmp4 = y * s;

    let m20 = tmp3 - tmp4;
    let m02 = tmp3 + tmp4;

    let tmp5 = y * z * t;
    let tmp6 = x * s;

    let m12 = tmp5 - tmp6;
    let m21 = tmp5 + tmp6;

    Ok([[m00, m01, m02], [m10, m11, m12], [m20, m21, m22]])
}

/// Rotation about the x axis.
pub fn rotation_x(angle: f64) -> [[f64; 3]; 3] {
    let (s, c) = angle.sin_cos();
    [[1.0, 0.0, 0.0], [0.0, c, -s], [0.0, s, c]]
}

/// Rotation about the y axis.
pub fn rotation_y(angle: f64) -> [[f64; 3]; 3] {
    let (s, c) = angle.sin_cos();
    [[c, 0.0, s], [0.0, 1.0, 0.0], [-s, 0.0, c]]
}

/// Rotation about the z axis.
pub fn rotation_z(angle: f64) -> [[f64; 3]; 3] {
    let (s, c) = angle.sin_cos();
    [[c, -s, 0.0], [s, c, 0.0], [0.0, 0.0, 1.0]]
}

/// Rotation matrix from xyz euler angles, `R = Rx(rx) * Ry(ry) * Rz(rz)`.
pub fn rotation_matrix_from_xyz(angles: &[f64; 3]) -> [[f64; 3]; 3] {
    let mut rxy = [[0.0; 3]; 3];
    linalg::matmul33(&rotation_x(angles[0]), &rotation_y(angles[1]), &mut rxy);
    let mut r = [[0.0; 3]; 3];
    linalg::matmul33(&rxy, &rotation_z(angles[2]), &mut r);
    r
}

/// Rotation matrix from zyx euler angles, `R = Rz(rz) * Ry(ry) * Rx(rx)`.
pub fn rotation_matrix_from_zyx(angles: &[f64; 3]) -> [[f64; 3]; 3] {
    let mut rzy = [[0.0; 3]; 3];
    linalg::matmul33(&rotation_z(angles[2]), &rotation_y(angles[1]), &mut rzy);
    let mut r = [[0.0; 3]; 3];
    linalg::matmul33(&rzy, &rotation_x(angles[0]), &mut r);
    r
}

/// A rigid motion `[[R, t], [0, 0, 0, 1]]` with `R` a proper rotation and `t` in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform {
    /// Rotation matrix, row-major.
    pub rotation: [[f64; 3]; 3],
    /// Translation vector.
    pub translation: [f64; 3],
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl RigidTransform {
    /// The identity motion.
    pub const IDENTITY: Self = Self {
        rotation: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        translation: [0.0, 0.0, 0.0],
    };

    /// Create a transform from a rotation matrix and a translation vector.
    pub fn new(rotation: [[f64; 3]; 3], translation: [f64; 3]) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// A pure translation.
    pub fn from_translation(translation: [f64; 3]) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// A pure rotation.
    pub fn from_rotation(rotation: [[f64; 3]; 3]) -> Self {
        Self {
            rotation,
            ..Self::IDENTITY
        }
    }

    /// A rotation about `pivot`: move the pivot to the origin, rotate, move back.
    pub fn rotation_about(rotation: [[f64; 3]; 3], pivot: [f64; 3]) -> Self {
        let t_pos = Self::from_translation(pivot);
        let t_neg = Self::from_translation([-pivot[0], -pivot[1], -pivot[2]]);
        t_pos
            .compose(&Self::from_rotation(rotation))
            .compose(&t_neg)
    }

    /// Build the transform from a 4x4 homogeneous matrix, the last row is ignored.
    pub fn from_matrix(m: &[[f64; 4]; 4]) -> Self {
        let mut rotation = [[0.0; 3]; 3];
        let mut translation = [0.0; 3];
        for i in 0..3 {
            rotation[i].copy_from_slice(&m[i][..3]);
            translation[i] = m[i][3];
        }
        Self {
            rotation,
            translation,
        }
    }

    /// The 4x4 homogeneous matrix of the transform.
    pub fn to_matrix(&self) -> [[f64; 4]; 4] {
        let mut m = [[0.0; 4]; 4];
        for i in 0..3 {
            m[i][..3].copy_from_slice(&self.rotation[i]);
            m[i][3] = self.translation[i];
        }
        m[3][3] = 1.0;
        m
    }

    /// Matrix product `self * other`, i.e. apply `other` first and then `self`.
    pub fn compose(&self, other: &Self) -> Self {
        let mut rotation = [[0.0; 3]; 3];
        linalg::matmul33(&self.rotation, &other.rotation, &mut rotation);
        let rt = linalg::matvec33(&self.rotation, &other.translation);
        Self {
            rotation,
            translation: [
                rt[0] + self.translation[0],
                rt[1] + self.translation[1],
                rt[2] + self.translation[2],
            ],
        }
    }

    /// The inverse motion `[[R^T, -R^T t], [0, 1]]`.
    pub fn inverse(&self) -> Self {
        let rotation = linalg::transpose33(&self.rotation);
        let t = linalg::matvec33(&rotation, &self.translation);
        Self {
            rotation,
            translation: [-t[0], -t[1], -t[2]],
        }
    }

    /// Apply the transform to a single point.
    pub fn transform_point(&self, point: &[f64; 3]) -> [f64; 3] {
        let p = linalg::matvec33(&self.rotation, point);
        [
            p[0] + self.translation[0],
            p[1] + self.translation[1],
            p[2] + self.translation[2],
        ]
    }

    /// Rotate a direction vector, the translation is not applied.
    pub fn rotate_vector(&self, vector: &[f64; 3]) -> [f64; 3] {
        linalg::matvec33(&self.rotation, vector)
    }

    /// Apply the transform to a set of points.
    pub fn transform_points(&self, points: &[[f64; 3]]) -> Vec<[f64; 3]> {
        let mut dst_points = vec![[0.0; 3]; points.len()];
        linalg::transform_points(points, &self.rotation, &self.translation, &mut dst_points);
        dst_points
    }

    /// Whether the rotation is orthonormal with determinant +1 within `tolerance`.
    pub fn is_proper(&self, tolerance: f64) -> bool {
        let mut rtr = [[0.0; 3]; 3];
        linalg::matmul33(
            &linalg::transpose33(&self.rotation),
            &self.rotation,
            &mut rtr,
        );
        let orthonormal = (0..3).all(|i| {
            (0..3).all(|j| {
                let expected = if i == j { 1.0 } else { 0.0 };
                (rtr[i][j] - expected).abs() <= tolerance
            })
        });
        orthonormal && (linalg::det33(&self.rotation) - 1.0).abs() <= tolerance
    }

    /// Largest absolute element-wise difference with `other`.
    pub fn max_abs_diff(&self, other: &Self) -> f64 {
        let mut diff = 0.0f64;
        for i in 0..3 {
            for j in 0..3 {
                diff = diff.max((self.rotation[i][j] - other.rotation[i][j]).abs());
            }
            diff = diff.max((self.translation[i] - other.translation[i]).abs());
        }
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_axis_angle_to_rotation_matrix() -> Result<(), Box<dyn std::error::Error>> {
        let axis = [1.0, 0.0, 0.0];
        let angle = std::f64::consts::PI / 2.0;
        let rotation = axis_angle_to_rotation_matrix(&axis, angle)?;
        let expected = [[1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]];
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(rotation[i][j], expected[i][j], epsilon = 1e-12);
            }
        }
        Ok(())
    }

    #[test]
    fn test_axis_angle_zero_axis() {
        assert!(axis_angle_to_rotation_matrix(&[0.0, 0.0, 0.0], 1.0).is_err());
    }

    #[test]
    fn test_rotation_matrix_from_xyz_single_axis() -> Result<(), Box<dyn std::error::Error>> {
        let angle = 0.3;
        let from_euler = rotation_matrix_from_xyz(&[0.0, angle, 0.0]);
        let from_axis = axis_angle_to_rotation_matrix(&[0.0, 1.0, 0.0], angle)?;
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(from_euler[i][j], from_axis[i][j], epsilon = 1e-12);
            }
        }
        Ok(())
    }

    #[test]
    fn test_rotation_orders_differ() {
        let angles = [0.2, -0.4, 0.7];
        let xyz = RigidTransform::from_rotation(rotation_matrix_from_xyz(&angles));
        let zyx = RigidTransform::from_rotation(rotation_matrix_from_zyx(&angles));
        assert!(xyz.is_proper(1e-12));
        assert!(zyx.is_proper(1e-12));
        assert!(xyz.max_abs_diff(&zyx) > 1e-3);
    }

    #[test]
    fn test_compose_and_inverse() {
        let a = RigidTransform::new(rotation_matrix_from_xyz(&[0.1, 0.2, 0.3]), [1.0, -2.0, 0.5]);
        let identity = a.compose(&a.inverse());
        assert!(identity.max_abs_diff(&RigidTransform::IDENTITY) < 1e-12);
    }

    #[test]
    fn test_compose_order() {
        let translate = RigidTransform::from_translation([1.0, 0.0, 0.0]);
        let rotate = RigidTransform::from_rotation(rotation_z(std::f64::consts::FRAC_PI_2));

        // rotate first, then translate
        let p = translate.compose(&rotate).transform_point(&[1.0, 0.0, 0.0]);
        assert_relative_eq!(p[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(p[1], 1.0, epsilon = 1e-12);

        // translate first, then rotate
        let p = rotate.compose(&translate).transform_point(&[1.0, 0.0, 0.0]);
        assert_relative_eq!(p[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(p[1], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_matrix_roundtrip() {
        let a = RigidTransform::new(rotation_matrix_from_xyz(&[0.5, 0.0, -0.1]), [0.1, 0.2, 0.3]);
        let m = a.to_matrix();
        assert_eq!(m[3], [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(RigidTransform::from_matrix(&m), a);
    }

    #[test]
    fn test_rotation_about_pivot_keeps_pivot() {
        let pivot = [0.3, -0.2, 1.0];
        let t = RigidTransform::rotation_about(rotation_matrix_from_xyz(&[0.0, 0.0, 1.2]), pivot);
        let p = t.transform_point(&pivot);
        for i in 0..3 {
            assert_relative_eq!(p[i], pivot[i], epsilon = 1e-12);
        }
    }
}
