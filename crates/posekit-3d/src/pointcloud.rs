use glam::DVec3;

use crate::transforms::RigidTransform;

/// Error types for point cloud construction.
#[derive(Debug, thiserror::Error)]
pub enum PointCloudError {
    /// The number of attributes does not match the number of points.
    #[error("Point cloud has {points} points but {attribute} has {len} entries")]
    AttributeMismatch {
        /// Number of points.
        points: usize,
        /// Name of the mismatched attribute.
        attribute: &'static str,
        /// Number of entries in the attribute.
        len: usize,
    },
}

/// A point cloud with points, colors, and normals.
#[derive(Debug, Clone, Default)]
pub struct PointCloud {
    // The points in the point cloud.
    points: Vec<[f64; 3]>,
    // The colors of the points.
    colors: Option<Vec<[u8; 3]>>,
    // The normals of the points.
    normals: Option<Vec<[f64; 3]>>,
}

impl PointCloud {
    /// Create a new point cloud from points, colors (optional), and normals (optional).
    pub fn new(
        points: Vec<[f64; 3]>,
        colors: Option<Vec<[u8; 3]>>,
        normals: Option<Vec<[f64; 3]>>,
    ) -> Self {
        Self {
            points,
            colors,
            normals,
        }
    }

    /// Create a new point cloud checking that the optional attributes match the points.
    pub fn try_new(
        points: Vec<[f64; 3]>,
        colors: Option<Vec<[u8; 3]>>,
        normals: Option<Vec<[f64; 3]>>,
    ) -> Result<Self, PointCloudError> {
        if let Some(colors) = &colors {
            check_len(points.len(), "colors", colors.len())?;
        }
        if let Some(normals) = &normals {
            check_len(points.len(), "normals", normals.len())?;
        }
        Ok(Self::new(points, colors, normals))
    }

    /// Get the number of points in the point cloud.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the point cloud is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Get as reference the points in the point cloud.
    pub fn points(&self) -> &Vec<[f64; 3]> {
        &self.points
    }

    /// Get as reference the colors of the points in the point cloud.
    pub fn colors(&self) -> Option<&Vec<[u8; 3]>> {
        self.colors.as_ref()
    }

    /// Get as reference the normals of the points in the point cloud.
    pub fn normals(&self) -> Option<&Vec<[f64; 3]>> {
        self.normals.as_ref()
    }

    /// Whether the point cloud carries one normal per point.
    pub fn has_normals(&self) -> bool {
        self.normals
            .as_ref()
            .is_some_and(|normals| normals.len() == self.points.len())
    }

    /// Replace the normals of the point cloud.
    pub fn set_normals(&mut self, normals: Vec<[f64; 3]>) -> Result<(), PointCloudError> {
        check_len(self.points.len(), "normals", normals.len())?;
        self.normals = Some(normals);
        Ok(())
    }

    /// Normalize all normals to unit length, zero normals are left untouched.
    pub fn normalize_normals(&mut self) {
        if let Some(normals) = self.normals.as_mut() {
            for n in normals.iter_mut() {
                let v = DVec3::from_array(*n);
                let len = v.length();
                if len > 0.0 {
                    *n = (v / len).to_array();
                }
            }
        }
    }

    /// Multiply every point by `factor`, e.g. to convert millimeters to meters.
    pub fn scale(&mut self, factor: f64) {
        for p in self.points.iter_mut() {
            p[0] *= factor;
            p[1] *= factor;
            p[2] *= factor;
        }
    }

    /// Return a copy of the point cloud moved by `transform`, normals are rotated.
    pub fn transformed(&self, transform: &RigidTransform) -> Self {
        let points = transform.transform_points(&self.points);
        let normals = self.normals.as_ref().map(|normals| {
            normals
                .iter()
                .map(|n| transform.rotate_vector(n))
                .collect::<Vec<_>>()
        });
        Self {
            points,
            colors: self.colors.clone(),
            normals,
        }
    }

    /// Get the mean of the points, zero for an empty cloud.
    pub fn get_center(&self) -> DVec3 {
        if self.points.is_empty() {
            return DVec3::ZERO;
        }
        self.points
            .iter()
            .fold(DVec3::ZERO, |acc, p| acc + DVec3::from_array(*p))
            / self.points.len() as f64
    }

    /// Get the minimum bound of the point cloud.
    pub fn get_min_bound(&self) -> DVec3 {
        if self.points.is_empty() {
            return DVec3::ZERO;
        }
        self.points
            .iter()
            .map(|p| DVec3::from_array(*p))
            .fold(DVec3::splat(f64::INFINITY), |a, b| a.min(b))
    }

    /// Get the maximum bound of the point cloud.
    pub fn get_max_bound(&self) -> DVec3 {
        if self.points.is_empty() {
            return DVec3::ZERO;
        }
        self.points
            .iter()
            .map(|p| DVec3::from_array(*p))
            .fold(DVec3::splat(f64::NEG_INFINITY), |a, b| a.max(b))
    }
}

fn check_len(points: usize, attribute: &'static str, len: usize) -> Result<(), PointCloudError> {
    if points != len {
        return Err(PointCloudError::AttributeMismatch {
            points,
            attribute,
            len,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::rotation_z;
    use approx::assert_relative_eq;

    #[test]
    fn test_pointcloud() {
        let pointcloud = PointCloud::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
            Some(vec![[255, 0, 0], [0, 255, 0]]),
            Some(vec![[0.0, 1.0, 0.0], [1.0, 0.0, 0.0]]),
        );

        assert_eq!(pointcloud.len(), 2);
        assert_eq!(pointcloud.points().len(), 2);
        assert!(pointcloud.has_normals());

        if let Some(colors) = pointcloud.colors() {
            assert_eq!(colors.len(), 2);
        }

        if let Some(p1) = pointcloud.points().last() {
            assert_eq!(p1[0], 1.0);
            assert_eq!(p1[1], 0.0);
            assert_eq!(p1[2], 0.0);
        }
    }

    #[test]
    fn test_try_new_mismatch() {
        let res = PointCloud::try_new(vec![[0.0; 3]; 3], None, Some(vec![[0.0, 0.0, 1.0]]));
        assert!(matches!(
            res,
            Err(PointCloudError::AttributeMismatch {
                points: 3,
                attribute: "normals",
                len: 1
            })
        ));
    }

    #[test]
    fn test_bounds_and_center() {
        let pointcloud = PointCloud::new(
            vec![[1.0, -2.0, 3.0], [-1.0, 4.0, 5.0], [0.0, 1.0, 1.0]],
            None,
            None,
        );
        assert_eq!(pointcloud.get_min_bound(), DVec3::new(-1.0, -2.0, 1.0));
        assert_eq!(pointcloud.get_max_bound(), DVec3::new(1.0, 4.0, 5.0));
        let center = pointcloud.get_center();
        assert_relative_eq!(center.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(center.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(center.z, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_scale_and_normalize() {
        let mut pointcloud = PointCloud::new(
            vec![[1000.0, 0.0, -500.0]],
            None,
            Some(vec![[0.0, 0.0, 2.0]]),
        );
        pointcloud.scale(1e-3);
        pointcloud.normalize_normals();
        assert_eq!(pointcloud.points()[0], [1.0, 0.0, -0.5]);
        assert_eq!(pointcloud.normals().unwrap()[0], [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_transformed_rotates_normals() {
        let pointcloud = PointCloud::new(
            vec![[1.0, 0.0, 0.0]],
            None,
            Some(vec![[1.0, 0.0, 0.0]]),
        );
        let transform =
            RigidTransform::new(rotation_z(std::f64::consts::FRAC_PI_2), [0.0, 0.0, 1.0]);
        let moved = pointcloud.transformed(&transform);
        let p = moved.points()[0];
        let n = moved.normals().unwrap()[0];
        assert_relative_eq!(p[1], 1.0, epsilon = 1e-12);
        assert_relative_eq!(p[2], 1.0, epsilon = 1e-12);
        assert_relative_eq!(n[1], 1.0, epsilon = 1e-12);
        assert_relative_eq!(n[2], 0.0, epsilon = 1e-12);
    }
}
