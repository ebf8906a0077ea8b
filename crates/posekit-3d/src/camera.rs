/// The intrinsic parameters of a pinhole camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinholeIntrinsics {
    /// Focal length along x in pixels.
    pub fx: f64,
    /// Focal length along y in pixels.
    pub fy: f64,
    /// Principal point x in pixels.
    pub cx: f64,
    /// Principal point y in pixels.
    pub cy: f64,
}

impl PinholeIntrinsics {
    /// Creates new intrinsics from the focal lengths and principal point.
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// Creates the intrinsics from a row-major 3x3 camera matrix `K`.
    pub fn from_cam_k(cam_k: &[f64; 9]) -> Self {
        Self {
            fx: cam_k[0],
            fy: cam_k[4],
            cx: cam_k[2],
            cy: cam_k[5],
        }
    }

    /// Returns the camera matrix as a row-major 3x3 array.
    pub fn camera_matrix(&self) -> [[f64; 3]; 3] {
        [
            [self.fx, 0.0, self.cx],
            [0.0, self.fy, self.cy],
            [0.0, 0.0, 1.0],
        ]
    }

    /// Back-project the pixel `(u, v)` with depth `z` (meters) into the camera frame.
    #[inline]
    pub fn unproject(&self, u: f64, v: f64, z: f64) -> [f64; 3] {
        [(u - self.cx) * z / self.fx, (v - self.cy) * z / self.fy, z]
    }

    /// Project a camera frame point to pixel coordinates, `None` behind the camera.
    #[inline]
    pub fn project(&self, point: &[f64; 3]) -> Option<[f64; 2]> {
        if point[2] <= 0.0 {
            return None;
        }
        Some([
            self.fx * point[0] / point[2] + self.cx,
            self.fy * point[1] / point[2] + self.cy,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_cam_k() {
        let k = [500.0, 0.0, 320.0, 0.0, 510.0, 240.0, 0.0, 0.0, 1.0];
        let intr = PinholeIntrinsics::from_cam_k(&k);
        assert_eq!(intr, PinholeIntrinsics::new(500.0, 510.0, 320.0, 240.0));
        assert_eq!(intr.camera_matrix()[1], [0.0, 510.0, 240.0]);
    }

    #[test]
    fn test_unproject_project() {
        let intr = PinholeIntrinsics::new(500.0, 500.0, 320.0, 240.0);
        let p = intr.unproject(420.0, 140.0, 2.0);
        assert_relative_eq!(p[0], 0.4, epsilon = 1e-12);
        assert_relative_eq!(p[1], -0.4, epsilon = 1e-12);
        let uv = intr.project(&p).unwrap();
        assert_relative_eq!(uv[0], 420.0, epsilon = 1e-9);
        assert_relative_eq!(uv[1], 140.0, epsilon = 1e-9);
        assert!(intr.project(&[0.0, 0.0, -1.0]).is_none());
    }
}
