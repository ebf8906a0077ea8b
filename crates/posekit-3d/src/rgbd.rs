use crate::{camera::PinholeIntrinsics, pointcloud::PointCloud};

/// Error types for RGB-D images.
#[derive(Debug, thiserror::Error)]
pub enum RgbdError {
    /// The color and depth buffers do not match the image size.
    #[error("Expected {expected} pixels for a {width}x{height} image, got {rgb} rgb and {depth} depth")]
    SizeMismatch {
        /// Image width.
        width: usize,
        /// Image height.
        height: usize,
        /// Expected pixel count.
        expected: usize,
        /// Number of rgb pixels.
        rgb: usize,
        /// Number of depth pixels.
        depth: usize,
    },
}

/// A struct representing an RGB-D image with depth in meters.
#[derive(Debug, Clone)]
pub struct RgbdImage {
    /// The width of the image
    pub width: usize,
    /// The height of the image
    pub height: usize,
    /// The RGB pixels in row-major order
    pub rgb: Vec<[u8; 3]>,
    /// The depth values in meters in row-major order, zero marks invalid pixels
    pub depth: Vec<f64>,
}

impl RgbdImage {
    /// Creates a new RGB-D image, both buffers must hold `width * height` pixels.
    pub fn new(
        rgb: Vec<[u8; 3]>,
        depth: Vec<f64>,
        width: usize,
        height: usize,
    ) -> Result<Self, RgbdError> {
        let expected = width * height;
        if rgb.len() != expected || depth.len() != expected {
            return Err(RgbdError::SizeMismatch {
                width,
                height,
                expected,
                rgb: rgb.len(),
                depth: depth.len(),
            });
        }
        Ok(Self {
            width,
            height,
            rgb,
            depth,
        })
    }

    /// Returns the dimensions of the image (width, height)
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Get the depth value at a specific pixel.
    #[inline]
    pub fn get_depth(&self, x: usize, y: usize) -> f64 {
        self.depth[y * self.width + x]
    }

    /// Get the color value at a specific pixel.
    #[inline]
    pub fn get_color(&self, x: usize, y: usize) -> [u8; 3] {
        self.rgb[y * self.width + x]
    }

    /// Back-project every valid depth pixel into a colored point cloud in the camera frame.
    ///
    /// A pixel is valid when its depth is finite, positive and not farther than `depth_trunc`.
    /// Given depth `z` at pixel `(u, v)` the point is `((u - cx) z / fx, (v - cy) z / fy, z)`.
    pub fn to_point_cloud(&self, intrinsics: &PinholeIntrinsics, depth_trunc: f64) -> PointCloud {
        let mut points = Vec::with_capacity(self.depth.len());
        let mut colors = Vec::with_capacity(self.depth.len());

        for v in 0..self.height {
            for u in 0..self.width {
                let z = self.get_depth(u, v);
                if !z.is_finite() || z <= 0.0 || z > depth_trunc {
                    continue;
                }
                points.push(intrinsics.unproject(u as f64, v as f64, z));
                colors.push(self.get_color(u, v));
            }
        }

        PointCloud::new(points, Some(colors), None)
    }
}
