use std::path::Path;

use posekit_icp::{IcpConvergenceCriteria, NormalEstimationParams};
use serde::{Deserialize, Serialize};

use crate::{error::AnnotationError, movement::MovementSteps};

/// Parameters of the ICP refinement and of the normal estimation it relies on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IcpSettings {
    /// Pairs farther apart than this distance (meters) are ignored.
    pub max_correspondence_distance: f64,
    /// Maximum number of ICP iterations.
    pub max_iterations: usize,
    /// Radius (meters) of the neighbourhood used to estimate normals.
    pub normal_radius: f64,
    /// Maximum number of neighbours used to estimate normals.
    pub normal_max_nn: usize,
}

impl Default for IcpSettings {
    fn default() -> Self {
        let criteria = IcpConvergenceCriteria::default();
        let normals = NormalEstimationParams::default();
        Self {
            max_correspondence_distance: criteria.max_correspondence_distance,
            max_iterations: criteria.max_iterations,
            normal_radius: normals.radius,
            normal_max_nn: normals.max_nn,
        }
    }
}

impl IcpSettings {
    /// The convergence criteria of the refiner.
    pub fn criteria(&self) -> IcpConvergenceCriteria {
        IcpConvergenceCriteria {
            max_correspondence_distance: self.max_correspondence_distance,
            max_iterations: self.max_iterations,
            ..Default::default()
        }
    }

    /// The neighbourhood used to estimate normals.
    pub fn normal_params(&self) -> NormalEstimationParams {
        NormalEstimationParams {
            radius: self.normal_radius,
            max_nn: self.normal_max_nn,
        }
    }
}

/// Where a newly added object is placed, relative to the scene bounding box.
///
/// The object starts at `[min.x - x_margin, center.y, center.z - z_margin]`, left of the
/// scene and closer to the camera so it does not overlap the scene points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialPlacement {
    /// Distance left of the scene bounding box, meters.
    pub x_margin: f64,
    /// Distance towards the camera from the scene centre, meters.
    pub z_margin: f64,
}

impl Default for InitialPlacement {
    fn default() -> Self {
        Self {
            x_margin: 0.15,
            z_margin: 0.2,
        }
    }
}

/// Annotator settings, every field falls back to its default when missing from the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotatorConfig {
    /// Keyboard movement steps.
    pub steps: MovementSteps,
    /// ICP refinement settings.
    pub icp: IcpSettings,
    /// Placement of newly added objects.
    pub placement: InitialPlacement,
    /// Depth beyond this distance (meters) is dropped from the scene point cloud.
    pub depth_trunc: f64,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            steps: MovementSteps::default(),
            icp: IcpSettings::default(),
            placement: InitialPlacement::default(),
            depth_trunc: 3.0,
        }
    }
}

impl AnnotatorConfig {
    /// Read the settings from a json file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, AnnotationError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AnnotationError::FileDoesNotExist(path.to_path_buf()));
        }
        let file = std::fs::File::open(path)?;
        let config = serde_json::from_reader(std::io::BufReader::new(file))?;
        Ok(config)
    }
}
