use posekit_3d::{pointcloud::PointCloud, transforms::RigidTransform};
use posekit_icp::{fit_rigid_transform, icp_point_to_plane};

use crate::{
    config::IcpSettings,
    error::AnnotationError,
    movement::{MovementStep, Nudge},
    object::AnnotatedObject,
    picking::PointPairs,
};

/// The ways an operator can move an object.
///
/// Each variant produces an incremental camera-frame transform which is then
/// left-composed onto the object pose.
#[derive(Debug, Clone, PartialEq)]
pub enum PoseUpdate {
    /// A keyboard nudge of the given step.
    Nudge(Nudge, MovementStep),
    /// Least squares alignment of picked object points onto picked scene points.
    PointPairs(PointPairs),
    /// Point-to-plane ICP of the posed object against the scene.
    Icp,
}

impl PoseUpdate {
    /// Compute the incremental transform of this update for `object`.
    ///
    /// `scene` is the target of the ICP refinement and must carry normals.
    pub fn incremental(
        &self,
        object: &AnnotatedObject,
        scene: &PointCloud,
        settings: &IcpSettings,
    ) -> Result<RigidTransform, AnnotationError> {
        let incremental = match self {
            PoseUpdate::Nudge(nudge, step) => nudge.incremental(step, object.center_in_camera()),
            PoseUpdate::PointPairs(pairs) => {
                log::debug!("Aligning {} on {} point pairs", object.id(), pairs.len());
                fit_rigid_transform(pairs.source(), pairs.target())?
            }
            PoseUpdate::Icp => {
                // refinement starts from the displayed pose, the result is relative to it
                let source = object.geometry_in_camera();
                let result = icp_point_to_plane(
                    &source,
                    scene,
                    &RigidTransform::IDENTITY,
                    &settings.criteria(),
                )?;
                log::info!(
                    "Refined {}: fitness {:.3} rmse {:.5} after {} iterations",
                    object.id(),
                    result.fitness,
                    result.inlier_rmse,
                    result.num_iterations
                );
                result.transform
            }
        };
        Ok(incremental)
    }
}
