use posekit_3d::{pointcloud::PointCloud, transforms::RigidTransform};

use crate::ops::{build_kdtree, find_correspondences, fit_point_to_plane, Correspondences};

/// Error types for the ICP refiner.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum IcpError {
    /// One of the point clouds has no points.
    #[error("Point cloud is empty")]
    EmptyPointCloud,

    /// Point-to-plane ICP needs one normal per target point.
    #[error("Target point cloud has no normals")]
    MissingNormals,
}

/// Result of the ICP algorithm.
///
/// The transformation is from the source to the target frame.
#[derive(Debug, Clone)]
pub struct IcpResult {
    /// Estimated transform, the initial transform included.
    pub transform: RigidTransform,
    /// Fraction of source points with a correspondence in the last iteration.
    pub fitness: f64,
    /// RMSE of the correspondences in the last iteration.
    pub inlier_rmse: f64,
    /// The total number of iterations performed until convergence.
    pub num_iterations: usize,
    /// Number of correspondences in the last iteration.
    pub num_correspondences: usize,
}

/// Structure to define the ICP parameters.
#[derive(Debug, Clone)]
pub struct IcpConvergenceCriteria {
    /// Pairs farther apart than this distance (meters) are ignored.
    pub max_correspondence_distance: f64,
    /// Maximum number of iterations to perform.
    pub max_iterations: usize,
    /// Stop when the fitness changes less than this between two iterations.
    pub relative_fitness: f64,
    /// Stop when the inlier RMSE changes less than this between two iterations.
    pub relative_rmse: f64,
}

impl Default for IcpConvergenceCriteria {
    fn default() -> Self {
        Self {
            max_correspondence_distance: 0.004,
            max_iterations: 50,
            relative_fitness: 1e-6,
            relative_rmse: 1e-6,
        }
    }
}

/// Iterative Closest Point (ICP) algorithm using point to plane distance.
///
/// # Arguments
///
/// * `source` - Source point cloud.
/// * `target` - Target point cloud, must carry normals.
/// * `initial` - Initial transform from the source to the target frame.
/// * `criteria` - Correspondence distance and convergence criteria.
///
/// # Returns
///
/// * `result` - Result of the ICP algorithm containing the transform, fitness and number of iterations.
///
/// When no correspondence is found the refinement is a no-op: the initial transform is
/// returned with zero fitness.
pub fn icp_point_to_plane(
    source: &PointCloud,
    target: &PointCloud,
    initial: &RigidTransform,
    criteria: &IcpConvergenceCriteria,
) -> Result<IcpResult, IcpError> {
    if source.is_empty() || target.is_empty() {
        return Err(IcpError::EmptyPointCloud);
    }
    let target_normals = match target.normals() {
        Some(normals) if target.has_normals() => normals,
        _ => return Err(IcpError::MissingNormals),
    };

    // build kdtree for target points to speed up the nearest neighbor search
    let kdtree = build_kdtree(target.points());

    let mut transform = *initial;
    let mut current_source = transform.transform_points(source.points());

    let mut corr = find_correspondences(
        &current_source,
        &kdtree,
        criteria.max_correspondence_distance,
    );
    let mut result = evaluate(&transform, &corr, source.len(), 0);

    // main icp loop
    for i in 0..criteria.max_iterations {
        log::debug!(
            "Iteration: {} correspondences: {} rmse: {}",
            i,
            corr.len(),
            result.inlier_rmse
        );

        if corr.is_empty() {
            log::warn!(
                "ICP found no correspondences within {} m, leaving the pose unchanged",
                criteria.max_correspondence_distance
            );
            break;
        }

        let update = fit_point_to_plane(&current_source, target.points(), target_normals, &corr);

        // the update is expressed in the target frame, pre-multiply
        transform = update.compose(&transform);
        current_source = update.transform_points(&current_source);

        corr = find_correspondences(
            &current_source,
            &kdtree,
            criteria.max_correspondence_distance,
        );
        let previous = result;
        result = evaluate(&transform, &corr, source.len(), i + 1);

        // check convergence and exit if below tolerance
        if (previous.fitness - result.fitness).abs() < criteria.relative_fitness
            && (previous.inlier_rmse - result.inlier_rmse).abs() < criteria.relative_rmse
        {
            log::debug!(
                "ICP converged in {} iterations with rmse {}",
                result.num_iterations,
                result.inlier_rmse
            );
            break;
        }
    }

    Ok(result)
}

fn evaluate(
    transform: &RigidTransform,
    corr: &Correspondences,
    num_source: usize,
    num_iterations: usize,
) -> IcpResult {
    IcpResult {
        transform: *transform,
        fitness: corr.len() as f64 / num_source as f64,
        inlier_rmse: corr.rmse(),
        num_iterations,
        num_correspondences: corr.len(),
    }
}
