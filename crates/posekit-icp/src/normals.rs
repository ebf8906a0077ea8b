use glam::DVec3;
use kiddo::immutable::float::kdtree::ImmutableKdTree;
use posekit_3d::{linalg::svd3, pointcloud::PointCloud};

use crate::ops::build_kdtree;

/// Neighbourhood used to estimate normals: every point within `radius`, at most `max_nn`.
#[derive(Debug, Clone)]
pub struct NormalEstimationParams {
    /// Search radius in meters.
    pub radius: f64,
    /// Maximum number of nearest neighbours used per point.
    pub max_nn: usize,
}

impl Default for NormalEstimationParams {
    fn default() -> Self {
        Self {
            radius: 0.004,
            max_nn: 30,
        }
    }
}

/// Estimate a unit normal per point from the covariance of its neighbourhood.
///
/// The normal is the direction of least variance. Points with fewer than three
/// neighbours get `[0, 0, 1]`. When the cloud already has normals the new ones are
/// flipped to agree with them, otherwise they are oriented towards the origin (the camera).
pub fn estimate_normals(cloud: &mut PointCloud, params: &NormalEstimationParams) {
    if cloud.is_empty() {
        return;
    }

    let kdtree = build_kdtree(cloud.points());
    let previous = cloud.normals().filter(|_| cloud.has_normals()).cloned();

    let normals = cloud
        .points()
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let normal = compute_normal(cloud.points(), &kdtree, point, params);
            let reference = match previous.as_ref() {
                Some(previous) => DVec3::from_array(previous[i]),
                None => -DVec3::from_array(*point),
            };
            if normal.dot(reference) < 0.0 {
                (-normal).to_array()
            } else {
                normal.to_array()
            }
        })
        .collect::<Vec<_>>();

    log::debug!("Estimated {} normals", normals.len());

    // the normals are built from the cloud points, the lengths always match
    if cloud.set_normals(normals).is_err() {
        log::warn!("Normal estimation produced a mismatched normal count");
    }
}

fn compute_normal(
    points: &[[f64; 3]],
    kdtree: &ImmutableKdTree<f64, u32, 3, 32>,
    query: &[f64; 3],
    params: &NormalEstimationParams,
) -> DVec3 {
    let mut neighbours =
        kdtree.within::<kiddo::SquaredEuclidean>(query, params.radius * params.radius);
    neighbours.truncate(params.max_nn);

    if neighbours.len() < 3 {
        return DVec3::Z;
    }

    let neighbourhood = neighbours
        .iter()
        .map(|nn| DVec3::from_array(points[nn.item as usize]))
        .collect::<Vec<_>>();
    let mean = neighbourhood.iter().fold(DVec3::ZERO, |acc, &p| acc + p)
        / neighbourhood.len() as f64;

    let mut cov = [[0.0; 3]; 3];
    for p in neighbourhood.iter() {
        let d = (*p - mean).to_array();
        for (row, d_r) in cov.iter_mut().zip(d.iter()) {
            for (val, d_c) in row.iter_mut().zip(d.iter()) {
                *val += d_r * d_c;
            }
        }
    }

    // the covariance is symmetric, its last left singular vector spans the smallest eigenvalue
    let svd = svd3(&cov);
    let weakest = (0..3)
        .min_by(|&a, &b| svd.s[a].total_cmp(&svd.s[b]))
        .unwrap_or(2);
    let normal = DVec3::new(svd.u[0][weakest], svd.u[1][weakest], svd.u[2][weakest]);

    normal.try_normalize().unwrap_or(DVec3::Z)
}
