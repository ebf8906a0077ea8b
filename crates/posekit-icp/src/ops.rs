use glam::DVec3;
use kiddo::immutable::float::kdtree::ImmutableKdTree;
use posekit_3d::{linalg, transforms::rotation_matrix_from_zyx, transforms::RigidTransform};

/// Build a kd-tree over the points to speed up nearest neighbour search.
pub(crate) fn build_kdtree(points: &[[f64; 3]]) -> ImmutableKdTree<f64, u32, 3, 32> {
    ImmutableKdTree::new_from_slice(points)
}

/// Closest point pairs between a source and a target cloud.
#[derive(Debug, Default, Clone)]
pub(crate) struct Correspondences {
    /// Index of the source point.
    pub source: Vec<usize>,
    /// Index of the matched target point.
    pub target: Vec<usize>,
    /// Squared distance of each pair.
    pub squared_distances: Vec<f64>,
}

impl Correspondences {
    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// Root mean square distance of the pairs, zero when there are none.
    pub fn rmse(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        (self.squared_distances.iter().sum::<f64>() / self.len() as f64).sqrt()
    }
}

/// For every source point find its nearest target point closer than `max_distance`.
pub(crate) fn find_correspondences(
    source: &[[f64; 3]],
    kdtree: &ImmutableKdTree<f64, u32, 3, 32>,
    max_distance: f64,
) -> Correspondences {
    let max_sq_distance = max_distance * max_distance;
    let mut corr = Correspondences::default();

    for (i, p) in source.iter().enumerate() {
        let nn = kdtree.nearest_one::<kiddo::SquaredEuclidean>(p);
        if nn.distance <= max_sq_distance {
            corr.source.push(i);
            corr.target.push(nn.item as usize);
            corr.squared_distances.push(nn.distance);
        }
    }

    corr
}

/// Solve one linearised point-to-plane step.
///
/// For each pair `(p, q)` with target normal `n` the residual is `r = (p - q) · n` and its
/// jacobian with respect to `(α, β, γ, tx, ty, tz)` is `[p × n, n]`. The normal equations
/// `JᵀJ x = -Jᵀr` are solved and `x` turned into `Rz(γ) Ry(β) Rx(α)` plus translation.
///
/// Returns the identity when there are no pairs or the system has no usable rank.
pub(crate) fn fit_point_to_plane(
    source: &[[f64; 3]],
    target: &[[f64; 3]],
    target_normals: &[[f64; 3]],
    corr: &Correspondences,
) -> RigidTransform {
    if corr.is_empty() {
        return RigidTransform::IDENTITY;
    }

    let mut jtj = [[0.0; 6]; 6];
    let mut jtr = [0.0; 6];

    for (&i_src, &i_dst) in corr.source.iter().zip(corr.target.iter()) {
        let p = DVec3::from_array(source[i_src]);
        let q = DVec3::from_array(target[i_dst]);
        let n = DVec3::from_array(target_normals[i_dst]);

        let r = (p - q).dot(n);
        let c = p.cross(n);
        let jac = [c.x, c.y, c.z, n.x, n.y, n.z];

        for (row, j_r) in jtj.iter_mut().zip(jac.iter()) {
            for (val, j_c) in row.iter_mut().zip(jac.iter()) {
                *val += j_r * j_c;
            }
        }
        for (val, j_r) in jtr.iter_mut().zip(jac.iter()) {
            *val -= j_r * r;
        }
    }

    let Some(x) = linalg::solve_symmetric_psd(&jtj, &jtr, 1e-12) else {
        log::warn!("Point-to-plane system has no usable rank, skipping the update");
        return RigidTransform::IDENTITY;
    };

    RigidTransform::new(rotation_matrix_from_zyx(&[x[0], x[1], x[2]]), [x[3], x[4], x[5]])
}
