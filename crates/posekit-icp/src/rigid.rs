use posekit_3d::{
    linalg::{det33, matmul33, matvec33, svd3, transpose33},
    ops::compute_centroid,
    transforms::RigidTransform,
};

/// Ratio between the second and the first singular value of the cross-covariance
/// below which the correspondences are considered collinear.
const DEGENERATE_RATIO: f64 = 1e-10;

/// Error types for the rigid alignment solver.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RigidError {
    /// The point sets have different sizes or fewer than three points.
    #[error("Shape mismatch: {source_len} source points and {target_len} target points, at least 3 pairs are required")]
    ShapeMismatch {
        /// Number of source points.
        source_len: usize,
        /// Number of target points.
        target_len: usize,
    },

    /// The correspondences are collinear or coincident and do not define a rotation.
    #[error("Degenerate correspondences: singular values {singular_values:?}")]
    Degenerate {
        /// Singular values of the cross-covariance matrix.
        singular_values: [f64; 3],
    },
}

/// Compute the rigid transformation that best maps `points_src` onto `points_dst`.
///
/// Closed form least squares solution (Kabsch):
///
/// 1. Compute the centroids of both point sets.
/// 2. Center both point sets.
/// 3. Compute the cross-covariance `H = Σ (p_src - c_src) (p_dst - c_dst)^T`.
/// 4. Decompose `H = U S V^T`.
/// 5. `R = V U^T`. When `det(R) < 0` the third column of `V` is negated and `R` recomputed,
///    so the result is always a proper rotation.
/// 6. `t = c_dst - R c_src`.
///
/// Point `i` of the source corresponds to point `i` of the target; the pairing is taken as is.
///
/// # Arguments
///
/// * `points_src` - Source points.
/// * `points_dst` - Target points, same length as `points_src`.
///
/// # Returns
///
/// The transform `dst_T_src`, or an error when the inputs do not define a unique rotation.
pub fn fit_rigid_transform(
    points_src: &[[f64; 3]],
    points_dst: &[[f64; 3]],
) -> Result<RigidTransform, RigidError> {
    if points_src.len() != points_dst.len() || points_src.len() < 3 {
        return Err(RigidError::ShapeMismatch {
            source_len: points_src.len(),
            target_len: points_dst.len(),
        });
    }

    let (Some(src_centroid), Some(dst_centroid)) =
        (compute_centroid(points_src), compute_centroid(points_dst))
    else {
        return Err(RigidError::ShapeMismatch {
            source_len: points_src.len(),
            target_len: points_dst.len(),
        });
    };

    // H = Σ[(src - src_mean) * (dst - dst_mean)^T]
    let mut h = [[0.0; 3]; 3];
    for (p_src, p_dst) in points_src.iter().zip(points_dst.iter()) {
        let sc = [
            p_src[0] - src_centroid[0],
            p_src[1] - src_centroid[1],
            p_src[2] - src_centroid[2],
        ];
        let dc = [
            p_dst[0] - dst_centroid[0],
            p_dst[1] - dst_centroid[1],
            p_dst[2] - dst_centroid[2],
        ];
        for (row, sc_r) in h.iter_mut().zip(sc.iter()) {
            for (val, dc_c) in row.iter_mut().zip(dc.iter()) {
                *val += sc_r * dc_c;
            }
        }
    }

    let svd = svd3(&h);
    if svd.s[0] <= f64::EPSILON || svd.s[1] <= DEGENERATE_RATIO * svd.s[0] {
        return Err(RigidError::Degenerate {
            singular_values: svd.s,
        });
    }

    let ut = transpose33(&svd.u);
    let mut v = svd.v;
    let mut rotation = [[0.0; 3]; 3];
    matmul33(&v, &ut, &mut rotation);

    if det33(&rotation) < 0.0 {
        log::debug!("det(R) < 0, reflection detected, flipping the last singular vector");
        for row in v.iter_mut() {
            row[2] = -row[2];
        }
        matmul33(&v, &ut, &mut rotation);
    }

    let r_c = matvec33(&rotation, &src_centroid);
    let translation = [
        dst_centroid[0] - r_c[0],
        dst_centroid[1] - r_c[1],
        dst_centroid[2] - r_c[2],
    ];

    Ok(RigidTransform::new(rotation, translation))
}
