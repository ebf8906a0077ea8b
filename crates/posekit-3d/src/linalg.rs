/// Result of the singular value decomposition of a 3x3 matrix `M = U * diag(S) * V^T`.
///
/// `u` and `v` are stored row-major, singular values are sorted in non-increasing order.
#[derive(Debug, Clone, Copy)]
pub struct Svd3 {
    /// Left singular vectors as columns.
    pub u: [[f64; 3]; 3],
    /// Singular values in non-increasing order.
    pub s: [f64; 3],
    /// Right singular vectors as columns.
    pub v: [[f64; 3]; 3],
}

/// Multiply two 3x3 matrices `a * b` and write the result into `out`.
///
/// `out` may not alias `a` or `b`; clone the input first when updating in place.
pub fn matmul33(a: &[[f64; 3]; 3], b: &[[f64; 3]; 3], out: &mut [[f64; 3]; 3]) {
    for (i, row) in out.iter_mut().enumerate() {
        for (j, val) in row.iter_mut().enumerate() {
            *val = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j];
        }
    }
}

/// Transpose a 3x3 matrix.
pub fn transpose33(m: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    [
        [m[0][0], m[1][0], m[2][0]],
        [m[0][1], m[1][1], m[2][1]],
        [m[0][2], m[1][2], m[2][2]],
    ]
}

/// Determinant of a 3x3 matrix.
pub fn det33(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// Multiply a 3x3 matrix with a 3-vector.
pub fn matvec33(m: &[[f64; 3]; 3], v: &[f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

/// Compute the singular value decomposition of a 3x3 matrix.
///
/// Example:
///
/// ```
/// use posekit_3d::linalg::svd3;
///
/// let m = [[3.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 1.0]];
/// let svd = svd3(&m);
/// assert!((svd.s[0] - 3.0).abs() < 1e-12);
/// ```
pub fn svd3(m: &[[f64; 3]; 3]) -> Svd3 {
    let mat = faer::Mat::<f64>::from_fn(3, 3, |i, j| m[i][j]);
    let svd = mat.svd();

    let (u_mat, v_mat, s_col) = (svd.u(), svd.v(), svd.s_diagonal());

    let mut out = Svd3 {
        u: [[0.0; 3]; 3],
        s: [0.0; 3],
        v: [[0.0; 3]; 3],
    };
    for i in 0..3 {
        out.s[i] = s_col.read(i);
        for j in 0..3 {
            out.u[i][j] = u_mat.read(i, j);
            out.v[i][j] = v_mat.read(i, j);
        }
    }
    out
}

/// Solve the symmetric positive semi-definite system `A x = b` in the least squares sense.
///
/// The solve goes through the SVD pseudo-inverse, singular values below `rcond * s_max`
/// are discarded. Returns `None` when no singular value survives.
pub fn solve_symmetric_psd<const N: usize>(
    a: &[[f64; N]; N],
    b: &[f64; N],
    rcond: f64,
) -> Option<[f64; N]> {
    let mat = faer::Mat::<f64>::from_fn(N, N, |i, j| a[i][j]);
    let svd = mat.svd();
    let (u, v, s) = (svd.u(), svd.v(), svd.s_diagonal());

    let s_max = (0..N).map(|k| s.read(k)).fold(0.0f64, f64::max);
    if s_max <= 0.0 {
        return None;
    }

    // x = V * diag(1/s) * U^T * b
    let mut coeffs = [0.0; N];
    let mut rank = 0;
    for (k, coeff) in coeffs.iter_mut().enumerate() {
        let sk = s.read(k);
        if sk <= rcond * s_max {
            continue;
        }
        rank += 1;
        let ut_b = (0..N).map(|i| u.read(i, k) * b[i]).sum::<f64>();
        *coeff = ut_b / sk;
    }
    if rank == 0 {
        return None;
    }

    let mut x = [0.0; N];
    for (i, xi) in x.iter_mut().enumerate() {
        *xi = (0..N).map(|k| v.read(i, k) * coeffs[k]).sum();
    }
    Some(x)
}

/// Transform a set of points using a rotation and translation.
///
/// # Arguments
///
/// * `src_points` - A set of points to be transformed.
/// * `dst_r_src` - A rotation matrix.
/// * `dst_t_src` - A translation vector.
/// * `dst_points` - A pre-allocated vector to store the transformed points.
///
/// PRECONDITION: dst_points is a pre-allocated vector of the same size as source.
///
/// Example:
///
/// ```
/// use posekit_3d::linalg::transform_points;
///
/// let src_points = vec![[2.0, 2.0, 2.0], [3.0, 4.0, 5.0]];
/// let rotation = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
/// let translation = [0.0, 0.0, 0.0];
/// let mut dst_points = vec![[0.0; 3]; src_points.len()];
/// transform_points(&src_points, &rotation, &translation, &mut dst_points);
/// ```
pub fn transform_points(
    src_points: &[[f64; 3]],
    dst_r_src: &[[f64; 3]; 3],
    dst_t_src: &[f64; 3],
    dst_points: &mut [[f64; 3]],
) {
    assert_eq!(src_points.len(), dst_points.len());
    if src_points.is_empty() {
        return;
    }

    let dst_r_src_mat = faer::Mat::<f64>::from_fn(3, 3, |i, j| dst_r_src[i][j]);

    // create view of the source points
    let points_in_src = {
        let src_points_slice = unsafe {
            std::slice::from_raw_parts(src_points.as_ptr() as *const f64, src_points.len() * 3)
        };
        // SAFETY: src_points_slice is a Nx3 row-major matrix, one point per row
        faer::mat::from_row_major_slice(src_points_slice, src_points.len(), 3)
    };

    // create a mutable view of the destination points
    let mut points_in_dst = {
        let dst_points_slice = unsafe {
            std::slice::from_raw_parts_mut(
                dst_points.as_mut_ptr() as *mut f64,
                dst_points.len() * 3,
            )
        };
        // SAFETY: dst_points_slice is a 3xN column-major matrix, one point per column
        faer::mat::from_column_major_slice_mut(dst_points_slice, 3, dst_points.len())
    };

    faer::linalg::matmul::matmul(
        &mut points_in_dst,
        dst_r_src_mat.as_ref(),
        points_in_src.transpose(),
        None,
        1.0,
        faer::Parallelism::None,
    );

    for point in dst_points.iter_mut() {
        point[0] += dst_t_src[0];
        point[1] += dst_t_src[1];
        point[2] += dst_t_src[2];
    }
}
