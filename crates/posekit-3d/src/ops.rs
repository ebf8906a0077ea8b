/// Compute the centroid of a set of points, each coordinate averaged independently.
///
/// Returns `None` for an empty set.
pub fn compute_centroid(points: &[[f64; 3]]) -> Option<[f64; 3]> {
    if points.is_empty() {
        return None;
    }
    let mut centroid = [0.0; 3];
    for p in points {
        centroid[0] += p[0];
        centroid[1] += p[1];
        centroid[2] += p[2];
    }
    let n = points.len() as f64;
    Some([centroid[0] / n, centroid[1] / n, centroid[2] / n])
}
