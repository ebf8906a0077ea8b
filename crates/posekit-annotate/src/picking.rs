use crate::error::AnnotationError;

/// Paired points for the rigid alignment solver: `source[i]` must land on `target[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PointPairs {
    source: Vec<[f64; 3]>,
    target: Vec<[f64; 3]>,
}

impl PointPairs {
    /// Create point pairs from two equally long lists with at least three points each.
    pub fn new(source: Vec<[f64; 3]>, target: Vec<[f64; 3]>) -> Result<Self, AnnotationError> {
        if source.len() != target.len() {
            return Err(AnnotationError::PairCountMismatch {
                source_len: source.len(),
                target_len: target.len(),
            });
        }
        if source.len() < 3 {
            return Err(AnnotationError::NotEnoughPairs(source.len()));
        }
        Ok(Self { source, target })
    }

    /// Create point pairs from explicit `(source, target)` tuples.
    pub fn from_pairs(pairs: &[([f64; 3], [f64; 3])]) -> Result<Self, AnnotationError> {
        let (source, target) = pairs.iter().copied().unzip();
        Self::new(source, target)
    }

    /// Points on the object.
    pub fn source(&self) -> &[[f64; 3]] {
        &self.source
    }

    /// Points on the scene.
    pub fn target(&self) -> &[[f64; 3]] {
        &self.target
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.source.len()
    }

    /// Whether there are no pairs.
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }
}

/// Points picked by the operator, in click order.
///
/// The first half of the clicks are points on the object, the second half the matching
/// points on the scene. Pairing is purely positional.
#[derive(Debug, Clone, Default)]
pub struct PickedPoints {
    points: Vec<[f64; 3]>,
}

impl PickedPoints {
    /// Create an empty pick list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a picked point.
    pub fn push(&mut self, point: [f64; 3]) {
        self.points.push(point);
    }

    /// Drop the last picked point.
    pub fn undo(&mut self) -> Option<[f64; 3]> {
        let point = self.points.pop();
        if point.is_none() {
            log::warn!("Undo with no picked point");
        }
        point
    }

    /// Forget every picked point.
    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Number of picked points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether nothing has been picked.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The picked points in click order.
    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }

    /// Split the clicks into point pairs, first half source, second half target.
    pub fn to_pairs(&self) -> Result<PointPairs, AnnotationError> {
        if self.points.is_empty() {
            return Err(AnnotationError::NoPicks);
        }
        if self.points.len() % 2 != 0 {
            return Err(AnnotationError::OddPickCount(self.points.len()));
        }
        let (source, target) = self.points.split_at(self.points.len() / 2);
        PointPairs::new(source.to_vec(), target.to_vec())
    }

    /// Consume the picks into point pairs, see [`PickedPoints::to_pairs`].
    pub fn into_pairs(self) -> Result<PointPairs, AnnotationError> {
        self.to_pairs()
    }
}

impl FromIterator<[f64; 3]> for PickedPoints {
    fn from_iter<I: IntoIterator<Item = [f64; 3]>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}
