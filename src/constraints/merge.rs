use smallvec::SmallVec;

use super::{Segment, SegmentKind};
use crate::math::predicates::orient2d;
use crate::math::{
    is_in_segment_interior, line_intersection, project_point, segments_cross_properly,
};
use crate::point_index::PointIndex;
use crate::{Point2, TriangulationError};

/// How a candidate segment conflicts with a segment of the set.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Conflict {
    /// The candidate is already part of the set.
    Duplicate(usize),
    /// An endpoint of the candidate lies in the interior of an existing segment.
    SplitExisting(usize, Point2<f64>),
    /// An endpoint of an existing segment lies in the interior of the candidate.
    SplitCandidate(Point2<f64>),
    /// The candidate and an existing segment cross at an interior point.
    Cross(usize, Point2<f64>),
}

/// A growing set of pairwise non crossing segments.
///
/// Segments only ever touch at shared endpoints. All endpoints and split points are snapped
/// through a [PointIndex] so that coincident points are bitwise identical.
pub(super) struct SegmentSet<'a> {
    segments: Vec<Segment>,
    index: &'a mut PointIndex,
    iterations: usize,
    max_iterations: usize,
}

impl<'a> SegmentSet<'a> {
    pub(super) fn new(index: &'a mut PointIndex, max_iterations: usize) -> Self {
        Self {
            segments: Vec::new(),
            index,
            iterations: 0,
            max_iterations,
        }
    }

    pub(super) fn into_segments(self) -> Vec<Segment> {
        self.segments
    }

    /// Adds a segment, splitting it and any existing segment it touches or crosses.
    pub(super) fn merge(&mut self, segment: Segment) -> Result<(), TriangulationError> {
        let mut worklist = vec![segment];
        while let Some(candidate) = worklist.pop() {
            self.iterations += 1;
            if self.iterations > self.max_iterations {
                return Err(TriangulationError::invariant(format!(
                    "segment merging did not converge within {} iterations",
                    self.max_iterations
                )));
            }
            if candidate.is_degenerate() {
                continue;
            }

            match self.find_conflict(&candidate) {
                None => self.segments.push(candidate),
                Some(Conflict::Duplicate(existing)) => {
                    let existing = &mut self.segments[existing];
                    if candidate.kind.priority() < existing.kind.priority() {
                        existing.kind = candidate.kind;
                        existing.polygon = candidate.polygon;
                    }
                }
                Some(Conflict::SplitExisting(existing, point)) => {
                    let existing = self.segments.swap_remove(existing);
                    worklist.push(candidate);
                    worklist.extend(existing.split_at(point));
                }
                Some(Conflict::SplitCandidate(point)) => {
                    worklist.extend(candidate.split_at(point));
                }
                Some(Conflict::Cross(existing, point)) => {
                    let existing = self.segments.swap_remove(existing);
                    let point = self.index.snap(point);
                    worklist.extend(existing.split_at(point));
                    worklist.extend(candidate.split_at(point));
                }
            }
        }
        Ok(())
    }

    fn find_conflict(&self, candidate: &Segment) -> Option<Conflict> {
        let epsilon = self.index.epsilon();
        for (index, existing) in self.segments.iter().enumerate() {
            if candidate.same_endpoints(existing) {
                return Some(Conflict::Duplicate(index));
            }
            for point in [candidate.from, candidate.to] {
                if lies_inside(existing.from, existing.to, point, epsilon) {
                    return Some(Conflict::SplitExisting(index, point));
                }
            }
            for point in [existing.from, existing.to] {
                if lies_inside(candidate.from, candidate.to, point, epsilon) {
                    return Some(Conflict::SplitCandidate(point));
                }
            }
            if segments_cross_properly(candidate.from, candidate.to, existing.from, existing.to) {
                if let Some(point) =
                    line_intersection(candidate.from, candidate.to, existing.from, existing.to)
                {
                    return Some(Conflict::Cross(index, point));
                }
            }
        }
        None
    }
}

/// Returns `true` if `point` lies in the interior of the segment `from -> to`, either exactly or
/// within `epsilon`.
pub(super) fn lies_inside(
    from: Point2<f64>,
    to: Point2<f64>,
    point: Point2<f64>,
    epsilon: f64,
) -> bool {
    if point == from || point == to {
        return false;
    }
    let exactly_inside =
        orient2d(from, to, point) == 0.0 && project_point(from, to, point).is_on_edge();
    exactly_inside || is_in_segment_interior(from, to, point, epsilon)
}

impl Segment {
    fn is_degenerate(&self) -> bool {
        self.from == self.to
    }

    fn same_endpoints(&self, other: &Segment) -> bool {
        (self.from == other.from && self.to == other.to)
            || (self.from == other.to && self.to == other.from)
    }

    /// Splits this segment at `point`. Returns the segment unchanged if `point` is one of its
    /// endpoints.
    pub(super) fn split_at(self, point: Point2<f64>) -> SmallVec<[Segment; 2]> {
        if point == self.from || point == self.to {
            return SmallVec::from_slice(&[self]);
        }
        SmallVec::from_slice(&[
            Segment {
                to: point,
                ..self
            },
            Segment {
                from: point,
                ..self
            },
        ])
    }
}

impl SegmentKind {
    /// Contours take precedence over holes, holes over user segments.
    fn priority(self) -> u8 {
        match self {
            SegmentKind::Contour => 0,
            SegmentKind::Hole => 1,
            SegmentKind::User => 2,
        }
    }
}

#[cfg(test)]
mod test {
    use super::{lies_inside, SegmentSet};
    use crate::constraints::{Segment, SegmentKind};
    use crate::point_index::PointIndex;
    use crate::Point2;

    fn segment(from: [f64; 2], to: [f64; 2], kind: SegmentKind) -> Segment {
        Segment {
            from: from.into(),
            to: to.into(),
            kind,
            polygon: 0,
        }
    }

    #[test]
    fn test_lies_inside() {
        let from = Point2::new(0.0, 0.0);
        let to = Point2::new(2.0, 2.0);
        assert!(lies_inside(from, to, Point2::new(1.0, 1.0), 0.0));
        assert!(!lies_inside(from, to, to, 0.1));
        assert!(!lies_inside(from, to, Point2::new(3.0, 3.0), 0.1));
        assert!(lies_inside(from, to, Point2::new(1.0, 1.05), 0.1));
        assert!(!lies_inside(from, to, Point2::new(1.0, 1.05), 0.0));
    }

    #[test]
    fn test_crossing_segments_are_split() {
        let mut index = PointIndex::new(1e-10);
        let mut set = SegmentSet::new(&mut index, 1000);
        set.merge(segment([0.0, 0.0], [2.0, 2.0], SegmentKind::Contour))
            .unwrap();
        set.merge(segment([0.0, 2.0], [2.0, 0.0], SegmentKind::User))
            .unwrap();
        let segments = set.into_segments();
        assert_eq!(segments.len(), 4);
        for s in &segments {
            assert!(s.from == Point2::new(1.0, 1.0) || s.to == Point2::new(1.0, 1.0));
        }
        assert_eq!(
            segments
                .iter()
                .filter(|s| s.kind == SegmentKind::Contour)
                .count(),
            2
        );
    }

    #[test]
    fn test_overlapping_segments_are_merged() {
        let mut index = PointIndex::new(1e-10);
        let mut set = SegmentSet::new(&mut index, 1000);
        set.merge(segment([0.0, 0.0], [2.0, 0.0], SegmentKind::User))
            .unwrap();
        set.merge(segment([1.0, 0.0], [3.0, 0.0], SegmentKind::Contour))
            .unwrap();
        let mut segments = set.into_segments();
        segments.sort_by(|a, b| a.from.x.min(a.to.x).total_cmp(&b.from.x.min(b.to.x)));
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].kind, SegmentKind::User);
        assert_eq!(segments[1].kind, SegmentKind::Contour);
        assert_eq!(segments[2].kind, SegmentKind::Contour);
    }

    #[test]
    fn test_touching_segment_splits_existing() {
        let mut index = PointIndex::new(1e-10);
        let mut set = SegmentSet::new(&mut index, 1000);
        set.merge(segment([0.0, 0.0], [4.0, 0.0], SegmentKind::Contour))
            .unwrap();
        set.merge(segment([2.0, 0.0], [2.0, 3.0], SegmentKind::User))
            .unwrap();
        set.merge(segment([0.0, 0.0], [4.0, 0.0], SegmentKind::User))
            .unwrap();
        let segments = set.into_segments();
        assert_eq!(segments.len(), 3);
        assert!(segments
            .iter()
            .filter(|s| s.from.y == 0.0 && s.to.y == 0.0)
            .all(|s| s.kind == SegmentKind::Contour));
    }

    #[test]
    fn test_iteration_bound() {
        let mut index = PointIndex::new(1e-10);
        let mut set = SegmentSet::new(&mut index, 2);
        set.merge(segment([0.0, 0.0], [2.0, 2.0], SegmentKind::User))
            .unwrap();
        assert!(set
            .merge(segment([0.0, 2.0], [2.0, 0.0], SegmentKind::User))
            .is_err());
    }
}
