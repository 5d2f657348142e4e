//! Geometric primitives and predicates shared by the mesh and the preprocessor.
mod circle;
pub mod expansion;
pub mod predicates;

pub use circle::Circle;

use crate::error::InvalidCoordinate;
use crate::{LineSideInfo, Point2, TriangulationError};
use predicates::orient2d;

/// Indicates a point's projected position relative to an edge.
pub struct PointProjection {
    factor: f64,
    length_2: f64,
}

// These limits come from Shewchuk's paper "Adaptive Precision Floating-Point Arithmetic and Fast
// Robust Geometric Predicates": the predicates will neither overflow nor underflow if all input
// exponents are within [-142, 201].

/// The smallest allowed coordinate value greater than zero. This value is equal to
/// 2<sup>-142</sup>.
///
/// *See also [validate_coordinate], [MAX_ALLOWED_VALUE]*
pub const MIN_ALLOWED_VALUE: f64 = 1.793662034335766e-43; // 1.0 * 2^-142

/// The largest allowed coordinate value. This value is equal to 2<sup>201</sup>.
///
/// *See also [validate_coordinate], [MIN_ALLOWED_VALUE]*
pub const MAX_ALLOWED_VALUE: f64 = 3.2138760885179806e60; // 1.0 * 2^201

/// Checks if a coordinate value is suitable for triangulation.
///
/// Will return an error if and only if
///  - The absolute value of the coordinate is too small (See [MIN_ALLOWED_VALUE])
///  - The absolute value of the coordinate is too large (See [MAX_ALLOWED_VALUE])
///  - The coordinate is NaN (not a number)
///
/// Any infinite value results in `Err(InvalidCoordinate::TooLarge)`.
pub fn validate_coordinate(value: f64) -> Result<(), InvalidCoordinate> {
    if value.is_nan() {
        Err(InvalidCoordinate::NaN)
    } else if value.abs() < MIN_ALLOWED_VALUE && value != 0.0 {
        Err(InvalidCoordinate::TooSmall)
    } else if value.abs() > MAX_ALLOWED_VALUE {
        Err(InvalidCoordinate::TooLarge)
    } else {
        Ok(())
    }
}

/// Checks if both coordinates of a point are valid, see [validate_coordinate].
pub fn validate_point(point: Point2<f64>) -> Result<(), TriangulationError> {
    validate_coordinate(point.x)
        .and_then(|_| validate_coordinate(point.y))
        .map_err(|reason| TriangulationError::InvalidCoordinate {
            x: point.x,
            y: point.y,
            reason,
        })
}

impl PointProjection {
    fn new(factor: f64, length_2: f64) -> Self {
        Self { factor, length_2 }
    }

    /// Returns `true` if a point's projection is located before an edge.
    pub fn is_before_edge(&self) -> bool {
        self.factor < 0.0
    }

    /// Returns `true` if a point's projection is located behind an edge.
    pub fn is_behind_edge(&self) -> bool {
        self.factor > self.length_2
    }

    /// Returns `true` if a point's projection is located on an edge.
    pub fn is_on_edge(&self) -> bool {
        !self.is_before_edge() && !self.is_behind_edge()
    }

    /// Returns the relative position of the projection, 0.0 at the edge's start and 1.0 at its
    /// end.
    pub fn relative_position(&self) -> f64 {
        self.factor / self.length_2
    }
}

/// Projects `query_point` onto the line through `p1` and `p2`.
pub fn project_point(p1: Point2<f64>, p2: Point2<f64>, query_point: Point2<f64>) -> PointProjection {
    let dir = p2.sub(p1);
    PointProjection::new(query_point.sub(p1).dot(dir), dir.length2())
}

/// Returns the point of the segment `p1 p2` closest to `query_point`.
pub fn nearest_point(p1: Point2<f64>, p2: Point2<f64>, query_point: Point2<f64>) -> Point2<f64> {
    let dir = p2.sub(p1);
    let s = project_point(p1, p2, query_point);
    if s.is_on_edge() {
        p1.add(dir.mul(s.relative_position()))
    } else if s.is_before_edge() {
        p1
    } else {
        p2
    }
}

/// Squared distance between `query_point` and the segment `p1 p2`.
pub fn distance_2(p1: Point2<f64>, p2: Point2<f64>, query_point: Point2<f64>) -> f64 {
    let nn = nearest_point(p1, p2, query_point);
    query_point.sub(nn).length2()
}

/// Returns `true` if `query` lies within `epsilon` of the segment `from to` but not within
/// `epsilon` of either of its end points.
pub fn is_in_segment_interior(
    from: Point2<f64>,
    to: Point2<f64>,
    query: Point2<f64>,
    epsilon: f64,
) -> bool {
    let eps_2 = epsilon * epsilon;
    if query.distance_2(from) <= eps_2 || query.distance_2(to) <= eps_2 {
        return false;
    }
    // The closest point cannot be an end point anymore, hence it lies in the interior.
    distance_2(from, to, query) <= eps_2
}

/// Classifies `query_point` relative to the directed line `from to` using the exact
/// orientation test.
pub fn side_query(from: Point2<f64>, to: Point2<f64>, query_point: Point2<f64>) -> LineSideInfo {
    LineSideInfo::from_determinant(orient2d(from, to, query_point))
}

/// Returns `true` if the three points form a strictly counterclockwise triangle.
pub fn is_ordered_ccw(p1: Point2<f64>, p2: Point2<f64>, p3: Point2<f64>) -> bool {
    side_query(p1, p2, p3).is_on_left_side()
}

/// Returns `true` if the open segments `from0 to0` and `from1 to1` intersect in a single point
/// that is not an end point of either segment.
pub fn segments_cross_properly(
    from0: Point2<f64>,
    to0: Point2<f64>,
    from1: Point2<f64>,
    to1: Point2<f64>,
) -> bool {
    let other_from = side_query(from0, to0, from1);
    let other_to = side_query(from0, to0, to1);
    let self_from = side_query(from1, to1, from0);
    let self_to = side_query(from1, to1, to0);

    if [other_from, other_to, self_from, self_to]
        .iter()
        .any(|side| side.is_on_line())
    {
        return false;
    }

    other_from != other_to && self_from != self_to
}

/// Returns the intersection point of the lines through `from0 to0` and `from1 to1`, clamped
/// onto the first segment.
///
/// Returns `None` for parallel lines.
pub fn line_intersection(
    from0: Point2<f64>,
    to0: Point2<f64>,
    from1: Point2<f64>,
    to1: Point2<f64>,
) -> Option<Point2<f64>> {
    let d0 = to0.sub(from0);
    let d1 = to1.sub(from1);
    let denominator = d0.x * d1.y - d0.y * d1.x;
    if denominator == 0.0 {
        return None;
    }
    let diff = from1.sub(from0);
    let t = (diff.x * d1.y - diff.y * d1.x) / denominator;
    let t = t.clamp(0.0, 1.0);
    Some(from0.add(d0.mul(t)))
}

/// The unsigned area of a triangle.
pub fn triangle_area(positions: [Point2<f64>; 3]) -> f64 {
    signed_triangle_area(positions).abs()
}

/// The signed area of a triangle, positive for counterclockwise vertices.
pub fn signed_triangle_area(positions: [Point2<f64>; 3]) -> f64 {
    let [v0, v1, v2] = positions;
    let b = v1.sub(v0);
    let c = v2.sub(v0);
    (b.x * c.y - b.y * c.x) * 0.5
}

/// Even-odd point in polygon test. The polygon is given as an implicitly closed loop.
pub fn is_inside_loop(polygon: &[Point2<f64>], point: Point2<f64>) -> bool {
    let mut inside = false;
    let mut j = polygon.len().wrapping_sub(1);
    for (i, pi) in polygon.iter().enumerate() {
        let pj = polygon[j];
        if (pi.y > point.y) != (pj.y > point.y) {
            let x = (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x;
            if point.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Returns `true` if `point` lies within `epsilon` of any edge of the closed loop.
pub fn is_on_loop_boundary(polygon: &[Point2<f64>], point: Point2<f64>, epsilon: f64) -> bool {
    let eps_2 = epsilon * epsilon;
    (0..polygon.len()).any(|i| {
        let from = polygon[i];
        let to = polygon[(i + 1) % polygon.len()];
        distance_2(from, to, point) <= eps_2
    })
}
