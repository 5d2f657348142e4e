#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::predicates::orient2d;
use crate::{Point2, TriangulationError};

/// A circle given by its center and squared radius.
///
/// Every mesh triangle caches its circumcircle.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde")
)]
pub struct Circle {
    /// The circle's center
    pub center: Point2<f64>,
    /// The circle's squared radius
    pub radius_2: f64,
}

impl Circle {
    /// Returns the circle passing through three points.
    ///
    /// Collinear points have no circumcircle, the returned circle's fields are NaN or infinite
    /// in this case (see [Circle::is_valid]). Use [Circle::try_circumcircle] for a checked
    /// variant.
    pub fn circumcircle(v0: Point2<f64>, v1: Point2<f64>, v2: Point2<f64>) -> Self {
        let b = v1.sub(v0);
        let c = v2.sub(v0);

        let d = 2.0 * (b.x * c.y - c.x * b.y);
        let len_b = b.dot(b);
        let len_c = c.dot(c);
        let d_inv = 1.0 / d;

        let x = (len_b * c.y - len_c * b.y) * d_inv;
        let y = (-len_b * c.x + len_c * b.x) * d_inv;
        let center = Point2::new(x, y);
        Circle {
            center: center.add(v0),
            radius_2: x * x + y * y,
        }
    }

    /// Like [Circle::circumcircle] but fails if the three points are collinear.
    pub fn try_circumcircle(
        v0: Point2<f64>,
        v1: Point2<f64>,
        v2: Point2<f64>,
    ) -> Result<Self, TriangulationError> {
        if orient2d(v0, v1, v2) == 0.0 {
            return Err(TriangulationError::degenerate(format!(
                "cannot compute the circumcircle of collinear points {:?}, {:?}, {:?}",
                v0, v1, v2
            )));
        }
        Ok(Self::circumcircle(v0, v1, v2))
    }

    /// Returns the smallest circle containing both points, i.e. the circle having the
    /// segment between them as diameter.
    pub fn from_diameter(from: Point2<f64>, to: Point2<f64>) -> Self {
        let center = from.midpoint(to);
        Circle {
            center,
            radius_2: center.distance_2(from),
        }
    }

    /// Returns `true` if the point lies strictly inside this circle.
    ///
    /// This is a plain floating point comparison. See [crate::incircle] for an exact test.
    #[inline]
    pub fn contains(&self, point: Point2<f64>) -> bool {
        self.center.distance_2(point) < self.radius_2
    }

    /// Returns `true` unless this circle was computed from degenerate input.
    pub fn is_valid(&self) -> bool {
        self.center.is_finite() && self.radius_2.is_finite()
    }

    /// Returns the circle's radius.
    pub fn radius(&self) -> f64 {
        self.radius_2.sqrt()
    }
}

#[cfg(test)]
mod test {
    use super::Circle;
    use crate::{Point2, TriangulationError};
    use approx::assert_relative_eq;

    #[test]
    fn test_circumcircle() {
        let circle = Circle::circumcircle(
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(0.0, 2.0),
        );
        assert_relative_eq!(circle.center.x, 1.0);
        assert_relative_eq!(circle.center.y, 1.0);
        assert_relative_eq!(circle.radius_2, 2.0);
        assert_relative_eq!(circle.radius(), 2f64.sqrt());
        assert!(circle.is_valid());

        assert!(circle.contains(Point2::new(1.0, 1.0)));
        assert!(circle.contains(Point2::new(2.0, 1.9)));
        assert!(!circle.contains(Point2::new(2.0, 2.1)));
    }

    #[test]
    fn test_contained_in_circumference() {
        let (a1, a2, a3) = (3f64, 2f64, 1f64);
        let offset = Point2::new(0.5, 0.7);
        let v1 = Point2::new(a1.sin(), a1.cos()).mul(2.).add(offset);
        let v2 = Point2::new(a2.sin(), a2.cos()).mul(2.).add(offset);
        let v3 = Point2::new(a3.sin(), a3.cos()).mul(2.).add(offset);
        let circle = Circle::circumcircle(v1, v2, v3);
        assert!(circle.contains(offset));
        let shrunk = (v1.sub(offset)).mul(0.9).add(offset);
        assert!(circle.contains(shrunk));
        let expanded = (v1.sub(offset)).mul(1.1).add(offset);
        assert!(!circle.contains(expanded));
        assert!(!circle.contains(Point2::new(2.0 + offset.x, 2.0 + offset.y)));
    }

    #[test]
    fn test_degenerate_circle() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(1.0, 1.0);
        let c = Point2::new(3.0, 3.0);
        assert!(!Circle::circumcircle(a, b, c).is_valid());
        assert!(matches!(
            Circle::try_circumcircle(a, b, c),
            Err(TriangulationError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_from_diameter() {
        let circle = Circle::from_diameter(Point2::new(-1.0, 0.0), Point2::new(1.0, 0.0));
        assert_eq!(circle.center, Point2::new(0.0, 0.0));
        assert_eq!(circle.radius_2, 1.0);
        assert!(circle.contains(Point2::new(0.0, 0.99)));
        assert!(!circle.contains(Point2::new(0.0, 1.0)));
    }
}
