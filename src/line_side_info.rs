/// Describes on which side of a directed line a point lies.
///
/// Wraps the result of [orient2d](crate::orient2d), hence the classification is exact.
/// Created by [side_query](crate::side_query).
#[derive(Debug, Clone, Copy)]
pub struct LineSideInfo {
    signed_side: f64,
}

impl PartialEq for LineSideInfo {
    fn eq(&self, other: &LineSideInfo) -> bool {
        if self.is_on_line() || other.is_on_line() {
            self.is_on_line() && other.is_on_line()
        } else {
            self.is_on_right_side() == other.is_on_right_side()
        }
    }
}

impl LineSideInfo {
    #[inline]
    pub(crate) fn from_determinant(s: f64) -> LineSideInfo {
        LineSideInfo { signed_side: s }
    }

    /// Returns `true` if the point lies strictly to the left, i.e. the line's start, end and the
    /// point are ordered counterclockwise.
    #[inline]
    pub fn is_on_left_side(self) -> bool {
        self.signed_side > 0.0
    }

    /// Returns `true` if the point lies strictly to the right.
    #[inline]
    pub fn is_on_right_side(self) -> bool {
        self.signed_side < 0.0
    }

    /// Returns `true` if the point lies to the left or exactly on the line.
    #[inline]
    pub fn is_on_left_side_or_on_line(self) -> bool {
        self.signed_side >= 0.0
    }

    /// Returns `true` if the point lies to the right or exactly on the line.
    #[inline]
    pub fn is_on_right_side_or_on_line(self) -> bool {
        self.signed_side <= 0.0
    }

    /// Returns `true` if the point lies exactly on the line.
    #[inline]
    pub fn is_on_line(self) -> bool {
        self.signed_side == 0.0
    }

    /// The same classification with respect to the reversed line.
    pub fn reversed(self) -> LineSideInfo {
        LineSideInfo {
            signed_side: -self.signed_side,
        }
    }
}

#[cfg(test)]
mod test {
    use crate::{side_query, Point2};

    #[test]
    fn test_reversed_and_eq() {
        let from = Point2::new(0.0, 0.0);
        let to = Point2::new(1.0, 0.0);
        let left = side_query(from, to, Point2::new(0.5, 1.0));
        let right = side_query(from, to, Point2::new(0.5, -1.0));
        let on = side_query(from, to, Point2::new(2.0, 0.0));

        assert!(left.is_on_left_side());
        assert!(left.is_on_left_side_or_on_line());
        assert!(right.is_on_right_side_or_on_line());
        assert_eq!(left.reversed(), right);
        assert_ne!(left, right);
        assert_eq!(on, on.reversed());
        assert!(on.is_on_left_side_or_on_line() && on.is_on_right_side_or_on_line());
    }
}
