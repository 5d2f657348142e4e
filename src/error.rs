use thiserror::Error;

/// Describes why a coordinate cannot be used as a vertex position.
///
/// *See [validate_coordinate](crate::validate_coordinate)*
#[derive(Copy, Clone, PartialOrd, Ord, PartialEq, Eq, Debug, Hash, Error)]
pub enum InvalidCoordinate {
    /// A coordinate value was too small.
    ///
    /// The absolute value of any vertex coordinate must either be zero or greater than or
    /// equal to [crate::MIN_ALLOWED_VALUE].
    #[error("coordinate is too small")]
    TooSmall,

    /// A coordinate value was too large or not finite.
    ///
    /// The absolute value of any vertex coordinate must be less than or equal to
    /// [crate::MAX_ALLOWED_VALUE].
    #[error("coordinate is too large")]
    TooLarge,

    /// A coordinate value was NaN.
    #[error("coordinate is NaN")]
    NaN,
}

/// The error type returned by all fallible triangulation operations.
///
/// None of these errors is recoverable by retrying with the same input.
#[derive(Clone, PartialEq, Debug, Error)]
pub enum TriangulationError {
    /// The caller supplied unusable input, e.g. fewer than three distinct points or an empty
    /// polygon list.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A vertex coordinate could not be used.
    #[error("invalid coordinate ({x}, {y}): {reason}")]
    InvalidCoordinate {
        /// The offending x coordinate
        x: f64,
        /// The offending y coordinate
        y: f64,
        /// Why the coordinate was rejected
        reason: InvalidCoordinate,
    },

    /// The input is degenerate, e.g. all points are collinear.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// The mesh became inconsistent. This indicates a defect of the algorithm, not bad input.
    #[error("internal invariant violated: {0}")]
    InternalInvariantViolation(String),
}

/// Describes why an edge could not be flipped.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash, Error)]
pub enum FlipError {
    /// Constraint edges are never flipped.
    #[error("edge is a constraint edge")]
    Constrained,

    /// The edge lies on the mesh boundary.
    #[error("edge has no neighboring triangle")]
    Boundary,

    /// The quadrilateral formed by the edge's two triangles is not strictly convex.
    #[error("quadrilateral is not strictly convex")]
    NotConvex,

    /// The neighboring triangle does not contain the reversed edge.
    #[error("neighboring triangle does not share the edge")]
    MissingTwin,
}

impl From<FlipError> for TriangulationError {
    fn from(error: FlipError) -> Self {
        TriangulationError::invariant(format!("unexpected flip failure: {}", error))
    }
}

impl TriangulationError {
    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub(crate) fn degenerate(message: impl Into<String>) -> Self {
        Self::DegenerateGeometry(message.into())
    }

    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        Self::InternalInvariantViolation(message.into())
    }

    /// Returns `true` for errors caused by the caller's input.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_) | Self::InvalidCoordinate { .. } | Self::DegenerateGeometry(_)
        )
    }
}

#[cfg(test)]
mod test {
    use super::{InvalidCoordinate, TriangulationError};

    #[test]
    fn test_display() {
        let error = TriangulationError::invalid_input("need at least 3 distinct points");
        assert_eq!(
            error.to_string(),
            "invalid input: need at least 3 distinct points"
        );
        let error = TriangulationError::InvalidCoordinate {
            x: f64::NAN,
            y: 1.0,
            reason: InvalidCoordinate::NaN,
        };
        assert!(error.to_string().ends_with("coordinate is NaN"));
        assert!(error.is_input_error());
        assert!(!TriangulationError::invariant("twin edge missing").is_input_error());
    }
}
