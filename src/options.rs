//! Options controlling preprocessing and refinement.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::TriangulationError;

/// The merge distance used if none is specified.
pub const DEFAULT_EPSILON: f64 = 1e-10;

/// The minimum angle in degrees targeted by refinement if none is specified.
pub const DEFAULT_MIN_ANGLE: f64 = 20.0;

/// Steiner points per input vertex allowed during refinement if no explicit bound is given.
pub const DEFAULT_ADDITIONAL_VERTEX_FACTOR: usize = 10;

/// Controls how a triangulation is built.
///
/// ```
/// use cdt2d::TriangulationOptions;
///
/// let options = TriangulationOptions::new()
///     .with_max_area(0.5)
///     .with_min_angle(25.0)
///     .with_refinement(true);
/// assert!(options.refine);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde", default)
)]
pub struct TriangulationOptions {
    /// Points closer than this distance are merged. Also the tolerance for snapping points onto
    /// edges.
    pub epsilon: f64,

    /// Upper bound for triangle areas, only used if `refine` is set.
    pub max_area: Option<f64>,

    /// Lower bound for triangle angles in degrees, only used if `refine` is set.
    ///
    /// Defaults to [DEFAULT_MIN_ANGLE] if refinement is enabled. Values above 30 degrees may
    /// exhaust the Steiner point budget.
    pub min_angle: Option<f64>,

    /// Enables the insertion of Steiner points until all triangles meet the area and angle
    /// bounds.
    pub refine: bool,

    /// Keeps all triangles of the convex hull instead of trimming to the polygon contours.
    /// Triangles inside holes are removed nevertheless.
    pub keep_convex_hull: bool,

    /// Maximum number of Steiner points inserted by refinement.
    ///
    /// Defaults to ten times the number of input vertices.
    pub max_additional_vertices: Option<usize>,
}

impl Default for TriangulationOptions {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            max_area: None,
            min_angle: None,
            refine: false,
            keep_convex_hull: false,
            max_additional_vertices: None,
        }
    }
}

impl TriangulationOptions {
    /// Creates the default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the merge distance.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Sets an upper bound for triangle areas used during refinement.
    pub fn with_max_area(mut self, max_area: f64) -> Self {
        self.max_area = Some(max_area);
        self
    }

    /// Sets a lower bound for triangle angles (in degrees) used during refinement.
    pub fn with_min_angle(mut self, degrees: f64) -> Self {
        self.min_angle = Some(degrees);
        self
    }

    /// Enables or disables refinement.
    pub fn with_refinement(mut self, refine: bool) -> Self {
        self.refine = refine;
        self
    }

    /// Keeps the triangles of the convex hull outside of all contours.
    pub fn with_keep_convex_hull(mut self, keep: bool) -> Self {
        self.keep_convex_hull = keep;
        self
    }

    /// Limits the number of Steiner points inserted during refinement.
    pub fn with_max_additional_vertices(mut self, count: usize) -> Self {
        self.max_additional_vertices = Some(count);
        self
    }

    /// Checks that all values are usable.
    pub fn validate(&self) -> Result<(), TriangulationError> {
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(TriangulationError::invalid_input(format!(
                "epsilon must be finite and non negative, got {}",
                self.epsilon
            )));
        }
        if let Some(max_area) = self.max_area {
            if max_area.is_nan() || max_area <= 0.0 {
                return Err(TriangulationError::invalid_input(format!(
                    "max_area must be positive, got {}",
                    max_area
                )));
            }
        }
        if let Some(min_angle) = self.min_angle {
            if !(0.0..60.0).contains(&min_angle) {
                return Err(TriangulationError::invalid_input(format!(
                    "min_angle must lie in [0, 60) degrees, got {}",
                    min_angle
                )));
            }
        }
        Ok(())
    }

    /// The largest allowed ratio of a triangle's circumradius to its shortest edge.
    ///
    /// This ratio equals `1 / (2 sin(min_angle))`. Returns infinity if angles are not limited.
    pub fn radius_to_shortest_edge_limit(&self) -> f64 {
        let degrees = self.min_angle.unwrap_or(DEFAULT_MIN_ANGLE);
        let sin = degrees.to_radians().sin();
        if sin <= 0.0 {
            f64::INFINITY
        } else {
            0.5 / sin
        }
    }

    /// The Steiner point budget for a mesh with `num_vertices` input vertices.
    pub fn additional_vertex_budget(&self, num_vertices: usize) -> usize {
        self.max_additional_vertices
            .unwrap_or(num_vertices.saturating_mul(DEFAULT_ADDITIONAL_VERTEX_FACTOR))
    }
}

#[cfg(test)]
mod test {
    use super::TriangulationOptions;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults() {
        let options = TriangulationOptions::default();
        assert_eq!(options.epsilon, super::DEFAULT_EPSILON);
        assert!(!options.refine);
        assert!(!options.keep_convex_hull);
        assert_eq!(options.additional_vertex_budget(7), 70);
        options.validate().unwrap();
    }

    #[test]
    fn test_angle_limit() {
        let options = TriangulationOptions::new().with_min_angle(30.0);
        assert_relative_eq!(options.radius_to_shortest_edge_limit(), 1.0, epsilon = 1e-12);
        let options = TriangulationOptions::new().with_min_angle(0.0);
        assert_eq!(options.radius_to_shortest_edge_limit(), f64::INFINITY);
        let options = TriangulationOptions::new();
        assert_relative_eq!(
            options.radius_to_shortest_edge_limit(),
            0.5 / 20f64.to_radians().sin()
        );
    }

    #[test]
    fn test_validate() {
        assert!(TriangulationOptions::new()
            .with_epsilon(-1.0)
            .validate()
            .is_err());
        assert!(TriangulationOptions::new()
            .with_max_area(0.0)
            .validate()
            .is_err());
        assert!(TriangulationOptions::new()
            .with_min_angle(f64::NAN)
            .validate()
            .is_err());
        assert!(TriangulationOptions::new()
            .with_max_area(2.0)
            .with_min_angle(33.0)
            .with_max_additional_vertices(5)
            .with_keep_convex_hull(true)
            .validate()
            .is_ok());
    }
}
