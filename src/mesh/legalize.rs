use smallvec::SmallVec;

use super::operations::{flip_edge, is_flippable};
use super::{EdgeRef, Mesh};
use crate::math::predicates::incircle;
use crate::{Point2, TriangulationError};

/// Relative distance from the circumcircle below which the cached circle is not trusted.
const CIRCLE_TOLERANCE: f64 = 1e-6;

/// Triangles flatter than this have unreliable cached circumcircles.
const MIN_FATNESS: f64 = 1e-3;

impl Mesh {
    /// Flips edges until none of the given edges (and none of the edges created while doing
    /// so) violates the Delaunay property.
    ///
    /// Constraint edges and boundary edges are never flipped. Returns the number of flips.
    pub fn legalize(
        &mut self,
        edges: impl IntoIterator<Item = EdgeRef>,
    ) -> Result<usize, TriangulationError> {
        let mut edges: SmallVec<[EdgeRef; 16]> = edges.into_iter().collect();
        let mut flips = 0;

        while let Some(edge) = edges.pop() {
            if !self.should_flip(edge)? {
                continue;
            }

            //         c                 c
            //        / \               /|\
            //       /   \             / | \
            //      a-----b   ==>     a  |  b
            //       \   /             \ | /
            //        \ /               \|/
            //         d                 d
            let [t0, t1] = flip_edge(self, edge.triangle, edge.edge)?;
            flips += 1;
            edges.extend([
                EdgeRef::new(t0, 0),
                EdgeRef::new(t0, 2),
                EdgeRef::new(t1, 0),
                EdgeRef::new(t1, 1),
            ]);
        }

        if flips > 0 {
            log::trace!("legalization performed {} flips", flips);
        }
        Ok(flips)
    }

    /// Returns `true` if `edge` is unconstrained, flippable and its opposite vertex lies inside
    /// the circumcircle of the edge's triangle.
    fn should_flip(&self, edge: EdgeRef) -> Result<bool, TriangulationError> {
        let triangle = &self.triangles[edge.triangle];
        if triangle.constrained[edge.edge] {
            return Ok(false);
        }
        let Some(twin) = self.twin(edge)? else {
            return Ok(false);
        };
        let opposite = self.triangles[twin.triangle].opposite_vertex(twin.edge);
        if !self.circumcircle_contains(edge.triangle, self.vertices[opposite]) {
            return Ok(false);
        }
        is_flippable(self, edge.triangle, edge.edge)
    }

    /// In-circle test using the triangle's cached circle.
    ///
    /// Falls back to the exact predicate for near ties and for flat triangles, so that the
    /// result always agrees with [incircle].
    pub(crate) fn circumcircle_contains(&self, t: usize, point: Point2<f64>) -> bool {
        let positions = self.positions(t);
        let circle = self.triangles[t].circle;
        if circle.is_valid() && fatness(positions) >= MIN_FATNESS {
            let distance_2 = circle.center.distance_2(point);
            if (distance_2 - circle.radius_2).abs() > CIRCLE_TOLERANCE * circle.radius_2 {
                return circle.contains(point);
            }
        }
        let [a, b, c] = positions;
        incircle(a, b, c, point) > 0.0
    }
}

/// Twice the triangle's area divided by its squared longest edge.
fn fatness([a, b, c]: [Point2<f64>; 3]) -> f64 {
    let longest_2 = a.distance_2(b).max(b.distance_2(c)).max(c.distance_2(a));
    let (ab, ac) = (b.sub(a), c.sub(a));
    let double_area = (ab.x * ac.y - ab.y * ac.x).abs();
    double_area / longest_2
}
