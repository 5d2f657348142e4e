use super::{next_index, EdgeRef, Mesh};
use crate::math::is_in_segment_interior;
use crate::math::predicates::orient2d;
use crate::Point2;

/// Describes the position of a point relative to a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionInMesh {
    /// The point lies in the interior of the given triangle.
    OnFace(usize),

    /// The point lies on the given edge, or close enough to it to be snapped onto it.
    ///
    /// The point may be reported on either of the edge's two directed sides.
    OnEdge(EdgeRef),

    /// The point coincides with an existing vertex.
    OnVertex(usize),

    /// No triangle contains the point.
    OutsideOfMesh,
}

impl Mesh {
    /// Locates a point, starting from the most recently modified triangle.
    ///
    /// Points within `epsilon` of a vertex are reported as [PositionInMesh::OnVertex]. Points
    /// within `epsilon` of an edge are reported as [PositionInMesh::OnEdge] if the edge can be
    /// split at that point without creating inverted triangles.
    pub fn find_containing(&self, point: Point2<f64>, epsilon: f64) -> PositionInMesh {
        self.locate_with_hint(point, self.hint, epsilon)
    }

    /// Locates a point by walking through the mesh, starting at triangle `hint`.
    ///
    /// The walk is bounded by the number of triangles. If it exceeds that bound or leaves the
    /// mesh through a boundary edge, all triangles are scanned instead.
    pub fn locate_with_hint(
        &self,
        point: Point2<f64>,
        hint: usize,
        epsilon: f64,
    ) -> PositionInMesh {
        if self.triangles.is_empty() {
            return PositionInMesh::OutsideOfMesh;
        }
        let mut current = hint.min(self.triangles.len() - 1);

        for step in 0..=self.triangles.len() {
            let triangle = &self.triangles[current];
            let positions = self.positions(current);

            // Rotating the first tested edge avoids cycling forever in the same triangles.
            let next = (0..3)
                .map(|offset| (offset + step) % 3)
                .find(|&i| orient2d(positions[i], positions[next_index(i)], point) < 0.0);

            match next {
                None => return self.classify(current, point, epsilon),
                Some(edge) => match triangle.neighbors[edge] {
                    Some(neighbor) => current = neighbor,
                    None => break,
                },
            }
        }
        self.locate_by_scan(point, epsilon)
    }

    fn locate_by_scan(&self, point: Point2<f64>, epsilon: f64) -> PositionInMesh {
        (0..self.triangles.len())
            .find(|&t| {
                let positions = self.positions(t);
                (0..3).all(|i| orient2d(positions[i], positions[next_index(i)], point) >= 0.0)
            })
            .map(|t| self.classify(t, point, epsilon))
            .unwrap_or(PositionInMesh::OutsideOfMesh)
    }

    /// Classifies a point known to lie in the closure of triangle `t`.
    fn classify(&self, t: usize, point: Point2<f64>, epsilon: f64) -> PositionInMesh {
        let triangle = &self.triangles[t];
        let positions = self.positions(t);
        let epsilon_2 = epsilon * epsilon;

        for i in 0..3 {
            if positions[i].distance_2(point) <= epsilon_2 {
                return PositionInMesh::OnVertex(triangle.vertices[i]);
            }
        }

        for i in 0..3 {
            if orient2d(positions[i], positions[next_index(i)], point) == 0.0 {
                return PositionInMesh::OnEdge(EdgeRef::new(t, i));
            }
        }

        if epsilon > 0.0 {
            for i in 0..3 {
                let edge = EdgeRef::new(t, i);
                if is_in_segment_interior(positions[i], positions[next_index(i)], point, epsilon)
                    && self.can_split_edge_at(edge, point)
                {
                    return PositionInMesh::OnEdge(edge);
                }
            }
        }
        PositionInMesh::OnFace(t)
    }

    /// Returns `true` if splitting `edge` at `point` yields only counterclockwise triangles.
    pub(crate) fn can_split_edge_at(&self, edge: EdgeRef, point: Point2<f64>) -> bool {
        let triangle = &self.triangles[edge.triangle];
        let [a, b] = triangle.edge_vertices(edge.edge).map(|v| self.vertices[v]);
        let c = self.vertices[triangle.opposite_vertex(edge.edge)];
        if orient2d(b, c, point) <= 0.0 || orient2d(c, a, point) <= 0.0 {
            return false;
        }
        match self.twin(edge) {
            Ok(Some(twin)) => {
                let d = self.vertices[self.triangles[twin.triangle].opposite_vertex(twin.edge)];
                orient2d(a, d, point) > 0.0 && orient2d(d, b, point) > 0.0
            }
            Ok(None) => true,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::PositionInMesh;
    use crate::mesh::{EdgeRef, Mesh};
    use crate::Point2;

    fn strip() -> Mesh {
        Mesh::from_triangles(
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(2.0, 0.0),
                Point2::new(4.0, 0.0),
                Point2::new(0.0, 2.0),
                Point2::new(2.0, 2.0),
                Point2::new(4.0, 2.0),
            ],
            &[[0, 1, 4], [0, 4, 3], [1, 2, 5], [1, 5, 4]],
        )
        .unwrap()
    }

    fn centroid(mesh: &Mesh, t: usize) -> Point2<f64> {
        let [a, b, c] = mesh.positions(t);
        Point2::new((a.x + b.x + c.x) / 3.0, (a.y + b.y + c.y) / 3.0)
    }

    #[test]
    fn test_locate_centroids() {
        let mesh = strip();
        for hint in 0..mesh.num_triangles() {
            for t in 0..mesh.num_triangles() {
                assert_eq!(
                    mesh.locate_with_hint(centroid(&mesh, t), hint, 1e-10),
                    PositionInMesh::OnFace(t)
                );
            }
        }
    }

    #[test]
    fn test_locate_shared_edge_midpoints() {
        let mesh = strip();
        for t in 0..mesh.num_triangles() {
            for i in 0..3 {
                let edge = EdgeRef::new(t, i);
                let Ok(Some(twin)) = mesh.twin(edge) else {
                    continue;
                };
                let [from, to] = mesh.triangle(t).edge_vertices(i);
                let midpoint = mesh.vertex(from).midpoint(mesh.vertex(to));
                let position = mesh.find_containing(midpoint, 1e-10);
                assert!(
                    position == PositionInMesh::OnEdge(edge)
                        || position == PositionInMesh::OnEdge(twin)
                );
            }
        }
    }

    #[test]
    fn test_locate_vertices_and_outside() {
        let mesh = strip();
        assert_eq!(
            mesh.find_containing(Point2::new(2.0, 2.0), 0.0),
            PositionInMesh::OnVertex(4)
        );
        assert_eq!(
            mesh.find_containing(Point2::new(4.0 - 1e-12, 1e-13), 1e-10),
            PositionInMesh::OnVertex(2)
        );
        assert_eq!(
            mesh.find_containing(Point2::new(5.0, 1.0), 1e-10),
            PositionInMesh::OutsideOfMesh
        );
        assert_eq!(
            Mesh::new().find_containing(Point2::new(0.0, 0.0), 0.0),
            PositionInMesh::OutsideOfMesh
        );
    }

    #[test]
    fn test_snap_to_nearby_edge() {
        let mesh = strip();
        let position = mesh.find_containing(Point2::new(1.0, 1.0 + 1e-12), 1e-10);
        let PositionInMesh::OnEdge(edge) = position else {
            panic!("expected an edge, got {:?}", position);
        };
        let mut vertices = mesh.triangle(edge.triangle).edge_vertices(edge.edge);
        vertices.sort();
        assert_eq!(vertices, [0, 4]);

        assert!(matches!(
            mesh.find_containing(Point2::new(1.0, 1.0 + 1e-12), 0.0),
            PositionInMesh::OnFace(_)
        ));
    }
}
