//! The index based triangle mesh and all local mesh edits.
//!
//! Vertices and triangles live in dense vectors and refer to each other by index only. Vertices
//! are append only; triangles are rewritten in place by the surgery operations in
//! [operations] and new triangles are appended.
mod constraint_edges;
mod legalize;
mod locate;
pub mod operations;
mod triangle;

use hashbrown::HashMap;
use smallvec::SmallVec;

pub use locate::PositionInMesh;
pub use triangle::{next_index, prev_index, EdgeRef, Triangle};

use crate::math::{self, predicates::orient2d, validate_point};
use crate::{Point2, TriangulationError};

/// A triangle mesh with adjacency information and constraint edge flags.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    vertices: Vec<Point2<f64>>,
    triangles: Vec<Triangle>,
    /// One triangle incident to each vertex, `None` for vertices not connected yet.
    vertex_triangles: Vec<Option<usize>>,
    hint: usize,
}

impl Mesh {
    /// Creates an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mesh consisting of a single triangle.
    ///
    /// The vertices are reordered to be counterclockwise if necessary. Fails with
    /// [TriangulationError::DegenerateGeometry] if the points are collinear.
    pub fn from_triangle(positions: [Point2<f64>; 3]) -> Result<Self, TriangulationError> {
        for position in positions {
            validate_point(position)?;
        }
        Self::from_enclosing_triangle(positions)
    }

    /// Like [Mesh::from_triangle], but accepts coordinates beyond [MAX_ALLOWED_VALUE].
    ///
    /// Used for the synthetic triangle enclosing all input points.
    ///
    /// [MAX_ALLOWED_VALUE]: crate::MAX_ALLOWED_VALUE
    pub(crate) fn from_enclosing_triangle(
        positions: [Point2<f64>; 3],
    ) -> Result<Self, TriangulationError> {
        if positions.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(TriangulationError::invalid_input(
                "the enclosing triangle must have finite coordinates",
            ));
        }
        let [mut p0, p1, mut p2] = positions;
        let orientation = orient2d(p0, p1, p2);
        if orientation == 0.0 {
            return Err(TriangulationError::degenerate(
                "the initial triangle must not be degenerate",
            ));
        }
        if orientation < 0.0 {
            std::mem::swap(&mut p0, &mut p2);
        }
        let mut mesh = Mesh::new();
        mesh.vertices.extend([p0, p1, p2]);
        mesh.vertex_triangles.resize(3, None);
        let triangle = mesh.make_triangle([0, 1, 2], [None; 3], [false; 3]);
        mesh.append_triangle(triangle);
        Ok(mesh)
    }

    /// Creates a mesh from raw vertex positions and counterclockwise vertex triples.
    ///
    /// Adjacency is derived from shared edges. Fails if a triangle is degenerate or clockwise,
    /// refers to a missing vertex or if a directed edge is used twice.
    pub fn from_triangles(
        vertices: Vec<Point2<f64>>,
        triangles: &[[usize; 3]],
    ) -> Result<Self, TriangulationError> {
        let mut mesh = Mesh {
            vertex_triangles: vec![None; vertices.len()],
            vertices,
            triangles: Vec::with_capacity(triangles.len()),
            hint: 0,
        };
        let mut edges: HashMap<(usize, usize), usize> = HashMap::with_capacity(triangles.len() * 3);

        for (index, triple) in triangles.iter().enumerate() {
            if triple.iter().any(|v| *v >= mesh.vertices.len()) {
                return Err(TriangulationError::invalid_input(format!(
                    "triangle {} refers to a missing vertex",
                    index
                )));
            }
            let [a, b, c] = triple.map(|v| mesh.vertices[v]);
            if orient2d(a, b, c) <= 0.0 {
                return Err(TriangulationError::invalid_input(format!(
                    "triangle {} is not ordered counterclockwise",
                    index
                )));
            }
            for i in 0..3 {
                let key = (triple[i], triple[next_index(i)]);
                if edges.insert(key, index).is_some() {
                    return Err(TriangulationError::invalid_input(format!(
                        "directed edge {:?} is used by more than one triangle",
                        key
                    )));
                }
            }
            let triangle = mesh.make_triangle(*triple, [None; 3], [false; 3]);
            mesh.append_triangle(triangle);
        }

        for triangle in &mut mesh.triangles {
            for i in 0..3 {
                let [from, to] = triangle.edge_vertices(i);
                triangle.neighbors[i] = edges.get(&(to, from)).copied();
            }
        }
        Ok(mesh)
    }

    /// Wraps already linked triangles without checking them.
    #[cfg(test)]
    pub(crate) fn from_parts(vertices: Vec<Point2<f64>>, triangles: Vec<Triangle>) -> Self {
        let mut mesh = Mesh {
            vertex_triangles: vec![None; vertices.len()],
            vertices,
            triangles: Vec::with_capacity(triangles.len()),
            hint: 0,
        };
        for triangle in triangles {
            mesh.append_triangle(triangle);
        }
        mesh
    }

    /// Appends a vertex without connecting it to any triangle.
    pub(crate) fn push_vertex(&mut self, position: Point2<f64>) -> usize {
        self.vertices.push(position);
        self.vertex_triangles.push(None);
        self.vertices.len() - 1
    }

    pub(crate) fn make_triangle(
        &self,
        vertices: [usize; 3],
        neighbors: [Option<usize>; 3],
        constrained: [bool; 3],
    ) -> Triangle {
        Triangle::new(
            vertices,
            neighbors,
            constrained,
            vertices.map(|v| self.vertices[v]),
        )
    }

    #[cfg(test)]
    pub(crate) fn triangle_mut(&mut self, index: usize) -> &mut Triangle {
        &mut self.triangles[index]
    }

    pub(crate) fn set_triangle(&mut self, index: usize, triangle: Triangle) {
        self.triangles[index] = triangle;
        self.register_corners(index);
    }

    pub(crate) fn append_triangle(&mut self, triangle: Triangle) -> usize {
        self.triangles.push(triangle);
        let index = self.triangles.len() - 1;
        self.register_corners(index);
        index
    }

    fn register_corners(&mut self, index: usize) {
        for v in self.triangles[index].vertices {
            self.vertex_triangles[v] = Some(index);
        }
    }

    /// Returns a triangle touching `vertex`.
    ///
    /// Every surgery operation rewrites all triangles it touches, so the registered triangle
    /// still contains the vertex. The scan only runs if that ever fails.
    fn triangle_at(&self, vertex: usize) -> Option<usize> {
        match self.vertex_triangles.get(vertex).copied().flatten() {
            Some(t) if self.triangles[t].vertex_index(vertex).is_some() => Some(t),
            _ => {
                let found = self
                    .triangles
                    .iter()
                    .position(|triangle| triangle.vertex_index(vertex).is_some());
                if found.is_some() {
                    log::warn!("stale triangle index of vertex {}", vertex);
                }
                found
            }
        }
    }

    pub(crate) fn set_hint(&mut self, triangle: usize) {
        self.hint = triangle;
    }

    /// All vertex positions. A vertex index is an index into this slice.
    pub fn vertices(&self) -> &[Point2<f64>] {
        &self.vertices
    }

    /// All triangles.
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Returns a vertex position.
    pub fn vertex(&self, index: usize) -> Point2<f64> {
        self.vertices[index]
    }

    /// Returns a triangle.
    pub fn triangle(&self, index: usize) -> &Triangle {
        &self.triangles[index]
    }

    /// The number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// The number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Returns the positions of a triangle's vertices.
    pub fn positions(&self, triangle: usize) -> [Point2<f64>; 3] {
        self.triangles[triangle].vertices.map(|v| self.vertices[v])
    }

    /// Returns the area of a triangle.
    pub fn triangle_area(&self, triangle: usize) -> f64 {
        math::triangle_area(self.positions(triangle))
    }

    /// Returns the edge of the neighboring triangle that is the reverse of `edge`.
    ///
    /// Returns `Ok(None)` if `edge` has no neighbor.
    pub fn twin(&self, edge: EdgeRef) -> Result<Option<EdgeRef>, TriangulationError> {
        let triangle = &self.triangles[edge.triangle];
        let Some(neighbor) = triangle.neighbors[edge.edge] else {
            return Ok(None);
        };
        let [from, to] = triangle.edge_vertices(edge.edge);
        self.triangles[neighbor]
            .edge_index(to, from)
            .map(|index| Some(EdgeRef::new(neighbor, index)))
            .ok_or_else(|| {
                TriangulationError::invariant(format!(
                    "triangle {} has no twin of edge ({}, {}) of triangle {}",
                    neighbor, from, to, edge.triangle
                ))
            })
    }

    /// Searches the directed edge `from -> to` among the triangles around `from`.
    pub fn find_edge(&self, from: usize, to: usize) -> Option<EdgeRef> {
        self.triangles_around(from).find_map(|index| {
            self.triangles[index]
                .edge_index(from, to)
                .map(|edge| EdgeRef::new(index, edge))
        })
    }

    /// Searches the edge between `a` and `b` in either direction.
    pub fn find_undirected_edge(&self, a: usize, b: usize) -> Option<EdgeRef> {
        self.find_edge(a, b).or_else(|| self.find_edge(b, a))
    }

    /// Returns `true` if the edge between `a` and `b` exists and is a constraint edge.
    pub fn is_constraint_edge(&self, a: usize, b: usize) -> bool {
        self.find_undirected_edge(a, b)
            .map(|e| self.triangles[e.triangle].constrained[e.edge])
            .unwrap_or(false)
    }

    /// Sets the constraint flag of an edge on both of its sides.
    pub fn set_constrained(&mut self, edge: EdgeRef, value: bool) -> Result<(), TriangulationError> {
        let twin = self.twin(edge)?;
        self.triangles[edge.triangle].constrained[edge.edge] = value;
        if let Some(twin) = twin {
            self.triangles[twin.triangle].constrained[twin.edge] = value;
        }
        Ok(())
    }

    /// Makes the neighbor across edge `from -> to` of `owner`'s outer triangle point to `owner`.
    ///
    /// `outer` must contain the reversed edge `to -> from`.
    pub(crate) fn relink(
        &mut self,
        outer: Option<usize>,
        [from, to]: [usize; 2],
        owner: usize,
    ) -> Result<(), TriangulationError> {
        let Some(outer) = outer else {
            return Ok(());
        };
        let edge = self.triangles[outer].edge_index(to, from).ok_or_else(|| {
            TriangulationError::invariant(format!(
                "triangle {} does not contain edge ({}, {})",
                outer, to, from
            ))
        })?;
        self.triangles[outer].neighbors[edge] = Some(owner);
        Ok(())
    }

    /// Returns the triangles touching a vertex.
    ///
    /// The triangles are visited by rotating counterclockwise around the vertex. If the fan is
    /// interrupted by a boundary edge, the remaining triangles follow in clockwise order.
    pub fn triangles_around(&self, vertex: usize) -> impl Iterator<Item = usize> + '_ {
        self.fan(vertex).into_iter()
    }

    fn fan(&self, vertex: usize) -> SmallVec<[usize; 16]> {
        let mut result = SmallVec::new();
        let Some(start) = self.triangle_at(vertex) else {
            return result;
        };

        let mut current = start;
        loop {
            result.push(current);
            if result.len() > self.triangles.len() {
                return result;
            }
            let triangle = &self.triangles[current];
            let Some(k) = triangle.vertex_index(vertex) else {
                return result;
            };
            match triangle.neighbors[prev_index(k)] {
                Some(next) if next == start => return result,
                Some(next) => current = next,
                None => break,
            }
        }

        let mut current = start;
        while result.len() <= self.triangles.len() {
            let triangle = &self.triangles[current];
            let Some(k) = triangle.vertex_index(vertex) else {
                break;
            };
            match triangle.neighbors[k] {
                Some(next) if next != start => {
                    result.push(next);
                    current = next;
                }
                _ => break,
            }
        }
        result
    }

    /// Checks orientation, adjacency symmetry and constraint flag symmetry of every triangle.
    pub fn check_topology(&self) -> Result<(), TriangulationError> {
        for (index, triangle) in self.triangles.iter().enumerate() {
            let [a, b, c] = triangle.vertices;
            if a == b || b == c || a == c {
                return Err(TriangulationError::invariant(format!(
                    "triangle {} has duplicate vertices {:?}",
                    index, triangle.vertices
                )));
            }
            if orient2d(self.vertices[a], self.vertices[b], self.vertices[c]) <= 0.0 {
                return Err(TriangulationError::invariant(format!(
                    "triangle {} {:?} is not counterclockwise",
                    index, triangle.vertices
                )));
            }
            for i in 0..3 {
                let Some(twin) = self.twin(EdgeRef::new(index, i))? else {
                    continue;
                };
                let other = &self.triangles[twin.triangle];
                if other.neighbors[twin.edge] != Some(index) {
                    return Err(TriangulationError::invariant(format!(
                        "adjacency of triangles {} and {} is not symmetric",
                        index, twin.triangle
                    )));
                }
                if other.constrained[twin.edge] != triangle.constrained[i] {
                    return Err(TriangulationError::invariant(format!(
                        "constraint flags of triangles {} and {} disagree",
                        index, twin.triangle
                    )));
                }
            }
        }
        Ok(())
    }

    /// Returns the first unconstrained edge whose opposite vertex lies strictly inside the
    /// circumcircle of the edge's triangle, using exact predicates.
    pub fn find_non_delaunay_edge(&self) -> Result<Option<EdgeRef>, TriangulationError> {
        for index in 0..self.triangles.len() {
            for i in 0..3 {
                let edge = EdgeRef::new(index, i);
                if self.triangles[index].constrained[i] {
                    continue;
                }
                let Some(twin) = self.twin(edge)? else {
                    continue;
                };
                let opposite = self.triangles[twin.triangle].opposite_vertex(twin.edge);
                let [a, b, c] = self.positions(index);
                if math::predicates::incircle(a, b, c, self.vertices[opposite]) > 0.0 {
                    return Ok(Some(edge));
                }
            }
        }
        Ok(None)
    }

    #[cfg(test)]
    pub(crate) fn sanity_check(&self) {
        self.check_topology().unwrap();
        assert_eq!(self.find_non_delaunay_edge().unwrap(), None);
    }
}

#[cfg(test)]
mod test {
    use super::{EdgeRef, Mesh};
    use crate::test_utilities::{random_points_with_seed, SEED};
    use crate::{Point2, TriangulationError};

    pub(crate) fn quad_mesh() -> Mesh {
        Mesh::from_triangles(
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(1.0, 1.0),
                Point2::new(0.0, 1.0),
            ],
            &[[0, 1, 2], [0, 2, 3]],
        )
        .unwrap()
    }

    #[test]
    fn test_from_triangle_reorders() {
        let mesh = Mesh::from_triangle([
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 1.0),
            Point2::new(1.0, 0.0),
        ])
        .unwrap();
        assert_eq!(mesh.num_triangles(), 1);
        assert_eq!(mesh.vertex(0), Point2::new(1.0, 0.0));
        mesh.check_topology().unwrap();
    }

    #[test]
    fn test_from_triangle_degenerate() {
        let result = Mesh::from_triangle([
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(2.0, 2.0),
        ]);
        assert!(matches!(
            result,
            Err(TriangulationError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_from_triangles_adjacency() {
        let mesh = quad_mesh();
        assert_eq!(mesh.triangle(0).neighbors, [None, None, Some(1)]);
        assert_eq!(mesh.triangle(1).neighbors, [Some(0), None, None]);
        assert_eq!(
            mesh.twin(EdgeRef::new(0, 2)).unwrap(),
            Some(EdgeRef::new(1, 0))
        );
        assert_eq!(mesh.twin(EdgeRef::new(0, 0)).unwrap(), None);
        mesh.sanity_check();
    }

    #[test]
    fn test_from_triangles_rejects_clockwise() {
        let result = Mesh::from_triangles(
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(0.0, 1.0),
            ],
            &[[0, 2, 1]],
        );
        assert!(matches!(result, Err(TriangulationError::InvalidInput(_))));
    }

    #[test]
    fn test_set_constrained_marks_both_sides() {
        let mut mesh = quad_mesh();
        let edge = mesh.find_edge(2, 0).unwrap();
        mesh.set_constrained(edge, true).unwrap();
        assert!(mesh.is_constraint_edge(0, 2));
        assert!(mesh.triangle(1).constrained[0]);
        assert!(!mesh.is_constraint_edge(0, 1));
        mesh.check_topology().unwrap();
    }

    #[test]
    fn test_detects_asymmetric_adjacency() {
        let mut mesh = quad_mesh();
        mesh.triangle_mut(1).neighbors[0] = None;
        assert!(matches!(
            mesh.check_topology(),
            Err(TriangulationError::InternalInvariantViolation(_))
        ));
    }

    #[test]
    fn test_triangles_around() {
        let mesh = quad_mesh();
        let mut around: Vec<_> = mesh.triangles_around(0).collect();
        around.sort_unstable();
        assert_eq!(around, vec![0, 1]);
        assert_eq!(mesh.triangles_around(3).collect::<Vec<_>>(), vec![1]);
        assert_eq!(mesh.triangles_around(1).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_adjacency_queries_match_scan() {
        let mut mesh = Mesh::from_triangle([
            Point2::new(-10.0, -10.0),
            Point2::new(10.0, -10.0),
            Point2::new(0.0, 10.0),
        ])
        .unwrap();
        for point in random_points_with_seed(200, SEED) {
            mesh.insert(point, 0.0).unwrap();
        }
        mesh.insert_constraint_edge(5, 17).unwrap();

        for vertex in 0..mesh.num_vertices() {
            let mut around: Vec<_> = mesh.triangles_around(vertex).collect();
            around.sort_unstable();
            let expected: Vec<_> = (0..mesh.num_triangles())
                .filter(|&t| mesh.triangle(t).vertex_index(vertex).is_some())
                .collect();
            assert_eq!(around, expected);
        }

        for (index, triangle) in mesh.triangles().iter().enumerate() {
            for i in 0..3 {
                let [from, to] = triangle.edge_vertices(i);
                assert_eq!(mesh.find_edge(from, to), Some(EdgeRef::new(index, i)));
            }
        }
        mesh.sanity_check();
    }
}
