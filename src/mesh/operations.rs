//! Local mesh edits: triangle splits, edge splits and edge flips.
use smallvec::SmallVec;

use super::{next_index, prev_index, EdgeRef, Mesh, PositionInMesh};
use crate::error::FlipError;
use crate::math::predicates::orient2d;
use crate::math::validate_point;
use crate::{Point2, TriangulationError};

/// Splits triangle `t` into three triangles sharing the vertex `v`.
///
/// `v` must already be pushed to the mesh and lie strictly inside `t`. Returns the slots of the
/// new triangles: `t` keeps the triangle adjacent to the original local edge 0, the two others
/// are appended. The original outer edge of every new triangle is its local edge 0.
pub fn split_triangle(
    mesh: &mut Mesh,
    t: usize,
    v: usize,
) -> Result<[usize; 3], TriangulationError> {
    // Original triangle:
    //       v2
    //      /  \
    //     /    \
    //    /      \
    //   /   t    \
    //  /          \
    // v0 -------- v1
    //
    // After the split, slot i holds (v_i, v_{i+1}, v) and slot 0 reuses t.
    let old = *mesh.triangle(t);
    let first_new = mesh.num_triangles();
    let slots = [t, first_new, first_new + 1];

    let [first, second, third] = [0, 1, 2].map(|i| {
        mesh.make_triangle(
            [old.vertices[i], old.vertices[next_index(i)], v],
            [
                old.neighbors[i],
                Some(slots[next_index(i)]),
                Some(slots[prev_index(i)]),
            ],
            [old.constrained[i], false, false],
        )
    });
    mesh.set_triangle(t, first);
    mesh.append_triangle(second);
    mesh.append_triangle(third);

    for i in 1..3 {
        mesh.relink(old.neighbors[i], old.edge_vertices(i), slots[i])?;
    }
    Ok(slots)
}

/// Splits the local edge `edge` of triangle `t` at vertex `v`.
///
/// `v` must already be pushed to the mesh and lie on the edge's interior. The edge's
/// triangle and its neighbor (if any) are each divided into two. Both halves of the split edge
/// keep its constraint flag, the new spokes are unconstrained.
///
/// Returns the slots of all new triangles. Their outer edges are always local edge 0.
pub fn split_edge(
    mesh: &mut Mesh,
    t: usize,
    edge: usize,
    v: usize,
) -> Result<SmallVec<[usize; 4]>, TriangulationError> {
    //         c
    //        /|\
    //       / | \
    //      /T1|T0\
    //     /   |   \
    //    a----v----b
    //     \   |   /
    //      \T2|T3/
    //       \ | /
    //        \|/
    //         d
    let t0 = *mesh.triangle(t);
    let [a, b] = t0.edge_vertices(edge);
    let c = t0.opposite_vertex(edge);
    let flag = t0.constrained[edge];
    let (n_bc, f_bc) = (
        t0.neighbors[next_index(edge)],
        t0.constrained[next_index(edge)],
    );
    let (n_ca, f_ca) = (
        t0.neighbors[prev_index(edge)],
        t0.constrained[prev_index(edge)],
    );

    let Some(u) = t0.neighbors[edge] else {
        let s1 = mesh.num_triangles();
        let tri0 = mesh.make_triangle([b, c, v], [n_bc, Some(s1), None], [f_bc, false, flag]);
        let tri1 = mesh.make_triangle([c, a, v], [n_ca, None, Some(t)], [f_ca, flag, false]);
        mesh.set_triangle(t, tri0);
        mesh.append_triangle(tri1);
        mesh.relink(n_ca, [c, a], s1)?;
        return Ok(SmallVec::from_slice(&[t, s1]));
    };

    let t1 = *mesh.triangle(u);
    let twin = t1.edge_index(b, a).ok_or_else(|| {
        TriangulationError::invariant(format!(
            "triangle {} does not share edge ({}, {}) with triangle {}",
            u, a, b, t
        ))
    })?;
    let d = t1.opposite_vertex(twin);
    let (n_ad, f_ad) = (
        t1.neighbors[next_index(twin)],
        t1.constrained[next_index(twin)],
    );
    let (n_db, f_db) = (
        t1.neighbors[prev_index(twin)],
        t1.constrained[prev_index(twin)],
    );

    let s2 = mesh.num_triangles();
    let s3 = s2 + 1;
    let tri0 = mesh.make_triangle([b, c, v], [n_bc, Some(u), Some(s3)], [f_bc, false, flag]);
    let tri1 = mesh.make_triangle([c, a, v], [n_ca, Some(s2), Some(t)], [f_ca, flag, false]);
    let tri2 = mesh.make_triangle([a, d, v], [n_ad, Some(s3), Some(u)], [f_ad, false, flag]);
    let tri3 = mesh.make_triangle([d, b, v], [n_db, Some(t), Some(s2)], [f_db, flag, false]);
    mesh.set_triangle(t, tri0);
    mesh.set_triangle(u, tri1);
    mesh.append_triangle(tri2);
    mesh.append_triangle(tri3);

    mesh.relink(n_ca, [c, a], u)?;
    mesh.relink(n_ad, [a, d], s2)?;
    mesh.relink(n_db, [d, b], s3)?;
    Ok(SmallVec::from_slice(&[t, u, s2, s3]))
}

/// Returns `true` if the quadrilateral around the local edge `edge` of `t` is strictly convex.
///
/// Returns `false` for boundary edges.
pub fn is_flippable(mesh: &Mesh, t: usize, edge: usize) -> Result<bool, TriangulationError> {
    let Some(twin) = mesh.twin(EdgeRef::new(t, edge))? else {
        return Ok(false);
    };
    let triangle = mesh.triangle(t);
    let [a, b] = triangle.edge_vertices(edge).map(|v| mesh.vertex(v));
    let c = mesh.vertex(triangle.opposite_vertex(edge));
    let d = mesh.vertex(mesh.triangle(twin.triangle).opposite_vertex(twin.edge));
    Ok(is_strictly_convex([a, d, b, c]))
}

fn is_strictly_convex([a, d, b, c]: [Point2<f64>; 4]) -> bool {
    orient2d(a, d, b) > 0.0
        && orient2d(d, b, c) > 0.0
        && orient2d(b, c, a) > 0.0
        && orient2d(c, a, d) > 0.0
}

/// Replaces the diagonal of the quadrilateral formed by triangle `t` and its neighbor across
/// local edge `edge`.
///
/// With `t = (a, b, c)` and its neighbor `(b, a, d)`, `t` becomes `(a, d, c)` and the neighbor
/// becomes `(d, b, c)`. Constraint edges, boundary edges and edges whose quadrilateral is not
/// strictly convex are rejected and leave the mesh untouched.
///
/// Returns `[t, neighbor]`.
pub fn flip_edge(mesh: &mut Mesh, t: usize, edge: usize) -> Result<[usize; 2], FlipError> {
    let t0 = *mesh.triangle(t);
    if t0.constrained[edge] {
        return Err(FlipError::Constrained);
    }
    let u = t0.neighbors[edge].ok_or(FlipError::Boundary)?;
    let t1 = *mesh.triangle(u);
    let [a, b] = t0.edge_vertices(edge);
    let c = t0.opposite_vertex(edge);
    let twin = t1.edge_index(b, a).ok_or(FlipError::MissingTwin)?;
    let d = t1.opposite_vertex(twin);

    if !is_strictly_convex([a, d, b, c].map(|v| mesh.vertex(v))) {
        return Err(FlipError::NotConvex);
    }

    let (n_bc, f_bc) = (
        t0.neighbors[next_index(edge)],
        t0.constrained[next_index(edge)],
    );
    let (n_ca, f_ca) = (
        t0.neighbors[prev_index(edge)],
        t0.constrained[prev_index(edge)],
    );
    let (n_ad, f_ad) = (
        t1.neighbors[next_index(twin)],
        t1.constrained[next_index(twin)],
    );
    let (n_db, f_db) = (
        t1.neighbors[prev_index(twin)],
        t1.constrained[prev_index(twin)],
    );

    let new_t0 = mesh.make_triangle([a, d, c], [n_ad, Some(u), n_ca], [f_ad, false, f_ca]);
    let new_t1 = mesh.make_triangle([d, b, c], [n_db, n_bc, Some(t)], [f_db, f_bc, false]);
    mesh.set_triangle(t, new_t0);
    mesh.set_triangle(u, new_t1);

    mesh.relink(n_ad, [a, d], t)
        .and_then(|_| mesh.relink(n_bc, [b, c], u))
        .map_err(|_| FlipError::MissingTwin)?;
    Ok([t, u])
}

impl Mesh {
    /// Inserts a point and restores the Delaunay property around it.
    ///
    /// Returns the index of the new vertex, or the index of an existing vertex lying within
    /// `epsilon` of `position`. Fails if the point lies outside of the mesh.
    pub fn insert(
        &mut self,
        position: Point2<f64>,
        epsilon: f64,
    ) -> Result<usize, TriangulationError> {
        validate_point(position)?;
        match self.find_containing(position, epsilon) {
            PositionInMesh::OnVertex(existing) => Ok(existing),
            PositionInMesh::OnFace(t) => {
                let v = self.push_vertex(position);
                let slots = split_triangle(self, t, v)?;
                self.set_hint(t);
                self.legalize(slots.map(|s| EdgeRef::new(s, 0)))?;
                Ok(v)
            }
            PositionInMesh::OnEdge(edge) => {
                let v = self.push_vertex(position);
                let slots = split_edge(self, edge.triangle, edge.edge, v)?;
                self.set_hint(edge.triangle);
                // A snapped vertex lies off the split edge, so the spokes need checking too.
                self.legalize(
                    slots
                        .iter()
                        .flat_map(|s| (0..3).map(move |i| EdgeRef::new(*s, i))),
                )?;
                Ok(v)
            }
            PositionInMesh::OutsideOfMesh => Err(TriangulationError::invalid_input(format!(
                "point ({}, {}) lies outside of the mesh",
                position.x, position.y
            ))),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{flip_edge, is_flippable, split_edge, split_triangle};
    use crate::error::FlipError;
    use crate::mesh::Mesh;
    use crate::Point2;

    fn single_triangle() -> Mesh {
        Mesh::from_triangle([
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(0.0, 4.0),
        ])
        .unwrap()
    }

    /// Two triangles around the diagonal (4, 3), surrounded by one triangle per outer edge.
    fn flip_fixture() -> Mesh {
        let vertices = vec![
            Point2::new(-0.5, 2.0),
            Point2::new(0.0, 0.0),
            Point2::new(2.5, 2.0),
            Point2::new(1.0, -1.5),
            Point2::new(1.0, 1.5),
            Point2::new(3.5, -0.5),
            Point2::new(2.0, 0.0),
            Point2::new(-0.5, -2.0),
        ];
        Mesh::from_triangles(
            vertices,
            &[
                [4, 3, 6],
                [3, 4, 1],
                [6, 3, 5],
                [4, 6, 2],
                [1, 4, 0],
                [3, 1, 7],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_split_triangle() {
        let mut mesh = single_triangle();
        let v = mesh.push_vertex(Point2::new(1.0, 1.0));
        assert_eq!(v, 3);
        let slots = split_triangle(&mut mesh, 0, v).unwrap();
        assert_eq!(slots, [0, 1, 2]);

        assert_eq!(mesh.triangle(0).vertices, [0, 1, 3]);
        assert_eq!(mesh.triangle(0).neighbors, [None, Some(1), Some(2)]);
        assert_eq!(mesh.triangle(1).vertices, [1, 2, 3]);
        assert_eq!(mesh.triangle(1).neighbors, [None, Some(2), Some(0)]);
        assert_eq!(mesh.triangle(2).vertices, [2, 0, 3]);
        assert_eq!(mesh.triangle(2).neighbors, [None, Some(0), Some(1)]);
        mesh.check_topology().unwrap();
    }

    #[test]
    fn test_split_triangle_keeps_outer_links() {
        let mut mesh = flip_fixture();
        let v = mesh.push_vertex(Point2::new(1.4, 0.1));
        let slots = split_triangle(&mut mesh, 0, v).unwrap();
        mesh.check_topology().unwrap();
        for slot in slots {
            assert_eq!(mesh.triangle(slot).vertices[2], v);
        }
        assert_eq!(mesh.triangle(2).neighbors[0], Some(slots[1]));
        assert_eq!(mesh.triangle(3).neighbors[0], Some(slots[2]));
        assert_eq!(mesh.triangle(1).neighbors[0], Some(0));
    }

    #[test]
    fn test_split_inner_edge() {
        let mut mesh = flip_fixture();
        let constraint = mesh.find_edge(4, 3).unwrap();
        mesh.set_constrained(constraint, true).unwrap();
        let v = mesh.push_vertex(Point2::new(1.0, 0.0));
        let slots = split_edge(&mut mesh, 0, 0, v).unwrap();
        assert_eq!(slots.as_slice(), &[0, 1, 6, 7]);
        mesh.check_topology().unwrap();
        assert_eq!(mesh.num_triangles(), 8);
        assert!(mesh.is_constraint_edge(4, v));
        assert!(mesh.is_constraint_edge(v, 3));
        assert!(!mesh.is_constraint_edge(6, v));
        assert!(!mesh.is_constraint_edge(1, v));
        assert!(mesh.find_undirected_edge(4, 3).is_none());
        assert_eq!(mesh.triangles_around(v).count(), 4);
    }

    #[test]
    fn test_split_hull_edge() {
        let mut mesh = single_triangle();
        let v = mesh.push_vertex(Point2::new(2.0, 0.0));
        let slots = split_edge(&mut mesh, 0, 0, v).unwrap();
        assert_eq!(slots.as_slice(), &[0, 1]);
        mesh.check_topology().unwrap();
        assert_eq!(mesh.triangle(0).vertices, [1, 2, v]);
        assert_eq!(mesh.triangle(1).vertices, [2, 0, v]);
        let area: f64 = (0..2).map(|t| mesh.triangle_area(t)).sum();
        assert_eq!(area, 8.0);
    }

    #[test]
    fn test_flip() {
        let mut mesh = flip_fixture();
        mesh.check_topology().unwrap();
        assert_eq!(mesh.triangle(0).edge_vertices(0), [4, 3]);

        assert_eq!(flip_edge(&mut mesh, 0, 0), Ok([0, 1]));
        mesh.check_topology().unwrap();

        assert_eq!(mesh.triangle(0).vertices, [4, 1, 6]);
        assert_eq!(mesh.triangle(1).vertices, [1, 3, 6]);
        assert!(mesh.find_edge(1, 6).is_some());
        assert!(mesh.find_edge(6, 1).is_some());
        assert!(mesh.find_undirected_edge(4, 3).is_none());

        let back_reference = |t: usize, from: usize, to: usize| {
            let triangle = mesh.triangle(t);
            triangle.neighbors[triangle.edge_index(from, to).unwrap()]
        };
        assert_eq!(back_reference(2, 6, 3), Some(1));
        assert_eq!(back_reference(3, 4, 6), Some(0));
        assert_eq!(back_reference(4, 1, 4), Some(0));
        assert_eq!(back_reference(5, 3, 1), Some(1));
    }

    #[test]
    fn test_flip_rejections() {
        let mut mesh = flip_fixture();
        assert_eq!(flip_edge(&mut mesh, 2, 2), Err(FlipError::Boundary));

        let edge = mesh.find_edge(4, 3).unwrap();
        mesh.set_constrained(edge, true).unwrap();
        assert_eq!(
            flip_edge(&mut mesh, edge.triangle, edge.edge),
            Err(FlipError::Constrained)
        );

        // The quadrilateral 3, 5, 6, 4 has a reflex corner at vertex 6.
        let reflex = mesh.find_edge(3, 6).unwrap();
        assert!(!is_flippable(&mesh, reflex.triangle, reflex.edge).unwrap());
        assert_eq!(
            flip_edge(&mut mesh, reflex.triangle, reflex.edge),
            Err(FlipError::NotConvex)
        );
        mesh.check_topology().unwrap();
    }

    #[test]
    fn test_insert_deduplicates() {
        let mut mesh = single_triangle();
        let v = mesh.insert(Point2::new(1.0, 1.0), 1e-10).unwrap();
        assert_eq!(mesh.insert(Point2::new(1.0, 1.0), 1e-10).unwrap(), v);
        assert_eq!(mesh.insert(Point2::new(1.0, 1.0 + 1e-12), 1e-10).unwrap(), v);
        assert_eq!(mesh.num_vertices(), 4);
        assert!(mesh
            .insert(Point2::new(10.0, 10.0), 1e-10)
            .unwrap_err()
            .is_input_error());
        mesh.sanity_check();
    }

    #[test]
    fn test_insert_on_edge() {
        let mut mesh = single_triangle();
        mesh.insert(Point2::new(1.0, 1.0), 0.0).unwrap();
        let inner = mesh.insert(Point2::new(0.5, 0.5), 0.0).unwrap();
        assert_eq!(mesh.num_triangles(), 5);
        assert!(mesh.triangles_around(inner).count() >= 4);

        let hull = mesh.insert(Point2::new(2.0, 0.0), 0.0).unwrap();
        assert_eq!(mesh.num_triangles(), 6);
        assert!(mesh.triangles_around(hull).count() >= 2);
        mesh.sanity_check();
    }

    #[test]
    fn test_snapped_points_keep_delaunay() {
        let mut mesh = Mesh::from_triangle([
            Point2::new(-20.0, -20.0),
            Point2::new(20.0, -20.0),
            Point2::new(0.0, 20.0),
        ])
        .unwrap();
        for i in -5..=5 {
            mesh.insert(Point2::new(i as f64, 0.0), 0.0).unwrap();
        }
        let before = mesh.num_vertices();
        for i in -5..5 {
            let offset = if i % 2 == 0 { 1e-3 } else { -1e-3 };
            let v = mesh
                .insert(Point2::new(i as f64 + 0.5, offset), 1e-2)
                .unwrap();
            assert!(v >= before);
            mesh.sanity_check();
        }
        for i in -5..5 {
            mesh.insert(Point2::new(i as f64 + 0.25, 2e-2), 0.0).unwrap();
            mesh.insert(Point2::new(i as f64 + 0.75, -2e-2), 0.0).unwrap();
        }
        mesh.sanity_check();
    }
}
