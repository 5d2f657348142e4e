use std::collections::VecDeque;

use super::operations::{flip_edge, is_flippable};
use super::{next_index, EdgeRef, Mesh};
use crate::math::predicates::orient2d;
use crate::math::{project_point, segments_cross_properly};
use crate::TriangulationError;

/// The result of walking along a segment that is not yet an edge of the mesh.
enum SegmentTrace {
    /// The first vertex lying in the interior of the segment, seen from its start.
    Vertex(usize),
    /// The edges crossing the segment, ordered from its start to its end.
    Crossing(VecDeque<[usize; 2]>),
}

impl Mesh {
    /// Makes the segment between the vertices `from` and `to` an edge of the mesh and marks it as
    /// a constraint edge.
    ///
    /// Vertices lying exactly on the segment split it into several constraint edges. Edges
    /// crossing the segment are flipped away, the Delaunay property is restored afterwards for
    /// all edges that are not constraints.
    ///
    /// Fails with [TriangulationError::InternalInvariantViolation] if the segment crosses an
    /// existing constraint edge.
    pub fn insert_constraint_edge(
        &mut self,
        from: usize,
        to: usize,
    ) -> Result<(), TriangulationError> {
        let mut pending = vec![(from, to)];
        while let Some((from, to)) = pending.pop() {
            if from == to {
                continue;
            }
            if let Some(edge) = self.find_undirected_edge(from, to) {
                self.set_constrained(edge, true)?;
                continue;
            }
            match self.trace_segment(from, to)? {
                SegmentTrace::Vertex(split) => {
                    pending.push((split, to));
                    pending.push((from, split));
                }
                SegmentTrace::Crossing(crossing) => self.recover_edge(from, to, crossing)?,
            }
        }
        Ok(())
    }

    /// Walks from `from` towards `to` through the triangles intersected by the segment.
    ///
    /// Stops at the first vertex lying exactly on the segment. Otherwise returns every crossed
    /// edge in the order of the walk. Fails if a crossed edge is a constraint edge.
    fn trace_segment(&self, from: usize, to: usize) -> Result<SegmentTrace, TriangulationError> {
        let p_from = self.vertices[from];
        let p_to = self.vertices[to];
        let ahead = |v: usize| {
            orient2d(p_from, p_to, self.vertices[v]) == 0.0
                && project_point(p_from, p_to, self.vertices[v]).is_on_edge()
        };

        // Find the triangle around `from` whose corner contains the segment's direction.
        let mut start = None;
        for t in self.triangles_around(from) {
            let triangle = &self.triangles[t];
            let Some(k) = triangle.vertex_index(from) else {
                continue;
            };
            let [right, left] = triangle.edge_vertices(next_index(k));
            for v in [right, left] {
                if v == to {
                    return Ok(SegmentTrace::Crossing(VecDeque::new()));
                }
                if ahead(v) {
                    return Ok(SegmentTrace::Vertex(v));
                }
            }
            if orient2d(p_from, p_to, self.vertices[right]) < 0.0
                && orient2d(p_from, p_to, self.vertices[left]) > 0.0
            {
                start = Some(EdgeRef::new(t, next_index(k)));
                break;
            }
        }
        let mut edge = start.ok_or_else(|| {
            TriangulationError::invariant(format!(
                "no triangle around vertex {} faces vertex {}",
                from, to
            ))
        })?;

        // The current edge always runs from the right to the left side of the segment.
        let mut crossing = VecDeque::new();
        loop {
            let triangle = &self.triangles[edge.triangle];
            let [right, left] = triangle.edge_vertices(edge.edge);
            if triangle.constrained[edge.edge] {
                return Err(TriangulationError::invariant(format!(
                    "constraint edge ({}, {}) crosses constraint edge ({}, {})",
                    from, to, right, left
                )));
            }
            crossing.push_back([right, left]);

            let twin = self.twin(edge)?.ok_or_else(|| {
                TriangulationError::invariant(format!(
                    "segment ({}, {}) leaves the mesh through edge ({}, {})",
                    from, to, right, left
                ))
            })?;
            let next = &self.triangles[twin.triangle];
            let w = next.opposite_vertex(twin.edge);
            if w == to {
                return Ok(SegmentTrace::Crossing(crossing));
            }
            if ahead(w) {
                return Ok(SegmentTrace::Vertex(w));
            }
            let [from_next, to_next] = if orient2d(p_from, p_to, self.vertices[w]) < 0.0 {
                [w, left]
            } else {
                [right, w]
            };
            let index = next.edge_index(from_next, to_next).ok_or_else(|| {
                TriangulationError::invariant(format!(
                    "triangle {} lacks edge ({}, {})",
                    twin.triangle, from_next, to_next
                ))
            })?;
            edge = EdgeRef::new(twin.triangle, index);
        }
    }

    /// Flips away all edges crossing `from -> to` until the segment becomes an edge.
    ///
    /// Every triangle touched by a flip is legalized afterwards.
    fn recover_edge(
        &mut self,
        from: usize,
        to: usize,
        mut crossing: VecDeque<[usize; 2]>,
    ) -> Result<(), TriangulationError> {
        let p_from = self.vertices[from];
        let p_to = self.vertices[to];
        let mut modified = Vec::new();

        let limit = 64 + 8 * crossing.len() * crossing.len();
        let mut iterations = 0;
        while let Some([u, v]) = crossing.pop_front() {
            iterations += 1;
            if iterations > limit {
                return Err(TriangulationError::invariant(format!(
                    "failed to recover constraint edge ({}, {})",
                    from, to
                )));
            }

            let edge = self.find_undirected_edge(u, v).ok_or_else(|| {
                TriangulationError::invariant(format!("crossing edge ({}, {}) vanished", u, v))
            })?;
            if !is_flippable(self, edge.triangle, edge.edge)? {
                crossing.push_back([u, v]);
                continue;
            }

            let [t0, t1] = flip_edge(self, edge.triangle, edge.edge)?;
            modified.extend([t0, t1]);
            let [c, d] = self.triangles[t0].edge_vertices(1);
            if segments_cross_properly(p_from, p_to, self.vertices[c], self.vertices[d]) {
                crossing.push_back([c, d]);
            }
        }

        let edge = self.find_undirected_edge(from, to).ok_or_else(|| {
            TriangulationError::invariant(format!(
                "constraint edge ({}, {}) missing after recovery",
                from, to
            ))
        })?;
        self.set_constrained(edge, true)?;

        modified.sort_unstable();
        modified.dedup();
        let to_legalize: Vec<EdgeRef> = modified
            .into_iter()
            .flat_map(|t| (0..3).map(move |i| EdgeRef::new(t, i)))
            .collect();
        self.legalize(to_legalize)?;
        log::trace!("recovered constraint edge ({}, {})", from, to);
        Ok(())
    }
}
