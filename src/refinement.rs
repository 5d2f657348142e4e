//! Delaunay refinement: inserts Steiner points until all triangles of the domain meet an area
//! and a minimum angle bound.
//!
//! This is a variant of the classical algorithms by Jim Ruppert and Paul Chew. Encroached
//! constraint edges are split at their midpoint, bad triangles receive a vertex at their
//! circumcenter unless that circumcenter would encroach a constraint edge.
use std::collections::VecDeque;

use hashbrown::HashSet;
use smallvec::SmallVec;

use crate::math::Circle;
use crate::mesh::operations::split_edge;
use crate::mesh::{next_index, prev_index, EdgeRef, Mesh, PositionInMesh, Triangle};
use crate::{Point2, TriangulationError, TriangulationOptions};

/// The number of vertices of the enclosing super triangle. These always come first.
const SUPER_VERTICES: usize = 3;

/// Describes the outcome of a refinement.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct RefinementResult {
    /// `false` if the Steiner point budget was exhausted while bad triangles remained.
    pub refinement_complete: bool,
    /// The number of inserted Steiner points.
    pub added: usize,
    /// Every constraint edge split during refinement as `([from, to], midpoint)`, in order.
    pub split_segments: Vec<([usize; 2], usize)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefinementHint {
    Ignore,
    ShouldRefine,
    MustRefine,
}

struct Refinement<'a, F> {
    mesh: &'a mut Mesh,
    is_in_domain: F,
    epsilon: f64,
    max_area: Option<f64>,
    ratio_limit_2: f64,
    num_initial_vertices: usize,
    segments: VecDeque<[usize; 2]>,
    faces: VecDeque<[usize; 3]>,
    unsplittable: HashSet<[usize; 2]>,
    result: RefinementResult,
}

/// Refines `mesh` in place.
///
/// Only triangles whose centroid satisfies `is_in_domain` and which do not touch the super
/// triangle are considered. Circumcenters outside the domain are never inserted.
pub(crate) fn refine<F>(
    mesh: &mut Mesh,
    options: &TriangulationOptions,
    is_in_domain: F,
) -> Result<RefinementResult, TriangulationError>
where
    F: Fn(Point2<f64>) -> bool,
{
    let num_initial_vertices = mesh.num_vertices();
    let budget =
        options.additional_vertex_budget(num_initial_vertices.saturating_sub(SUPER_VERTICES));
    let ratio_limit = options.radius_to_shortest_edge_limit();

    let mut refinement = Refinement {
        mesh,
        is_in_domain,
        epsilon: options.epsilon,
        max_area: options.max_area,
        ratio_limit_2: ratio_limit * ratio_limit,
        num_initial_vertices,
        segments: VecDeque::new(),
        faces: VecDeque::new(),
        unsplittable: HashSet::new(),
        result: RefinementResult {
            refinement_complete: true,
            ..Default::default()
        },
    };
    refinement.run(budget)?;

    let result = refinement.result;
    log::debug!(
        "refinement inserted {} Steiner points, {} constraint splits, complete: {}",
        result.added,
        result.split_segments.len(),
        result.refinement_complete
    );
    Ok(result)
}

impl<F> Refinement<'_, F>
where
    F: Fn(Point2<f64>) -> bool,
{
    fn run(&mut self, budget: usize) -> Result<(), TriangulationError> {
        for index in 0..self.mesh.num_triangles() {
            let triangle = *self.mesh.triangle(index);
            self.faces.push_back(triangle.vertices);
            for i in 0..3 {
                if triangle.constrained[i] {
                    self.segments.push_back(triangle.edge_vertices(i));
                }
            }
        }

        loop {
            if let Some([from, to]) = self.segments.pop_front() {
                let Some(edge) = self.mesh.find_edge(from, to) else {
                    continue;
                };
                if !self.is_encroached(edge)? {
                    continue;
                }
                if self.result.added >= budget {
                    self.result.refinement_complete = false;
                    break;
                }
                self.split_segment(edge)?;
                continue;
            }

            let Some(vertices) = self.faces.pop_front() else {
                break;
            };
            let Some(t) = self.find_triangle(vertices) else {
                continue;
            };
            let hint = self.refinement_hint(t);
            if hint == RefinementHint::Ignore {
                continue;
            }
            if self.result.added >= budget {
                self.result.refinement_complete = false;
                break;
            }
            self.refine_triangle(t, vertices, hint)?;
        }
        Ok(())
    }

    fn find_triangle(&self, [a, b, c]: [usize; 3]) -> Option<usize> {
        let edge = self.mesh.find_edge(a, b)?;
        (self.mesh.triangle(edge.triangle).opposite_vertex(edge.edge) == c)
            .then_some(edge.triangle)
    }

    fn is_inside(&self, triangle: &Triangle) -> bool {
        if triangle.touches_any_of_first(SUPER_VERTICES) {
            return false;
        }
        let [a, b, c] = triangle.vertices.map(|v| self.mesh.vertex(v));
        let centroid = Point2::new((a.x + b.x + c.x) / 3.0, (a.y + b.y + c.y) / 3.0);
        (self.is_in_domain)(centroid)
    }

    /// Returns `true` if a vertex of a triangle inside the domain lies within the diametral
    /// circle of `edge`.
    fn is_encroached(&self, edge: EdgeRef) -> Result<bool, TriangulationError> {
        let triangle = self.mesh.triangle(edge.triangle);
        let [from, to] = triangle.edge_vertices(edge.edge);
        if !triangle.constrained[edge.edge] || self.unsplittable.contains(&sorted([from, to])) {
            return Ok(false);
        }
        let diametral = Circle::from_diameter(self.mesh.vertex(from), self.mesh.vertex(to));

        let sides = [Some(edge), self.mesh.twin(edge)?];
        Ok(sides.into_iter().flatten().any(|side| {
            let triangle = self.mesh.triangle(side.triangle);
            let opposite = triangle.opposite_vertex(side.edge);
            opposite >= SUPER_VERTICES
                && self.is_inside(triangle)
                && diametral.contains(self.mesh.vertex(opposite))
        }))
    }

    fn refinement_hint(&self, t: usize) -> RefinementHint {
        let triangle = self.mesh.triangle(t);
        if !self.is_inside(triangle) {
            return RefinementHint::Ignore;
        }
        if let Some(max_area) = self.max_area {
            if self.mesh.triangle_area(t) > max_area {
                return RefinementHint::MustRefine;
            }
        }

        let circle = triangle.circle;
        if !circle.is_valid() {
            return RefinementHint::Ignore;
        }
        let (_, length_2) = self.shortest_edge(t);
        if circle.radius_2 / length_2 > self.ratio_limit_2 {
            RefinementHint::ShouldRefine
        } else {
            RefinementHint::Ignore
        }
    }

    fn shortest_edge(&self, t: usize) -> (usize, f64) {
        let triangle = self.mesh.triangle(t);
        (0..3)
            .map(|i| {
                let [from, to] = triangle.edge_vertices(i);
                (i, self.mesh.vertex(from).distance_2(self.mesh.vertex(to)))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .unwrap_or((0, 0.0))
    }

    fn refine_triangle(
        &mut self,
        t: usize,
        vertices: [usize; 3],
        hint: RefinementHint,
    ) -> Result<(), TriangulationError> {
        let triangle = *self.mesh.triangle(t);

        let (shortest, _) = self.shortest_edge(t);
        let is_fixed_angle = [next_index(shortest), prev_index(shortest)]
            .into_iter()
            .all(|i| triangle.constrained[i]);
        let [from, to] = triangle.edge_vertices(shortest);
        if hint == RefinementHint::ShouldRefine
            && is_fixed_angle
            && (from >= self.num_initial_vertices || to >= self.num_initial_vertices)
        {
            // A small input angle between two constraint edges that were already split.
            return Ok(());
        }

        let circumcenter = triangle.circle.center;
        let location = self.mesh.locate_with_hint(circumcenter, t, self.epsilon);
        if let Some(edge) = self.encroached_by(circumcenter, t, location)? {
            // Retried later: either the edge is split now or it is excluded from here on.
            self.split_segment(edge)?;
            self.faces.push_back(vertices);
            return Ok(());
        }
        if !(self.is_in_domain)(circumcenter) {
            self.skip(hint, circumcenter, "outside of the domain");
            return Ok(());
        }

        match location {
            PositionInMesh::OnFace(_) => {}
            PositionInMesh::OnEdge(edge)
                if !self.mesh.triangle(edge.triangle).constrained[edge.edge] => {}
            _ => {
                self.skip(hint, circumcenter, "on a vertex or constraint edge");
                return Ok(());
            }
        }
        self.mesh.set_hint(t);
        let before = self.mesh.num_vertices();
        let vertex = self.mesh.insert(circumcenter, self.epsilon)?;
        if vertex < before {
            self.skip(hint, circumcenter, "on a vertex");
            return Ok(());
        }
        self.result.added += 1;
        self.enqueue_around(vertex);
        Ok(())
    }

    /// Gives up on a bad triangle. Area violations mark the refinement as incomplete.
    fn skip(&mut self, hint: RefinementHint, circumcenter: Point2<f64>, reason: &str) {
        if hint == RefinementHint::MustRefine {
            self.result.refinement_complete = false;
            log::warn!(
                "cannot refine oversized triangle, circumcenter ({}, {}) lies {}",
                circumcenter.x,
                circumcenter.y,
                reason
            );
        } else {
            log::trace!(
                "skipping circumcenter ({}, {}) {}",
                circumcenter.x,
                circumcenter.y,
                reason
            );
        }
    }

    /// Returns the constraint edge closest to `point` whose diametral circle contains `point`.
    ///
    /// Only the edges bounding the cavity of `point` are tested: the triangles whose
    /// circumcircles contain it, reachable from `source` (whose circumcircle contains `point`)
    /// or from the location of `point` without crossing a constraint edge. Edges that do not
    /// border a triangle inside the domain are ignored.
    fn encroached_by(
        &self,
        point: Point2<f64>,
        source: usize,
        location: PositionInMesh,
    ) -> Result<Option<EdgeRef>, TriangulationError> {
        let mut seeds: SmallVec<[usize; 3]> = SmallVec::new();
        seeds.push(source);
        match location {
            PositionInMesh::OnFace(t) => seeds.push(t),
            PositionInMesh::OnEdge(edge) => {
                seeds.push(edge.triangle);
                seeds.extend(self.mesh.twin(edge)?.map(|twin| twin.triangle));
            }
            PositionInMesh::OnVertex(_) | PositionInMesh::OutsideOfMesh => {}
        }

        let mut pending: SmallVec<[EdgeRef; 16]> = SmallVec::new();
        let mut visited = HashSet::new();
        for t in seeds {
            if visited.insert(t) {
                pending.extend((0..3).map(|i| EdgeRef::new(t, i)));
            }
        }

        let mut best: Option<(EdgeRef, f64)> = None;
        while let Some(edge) = pending.pop() {
            let triangle = self.mesh.triangle(edge.triangle);
            if !triangle.constrained[edge.edge] {
                let Some(twin) = self.mesh.twin(edge)? else {
                    continue;
                };
                if visited.contains(&twin.triangle)
                    || !self.mesh.circumcircle_contains(twin.triangle, point)
                {
                    continue;
                }
                visited.insert(twin.triangle);
                pending.extend(
                    [next_index(twin.edge), prev_index(twin.edge)]
                        .map(|i| EdgeRef::new(twin.triangle, i)),
                );
                continue;
            }

            let [from, to] = triangle.edge_vertices(edge.edge);
            if from < SUPER_VERTICES
                || to < SUPER_VERTICES
                || self.unsplittable.contains(&sorted([from, to]))
            {
                continue;
            }
            let diametral = Circle::from_diameter(self.mesh.vertex(from), self.mesh.vertex(to));
            if !diametral.contains(point) || !self.borders_domain(edge)? {
                continue;
            }
            let distance_2 = diametral.center.distance_2(point);
            if best.map_or(true, |(_, d)| distance_2 < d) {
                best = Some((edge, distance_2));
            }
        }
        Ok(best.map(|(edge, _)| edge))
    }

    fn borders_domain(&self, edge: EdgeRef) -> Result<bool, TriangulationError> {
        let sides = [Some(edge), self.mesh.twin(edge)?];
        Ok(sides
            .into_iter()
            .flatten()
            .any(|side| self.is_inside(self.mesh.triangle(side.triangle))))
    }

    /// Splits a constraint edge at its midpoint. Both halves stay constrained.
    ///
    /// Returns `false` if the edge is too short to be split.
    fn split_segment(&mut self, edge: EdgeRef) -> Result<bool, TriangulationError> {
        let [from, to] = self.mesh.triangle(edge.triangle).edge_vertices(edge.edge);
        let (p_from, p_to) = (self.mesh.vertex(from), self.mesh.vertex(to));
        let midpoint = p_from.midpoint(p_to);
        let epsilon_2 = self.epsilon * self.epsilon;

        if midpoint.distance_2(p_from) <= epsilon_2
            || midpoint.distance_2(p_to) <= epsilon_2
            || !self.mesh.can_split_edge_at(edge, midpoint)
        {
            self.unsplittable.insert(sorted([from, to]));
            return Ok(false);
        }

        let vertex = self.mesh.push_vertex(midpoint);
        let slots = split_edge(self.mesh, edge.triangle, edge.edge, vertex)?;
        self.mesh.set_hint(edge.triangle);
        // The rounded midpoint may lie slightly off the segment, so every edge of the new
        // triangles is checked.
        self.mesh.legalize(
            slots
                .iter()
                .flat_map(|slot| (0..3).map(move |i| EdgeRef::new(*slot, i))),
        )?;

        self.result.added += 1;
        self.result.split_segments.push(([from, to], vertex));
        self.segments.extend([[from, vertex], [vertex, to]]);
        self.enqueue_around(vertex);
        log::trace!("split constraint edge ({}, {}) at vertex {}", from, to, vertex);
        Ok(true)
    }

    fn enqueue_around(&mut self, vertex: usize) {
        let around: Vec<usize> = self.mesh.triangles_around(vertex).collect();
        for t in around {
            let triangle = *self.mesh.triangle(t);
            self.faces.push_back(triangle.vertices);
            for i in 0..3 {
                if triangle.constrained[i] {
                    self.segments.push_back(triangle.edge_vertices(i));
                }
            }
        }
    }
}

fn sorted([a, b]: [usize; 2]) -> [usize; 2] {
    if a <= b {
        [a, b]
    } else {
        [b, a]
    }
}
