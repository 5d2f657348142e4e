use hashbrown::HashSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::constraints::{preprocess, PolygonInput, Preprocessed};
use crate::math::predicates::orient2d;
use crate::math::{self, is_inside_loop, validate_point};
use crate::mesh::{EdgeRef, Mesh, Triangle};
use crate::point_index::PointIndex;
use crate::refinement::refine;
use crate::{Point2, TriangulationError, TriangulationOptions};

/// The super triangle's extent as a multiple of the input's bounding box size.
const SUPER_TRIANGLE_MARGIN: f64 = 20.0;

/// Bound for the super triangle's coordinates. Input coordinates are at most 2^201, so the
/// margin fits and exact predicates on these values cannot overflow.
const SUPER_TRIANGLE_LIMIT: f64 = 1.645504557321206e63; // 1.0 * 2^210

/// The number of vertices of the super triangle. They occupy the first mesh indices.
const SUPER_VERTICES: usize = 3;

/// A finished constrained Delaunay triangulation.
///
/// Vertices are referenced by index. Triangles are ordered counterclockwise and store their
/// neighbors across each edge, see [Triangle].
#[derive(Debug, Clone, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde")
)]
pub struct Triangulation {
    /// All vertex positions, including Steiner points added by refinement.
    pub vertices: Vec<Point2<f64>>,
    /// All triangles.
    pub triangles: Vec<Triangle>,
    /// All constraint edges as vertex pairs, the smaller index first.
    pub constraints: Vec<[usize; 2]>,
    /// `false` if refinement stopped early because it ran out of Steiner points.
    pub refinement_complete: bool,
}

impl Triangulation {
    /// The number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// The number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// The positions of a triangle's vertices, counterclockwise.
    pub fn positions(&self, triangle: usize) -> [Point2<f64>; 3] {
        self.triangles[triangle].vertices.map(|v| self.vertices[v])
    }

    /// The area of a single triangle.
    pub fn triangle_area(&self, triangle: usize) -> f64 {
        math::triangle_area(self.positions(triangle))
    }

    /// The summed area of all triangles.
    pub fn total_area(&self) -> f64 {
        (0..self.triangles.len())
            .map(|t| self.triangle_area(t))
            .sum()
    }

    /// Returns `true` if the edge between `a` and `b` is a constraint edge.
    pub fn is_constraint_edge(&self, a: usize, b: usize) -> bool {
        self.constraints.contains(&sorted([a, b]))
    }

    #[cfg(test)]
    pub(crate) fn sanity_check(&self) {
        let mesh = Mesh::from_parts(self.vertices.clone(), self.triangles.clone());
        mesh.sanity_check();
        for triangle in &self.triangles {
            for i in 0..3 {
                let [a, b] = triangle.edge_vertices(i);
                assert_eq!(triangle.constrained[i], self.is_constraint_edge(a, b));
            }
        }
    }
}

/// Triangulates a point set with the default options.
///
/// The result covers the convex hull of the points. Points closer than
/// [DEFAULT_EPSILON](crate::options::DEFAULT_EPSILON) are merged.
///
/// ```
/// let triangulation =
///     cdt2d::triangulate([[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]).unwrap();
/// assert_eq!(triangulation.num_triangles(), 2);
/// assert!((triangulation.total_area() - 1.0).abs() < 1e-12);
/// ```
pub fn triangulate<P: Into<Point2<f64>>>(
    points: impl IntoIterator<Item = P>,
) -> Result<Triangulation, TriangulationError> {
    triangulate_with_options(points, &TriangulationOptions::default())
}

/// Triangulates a point set.
///
/// Fails with [TriangulationError::InvalidInput] if less than three distinct points are given
/// and with [TriangulationError::DegenerateGeometry] if all points are collinear.
pub fn triangulate_with_options<P: Into<Point2<f64>>>(
    points: impl IntoIterator<Item = P>,
    options: &TriangulationOptions,
) -> Result<Triangulation, TriangulationError> {
    let mut builder = CdtBuilder::new(*options);
    for point in points {
        builder.insert(point)?;
    }
    builder.finish()
}

/// Triangulates polygons with holes, constraint segments and constraint points.
///
/// Only triangles inside a contour and outside of its holes are kept, unless
/// [TriangulationOptions::keep_convex_hull] is set.
pub fn triangulate_polygons(input: &PolygonInput) -> Result<Triangulation, TriangulationError> {
    let options = &input.options;
    options.validate()?;
    let preprocessed = preprocess(&input.polygons, options.epsilon)?;

    let mut index = PointIndex::new(options.epsilon);
    let mut constraints = Vec::with_capacity(preprocessed.segments.len());
    for segment in &preprocessed.segments {
        let (from, _) = index.find_or_insert(segment.from);
        let (to, _) = index.find_or_insert(segment.to);
        if from != to {
            constraints.push([from, to]);
        }
    }
    for point in &preprocessed.points {
        index.find_or_insert(*point);
    }
    log::debug!(
        "polygon input: {} vertices, {} constraint segments",
        index.len(),
        constraints.len()
    );

    build(
        index.points(),
        &constraints,
        options,
        Domain::Polygons(&preprocessed),
    )
}

/// Builds a triangulation incrementally.
///
/// Points are deduplicated when inserted: inserting a point within `epsilon` of an earlier one
/// returns the earlier index. All work happens in [CdtBuilder::finish], vertices keep the
/// indices returned by [CdtBuilder::insert].
///
/// ```
/// use cdt2d::{CdtBuilder, TriangulationOptions};
///
/// let mut builder = CdtBuilder::new(TriangulationOptions::default());
/// let a = builder.insert([0.0, 0.0])?;
/// let b = builder.insert([2.0, 2.0])?;
/// builder.insert([2.0, 0.0])?;
/// builder.insert([0.0, 2.0])?;
/// builder.add_constraint(a, b)?;
///
/// let triangulation = builder.finish()?;
/// assert!(triangulation.is_constraint_edge(a, b));
/// # Ok::<(), cdt2d::TriangulationError>(())
/// ```
#[derive(Debug, Clone)]
pub struct CdtBuilder {
    options: TriangulationOptions,
    index: PointIndex,
    constraints: Vec<[usize; 2]>,
}

impl CdtBuilder {
    /// Creates an empty builder.
    pub fn new(options: TriangulationOptions) -> Self {
        CdtBuilder {
            index: PointIndex::new(options.epsilon),
            options,
            constraints: Vec::new(),
        }
    }

    /// Adds a vertex and returns its index.
    pub fn insert(&mut self, point: impl Into<Point2<f64>>) -> Result<usize, TriangulationError> {
        let point = point.into();
        validate_point(point)?;
        let (index, is_new) = self.index.find_or_insert(point);
        if !is_new {
            log::trace!("merged ({}, {}) into vertex {}", point.x, point.y, index);
        }
        Ok(index)
    }

    /// Requires the edge between the vertices `a` and `b` to be part of the triangulation.
    ///
    /// Constraint edges must not cross each other.
    pub fn add_constraint(&mut self, a: usize, b: usize) -> Result<(), TriangulationError> {
        let len = self.index.len();
        if a >= len || b >= len {
            return Err(TriangulationError::invalid_input(format!(
                "constraint ({}, {}) refers to a missing vertex, only {} vertices exist",
                a, b, len
            )));
        }
        if a != b {
            self.constraints.push([a, b]);
        }
        Ok(())
    }

    /// The number of distinct vertices inserted so far.
    pub fn num_vertices(&self) -> usize {
        self.index.len()
    }

    /// Triangulates all inserted vertices and constraint edges.
    pub fn finish(self) -> Result<Triangulation, TriangulationError> {
        self.options.validate()?;
        build(
            self.index.points(),
            &self.constraints,
            &self.options,
            Domain::ConvexHull,
        )
    }
}

/// The area covered by the final triangulation.
#[derive(Clone, Copy)]
enum Domain<'a> {
    ConvexHull,
    Polygons(&'a Preprocessed),
}

fn build(
    points: &[Point2<f64>],
    constraints: &[[usize; 2]],
    options: &TriangulationOptions,
    domain: Domain,
) -> Result<Triangulation, TriangulationError> {
    if points.len() < 3 {
        return Err(TriangulationError::invalid_input(format!(
            "at least three distinct points are required, got {}",
            points.len()
        )));
    }
    if points
        .iter()
        .all(|p| orient2d(points[0], points[1], *p) == 0.0)
    {
        return Err(TriangulationError::degenerate("all points are collinear"));
    }

    let mut mesh = Mesh::from_enclosing_triangle(super_triangle(points))?;
    let mut ids = Vec::with_capacity(points.len());
    for point in points {
        let id = mesh.insert(*point, options.epsilon)?;
        log::trace!("inserted ({}, {}) as vertex {}", point.x, point.y, id);
        ids.push(id);
    }
    log::debug!(
        "inserted {} points, {} triangles",
        points.len(),
        mesh.num_triangles()
    );

    for &[a, b] in constraints {
        mesh.insert_constraint_edge(ids[a], ids[b])?;
    }
    let mut accepted = constraint_edges(&mesh);
    log::debug!("recovered {} constraint edges", accepted.len());

    let hull = convex_hull(points);
    for i in 0..hull.len() {
        let [a, b] = [hull[i], hull[(i + 1) % hull.len()]];
        mesh.insert_constraint_edge(ids[a], ids[b])?;
    }
    let hull_positions: Vec<Point2<f64>> = hull.iter().map(|&i| points[i]).collect();

    let is_in_domain = |point: Point2<f64>| match domain {
        Domain::ConvexHull => is_inside_loop(&hull_positions, point),
        Domain::Polygons(preprocessed) if options.keep_convex_hull => {
            is_inside_loop(&hull_positions, point)
                && (preprocessed.is_in_domain(point) || !preprocessed.is_in_any_hole(point))
        }
        Domain::Polygons(preprocessed) => preprocessed.is_in_domain(point),
    };

    let mut refinement_complete = true;
    if options.refine {
        let result = refine(&mut mesh, options, is_in_domain)?;
        refinement_complete = result.refinement_complete;
        for ([from, to], midpoint) in result.split_segments {
            if accepted.remove(&sorted([from, to])) {
                accepted.insert(sorted([from, midpoint]));
                accepted.insert(sorted([midpoint, to]));
            }
        }
    }

    // Hull edges only protected the outer boundary while building.
    for t in 0..mesh.num_triangles() {
        for i in 0..3 {
            let triangle = mesh.triangle(t);
            if triangle.constrained[i] && !accepted.contains(&sorted(triangle.edge_vertices(i)))
            {
                mesh.set_constrained(EdgeRef::new(t, i), false)?;
            }
        }
    }

    let keep = |triangle: &Triangle| {
        if triangle.touches_any_of_first(SUPER_VERTICES) {
            return false;
        }
        match domain {
            Domain::ConvexHull => true,
            Domain::Polygons(_) => {
                let [a, b, c] = triangle.vertices.map(|v| mesh.vertex(v));
                is_in_domain(Point2::new(
                    (a.x + b.x + c.x) / 3.0,
                    (a.y + b.y + c.y) / 3.0,
                ))
            }
        }
    };
    let mut triangulation = compact(&mesh, keep);
    triangulation.refinement_complete = refinement_complete;
    log::debug!(
        "triangulation finished: {} vertices, {} triangles, {} constraint edges",
        triangulation.num_vertices(),
        triangulation.num_triangles(),
        triangulation.constraints.len()
    );
    Ok(triangulation)
}

/// A triangle containing the bounding box of `points` with a generous margin.
fn super_triangle(points: &[Point2<f64>]) -> [Point2<f64>; 3] {
    let (mut min, mut max) = (points[0], points[0]);
    for point in points {
        min = Point2::new(min.x.min(point.x), min.y.min(point.y));
        max = Point2::new(max.x.max(point.x), max.y.max(point.y));
    }
    let center = min.midpoint(max);
    let size = (max.x - min.x).max(max.y - min.y);
    let margin = (size * SUPER_TRIANGLE_MARGIN)
        .min(SUPER_TRIANGLE_LIMIT - center.x.abs().max(center.y.abs()));
    [
        Point2::new(center.x - margin, center.y - size),
        Point2::new(center.x + margin, center.y - size),
        Point2::new(center.x, center.y + margin),
    ]
    .map(|p| Point2::new(flush_tiny(p.x), flush_tiny(p.y)))
}

fn flush_tiny(value: f64) -> f64 {
    if value.abs() < math::MIN_ALLOWED_VALUE {
        0.0
    } else {
        value
    }
}

/// Returns the indices of the convex hull's corners in counterclockwise order.
///
/// Points lying on a hull edge are not included.
fn convex_hull(points: &[Point2<f64>]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by(|&a, &b| {
        points[a]
            .x
            .total_cmp(&points[b].x)
            .then(points[a].y.total_cmp(&points[b].y))
    });

    let mut hull: Vec<usize> = Vec::with_capacity(points.len() + 1);
    let reversed: Vec<usize> = order.iter().rev().copied().collect();
    for chain in [order, reversed] {
        let start = hull.len();
        for index in chain {
            while hull.len() >= start + 2
                && orient2d(
                    points[hull[hull.len() - 2]],
                    points[hull[hull.len() - 1]],
                    points[index],
                ) <= 0.0
            {
                hull.pop();
            }
            hull.push(index);
        }
        // The last point of each chain starts the other one.
        hull.pop();
    }
    hull
}

/// All constraint edges of the mesh as sorted vertex pairs.
fn constraint_edges(mesh: &Mesh) -> HashSet<[usize; 2]> {
    mesh.triangles()
        .iter()
        .flat_map(|triangle| {
            (0..3)
                .filter(|&i| triangle.constrained[i])
                .map(|i| sorted(triangle.edge_vertices(i)))
        })
        .collect()
}

/// Copies the triangles accepted by `keep` and all vertices they use into a new triangulation.
///
/// Vertices keep their relative order. Neighbors that were dropped become `None`.
fn compact(mesh: &Mesh, keep: impl Fn(&Triangle) -> bool) -> Triangulation {
    let kept: Vec<usize> = (0..mesh.num_triangles())
        .filter(|&t| keep(mesh.triangle(t)))
        .collect();

    let mut triangle_map = vec![None; mesh.num_triangles()];
    let mut vertex_map = vec![None; mesh.num_vertices()];
    for (new, &old) in kept.iter().enumerate() {
        triangle_map[old] = Some(new);
        for v in mesh.triangle(old).vertices {
            vertex_map[v] = Some(0);
        }
    }

    let mut vertices = Vec::new();
    for (old, slot) in vertex_map.iter_mut().enumerate() {
        if slot.is_some() {
            *slot = Some(vertices.len());
            vertices.push(mesh.vertex(old));
        }
    }

    let triangles: Vec<Triangle> = kept
        .iter()
        .map(|&old| {
            let triangle = mesh.triangle(old);
            Triangle {
                vertices: triangle.vertices.map(|v| vertex_map[v].unwrap_or(v)),
                neighbors: triangle
                    .neighbors
                    .map(|neighbor| neighbor.and_then(|n| triangle_map[n])),
                ..*triangle
            }
        })
        .collect();

    // Edges on the trimmed border lose one side, hence the set.
    let mut constraints: Vec<[usize; 2]> = triangles
        .iter()
        .flat_map(|triangle| {
            (0..3)
                .filter(|&i| triangle.constrained[i])
                .map(|i| sorted(triangle.edge_vertices(i)))
        })
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    constraints.sort_unstable();

    Triangulation {
        vertices,
        triangles,
        constraints,
        refinement_complete: true,
    }
}

fn sorted([a, b]: [usize; 2]) -> [usize; 2] {
    if a <= b {
        [a, b]
    } else {
        [b, a]
    }
}
