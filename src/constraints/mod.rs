//! Turns polygon input into a clean set of pairwise non crossing constraint segments.
mod merge;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::math::{is_inside_loop, is_on_loop_boundary, validate_point};
use crate::point_index::PointIndex;
use crate::{Point2, TriangulationError, TriangulationOptions};

use merge::{lies_inside, SegmentSet};

/// A polygon given by its outer contour, optional holes, constraint segments and points.
///
/// All loops are implicitly closed; repeating the first point at the end is allowed. Loops may
/// use either orientation and may intersect themselves or each other.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde", default)
)]
pub struct Polygon {
    /// The outer boundary
    pub contour: Vec<Point2<f64>>,
    /// Boundaries of regions cut out of the polygon
    pub holes: Vec<Vec<Point2<f64>>>,
    /// Additional segments that must become mesh edges
    pub constraints: Vec<[Point2<f64>; 2]>,
    /// Additional points that must become mesh vertices
    pub points: Vec<Point2<f64>>,
}

impl Polygon {
    /// Creates a polygon without holes or additional constraints.
    pub fn new<P: Into<Point2<f64>>>(contour: impl IntoIterator<Item = P>) -> Self {
        Polygon {
            contour: contour.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Adds a hole.
    pub fn with_hole<P: Into<Point2<f64>>>(mut self, hole: impl IntoIterator<Item = P>) -> Self {
        self.holes.push(hole.into_iter().map(Into::into).collect());
        self
    }

    /// Adds a constraint segment.
    pub fn with_constraint(
        mut self,
        from: impl Into<Point2<f64>>,
        to: impl Into<Point2<f64>>,
    ) -> Self {
        self.constraints.push([from.into(), to.into()]);
        self
    }

    /// Adds a constraint point.
    pub fn with_point(mut self, point: impl Into<Point2<f64>>) -> Self {
        self.points.push(point.into());
        self
    }
}

/// The input of [triangulate_polygons](crate::triangulate_polygons).
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde", default)
)]
pub struct PolygonInput {
    /// All polygons
    pub polygons: Vec<Polygon>,
    /// Triangulation and refinement options
    pub options: TriangulationOptions,
}

impl PolygonInput {
    /// Creates an input with default options.
    pub fn new(polygons: Vec<Polygon>) -> Self {
        PolygonInput {
            polygons,
            options: TriangulationOptions::default(),
        }
    }

    /// Replaces the options.
    pub fn with_options(mut self, options: TriangulationOptions) -> Self {
        self.options = options;
        self
    }
}

/// The origin of a constraint segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde")
)]
pub enum SegmentKind {
    /// Part of a polygon's outer boundary
    Contour,
    /// Part of a hole boundary
    Hole,
    /// A user supplied constraint segment
    User,
}

/// A constraint segment.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde")
)]
pub struct Segment {
    /// The first endpoint
    pub from: Point2<f64>,
    /// The second endpoint
    pub to: Point2<f64>,
    /// Where the segment came from
    pub kind: SegmentKind,
    /// Index of the polygon the segment came from
    pub polygon: usize,
}

impl Segment {
    /// The segment's midpoint.
    pub fn midpoint(&self) -> Point2<f64> {
        self.from.midpoint(self.to)
    }
}

/// The filled area of a polygon: the inside of its contour minus the inside of its holes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde")
)]
pub struct Region {
    /// Index of the polygon this region belongs to
    pub polygon: usize,
    /// The cleaned contour loop
    pub contour: Vec<Point2<f64>>,
    /// The cleaned hole loops
    pub holes: Vec<Vec<Point2<f64>>>,
}

impl Region {
    /// Returns `true` if `point` lies inside the contour (even-odd rule).
    pub fn in_contour(&self, point: Point2<f64>) -> bool {
        is_inside_loop(&self.contour, point)
    }

    /// Returns `true` if `point` lies inside any hole.
    pub fn in_hole(&self, point: Point2<f64>) -> bool {
        self.holes.iter().any(|hole| is_inside_loop(hole, point))
    }

    /// Returns `true` if `point` lies inside the contour and outside of all holes.
    pub fn contains(&self, point: Point2<f64>) -> bool {
        self.in_contour(point) && !self.in_hole(point)
    }

    /// Like [Region::contains], but points within `epsilon` of any boundary are considered
    /// inside.
    pub fn covers(&self, point: Point2<f64>, epsilon: f64) -> bool {
        let on_boundary = is_on_loop_boundary(&self.contour, point, epsilon)
            || self
                .holes
                .iter()
                .any(|hole| is_on_loop_boundary(hole, point, epsilon));
        on_boundary || self.contains(point)
    }
}

/// The result of [preprocess].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Preprocessed {
    /// Pairwise non crossing constraint segments
    pub segments: Vec<Segment>,
    /// Accepted constraint points not lying on any segment
    pub points: Vec<Point2<f64>>,
    /// The filled area of every polygon with a valid contour
    pub regions: Vec<Region>,
}

impl Preprocessed {
    /// Returns `true` if any region contains `point`.
    pub fn is_in_domain(&self, point: Point2<f64>) -> bool {
        self.regions.iter().any(|region| region.contains(point))
    }

    /// Returns `true` if `point` lies inside any hole of any region.
    pub fn is_in_any_hole(&self, point: Point2<f64>) -> bool {
        self.regions.iter().any(|region| region.in_hole(point))
    }
}

/// Converts polygons into non crossing constraint segments, free constraint points and the
/// regions used for trimming.
///
/// Contour, hole and user segments are merged polygon by polygon. Afterwards, hole segments
/// lying in the filled area of another polygon are dropped, user segments and constraint points
/// are kept only inside the filled area of some polygon. Constraint points lying on a segment
/// split it.
pub fn preprocess(
    polygons: &[Polygon],
    epsilon: f64,
) -> Result<Preprocessed, TriangulationError> {
    if polygons.is_empty() {
        return Err(TriangulationError::invalid_input("the polygon list is empty"));
    }
    for polygon in polygons {
        let points = polygon
            .contour
            .iter()
            .chain(polygon.holes.iter().flatten())
            .chain(polygon.constraints.iter().flatten())
            .chain(polygon.points.iter());
        for point in points {
            validate_point(*point)?;
        }
    }

    let mut index = PointIndex::new(epsilon);
    let mut regions = Vec::new();
    let mut raw_segments = Vec::new();

    for (polygon_index, polygon) in polygons.iter().enumerate() {
        let Some(contour) = clean_loop(&mut index, &polygon.contour) else {
            log::warn!(
                "skipping polygon {} with a degenerate contour of {} points",
                polygon_index,
                polygon.contour.len()
            );
            continue;
        };
        let mut holes = Vec::new();
        for (hole_index, hole) in polygon.holes.iter().enumerate() {
            match clean_loop(&mut index, hole) {
                Some(hole) => holes.push(hole),
                None => log::warn!(
                    "skipping degenerate hole {} of polygon {}",
                    hole_index,
                    polygon_index
                ),
            }
        }

        let mut add_loop = |points: &[Point2<f64>], kind| {
            for i in 0..points.len() {
                raw_segments.push(Segment {
                    from: points[i],
                    to: points[(i + 1) % points.len()],
                    kind,
                    polygon: polygon_index,
                });
            }
        };
        add_loop(&contour, SegmentKind::Contour);
        for hole in &holes {
            add_loop(hole, SegmentKind::Hole);
        }
        for [from, to] in &polygon.constraints {
            raw_segments.push(Segment {
                from: index.snap(*from),
                to: index.snap(*to),
                kind: SegmentKind::User,
                polygon: polygon_index,
            });
        }

        regions.push(Region {
            polygon: polygon_index,
            contour,
            holes,
        });
    }

    let max_iterations = 1000 + 16 * raw_segments.len() * raw_segments.len();
    let input_count = raw_segments.len();
    let mut set = SegmentSet::new(&mut index, max_iterations);
    for segment in raw_segments {
        set.merge(segment)?;
    }
    let merged = set.into_segments();
    let merged_count = merged.len();

    let mut result = Preprocessed {
        segments: Vec::with_capacity(merged.len()),
        points: Vec::new(),
        regions,
    };
    for segment in merged {
        let midpoint = segment.midpoint();
        let keep = match segment.kind {
            SegmentKind::Contour => true,
            SegmentKind::Hole => !result
                .regions
                .iter()
                .any(|region| region.polygon != segment.polygon && region.contains(midpoint)),
            SegmentKind::User => result.is_in_domain(midpoint),
        };
        if keep {
            result.segments.push(segment);
        }
    }

    for (polygon_index, polygon) in polygons.iter().enumerate() {
        for point in &polygon.points {
            let point = index.snap(*point);
            if !result
                .regions
                .iter()
                .any(|region| region.covers(point, epsilon))
            {
                log::debug!(
                    "dropping constraint point ({}, {}) of polygon {} outside of all regions",
                    point.x,
                    point.y,
                    polygon_index
                );
                continue;
            }
            add_constraint_point(&mut result, point, epsilon);
        }
    }

    log::debug!(
        "preprocessed {} segments into {} merged, {} accepted segments and {} free points",
        input_count,
        merged_count,
        result.segments.len(),
        result.points.len()
    );
    Ok(result)
}

fn add_constraint_point(result: &mut Preprocessed, point: Point2<f64>, epsilon: f64) {
    if result.points.contains(&point) {
        return;
    }
    if result
        .segments
        .iter()
        .any(|segment| segment.from == point || segment.to == point)
    {
        return;
    }
    let split = result
        .segments
        .iter()
        .position(|segment| lies_inside(segment.from, segment.to, point, epsilon));
    match split {
        Some(index) => {
            let segment = result.segments.swap_remove(index);
            result.segments.extend(segment.split_at(point));
        }
        None => result.points.push(point),
    }
}

/// Snaps a loop's points, removes consecutive duplicates and the closing point.
///
/// Returns `None` if fewer than three distinct points remain.
fn clean_loop(index: &mut PointIndex, points: &[Point2<f64>]) -> Option<Vec<Point2<f64>>> {
    let mut result: Vec<Point2<f64>> = Vec::with_capacity(points.len());
    for point in points {
        let point = index.snap(*point);
        if result.last() != Some(&point) {
            result.push(point);
        }
    }
    while result.len() > 1 && result.first() == result.last() {
        result.pop();
    }

    let mut distinct = result.clone();
    distinct.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    distinct.dedup();
    if distinct.len() < 3 {
        None
    } else {
        Some(result)
    }
}
