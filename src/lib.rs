//! # cdt2d
//! Constrained Delaunay triangulations of points and polygons in the plane.
//!
//! # Features
//! * Delaunay triangulation of point sets covering their convex hull: [triangulate]
//! * Polygons with holes, constraint segments and constraint points: [triangulate_polygons]
//!   * Self intersecting and overlapping input is split into non crossing segments first
//!   * Triangles outside of the contours or inside holes are removed
//! * Incremental construction with constraint edges: [CdtBuilder]
//! * Optional refinement with an area bound and a minimum angle: [TriangulationOptions]
//! * Uses exact predicates to avoid floating point rounding issues, see [orient2d] and
//!   [incircle]
//! * Direct access to the underlying [Mesh] and its local operations (split, flip, legalize)
//!
//! # Example
//! ```
//! use cdt2d::{triangulate_polygons, Polygon, PolygonInput};
//!
//! let square = [[0.0, 0.0], [3.0, 0.0], [3.0, 3.0], [0.0, 3.0]];
//! let hole = [[1.0, 1.0], [2.0, 1.0], [2.0, 2.0], [1.0, 2.0]];
//! let input = PolygonInput::new(vec![Polygon::new(square).with_hole(hole)]);
//!
//! let triangulation = triangulate_polygons(&input)?;
//! assert_eq!(triangulation.num_triangles(), 8);
//! assert!((triangulation.total_area() - 8.0).abs() < 1e-12);
//! # Ok::<(), cdt2d::TriangulationError>(())
//! ```
//!
//! # Cargo features
//! * `serde`: Derives `Serialize` and `Deserialize` for all input and output types.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod line_side_info;
mod point;
mod point_index;
mod refinement;
mod triangulation;

pub mod constraints;
pub mod math;
pub mod mesh;
pub mod options;

#[cfg(test)]
mod test_utilities;

pub use crate::constraints::{Polygon, PolygonInput, Segment, SegmentKind};
pub use crate::error::{FlipError, InvalidCoordinate, TriangulationError};
pub use crate::line_side_info::LineSideInfo;
pub use crate::math::expansion::Expansion;
pub use crate::math::predicates::{incircle, orient2d};
pub use crate::math::{
    side_query, validate_coordinate, Circle, MAX_ALLOWED_VALUE, MIN_ALLOWED_VALUE,
};
pub use crate::mesh::{EdgeRef, Mesh, PositionInMesh, Triangle};
pub use crate::options::TriangulationOptions;
pub use crate::point::{MeshNum, Point2};
pub use crate::point_index::PointIndex;
pub use crate::triangulation::{
    triangulate, triangulate_polygons, triangulate_with_options, CdtBuilder, Triangulation,
};
