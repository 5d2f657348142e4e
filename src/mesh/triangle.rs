#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::math::Circle;
use crate::Point2;

/// Returns the local index following `index` in counterclockwise order.
#[inline]
pub const fn next_index(index: usize) -> usize {
    if index == 2 {
        0
    } else {
        index + 1
    }
}

/// Returns the local index preceding `index` in counterclockwise order.
#[inline]
pub const fn prev_index(index: usize) -> usize {
    if index == 0 {
        2
    } else {
        index - 1
    }
}

/// A handle to the local edge `edge` of triangle `triangle`.
///
/// Local edge `i` of a triangle runs from its vertex `i` to vertex `(i + 1) % 3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde")
)]
pub struct EdgeRef {
    /// The triangle's index
    pub triangle: usize,
    /// The local edge index, always in `0..3`
    pub edge: usize,
}

impl EdgeRef {
    /// Creates a new edge handle.
    #[inline]
    pub const fn new(triangle: usize, edge: usize) -> Self {
        Self { triangle, edge }
    }
}

/// A mesh triangle.
///
/// The vertices are stored in counterclockwise order. `neighbors[i]` and `constrained[i]` both
/// refer to the edge from `vertices[i]` to `vertices[(i + 1) % 3]`: the neighbor is the triangle
/// sharing that edge (in reverse direction), if any.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde")
)]
pub struct Triangle {
    /// Vertex indices, counterclockwise
    pub vertices: [usize; 3],
    /// Adjacent triangle across each local edge
    pub neighbors: [Option<usize>; 3],
    /// Constraint flag of each local edge. Constraint edges are never flipped.
    pub constrained: [bool; 3],
    /// The cached circumcircle
    pub circle: Circle,
}

impl Triangle {
    pub(crate) fn new(
        vertices: [usize; 3],
        neighbors: [Option<usize>; 3],
        constrained: [bool; 3],
        positions: [Point2<f64>; 3],
    ) -> Self {
        let [v0, v1, v2] = positions;
        Triangle {
            vertices,
            neighbors,
            constrained,
            circle: Circle::circumcircle(v0, v1, v2),
        }
    }

    /// Returns the vertex pair `[from, to]` of a local edge.
    #[inline]
    pub fn edge_vertices(&self, edge: usize) -> [usize; 2] {
        [self.vertices[edge], self.vertices[next_index(edge)]]
    }

    /// Returns the vertex opposite of a local edge.
    #[inline]
    pub fn opposite_vertex(&self, edge: usize) -> usize {
        self.vertices[prev_index(edge)]
    }

    /// Returns the local index of a vertex, if this triangle contains it.
    pub fn vertex_index(&self, vertex: usize) -> Option<usize> {
        self.vertices.iter().position(|v| *v == vertex)
    }

    /// Returns the local index of the directed edge `from -> to`, if present.
    pub fn edge_index(&self, from: usize, to: usize) -> Option<usize> {
        (0..3).find(|&i| self.edge_vertices(i) == [from, to])
    }

    /// Returns the local index of the edge pointing to `neighbor`, if any.
    pub fn neighbor_index(&self, neighbor: usize) -> Option<usize> {
        self.neighbors.iter().position(|n| *n == Some(neighbor))
    }

    /// Returns `true` if any vertex index is smaller than `count`.
    pub(crate) fn touches_any_of_first(&self, count: usize) -> bool {
        self.vertices.iter().any(|v| *v < count)
    }
}

#[cfg(test)]
mod test {
    use super::{next_index, prev_index, Triangle};
    use crate::Point2;

    #[test]
    fn test_index_helpers() {
        assert_eq!([next_index(0), next_index(1), next_index(2)], [1, 2, 0]);
        assert_eq!([prev_index(0), prev_index(1), prev_index(2)], [2, 0, 1]);
    }

    #[test]
    fn test_local_lookups() {
        let triangle = Triangle::new(
            [4, 7, 9],
            [None, Some(3), None],
            [false, true, false],
            [
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(0.0, 1.0),
            ],
        );
        assert_eq!(triangle.edge_vertices(1), [7, 9]);
        assert_eq!(triangle.opposite_vertex(1), 4);
        assert_eq!(triangle.vertex_index(9), Some(2));
        assert_eq!(triangle.vertex_index(5), None);
        assert_eq!(triangle.edge_index(9, 4), Some(2));
        assert_eq!(triangle.edge_index(4, 9), None);
        assert_eq!(triangle.neighbor_index(3), Some(1));
        assert!(triangle.circle.is_valid());
    }
}
