use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::Point2;

type Cell = (i64, i64);

/// A uniform grid over points used to merge points lying within `epsilon` of each other.
///
/// The grid's cell size equals `epsilon`, hence any point within `epsilon` of a query lies in
/// the query's cell or one of its eight neighbors. An `epsilon` of zero only merges bitwise
/// identical coordinates.
#[derive(Debug, Clone)]
pub struct PointIndex {
    epsilon: f64,
    cells: HashMap<Cell, SmallVec<[usize; 2]>>,
    points: Vec<Point2<f64>>,
}

impl PointIndex {
    /// Creates an empty index. Negative or NaN values of `epsilon` are treated as zero.
    pub fn new(epsilon: f64) -> Self {
        PointIndex {
            epsilon: if epsilon > 0.0 { epsilon } else { 0.0 },
            cells: HashMap::new(),
            points: Vec::new(),
        }
    }

    fn cell(&self, point: Point2<f64>) -> Cell {
        if self.epsilon > 0.0 {
            // `as` saturates, far away points end up sharing border cells.
            (
                (point.x / self.epsilon).floor() as i64,
                (point.y / self.epsilon).floor() as i64,
            )
        } else {
            // Maps -0.0 and 0.0 to the same cell.
            ((point.x + 0.0).to_bits() as i64, (point.y + 0.0).to_bits() as i64)
        }
    }

    /// Returns the index of the stored point closest to `point`, if it lies within `epsilon`.
    pub fn find(&self, point: Point2<f64>) -> Option<usize> {
        let (cx, cy) = self.cell(point);
        let epsilon_2 = self.epsilon * self.epsilon;
        let neighborhood: SmallVec<[Cell; 9]> = if self.epsilon > 0.0 {
            (-1..=1)
                .flat_map(|dx| {
                    (-1..=1).map(move |dy| (cx.saturating_add(dx), cy.saturating_add(dy)))
                })
                .collect()
        } else {
            SmallVec::from_slice(&[(cx, cy)])
        };

        neighborhood
            .iter()
            .filter_map(|cell| self.cells.get(cell))
            .flatten()
            .map(|&index| (index, self.points[index].distance_2(point)))
            .filter(|(_, distance_2)| *distance_2 <= epsilon_2)
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
            .map(|(index, _)| index)
    }

    /// Returns the index of an existing point within `epsilon`, or stores `point`.
    ///
    /// The returned flag is `true` if `point` was stored.
    pub fn find_or_insert(&mut self, point: Point2<f64>) -> (usize, bool) {
        if let Some(existing) = self.find(point) {
            return (existing, false);
        }
        let index = self.points.len();
        self.points.push(point);
        let cell = self.cell(point);
        self.cells.entry(cell).or_default().push(index);
        (index, true)
    }

    /// Returns the stored position matching `point`, storing it if necessary.
    pub fn snap(&mut self, point: Point2<f64>) -> Point2<f64> {
        let (index, _) = self.find_or_insert(point);
        self.points[index]
    }

    /// All stored points in insertion order.
    pub fn points(&self) -> &[Point2<f64>] {
        &self.points
    }

    /// The number of stored points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if no point is stored.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The merge distance.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }
}

#[cfg(test)]
mod test {
    use super::PointIndex;
    use crate::test_utilities::{random_points_with_seed, SEED};
    use crate::Point2;

    #[test]
    fn test_merges_close_points() {
        let mut index = PointIndex::new(0.1);
        assert_eq!(index.find_or_insert(Point2::new(1.0, 1.0)), (0, true));
        assert_eq!(index.find_or_insert(Point2::new(1.05, 0.95)), (0, false));
        assert_eq!(index.find_or_insert(Point2::new(1.2, 1.0)), (1, true));
        // Within range of the second point only, across a cell border.
        assert_eq!(index.find_or_insert(Point2::new(1.29, 1.0)), (1, false));
        assert_eq!(index.len(), 2);
        assert_eq!(index.snap(Point2::new(0.99, 1.01)), Point2::new(1.0, 1.0));
    }

    #[test]
    fn test_zero_epsilon_is_exact() {
        let mut index = PointIndex::new(0.0);
        assert_eq!(index.find_or_insert(Point2::new(0.0, 1.0)), (0, true));
        assert_eq!(index.find_or_insert(Point2::new(-0.0, 1.0)), (0, false));
        assert_eq!(index.find_or_insert(Point2::new(1e-300, 1.0)), (1, true));
        assert_eq!(index.find(Point2::new(0.0, 1.0 + f64::EPSILON)), None);
    }

    #[test]
    fn test_agrees_with_brute_force() {
        let epsilon = 0.05;
        let points = random_points_with_seed(500, SEED);
        let mut index = PointIndex::new(epsilon);
        for point in &points {
            let expected = index
                .points()
                .iter()
                .position(|stored| stored.distance_2(*point) <= epsilon * epsilon);
            let (found, is_new) = index.find_or_insert(*point);
            assert_eq!(expected.is_none(), is_new);
            if let Some(expected) = expected {
                let stored = index.points()[found];
                assert!(stored.distance_2(*point) <= epsilon * epsilon);
                assert!(index.points()[expected].distance_2(*point) <= epsilon * epsilon);
            }
        }
    }
}
