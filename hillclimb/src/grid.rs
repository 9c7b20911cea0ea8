use crate::find::{MapStorage, MapTrait, NodeReference};
use crate::maze::Maze;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub row: usize,
    pub col: usize,
}

impl Point {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Number of orthogonal steps between two points, ignoring elevation
    pub fn manhattan(&self, other: Point) -> usize {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }
}

impl Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

impl NodeReference for Point {}

/// What a cell currently shows while a search runs
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum CellState {
    #[default]
    Unvisited,
    /// discovered and waiting in the frontier
    Open,
    /// expanded
    Closed,
    Start,
    End,
    Path,
    Barrier,
}

impl CellState {
    /// States that only exist because of a search and go away on reset
    fn is_search_state(&self) -> bool {
        matches!(
            self,
            CellState::Open | CellState::Closed | CellState::Path | CellState::Start | CellState::End
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridCell {
    pub point: Point,
    pub elevation: char,
    pub state: CellState,
    /// cells that can be stepped onto from here, rebuilt by `Grid::update_neighbors`
    pub neighbors: Vec<Point>,
}

/// The cells of a maze together with their search state and cached neighbors
#[derive(Clone, Debug)]
pub struct Grid {
    pub rows: usize,
    pub columns: usize,
    cells: Vec<Vec<GridCell>>,
}

impl Grid {
    pub fn from_maze(maze: &Maze) -> Self {
        let cells = maze
            .cells
            .iter()
            .enumerate()
            .map(|(row, elevations)| {
                elevations
                    .iter()
                    .enumerate()
                    .map(|(col, &elevation)| GridCell {
                        point: Point::new(row, col),
                        elevation,
                        state: CellState::Unvisited,
                        neighbors: Vec::new(),
                    })
                    .collect()
            })
            .collect();

        Self {
            rows: maze.rows,
            columns: maze.columns,
            cells,
        }
    }

    pub fn cell(&self, point: Point) -> &GridCell {
        &self.cells[point.row][point.col]
    }

    pub fn state(&self, point: Point) -> CellState {
        self.cell(point).state
    }

    pub fn set_state(&mut self, point: Point, state: CellState) {
        self.cells[point.row][point.col].state = state;
    }

    /// Iterate over all cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = &GridCell> {
        self.cells.iter().flatten()
    }

    /// Turns a free cell into a barrier and a barrier back into a free cell.
    /// Start and end cells are left alone. Returns the resulting state.
    pub fn toggle_barrier(&mut self, point: Point) -> CellState {
        let state = match self.state(point) {
            CellState::Barrier => CellState::Unvisited,
            CellState::Start | CellState::End => return self.state(point),
            _ => CellState::Barrier,
        };
        self.set_state(point, state);
        state
    }

    /// Take over the elevations of `maze` and recompute the neighbor list of
    /// every cell from them. Barrier cells have no neighbors and are never
    /// anyone's neighbor.
    pub fn update_neighbors(&mut self, maze: &Maze) {
        assert!(
            maze.rows == self.rows && maze.columns == self.columns,
            "grid is {}x{} but maze is {}x{}",
            self.rows,
            self.columns,
            maze.rows,
            maze.columns
        );

        for row in 0..self.rows {
            for col in 0..self.columns {
                let point = Point::new(row, col);

                let neighbors = if self.state(point) == CellState::Barrier {
                    Vec::new()
                } else {
                    maze.neighbors_of(point)
                        .filter(|n| self.state(*n) != CellState::Barrier)
                        .collect()
                };

                let cell = &mut self.cells[row][col];
                cell.elevation = maze.elevation(point);
                cell.neighbors = neighbors;
            }
        }
    }

    /// Forget everything a previous search left on the grid, keeping barriers
    pub fn reset_search(&mut self) {
        for cell in self.cells.iter_mut().flatten() {
            if cell.state.is_search_state() {
                cell.state = CellState::Unvisited;
            }
        }
    }

    /// Back to a blank grid: no barriers, no search state, no cached neighbors
    pub fn clear(&mut self) {
        for cell in self.cells.iter_mut().flatten() {
            cell.state = CellState::Unvisited;
            cell.neighbors.clear();
        }
    }

    /// Get the grid ready for a new search between `start` and `goal`
    pub fn prepare_search(&mut self, maze: &Maze, start: Point, goal: Point) {
        self.reset_search();
        self.set_state(start, CellState::Start);
        self.set_state(goal, CellState::End);
        self.update_neighbors(maze);
    }
}

impl Display for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in &self.cells {
            for cell in row {
                let c = match cell.state {
                    CellState::Unvisited => cell.elevation,
                    CellState::Open => '+',
                    CellState::Closed => '.',
                    CellState::Start => 'S',
                    CellState::End => 'E',
                    CellState::Path => '*',
                    CellState::Barrier => '#',
                };
                write!(f, "{}", c)?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

/// A MapStorage that keeps one value per grid cell in a flat row-major vec
#[derive(Debug, Clone)]
pub struct CellStorage<T> {
    columns: usize,
    values: Vec<T>,
}

impl<T: Copy + 'static> MapStorage<T> for CellStorage<T> {
    type Reference = Point;

    fn is_valid(&self, node: Self::Reference) -> bool {
        node.col < self.columns && node.row * self.columns + node.col < self.values.len()
    }

    fn get(&self, node: Self::Reference) -> T {
        self.values[node.row * self.columns + node.col]
    }

    fn get_mut(&mut self, node: Self::Reference) -> &mut T {
        &mut self.values[node.row * self.columns + node.col]
    }
}

impl MapTrait for Grid {
    type Reference = Point;
    type Storage<T: Default + Copy + Clone + 'static> = CellStorage<T>;

    fn is_valid(&self, node: Self::Reference) -> bool {
        node.row < self.rows && node.col < self.columns
    }

    fn neighbors_of(&self, node: Self::Reference) -> impl Iterator<Item = Self::Reference> {
        self.cell(node).neighbors.iter().copied()
    }

    fn estimate(&self, from: Self::Reference, to: Self::Reference) -> usize {
        from.manhattan(to)
    }

    fn mark(&mut self, node: Self::Reference, state: CellState) {
        self.set_state(node, state);
    }

    fn create_storage<T: Default + Copy + Clone + 'static>(&self) -> Self::Storage<T> {
        CellStorage {
            columns: self.columns,
            values: vec![Default::default(); self.rows * self.columns],
        }
    }
}

#[cfg(test)]
mod test {

    use super::*;
    use crate::maze::parse;

    fn create_basic_grid() -> (Grid, Maze) {
        let maze = parse("Sbc\nabE\naaa").unwrap().maze;
        (Grid::from_maze(&maze), maze)
    }

    #[test]
    fn test_from_maze() {
        let (grid, _) = create_basic_grid();

        assert_eq!(grid.rows, 3);
        assert_eq!(grid.columns, 3);
        assert_eq!(grid.cells().count(), 9);
        assert!(grid.cells().all(|c| c.state == CellState::Unvisited));
        assert!(grid.cells().all(|c| c.neighbors.is_empty()));
        assert_eq!(grid.cell(Point::new(1, 2)).elevation, 'z');
        assert_eq!(grid.cell(Point::new(2, 1)).point, Point::new(2, 1));
    }

    #[test]
    fn test_update_neighbors() {
        let (mut grid, maze) = create_basic_grid();
        grid.update_neighbors(&maze);

        // 'b' in the middle may climb to 'c' above but not to 'z' on the right
        assert_eq!(
            grid.cell(Point::new(1, 1)).neighbors,
            vec![Point::new(0, 1), Point::new(1, 0), Point::new(2, 1)]
        );
        // 'z' may descend everywhere
        assert_eq!(grid.cell(Point::new(1, 2)).neighbors.len(), 3);
    }

    #[test]
    fn test_update_neighbors_takes_new_elevations() {
        let (mut grid, _) = create_basic_grid();
        let pit = Maze {
            rows: 3,
            columns: 3,
            cells: vec![
                vec!['z', 'z', 'z'],
                vec!['z', 'b', 'z'],
                vec!['z', 'z', 'z'],
            ],
        };
        grid.update_neighbors(&pit);

        assert_eq!(grid.to_string(), "zzz\nzbz\nzzz\n");
        assert_eq!(grid.cell(Point::new(1, 1)).elevation, 'b');
        assert!(grid.cell(Point::new(1, 1)).neighbors.is_empty());
        assert_eq!(
            grid.cell(Point::new(0, 1)).neighbors,
            vec![Point::new(0, 0), Point::new(1, 1), Point::new(0, 2)]
        );
    }

    #[test]
    fn test_barriers_are_not_neighbors() {
        let (mut grid, maze) = create_basic_grid();

        assert_eq!(grid.toggle_barrier(Point::new(0, 1)), CellState::Barrier);
        grid.update_neighbors(&maze);

        assert!(grid.cell(Point::new(0, 1)).neighbors.is_empty());
        assert_eq!(
            grid.cell(Point::new(0, 0)).neighbors,
            vec![Point::new(1, 0)]
        );

        // toggling again restores the cell
        assert_eq!(grid.toggle_barrier(Point::new(0, 1)), CellState::Unvisited);
        grid.update_neighbors(&maze);
        assert_eq!(grid.cell(Point::new(0, 0)).neighbors.len(), 2);
    }

    #[test]
    fn test_toggle_barrier_keeps_markers() {
        let (mut grid, maze) = create_basic_grid();
        grid.prepare_search(&maze, Point::new(0, 0), Point::new(1, 2));

        assert_eq!(grid.toggle_barrier(Point::new(0, 0)), CellState::Start);
        assert_eq!(grid.toggle_barrier(Point::new(1, 2)), CellState::End);
    }

    #[test]
    fn test_reset_and_clear() {
        let (mut grid, maze) = create_basic_grid();
        grid.toggle_barrier(Point::new(2, 2));
        grid.prepare_search(&maze, Point::new(0, 0), Point::new(1, 2));
        grid.set_state(Point::new(1, 1), CellState::Closed);
        grid.set_state(Point::new(2, 1), CellState::Path);

        grid.reset_search();
        assert_eq!(grid.state(Point::new(0, 0)), CellState::Unvisited);
        assert_eq!(grid.state(Point::new(1, 1)), CellState::Unvisited);
        assert_eq!(grid.state(Point::new(2, 1)), CellState::Unvisited);
        assert_eq!(grid.state(Point::new(2, 2)), CellState::Barrier);

        grid.clear();
        assert!(grid.cells().all(|c| c.state == CellState::Unvisited));
        assert!(grid.cells().all(|c| c.neighbors.is_empty()));
    }

    #[test]
    fn test_display() {
        let (mut grid, maze) = create_basic_grid();
        grid.prepare_search(&maze, Point::new(0, 0), Point::new(1, 2));
        grid.set_state(Point::new(0, 1), CellState::Open);
        grid.set_state(Point::new(1, 0), CellState::Closed);
        grid.set_state(Point::new(1, 1), CellState::Path);
        grid.set_state(Point::new(2, 2), CellState::Barrier);

        assert_eq!(grid.to_string(), "S+c\n.*E\naa#\n");
    }

    #[test]
    fn test_storage() {
        let (grid, _) = create_basic_grid();
        let mut storage = grid.create_storage::<usize>();

        *storage.get_mut(Point::new(2, 1)) = 7;
        assert_eq!(storage.get(Point::new(2, 1)), 7);
        assert_eq!(storage.get(Point::new(1, 2)), 0);
        assert!(storage.is_valid(Point::new(2, 2)));
        assert!(!storage.is_valid(Point::new(3, 0)));
        assert!(!storage.is_valid(Point::new(0, 3)));
    }

    #[test]
    #[should_panic(expected = "grid is 3x3 but maze is 1x2")]
    fn test_mismatched_maze() {
        let (mut grid, _) = create_basic_grid();
        let other = parse("SE").unwrap().maze;
        grid.update_neighbors(&other);
    }
}
