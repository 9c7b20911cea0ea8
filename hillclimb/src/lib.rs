//! Shortest paths through elevation mazes: parse the text format, build a grid
//! with cached neighbors and run Dijkstra or A* over it.

pub mod find;
pub mod grid;
pub mod maze;
pub mod util;

pub use find::{
    reconstruct_path, search, search_with_visitor, MapStorage, MapTrait, PathFinder,
    PathFinderState, PathResult, Score, SearchMode, SearchResult, SearchStatus, Visit,
};
pub use grid::{CellState, Grid, GridCell, Point};
pub use maze::{parse, Maze, ParseError, ParsedMaze};
