use std::{collections::VecDeque, fs, path::Path};

use anyhow::Context;

use crate::grid::Point;
use crate::maze::{parse, Maze, ParsedMaze};

/// The small example maze used when no input file is given
pub const SAMPLE_MAZE: &str = "\
Sabqponm
abcryxxl
accszExk
acctuvwj
abdefghi
";

pub fn read_maze(path: impl AsRef<Path>) -> Result<ParsedMaze, anyhow::Error> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read maze file {}", path.display()))?;

    parse(&text).with_context(|| format!("failed to parse maze file {}", path.display()))
}

/// Plain breadth-first search over the elevation rule. Slow but obviously
/// right, used to cross-check the search engine.
pub fn breadth_first_distance(maze: &Maze, start: Point, goal: Point) -> Option<usize> {
    let mut distance = vec![vec![None; maze.columns]; maze.rows];
    let mut queue = VecDeque::from([start]);
    distance[start.row][start.col] = Some(0);

    while let Some(point) = queue.pop_front() {
        let steps: usize = distance[point.row][point.col]?;
        if point == goal {
            return Some(steps);
        }

        for next in maze.neighbors_of(point) {
            if distance[next.row][next.col].is_none() {
                distance[next.row][next.col] = Some(steps + 1);
                queue.push_back(next);
            }
        }
    }

    None
}
