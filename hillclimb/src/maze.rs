use std::{fmt::Display, str::FromStr};

use thiserror::Error;

use crate::grid::Point;

/// Elevation letter that the start marker is normalized to
pub const START_ELEVATION: char = 'a';
/// Elevation letter that the end marker is normalized to
pub const END_ELEVATION: char = 'z';

const START_MARKER: char = 'S';
const END_MARKER: char = 'E';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("maze input contains no rows")]
    Empty,
    #[error("row {row} has {found} columns, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("invalid character {found:?} at row {row}, column {col}")]
    InvalidCharacter { row: usize, col: usize, found: char },
    #[error("maze has no start marker 'S'")]
    MissingStart,
    #[error("maze has no end marker 'E'")]
    MissingEnd,
    #[error("second start marker at {second}, first one at {first}")]
    DuplicateStart { first: Point, second: Point },
    #[error("second end marker at {second}, first one at {first}")]
    DuplicateEnd { first: Point, second: Point },
}

/// A rectangular grid of elevation letters ('a' is lowest, 'z' highest)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Maze {
    pub rows: usize,
    pub columns: usize,
    pub cells: Vec<Vec<char>>,
}

/// The result of parsing a maze: the normalized elevations and both markers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMaze {
    pub maze: Maze,
    pub start: Point,
    pub goal: Point,
}

impl Maze {
    pub fn is_valid(&self, point: Point) -> bool {
        point.row < self.rows && point.col < self.columns
    }

    /// The elevation letter at `point`
    pub fn elevation(&self, point: Point) -> char {
        self.assert_in_bounds(point);
        self.cells[point.row][point.col]
    }

    /// Returns the orthogonal neighbors that can be stepped onto from `point`.
    ///
    /// A step may climb at most one elevation level but may descend any
    /// number of levels, so the relation is not symmetric.
    pub fn neighbors_of(&self, point: Point) -> impl Iterator<Item = Point> + '_ {
        let limit = self.elevation(point) as u32 + 1;

        self.adjacent(point)
            .filter(move |p| self.cells[p.row][p.col] as u32 <= limit)
    }

    /// All in-bounds orthogonal neighbors, in up, left, down, right order
    fn adjacent(&self, point: Point) -> impl Iterator<Item = Point> {
        let up = (point.row > 0).then(|| Point::new(point.row - 1, point.col));
        let left = (point.col > 0).then(|| Point::new(point.row, point.col - 1));
        let down = (point.row + 1 < self.rows).then(|| Point::new(point.row + 1, point.col));
        let right = (point.col + 1 < self.columns).then(|| Point::new(point.row, point.col + 1));

        [up, left, down, right].into_iter().flatten()
    }

    fn assert_in_bounds(&self, point: Point) {
        assert!(
            self.is_valid(point),
            "point {} out of bounds for a {}x{} maze",
            point,
            self.rows,
            self.columns
        );
    }
}

impl Display for Maze {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in &self.cells {
            for cell in row {
                write!(f, "{}", cell)?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

/// Parse the textual maze format: newline separated rows of 'a'..='z' with
/// exactly one 'S' (start) and one 'E' (end) marker.
pub fn parse(text: &str) -> Result<ParsedMaze, ParseError> {
    let mut cells: Vec<Vec<char>> = Vec::new();
    let mut start: Option<Point> = None;
    let mut goal: Option<Point> = None;

    let lines = text
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty());

    for (row, line) in lines.enumerate() {
        let mut cell_row = Vec::with_capacity(line.len());

        for (col, c) in line.chars().enumerate() {
            let point = Point::new(row, col);

            let elevation = match c {
                START_MARKER => {
                    if let Some(first) = start {
                        return Err(ParseError::DuplicateStart {
                            first,
                            second: point,
                        });
                    }
                    start = Some(point);
                    START_ELEVATION
                }
                END_MARKER => {
                    if let Some(first) = goal {
                        return Err(ParseError::DuplicateEnd {
                            first,
                            second: point,
                        });
                    }
                    goal = Some(point);
                    END_ELEVATION
                }
                'a'..='z' => c,
                found => return Err(ParseError::InvalidCharacter { row, col, found }),
            };
            cell_row.push(elevation);
        }

        if let Some(first) = cells.first() {
            if first.len() != cell_row.len() {
                return Err(ParseError::RaggedRow {
                    row,
                    expected: first.len(),
                    found: cell_row.len(),
                });
            }
        }

        cells.push(cell_row);
    }

    if cells.is_empty() {
        return Err(ParseError::Empty);
    }

    let start = start.ok_or(ParseError::MissingStart)?;
    let goal = goal.ok_or(ParseError::MissingEnd)?;

    Ok(ParsedMaze {
        maze: Maze {
            rows: cells.len(),
            columns: cells[0].len(),
            cells,
        },
        start,
        goal,
    })
}

impl FromStr for ParsedMaze {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}
