use std::{
    cmp::Ordering,
    collections::BinaryHeap,
    fmt::{Debug, Display},
    ops::{Add, ControlFlow},
};

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::grid::{CellState, Grid, Point};
use crate::maze::Maze;

/// Supertrait that collects all the requirements on the NodeReference values
/// Must be copy, comparable and not references (hence 'static)
pub trait NodeReference: Copy + Eq + Debug + 'static {}

pub trait MapTrait {
    /// The type that can be used to reference nodes in the map
    type Reference: NodeReference;

    /// The type that the map uses for storage
    type Storage<T: Default + Copy + Clone + 'static>: MapStorage<T, Reference = Self::Reference>;

    /// Check if the provided node reference is valid
    fn is_valid(&self, node: Self::Reference) -> bool;

    /// Return an iterator over the nodes that can be reached in one step from the provided node
    fn neighbors_of(&self, node: Self::Reference) -> impl Iterator<Item = Self::Reference>;

    /// Lower bound on the number of steps between two nodes
    fn estimate(&self, from: Self::Reference, to: Self::Reference) -> usize;

    /// Record the visualization state of a node
    fn mark(&mut self, node: Self::Reference, state: CellState);

    /// Create a storage for values of type T
    fn create_storage<T: Default + Copy + Clone + 'static>(&self) -> Self::Storage<T>;
}

pub trait MapStorage<T> {
    type Reference: NodeReference;

    fn is_valid(&self, node: Self::Reference) -> bool;
    fn get(&self, node: Self::Reference) -> T;
    fn get_mut(&mut self, node: Self::Reference) -> &mut T;
}

/// Distance from the source in unit steps. Defaults to infinity, which compares
/// greater than every finite score.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Score(usize);

impl Score {
    pub const ZERO: Score = Score(0);
    pub const INFINITY: Score = Score(usize::MAX);

    pub fn new(value: usize) -> Self {
        Score(value)
    }

    pub fn is_finite(&self) -> bool {
        *self != Score::INFINITY
    }

    pub fn value(&self) -> Option<usize> {
        self.is_finite().then_some(self.0)
    }
}

impl Default for Score {
    fn default() -> Self {
        Score::INFINITY
    }
}

impl Add<usize> for Score {
    type Output = Score;

    fn add(self, rhs: usize) -> Self::Output {
        if self.is_finite() {
            Score(self.0.saturating_add(rhs))
        } else {
            self
        }
    }
}

impl Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.value() {
            Some(v) => write!(f, "{}", v),
            None => write!(f, "inf"),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// order the frontier by distance from the source only
    Dijkstra,
    /// add the Manhattan distance to the goal
    #[default]
    AStar,
}

impl SearchMode {
    fn heuristic<M: MapTrait>(&self, map: &M, from: M::Reference, goal: M::Reference) -> usize {
        match self {
            SearchMode::Dijkstra => 0,
            SearchMode::AStar => map.estimate(from, goal),
        }
    }
}

impl Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                SearchMode::Dijkstra => "dijkstra",
                SearchMode::AStar => "astar",
            }
        )
    }
}

/// The objects that we store in the priority queue
#[derive(Debug)]
struct ToVisit<R> {
    priority: Score,
    /// discovery counter, earlier discoveries win ties
    order: u64,
    point: R,
}

impl<R> Ord for ToVisit<R> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.priority, self.order)
            .cmp(&(other.priority, other.order))
            .reverse() // reverse for BinaryHeap to be a min-heap
    }
}

impl<R> PartialOrd for ToVisit<R> {
    fn partial_cmp(&self, other: &ToVisit<R>) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<R> PartialEq for ToVisit<R> {
    fn eq(&self, other: &ToVisit<R>) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<R> Eq for ToVisit<R> {}

/// Handed to the visualization callback whenever a node changes state
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Visit<R> {
    pub point: R,
    pub state: CellState,
}

#[derive(Debug, PartialEq, Clone, Eq)]
pub struct PathResult<R> {
    /// from the start (exclusive) to the goal (inclusive)
    pub path: Vec<R>,
    pub start: R,
    pub goal: R,
    pub total_cost: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathFinderState<R> {
    Initialized,
    Running,
    Succeeded(PathResult<R>),
    Exhausted,
    Cancelled,
}

impl<R> PathFinderState<R> {
    pub fn is_done(&self) -> bool {
        matches!(
            self,
            PathFinderState::Succeeded(_) | PathFinderState::Exhausted | PathFinderState::Cancelled
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStatus {
    Succeeded,
    Exhausted,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult<R> {
    pub status: SearchStatus,
    /// number of steps on the path, 0 unless the search succeeded
    pub path_length: usize,
    pub path: Option<Vec<R>>,
    /// number of nodes taken off the frontier and expanded
    pub expanded: usize,
}

/// Best-first search from `start` to `goal` that can be advanced one expansion
/// at a time. All search bookkeeping lives here and is dropped with it.
pub struct PathFinder<M: MapTrait> {
    start: M::Reference,
    goal: M::Reference,
    mode: SearchMode,
    g_score: M::Storage<Score>,
    f_score: M::Storage<Score>,
    came_from: M::Storage<Option<M::Reference>>,
    in_frontier: M::Storage<bool>,
    frontier: BinaryHeap<ToVisit<M::Reference>>,
    next_order: u64,
    expanded: usize,
    cancel_requested: bool,
    state: PathFinderState<M::Reference>,
}

impl<M: MapTrait> PathFinder<M> {
    pub fn new(map: &M, start: M::Reference, goal: M::Reference, mode: SearchMode) -> Self {
        assert!(
            map.is_valid(start) && map.is_valid(goal),
            "start {:?} or goal {:?} out of bounds",
            start,
            goal
        );

        let mut g_score = map.create_storage::<Score>();
        let mut f_score = map.create_storage::<Score>();
        let mut in_frontier = map.create_storage::<bool>();

        let priority = Score::ZERO + mode.heuristic(map, start, goal);
        *g_score.get_mut(start) = Score::ZERO;
        *f_score.get_mut(start) = priority;
        *in_frontier.get_mut(start) = true;

        Self {
            start,
            goal,
            mode,
            g_score,
            f_score,
            came_from: map.create_storage(),
            in_frontier,
            frontier: BinaryHeap::from([ToVisit {
                priority,
                order: 0,
                point: start,
            }]),
            next_order: 1,
            expanded: 0,
            cancel_requested: false,
            state: PathFinderState::Initialized,
        }
    }

    /// Run until the search succeeds, runs out of nodes or is cancelled
    pub fn finish<F>(mut self, map: &mut M, on_visit: &mut F) -> SearchResult<M::Reference>
    where
        F: FnMut(&M, Visit<M::Reference>) -> ControlFlow<()>,
    {
        loop {
            self.step(map, on_visit);
            if let Some(result) = self.result() {
                return result;
            }
        }
    }

    /// Expand a single node. Once a terminal state is reached further calls
    /// return it without doing anything.
    pub fn step<F>(&mut self, map: &mut M, on_visit: &mut F) -> &PathFinderState<M::Reference>
    where
        F: FnMut(&M, Visit<M::Reference>) -> ControlFlow<()>,
    {
        if self.state.is_done() {
            return &self.state;
        }
        self.state = PathFinderState::Running;

        // a node queued again with a better score has its newest entry popped
        // first, the older ones come up after it has left the frontier
        let current = loop {
            let Some(entry) = self.frontier.pop() else {
                if self.cancel_requested {
                    debug!("search cancelled after {} expansions", self.expanded);
                    self.state = PathFinderState::Cancelled;
                } else {
                    debug!(
                        "no path from {:?} to {:?} after {} expansions",
                        self.start, self.goal, self.expanded
                    );
                    self.state = PathFinderState::Exhausted;
                }
                return &self.state;
            };
            if self.in_frontier.get(entry.point) {
                break entry;
            }
            trace!("skipping stale entry for {:?} f={}", entry.point, entry.priority);
        };
        *self.in_frontier.get_mut(current.point) = false;

        // safe point: nothing of `current` has been processed yet, so putting it
        // back leaves the frontier exactly as it was
        if self.cancel_requested {
            debug!("search cancelled after {} expansions", self.expanded);
            *self.in_frontier.get_mut(current.point) = true;
            self.frontier.push(current);
            self.state = PathFinderState::Cancelled;
            return &self.state;
        }

        let current_g = self.g_score.get(current.point);
        trace!(
            "expanding {:?} g={} f={}",
            current.point,
            current_g,
            current.priority
        );

        if current.point == self.goal {
            let path = reconstruct_path(&self.came_from, self.goal);

            // cancelling is pointless once the goal is reached, so the
            // callback's answer is ignored while drawing the path
            for &point in path.iter().filter(|p| **p != self.goal) {
                map.mark(point, CellState::Path);
                let _ = on_visit(
                    &*map,
                    Visit {
                        point,
                        state: CellState::Path,
                    },
                );
            }

            let total_cost = current_g.value().unwrap_or_default();
            debug!(
                "found path from {:?} to {:?}: cost={} expanded={}",
                self.start, self.goal, total_cost, self.expanded
            );

            self.state = PathFinderState::Succeeded(PathResult {
                path,
                start: self.start,
                goal: self.goal,
                total_cost,
            });
            return &self.state;
        }

        self.expanded += 1;

        let neighbors: Vec<M::Reference> = map.neighbors_of(current.point).collect();
        for neighbor in neighbors {
            let tentative = current_g + 1;

            if tentative < self.g_score.get(neighbor) {
                *self.came_from.get_mut(neighbor) = Some(current.point);
                *self.g_score.get_mut(neighbor) = tentative;

                let priority = tentative + self.mode.heuristic(&*map, neighbor, self.goal);
                *self.f_score.get_mut(neighbor) = priority;

                // an already queued node gets a second entry with the better
                // priority, the old one is skipped when it comes up
                let discovered = !self.in_frontier.get(neighbor);
                self.frontier.push(ToVisit {
                    priority,
                    order: self.next_order,
                    point: neighbor,
                });
                self.next_order += 1;
                *self.in_frontier.get_mut(neighbor) = true;

                if discovered && neighbor != self.goal {
                    self.notify(map, on_visit, neighbor, CellState::Open);
                }
            }
        }

        if current.point != self.start {
            self.notify(map, on_visit, current.point, CellState::Closed);
        }

        &self.state
    }

    fn notify<F>(&mut self, map: &mut M, on_visit: &mut F, point: M::Reference, state: CellState)
    where
        F: FnMut(&M, Visit<M::Reference>) -> ControlFlow<()>,
    {
        map.mark(point, state);
        if on_visit(&*map, Visit { point, state }).is_break() {
            self.cancel_requested = true;
        }
    }

    /// Ask the search to stop at the next safe point: the next pop, or the
    /// moment the frontier turns out to be empty, so a pending request ends
    /// in `Cancelled` rather than `Exhausted`
    pub fn cancel(&mut self) {
        self.cancel_requested = true;
    }

    /// The outcome, once the search has reached a terminal state
    pub fn result(&self) -> Option<SearchResult<M::Reference>> {
        let (status, path) = match &self.state {
            PathFinderState::Initialized | PathFinderState::Running => return None,
            PathFinderState::Succeeded(result) => (SearchStatus::Succeeded, Some(result.path.clone())),
            PathFinderState::Exhausted => (SearchStatus::Exhausted, None),
            PathFinderState::Cancelled => (SearchStatus::Cancelled, None),
        };

        Some(SearchResult {
            status,
            path_length: path.as_ref().map_or(0, Vec::len),
            path,
            expanded: self.expanded,
        })
    }

    pub fn state(&self) -> &PathFinderState<M::Reference> {
        &self.state
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    pub fn start(&self) -> M::Reference {
        self.start
    }

    pub fn goal(&self) -> M::Reference {
        self.goal
    }

    pub fn g_score(&self, node: M::Reference) -> Score {
        self.g_score.get(node)
    }

    pub fn f_score(&self, node: M::Reference) -> Score {
        self.f_score.get(node)
    }

    pub fn predecessors(&self) -> &M::Storage<Option<M::Reference>> {
        &self.came_from
    }

    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    pub fn expanded(&self) -> usize {
        self.expanded
    }
}

/// Walk the predecessor links back from `destination`. The returned path runs
/// from the source (exclusive) to `destination` (inclusive) and is empty when
/// `destination` was never reached.
pub fn reconstruct_path<R, S>(came_from: &S, destination: R) -> Vec<R>
where
    R: NodeReference,
    S: MapStorage<Option<R>, Reference = R>,
{
    assert!(
        came_from.is_valid(destination),
        "destination {:?} out of bounds",
        destination
    );

    let mut path = Vec::new();
    let mut current = destination;

    while let Some(previous) = came_from.get(current) {
        path.push(current);
        current = previous;
    }

    path.reverse();
    path
}

/// Shortest path from `start` to `goal` without a visualization callback
pub fn search(
    grid: &mut Grid,
    maze: &Maze,
    start: Point,
    goal: Point,
    mode: SearchMode,
) -> SearchResult<Point> {
    search_with_visitor(grid, maze, start, goal, mode, |_, _| ControlFlow::Continue(()))
}

/// Shortest path from `start` to `goal`. The neighbor cache of `grid` is
/// rebuilt from `maze` first, and `on_visit` is called after every state
/// change; returning `ControlFlow::Break` cancels the search.
pub fn search_with_visitor<F>(
    grid: &mut Grid,
    maze: &Maze,
    start: Point,
    goal: Point,
    mode: SearchMode,
    mut on_visit: F,
) -> SearchResult<Point>
where
    F: FnMut(&Grid, Visit<Point>) -> ControlFlow<()>,
{
    grid.prepare_search(maze, start, goal);

    PathFinder::new(&*grid, start, goal, mode).finish(grid, &mut on_visit)
}
