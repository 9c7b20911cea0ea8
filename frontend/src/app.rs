use std::{ops::ControlFlow, time::Duration};

use egui::{Align2, Color32, FontId, Key, Pos2, Rect, Sense, Stroke, Vec2};
use hillclimb::{
    parse, util::SAMPLE_MAZE, CellState, Grid, GridCell, Maze, ParseError, PathFinder,
    PathFinderState, Point, SearchMode, Visit,
};
use log::{info, warn};

/// We derive Deserialize/Serialize so we can persist app state on shutdown.
#[derive(serde::Deserialize, serde::Serialize)]
#[serde(default)] // if we add new fields, give them default values when deserializing old state
struct State {
    maze_text: String,
    mode: SearchMode,
    auto_step: bool,
    steps_per_frame: usize,
    draw_grid_lines: bool,
}

impl Default for State {
    fn default() -> Self {
        Self {
            maze_text: SAMPLE_MAZE.to_owned(),
            mode: SearchMode::AStar,
            auto_step: true,
            steps_per_frame: 1,
            draw_grid_lines: true,
        }
    }
}

/// The loaded maze and everything derived from it
struct Session {
    maze: Maze,
    grid: Grid,
    start: Point,
    goal: Point,
    pathfinder: Option<PathFinder<Grid>>,
}

impl Session {
    fn load(text: &str) -> Result<Self, ParseError> {
        let parsed = parse(text)?;

        let mut session = Self {
            grid: Grid::from_maze(&parsed.maze),
            maze: parsed.maze,
            start: parsed.start,
            goal: parsed.goal,
            pathfinder: None,
        };
        session.mark_endpoints();
        Ok(session)
    }

    fn mark_endpoints(&mut self) {
        self.grid.set_state(self.start, CellState::Start);
        self.grid.set_state(self.goal, CellState::End);
    }

    fn is_running(&self) -> bool {
        self.pathfinder
            .as_ref()
            .is_some_and(|p| !p.state().is_done())
    }

    fn start_search(&mut self, mode: SearchMode) {
        info!("searching from {} to {} using {}", self.start, self.goal, mode);
        self.grid.prepare_search(&self.maze, self.start, self.goal);
        self.pathfinder = Some(PathFinder::new(&self.grid, self.start, self.goal, mode));
    }

    fn step(&mut self, steps: usize) {
        let Some(pathfinder) = &mut self.pathfinder else {
            return;
        };
        let mut redraw_only = |_: &Grid, _: Visit<Point>| ControlFlow::Continue(());

        for _ in 0..steps {
            if pathfinder.step(&mut self.grid, &mut redraw_only).is_done() {
                break;
            }
        }
    }

    fn finish(&mut self) {
        while self.is_running() {
            self.step(1);
        }
    }

    fn cancel(&mut self) {
        if let Some(pathfinder) = &mut self.pathfinder {
            pathfinder.cancel();
        }
    }

    /// Drop the current search and its markings, barriers stay
    fn reset(&mut self) {
        self.pathfinder = None;
        self.grid.reset_search();
        self.mark_endpoints();
    }

    /// Drop the current search and all barriers
    fn clear(&mut self) {
        self.pathfinder = None;
        self.grid.clear();
        self.mark_endpoints();
    }

    fn toggle_barrier(&mut self, point: Point) {
        if self.is_running() {
            return;
        }
        // an old result would no longer match the grid
        self.reset();
        self.grid.toggle_barrier(point);
    }

    fn status(&self) -> String {
        let Some(pathfinder) = &self.pathfinder else {
            return "Press space to search".to_owned();
        };

        match pathfinder.state() {
            PathFinderState::Initialized | PathFinderState::Running => format!(
                "Searching ({}): {} expanded, {} queued",
                pathfinder.mode(),
                pathfinder.expanded(),
                pathfinder.frontier_len()
            ),
            PathFinderState::Succeeded(result) => format!(
                "Path found ({}): {} steps, {} expanded",
                pathfinder.mode(),
                result.total_cost,
                pathfinder.expanded()
            ),
            PathFinderState::Exhausted => "No path found".to_owned(),
            PathFinderState::Cancelled => "Search cancelled".to_owned(),
        }
    }

    fn describe(&self, point: Point) -> String {
        let cell = self.grid.cell(point);
        let mut text = format!(
            "Cell @{}:{}\nelevation: {}\nstate: {:?}\nneighbors: {}",
            point.row,
            point.col,
            cell.elevation,
            cell.state,
            cell.neighbors.len()
        );
        if let Some(pathfinder) = &self.pathfinder {
            text.push_str(&format!(
                "\ng: {}\nf: {}",
                pathfinder.g_score(point),
                pathfinder.f_score(point)
            ));
        }
        text
    }
}

pub struct App {
    state: State,
    session: Option<Session>,
    load_error: Option<String>,
    hovered: Option<Point>,
}

impl App {
    /// Called once before the first frame.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        // Load previous app state (if any).
        // Note that you must enable the `persistence` feature for this to work.
        let state: State = if let Some(storage) = cc.storage {
            eframe::get_value(storage, eframe::APP_KEY).unwrap_or_default()
        } else {
            Default::default()
        };

        let mut app = App {
            state,
            session: None,
            load_error: None,
            hovered: None,
        };
        app.load_maze();
        app
    }

    fn load_maze(&mut self) {
        match Session::load(&self.state.maze_text) {
            Ok(session) => {
                info!(
                    "loaded {}x{} maze",
                    session.maze.rows, session.maze.columns
                );
                self.session = Some(session);
                self.load_error = None;
            }
            Err(err) => {
                warn!("could not load maze: {}", err);
                self.load_error = Some(err.to_string());
            }
        }
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        // keys typed into the maze editor are not commands
        if ctx.wants_keyboard_input() {
            return;
        }
        let Some(session) = &mut self.session else {
            return;
        };

        let (search, cancel, clear) = ctx.input(|i| {
            (
                i.key_pressed(Key::Space),
                i.key_pressed(Key::Escape),
                i.key_pressed(Key::C),
            )
        });

        if search && !session.is_running() {
            session.start_search(self.state.mode);
        }
        if cancel {
            session.cancel();
        }
        if clear {
            session.clear();
        }
    }

    fn side_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Maze");
        ui.add(
            egui::TextEdit::multiline(&mut self.state.maze_text)
                .font(egui::TextStyle::Monospace)
                .desired_rows(8),
        );
        if ui.button("Load maze").clicked() {
            self.load_maze();
        }
        if let Some(err) = &self.load_error {
            ui.colored_label(Color32::RED, err.as_str());
        }

        ui.separator();
        ui.heading("Search");
        egui::ComboBox::from_label("Mode")
            .selected_text(self.state.mode.to_string())
            .show_ui(ui, |ui| {
                ui.selectable_value(&mut self.state.mode, SearchMode::Dijkstra, "dijkstra");
                ui.selectable_value(&mut self.state.mode, SearchMode::AStar, "astar");
            });
        ui.checkbox(&mut self.state.auto_step, "Auto step");
        ui.add(egui::Slider::new(&mut self.state.steps_per_frame, 1..=50).text("Steps per frame"));
        ui.checkbox(&mut self.state.draw_grid_lines, "Draw grid lines");

        if let Some(session) = &mut self.session {
            ui.horizontal(|ui| {
                if ui.button("Search").clicked() && !session.is_running() {
                    session.start_search(self.state.mode);
                }
                if ui.button("Step").clicked() {
                    session.step(1);
                }
                if ui.button("Finish").clicked() {
                    session.finish();
                }
                if ui.button("Cancel").clicked() {
                    session.cancel();
                }
            });
            ui.horizontal(|ui| {
                if ui.button("Reset").clicked() {
                    session.reset();
                }
                if ui.button("Clear").clicked() {
                    session.clear();
                }
            });

            ui.label(session.status());

            if let Some(point) = self.hovered {
                ui.separator();
                ui.label(session.describe(point));
            }
        }

        ui.with_layout(egui::Layout::bottom_up(egui::Align::LEFT), |ui| {
            ui.label("Space: search   Esc: cancel   C: clear   Click: barrier");
            egui::warn_if_debug_build(ui);
        });
    }

    fn draw_grid(&mut self, ui: &mut egui::Ui) {
        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click());

        let Some(session) = &mut self.session else {
            return;
        };
        let grid = &session.grid;

        let origin = response.rect.min;
        let cell_size = (response.rect.width() / grid.columns as f32)
            .min(response.rect.height() / grid.rows as f32);

        for cell in grid.cells() {
            let rect = cell_rect(origin, cell_size, cell.point);
            painter.rect_filled(rect, 0.0, cell_color(cell));

            if cell_size >= 14.0 && cell.state == CellState::Unvisited {
                painter.text(
                    rect.center(),
                    Align2::CENTER_CENTER,
                    cell.elevation,
                    FontId::monospace(cell_size * 0.5),
                    Color32::DARK_GRAY,
                );
            }
        }

        if self.state.draw_grid_lines {
            let stroke = Stroke::new(1.0, Color32::GRAY);
            let width = grid.columns as f32 * cell_size;
            let height = grid.rows as f32 * cell_size;

            for row in 0..=grid.rows {
                let y = origin.y + row as f32 * cell_size;
                painter.line_segment([Pos2::new(origin.x, y), Pos2::new(origin.x + width, y)], stroke);
            }
            for col in 0..=grid.columns {
                let x = origin.x + col as f32 * cell_size;
                painter.line_segment([Pos2::new(x, origin.y), Pos2::new(x, origin.y + height)], stroke);
            }
        }

        self.hovered = response
            .hover_pos()
            .and_then(|pos| point_at(origin, cell_size, pos, grid));

        if response.clicked() {
            if let Some(point) = response
                .interact_pointer_pos()
                .and_then(|pos| point_at(origin, cell_size, pos, grid))
            {
                session.toggle_barrier(point);
            }
        }
    }
}

impl eframe::App for App {
    /// Called by the frame work to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, &self.state);
    }

    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_keys(ctx);

        if let Some(session) = &mut self.session {
            if self.state.auto_step && session.is_running() {
                session.step(self.state.steps_per_frame);
                ctx.request_repaint_after(Duration::from_millis(20));
            }
        }

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
                ui.add_space(16.0);

                egui::widgets::global_dark_light_mode_buttons(ui);
            });
        });

        egui::SidePanel::left("side_panel").show(ctx, |ui| self.side_panel(ui));

        egui::CentralPanel::default().show(ctx, |ui| self.draw_grid(ui));
    }
}

/// Screen position to grid cell. This is the only place where x/y turns into row/col.
fn point_at(origin: Pos2, cell_size: f32, pos: Pos2, grid: &Grid) -> Option<Point> {
    let offset = pos - origin;
    if offset.x < 0.0 || offset.y < 0.0 {
        return None;
    }

    let point = Point::new(
        (offset.y / cell_size) as usize,
        (offset.x / cell_size) as usize,
    );
    (point.row < grid.rows && point.col < grid.columns).then_some(point)
}

fn cell_rect(origin: Pos2, cell_size: f32, point: Point) -> Rect {
    Rect::from_min_size(
        origin + Vec2::new(point.col as f32 * cell_size, point.row as f32 * cell_size),
        Vec2::splat(cell_size),
    )
}

fn cell_color(cell: &GridCell) -> Color32 {
    match cell.state {
        CellState::Unvisited => {
            // higher ground is darker
            let level = (cell.elevation as u8).saturating_sub(b'a').min(25);
            Color32::from_gray(250 - level * 6)
        }
        CellState::Open => Color32::from_rgb(0, 200, 0),
        CellState::Closed => Color32::from_rgb(220, 40, 40),
        CellState::Start => Color32::from_rgb(255, 165, 0),
        CellState::End => Color32::from_rgb(64, 224, 208),
        CellState::Path => Color32::from_rgb(128, 0, 128),
        CellState::Barrier => Color32::BLACK,
    }
}

#[cfg(test)]
mod test {

    use super::*;

    fn sample_session() -> Session {
        Session::load(SAMPLE_MAZE).unwrap()
    }

    #[test]
    fn test_point_at() {
        let grid = sample_session().grid;
        let origin = Pos2::new(10.0, 20.0);

        assert_eq!(
            point_at(origin, 10.0, Pos2::new(35.0, 25.0), &grid),
            Some(Point::new(0, 2))
        );
        assert_eq!(
            point_at(origin, 10.0, Pos2::new(10.0, 69.0), &grid),
            Some(Point::new(4, 0))
        );
        assert_eq!(point_at(origin, 10.0, Pos2::new(5.0, 25.0), &grid), None);
        assert_eq!(point_at(origin, 10.0, Pos2::new(15.0, 75.0), &grid), None);
        assert_eq!(point_at(origin, 10.0, Pos2::new(95.0, 25.0), &grid), None);
    }

    #[test]
    fn test_cell_rect_roundtrip() {
        let grid = sample_session().grid;
        let origin = Pos2::new(3.0, 4.0);
        let p = Point::new(3, 6);

        let rect = cell_rect(origin, 12.0, p);
        assert_eq!(point_at(origin, 12.0, rect.center(), &grid), Some(p));
    }

    #[test]
    fn test_session_search() {
        let mut session = sample_session();
        assert_eq!(session.grid.state(session.start), CellState::Start);
        assert_eq!(session.grid.state(session.goal), CellState::End);

        session.start_search(SearchMode::AStar);
        assert!(session.is_running());
        session.step(3);
        assert!(session.is_running());
        session.finish();

        assert!(!session.is_running());
        assert!(session.status().contains("31 steps"));
    }

    #[test]
    fn test_session_cancel_and_barriers() {
        let mut session = sample_session();
        session.start_search(SearchMode::Dijkstra);
        session.step(1);
        session.cancel();
        session.step(1);
        assert_eq!(session.status(), "Search cancelled");

        // barriers can be placed once the search is over, which clears it
        session.toggle_barrier(Point::new(1, 1));
        assert!(session.pathfinder.is_none());
        assert_eq!(session.grid.state(Point::new(1, 1)), CellState::Barrier);

        session.reset();
        assert_eq!(session.grid.state(Point::new(1, 1)), CellState::Barrier);
        session.clear();
        assert_eq!(session.grid.state(Point::new(1, 1)), CellState::Unvisited);
        assert_eq!(session.grid.state(session.start), CellState::Start);
    }

    #[test]
    fn test_load_error() {
        assert!(matches!(
            Session::load("abc\nabd"),
            Err(ParseError::MissingStart)
        ));
    }

    #[test]
    fn test_colors_follow_state() {
        let mut session = sample_session();
        let point = Point::new(1, 1);

        let free = cell_color(session.grid.cell(point));
        session.grid.set_state(point, CellState::Barrier);
        assert_eq!(cell_color(session.grid.cell(point)), Color32::BLACK);
        assert_ne!(free, Color32::BLACK);
    }
}
