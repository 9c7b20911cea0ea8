use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use env_logger::Env;
use hillclimb::{search, util, Grid, ParsedMaze, Point, SearchMode, SearchResult, SearchStatus};
use log::info;
use serde::Serialize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Dijkstra,
    Astar,
    /// run both and check that they agree
    Both,
}

impl ModeArg {
    fn modes(&self) -> Vec<SearchMode> {
        match self {
            ModeArg::Dijkstra => vec![SearchMode::Dijkstra],
            ModeArg::Astar => vec![SearchMode::AStar],
            ModeArg::Both => vec![SearchMode::Dijkstra, SearchMode::AStar],
        }
    }
}

/// Find the fewest steps from S to E in an elevation maze
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Maze file; the built-in example is used when omitted
    input: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = ModeArg::Astar)]
    mode: ModeArg,

    /// Print the grid as the search left it
    #[arg(short, long)]
    render: bool,

    /// Print the results as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Report {
    mode: SearchMode,
    #[serde(flatten)]
    result: SearchResult<Point>,
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));
    let args = Args::parse();

    let ParsedMaze { maze, start, goal } = match &args.input {
        Some(path) => util::read_maze(path)?,
        None => util::SAMPLE_MAZE
            .parse::<ParsedMaze>()
            .context("built-in maze is invalid")?,
    };
    info!(
        "loaded {}x{} maze, start={} goal={}",
        maze.rows, maze.columns, start, goal
    );

    let mut grid = Grid::from_maze(&maze);
    let mut reports = Vec::new();

    for mode in args.mode.modes() {
        let result = search(&mut grid, &maze, start, goal, mode);

        if args.render && !args.json {
            println!("{}:\n{}", mode, grid);
        }
        reports.push(Report { mode, result });
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            match report.result.status {
                SearchStatus::Succeeded => println!(
                    "{}: {} steps ({} cells expanded)",
                    report.mode, report.result.path_length, report.result.expanded
                ),
                SearchStatus::Exhausted => println!("{}: no path", report.mode),
                SearchStatus::Cancelled => println!("{}: cancelled", report.mode),
            }
        }
    }

    if let [first, second] = reports.as_slice() {
        anyhow::ensure!(
            first.result.status == second.result.status
                && first.result.path_length == second.result.path_length,
            "{} and {} disagree: {} vs {} steps",
            first.mode,
            second.mode,
            first.result.path_length,
            second.result.path_length
        );
        info!("{} and {} agree", first.mode, second.mode);
    }

    Ok(())
}
