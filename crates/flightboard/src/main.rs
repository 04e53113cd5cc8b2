//! `flightboard` - CLI for the flight progress board
//!
//! This binary runs the board in a terminal and manages its persisted state.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::info;

use flightboard::cli::{Cli, Command, ConfigCommand, ResetCommand, RunCommand, SortCommand};
use flightboard::progress::PersistedProgress;
use flightboard::render::{render_board, render_table};
use flightboard::table::SortState;
use flightboard::view::with_view;
use flightboard::{
    init_logging, Board, BoardView, Config, DataFetcher, FlightTable, SortController, Storage,
};

/// How often the terminal renderer checks the board for changes.
const RENDER_PERIOD: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    match cli.command {
        Command::Run(run_cmd) => handle_run(&load_config(cli.config)?, &run_cmd).await,
        Command::Status(status_cmd) => handle_status(&load_config(cli.config)?, status_cmd.json),
        Command::Sort(sort_cmd) => handle_sort(&load_config(cli.config)?, &sort_cmd),
        Command::Reset(reset_cmd) => handle_reset(&load_config(cli.config)?, &reset_cmd),
        Command::Config(config_cmd) => handle_config(cli.config, config_cmd),
    }
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    Config::load_from(path).context("failed to load configuration")
}

fn open_storage(config: &Config) -> anyhow::Result<Storage> {
    let path = config.database_path();
    Storage::open(&path).with_context(|| format!("failed to open {}", path.display()))
}

async fn handle_run(config: &Config, cmd: &RunCommand) -> anyhow::Result<()> {
    let store = open_storage(config)?.into_shared();
    let source = config.make_source();
    info!(source = source.name(), "Starting board");

    let view = BoardView::new(config.layout()).into_shared();
    let mut board = Board::new(
        DataFetcher::new(source),
        view.clone(),
        store,
        config.board_options(),
    );

    let renderer = (!cmd.headless).then(|| {
        let columns = cmd.columns;
        tokio::spawn(async move {
            let mut last_revision = None;
            let mut ticker = tokio::time::interval(RENDER_PERIOD);
            loop {
                ticker.tick().await;
                let frame = with_view(&view, |v| {
                    (last_revision != Some(v.revision)).then(|| (v.revision, render_board(v, columns)))
                })
                .flatten();
                if let Some((revision, text)) = frame {
                    last_revision = Some(revision);
                    print!("\x1b[2J\x1b[H{text}");
                }
            }
        })
    });

    board
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {e}");
            }
        })
        .await;

    if let Some(renderer) = renderer {
        renderer.abort();
    }
    Ok(())
}

fn handle_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let store = open_storage(config)?;
    let progress = PersistedProgress::load(&store)?;
    let sort = SortState::load(&store)?;
    let entries = store.entries()?;

    if json {
        let updated: serde_json::Map<String, serde_json::Value> = entries
            .iter()
            .map(|e| (e.key.clone(), serde_json::Value::String(e.updated_at.to_rfc3339())))
            .collect();
        let status = serde_json::json!({
            "database_path": store.path(),
            "progress": progress,
            "sort": sort,
            "updated_at": updated,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("flightboard status");
    println!("------------------");
    println!("Database:      {}", store.path().display());
    match progress {
        Some(p) => println!(
            "Progress:      {:.1}% ({} km remaining)",
            p.percentage, p.current_distance
        ),
        None => println!("Progress:      (none)"),
    }
    match sort {
        Some(s) => println!("Sort:          column {} {}", s.column, s.direction),
        None => println!("Sort:          (none)"),
    }
    for entry in entries {
        println!(
            "  {:<20} {:<12} {}",
            entry.key,
            entry.value,
            entry.updated_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

fn handle_sort(config: &Config, cmd: &SortCommand) -> anyhow::Result<()> {
    let Some(path) = &config.table.path else {
        bail!("no flight table configured (set table.path)");
    };
    let mut table = FlightTable::load(path)?;
    let store = open_storage(config)?;

    let controller = SortController::new(config.table.status_column);
    let outcome = controller.sort(&mut table, &store, cmd.column, cmd.direction())?;
    if outcome.flipped {
        println!("Table was already ascending; sorted descending instead.");
    }
    print!("{}", render_table(&table));
    Ok(())
}

fn handle_reset(config: &Config, cmd: &ResetCommand) -> anyhow::Result<()> {
    if !cmd.yes {
        println!("This will clear persisted progress and sort state.");
        println!("Use --yes to confirm.");
        return Ok(());
    }
    let store = open_storage(config)?;
    let removed = store.clear()?;
    println!("Cleared {removed} stored entries.");
    Ok(())
}

fn handle_config(path: Option<PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Source]");
                match &config.source.base_url {
                    Some(url) => println!("  Base URL:           {url}"),
                    None => println!("  Data dir:           {}", config.source.data_dir.display()),
                }
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Cadence]");
                println!("  Progress (ms):      {}", config.cadence.progress_refresh_ms);
                println!("  Status poll (s):    {}", config.cadence.status_poll_secs);
                println!("  Auto-sort (s):      {}", config.cadence.auto_sort_secs);
                println!("  Animation (ms):     {}", config.cadence.animation_frame_ms);
                println!();
                println!("[Board]");
                println!("  Host:               {}", config.board.host);
                println!(
                    "  Geometry:           {} px, marker {} px",
                    config.board.container_width, config.board.marker_width
                );
                println!();
                println!("[Table]");
                match &config.table.path {
                    Some(p) => println!("  Path:               {}", p.display()),
                    None => println!("  Path:               (none)"),
                }
                println!("  Status column:      {}", config.table.status_column);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.or(path).unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
