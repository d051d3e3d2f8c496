//! # Delver Main Entry Point
//!
//! Offers a choice of paths, generates the chosen dungeon and runs the crawl
//! loop on stdin/stdout.

use clap::Parser;
use delver::{
    generation::utils::create_rng, CrawlSession, CrawlState, DelverResult,
    DoorPlacement, DungeonBuilder, EncounterHandoff, InputHandler, LevelTable, PlayerInput, TextDisplay,
};
use log::{error, info, LevelFilter};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Command line arguments for Delver.
#[derive(Parser, Debug)]
#[command(name = "delver")]
#[command(about = "A turn-based dungeon crawl in the terminal")]
#[command(version)]
struct Args {
    /// Random seed for path offers, generation and enemy AI
    #[arg(short, long)]
    seed: Option<u64>,

    /// Level to enter directly, skipping the path offer
    #[arg(short, long)]
    level: Option<String>,

    /// JSON level table to use instead of the bundled one
    #[arg(long)]
    levels: Option<PathBuf>,

    /// Put extra doors at random wall positions instead of wall midpoints
    #[arg(long)]
    randomized_doors: bool,

    /// Disable ANSI colours
    #[arg(long)]
    no_color: bool,

    /// Disable h/j/k/l movement keys
    #[arg(long)]
    no_vi_keys: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() {
    let args = Args::parse();
    initialize_logging(&args.log_level);

    info!("Starting Delver v{}", delver::VERSION);

    if let Err(e) = run(&args) {
        error!("Crawl failed: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Initializes env_logger with the requested level.
fn initialize_logging(log_level: &str) {
    let level = match log_level.to_lowercase().as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Warn,
    };

    env_logger::Builder::new()
        .filter_level(level)
        .format_target(false)
        .init();
}

fn run(args: &Args) -> DelverResult<()> {
    let table = match &args.levels {
        Some(path) => LevelTable::load(path)?,
        None => LevelTable::builtin()?,
    };
    let seed = args.seed.unwrap_or_else(rand::random);
    info!("Using seed {}", seed);

    let placement = if args.randomized_doors {
        DoorPlacement::Randomized
    } else {
        DoorPlacement::Midpoint
    };

    let mut input_handler = InputHandler::new();
    input_handler.vi_keys_enabled = !args.no_vi_keys;
    let mut display = TextDisplay::new(!args.no_color);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut rng = create_rng(seed);

    let level = match &args.level {
        Some(level) => {
            table.get(level)?;
            level.clone()
        }
        None => loop {
            let Some(choice) = choose_path(&table, &mut rng, &mut lines)? else {
                return Ok(());
            };
            let kind = table.get(&choice)?.kind;
            if kind.is_crawl() {
                break choice;
            }
            // Only dungeons are crawled; other locations are announced
            println!("{} location: {}", capitalize(&kind.to_string()), choice);
        },
    };

    let config = table.generation_config(&level, seed, placement)?;
    let dungeon = DungeonBuilder::build(&config)?;
    info!("Generated '{}' with {} rooms", level, dungeon.room_count());

    let mut session = CrawlSession::enter(dungeon, seed)?;
    display.add_message(format!("You descend into {}.", level));
    println!("{}", input_handler.help_text());

    let mut handoff = None;
    while session.is_active() {
        print!("{}", display.render_session(&session));
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        match input_handler.parse_line(&line?) {
            Some(PlayerInput::Move(delta)) => {
                let report = session.move_player(delta)?;
                display.narrate(&report);
                if let Some(started) = report.handoff() {
                    handoff = Some(started.clone());
                }
            }
            Some(PlayerInput::Help) => display.add_message(input_handler.help_text()),
            Some(PlayerInput::Quit) => break,
            None => display.add_message("Unknown command. Press ? for help."),
        }
    }

    print!("{}", display.render_session(&session));
    report_outcome(&session, handoff.as_ref());
    Ok(())
}

/// Shows a fresh path offer and reads the player's pick.
///
/// Returns `None` when the player quits or stdin closes.
fn choose_path(
    table: &LevelTable,
    rng: &mut rand::rngs::StdRng,
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> DelverResult<Option<String>> {
    let offered = table.offer_paths(rng)?;
    loop {
        println!("Paths ahead:");
        for (index, name) in offered.iter().enumerate() {
            let kind = table.get(name)?.kind;
            println!("  {}) {} [{}]", index + 1, name, kind);
        }
        print!("Choose a path (q to quit): ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            return Ok(None);
        };
        let line = line?;
        let answer = line.trim();
        if answer.eq_ignore_ascii_case("q") {
            return Ok(None);
        }
        match answer.parse::<usize>() {
            Ok(choice) if (1..=offered.len()).contains(&choice) => {
                return Ok(Some(offered[choice - 1].clone()));
            }
            _ => println!("Pick a number between 1 and {}.", offered.len()),
        }
    }
}

fn report_outcome(session: &CrawlSession, handoff: Option<&EncounterHandoff>) {
    let stats = session.statistics();
    match session.state() {
        CrawlState::Exited => println!("You escaped the dungeon."),
        CrawlState::Encounter => {
            let handoff = handoff
                .map(|handoff| {
                    format!(
                        "{:?} enemy at {} in {}",
                        handoff.enemy_class, handoff.enemy_at, handoff.room
                    )
                })
                .unwrap_or_else(|| "unknown enemy".to_string());
            println!("Encounter! {}", handoff);
        }
        _ => println!("You leave the crawl unfinished."),
    }
    println!(
        "Turns: {}  Steps: {}  Rooms entered: {}  Traps sprung: {}  Enemies perished: {}",
        session.turn_number(),
        stats.steps_taken,
        stats.rooms_entered,
        stats.traps_sprung,
        stats.enemies_perished
    );
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
