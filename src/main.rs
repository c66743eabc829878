use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use studyforge::clock::{Clock, SystemClock};
use studyforge::config::Config;
use studyforge::error::{ConfigError, SessionError};
use studyforge::rng::SeededRng;
use studyforge::scheduler::{self, RecallQuality};
use studyforge::session::{ReviewSession, SessionManager};
use studyforge::store::{FileStore, Store};
use studyforge::{card, queue};

#[derive(Parser)]
#[command(name = "studyforge", about = "Spaced repetition with a foraging reward loop")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Review due cards in the terminal
    Drill(DrillArgs),
    /// List decks with due counts
    Decks(DeckArgs),
    /// Show the interval each answer would give every due card
    Preview(DeckArgs),
}

#[derive(Args)]
struct DeckArgs {
    /// CSV files or directories to search for them
    #[arg(required = true)]
    paths: Vec<String>,
}

#[derive(Args)]
struct DrillArgs {
    #[command(flatten)]
    decks: DeckArgs,
    /// Game configuration (TOML); built-in defaults otherwise
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Where progress and session history are kept
    #[arg(short, long, default_value = ".studyforge")]
    data_dir: PathBuf,
    /// Location to forage at, overrides the config
    #[arg(short, long)]
    location: Option<String>,
    /// Maximum number of cards this session
    #[arg(short = 'n', long)]
    limit: Option<usize>,
    /// RNG seed for reproducible rewards
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Store(#[from] studyforge::error::StoreError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("no CSV files found")]
    NoFiles,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("studyforge=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Drill(args) => drill(args),
        Command::Decks(args) => decks(&args),
        Command::Preview(args) => preview(&args),
    };
    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn load_store(args: &DeckArgs, data_dir: PathBuf) -> Result<FileStore, CliError> {
    let files = card::discover_files(&args.paths);
    if files.is_empty() {
        return Err(CliError::NoFiles);
    }
    Ok(FileStore::new(files, data_dir))
}

fn decks(args: &DeckArgs) -> Result<(), CliError> {
    let mut store = load_store(args, PathBuf::new())?;
    let now = SystemClock.now();
    let cards = store.load_cards(now)?;
    for s in queue::deck_summaries(&cards, now) {
        println!("{} ({} due / {} total)", s.name, s.due, s.total);
    }
    Ok(())
}

fn preview(args: &DeckArgs) -> Result<(), CliError> {
    let mut store = load_store(args, PathBuf::new())?;
    let now = SystemClock.now();
    let cards = store.load_cards(now)?;
    for c in queue::due_items(&cards, now, None) {
        let intervals: Vec<String> = scheduler::preview_all_intervals(&c.snapshot(), now)
            .iter()
            .map(|(q, days)| format!("{}={}", q.label(), scheduler::format_interval(*days)))
            .collect();
        println!("[{}] {}  {}", c.status, c.front, intervals.join(" "));
    }
    Ok(())
}

fn drill(args: DrillArgs) -> Result<(), CliError> {
    let mut config = match &args.config {
        Some(path) => Config::load_from_toml(path)?,
        None => Config::default(),
    };
    if let Some(location) = args.location {
        config.session.location = location;
    }
    if args.limit.is_some() {
        config.session.card_limit = args.limit;
    }
    if args.seed.is_some() {
        config.session.seed = args.seed;
    }

    let store = load_store(&args.decks, args.data_dir)?;
    let rng = match config.session.seed {
        Some(seed) => SeededRng::from_seed(seed),
        None => SeededRng::from_entropy(),
    };
    let mut manager = SessionManager::new(store, &config, Box::new(SystemClock), Box::new(rng));

    let due = manager.start_session()?;
    if due == 0 {
        println!("No cards due for review.");
        manager.abandon_session();
        return Ok(());
    }
    println!("{due} cards due for review. Foraging at {}.\n", manager.loadout().location);

    let stdin = io::stdin();
    let mut stdin = stdin.lock();
    let mut buf = String::new();
    let mut position = 0;

    while let Some(current) = manager.current_card() {
        position += 1;
        let now = SystemClock.now();
        let intervals = scheduler::preview_all_intervals(&current.snapshot(), now);

        println!("[{position}/{due}] {}", current.deck);
        println!();
        println!("{}", current.front);
        println!();

        print!("Press Enter to reveal...");
        io::stdout().flush()?;
        buf.clear();
        if stdin.read_line(&mut buf)? == 0 {
            break;
        }

        println!("{}", current.back);
        println!();

        let grade = loop {
            let labels: Vec<String> = intervals
                .iter()
                .map(|(q, days)| {
                    format!("{}={} ({})", q.index() + 1, q.label(), scheduler::format_interval(*days))
                })
                .collect();
            print!("Rate {}: ", labels.join(", "));
            io::stdout().flush()?;
            buf.clear();
            if stdin.read_line(&mut buf)? == 0 {
                break None;
            }
            if let Ok(n) = buf.trim().parse::<u8>()
                && let Some(q) = RecallQuality::from_u8(n)
            {
                break Some(q);
            }
            println!("Please enter 1, 2, 3, or 4.");
        };
        let Some(grade) = grade else {
            break;
        };

        let step = manager.review_card(grade)?;
        println!("  +{} XP, found {}", step.xp_event.amount, step.outcome);
        for bonus in &step.bonus_log {
            println!("  * {bonus}");
        }
        if step.stored < step.outcome.quantity {
            println!("  (only {} fit in your pack)", step.stored);
        }
        println!();
    }

    let record = manager.end_session()?;
    print_summary(&record, &manager);
    Ok(())
}

fn print_summary<S: Store>(record: &ReviewSession, manager: &SessionManager<S>) {
    let counts = record.quality_counts;
    println!("Session complete!");
    println!(
        "  Fail: {}, Hard: {}, Good: {}, Easy: {}",
        counts.fail, counts.hard, counts.good, counts.easy
    );
    println!("  XP earned: {}", record.xp_earned);

    let found: u32 = record.reward_log.iter().map(|e| e.stored).sum();
    println!("  Items gathered: {found}");

    let progress = manager.progress();
    if !progress.inventory.is_empty() {
        println!("  Inventory:");
        for (id, amount) in progress.inventory.iter() {
            println!("    {id}: {amount}");
        }
    }
    println!(
        "  Streak: {} day(s) (best {})",
        progress.streak.current, progress.streak.longest
    );
}
