use std::fmt;
use std::io::{BufRead, Write};
use std::path::PathBuf;

use practice_core::model::{PracticeSettings, SessionRecord};
use services::{Clock, PracticeError, PracticeEvent, PracticeLoopService, ProgressService, SessionError};
use storage::repository::Storage;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidCount { raw: String },
    InvalidDbUrl { raw: String },
    MissingImportPath,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidCount { raw } => write!(f, "invalid --count value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::MissingImportPath => write!(f, "import requires a file path"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app drill  [--operation <op>] [--difficulty <tier>] [--count <n>] [--choices] [--db <sqlite_url>]");
    eprintln!("  app stats  [--db <sqlite_url>]");
    eprintln!("  app reset  [--db <sqlite_url>]");
    eprintln!("  app export [--db <sqlite_url>]");
    eprintln!("  app import <path> [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Operations: addition, subtraction, multiplication, division");
    eprintln!("Difficulties: easy, intermediate, advanced");
    eprintln!();
    eprintln!("Configuration:");
    eprintln!("  {}  ([storage] database_url, [practice] overrides)", config::CONFIG_FILE);
    eprintln!("  {}  (default {})", config::DB_URL_ENV, config::DEFAULT_DB_URL);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Drill,
    Stats,
    Reset,
    Export,
    Import,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "drill" => Some(Self::Drill),
            "stats" => Some(Self::Stats),
            "reset" => Some(Self::Reset),
            "export" => Some(Self::Export),
            "import" => Some(Self::Import),
            _ => None,
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    db_url: Option<String>,
    operation: Option<String>,
    difficulty: Option<String>,
    count: Option<u32>,
    choices: bool,
    import_path: Option<PathBuf>,
}

impl Args {
    fn parse(cmd: Command, args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = Some(value);
                }
                "--operation" if cmd == Command::Drill => {
                    parsed.operation = Some(require_value(args, "--operation")?);
                }
                "--difficulty" if cmd == Command::Drill => {
                    parsed.difficulty = Some(require_value(args, "--difficulty")?);
                }
                "--count" if cmd == Command::Drill => {
                    let value = require_value(args, "--count")?;
                    let count: u32 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidCount { raw: value.clone() })?;
                    parsed.count = Some(count);
                }
                "--choices" if cmd == Command::Drill => parsed.choices = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                path if cmd == Command::Import
                    && parsed.import_path.is_none()
                    && !path.starts_with("--") =>
                {
                    parsed.import_path = Some(PathBuf::from(path));
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if cmd == Command::Import && parsed.import_path.is_none() {
            return Err(ArgsError::MissingImportPath);
        }
        Ok(parsed)
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "app=info,services=info,practice_core=info,storage=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Stored settings, then `[practice]` overrides, then `--count`.
async fn resolve_settings(
    storage: &Storage,
    overrides: &config::PracticeOverrides,
    count: Option<u32>,
) -> Result<PracticeSettings, Box<dyn std::error::Error>> {
    let base = storage.settings.get_settings().await?.unwrap_or_default();
    let mut settings = overrides.apply(&base)?;
    if let Some(count) = count {
        settings = PracticeSettings::new(
            count,
            settings.allow_negative_results(),
            settings.max_retries(),
            settings.distractor_count(),
            settings.distractor_attempts(),
        )?;
    }
    Ok(settings)
}

fn print_events(events: &[PracticeEvent]) {
    for event in events {
        match event {
            PracticeEvent::QuestionAnswered {
                is_correct: true, ..
            } => println!("  Correct!"),
            PracticeEvent::QuestionAnswered { correct_answer, .. } => {
                println!("  Not quite, the answer is {correct_answer}.");
            }
            PracticeEvent::GameComplete {
                score,
                total_questions,
                accuracy,
                time_spent_secs,
            } => println!(
                "\nScore: {score}/{total_questions} ({accuracy}%) in {time_spent_secs}s"
            ),
            PracticeEvent::AchievementUnlocked { achievement } => {
                println!("  * Achievement unlocked: {achievement}");
            }
            _ => {}
        }
    }
}

async fn run_drill(
    practice: &mut PracticeLoopService,
    args: &Args,
) -> Result<(), Box<dyn std::error::Error>> {
    let progress = match (&args.operation, &args.difficulty) {
        (None, None) => {
            let state = practice.progress().state();
            let (operation, difficulty) = (state.current_operation(), state.current_difficulty());
            practice.start(operation, difficulty)?
        }
        (operation, difficulty) => {
            let fallback = practice.progress().state();
            let operation = operation
                .clone()
                .unwrap_or_else(|| fallback.current_operation().to_string());
            let difficulty = difficulty
                .clone()
                .unwrap_or_else(|| fallback.current_difficulty().to_string());
            practice.start_from_selection(&operation, &difficulty)?
        }
    };
    println!(
        "{} questions. Type the answer, 'h' for a hint, 'q' to stop.",
        progress.total
    );

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    let mut number = 0;
    'questions: while let Some(presented) = practice.next_question()? {
        number += 1;
        let question = presented.question;
        println!("\nQuestion {number}/{}: {} = ?", progress.total, question.display_text());
        if let Some(options) = &presented.options {
            let listed: Vec<String> = options.iter().map(ToString::to_string).collect();
            println!("  Options: {}", listed.join("   "));
        }

        loop {
            print!("> ");
            std::io::stdout().flush()?;
            let Some(line) = lines.next().transpose()? else {
                break 'questions;
            };
            match line.trim() {
                "q" | "quit" => break 'questions,
                "h" | "hint" => {
                    println!("  Hint: {}", question.hint());
                    continue;
                }
                _ => {}
            }
            match practice.submit(question.id(), &line) {
                Ok(outcome) => {
                    print_events(&outcome.events);
                    break;
                }
                Err(PracticeError::Session(SessionError::InvalidAnswer(_))) => {
                    println!("  Please enter a number.");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    let outcome = practice.finish().await?;
    print_events(&outcome.events);
    if !outcome.persisted {
        eprintln!("warning: progress could not be saved");
    }
    if let Some(update) = outcome.update {
        println!(
            "Mastery for {} ({}): {:.0}%",
            update.record.operation, update.record.difficulty, update.mastery_level
        );
    }
    Ok(())
}

const RECENT_SESSIONS_SHOWN: usize = 10;

fn print_stats(progress: &ProgressService, recent: &[SessionRecord]) {
    let summary = progress.summary();
    let stats = &summary.statistics;
    println!("Questions answered: {}", stats.total_questions);
    println!("Accuracy:           {}%", stats.accuracy);
    println!("Sessions:           {}", stats.sessions_completed);
    println!(
        "Streak:             {} (best {})",
        stats.current_streak, stats.longest_streak
    );
    println!("Avg time/question:  {}s", stats.average_time_per_question);
    println!(
        "This week:          {} questions, {}%",
        summary.weekly_questions, summary.weekly_accuracy
    );

    println!("\nMastery:");
    for cell in &summary.mastery {
        let mark = if cell.is_mastered { " *" } else { "" };
        println!(
            "  {:<15} {:<13} {:>3}%  ({} sessions){mark}",
            cell.operation.as_str(),
            cell.difficulty.as_str(),
            cell.level,
            cell.sessions_completed
        );
    }

    if !summary.badges.is_empty() {
        println!("\nBadges:");
        for badge in &summary.badges {
            println!("  {} ({})", badge.id, badge.unlocked_at.format("%Y-%m-%d"));
        }
    }

    if !recent.is_empty() {
        println!("\nRecent sessions:");
        for session in recent {
            println!(
                "  {}  {:<15} {:<13} {}/{}  {}s",
                session.recorded_at.format("%Y-%m-%d %H:%M"),
                session.operation.as_str(),
                session.difficulty.as_str(),
                session.score,
                session.total_questions,
                session.time_spent_secs
            );
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);

    let cmd = match argv.next() {
        None => Command::Drill,
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let parsed = Args::parse(cmd, &mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let app_config = config::load();
    let db_url = normalize_sqlite_url(
        parsed
            .db_url
            .clone()
            .unwrap_or_else(|| app_config.database_url.clone()),
    );

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&db_url)?;
    let storage = Storage::sqlite(&db_url).await?;
    let mut progress = ProgressService::load(Clock::default_clock(), &storage).await?;

    match cmd {
        Command::Drill => {
            let settings =
                resolve_settings(&storage, &app_config.practice, parsed.count).await?;
            let mut practice = PracticeLoopService::new(settings, progress)
                .with_multiple_choice(parsed.choices);
            run_drill(&mut practice, &parsed).await
        }
        Command::Stats => {
            let recent = progress.recent_sessions(RECENT_SESSIONS_SHOWN).await?;
            print_stats(&progress, &recent);
            Ok(())
        }
        Command::Reset => {
            progress.reset().await?;
            println!("Progress reset.");
            Ok(())
        }
        Command::Export => {
            println!("{}", progress.export_json().await?);
            Ok(())
        }
        Command::Import => {
            let path = parsed.import_path.ok_or(ArgsError::MissingImportPath)?;
            let raw = std::fs::read_to_string(&path)?;
            let settings = progress.import_json(&raw).await?;
            println!(
                "Imported {} ({} sessions{}).",
                path.display(),
                progress.state().sessions_completed(),
                if settings.is_some() { ", settings" } else { "" }
            );
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
