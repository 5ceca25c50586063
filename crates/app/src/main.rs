use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use course_core::model::{CourseId, LessonId, PlaybackSupport, UserId};
use services::player::{HeadlessMedia, PlaybackEvent, format_timestamp};
use services::{AppServices, Clock, LessonPage, NotificationLevel, StaticIdentity};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt as log_fmt};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    InvalidId { flag: &'static str, raw: String },
    InvalidUserId { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required for this command"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidId { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidUserId { raw } => {
                write!(f, "invalid --user value (expected UUID): {raw}")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
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

fn parse_id(flag: &'static str, value: String) -> Result<u64, ArgsError> {
    value
        .parse::<u64>()
        .map_err(|_| ArgsError::InvalidId { flag, raw: value })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Status,
    Complete,
    Continue,
    Watch,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "status" => Some(Self::Status),
            "complete" => Some(Self::Complete),
            "continue" => Some(Self::Continue),
            "watch" => Some(Self::Watch),
            _ => None,
        }
    }

    fn needs_lesson(self) -> bool {
        matches!(self, Self::Complete | Self::Watch)
    }
}

struct Args {
    db_url: String,
    user_id: Option<UserId>,
    course_id: CourseId,
    lesson_id: Option<LessonId>,
    watch_seconds: u64,
    to_end: bool,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- status   [--db <url>] [--user <uuid>] [--course-id <id>]");
    eprintln!("  cargo run -p app -- continue [--db <url>] [--user <uuid>] [--course-id <id>]");
    eprintln!("  cargo run -p app -- complete --lesson-id <id> [--db <url>] [--user <uuid>]");
    eprintln!("  cargo run -p app -- watch    --lesson-id <id> [--seconds <n>] [--to-end]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:dev.sqlite3");
    eprintln!("  --course-id 1");
    eprintln!("  --seconds 25");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  COURSE_DB_URL, COURSE_USER_ID, COURSE_ID, RUST_LOG");
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("COURSE_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://dev.sqlite3".into(), normalize_sqlite_url);
        let mut user_id = std::env::var("COURSE_USER_ID")
            .ok()
            .and_then(|value| value.parse::<UserId>().ok());
        let mut course_id = std::env::var("COURSE_ID")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or_else(|| CourseId::new(1), CourseId::new);
        let mut lesson_id = None;
        let mut watch_seconds = 25;
        let mut to_end = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--user" => {
                    let value = require_value(args, "--user")?;
                    user_id = Some(
                        value
                            .parse()
                            .map_err(|_| ArgsError::InvalidUserId { raw: value.clone() })?,
                    );
                }
                "--course-id" => {
                    let value = require_value(args, "--course-id")?;
                    course_id = CourseId::new(parse_id("--course-id", value)?);
                }
                "--lesson-id" => {
                    let value = require_value(args, "--lesson-id")?;
                    lesson_id = Some(LessonId::new(parse_id("--lesson-id", value)?));
                }
                "--seconds" => {
                    let value = require_value(args, "--seconds")?;
                    watch_seconds = parse_id("--seconds", value)?;
                }
                "--to-end" => to_end = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            user_id,
            course_id,
            lesson_id,
            watch_seconds,
            to_end,
        })
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
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    log_fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn status(
    services: &AppServices,
    user: UserId,
    course: CourseId,
) -> Result<(), Box<dyn std::error::Error>> {
    let overview = services.courses().overview(user, course).await?;
    println!("{} (course {})", overview.title, overview.course_id);
    for lesson in &overview.lessons {
        let mark = if lesson.is_completed { "x" } else { " " };
        println!(
            "  [{mark}] {:>6}  {}  {}/{}",
            lesson.lesson_id.to_string(),
            lesson.title,
            format_timestamp(lesson.watched_seconds),
            format_timestamp(lesson.duration_seconds),
        );
    }
    match overview.stored_percentage {
        Some(stored) => println!("progress: {}% (stored {stored}%)", overview.live_percentage),
        None => println!("progress: {}% (not enrolled)", overview.live_percentage),
    }
    println!("continue: {}", overview.continue_to.path());
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None | Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let mut iter = argv.into_iter().skip(1);
    let parsed = Args::parse(&mut iter)
        .and_then(|args| {
            if cmd.needs_lesson() && args.lesson_id.is_none() {
                return Err(ArgsError::MissingFlag { flag: "--lesson-id" });
            }
            Ok(args)
        })
        .map_err(|e| {
            eprintln!("{e}");
            print_usage();
            e
        })?;
    let Some(user_id) = parsed.user_id else {
        eprintln!("sign in with --user or COURSE_USER_ID");
        return Err(ArgsError::MissingFlag { flag: "--user" }.into());
    };
    let course_id = parsed.course_id;

    // Open + migrate SQLite in the binary so the library crates stay storage-agnostic.
    prepare_sqlite_file(&parsed.db_url)?;
    let services = AppServices::new_sqlite(
        &parsed.db_url,
        Clock::system(),
        Arc::new(StaticIdentity::signed_in(user_id)),
    )
    .await?;
    info!(db = %parsed.db_url, %user_id, %course_id, ?cmd, "services ready");

    match cmd {
        Command::Status => status(&services, user_id, course_id).await,
        Command::Continue => {
            let to = services
                .courses()
                .continue_destination(user_id, course_id)
                .await?;
            println!("{}", to.path());
            Ok(())
        }
        Command::Complete | Command::Watch => {
            let Some(lesson_id) = parsed.lesson_id else {
                return Err(ArgsError::MissingFlag { flag: "--lesson-id" }.into());
            };
            let mut player = match services
                .lesson_player()
                .open_or_redirect(course_id, lesson_id)
                .await?
            {
                LessonPage::Ready(player) => player,
                LessonPage::Redirect(to) => {
                    println!("redirect: {}", to.path());
                    return Ok(());
                }
            };

            let destination = if cmd == Command::Complete {
                player.mark_complete().await
            } else {
                let (mut controller, mut events) =
                    player.build_controller(PlaybackSupport::full(), HeadlessMedia::new(), true)?;
                controller.on_metadata(f64::from(player.lesson().duration_seconds), Vec::new());

                let deadline = tokio::time::sleep(Duration::from_secs(parsed.watch_seconds));
                tokio::pin!(deadline);
                let mut destination = None;
                while destination.is_none() {
                    tokio::select! {
                        () = &mut deadline => break,
                        Some(event) = events.recv() => {
                            if let PlaybackEvent::Progress(seconds) = event {
                                println!("watched {}", format_timestamp(seconds));
                            }
                            destination = player.handle_event(event).await;
                        }
                    }
                }
                if parsed.to_end {
                    controller.on_ended();
                }
                controller.pause();
                drop(controller);
                match destination {
                    Some(to) => Some(to),
                    None => player.run(&mut events).await,
                }
            };

            for note in player.take_notifications() {
                let tag = match note.level {
                    NotificationLevel::Success => "ok",
                    NotificationLevel::Error => "error",
                };
                println!("{tag}: {}", note.message);
            }
            if let Some(to) = destination {
                println!("next: {}", to.path());
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
