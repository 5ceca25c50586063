use std::fmt;

use chrono::{DateTime, Utc};
use course_core::model::{Course, CourseId, Enrollment, Lesson, LessonId, Section, SectionId, UserId};
use storage::repository::{Storage, StorageError};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    id_base: u64,
    course_id: CourseId,
    course_title: String,
    sections: u32,
    lessons_per_section: u32,
    lesson_seconds: u32,
    user_id: Option<UserId>,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidCourseId { raw: String },
    InvalidCount { flag: &'static str, raw: String },
    InvalidUserId { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
    CourseIdTooLarge { course_id: u64 },
    TooManyLessons { total: u64 },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidCourseId { raw } => write!(f, "invalid --course-id value: {raw}"),
            ArgsError::InvalidCount { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidUserId { raw } => {
                write!(f, "invalid --user value (expected UUID): {raw}")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
            ArgsError::CourseIdTooLarge { course_id } => {
                write!(f, "--course-id {course_id} leaves no room for section and lesson ids")
            }
            ArgsError::TooManyLessons { total } => write!(
                f,
                "{total} lessons do not fit in one course id block of {ID_BLOCK}"
            ),
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

/// Section and lesson ids of a course are allocated from `course_id * ID_BLOCK + 1`.
const ID_BLOCK: u64 = 1_000;

/// First id of the course's block; the whole block must stay a valid `SQLite` integer.
fn id_base(
    course_id: CourseId,
    sections: u32,
    lessons_per_section: u32,
) -> Result<u64, ArgsError> {
    let total = u64::from(sections) * u64::from(lessons_per_section);
    if total >= ID_BLOCK || u64::from(sections) >= ID_BLOCK {
        return Err(ArgsError::TooManyLessons { total });
    }
    course_id
        .value()
        .checked_mul(ID_BLOCK)
        .filter(|base| base.checked_add(ID_BLOCK).is_some_and(|end| i64::try_from(end).is_ok()))
        .ok_or(ArgsError::CourseIdTooLarge {
            course_id: course_id.value(),
        })
}

fn parse_count(flag: &'static str, value: String) -> Result<u32, ArgsError> {
    value
        .parse::<u32>()
        .map_err(|_| ArgsError::InvalidCount { flag, raw: value })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("COURSE_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3?mode=rwc".into());
        let mut course_id = std::env::var("COURSE_ID")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or_else(|| CourseId::new(1), CourseId::new);
        let mut user_id = std::env::var("COURSE_USER_ID")
            .ok()
            .and_then(|value| value.parse::<UserId>().ok());
        let mut course_title = "Demo Course".to_string();
        let mut sections = 2;
        let mut lessons_per_section = 2;
        let mut lesson_seconds = 300;
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--course-id" => {
                    let value = require_value(&mut args, "--course-id")?;
                    course_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidCourseId { raw: value.clone() })?;
                }
                "--title" => {
                    course_title = require_value(&mut args, "--title")?;
                }
                "--sections" => {
                    sections = parse_count("--sections", require_value(&mut args, "--sections")?)?;
                }
                "--lessons" => {
                    lessons_per_section =
                        parse_count("--lessons", require_value(&mut args, "--lessons")?)?;
                }
                "--lesson-seconds" => {
                    lesson_seconds = parse_count(
                        "--lesson-seconds",
                        require_value(&mut args, "--lesson-seconds")?,
                    )?;
                }
                "--user" => {
                    let value = require_value(&mut args, "--user")?;
                    user_id = Some(
                        value
                            .parse()
                            .map_err(|_| ArgsError::InvalidUserId { raw: value.clone() })?,
                    );
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let id_base = id_base(course_id, sections, lessons_per_section)?;

        Ok(Self {
            db_url,
            id_base,
            course_id,
            course_title,
            sections,
            lessons_per_section,
            lesson_seconds,
            user_id,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3?mode=rwc)");
    eprintln!("  --course-id <id>          Course id to upsert (default: 1)");
    eprintln!("  --title <text>            Course title (default: Demo Course)");
    eprintln!("  --sections <n>            Number of sections (default: 2)");
    eprintln!("  --lessons <n>             Lessons per section (default: 2)");
    eprintln!("  --lesson-seconds <n>      Duration of each lesson (default: 300)");
    eprintln!("  --user <uuid>             Learner to enroll (default: random)");
    eprintln!("  --now <rfc3339>           Fixed enrollment time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  COURSE_DB_URL, COURSE_ID, COURSE_USER_ID");
}

/// Demo video for a lesson; alternates between a manifest and a plain file.
fn demo_video_url(lesson: u64) -> String {
    if lesson % 2 == 1 {
        format!("https://media.example.com/lessons/{lesson}/master.m3u8")
    } else {
        format!("https://media.example.com/lessons/{lesson}.mp4")
    }
}

fn build_catalog(args: &Args) -> Result<(Course, Vec<Section>, Vec<Lesson>), course_core::Error> {
    let course = Course::new(args.course_id, args.course_title.clone(), true)?;
    let base = args.id_base;
    let mut sections = Vec::new();
    let mut lessons = Vec::new();

    for s in 0..args.sections {
        let section_id = SectionId::new(base + u64::from(s) + 1);
        sections.push(Section {
            id: section_id,
            course_id: args.course_id,
            title: format!("Section {}", s + 1),
            sort_order: i32::try_from(s).unwrap_or(i32::MAX),
        });
        for l in 0..args.lessons_per_section {
            let lesson_id =
                base + u64::from(s) * u64::from(args.lessons_per_section) + u64::from(l) + 1;
            lessons.push(Lesson {
                id: LessonId::new(lesson_id),
                section_id,
                title: format!("Lesson {}.{}", s + 1, l + 1),
                video_url: Some(demo_video_url(lesson_id)),
                duration_seconds: args.lesson_seconds,
                sort_order: i32::try_from(l).unwrap_or(i32::MAX),
                is_published: true,
            });
        }
    }

    Ok((course, sections, lessons))
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let (course, sections, lessons) = build_catalog(&args)?;

    storage.courses.upsert_course(&course).await?;
    for section in &sections {
        storage.courses.upsert_section(section).await?;
    }
    for lesson in &lessons {
        storage.courses.upsert_lesson(lesson).await?;
    }

    let user_id = args.user_id.unwrap_or_else(UserId::random);
    let enrolled_at = args.now.unwrap_or_else(Utc::now);
    match storage
        .enrollments
        .insert_enrollment(&Enrollment::new(user_id, course.id(), enrolled_at))
        .await
    {
        Ok(()) | Err(StorageError::Conflict) => {}
        Err(e) => return Err(e.into()),
    }

    println!(
        "Seeded course {} ({}) with {} sections and {} lessons; enrolled user {}.",
        course.id(),
        course.title(),
        sections.len(),
        lessons.len(),
        user_id
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
