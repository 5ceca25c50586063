use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use course_core::model::{
    Course, CourseId, Enrollment, EnrollmentUpdate, Lesson, LessonId, LessonProgress,
    PlaybackSupport, ProgressKey, ProgressWrite, Section, SectionId, UserId,
};
use course_core::navigation::Destination;
use course_core::time::fixed_now;
use services::player::{HeadlessMedia, PlaybackEvent};
use services::{
    AppServices, Clock, LessonPage, LessonPlayer, LessonPlayerError, NotificationLevel,
    StaticIdentity,
};
use storage::repository::{
    CourseRepository, EnrollmentRepository, InMemoryRepository, LessonProgressRepository, Storage,
    StorageError,
};

const COURSE: CourseId = CourseId::new(1);

fn lesson(id: u64, section: u64, sort_order: i32, is_published: bool) -> Lesson {
    Lesson {
        id: LessonId::new(id),
        section_id: SectionId::new(section),
        title: format!("Lesson {id}"),
        video_url: Some(format!("https://cdn.example.com/{id}/master.m3u8")),
        duration_seconds: 120,
        sort_order,
        is_published,
    }
}

/// Two sections with two published lessons each, plus a draft.
async fn seed(repo: &InMemoryRepository) {
    repo.upsert_course(&Course::new(COURSE, "Watercolor basics", true).unwrap())
        .await
        .unwrap();
    for (id, sort_order) in [(10, 0), (20, 1)] {
        repo.upsert_section(&Section {
            id: SectionId::new(id),
            course_id: COURSE,
            title: format!("Section {id}"),
            sort_order,
        })
        .await
        .unwrap();
    }
    for l in [
        lesson(1, 10, 0, true),
        lesson(2, 10, 1, true),
        lesson(3, 20, 0, true),
        lesson(4, 20, 1, true),
        lesson(5, 20, 2, false),
    ] {
        repo.upsert_lesson(&l).await.unwrap();
    }
}

fn storage_from(repo: &InMemoryRepository) -> Storage {
    Storage {
        courses: Arc::new(repo.clone()),
        progress: Arc::new(repo.clone()),
        enrollments: Arc::new(repo.clone()),
    }
}

fn app(storage: &Storage, user: UserId) -> AppServices {
    AppServices::from_storage(
        storage,
        Clock::fixed(fixed_now()),
        Arc::new(StaticIdentity::signed_in(user)),
    )
}

async fn enrolled() -> (InMemoryRepository, AppServices, UserId) {
    let repo = InMemoryRepository::new();
    seed(&repo).await;
    let user = UserId::random();
    let services = app(&storage_from(&repo), user);
    services.enrollments().enroll(user, COURSE).await.unwrap();
    (repo, services, user)
}

async fn open(services: &AppServices, lesson_id: u64) -> LessonPlayer {
    match services
        .lesson_player()
        .open(COURSE, LessonId::new(lesson_id))
        .await
        .unwrap()
    {
        LessonPage::Ready(player) => player,
        LessonPage::Redirect(to) => panic!("unexpected redirect to {}", to.path()),
    }
}

fn overview() -> Destination {
    Destination::CourseOverview(COURSE)
}

#[tokio::test]
async fn completing_four_lessons_across_two_sections() {
    let (_repo, services, _user) = enrolled().await;

    let mut destinations = Vec::new();
    for id in 1..=3 {
        let mut player = open(&services, id).await;
        destinations.push(player.mark_complete().await.unwrap());
        assert!(player.is_completed());
    }
    let after_three = open(&services, 4).await;
    assert_eq!(after_three.enrollment().progress_percentage(), 75);
    assert!(after_three.enrollment().completed_at().is_none());

    let mut last = open(&services, 4).await;
    destinations.push(last.mark_complete().await.unwrap());
    assert_eq!(last.enrollment().progress_percentage(), 100);
    assert_eq!(last.enrollment().completed_at(), Some(fixed_now()));
    assert_eq!(last.enrollment().last_lesson_id(), Some(LessonId::new(4)));

    let paths: Vec<String> = destinations.iter().map(Destination::path).collect();
    assert_eq!(
        paths,
        vec![
            "/courses/1/learn/2",
            "/courses/1/learn/3",
            "/courses/1/learn/4",
            "/courses/1",
        ]
    );
}

#[tokio::test]
async fn completing_the_same_lesson_twice_is_idempotent() {
    let (_repo, services, _user) = enrolled().await;

    let mut player = open(&services, 2).await;
    player.mark_complete().await.unwrap();
    player.mark_complete().await.unwrap();

    assert_eq!(player.enrollment().progress_percentage(), 25);
    let overview = services.courses().overview(player.enrollment().user_id(), COURSE).await.unwrap();
    assert_eq!(overview.live_percentage, 25);
    assert_eq!(overview.stored_percentage, Some(25));
}

#[tokio::test]
async fn ticks_are_last_write_wins_and_resume_the_player() {
    let (_repo, services, _user) = enrolled().await;

    let mut player = open(&services, 3).await;
    assert_eq!(player.handle_event(PlaybackEvent::Progress(45)).await, None);
    assert_eq!(player.handle_event(PlaybackEvent::Progress(10)).await, None);
    assert_eq!(player.progress().unwrap().watched_seconds(), 10);
    assert!(player.notifications().is_empty());

    let reopened = open(&services, 3).await;
    let options = reopened.player_options(true);
    assert_eq!(options.start_offset, 10);
    assert!(!options.already_completed);
    // Ticks never touch the enrollment.
    assert_eq!(reopened.enrollment().progress_percentage(), 0);
}

#[tokio::test]
async fn completed_lessons_restart_without_completing_again() {
    let (_repo, services, _user) = enrolled().await;

    let mut player = open(&services, 1).await;
    player.handle_event(PlaybackEvent::Progress(30)).await;
    player.mark_complete().await.unwrap();

    let reopened = open(&services, 1).await;
    let options = reopened.player_options(false);
    assert_eq!(options.start_offset, 0);
    assert!(options.already_completed);
    let row = reopened.progress().unwrap();
    assert_eq!(row.watched_seconds(), row.total_seconds());
}

#[tokio::test(start_paused = true)]
async fn playback_session_drives_progress_and_navigation() {
    let (repo, services, user) = enrolled().await;

    let mut player = open(&services, 2).await;
    let (mut controller, mut events) = player
        .build_controller(PlaybackSupport::full(), HeadlessMedia::new(), true)
        .unwrap();
    controller.on_metadata(120.0, Vec::new());
    tokio::time::sleep(Duration::from_secs(25)).await;
    controller.on_ended();

    let destination = player.run(&mut events).await;
    assert_eq!(
        destination,
        Some(Destination::Lesson {
            course_id: COURSE,
            lesson_id: LessonId::new(3),
        })
    );
    let row = repo
        .get_progress(ProgressKey::new(user, LessonId::new(2)))
        .await
        .unwrap()
        .unwrap();
    assert!(row.is_completed());
    assert_eq!(row.watched_seconds(), 120);
    assert_eq!(
        player.take_notifications()[0].level,
        NotificationLevel::Success
    );
}

#[tokio::test]
async fn unknown_or_draft_lessons_and_strangers_are_redirected() {
    let (repo, services, _user) = enrolled().await;
    let lessons = services.lesson_player();

    for id in [99, 5] {
        let page = lessons.open(COURSE, LessonId::new(id)).await.unwrap();
        assert!(matches!(page, LessonPage::Redirect(to) if to == overview()));
    }

    let stranger = app(&storage_from(&repo), UserId::random());
    let page = stranger
        .lesson_player()
        .open(COURSE, LessonId::new(1))
        .await
        .unwrap();
    assert!(matches!(page, LessonPage::Redirect(to) if to == overview()));

    let missing_course = lessons
        .open_or_redirect(CourseId::new(404), LessonId::new(1))
        .await
        .unwrap();
    assert!(matches!(
        missing_course,
        LessonPage::Redirect(Destination::CourseOverview(id)) if id == CourseId::new(404)
    ));
}

#[tokio::test]
async fn anonymous_visitors_must_sign_in() {
    let repo = InMemoryRepository::new();
    seed(&repo).await;
    let services = AppServices::from_storage(
        &storage_from(&repo),
        Clock::fixed(fixed_now()),
        Arc::new(StaticIdentity::anonymous()),
    );

    let result = services.lesson_player().open(COURSE, LessonId::new(1)).await;
    assert!(matches!(result, Err(LessonPlayerError::NotAuthenticated)));
}

#[tokio::test]
async fn continue_resumes_the_last_completed_lesson() {
    let (_repo, services, user) = enrolled().await;
    let courses = services.courses();

    assert_eq!(
        courses.continue_destination(user, COURSE).await.unwrap().path(),
        "/courses/1/learn/1"
    );

    open(&services, 3).await.mark_complete().await.unwrap();
    assert_eq!(
        courses.continue_destination(user, COURSE).await.unwrap().path(),
        "/courses/1/learn/3"
    );

    let overview = courses.overview(user, COURSE).await.unwrap();
    assert_eq!(overview.lessons.len(), 4);
    assert_eq!(overview.live_percentage, 25);
}

// ─── failing storage ─────────────────────────────────────────────────────────

#[derive(Clone)]
struct BrokenProgressWrites(InMemoryRepository);

#[async_trait]
impl LessonProgressRepository for BrokenProgressWrites {
    async fn upsert_progress(
        &self,
        _key: ProgressKey,
        _write: ProgressWrite,
    ) -> Result<LessonProgress, StorageError> {
        Err(StorageError::Connection("connection reset".into()))
    }

    async fn get_progress(&self, key: ProgressKey) -> Result<Option<LessonProgress>, StorageError> {
        self.0.get_progress(key).await
    }

    async fn list_course_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<LessonProgress>, StorageError> {
        self.0.list_course_progress(user_id, course_id).await
    }
}

#[derive(Clone)]
struct BrokenEnrollmentUpdates(InMemoryRepository);

#[async_trait]
impl EnrollmentRepository for BrokenEnrollmentUpdates {
    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError> {
        self.0.insert_enrollment(enrollment).await
    }

    async fn get_enrollment(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, StorageError> {
        self.0.get_enrollment(user_id, course_id).await
    }

    async fn update_enrollment(
        &self,
        _user_id: UserId,
        _course_id: CourseId,
        _update: &EnrollmentUpdate,
    ) -> Result<Enrollment, StorageError> {
        Err(StorageError::Connection("timeout".into()))
    }
}

#[tokio::test]
async fn progress_write_failures_become_notifications() {
    let (repo, _services, user) = enrolled().await;
    let storage = Storage {
        courses: Arc::new(repo.clone()),
        progress: Arc::new(BrokenProgressWrites(repo.clone())),
        enrollments: Arc::new(repo.clone()),
    };
    let services = app(&storage, user);

    let mut player = open(&services, 1).await;
    assert_eq!(player.handle_event(PlaybackEvent::Progress(10)).await, None);
    assert_eq!(player.handle_event(PlaybackEvent::Completed).await, None);

    let notes = player.take_notifications();
    assert_eq!(notes.len(), 2);
    assert!(notes.iter().all(|n| n.level == NotificationLevel::Error));
    assert!(!player.is_completed());
    assert!(player.notifications().is_empty());
}

#[tokio::test]
async fn enrollment_failure_keeps_the_completed_lesson() {
    let (repo, _services, user) = enrolled().await;
    let storage = Storage {
        courses: Arc::new(repo.clone()),
        progress: Arc::new(repo.clone()),
        enrollments: Arc::new(BrokenEnrollmentUpdates(repo.clone())),
    };
    let services = app(&storage, user);

    let mut player = open(&services, 1).await;
    assert_eq!(player.mark_complete().await, None);
    assert_eq!(player.notifications()[0].level, NotificationLevel::Error);

    let row = repo
        .get_progress(ProgressKey::new(user, LessonId::new(1)))
        .await
        .unwrap()
        .unwrap();
    assert!(row.is_completed());
    let enrollment = repo.get_enrollment(user, COURSE).await.unwrap().unwrap();
    assert_eq!(enrollment.progress_percentage(), 0);
}
