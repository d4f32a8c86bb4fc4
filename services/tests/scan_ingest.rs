mod helpers;

use std::time::Duration;

use chrono::Utc;
use migration::Migrator;
use sea_orm::{DatabaseConnection, EntityTrait};
use sea_orm_migration::MigratorTrait;

use db::models::{attendance_record, attendance_record::AttendanceStatus, device, scan};
use db::models::class_session::SessionStatus;
use db::test_utils::setup_test_db;
use services::classifier::AttendancePolicy;
use services::error::IngestError;
use services::events::{AttendanceEvent, NullNotifier};
use services::scan_service::{IngestOutcome, ScanRequest, ScanService};

use helpers::*;

struct World {
    db: DatabaseConnection,
    notifier: RecordingNotifier,
    policy: AttendancePolicy,
    date: String,
}

/// A course, a live 09:00-10:00 session for today, a student and a device.
async fn nine_to_ten_world() -> World {
    let db = setup_test_db().await;
    let date = today_local();
    let course = seed_course(&db, "CS301", "CS", 3, 5).await;
    seed_session(&db, &course, &date, "09:00", "10:00", SessionStatus::Live).await;
    seed_student(&db, "u04512345", "Thandi Mokoena").await;
    seed_device(&db, "scanner-key-1").await;
    World {
        db,
        notifier: RecordingNotifier::default(),
        policy: AttendancePolicy::default(),
        date,
    }
}

impl World {
    async fn scan_at(&self, time: &str) -> Result<IngestOutcome, IngestError> {
        self.scan_student_at("u04512345", time).await
    }

    async fn scan_student_at(
        &self,
        registration_no: &str,
        time: &str,
    ) -> Result<IngestOutcome, IngestError> {
        ScanService::ingest(
            &self.db,
            &self.notifier,
            &self.policy,
            ScanRequest {
                api_key: "scanner-key-1".into(),
                registration_no: registration_no.into(),
                captured_at: capture_at(&self.date, time),
                meta: None,
            },
        )
        .await
    }

    async fn records(&self) -> Vec<attendance_record::Model> {
        attendance_record::Entity::find().all(&self.db).await.unwrap()
    }

    async fn scans(&self) -> Vec<scan::Model> {
        scan::Entity::find().all(&self.db).await.unwrap()
    }
}

#[tokio::test]
async fn scan_within_grace_is_present() {
    let world = nine_to_ten_world().await;

    let outcome = world.scan_at("09:05").await.unwrap();

    assert_eq!(outcome.status, AttendanceStatus::Present);
    assert!(!outcome.already_checked_in);
    assert_eq!(outcome.session.course_code, "CS301");
    assert_eq!(outcome.check_in_at, Some(capture_at(&world.date, "09:05")));

    let records = world.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, AttendanceStatus::Present);
    assert!(matches!(
        world.notifier.events().as_slice(),
        [AttendanceEvent::ScanIngested(_)]
    ));
}

#[tokio::test]
async fn scan_after_grace_is_late() {
    let world = nine_to_ten_world().await;
    let outcome = world.scan_at("09:15").await.unwrap();
    assert_eq!(outcome.status, AttendanceStatus::Late);
}

#[tokio::test]
async fn scan_within_end_tolerance_is_late() {
    let world = nine_to_ten_world().await;
    let outcome = world.scan_at("10:04").await.unwrap();
    assert_eq!(outcome.status, AttendanceStatus::Late);
}

#[tokio::test]
async fn scan_past_tolerance_is_rejected() {
    let world = nine_to_ten_world().await;

    let err = world.scan_at("10:06").await.unwrap_err();

    assert!(matches!(err, IngestError::SessionEnded));
    assert!(world.records().await.is_empty());
    // rejection happens before the scan row is persisted
    assert!(world.scans().await.is_empty());
    assert!(matches!(
        world.notifier.events().as_slice(),
        [AttendanceEvent::ScanError { .. }]
    ));
}

#[tokio::test]
async fn unknown_device_writes_nothing() {
    let world = nine_to_ten_world().await;

    let err = ScanService::ingest(
        &world.db,
        &world.notifier,
        &world.policy,
        ScanRequest {
            api_key: "no-such-key".into(),
            registration_no: "u04512345".into(),
            captured_at: capture_at(&world.date, "09:05"),
            meta: None,
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, IngestError::InvalidDevice));
    assert!(world.scans().await.is_empty());
    assert!(world.records().await.is_empty());
}

#[tokio::test]
async fn unknown_student_fails_but_still_refreshes_device() {
    let world = nine_to_ten_world().await;

    let err = world.scan_student_at("u00000000", "09:05").await.unwrap_err();
    assert!(matches!(err, IngestError::StudentNotFound(_)));

    // liveness tracking is independent of scan validity
    let dev = device::Entity::find().one(&world.db).await.unwrap().unwrap();
    assert_eq!(dev.status, db::models::device::DeviceStatus::Online);
    assert!(dev.last_seen_at.is_some());

    assert!(matches!(
        world.notifier.events().as_slice(),
        [AttendanceEvent::ScanError { registration_no, .. }] if registration_no == "u00000000"
    ));
}

#[tokio::test]
async fn no_session_for_the_date_is_an_error() {
    let db = setup_test_db().await;
    let date = today_local();
    seed_student(&db, "u04512345", "Thandi Mokoena").await;
    seed_device(&db, "scanner-key-1").await;
    let notifier = RecordingNotifier::default();

    let err = ScanService::ingest(
        &db,
        &notifier,
        &AttendancePolicy::default(),
        ScanRequest {
            api_key: "scanner-key-1".into(),
            registration_no: "u04512345".into(),
            captured_at: capture_at(&date, "09:05"),
            meta: None,
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, IngestError::NoActiveSession(_)));
}

#[tokio::test]
async fn closed_sessions_cannot_receive_scans() {
    let db = setup_test_db().await;
    let date = today_local();
    let course = seed_course(&db, "CS301", "CS", 3, 5).await;
    seed_session(&db, &course, &date, "09:00", "10:00", SessionStatus::Closed).await;
    seed_student(&db, "u04512345", "Thandi Mokoena").await;
    seed_device(&db, "scanner-key-1").await;

    let err = ScanService::ingest(
        &db,
        &RecordingNotifier::default(),
        &AttendancePolicy::default(),
        ScanRequest {
            api_key: "scanner-key-1".into(),
            registration_no: "u04512345".into(),
            captured_at: capture_at(&date, "09:05"),
            meta: None,
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, IngestError::NoActiveSession(_)));
}

#[tokio::test]
async fn second_present_scan_is_a_duplicate_not_an_error() {
    let world = nine_to_ten_world().await;

    let first = world.scan_at("09:02").await.unwrap();
    let second = world.scan_at("09:06").await.unwrap();

    assert!(!first.already_checked_in);
    assert!(second.already_checked_in);
    assert_eq!(second.status, AttendanceStatus::Present);

    // exactly one record, two scan rows (the audit trail accumulates)
    assert_eq!(world.records().await.len(), 1);
    assert_eq!(world.scans().await.len(), 2);
    assert!(matches!(
        world.notifier.events().as_slice(),
        [
            AttendanceEvent::ScanIngested(_),
            AttendanceEvent::ScanDuplicate(_)
        ]
    ));
}

#[tokio::test]
async fn late_then_present_upgrades() {
    let world = nine_to_ten_world().await;

    let late = world.scan_at("09:20").await.unwrap();
    assert_eq!(late.status, AttendanceStatus::Late);

    // a present-qualifying capture processed afterwards upgrades the record
    let present = world.scan_at("09:05").await.unwrap();
    assert_eq!(present.status, AttendanceStatus::Present);
    assert!(!present.already_checked_in);

    let records = world.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, AttendanceStatus::Present);
}

#[tokio::test]
async fn present_then_late_never_downgrades() {
    let world = nine_to_ten_world().await;

    world.scan_at("09:05").await.unwrap();
    let second = world.scan_at("09:20").await.unwrap();

    assert!(second.already_checked_in);
    assert_eq!(second.status, AttendanceStatus::Present);
    assert_eq!(world.records().await[0].status, AttendanceStatus::Present);
}

#[tokio::test]
async fn late_then_late_is_a_duplicate() {
    let world = nine_to_ten_world().await;

    world.scan_at("09:20").await.unwrap();
    let second = world.scan_at("09:25").await.unwrap();

    assert!(second.already_checked_in);
    assert_eq!(second.status, AttendanceStatus::Late);
}

#[tokio::test]
async fn absent_record_is_overwritten_by_a_scan() {
    let world = nine_to_ten_world().await;
    let records_before = world.records().await;
    assert!(records_before.is_empty());

    let student = seed_student(&world.db, "u04599999", "Sipho Dlamini").await;
    let session = db::models::class_session::Entity::find()
        .one(&world.db)
        .await
        .unwrap()
        .unwrap();
    seed_record(&world.db, session.id, student.id, AttendanceStatus::Absent).await;

    let outcome = world.scan_student_at("u04599999", "09:20").await.unwrap();

    assert_eq!(outcome.status, AttendanceStatus::Late);
    assert!(!outcome.already_checked_in);
}

#[tokio::test]
async fn earliest_start_wins_when_two_sessions_share_the_date() {
    let db = setup_test_db().await;
    let date = today_local();
    let morning = seed_course(&db, "CS301", "CS", 3, 5).await;
    let other = seed_course(&db, "CS305", "CS", 3, 5).await;
    let early = seed_session(&db, &morning, &date, "08:00", "12:00", SessionStatus::Live).await;
    seed_session(&db, &other, &date, "09:00", "10:00", SessionStatus::Scheduled).await;
    seed_student(&db, "u04512345", "Thandi Mokoena").await;
    seed_device(&db, "scanner-key-1").await;

    let outcome = ScanService::ingest(
        &db,
        &RecordingNotifier::default(),
        &AttendancePolicy::default(),
        ScanRequest {
            api_key: "scanner-key-1".into(),
            registration_no: "u04512345".into(),
            captured_at: capture_at(&date, "08:30"),
            meta: None,
        },
    )
    .await
    .unwrap();

    assert_eq!(outcome.session.id, early.id);
}

#[tokio::test]
async fn concurrent_scans_for_one_student_settle_on_one_record() {
    // A file-backed store so the tasks race over real pooled connections;
    // `sqlite::memory:` would give every pooled connection its own database.
    let path = std::env::temp_dir().join(format!("rollcall-race-{}.sqlite", std::process::id()));
    let _ = std::fs::remove_file(&path);
    let db = db::connect_to(path.to_str().unwrap(), Duration::from_secs(5))
        .await
        .unwrap();
    Migrator::up(&db, None).await.unwrap();

    let date = today_local();
    let course = seed_course(&db, "CS301", "CS", 3, 5).await;
    seed_session(&db, &course, &date, "09:00", "10:00", SessionStatus::Live).await;
    seed_student(&db, "u04512345", "Thandi Mokoena").await;
    seed_device(&db, "scanner-key-1").await;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let db = db.clone();
        let date = date.clone();
        tasks.push(tokio::spawn(async move {
            ScanService::ingest(
                &db,
                &NullNotifier,
                &AttendancePolicy::default(),
                ScanRequest {
                    api_key: "scanner-key-1".into(),
                    registration_no: "u04512345".into(),
                    captured_at: capture_at(&date, "09:05"),
                    meta: None,
                },
            )
            .await
        }));
    }

    // Every racer must come back Ok: losers of the record insert are
    // resolved against the row the winner created, not surfaced as errors.
    let mut first_check_ins = 0;
    for task in tasks {
        let outcome = task.await.unwrap().unwrap();
        assert_eq!(outcome.status, AttendanceStatus::Present);
        if !outcome.already_checked_in {
            first_check_ins += 1;
        }
    }
    assert_eq!(first_check_ins, 1);

    let records = attendance_record::Entity::find().all(&db).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, AttendanceStatus::Present);
    // the audit trail keeps every scan regardless of who won
    assert_eq!(scan::Entity::find().all(&db).await.unwrap().len(), 8);

    drop(db);
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn policy_knobs_flow_from_the_environment() {
    std::env::set_var("DATABASE_PATH", "data/rollcall-test.sqlite");
    std::env::set_var("GRACE_MINUTES", "3");
    std::env::set_var("END_TOLERANCE_MINUTES", "1");
    common::config::AppConfig::init();

    let policy = AttendancePolicy::from_config();
    assert_eq!(policy.grace_minutes, 3);
    assert_eq!(policy.end_tolerance_minutes, 1);

    // 09:05 is present under the defaults but late under the 3 minute grace
    let mut world = nine_to_ten_world().await;
    world.policy = policy;
    let outcome = world.scan_at("09:05").await.unwrap();
    assert_eq!(outcome.status, AttendanceStatus::Late);
}

#[tokio::test]
async fn scan_meta_is_preserved_on_the_audit_row() {
    let world = nine_to_ten_world().await;

    ScanService::ingest(
        &world.db,
        &world.notifier,
        &world.policy,
        ScanRequest {
            api_key: "scanner-key-1".into(),
            registration_no: "u04512345".into(),
            captured_at: capture_at(&world.date, "09:05"),
            meta: Some(serde_json::json!({ "firmware": "2.4.1" })),
        },
    )
    .await
    .unwrap();

    let scans = world.scans().await;
    assert_eq!(scans.len(), 1);
    assert_eq!(scans[0].meta["firmware"], "2.4.1");
    assert_eq!(scans[0].raw_code, "u04512345");
    assert!(scans[0].session_id.is_some());
    assert!(scans[0].captured_at <= Utc::now());
}
