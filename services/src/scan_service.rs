//! The scan-to-attendance decision pipeline.
//!
//! A scan travels: device resolution -> liveness refresh -> student
//! resolution -> session resolution for the capture date -> time-window
//! classification -> scan persistence -> monotonic attendance merge ->
//! event emission. Each step gates the next; all store calls are await
//! points and no in-process lock is held across any of them.

use chrono::{DateTime, Local, Timelike, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Serialize;
use serde_json::json;

use db::models::{
    attendance_record::{self, AttendanceStatus},
    class_session::{self, SessionStatus},
    course,
    device::{self, DeviceStatus},
    scan, student,
};

use crate::classifier::{self, AttendancePolicy, Verdict};
use crate::error::IngestError;
use crate::events::{AttendanceEvent, Notifier, ScanOutcomePayload};

/// One scan as presented by a device.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub api_key: String,
    pub registration_no: String,
    pub captured_at: DateTime<Utc>,
    pub meta: Option<serde_json::Value>,
}

/// Device-free projection of the student, for results and events.
#[derive(Debug, Clone, Serialize)]
pub struct StudentSummary {
    pub id: i64,
    pub name: String,
    pub registration_no: String,
}

/// Device-free projection of the matched session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: i64,
    pub course_id: i64,
    pub course_code: String,
    pub session_date: String,
    pub start_time: String,
    pub end_time: String,
    pub room: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub student: StudentSummary,
    pub session: SessionSummary,
    pub status: AttendanceStatus,
    pub check_in_at: Option<DateTime<Utc>>,
    /// True when the merge left an existing record unchanged.
    pub already_checked_in: bool,
}

pub struct ScanService;

impl ScanService {
    /// Runs the full pipeline and emits the outcome event.
    ///
    /// Failure notification is a required side effect: every error emits a
    /// `scan.error` event before propagating. Notifier delivery itself is
    /// fire-and-forget and cannot fail the scan.
    pub async fn ingest(
        db: &DatabaseConnection,
        notifier: &dyn Notifier,
        policy: &AttendancePolicy,
        req: ScanRequest,
    ) -> Result<IngestOutcome, IngestError> {
        match Self::ingest_inner(db, policy, &req).await {
            Ok(outcome) => {
                let payload = ScanOutcomePayload {
                    student_id: outcome.student.id,
                    student_name: outcome.student.name.clone(),
                    registration_no: outcome.student.registration_no.clone(),
                    session_id: outcome.session.id,
                    course_code: outcome.session.course_code.clone(),
                    status: outcome.status.clone(),
                    check_in_at: outcome.check_in_at,
                };
                let event = if outcome.already_checked_in {
                    AttendanceEvent::ScanDuplicate(payload)
                } else {
                    AttendanceEvent::ScanIngested(payload)
                };
                notifier.publish(event);
                Ok(outcome)
            }
            Err(err) => {
                notifier.publish(AttendanceEvent::ScanError {
                    registration_no: req.registration_no.clone(),
                    error: err.to_string(),
                    timestamp: Utc::now(),
                });
                Err(err)
            }
        }
    }

    async fn ingest_inner(
        db: &DatabaseConnection,
        policy: &AttendancePolicy,
        req: &ScanRequest,
    ) -> Result<IngestOutcome, IngestError> {
        let device = device::Entity::find()
            .filter(device::Column::ApiKey.eq(req.api_key.as_str()))
            .one(db)
            .await?
            .ok_or(IngestError::InvalidDevice)?;

        // Liveness tracking is independent of scan validity: the refresh
        // lands before the rest of the request is validated, and stays even
        // if a later step fails.
        let mut liveness: device::ActiveModel = device.clone().into();
        liveness.status = Set(DeviceStatus::Online);
        liveness.last_seen_at = Set(Some(Utc::now()));
        liveness.updated_at = Set(Utc::now());
        liveness.update(db).await?;

        let student = student::Entity::find()
            .filter(student::Column::RegistrationNo.eq(req.registration_no.as_str()))
            .one(db)
            .await?
            .ok_or_else(|| IngestError::StudentNotFound(req.registration_no.clone()))?;

        // Session dates are local calendar strings, so the capture date must
        // be derived in the local frame, not UTC.
        let local = req.captured_at.with_timezone(&Local);
        let capture_date = local.format("%Y-%m-%d").to_string();

        // Tie-break when several open sessions share the date: earliest
        // start time, then lowest course id.
        let session = class_session::Entity::find()
            .filter(class_session::Column::SessionDate.eq(capture_date.as_str()))
            .filter(
                class_session::Column::Status
                    .is_in([SessionStatus::Live, SessionStatus::Scheduled]),
            )
            .order_by_asc(class_session::Column::StartTime)
            .order_by_asc(class_session::Column::CourseId)
            .one(db)
            .await?
            .ok_or_else(|| IngestError::NoActiveSession(capture_date.clone()))?;

        let now_minutes = local.hour() * 60 + local.minute();
        let start = classifier::parse_hhmm(&session.start_time)
            .ok_or_else(|| malformed_time(&session, &session.start_time))?;
        let mut end = classifier::parse_hhmm(&session.end_time)
            .ok_or_else(|| malformed_time(&session, &session.end_time))?;
        if end < start {
            end += classifier::MINUTES_PER_DAY;
        }

        let computed = match classifier::classify(
            now_minutes,
            start,
            end,
            policy.grace_minutes,
            policy.end_tolerance_minutes,
        ) {
            Verdict::Present => AttendanceStatus::Present,
            Verdict::Late => AttendanceStatus::Late,
            Verdict::Rejected(_) => return Err(IngestError::SessionEnded),
        };

        // The scan row is provenance and is written no matter how the merge
        // below turns out.
        let scan_row = scan::ActiveModel {
            device_id: Set(device.id),
            raw_code: Set(req.registration_no.clone()),
            captured_at: Set(req.captured_at),
            meta: Set(req.meta.clone().unwrap_or_else(|| json!({}))),
            session_id: Set(Some(session.id)),
            course_id: Set(Some(session.course_id)),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        let existing = attendance_record::Entity::find_by_id((session.id, student.id))
            .one(db)
            .await?;

        let (status, check_in_at, already_checked_in) = match existing {
            Some(record) => {
                Self::merge_existing(db, record, computed, req.captured_at, scan_row.id).await?
            }
            None => {
                let fresh = attendance_record::ActiveModel {
                    session_id: Set(session.id),
                    student_id: Set(student.id),
                    status: Set(computed.clone()),
                    check_in_at: Set(Some(req.captured_at)),
                    scan_id: Set(Some(scan_row.id)),
                    notes: Set(None),
                    created_at: Set(Utc::now()),
                    updated_at: Set(Utc::now()),
                };
                match fresh.insert(db).await {
                    Ok(record) => (record.status, record.check_in_at, false),
                    Err(insert_err) => {
                        // Lost a race against a concurrent scan for the same
                        // pair; the composite key rejected us, so a row must
                        // exist now and the merge resolves as an update.
                        let record =
                            attendance_record::Entity::find_by_id((session.id, student.id))
                                .one(db)
                                .await?
                                .ok_or(IngestError::Db(insert_err))?;
                        Self::merge_existing(db, record, computed, req.captured_at, scan_row.id)
                            .await?
                    }
                }
            }
        };

        // Explicit read-then-join for the course; the store is not assumed
        // to support joins.
        let course = course::Entity::find_by_id(session.course_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                IngestError::Db(DbErr::RecordNotFound(format!(
                    "course {} referenced by session {}",
                    session.course_id, session.id
                )))
            })?;

        Ok(IngestOutcome {
            student: StudentSummary {
                id: student.id,
                name: student.name,
                registration_no: student.registration_no,
            },
            session: SessionSummary {
                id: session.id,
                course_id: session.course_id,
                course_code: course.code,
                session_date: session.session_date,
                start_time: session.start_time,
                end_time: session.end_time,
                room: session.room,
            },
            status,
            check_in_at,
            already_checked_in,
        })
    }

    /// Monotonic-upgrade merge: absent -> anything, late -> present.
    /// Anything else leaves the record untouched and flags a duplicate.
    async fn merge_existing(
        db: &DatabaseConnection,
        record: attendance_record::Model,
        computed: AttendanceStatus,
        captured_at: DateTime<Utc>,
        scan_id: i64,
    ) -> Result<(AttendanceStatus, Option<DateTime<Utc>>, bool), IngestError> {
        let upgrades = matches!(
            (&record.status, &computed),
            (AttendanceStatus::Absent, _) | (AttendanceStatus::Late, AttendanceStatus::Present)
        );

        if !upgrades {
            return Ok((record.status, record.check_in_at, true));
        }

        let mut active: attendance_record::ActiveModel = record.into();
        active.status = Set(computed);
        active.check_in_at = Set(Some(captured_at));
        active.scan_id = Set(Some(scan_id));
        active.updated_at = Set(Utc::now());
        let updated = active.update(db).await?;

        Ok((updated.status, updated.check_in_at, false))
    }
}

fn malformed_time(session: &class_session::Model, value: &str) -> IngestError {
    IngestError::Db(DbErr::Custom(format!(
        "session {} has malformed time {value:?}",
        session.id
    )))
}
