//! The session lifecycle state machine.
//!
//! A recurring tick walks every session in {scheduled, live} and moves it
//! along scheduled -> live -> closed based on wall-clock time. The loop
//! shares no lock with scan ingestion; both sides rely on the store's
//! conditional updates for correctness.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Local, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::events::{AttendanceEvent, Notifier};
use db::models::class_session::{self, SessionStatus};

pub const DEFAULT_TICK_SECONDS: u64 = 30;
pub const DEFAULT_EARLY_ACCESS_MINUTES: i64 = 15;

/// Drives session status transitions on a fixed interval.
///
/// Explicitly constructed and injectable; `start` spawns the loop and
/// `stop` shuts it down. A tick is idempotent and safe to abort mid-batch;
/// sessions not yet visited are picked up on the next tick.
pub struct SessionLifecycleManager {
    db: DatabaseConnection,
    notifier: Arc<dyn Notifier>,
    tick_interval: Duration,
    early_access: ChronoDuration,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl SessionLifecycleManager {
    pub fn new(
        db: DatabaseConnection,
        notifier: Arc<dyn Notifier>,
        tick_interval: Duration,
        early_access_minutes: i64,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            db,
            notifier,
            tick_interval,
            early_access: ChronoDuration::minutes(early_access_minutes),
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub fn with_defaults(db: DatabaseConnection, notifier: Arc<dyn Notifier>) -> Self {
        Self::new(
            db,
            notifier,
            Duration::from_secs(DEFAULT_TICK_SECONDS),
            DEFAULT_EARLY_ACCESS_MINUTES,
        )
    }

    /// Spawns the periodic loop. Returns the task handle; the loop exits
    /// after `stop` is called.
    pub fn start(&self) -> JoinHandle<()> {
        let db = self.db.clone();
        let notifier = Arc::clone(&self.notifier);
        let tick_interval = self.tick_interval;
        let early_access = self.early_access;
        let mut shutdown = self.shutdown_rx.clone();

        tokio::spawn(async move {
            log::info!(
                "session lifecycle loop started (tick every {:?})",
                tick_interval
            );
            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = tokio::time::sleep(tick_interval) => {
                        Self::run_tick(&db, notifier.as_ref(), early_access).await;
                    }
                }
            }
            log::info!("session lifecycle loop stopped");
        })
    }

    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Runs one tick against this manager's connection. Exposed so a tick
    /// can be driven directly, e.g. from tests or an admin endpoint.
    pub async fn tick(&self) {
        Self::run_tick(&self.db, self.notifier.as_ref(), self.early_access).await;
    }

    async fn run_tick(db: &DatabaseConnection, notifier: &dyn Notifier, early_access: ChronoDuration) {
        let sessions = match class_session::Entity::find()
            .filter(
                class_session::Column::Status
                    .is_in([SessionStatus::Scheduled, SessionStatus::Live]),
            )
            .order_by_asc(class_session::Column::Id)
            .all(db)
            .await
        {
            Ok(sessions) => sessions,
            Err(err) => {
                log::error!("lifecycle tick: failed to load sessions: {err}");
                return;
            }
        };

        let now = Local::now().naive_local();

        for session in sessions {
            let Some((start_at, end_at)) = session_bounds(&session) else {
                log::warn!(
                    "session {} has malformed date or time fields, skipping",
                    session.id
                );
                continue;
            };

            // Ended wins: a session can qualify for both transitions at
            // once, but once its end has passed it only ever closes.
            let result = if now >= end_at {
                Self::close(db, notifier, &session).await
            } else if session.status == SessionStatus::Scheduled && now >= start_at - early_access
            {
                Self::promote(db, notifier, &session).await
            } else {
                Ok(())
            };

            // One bad session must not block the rest of the batch.
            if let Err(err) = result {
                log::error!("lifecycle tick: session {}: {err}", session.id);
            }
        }
    }

    /// `{scheduled, live} -> closed`, as a conditional update on the
    /// current status so a concurrent transition cannot be overwritten.
    async fn close(
        db: &DatabaseConnection,
        notifier: &dyn Notifier,
        session: &class_session::Model,
    ) -> Result<(), DbErr> {
        let result = class_session::Entity::update_many()
            .col_expr(
                class_session::Column::Status,
                Expr::value(SessionStatus::Closed),
            )
            .col_expr(class_session::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(class_session::Column::Id.eq(session.id))
            .filter(
                class_session::Column::Status
                    .is_in([SessionStatus::Scheduled, SessionStatus::Live]),
            )
            .exec(db)
            .await?;

        if result.rows_affected > 0 {
            log::info!("session {} closed", session.id);
            notifier.publish(AttendanceEvent::SessionStatusChanged {
                session_id: session.id,
                course_id: session.course_id,
                status: SessionStatus::Closed,
            });
        }
        Ok(())
    }

    /// `scheduled -> live`, guarded by the one-live-session-per-batch
    /// invariant. The batch count and the conditional write run inside one
    /// transaction so two candidates for the same batch cannot both pass
    /// the check before either commits.
    async fn promote(
        db: &DatabaseConnection,
        notifier: &dyn Notifier,
        session: &class_session::Model,
    ) -> Result<(), DbErr> {
        let txn = db.begin().await?;

        let live_in_batch = class_session::Entity::find()
            .filter(class_session::Column::Status.eq(SessionStatus::Live))
            .filter(class_session::Column::Department.eq(session.department.as_str()))
            .filter(class_session::Column::Year.eq(session.year))
            .filter(class_session::Column::Semester.eq(session.semester))
            .count(&txn)
            .await?;

        if live_in_batch > 0 {
            txn.rollback().await?;
            log::info!(
                "session {} held back: batch {}/{}/{} already has a live session",
                session.id,
                session.department,
                session.year,
                session.semester
            );
            return Ok(());
        }

        let result = class_session::Entity::update_many()
            .col_expr(
                class_session::Column::Status,
                Expr::value(SessionStatus::Live),
            )
            .col_expr(class_session::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(class_session::Column::Id.eq(session.id))
            .filter(class_session::Column::Status.eq(SessionStatus::Scheduled))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        if result.rows_affected > 0 {
            log::info!("session {} live", session.id);
            notifier.publish(AttendanceEvent::SessionStatusChanged {
                session_id: session.id,
                course_id: session.course_id,
                status: SessionStatus::Live,
            });
        }
        Ok(())
    }
}

/// Absolute (naive local) start and end instants of a session, with the
/// +24h end correction when the session crosses midnight.
fn session_bounds(session: &class_session::Model) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let date = NaiveDate::parse_from_str(&session.session_date, "%Y-%m-%d").ok()?;
    let start = NaiveTime::parse_from_str(&session.start_time, "%H:%M").ok()?;
    let end = NaiveTime::parse_from_str(&session.end_time, "%H:%M").ok()?;

    let start_at = date.and_time(start);
    let mut end_at = date.and_time(end);
    if end_at <= start_at {
        end_at += ChronoDuration::days(1);
    }
    Some((start_at, end_at))
}
