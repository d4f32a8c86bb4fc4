use sea_orm::DbErr;
use thiserror::Error;

/// Everything that can go wrong while turning a scan into an attendance
/// record. All variants are surfaced to the caller; none are swallowed.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unknown device api key")]
    InvalidDevice,

    #[error("no student found for registration number {0}")]
    StudentNotFound(String),

    #[error("no active session for {0}")]
    NoActiveSession(String),

    #[error("session has ended")]
    SessionEnded,

    #[error("database error: {0}")]
    Db(#[from] DbErr),
}
