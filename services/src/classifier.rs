//! Time-window classification for attendance scans.
//!
//! All arithmetic is over minutes-since-midnight integers in the local
//! reference frame of the session's start/end strings. No timezone handling
//! happens here; callers produce the time-of-day value.

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Outcome of classifying a scan time against a session window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Present,
    Late,
    Rejected(&'static str),
}

/// Scan acceptance policy. Defaults match the scanner rollout values.
#[derive(Debug, Clone)]
pub struct AttendancePolicy {
    pub grace_minutes: u32,
    pub end_tolerance_minutes: u32,
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        Self {
            grace_minutes: 10,
            end_tolerance_minutes: 5,
        }
    }
}

impl AttendancePolicy {
    pub fn from_config() -> Self {
        let config = common::config::AppConfig::get();
        Self {
            grace_minutes: config.grace_minutes,
            end_tolerance_minutes: config.end_tolerance_minutes,
        }
    }
}

/// Maps a clock time to a verdict for a session spanning `[start, end]`.
///
/// The end tolerance absorbs clock skew and capture latency at the boundary;
/// it is folded into the effective end before classification rather than
/// checked separately. Assumes `start <= end`; a session crossing midnight
/// must have [`MINUTES_PER_DAY`] added to its end by the caller first.
pub fn classify(now: u32, start: u32, end: u32, grace: u32, end_tolerance: u32) -> Verdict {
    let grace_deadline = start + grace;
    let effective_end = end + end_tolerance;

    if now <= grace_deadline {
        Verdict::Present
    } else if now <= effective_end {
        Verdict::Late
    } else {
        Verdict::Rejected("session has ended")
    }
}

/// Parses an `"HH:MM"` string into minutes since midnight.
pub fn parse_hhmm(value: &str) -> Option<u32> {
    let (h, m) = value.split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    if h > 23 || m > 59 {
        return None;
    }
    Some(h * 60 + m)
}
