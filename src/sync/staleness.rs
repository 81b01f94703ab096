use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::AppError;

/// Where an entity stands relative to its last successful local sync.
///
/// `Synced` falls back to `Unsynced` whenever Canvas reports a change newer
/// than the recorded `saved_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Unsynced,
    Synced,
}

impl SyncState {
    pub fn of(saved_at: Option<NaiveDateTime>, updated_at: NaiveDateTime) -> Self {
        match saved_at {
            Some(saved) if saved >= updated_at => SyncState::Synced,
            _ => SyncState::Unsynced,
        }
    }
}

pub fn is_stale(saved_at: Option<NaiveDateTime>, updated_at: NaiveDateTime) -> bool {
    SyncState::of(saved_at, updated_at) == SyncState::Unsynced
}

/// The marker a re-observed record should keep: the previous one while it
/// still covers `updated_at`, nothing once the remote side moved past it.
pub fn carry_saved_at(
    previous: Option<NaiveDateTime>,
    updated_at: NaiveDateTime,
) -> Option<NaiveDateTime> {
    previous.filter(|saved| *saved >= updated_at)
}

/// Current instant in the same naive UTC representation as stored timestamps.
pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Normalize a Canvas timestamp to a naive instant.
///
/// A trailing `Z` is stripped as-is; an explicit offset is folded into UTC
/// first so every stored instant shares one representation.
pub fn naive_timestamp(raw: &str) -> Result<NaiveDateTime, AppError> {
    let raw = raw.trim();
    if let Some(stripped) = raw.strip_suffix('Z') {
        return parse_naive(stripped).ok_or_else(|| invalid(raw));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.naive_utc());
    }
    parse_naive(raw).ok_or_else(|| invalid(raw))
}

fn parse_naive(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

fn invalid(raw: &str) -> AppError {
    AppError::Parse(format!("invalid timestamp: {}", raw))
}
