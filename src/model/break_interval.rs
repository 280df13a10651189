use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A break interval owned by an attendance row. `end == None` means the break
/// is still running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BreakInterval {
    pub id: u64,
    pub attendance_id: u64,
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
}

impl BreakInterval {
    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    pub fn span(&self) -> Span {
        Span {
            start: self.start,
            end: self.end,
        }
    }
}

/// A start/end pair not bound to a stored row (break payloads, proposals,
/// admin edits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"start": "2026-01-05T12:00:00", "end": "2026-01-05T13:00:00"}))]
pub struct Span {
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
}

impl Span {
    pub fn closed(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    pub fn open(start: NaiveDateTime) -> Self {
        Self { start, end: None }
    }
}
