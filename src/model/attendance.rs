use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};
use utoipa::ToSchema;

use crate::model::break_interval::Span;

/// Persisted attendance status. `Absent` is never stored: it is the absence of a row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AttendanceStatus {
    Working,
    Break,
    Completed,
}

/// Where an employee stands for a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DayState {
    Absent,
    Working,
    OnBreak,
    Completed,
}

impl DayState {
    pub fn of(attendance: Option<&Attendance>) -> Self {
        match attendance.map(|a| a.status) {
            None => DayState::Absent,
            Some(AttendanceStatus::Working) => DayState::Working,
            Some(AttendanceStatus::Break) => DayState::OnBreak,
            Some(AttendanceStatus::Completed) => DayState::Completed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "employee_id": 1000,
    "work_date": "2026-01-05",
    "clock_in": "2026-01-05T09:00:00",
    "clock_out": "2026-01-05T18:00:00",
    "status": "completed",
    "notes": null
}))]
pub struct Attendance {
    pub id: u64,
    pub employee_id: u64,
    /// Day key, taken from the clock-in date.
    pub work_date: NaiveDate,
    pub clock_in: Option<NaiveDateTime>,
    pub clock_out: Option<NaiveDateTime>,
    pub status: AttendanceStatus,
    pub notes: Option<String>,
}

/// Attendance fields a correction can touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttendanceField {
    ClockIn,
    ClockOut,
    Notes,
}

impl Attendance {
    /// Fields whose values differ between two versions of the same row.
    pub fn changed_fields(&self, after: &Attendance) -> BTreeSet<AttendanceField> {
        let mut fields = BTreeSet::new();
        if self.clock_in != after.clock_in {
            fields.insert(AttendanceField::ClockIn);
        }
        if self.clock_out != after.clock_out {
            fields.insert(AttendanceField::ClockOut);
        }
        if self.notes != after.notes {
            fields.insert(AttendanceField::Notes);
        }
        fields
    }
}

/// Values for a row that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttendance {
    pub employee_id: u64,
    pub work_date: NaiveDate,
    pub clock_in: Option<NaiveDateTime>,
    pub clock_out: Option<NaiveDateTime>,
    pub status: AttendanceStatus,
    pub notes: Option<String>,
}

/// Status implied by a set of times: a clock-out completes the day, an open
/// break means the employee is on break.
pub fn derive_status(clock_out: Option<NaiveDateTime>, breaks: &[Span]) -> AttendanceStatus {
    if clock_out.is_some() {
        AttendanceStatus::Completed
    } else if breaks.iter().any(|b| b.end.is_none()) {
        AttendanceStatus::Break
    } else {
        AttendanceStatus::Working
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn status_round_trips_through_its_column_text() {
        assert_eq!(AttendanceStatus::Break.as_ref(), "break");
        assert_eq!(
            AttendanceStatus::from_str("completed").unwrap(),
            AttendanceStatus::Completed
        );
        assert!(AttendanceStatus::from_str("absent").is_err());
    }

    #[test]
    fn derive_status_prefers_clock_out_over_open_break() {
        let open = [Span::open(at(12, 0))];
        assert_eq!(derive_status(None, &[]), AttendanceStatus::Working);
        assert_eq!(derive_status(None, &open), AttendanceStatus::Break);
        assert_eq!(
            derive_status(Some(at(18, 0)), &open),
            AttendanceStatus::Completed
        );
    }

    #[test]
    fn day_state_follows_row_status() {
        assert_eq!(DayState::of(None), DayState::Absent);
        let row = Attendance {
            id: 1,
            employee_id: 7,
            work_date: at(9, 0).date(),
            clock_in: Some(at(9, 0)),
            clock_out: None,
            status: AttendanceStatus::Break,
            notes: None,
        };
        assert_eq!(DayState::of(Some(&row)), DayState::OnBreak);
    }
}
