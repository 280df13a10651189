use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};
use utoipa::ToSchema;

use crate::model::attendance::AttendanceField;
use crate::model::break_interval::{BreakInterval, Span};
use crate::model::patch::Patch;
use crate::store::AttendanceRef;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProposalKind {
    /// The target row does not exist yet.
    Create,
    Update,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProposalStatus {
    Pending,
    Approved,
}

/// A correction (or creation) request for one day's attendance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AttendanceProposal {
    pub id: u64,
    pub employee_id: u64,
    /// `None` until the attendance row exists.
    pub attendance_id: Option<u64>,
    pub target_day: NaiveDate,
    pub kind: ProposalKind,
    pub status: ProposalStatus,
    pub proposed_clock_in: Option<NaiveDateTime>,
    pub proposed_clock_out: Option<NaiveDateTime>,
    /// Absent when the proposal leaves the notes alone, `null` when it clears them.
    #[serde(skip_serializing_if = "Patch::is_keep")]
    #[schema(value_type = Option<String>)]
    pub notes: Patch<String>,
    /// Breaks to create alongside the attendance. Only used by `create`.
    pub break_payload: Vec<Span>,
    pub submitted_by: u64,
    pub created_at: NaiveDateTime,
}

impl AttendanceProposal {
    pub fn is_pending(&self) -> bool {
        self.status == ProposalStatus::Pending
    }

    /// Attendance fields this proposal sets or clears.
    pub fn touched_fields(&self) -> BTreeSet<AttendanceField> {
        let mut fields = BTreeSet::new();
        if self.proposed_clock_in.is_some() {
            fields.insert(AttendanceField::ClockIn);
        }
        if self.proposed_clock_out.is_some() {
            fields.insert(AttendanceField::ClockOut);
        }
        if !self.notes.is_keep() {
            fields.insert(AttendanceField::Notes);
        }
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttendanceProposal {
    pub employee_id: u64,
    pub attendance: Option<AttendanceRef>,
    pub target_day: NaiveDate,
    pub kind: ProposalKind,
    pub status: ProposalStatus,
    pub proposed_clock_in: Option<NaiveDateTime>,
    pub proposed_clock_out: Option<NaiveDateTime>,
    pub notes: Patch<String>,
    pub break_payload: Vec<Span>,
    pub submitted_by: u64,
    pub created_at: NaiveDateTime,
}

/// A correction for a single break interval, or a request for a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct BreakProposal {
    pub id: u64,
    pub employee_id: u64,
    /// `None` asks for a new interval.
    pub break_id: Option<u64>,
    pub attendance_id: Option<u64>,
    pub target_day: NaiveDate,
    pub status: ProposalStatus,
    pub proposed_start: NaiveDateTime,
    pub proposed_end: Option<NaiveDateTime>,
    pub submitted_by: u64,
    pub created_at: NaiveDateTime,
}

/// How a break proposal reaches the attendance it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakOwner {
    /// Through the interval it corrects.
    Interval { break_id: u64, attendance_id: u64 },
    /// A new interval: through its own link, or the (employee, day) row.
    Day { attendance_id: Option<u64> },
    /// The interval it corrects no longer exists.
    Dangling { break_id: u64 },
}

impl BreakProposal {
    pub fn is_pending(&self) -> bool {
        self.status == ProposalStatus::Pending
    }

    pub fn kind(&self) -> ProposalKind {
        if self.break_id.is_some() {
            ProposalKind::Update
        } else {
            ProposalKind::Create
        }
    }

    pub fn span(&self) -> Span {
        Span {
            start: self.proposed_start,
            end: self.proposed_end,
        }
    }

    /// Resolves the owner against the intervals currently stored for the day.
    pub fn owner(&self, breaks: &[BreakInterval]) -> BreakOwner {
        match self.break_id {
            Some(break_id) => breaks
                .iter()
                .find(|b| b.id == break_id)
                .map(|b| BreakOwner::Interval {
                    break_id,
                    attendance_id: b.attendance_id,
                })
                .unwrap_or(BreakOwner::Dangling { break_id }),
            None => BreakOwner::Day {
                attendance_id: self.attendance_id,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBreakProposal {
    pub employee_id: u64,
    pub break_id: Option<u64>,
    pub attendance_id: Option<u64>,
    pub target_day: NaiveDate,
    pub status: ProposalStatus,
    pub proposed_start: NaiveDateTime,
    pub proposed_end: Option<NaiveDateTime>,
    pub submitted_by: u64,
    pub created_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn break_proposal(break_id: Option<u64>, attendance_id: Option<u64>) -> BreakProposal {
        BreakProposal {
            id: 1,
            employee_id: 7,
            break_id,
            attendance_id,
            target_day: at(0, 0).date(),
            status: ProposalStatus::Pending,
            proposed_start: at(12, 0),
            proposed_end: Some(at(13, 0)),
            submitted_by: 70,
            created_at: at(19, 0),
        }
    }

    #[test]
    fn owner_resolves_through_the_interval_first() {
        let stored = [BreakInterval {
            id: 11,
            attendance_id: 3,
            start: at(12, 0),
            end: None,
        }];

        assert_eq!(
            break_proposal(Some(11), None).owner(&stored),
            BreakOwner::Interval {
                break_id: 11,
                attendance_id: 3
            }
        );
        assert_eq!(
            break_proposal(Some(12), Some(3)).owner(&stored),
            BreakOwner::Dangling { break_id: 12 }
        );
        assert_eq!(
            break_proposal(None, Some(3)).owner(&stored),
            BreakOwner::Day {
                attendance_id: Some(3)
            }
        );
    }

    #[test]
    fn proposal_json_tells_untouched_notes_from_cleared_ones() {
        let mut proposal = AttendanceProposal {
            id: 40,
            employee_id: 7,
            attendance_id: Some(1),
            target_day: at(0, 0).date(),
            kind: ProposalKind::Update,
            status: ProposalStatus::Pending,
            proposed_clock_in: Some(at(8, 30)),
            proposed_clock_out: None,
            notes: Patch::Keep,
            break_payload: Vec::new(),
            submitted_by: 70,
            created_at: at(19, 0),
        };
        let json = serde_json::to_value(&proposal).unwrap();
        assert!(json.get("notes").is_none());

        proposal.notes = Patch::Clear;
        let json = serde_json::to_value(&proposal).unwrap();
        assert_eq!(json.get("notes"), Some(&serde_json::Value::Null));

        proposal.notes = Patch::Set("late train".to_string());
        let json = serde_json::to_value(&proposal).unwrap();
        assert_eq!(json["notes"], "late train");
    }

    #[test]
    fn kind_follows_the_break_reference() {
        assert_eq!(break_proposal(None, None).kind(), ProposalKind::Create);
        assert_eq!(break_proposal(Some(1), None).kind(), ProposalKind::Update);
    }
}
