use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AttendanceError, AttendanceResult, FieldError};
use crate::model::{
    Actor, AttendanceProposal, BreakInterval, BreakProposal, NewAttendanceProposal,
    NewBreakProposal, Patch, ProposalKind, ProposalStatus, Span,
};
use crate::service::AttendanceService;
use crate::store::{AttendanceRef, Change, Changeset, DaySnapshot, Store};

/// What an employee wants a day to look like. Omitted fields stay as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[schema(example = json!({
    "clock_in": "2026-01-05T08:30:00",
    "notes": "Forgot to clock in",
    "breaks": [{"break_id": 12, "start": "2026-01-05T12:00:00", "end": "2026-01-05T12:45:00"}]
}))]
pub struct AttendanceCorrection {
    pub clock_in: Option<NaiveDateTime>,
    pub clock_out: Option<NaiveDateTime>,
    /// Missing keeps the notes, `null` clears them.
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub notes: Patch<String>,
    #[serde(default)]
    pub breaks: Vec<BreakCorrection>,
}

impl AttendanceCorrection {
    fn is_empty(&self) -> bool {
        self.clock_in.is_none()
            && self.clock_out.is_none()
            && self.notes.is_keep()
            && self.breaks.is_empty()
    }

    fn touches_attendance(&self) -> bool {
        self.clock_in.is_some() || self.clock_out.is_some() || !self.notes.is_keep()
    }
}

/// A corrected break. Without `break_id` it asks for a new interval.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, ToSchema)]
pub struct BreakCorrection {
    pub break_id: Option<u64>,
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
}

impl BreakCorrection {
    pub fn span(&self) -> Span {
        Span {
            start: self.start,
            end: self.end,
        }
    }
}

/// Rows written by one correction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CorrectionReceipt {
    /// Absent when only breaks of an existing attendance were corrected.
    pub proposal: Option<AttendanceProposal>,
    pub break_proposals: Vec<BreakProposal>,
}

/// Clock-in/out bounds a break must fit in.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Window {
    pub(crate) clock_in: Option<NaiveDateTime>,
    pub(crate) clock_out: Option<NaiveDateTime>,
}

pub(crate) fn validate_break(
    prefix: &str,
    day: NaiveDate,
    correction: &BreakCorrection,
    window: Window,
    stored: &[BreakInterval],
    errors: &mut Vec<FieldError>,
) {
    let field = |name: &str| format!("{prefix}{name}");

    if let Some(id) = correction.break_id {
        if !stored.iter().any(|b| b.id == id) {
            errors.push(FieldError::new(field("break_id"), "refers to no break on this day"));
        }
    }
    if correction.start.date() != day {
        errors.push(FieldError::new(field("start"), format!("must fall on {day}")));
    }
    if window.clock_in.is_some_and(|clock_in| correction.start < clock_in) {
        errors.push(FieldError::new(field("start"), "must not precede clock-in"));
    }
    match (correction.end, window.clock_out) {
        (Some(end), _) if end <= correction.start => {
            errors.push(FieldError::new(field("end"), "must be after break start"));
        }
        (Some(end), Some(clock_out)) if end > clock_out => {
            errors.push(FieldError::new(field("end"), "must not be after clock-out"));
        }
        (None, Some(_)) => {
            errors.push(FieldError::new(field("end"), "is required once clocked out"));
        }
        _ => {}
    }
}

/// Checks a correction against the stored day. Times are compared on the
/// merged result, so correcting only clock-out is checked against the stored
/// clock-in.
pub fn validate_correction(
    snapshot: &DaySnapshot,
    correction: &AttendanceCorrection,
) -> AttendanceResult<()> {
    let mut errors = Vec::new();
    let day = snapshot.day;
    let stored = snapshot.attendance.as_ref();

    if correction.is_empty() {
        errors.push(FieldError::new("correction", "nothing to change"));
    }
    if stored.is_none() && correction.clock_in.is_none() {
        errors.push(FieldError::new("clock_in", "is required to create an attendance"));
    }
    if let Some(clock_in) = correction.clock_in {
        if clock_in.date() != day {
            errors.push(FieldError::new("clock_in", format!("must fall on {day}")));
        }
    }

    let window = Window {
        clock_in: correction.clock_in.or(stored.and_then(|a| a.clock_in)),
        clock_out: correction.clock_out.or(stored.and_then(|a| a.clock_out)),
    };
    if let (Some(clock_in), Some(clock_out)) = (window.clock_in, window.clock_out) {
        if clock_out <= clock_in {
            let field = if correction.clock_out.is_some() {
                "clock_out"
            } else {
                "clock_in"
            };
            errors.push(FieldError::new(field, "must be after clock-in"));
        }
    }

    for (i, b) in correction.breaks.iter().enumerate() {
        validate_break(&format!("breaks[{i}]."), day, b, window, &snapshot.breaks, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AttendanceError::ValidationFailed(errors))
    }
}

/// Builds the proposal rows for a validated correction. A day without an
/// attendance gets a `create` proposal carrying its breaks as payload.
pub fn plan_correction(
    snapshot: &DaySnapshot,
    correction: AttendanceCorrection,
    submitted_by: u64,
    now: NaiveDateTime,
) -> Changeset {
    let mut changes = Changeset::new();
    let employee_id = snapshot.employee_id;
    let day = snapshot.day;

    let Some(attendance) = &snapshot.attendance else {
        changes.push(Change::InsertAttendanceProposal(NewAttendanceProposal {
            employee_id,
            attendance: None,
            target_day: day,
            kind: ProposalKind::Create,
            status: ProposalStatus::Pending,
            proposed_clock_in: correction.clock_in,
            proposed_clock_out: correction.clock_out,
            notes: correction.notes,
            break_payload: correction.breaks.iter().map(BreakCorrection::span).collect(),
            submitted_by,
            created_at: now,
        }));
        return changes;
    };

    if correction.touches_attendance() {
        changes.push(Change::InsertAttendanceProposal(NewAttendanceProposal {
            employee_id,
            attendance: Some(AttendanceRef::Existing(attendance.id)),
            target_day: day,
            kind: ProposalKind::Update,
            status: ProposalStatus::Pending,
            proposed_clock_in: correction.clock_in,
            proposed_clock_out: correction.clock_out,
            notes: correction.notes,
            break_payload: Vec::new(),
            submitted_by,
            created_at: now,
        }));
    }
    for b in correction.breaks {
        changes.push(Change::InsertBreakProposal(NewBreakProposal {
            employee_id,
            break_id: b.break_id,
            attendance_id: Some(attendance.id),
            target_day: day,
            status: ProposalStatus::Pending,
            proposed_start: b.start,
            proposed_end: b.end,
            submitted_by,
            created_at: now,
        }));
    }
    changes
}

impl<S: Store> AttendanceService<S> {
    /// Files a correction for one of the actor's own days. Nothing changes on
    /// the attendance until a reviewer approves it.
    pub async fn submit_attendance_correction(
        &self,
        actor: &Actor,
        day: NaiveDate,
        correction: AttendanceCorrection,
    ) -> AttendanceResult<CorrectionReceipt> {
        let employee_id = actor.acting_employee()?;
        self.check_not_future(day)?;
        let _guard = self.locks.acquire(employee_id).await;

        let snapshot = self.store.load_day(employee_id, day).await?;
        if snapshot.has_pending() {
            return Err(AttendanceError::DuplicatePendingProposal { day });
        }
        validate_correction(&snapshot, &correction)?;

        let changes = plan_correction(&snapshot, correction, actor.user_id, self.now());
        let receipt = self.store.commit(changes).await?;

        let snapshot = self.store.load_day(employee_id, day).await?;
        let proposal = receipt
            .attendance_proposal_ids
            .first()
            .and_then(|id| snapshot.attendance_proposal(*id))
            .cloned();
        let break_proposals: Vec<BreakProposal> = receipt
            .break_proposal_ids
            .iter()
            .filter_map(|id| snapshot.break_proposal(*id).cloned())
            .collect();

        tracing::info!(
            employee_id,
            %day,
            proposal_id = proposal.as_ref().map(|p| p.id),
            break_proposals = break_proposals.len(),
            "Correction submitted"
        );
        Ok(CorrectionReceipt {
            proposal,
            break_proposals,
        })
    }

    /// Files a correction for a single break, or asks for a new one.
    pub async fn submit_break_correction(
        &self,
        actor: &Actor,
        day: NaiveDate,
        correction: BreakCorrection,
    ) -> AttendanceResult<BreakProposal> {
        let employee_id = actor.acting_employee()?;
        self.check_not_future(day)?;
        let _guard = self.locks.acquire(employee_id).await;

        let snapshot = self.store.load_day(employee_id, day).await?;
        if snapshot.has_pending() {
            return Err(AttendanceError::DuplicatePendingProposal { day });
        }

        // Breaks for a day with no attendance travel in that day's create
        // proposal instead.
        let Some(attendance) = snapshot.attendance.as_ref() else {
            return Err(AttendanceError::ValidationFailed(vec![FieldError::new(
                "date",
                "has no attendance; submit a correction for the day with its breaks",
            )]));
        };
        let window = Window {
            clock_in: attendance.clock_in,
            clock_out: attendance.clock_out,
        };
        let mut errors = Vec::new();
        validate_break("", day, &correction, window, &snapshot.breaks, &mut errors);
        if !errors.is_empty() {
            return Err(AttendanceError::ValidationFailed(errors));
        }

        let mut changes = Changeset::new();
        changes.push(Change::InsertBreakProposal(NewBreakProposal {
            employee_id,
            break_id: correction.break_id,
            attendance_id: Some(attendance.id),
            target_day: day,
            status: ProposalStatus::Pending,
            proposed_start: correction.start,
            proposed_end: correction.end,
            submitted_by: actor.user_id,
            created_at: self.now(),
        }));
        let receipt = self.store.commit(changes).await?;

        let id = receipt
            .break_proposal_ids
            .first()
            .copied()
            .ok_or_else(|| AttendanceError::not_found("break_proposal", "new"))?;
        let proposal = self
            .store
            .find_break_proposal(id)
            .await?
            .ok_or_else(|| AttendanceError::not_found("break_proposal", id))?;

        tracing::info!(employee_id, %day, proposal_id = id, "Break correction submitted");
        Ok(proposal)
    }

    fn check_not_future(&self, day: NaiveDate) -> AttendanceResult<()> {
        if day > self.today() {
            return Err(AttendanceError::ValidationFailed(vec![FieldError::new(
                "date",
                "cannot be in the future",
            )]));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attendance, AttendanceStatus};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn worked_day() -> DaySnapshot {
        let mut snapshot = DaySnapshot::empty(7, at(0, 0).date());
        snapshot.attendance = Some(Attendance {
            id: 1,
            employee_id: 7,
            work_date: at(0, 0).date(),
            clock_in: Some(at(9, 0)),
            clock_out: Some(at(18, 0)),
            status: AttendanceStatus::Completed,
            notes: None,
        });
        snapshot.breaks = vec![BreakInterval {
            id: 12,
            attendance_id: 1,
            start: at(12, 0),
            end: Some(at(13, 0)),
        }];
        snapshot
    }

    fn fields(result: AttendanceResult<()>) -> Vec<String> {
        match result {
            Err(AttendanceError::ValidationFailed(errors)) => {
                errors.into_iter().map(|e| e.field).collect()
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn clock_out_is_checked_against_the_stored_clock_in() {
        let correction = AttendanceCorrection {
            clock_out: Some(at(8, 0)),
            ..Default::default()
        };
        assert_eq!(fields(validate_correction(&worked_day(), &correction)), ["clock_out"]);
    }

    #[test]
    fn every_bad_field_is_reported() {
        let correction = AttendanceCorrection {
            clock_in: Some(at(9, 0) + chrono::Duration::days(1)),
            breaks: vec![
                BreakCorrection {
                    break_id: Some(99),
                    start: at(12, 0),
                    end: Some(at(11, 0)),
                },
                BreakCorrection {
                    break_id: None,
                    start: at(15, 0),
                    end: None,
                },
            ],
            ..Default::default()
        };
        assert_eq!(
            fields(validate_correction(&worked_day(), &correction)),
            [
                "clock_in",
                "clock_in",
                "breaks[0].break_id",
                "breaks[0].start",
                "breaks[0].end",
                "breaks[1].start",
                "breaks[1].end",
            ]
        );
    }

    #[test]
    fn empty_corrections_are_rejected() {
        assert_eq!(
            fields(validate_correction(&worked_day(), &AttendanceCorrection::default())),
            ["correction"]
        );
    }

    #[test]
    fn a_missing_day_needs_a_clock_in() {
        let empty = DaySnapshot::empty(7, at(0, 0).date());
        let correction = AttendanceCorrection {
            clock_out: Some(at(18, 0)),
            ..Default::default()
        };
        assert_eq!(fields(validate_correction(&empty, &correction)), ["clock_in"]);
    }

    #[test]
    fn missing_day_becomes_a_create_proposal_with_break_payload() {
        let empty = DaySnapshot::empty(7, at(0, 0).date());
        let correction = AttendanceCorrection {
            clock_in: Some(at(9, 0)),
            clock_out: Some(at(18, 0)),
            breaks: vec![BreakCorrection {
                break_id: None,
                start: at(12, 0),
                end: Some(at(13, 0)),
            }],
            ..Default::default()
        };
        validate_correction(&empty, &correction).unwrap();

        let changes = plan_correction(&empty, correction, 70, at(20, 0)).into_changes();
        assert_eq!(changes.len(), 1);
        match &changes[0] {
            Change::InsertAttendanceProposal(p) => {
                assert_eq!(p.kind, ProposalKind::Create);
                assert_eq!(p.attendance, None);
                assert_eq!(p.break_payload, [Span::closed(at(12, 0), at(13, 0))]);
            }
            other => panic!("unexpected change {other:?}"),
        }
    }

    #[test]
    fn break_only_corrections_skip_the_attendance_proposal() {
        let correction = AttendanceCorrection {
            breaks: vec![BreakCorrection {
                break_id: Some(12),
                start: at(12, 0),
                end: Some(at(12, 30)),
            }],
            ..Default::default()
        };
        let day = worked_day();
        validate_correction(&day, &correction).unwrap();

        let changes = plan_correction(&day, correction, 70, at(20, 0)).into_changes();
        assert!(matches!(
            changes.as_slice(),
            [Change::InsertBreakProposal(NewBreakProposal {
                break_id: Some(12),
                attendance_id: Some(1),
                ..
            })]
        ));
    }
}
