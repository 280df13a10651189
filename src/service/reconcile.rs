//! Turning proposals into authoritative rows.
//!
//! Explicit approval applies one proposal (and, for attendance proposals, the
//! day's pending break proposals). A reviewer's direct edit wins over
//! everything pending for the day: those proposals are retired unapplied and
//! the edit itself is recorded as an approved proposal.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AttendanceError, AttendanceResult, FieldError};
use crate::model::attendance::derive_status;
use crate::model::{
    Actor, Attendance, AttendanceProposal, BreakInterval, BreakOwner, BreakProposal,
    NewAttendance, NewAttendanceProposal, Patch, ProposalKind, ProposalStatus, Span,
};
use crate::service::AttendanceService;
use crate::service::correction::{BreakCorrection, Window, validate_break};
use crate::store::{AttendanceRef, Change, Changeset, DaySnapshot, Store};

/// A reviewer's direct edit of one day. Replaces the day's values outright.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, ToSchema)]
#[schema(example = json!({
    "clock_in": "2026-01-05T09:00:00",
    "clock_out": "2026-01-05T18:00:00",
    "notes": null,
    "breaks": [{"break_id": 12, "start": "2026-01-05T12:00:00", "end": "2026-01-05T13:00:00"}]
}))]
pub struct AdminAttendanceEdit {
    pub clock_in: NaiveDateTime,
    pub clock_out: Option<NaiveDateTime>,
    pub notes: Option<String>,
    /// Entries with a `break_id` keep that interval; the rest are new.
    /// Stored intervals left out are deleted.
    #[serde(default)]
    pub breaks: Vec<BreakCorrection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ApprovalOutcome {
    pub attendance: Attendance,
    pub breaks: Vec<BreakInterval>,
    pub approved_attendance_proposal_ids: Vec<u64>,
    pub approved_break_proposal_ids: Vec<u64>,
}

/// Values of an `update` proposal laid over the stored row. Fields the
/// proposal leaves out keep their stored value.
pub fn merge(attendance: &Attendance, proposal: &AttendanceProposal) -> Attendance {
    Attendance {
        clock_in: proposal.proposed_clock_in.or(attendance.clock_in),
        clock_out: proposal.proposed_clock_out.or(attendance.clock_out),
        notes: proposal.notes.clone().apply(attendance.notes.clone()),
        ..attendance.clone()
    }
}

/// The day's intervals as they will be once a changeset lands.
struct BreakLedger {
    spans: Vec<(Option<u64>, Span)>,
}

impl BreakLedger {
    fn of(breaks: &[BreakInterval]) -> Self {
        Self {
            spans: breaks.iter().map(|b| (Some(b.id), b.span())).collect(),
        }
    }

    fn update(&mut self, id: u64, span: Span) {
        if let Some(entry) = self.spans.iter_mut().find(|(bid, _)| *bid == Some(id)) {
            entry.1 = span;
        }
    }

    fn insert(&mut self, span: Span) {
        self.spans.push((None, span));
    }

    fn spans(&self) -> Vec<Span> {
        self.spans.iter().map(|(_, span)| *span).collect()
    }
}

/// Applies one pending break proposal to the day's attendance.
fn apply_break_proposal(
    changes: &mut Changeset,
    ledger: &mut BreakLedger,
    proposal: &BreakProposal,
    owner: BreakOwner,
    attendance: AttendanceRef,
) {
    match owner {
        BreakOwner::Interval {
            break_id,
            attendance_id,
        } => {
            changes.push(Change::UpdateBreak(BreakInterval {
                id: break_id,
                attendance_id,
                start: proposal.proposed_start,
                end: proposal.proposed_end,
            }));
            ledger.update(break_id, proposal.span());
        }
        BreakOwner::Day { .. } => {
            changes.push(Change::InsertBreak {
                attendance,
                span: proposal.span(),
            });
            ledger.insert(proposal.span());
        }
        BreakOwner::Dangling { break_id } => {
            tracing::warn!(
                proposal_id = proposal.id,
                break_id,
                "Break proposal targets a deleted interval; approved without applying"
            );
        }
    }
    changes.push(Change::ApproveBreakProposal {
        id: proposal.id,
        attendance: Some(attendance),
    });
}

pub fn plan_approval(
    snapshot: &DaySnapshot,
    proposal: &AttendanceProposal,
) -> AttendanceResult<Changeset> {
    if !proposal.is_pending() {
        return Err(AttendanceError::AlreadyProcessed(proposal.id));
    }
    match proposal.kind {
        ProposalKind::Update => plan_update_approval(snapshot, proposal),
        ProposalKind::Create => plan_create_approval(snapshot, proposal),
    }
}

fn plan_update_approval(
    snapshot: &DaySnapshot,
    proposal: &AttendanceProposal,
) -> AttendanceResult<Changeset> {
    let attendance = snapshot.attendance.as_ref().ok_or_else(|| {
        AttendanceError::not_found(
            "attendance",
            proposal
                .attendance_id
                .map_or_else(|| format!("{}/{}", snapshot.employee_id, snapshot.day), |id| id.to_string()),
        )
    })?;
    let target = AttendanceRef::Existing(attendance.id);

    let mut changes = Changeset::new();
    let mut ledger = BreakLedger::of(&snapshot.breaks);
    for bp in snapshot.pending_break_proposals() {
        apply_break_proposal(&mut changes, &mut ledger, bp, bp.owner(&snapshot.breaks), target);
    }

    let mut merged = merge(attendance, proposal);
    merged.status = derive_status(merged.clock_out, &ledger.spans());
    changes
        .push(Change::UpdateAttendance(merged))
        .push(Change::ApproveAttendanceProposal {
            id: proposal.id,
            attendance: Some(target),
        });
    Ok(changes)
}

fn plan_create_approval(
    snapshot: &DaySnapshot,
    proposal: &AttendanceProposal,
) -> AttendanceResult<Changeset> {
    if snapshot.attendance.is_some() {
        return Err(AttendanceError::StaleProposal(proposal.id));
    }

    let mut changes = Changeset::new();
    changes.push(Change::InsertAttendance(NewAttendance {
        employee_id: proposal.employee_id,
        work_date: proposal.target_day,
        clock_in: proposal.proposed_clock_in,
        clock_out: proposal.proposed_clock_out,
        status: derive_status(proposal.proposed_clock_out, &proposal.break_payload),
        notes: proposal.notes.clone().apply(None),
    }));
    for span in &proposal.break_payload {
        changes.push(Change::InsertBreak {
            attendance: AttendanceRef::Inserted,
            span: *span,
        });
    }
    changes.push(Change::ApproveAttendanceProposal {
        id: proposal.id,
        attendance: Some(AttendanceRef::Inserted),
    });

    // Break corrections are only accepted once the day has an attendance, and
    // any pending one blocks a create proposal, so none should be here. An
    // interval correction left from older data points at a row the new day
    // does not have; it is linked and retired unapplied. Requests for new
    // intervals stay pending for their own approval.
    for bp in snapshot
        .pending_break_proposals()
        .filter(|bp| bp.kind() == ProposalKind::Update)
    {
        tracing::warn!(
            proposal_id = bp.id,
            break_id = ?bp.break_id,
            "Retiring break proposal filed before the day had an attendance"
        );
        changes.push(Change::ApproveBreakProposal {
            id: bp.id,
            attendance: Some(AttendanceRef::Inserted),
        });
    }
    Ok(changes)
}

pub fn plan_break_approval(
    snapshot: &DaySnapshot,
    proposal: &BreakProposal,
) -> AttendanceResult<Changeset> {
    if !proposal.is_pending() {
        return Err(AttendanceError::AlreadyProcessed(proposal.id));
    }
    let owner = proposal.owner(&snapshot.breaks);
    if let BreakOwner::Dangling { .. } = owner {
        return Err(AttendanceError::StaleProposal(proposal.id));
    }
    let attendance = snapshot.attendance.as_ref().ok_or_else(|| {
        AttendanceError::not_found("attendance", format!("{}/{}", snapshot.employee_id, snapshot.day))
    })?;

    let mut changes = Changeset::new();
    let mut ledger = BreakLedger::of(&snapshot.breaks);
    apply_break_proposal(
        &mut changes,
        &mut ledger,
        proposal,
        owner,
        AttendanceRef::Existing(attendance.id),
    );

    let status = derive_status(attendance.clock_out, &ledger.spans());
    if status != attendance.status {
        changes.push(Change::UpdateAttendance(Attendance {
            status,
            ..attendance.clone()
        }));
    }
    Ok(changes)
}

fn validate_edit(snapshot: &DaySnapshot, edit: &AdminAttendanceEdit) -> AttendanceResult<()> {
    let mut errors = Vec::new();
    let day = snapshot.day;

    if edit.clock_in.date() != day {
        errors.push(FieldError::new("clock_in", format!("must fall on {day}")));
    }
    if edit.clock_out.is_some_and(|out| out <= edit.clock_in) {
        errors.push(FieldError::new("clock_out", "must be after clock-in"));
    }
    let window = Window {
        clock_in: Some(edit.clock_in),
        clock_out: edit.clock_out,
    };
    for (i, b) in edit.breaks.iter().enumerate() {
        validate_break(&format!("breaks[{i}]."), day, b, window, &snapshot.breaks, &mut errors);
    }
    if edit.breaks.iter().filter(|b| b.end.is_none()).count() > 1 {
        errors.push(FieldError::new("breaks", "at most one break can be open"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AttendanceError::ValidationFailed(errors))
    }
}

pub fn plan_admin_upsert(
    snapshot: &DaySnapshot,
    edit: AdminAttendanceEdit,
    editor: u64,
    now: NaiveDateTime,
) -> Changeset {
    let mut changes = Changeset::new();
    let spans: Vec<Span> = edit.breaks.iter().map(BreakCorrection::span).collect();
    let status = derive_status(edit.clock_out, &spans);

    let (target, kind) = match &snapshot.attendance {
        Some(existing) => {
            changes.push(Change::UpdateAttendance(Attendance {
                clock_in: Some(edit.clock_in),
                clock_out: edit.clock_out,
                status,
                notes: edit.notes.clone(),
                ..existing.clone()
            }));
            (AttendanceRef::Existing(existing.id), ProposalKind::Update)
        }
        None => {
            changes.push(Change::InsertAttendance(NewAttendance {
                employee_id: snapshot.employee_id,
                work_date: snapshot.day,
                clock_in: Some(edit.clock_in),
                clock_out: edit.clock_out,
                status,
                notes: edit.notes.clone(),
            }));
            (AttendanceRef::Inserted, ProposalKind::Create)
        }
    };

    for stored in &snapshot.breaks {
        if edit.breaks.iter().any(|b| b.break_id == Some(stored.id)) {
            continue;
        }
        if snapshot
            .pending_break_proposals()
            .any(|bp| bp.break_id == Some(stored.id))
        {
            tracing::warn!(
                employee_id = snapshot.employee_id,
                break_id = stored.id,
                "Deleting a break that a pending proposal still targets"
            );
        }
        changes.push(Change::DeleteBreak(stored.id));
    }
    for b in &edit.breaks {
        match (b.break_id, target) {
            (Some(id), AttendanceRef::Existing(attendance_id)) => {
                changes.push(Change::UpdateBreak(BreakInterval {
                    id,
                    attendance_id,
                    start: b.start,
                    end: b.end,
                }));
            }
            _ => {
                changes.push(Change::InsertBreak {
                    attendance: target,
                    span: b.span(),
                });
            }
        }
    }

    for p in snapshot.attendance_proposals.iter().filter(|p| p.is_pending()) {
        changes.push(Change::ApproveAttendanceProposal {
            id: p.id,
            attendance: Some(target),
        });
    }
    for bp in snapshot.pending_break_proposals() {
        changes.push(Change::ApproveBreakProposal {
            id: bp.id,
            attendance: Some(target),
        });
    }

    changes.push(Change::InsertAttendanceProposal(NewAttendanceProposal {
        employee_id: snapshot.employee_id,
        attendance: Some(target),
        target_day: snapshot.day,
        kind,
        status: ProposalStatus::Approved,
        proposed_clock_in: Some(edit.clock_in),
        proposed_clock_out: edit.clock_out,
        notes: Patch::from(edit.notes),
        break_payload: spans,
        submitted_by: editor,
        created_at: now,
    }));
    changes
}

/// Ids of the proposals a changeset flips to approved.
fn approved_ids(changes: &Changeset) -> (Vec<u64>, Vec<u64>) {
    let mut attendance = Vec::new();
    let mut breaks = Vec::new();
    for change in changes.iter() {
        match change {
            Change::ApproveAttendanceProposal { id, .. } => attendance.push(*id),
            Change::ApproveBreakProposal { id, .. } => breaks.push(*id),
            _ => {}
        }
    }
    (attendance, breaks)
}

impl<S: Store> AttendanceService<S> {
    pub async fn approve_proposal(
        &self,
        actor: &Actor,
        proposal_id: u64,
    ) -> AttendanceResult<ApprovalOutcome> {
        actor.require_reviewer()?;
        let found = self
            .store
            .find_attendance_proposal(proposal_id)
            .await?
            .ok_or_else(|| AttendanceError::not_found("attendance_proposal", proposal_id))?;
        let (employee_id, day) = (found.employee_id, found.target_day);
        let _guard = self.locks.acquire(employee_id).await;

        let snapshot = self.store.load_day(employee_id, day).await?;
        let proposal = snapshot
            .attendance_proposal(proposal_id)
            .ok_or_else(|| AttendanceError::not_found("attendance_proposal", proposal_id))?;
        let changes = plan_approval(&snapshot, proposal)?;

        let outcome = self.commit_and_reload(employee_id, day, changes).await?;
        tracing::info!(
            proposal_id,
            employee_id,
            %day,
            reviewer = actor.user_id,
            cascaded = outcome.approved_break_proposal_ids.len(),
            "Proposal approved"
        );
        Ok(outcome)
    }

    pub async fn approve_break_proposal(
        &self,
        actor: &Actor,
        proposal_id: u64,
    ) -> AttendanceResult<ApprovalOutcome> {
        actor.require_reviewer()?;
        let found = self
            .store
            .find_break_proposal(proposal_id)
            .await?
            .ok_or_else(|| AttendanceError::not_found("break_proposal", proposal_id))?;
        let (employee_id, day) = (found.employee_id, found.target_day);
        let _guard = self.locks.acquire(employee_id).await;

        let snapshot = self.store.load_day(employee_id, day).await?;
        let proposal = snapshot
            .break_proposal(proposal_id)
            .ok_or_else(|| AttendanceError::not_found("break_proposal", proposal_id))?;
        let changes = plan_break_approval(&snapshot, proposal)?;

        let outcome = self.commit_and_reload(employee_id, day, changes).await?;
        tracing::info!(proposal_id, employee_id, %day, reviewer = actor.user_id, "Break proposal approved");
        Ok(outcome)
    }

    /// Writes a reviewer's values for the day directly, retiring whatever was
    /// pending.
    pub async fn admin_upsert_attendance(
        &self,
        actor: &Actor,
        employee_id: u64,
        day: NaiveDate,
        edit: AdminAttendanceEdit,
    ) -> AttendanceResult<ApprovalOutcome> {
        actor.require_reviewer()?;
        let _guard = self.locks.acquire(employee_id).await;

        let snapshot = self.store.load_day(employee_id, day).await?;
        validate_edit(&snapshot, &edit)?;
        let changes = plan_admin_upsert(&snapshot, edit, actor.user_id, self.now());

        let outcome = self.commit_and_reload(employee_id, day, changes).await?;
        tracing::info!(
            employee_id,
            %day,
            reviewer = actor.user_id,
            retired = outcome.approved_attendance_proposal_ids.len()
                + outcome.approved_break_proposal_ids.len(),
            "Attendance edited directly"
        );
        Ok(outcome)
    }

    async fn commit_and_reload(
        &self,
        employee_id: u64,
        day: NaiveDate,
        changes: Changeset,
    ) -> AttendanceResult<ApprovalOutcome> {
        let (approved_attendance_proposal_ids, approved_break_proposal_ids) = approved_ids(&changes);
        self.store.commit(changes).await?;

        let snapshot = self.store.load_day(employee_id, day).await?;
        let attendance = snapshot
            .attendance
            .ok_or_else(|| AttendanceError::not_found("attendance", format!("{employee_id}/{day}")))?;
        Ok(ApprovalOutcome {
            attendance,
            breaks: snapshot.breaks,
            approved_attendance_proposal_ids,
            approved_break_proposal_ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AttendanceStatus;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn stored() -> Attendance {
        Attendance {
            id: 1,
            employee_id: 7,
            work_date: at(0, 0).date(),
            clock_in: Some(at(9, 0)),
            clock_out: Some(at(18, 0)),
            status: AttendanceStatus::Completed,
            notes: Some("on site".to_string()),
        }
    }

    fn update(clock_in: Option<NaiveDateTime>, clock_out: Option<NaiveDateTime>, notes: Patch<String>) -> AttendanceProposal {
        AttendanceProposal {
            id: 40,
            employee_id: 7,
            attendance_id: Some(1),
            target_day: at(0, 0).date(),
            kind: ProposalKind::Update,
            status: ProposalStatus::Pending,
            proposed_clock_in: clock_in,
            proposed_clock_out: clock_out,
            notes,
            break_payload: Vec::new(),
            submitted_by: 70,
            created_at: at(19, 0),
        }
    }

    fn break_proposal(id: u64, break_id: Option<u64>, start: NaiveDateTime, end: NaiveDateTime) -> BreakProposal {
        BreakProposal {
            id,
            employee_id: 7,
            break_id,
            attendance_id: Some(1),
            target_day: at(0, 0).date(),
            status: ProposalStatus::Pending,
            proposed_start: start,
            proposed_end: Some(end),
            submitted_by: 70,
            created_at: at(19, 0),
        }
    }

    fn day_with(attendance: Option<Attendance>) -> DaySnapshot {
        let mut snapshot = DaySnapshot::empty(7, at(0, 0).date());
        snapshot.attendance = attendance;
        snapshot
    }

    #[test]
    fn merge_only_touches_proposed_fields() {
        let merged = merge(&stored(), &update(None, Some(at(19, 0)), Patch::Keep));
        assert_eq!(merged.clock_in, Some(at(9, 0)));
        assert_eq!(merged.clock_out, Some(at(19, 0)));
        assert_eq!(merged.notes.as_deref(), Some("on site"));

        let cleared = merge(&stored(), &update(None, None, Patch::Clear));
        assert_eq!(cleared.notes, None);
        assert_eq!(cleared.clock_out, Some(at(18, 0)));
    }

    #[test]
    fn approving_twice_is_refused() {
        let mut done = update(Some(at(8, 30)), None, Patch::Keep);
        done.status = ProposalStatus::Approved;
        assert!(matches!(
            plan_approval(&day_with(Some(stored())), &done),
            Err(AttendanceError::AlreadyProcessed(40))
        ));
    }

    #[test]
    fn update_approval_cascades_pending_break_proposals() {
        let mut day = day_with(Some(stored()));
        day.breaks = vec![BreakInterval {
            id: 12,
            attendance_id: 1,
            start: at(12, 0),
            end: Some(at(13, 0)),
        }];
        day.break_proposals = vec![
            break_proposal(50, Some(12), at(12, 15), at(13, 0)),
            break_proposal(51, None, at(15, 0), at(15, 10)),
        ];
        let proposal = update(Some(at(8, 30)), None, Patch::Keep);

        let changes = plan_approval(&day, &proposal).unwrap();
        assert_eq!(approved_ids(&changes), (vec![40], vec![50, 51]));
        let changes = changes.into_changes();
        assert!(changes.contains(&Change::UpdateBreak(BreakInterval {
            id: 12,
            attendance_id: 1,
            start: at(12, 15),
            end: Some(at(13, 0)),
        })));
        assert!(changes.contains(&Change::InsertBreak {
            attendance: AttendanceRef::Existing(1),
            span: Span::closed(at(15, 0), at(15, 10)),
        }));
    }

    #[test]
    fn create_approval_inserts_one_break_per_payload_entry() {
        let mut create = update(Some(at(9, 0)), Some(at(18, 0)), Patch::Set("late entry".into()));
        create.kind = ProposalKind::Create;
        create.attendance_id = None;
        create.break_payload = vec![Span::closed(at(10, 0), at(10, 15)), Span::closed(at(12, 0), at(13, 0))];

        let changes = plan_approval(&day_with(None), &create).unwrap().into_changes();
        let inserted = changes
            .iter()
            .filter(|c| matches!(c, Change::InsertBreak { attendance: AttendanceRef::Inserted, .. }))
            .count();
        assert_eq!(inserted, 2);
        assert!(matches!(
            &changes[0],
            Change::InsertAttendance(NewAttendance {
                status: AttendanceStatus::Completed,
                notes: Some(_),
                ..
            })
        ));
    }

    #[test]
    fn create_approval_retires_leftover_break_proposals_unapplied() {
        let mut create = update(Some(at(9, 0)), Some(at(18, 0)), Patch::Keep);
        create.kind = ProposalKind::Create;
        create.attendance_id = None;
        create.break_payload = vec![Span::closed(at(12, 0), at(13, 0))];
        let mut day = day_with(None);
        let mut leftover = break_proposal(50, Some(12), at(12, 15), at(13, 0));
        leftover.attendance_id = None;
        let mut requested = break_proposal(51, None, at(15, 0), at(15, 10));
        requested.attendance_id = None;
        day.break_proposals = vec![leftover, requested];

        let changes = plan_approval(&day, &create).unwrap();
        assert_eq!(approved_ids(&changes), (vec![40], vec![50]));
        let changes = changes.into_changes();
        assert!(!changes.iter().any(|c| matches!(c, Change::UpdateBreak(_))));
        assert_eq!(
            changes
                .iter()
                .filter(|c| matches!(c, Change::InsertBreak { .. }))
                .count(),
            1
        );
        assert!(changes.contains(&Change::ApproveBreakProposal {
            id: 50,
            attendance: Some(AttendanceRef::Inserted),
        }));
    }

    #[test]
    fn create_approval_for_a_day_that_now_exists_is_stale() {
        let mut create = update(Some(at(9, 0)), None, Patch::Keep);
        create.kind = ProposalKind::Create;
        assert!(matches!(
            plan_approval(&day_with(Some(stored())), &create),
            Err(AttendanceError::StaleProposal(40))
        ));
    }

    #[test]
    fn closing_the_open_break_puts_the_day_back_to_working() {
        let mut working = stored();
        working.clock_out = None;
        working.status = AttendanceStatus::Break;
        let mut day = day_with(Some(working));
        day.breaks = vec![BreakInterval {
            id: 12,
            attendance_id: 1,
            start: at(12, 0),
            end: None,
        }];

        let changes = plan_break_approval(&day, &break_proposal(50, Some(12), at(12, 0), at(12, 30)))
            .unwrap()
            .into_changes();
        assert!(changes.iter().any(|c| matches!(
            c,
            Change::UpdateAttendance(Attendance {
                status: AttendanceStatus::Working,
                ..
            })
        )));
    }

    #[test]
    fn break_approval_for_a_deleted_interval_is_stale() {
        let day = day_with(Some(stored()));
        assert!(matches!(
            plan_break_approval(&day, &break_proposal(50, Some(99), at(12, 0), at(12, 30))),
            Err(AttendanceError::StaleProposal(50))
        ));
    }

    #[test]
    fn direct_edit_retires_pending_proposals_and_records_itself() {
        let mut day = day_with(Some(stored()));
        day.breaks = vec![
            BreakInterval {
                id: 12,
                attendance_id: 1,
                start: at(12, 0),
                end: Some(at(13, 0)),
            },
            BreakInterval {
                id: 13,
                attendance_id: 1,
                start: at(15, 0),
                end: Some(at(15, 15)),
            },
        ];
        day.attendance_proposals = vec![update(Some(at(8, 0)), None, Patch::Keep)];
        day.break_proposals = vec![break_proposal(50, Some(13), at(15, 0), at(15, 30))];

        let edit = AdminAttendanceEdit {
            clock_in: at(9, 15),
            clock_out: Some(at(18, 0)),
            notes: None,
            breaks: vec![BreakCorrection {
                break_id: Some(12),
                start: at(12, 30),
                end: Some(at(13, 0)),
            }],
        };
        validate_edit(&day, &edit).unwrap();
        let changes = plan_admin_upsert(&day, edit, 1, at(20, 0));
        assert_eq!(approved_ids(&changes), (vec![40], vec![50]));

        let changes = changes.into_changes();
        assert!(changes.contains(&Change::DeleteBreak(13)));
        assert!(changes.contains(&Change::UpdateBreak(BreakInterval {
            id: 12,
            attendance_id: 1,
            start: at(12, 30),
            end: Some(at(13, 0)),
        })));
        match changes.last() {
            Some(Change::InsertAttendanceProposal(record)) => {
                assert_eq!(record.status, ProposalStatus::Approved);
                assert_eq!(record.notes, Patch::Clear);
                assert_eq!(record.proposed_clock_in, Some(at(9, 15)));
            }
            other => panic!("expected the edit record last, got {other:?}"),
        }
    }

    #[test]
    fn direct_edit_rejects_times_outside_the_day() {
        let day = day_with(None);
        let edit = AdminAttendanceEdit {
            clock_in: at(9, 0),
            clock_out: Some(at(8, 0)),
            notes: None,
            breaks: Vec::new(),
        };
        assert!(matches!(
            validate_edit(&day, &edit),
            Err(AttendanceError::ValidationFailed(fields)) if fields[0].field == "clock_out"
        ));
    }
}
