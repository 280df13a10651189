//! In-process backend. Used by the test suite and by `STORAGE=memory`.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use chrono::NaiveDate;

use crate::model::{
    Attendance, AttendanceProposal, BreakInterval, BreakProposal, ProposalStatus,
};
use crate::store::{
    AttendanceRef, Change, Changeset, CommitReceipt, ConflictKind, DaySnapshot, ProposalFilter,
    Store, StoreError,
};

#[derive(Debug, Default)]
struct Tables {
    next_id: u64,
    attendances: BTreeMap<u64, Attendance>,
    breaks: BTreeMap<u64, BreakInterval>,
    attendance_proposals: BTreeMap<u64, AttendanceProposal>,
    break_proposals: BTreeMap<u64, BreakProposal>,
}

/// A row as it was before a change touched it. `None` means the row did not
/// exist.
enum Undo {
    Attendance(u64, Option<Attendance>),
    Break(u64, Option<BreakInterval>),
    AttendanceProposal(u64, Option<AttendanceProposal>),
    BreakProposal(u64, Option<BreakProposal>),
}

fn restore<T>(table: &mut BTreeMap<u64, T>, id: u64, before: Option<T>) {
    match before {
        Some(row) => {
            table.insert(id, row);
        }
        None => {
            table.remove(&id);
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tables {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn snapshot(&self, employee_id: u64, day: NaiveDate) -> DaySnapshot {
        let attendance = self
            .attendances
            .values()
            .find(|a| a.employee_id == employee_id && a.work_date == day)
            .cloned();

        let mut breaks: Vec<BreakInterval> = match &attendance {
            Some(a) => self
                .breaks
                .values()
                .filter(|b| b.attendance_id == a.id)
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        breaks.sort_by_key(|b| (b.start, b.id));

        DaySnapshot {
            employee_id,
            day,
            attendance,
            breaks,
            attendance_proposals: self
                .attendance_proposals
                .values()
                .filter(|p| p.employee_id == employee_id && p.target_day == day)
                .cloned()
                .collect(),
            break_proposals: self
                .break_proposals
                .values()
                .filter(|p| p.employee_id == employee_id && p.target_day == day)
                .cloned()
                .collect(),
        }
    }

    fn resolve(
        &self,
        attendance: AttendanceRef,
        receipt: &CommitReceipt,
    ) -> Result<u64, StoreError> {
        receipt.resolve(attendance).ok_or(StoreError::MissingRow {
            entity: "attendance",
            id: 0,
        })
    }

    /// Puts back every row the journal recorded, newest first.
    fn rollback(&mut self, journal: Vec<Undo>, next_id: u64) {
        for undo in journal.into_iter().rev() {
            match undo {
                Undo::Attendance(id, before) => restore(&mut self.attendances, id, before),
                Undo::Break(id, before) => restore(&mut self.breaks, id, before),
                Undo::AttendanceProposal(id, before) => {
                    restore(&mut self.attendance_proposals, id, before)
                }
                Undo::BreakProposal(id, before) => restore(&mut self.break_proposals, id, before),
            }
        }
        self.next_id = next_id;
    }

    fn apply(
        &mut self,
        change: Change,
        receipt: &mut CommitReceipt,
        journal: &mut Vec<Undo>,
    ) -> Result<(), StoreError> {
        match change {
            Change::InsertAttendance(new) => {
                let taken = self
                    .attendances
                    .values()
                    .any(|a| a.employee_id == new.employee_id && a.work_date == new.work_date);
                if taken {
                    return Err(StoreError::Conflict(ConflictKind::AttendanceDay));
                }
                let id = self.allocate_id();
                journal.push(Undo::Attendance(id, None));
                self.attendances.insert(
                    id,
                    Attendance {
                        id,
                        employee_id: new.employee_id,
                        work_date: new.work_date,
                        clock_in: new.clock_in,
                        clock_out: new.clock_out,
                        status: new.status,
                        notes: new.notes,
                    },
                );
                receipt.attendance_id = Some(id);
            }
            Change::UpdateAttendance(attendance) => {
                let row = self
                    .attendances
                    .get_mut(&attendance.id)
                    .ok_or(StoreError::MissingRow {
                        entity: "attendance",
                        id: attendance.id,
                    })?;
                journal.push(Undo::Attendance(row.id, Some(row.clone())));
                *row = attendance;
            }
            Change::InsertBreak { attendance, span } => {
                let attendance_id = self.resolve(attendance, receipt)?;
                let id = self.allocate_id();
                journal.push(Undo::Break(id, None));
                self.breaks.insert(
                    id,
                    BreakInterval {
                        id,
                        attendance_id,
                        start: span.start,
                        end: span.end,
                    },
                );
                receipt.break_ids.push(id);
            }
            Change::UpdateBreak(interval) => {
                let row = self
                    .breaks
                    .get_mut(&interval.id)
                    .ok_or(StoreError::MissingRow {
                        entity: "break_interval",
                        id: interval.id,
                    })?;
                journal.push(Undo::Break(row.id, Some(row.clone())));
                *row = interval;
            }
            Change::DeleteBreak(id) => {
                if let Some(old) = self.breaks.remove(&id) {
                    journal.push(Undo::Break(id, Some(old)));
                }
            }
            Change::InsertAttendanceProposal(new) => {
                if new.status == ProposalStatus::Pending {
                    let pending = self.attendance_proposals.values().any(|p| {
                        p.is_pending()
                            && p.employee_id == new.employee_id
                            && p.target_day == new.target_day
                    });
                    if pending {
                        return Err(StoreError::Conflict(ConflictKind::PendingProposal {
                            day: new.target_day,
                        }));
                    }
                }
                let attendance_id = match new.attendance {
                    Some(r) => Some(self.resolve(r, receipt)?),
                    None => None,
                };
                let id = self.allocate_id();
                journal.push(Undo::AttendanceProposal(id, None));
                self.attendance_proposals.insert(
                    id,
                    AttendanceProposal {
                        id,
                        employee_id: new.employee_id,
                        attendance_id,
                        target_day: new.target_day,
                        kind: new.kind,
                        status: new.status,
                        proposed_clock_in: new.proposed_clock_in,
                        proposed_clock_out: new.proposed_clock_out,
                        notes: new.notes,
                        break_payload: new.break_payload,
                        submitted_by: new.submitted_by,
                        created_at: new.created_at,
                    },
                );
                receipt.attendance_proposal_ids.push(id);
            }
            Change::InsertBreakProposal(new) => {
                let id = self.allocate_id();
                journal.push(Undo::BreakProposal(id, None));
                self.break_proposals.insert(
                    id,
                    BreakProposal {
                        id,
                        employee_id: new.employee_id,
                        break_id: new.break_id,
                        attendance_id: new.attendance_id,
                        target_day: new.target_day,
                        status: new.status,
                        proposed_start: new.proposed_start,
                        proposed_end: new.proposed_end,
                        submitted_by: new.submitted_by,
                        created_at: new.created_at,
                    },
                );
                receipt.break_proposal_ids.push(id);
            }
            Change::ApproveAttendanceProposal { id, attendance } => {
                let link = match attendance {
                    Some(r) => Some(self.resolve(r, receipt)?),
                    None => None,
                };
                let row = self
                    .attendance_proposals
                    .get_mut(&id)
                    .ok_or(StoreError::MissingRow {
                        entity: "attendance_proposal",
                        id,
                    })?;
                if !row.is_pending() {
                    return Err(StoreError::Conflict(ConflictKind::AlreadyDecided {
                        proposal_id: id,
                    }));
                }
                journal.push(Undo::AttendanceProposal(id, Some(row.clone())));
                row.status = ProposalStatus::Approved;
                if link.is_some() {
                    row.attendance_id = link;
                }
            }
            Change::ApproveBreakProposal { id, attendance } => {
                let link = match attendance {
                    Some(r) => Some(self.resolve(r, receipt)?),
                    None => None,
                };
                let row = self
                    .break_proposals
                    .get_mut(&id)
                    .ok_or(StoreError::MissingRow {
                        entity: "break_proposal",
                        id,
                    })?;
                if !row.is_pending() {
                    return Err(StoreError::Conflict(ConflictKind::AlreadyDecided {
                        proposal_id: id,
                    }));
                }
                journal.push(Undo::BreakProposal(id, Some(row.clone())));
                row.status = ProposalStatus::Approved;
                if link.is_some() {
                    row.attendance_id = link;
                }
            }
        }
        Ok(())
    }
}

impl Store for MemoryStore {
    async fn load_day(&self, employee_id: u64, day: NaiveDate) -> Result<DaySnapshot, StoreError> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        Ok(tables.snapshot(employee_id, day))
    }

    async fn load_range(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DaySnapshot>, StoreError> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        Ok(from
            .iter_days()
            .take_while(|day| *day <= to)
            .map(|day| tables.snapshot(employee_id, day))
            .filter(|snapshot| !snapshot.is_empty())
            .collect())
    }

    async fn find_attendance_proposal(
        &self,
        id: u64,
    ) -> Result<Option<AttendanceProposal>, StoreError> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        Ok(tables.attendance_proposals.get(&id).cloned())
    }

    async fn find_break_proposal(&self, id: u64) -> Result<Option<BreakProposal>, StoreError> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        Ok(tables.break_proposals.get(&id).cloned())
    }

    async fn list_attendance_proposals(
        &self,
        filter: ProposalFilter,
    ) -> Result<Vec<AttendanceProposal>, StoreError> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        Ok(tables
            .attendance_proposals
            .values()
            .rev()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }

    async fn commit(&self, changeset: Changeset) -> Result<CommitReceipt, StoreError> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);

        // Only the rows a change touches are journaled; a failure puts them back.
        let next_id = tables.next_id;
        let mut journal = Vec::new();
        let mut receipt = CommitReceipt::default();
        for change in changeset.into_changes() {
            if let Err(err) = tables.apply(change, &mut receipt, &mut journal) {
                tables.rollback(journal, next_id);
                return Err(err);
            }
        }
        Ok(receipt)
    }

    async fn purge_employee(&self, employee_id: u64) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let before = tables.attendances.len()
            + tables.breaks.len()
            + tables.attendance_proposals.len()
            + tables.break_proposals.len();

        let owned: Vec<u64> = tables
            .attendances
            .values()
            .filter(|a| a.employee_id == employee_id)
            .map(|a| a.id)
            .collect();
        tables.attendances.retain(|_, a| a.employee_id != employee_id);
        tables.breaks.retain(|_, b| !owned.contains(&b.attendance_id));
        tables
            .attendance_proposals
            .retain(|_, p| p.employee_id != employee_id);
        tables
            .break_proposals
            .retain(|_, p| p.employee_id != employee_id);

        let after = tables.attendances.len()
            + tables.breaks.len()
            + tables.attendance_proposals.len()
            + tables.break_proposals.len();
        Ok((before - after) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttendanceStatus, NewAttendance, Span};
    use chrono::NaiveDateTime;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        day().and_hms_opt(h, m, 0).unwrap()
    }

    fn new_attendance(employee_id: u64) -> NewAttendance {
        NewAttendance {
            employee_id,
            work_date: day(),
            clock_in: Some(at(9, 0)),
            clock_out: None,
            status: AttendanceStatus::Working,
            notes: None,
        }
    }

    #[actix_web::test]
    async fn inserted_reference_links_breaks_to_the_new_row() {
        let store = MemoryStore::new();
        let changes: Changeset = [
            Change::InsertAttendance(new_attendance(7)),
            Change::InsertBreak {
                attendance: AttendanceRef::Inserted,
                span: Span::closed(at(12, 0), at(13, 0)),
            },
        ]
        .into_iter()
        .collect();

        let receipt = store.commit(changes).await.unwrap();
        let snapshot = store.load_day(7, day()).await.unwrap();

        let attendance = snapshot.attendance.unwrap();
        assert_eq!(receipt.attendance_id, Some(attendance.id));
        assert_eq!(snapshot.breaks.len(), 1);
        assert_eq!(snapshot.breaks[0].attendance_id, attendance.id);
    }

    #[actix_web::test]
    async fn failed_commit_leaves_no_partial_writes() {
        let store = MemoryStore::new();
        let mut first = Changeset::new();
        first.push(Change::InsertAttendance(new_attendance(7)));
        store.commit(first).await.unwrap();

        let mut second = Changeset::new();
        second
            .push(Change::InsertAttendance(new_attendance(8)))
            .push(Change::InsertAttendance(new_attendance(7)));

        let err = store.commit(second).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Conflict(ConflictKind::AttendanceDay)
        ));
        assert!(store.load_day(8, day()).await.unwrap().attendance.is_none());
    }

    #[actix_web::test]
    async fn failed_commit_restores_updated_and_deleted_rows() {
        let store = MemoryStore::new();
        let changes: Changeset = [
            Change::InsertAttendance(new_attendance(7)),
            Change::InsertBreak {
                attendance: AttendanceRef::Inserted,
                span: Span::closed(at(12, 0), at(13, 0)),
            },
        ]
        .into_iter()
        .collect();
        store.commit(changes).await.unwrap();
        let before = store.load_day(7, day()).await.unwrap();
        let attendance = before.attendance.clone().unwrap();
        let attendance_id = attendance.id;

        let mut failing = Changeset::new();
        failing
            .push(Change::UpdateAttendance(Attendance {
                clock_out: Some(at(18, 0)),
                status: AttendanceStatus::Completed,
                ..attendance
            }))
            .push(Change::DeleteBreak(before.breaks[0].id))
            .push(Change::InsertBreak {
                attendance: AttendanceRef::Existing(attendance_id),
                span: Span::closed(at(15, 0), at(15, 15)),
            })
            .push(Change::UpdateBreak(BreakInterval {
                id: 999,
                attendance_id,
                start: at(16, 0),
                end: None,
            }));

        let err = store.commit(failing).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingRow { id: 999, .. }));
        assert_eq!(store.load_day(7, day()).await.unwrap(), before);

        // Ids handed out by the failed commit are reused.
        let mut next = Changeset::new();
        next.push(Change::InsertAttendance(new_attendance(8)));
        let receipt = store.commit(next).await.unwrap();
        assert_eq!(receipt.attendance_id, Some(3));
    }

    #[actix_web::test]
    async fn purge_removes_only_the_employees_rows() {
        let store = MemoryStore::new();
        let changes: Changeset = [
            Change::InsertAttendance(new_attendance(7)),
            Change::InsertBreak {
                attendance: AttendanceRef::Inserted,
                span: Span::open(at(12, 0)),
            },
        ]
        .into_iter()
        .collect();
        store.commit(changes).await.unwrap();
        let mut other = Changeset::new();
        other.push(Change::InsertAttendance(new_attendance(8)));
        store.commit(other).await.unwrap();

        assert_eq!(store.purge_employee(7).await.unwrap(), 2);
        assert!(store.load_day(7, day()).await.unwrap().is_empty());
        assert!(store.load_day(8, day()).await.unwrap().attendance.is_some());
    }
}
