use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{FromRow, MySql, MySqlPool, Transaction};

use crate::model::{
    Attendance, AttendanceProposal, BreakInterval, BreakProposal, Patch, ProposalStatus, Span,
};
use crate::store::{
    AttendanceRef, Change, Changeset, CommitReceipt, ConflictKind, DaySnapshot, ProposalFilter,
    Store, StoreError,
};

const ATTENDANCE_COLUMNS: &str =
    "id, employee_id, work_date, clock_in, clock_out, status, notes";
const BREAK_COLUMNS: &str = "id, attendance_id, start_at, end_at";
const ATTENDANCE_PROPOSAL_COLUMNS: &str = "id, employee_id, attendance_id, target_day, kind, \
     status, proposed_clock_in, proposed_clock_out, notes, clear_notes, break_payload, \
     submitted_by, created_at";
const BREAK_PROPOSAL_COLUMNS: &str = "id, employee_id, break_id, attendance_id, target_day, \
     status, proposed_start, proposed_end, submitted_by, created_at";

#[derive(FromRow)]
struct AttendanceRow {
    id: u64,
    employee_id: u64,
    work_date: NaiveDate,
    clock_in: Option<NaiveDateTime>,
    clock_out: Option<NaiveDateTime>,
    status: String,
    notes: Option<String>,
}

impl TryFrom<AttendanceRow> for Attendance {
    type Error = StoreError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        Ok(Attendance {
            id: row.id,
            employee_id: row.employee_id,
            work_date: row.work_date,
            clock_in: row.clock_in,
            clock_out: row.clock_out,
            status: row.status.parse()?,
            notes: row.notes,
        })
    }
}

#[derive(FromRow)]
struct BreakRow {
    id: u64,
    attendance_id: u64,
    start_at: NaiveDateTime,
    end_at: Option<NaiveDateTime>,
}

impl From<BreakRow> for BreakInterval {
    fn from(row: BreakRow) -> Self {
        BreakInterval {
            id: row.id,
            attendance_id: row.attendance_id,
            start: row.start_at,
            end: row.end_at,
        }
    }
}

#[derive(FromRow)]
struct AttendanceProposalRow {
    id: u64,
    employee_id: u64,
    attendance_id: Option<u64>,
    target_day: NaiveDate,
    kind: String,
    status: String,
    proposed_clock_in: Option<NaiveDateTime>,
    proposed_clock_out: Option<NaiveDateTime>,
    notes: Option<String>,
    clear_notes: bool,
    break_payload: Option<String>,
    submitted_by: u64,
    created_at: NaiveDateTime,
}

impl TryFrom<AttendanceProposalRow> for AttendanceProposal {
    type Error = StoreError;

    fn try_from(row: AttendanceProposalRow) -> Result<Self, Self::Error> {
        let break_payload: Vec<Span> = match row.break_payload.as_deref() {
            Some(json) if !json.is_empty() => serde_json::from_str(json)?,
            _ => Vec::new(),
        };

        Ok(AttendanceProposal {
            id: row.id,
            employee_id: row.employee_id,
            attendance_id: row.attendance_id,
            target_day: row.target_day,
            kind: row.kind.parse()?,
            status: row.status.parse()?,
            proposed_clock_in: row.proposed_clock_in,
            proposed_clock_out: row.proposed_clock_out,
            notes: Patch::from_parts(row.notes, row.clear_notes),
            break_payload,
            submitted_by: row.submitted_by,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct BreakProposalRow {
    id: u64,
    employee_id: u64,
    break_id: Option<u64>,
    attendance_id: Option<u64>,
    target_day: NaiveDate,
    status: String,
    proposed_start: NaiveDateTime,
    proposed_end: Option<NaiveDateTime>,
    submitted_by: u64,
    created_at: NaiveDateTime,
}

impl TryFrom<BreakProposalRow> for BreakProposal {
    type Error = StoreError;

    fn try_from(row: BreakProposalRow) -> Result<Self, Self::Error> {
        Ok(BreakProposal {
            id: row.id,
            employee_id: row.employee_id,
            break_id: row.break_id,
            attendance_id: row.attendance_id,
            target_day: row.target_day,
            status: row.status.parse()?,
            proposed_start: row.proposed_start,
            proposed_end: row.proposed_end,
            submitted_by: row.submitted_by,
            created_at: row.created_at,
        })
    }
}

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

/// Maps a duplicate-key failure onto the rule it broke.
fn classify(err: sqlx::Error, on_duplicate: ConflictKind) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23000") && db_err.message().contains("Duplicate") {
            return StoreError::Conflict(on_duplicate);
        }
    }
    StoreError::Database(err)
}

fn resolve(attendance: AttendanceRef, receipt: &CommitReceipt) -> Result<u64, StoreError> {
    receipt.resolve(attendance).ok_or(StoreError::MissingRow {
        entity: "attendance",
        id: 0,
    })
}

/// Backend over the tables created by `migrations/`.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn breaks_for(&self, attendance_ids: &[u64]) -> Result<Vec<BreakInterval>, StoreError> {
        if attendance_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; attendance_ids.len()].join(", ");
        let sql = format!(
            "SELECT {BREAK_COLUMNS} FROM break_intervals \
             WHERE attendance_id IN ({placeholders}) ORDER BY start_at, id"
        );
        let mut query = sqlx::query_as::<_, BreakRow>(&sql);
        for id in attendance_ids {
            query = query.bind(*id);
        }

        Ok(query
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(BreakInterval::from)
            .collect())
    }

    async fn apply(
        tx: &mut Transaction<'static, MySql>,
        change: Change,
        receipt: &mut CommitReceipt,
    ) -> Result<(), StoreError> {
        match change {
            Change::InsertAttendance(new) => {
                let result = sqlx::query(
                    r#"
                    INSERT INTO attendances
                        (employee_id, work_date, clock_in, clock_out, status, notes)
                    VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(new.employee_id)
                .bind(new.work_date)
                .bind(new.clock_in)
                .bind(new.clock_out)
                .bind(new.status.as_ref())
                .bind(new.notes)
                .execute(&mut **tx)
                .await
                .map_err(|e| classify(e, ConflictKind::AttendanceDay))?;
                receipt.attendance_id = Some(result.last_insert_id());
            }
            Change::UpdateAttendance(attendance) => {
                let result = sqlx::query(
                    r#"
                    UPDATE attendances
                    SET clock_in = ?, clock_out = ?, status = ?, notes = ?
                    WHERE id = ?
                    "#,
                )
                .bind(attendance.clock_in)
                .bind(attendance.clock_out)
                .bind(attendance.status.as_ref())
                .bind(attendance.notes)
                .bind(attendance.id)
                .execute(&mut **tx)
                .await?;
                if result.rows_affected() == 0 {
                    // MySQL reports 0 for unchanged rows too; confirm the row exists.
                    let exists = sqlx::query_scalar::<_, i64>(
                        "SELECT EXISTS(SELECT 1 FROM attendances WHERE id = ?)",
                    )
                    .bind(attendance.id)
                    .fetch_one(&mut **tx)
                    .await?;
                    if exists == 0 {
                        return Err(StoreError::MissingRow {
                            entity: "attendance",
                            id: attendance.id,
                        });
                    }
                }
            }
            Change::InsertBreak { attendance, span } => {
                let attendance_id = resolve(attendance, receipt)?;
                let result = sqlx::query(
                    "INSERT INTO break_intervals (attendance_id, start_at, end_at) VALUES (?, ?, ?)",
                )
                .bind(attendance_id)
                .bind(span.start)
                .bind(span.end)
                .execute(&mut **tx)
                .await?;
                receipt.break_ids.push(result.last_insert_id());
            }
            Change::UpdateBreak(interval) => {
                sqlx::query("UPDATE break_intervals SET start_at = ?, end_at = ? WHERE id = ?")
                    .bind(interval.start)
                    .bind(interval.end)
                    .bind(interval.id)
                    .execute(&mut **tx)
                    .await?;
            }
            Change::DeleteBreak(id) => {
                sqlx::query("DELETE FROM break_intervals WHERE id = ?")
                    .bind(id)
                    .execute(&mut **tx)
                    .await?;
            }
            Change::InsertAttendanceProposal(new) => {
                let attendance_id = match new.attendance {
                    Some(r) => Some(resolve(r, receipt)?),
                    None => None,
                };
                let payload = if new.break_payload.is_empty() {
                    None
                } else {
                    Some(serde_json::to_string(&new.break_payload)?)
                };
                let result = sqlx::query(
                    r#"
                    INSERT INTO attendance_proposals
                        (employee_id, attendance_id, target_day, kind, status,
                         proposed_clock_in, proposed_clock_out, notes, clear_notes,
                         break_payload, submitted_by, created_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(new.employee_id)
                .bind(attendance_id)
                .bind(new.target_day)
                .bind(new.kind.as_ref())
                .bind(new.status.as_ref())
                .bind(new.proposed_clock_in)
                .bind(new.proposed_clock_out)
                .bind(new.notes.as_option().cloned())
                .bind(new.notes.is_clear())
                .bind(payload)
                .bind(new.submitted_by)
                .bind(new.created_at)
                .execute(&mut **tx)
                .await
                .map_err(|e| {
                    classify(
                        e,
                        ConflictKind::PendingProposal {
                            day: new.target_day,
                        },
                    )
                })?;
                receipt.attendance_proposal_ids.push(result.last_insert_id());
            }
            Change::InsertBreakProposal(new) => {
                let result = sqlx::query(
                    r#"
                    INSERT INTO break_proposals
                        (employee_id, break_id, attendance_id, target_day, status,
                         proposed_start, proposed_end, submitted_by, created_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(new.employee_id)
                .bind(new.break_id)
                .bind(new.attendance_id)
                .bind(new.target_day)
                .bind(new.status.as_ref())
                .bind(new.proposed_start)
                .bind(new.proposed_end)
                .bind(new.submitted_by)
                .bind(new.created_at)
                .execute(&mut **tx)
                .await?;
                receipt.break_proposal_ids.push(result.last_insert_id());
            }
            Change::ApproveAttendanceProposal { id, attendance } => {
                let link = match attendance {
                    Some(r) => Some(resolve(r, receipt)?),
                    None => None,
                };
                let result = sqlx::query(
                    r#"
                    UPDATE attendance_proposals
                    SET status = 'approved', attendance_id = COALESCE(?, attendance_id)
                    WHERE id = ?
                    AND status = 'pending'
                    "#,
                )
                .bind(link)
                .bind(id)
                .execute(&mut **tx)
                .await?;
                if result.rows_affected() == 0 {
                    return Err(StoreError::Conflict(ConflictKind::AlreadyDecided {
                        proposal_id: id,
                    }));
                }
            }
            Change::ApproveBreakProposal { id, attendance } => {
                let link = match attendance {
                    Some(r) => Some(resolve(r, receipt)?),
                    None => None,
                };
                let result = sqlx::query(
                    r#"
                    UPDATE break_proposals
                    SET status = 'approved', attendance_id = COALESCE(?, attendance_id)
                    WHERE id = ?
                    AND status = 'pending'
                    "#,
                )
                .bind(link)
                .bind(id)
                .execute(&mut **tx)
                .await?;
                if result.rows_affected() == 0 {
                    return Err(StoreError::Conflict(ConflictKind::AlreadyDecided {
                        proposal_id: id,
                    }));
                }
            }
        }
        Ok(())
    }
}

impl Store for MySqlStore {
    async fn load_day(&self, employee_id: u64, day: NaiveDate) -> Result<DaySnapshot, StoreError> {
        let mut snapshots = self.load_range(employee_id, day, day).await?;
        Ok(snapshots
            .pop()
            .unwrap_or_else(|| DaySnapshot::empty(employee_id, day)))
    }

    async fn load_range(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DaySnapshot>, StoreError> {
        let mut days: BTreeMap<NaiveDate, DaySnapshot> = BTreeMap::new();
        let mut day_of_attendance: HashMap<u64, NaiveDate> = HashMap::new();

        let attendances = sqlx::query_as::<_, AttendanceRow>(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendances \
             WHERE employee_id = ? AND work_date BETWEEN ? AND ?"
        ))
        .bind(employee_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        for row in attendances {
            let attendance = Attendance::try_from(row)?;
            let day = attendance.work_date;
            day_of_attendance.insert(attendance.id, day);
            days.entry(day)
                .or_insert_with(|| DaySnapshot::empty(employee_id, day))
                .attendance = Some(attendance);
        }

        let ids: Vec<u64> = day_of_attendance.keys().copied().collect();
        for interval in self.breaks_for(&ids).await? {
            if let Some(day) = day_of_attendance.get(&interval.attendance_id) {
                if let Some(snapshot) = days.get_mut(day) {
                    snapshot.breaks.push(interval);
                }
            }
        }

        let proposals = sqlx::query_as::<_, AttendanceProposalRow>(&format!(
            "SELECT {ATTENDANCE_PROPOSAL_COLUMNS} FROM attendance_proposals \
             WHERE employee_id = ? AND target_day BETWEEN ? AND ? ORDER BY id"
        ))
        .bind(employee_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        for row in proposals {
            let proposal = AttendanceProposal::try_from(row)?;
            days.entry(proposal.target_day)
                .or_insert_with(|| DaySnapshot::empty(employee_id, proposal.target_day))
                .attendance_proposals
                .push(proposal);
        }

        let break_proposals = sqlx::query_as::<_, BreakProposalRow>(&format!(
            "SELECT {BREAK_PROPOSAL_COLUMNS} FROM break_proposals \
             WHERE employee_id = ? AND target_day BETWEEN ? AND ? ORDER BY id"
        ))
        .bind(employee_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        for row in break_proposals {
            let proposal = BreakProposal::try_from(row)?;
            days.entry(proposal.target_day)
                .or_insert_with(|| DaySnapshot::empty(employee_id, proposal.target_day))
                .break_proposals
                .push(proposal);
        }

        Ok(days.into_values().collect())
    }

    async fn find_attendance_proposal(
        &self,
        id: u64,
    ) -> Result<Option<AttendanceProposal>, StoreError> {
        sqlx::query_as::<_, AttendanceProposalRow>(&format!(
            "SELECT {ATTENDANCE_PROPOSAL_COLUMNS} FROM attendance_proposals WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(AttendanceProposal::try_from)
        .transpose()
    }

    async fn find_break_proposal(&self, id: u64) -> Result<Option<BreakProposal>, StoreError> {
        sqlx::query_as::<_, BreakProposalRow>(&format!(
            "SELECT {BREAK_PROPOSAL_COLUMNS} FROM break_proposals WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(BreakProposal::try_from)
        .transpose()
    }

    async fn list_attendance_proposals(
        &self,
        filter: ProposalFilter,
    ) -> Result<Vec<AttendanceProposal>, StoreError> {
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();

        if let Some(employee_id) = filter.employee_id {
            where_sql.push_str(" AND employee_id = ?");
            args.push(FilterValue::U64(employee_id));
        }

        if let Some(status) = filter.status {
            where_sql.push_str(" AND status = ?");
            args.push(FilterValue::Str(match status {
                ProposalStatus::Pending => "pending",
                ProposalStatus::Approved => "approved",
            }));
        }

        let sql = format!(
            "SELECT {ATTENDANCE_PROPOSAL_COLUMNS} FROM attendance_proposals{where_sql} \
             ORDER BY id DESC"
        );
        let mut query = sqlx::query_as::<_, AttendanceProposalRow>(&sql);
        for arg in args {
            query = match arg {
                FilterValue::U64(v) => query.bind(v),
                FilterValue::Str(s) => query.bind(s),
            };
        }

        query
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(AttendanceProposal::try_from)
            .collect()
    }

    async fn commit(&self, changeset: Changeset) -> Result<CommitReceipt, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut receipt = CommitReceipt::default();

        for change in changeset.into_changes() {
            Self::apply(&mut tx, change, &mut receipt).await?;
        }

        tx.commit().await?;
        Ok(receipt)
    }

    async fn purge_employee(&self, employee_id: u64) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut removed = 0;

        for sql in [
            "DELETE b FROM break_intervals b JOIN attendances a ON a.id = b.attendance_id \
             WHERE a.employee_id = ?",
            "DELETE FROM attendances WHERE employee_id = ?",
            "DELETE FROM attendance_proposals WHERE employee_id = ?",
            "DELETE FROM break_proposals WHERE employee_id = ?",
        ] {
            removed += sqlx::query(sql)
                .bind(employee_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }

        tx.commit().await?;
        Ok(removed)
    }
}
