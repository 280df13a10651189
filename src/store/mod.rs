//! Persistence for attendances, break intervals and both proposal kinds.
//!
//! Reads come back as per-day snapshots; writes go through a [`Changeset`]
//! that each backend commits atomically.

pub mod changeset;
pub mod memory;
pub mod mysql;

use chrono::NaiveDate;
use strum::ParseError;
use thiserror::Error;

use crate::model::{Attendance, AttendanceProposal, BreakInterval, BreakProposal, ProposalStatus};

pub use changeset::{AttendanceRef, Change, Changeset, CommitReceipt};
pub use memory::MemoryStore;
pub use mysql::MySqlStore;

/// Which uniqueness rule a write broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// A second attendance for the same (employee, day).
    AttendanceDay,
    /// A second pending attendance proposal for the same (employee, day).
    PendingProposal { day: NaiveDate },
    /// The proposal was decided by someone else first.
    AlreadyDecided { proposal_id: u64 },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Unique constraint violated: {0:?}")]
    Conflict(ConflictKind),

    #[error("Referenced row missing: {entity} {id}")]
    MissingRow { entity: &'static str, id: u64 },

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl From<ParseError> for StoreError {
    fn from(err: ParseError) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}

/// Everything stored for one (employee, day).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySnapshot {
    pub employee_id: u64,
    pub day: NaiveDate,
    pub attendance: Option<Attendance>,
    /// Ordered by start time.
    pub breaks: Vec<BreakInterval>,
    /// Every proposal targeting the day, oldest first.
    pub attendance_proposals: Vec<AttendanceProposal>,
    pub break_proposals: Vec<BreakProposal>,
}

impl DaySnapshot {
    pub fn empty(employee_id: u64, day: NaiveDate) -> Self {
        Self {
            employee_id,
            day,
            attendance: None,
            breaks: Vec::new(),
            attendance_proposals: Vec::new(),
            break_proposals: Vec::new(),
        }
    }

    pub fn pending_attendance_proposal(&self) -> Option<&AttendanceProposal> {
        self.attendance_proposals.iter().find(|p| p.is_pending())
    }

    pub fn pending_break_proposals(&self) -> impl Iterator<Item = &BreakProposal> {
        self.break_proposals.iter().filter(|p| p.is_pending())
    }

    pub fn has_pending(&self) -> bool {
        self.pending_attendance_proposal().is_some() || self.pending_break_proposals().next().is_some()
    }

    /// The most recently opened interval that is still running.
    pub fn open_break(&self) -> Option<&BreakInterval> {
        self.breaks
            .iter()
            .filter(|b| b.is_open())
            .max_by_key(|b| (b.start, b.id))
    }

    pub fn attendance_proposal(&self, id: u64) -> Option<&AttendanceProposal> {
        self.attendance_proposals.iter().find(|p| p.id == id)
    }

    pub fn break_proposal(&self, id: u64) -> Option<&BreakProposal> {
        self.break_proposals.iter().find(|p| p.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.attendance.is_none()
            && self.attendance_proposals.is_empty()
            && self.break_proposals.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProposalFilter {
    pub employee_id: Option<u64>,
    pub status: Option<ProposalStatus>,
}

impl ProposalFilter {
    pub fn matches(&self, proposal: &AttendanceProposal) -> bool {
        self.employee_id.is_none_or(|id| id == proposal.employee_id)
            && self.status.is_none_or(|s| s == proposal.status)
    }
}

/// Storage backend contract.
#[allow(async_fn_in_trait)]
pub trait Store {
    async fn load_day(&self, employee_id: u64, day: NaiveDate) -> Result<DaySnapshot, StoreError>;

    /// Snapshots for every day in `from..=to` that has any stored data.
    async fn load_range(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DaySnapshot>, StoreError>;

    async fn find_attendance_proposal(&self, id: u64)
    -> Result<Option<AttendanceProposal>, StoreError>;

    async fn find_break_proposal(&self, id: u64) -> Result<Option<BreakProposal>, StoreError>;

    /// Newest first.
    async fn list_attendance_proposals(
        &self,
        filter: ProposalFilter,
    ) -> Result<Vec<AttendanceProposal>, StoreError>;

    async fn commit(&self, changeset: Changeset) -> Result<CommitReceipt, StoreError>;

    /// Deletes every row owned by the employee. Returns the number of rows removed.
    async fn purge_employee(&self, employee_id: u64) -> Result<u64, StoreError>;
}

/// The backend picked at startup.
pub enum Storage {
    Memory(MemoryStore),
    MySql(MySqlStore),
}

impl Store for Storage {
    async fn load_day(&self, employee_id: u64, day: NaiveDate) -> Result<DaySnapshot, StoreError> {
        match self {
            Storage::Memory(s) => s.load_day(employee_id, day).await,
            Storage::MySql(s) => s.load_day(employee_id, day).await,
        }
    }

    async fn load_range(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DaySnapshot>, StoreError> {
        match self {
            Storage::Memory(s) => s.load_range(employee_id, from, to).await,
            Storage::MySql(s) => s.load_range(employee_id, from, to).await,
        }
    }

    async fn find_attendance_proposal(
        &self,
        id: u64,
    ) -> Result<Option<AttendanceProposal>, StoreError> {
        match self {
            Storage::Memory(s) => s.find_attendance_proposal(id).await,
            Storage::MySql(s) => s.find_attendance_proposal(id).await,
        }
    }

    async fn find_break_proposal(&self, id: u64) -> Result<Option<BreakProposal>, StoreError> {
        match self {
            Storage::Memory(s) => s.find_break_proposal(id).await,
            Storage::MySql(s) => s.find_break_proposal(id).await,
        }
    }

    async fn list_attendance_proposals(
        &self,
        filter: ProposalFilter,
    ) -> Result<Vec<AttendanceProposal>, StoreError> {
        match self {
            Storage::Memory(s) => s.list_attendance_proposals(filter).await,
            Storage::MySql(s) => s.list_attendance_proposals(filter).await,
        }
    }

    async fn commit(&self, changeset: Changeset) -> Result<CommitReceipt, StoreError> {
        match self {
            Storage::Memory(s) => s.commit(changeset).await,
            Storage::MySql(s) => s.commit(changeset).await,
        }
    }

    async fn purge_employee(&self, employee_id: u64) -> Result<u64, StoreError> {
        match self {
            Storage::Memory(s) => s.purge_employee(employee_id).await,
            Storage::MySql(s) => s.purge_employee(employee_id).await,
        }
    }
}
