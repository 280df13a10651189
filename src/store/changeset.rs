use crate::model::{Attendance, BreakInterval, NewAttendance, NewAttendanceProposal, NewBreakProposal, Span};

/// Points at an attendance row that either exists already or is inserted
/// earlier in the same changeset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceRef {
    Existing(u64),
    Inserted,
}

/// One write. Changes apply in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    InsertAttendance(NewAttendance),
    UpdateAttendance(Attendance),
    InsertBreak {
        attendance: AttendanceRef,
        span: Span,
    },
    UpdateBreak(BreakInterval),
    DeleteBreak(u64),
    InsertAttendanceProposal(NewAttendanceProposal),
    InsertBreakProposal(NewBreakProposal),
    /// Flips a pending proposal to approved, optionally linking it to an
    /// attendance. Fails if the proposal is no longer pending.
    ApproveAttendanceProposal {
        id: u64,
        attendance: Option<AttendanceRef>,
    },
    ApproveBreakProposal {
        id: u64,
        attendance: Option<AttendanceRef>,
    },
}

/// Writes that must land together or not at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changeset {
    changes: Vec<Change>,
}

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, change: Change) -> &mut Self {
        self.changes.push(change);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.changes.iter()
    }

    pub fn into_changes(self) -> Vec<Change> {
        self.changes
    }
}

impl FromIterator<Change> for Changeset {
    fn from_iter<I: IntoIterator<Item = Change>>(iter: I) -> Self {
        Self {
            changes: iter.into_iter().collect(),
        }
    }
}

/// Ids assigned while committing a changeset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReceipt {
    pub attendance_id: Option<u64>,
    pub break_ids: Vec<u64>,
    pub attendance_proposal_ids: Vec<u64>,
    pub break_proposal_ids: Vec<u64>,
}

impl CommitReceipt {
    /// Resolves a reference once the inserted row has an id.
    pub fn resolve(&self, attendance: AttendanceRef) -> Option<u64> {
        match attendance {
            AttendanceRef::Existing(id) => Some(id),
            AttendanceRef::Inserted => self.attendance_id,
        }
    }
}
