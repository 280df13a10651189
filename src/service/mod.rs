//! The attendance core: clocking, corrections, overlay reads and approvals.
//!
//! Every command takes an explicit [`Actor`](crate::model::Actor), holds the
//! target employee's lock for the whole read-check-write, and commits its
//! writes as one [`Changeset`](crate::store::Changeset).

pub mod clock;
pub mod correction;
pub mod duration;
pub mod locks;
pub mod overlay;
pub mod reconcile;
pub mod report;
pub mod state_machine;

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};

use crate::store::Storage;

pub use clock::{Clock, FixedClock, SystemClock};
pub use correction::{AttendanceCorrection, BreakCorrection, CorrectionReceipt};
pub use duration::{HourStyle, MonthlySummary};
pub use locks::EmployeeLocks;
pub use overlay::{DisplayBreak, DisplaySource, OverlayResult};
pub use reconcile::{AdminAttendanceEdit, ApprovalOutcome};
pub use report::{CalendarDay, MonthlyReport, ProposalDetail, ProposalSummary};
pub use state_machine::{ClockOutOutcome, TodayStatus};

pub struct AttendanceService<S> {
    store: S,
    clock: Arc<dyn Clock>,
    locks: EmployeeLocks,
}

/// The service as wired up by the binary.
pub type AppService = AttendanceService<Storage>;

impl<S> AttendanceService<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>, lock_idle: Duration) -> Self {
        Self {
            store,
            clock,
            locks: EmployeeLocks::new(lock_idle),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }
}
