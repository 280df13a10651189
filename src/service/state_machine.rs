use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{AttendanceError, AttendanceResult};
use crate::model::{
    Actor, Attendance, AttendanceStatus, BreakInterval, DayState, NewAttendance, Span,
};
use crate::service::AttendanceService;
use crate::store::{AttendanceRef, Change, Changeset, DaySnapshot, Store};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TodayStatus {
    pub employee_id: u64,
    pub day: NaiveDate,
    pub state: DayState,
    pub attendance: Option<Attendance>,
    pub breaks: Vec<BreakInterval>,
    /// A correction for today is awaiting approval.
    pub has_pending: bool,
}

impl TodayStatus {
    fn of(snapshot: DaySnapshot) -> Self {
        let has_pending = snapshot.has_pending();
        Self {
            employee_id: snapshot.employee_id,
            day: snapshot.day,
            state: DayState::of(snapshot.attendance.as_ref()),
            attendance: snapshot.attendance,
            breaks: snapshot.breaks,
            has_pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ClockOutOutcome {
    pub attendance: Attendance,
    /// Clocked out while a break was still running; that interval stays open.
    pub open_break_left: bool,
}

pub fn plan_clock_in(snapshot: &DaySnapshot, now: NaiveDateTime) -> AttendanceResult<Changeset> {
    if snapshot.attendance.is_some() {
        return Err(AttendanceError::AlreadyClockedIn);
    }

    let mut changes = Changeset::new();
    changes.push(Change::InsertAttendance(NewAttendance {
        employee_id: snapshot.employee_id,
        work_date: now.date(),
        clock_in: Some(now),
        clock_out: None,
        status: AttendanceStatus::Working,
        notes: None,
    }));
    Ok(changes)
}

pub fn plan_break_start(snapshot: &DaySnapshot, now: NaiveDateTime) -> AttendanceResult<Changeset> {
    let attendance = match &snapshot.attendance {
        Some(a) if a.status == AttendanceStatus::Working => a,
        _ => return Err(AttendanceError::InvalidStateForBreakStart),
    };

    let mut changes = Changeset::new();
    changes
        .push(Change::InsertBreak {
            attendance: AttendanceRef::Existing(attendance.id),
            span: Span::open(now),
        })
        .push(Change::UpdateAttendance(Attendance {
            status: AttendanceStatus::Break,
            ..attendance.clone()
        }));
    Ok(changes)
}

pub fn plan_break_end(snapshot: &DaySnapshot, now: NaiveDateTime) -> AttendanceResult<Changeset> {
    let attendance = match &snapshot.attendance {
        Some(a) if a.status == AttendanceStatus::Break => a,
        _ => return Err(AttendanceError::InvalidStateForBreakEnd),
    };
    let open = snapshot
        .open_break()
        .ok_or(AttendanceError::InvalidStateForBreakEnd)?;

    let mut changes = Changeset::new();
    changes
        .push(Change::UpdateBreak(BreakInterval {
            end: Some(now),
            ..open.clone()
        }))
        .push(Change::UpdateAttendance(Attendance {
            status: AttendanceStatus::Working,
            ..attendance.clone()
        }));
    Ok(changes)
}

/// Allowed from any non-completed state, including a running break. Returns
/// whether an open interval was left behind.
pub fn plan_clock_out(
    snapshot: &DaySnapshot,
    now: NaiveDateTime,
) -> AttendanceResult<(Changeset, bool)> {
    let attendance = match &snapshot.attendance {
        Some(a) if a.status != AttendanceStatus::Completed => a,
        _ => return Err(AttendanceError::InvalidStateForClockOut),
    };

    let mut changes = Changeset::new();
    changes.push(Change::UpdateAttendance(Attendance {
        clock_out: Some(now),
        status: AttendanceStatus::Completed,
        ..attendance.clone()
    }));
    Ok((changes, snapshot.open_break().is_some()))
}

impl<S: Store> AttendanceService<S> {
    pub async fn clock_in(&self, actor: &Actor) -> AttendanceResult<Attendance> {
        let employee_id = actor.acting_employee()?;
        let _guard = self.locks.acquire(employee_id).await;

        let now = self.now();
        let snapshot = self.store.load_day(employee_id, now.date()).await?;
        self.store.commit(plan_clock_in(&snapshot, now)?).await?;

        tracing::info!(employee_id, at = %now, "Clocked in");
        self.reload_attendance(employee_id, now.date()).await
    }

    pub async fn break_start(&self, actor: &Actor) -> AttendanceResult<Attendance> {
        let employee_id = actor.acting_employee()?;
        let _guard = self.locks.acquire(employee_id).await;

        let now = self.now();
        let snapshot = self.store.load_day(employee_id, now.date()).await?;
        self.store.commit(plan_break_start(&snapshot, now)?).await?;

        tracing::info!(employee_id, at = %now, "Break started");
        self.reload_attendance(employee_id, now.date()).await
    }

    pub async fn break_end(&self, actor: &Actor) -> AttendanceResult<Attendance> {
        let employee_id = actor.acting_employee()?;
        let _guard = self.locks.acquire(employee_id).await;

        let now = self.now();
        let snapshot = self.store.load_day(employee_id, now.date()).await?;
        self.store.commit(plan_break_end(&snapshot, now)?).await?;

        tracing::info!(employee_id, at = %now, "Break ended");
        self.reload_attendance(employee_id, now.date()).await
    }

    pub async fn clock_out(&self, actor: &Actor) -> AttendanceResult<ClockOutOutcome> {
        let employee_id = actor.acting_employee()?;
        let _guard = self.locks.acquire(employee_id).await;

        let now = self.now();
        let snapshot = self.store.load_day(employee_id, now.date()).await?;
        let (changes, open_break_left) = plan_clock_out(&snapshot, now)?;
        self.store.commit(changes).await?;

        if open_break_left {
            tracing::warn!(employee_id, at = %now, "Clocked out during a break; break left open");
        } else {
            tracing::info!(employee_id, at = %now, "Clocked out");
        }

        Ok(ClockOutOutcome {
            attendance: self.reload_attendance(employee_id, now.date()).await?,
            open_break_left,
        })
    }

    pub async fn get_today_status(&self, actor: &Actor) -> AttendanceResult<TodayStatus> {
        let employee_id = actor.acting_employee()?;
        let snapshot = self.store.load_day(employee_id, self.today()).await?;
        Ok(TodayStatus::of(snapshot))
    }

    async fn reload_attendance(&self, employee_id: u64, day: NaiveDate) -> AttendanceResult<Attendance> {
        self.store
            .load_day(employee_id, day)
            .await?
            .attendance
            .ok_or_else(|| AttendanceError::not_found("attendance", format!("{employee_id}/{day}")))
    }
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

    fn snapshot(status: Option<AttendanceStatus>, breaks: Vec<BreakInterval>) -> DaySnapshot {
        let mut snapshot = DaySnapshot::empty(7, at(0, 0).date());
        snapshot.attendance = status.map(|status| Attendance {
            id: 1,
            employee_id: 7,
            work_date: at(0, 0).date(),
            clock_in: Some(at(9, 0)),
            clock_out: None,
            status,
            notes: None,
        });
        snapshot.breaks = breaks;
        snapshot
    }

    fn interval(id: u64, start: NaiveDateTime, end: Option<NaiveDateTime>) -> BreakInterval {
        BreakInterval {
            id,
            attendance_id: 1,
            start,
            end,
        }
    }

    #[test]
    fn clock_in_only_from_absent() {
        let changes = plan_clock_in(&snapshot(None, vec![]), at(9, 0)).unwrap();
        assert_eq!(changes.len(), 1);

        for status in [
            AttendanceStatus::Working,
            AttendanceStatus::Break,
            AttendanceStatus::Completed,
        ] {
            assert!(matches!(
                plan_clock_in(&snapshot(Some(status), vec![]), at(9, 0)),
                Err(AttendanceError::AlreadyClockedIn)
            ));
        }
    }

    #[test]
    fn break_start_needs_working() {
        assert!(plan_break_start(&snapshot(Some(AttendanceStatus::Working), vec![]), at(12, 0)).is_ok());
        for s in [None, Some(AttendanceStatus::Break), Some(AttendanceStatus::Completed)] {
            assert!(matches!(
                plan_break_start(&snapshot(s, vec![]), at(12, 0)),
                Err(AttendanceError::InvalidStateForBreakStart)
            ));
        }
    }

    #[test]
    fn break_end_closes_the_latest_open_interval() {
        let day = snapshot(
            Some(AttendanceStatus::Break),
            vec![
                interval(10, at(10, 0), None),
                interval(11, at(10, 30), Some(at(10, 45))),
                interval(12, at(12, 0), None),
            ],
        );

        let changes = plan_break_end(&day, at(13, 0)).unwrap().into_changes();
        assert_eq!(
            changes[0],
            Change::UpdateBreak(interval(12, at(12, 0), Some(at(13, 0))))
        );
    }

    #[test]
    fn break_end_without_open_interval_fails() {
        let inconsistent = snapshot(
            Some(AttendanceStatus::Break),
            vec![interval(10, at(10, 0), Some(at(10, 15)))],
        );
        assert!(matches!(
            plan_break_end(&inconsistent, at(13, 0)),
            Err(AttendanceError::InvalidStateForBreakEnd)
        ));
        assert!(matches!(
            plan_break_end(&snapshot(Some(AttendanceStatus::Working), vec![]), at(13, 0)),
            Err(AttendanceError::InvalidStateForBreakEnd)
        ));
    }

    #[test]
    fn clock_out_is_permissive_during_a_break() {
        let on_break = snapshot(
            Some(AttendanceStatus::Break),
            vec![interval(10, at(12, 0), None)],
        );
        let (changes, open_break_left) = plan_clock_out(&on_break, at(18, 0)).unwrap();
        assert!(open_break_left);
        // The interval is not touched.
        assert_eq!(changes.len(), 1);

        let (_, open_break_left) =
            plan_clock_out(&snapshot(Some(AttendanceStatus::Working), vec![]), at(18, 0)).unwrap();
        assert!(!open_break_left);
    }

    #[test]
    fn clock_out_needs_an_unfinished_day() {
        for s in [None, Some(AttendanceStatus::Completed)] {
            assert!(matches!(
                plan_clock_out(&snapshot(s, vec![]), at(18, 0)),
                Err(AttendanceError::InvalidStateForClockOut)
            ));
        }
    }
}
