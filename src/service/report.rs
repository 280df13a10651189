use std::collections::BTreeMap;

use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{AttendanceError, AttendanceResult, FieldError};
use crate::model::{Actor, AttendanceProposal, BreakProposal};
use crate::service::AttendanceService;
use crate::service::duration::{self, MonthlySummary};
use crate::service::overlay::{self, OverlayResult};
use crate::store::{DaySnapshot, ProposalFilter, Store};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CalendarDay {
    pub day: NaiveDate,
    #[schema(example = "Mon")]
    pub weekday: String,
    pub display: OverlayResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MonthlyReport {
    pub employee_id: u64,
    pub year: i32,
    pub month: u32,
    /// Every day of the month, in order.
    pub calendar: Vec<CalendarDay>,
    pub summary: MonthlySummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ProposalSummary {
    pub proposal: AttendanceProposal,
    /// The proposal's day as a reader currently sees it.
    pub display: OverlayResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ProposalDetail {
    pub proposal: AttendanceProposal,
    /// Break proposals filed for the same day.
    pub break_proposals: Vec<BreakProposal>,
    pub display: OverlayResult,
}

fn month_bounds(year: i32, month: u32) -> AttendanceResult<(NaiveDate, NaiveDate)> {
    let invalid = || {
        AttendanceError::ValidationFailed(vec![FieldError::new("month", "must be between 1 and 12")])
    };
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or_else(invalid)?;
    Ok((first, last))
}

/// Lays stored days over a full calendar month and totals it.
pub fn build_month(
    employee_id: u64,
    first: NaiveDate,
    last: NaiveDate,
    snapshots: Vec<DaySnapshot>,
) -> (Vec<CalendarDay>, MonthlySummary) {
    let mut stored: BTreeMap<NaiveDate, DaySnapshot> =
        snapshots.into_iter().map(|s| (s.day, s)).collect();

    let calendar: Vec<CalendarDay> = first
        .iter_days()
        .take_while(|day| *day <= last)
        .map(|day| {
            let snapshot = stored
                .remove(&day)
                .unwrap_or_else(|| DaySnapshot::empty(employee_id, day));
            CalendarDay {
                day,
                weekday: day.format("%a").to_string(),
                display: overlay::resolve(&snapshot),
            }
        })
        .collect();

    let summary = duration::summarize(calendar.iter().filter_map(|d| d.display.totals()));
    (calendar, summary)
}

impl<S: Store> AttendanceService<S> {
    pub async fn get_monthly_summary(
        &self,
        actor: &Actor,
        employee_id: u64,
        year: i32,
        month: u32,
    ) -> AttendanceResult<MonthlyReport> {
        actor.require_view(employee_id)?;
        let (first, last) = month_bounds(year, month)?;

        let snapshots = self.store.load_range(employee_id, first, last).await?;
        let (calendar, summary) = build_month(employee_id, first, last, snapshots);

        Ok(MonthlyReport {
            employee_id,
            year: first.year(),
            month: first.month(),
            calendar,
            summary,
        })
    }

    /// Reviewers see every employee; employees only their own proposals.
    pub async fn list_attendance_proposals(
        &self,
        actor: &Actor,
        mut filter: ProposalFilter,
    ) -> AttendanceResult<Vec<ProposalSummary>> {
        if !actor.role.is_reviewer() {
            filter.employee_id = Some(actor.acting_employee()?);
        }

        let proposals = self.store.list_attendance_proposals(filter).await?;
        let mut days: BTreeMap<(u64, NaiveDate), OverlayResult> = BTreeMap::new();
        let mut summaries = Vec::with_capacity(proposals.len());
        for proposal in proposals {
            let key = (proposal.employee_id, proposal.target_day);
            let display = match days.get(&key) {
                Some(display) => display.clone(),
                None => {
                    let snapshot = self.store.load_day(key.0, key.1).await?;
                    let display = overlay::resolve(&snapshot);
                    days.insert(key, display.clone());
                    display
                }
            };
            summaries.push(ProposalSummary { proposal, display });
        }
        Ok(summaries)
    }

    pub async fn get_attendance_proposal(
        &self,
        actor: &Actor,
        proposal_id: u64,
    ) -> AttendanceResult<ProposalDetail> {
        let proposal = self
            .store
            .find_attendance_proposal(proposal_id)
            .await?
            .ok_or_else(|| AttendanceError::not_found("attendance_proposal", proposal_id))?;
        actor.require_view(proposal.employee_id)?;

        let snapshot = self
            .store
            .load_day(proposal.employee_id, proposal.target_day)
            .await?;
        Ok(ProposalDetail {
            display: overlay::resolve(&snapshot),
            break_proposals: snapshot.break_proposals,
            proposal,
        })
    }

    /// Removes all attendance data of an employee leaving the directory.
    pub async fn purge_employee(&self, actor: &Actor, employee_id: u64) -> AttendanceResult<u64> {
        actor.require_reviewer()?;
        let _guard = self.locks.acquire(employee_id).await;

        let removed = self.store.purge_employee(employee_id).await?;
        tracing::info!(employee_id, removed, reviewer = actor.user_id, "Employee attendance purged");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attendance, AttendanceStatus};

    #[test]
    fn month_bounds_cover_leap_february() {
        let (first, last) = month_bounds(2028, 2).unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2028, 2, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2028, 2, 29).unwrap());
        assert!(matches!(
            month_bounds(2026, 13),
            Err(AttendanceError::ValidationFailed(_))
        ));
    }

    #[test]
    fn calendar_lists_every_day_and_totals_complete_ones() {
        let (first, last) = month_bounds(2026, 1).unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let open_day = NaiveDate::from_ymd_opt(2026, 1, 6).unwrap();

        let row = |id, work_date: NaiveDate, clock_out| Attendance {
            id,
            employee_id: 7,
            work_date,
            clock_in: work_date.and_hms_opt(9, 0, 0),
            clock_out,
            status: AttendanceStatus::Completed,
            notes: None,
        };
        let mut done = DaySnapshot::empty(7, day);
        done.attendance = Some(row(1, day, day.and_hms_opt(17, 30, 0)));
        let mut open = DaySnapshot::empty(7, open_day);
        open.attendance = Some(row(2, open_day, None));

        let (calendar, summary) = build_month(7, first, last, vec![done, open]);
        assert_eq!(calendar.len(), 31);
        assert_eq!(calendar[4].weekday, "Mon");
        assert_eq!(calendar[4].display.work_time, "08:30");
        assert_eq!(summary.work_days, 1);
        assert_eq!(summary.total_work_hours, 8.5);
        assert_eq!(summary.total_break_hours, 0.0);
    }
}
