//! What a day looks like to a reader.
//!
//! A pending proposal overlays the stored rows, and stored rows overlay an
//! empty day. Every read path goes through [`resolve`].

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AttendanceResult;
use crate::model::{Actor, AttendanceStatus, ProposalKind, Span};
use crate::service::AttendanceService;
use crate::service::duration::{self, DayTotals, HourStyle};
use crate::store::{DaySnapshot, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DisplaySource {
    /// Values of a proposal awaiting approval.
    Proposal,
    Actual,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DisplayBreak {
    /// The stored interval shown or targeted, if any.
    pub break_id: Option<u64>,
    /// The proposal the values come from, if any.
    pub proposal_id: Option<u64>,
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
}

impl DisplayBreak {
    fn span(&self) -> Span {
        Span {
            start: self.start,
            end: self.end,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct OverlayResult {
    pub employee_id: u64,
    pub day: NaiveDate,
    pub source: DisplaySource,
    /// False while anything for the day awaits approval.
    pub editable: bool,
    pub attendance_id: Option<u64>,
    pub status: Option<AttendanceStatus>,
    pub clock_in: Option<NaiveDateTime>,
    pub clock_out: Option<NaiveDateTime>,
    pub notes: Option<String>,
    pub breaks: Vec<DisplayBreak>,
    /// `HH:MM`, empty when unknown.
    #[schema(example = "09:00")]
    pub clock_in_text: String,
    #[schema(example = "18:00")]
    pub clock_out_text: String,
    /// `HH:MM` worked, empty unless both clock-in and clock-out are known.
    #[schema(example = "08:00")]
    pub work_time: String,
    #[schema(example = "01:00")]
    pub break_time: String,
    pub pending_attendance_proposal_id: Option<u64>,
    pub pending_break_proposal_ids: Vec<u64>,
}

impl OverlayResult {
    pub fn has_pending(&self) -> bool {
        !self.editable
    }

    pub fn totals(&self) -> Option<DayTotals> {
        let spans: Vec<Span> = self.breaks.iter().map(DisplayBreak::span).collect();
        DayTotals::of(self.clock_in, self.clock_out, &spans)
    }
}

fn time_text(at: Option<NaiveDateTime>) -> String {
    at.map(|t| t.format("%H:%M").to_string()).unwrap_or_default()
}

pub fn resolve(snapshot: &DaySnapshot) -> OverlayResult {
    let actual = snapshot.attendance.as_ref();
    let pending = snapshot.pending_attendance_proposal();
    let pending_breaks: Vec<_> = snapshot.pending_break_proposals().collect();
    let has_pending = pending.is_some() || !pending_breaks.is_empty();

    let (clock_in, clock_out, notes) = match pending {
        Some(p) => (p.proposed_clock_in, p.proposed_clock_out, p.notes.as_option().cloned()),
        None => (
            actual.and_then(|a| a.clock_in),
            actual.and_then(|a| a.clock_out),
            actual.and_then(|a| a.notes.clone()),
        ),
    };

    // A create proposal brings the whole list; otherwise the stored intervals
    // are the base and break proposals patch them one by one.
    let mut breaks: Vec<DisplayBreak> = match pending.filter(|p| p.kind == ProposalKind::Create) {
        Some(create) => create
            .break_payload
            .iter()
            .map(|span| DisplayBreak {
                break_id: None,
                proposal_id: Some(create.id),
                start: span.start,
                end: span.end,
            })
            .collect(),
        None => snapshot
            .breaks
            .iter()
            .map(|b| DisplayBreak {
                break_id: Some(b.id),
                proposal_id: None,
                start: b.start,
                end: b.end,
            })
            .collect(),
    };
    for bp in &pending_breaks {
        let proposed = DisplayBreak {
            break_id: bp.break_id,
            proposal_id: Some(bp.id),
            start: bp.proposed_start,
            end: bp.proposed_end,
        };
        let target = match bp.break_id {
            Some(id) => breaks.iter_mut().find(|b| b.break_id == Some(id)),
            None => None,
        };
        match target {
            Some(shown) => *shown = proposed,
            None => breaks.push(proposed),
        }
    }
    breaks.sort_by_key(|b| b.start);

    let source = if has_pending {
        DisplaySource::Proposal
    } else if actual.is_some() {
        DisplaySource::Actual
    } else {
        DisplaySource::Empty
    };

    let spans: Vec<Span> = breaks.iter().map(DisplayBreak::span).collect();
    let work_time = DayTotals::of(clock_in, clock_out, &spans)
        .map(|t| duration::format_minutes(t.work_minutes, HourStyle::ZeroPadded))
        .unwrap_or_default();
    let break_time = if spans.is_empty() {
        String::new()
    } else {
        duration::format_minutes(duration::break_minutes(&spans), HourStyle::ZeroPadded)
    };

    OverlayResult {
        employee_id: snapshot.employee_id,
        day: snapshot.day,
        source,
        editable: !has_pending,
        attendance_id: actual.map(|a| a.id),
        status: actual.map(|a| a.status),
        clock_in,
        clock_out,
        notes,
        breaks,
        clock_in_text: time_text(clock_in),
        clock_out_text: time_text(clock_out),
        work_time,
        break_time,
        pending_attendance_proposal_id: pending.map(|p| p.id),
        pending_break_proposal_ids: pending_breaks.iter().map(|bp| bp.id).collect(),
    }
}

impl<S: Store> AttendanceService<S> {
    pub async fn get_display_data(
        &self,
        actor: &Actor,
        employee_id: u64,
        day: NaiveDate,
    ) -> AttendanceResult<OverlayResult> {
        actor.require_view(employee_id)?;
        let snapshot = self.store.load_day(employee_id, day).await?;
        Ok(resolve(&snapshot))
    }
}
