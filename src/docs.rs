use crate::api::admin::ProposalQuery;
use crate::api::attendance::{DayQuery, MonthQuery};
use crate::error::FieldError;
use crate::model::{
    Attendance, AttendanceProposal, AttendanceStatus, BreakInterval, BreakProposal, DayState,
    ProposalKind, ProposalStatus, Span,
};
use crate::service::{
    AdminAttendanceEdit, ApprovalOutcome, AttendanceCorrection, BreakCorrection, CalendarDay,
    ClockOutOutcome, CorrectionReceipt, DisplayBreak, DisplaySource, MonthlyReport, MonthlySummary,
    OverlayResult, ProposalDetail, ProposalSummary, TodayStatus,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Timecard API",
        version = "0.1.0",
        description = r#"
## Work-session tracking with correction approval

Employees clock in and out, take breaks, and file corrections for past days.
Corrections stay pending until HR or an admin approves them.

### 🔹 Key Features
- **Clocking**
  - Clock in, start and end breaks, clock out
- **Corrections**
  - Propose new values for a day or a single break
  - While a correction is pending the day shows the proposed values and cannot be edited
- **Approvals**
  - Approve corrections, or edit a day directly (retiring whatever was pending)
- **Reports**
  - Monthly calendar with worked and break hours

### 🔐 Security
All endpoints require a **JWT Bearer** access token.
Approvals and direct edits are limited to **Admin** and **HR**.

### 📦 Errors
Failures return `{"message", "code"}`; validation failures add a `fields` list.
"#,
    ),
    paths(
        crate::api::attendance::clock_in,
        crate::api::attendance::break_start,
        crate::api::attendance::break_end,
        crate::api::attendance::clock_out,
        crate::api::attendance::today,
        crate::api::attendance::day_detail,
        crate::api::attendance::monthly,

        crate::api::correction::submit_correction,
        crate::api::correction::submit_break_correction,

        crate::api::admin::list_proposals,
        crate::api::admin::get_proposal,
        crate::api::admin::approve_proposal,
        crate::api::admin::approve_break_proposal,
        crate::api::admin::upsert_attendance,
        crate::api::admin::purge_employee
    ),
    components(
        schemas(
            Attendance,
            AttendanceStatus,
            DayState,
            BreakInterval,
            Span,
            AttendanceProposal,
            BreakProposal,
            ProposalKind,
            ProposalStatus,
            FieldError,
            TodayStatus,
            ClockOutOutcome,
            AttendanceCorrection,
            BreakCorrection,
            CorrectionReceipt,
            DisplaySource,
            DisplayBreak,
            OverlayResult,
            CalendarDay,
            MonthlySummary,
            MonthlyReport,
            ProposalSummary,
            ProposalDetail,
            AdminAttendanceEdit,
            ApprovalOutcome,
            DayQuery,
            MonthQuery,
            ProposalQuery
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Clocking and day views"),
        (name = "Corrections", description = "Employee correction requests"),
        (name = "Approvals", description = "HR/Admin review and direct edits"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented_with_bearer_auth() {
        let doc = ApiDoc::openapi();
        assert_eq!(doc.paths.paths.len(), 15);
        assert!(doc.paths.paths.contains_key("/api/attendance/{date}"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
