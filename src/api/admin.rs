use crate::auth::auth::AuthUser;
use crate::error::AttendanceError;
use crate::model::ProposalStatus;
use crate::service::{AdminAttendanceEdit, AppService};
use crate::store::ProposalFilter;
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct ProposalQuery {
    #[schema(example = 1000)]
    /// Filter by employee ID
    pub employee_id: Option<u64>,
    #[schema(example = "pending")]
    /// Filter by proposal status
    pub status: Option<ProposalStatus>,
}

/* =========================
List proposals
========================= */
#[utoipa::path(
    get,
    path = "/api/admin/proposals",
    params(ProposalQuery),
    responses(
        (status = 200, description = "Proposals, newest first, with the day as currently displayed", body = [crate::service::ProposalSummary]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Approvals"
)]
pub async fn list_proposals(
    auth: AuthUser,
    service: web::Data<AppService>,
    query: web::Query<ProposalQuery>,
) -> Result<HttpResponse, AttendanceError> {
    let filter = ProposalFilter {
        employee_id: query.employee_id,
        status: query.status,
    };
    let proposals = service.list_attendance_proposals(&auth.actor(), filter).await?;
    Ok(HttpResponse::Ok().json(proposals))
}

#[utoipa::path(
    get,
    path = "/api/admin/proposals/{proposal_id}",
    params(
        ("proposal_id" = u64, Path, description = "Attendance proposal ID")
    ),
    responses(
        (status = 200, description = "Proposal with its day's break proposals", body = crate::service::ProposalDetail),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Proposal not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Approvals"
)]
pub async fn get_proposal(
    auth: AuthUser,
    service: web::Data<AppService>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AttendanceError> {
    let detail = service
        .get_attendance_proposal(&auth.actor(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(detail))
}

/* =========================
Approve (HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/admin/proposals/{proposal_id}/approve",
    params(
        ("proposal_id" = u64, Path, description = "ID of the attendance proposal to approve")
    ),
    responses(
        (status = 200, description = "Proposal applied", body = crate::service::ApprovalOutcome),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Proposal not found"),
        (status = 409, description = "Already processed or stale", body = Object, example = json!({
            "message": "Proposal 12 has already been processed",
            "code": "ALREADY_PROCESSED"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Approvals"
)]
pub async fn approve_proposal(
    auth: AuthUser,
    service: web::Data<AppService>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AttendanceError> {
    let outcome = service.approve_proposal(&auth.actor(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

#[utoipa::path(
    put,
    path = "/api/admin/break-proposals/{proposal_id}/approve",
    params(
        ("proposal_id" = u64, Path, description = "ID of the break proposal to approve")
    ),
    responses(
        (status = 200, description = "Break proposal applied", body = crate::service::ApprovalOutcome),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Proposal or attendance not found"),
        (status = 409, description = "Already processed or stale")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Approvals"
)]
pub async fn approve_break_proposal(
    auth: AuthUser,
    service: web::Data<AppService>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AttendanceError> {
    let outcome = service
        .approve_break_proposal(&auth.actor(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// Direct edit. Pending proposals for the day are retired without being applied.
#[utoipa::path(
    put,
    path = "/api/admin/attendance/{employee_id}/{date}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID"),
        ("date" = NaiveDate, Path, description = "Day to edit, YYYY-MM-DD")
    ),
    request_body(
        content = AdminAttendanceEdit,
        description = "The day's full values",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Attendance written", body = crate::service::ApprovalOutcome),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Approvals"
)]
pub async fn upsert_attendance(
    auth: AuthUser,
    service: web::Data<AppService>,
    path: web::Path<(u64, NaiveDate)>,
    body: web::Json<AdminAttendanceEdit>,
) -> Result<HttpResponse, AttendanceError> {
    let (employee_id, day) = path.into_inner();
    let outcome = service
        .admin_upsert_attendance(&auth.actor(), employee_id, day, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(outcome))
}

#[utoipa::path(
    delete,
    path = "/api/admin/employees/{employee_id}/attendance",
    params(
        ("employee_id" = u64, Path, description = "Employee removed from the directory")
    ),
    responses(
        (status = 200, description = "All attendance data removed", body = Object, example = json!({
            "message": "Attendance data removed",
            "removed": 42
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Approvals"
)]
pub async fn purge_employee(
    auth: AuthUser,
    service: web::Data<AppService>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AttendanceError> {
    let removed = service
        .purge_employee(&auth.actor(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Attendance data removed",
        "removed": removed
    })))
}
