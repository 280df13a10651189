use crate::auth::auth::AuthUser;
use crate::error::AttendanceError;
use crate::service::{AppService, AttendanceCorrection, BreakCorrection};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;

/// Submit a correction for one of the caller's days
#[utoipa::path(
    post,
    path = "/api/corrections/{date}",
    params(
        ("date" = NaiveDate, Path, description = "Day to correct, YYYY-MM-DD")
    ),
    request_body(
        content = AttendanceCorrection,
        description = "Fields to change. Omitted fields stay as they are; `notes: null` clears the notes",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Correction awaiting approval", body = crate::service::CorrectionReceipt),
        (status = 400, description = "Validation failed", body = Object, example = json!({
            "message": "Validation failed",
            "code": "VALIDATION_FAILED",
            "fields": [{"field": "clock_out", "message": "must be after clock-in"}]
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile"),
        (status = 409, description = "A correction is already pending for this day", body = Object, example = json!({
            "message": "A correction for 2026-01-05 is already awaiting approval",
            "code": "DUPLICATE_PENDING_PROPOSAL"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Corrections"
)]
pub async fn submit_correction(
    auth: AuthUser,
    service: web::Data<AppService>,
    path: web::Path<NaiveDate>,
    body: web::Json<AttendanceCorrection>,
) -> Result<HttpResponse, AttendanceError> {
    tracing::debug!(user = %auth.username, day = %path, "Correction received");
    let receipt = service
        .submit_attendance_correction(&auth.actor(), path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(receipt))
}

/// Submit a correction for a single break, or request a new one
#[utoipa::path(
    post,
    path = "/api/corrections/{date}/breaks",
    params(
        ("date" = NaiveDate, Path, description = "Day of the break, YYYY-MM-DD")
    ),
    request_body(
        content = BreakCorrection,
        description = "Corrected break. Leave out `break_id` to request a new break",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Break correction awaiting approval", body = crate::model::BreakProposal),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile"),
        (status = 409, description = "A correction is already pending for this day")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Corrections"
)]
pub async fn submit_break_correction(
    auth: AuthUser,
    service: web::Data<AppService>,
    path: web::Path<NaiveDate>,
    body: web::Json<BreakCorrection>,
) -> Result<HttpResponse, AttendanceError> {
    let proposal = service
        .submit_break_correction(&auth.actor(), path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(proposal))
}
