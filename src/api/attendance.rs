use crate::auth::auth::AuthUser;
use crate::error::AttendanceError;
use crate::service::AppService;
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct DayQuery {
    #[schema(example = 1000)]
    /// Whose day to show. Defaults to the caller's own employee record
    pub employee_id: Option<u64>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct MonthQuery {
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(example = 1)]
    /// 1-12
    pub month: u32,
    #[schema(example = 1000)]
    /// Defaults to the caller's own employee record
    pub employee_id: Option<u64>,
}

fn target_employee(auth: &AuthUser, requested: Option<u64>) -> Result<u64, AttendanceError> {
    match requested {
        Some(id) => Ok(id),
        None => auth.actor().acting_employee(),
    }
}

/// Clock-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/clock-in",
    responses(
        (status = 200, description = "Clocked in", body = crate::model::Attendance),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile"),
        (status = 409, description = "Already clocked in today", body = Object, example = json!({
            "message": "Already clocked in today",
            "code": "ALREADY_CLOCKED_IN"
        })),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn clock_in(
    auth: AuthUser,
    service: web::Data<AppService>,
) -> Result<HttpResponse, AttendanceError> {
    let attendance = service.clock_in(&auth.actor()).await?;
    Ok(HttpResponse::Ok().json(attendance))
}

/// Break-start endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/break-start",
    responses(
        (status = 200, description = "Break started", body = crate::model::Attendance),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile"),
        (status = 409, description = "Not currently working", body = Object, example = json!({
            "message": "A break can only start while working",
            "code": "INVALID_STATE_FOR_BREAK_START"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn break_start(
    auth: AuthUser,
    service: web::Data<AppService>,
) -> Result<HttpResponse, AttendanceError> {
    let attendance = service.break_start(&auth.actor()).await?;
    Ok(HttpResponse::Ok().json(attendance))
}

/// Break-end endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/break-end",
    responses(
        (status = 200, description = "Break ended", body = crate::model::Attendance),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile"),
        (status = 409, description = "No break in progress", body = Object, example = json!({
            "message": "No break in progress",
            "code": "INVALID_STATE_FOR_BREAK_END"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn break_end(
    auth: AuthUser,
    service: web::Data<AppService>,
) -> Result<HttpResponse, AttendanceError> {
    let attendance = service.break_end(&auth.actor()).await?;
    Ok(HttpResponse::Ok().json(attendance))
}

/// Clock-out endpoint. Allowed during a break; the break is then left open
/// and `open_break_left` is set.
#[utoipa::path(
    post,
    path = "/api/attendance/clock-out",
    responses(
        (status = 200, description = "Clocked out", body = crate::service::ClockOutOutcome),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile"),
        (status = 409, description = "Not clocked in or already clocked out", body = Object, example = json!({
            "message": "No open attendance to clock out of",
            "code": "INVALID_STATE_FOR_CLOCK_OUT"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn clock_out(
    auth: AuthUser,
    service: web::Data<AppService>,
) -> Result<HttpResponse, AttendanceError> {
    let outcome = service.clock_out(&auth.actor()).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// Today's state for the caller
#[utoipa::path(
    get,
    path = "/api/attendance/today",
    responses(
        (status = 200, description = "Today's attendance state", body = crate::service::TodayStatus),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn today(
    auth: AuthUser,
    service: web::Data<AppService>,
) -> Result<HttpResponse, AttendanceError> {
    let status = service.get_today_status(&auth.actor()).await?;
    Ok(HttpResponse::Ok().json(status))
}

/// One day as it should be displayed: a pending correction overlays the
/// stored values.
#[utoipa::path(
    get,
    path = "/api/attendance/{date}",
    params(
        ("date" = NaiveDate, Path, description = "Day to show, YYYY-MM-DD"),
        DayQuery
    ),
    responses(
        (status = 200, description = "Display data for the day", body = crate::service::OverlayResult),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not allowed to view this employee")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn day_detail(
    auth: AuthUser,
    service: web::Data<AppService>,
    path: web::Path<NaiveDate>,
    query: web::Query<DayQuery>,
) -> Result<HttpResponse, AttendanceError> {
    let employee_id = target_employee(&auth, query.employee_id)?;
    let display = service
        .get_display_data(&auth.actor(), employee_id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(display))
}

/// Calendar month with totals
#[utoipa::path(
    get,
    path = "/api/attendance/monthly",
    params(MonthQuery),
    responses(
        (status = 200, description = "Calendar and monthly summary", body = crate::service::MonthlyReport),
        (status = 400, description = "Invalid month"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not allowed to view this employee")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn monthly(
    auth: AuthUser,
    service: web::Data<AppService>,
    query: web::Query<MonthQuery>,
) -> Result<HttpResponse, AttendanceError> {
    let employee_id = target_employee(&auth, query.employee_id)?;
    let report = service
        .get_monthly_summary(&auth.actor(), employee_id, query.year, query.month)
        .await?;
    Ok(HttpResponse::Ok().json(report))
}
