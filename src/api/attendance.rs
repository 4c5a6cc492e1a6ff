use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::engine::{
    attendance::{AttendanceEngine, AttendanceResult, ClockInRequest, ClockOutRequest},
    error::AttendanceError,
    report::{ReportEngine, ReportQuery},
};
use crate::store::Repositories;
use actix_web::{HttpResponse, web};

fn respond(result: AttendanceResult) -> HttpResponse {
    if result.already_processed {
        HttpResponse::Ok().json(result)
    } else {
        HttpResponse::Created().json(result)
    }
}

/// Clock-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/clock-in",
    request_body = ClockInRequest,
    responses(
        (status = 201, description = "Clocked in", body = AttendanceResult),
        (status = 200, description = "Already clocked in; existing record returned", body = AttendanceResult),
        (status = 400, description = "Missing field or date not allowed", body = Object, example = json!({
            "error": "MissingRequiredField",
            "message": "missing required field: location_id"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Actor may not clock this staff member in"),
        (status = 404, description = "Staff, supervisor or location not found"),
        (status = 422, description = "Outside geofence or not an office location"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn clock_in(
    auth: AuthUser,
    body: web::Json<ClockInRequest>,
    engine: web::Data<AttendanceEngine>,
    repos: web::Data<Repositories>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AttendanceError> {
    let actor = auth.actor(repos.directory.as_ref(), config.store_timeout).await?;
    let result = engine.clock_in(&actor, body.into_inner()).await?;
    Ok(respond(result))
}

/// Clock-out endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/clock-out",
    request_body = ClockOutRequest,
    responses(
        (status = 201, description = "Clocked out", body = AttendanceResult),
        (status = 200, description = "Already clocked out; existing record returned", body = AttendanceResult),
        (status = 400, description = "Missing field or date not allowed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Actor may not clock this staff member out"),
        (status = 404, description = "No open attendance record"),
        (status = 422, description = "Outside geofence or not an office location"),
        (status = 429, description = "Minimum clock interval not reached", body = Object, example = json!({
            "error": "RateLimited",
            "message": "minimum clock interval of 6 hours not reached, try again in 180 minutes",
            "remaining_minutes": 180
        })),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn clock_out(
    auth: AuthUser,
    body: web::Json<ClockOutRequest>,
    engine: web::Data<AttendanceEngine>,
    repos: web::Data<Repositories>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AttendanceError> {
    let actor = auth.actor(repos.directory.as_ref(), config.store_timeout).await?;
    let result = engine.clock_out(&actor, body.into_inner()).await?;
    Ok(respond(result))
}

/// Attendance report endpoint
#[utoipa::path(
    get,
    path = "/api/attendance/report",
    params(ReportQuery),
    responses(
        (status = 200, description = "One row per staff member per day", body = [crate::engine::report::AttendanceReportRow]),
        (status = 400, description = "Missing or invalid date range"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Field leadership required"),
        (status = 422, description = "Unknown status filter"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn report(
    auth: AuthUser,
    query: web::Query<ReportQuery>,
    engine: web::Data<ReportEngine>,
    repos: web::Data<Repositories>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AttendanceError> {
    let actor = auth.actor(repos.directory.as_ref(), config.store_timeout).await?;
    let rows = engine.generate(&actor, query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(rows))
}
