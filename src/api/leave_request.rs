use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::engine::{error::AttendanceError, leave::LeaveService};
use crate::model::leave_request::{LeaveStatus, LeaveType};
use crate::store::Repositories;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: chrono::NaiveDate,
    #[schema(example = "2026-01-03", format = "date", value_type = String)]
    pub end_date: chrono::NaiveDate,
    #[schema(example = "sick")]
    pub leave_type: LeaveType, // enum ensures Swagger dropdown
}

/* =========================
Create leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted", body = crate::model::leave_request::LeaveRequest),
        (status = 400, description = "start_date after end_date"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    payload: web::Json<CreateLeave>,
    leaves: web::Data<LeaveService>,
    repos: web::Data<Repositories>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AttendanceError> {
    let actor = auth.actor(repos.directory.as_ref(), config.store_timeout).await?;
    let payload = payload.into_inner();
    let leave = leaves
        .submit(&actor, payload.start_date, payload.end_date, payload.leave_type)
        .await?;
    Ok(HttpResponse::Created().json(leave))
}

/* =========================
Get leave request
========================= */
#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request")
    ),
    responses(
        (status = 200, description = "Leave request", body = crate::model::leave_request::LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Neither owner nor management"),
        (status = 404, description = "Leave request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    path: web::Path<u64>,
    leaves: web::Data<LeaveService>,
    repos: web::Data<Repositories>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AttendanceError> {
    let actor = auth.actor(repos.directory.as_ref(), config.store_timeout).await?;
    let leave = leaves.view(&actor, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(leave))
}

async fn decide(
    auth: AuthUser,
    leave_id: u64,
    decision: LeaveStatus,
    leaves: &LeaveService,
    repos: &Repositories,
    config: &Config,
) -> Result<HttpResponse, AttendanceError> {
    let actor = auth.actor(repos.directory.as_ref(), config.store_timeout).await?;
    let leave = leaves.decide(&actor, leave_id, decision).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": format!("Leave {}", leave.status),
        "leave": leave
    })))
}

/* =========================
Approve leave (management)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    responses(
        (status = 200, description = "Leave approved successfully", body = Object, example = json!({
            "message": "Leave approved"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not management or no access to the department"),
        (status = 404, description = "Leave request not found"),
        (status = 422, description = "Leave request already processed", body = Object, example = json!({
            "error": "PolicyViolation",
            "message": "leave request 1 is already approved"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    path: web::Path<u64>,
    leaves: web::Data<LeaveService>,
    repos: web::Data<Repositories>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AttendanceError> {
    decide(auth, path.into_inner(), LeaveStatus::Approved, &leaves, &repos, &config).await
}

/* =========================
Reject leave (management)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to reject")
    ),
    responses(
        (status = 200, description = "Leave rejected successfully", body = Object, example = json!({
            "message": "Leave rejected"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not management or no access to the department"),
        (status = 404, description = "Leave request not found"),
        (status = 422, description = "Leave request already processed")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    path: web::Path<u64>,
    leaves: web::Data<LeaveService>,
    repos: web::Data<Repositories>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AttendanceError> {
    decide(auth, path.into_inner(), LeaveStatus::Rejected, &leaves, &repos, &config).await
}
