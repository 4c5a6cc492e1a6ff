use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::engine::{error::AttendanceError, settings::Settings};
use crate::model::system_config::SystemConfigUpdate;
use crate::store::Repositories;
use actix_web::{HttpResponse, web};

#[utoipa::path(
    get,
    path = "/api/system-config",
    responses(
        (status = 200, description = "Current attendance settings", body = crate::model::system_config::SystemConfig),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "System Config"
)]
pub async fn get_config(
    _auth: AuthUser,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, AttendanceError> {
    Ok(HttpResponse::Ok().json(settings.current().await?))
}

#[utoipa::path(
    put,
    path = "/api/system-config",
    request_body = SystemConfigUpdate,
    responses(
        (status = 200, description = "Settings saved", body = crate::model::system_config::SystemConfig),
        (status = 400, description = "Value out of range", body = Object, example = json!({
            "error": "InvalidValue",
            "message": "grace_period_minutes must be between 0 and 1440"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only CEO or super admin"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "System Config"
)]
pub async fn update_config(
    auth: AuthUser,
    body: web::Json<SystemConfigUpdate>,
    settings: web::Data<Settings>,
    repos: web::Data<Repositories>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AttendanceError> {
    let actor = auth.actor(repos.directory.as_ref(), config.store_timeout).await?;
    let saved = settings.update(&actor, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(saved))
}
