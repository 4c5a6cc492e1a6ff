use crate::{
    auth::{jwt::generate_access_token, password::verify_password},
    config::Config,
    engine::bounded,
    models::LoginReqDto,
    store::Repositories,
};
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    access_token: String,
    #[schema(example = 900)]
    expires_in: usize,
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Access token issued", body = LoginResponse),
        (status = 400, description = "Username or password missing"),
        (status = 401, description = "Invalid credentials"),
        (status = 429, description = "Too many login attempts")
    )
)]
#[instrument(
    name = "auth_login",
    skip(repos, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    repos: web::Data<Repositories>,
    config: web::Data<Config>,
) -> impl Responder {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return HttpResponse::BadRequest().json(json!({"message": "Username or password required"}));
    }

    debug!("Fetching credential");

    let credential = match bounded(
        config.store_timeout,
        "find_credential",
        repos.directory.find_credential(user.username.trim()),
    )
    .await
    {
        Ok(Some(c)) => {
            debug!(user_id = c.id, "Credential found");
            c
        }
        Ok(None) => {
            info!("Invalid credentials: user not found");
            return HttpResponse::Unauthorized().json(json!({"message": "Invalid credentials"}));
        }
        Err(e) => {
            error!(error = %e, "Store error while fetching credential");
            return HttpResponse::InternalServerError().finish();
        }
    };

    if let Err(e) = verify_password(&user.password, &credential.password_hash) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return HttpResponse::Unauthorized().json(json!({"message": "Invalid credentials"}));
    }

    let access_token = match generate_access_token(
        credential.id,
        credential.username.clone(),
        credential.role.clone(),
        &config.jwt_secret,
        config.access_token_ttl,
    ) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "Failed to sign access token");
            return HttpResponse::InternalServerError().finish();
        }
    };

    info!(user_id = credential.id, "Login successful");

    HttpResponse::Ok().json(LoginResponse {
        access_token,
        expires_in: config.access_token_ttl,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::auth::{jwt::verify_token, password::hash_password};
    use crate::model::staff::Credential;
    use crate::store::{LogNotificationSink, memory::MemoryStore};
    use actix_web::{App, http::StatusCode, test};

    fn repos() -> Repositories {
        let store = Arc::new(MemoryStore::default());
        store.add_credential(Credential {
            id: 7,
            username: "rahim".into(),
            password_hash: hash_password("field-day").unwrap(),
            role: "supervisor".into(),
        });
        Repositories::from_backend(store, Arc::new(LogNotificationSink))
    }

    #[actix_web::test]
    async fn login_issues_token_for_valid_credentials() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(repos()))
                .app_data(web::Data::new(Config::for_tests()))
                .route("/auth/login", web::post().to(login)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(json!({"username": "rahim", "password": "field-day"}))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        let token = body["access_token"].as_str().unwrap();
        let claims = verify_token(token, "test-secret").unwrap();
        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.role, "supervisor");
    }

    #[actix_web::test]
    async fn login_rejects_bad_password_and_blank_input() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(repos()))
                .app_data(web::Data::new(Config::for_tests()))
                .route("/auth/login", web::post().to(login)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(json!({"username": "rahim", "password": "nope"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(json!({"username": " ", "password": ""}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }
}
