use std::time::Duration;

use crate::{
    config::Config,
    engine::{
        bounded,
        error::{AttendanceError, EngineResult},
    },
    model::staff::StaffMember,
    models::Claims,
    store::Directory,
};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized, web::Data};
use futures::future::{Ready, ready};

use super::jwt::verify_token;

/// Caller identity taken from the bearer token. Policy never trusts `role`
/// here; handlers resolve the full actor through [`AuthUser::actor`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id,
            username: claims.sub,
            role: claims.role,
        }
    }
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // set by auth_middleware on protected scopes
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => return ready(Err(ErrorUnauthorized("Missing token"))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(
                    actix_web::error::ErrorInternalServerError("Config missing"),
                ));
            }
        };

        match verify_token(token, &config.jwt_secret) {
            Ok(claims) => ready(Ok(AuthUser::from(claims))),
            Err(_) => ready(Err(ErrorUnauthorized("Invalid token"))),
        }
    }
}

impl AuthUser {
    /// Current directory entry for the caller. Deactivated accounts act as nobody.
    pub async fn actor(
        &self,
        directory: &dyn Directory,
        io_timeout: Duration,
    ) -> EngineResult<StaffMember> {
        let staff = bounded(io_timeout, "find_staff", directory.find_staff(self.user_id))
            .await?
            .ok_or_else(|| AttendanceError::not_found("staff", self.user_id))?;
        if !staff.is_active {
            return Err(AttendanceError::unauthorized("account is deactivated"));
        }
        if !staff.role.eq_ignore_ascii_case(&self.role) {
            tracing::debug!(
                user_id = self.user_id,
                username = %self.username,
                token_role = %self.role,
                directory_role = %staff.role,
                "Token role is stale, using directory role"
            );
        }
        Ok(staff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::{MemoryStore, staff};

    fn caller(id: u64) -> AuthUser {
        AuthUser {
            user_id: id,
            username: format!("user{id}"),
            role: "ceo".into(),
        }
    }

    #[test]
    fn claims_carry_identity_into_auth_user() {
        let claims = Claims {
            sub: "rahim".into(),
            user_id: 7,
            role: "supervisor".into(),
            exp: 0,
            jti: "j".into(),
        };
        let user = AuthUser::from(claims);
        assert_eq!((user.user_id, user.username.as_str(), user.role.as_str()), (7, "rahim", "supervisor"));
    }

    #[actix_web::test]
    async fn actor_comes_from_directory_not_token() {
        let store = MemoryStore::default();
        store.add_staff(staff(3, "staff"));

        let actor = caller(3).actor(&store, Duration::from_secs(1)).await.unwrap();
        assert_eq!(actor.role, "staff");
    }

    #[actix_web::test]
    async fn unknown_or_inactive_actor_is_refused() {
        let store = MemoryStore::default();
        let mut gone = staff(4, "manager");
        gone.is_active = false;
        store.add_staff(gone);

        let err = caller(9).actor(&store, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, AttendanceError::NotFound { .. }));

        let err = caller(4).actor(&store, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, AttendanceError::AuthorizationFailure { .. }));
    }
}
