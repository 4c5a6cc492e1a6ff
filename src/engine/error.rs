use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::{Display, Error};
use serde_json::json;

/// Everything the engines can refuse with. `Internal` is kept apart from the
/// policy kinds so callers can tell "not allowed" from "broken".
#[derive(Debug, Display, Error)]
pub enum AttendanceError {
    #[display(fmt = "missing required field: {}", field)]
    MissingRequiredField { field: &'static str },

    #[display(fmt = "{} not found: {}", entity, key)]
    NotFound { entity: &'static str, key: String },

    #[display(fmt = "{}", reason)]
    PolicyViolation { reason: String },

    #[display(fmt = "{}", reason)]
    AuthorizationFailure { reason: String },

    #[display(fmt = "{}", reason)]
    InvalidDateRange { reason: String },

    #[display(fmt = "invalid {}: {:?}", field, value)]
    InvalidParameter { field: &'static str, value: String },

    #[display(fmt = "{} must be between {} and {}", field, min, max)]
    InvalidValue { field: &'static str, min: f64, max: f64 },

    #[display(
        fmt = "minimum clock interval of {} hours not reached, try again in {} minutes",
        min_hours,
        remaining_minutes
    )]
    RateLimited { min_hours: f64, remaining_minutes: i64 },

    #[display(fmt = "internal error: {}", message)]
    Internal { message: String },
}

impl AttendanceError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound { entity, key: key.to_string() }
    }

    pub fn policy(reason: impl Into<String>) -> Self {
        Self::PolicyViolation { reason: reason.into() }
    }

    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::AuthorizationFailure { reason: reason.into() }
    }

    pub fn date_range(reason: impl Into<String>) -> Self {
        Self::InvalidDateRange { reason: reason.into() }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingRequiredField { .. } => "MissingRequiredField",
            Self::NotFound { .. } => "NotFound",
            Self::PolicyViolation { .. } => "PolicyViolation",
            Self::AuthorizationFailure { .. } => "AuthorizationFailure",
            Self::InvalidDateRange { .. } => "InvalidDateRange",
            Self::InvalidParameter { .. } => "InvalidParameter",
            Self::InvalidValue { .. } => "InvalidValue",
            Self::RateLimited { .. } => "RateLimited",
            Self::Internal { .. } => "Internal",
        }
    }
}

impl From<anyhow::Error> for AttendanceError {
    fn from(e: anyhow::Error) -> Self {
        Self::Internal { message: format!("{e:#}") }
    }
}

impl ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingRequiredField { .. }
            | Self::InvalidDateRange { .. }
            | Self::InvalidParameter { .. }
            | Self::InvalidValue { .. } => StatusCode::BAD_REQUEST,
            Self::AuthorizationFailure { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::PolicyViolation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            Self::RateLimited { remaining_minutes, .. } => json!({
                "error": self.kind(),
                "message": self.to_string(),
                "remaining_minutes": remaining_minutes,
            }),
            // store details stay in the log
            Self::Internal { .. } => json!({
                "error": self.kind(),
                "message": "Internal Server Error",
            }),
            _ => json!({
                "error": self.kind(),
                "message": self.to_string(),
            }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

pub type EngineResult<T> = Result<T, AttendanceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    async fn body_of(err: &AttendanceError) -> serde_json::Value {
        let bytes = to_bytes(err.error_response().into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[actix_web::test]
    async fn internal_hides_store_details() {
        let err = AttendanceError::from(anyhow::anyhow!("Access denied for user 'root'@'db'"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_of(&err).await;
        assert_eq!(body["error"], "Internal");
        assert_eq!(body["message"], "Internal Server Error");
        assert!(!body.to_string().contains("root"));
    }

    #[actix_web::test]
    async fn rate_limited_carries_remaining_minutes() {
        let err = AttendanceError::RateLimited { min_hours: 6.0, remaining_minutes: 42 };
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body_of(&err).await["remaining_minutes"], 42);
    }
}
