use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use diesel::result::DatabaseErrorKind;
use serde_json::json;

pub fn unauthenticated(detail: impl Into<String>) -> FailureResponse {
    FailureResponse::Unauthenticated(detail.into())
}

pub fn permission_denied(detail: impl Into<String>) -> FailureResponse {
    FailureResponse::PermissionDenied(detail.into())
}

pub fn not_found() -> FailureResponse {
    FailureResponse::NotFound("Not found.".to_string())
}

pub fn invalid(field: &'static str, message: impl Into<String>) -> FailureResponse {
    FailureResponse::Validation {
        field,
        message: message.into(),
    }
}

pub type StandardResponse<T> = Result<T, FailureResponse>;

/// JSON request body whose rejections render as validation errors.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(FailureResponse))]
pub struct JsonBody<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(FailureResponse))]
pub struct QueryParams<T>(pub T);

/// Path parameters; a segment that fails to parse (`/reviews/abc/`) is
/// reported as an unknown object.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(FailureResponse))]
pub struct PathParam<T>(pub T);

/// Every way a request can fail. Each variant maps onto exactly one HTTP
/// status and is scoped to the request that produced it.
#[derive(Debug, thiserror::Error)]
pub enum FailureResponse {
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("internal error: {0}")]
    Internal(String),
}

impl FailureResponse {
    pub fn status(&self) -> StatusCode {
        match self {
            FailureResponse::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            FailureResponse::PermissionDenied(_) => StatusCode::FORBIDDEN,
            FailureResponse::NotFound(_) => StatusCode::NOT_FOUND,
            FailureResponse::Validation { .. } => StatusCode::BAD_REQUEST,
            FailureResponse::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for FailureResponse {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            FailureResponse::Unauthenticated(detail)
            | FailureResponse::PermissionDenied(detail)
            | FailureResponse::NotFound(detail) => {
                tracing::warn!(%status, %detail, "request rejected");
                json!({ "detail": detail })
            }
            FailureResponse::Validation { field, message } => {
                tracing::warn!(%status, field, %message, "validation failed");
                let mut errors = serde_json::Map::new();
                errors.insert(field.to_string(), json!([message]));
                serde_json::Value::Object(errors)
            }
            FailureResponse::Internal(detail) => {
                tracing::error!(%detail, "internal error");
                json!({ "detail": "Internal server error." })
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Attributes a constraint failure to the field it concerns. SQLite only
/// reports the constraint as text ("UNIQUE constraint failed: users.username"),
/// which is logged but never sent to the client.
fn constraint_violation(kind: &DatabaseErrorKind, message: &str) -> FailureResponse {
    tracing::debug!(%message, "constraint violation");

    match kind {
        DatabaseErrorKind::UniqueViolation
            if message.ends_with("users.username") =>
        {
            invalid("username", "A user with that username already exists.")
        }
        DatabaseErrorKind::UniqueViolation => invalid(
            "non_field_errors",
            "This object conflicts with an existing one.",
        ),
        DatabaseErrorKind::ForeignKeyViolation => {
            invalid("non_field_errors", "A referenced object does not exist.")
        }
        _ => invalid("non_field_errors", "A value is out of range."),
    }
}

impl From<diesel::result::Error> for FailureResponse {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            diesel::result::Error::NotFound => not_found(),
            diesel::result::Error::DatabaseError(kind, info) => match kind {
                DatabaseErrorKind::UniqueViolation
                | DatabaseErrorKind::ForeignKeyViolation
                | DatabaseErrorKind::CheckViolation => {
                    constraint_violation(&kind, info.message())
                }
                _ => FailureResponse::Internal(info.message().to_string()),
            },
            e => FailureResponse::Internal(e.to_string()),
        }
    }
}

impl From<diesel::r2d2::PoolError> for FailureResponse {
    fn from(e: diesel::r2d2::PoolError) -> Self {
        FailureResponse::Internal(format!("connection pool: {e}"))
    }
}

impl From<JsonRejection> for FailureResponse {
    fn from(rejection: JsonRejection) -> Self {
        invalid("non_field_errors", rejection.body_text())
    }
}

impl From<QueryRejection> for FailureResponse {
    fn from(rejection: QueryRejection) -> Self {
        invalid("query", rejection.body_text())
    }
}

impl From<PathRejection> for FailureResponse {
    fn from(_: PathRejection) -> Self {
        not_found()
    }
}
