use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::{
    auth::Principal,
    state::DbPool,
    util_resp::{FailureResponse, StandardResponse, permission_denied},
};

/// Guard for the administrative endpoints: the caller must be an active
/// admin.
pub struct Admin(pub Principal);

impl Admin {
    pub fn check(principal: Principal) -> StandardResponse<Admin> {
        if principal.is_admin() {
            Ok(Admin(principal))
        } else {
            Err(permission_denied(
                "You do not have permission to perform this action.",
            ))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Admin
where
    S: Send + Sync,
    DbPool: FromRef<S>,
{
    type Rejection = FailureResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> StandardResponse<Self> {
        let principal = Principal::from_request_parts(parts, state).await?;
        Admin::check(principal)
    }
}
