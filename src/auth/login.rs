use axum::Json;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    accounts::{Account, UserView},
    auth::{get_or_create_token, verify_password},
    state::Conn,
    util_resp::{JsonBody, StandardResponse, unauthenticated},
};

#[derive(Deserialize)]
pub struct LoginForm {
    username: String,
    password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserView,
}

/// Checks a username/password pair. Deactivated accounts cannot log in even
/// with the right password.
pub fn authenticate(
    username: &str,
    password: &str,
    conn: &mut SqliteConnection,
) -> StandardResponse<Account> {
    let account = match Account::by_username(username, conn)? {
        Some(account) => account,
        None => {
            tracing::debug!(%username, "login for unknown user");
            return Err(unauthenticated(
                "Unable to log in with provided credentials.",
            ));
        }
    };

    // todo: password rate limiting
    if !verify_password(password, &account.user.password_hash)? {
        tracing::debug!(user_id = account.id(), "login with wrong password");
        return Err(unauthenticated(
            "Unable to log in with provided credentials.",
        ));
    }

    if !account.extra.is_active {
        tracing::info!(user_id = account.id(), "login for deactivated user");
        return Err(unauthenticated("User account is disabled."));
    }

    Ok(account)
}

pub async fn create_token(
    conn: Conn,
    JsonBody(form): JsonBody<LoginForm>,
) -> StandardResponse<Json<LoginResponse>> {
    // argon2 verification takes tens of milliseconds.
    let (account, token) = conn
        .run(move |conn| {
            let account = authenticate(&form.username, &form.password, conn)?;
            let token = get_or_create_token(account.id(), conn)?;
            Ok((account, token))
        })
        .await?;

    tracing::info!(user_id = account.id(), "logged in");

    Ok(Json(LoginResponse {
        token,
        user: UserView::from(&account),
    }))
}
