use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::Utc;
use diesel::prelude::*;
use rand::RngCore;

use crate::{
    accounts::Account,
    schema::auth_tokens,
    state::{Conn, DbPool},
    util_resp::{
        FailureResponse, StandardResponse, permission_denied, unauthenticated,
    },
};

pub mod login;

pub const TOKEN_KEYWORD: &str = "Token";
const TOKEN_BYTES: usize = 20;

/// The authenticated, active account a request acts on behalf of.
///
/// Handlers receive this explicitly; nothing reads the caller from ambient
/// state. Extracting it rejects missing or unknown tokens with 401 and
/// deactivated accounts with 403.
#[derive(Debug, Clone)]
pub struct Principal {
    pub account: Account,
}

impl Principal {
    pub fn id(&self) -> i32 {
        self.account.id()
    }

    pub fn is_admin(&self) -> bool {
        self.account.extra.is_admin
    }
}

/// Pulls the key out of an `Authorization: Token <key>` header.
pub fn parse_token_header(value: &str) -> StandardResponse<&str> {
    let mut parts = value.split_whitespace();

    match (parts.next(), parts.next(), parts.next()) {
        (Some(keyword), Some(key), None)
            if keyword.eq_ignore_ascii_case(TOKEN_KEYWORD) =>
        {
            Ok(key)
        }
        (Some(keyword), None, None)
            if keyword.eq_ignore_ascii_case(TOKEN_KEYWORD) =>
        {
            Err(unauthenticated(
                "Invalid token header. No credentials provided.",
            ))
        }
        (Some(keyword), _, _)
            if keyword.eq_ignore_ascii_case(TOKEN_KEYWORD) =>
        {
            Err(unauthenticated(
                "Invalid token header. Token string should not contain spaces.",
            ))
        }
        _ => Err(unauthenticated(
            "Authentication credentials were not provided.",
        )),
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
    DbPool: FromRef<S>,
{
    type Rejection = FailureResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> StandardResponse<Self> {
        let header = match parts.headers.get(AUTHORIZATION) {
            Some(header) => header.to_str().map_err(|_| {
                unauthenticated(
                    "Invalid token header. Token string should not contain \
                     invalid characters.",
                )
            })?,
            None => {
                return Err(unauthenticated(
                    "Authentication credentials were not provided.",
                ));
            }
        };
        let key = parse_token_header(header)?.to_string();

        // Released once the lookup finishes so the handler can check out
        // its own.
        let conn = Conn::from_request_parts(parts, state).await?;
        let account = conn
            .run(move |conn| Ok(Account::by_token(&key, conn)?))
            .await?;

        let account = match account {
            Some(account) => account,
            None => return Err(unauthenticated("Invalid token.")),
        };

        if !account.extra.is_active {
            return Err(permission_denied("This account has been deactivated."));
        }

        tracing::trace!(user_id = account.id(), "authenticated request");

        Ok(Principal { account })
    }
}

pub fn hash_password(password: &str) -> StandardResponse<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| FailureResponse::Internal(format!("hashing password: {e}")))
}

pub fn verify_password(
    password: &str,
    password_hash: &str,
) -> StandardResponse<bool> {
    let parsed_hash = PasswordHash::new(password_hash).map_err(|e| {
        FailureResponse::Internal(format!("stored password hash: {e}"))
    })?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn generate_token_key() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Returns the user's token, creating one the first time they log in.
/// Concurrent first logins end up sharing whichever key was stored first.
pub fn get_or_create_token(
    user_id: i32,
    conn: &mut SqliteConnection,
) -> QueryResult<String> {
    let issued = diesel::insert_into(auth_tokens::table)
        .values((
            auth_tokens::key.eq(generate_token_key()),
            auth_tokens::user_id.eq(user_id),
            auth_tokens::created_at.eq(Utc::now().naive_utc()),
        ))
        .on_conflict(auth_tokens::user_id)
        .do_nothing()
        .execute(conn)?;
    if issued > 0 {
        tracing::debug!(user_id, "issued token");
    }

    auth_tokens::table
        .filter(auth_tokens::user_id.eq(user_id))
        .select(auth_tokens::key)
        .first(conn)
}
