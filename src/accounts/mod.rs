use std::collections::HashMap;

use chrono::{NaiveDateTime, Utc};
use diesel::{dsl::exists, prelude::*, select};
use serde::Serialize;

use crate::{
    auth::hash_password,
    schema::{account_extras, auth_tokens, users},
    util_resp::{FailureResponse, StandardResponse, invalid},
    validation::{is_valid_email, is_valid_password, is_valid_username},
};

pub mod manage;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: NaiveDateTime,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = account_extras)]
pub struct AccountExtra {
    pub id: i32,
    pub user_id: i32,
    pub is_admin: bool,
    pub is_active: bool,
}

/// A user together with its extension record. Every user has exactly one.
#[derive(Debug, Clone)]
pub struct Account {
    pub user: User,
    pub extra: AccountExtra,
}

impl From<(User, AccountExtra)> for Account {
    fn from((user, extra): (User, AccountExtra)) -> Self {
        Account { user, extra }
    }
}

impl Account {
    pub fn id(&self) -> i32 {
        self.user.id
    }

    pub fn fetch(
        id: i32,
        conn: &mut SqliteConnection,
    ) -> QueryResult<Option<Account>> {
        users::table
            .inner_join(account_extras::table)
            .filter(users::id.eq(id))
            .select((User::as_select(), AccountExtra::as_select()))
            .first::<(User, AccountExtra)>(conn)
            .optional()
            .map(|row| row.map(Account::from))
    }

    pub fn by_username(
        username: &str,
        conn: &mut SqliteConnection,
    ) -> QueryResult<Option<Account>> {
        users::table
            .inner_join(account_extras::table)
            .filter(users::username.eq(username))
            .select((User::as_select(), AccountExtra::as_select()))
            .first::<(User, AccountExtra)>(conn)
            .optional()
            .map(|row| row.map(Account::from))
    }

    pub fn by_token(
        key: &str,
        conn: &mut SqliteConnection,
    ) -> QueryResult<Option<Account>> {
        auth_tokens::table
            .inner_join(users::table.inner_join(account_extras::table))
            .filter(auth_tokens::key.eq(key))
            .select((User::as_select(), AccountExtra::as_select()))
            .first::<(User, AccountExtra)>(conn)
            .optional()
            .map(|row| row.map(Account::from))
    }
}

/// The public representation of an account. The password hash never leaves
/// the server.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct UserView {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
}

impl From<&Account> for UserView {
    fn from(account: &Account) -> Self {
        UserView {
            id: account.user.id,
            username: account.user.username.clone(),
            email: account.user.email.clone(),
            is_admin: account.extra.is_admin,
        }
    }
}

impl UserView {
    /// Loads the given users regardless of their active flag; used to render
    /// historical rows such as invitations.
    pub fn load_map(
        ids: &[i32],
        conn: &mut SqliteConnection,
    ) -> QueryResult<HashMap<i32, UserView>> {
        Ok(users::table
            .inner_join(account_extras::table)
            .filter(users::id.eq_any(ids))
            .select((User::as_select(), AccountExtra::as_select()))
            .load::<(User, AccountExtra)>(conn)?
            .into_iter()
            .map(|row| {
                let account = Account::from(row);
                (account.id(), UserView::from(&account))
            })
            .collect())
    }
}

// The one place the soft-delete and role filters for employee-facing
// queries are written down.
macro_rules! active_employees {
    () => {
        users::table
            .inner_join(account_extras::table)
            .filter(account_extras::is_admin.eq(false))
            .filter(account_extras::is_active.eq(true))
    };
}

/// Non-admin accounts that have not been deactivated.
pub struct ActiveEmployees;

impl ActiveEmployees {
    pub fn load(conn: &mut SqliteConnection) -> QueryResult<Vec<Account>> {
        Ok(active_employees!()
            .order_by(users::id.asc())
            .select((User::as_select(), AccountExtra::as_select()))
            .load::<(User, AccountExtra)>(conn)?
            .into_iter()
            .map(Account::from)
            .collect())
    }

    pub fn find(
        id: i32,
        conn: &mut SqliteConnection,
    ) -> QueryResult<Option<Account>> {
        active_employees!()
            .filter(users::id.eq(id))
            .select((User::as_select(), AccountExtra::as_select()))
            .first::<(User, AccountExtra)>(conn)
            .optional()
            .map(|row| row.map(Account::from))
    }
}

pub fn user_exists(id: i32, conn: &mut SqliteConnection) -> QueryResult<bool> {
    select(exists(users::table.find(id))).get_result::<bool>(conn)
}

/// Creates a user and its extension record in one transaction. New accounts
/// are always active.
pub fn create_user(
    is_admin: bool,
    username: &str,
    password: &str,
    email: &str,
    conn: &mut SqliteConnection,
) -> StandardResponse<Account> {
    is_valid_username(username).map_err(|e| invalid("username", e))?;
    is_valid_password(password).map_err(|e| invalid("password", e))?;
    is_valid_email(email).map_err(|e| invalid("email", e))?;

    let password_hash = hash_password(password)?;

    let account = conn.immediate_transaction::<_, FailureResponse, _>(|conn| {
        let taken = select(exists(
            users::table.filter(users::username.eq(username)),
        ))
        .get_result::<bool>(conn)?;
        if taken {
            return Err(invalid(
                "username",
                "A user with that username already exists.",
            ));
        }

        let user = diesel::insert_into(users::table)
            .values((
                users::username.eq(username),
                users::email.eq(email),
                users::password_hash.eq(&password_hash),
                users::created_at.eq(Utc::now().naive_utc()),
            ))
            .returning(User::as_returning())
            .get_result(conn)?;

        let extra = diesel::insert_into(account_extras::table)
            .values((
                account_extras::user_id.eq(user.id),
                account_extras::is_admin.eq(is_admin),
                account_extras::is_active.eq(true),
            ))
            .returning(AccountExtra::as_returning())
            .get_result(conn)?;

        Ok(Account { user, extra })
    })?;

    tracing::info!(
        user_id = account.id(),
        username = %account.user.username,
        is_admin,
        "created user"
    );

    Ok(account)
}

/// Soft-deletes an account. Its invitations and responses are kept.
pub fn deactivate(
    user_id: i32,
    conn: &mut SqliteConnection,
) -> StandardResponse<()> {
    let n = diesel::update(
        account_extras::table.filter(account_extras::user_id.eq(user_id)),
    )
    .set(account_extras::is_active.eq(false))
    .execute(conn)?;

    if n != 1 {
        return Err(FailureResponse::Internal(format!(
            "expected one extension record for user {user_id}, found {n}"
        )));
    }

    tracing::info!(user_id, "deactivated user");
    Ok(())
}

pub fn update_email(
    user_id: i32,
    email: &str,
    conn: &mut SqliteConnection,
) -> StandardResponse<()> {
    is_valid_email(email).map_err(|e| invalid("email", e))?;

    diesel::update(users::table.find(user_id))
        .set(users::email.eq(email))
        .execute(conn)?;

    tracing::debug!(user_id, "updated email");
    Ok(())
}
