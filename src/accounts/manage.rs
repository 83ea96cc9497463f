use axum::{Json, http::StatusCode};
use serde::Deserialize;

use crate::{
    accounts::{ActiveEmployees, UserView, create_user, deactivate, update_email},
    auth::Principal,
    permission::Admin,
    state::Conn,
    util_resp::{JsonBody, PathParam, StandardResponse, not_found},
};

/// The literal path segment addressing the caller's own record.
pub const SELF_SEGMENT: &str = ":self";

pub async fn list_employees(
    _admin: Admin,
    conn: Conn,
) -> StandardResponse<Json<Vec<UserView>>> {
    let employees = conn
        .run(|conn| Ok(ActiveEmployees::load(conn)?))
        .await?;
    Ok(Json(employees.iter().map(UserView::from).collect()))
}

#[derive(Deserialize)]
pub struct CreateEmployeeForm {
    username: String,
    password: String,
    #[serde(default)]
    email: String,
}

pub async fn create_employee(
    Admin(admin): Admin,
    conn: Conn,
    JsonBody(form): JsonBody<CreateEmployeeForm>,
) -> StandardResponse<(StatusCode, Json<UserView>)> {
    let account = conn
        .run(move |conn| {
            create_user(
                false,
                &form.username,
                &form.password,
                &form.email,
                conn,
            )
        })
        .await?;

    tracing::info!(
        admin_id = admin.id(),
        user_id = account.id(),
        "admin created employee"
    );

    Ok((StatusCode::CREATED, Json(UserView::from(&account))))
}

pub async fn retrieve_employee(
    _admin: Admin,
    PathParam(id): PathParam<i32>,
    conn: Conn,
) -> StandardResponse<Json<UserView>> {
    let account = conn
        .run(move |conn| {
            ActiveEmployees::find(id, conn)?.ok_or_else(not_found)
        })
        .await?;
    Ok(Json(UserView::from(&account)))
}

/// `username` and `is_admin` are read-only; anything other than `email` in
/// the body is ignored.
#[derive(Deserialize)]
pub struct UpdateEmployeeForm {
    email: Option<String>,
}

pub async fn update_employee(
    _admin: Admin,
    PathParam(id): PathParam<i32>,
    conn: Conn,
    JsonBody(form): JsonBody<UpdateEmployeeForm>,
) -> StandardResponse<Json<UserView>> {
    let account = conn
        .run(move |conn| {
            let account =
                ActiveEmployees::find(id, conn)?.ok_or_else(not_found)?;

            if let Some(email) = &form.email {
                update_email(account.id(), email, conn)?;
            }

            ActiveEmployees::find(id, conn)?.ok_or_else(not_found)
        })
        .await?;
    Ok(Json(UserView::from(&account)))
}

pub async fn delete_employee(
    Admin(admin): Admin,
    PathParam(id): PathParam<i32>,
    conn: Conn,
) -> StandardResponse<StatusCode> {
    let account = conn
        .run(move |conn| {
            let account =
                ActiveEmployees::find(id, conn)?.ok_or_else(not_found)?;
            deactivate(account.id(), conn)?;
            Ok(account)
        })
        .await?;

    tracing::info!(
        admin_id = admin.id(),
        user_id = account.id(),
        "admin deactivated employee"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/v1/employees/:self`. Any active account may read its own
/// record, admins included.
pub async fn retrieve_self(
    principal: Principal,
    PathParam(segment): PathParam<String>,
) -> StandardResponse<Json<UserView>> {
    if segment != SELF_SEGMENT {
        return Err(not_found());
    }

    Ok(Json(UserView::from(&principal.account)))
}
