/// User administration endpoints
use crate::{
    account::UserPage,
    api::response::ApiResponse,
    auth::AuthContext,
    context::AppContext,
    db::user::{Role, UserFilter},
    error::{AuthError, AuthResult},
};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;

pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/users", get(list_users))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListUsersParams {
    pub role: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

async fn list_users(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    WithRejection(Query(params), _): WithRejection<Query<ListUsersParams>, AuthError>,
) -> AuthResult<Json<ApiResponse<UserPage>>> {
    let role = params
        .role
        .as_deref()
        .filter(|r| !r.is_empty())
        .map(str::parse::<Role>)
        .transpose()?;

    let users = ctx
        .auth
        .list_users(auth.claims.role, &UserFilter { role }, params.page, params.limit)
        .await?;

    Ok(Json(ApiResponse::ok(users, "Users retrieved successfully")))
}
