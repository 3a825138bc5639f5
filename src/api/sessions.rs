/// Login session review endpoints
use crate::{
    api::response::ApiResponse,
    auth::AuthContext,
    context::AppContext,
    db::session::{SessionFilter, SessionStatus},
    error::{AuthError, AuthResult},
    session::{Pagination, SessionPage},
};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;

pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/sessions", get(list_sessions))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSessionsParams {
    pub user_id: Option<String>,
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

async fn list_sessions(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    WithRejection(Query(params), _): WithRejection<Query<ListSessionsParams>, AuthError>,
) -> AuthResult<Json<ApiResponse<SessionPage>>> {
    let status = params
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::parse::<SessionStatus>)
        .transpose()?;

    let filter = SessionFilter {
        user_id: params.user_id.filter(|id| !id.is_empty()),
        status,
    };
    let (page, limit) = Pagination::clamp(params.page, params.limit);

    let sessions = ctx
        .sessions
        .list_sessions(auth.claims.role, &filter, page, limit)
        .await?;

    Ok(Json(ApiResponse::ok(sessions, "Sessions retrieved successfully")))
}
