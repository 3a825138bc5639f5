/// Request middleware
use crate::{
    auth::ACCESS_COOKIE,
    context::AppContext,
    gate::{self, GateDecision},
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;

fn is_api_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/") || path == "/health"
}

/// Apply the page access gate to every non-API request
pub async fn access_gate(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    if is_api_path(&path) {
        return next.run(req).await;
    }

    let token = jar.get(ACCESS_COOKIE).map(|c| c.value().to_string());

    match gate::decide(&path, token.as_deref(), &ctx.tokens) {
        GateDecision::Allow => next.run(req).await,
        GateDecision::Redirect(to) => {
            tracing::debug!(path = %path, to = %to, "Page request redirected");
            Redirect::temporary(&to).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_api_path() {
        assert!(is_api_path("/api/auth/login"));
        assert!(is_api_path("/health"));
        assert!(!is_api_path("/apiary"));
        assert!(!is_api_path("/dashboard"));
    }
}
