/// HTTP server setup and routing
use crate::{
    api::middleware::access_gate,
    context::AppContext,
    error::{AuthError, AuthResult},
};
use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    middleware,
    response::Json,
    routing::get,
    Router,
};
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Build the main application router
/// Returns Router<()> because state is already provided
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/health", get(health_check))
        .merge(crate::api::routes())
        // Fallback goes before the layers so the page gate also covers it
        .fallback(not_found)
        .with_state(ctx.clone())
        .layer(middleware::from_fn_with_state(ctx, access_gate))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Health check handler
async fn health_check(State(ctx): State<AppContext>) -> (StatusCode, Json<serde_json::Value>) {
    let database = match crate::db::test_connection(&ctx.db).await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "Health check database probe failed");
            "unavailable"
        }
    };

    let status = if database == "ok" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": database,
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// 404 handler
async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": "Endpoint not found"
        })),
    )
}

/// Start the HTTP server
pub async fn serve(ctx: AppContext) -> AuthResult<()> {
    let addr = format!("{}:{}", ctx.config.service.hostname, ctx.config.service.port);

    info!(
        address = %addr,
        environment = %ctx.config.service.environment,
        "Store auth service listening"
    );
    info!(url = %ctx.service_url(), email = ctx.mailer.is_configured(), "Service ready");

    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AuthError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| AuthError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
