/// /api/auth/* endpoints
use crate::{
    account::{
        AuthResponse, ChangePasswordRequest, ForgotPasswordRequest, LoginOutcome, LoginRequest,
        ProfileView, RefreshRequest, ResetPasswordRequest, SignupRequest, UpdateProfileRequest,
    },
    api::response::ApiResponse,
    auth::{AuthContext, OptionalAuthContext, ACCESS_COOKIE, REFRESH_COOKIE, SESSION_COOKIE},
    context::AppContext,
    error::{AuthError, AuthResult},
    session::ClientInfo,
    token::TokenKind,
};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::{
    cookie::{Cookie, SameSite},
    CookieJar, WithRejection,
};

type JsonBody<T> = WithRejection<Json<T>, AuthError>;

/// Build auth routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/forgot-password", post(forgot_password))
        .route("/api/auth/reset-password", post(reset_password))
        .route("/api/auth/change-password", post(change_password))
        .route("/api/auth/me", get(me))
        .route("/api/auth/profile", get(get_profile).put(update_profile))
}

fn session_cookie(
    name: &'static str,
    value: String,
    max_age: chrono::Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(cookie::time::Duration::seconds(max_age.num_seconds()))
        .build()
}

/// Set the token cookies (and the session id cookie when a session was
/// recorded) for a successful authentication
fn with_auth_cookies(ctx: &AppContext, jar: CookieJar, outcome: &LoginOutcome) -> CookieJar {
    let secure = ctx.config.is_production();
    let access_ttl = ctx.tokens.ttl(TokenKind::Access);

    let jar = jar
        .add(session_cookie(
            ACCESS_COOKIE,
            outcome.response.token.clone(),
            access_ttl,
            secure,
        ))
        .add(session_cookie(
            REFRESH_COOKIE,
            outcome.response.refresh_token.clone(),
            ctx.tokens.ttl(TokenKind::Refresh),
            secure,
        ));

    match &outcome.session_id {
        Some(session_id) => jar.add(session_cookie(
            SESSION_COOKIE,
            session_id.clone(),
            access_ttl,
            secure,
        )),
        None => jar,
    }
}

fn without_auth_cookies(jar: CookieJar) -> CookieJar {
    [ACCESS_COOKIE, REFRESH_COOKIE, SESSION_COOKIE]
        .into_iter()
        .fold(jar, |jar, name| jar.remove(Cookie::build((name, "")).path("/")))
}

type AuthReply = (StatusCode, CookieJar, Json<ApiResponse<AuthResponse>>);

fn auth_reply(
    ctx: &AppContext,
    jar: CookieJar,
    status: StatusCode,
    outcome: LoginOutcome,
    message: &str,
) -> AuthReply {
    let jar = with_auth_cookies(ctx, jar, &outcome);
    (status, jar, Json(ApiResponse::ok(outcome.response, message)))
}

/// Signup endpoint
async fn signup(
    State(ctx): State<AppContext>,
    client: ClientInfo,
    jar: CookieJar,
    WithRejection(Json(req), _): JsonBody<SignupRequest>,
) -> AuthResult<AuthReply> {
    let mut outcome = ctx.auth.signup(&req).await?;
    outcome.session_id = ctx.auth.open_session(&outcome.user, &client).await;

    Ok(auth_reply(&ctx, jar, StatusCode::CREATED, outcome, "Account created successfully"))
}

/// Login endpoint
async fn login(
    State(ctx): State<AppContext>,
    client: ClientInfo,
    jar: CookieJar,
    WithRejection(Json(req), _): JsonBody<LoginRequest>,
) -> AuthResult<AuthReply> {
    let outcome = ctx.auth.login(&req, &client).await?;

    Ok(auth_reply(&ctx, jar, StatusCode::OK, outcome, "Login successful"))
}

/// Logout endpoint. Always succeeds once the cookies are cleared.
async fn logout(
    State(ctx): State<AppContext>,
    auth: OptionalAuthContext,
    jar: CookieJar,
) -> (CookieJar, Json<ApiResponse<()>>) {
    let session_id = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    let user_id = auth.auth.map(|a| a.claims.user_id);

    ctx.auth.logout(session_id.as_deref(), user_id.as_deref()).await;

    (without_auth_cookies(jar), Json(ApiResponse::empty("Logged out successfully")))
}

/// Rotate tokens using the refresh token from the cookie or the body
async fn refresh(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    body: Bytes,
) -> AuthResult<AuthReply> {
    let from_body = || {
        if body.is_empty() {
            return None;
        }
        serde_json::from_slice::<RefreshRequest>(&body)
            .ok()
            .and_then(|req| req.refresh_token)
    };

    let refresh_token = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .or_else(from_body)
        .ok_or(AuthError::InvalidToken)?;

    let outcome = ctx.auth.refresh(&refresh_token).await?;

    Ok(auth_reply(&ctx, jar, StatusCode::OK, outcome, "Token refreshed successfully"))
}

/// Forgot-password endpoint. The reply never reveals whether the email exists.
async fn forgot_password(
    State(ctx): State<AppContext>,
    WithRejection(Json(req), _): JsonBody<ForgotPasswordRequest>,
) -> AuthResult<Json<ApiResponse<()>>> {
    ctx.auth.request_password_reset(&req).await?;

    Ok(Json(ApiResponse::empty(
        "If an account with that email exists, we've sent a password reset link.",
    )))
}

/// Reset-password endpoint; signs the user in on success
async fn reset_password(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    WithRejection(Json(req), _): JsonBody<ResetPasswordRequest>,
) -> AuthResult<AuthReply> {
    let outcome = ctx.auth.complete_password_reset(&req).await?;

    Ok(auth_reply(&ctx, jar, StatusCode::OK, outcome, "Password reset successful"))
}

async fn change_password(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    WithRejection(Json(req), _): JsonBody<ChangePasswordRequest>,
) -> AuthResult<Json<ApiResponse<()>>> {
    ctx.auth.change_password(&auth.claims.user_id, &req).await?;

    Ok(Json(ApiResponse::empty("Password changed successfully")))
}

async fn me(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> AuthResult<Json<ApiResponse<ProfileView>>> {
    let profile = ctx.auth.profile(&auth.claims.user_id).await?;

    Ok(Json(ApiResponse::ok(profile, "User retrieved successfully")))
}

async fn get_profile(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> AuthResult<Json<ApiResponse<ProfileView>>> {
    let profile = ctx.auth.profile(&auth.claims.user_id).await?;

    Ok(Json(ApiResponse::ok(profile, "Profile retrieved successfully")))
}

async fn update_profile(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    WithRejection(Json(req), _): JsonBody<UpdateProfileRequest>,
) -> AuthResult<Json<ApiResponse<ProfileView>>> {
    let profile = ctx.auth.update_profile(&auth.claims.user_id, &req).await?;

    Ok(Json(ApiResponse::ok(profile, "Profile updated successfully")))
}
