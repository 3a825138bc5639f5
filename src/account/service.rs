/// Authentication service
///
/// Owns the signup, login, password-change and password-reset flows. The
/// service hashes passwords explicitly before every write; the store never
/// hashes on its own.
use super::{
    password::{generate_reset_token, hash_password, hash_reset_token, verify_password},
    store::UserStore,
    AuthResponse, ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, ProfileView,
    ResetPasswordRequest, SignupRequest, UpdateProfileRequest, UserSummary,
};
use crate::{
    db::user::{NewUser, ProfileChanges, Role, User, UserFilter},
    error::{AuthError, AuthResult},
    session::{ClientInfo, Pagination, SessionTracker},
    token::{TokenClaims, TokenKind, TokenService},
    validation,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Verified against when a login names no account, so both failure paths
/// pay one bcrypt verification
const DUMMY_PASSWORD: &str = "dummy-password-for-unknown-accounts";

/// Delivers the raw reset token to the account owner
#[async_trait]
pub trait ResetNotifier: Send + Sync {
    async fn send_password_reset(&self, user: &User, raw_token: &str) -> AuthResult<()>;
}

/// Result of a successful signup, login or reset
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub response: AuthResponse,
    /// Set when a session row was recorded for this login
    pub session_id: Option<String>,
}

/// Paginated user summaries
#[derive(Debug, Clone, Serialize)]
pub struct UserPage {
    pub users: Vec<UserSummary>,
    pub pagination: Pagination,
}

pub struct AuthService {
    users: Arc<UserStore>,
    tokens: Arc<TokenService>,
    sessions: Arc<SessionTracker>,
    notifier: Arc<dyn ResetNotifier>,
    bcrypt_cost: u32,
    reset_ttl: Duration,
    dummy_hash: OnceCell<String>,
}

impl AuthService {
    pub fn new(
        users: Arc<UserStore>,
        tokens: Arc<TokenService>,
        sessions: Arc<SessionTracker>,
        notifier: Arc<dyn ResetNotifier>,
        bcrypt_cost: u32,
        reset_ttl: Duration,
    ) -> Self {
        Self {
            users,
            tokens,
            sessions,
            notifier,
            bcrypt_cost,
            reset_ttl,
            dummy_hash: OnceCell::new(),
        }
    }

    /// Hash at the configured cost, computed on first use
    async fn dummy_hash(&self) -> AuthResult<&str> {
        let hash = self
            .dummy_hash
            .get_or_try_init(|| hash_password(DUMMY_PASSWORD, self.bcrypt_cost))
            .await?;
        Ok(hash.as_str())
    }

    fn authenticated(&self, user: User, session_id: Option<String>) -> AuthResult<LoginOutcome> {
        let pair = self.tokens.issue_pair(&TokenClaims::for_user(&user))?;
        Ok(LoginOutcome {
            response: AuthResponse {
                user: UserSummary::from(&user),
                token: pair.access_token,
                refresh_token: pair.refresh_token,
            },
            user,
            session_id,
        })
    }

    /// Create an account and issue tokens. Opening a session is left to the
    /// caller (see [`AuthService::open_session`]).
    pub async fn signup(&self, request: &SignupRequest) -> AuthResult<LoginOutcome> {
        let input = validation::validate_signup(request, Utc::now())?;

        if self.users.find_by_email(&input.email).await?.is_some() {
            return Err(AuthError::Conflict { field: "email" });
        }
        if self.users.find_by_username(&input.user_name).await?.is_some() {
            return Err(AuthError::Conflict { field: "userName" });
        }

        let password_hash = hash_password(&input.password, self.bcrypt_cost).await?;
        let user = self
            .users
            .create(NewUser {
                email: input.email,
                user_name: input.user_name,
                password_hash,
                first_name: input.first_name,
                last_name: input.last_name,
                gender: input.gender,
                dob: input.dob,
                phone: input.phone,
                role: input.role,
            })
            .await?;

        tracing::info!(user_id = %user.id, role = %user.role, "Account created");

        self.authenticated(user, None)
    }

    /// Record a session for an authenticated user; failures are logged only
    pub async fn open_session(&self, user: &User, client: &ClientInfo) -> Option<String> {
        self.sessions.try_record_login(user, client).await
    }

    /// Authenticate by email or username. A session is recorded on a
    /// best-effort basis.
    pub async fn login(
        &self,
        request: &LoginRequest,
        client: &ClientInfo,
    ) -> AuthResult<LoginOutcome> {
        validation::validate_login(request)?;

        let identifier = request.identifier.trim();
        let credentials = if validation::looks_like_email(identifier) {
            self.users.find_credentials_by_email(identifier).await?
        } else {
            self.users.find_credentials_by_username(identifier).await?
        };

        let credentials = match credentials {
            Some(credentials) => credentials,
            None => {
                verify_password(self.dummy_hash().await?, &request.password).await?;
                tracing::debug!("Login rejected: unknown identifier");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !verify_password(&credentials.password_hash, &request.password).await? {
            tracing::debug!(user_id = %credentials.user.id, "Login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let user = credentials.user;
        let session_id = self.open_session(&user, client).await;

        tracing::info!(user_id = %user.id, "User logged in");

        self.authenticated(user, session_id)
    }

    /// Close the caller's session and every other active session of theirs
    pub async fn logout(&self, session_id: Option<&str>, user_id: Option<&str>) {
        self.sessions.record_logout(session_id, user_id).await;
    }

    /// Change the password of an authenticated user
    pub async fn change_password(
        &self,
        user_id: &str,
        request: &ChangePasswordRequest,
    ) -> AuthResult<()> {
        validation::validate_change_password(request)?;

        let credentials = self
            .users
            .find_credentials_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("User not found".to_string()))?;

        if !verify_password(&credentials.password_hash, &request.current_password)
            .await?
        {
            return Err(AuthError::IncorrectPassword);
        }

        let password_hash = hash_password(&request.new_password, self.bcrypt_cost).await?;
        self.users.update_password(user_id, &password_hash).await?;

        tracing::info!(user_id = %user_id, "Password changed");

        Ok(())
    }

    /// Start a password reset. Succeeds identically whether or not the email
    /// belongs to an account.
    pub async fn request_password_reset(&self, request: &ForgotPasswordRequest) -> AuthResult<()> {
        validation::validate_forgot_password(request)?;

        let user = match self.users.find_by_email(&request.email).await? {
            Some(user) => user,
            None => {
                tracing::debug!("Password reset requested for unknown email");
                return Ok(());
            }
        };

        let raw_token = generate_reset_token();
        let expires_at = Utc::now() + self.reset_ttl;
        self.users
            .set_reset_token(&user.id, &hash_reset_token(&raw_token), expires_at)
            .await?;

        if let Err(e) = self.notifier.send_password_reset(&user, &raw_token).await {
            tracing::error!(user_id = %user.id, error = %e, "Failed to deliver password reset");
        } else {
            tracing::info!(user_id = %user.id, "Password reset issued");
        }

        Ok(())
    }

    /// Finish a password reset with the raw token and sign the user in
    pub async fn complete_password_reset(
        &self,
        request: &ResetPasswordRequest,
    ) -> AuthResult<LoginOutcome> {
        validation::validate_reset_password(request)?;

        let now = Utc::now();
        let token_hash = hash_reset_token(request.token.trim());

        let user = self
            .users
            .find_by_reset_token_hash(&token_hash, now)
            .await?
            .ok_or(AuthError::InvalidOrExpiredToken)?;

        let password_hash = hash_password(&request.password, self.bcrypt_cost).await?;
        if !self
            .users
            .complete_reset(&user.id, &token_hash, &password_hash, now)
            .await?
        {
            return Err(AuthError::InvalidOrExpiredToken);
        }

        tracing::info!(user_id = %user.id, "Password reset completed");

        self.authenticated(user, None)
    }

    /// Exchange a refresh token for a fresh pair. The user is reloaded so
    /// role and email changes take effect.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<LoginOutcome> {
        let claims = self.tokens.verify(refresh_token, TokenKind::Refresh)?;

        let user = self
            .users
            .find_by_id(&claims.user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        self.authenticated(user, None)
    }

    pub async fn profile(&self, user_id: &str) -> AuthResult<ProfileView> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(|user| ProfileView::from(&user))
            .ok_or_else(|| AuthError::NotFound("User not found".to_string()))
    }

    /// Apply a partial profile update, re-checking uniqueness of a changed
    /// email or username
    pub async fn update_profile(
        &self,
        user_id: &str,
        request: &UpdateProfileRequest,
    ) -> AuthResult<ProfileView> {
        let mut changes: ProfileChanges = validation::validate_profile_update(request, Utc::now())?;

        let current = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("User not found".to_string()))?;

        if let Some(email) = changes.email.take() {
            let email = super::normalize_email(&email);
            if email != current.email {
                if self.users.find_by_email(&email).await?.is_some() {
                    return Err(AuthError::Conflict { field: "email" });
                }
                changes.email = Some(email);
            }
        }

        if let Some(user_name) = changes.user_name.take() {
            if user_name != current.user_name {
                if self.users.find_by_username(&user_name).await?.is_some() {
                    return Err(AuthError::Conflict { field: "userName" });
                }
                changes.user_name = Some(user_name);
            }
        }

        if changes.is_empty() {
            return Ok(ProfileView::from(&current));
        }

        let user = self.users.update_profile(user_id, changes).await?;
        tracing::info!(user_id = %user.id, "Profile updated");

        Ok(ProfileView::from(&user))
    }

    /// Paginated user listing, admin only
    pub async fn list_users(
        &self,
        viewer: Role,
        filter: &UserFilter,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> AuthResult<UserPage> {
        if !viewer.can_manage_users() {
            return Err(AuthError::Forbidden("Access denied. Admin role required.".to_string()));
        }

        let (page, limit) = Pagination::clamp(page, limit);
        let total = self.users.count(filter).await?;
        let users = self
            .users
            .list(filter, Pagination::offset(page, limit), limit)
            .await?;

        Ok(UserPage {
            users: users.iter().map(UserSummary::from).collect(),
            pagination: Pagination::new(page, limit, total),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::test_config,
        db::{memory_pool, session::SessionStatus},
    };
    use sqlx::SqlitePool;
    use tokio::sync::Mutex;

    /// Captures reset tokens instead of delivering them
    #[derive(Default)]
    struct CapturingNotifier {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl ResetNotifier for CapturingNotifier {
        async fn send_password_reset(&self, user: &User, raw_token: &str) -> AuthResult<()> {
            if self.fail {
                return Err(AuthError::Internal("smtp down".to_string()));
            }
            self.sent
                .lock()
                .await
                .push((user.email.clone(), raw_token.to_string()));
            Ok(())
        }
    }

    struct Harness {
        auth: AuthService,
        tokens: Arc<TokenService>,
        sessions: Arc<SessionTracker>,
        notifier: Arc<CapturingNotifier>,
        pool: SqlitePool,
    }

    async fn harness_with(notifier: CapturingNotifier) -> Harness {
        let config = test_config();
        let pool = memory_pool().await.unwrap();
        let tokens = Arc::new(TokenService::new(&config.authentication));
        let sessions = Arc::new(SessionTracker::new(pool.clone()));
        let notifier = Arc::new(notifier);
        let auth = AuthService::new(
            Arc::new(UserStore::new(pool.clone())),
            tokens.clone(),
            sessions.clone(),
            notifier.clone(),
            config.authentication.bcrypt_cost,
            config.authentication.reset_ttl(),
        );
        Harness {
            auth,
            tokens,
            sessions,
            notifier,
            pool,
        }
    }

    async fn harness() -> Harness {
        harness_with(CapturingNotifier::default()).await
    }

    fn signup_request(email: &str, user_name: &str) -> SignupRequest {
        SignupRequest {
            email: email.to_string(),
            password: "secret123".to_string(),
            confirm_password: "secret123".to_string(),
            user_name: user_name.to_string(),
            first_name: "Alice".to_string(),
            last_name: "Smith".to_string(),
            gender: "female".to_string(),
            dob: "1990-05-17".to_string(),
            phone: "+1 (555) 010-0000".to_string(),
            role: None,
        }
    }

    fn login_request(identifier: &str, password: &str) -> LoginRequest {
        LoginRequest {
            identifier: identifier.to_string(),
            password: password.to_string(),
        }
    }

    async fn user_count(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_signup_issues_verifiable_tokens() {
        let h = harness().await;
        let outcome = h.auth.signup(&signup_request("Alice@Example.com", "alice")).await.unwrap();

        assert_eq!(outcome.user.role, Role::User);
        assert_eq!(outcome.response.user.full_name, "Alice Smith");
        assert!(outcome.session_id.is_none());

        let expected = TokenClaims {
            user_id: outcome.user.id.clone(),
            email: "alice@example.com".to_string(),
            role: Role::User,
        };
        assert_eq!(h.tokens.verify(&outcome.response.token, TokenKind::Access).unwrap(), expected);
        assert_eq!(
            h.tokens.verify(&outcome.response.refresh_token, TokenKind::Refresh).unwrap(),
            expected
        );
    }

    #[tokio::test]
    async fn test_signup_stores_hashed_password() {
        let h = harness().await;
        let outcome = h.auth.signup(&signup_request("a@example.com", "alice")).await.unwrap();

        let stored: String = sqlx::query_scalar("SELECT password_hash FROM users WHERE id = ?1")
            .bind(&outcome.user.id)
            .fetch_one(&h.pool)
            .await
            .unwrap();
        assert_ne!(stored, "secret123");
        assert!(verify_password(&stored, "secret123").await.unwrap());
    }

    #[tokio::test]
    async fn test_signup_conflicts_name_the_field() {
        let h = harness().await;
        h.auth.signup(&signup_request("a@example.com", "alice")).await.unwrap();

        let err = h.auth.signup(&signup_request("A@example.com", "other")).await.unwrap_err();
        assert!(matches!(err, AuthError::Conflict { field: "email" }));

        let err = h.auth.signup(&signup_request("b@example.com", "alice")).await.unwrap_err();
        assert!(matches!(err, AuthError::Conflict { field: "userName" }));

        assert_eq!(user_count(&h.pool).await, 1);
    }

    #[tokio::test]
    async fn test_signup_future_dob_rejected_before_store() {
        let h = harness().await;
        let mut request = signup_request("a@example.com", "alice");
        request.dob = (Utc::now() + Duration::days(1)).date_naive().to_string();

        match h.auth.signup(&request).await.unwrap_err() {
            AuthError::Validation(errors) => assert_eq!(errors[0].field, "dob"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(user_count(&h.pool).await, 0);
    }

    #[tokio::test]
    async fn test_login_by_email_or_username_records_session() {
        let h = harness().await;
        h.auth.signup(&signup_request("a@example.com", "alice")).await.unwrap();
        let client = ClientInfo {
            ip_address: Some("198.51.100.4".to_string()),
            user_agent: Some("test-agent".to_string()),
        };

        let by_email = h
            .auth
            .login(&login_request("A@EXAMPLE.COM", "secret123"), &client)
            .await
            .unwrap();
        let by_name = h.auth.login(&login_request("alice", "secret123"), &client).await.unwrap();
        assert_eq!(by_email.user.id, by_name.user.id);

        let session_id = by_email.session_id.unwrap();
        let session = h.sessions.get(&session_id).await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(session.user_agent.as_deref(), Some("test-agent"));
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let h = harness().await;
        h.auth.signup(&signup_request("a@example.com", "alice")).await.unwrap();
        let client = ClientInfo::default();

        let wrong_password = h
            .auth
            .login(&login_request("alice", "nope-nope"), &client)
            .await
            .unwrap_err();
        let unknown_user = h
            .auth
            .login(&login_request("nobody@example.com", "secret123"), &client)
            .await
            .unwrap_err();

        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_user, AuthError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[tokio::test]
    async fn test_unknown_identifier_still_verifies_a_hash() {
        let h = harness().await;
        assert!(!h.auth.dummy_hash.initialized());

        let err = h
            .auth
            .login(&login_request("ghost", "secret123"), &ClientInfo::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        // The unknown-account path hashed at the configured cost
        let dummy = h.auth.dummy_hash.get().unwrap();
        assert!(dummy.starts_with("$2b$04$"));
        assert!(verify_password(dummy, DUMMY_PASSWORD).await.unwrap());
    }

    #[tokio::test]
    async fn test_login_survives_session_write_failure() {
        let h = harness().await;
        h.auth.signup(&signup_request("a@example.com", "alice")).await.unwrap();
        sqlx::query("DROP TABLE sessions").execute(&h.pool).await.unwrap();

        let outcome = h
            .auth
            .login(&login_request("alice", "secret123"), &ClientInfo::default())
            .await
            .unwrap();
        assert!(outcome.session_id.is_none());
        assert!(h.tokens.verify(&outcome.response.token, TokenKind::Access).is_ok());
    }

    #[tokio::test]
    async fn test_logout_closes_session_once() {
        let h = harness().await;
        h.auth.signup(&signup_request("a@example.com", "alice")).await.unwrap();
        let outcome = h
            .auth
            .login(&login_request("alice", "secret123"), &ClientInfo::default())
            .await
            .unwrap();
        let session_id = outcome.session_id.unwrap();

        h.auth.logout(Some(&session_id), Some(&outcome.user.id)).await;
        let closed = h.sessions.get(&session_id).await.unwrap().unwrap();
        assert_eq!(closed.status, SessionStatus::LoggedOut);

        h.auth.logout(Some(&session_id), Some(&outcome.user.id)).await;
        let again = h.sessions.get(&session_id).await.unwrap().unwrap();
        assert_eq!(again.logout_time, closed.logout_time);
    }

    #[tokio::test]
    async fn test_change_password() {
        let h = harness().await;
        let user = h.auth.signup(&signup_request("a@example.com", "alice")).await.unwrap().user;

        let wrong = ChangePasswordRequest {
            current_password: "not-it".to_string(),
            new_password: "newpass1".to_string(),
            confirm_password: "newpass1".to_string(),
        };
        assert!(matches!(
            h.auth.change_password(&user.id, &wrong).await.unwrap_err(),
            AuthError::IncorrectPassword
        ));

        let right = ChangePasswordRequest {
            current_password: "secret123".to_string(),
            ..wrong
        };
        h.auth.change_password(&user.id, &right).await.unwrap();

        let client = ClientInfo::default();
        assert!(h.auth.login(&login_request("alice", "newpass1"), &client).await.is_ok());
        assert!(h.auth.login(&login_request("alice", "secret123"), &client).await.is_err());
    }

    #[tokio::test]
    async fn test_password_reset_flow_is_single_use() {
        let h = harness().await;
        let user = h.auth.signup(&signup_request("a@example.com", "alice")).await.unwrap().user;

        h.auth
            .request_password_reset(&ForgotPasswordRequest {
                email: "A@example.com".to_string(),
            })
            .await
            .unwrap();

        let (email, raw_token) = h.notifier.sent.lock().await[0].clone();
        assert_eq!(email, "a@example.com");

        let stored: String = sqlx::query_scalar("SELECT reset_token_hash FROM users WHERE id = ?1")
            .bind(&user.id)
            .fetch_one(&h.pool)
            .await
            .unwrap();
        assert_ne!(stored, raw_token);
        assert_eq!(stored, hash_reset_token(&raw_token));

        let request = ResetPasswordRequest {
            token: raw_token.clone(),
            password: "brandnew1".to_string(),
        };
        let outcome = h.auth.complete_password_reset(&request).await.unwrap();
        assert_eq!(outcome.user.id, user.id);
        assert!(h.tokens.verify(&outcome.response.token, TokenKind::Access).is_ok());

        let reuse = h.auth.complete_password_reset(&request).await.unwrap_err();
        assert!(matches!(reuse, AuthError::InvalidOrExpiredToken));

        assert!(h
            .auth
            .login(&login_request("alice", "brandnew1"), &ClientInfo::default())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_password_reset_unknown_email_is_silent() {
        let h = harness().await;
        h.auth
            .request_password_reset(&ForgotPasswordRequest {
                email: "ghost@example.com".to_string(),
            })
            .await
            .unwrap();
        assert!(h.notifier.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_password_reset_notifier_failure_is_swallowed() {
        let h = harness_with(CapturingNotifier {
            fail: true,
            ..Default::default()
        })
        .await;
        h.auth.signup(&signup_request("a@example.com", "alice")).await.unwrap();

        assert!(h
            .auth
            .request_password_reset(&ForgotPasswordRequest {
                email: "a@example.com".to_string(),
            })
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_expired_or_unknown_reset_token_mutates_nothing() {
        let h = harness().await;
        let user = h.auth.signup(&signup_request("a@example.com", "alice")).await.unwrap().user;

        let raw = generate_reset_token();
        sqlx::query(
            "UPDATE users SET reset_token_hash = ?1, reset_token_expires = ?2 WHERE id = ?3",
        )
        .bind(hash_reset_token(&raw))
        .bind(Utc::now() - Duration::minutes(1))
        .bind(&user.id)
        .execute(&h.pool)
        .await
        .unwrap();

        for token in [raw.as_str(), "0123456789abcdef"] {
            let err = h
                .auth
                .complete_password_reset(&ResetPasswordRequest {
                    token: token.to_string(),
                    password: "brandnew1".to_string(),
                })
                .await
                .unwrap_err();
            assert!(matches!(err, AuthError::InvalidOrExpiredToken));
        }

        assert!(h
            .auth
            .login(&login_request("alice", "secret123"), &ClientInfo::default())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_refresh_reloads_user() {
        let h = harness().await;
        let outcome = h.auth.signup(&signup_request("a@example.com", "alice")).await.unwrap();
        sqlx::query("UPDATE users SET role = 'supervisor' WHERE id = ?1")
            .bind(&outcome.user.id)
            .execute(&h.pool)
            .await
            .unwrap();

        let refreshed = h.auth.refresh(&outcome.response.refresh_token).await.unwrap();
        let claims = h.tokens.verify(&refreshed.response.token, TokenKind::Access).unwrap();
        assert_eq!(claims.role, Role::Supervisor);

        assert!(matches!(
            h.auth.refresh(&outcome.response.token).await.unwrap_err(),
            AuthError::InvalidToken
        ));
    }

    #[tokio::test]
    async fn test_update_profile_rechecks_uniqueness() {
        let h = harness().await;
        let alice = h.auth.signup(&signup_request("a@example.com", "alice")).await.unwrap().user;
        h.auth.signup(&signup_request("b@example.com", "bob")).await.unwrap();

        let taken = UpdateProfileRequest {
            user_name: Some("bob".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            h.auth.update_profile(&alice.id, &taken).await.unwrap_err(),
            AuthError::Conflict { field: "userName" }
        ));

        let same_email = UpdateProfileRequest {
            email: Some("A@example.com".to_string()),
            first_name: Some("Alicia".to_string()),
            ..Default::default()
        };
        let view = h.auth.update_profile(&alice.id, &same_email).await.unwrap();
        assert_eq!(view.first_name, "Alicia");
        assert_eq!(view.full_name, "Alicia Smith");
        assert_eq!(view.email, "a@example.com");
    }

    #[tokio::test]
    async fn test_list_users_admin_only() {
        let h = harness().await;
        h.auth.signup(&signup_request("a@example.com", "alice")).await.unwrap();
        h.auth.signup(&signup_request("b@example.com", "bob")).await.unwrap();

        assert!(matches!(
            h.auth
                .list_users(Role::Supervisor, &UserFilter::default(), None, None)
                .await
                .unwrap_err(),
            AuthError::Forbidden(_)
        ));

        let page = h
            .auth
            .list_users(Role::Admin, &UserFilter::default(), Some(1), Some(1))
            .await
            .unwrap();
        assert_eq!(page.users.len(), 1);
        assert_eq!(page.pagination.total, 2);
        assert_eq!(page.pagination.total_pages, 2);
    }
}
