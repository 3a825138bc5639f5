/// Application context and dependency injection
use crate::{
    account::{AuthService, ResetNotifier, UserStore},
    config::ServerConfig,
    db,
    error::{AuthError, AuthResult},
    mailer::Mailer,
    session::SessionTracker,
    token::TokenService,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub users: Arc<UserStore>,
    pub tokens: Arc<TokenService>,
    pub sessions: Arc<SessionTracker>,
    pub auth: Arc<AuthService>,
    pub mailer: Arc<Mailer>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> AuthResult<Self> {
        // Validate configuration
        config.validate()?;

        Self::ensure_directories(&config).await?;

        let db = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        let mailer = Arc::new(Mailer::new(
            config.email.clone(),
            config.service.frontend_url.clone(),
            config.authentication.reset_ttl(),
        )?);

        Ok(Self::with_pool(config, db, mailer))
    }

    /// Wire services over an existing pool
    pub fn with_pool(config: ServerConfig, db: SqlitePool, mailer: Arc<Mailer>) -> Self {
        let notifier: Arc<dyn ResetNotifier> = mailer.clone();
        Self::with_notifier(config, db, mailer, notifier)
    }

    /// Wire services with a custom reset notifier
    pub fn with_notifier(
        config: ServerConfig,
        db: SqlitePool,
        mailer: Arc<Mailer>,
        notifier: Arc<dyn ResetNotifier>,
    ) -> Self {
        let users = Arc::new(UserStore::new(db.clone()));
        let tokens = Arc::new(TokenService::new(&config.authentication));
        let sessions = Arc::new(SessionTracker::new(db.clone()));

        let auth = Arc::new(AuthService::new(
            users.clone(),
            tokens.clone(),
            sessions.clone(),
            notifier,
            config.authentication.bcrypt_cost,
            config.authentication.reset_ttl(),
        ));

        Self {
            config: Arc::new(config),
            db,
            users,
            tokens,
            sessions,
            auth,
            mailer,
        }
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> AuthResult<()> {
        let dir = &config.storage.data_directory;
        if !dir.exists() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                AuthError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
            })?;
        }

        Ok(())
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
