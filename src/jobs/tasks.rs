/// Background task implementations
use crate::{context::AppContext, error::AuthResult};
use chrono::Utc;

/// Clear reset-token hash and expiry together once the expiry has passed
pub async fn cleanup_expired_reset_tokens(ctx: &AppContext) -> AuthResult<u64> {
    ctx.users.clear_expired_reset_tokens(Utc::now()).await
}

/// Health check - verify the database is reachable
pub async fn health_check(ctx: &AppContext) -> AuthResult<()> {
    sqlx::query("SELECT 1").fetch_one(&ctx.db).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        account::store_tests::new_user, config::test_config, db::memory_pool, db::user::Role,
        mailer::Mailer,
    };
    use chrono::Duration;
    use std::sync::Arc;

    async fn context() -> AppContext {
        let config = test_config();
        let mailer = Mailer::new(
            None,
            config.service.frontend_url.clone(),
            config.authentication.reset_ttl(),
        )
        .unwrap();
        let mailer = Arc::new(mailer);
        AppContext::with_pool(config, memory_pool().await.unwrap(), mailer)
    }

    #[tokio::test]
    async fn test_cleanup_expired_reset_tokens() {
        let ctx = context().await;
        let user = ctx
            .users
            .create(new_user("a@example.com", "alice", Role::User))
            .await
            .unwrap();
        ctx.users
            .set_reset_token(&user.id, "stale", Utc::now() - Duration::minutes(1))
            .await
            .unwrap();

        assert_eq!(cleanup_expired_reset_tokens(&ctx).await.unwrap(), 1);
        assert_eq!(cleanup_expired_reset_tokens(&ctx).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_health_check() {
        let ctx = context().await;
        assert!(health_check(&ctx).await.is_ok());
    }
}
