use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{error, info};

pub mod tasks;

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<crate::context::AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<crate::context::AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        info!("Starting background job scheduler");

        tokio::spawn(Self::expired_reset_token_cleanup_job(Arc::clone(&self)));
        tokio::spawn(Self::health_check_job(Arc::clone(&self)));

        info!("Background jobs started");
    }

    /// Clear expired password reset tokens (runs every 15 minutes)
    async fn expired_reset_token_cleanup_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(900));

        loop {
            interval.tick().await;

            match tasks::cleanup_expired_reset_tokens(&scheduler.context).await {
                Ok(count) => {
                    if count > 0 {
                        info!(count, "Cleared expired password reset tokens");
                    }
                }
                Err(e) => error!(error = %e, "Failed to clear expired reset tokens"),
            }
        }
    }

    /// Health check job (runs every 5 minutes)
    async fn health_check_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(300));

        loop {
            interval.tick().await;

            if let Err(e) = tasks::health_check(&scheduler.context).await {
                error!(error = %e, "Health check failed");
            }
        }
    }
}
