/// Login session tracking
///
/// Records one row per successful login and closes it on logout. Writes from
/// the login and logout paths are advisory: callers go through
/// [`SessionTracker::try_record_login`] and [`SessionTracker::record_logout`],
/// which log failures instead of returning them.
use crate::{
    db::{
        session::{session_from_row, SessionFilter, SessionRecord, SessionStatus, SESSION_COLUMNS},
        user::{Role, User},
    },
    error::{AuthError, AuthResult},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

pub const DEFAULT_PAGE_LIMIT: i64 = 50;
pub const MAX_PAGE_LIMIT: i64 = 100;
/// Highest page whose row offset still fits in an `i64`
pub const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_LIMIT;

/// Where a login came from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Session as exposed to reviewers, with its computed duration
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: String,
    pub user_id: String,
    pub email: String,
    pub user_name: String,
    pub role: Role,
    pub login_time: DateTime<Utc>,
    pub logout_time: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    /// Whole minutes, `None` while the session is still active
    pub duration: Option<i64>,
}

impl From<SessionRecord> for SessionView {
    fn from(record: SessionRecord) -> Self {
        let duration = record.duration_minutes();
        Self {
            id: record.id,
            user_id: record.user_id,
            email: record.email,
            user_name: record.user_name,
            role: record.role,
            login_time: record.login_time,
            logout_time: record.logout_time,
            status: record.status,
            ip_address: record.ip_address,
            user_agent: record.user_agent,
            duration,
        }
    }
}

/// Pagination block shared by listing endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        Self {
            page,
            limit,
            total,
            total_pages: (total + limit - 1) / limit,
        }
    }

    /// Clamp requested paging to `1 <= page <= MAX_PAGE` and `1 <= limit <= 100`
    pub fn clamp(page: Option<i64>, limit: Option<i64>) -> (i64, i64) {
        let page = page.unwrap_or(1).clamp(1, MAX_PAGE);
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);
        (page, limit)
    }

    pub fn offset(page: i64, limit: i64) -> i64 {
        (page - 1).saturating_mul(limit)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionPage {
    pub sessions: Vec<SessionView>,
    pub pagination: Pagination,
}

/// Session tracker
#[derive(Clone)]
pub struct SessionTracker {
    db: SqlitePool,
}

impl SessionTracker {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Insert an active session for a fresh login
    pub async fn record_login(
        &self,
        user: &User,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> AuthResult<SessionRecord> {
        let record = SessionRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            email: user.email.clone(),
            user_name: user.user_name.clone(),
            role: user.role,
            login_time: Utc::now(),
            logout_time: None,
            status: SessionStatus::Active,
            ip_address: ip_address.map(str::to_string),
            user_agent: user_agent.map(str::to_string),
        };

        sqlx::query(
            "INSERT INTO sessions (id, user_id, email, user_name, role, login_time, status,
                                   ip_address, user_agent, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?6, ?6)",
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(&record.email)
        .bind(&record.user_name)
        .bind(record.role.as_str())
        .bind(record.login_time)
        .bind(record.status.as_str())
        .bind(&record.ip_address)
        .bind(&record.user_agent)
        .execute(&self.db)
        .await?;

        tracing::debug!(session_id = %record.id, user_id = %record.user_id, "Session opened");

        Ok(record)
    }

    /// Record a login without letting a failure reach the caller.
    /// Returns the new session id when the write succeeded.
    pub async fn try_record_login(&self, user: &User, client: &ClientInfo) -> Option<String> {
        match self
            .record_login(user, client.ip_address.as_deref(), client.user_agent.as_deref())
            .await
        {
            Ok(record) => Some(record.id),
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "Failed to record login session");
                None
            }
        }
    }

    /// Close a session if it is still active. Returns whether it transitioned.
    pub async fn close_session(&self, session_id: &str) -> AuthResult<bool> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE sessions SET status = 'logged_out', logout_time = ?1, updated_at = ?1
             WHERE id = ?2 AND status = 'active'",
        )
        .bind(now)
        .bind(session_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Close every active session of a user. Returns the number closed.
    pub async fn close_all_for_user(&self, user_id: &str) -> AuthResult<u64> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE sessions SET status = 'logged_out', logout_time = ?1, updated_at = ?1
             WHERE user_id = ?2 AND status = 'active'",
        )
        .bind(now)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    /// Close the given session and, independently, all active sessions of the
    /// given user. Both steps run; failures are logged only.
    pub async fn record_logout(&self, session_id: Option<&str>, user_id: Option<&str>) {
        if let Some(session_id) = session_id {
            if let Err(e) = self.close_session(session_id).await {
                tracing::warn!(session_id = %session_id, error = %e, "Failed to close session");
            }
        }

        if let Some(user_id) = user_id {
            match self.close_all_for_user(user_id).await {
                Ok(closed) => {
                    tracing::debug!(user_id = %user_id, closed, "Closed active sessions")
                }
                Err(e) => {
                    tracing::warn!(user_id = %user_id, error = %e, "Failed to close user sessions")
                }
            }
        }
    }

    /// Get a single session
    pub async fn get(&self, session_id: &str) -> AuthResult<Option<SessionRecord>> {
        let row = sqlx::query(&format!("SELECT {} FROM sessions WHERE id = ?1", SESSION_COLUMNS))
            .bind(session_id)
            .fetch_optional(&self.db)
            .await?;

        row.as_ref().map(session_from_row).transpose()
    }

    /// List sessions newest first. Only admins and supervisors may call this.
    pub async fn list_sessions(
        &self,
        viewer: Role,
        filter: &SessionFilter,
        page: i64,
        limit: i64,
    ) -> AuthResult<SessionPage> {
        if !viewer.can_view_sessions() {
            return Err(AuthError::Forbidden(
                "Access denied. Admin or supervisor role required.".to_string(),
            ));
        }

        let (page, limit) = Pagination::clamp(Some(page), Some(limit));
        let status = filter.status.map(|s| s.as_str());

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sessions
             WHERE (?1 IS NULL OR user_id = ?1) AND (?2 IS NULL OR status = ?2)",
        )
        .bind(&filter.user_id)
        .bind(status)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query(&format!(
            "SELECT {} FROM sessions
             WHERE (?1 IS NULL OR user_id = ?1) AND (?2 IS NULL OR status = ?2)
             ORDER BY login_time DESC
             LIMIT ?3 OFFSET ?4",
            SESSION_COLUMNS
        ))
        .bind(&filter.user_id)
        .bind(status)
        .bind(limit)
        .bind(Pagination::offset(page, limit))
        .fetch_all(&self.db)
        .await?;

        let sessions = rows
            .iter()
            .map(|row| session_from_row(row).map(SessionView::from))
            .collect::<AuthResult<Vec<_>>>()?;

        Ok(SessionPage {
            sessions,
            pagination: Pagination::new(page, limit, total),
        })
    }
}
