/// Login session database models
use crate::{
    db::user::Role,
    error::{AuthError, AuthResult},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row};
use std::str::FromStr;

/// Session state. Only `Active -> LoggedOut` is ever written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    LoggedOut,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::LoggedOut => "logged_out",
        }
    }
}

impl FromStr for SessionStatus {
    type Err = AuthError;

    fn from_str(s: &str) -> AuthResult<Self> {
        match s {
            "active" => Ok(SessionStatus::Active),
            "logged_out" => Ok(SessionStatus::LoggedOut),
            _ => Err(AuthError::invalid("status", "Invalid session status")),
        }
    }
}

/// One login episode, with the user's identity snapshotted at login time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
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
}

impl SessionRecord {
    /// Whole minutes between login and logout, rounded; `None` while active
    pub fn duration_minutes(&self) -> Option<i64> {
        self.logout_time.map(|logout| {
            let millis = (logout - self.login_time).num_milliseconds();
            (millis as f64 / 60_000.0).round() as i64
        })
    }
}

/// Filter for session listings
#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    pub user_id: Option<String>,
    pub status: Option<SessionStatus>,
}

pub(crate) const SESSION_COLUMNS: &str = "id, user_id, email, user_name, role, login_time, \
     logout_time, status, ip_address, user_agent";

pub(crate) fn session_from_row(row: &SqliteRow) -> AuthResult<SessionRecord> {
    let role: String = row.try_get("role")?;
    let status: String = row.try_get("status")?;

    Ok(SessionRecord {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        email: row.try_get("email")?,
        user_name: row.try_get("user_name")?,
        role: role
            .parse()
            .map_err(|_| AuthError::Internal(format!("Stored role is invalid: {}", role)))?,
        login_time: row.try_get("login_time")?,
        logout_time: row.try_get("logout_time")?,
        status: status
            .parse()
            .map_err(|_| AuthError::Internal(format!("Stored status is invalid: {}", status)))?,
        ip_address: row.try_get("ip_address")?,
        user_agent: row.try_get("user_agent")?,
    })
}
