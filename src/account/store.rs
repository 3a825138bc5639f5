/// Credential store over SQLite
///
/// Default reads never select the password hash or reset-token columns. The
/// `*_credentials` methods are the only secret-bearing read path and exist for
/// credential verification.
use crate::{
    db::{
        is_unique_violation,
        user::{
            user_from_row, NewUser, ProfileChanges, User, UserCredentials, UserFilter,
            USER_COLUMNS,
        },
    },
    error::{AuthError, AuthResult},
};
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use uuid::Uuid;

/// Lower-case and trim an email before it touches the store
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// User persistence
#[derive(Clone)]
pub struct UserStore {
    db: SqlitePool,
}

impl UserStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Get user by id
    pub async fn find_by_id(&self, id: &str) -> AuthResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Get user by email (case-insensitive)
    pub async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS))
            .bind(normalize_email(email))
            .fetch_optional(&self.db)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Get user by username (exact match)
    pub async fn find_by_username(&self, user_name: &str) -> AuthResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE user_name = ?1", USER_COLUMNS))
            .bind(user_name.trim())
            .fetch_optional(&self.db)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    pub async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> AuthResult<Option<UserCredentials>> {
        self.find_credentials("email", &normalize_email(email)).await
    }

    pub async fn find_credentials_by_username(
        &self,
        user_name: &str,
    ) -> AuthResult<Option<UserCredentials>> {
        self.find_credentials("user_name", user_name.trim()).await
    }

    pub async fn find_credentials_by_id(&self, id: &str) -> AuthResult<Option<UserCredentials>> {
        self.find_credentials("id", id).await
    }

    async fn find_credentials(
        &self,
        column: &'static str,
        value: &str,
    ) -> AuthResult<Option<UserCredentials>> {
        let row = sqlx::query(&format!(
            "SELECT {}, password_hash FROM users WHERE {} = ?1",
            USER_COLUMNS, column
        ))
        .bind(value)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => Ok(Some(UserCredentials {
                user: user_from_row(&row)?,
                password_hash: row.try_get("password_hash")?,
            })),
            None => Ok(None),
        }
    }

    /// Find the user holding an unexpired reset token with this hash
    pub async fn find_by_reset_token_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE reset_token_hash = ?1 AND reset_token_expires > ?2",
            USER_COLUMNS
        ))
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.db)
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Insert a new user. Uniqueness of email and username is enforced by the
    /// schema, so a concurrent duplicate surfaces here as `Conflict`.
    pub async fn create(&self, new_user: NewUser) -> AuthResult<User> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let email = normalize_email(&new_user.email);

        sqlx::query(
            "INSERT INTO users (id, email, user_name, password_hash, first_name, last_name, gender,
                                dob, phone, role, is_email_verified, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        )
        .bind(&id)
        .bind(&email)
        .bind(&new_user.user_name)
        .bind(&new_user.password_hash)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(new_user.gender.as_str())
        .bind(new_user.dob)
        .bind(&new_user.phone)
        .bind(new_user.role.as_str())
        .bind(false)
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(map_unique_violation)?;

        Ok(User {
            id,
            email,
            user_name: new_user.user_name,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            gender: new_user.gender,
            dob: new_user.dob,
            phone: new_user.phone,
            role: new_user.role,
            is_email_verified: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a partial profile update and return the updated user
    pub async fn update_profile(&self, id: &str, changes: ProfileChanges) -> AuthResult<User> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE users SET ");
        {
            let mut set = query.separated(", ");
            if let Some(email) = changes.email {
                set.push("email = ");
                set.push_bind_unseparated(normalize_email(&email));
            }
            if let Some(user_name) = changes.user_name {
                set.push("user_name = ");
                set.push_bind_unseparated(user_name);
            }
            if let Some(first_name) = changes.first_name {
                set.push("first_name = ");
                set.push_bind_unseparated(first_name);
            }
            if let Some(last_name) = changes.last_name {
                set.push("last_name = ");
                set.push_bind_unseparated(last_name);
            }
            if let Some(gender) = changes.gender {
                set.push("gender = ");
                set.push_bind_unseparated(gender.as_str());
            }
            if let Some(dob) = changes.dob {
                set.push("dob = ");
                set.push_bind_unseparated(dob);
            }
            if let Some(phone) = changes.phone {
                set.push("phone = ");
                set.push_bind_unseparated(phone);
            }
            set.push("updated_at = ");
            set.push_bind_unseparated(Utc::now());
        }
        query.push(" WHERE id = ");
        query.push_bind(id);

        let result = query
            .build()
            .execute(&self.db)
            .await
            .map_err(map_unique_violation)?;

        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound("User not found".to_string()));
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AuthError::NotFound("User not found".to_string()))
    }

    /// Replace the stored password hash
    pub async fn update_password(&self, id: &str, password_hash: &str) -> AuthResult<()> {
        let result =
            sqlx::query("UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3")
                .bind(password_hash)
                .bind(Utc::now())
                .bind(id)
                .execute(&self.db)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound("User not found".to_string()));
        }

        Ok(())
    }

    /// Store a reset-token hash and its expiry together
    pub async fn set_reset_token(
        &self,
        id: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<()> {
        sqlx::query(
            "UPDATE users SET reset_token_hash = ?1, reset_token_expires = ?2, updated_at = ?3
             WHERE id = ?4",
        )
        .bind(token_hash)
        .bind(expires_at)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Set the new password and clear both reset-token fields, but only while
    /// the presented hash is still the stored, unexpired one. Returns false
    /// when another request consumed the token first.
    pub async fn complete_reset(
        &self,
        id: &str,
        token_hash: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<bool> {
        let result = sqlx::query(
            "UPDATE users
             SET password_hash = ?1, reset_token_hash = NULL, reset_token_expires = NULL,
                 updated_at = ?2
             WHERE id = ?3 AND reset_token_hash = ?4 AND reset_token_expires > ?2",
        )
        .bind(password_hash)
        .bind(now)
        .bind(id)
        .bind(token_hash)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Clear reset-token fields whose expiry has passed
    pub async fn clear_expired_reset_tokens(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        let result = sqlx::query(
            "UPDATE users SET reset_token_hash = NULL, reset_token_expires = NULL
             WHERE reset_token_expires IS NOT NULL AND reset_token_expires <= ?1",
        )
        .bind(now)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    /// Count users matching a filter
    pub async fn count(&self, filter: &UserFilter) -> AuthResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE (?1 IS NULL OR role = ?1)")
                .bind(filter.role.map(|r| r.as_str()))
                .fetch_one(&self.db)
                .await?;

        Ok(count)
    }

    /// List users matching a filter, newest first
    pub async fn list(
        &self,
        filter: &UserFilter,
        offset: i64,
        limit: i64,
    ) -> AuthResult<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM users
             WHERE (?1 IS NULL OR role = ?1)
             ORDER BY created_at DESC
             LIMIT ?2 OFFSET ?3",
            USER_COLUMNS
        ))
        .bind(filter.role.map(|r| r.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(user_from_row).collect()
    }
}

/// Translate a schema-level uniqueness failure into the matching `Conflict`
fn map_unique_violation(err: sqlx::Error) -> AuthError {
    if is_unique_violation(&err, "users.email") {
        AuthError::Conflict { field: "email" }
    } else if is_unique_violation(&err, "users.user_name") {
        AuthError::Conflict { field: "userName" }
    } else {
        AuthError::Database(err)
    }
}
