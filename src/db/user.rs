/// User database models
use crate::error::{AuthError, AuthResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row};
use std::fmt;
use std::str::FromStr;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Supervisor,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Supervisor => "supervisor",
            Role::User => "user",
        }
    }

    /// Admins and supervisors may review login sessions
    pub fn can_view_sessions(&self) -> bool {
        matches!(self, Role::Admin | Role::Supervisor)
    }

    pub fn can_manage_users(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> AuthResult<Self> {
        match s {
            "admin" => Ok(Role::Admin),
            "supervisor" => Ok(Role::Supervisor),
            "user" => Ok(Role::User),
            _ => Err(AuthError::invalid("role", "Invalid role")),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Self-declared gender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Gender {
    Male,
    Female,
    Other,
    PreferNotToSay,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
            Gender::PreferNotToSay => "prefer-not-to-say",
        }
    }
}

impl FromStr for Gender {
    type Err = AuthError;

    fn from_str(s: &str) -> AuthResult<Self> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            "prefer-not-to-say" => Ok(Gender::PreferNotToSay),
            _ => Err(AuthError::invalid("gender", "Please select a valid gender")),
        }
    }
}

/// User record as returned by default reads. Never carries the password hash
/// or the reset-token fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub dob: NaiveDate,
    pub phone: String,
    pub role: Role,
    pub is_email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// "First Last"
pub fn full_name(user: &User) -> String {
    format!("{} {}", user.first_name, user.last_name)
}

/// User record read through the secret-bearing path, used only to verify
/// credentials.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

/// Fields required to create a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub user_name: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub dob: NaiveDate,
    pub phone: String,
    pub role: Role,
}

/// Partial profile update; `None` leaves the column untouched
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub email: Option<String>,
    pub user_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<Gender>,
    pub dob: Option<NaiveDate>,
    pub phone: Option<String>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.user_name.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.gender.is_none()
            && self.dob.is_none()
            && self.phone.is_none()
    }
}

/// Filter for user listings
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
}

/// Columns selected by default projections
pub(crate) const USER_COLUMNS: &str = "id, email, user_name, first_name, last_name, gender, dob, \
     phone, role, is_email_verified, created_at, updated_at";

/// Map a row selected with [`USER_COLUMNS`] to a [`User`]
pub(crate) fn user_from_row(row: &SqliteRow) -> AuthResult<User> {
    let gender: String = row.try_get("gender")?;
    let role: String = row.try_get("role")?;

    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        user_name: row.try_get("user_name")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        gender: gender
            .parse()
            .map_err(|_| AuthError::Internal(format!("Stored gender is invalid: {}", gender)))?,
        dob: row.try_get("dob")?,
        phone: row.try_get("phone")?,
        role: role
            .parse()
            .map_err(|_| AuthError::Internal(format!("Stored role is invalid: {}", role)))?,
        is_email_verified: row.try_get("is_email_verified")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_str() {
        for role in [Role::Admin, Role::Supervisor, Role::User] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("superadmin".parse::<Role>().is_err());
        assert_eq!(Role::default(), Role::User);
    }

    #[test]
    fn test_role_permissions() {
        assert!(Role::Admin.can_view_sessions());
        assert!(Role::Supervisor.can_view_sessions());
        assert!(!Role::User.can_view_sessions());
        assert!(Role::Admin.can_manage_users());
        assert!(!Role::Supervisor.can_manage_users());
    }

    #[test]
    fn test_gender_serde_uses_kebab_case() {
        let json = serde_json::to_string(&Gender::PreferNotToSay).unwrap();
        assert_eq!(json, "\"prefer-not-to-say\"");
        assert_eq!("prefer-not-to-say".parse::<Gender>().unwrap(), Gender::PreferNotToSay);
        assert!("unknown".parse::<Gender>().is_err());
    }

    #[test]
    fn test_full_name() {
        let now = Utc::now();
        let user = User {
            id: "u1".to_string(),
            email: "ada@example.com".to_string(),
            user_name: "ada".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            gender: Gender::Female,
            dob: NaiveDate::from_ymd_opt(1815, 12, 10).unwrap(),
            phone: "+44 20 0000".to_string(),
            role: Role::User,
            is_email_verified: false,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(full_name(&user), "Ada Lovelace");
    }
}
