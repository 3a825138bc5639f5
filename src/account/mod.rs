/// Account management system
///
/// Handles signup, login, password changes and password reset on top of the
/// credential store and token service.

pub mod password;
mod service;
mod store;

pub use service::{AuthService, LoginOutcome, ResetNotifier, UserPage};
pub use store::{normalize_email, UserStore};

#[cfg(test)]
pub(crate) use store::tests as store_tests;

use crate::db::user::{full_name, Gender, Role, User};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Signup request
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct SignupRequest {
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Invalid email format")
    )]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "Please confirm your password"))]
    pub confirm_password: String,
    #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
    pub user_name: String,
    #[validate(length(min = 2, message = "First name must be at least 2 characters"))]
    pub first_name: String,
    #[validate(length(min = 2, message = "Last name must be at least 2 characters"))]
    pub last_name: String,
    pub gender: String,
    pub dob: String,
    #[validate(length(min = 1, message = "Phone number is required"))]
    pub phone: String,
    pub role: Option<String>,
}

/// Login request
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginRequest {
    /// Email or username
    #[serde(alias = "emailOrUsername")]
    #[validate(length(min = 1, message = "Email or username is required"))]
    pub identifier: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Forgot-password request
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ForgotPasswordRequest {
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Invalid email format")
    )]
    pub email: String,
}

/// Reset-password request
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Change-password request
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 6, message = "New password must be at least 6 characters"))]
    pub new_password: String,
    #[validate(length(min = 1, message = "Please confirm your password"))]
    pub confirm_password: String,
}

/// Partial profile update
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, message = "First name must be at least 2 characters"))]
    pub first_name: Option<String>,
    #[validate(length(min = 2, message = "Last name must be at least 2 characters"))]
    pub last_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
    pub user_name: Option<String>,
    pub gender: Option<String>,
    pub dob: Option<String>,
    pub phone: Option<String>,
}

/// Token refresh request for non-cookie clients
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// User summary returned with tokens (never the password)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub email: String,
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub role: Role,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            user_name: user.user_name.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            full_name: full_name(user),
            role: user.role,
        }
    }
}

/// Login/signup/reset response body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserSummary,
    pub token: String,
    pub refresh_token: String,
}

/// Profile view for `me` and `profile` endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub id: String,
    pub email: String,
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub gender: Gender,
    pub dob: NaiveDate,
    pub phone: String,
    pub role: Role,
    pub is_email_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for ProfileView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            user_name: user.user_name.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            full_name: full_name(user),
            gender: user.gender,
            dob: user.dob,
            phone: user.phone.clone(),
            role: user.role,
            is_email_verified: user.is_email_verified,
            created_at: user.created_at,
        }
    }
}
