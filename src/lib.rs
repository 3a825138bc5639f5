/// Store Auth - authentication and session service
///
/// Signup, login, token issuance, password reset, login-session tracking and
/// the page access gate for the store management backend.

pub mod account;
pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod gate;
pub mod jobs;
pub mod mailer;
pub mod server;
pub mod session;
pub mod token;
pub mod validation;
