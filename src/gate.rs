/// Page access gate
///
/// Decides, from the request path and the access-token cookie alone, whether a
/// page request proceeds or is redirected. A token that fails verification is
/// treated exactly like a missing one.
use crate::{
    db::user::Role,
    token::{TokenKind, TokenService},
};

pub const DASHBOARD_PATH: &str = "/dashboard";
pub const LOGIN_PATH: &str = "/login";

/// Pages reachable without a session
const PUBLIC_PATHS: &[&str] = &["/", "/about", "/contact", "/login", "/signup", "/forgot-password"];

/// Pages an authenticated user is bounced away from
const AUTH_PATHS: &[&str] = &["/login", "/signup", "/forgot-password"];

/// Role-restricted sections of the dashboard
const RESTRICTED_PATHS: &[(&str, &[Role])] = &[
    ("/dashboard/users", &[Role::Admin]),
    ("/dashboard/sessions", &[Role::Admin, Role::Supervisor]),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Redirect(String),
}

/// `path` equals `prefix` or lies beneath it
fn is_under(path: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return path == "/";
    }
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn matches_any(path: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|prefix| is_under(path, prefix))
}

fn login_redirect(path: &str) -> String {
    format!("{}?redirect={}", LOGIN_PATH, urlencoding::encode(path))
}

/// Decide what happens to a page request
pub fn decide(path: &str, token: Option<&str>, tokens: &TokenService) -> GateDecision {
    let role = token
        .and_then(|token| tokens.verify(token, TokenKind::Access).ok())
        .map(|claims| claims.role);

    if matches_any(path, AUTH_PATHS) {
        return match role {
            Some(_) => GateDecision::Redirect(DASHBOARD_PATH.to_string()),
            None => GateDecision::Allow,
        };
    }

    if matches_any(path, PUBLIC_PATHS) {
        return GateDecision::Allow;
    }

    if !is_under(path, DASHBOARD_PATH) {
        return GateDecision::Allow;
    }

    let role = match role {
        Some(role) => role,
        None => return GateDecision::Redirect(login_redirect(path)),
    };

    for (prefix, allowed) in RESTRICTED_PATHS {
        if is_under(path, prefix) && !allowed.contains(&role) {
            tracing::debug!(path = %path, role = %role, "Role does not qualify for page");
            return GateDecision::Redirect(DASHBOARD_PATH.to_string());
        }
    }

    GateDecision::Allow
}
