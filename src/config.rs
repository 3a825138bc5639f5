/// Configuration management for the store authentication service
use crate::error::{AuthError, AuthResult};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub email: Option<EmailConfig>,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// `production` turns on the `Secure` cookie attribute
    pub environment: String,
    /// Base URL used in password reset links
    pub frontend_url: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_refresh_secret: String,
    /// Access token lifetime in seconds
    pub access_token_ttl: i64,
    /// Refresh token lifetime in seconds
    pub refresh_token_ttl: i64,
    /// Password reset token lifetime in seconds
    pub reset_token_ttl: i64,
    pub bcrypt_cost: u32,
}

impl AuthConfig {
    pub fn access_ttl(&self) -> Duration {
        Duration::seconds(self.access_token_ttl)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::seconds(self.refresh_token_ttl)
    }

    pub fn reset_ttl(&self) -> Duration {
        Duration::seconds(self.reset_token_ttl)
    }
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_url: String,
    pub from_address: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AuthResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("STORE_AUTH_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("STORE_AUTH_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| config_error("STORE_AUTH_PORT", "Invalid port number"))?;
        let environment = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let data_directory: PathBuf = env::var("STORE_AUTH_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database = env::var("STORE_AUTH_DATABASE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("store_auth.sqlite"));

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| config_error("JWT_SECRET", "JWT secret required"))?;
        let jwt_refresh_secret = env::var("JWT_REFRESH_SECRET")
            .map_err(|_| config_error("JWT_REFRESH_SECRET", "JWT refresh secret required"))?;

        let access_token_ttl = parse_lifetime(
            "JWT_EXPIRES_IN",
            &env::var("JWT_EXPIRES_IN").unwrap_or_else(|_| "7d".to_string()),
        )?;
        let refresh_token_ttl = parse_lifetime(
            "JWT_REFRESH_EXPIRES_IN",
            &env::var("JWT_REFRESH_EXPIRES_IN").unwrap_or_else(|_| "30d".to_string()),
        )?;
        let reset_token_ttl = parse_lifetime(
            "RESET_TOKEN_EXPIRES_IN",
            &env::var("RESET_TOKEN_EXPIRES_IN").unwrap_or_else(|_| "1h".to_string()),
        )?;
        let bcrypt_cost = env::var("BCRYPT_COST")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| config_error("BCRYPT_COST", "Invalid bcrypt cost"))?;

        let email = if let Ok(smtp_url) = env::var("SMTP_URL") {
            Some(EmailConfig {
                smtp_url,
                from_address: env::var("SMTP_FROM")
                    .unwrap_or_else(|_| "noreply@storemanagement.com".to_string()),
            })
        } else {
            None
        };

        let log_level = env::var("RUST_LOG")
            .unwrap_or_else(|_| "store_auth=debug,tower_http=debug".to_string());
        let log_json = env::var("LOG_FORMAT")
            .map(|format| format.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                environment,
                frontend_url,
            },
            storage: StorageConfig {
                data_directory,
                database,
            },
            authentication: AuthConfig {
                jwt_secret,
                jwt_refresh_secret,
                access_token_ttl,
                refresh_token_ttl,
                reset_token_ttl,
                bcrypt_cost,
            },
            email,
            logging: LoggingConfig {
                level: log_level,
                json: log_json,
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> AuthResult<()> {
        if self.service.hostname.is_empty() {
            return Err(config_error("STORE_AUTH_HOSTNAME", "Hostname cannot be empty"));
        }

        let auth = &self.authentication;
        if auth.jwt_secret.len() < 32 {
            return Err(config_error(
                "JWT_SECRET",
                "JWT secret must be at least 32 characters",
            ));
        }
        if auth.jwt_refresh_secret.len() < 32 {
            return Err(config_error(
                "JWT_REFRESH_SECRET",
                "JWT refresh secret must be at least 32 characters",
            ));
        }
        if auth.jwt_secret == auth.jwt_refresh_secret {
            return Err(config_error(
                "JWT_REFRESH_SECRET",
                "Access and refresh tokens must use distinct secrets",
            ));
        }

        if auth.access_token_ttl <= 0 || auth.refresh_token_ttl <= 0 || auth.reset_token_ttl <= 0 {
            return Err(config_error("JWT_EXPIRES_IN", "Token lifetimes must be positive"));
        }

        if auth.refresh_token_ttl < auth.access_token_ttl {
            return Err(config_error(
                "JWT_REFRESH_EXPIRES_IN",
                "Refresh tokens must not expire before access tokens",
            ));
        }

        if !(4..=31).contains(&auth.bcrypt_cost) {
            return Err(config_error("BCRYPT_COST", "bcrypt cost must be between 4 and 31"));
        }

        Ok(())
    }

    /// Whether cookies should carry the `Secure` attribute
    pub fn is_production(&self) -> bool {
        self.service.environment.eq_ignore_ascii_case("production")
    }
}

fn config_error(key: &str, message: &str) -> AuthError {
    AuthError::invalid(key, message)
}

/// Parse a lifetime such as `7d`, `12h`, `30m`, `45s` or a bare number of seconds
pub fn parse_lifetime(key: &str, value: &str) -> AuthResult<i64> {
    let value = value.trim();
    let invalid = || config_error(key, &format!("Invalid duration: {}", value));

    let (digits, multiplier) = match value.chars().last() {
        Some('d') => (&value[..value.len() - 1], 86_400),
        Some('h') => (&value[..value.len() - 1], 3_600),
        Some('m') => (&value[..value.len() - 1], 60),
        Some('s') => (&value[..value.len() - 1], 1),
        Some(c) if c.is_ascii_digit() => (value, 1),
        _ => return Err(invalid()),
    };

    let amount: i64 = digits.parse().map_err(|_| invalid())?;
    amount.checked_mul(multiplier).ok_or_else(invalid)
}

#[cfg(test)]
pub(crate) fn test_config() -> ServerConfig {
    ServerConfig {
        service: ServiceConfig {
            hostname: "localhost".to_string(),
            port: 3000,
            environment: "test".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
        },
        storage: StorageConfig {
            data_directory: PathBuf::from("./data"),
            database: PathBuf::from(":memory:"),
        },
        authentication: AuthConfig {
            jwt_secret: "test-access-secret-for-testing-only-0001".to_string(),
            jwt_refresh_secret: "test-refresh-secret-for-testing-only-0002".to_string(),
            access_token_ttl: 7 * 86_400,
            refresh_token_ttl: 30 * 86_400,
            reset_token_ttl: 3_600,
            bcrypt_cost: 4,
        },
        email: None,
        logging: LoggingConfig {
            level: "debug".to_string(),
            json: false,
        },
    }
}
