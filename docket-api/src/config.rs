/// Configuration management for the API server
///
/// Configuration is read from environment variables, after loading an
/// optional `.env` file.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `CORS_ORIGINS`: Comma-separated allowed origins (default: `*`)
/// - `PRODUCTION`: Enables HSTS and strict CORS (default: false)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 20)
/// - `JWT_SECRET`: Secret key for JWT signing, at least 32 characters (required)
/// - `JWT_ACCESS_TTL_SECS`: Access token lifetime (default: 7200)
/// - `JWT_RESET_TTL_SECS`: Password reset token lifetime (default: 600)
/// - `ARGON2_MEMORY_KIB`, `ARGON2_ITERATIONS`, `ARGON2_PARALLELISM`: hashing cost
/// - `PINATA_JWT`, `PINATA_GATEWAY_URL`, `PINATA_API_URL`: artifact store;
///   without `PINATA_JWT` uploads are kept in memory
/// - `SMTP_HOST`, `SMTP_PORT` (default: 587), `SMTP_USERNAME`,
///   `SMTP_PASSWORD`, `MAIL_FROM`: outbound mail relay; without `SMTP_HOST`
///   notifications are only logged
/// - `FRONTEND_URL`: Web app base URL used in invite links
/// - `LOG_FORMAT`: `json` for JSON logs, anything else for plain text
/// - `RUST_LOG`: Log filter
///
/// # Example
///
/// ```no_run
/// use docket_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use anyhow::Context;
use docket_shared::auth::password::HashParams;
use docket_shared::messaging::SmtpConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub hashing: HashingConfig,
    pub artifacts: ArtifactsConfig,
    pub mail: MailConfig,

    /// Web app base URL
    pub frontend_url: String,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Production mode (HSTS on)
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Must be at least 32 bytes. Generate with: `openssl rand -hex 32`
    pub secret: String,

    pub access_ttl_secs: i64,
    pub reset_ttl_secs: i64,
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl From<HashingConfig> for HashParams {
    fn from(config: HashingConfig) -> Self {
        HashParams {
            memory_kib: config.memory_kib,
            iterations: config.iterations,
            parallelism: config.parallelism,
        }
    }
}

/// Pinata artifact store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    /// Bearer JWT; `None` selects the in-memory store
    pub pinata_jwt: Option<String>,
    pub gateway_url: Option<String>,
    pub api_url: String,
}

/// Outbound mail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// SMTP relay host; `None` selects the logging mailer
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,

    /// Sender mailbox
    pub from: String,
}

impl MailConfig {
    /// Relay settings, when a relay is configured
    pub fn smtp(&self) -> Option<SmtpConfig> {
        let host = self.smtp_host.as_ref()?;
        let mut smtp = SmtpConfig::new(host.clone(), self.from.clone());
        smtp.port = self.smtp_port;
        smtp.credentials = self.smtp_username.clone().zip(self.smtp_password.clone());
        Some(smtp)
    }
}

fn var_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value: {}", name, value)),
        Err(_) => Ok(default),
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Splits a comma-separated origin list
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `DATABASE_URL` or `JWT_SECRET` is missing
    /// - `JWT_SECRET` is shorter than 32 characters
    /// - a numeric or boolean variable does not parse
    /// - `PINATA_JWT` is set without `PINATA_GATEWAY_URL`
    /// - only one of `SMTP_USERNAME` and `SMTP_PASSWORD` is set
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let pinata_jwt = optional_var("PINATA_JWT");
        let gateway_url = optional_var("PINATA_GATEWAY_URL");
        if pinata_jwt.is_some() && gateway_url.is_none() {
            anyhow::bail!("PINATA_GATEWAY_URL is required when PINATA_JWT is set");
        }

        let smtp_username = optional_var("SMTP_USERNAME");
        let smtp_password = optional_var("SMTP_PASSWORD");
        if smtp_username.is_some() != smtp_password.is_some() {
            anyhow::bail!("SMTP_USERNAME and SMTP_PASSWORD must be set together");
        }

        Ok(Self {
            api: ApiConfig {
                host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: var_or("API_PORT", 8080)?,
                cors_origins: parse_origins(
                    &env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string()),
                ),
                production: var_or("PRODUCTION", false)?,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: var_or("DATABASE_MAX_CONNECTIONS", 20)?,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                access_ttl_secs: var_or("JWT_ACCESS_TTL_SECS", 7200)?,
                reset_ttl_secs: var_or("JWT_RESET_TTL_SECS", 600)?,
            },
            hashing: HashingConfig {
                memory_kib: var_or("ARGON2_MEMORY_KIB", 65536)?,
                iterations: var_or("ARGON2_ITERATIONS", 3)?,
                parallelism: var_or("ARGON2_PARALLELISM", 4)?,
            },
            artifacts: ArtifactsConfig {
                pinata_jwt,
                gateway_url,
                api_url: env::var("PINATA_API_URL")
                    .unwrap_or_else(|_| "https://api.pinata.cloud".to_string()),
            },
            mail: MailConfig {
                smtp_host: optional_var("SMTP_HOST"),
                smtp_port: var_or("SMTP_PORT", 587)?,
                smtp_username,
                smtp_password,
                from: env::var("MAIL_FROM")
                    .unwrap_or_else(|_| "Docket <no-reply@docket.local>".to_string()),
            },
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}
