/// Configuration management for the API server
///
/// Configuration comes from environment variables (optionally loaded from a
/// `.env` file) and is validated once at startup.
///
/// # Environment Variables
///
/// - `APP_ENV`: `development` (default) or `production`
/// - `API_HOST` / `API_PORT` (or `PORT`): bind address (default: 0.0.0.0:4000)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `JWT_SECRET`: token signing key (required)
/// - `JWT_EXPIRES_IN`: token lifetime such as `1d` or `12h` (default: 1d)
/// - `CORS_ORIGIN`: comma-separated allowed origins, `*` for any (default: *)
/// - `RATE_LIMIT_WINDOW_SECS` / `RATE_LIMIT_MAX`: per-client budget (default: 200 per 900s)
/// - `ADMIN_EMAIL`: existing account promoted to admin at startup
/// - `CLOUDINARY_CLOUD_NAME`, `CLOUDINARY_API_KEY`, `CLOUDINARY_API_SECRET`: image host
/// - `LOG_FORMAT`: `pretty` (default) or `json`
///
/// # Example
///
/// ```no_run
/// use dairydrop_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use chrono::Duration;
use dairydrop_shared::{auth::jwt::parse_lifetime, media::cloudinary::CloudinaryConfig};
use std::env;

/// Secret shipped in sample env files; refused in production
const PLACEHOLDER_SECRET: &str = "change-me";

/// Minimum JWT secret length in production
const MIN_SECRET_LENGTH: usize = 32;

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub app_env: AppEnv,

    pub api: ApiConfig,

    pub database: DatabaseConfig,

    pub jwt: JwtConfig,

    pub rate_limit: RateLimitConfig,

    /// Account promoted to admin on startup
    pub admin_email: Option<String>,

    /// Image host credentials; image uploads are disabled when absent
    pub cloudinary: Option<CloudinaryConfig>,

    pub log_format: LogFormat,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `["*"]` allows any
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC signing secret
    pub secret: String,

    /// Access token lifetime
    pub expires_in: Duration,
}

/// Per-client rate limit
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Length of the window in seconds
    pub window_secs: u64,

    /// Requests allowed per window
    pub max_requests: u32,
}

impl Config {
    /// Loads configuration from the process environment (and `.env` if present)
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value is invalid.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let app_env = match var("APP_ENV").as_deref() {
            None | Some("development") | Some("dev") | Some("test") => AppEnv::Development,
            Some("production") | Some("prod") => AppEnv::Production,
            Some(other) => anyhow::bail!("APP_ENV must be 'development' or 'production', got '{}'", other),
        };

        let host = var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = var("API_PORT")
            .or_else(|| var("PORT"))
            .unwrap_or_else(|| "4000".to_string())
            .parse::<u16>()
            .map_err(|e| anyhow::anyhow!("Invalid API_PORT: {}", e))?;

        let cors_origins = var("CORS_ORIGIN")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        let database_url = var("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;
        let max_connections = var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u32>()
            .map_err(|e| anyhow::anyhow!("Invalid DATABASE_MAX_CONNECTIONS: {}", e))?;

        let jwt_secret = var("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;
        if app_env == AppEnv::Production {
            if jwt_secret == PLACEHOLDER_SECRET {
                anyhow::bail!("JWT_SECRET must be changed from the placeholder value in production");
            }
            if jwt_secret.len() < MIN_SECRET_LENGTH {
                anyhow::bail!("JWT_SECRET must be at least {} characters long in production", MIN_SECRET_LENGTH);
            }
        }
        let expires_in = parse_lifetime(&var("JWT_EXPIRES_IN").unwrap_or_else(|| "1d".to_string()))?;

        let window_secs = var("RATE_LIMIT_WINDOW_SECS")
            .unwrap_or_else(|| "900".to_string())
            .parse::<u64>()
            .map_err(|e| anyhow::anyhow!("Invalid RATE_LIMIT_WINDOW_SECS: {}", e))?;
        let max_requests = var("RATE_LIMIT_MAX")
            .unwrap_or_else(|| "200".to_string())
            .parse::<u32>()
            .map_err(|e| anyhow::anyhow!("Invalid RATE_LIMIT_MAX: {}", e))?;
        if window_secs == 0 || max_requests == 0 {
            anyhow::bail!("RATE_LIMIT_WINDOW_SECS and RATE_LIMIT_MAX must be positive");
        }

        let cloudinary = match (
            var("CLOUDINARY_CLOUD_NAME"),
            var("CLOUDINARY_API_KEY"),
            var("CLOUDINARY_API_SECRET"),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
            }),
            (None, None, None) => None,
            _ => anyhow::bail!(
                "CLOUDINARY_CLOUD_NAME, CLOUDINARY_API_KEY and CLOUDINARY_API_SECRET must be set together"
            ),
        };

        let log_format = match var("LOG_FORMAT").as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => anyhow::bail!("LOG_FORMAT must be 'pretty' or 'json', got '{}'", other),
        };

        Ok(Self {
            app_env,
            api: ApiConfig {
                host,
                port,
                cors_origins,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                expires_in,
            },
            rate_limit: RateLimitConfig {
                window_secs,
                max_requests,
            },
            admin_email: var("ADMIN_EMAIL"),
            cloudinary,
            log_format,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn is_production(&self) -> bool {
        self.app_env == AppEnv::Production
    }

    /// Whether any origin may call the API
    pub fn cors_allows_any(&self) -> bool {
        self.api.cors_origins.iter().any(|o| o == "*")
    }
}
