/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 3000)
/// - `API_PRODUCTION`: Enables HSTS (default: false)
/// - `CORS_ORIGINS`: Comma-separated origins, `*` for any (default: *)
/// - `DATA_FILE`: Snapshot file path (default: data.json)
/// - `JWT_SECRET`: Secret key for JWT signing (required, at least 32 chars)
/// - `JWT_EXPIRATION_HOURS`: Token lifetime (default: 24)
/// - `PASSWORD_MIN_LENGTH`: Registration password minimum (default: 6)
/// - `ADMIN_ACCOUNTS`: `user:password[,user:password...]` (default: none)
/// - `LOG_FORMAT`: `pretty` or `json` (default: pretty)
/// - `RUST_LOG`: Log filter
///
/// # Example
///
/// ```no_run
/// use tasklane_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::collections::HashSet;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use tasklane_shared::auth::{
    jwt::{DEFAULT_TOKEN_TTL_HOURS, MAX_TOKEN_TTL_HOURS},
    password::DEFAULT_MIN_PASSWORD_LENGTH,
};

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Snapshot storage configuration
    pub storage: StorageConfig,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// Account configuration
    pub auth: AuthConfig,

    /// Log output format
    pub log_format: LogFormat,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Production mode (enables HSTS)
    pub production: bool,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Path of the JSON snapshot file
    pub data_file: PathBuf,
}

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// IMPORTANT: This must be kept secret and should be at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    /// Token lifetime in hours
    pub expiration_hours: i64,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("expiration_hours", &self.expiration_hours)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Minimum password length at registration
    pub password_min_length: usize,

    /// Configured administrator accounts
    pub admin_accounts: Vec<AdminCredential>,
}

/// One `user:password` entry from `ADMIN_ACCOUNTS`
///
/// `secret` is either plaintext or an Argon2 PHC hash.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminCredential {
    pub username: String,
    pub secret: String,
}

impl fmt::Debug for AdminCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredential")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("LOG_FORMAT must be 'pretty' or 'json', got '{}'", other),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let api_host = var("API_HOST", "0.0.0.0");
        let api_port = var("API_PORT", "3000")
            .trim()
            .parse::<u16>()
            .map_err(|e| anyhow::anyhow!("API_PORT must be a port number: {}", e))?;
        let production = parse_bool("API_PRODUCTION", &var("API_PRODUCTION", "false"))?;

        let cors_origins: Vec<String> = var("CORS_ORIGINS", "*")
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        let data_file = PathBuf::from(var("DATA_FILE", "data.json"));

        let jwt_secret = lookup("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let expiration_hours = var("JWT_EXPIRATION_HOURS", &DEFAULT_TOKEN_TTL_HOURS.to_string())
            .trim()
            .parse::<i64>()
            .map_err(|e| anyhow::anyhow!("JWT_EXPIRATION_HOURS must be a number: {}", e))?;
        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&expiration_hours) {
            anyhow::bail!(
                "JWT_EXPIRATION_HOURS must be between 1 and {}",
                MAX_TOKEN_TTL_HOURS
            );
        }

        let password_min_length = var(
            "PASSWORD_MIN_LENGTH",
            &DEFAULT_MIN_PASSWORD_LENGTH.to_string(),
        )
        .trim()
        .parse::<usize>()
        .map_err(|e| anyhow::anyhow!("PASSWORD_MIN_LENGTH must be a number: {}", e))?;

        let admin_accounts = parse_admin_accounts(&var("ADMIN_ACCOUNTS", ""))?;
        let log_format = var("LOG_FORMAT", "pretty").parse()?;

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                production,
                cors_origins,
            },
            storage: StorageConfig { data_file },
            jwt: JwtConfig {
                secret: jwt_secret,
                expiration_hours,
            },
            auth: AuthConfig {
                password_min_length,
                admin_accounts,
            },
            log_format,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Whether CORS should accept any origin
    pub fn cors_permissive(&self) -> bool {
        self.api.cors_origins.is_empty() || self.api.cors_origins.iter().any(|o| o == "*")
    }
}

fn parse_bool(key: &str, value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("{} must be true or false, got '{}'", key, other),
    }
}

/// Parses `ADMIN_ACCOUNTS`
///
/// Entries are `username:password` separated by commas. The username ends
/// at the first colon. A comma-separated piece with no colon continues the
/// previous password, so Argon2 PHC hashes (which contain commas) can be
/// given directly.
///
/// # Errors
///
/// Fails on an entry without a colon, an empty username or password, or a
/// repeated username.
///
/// # Example
///
/// ```
/// use tasklane_api::config::parse_admin_accounts;
///
/// let admins = parse_admin_accounts("root:hunter22, ops:s3cret").unwrap();
/// assert_eq!(admins[1].username, "ops");
/// ```
pub fn parse_admin_accounts(raw: &str) -> anyhow::Result<Vec<AdminCredential>> {
    let mut entries: Vec<String> = Vec::new();
    for piece in raw.split(',') {
        if piece.trim().is_empty() {
            continue;
        }
        match entries.last_mut() {
            Some(previous) if !piece.contains(':') => {
                previous.push(',');
                previous.push_str(piece);
            }
            _ => entries.push(piece.to_string()),
        }
    }

    let mut seen = HashSet::new();
    let mut accounts = Vec::with_capacity(entries.len());
    for entry in entries {
        let (username, secret) = entry.split_once(':').ok_or_else(|| {
            anyhow::anyhow!(
                "ADMIN_ACCOUNTS entry '{}' must be user:password",
                entry.trim()
            )
        })?;

        let username = username.trim();
        let secret = secret.trim();
        if username.is_empty() {
            anyhow::bail!("ADMIN_ACCOUNTS entry has an empty username");
        }
        if secret.is_empty() {
            anyhow::bail!("ADMIN_ACCOUNTS entry for '{}' has an empty password", username);
        }
        if !seen.insert(username.to_string()) {
            anyhow::bail!("ADMIN_ACCOUNTS lists '{}' more than once", username);
        }

        accounts.push(AdminCredential {
            username: username.to_string(),
            secret: secret.to_string(),
        });
    }

    Ok(accounts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("JWT_SECRET", SECRET)]).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert!(!config.api.production);
        assert!(config.cors_permissive());
        assert_eq!(config.storage.data_file, PathBuf::from("data.json"));
        assert_eq!(config.jwt.expiration_hours, 24);
        assert_eq!(config.auth.password_min_length, 6);
        assert!(config.auth.admin_accounts.is_empty());
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("JWT_SECRET", SECRET),
            ("API_HOST", "127.0.0.1"),
            ("API_PORT", "8080"),
            ("API_PRODUCTION", "true"),
            ("CORS_ORIGINS", "https://a.example, https://b.example"),
            ("DATA_FILE", "/var/lib/tasklane/data.json"),
            ("JWT_EXPIRATION_HOURS", "2"),
            ("PASSWORD_MIN_LENGTH", "10"),
            ("ADMIN_ACCOUNTS", "root:hunter22"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:8080");
        assert!(config.api.production);
        assert!(!config.cors_permissive());
        assert_eq!(config.api.cors_origins, vec!["https://a.example", "https://b.example"]);
        assert_eq!(config.jwt.expiration_hours, 2);
        assert_eq!(config.auth.password_min_length, 10);
        assert_eq!(config.auth.admin_accounts[0].username, "root");
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_jwt_secret_required_and_long() {
        assert!(config_from(&[]).is_err());
        assert!(config_from(&[("JWT_SECRET", "short")]).is_err());
    }

    #[test]
    fn test_malformed_values_rejected() {
        for (key, value) in [
            ("API_PORT", "http"),
            ("API_PRODUCTION", "maybe"),
            ("JWT_EXPIRATION_HOURS", "0"),
            ("JWT_EXPIRATION_HOURS", "3000000000"),
            ("JWT_EXPIRATION_HOURS", "8761"),
            ("PASSWORD_MIN_LENGTH", "-1"),
            ("ADMIN_ACCOUNTS", "root"),
            ("LOG_FORMAT", "xml"),
        ] {
            assert!(
                config_from(&[("JWT_SECRET", SECRET), (key, value)]).is_err(),
                "{}={} should be rejected",
                key,
                value
            );
        }
    }

    #[test]
    fn test_parse_admin_accounts() {
        let admins = parse_admin_accounts(" root:hunter22 ,ops:pa:ss,").unwrap();

        assert_eq!(admins.len(), 2);
        assert_eq!(admins[0].username, "root");
        assert_eq!(admins[0].secret, "hunter22");
        assert_eq!(admins[1].secret, "pa:ss");
        assert!(parse_admin_accounts("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_admin_accounts_keeps_phc_hash() {
        let hash = "$argon2id$v=19$m=65536,t=3,p=4$c2FsdHNhbHQ$aGFzaGhhc2g";
        let admins = parse_admin_accounts(&format!("root:{},ops:x", hash)).unwrap();

        assert_eq!(admins[0].secret, hash);
        assert_eq!(admins[1].username, "ops");
    }

    #[test]
    fn test_parse_admin_accounts_errors() {
        assert!(parse_admin_accounts(":pw").is_err());
        assert!(parse_admin_accounts("root:").is_err());
        assert!(parse_admin_accounts("root:a,root:b").is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config =
            config_from(&[("JWT_SECRET", SECRET), ("ADMIN_ACCOUNTS", "root:hunter22")]).unwrap();
        let debug = format!("{:?}", config);

        assert!(!debug.contains(SECRET));
        assert!(!debug.contains("hunter22"));
    }
}
