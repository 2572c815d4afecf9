use std::{
    env, fmt,
    net::SocketAddr,
    num::NonZeroU32,
    path::{Path, PathBuf},
    time::Duration,
};

use thiserror::Error;

#[cfg(test)]
use once_cell::sync::Lazy;
#[cfg(test)]
pub(crate) static ENV_MUTEX: Lazy<std::sync::Mutex<()>> = Lazy::new(|| std::sync::Mutex::new(()));

const MIN_JWT_SECRET_LEN: usize = 16;

#[derive(Clone, PartialEq)]
pub struct Config {
    http_bind: SocketAddr,
    database_url: Option<String>,
    db_max_connections: u32,
    db_min_connections: u32,
    db_acquire_timeout: Duration,
    db_idle_timeout: Duration,
    db_max_lifetime: Duration,
    jwt_secret: String,
    jwt_ttl: Duration,
    password_hash_rounds: NonZeroU32,
    classifier_rules_path: Option<PathBuf>,
    cors_allowed_origins: Vec<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("http_bind", &self.http_bind)
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout", &self.db_acquire_timeout)
            .field("db_idle_timeout", &self.db_idle_timeout)
            .field("db_max_lifetime", &self.db_max_lifetime)
            .field("jwt_secret", &"<redacted>")
            .field("jwt_ttl", &self.jwt_ttl)
            .field("password_hash_rounds", &self.password_hash_rounds)
            .field("classifier_rules_path", &self.classifier_rules_path)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {source}")]
    Invalid {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

/// Variable lookup used while building a [`Config`].
struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|value| !value.trim().is_empty())
    }

    /// `NAME` を優先し、未設定なら `NAME_FILE` が指すファイルの内容を読む。
    fn secret(&self, name: &'static str, file_name: &'static str) -> Result<String, ConfigError> {
        if let Some(value) = self.get(name) {
            return Ok(value);
        }
        let path = self.get(file_name).ok_or(ConfigError::Missing(name))?;
        let contents = std::fs::read_to_string(Path::new(&path)).map_err(|error| {
            ConfigError::Invalid {
                name: file_name,
                source: anyhow::Error::new(error).context(format!("failed to read {path}")),
            }
        })?;
        Ok(contents.trim_end_matches(['\r', '\n']).to_string())
    }

    fn parse<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match self.get(name) {
            Some(raw) => raw.trim().parse::<T>().map_err(|error| ConfigError::Invalid {
                name,
                source: anyhow::Error::new(error),
            }),
            None => Ok(default),
        }
    }

    fn duration_secs(&self, name: &'static str, default_secs: u64) -> Result<Duration, ConfigError> {
        Ok(Duration::from_secs(self.parse(name, default_secs)?))
    }

    fn non_zero_u32(&self, name: &'static str, default: u32) -> Result<NonZeroU32, ConfigError> {
        let parsed: u32 = self.parse(name, default)?;
        NonZeroU32::new(parsed).ok_or_else(|| ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("must be greater than zero"),
        })
    }

    fn csv(&self, name: &'static str) -> Vec<String> {
        self.get(name)
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Config {
    /// 環境変数から設定値を読み込み、検証する。
    ///
    /// # Errors
    /// `JWT_SECRET` が未設定、もしくは各種値のパースに失敗した場合は [`ConfigError`] を返す。
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    /// See [`Config::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };

        let http_bind = vars.parse(
            "NEWS_CHECK_HTTP_BIND",
            SocketAddr::from(([0, 0, 0, 0], 5000)),
        )?;

        // Database connection pool settings
        let database_url = vars.get("DATABASE_URL");
        let db_max_connections = vars.parse("DB_MAX_CONNECTIONS", 10_u32)?;
        let db_min_connections = vars.parse("DB_MIN_CONNECTIONS", 1_u32)?;
        if db_min_connections > db_max_connections {
            return Err(ConfigError::Invalid {
                name: "DB_MIN_CONNECTIONS",
                source: anyhow::anyhow!(
                    "must not exceed DB_MAX_CONNECTIONS ({db_max_connections})"
                ),
            });
        }
        let db_acquire_timeout = vars.duration_secs("DB_ACQUIRE_TIMEOUT_SECS", 30)?;
        let db_idle_timeout = vars.duration_secs("DB_IDLE_TIMEOUT_SECS", 600)?;
        let db_max_lifetime = vars.duration_secs("DB_MAX_LIFETIME_SECS", 1800)?;

        // Auth settings
        let jwt_secret = vars.secret("JWT_SECRET", "JWT_SECRET_FILE")?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::Invalid {
                name: "JWT_SECRET",
                source: anyhow::anyhow!("must be at least {MIN_JWT_SECRET_LEN} bytes"),
            });
        }
        let jwt_ttl = vars.duration_secs("JWT_TTL_SECS", 7 * 24 * 60 * 60)?;
        if jwt_ttl.is_zero() {
            return Err(ConfigError::Invalid {
                name: "JWT_TTL_SECS",
                source: anyhow::anyhow!("must be greater than zero"),
            });
        }
        let password_hash_rounds = vars.non_zero_u32("PASSWORD_HASH_ROUNDS", 100_000)?;

        let classifier_rules_path = vars.get("CLASSIFIER_RULES_PATH").map(PathBuf::from);
        let cors_allowed_origins = vars.csv("CORS_ALLOWED_ORIGINS");

        Ok(Self {
            http_bind,
            database_url,
            db_max_connections,
            db_min_connections,
            db_acquire_timeout,
            db_idle_timeout,
            db_max_lifetime,
            jwt_secret,
            jwt_ttl,
            password_hash_rounds,
            classifier_rules_path,
            cors_allowed_origins,
        })
    }

    #[must_use]
    pub fn http_bind(&self) -> SocketAddr {
        self.http_bind
    }

    /// `None` selects the in-process memory store.
    #[must_use]
    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref()
    }

    #[must_use]
    pub fn db_max_connections(&self) -> u32 {
        self.db_max_connections
    }

    #[must_use]
    pub fn db_min_connections(&self) -> u32 {
        self.db_min_connections
    }

    #[must_use]
    pub fn db_acquire_timeout(&self) -> Duration {
        self.db_acquire_timeout
    }

    #[must_use]
    pub fn db_idle_timeout(&self) -> Duration {
        self.db_idle_timeout
    }

    #[must_use]
    pub fn db_max_lifetime(&self) -> Duration {
        self.db_max_lifetime
    }

    #[must_use]
    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    #[must_use]
    pub fn jwt_ttl(&self) -> Duration {
        self.jwt_ttl
    }

    #[must_use]
    pub fn password_hash_rounds(&self) -> NonZeroU32 {
        self.password_hash_rounds
    }

    #[must_use]
    pub fn classifier_rules_path(&self) -> Option<&Path> {
        self.classifier_rules_path.as_deref()
    }

    /// Empty means any origin is allowed.
    #[must_use]
    pub fn cors_allowed_origins(&self) -> &[String] {
        &self.cors_allowed_origins
    }
}
