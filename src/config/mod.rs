use serde::Deserialize;
use std::env;
use std::str::FromStr;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub pagination: PaginationConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    pub log_format: LogFormat,
    pub cors_allow_any_origin: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

// Настройки базы данных
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
    pub acquire_timeout_seconds: u64,
}

// Пагинация списка бронирований
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationConfig {
    pub reservations_page_size: u32,
    pub reservations_max_page_size: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars { lookup };

        let log_format = match vars.string("LOG_FORMAT", "pretty").to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            other => {
                return Err(ConfigError::Invalid { name: "LOG_FORMAT", value: other.to_string() });
            }
        };

        let config = Config {
            app: AppConfig {
                host: vars.string("HOST", "0.0.0.0"),
                port: vars.parse("PORT", 8000)?,
                environment: vars.string("ENVIRONMENT", "development"),
                rust_log: vars.string("RUST_LOG", "planetarium_booking=debug,tower_http=debug"),
                log_format,
                cors_allow_any_origin: vars.parse("CORS_ALLOW_ANY_ORIGIN", true)?,
            },
            database: DatabaseConfig {
                url: vars.required("DATABASE_URL")?,
                pool_size: vars.parse("DB_POOL_SIZE", 20)?,
                acquire_timeout_seconds: vars.parse("DB_ACQUIRE_TIMEOUT_SECONDS", 5)?,
            },
            pagination: PaginationConfig {
                reservations_page_size: vars.parse("RESERVATIONS_PAGE_SIZE", 10)?,
                reservations_max_page_size: vars.parse("RESERVATIONS_MAX_PAGE_SIZE", 100)?,
            },
        };

        if config.pagination.reservations_page_size == 0 {
            return Err(ConfigError::Invalid { name: "RESERVATIONS_PAGE_SIZE", value: "0".to_string() });
        }

        Ok(config)
    }
}

struct Vars<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn string(&self, name: &str, default: &str) -> String {
        (self.lookup)(name).unwrap_or_else(|| default.to_string())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        (self.lookup)(name).ok_or(ConfigError::Missing(name))
    }

    fn parse<T: FromStr>(&self, name: &'static str, default: T) -> Result<T, ConfigError> {
        match (self.lookup)(name) {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { name, value }),
            None => Ok(default),
        }
    }
}
