use std::str::FromStr;

use crate::error::InsightsError;

pub const DEFAULT_GRPC_PORT: u16 = 50051;
pub const DEFAULT_POOL_SIZE: usize = 8;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;
pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const DEFAULT_MAX_PAGE_SIZE: u64 = 1000;
pub const DEFAULT_DELETE_RETRIES: u32 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub grpc_port: u16,
    /// `None` runs the service on the in-memory row store.
    pub database_url: Option<String>,
    pub database_pool_size: usize,
    pub max_upload_bytes: usize,
    pub default_page_size: u64,
    pub max_page_size: u64,
    pub delete_retries: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            grpc_port: DEFAULT_GRPC_PORT,
            database_url: None,
            database_pool_size: DEFAULT_POOL_SIZE,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            delete_retries: DEFAULT_DELETE_RETRIES,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, InsightsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, InsightsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            grpc_port: parse_or(&lookup, "GRPC_PORT", defaults.grpc_port)?,
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            database_pool_size: parse_or(&lookup, "DATABASE_POOL_SIZE", defaults.database_pool_size)?,
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            default_page_size: parse_or(&lookup, "DEFAULT_PAGE_SIZE", defaults.default_page_size)?,
            max_page_size: parse_or(&lookup, "MAX_PAGE_SIZE", defaults.max_page_size)?,
            delete_retries: parse_or(&lookup, "DELETE_RETRIES", defaults.delete_retries)?,
        };

        if config.default_page_size == 0 || config.default_page_size > config.max_page_size {
            return Err(InsightsError::ConfigError {
                message: format!(
                    "DEFAULT_PAGE_SIZE must be between 1 and MAX_PAGE_SIZE ({}), got {}",
                    config.max_page_size, config.default_page_size
                ),
            });
        }

        Ok(config)
    }

    /// Page size to use for a request, clamped to `max_page_size`. A limit of 0
    /// means no limit, which is the largest page allowed.
    pub fn page_size(&self, requested: Option<u64>) -> u64 {
        match requested {
            None => self.default_page_size,
            Some(0) => self.max_page_size,
            Some(limit) => limit.min(self.max_page_size),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, InsightsError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e| InsightsError::ConfigError {
            message: format!("Invalid {}: {} ({})", key, raw, e),
        }),
        None => Ok(default),
    }
}

/// Hides the credentials of a connection URL for logging.
pub fn redact_database_url(database_url: &str) -> String {
    match (database_url.find("://"), database_url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end + 3 => {
            format!("{}***{}", &database_url[..scheme_end + 3], &database_url[at..])
        }
        _ => database_url.to_string(),
    }
}
