//! Process configuration, read from the environment once at startup.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use adminhub_auth::{DEFAULT_ROLE_TTL, RoleFetch};

const DEFAULT_BIND: &str = "0.0.0.0:8080";
const DEV_PLATFORM_URL: &str = "http://127.0.0.1:54321";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditStoreKind {
    /// Platform REST table endpoint.
    Rest,
    /// Direct database connection (`DATABASE_URL`).
    Postgres,
    /// Process memory; lost on restart.
    Memory,
}

impl AuditStoreKind {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "rest" => Ok(AuditStoreKind::Rest),
            "postgres" => Ok(AuditStoreKind::Postgres),
            "memory" => Ok(AuditStoreKind::Memory),
            other => Err(ConfigError::Invalid {
                key: "AUDIT_STORE",
                reason: format!("unknown store '{other}' (expected rest, postgres or memory)"),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub platform_url: String,
    pub platform_anon_key: String,
    pub role_fetch: RoleFetch,
    pub role_cache_ttl: Duration,
    pub refetch_on_focus: bool,
    pub audit_store: AuditStoreKind,
    pub database_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = get("ADMINHUB_BIND")
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                key: "ADMINHUB_BIND",
                reason: e.to_string(),
            })?;

        let platform_url = get("PLATFORM_URL").unwrap_or_else(|| {
            tracing::warn!("PLATFORM_URL not set; using local dev default {DEV_PLATFORM_URL}");
            DEV_PLATFORM_URL.to_string()
        });

        let platform_anon_key = get("PLATFORM_ANON_KEY").unwrap_or_else(|| {
            tracing::warn!("PLATFORM_ANON_KEY not set; platform calls will be unauthenticated");
            String::new()
        });

        let defaults = RoleFetch::default();
        let role_fetch = RoleFetch {
            procedure: get("ROLE_PROCEDURE").unwrap_or(defaults.procedure),
            action: get("ROLE_ACTION").unwrap_or(defaults.action),
        };

        let role_cache_ttl = match get("ROLE_CACHE_TTL_SECS") {
            Some(raw) => Duration::from_secs(raw.trim().parse().map_err(
                |e: std::num::ParseIntError| ConfigError::Invalid {
                    key: "ROLE_CACHE_TTL_SECS",
                    reason: e.to_string(),
                },
            )?),
            None => DEFAULT_ROLE_TTL,
        };

        let refetch_on_focus = match get("ROLE_REFETCH_ON_FOCUS") {
            Some(raw) => parse_bool("ROLE_REFETCH_ON_FOCUS", &raw)?,
            None => true,
        };

        let audit_store = match get("AUDIT_STORE") {
            Some(raw) => AuditStoreKind::parse(&raw)?,
            None => AuditStoreKind::Rest,
        };

        let database_url = get("DATABASE_URL");
        if audit_store == AuditStoreKind::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        if audit_store == AuditStoreKind::Memory {
            tracing::warn!("AUDIT_STORE=memory; audit entries are not persisted");
        }

        Ok(Self {
            bind_addr,
            platform_url,
            platform_anon_key,
            role_fetch,
            role_cache_ttl,
            refetch_on_focus,
            audit_store,
            database_url,
        })
    }
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            key,
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}
