//! Service wiring: platform adapters, role resolution and the audit recorder.

use std::sync::Arc;

use adminhub_audit::{AuditRecorder, AuditStore, InMemoryAuditStore};
use adminhub_auth::{IdentityProvider, RedirectPaths, RoleCache, RoleResolver};
use adminhub_infra::{HttpIdentityProvider, PostgresAuditStore, RestAuditStore};
use adminhub_rpc::{HttpTransport, RemoteInvoker};

use crate::config::{AppConfig, AuditStoreKind, ConfigError};

/// Everything the router needs, shared across requests.
#[derive(Clone)]
pub struct AppServices {
    pub identity: Arc<dyn IdentityProvider>,
    pub resolver: Arc<RoleResolver>,
    pub recorder: AuditRecorder,
    pub paths: RedirectPaths,
}

impl AppServices {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        resolver: Arc<RoleResolver>,
        recorder: AuditRecorder,
    ) -> Self {
        Self {
            identity,
            resolver,
            recorder,
            paths: RedirectPaths::default(),
        }
    }

    pub fn with_paths(mut self, paths: RedirectPaths) -> Self {
        self.paths = paths;
        self
    }
}

/// Build production services from configuration.
pub async fn build_services(config: &AppConfig) -> Result<AppServices, ConfigError> {
    let client = reqwest::Client::new();

    let identity: Arc<dyn IdentityProvider> = Arc::new(HttpIdentityProvider::with_client(
        client.clone(),
        &config.platform_url,
        &config.platform_anon_key,
    ));

    let transport = Arc::new(HttpTransport::with_client(
        client.clone(),
        &config.platform_url,
        &config.platform_anon_key,
    ));
    let resolver = RoleResolver::new(
        RemoteInvoker::new(transport),
        Arc::new(RoleCache::new(config.role_cache_ttl)),
    )
    .with_fetch(config.role_fetch.clone())
    .with_refetch_on_focus(config.refetch_on_focus);

    let store: Arc<dyn AuditStore> = match config.audit_store {
        AuditStoreKind::Rest => Arc::new(RestAuditStore::with_client(
            client,
            &config.platform_url,
            &config.platform_anon_key,
        )),
        AuditStoreKind::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or(ConfigError::Missing("DATABASE_URL"))?;
            let store = PostgresAuditStore::connect_lazy(url).map_err(|e| ConfigError::Invalid {
                key: "DATABASE_URL",
                reason: e.to_string(),
            })?;
            if let Err(e) = store.ensure_schema().await {
                tracing::warn!(error = %e, "could not ensure audit table; writes may fail");
            }
            Arc::new(store)
        }
        AuditStoreKind::Memory => Arc::new(InMemoryAuditStore::new()),
    };

    tracing::info!(
        audit_store = store.name(),
        role_procedure = %config.role_fetch.procedure,
        role_ttl_secs = config.role_cache_ttl.as_secs(),
        "services wired"
    );

    Ok(AppServices::new(
        identity,
        Arc::new(resolver),
        AuditRecorder::new(store),
    ))
}
