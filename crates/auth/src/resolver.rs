//! Role resolution with a per-caller courtesy cache.
//!
//! The remote procedure is authoritative; the cache only avoids asking it on
//! every gate evaluation. Entries are replaced wholesale, never merged, so
//! concurrent resolutions for the same caller are harmless.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use tokio::sync::watch;

use adminhub_core::CallerId;
use adminhub_rpc::{InvokeError, RemoteInvoker};

use crate::roles::{ReportedRole, Role};
use crate::session::Session;

/// Default freshness window for cached roles.
pub const DEFAULT_ROLE_TTL: Duration = Duration::from_secs(5 * 60);

/// Which remote procedure reports "the caller's own role".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleFetch {
    pub procedure: String,
    pub action: String,
}

impl Default for RoleFetch {
    fn default() -> Self {
        Self {
            procedure: "admin-api".to_string(),
            action: "get_my_role".to_string(),
        }
    }
}

/// Resolved role for the current caller: `{ role, isLoading }`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RoleState {
    pub role: Option<ReportedRole>,
    pub is_loading: bool,
}

impl RoleState {
    /// No session: nothing to resolve, nothing loading.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn loading() -> Self {
        Self {
            role: None,
            is_loading: true,
        }
    }

    pub fn resolved(role: ReportedRole) -> Self {
        Self {
            role: Some(role),
            is_loading: false,
        }
    }

    pub fn level(&self) -> Option<u8> {
        self.role.as_ref().map(ReportedRole::level)
    }

    /// Level used for gating: a missing role counts as [`Role::User`].
    pub fn effective_level(&self) -> u8 {
        self.level().unwrap_or(Role::User.level())
    }

    pub fn is_admin(&self) -> bool {
        self.at_least(Role::Admin)
    }

    pub fn is_owner(&self) -> bool {
        self.at_least(Role::Owner)
    }

    /// True only once a role is known and it is at least `required`.
    pub fn at_least(&self, required: Role) -> bool {
        self.level().is_some_and(|level| level <= required.level())
    }
}

#[derive(Debug, Clone)]
struct CachedRole {
    role: ReportedRole,
    fetched_at: Instant,
}

/// Per-caller role cache with a freshness window.
///
/// Every write bumps a generation counter so gate drivers can recompute when a
/// role changes underneath them. Entries older than the retention window are
/// evicted on write; until then a stale role remains available as a fallback.
#[derive(Debug)]
pub struct RoleCache {
    ttl: Duration,
    retention: Duration,
    entries: RwLock<HashMap<CallerId, CachedRole>>,
    in_flight: Mutex<HashMap<CallerId, usize>>,
    generation: watch::Sender<u64>,
}

impl RoleCache {
    pub fn new(ttl: Duration) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            ttl,
            retention: ttl.saturating_mul(2),
            entries: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            generation,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// How long past its fetch an entry survives other callers' writes.
    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Cached role and whether it is still inside the freshness window.
    pub fn lookup(&self, caller: &CallerId) -> Option<(ReportedRole, bool)> {
        let entries = self.entries.read().unwrap();
        entries
            .get(caller)
            .map(|e| (e.role.clone(), e.fetched_at.elapsed() < self.ttl))
    }

    pub fn store(&self, caller: CallerId, role: ReportedRole) {
        self.store_at(caller, role, Instant::now());
    }

    pub(crate) fn store_at(&self, caller: CallerId, role: ReportedRole, fetched_at: Instant) {
        let (previous, evicted) = {
            let mut entries = self.entries.write().unwrap();
            let before = entries.len();
            entries.retain(|id, e| *id == caller || e.fetched_at.elapsed() < self.retention);
            let evicted = before - entries.len();
            let previous = entries.insert(caller, CachedRole { role: role.clone(), fetched_at });
            (previous, evicted)
        };

        // Eviction alone does not bump: no published decision depends on it.
        if evicted > 0 {
            tracing::debug!(evicted, "evicted expired role cache entries");
        }
        if previous.map(|p| p.role) != Some(role) {
            self.bump();
        }
    }

    pub fn invalidate(&self, caller: &CallerId) {
        if self.entries.write().unwrap().remove(caller).is_some() {
            self.bump();
        }
    }

    pub fn clear(&self) {
        self.entries.write().unwrap().clear();
        self.bump();
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Notified whenever a cached role is added, changed or removed.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    /// True while at least one role fetch for `caller` is running.
    pub fn is_in_flight(&self, caller: &CallerId) -> bool {
        self.in_flight.lock().unwrap().contains_key(caller)
    }

    fn bump(&self) {
        self.generation.send_modify(|g| *g = g.wrapping_add(1));
    }
}

impl Default for RoleCache {
    fn default() -> Self {
        Self::new(DEFAULT_ROLE_TTL)
    }
}

/// Marks a caller's fetch as in flight until dropped (also on cancellation).
///
/// Guards are counted per caller, so overlapping fetches keep the caller in
/// flight until the last one finishes.
struct InFlight<'a> {
    cache: &'a RoleCache,
    caller: CallerId,
}

impl<'a> InFlight<'a> {
    fn begin(cache: &'a RoleCache, caller: CallerId) -> Self {
        *cache.in_flight.lock().unwrap().entry(caller).or_insert(0) += 1;
        Self { cache, caller }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.cache.in_flight.lock().unwrap();
        if let Some(count) = in_flight.get_mut(&self.caller) {
            *count -= 1;
            if *count == 0 {
                in_flight.remove(&self.caller);
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RoleResponse {
    #[serde(default)]
    role: Option<JsonValue>,
}

/// Resolves the current caller's role through the remote procedure.
#[derive(Debug, Clone)]
pub struct RoleResolver {
    invoker: RemoteInvoker,
    cache: Arc<RoleCache>,
    fetch: RoleFetch,
    refetch_on_focus: bool,
}

impl RoleResolver {
    pub fn new(invoker: RemoteInvoker, cache: Arc<RoleCache>) -> Self {
        Self {
            invoker,
            cache,
            fetch: RoleFetch::default(),
            refetch_on_focus: true,
        }
    }

    pub fn with_fetch(mut self, fetch: RoleFetch) -> Self {
        self.fetch = fetch;
        self
    }

    pub fn with_refetch_on_focus(mut self, enabled: bool) -> Self {
        self.refetch_on_focus = enabled;
        self
    }

    pub fn cache(&self) -> &Arc<RoleCache> {
        &self.cache
    }

    /// Non-blocking snapshot. A stale cached role is still reported as the
    /// current role. With a session and nothing cached the role is loading,
    /// whether or not a fetch has started yet.
    pub fn state(&self, session: Option<&Session>) -> RoleState {
        let Some(session) = session else {
            return RoleState::anonymous();
        };

        match self.cache.lookup(&session.caller_id) {
            Some((role, _fresh)) => RoleState::resolved(role),
            None => RoleState::loading(),
        }
    }

    /// Resolve the caller's role, asking the remote procedure unless a fresh
    /// cached value exists. Never calls out without a session.
    ///
    /// A failed refresh keeps a stale cached role; with nothing cached the
    /// error is returned.
    pub async fn resolve(&self, session: Option<&Session>) -> Result<RoleState, InvokeError> {
        let Some(session) = session else {
            return Ok(RoleState::anonymous());
        };

        let cached = self.cache.lookup(&session.caller_id);
        if let Some((role, true)) = &cached {
            return Ok(RoleState::resolved(role.clone()));
        }

        match self.fetch_and_store(session).await {
            Ok(role) => Ok(RoleState::resolved(role)),
            Err(e) => match cached {
                Some((stale, _)) => {
                    tracing::warn!(caller_id = %session.caller_id, error = %e, "role refresh failed; keeping stale role");
                    Ok(RoleState::resolved(stale))
                }
                None => Err(e),
            },
        }
    }

    /// Unconditionally ask the remote procedure and replace the cached role.
    pub async fn refresh(&self, session: &Session) -> Result<RoleState, InvokeError> {
        self.fetch_and_store(session).await.map(RoleState::resolved)
    }

    /// Host regained focus: refetch if the cached role is stale (or absent).
    pub async fn focus_regained(&self, session: Option<&Session>) -> Result<RoleState, InvokeError> {
        if !self.refetch_on_focus {
            return Ok(self.state(session));
        }
        tracing::debug!("focus regained; revalidating role");
        self.resolve(session).await
    }

    async fn fetch_and_store(&self, session: &Session) -> Result<ReportedRole, InvokeError> {
        let _in_flight = InFlight::begin(&self.cache, session.caller_id);

        let response: Option<RoleResponse> = self
            .invoker
            .invoke_as(
                Some(session.access_token()),
                &self.fetch.procedure,
                json!({ "action": self.fetch.action }),
            )
            .await?;

        let role = ReportedRole::from_wire(response.as_ref().and_then(|r| r.role.as_ref()));
        if let ReportedRole::Unrecognized(name) = &role {
            tracing::warn!(caller_id = %session.caller_id, role = %name, "unrecognized role reported; treating as least privileged");
        }

        self.cache.store(session.caller_id, role.clone());
        Ok(role)
    }
}
