//! Reactive gate evaluation for a single mounted view.
//!
//! A [`GateDriver`] watches the session and the role cache and republishes the
//! access decision whenever either changes. Each change first publishes
//! `Pending`, then the recomputed decision. A role fetch still in flight when a
//! newer session arrives is abandoned, so only the latest session/role pair can
//! produce a published decision. A failed role fetch with nothing cached
//! leaves the decision `Pending` and is exposed through
//! [`GateHandle::last_error`]; it is never turned into a denial. Dropping the
//! [`GateHandle`] stops the driver: nothing is published afterwards and
//! nothing is retried.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use adminhub_rpc::InvokeError;

use crate::gate::{AccessDecision, RouteGate};
use crate::resolver::{RoleResolver, RoleState};
use crate::session::SessionState;

pub struct GateDriver {
    gate: RouteGate,
    resolver: Arc<RoleResolver>,
    location: String,
}

impl GateDriver {
    pub fn new(gate: RouteGate, resolver: Arc<RoleResolver>, location: impl Into<String>) -> Self {
        Self {
            gate,
            resolver,
            location: location.into(),
        }
    }

    /// Start driving decisions from `sessions`. Must be called within a Tokio runtime.
    pub fn spawn(self, sessions: watch::Receiver<SessionState>) -> GateHandle {
        let (tx, decisions) = watch::channel(AccessDecision::Pending);
        let (error_tx, errors) = watch::channel(None);
        let roles = self.resolver.cache().subscribe();
        let task = tokio::spawn(self.run(sessions, roles, tx, error_tx));
        GateHandle {
            decisions,
            errors,
            task,
        }
    }

    async fn run(
        self,
        mut sessions: watch::Receiver<SessionState>,
        mut roles: watch::Receiver<u64>,
        tx: watch::Sender<AccessDecision>,
        error_tx: watch::Sender<Option<InvokeError>>,
    ) {
        loop {
            let session = sessions.borrow_and_update().clone();
            roles.borrow_and_update();
            tx.send_replace(AccessDecision::Pending);

            let outcome = tokio::select! {
                outcome = self.decide(&session) => outcome,
                changed = sessions.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    tracing::debug!(location = %self.location, "session changed mid-resolution; recomputing");
                    continue;
                }
            };

            // Our own cache write must not trigger another round.
            roles.borrow_and_update();
            match outcome {
                Ok(decision) => {
                    error_tx.send_replace(None);
                    tx.send_replace(decision);
                }
                Err(e) => {
                    tracing::warn!(location = %self.location, error = %e, "role resolution failed; decision stays pending");
                    error_tx.send_replace(Some(e));
                }
            }

            tokio::select! {
                changed = sessions.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                changed = roles.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        }
    }

    async fn decide(&self, session: &SessionState) -> Result<AccessDecision, InvokeError> {
        if session.is_loading || session.user.is_none() || !self.gate.needs_role() {
            return Ok(self
                .gate
                .evaluate(session, &RoleState::anonymous(), &self.location));
        }

        let role = self.resolver.resolve(session.session()).await?;
        Ok(self.gate.evaluate(session, &role, &self.location))
    }
}

/// Live decision stream for one mounted view. Dropping it unmounts the view.
#[derive(Debug)]
pub struct GateHandle {
    decisions: watch::Receiver<AccessDecision>,
    errors: watch::Receiver<Option<InvokeError>>,
    task: JoinHandle<()>,
}

impl GateHandle {
    pub fn current(&self) -> AccessDecision {
        self.decisions.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AccessDecision> {
        self.decisions.clone()
    }

    /// The role fetch failure holding the view in `Pending`, cleared by the
    /// next successful resolution.
    pub fn last_error(&self) -> Option<InvokeError> {
        self.errors.borrow().clone()
    }

    /// Wait for the next non-pending decision. `None` if the driver stopped first.
    pub async fn settled(&mut self) -> Option<AccessDecision> {
        self.decisions
            .wait_for(|d| !d.is_pending())
            .await
            .ok()
            .map(|d| d.clone())
    }
}

impl Drop for GateHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
