//! In-memory transport with scripted responses (tests / local development).

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::invoker::{RawResponse, RpcRequest, RpcTransport};

#[derive(Debug, Default)]
struct Script {
    queued: HashMap<String, VecDeque<RawResponse>>,
    fixed: HashMap<String, RawResponse>,
    calls: Vec<RpcRequest>,
}

/// Transport that answers from a script instead of the network.
///
/// Queued responses are consumed first (one per call), then the fixed response
/// for the procedure is returned on every call. A procedure with neither is a
/// transport failure.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<Script>,
    latency: Option<Duration>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response by `latency` (to observe in-flight states).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Answer every call to `procedure` with `response`.
    pub fn respond(&self, procedure: impl Into<String>, response: RawResponse) {
        self.script
            .lock()
            .unwrap()
            .fixed
            .insert(procedure.into(), response);
    }

    /// Answer the next call to `procedure` with `response`.
    pub fn enqueue(&self, procedure: impl Into<String>, response: RawResponse) {
        self.script
            .lock()
            .unwrap()
            .queued
            .entry(procedure.into())
            .or_default()
            .push_back(response);
    }

    /// All requests received so far, in order.
    pub fn calls(&self) -> Vec<RpcRequest> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self, procedure: &str) -> usize {
        self.script
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.procedure == procedure)
            .count()
    }

    fn next_response(&self, request: RpcRequest) -> RawResponse {
        let mut script = self.script.lock().unwrap();
        let procedure = request.procedure.clone();
        script.calls.push(request);

        if let Some(next) = script.queued.get_mut(&procedure).and_then(VecDeque::pop_front) {
            return next;
        }

        script.fixed.get(&procedure).cloned().unwrap_or_else(|| {
            RawResponse::failure(Some(format!("no scripted response for '{procedure}'")))
        })
    }
}

#[async_trait]
impl RpcTransport for ScriptedTransport {
    async fn call(&self, request: RpcRequest) -> RawResponse {
        let response = self.next_response(request);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        response
    }
}
