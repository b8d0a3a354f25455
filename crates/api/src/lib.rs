//! HTTP API: server, routing, gating and audit wiring.

pub mod app;
pub mod config;
pub mod context;
pub mod gate;
pub mod middleware;
