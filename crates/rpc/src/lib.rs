//! `adminhub-rpc`: normalized invocation of named remote procedures.
//!
//! The hosted platform reports failures on two channels: the transport can fail
//! (no result at all), or the procedure can succeed at the transport level and
//! embed an `error` object in its payload. [`RemoteInvoker`] folds both into a
//! single `Result`, so callers never inspect a payload for errors themselves.
//!
//! There are no retries and no timeouts at this layer.

pub mod error;
pub mod http;
pub mod invoker;
pub mod scripted;

pub use error::{InvokeError, FALLBACK_MESSAGE};
pub use http::HttpTransport;
pub use invoker::{normalize, RawResponse, RemoteInvoker, RpcRequest, RpcTransport, TransportFailure};
pub use scripted::ScriptedTransport;
