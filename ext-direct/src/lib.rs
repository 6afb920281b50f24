#![warn(missing_docs)]
//! # ext-direct
//!
//! A direct-style remoting layer for the web: publishes a machine-readable
//! descriptor of registered server actions, then receives batched or single
//! remote procedure calls — or HTML form submissions, including file
//! uploads — and dispatches each to the matching handler, returning
//! structured results or structured error envelopes.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                     Browser client                         │
//! │   GET /api ── descriptor + tokens     POST /router ── calls│
//! └───────────────┬──────────────────────────────┬─────────────┘
//!                 ▼                              ▼
//! ┌────────────────────────────────────────────────────────────┐
//! │ Router                                                     │
//! │   api()  ── DiscoveryCache ─ build_api ─ TokenIssuer       │
//! │   route()── classify ─ validate ─ Invocation* ─ serialize  │
//! └───────────────┬──────────────────────────────┬─────────────┘
//!                 ▼                              ▼
//!       ┌─────────────────┐           ┌────────────────────┐
//!       │ CacheStore      │           │ ActionRegistry     │
//!       │ (class map TTL) │           │ (handlers, meta)   │
//!       └─────────────────┘           └────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use ext_direct::prelude::*;
//!
//! let mut registry = ActionRegistry::new();
//! registry.register(
//!     Action::new("Calculator").method(
//!         Method::new("add", |args: Vec<CallArg>| async move {
//!             let x = args[0].value().and_then(|v| v.as_i64()).unwrap_or(0);
//!             let y = args[1].value().and_then(|v| v.as_i64()).unwrap_or(0);
//!             Ok(serde_json::json!(x + y))
//!         })
//!         .with_len(2),
//!     ),
//! );
//!
//! let router = Router::new(
//!     Arc::new(registry),
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(MemorySessionStore::new()),
//!     DirectConfig::new().with_api(ApiConfig::new().with_url("/router")),
//! )?;
//!
//! let response = router.route(&DirectRequest::json(
//!     r#"{"type":"rpc","action":"Calculator","method":"add","data":[1,2],"tid":1}"#,
//! )).await?;
//! ```
//!
//! The host HTTP server adapts its request/response types to
//! [`DirectRequest`]/[`DirectResponse`]; this crate never touches a socket.

pub mod cache;
pub mod call;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod invocation;
pub mod registry;
pub mod router;
pub mod session;
pub mod token;
pub mod transport;

#[cfg(test)]
mod tests;

pub use cache::{CacheStore, DiscoveryCache, FileStore, MemoryStore, StoreError, StoreResult};
pub use call::{Call, CallArg, CallMeta, CallOutcome, InvocationResult, RESERVED_FORM_FIELDS};
pub use config::{ApiConfig, CacheSettings, DirectConfig};
pub use descriptor::{ApiDescriptor, MethodView, build_api};
pub use error::{ConfigError, HandlerError, HandlerResult, RouteError, RouteResult};
pub use invocation::Invocation;
pub use registry::{
    Action, ActionMap, ActionRegistry, BoxedMethodHandler, ClassMap, Method, MethodDescriptor,
    MethodFuture, ParamSpec, ResultTransform,
};
pub use router::Router;
pub use session::{MemorySessionStore, SessionStore};
pub use token::{
    SET_TOKEN1_HEADER, SET_TOKEN2_HEADER, TOKEN1_COOKIE, TOKEN2_SESSION_KEY, TokenPair,
};
pub use transport::{DirectRequest, DirectResponse, SetCookie, UploadedFile};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        Action, ActionRegistry, ApiConfig, ApiDescriptor, CacheSettings, CacheStore, Call, CallArg,
        CallMeta, CallOutcome, ConfigError, DirectConfig, DirectRequest, DirectResponse,
        DiscoveryCache, FileStore, HandlerError, HandlerResult, InvocationResult, MemorySessionStore,
        MemoryStore, Method, MethodDescriptor, MethodView, ParamSpec, RouteError, RouteResult,
        Router, SessionStore, TokenPair, UploadedFile,
    };
}
