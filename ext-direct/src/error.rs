//! Error types for descriptor publishing and call routing.
//!
//! Three layers, matching how failures are surfaced:
//!
//! - [`ConfigError`] — fatal at startup. A router is never constructed over
//!   an empty registry or a broken API declaration.
//! - [`RouteError`] — request-level. Aborts the whole transport request with
//!   no partial result list.
//! - [`HandlerError`] — raised by handler business logic and recovered
//!   per-call into an `exception` envelope; sibling calls in the same batch
//!   still run.

use thiserror::Error;

/// Fatal configuration error raised before any request is served.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The registry holds no actions, so there is nothing to discover.
    #[error("no actions registered for discovery")]
    NoActions,
    /// The API declaration is missing a mandatory property.
    #[error("API declaration is missing the '{0}' property")]
    MissingApiProperty(&'static str),
    /// The cache directory cannot be created or accessed.
    #[error("cache directory '{path}' is not usable")]
    CacheDir {
        /// The offending directory path.
        path: String,
        /// The underlying filesystem error.
        #[source]
        source: std::io::Error,
    },
}

/// Request-level failure surfaced by the router.
///
/// Never embedded in an invocation result: when one of these is raised the
/// request terminates with no output, even mid-batch.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The requested action is not present in the class map.
    #[error("unknown action '{0}'")]
    UnknownAction(String),
    /// The action exists but does not expose the requested method.
    #[error("method '{method}' is not allowed on action '{action}'")]
    MethodNotAllowed {
        /// Action looked up.
        action: String,
        /// Method that was refused.
        method: String,
    },
    /// The request body could not be decoded, or a required form field is
    /// absent.
    #[error("malformed request body: {0}")]
    MalformedBody(String),
    /// The persistent cache store failed while reading or writing.
    #[error("cache store failure: {0}")]
    Store(String),
    /// A result transform failed. Transforms are protocol infrastructure,
    /// not handler logic, so this is not recovered per-call.
    #[error("result transform failed for {action}.{method}: {message}")]
    Transform {
        /// Action of the transformed call.
        action: String,
        /// Method of the transformed call.
        method: String,
        /// Failure description from the transform.
        message: String,
    },
    /// The cached class map names a method the live registry no longer has.
    #[error("no live handler for {action}.{method}")]
    HandlerUnresolved {
        /// Action from the cached class map.
        action: String,
        /// Method from the cached class map.
        method: String,
    },
    /// The response payload could not be serialized.
    #[error("response serialization failed: {0}")]
    Serialization(String),
}

/// Result alias for router operations.
pub type RouteResult<T> = Result<T, RouteError>;

/// Error raised by handler business logic during invocation.
///
/// Converted into an `exception` outcome for the owning call; the rest of
/// the batch is unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandlerError {
    /// Human-readable failure description.
    pub message: String,
    /// Optional trace detail echoed to the client alongside the message.
    pub trace: Option<String>,
}

impl HandlerError {
    /// Create an error carrying only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            trace: None,
        }
    }

    /// Attach trace detail.
    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(format!("JSON error: {}", err))
    }
}

/// Result alias for handler and transform functions.
pub type HandlerResult<T> = Result<T, HandlerError>;
