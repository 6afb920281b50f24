//! Wire-level call and result types.
//!
//! A transport request carries either exactly one form call or an ordered
//! batch of RPC calls; every call produces exactly one [`InvocationResult`],
//! returned in input order so the client can correlate positionally and by
//! `tid`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::transport::UploadedFile;

/// Reserved form fields stripped from the payload before binding.
pub const RESERVED_FORM_FIELDS: [&str; 5] =
    ["extAction", "extMethod", "extTID", "extUpload", "extType"];

/// A single routed call.
#[derive(Debug, Clone)]
pub enum Call {
    /// JSON remote procedure call.
    Rpc {
        /// Target action name.
        action: String,
        /// Target method name.
        method: String,
        /// Raw argument payload, passed through to positional binding.
        data: Value,
        /// Client correlation token, echoed unchanged.
        tid: Value,
    },
    /// Form submission, possibly carrying uploads.
    Form {
        /// Target action name.
        action: String,
        /// Target method name.
        method: String,
        /// POST fields with the reserved protocol fields stripped.
        fields: BTreeMap<String, String>,
        /// Client correlation token, echoed unchanged.
        tid: Value,
        /// Uploaded files keyed by form field name.
        uploads: BTreeMap<String, UploadedFile>,
    },
}

impl Call {
    /// Target action name.
    pub fn action(&self) -> &str {
        match self {
            Self::Rpc { action, .. } | Self::Form { action, .. } => action,
        }
    }

    /// Target method name.
    pub fn method(&self) -> &str {
        match self {
            Self::Rpc { method, .. } | Self::Form { method, .. } => method,
        }
    }

    /// Correlation token.
    pub fn tid(&self) -> &Value {
        match self {
            Self::Rpc { tid, .. } | Self::Form { tid, .. } => tid,
        }
    }

    /// Identifying metadata for logging and transforms.
    pub fn meta(&self) -> CallMeta {
        CallMeta {
            action: self.action().to_string(),
            method: self.method().to_string(),
            tid: self.tid().clone(),
        }
    }
}

/// Identifying call metadata handed to result transforms.
#[derive(Debug, Clone, PartialEq)]
pub struct CallMeta {
    /// Action name.
    pub action: String,
    /// Method name.
    pub method: String,
    /// Correlation token.
    pub tid: Value,
}

/// One bound handler argument: an ordinary JSON value or an upload handle.
#[derive(Debug, Clone, PartialEq)]
pub enum CallArg {
    /// A JSON value (RPC payload element, form field, or declared default).
    Value(Value),
    /// An uploaded file bound by field name.
    File(UploadedFile),
}

impl CallArg {
    /// The JSON value, if this argument is one.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            Self::File(_) => None,
        }
    }

    /// The upload handle, if this argument is one.
    pub fn file(&self) -> Option<&UploadedFile> {
        match self {
            Self::Value(_) => None,
            Self::File(f) => Some(f),
        }
    }

    /// The JSON value as a string slice, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        self.value().and_then(Value::as_str)
    }
}

impl From<Value> for CallArg {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<UploadedFile> for CallArg {
    fn from(file: UploadedFile) -> Self {
        Self::File(file)
    }
}

/// Outcome of one call, tagged `rpc` or `exception` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CallOutcome {
    /// The handler (or its transform) produced a result.
    Rpc {
        /// Final result value.
        result: Value,
    },
    /// The handler raised.
    Exception {
        /// Failure description.
        message: String,
        /// Trace detail, possibly empty.
        trace: String,
    },
}

/// The per-call response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationResult {
    /// Action the call targeted.
    pub action: String,
    /// Method the call targeted.
    pub method: String,
    /// Result or exception, flattened with its `type` tag.
    #[serde(flatten)]
    pub outcome: CallOutcome,
    /// Correlation token echoed from the call.
    pub tid: Value,
}

impl InvocationResult {
    /// Whether the outcome is a normal result.
    pub fn is_rpc(&self) -> bool {
        matches!(self.outcome, CallOutcome::Rpc { .. })
    }

    /// Whether the outcome is an exception envelope.
    pub fn is_exception(&self) -> bool {
        matches!(self.outcome, CallOutcome::Exception { .. })
    }

    /// The result value, if the outcome is a normal result.
    pub fn result(&self) -> Option<&Value> {
        match &self.outcome {
            CallOutcome::Rpc { result } => Some(result),
            CallOutcome::Exception { .. } => None,
        }
    }
}
