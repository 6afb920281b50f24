//! Action registry: the explicit registration contract behind discovery.
//!
//! Handlers register themselves (name, method table, metadata, typed
//! handler and transform function values) at initialization; no runtime
//! introspection is involved. A discovery pass is just a serializable
//! snapshot of the registered metadata — the function values stay on the
//! live registry and are resolved again at invocation time.
//!
//! # Example
//! ```rust,ignore
//! let mut registry = ActionRegistry::new();
//! registry.register(
//!     Action::new("Calculator").method(
//!         Method::new("add", |args| async move { /* ... */ })
//!             .with_len(2),
//!     ),
//! );
//! ```

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::call::{CallArg, CallMeta};
use crate::error::{HandlerError, HandlerResult};

/// Boxed future returned by method handlers.
pub type MethodFuture = Pin<Box<dyn Future<Output = HandlerResult<Value>> + Send>>;

/// Type-erased method handler: bound arguments in, JSON result out.
pub type BoxedMethodHandler = Arc<dyn Fn(Vec<CallArg>) -> MethodFuture + Send + Sync>;

/// Result transform hook.
///
/// Invoked with `(call meta, Some(result), None)` after a successful
/// invocation, or `(call meta, None, Some(error))` after a failed one, and
/// its return value becomes the call's final result. Stored as a typed
/// function value directly on the registered method.
pub type ResultTransform = Arc<
    dyn Fn(&CallMeta, Option<Value>, Option<&HandlerError>) -> HandlerResult<Value> + Send + Sync,
>;

/// A declared form parameter: name plus optional default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Declared parameter name.
    pub name: String,
    /// Default bound when neither a form field nor an upload matches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Serializable method metadata, as cached and routed against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodDescriptor {
    /// Method name.
    pub name: String,
    /// Declared positional argument count; absent skips count validation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub len: Option<usize>,
    /// Whether the method is invoked via form submission.
    pub form_handler: bool,
    /// Declared parameters, in declaration order. Only consulted for form
    /// binding.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ParamSpec>,
    /// Whether a result transform is registered for this method.
    #[serde(default)]
    pub has_transform: bool,
}

/// Serializable snapshot of one registered action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionMap {
    /// Action name, unique across the registry.
    pub action: String,
    /// Where the implementation lives; informational.
    pub locator: String,
    /// Method metadata keyed by method name.
    pub methods: BTreeMap<String, MethodDescriptor>,
}

/// Snapshot of every registered action, as produced by a discovery pass.
pub type ClassMap = BTreeMap<String, ActionMap>;

/// A registered method: metadata plus the live handler and transform.
pub struct Method {
    descriptor: MethodDescriptor,
    handler: BoxedMethodHandler,
    transform: Option<ResultTransform>,
}

impl Method {
    /// Register a method under `name` with the given async handler.
    pub fn new<N, F, Fut>(name: N, handler: F) -> Self
    where
        N: Into<String>,
        F: Fn(Vec<CallArg>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<Value>> + Send + 'static,
    {
        let name = name.into();
        Self {
            descriptor: MethodDescriptor {
                name,
                len: None,
                form_handler: false,
                params: Vec::new(),
                has_transform: false,
            },
            handler: Arc::new(move |args| Box::pin(handler(args))),
            transform: None,
        }
    }

    /// Declare the positional argument count, enabling count validation.
    pub fn with_len(mut self, len: usize) -> Self {
        self.descriptor.len = Some(len);
        self
    }

    /// Mark the method as a form handler.
    pub fn form_handler(mut self) -> Self {
        self.descriptor.form_handler = true;
        self
    }

    /// Declare a form parameter with no default.
    pub fn with_param(mut self, name: impl Into<String>) -> Self {
        self.descriptor.params.push(ParamSpec {
            name: name.into(),
            default: None,
        });
        self
    }

    /// Declare a form parameter with a default value.
    pub fn with_param_default(mut self, name: impl Into<String>, default: Value) -> Self {
        self.descriptor.params.push(ParamSpec {
            name: name.into(),
            default: Some(default),
        });
        self
    }

    /// Attach a result transform.
    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(&CallMeta, Option<Value>, Option<&HandlerError>) -> HandlerResult<Value>
            + Send
            + Sync
            + 'static,
    {
        self.descriptor.has_transform = true;
        self.transform = Some(Arc::new(transform));
        self
    }

    /// Method name.
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }
}

/// A registered action: a named group of remotely callable methods.
pub struct Action {
    name: String,
    locator: String,
    methods: BTreeMap<String, Method>,
}

impl Action {
    /// Register an action under `name`. The locator defaults to the name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            locator: name.clone(),
            name,
            methods: BTreeMap::new(),
        }
    }

    /// Override the implementation locator (e.g. a module path).
    pub fn with_locator(mut self, locator: impl Into<String>) -> Self {
        self.locator = locator.into();
        self
    }

    /// Add a method. A later registration under the same name wins.
    pub fn method(mut self, method: Method) -> Self {
        self.methods.insert(method.name().to_string(), method);
        self
    }

    /// Action name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The central handler registry, playing the metadata provider role.
#[derive(Default)]
pub struct ActionRegistry {
    actions: BTreeMap<String, Action>,
}

impl ActionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action. A later registration under the same name wins.
    pub fn register(&mut self, action: Action) -> &mut Self {
        tracing::debug!(
            action = %action.name,
            methods = action.methods.len(),
            "action registered"
        );
        self.actions.insert(action.name.clone(), action);
        self
    }

    /// Whether no actions are registered.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Number of registered actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Run a discovery pass: snapshot every action's metadata.
    pub fn snapshot(&self) -> ClassMap {
        let map: ClassMap = self
            .actions
            .values()
            .map(|action| {
                (
                    action.name.clone(),
                    ActionMap {
                        action: action.name.clone(),
                        locator: action.locator.clone(),
                        methods: action
                            .methods
                            .values()
                            .map(|m| (m.descriptor.name.clone(), m.descriptor.clone()))
                            .collect(),
                    },
                )
            })
            .collect();

        tracing::debug!(actions = map.len(), "discovery pass completed");
        map
    }

    /// Resolve the live handler for `action.method`.
    pub fn handler(&self, action: &str, method: &str) -> Option<BoxedMethodHandler> {
        self.actions
            .get(action)
            .and_then(|a| a.methods.get(method))
            .map(|m| m.handler.clone())
    }

    /// Resolve the live transform for `action.method`, if one is registered.
    pub fn transform(&self, action: &str, method: &str) -> Option<ResultTransform> {
        self.actions
            .get(action)
            .and_then(|a| a.methods.get(method))
            .and_then(|m| m.transform.clone())
    }
}
