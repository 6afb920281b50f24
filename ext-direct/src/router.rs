//! Request classification, validation, dispatch, and descriptor publishing.
//!
//! The router owns the two protocol endpoints:
//!
//! - [`Router::api`] publishes the API descriptor with the session token
//!   pair, and
//! - [`Router::route`] classifies an incoming request (form vs JSON, single
//!   vs batch, upload or not), validates every target against the class map
//!   before anything runs, executes the calls strictly in input order, and
//!   serializes the combined result.

use std::sync::Arc;

use serde_json::Value;

use crate::cache::{CacheStore, DiscoveryCache};
use crate::call::{Call, InvocationResult, RESERVED_FORM_FIELDS};
use crate::config::DirectConfig;
use crate::descriptor::build_api;
use crate::error::{ConfigError, RouteError, RouteResult};
use crate::invocation::Invocation;
use crate::registry::{ActionRegistry, ClassMap, MethodDescriptor};
use crate::session::SessionStore;
use crate::token::{self, SET_TOKEN1_HEADER, SET_TOKEN2_HEADER, TOKEN1_COOKIE};
use crate::transport::{DirectRequest, DirectResponse};

/// The protocol router.
pub struct Router {
    registry: Arc<ActionRegistry>,
    cache: DiscoveryCache,
    sessions: Arc<dyn SessionStore>,
    config: DirectConfig,
}

impl Router {
    /// Build a router over a registry, cache store, and session store.
    ///
    /// Fails fast on configuration problems: an empty registry or a missing
    /// mandatory API property is rejected here, never per-request.
    pub fn new(
        registry: Arc<ActionRegistry>,
        store: Arc<dyn CacheStore>,
        sessions: Arc<dyn SessionStore>,
        config: DirectConfig,
    ) -> Result<Self, ConfigError> {
        if registry.is_empty() {
            return Err(ConfigError::NoActions);
        }
        config.validate()?;

        let cache = DiscoveryCache::new(registry.clone(), store, &config.cache);
        Ok(Self {
            registry,
            cache,
            sessions,
            config,
        })
    }

    /// Whether the request is a form submission, by `Content-Type`.
    pub fn is_form_request(request: &DirectRequest) -> bool {
        match &request.content_type {
            Some(content_type) => {
                content_type.contains("application/x-www-form-urlencoded")
                    || content_type.contains("multipart/form-data")
            }
            None => false,
        }
    }

    /// Whether the request is an upload: multipart with at least one file.
    /// Only affects output formatting.
    pub fn is_upload(request: &DirectRequest) -> bool {
        match &request.content_type {
            Some(content_type) => {
                content_type.contains("multipart/form-data") && !request.uploads.is_empty()
            }
            None => false,
        }
    }

    fn validate_target<'a>(
        class_map: &'a ClassMap,
        action: &str,
        method: &str,
    ) -> RouteResult<&'a MethodDescriptor> {
        let action_map = class_map
            .get(action)
            .ok_or_else(|| RouteError::UnknownAction(action.to_string()))?;
        action_map
            .methods
            .get(method)
            .ok_or_else(|| RouteError::MethodNotAllowed {
                action: action.to_string(),
                method: method.to_string(),
            })
    }

    fn form_field<'a>(request: &'a DirectRequest, name: &str) -> RouteResult<&'a str> {
        request
            .form
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| RouteError::MalformedBody(format!("missing '{}' field", name)))
    }

    fn build_form_call(request: &DirectRequest, class_map: &ClassMap) -> RouteResult<Call> {
        let action = Self::form_field(request, "extAction")?.to_string();
        let method = Self::form_field(request, "extMethod")?.to_string();
        let tid = Value::String(Self::form_field(request, "extTID")?.to_string());

        Self::validate_target(class_map, &action, &method)?;

        let fields = request
            .form
            .iter()
            .filter(|(name, _)| !RESERVED_FORM_FIELDS.contains(&name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        Ok(Call::Form {
            action,
            method,
            fields,
            tid,
            uploads: request.uploads.clone(),
        })
    }

    fn build_rpc_calls(request: &DirectRequest, class_map: &ClassMap) -> RouteResult<Vec<Call>> {
        let body: Value = serde_json::from_str(&request.body)
            .map_err(|err| RouteError::MalformedBody(err.to_string()))?;

        // A single call object is the degenerate length-1 batch.
        let elements = match body {
            Value::Array(items) => items,
            object @ Value::Object(_) => vec![object],
            _ => {
                return Err(RouteError::MalformedBody(
                    "call batch must be an object or an array".to_string(),
                ));
            }
        };

        let mut calls = Vec::with_capacity(elements.len());
        for element in elements {
            // Reserved for protocol extensions (polling/event types).
            if element.get("type").and_then(Value::as_str) != Some("rpc") {
                tracing::trace!("skipping non-rpc batch element");
                continue;
            }

            let action = element
                .get("action")
                .and_then(Value::as_str)
                .ok_or_else(|| RouteError::MalformedBody("call is missing 'action'".to_string()))?
                .to_string();
            let method = element
                .get("method")
                .and_then(Value::as_str)
                .ok_or_else(|| RouteError::MalformedBody("call is missing 'method'".to_string()))?
                .to_string();

            Self::validate_target(class_map, &action, &method)?;

            calls.push(Call::Rpc {
                action,
                method,
                data: element.get("data").cloned().unwrap_or(Value::Null),
                tid: element.get("tid").cloned().unwrap_or(Value::Null),
            });
        }

        Ok(calls)
    }

    /// Classify the request and build its calls, validating every target
    /// before any invocation runs.
    fn build_calls(&self, request: &DirectRequest, class_map: &ClassMap) -> RouteResult<Vec<Call>> {
        if Self::is_form_request(request) {
            tracing::debug!("classified as form request");
            Ok(vec![Self::build_form_call(request, class_map)?])
        } else {
            tracing::debug!("classified as JSON request");
            Self::build_rpc_calls(request, class_map)
        }
    }

    fn prepare(&self, call: &Call, class_map: &ClassMap) -> RouteResult<Invocation> {
        let descriptor = Self::validate_target(class_map, call.action(), call.method())?.clone();
        let handler = self
            .registry
            .handler(call.action(), call.method())
            .ok_or_else(|| RouteError::HandlerUnresolved {
                action: call.action().to_string(),
                method: call.method().to_string(),
            })?;
        let transform = self.registry.transform(call.action(), call.method());
        Ok(Invocation::new(call, descriptor, handler, transform))
    }

    fn encode<T: serde::Serialize>(value: &T) -> RouteResult<String> {
        serde_json::to_string(value).map_err(|err| RouteError::Serialization(err.to_string()))
    }

    /// Wrap the JSON result for hidden-iframe uploads: same-document
    /// response with `&quot;` sequences escaped.
    fn textarea_document(json: &str) -> String {
        format!(
            "<html><body><textarea>{}</textarea></body></html>",
            json.replace("&quot;", "\\&quot;")
        )
    }

    fn format_results(
        results: &[InvocationResult],
        upload: bool,
    ) -> RouteResult<DirectResponse> {
        if upload {
            let first = results.first().ok_or_else(|| {
                RouteError::Serialization("upload batch produced no result".to_string())
            })?;
            return Ok(DirectResponse::html(Self::textarea_document(
                &Self::encode(first)?,
            )));
        }

        let body = match results {
            [single] => Self::encode(single)?,
            batch => Self::encode(&batch)?,
        };
        Ok(DirectResponse::json(body))
    }

    /// Dispatch an incoming call request.
    ///
    /// Every call in the batch executes strictly in input order and yields
    /// exactly one result at its input position; routing and validation
    /// failures abort the whole request with no partial output.
    #[tracing::instrument(skip(self, request))]
    pub async fn route(&self, request: &DirectRequest) -> RouteResult<DirectResponse> {
        let class_map = self.cache.resolve().await?;
        let calls = self.build_calls(request, &class_map)?;
        let upload = Self::is_upload(request);

        let mut results = Vec::with_capacity(calls.len());
        for call in &calls {
            let invocation = self.prepare(call, &class_map)?;
            results.push(invocation.run().await?);
        }

        tracing::debug!(calls = calls.len(), upload, "request dispatched");
        Self::format_results(&results, upload)
    }

    /// Publish the API descriptor.
    ///
    /// The body assigns the descriptor JSON to the configured variable and
    /// appends the token interceptor snippet; the token pair also travels as
    /// response headers and a cookie.
    #[tracing::instrument(skip(self, request))]
    pub async fn api(&self, request: &DirectRequest) -> RouteResult<DirectResponse> {
        let class_map = self.cache.resolve().await?;
        let descriptor = build_api(&class_map, &self.config.api);

        let tokens = token::issue(self.sessions.as_ref(), &request.cookies).await;

        let mut body = format!(
            "{}={};",
            self.config.api.descriptor_var,
            Self::encode(&descriptor)?
        );
        body.push_str(&token::interceptor_snippet(&tokens));

        Ok(DirectResponse::javascript(body)
            .with_header(SET_TOKEN1_HEADER, &tokens.token1)
            .with_header(SET_TOKEN2_HEADER, &tokens.token2)
            .with_cookie(TOKEN1_COOKIE, &tokens.token1))
    }
}
