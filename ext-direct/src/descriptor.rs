//! API descriptor assembly.
//!
//! Turns a class map plus the static API declaration into the document the
//! client consumes to learn which actions and methods exist. Derived data:
//! recomputed from the class map on every publish, never persisted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ApiConfig;
use crate::registry::{ClassMap, MethodDescriptor};

/// Public projection of one method, as published to the client.
///
/// The transform reference is deliberately absent: it is server-side
/// plumbing the client has no business seeing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodView {
    /// Method name.
    pub name: String,
    /// Declared argument count, when count validation is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub len: Option<usize>,
    /// Whether the method is invoked via form submission.
    pub form_handler: bool,
}

impl From<&MethodDescriptor> for MethodView {
    fn from(descriptor: &MethodDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            len: descriptor.len,
            form_handler: descriptor.form_handler,
        }
    }
}

/// The publishable API descriptor.
///
/// Optional declaration fields are omitted from the wire form entirely when
/// unconfigured, never emitted as null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiDescriptor {
    /// Routing endpoint.
    pub url: String,
    /// Transport type.
    #[serde(rename = "type")]
    pub transport_type: String,
    /// Provider id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Client-side namespace.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Client call timeout in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// Ordered public method views per action.
    pub actions: BTreeMap<String, Vec<MethodView>>,
}

/// Build the publishable descriptor from a class map and API declaration.
///
/// Method order within an action follows class-map iteration order, which is
/// deterministic per snapshot. A class map with zero actions yields an empty
/// `actions` mapping; there are no error conditions.
pub fn build_api(class_map: &ClassMap, api: &ApiConfig) -> ApiDescriptor {
    ApiDescriptor {
        url: api.url.clone(),
        transport_type: api.transport_type.clone(),
        id: api.id.clone(),
        namespace: api.namespace.clone(),
        timeout: api.timeout_ms,
        actions: class_map
            .iter()
            .map(|(name, action)| {
                (
                    name.clone(),
                    action.methods.values().map(MethodView::from).collect(),
                )
            })
            .collect(),
    }
}
