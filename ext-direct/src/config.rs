//! Configuration for the routing layer.
//!
//! # Example
//! ```rust,ignore
//! let config = DirectConfig::new()
//!     .with_api(
//!         ApiConfig::new()
//!             .with_url("http://localhost:8081/router")
//!             .with_id("app")
//!             .with_namespace("Ext.app"),
//!     )
//!     .with_cache(CacheSettings::new().with_ttl(Duration::from_secs(60)));
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default descriptor variable assigned in the publish body.
pub const DEFAULT_DESCRIPTOR_VAR: &str = "Ext.app.REMOTING_API";
/// Default discovery cache key when the API has no id.
pub const DEFAULT_CACHE_KEY: &str = "direct-api";
/// Default discovery cache lifetime.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// The published API declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Routing endpoint the client posts calls to. Mandatory.
    pub url: String,
    /// Transport type announced to the client (normally `remoting`).
    /// Mandatory.
    pub transport_type: String,
    /// Optional provider id.
    pub id: Option<String>,
    /// Optional client-side namespace.
    pub namespace: Option<String>,
    /// Optional client call timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Variable the descriptor is assigned to in the publish body.
    pub descriptor_var: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            transport_type: "remoting".to_string(),
            id: None,
            namespace: None,
            timeout_ms: None,
            descriptor_var: DEFAULT_DESCRIPTOR_VAR.to_string(),
        }
    }
}

impl ApiConfig {
    /// Create a declaration with defaults (`remoting`, no optionals).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the routing endpoint URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the transport type.
    pub fn with_transport_type(mut self, transport_type: impl Into<String>) -> Self {
        self.transport_type = transport_type.into();
        self
    }

    /// Set the provider id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the client-side namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set the client call timeout in milliseconds.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Set the descriptor variable name.
    pub fn with_descriptor_var(mut self, var: impl Into<String>) -> Self {
        self.descriptor_var = var.into();
        self
    }
}

/// Discovery cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Store key the class map is persisted under.
    pub key: String,
    /// Lifetime of a persisted class map.
    pub ttl: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            key: DEFAULT_CACHE_KEY.to_string(),
            ttl: DEFAULT_CACHE_TTL,
        }
    }
}

impl CacheSettings {
    /// Create settings with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the store key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Set the class map lifetime.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Top-level routing layer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectConfig {
    /// Published API declaration.
    pub api: ApiConfig,
    /// Discovery cache settings.
    pub cache: CacheSettings,
}

impl DirectConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the API declaration. When the declaration carries an id and the
    /// cache key is still the default, the id becomes the cache key.
    pub fn with_api(mut self, api: ApiConfig) -> Self {
        if self.cache.key == DEFAULT_CACHE_KEY {
            if let Some(id) = &api.id {
                self.cache.key = id.clone();
            }
        }
        self.api = api;
        self
    }

    /// Set the cache settings.
    pub fn with_cache(mut self, cache: CacheSettings) -> Self {
        self.cache = cache;
        self
    }

    /// Validate the mandatory API declaration properties.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.url.is_empty() {
            return Err(ConfigError::MissingApiProperty("url"));
        }
        if self.api.transport_type.is_empty() {
            return Err(ConfigError::MissingApiProperty("type"));
        }
        Ok(())
    }
}
