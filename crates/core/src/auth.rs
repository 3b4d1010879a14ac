//! Resolved authentication state
//!
//! The identity service answers a successful login with a token and a service
//! catalog. Both are captured here once and shared by every request a client
//! makes afterwards.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Storage endpoint pair for one region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEndpoint {
    /// Service-net URL, only reachable from inside the data center
    pub internal: String,
    /// Public URL
    pub public: String,
}

impl StorageEndpoint {
    /// Pick the URL variant
    pub fn url(&self, internal: bool) -> &str {
        if internal {
            &self.internal
        } else {
            &self.public
        }
    }
}

/// Compute endpoints, kept for completeness of the catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServersCatalog {
    /// OpenStack compute endpoints by region
    pub opencloud: HashMap<String, String>,
    /// First-generation compute endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legacy: Option<String>,
}

/// Endpoints extracted from the identity service catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCatalog {
    /// Object storage endpoints by region
    pub storage: HashMap<String, StorageEndpoint>,
    /// CDN management endpoints by region
    pub cdn: HashMap<String, String>,
    /// Compute endpoints
    pub servers: ServersCatalog,
}

/// Which service a storage request is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Storage,
    Cdn,
}

/// Token, effective region and catalog from one successful authentication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAuth {
    /// Value for the `X-Auth-Token` header
    pub token: String,
    /// Explicit region, or the account's default region
    pub region: String,
    /// Token expiry as reported by the identity service
    ///
    /// Informational only, the token is never refreshed.
    pub expires: Option<jiff::Timestamp>,
    pub catalog: ServiceCatalog,
}

impl ResolvedAuth {
    /// Base URL of the given service in the effective region
    pub fn base_url(&self, endpoint: Endpoint, internal: bool) -> Result<&str> {
        match endpoint {
            Endpoint::Storage => self
                .catalog
                .storage
                .get(&self.region)
                .map(|e| e.url(internal))
                .ok_or_else(|| {
                    Error::Protocol(format!(
                        "service catalog has no cloudFiles endpoint for region {}",
                        self.region
                    ))
                }),
            Endpoint::Cdn => self
                .catalog
                .cdn
                .get(&self.region)
                .map(String::as_str)
                .ok_or_else(|| {
                    Error::Protocol(format!(
                        "service catalog has no cloudFilesCDN endpoint for region {}",
                        self.region
                    ))
                }),
        }
    }

    /// Whether the token's reported expiry has passed
    pub fn is_expired(&self, now: jiff::Timestamp) -> bool {
        self.expires.is_some_and(|at| at <= now)
    }
}
