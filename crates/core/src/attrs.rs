//! Remote attributes of containers and objects
//!
//! Field presence depends on what the server reported, so each record is an
//! explicit variant rather than a bag of optional keys.

use serde::{Deserialize, Serialize};

/// Public URIs of a CDN-enabled container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdnUris {
    pub uri: String,
    pub ssl_uri: String,
    pub streaming_uri: String,
}

/// Metadata of an existing container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    /// Total bytes stored in the container
    pub bytes_used: u64,

    /// Number of objects in the container
    pub object_count: u64,

    /// CDN URIs when the container is published through the CDN
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cdn: Option<CdnUris>,
}

/// Result of probing a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerAttrs {
    Missing,
    Present(ContainerInfo),
}

impl ContainerAttrs {
    pub fn exists(&self) -> bool {
        matches!(self, ContainerAttrs::Present(_))
    }

    pub fn info(&self) -> Option<&ContainerInfo> {
        match self {
            ContainerAttrs::Present(info) => Some(info),
            ContainerAttrs::Missing => None,
        }
    }

    pub fn bytes_used(&self) -> Option<u64> {
        self.info().map(|i| i.bytes_used)
    }

    pub fn cdn_enabled(&self) -> bool {
        self.cdn().is_some()
    }

    pub fn cdn(&self) -> Option<&CdnUris> {
        self.info().and_then(|i| i.cdn.as_ref())
    }
}

/// Metadata of an existing object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Object name within its container
    pub name: String,

    /// Size in bytes
    pub size_bytes: u64,

    /// Content hash (MD5 for plain uploads), without quotes
    pub etag: String,

    /// Content type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Last modified timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<jiff::Timestamp>,
}

impl ObjectInfo {
    /// Create a new ObjectInfo with the required fields
    pub fn new(name: impl Into<String>, size_bytes: u64, etag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size_bytes,
            etag: etag.into(),
            content_type: None,
            last_modified: None,
        }
    }
}

/// Result of probing an object
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectAttrs {
    Missing,
    Present(ObjectInfo),
}

impl ObjectAttrs {
    pub fn exists(&self) -> bool {
        matches!(self, ObjectAttrs::Present(_))
    }

    pub fn info(&self) -> Option<&ObjectInfo> {
        match self {
            ObjectAttrs::Present(info) => Some(info),
            ObjectAttrs::Missing => None,
        }
    }

    pub fn size_bytes(&self) -> Option<u64> {
        self.info().map(|i| i.size_bytes)
    }

    pub fn etag(&self) -> Option<&str> {
        self.info().map(|i| i.etag.as_str())
    }
}

/// Strip the quotes some servers put around entity tags
pub fn unquote_etag(raw: &str) -> &str {
    raw.trim().trim_matches('"')
}
