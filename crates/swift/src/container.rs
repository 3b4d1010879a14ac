//! Container handles

use std::sync::Arc;

use serde::Deserialize;

use cf_core::transport::Method;
use cf_core::{CdnUris, ContainerAttrs, ContainerInfo, Endpoint, Error, Memo, ObjectInfo, Result};

use crate::object::Object;
use crate::storage::Session;

/// Maximum number of entries the server returns per listing page
pub const LISTING_PAGE_LIMIT: usize = 10_000;

/// One entry of a JSON object listing
#[derive(Debug, Deserialize)]
struct ListingEntry {
    name: String,
    bytes: u64,
    hash: String,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    last_modified: Option<String>,
}

impl ListingEntry {
    fn into_info(self) -> ObjectInfo {
        let last_modified = self.last_modified.as_deref().and_then(parse_listing_time);
        ObjectInfo {
            name: self.name,
            size_bytes: self.bytes,
            etag: self.hash,
            content_type: self.content_type,
            last_modified,
        }
    }
}

/// Listing timestamps are UTC without an offset, e.g. `2024-05-09T13:53:36.123450`
fn parse_listing_time(raw: &str) -> Option<jiff::Timestamp> {
    raw.parse::<jiff::civil::DateTime>()
        .and_then(|dt| dt.to_zoned(jiff::tz::TimeZone::UTC))
        .map(|zoned| zoned.timestamp())
        .ok()
}

struct ContainerInner {
    name: String,
    session: Arc<Session>,
    attrs: Memo<ContainerAttrs>,
}

/// A named container within an account
///
/// Cloning is cheap and clones share the cached attributes.
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

impl Container {
    pub(crate) fn new(session: Arc<Session>, name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ContainerInner {
                name: name.into(),
                session,
                attrs: Memo::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub(crate) fn session(&self) -> &Arc<Session> {
        &self.inner.session
    }

    /// Whether two handles are the same instance
    pub fn ptr_eq(&self, other: &Container) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Existence, usage and CDN state, fetched once per handle
    pub async fn attributes(&self) -> Result<&ContainerAttrs> {
        self.inner
            .attrs
            .get_or_try_init(|| self.fetch_attributes())
            .await
    }

    pub async fn exists(&self) -> Result<bool> {
        Ok(self.attributes().await?.exists())
    }

    async fn fetch_attributes(&self) -> Result<ContainerAttrs> {
        let session = self.session();
        let request = session
            .prepare(Method::Head, self.name(), Endpoint::Storage)
            .await?;
        let response = session.send(request).await?;

        if response.is_not_found() {
            tracing::debug!(container = self.name(), "container does not exist");
            return Ok(ContainerAttrs::Missing);
        }
        if !response.is_success() {
            return Err(response.into_remote_error().await);
        }

        let bytes_used = response
            .header_u64("x-container-bytes-used")?
            .ok_or_else(|| {
                Error::Protocol("response is missing the x-container-bytes-used header".into())
            })?;
        let object_count = response
            .header_u64("x-container-object-count")?
            .unwrap_or_default();

        Ok(ContainerAttrs::Present(ContainerInfo {
            bytes_used,
            object_count,
            cdn: self.fetch_cdn().await?,
        }))
    }

    async fn fetch_cdn(&self) -> Result<Option<CdnUris>> {
        let session = self.session();
        if !session.has_cdn().await? {
            tracing::debug!(container = self.name(), "no CDN endpoint in this region");
            return Ok(None);
        }

        let request = session
            .prepare(Method::Head, self.name(), Endpoint::Cdn)
            .await?;
        let response = session.send(request).await?;

        if !response.is_success() {
            return Ok(None);
        }
        if response
            .header("x-cdn-enabled")
            .is_some_and(|v| v.eq_ignore_ascii_case("false"))
        {
            return Ok(None);
        }

        Ok(Some(CdnUris {
            uri: response.required_header("x-cdn-uri")?.to_string(),
            ssl_uri: response.required_header("x-cdn-ssl-uri")?.to_string(),
            streaming_uri: response.required_header("x-cdn-streaming-uri")?.to_string(),
        }))
    }

    /// Handle for an object in this container; nothing is fetched
    pub fn object(&self, name: impl Into<String>) -> Object {
        Object::new(self.clone(), name)
    }

    /// List every object in the container
    ///
    /// Pages are requested until one comes back with fewer than
    /// [`LISTING_PAGE_LIMIT`] entries. The returned objects carry their
    /// listing metadata, so reading their attributes needs no extra request.
    pub async fn list_objects(&self) -> Result<Vec<Object>> {
        let mut objects = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let page = self.list_page(marker.as_deref()).await?;
            let page_len = page.len();
            marker = page.last().map(|entry| entry.name.clone());

            objects.extend(
                page.into_iter()
                    .map(|entry| Object::with_info(self.clone(), entry.into_info())),
            );

            if page_len < LISTING_PAGE_LIMIT {
                break;
            }
        }

        tracing::debug!(container = self.name(), count = objects.len(), "listed objects");
        Ok(objects)
    }

    async fn list_page(&self, marker: Option<&str>) -> Result<Vec<ListingEntry>> {
        let session = self.session();
        let mut request = session
            .prepare(Method::Get, self.name(), Endpoint::Storage)
            .await?
            .query("format", "json")
            .query("limit", &LISTING_PAGE_LIMIT.to_string());
        if let Some(marker) = marker {
            request = request.query("marker", marker);
        }

        let response = session.send(request).await?;
        if response.is_not_found() {
            return Err(Error::NotFound(format!("container {}", self.name())));
        }
        if !response.is_success() {
            return Err(response.into_remote_error().await);
        }

        let body = response.body.bytes().await?;
        if body.is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&body)
            .map_err(|e| Error::Protocol(format!("invalid object listing: {e}")))
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("name", &self.inner.name)
            .field("attrs", &self.inner.attrs.get())
            .finish()
    }
}
