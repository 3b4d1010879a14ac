//! Object handles

use std::sync::Arc;

use bytes::Bytes;

use cf_core::attrs::unquote_etag;
use cf_core::transport::{ByteStream, DELETE_AT_HEADER, HttpRequest, HttpResponse, Method};
use cf_core::{Endpoint, Error, Memo, ObjectAttrs, ObjectInfo, Result};

use crate::container::Container;

/// Options for [`Object::write`]
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Have the server delete the object at this time
    pub expire_at: Option<jiff::Timestamp>,

    /// Content type; the server guesses from the name when absent
    pub content_type: Option<String>,
}

impl WriteOptions {
    pub fn expire_at(mut self, at: jiff::Timestamp) -> Self {
        self.expire_at = Some(at);
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

struct ObjectInner {
    name: String,
    container: Container,
    attrs: Memo<ObjectAttrs>,
}

/// A named object within a container
///
/// Cloning is cheap and clones share the cached attributes.
#[derive(Clone)]
pub struct Object {
    inner: Arc<ObjectInner>,
}

impl Object {
    pub(crate) fn new(container: Container, name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ObjectInner {
                name: name.into(),
                container,
                attrs: Memo::new(),
            }),
        }
    }

    /// Object whose attributes are already known, e.g. from a listing
    pub(crate) fn with_info(container: Container, info: ObjectInfo) -> Self {
        Self {
            inner: Arc::new(ObjectInner {
                name: info.name.clone(),
                container,
                attrs: Memo::ready(ObjectAttrs::Present(info)),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn container(&self) -> &Container {
        &self.inner.container
    }

    /// Path below the account, `container/object`
    pub fn path(&self) -> String {
        format!("{}/{}", self.container().name(), self.name())
    }

    async fn request(&self, method: Method) -> Result<HttpRequest> {
        self.container()
            .session()
            .prepare(method, &self.path(), Endpoint::Storage)
            .await
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.container().session().send(request).await
    }

    /// Existence, size and hash, fetched once per handle
    pub async fn attributes(&self) -> Result<&ObjectAttrs> {
        self.inner
            .attrs
            .get_or_try_init(|| self.fetch_attributes())
            .await
    }

    pub async fn exists(&self) -> Result<bool> {
        Ok(self.attributes().await?.exists())
    }

    async fn fetch_attributes(&self) -> Result<ObjectAttrs> {
        let response = self.send(self.request(Method::Head).await?).await?;

        if response.is_not_found() {
            return Ok(ObjectAttrs::Missing);
        }
        if !response.is_success() {
            return Err(response.into_remote_error().await);
        }

        let size_bytes = response.header_u64("content-length")?.ok_or_else(|| {
            Error::Protocol("response is missing the content-length header".into())
        })?;
        let etag = unquote_etag(response.required_header("etag")?).to_string();
        let content_type = response.header("content-type").map(str::to_string);
        let last_modified = response
            .header("last-modified")
            .and_then(|v| jiff::fmt::rfc2822::parse(v).ok())
            .map(|zoned| zoned.timestamp());

        Ok(ObjectAttrs::Present(ObjectInfo {
            name: self.name().to_string(),
            size_bytes,
            etag,
            content_type,
            last_modified,
        }))
    }

    /// Fetch the content as a stream of chunks
    pub async fn read(&self) -> Result<ByteStream> {
        let response = self.send(self.request(Method::Get).await?).await?;

        if response.is_not_found() {
            return Err(Error::NotFound(format!("object {}", self.path())));
        }
        if !response.is_success() {
            return Err(response.into_remote_error().await);
        }

        Ok(response.body.into_stream())
    }

    /// Fetch the whole content into memory
    pub async fn read_all(&self) -> Result<Bytes> {
        let response = self.send(self.request(Method::Get).await?).await?;

        if response.is_not_found() {
            return Err(Error::NotFound(format!("object {}", self.path())));
        }
        if !response.is_success() {
            return Err(response.into_remote_error().await);
        }

        response.body.bytes().await
    }

    /// Upload `data`, replacing any existing content
    ///
    /// Returns the etag reported by the server. Attributes already cached on
    /// this handle are not updated.
    pub async fn write(
        &self,
        data: impl Into<Bytes>,
        options: WriteOptions,
    ) -> Result<Option<String>> {
        let data = data.into();
        let mut request = self.request(Method::Put).await?;

        if let Some(at) = options.expire_at {
            request = request.header(DELETE_AT_HEADER, at.as_second().to_string());
        }
        if let Some(content_type) = options.content_type {
            request = request.header("Content-Type", content_type);
        }

        tracing::debug!(object = %self.path(), size = data.len(), "uploading object");
        let response = self.send(request.body(data)).await?;

        if !response.is_success() {
            return Err(response.into_remote_error().await);
        }

        Ok(response.header("etag").map(|e| unquote_etag(e).to_string()))
    }

    /// Delete the object; deleting an absent object succeeds
    pub async fn delete(&self) -> Result<()> {
        let response = self.send(self.request(Method::Delete).await?).await?;

        if response.is_not_found() {
            tracing::debug!(object = %self.path(), "object already absent");
            return Ok(());
        }
        if !response.is_success() {
            return Err(response.into_remote_error().await);
        }

        Ok(())
    }
}

impl std::fmt::Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Object")
            .field("container", &self.container().name())
            .field("name", &self.inner.name)
            .field("attrs", &self.inner.attrs.get())
            .finish()
    }
}
