//! HTTP transport seam
//!
//! The client only needs a handful of verbs, a header map and a body. This
//! trait keeps it independent of any particular HTTP library, so it can be
//! driven by reqwest in production and by doubles in tests.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use url::Url;

use crate::error::{Error, Result};

/// Header carrying the identity token on every storage call
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Header scheduling server-side deletion of an object
pub const DELETE_AT_HEADER: &str = "X-Delete-At";

/// Stream of body chunks
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// HTTP methods used by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Put,
    Post,
    Delete,
}

impl Method {
    pub const fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully built request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Bytes>,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// Add a header, builder style
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the body, builder style
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Append a query parameter
    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.url.query_pairs_mut().append_pair(name, value);
        self
    }

    /// Look up a header by case-insensitive name
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Response body, either fully buffered or still streaming
pub enum ResponseBody {
    Full(Bytes),
    Stream(ByteStream),
}

impl ResponseBody {
    pub fn empty() -> Self {
        ResponseBody::Full(Bytes::new())
    }

    /// Read the whole body into memory
    pub async fn bytes(self) -> Result<Bytes> {
        match self {
            ResponseBody::Full(bytes) => Ok(bytes),
            ResponseBody::Stream(stream) => {
                let chunks: Vec<Bytes> = stream.try_collect().await?;
                Ok(Bytes::from(chunks.concat()))
            }
        }
    }

    /// Turn the body into a chunk stream
    pub fn into_stream(self) -> ByteStream {
        match self {
            ResponseBody::Full(bytes) if bytes.is_empty() => stream::empty().boxed(),
            ResponseBody::Full(bytes) => stream::once(async move { Ok(bytes) }).boxed(),
            ResponseBody::Stream(stream) => stream,
        }
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Full(bytes) => write!(f, "Full({} bytes)", bytes.len()),
            ResponseBody::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// A received response; header names are lower-cased
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: ResponseBody,
}

impl HttpResponse {
    /// Buffered response, mostly useful for tests
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: ResponseBody::empty(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = ResponseBody::Full(body.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Header that the protocol guarantees on this response
    pub fn required_header(&self, name: &str) -> Result<&str> {
        self.header(name)
            .ok_or_else(|| Error::Protocol(format!("response is missing the {name} header")))
    }

    /// Parse a numeric header
    pub fn header_u64(&self, name: &str) -> Result<Option<u64>> {
        self.header(name)
            .map(|v| {
                v.trim().parse::<u64>().map_err(|_| {
                    Error::Protocol(format!("header {name} is not a number: {v}"))
                })
            })
            .transpose()
    }

    /// Read the body as UTF-8 text, lossy
    pub async fn text(self) -> Result<String> {
        let bytes = self.body.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Convert a non-success response into [`Error::Remote`]
    pub async fn into_remote_error(self) -> Error {
        let status = self.status;
        let body = self
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        Error::Remote { status, body }
    }
}

/// Anything that can execute an [`HttpRequest`]
///
/// Implementations report connection-level failures as [`Error::Network`] and
/// return every HTTP status, including errors, as a response.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}
