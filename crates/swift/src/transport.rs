//! reqwest-backed HTTP transport

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};

use cf_core::transport::{HttpRequest, HttpResponse, HttpTransport, Method, ResponseBody};
use cf_core::{Error, Result, TimeoutConfig};

/// HTTP transport built on a shared reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with the given timeouts
    pub fn new(timeout: &TimeoutConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("cf/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(timeout.connect());

        if let Some(request_timeout) = timeout.request() {
            builder = builder.timeout(request_timeout);
        }

        let client = builder
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Wrap an existing reqwest client
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Head => reqwest::Method::HEAD,
        Method::Put => reqwest::Method::PUT,
        Method::Post => reqwest::Method::POST,
        Method::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = request.method;
        tracing::debug!(%method, url = %request.url, "sending request");

        let mut builder = self
            .client
            .request(to_reqwest_method(method), request.url);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Network(format!("Request failed: {e}")))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        tracing::debug!(%method, status, "received response");

        let body = if method == Method::Head {
            ResponseBody::empty()
        } else {
            ResponseBody::Stream(
                response
                    .bytes_stream()
                    .map_err(|e| Error::Network(format!("Failed to read response: {e}")))
                    .boxed(),
            )
        };

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
