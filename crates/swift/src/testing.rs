//! In-memory transport double for unit tests
//!
//! Identity requests get a canned token and catalog; everything else goes to
//! the handler supplied by the test. Every request is recorded.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use cf_core::transport::{HttpRequest, HttpResponse, HttpTransport, Method};
use cf_core::{Credentials, Region, Result};

pub(crate) const TOKEN: &str = "token-abc123";
pub(crate) const STORAGE_URL: &str = "https://storage101.ord1.example.com/v1/MossoCloudFS_acct";
pub(crate) const SNET_URL: &str = "https://snet-storage101.ord1.example.com/v1/MossoCloudFS_acct";
pub(crate) const CDN_URL: &str = "https://cdn1.example.com/v1/MossoCloudFS_acct";
pub(crate) const IDENTITY_HOST: &str = "identity.api.rackspacecloud.com";

type Handler = dyn Fn(&HttpRequest, &str) -> HttpResponse + Send + Sync;

pub(crate) struct FakeTransport {
    handler: Box<Handler>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeTransport {
    /// Serve storage requests with `handler`, which receives the request and
    /// its path relative to the account (e.g. `photos/cat.jpg`)
    pub(crate) fn new(
        handler: impl Fn(&HttpRequest, &str) -> HttpResponse + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests to the identity service
    pub(crate) fn identity_calls(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.url.host_str() == Some(IDENTITY_HOST))
            .count()
    }

    /// Storage requests with the given method and account-relative path
    pub(crate) fn calls(&self, method: Method, path: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && relative_path(r) == path)
            .collect()
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());

        if request.url.host_str() == Some(IDENTITY_HOST) {
            return Ok(HttpResponse::new(200).with_body(identity_body().to_string()));
        }

        let path = relative_path(&request);
        Ok((self.handler)(&request, &path))
    }
}

/// Path of a storage request below the account URL
pub(crate) fn relative_path(request: &HttpRequest) -> String {
    let path = request.url.path();
    path.strip_prefix("/v1/MossoCloudFS_acct")
        .unwrap_or(path)
        .trim_start_matches('/')
        .to_string()
}

/// Whether a request went to the CDN endpoint
pub(crate) fn is_cdn(request: &HttpRequest) -> bool {
    request.url.host_str() == Some("cdn1.example.com")
}

pub(crate) fn identity_body() -> serde_json::Value {
    json!({
        "access": {
            "token": {
                "id": TOKEN,
                "expires": "2030-01-01T12:00:00.000-06:00"
            },
            "user": {
                "id": "123",
                "name": "jdoe",
                "RAX-AUTH:defaultRegion": "ORD"
            },
            "serviceCatalog": [
                {
                    "name": "cloudFiles",
                    "type": "object-store",
                    "endpoints": [
                        {
                            "region": "ORD",
                            "tenantId": "MossoCloudFS_acct",
                            "internalURL": SNET_URL,
                            "publicURL": STORAGE_URL
                        },
                        {
                            "region": "DFW",
                            "tenantId": "MossoCloudFS_acct",
                            "internalURL": "https://snet-storage101.dfw1.example.com/v1/MossoCloudFS_acct",
                            "publicURL": "https://storage101.dfw1.example.com/v1/MossoCloudFS_acct"
                        }
                    ]
                },
                {
                    "name": "cloudFilesCDN",
                    "type": "rax:object-cdn",
                    "endpoints": [
                        { "region": "ORD", "tenantId": "MossoCloudFS_acct", "publicURL": CDN_URL }
                    ]
                }
            ]
        }
    })
}

pub(crate) fn credentials() -> Credentials {
    Credentials::new("jdoe", "0123456789abcdef", Some(Region::Ord)).unwrap()
}

pub(crate) fn not_found() -> HttpResponse {
    HttpResponse::new(404).with_body("<html><h1>Not Found</h1></html>")
}
