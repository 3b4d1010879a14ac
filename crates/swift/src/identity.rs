//! Identity service client
//!
//! Exchanges a username / API key pair for a token and service catalog. The
//! exchange happens at most once per resolver; every later call returns the
//! cached result.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use url::Url;

use cf_core::transport::{HttpRequest, HttpTransport, Method};
use cf_core::{
    Credentials, Error, Memo, ResolvedAuth, Result, ServiceCatalog, StorageEndpoint,
};

const API_KEY_CREDENTIALS: &str = "RAX-KSKEY:apiKeyCredentials";

const STORAGE_SERVICE: &str = "cloudFiles";
const CDN_SERVICE: &str = "cloudFilesCDN";
const OPENCLOUD_SERVERS_SERVICE: &str = "cloudServersOpenStack";
const LEGACY_SERVERS_SERVICE: &str = "cloudServers";

#[derive(Debug, Deserialize)]
struct IdentityResponse {
    access: Access,
}

#[derive(Debug, Deserialize)]
struct Access {
    token: Token,
    #[serde(default)]
    user: Option<User>,
    #[serde(rename = "serviceCatalog", default)]
    service_catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct Token {
    id: String,
    #[serde(default)]
    expires: Option<String>,
}

#[derive(Debug, Deserialize)]
struct User {
    #[serde(rename = "RAX-AUTH:defaultRegion", default)]
    default_region: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    name: String,
    #[serde(default)]
    endpoints: Vec<CatalogEndpoint>,
}

#[derive(Debug, Deserialize)]
struct CatalogEndpoint {
    #[serde(default)]
    region: Option<String>,
    #[serde(rename = "internalURL", default)]
    internal_url: Option<String>,
    #[serde(rename = "publicURL", default)]
    public_url: Option<String>,
}

impl CatalogEndpoint {
    fn region(&self, service: &str) -> Result<String> {
        self.region
            .clone()
            .ok_or_else(|| Error::Protocol(format!("{service} endpoint without a region")))
    }

    fn public_url(&self, service: &str) -> Result<String> {
        self.public_url
            .clone()
            .ok_or_else(|| Error::Protocol(format!("{service} endpoint without a publicURL")))
    }

    fn internal_url(&self, service: &str) -> Result<String> {
        self.internal_url
            .clone()
            .ok_or_else(|| Error::Protocol(format!("{service} endpoint without an internalURL")))
    }
}

/// Fold catalog entries into a [`ServiceCatalog`]
///
/// Entries with the same name write into the same map; a later endpoint for a
/// region replaces an earlier one.
fn build_catalog(entries: &[CatalogEntry]) -> Result<ServiceCatalog> {
    let mut catalog = ServiceCatalog::default();

    for entry in entries {
        let service = entry.name.as_str();
        match service {
            STORAGE_SERVICE => {
                for endpoint in &entry.endpoints {
                    catalog.storage.insert(
                        endpoint.region(service)?,
                        StorageEndpoint {
                            internal: endpoint.internal_url(service)?,
                            public: endpoint.public_url(service)?,
                        },
                    );
                }
            }
            CDN_SERVICE => {
                for endpoint in &entry.endpoints {
                    catalog
                        .cdn
                        .insert(endpoint.region(service)?, endpoint.public_url(service)?);
                }
            }
            OPENCLOUD_SERVERS_SERVICE => {
                for endpoint in &entry.endpoints {
                    catalog
                        .servers
                        .opencloud
                        .insert(endpoint.region(service)?, endpoint.public_url(service)?);
                }
            }
            LEGACY_SERVERS_SERVICE => {
                let first = entry.endpoints.first().ok_or_else(|| {
                    Error::Protocol(format!("{service} entry without endpoints"))
                })?;
                catalog.servers.legacy = Some(first.public_url(service)?);
            }
            _ => {}
        }
    }

    Ok(catalog)
}

/// Turn an identity response body into [`ResolvedAuth`]
fn parse_identity_response(body: &[u8], credentials: &Credentials) -> Result<ResolvedAuth> {
    let response: IdentityResponse = serde_json::from_slice(body)
        .map_err(|e| Error::Protocol(format!("invalid identity response: {e}")))?;
    let access = response.access;

    let region = match credentials.region() {
        Some(region) => region.code().to_string(),
        None => access
            .user
            .and_then(|u| u.default_region)
            .ok_or_else(|| {
                Error::Protocol("identity response has no default region for the account".into())
            })?,
    };

    let expires = access.token.expires.as_deref().and_then(|raw| {
        raw.parse::<jiff::Timestamp>()
            .inspect_err(|e| tracing::warn!(expires = raw, "unparseable token expiry: {e}"))
            .ok()
    });

    Ok(ResolvedAuth {
        token: access.token.id,
        region,
        expires,
        catalog: build_catalog(&access.service_catalog)?,
    })
}

/// Authenticates credentials once and caches the outcome
pub struct CredentialResolver {
    credentials: Credentials,
    identity_url: String,
    transport: Arc<dyn HttpTransport>,
    resolved: Memo<Arc<ResolvedAuth>>,
}

impl CredentialResolver {
    /// Create a resolver that talks to the identity endpoint of the credentials' region
    pub fn new(credentials: Credentials, transport: Arc<dyn HttpTransport>) -> Self {
        let identity_url = credentials.identity_url().to_string();
        Self {
            credentials,
            identity_url,
            transport,
            resolved: Memo::new(),
        }
    }

    /// Use a different identity endpoint
    pub fn with_identity_url(mut self, identity_url: impl Into<String>) -> Self {
        self.identity_url = identity_url.into();
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn identity_url(&self) -> &str {
        &self.identity_url
    }

    /// Already resolved authentication, if any
    pub fn cached(&self) -> Option<Arc<ResolvedAuth>> {
        self.resolved.get().cloned()
    }

    /// Resolve the token and catalog, authenticating on first use
    ///
    /// Failures are not cached; the next call authenticates again.
    pub async fn resolve(&self) -> Result<Arc<ResolvedAuth>> {
        self.resolved
            .get_or_try_init(|| async { self.authenticate().await.map(Arc::new) })
            .await
            .cloned()
    }

    async fn authenticate(&self) -> Result<ResolvedAuth> {
        tracing::debug!(
            username = self.credentials.username(),
            url = %self.identity_url,
            "authenticating"
        );

        let payload = json!({
            "auth": {
                API_KEY_CREDENTIALS: {
                    "username": self.credentials.username(),
                    "apiKey": self.credentials.api_key(),
                }
            }
        });

        let request = HttpRequest::new(Method::Post, Url::parse(&self.identity_url)?)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .body(payload.to_string());

        let response = self.transport.send(request).await?;
        let status = response.status;
        let success = response.is_success();
        let body = response.body.bytes().await?;

        if !success {
            return Err(Error::Auth {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        let auth = parse_identity_response(&body, &self.credentials)?;
        tracing::debug!(
            region = %auth.region,
            storage_regions = auth.catalog.storage.len(),
            "authenticated"
        );
        Ok(auth)
    }
}

impl std::fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialResolver")
            .field("credentials", &self.credentials)
            .field("identity_url", &self.identity_url)
            .field("resolved", &self.resolved.is_ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, CDN_URL, SNET_URL, STORAGE_URL, TOKEN};
    use async_trait::async_trait;
    use cf_core::transport::HttpResponse;
    use cf_core::Region;
    use cf_core::credentials::LON_IDENTITY_URL;
    use mockall::mock;

    mock! {
        pub Transport {}

        #[async_trait]
        impl HttpTransport for Transport {
            async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
        }
    }

    fn identity_ok() -> HttpResponse {
        HttpResponse::new(200).with_body(testing::identity_body().to_string())
    }

    #[tokio::test]
    async fn test_resolve_extracts_token_and_catalog() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|req| {
                req.method == Method::Post
                    && req.url.as_str() == cf_core::credentials::US_IDENTITY_URL
                    && req.header_value("content-type") == Some("application/json")
            })
            .times(1)
            .returning(|_| Ok(identity_ok()));

        let resolver = CredentialResolver::new(testing::credentials(), Arc::new(transport));
        let auth = resolver.resolve().await.unwrap();

        assert_eq!(auth.token, TOKEN);
        assert_eq!(auth.region, "ORD");
        assert!(auth.expires.is_some());
        assert_eq!(auth.catalog.storage["ORD"].public, STORAGE_URL);
        assert_eq!(auth.catalog.storage["ORD"].internal, SNET_URL);
        assert_eq!(auth.catalog.cdn["ORD"], CDN_URL);
        assert_eq!(auth.catalog.storage.len(), 2);
    }

    #[tokio::test]
    async fn test_resolve_authenticates_once() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Ok(identity_ok()));

        let resolver = CredentialResolver::new(testing::credentials(), Arc::new(transport));
        let first = resolver.resolve().await.unwrap();
        let second = resolver.resolve().await.unwrap();
        let third = resolver.resolve().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&second, &third));
        assert!(resolver.cached().is_some());
    }

    #[tokio::test]
    async fn test_concurrent_resolves_share_one_authentication() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::time::Duration;

        struct SlowIdentity {
            calls: AtomicUsize,
        }

        #[async_trait]
        impl HttpTransport for SlowIdentity {
            async fn send(&self, _request: HttpRequest) -> Result<HttpResponse> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(identity_ok())
            }
        }

        let transport = Arc::new(SlowIdentity {
            calls: AtomicUsize::new(0),
        });
        let resolver = CredentialResolver::new(testing::credentials(), transport.clone());

        let (first, second) = tokio::join!(resolver.resolve(), resolver.resolve());

        assert!(Arc::ptr_eq(&first.unwrap(), &second.unwrap()));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_request_body_envelope() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|req| {
                let body: serde_json::Value =
                    serde_json::from_slice(req.body.as_deref().unwrap_or_default()).unwrap();
                body["auth"]["RAX-KSKEY:apiKeyCredentials"]["username"] == "jdoe"
                    && body["auth"]["RAX-KSKEY:apiKeyCredentials"]["apiKey"] == "0123456789abcdef"
            })
            .times(1)
            .returning(|_| Ok(identity_ok()));

        let resolver = CredentialResolver::new(testing::credentials(), Arc::new(transport));
        resolver.resolve().await.unwrap();
    }

    #[tokio::test]
    async fn test_london_uses_its_own_identity_host() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|req| req.url.as_str() == LON_IDENTITY_URL)
            .times(1)
            .returning(|_| Ok(identity_ok()));

        let creds = Credentials::new("jdoe", "key", Some(Region::Lon)).unwrap();
        let resolver = CredentialResolver::new(creds, Arc::new(transport));
        let auth = resolver.resolve().await.unwrap();
        assert_eq!(auth.region, "LON");
    }

    #[tokio::test]
    async fn test_default_region_from_account() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Ok(identity_ok()));

        let creds = Credentials::new("jdoe", "key", None).unwrap();
        let resolver = CredentialResolver::new(creds, Arc::new(transport));
        assert_eq!(resolver.resolve().await.unwrap().region, "ORD");
    }

    #[tokio::test]
    async fn test_rejected_credentials_are_not_cached() {
        let mut transport = MockTransport::new();
        let mut seq = mockall::Sequence::new();
        transport
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(HttpResponse::new(401).with_body("Unable to authenticate user")));
        transport
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(identity_ok()));

        let resolver = CredentialResolver::new(testing::credentials(), Arc::new(transport));

        match resolver.resolve().await.unwrap_err() {
            Error::Auth { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("Unable to authenticate"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(resolver.cached().is_none());

        assert_eq!(resolver.resolve().await.unwrap().token, TOKEN);
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Err(Error::Network("connection reset".into())));

        let resolver = CredentialResolver::new(testing::credentials(), Arc::new(transport));
        assert!(matches!(
            resolver.resolve().await.unwrap_err(),
            Error::Network(_)
        ));
    }

    #[tokio::test]
    async fn test_malformed_response_is_protocol_error() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200).with_body(r#"{"access": {}}"#)));

        let resolver = CredentialResolver::new(testing::credentials(), Arc::new(transport));
        assert!(matches!(
            resolver.resolve().await.unwrap_err(),
            Error::Protocol(_)
        ));
    }

    #[tokio::test]
    async fn test_identity_url_override() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|req| req.url.as_str() == "https://identity.internal/v2.0/tokens")
            .times(1)
            .returning(|_| Ok(identity_ok()));

        let resolver = CredentialResolver::new(testing::credentials(), Arc::new(transport))
            .with_identity_url("https://identity.internal/v2.0/tokens");
        assert_eq!(resolver.identity_url(), "https://identity.internal/v2.0/tokens");
        resolver.resolve().await.unwrap();
    }

    #[test]
    fn test_catalog_last_write_wins_and_servers() {
        let body = json!({
            "access": {
                "token": { "id": "t" },
                "serviceCatalog": [
                    { "name": "cloudFilesCDN", "endpoints": [
                        { "region": "DFW", "publicURL": "https://cdn-old" }
                    ]},
                    { "name": "cloudFilesCDN", "endpoints": [
                        { "region": "DFW", "publicURL": "https://cdn-new" },
                        { "region": "IAD", "publicURL": "https://cdn-iad" }
                    ]},
                    { "name": "cloudServersOpenStack", "endpoints": [
                        { "region": "DFW", "publicURL": "https://dfw.servers" }
                    ]},
                    { "name": "cloudServers", "endpoints": [
                        { "publicURL": "https://legacy-1" },
                        { "publicURL": "https://legacy-2" }
                    ]},
                    { "name": "cloudDNS", "endpoints": [
                        { "publicURL": "https://dns" }
                    ]}
                ]
            }
        });

        let creds = Credentials::new("jdoe", "key", Some(Region::Dfw)).unwrap();
        let auth = parse_identity_response(body.to_string().as_bytes(), &creds).unwrap();

        assert_eq!(auth.token, "t");
        assert_eq!(auth.region, "DFW");
        assert!(auth.expires.is_none());
        assert_eq!(auth.catalog.cdn["DFW"], "https://cdn-new");
        assert_eq!(auth.catalog.cdn["IAD"], "https://cdn-iad");
        assert_eq!(
            auth.catalog.servers.opencloud["DFW"],
            "https://dfw.servers"
        );
        assert_eq!(
            auth.catalog.servers.legacy.as_deref(),
            Some("https://legacy-1")
        );
        assert!(auth.catalog.storage.is_empty());
    }

    #[test]
    fn test_missing_default_region() {
        let body = json!({ "access": { "token": { "id": "t" }, "user": {} } });
        let creds = Credentials::new("jdoe", "key", None).unwrap();
        assert!(matches!(
            parse_identity_response(body.to_string().as_bytes(), &creds),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn test_storage_endpoint_requires_internal_url() {
        let body = json!({
            "access": {
                "token": { "id": "t" },
                "serviceCatalog": [
                    { "name": "cloudFiles", "endpoints": [
                        { "region": "ORD", "publicURL": "https://storage" }
                    ]}
                ]
            }
        });
        let creds = Credentials::new("jdoe", "key", Some(Region::Ord)).unwrap();
        assert!(matches!(
            parse_identity_response(body.to_string().as_bytes(), &creds),
            Err(Error::Protocol(_))
        ));
    }
}
