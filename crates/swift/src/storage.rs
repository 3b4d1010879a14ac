//! Storage client
//!
//! The root of the resource tree. A client owns the credential resolver and
//! hands out container handles; containers and objects share the client's
//! session, so the whole tree authenticates at most once.

use std::sync::Arc;

use url::Url;

use cf_core::transport::{AUTH_TOKEN_HEADER, HttpRequest, HttpResponse, HttpTransport, Method};
use cf_core::{
    ClientConfig, Credentials, Endpoint, Error, MemoMap, Profile, ResolvedAuth, Result,
};

use crate::container::Container;
use crate::identity::CredentialResolver;
use crate::transport::ReqwestTransport;

/// State shared by a client and every handle derived from it
pub(crate) struct Session {
    resolver: CredentialResolver,
    transport: Arc<dyn HttpTransport>,
    internal: bool,
}

impl Session {
    pub(crate) async fn auth(&self) -> Result<Arc<ResolvedAuth>> {
        self.resolver.resolve().await
    }

    /// Build an authenticated request for `path` below the account URL
    pub(crate) async fn prepare(
        &self,
        method: Method,
        path: &str,
        endpoint: Endpoint,
    ) -> Result<HttpRequest> {
        reject_dot_segments(path)?;
        let auth = self.auth().await?;
        let url = join_url(auth.base_url(endpoint, self.internal)?, path)?;
        Ok(HttpRequest::new(method, url).header(AUTH_TOKEN_HEADER, auth.token.as_str()))
    }

    pub(crate) async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.transport.send(request).await
    }

    /// Whether the catalog lists a CDN endpoint for the effective region
    pub(crate) async fn has_cdn(&self) -> Result<bool> {
        let auth = self.auth().await?;
        Ok(auth.catalog.cdn.contains_key(&auth.region))
    }
}

/// Refuse paths with `.` or `..` segments
///
/// URL normalization would resolve them against the account URL, so the
/// request would address a different resource. `%2e` counts as a dot.
fn reject_dot_segments(path: &str) -> Result<()> {
    let is_dot = |segment: &str| {
        matches!(
            segment.to_ascii_lowercase().replace("%2e", ".").as_str(),
            "." | ".."
        )
    };
    if path.split('/').any(is_dot) {
        return Err(Error::InvalidPath(format!(
            "'{path}' contains a '.' or '..' segment"
        )));
    }
    Ok(())
}

/// Append the slash-separated `path` to `base`, percent-encoding each segment
fn join_url(base: &str, path: &str) -> Result<Url> {
    reject_dot_segments(path)?;
    let mut url = Url::parse(base)?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| Error::Protocol(format!("endpoint URL cannot take a path: {base}")))?;
        segments.pop_if_empty();
        if !path.is_empty() {
            segments.extend(path.split('/'));
        }
    }
    Ok(url)
}

/// Client for one Cloud Files account
#[derive(Clone)]
pub struct StorageClient {
    session: Arc<Session>,
    containers: Arc<MemoMap<String, Container>>,
}

impl StorageClient {
    /// Create a client on top of an existing transport, using public URLs
    pub fn new(credentials: Credentials, transport: Arc<dyn HttpTransport>) -> Self {
        Self::with_transport(credentials, &ClientConfig::default(), transport)
    }

    /// Create a client with a reqwest transport configured from `config`
    pub fn with_config(credentials: Credentials, config: &ClientConfig) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(&config.timeout)?);
        Ok(Self::with_transport(credentials, config, transport))
    }

    /// Create a client from explicit settings and transport
    pub fn with_transport(
        credentials: Credentials,
        config: &ClientConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let mut resolver = CredentialResolver::new(credentials, transport.clone());
        if let Some(identity_url) = &config.identity_url {
            resolver = resolver.with_identity_url(identity_url.as_str());
        }

        Self {
            session: Arc::new(Session {
                resolver,
                transport,
                internal: config.internal,
            }),
            containers: Arc::new(MemoMap::new()),
        }
    }

    /// Create a client for a configured profile
    pub fn from_profile(profile: &Profile) -> Result<Self> {
        Self::with_config(profile.credentials()?, &profile.client_config())
    }

    /// Whether requests go to service-net URLs
    pub fn is_internal(&self) -> bool {
        self.session.internal
    }

    /// Token, region and catalog, authenticating on first use
    pub async fn auth(&self) -> Result<Arc<ResolvedAuth>> {
        self.session.auth().await
    }

    /// Build an authenticated request for `path` below the storage or CDN endpoint
    ///
    /// The first call authenticates. `path` is split on `/` and each segment is
    /// percent-encoded; an empty path addresses the account itself.
    pub async fn prepare_request(
        &self,
        method: Method,
        path: &str,
        endpoint: Endpoint,
    ) -> Result<HttpRequest> {
        self.session.prepare(method, path, endpoint).await
    }

    /// Look up a container, failing with [`Error::NotFound`] if it does not exist
    ///
    /// The existence check runs on every call until it succeeds; afterwards
    /// the same handle is returned for the same name.
    pub async fn container(&self, name: &str) -> Result<Container> {
        validate_container_name(name)?;

        self.containers
            .get_or_try_init(name.to_string(), || async {
                let container = Container::new(self.session.clone(), name);
                if container.exists().await? {
                    Ok(container)
                } else {
                    Err(Error::NotFound(format!("container {name}")))
                }
            })
            .await
    }

    /// Create a container handle without checking that it exists
    pub fn container_unchecked(&self, name: &str) -> Container {
        Container::new(self.session.clone(), name)
    }

    /// List the account's containers
    ///
    /// Handles are returned unprobed; their attributes load on first use.
    pub async fn list_containers(&self) -> Result<Vec<Container>> {
        let request = self.prepare_request(Method::Get, "", Endpoint::Storage).await?;
        let response = self.session.send(request).await?;

        if !response.is_success() {
            return Err(response.into_remote_error().await);
        }

        let body = response.text().await?;
        let containers: Vec<Container> = body
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|name| self.container_unchecked(name))
            .collect();

        tracing::debug!(count = containers.len(), "listed containers");
        Ok(containers)
    }
}

fn validate_container_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') {
        return Err(Error::InvalidPath(format!("invalid container name: '{name}'")));
    }
    Ok(())
}

impl std::fmt::Debug for StorageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageClient")
            .field("resolver", &self.session.resolver)
            .field("internal", &self.session.internal)
            .field("containers", &self.containers.len())
            .finish()
    }
}
