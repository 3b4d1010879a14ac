//! cf-core: Core library for the Cloud Files client
//!
//! This crate provides the pieces shared by the storage adapter and the CLI:
//! - Regions, credentials and resolved authentication state
//! - Container and object attribute records
//! - Compute-once caches for lazily fetched remote state
//! - The HttpTransport trait the storage client is written against
//! - Configuration and profile management
//! - Remote path parsing
//!
//! Nothing here talks to the network.

pub mod attrs;
pub mod auth;
pub mod config;
pub mod credentials;
pub mod error;
pub mod memo;
pub mod path;
pub mod profile;
pub mod transport;

pub use attrs::{CdnUris, ContainerAttrs, ContainerInfo, ObjectAttrs, ObjectInfo};
pub use auth::{Endpoint, ResolvedAuth, ServersCatalog, ServiceCatalog, StorageEndpoint};
pub use config::{ClientConfig, Config, ConfigManager, TimeoutConfig};
pub use credentials::{Credentials, Region};
pub use error::{Error, Result};
pub use memo::{Memo, MemoMap};
pub use path::{RemotePath, parse_remote_path};
pub use profile::{Profile, ProfileManager};
pub use transport::{ByteStream, HttpRequest, HttpResponse, HttpTransport, Method, ResponseBody};
