//! cf-swift: Cloud Files client for the cf CLI
//!
//! Authenticates against the identity service, resolves storage and CDN
//! endpoints from the service catalog and exposes containers and objects as
//! lazily probed handles. HTTP goes through the [`cf_core::HttpTransport`]
//! seam; [`ReqwestTransport`] is the production implementation.

pub mod container;
pub mod identity;
pub mod object;
pub mod storage;
pub mod transport;

#[cfg(test)]
mod testing;

pub use container::{Container, LISTING_PAGE_LIMIT};
pub use identity::CredentialResolver;
pub use object::{Object, WriteOptions};
pub use storage::StorageClient;
pub use transport::ReqwestTransport;
