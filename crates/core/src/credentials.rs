//! Regions and API-key credentials
//!
//! Credentials are validated when they are built, so an unknown region code
//! never reaches the identity service.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identity endpoint shared by the US and APAC data centers
pub const US_IDENTITY_URL: &str = "https://identity.api.rackspacecloud.com/v2.0/tokens";

/// Identity endpoint for the London data center
pub const LON_IDENTITY_URL: &str = "https://lon.identity.api.rackspacecloud.com/v2.0/tokens";

/// A Cloud Files data center
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Region {
    Ord,
    Dfw,
    Iad,
    Syd,
    Lon,
}

impl Region {
    /// All supported regions
    pub const ALL: [Region; 5] = [
        Region::Ord,
        Region::Dfw,
        Region::Iad,
        Region::Syd,
        Region::Lon,
    ];

    /// Region code as used in the service catalog
    pub const fn code(self) -> &'static str {
        match self {
            Region::Ord => "ORD",
            Region::Dfw => "DFW",
            Region::Iad => "IAD",
            Region::Syd => "SYD",
            Region::Lon => "LON",
        }
    }

    /// Identity endpoint that authenticates accounts homed in this region
    pub const fn identity_url(self) -> &'static str {
        match self {
            Region::Lon => LON_IDENTITY_URL,
            _ => US_IDENTITY_URL,
        }
    }
}

impl FromStr for Region {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Region::ALL
            .into_iter()
            .find(|r| r.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::Config(format!("invalid Rackspace region: {s}")))
    }
}

impl TryFrom<String> for Region {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Region> for String {
    fn from(region: Region) -> Self {
        region.code().to_string()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Username / API key pair with an optional home region
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    api_key: String,
    region: Option<Region>,
}

impl Credentials {
    /// Build credentials, rejecting empty fields
    pub fn new(
        username: impl Into<String>,
        api_key: impl Into<String>,
        region: Option<Region>,
    ) -> Result<Self> {
        let username = username.into();
        let api_key = api_key.into();

        if username.trim().is_empty() {
            return Err(Error::Config("username cannot be empty".into()));
        }
        if api_key.trim().is_empty() {
            return Err(Error::Config("API key cannot be empty".into()));
        }

        Ok(Self {
            username,
            api_key,
            region,
        })
    }

    /// Build credentials from a textual region code
    pub fn with_region_code(
        username: impl Into<String>,
        api_key: impl Into<String>,
        region: Option<&str>,
    ) -> Result<Self> {
        let region = region.map(str::parse).transpose()?;
        Self::new(username, api_key, region)
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn region(&self) -> Option<Region> {
        self.region
    }

    /// Identity endpoint for these credentials
    ///
    /// Accounts without an explicit region authenticate against the US endpoint,
    /// which reports the account's default region.
    pub fn identity_url(&self) -> &'static str {
        self.region.map_or(US_IDENTITY_URL, Region::identity_url)
    }
}

// The API key never appears in logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("api_key", &"<redacted>")
            .field("region", &self.region)
            .finish()
    }
}
