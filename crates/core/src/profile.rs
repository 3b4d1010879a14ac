//! Profile management
//!
//! Profiles are named Cloud Files accounts: credentials plus connection
//! preferences, stored in the configuration file.

use serde::{Deserialize, Serialize};

use crate::config::{ClientConfig, ConfigManager, TimeoutConfig};
use crate::credentials::{Credentials, Region};
use crate::error::{Error, Result};

/// A named Cloud Files account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Unique name for this profile
    pub name: String,

    /// Rackspace username
    pub username: String,

    /// Rackspace API key
    pub api_key: String,

    /// Data center; the account's default region when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,

    /// Use service-net storage URLs
    #[serde(default)]
    pub internal: bool,

    /// Identity endpoint override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_url: Option<String>,

    /// Timeout configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<TimeoutConfig>,
}

impl Profile {
    /// Create a new profile with required fields
    pub fn new(
        name: impl Into<String>,
        username: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            username: username.into(),
            api_key: api_key.into(),
            region: None,
            internal: false,
            identity_url: None,
            timeout: None,
        }
    }

    /// Validated credentials for this profile
    pub fn credentials(&self) -> Result<Credentials> {
        Credentials::new(&self.username, &self.api_key, self.region)
    }

    /// Connection settings for this profile
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            internal: self.internal,
            identity_url: self.identity_url.clone(),
            timeout: self.timeout.clone().unwrap_or_default(),
        }
    }
}

/// Manager for profile operations
pub struct ProfileManager {
    config_manager: ConfigManager,
}

impl ProfileManager {
    /// Create a new ProfileManager with a specific ConfigManager
    pub fn with_config_manager(config_manager: ConfigManager) -> Self {
        Self { config_manager }
    }

    /// Create a new ProfileManager using the default config location
    pub fn new() -> Result<Self> {
        let config_manager = ConfigManager::new()?;
        Ok(Self { config_manager })
    }

    /// List all configured profiles
    pub fn list(&self) -> Result<Vec<Profile>> {
        let config = self.config_manager.load()?;
        Ok(config.profiles)
    }

    /// Get a profile by name
    pub fn get(&self, name: &str) -> Result<Profile> {
        let config = self.config_manager.load()?;
        config
            .profiles
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| Error::ProfileNotFound(name.to_string()))
    }

    /// Add or update a profile
    pub fn set(&self, profile: Profile) -> Result<()> {
        profile.credentials()?;

        let mut config = self.config_manager.load()?;
        config.profiles.retain(|p| p.name != profile.name);
        config.profiles.push(profile);

        self.config_manager.save(&config)
    }

    /// Remove a profile
    pub fn remove(&self, name: &str) -> Result<()> {
        let mut config = self.config_manager.load()?;
        let original_len = config.profiles.len();

        config.profiles.retain(|p| p.name != name);

        if config.profiles.len() == original_len {
            return Err(Error::ProfileNotFound(name.to_string()));
        }

        self.config_manager.save(&config)
    }

    /// Check if a profile exists
    pub fn exists(&self, name: &str) -> Result<bool> {
        let config = self.config_manager.load()?;
        Ok(config.profiles.iter().any(|p| p.name == name))
    }
}
