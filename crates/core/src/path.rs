//! Remote path parsing
//!
//! Remote locations are written as `profile[/container[/object]]`. Object
//! names may themselves contain slashes.

use crate::error::{Error, Result};

/// A parsed remote location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePath {
    /// Profile name
    pub profile: String,
    /// Container name, absent when addressing the whole account
    pub container: Option<String>,
    /// Object name, absent when addressing a container
    pub object: Option<String>,
}

impl RemotePath {
    /// Create a path to an object
    pub fn object(
        profile: impl Into<String>,
        container: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            profile: profile.into(),
            container: Some(container.into()),
            object: Some(object.into()),
        }
    }

    /// Container name, or an error naming the expected format
    pub fn require_container(&self) -> Result<&str> {
        self.container.as_deref().ok_or_else(|| {
            Error::InvalidPath(format!(
                "'{self}' has no container. Use format: profile/container"
            ))
        })
    }

    /// Container and object names, or an error naming the expected format
    pub fn require_object(&self) -> Result<(&str, &str)> {
        match (self.container.as_deref(), self.object.as_deref()) {
            (Some(container), Some(object)) => Ok((container, object)),
            _ => Err(Error::InvalidPath(format!(
                "'{self}' has no object. Use format: profile/container/object"
            ))),
        }
    }
}

impl std::fmt::Display for RemotePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.profile)?;
        if let Some(container) = &self.container {
            write!(f, "/{container}")?;
        }
        if let Some(object) = &self.object {
            write!(f, "/{object}")?;
        }
        Ok(())
    }
}

/// Parse `profile[/container[/object]]`
///
/// A trailing slash after the profile or container is ignored; inside an
/// object name it is kept.
pub fn parse_remote_path(path: &str) -> Result<RemotePath> {
    if path.is_empty() {
        return Err(Error::InvalidPath("Path cannot be empty".into()));
    }

    let mut parts = path.splitn(3, '/');
    let profile = parts.next().unwrap_or_default();
    let container = parts.next().filter(|c| !c.is_empty());
    let object = parts.next().filter(|o| !o.is_empty());

    if !is_valid_profile_name(profile) {
        return Err(Error::InvalidPath(format!(
            "Invalid profile name '{profile}'. Use letters, digits, '_' or '-'"
        )));
    }

    if container.is_none() && object.is_some() {
        return Err(Error::InvalidPath("Container name cannot be empty".into()));
    }

    Ok(RemotePath {
        profile: profile.to_string(),
        container: container.map(str::to_string),
        object: object.map(str::to_string),
    })
}

/// Check if a string is a valid profile name
pub fn is_valid_profile_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
