//! Profile management commands
//!
//! Profiles are named Cloud Files accounts: username, API key and
//! connection preferences.

use clap::Subcommand;
use serde::Serialize;

use cf_core::{Profile, ProfileManager, Region};

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Profile subcommands for managing accounts
#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// Add or update a profile
    Set(SetArgs),

    /// List all configured profiles
    List(ListArgs),

    /// Remove a profile
    Remove(RemoveArgs),
}

/// Arguments for the `profile set` command
#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Profile name (e.g., "prod", "backup")
    pub name: String,

    /// Rackspace username
    pub username: String,

    /// Rackspace API key
    pub api_key: String,

    /// Data center (ORD, DFW, IAD, SYD, LON); the account default when omitted
    #[arg(long)]
    pub region: Option<String>,

    /// Use service-net storage URLs (only reachable from inside the data center)
    #[arg(long, default_value = "false")]
    pub internal: bool,

    /// Override the identity endpoint
    #[arg(long)]
    pub identity_url: Option<String>,
}

/// Arguments for the `profile list` command
#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Show full details including region and identity endpoint
    #[arg(short, long)]
    pub long: bool,
}

/// Arguments for the `profile remove` command
#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    /// Name of the profile to remove
    pub name: String,
}

#[derive(Serialize)]
struct ProfileListOutput {
    profiles: Vec<ProfileInfo>,
}

/// Profile information for output (without the API key)
#[derive(Serialize)]
struct ProfileInfo {
    name: String,
    username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<Region>,
    internal: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    identity_url: Option<String>,
}

impl From<&Profile> for ProfileInfo {
    fn from(profile: &Profile) -> Self {
        Self {
            name: profile.name.clone(),
            username: profile.username.clone(),
            region: profile.region,
            internal: profile.internal,
            identity_url: profile.identity_url.clone(),
        }
    }
}

#[derive(Serialize)]
struct ProfileOperationOutput {
    success: bool,
    profile: String,
    message: String,
}

/// Execute a profile subcommand
pub async fn execute(cmd: ProfileCommands, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let manager = match ProfileManager::new() {
        Ok(m) => m,
        Err(e) => return formatter.fail("Failed to load profiles", &e),
    };

    match cmd {
        ProfileCommands::Set(args) => execute_set(args, &manager, &formatter),
        ProfileCommands::List(args) => execute_list(args, &manager, &formatter),
        ProfileCommands::Remove(args) => execute_remove(args, &manager, &formatter),
    }
}

fn build_profile(args: SetArgs) -> cf_core::Result<Profile> {
    if !cf_core::path::is_valid_profile_name(&args.name) {
        return Err(cf_core::Error::Config(format!(
            "Invalid profile name '{}'. Use letters, digits, '_' or '-'",
            args.name
        )));
    }

    let mut profile = Profile::new(args.name, args.username, args.api_key);
    profile.region = args.region.as_deref().map(str::parse::<Region>).transpose()?;
    profile.internal = args.internal;
    profile.identity_url = args.identity_url;

    if let Some(url) = &profile.identity_url {
        url::Url::parse(url)?;
    }

    Ok(profile)
}

fn execute_set(args: SetArgs, manager: &ProfileManager, formatter: &Formatter) -> ExitCode {
    let profile = match build_profile(args) {
        Ok(p) => p,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::UsageError;
        }
    };
    let name = profile.name.clone();

    match manager.set(profile) {
        Ok(()) => {
            if formatter.is_json() {
                formatter.json(&ProfileOperationOutput {
                    success: true,
                    profile: name.clone(),
                    message: format!("Profile '{name}' configured successfully"),
                });
            } else {
                formatter.success(&format!("Profile '{name}' configured successfully."));
            }
            ExitCode::Success
        }
        Err(e) => formatter.fail("Failed to save profile", &e),
    }
}

fn execute_list(args: ListArgs, manager: &ProfileManager, formatter: &Formatter) -> ExitCode {
    let profiles = match manager.list() {
        Ok(p) => p,
        Err(e) => return formatter.fail("Failed to load profiles", &e),
    };

    if formatter.is_json() {
        formatter.json(&ProfileListOutput {
            profiles: profiles.iter().map(ProfileInfo::from).collect(),
        });
    } else if profiles.is_empty() {
        formatter.println("No profiles configured.");
    } else {
        for profile in &profiles {
            if args.long {
                let region = profile.region.map_or("default", Region::code);
                formatter.println(&format!(
                    "{:<12} {} (region: {region}, internal: {}, identity: {})",
                    profile.name,
                    profile.username,
                    profile.internal,
                    identity_url(profile)
                ));
            } else {
                formatter.println(&format!("{:<12} {}", profile.name, profile.username));
            }
        }
    }

    ExitCode::Success
}

fn execute_remove(args: RemoveArgs, manager: &ProfileManager, formatter: &Formatter) -> ExitCode {
    match manager.remove(&args.name) {
        Ok(()) => {
            if formatter.is_json() {
                formatter.json(&ProfileOperationOutput {
                    success: true,
                    profile: args.name.clone(),
                    message: format!("Profile '{}' removed successfully", args.name),
                });
            } else {
                formatter.success(&format!("Profile '{}' removed successfully.", args.name));
            }
            ExitCode::Success
        }
        Err(e) => formatter.fail("Failed to remove profile", &e),
    }
}

/// Identity endpoint a profile authenticates against
fn identity_url(profile: &Profile) -> &str {
    match (&profile.identity_url, profile.region) {
        (Some(url), _) => url.as_str(),
        (None, Some(region)) => region.identity_url(),
        (None, None) => cf_core::credentials::US_IDENTITY_URL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_args(name: &str, region: Option<&str>) -> SetArgs {
        SetArgs {
            name: name.to_string(),
            username: "jdoe".to_string(),
            api_key: "0123456789abcdef".to_string(),
            region: region.map(str::to_string),
            internal: false,
            identity_url: None,
        }
    }

    #[test]
    fn test_build_profile() {
        let profile = build_profile(set_args("prod", Some("lon"))).unwrap();
        assert_eq!(profile.name, "prod");
        assert_eq!(profile.region, Some(Region::Lon));
        assert!(!profile.internal);
    }

    #[test]
    fn test_build_profile_without_region() {
        let profile = build_profile(set_args("prod", None)).unwrap();
        assert!(profile.region.is_none());
        assert_eq!(identity_url(&profile), cf_core::credentials::US_IDENTITY_URL);

        let lon = build_profile(set_args("uk", Some("LON"))).unwrap();
        assert_eq!(identity_url(&lon), cf_core::credentials::LON_IDENTITY_URL);
    }

    #[test]
    fn test_build_profile_rejects_bad_input() {
        assert!(build_profile(set_args("prod", Some("XYZ"))).is_err());
        assert!(build_profile(set_args("my/prod", None)).is_err());

        let mut args = set_args("prod", None);
        args.identity_url = Some("not a url".to_string());
        assert!(build_profile(args).is_err());
    }

    #[test]
    fn test_profile_info_hides_api_key() {
        let profile = build_profile(set_args("prod", Some("ORD"))).unwrap();
        let json = serde_json::to_string(&ProfileInfo::from(&profile)).unwrap();
        assert!(json.contains("\"region\":\"ORD\""));
        assert!(!json.contains("0123456789abcdef"));
    }
}
