//! rm command - Remove objects
//!
//! Removing an object that does not exist succeeds.

use clap::Args;
use serde::Serialize;

use super::{client_for, parse_path};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Remove objects
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Object path(s) to remove (profile/container/object)
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Only show what would be deleted (dry run)
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
struct RmOutput {
    status: &'static str,
    deleted: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failed: Vec<String>,
    total: usize,
}

/// Execute the rm command
pub async fn execute(args: RmArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let mut deleted = Vec::new();
    let mut failed = Vec::new();
    let mut exit_code = ExitCode::Success;

    for path_str in &args.paths {
        match remove_one(path_str, args.dry_run, &formatter).await {
            Ok(()) => deleted.push(path_str.clone()),
            Err(code) => {
                failed.push(path_str.clone());
                // Bad paths and rejected credentials would fail the rest too.
                if matches!(code, ExitCode::UsageError | ExitCode::AuthError) {
                    return code;
                }
                exit_code = code;
            }
        }
    }

    if formatter.is_json() {
        formatter.json(&RmOutput {
            status: if failed.is_empty() { "success" } else { "partial" },
            total: deleted.len(),
            deleted,
            failed,
        });
    } else if !args.dry_run {
        for path in &deleted {
            formatter.success(&format!("Removed: {path}"));
        }
    }

    exit_code
}

async fn remove_one(path_str: &str, dry_run: bool, formatter: &Formatter) -> Result<(), ExitCode> {
    let path = parse_path(path_str, formatter)?;
    let (container, object) = path
        .require_object()
        .map_err(|e| formatter.fail("Cannot remove", &e))?;

    if dry_run {
        formatter.println(&format!("Would remove: {path}"));
        return Ok(());
    }

    let client = client_for(&path.profile, formatter)?;
    client
        .container_unchecked(container)
        .object(object)
        .delete()
        .await
        .map_err(|e| formatter.fail(&format!("Failed to remove {path}"), &e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::commands::{Cli, Commands};

    #[test]
    fn test_rm_args() {
        let cli = Cli::try_parse_from(["cf", "rm", "prod/c/a.txt", "prod/c/b.txt", "--dry-run"])
            .unwrap();
        let Commands::Rm(args) = cli.command else {
            panic!("expected rm");
        };
        assert_eq!(args.paths.len(), 2);
        assert!(args.dry_run);
    }

    #[test]
    fn test_rm_requires_path() {
        assert!(Cli::try_parse_from(["cf", "rm"]).is_err());
    }

    #[tokio::test]
    async fn test_remove_one_rejects_container_path() {
        let formatter = Formatter::new(OutputConfig {
            quiet: true,
            ..Default::default()
        });
        assert_eq!(
            remove_one("prod/photos", false, &formatter).await.unwrap_err(),
            ExitCode::UsageError
        );
    }

    #[tokio::test]
    async fn test_remove_one_dry_run_makes_no_client() {
        let formatter = Formatter::new(OutputConfig {
            quiet: true,
            ..Default::default()
        });
        assert!(remove_one("prod/photos/cat.jpg", true, &formatter).await.is_ok());
    }
}
