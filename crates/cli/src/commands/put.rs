//! put command - Upload a local file as an object
//!
//! Optionally schedules server-side deletion of the uploaded object.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use bytes::Bytes;
use clap::Args;
use serde::Serialize;

use cf_swift::WriteOptions;

use super::{client_for, parse_path};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, human_size};

/// Upload a local file
#[derive(Args, Debug)]
pub struct PutArgs {
    /// Local file to upload
    pub source: PathBuf,

    /// Destination path (profile/container/object)
    pub target: String,

    /// Delete the object at this time (RFC 3339, e.g. 2030-01-01T00:00:00Z)
    #[arg(long, conflicts_with = "expire_after")]
    pub expire_at: Option<String>,

    /// Delete the object this many seconds after upload
    #[arg(long)]
    pub expire_after: Option<u64>,

    /// Content type; guessed from the file name when omitted
    #[arg(long)]
    pub content_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct PutOutput {
    status: &'static str,
    source: String,
    target: String,
    size_bytes: u64,
    size_human: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    etag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expire_at: Option<jiff::Timestamp>,
}

/// Execute the put command
pub async fn execute(args: PutArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let path = match parse_path(&args.target, &formatter) {
        Ok(p) => p,
        Err(code) => return code,
    };
    let (container_name, object_name) = match path.require_object() {
        Ok(parts) => parts,
        Err(e) => return formatter.fail("Missing destination", &e),
    };

    let expire_at = match resolve_expiry(&args, jiff::Timestamp::now()) {
        Ok(at) => at,
        Err(e) => {
            formatter.error(&format!("{e:#}"));
            return ExitCode::UsageError;
        }
    };

    let data = match read_source(&args.source).await {
        Ok(d) => d,
        Err(e) => {
            formatter.error(&format!("{e:#}"));
            return ExitCode::GeneralError;
        }
    };

    let client = match client_for(&path.profile, &formatter) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let container = match client.container(container_name).await {
        Ok(c) => c,
        Err(e) => return formatter.fail("Cannot upload", &e),
    };

    let mut options = WriteOptions::default();
    if let Some(at) = expire_at {
        options = options.expire_at(at);
    }
    if let Some(content_type) = content_type_for(&args) {
        options = options.content_type(content_type);
    }

    let size = data.len() as u64;
    let object = container.object(object_name);
    match object.write(data, options).await {
        Ok(etag) => {
            if formatter.is_json() {
                formatter.json(&PutOutput {
                    status: "success",
                    source: args.source.display().to_string(),
                    target: args.target.clone(),
                    size_bytes: size,
                    size_human: human_size(size),
                    etag,
                    expire_at,
                });
            } else {
                formatter.success(&format!(
                    "{} -> {} ({})",
                    args.source.display(),
                    args.target,
                    human_size(size)
                ));
                if let Some(at) = expire_at {
                    formatter.println(&format!("Expires   : {at}"));
                }
            }
            ExitCode::Success
        }
        Err(e) => formatter.fail("Failed to upload object", &e),
    }
}

async fn read_source(path: &Path) -> anyhow::Result<Bytes> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(Bytes::from(data))
}

/// Absolute deletion time from `--expire-at` or `--expire-after`
fn resolve_expiry(args: &PutArgs, now: jiff::Timestamp) -> anyhow::Result<Option<jiff::Timestamp>> {
    match (&args.expire_at, args.expire_after) {
        (Some(_), Some(_)) => bail!("--expire-at and --expire-after are mutually exclusive"),
        (Some(at), None) => {
            let at: jiff::Timestamp = at
                .parse()
                .with_context(|| format!("Invalid --expire-at '{at}', expected RFC 3339"))?;
            if at <= now {
                bail!("--expire-at {at} is in the past");
            }
            Ok(Some(at))
        }
        (None, Some(seconds)) => {
            let span = jiff::SignedDuration::from_secs(
                i64::try_from(seconds).context("--expire-after is too large")?,
            );
            let at = now
                .checked_add(span)
                .context("--expire-after is too large")?;
            Ok(Some(at))
        }
        (None, None) => Ok(None),
    }
}

fn content_type_for(args: &PutArgs) -> Option<String> {
    args.content_type.clone().or_else(|| {
        mime_guess::from_path(&args.source)
            .first()
            .map(|m| m.essence_str().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::commands::{Cli, Commands};

    fn put_args(extra: &[&str]) -> PutArgs {
        let mut argv = vec!["cf", "put", "report.pdf", "prod/docs/report.pdf"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Put(args) => args,
            other => panic!("expected put, got {other:?}"),
        }
    }

    fn now() -> jiff::Timestamp {
        "2026-01-01T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_no_expiry() {
        assert_eq!(resolve_expiry(&put_args(&[]), now()).unwrap(), None);
    }

    #[test]
    fn test_expire_after() {
        let at = resolve_expiry(&put_args(&["--expire-after", "3600"]), now())
            .unwrap()
            .unwrap();
        assert_eq!(at.as_second() - now().as_second(), 3600);
    }

    #[test]
    fn test_expire_at() {
        let at = resolve_expiry(&put_args(&["--expire-at", "2030-01-01T00:00:00Z"]), now())
            .unwrap()
            .unwrap();
        assert_eq!(at.as_second(), 1_893_456_000);
    }

    #[test]
    fn test_expire_at_rejects_past_and_garbage() {
        assert!(resolve_expiry(&put_args(&["--expire-at", "2020-01-01T00:00:00Z"]), now()).is_err());
        assert!(resolve_expiry(&put_args(&["--expire-at", "tomorrow"]), now()).is_err());
    }

    #[test]
    fn test_expiry_flags_conflict() {
        let argv = [
            "cf",
            "put",
            "a.txt",
            "prod/c/a.txt",
            "--expire-at",
            "2030-01-01T00:00:00Z",
            "--expire-after",
            "60",
        ];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_content_type_guess_and_override() {
        assert_eq!(
            content_type_for(&put_args(&[])).as_deref(),
            Some("application/pdf")
        );
        assert_eq!(
            content_type_for(&put_args(&["--content-type", "text/plain"])).as_deref(),
            Some("text/plain")
        );
    }

    #[tokio::test]
    async fn test_read_source() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("hello.txt");
        std::fs::write(&file, b"hello").unwrap();

        assert_eq!(read_source(&file).await.unwrap(), Bytes::from_static(b"hello"));

        let err = read_source(&dir.path().join("missing.txt")).await.unwrap_err();
        assert!(format!("{err:#}").contains("missing.txt"));
    }
}
