//! ls command - List containers and objects
//!
//! Lists containers when given a profile only, or objects when given a container.

use clap::Args;
use futures::future::try_join_all;
use serde::Serialize;

use cf_swift::{Container, StorageClient};

use super::{client_for, parse_path};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, format_time, human_size};

/// List containers or objects
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Remote path (profile or profile/container)
    pub path: String,

    /// Show sizes and object counts for containers
    #[arg(short, long)]
    pub long: bool,

    /// Summarize output (show totals)
    #[arg(long)]
    pub summarize: bool,
}

#[derive(Debug, Serialize)]
struct ContainerEntry {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    object_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bytes_used: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cdn_enabled: Option<bool>,
}

#[derive(Debug, Serialize)]
struct ObjectEntry {
    name: String,
    size_bytes: u64,
    size_human: String,
    etag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_modified: Option<jiff::Timestamp>,
}

/// Output structure for ls command (JSON format)
#[derive(Debug, Serialize)]
struct LsOutput<T> {
    items: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<Summary>,
}

#[derive(Debug, Serialize)]
struct Summary {
    total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_size_human: Option<String>,
}

/// Execute the ls command
pub async fn execute(args: LsArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let path = match parse_path(&args.path, &formatter) {
        Ok(p) => p,
        Err(code) => return code,
    };
    if path.object.is_some() {
        formatter.error("ls takes a profile or profile/container, not an object path");
        return ExitCode::UsageError;
    }

    let client = match client_for(&path.profile, &formatter) {
        Ok(c) => c,
        Err(code) => return code,
    };

    match path.container.as_deref() {
        None => list_containers(&client, &args, &formatter).await,
        Some(container) => list_objects(&client, container, &args, &formatter).await,
    }
}

async fn container_entry(
    container: &Container,
    long: bool,
) -> cf_core::Result<Option<ContainerEntry>> {
    let mut entry = ContainerEntry {
        name: container.name().to_string(),
        object_count: None,
        bytes_used: None,
        cdn_enabled: None,
    };
    if !long {
        return Ok(Some(entry));
    }

    // The container may have been deleted since it was listed.
    let Some(info) = container.attributes().await?.info() else {
        return Ok(None);
    };
    entry.object_count = Some(info.object_count);
    entry.bytes_used = Some(info.bytes_used);
    entry.cdn_enabled = Some(info.cdn.is_some());
    Ok(Some(entry))
}

async fn list_containers(client: &StorageClient, args: &LsArgs, formatter: &Formatter) -> ExitCode {
    let containers = match client.list_containers().await {
        Ok(c) => c,
        Err(e) => return formatter.fail("Failed to list containers", &e),
    };

    // Sizes need one HEAD per container; run them concurrently.
    let long = args.long || args.summarize;
    let probed = match try_join_all(containers.iter().map(|c| container_entry(c, long))).await {
        Ok(probed) => probed,
        Err(e) => return formatter.fail("Failed to read container attributes", &e),
    };

    let mut entries = Vec::with_capacity(probed.len());
    for (container, entry) in containers.iter().zip(probed) {
        match entry {
            Some(entry) => entries.push(entry),
            None => formatter.warning(&format!("Container vanished: {}", container.name())),
        }
    }

    let total_size: Option<u64> = long.then(|| entries.iter().filter_map(|e| e.bytes_used).sum());

    if formatter.is_json() {
        formatter.json(&LsOutput {
            summary: args.summarize.then(|| Summary {
                total: entries.len(),
                total_size_bytes: total_size,
                total_size_human: total_size.map(human_size),
            }),
            items: entries,
        });
        return ExitCode::Success;
    }

    for entry in &entries {
        match (entry.object_count, entry.bytes_used) {
            (Some(count), Some(bytes)) if args.long => {
                let cdn = if entry.cdn_enabled == Some(true) { "cdn" } else { "" };
                formatter.println(&format!(
                    "{:>10} {:>8} objects {:<3} {}/",
                    human_size(bytes),
                    count,
                    cdn,
                    entry.name
                ));
            }
            _ => formatter.println(&format!("{}/", entry.name)),
        }
    }

    if args.summarize {
        formatter.println(&format!(
            "\nTotal: {} containers, {}",
            entries.len(),
            human_size(total_size.unwrap_or_default())
        ));
    }

    ExitCode::Success
}

async fn list_objects(
    client: &StorageClient,
    container: &str,
    args: &LsArgs,
    formatter: &Formatter,
) -> ExitCode {
    let container = match client.container(container).await {
        Ok(c) => c,
        Err(e) => return formatter.fail("Cannot list objects", &e),
    };

    let objects = match container.list_objects().await {
        Ok(o) => o,
        Err(e) => return formatter.fail("Failed to list objects", &e),
    };

    let mut entries = Vec::with_capacity(objects.len());
    for object in &objects {
        // Listed objects carry their attributes; no request is made here.
        let attrs = match object.attributes().await {
            Ok(a) => a,
            Err(e) => return formatter.fail("Failed to read object attributes", &e),
        };
        if let Some(info) = attrs.info() {
            entries.push(ObjectEntry {
                name: info.name.clone(),
                size_bytes: info.size_bytes,
                size_human: human_size(info.size_bytes),
                etag: info.etag.clone(),
                content_type: info.content_type.clone(),
                last_modified: info.last_modified,
            });
        }
    }

    let total_size: u64 = entries.iter().map(|e| e.size_bytes).sum();

    if formatter.is_json() {
        formatter.json(&LsOutput {
            summary: args.summarize.then(|| Summary {
                total: entries.len(),
                total_size_bytes: Some(total_size),
                total_size_human: Some(human_size(total_size)),
            }),
            items: entries,
        });
        return ExitCode::Success;
    }

    for entry in &entries {
        formatter.println(&format!(
            "[{}] {:>10} {}",
            format_time(entry.last_modified),
            entry.size_human,
            entry.name
        ));
    }

    if args.summarize {
        formatter.println(&format!(
            "\nTotal: {} objects, {}",
            entries.len(),
            human_size(total_size)
        ));
    }

    ExitCode::Success
}
