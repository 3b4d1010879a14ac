//! stat command - Show container or object attributes
//!
//! For containers this includes the object count and, when the container is
//! CDN-enabled, its public URIs.

use clap::Args;
use serde::Serialize;

use cf_core::{CdnUris, ContainerInfo, ObjectInfo};

use super::{client_for, parse_path};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, human_size};

/// Show container or object attributes
#[derive(Args, Debug)]
pub struct StatArgs {
    /// Remote path (profile/container or profile/container/object)
    pub path: String,
}

#[derive(Debug, Serialize)]
struct ContainerStat<'a> {
    name: &'a str,
    object_count: u64,
    bytes_used: u64,
    size_human: String,
    cdn_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    cdn: Option<&'a CdnUris>,
}

#[derive(Debug, Serialize)]
struct ObjectStat<'a> {
    container: &'a str,
    name: &'a str,
    size_bytes: u64,
    size_human: String,
    etag: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_modified: Option<jiff::Timestamp>,
}

/// Execute the stat command
pub async fn execute(args: StatArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let path = match parse_path(&args.path, &formatter) {
        Ok(p) => p,
        Err(code) => return code,
    };
    let container_name = match path.require_container() {
        Ok(c) => c,
        Err(e) => return formatter.fail("Nothing to stat", &e),
    };

    let client = match client_for(&path.profile, &formatter) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let container = match client.container(container_name).await {
        Ok(c) => c,
        Err(e) => return formatter.fail("Cannot stat container", &e),
    };

    let Some(object_name) = path.object.as_deref() else {
        return match container.attributes().await {
            Ok(attrs) => match attrs.info() {
                Some(info) => {
                    print_container(container.name(), info, &formatter);
                    ExitCode::Success
                }
                None => {
                    formatter.error(&format!("Container not found: {}", container.name()));
                    ExitCode::NotFound
                }
            },
            Err(e) => formatter.fail("Failed to read container attributes", &e),
        };
    };

    let object = container.object(object_name);
    match object.attributes().await {
        Ok(attrs) => match attrs.info() {
            Some(info) => {
                print_object(container.name(), info, &formatter);
                ExitCode::Success
            }
            None => {
                formatter.error(&format!("Object not found: {}", args.path));
                ExitCode::NotFound
            }
        },
        Err(e) => formatter.fail("Failed to read object attributes", &e),
    }
}

fn print_container(name: &str, info: &ContainerInfo, formatter: &Formatter) {
    if formatter.is_json() {
        formatter.json(&ContainerStat {
            name,
            object_count: info.object_count,
            bytes_used: info.bytes_used,
            size_human: human_size(info.bytes_used),
            cdn_enabled: info.cdn.is_some(),
            cdn: info.cdn.as_ref(),
        });
        return;
    }

    formatter.println(&format!("Container : {name}"));
    formatter.println(&format!("Objects   : {}", info.object_count));
    formatter.println(&format!(
        "Size      : {} ({} bytes)",
        human_size(info.bytes_used),
        info.bytes_used
    ));
    match &info.cdn {
        Some(cdn) => {
            formatter.println("CDN       : enabled");
            formatter.println(&format!("CDN URI   : {}", cdn.uri));
            formatter.println(&format!("SSL URI   : {}", cdn.ssl_uri));
            formatter.println(&format!("Stream URI: {}", cdn.streaming_uri));
        }
        None => formatter.println("CDN       : disabled"),
    }
}

fn print_object(container: &str, info: &ObjectInfo, formatter: &Formatter) {
    if formatter.is_json() {
        formatter.json(&ObjectStat {
            container,
            name: &info.name,
            size_bytes: info.size_bytes,
            size_human: human_size(info.size_bytes),
            etag: &info.etag,
            content_type: info.content_type.as_deref(),
            last_modified: info.last_modified,
        });
        return;
    }

    formatter.println(&format!("Name      : {container}/{}", info.name));
    if let Some(modified) = info.last_modified {
        formatter.println(&format!(
            "Date      : {}",
            modified.strftime("%Y-%m-%d %H:%M:%S UTC")
        ));
    }
    formatter.println(&format!(
        "Size      : {} ({} bytes)",
        human_size(info.size_bytes),
        info.size_bytes
    ));
    formatter.println(&format!("ETag      : {}", info.etag));
    if let Some(ct) = &info.content_type {
        formatter.println(&format!("Type      : {ct}"));
    }
}
