//! cat command - Display object contents
//!
//! Streams the object to stdout chunk by chunk.

use clap::Args;
use futures::TryStreamExt;
use tokio::io::AsyncWriteExt;

use super::{client_for, parse_path};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Display object contents
#[derive(Args, Debug)]
pub struct CatArgs {
    /// Object path (profile/container/object)
    pub path: String,
}

/// Execute the cat command
pub async fn execute(args: CatArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let path = match parse_path(&args.path, &formatter) {
        Ok(p) => p,
        Err(code) => return code,
    };
    let (container_name, object_name) = match path.require_object() {
        Ok(parts) => parts,
        Err(e) => return formatter.fail("Nothing to read", &e),
    };

    let client = match client_for(&path.profile, &formatter) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let object = client.container_unchecked(container_name).object(object_name);
    let mut stream = match object.read().await {
        Ok(s) => s,
        Err(e) => return formatter.fail("Failed to read object", &e),
    };

    // Write raw bytes, bypassing the formatter so binary content survives.
    let mut stdout = tokio::io::stdout();
    loop {
        match stream.try_next().await {
            Ok(Some(chunk)) => {
                if let Err(e) = stdout.write_all(&chunk).await {
                    formatter.error(&format!("Failed to write to stdout: {e}"));
                    return ExitCode::GeneralError;
                }
            }
            Ok(None) => break,
            Err(e) => return formatter.fail("Failed while reading object", &e),
        }
    }

    if let Err(e) = stdout.flush().await {
        formatter.error(&format!("Failed to write to stdout: {e}"));
        return ExitCode::GeneralError;
    }

    ExitCode::Success
}
