//! get command - Download an object to a local file

use std::path::PathBuf;

use clap::Args;
use humansize::{DECIMAL, format_size};
use mineral_core::RemotePath;
use serde::Serialize;

use super::Context;
use crate::exit_code::ExitCode;

/// Download an object
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Key of the object to download
    #[arg(short, long)]
    pub key: String,

    /// Local file to write; defaults to the key
    #[arg(short, long)]
    pub filename: Option<PathBuf>,

    #[arg(short, long, env = "AWS_DEFAULT_BUCKET")]
    pub bucket: Option<String>,
}

#[derive(Debug, Serialize)]
struct GetOutput {
    bucket: String,
    key: String,
    filename: String,
    size_bytes: usize,
}

/// Execute the get command
pub async fn execute(args: GetArgs, ctx: &Context) -> ExitCode {
    let formatter = &ctx.formatter;

    let bucket = match ctx.bucket(args.bucket) {
        Ok(bucket) => bucket,
        Err(code) => return code,
    };
    let path = RemotePath::new(&bucket, &args.key);
    let filename = args.filename.unwrap_or_else(|| PathBuf::from(&args.key));

    let data = match ctx.store.get_object(&path).await {
        Ok(data) => data,
        Err(e) => {
            formatter.error(&format!("Failed to download {path}: {e}"));
            return ExitCode::from_error(&e);
        }
    };

    if let Err(e) = tokio::fs::write(&filename, &data).await {
        formatter.error(&format!("Failed to write {}: {e}", filename.display()));
        return ExitCode::GeneralError;
    }

    if formatter.is_json() {
        formatter.json(&GetOutput {
            bucket,
            key: args.key,
            filename: filename.display().to_string(),
            size_bytes: data.len(),
        });
    } else {
        formatter.success(&format!(
            "Downloaded {} ({}) from {}",
            formatter.style_file(&args.key),
            formatter.style_size(&format_size(data.len(), DECIMAL)),
            formatter.style_name(&bucket)
        ));
    }

    ExitCode::Success
}
