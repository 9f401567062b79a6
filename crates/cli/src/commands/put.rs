//! put command - Upload a single file
//!
//! Files above the multipart threshold are uploaded in parts with a live
//! progress line. Ctrl-C aborts the multipart session before exiting.

use clap::Args;
use humansize::{DECIMAL, format_size};
use mineral_core::{
    PathKind, RemotePath, TransferConfig, TransferManager, UploadKind, UploadOutcome,
    resolve_local_path,
};
use serde::Serialize;

use super::{Context, ctrl_c};
use crate::exit_code::ExitCode;
use crate::output::ProgressLine;

/// Upload a file
#[derive(Args, Debug)]
pub struct PutArgs {
    /// Local file to upload
    #[arg(short, long)]
    pub file: String,

    /// Object key; a random UUID when omitted
    #[arg(short, long)]
    pub key: Option<String>,

    #[arg(short, long, env = "AWS_DEFAULT_BUCKET")]
    pub bucket: Option<String>,

    /// Size of each part in bytes for multipart uploads
    #[arg(long)]
    pub part_size: Option<u64>,

    /// Number of parts uploaded at once
    #[arg(long)]
    pub concurrency: Option<usize>,
}

#[derive(Debug, Serialize)]
struct PutOutput {
    bucket: String,
    key: String,
    size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    upload_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parts: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    etag: Option<String>,
}

impl From<UploadOutcome> for PutOutput {
    fn from(outcome: UploadOutcome) -> Self {
        let (upload_id, parts, etag) = match outcome.kind {
            UploadKind::Single { etag } => (None, None, etag),
            UploadKind::Multipart { upload_id, parts } => (Some(upload_id), Some(parts), None),
        };
        Self {
            bucket: outcome.target.bucket,
            key: outcome.target.key,
            size_bytes: outcome.bytes,
            upload_id,
            parts,
            etag,
        }
    }
}

/// Execute the put command
pub async fn execute(args: PutArgs, ctx: &Context) -> ExitCode {
    let formatter = &ctx.formatter;

    let bucket = match ctx.bucket(args.bucket.clone()) {
        Ok(bucket) => bucket,
        Err(code) => return code,
    };

    let transfer = match transfer_config(&ctx.config.transfer, &args) {
        Ok(transfer) => transfer,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::from_error(&e);
        }
    };

    let file = match resolve_local_path(&args.file, PathKind::File) {
        Ok(file) => file,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::from_error(&e);
        }
    };

    let key = args
        .key
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let target = RemotePath::new(bucket, key);

    let progress = ProgressLine::new(formatter.progress_enabled());
    let manager = TransferManager::new(ctx.store.clone(), transfer).with_progress(progress.callback());

    tracing::debug!(file = %file.display(), target = %target, "Starting upload");

    match manager.upload_file_until(&target, &file, ctrl_c()).await {
        Ok(outcome) => {
            progress.finish();
            if formatter.is_json() {
                formatter.json(&PutOutput::from(outcome));
            } else {
                let detail = match &outcome.kind {
                    UploadKind::Multipart { parts, .. } => format!(", {parts} parts"),
                    UploadKind::Single { .. } => String::new(),
                };
                formatter.success(&format!(
                    "Uploaded {} to {} ({}{detail})",
                    file.display(),
                    formatter.style_name(&outcome.target.to_string()),
                    formatter.style_size(&format_size(outcome.bytes, DECIMAL)),
                ));
            }
            ExitCode::Success
        }
        Err(e) => {
            progress.abandon();
            formatter.error(&format!("Failed to upload {} to {target}: {e}", file.display()));
            ExitCode::from_transfer_error(&e)
        }
    }
}

/// Configured transfer settings with command-line overrides applied
fn transfer_config(base: &TransferConfig, args: &PutArgs) -> mineral_core::Result<TransferConfig> {
    let mut transfer = base.clone();
    if let Some(part_size) = args.part_size {
        // The threshold follows the part size unless configured on its own
        if transfer.multipart_threshold == transfer.part_size {
            transfer.multipart_threshold = part_size;
        }
        transfer.part_size = part_size;
    }
    if let Some(concurrency) = args.concurrency {
        transfer.concurrency = concurrency;
    }
    transfer.validate()?;
    Ok(transfer)
}
