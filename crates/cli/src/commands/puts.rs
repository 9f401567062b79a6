//! puts command - Upload every file under a directory
//!
//! Keys are the file paths relative to the directory. With `--loop` the
//! directory is uploaded again and again, suffixing keys with the pass
//! number, until an upload fails. Ctrl-C aborts the multipart session of
//! the file in flight and stops the batch.

use clap::Args;
use futures::FutureExt;
use mineral_core::{BatchUploadWalker, PathKind, TransferManager, resolve_local_path};
use serde::Serialize;

use super::{Context, ctrl_c};
use crate::exit_code::ExitCode;

/// Upload every file under a directory
#[derive(Args, Debug)]
pub struct PutsArgs {
    /// Directory to upload
    #[arg(short, long)]
    pub path: String,

    #[arg(short, long, env = "AWS_DEFAULT_BUCKET")]
    pub bucket: Option<String>,

    /// Upload the directory repeatedly until an upload fails
    #[arg(long = "loop")]
    pub repeat: bool,

    /// Only upload files whose relative path matches this glob
    #[arg(long)]
    pub include: Option<String>,
}

#[derive(Debug, Serialize)]
struct PutsOutput {
    bucket: String,
    path: String,
    uploaded: usize,
}

/// Execute the puts command
pub async fn execute(args: PutsArgs, ctx: &Context) -> ExitCode {
    let formatter = &ctx.formatter;

    let bucket = match ctx.bucket(args.bucket) {
        Ok(bucket) => bucket,
        Err(code) => return code,
    };

    let include = match args.include.as_deref().map(glob::Pattern::new).transpose() {
        Ok(include) => include,
        Err(e) => {
            formatter.error(&format!("Invalid include pattern: {e}"));
            return ExitCode::UsageError;
        }
    };

    let root = match resolve_local_path(&args.path, PathKind::Dir) {
        Ok(root) => root,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::from_error(&e);
        }
    };

    let manager = TransferManager::new(ctx.store.clone(), ctx.config.transfer.clone());
    let mut walker = BatchUploadWalker::new(&manager);
    if let Some(pattern) = include {
        walker = walker.with_include(pattern);
    }

    tracing::info!(path = %root.display(), bucket = %bucket, "Starting batch upload");

    // One handler for the whole batch, polled by every file in turn
    let interrupt = ctrl_c().boxed().shared();

    if args.repeat {
        formatter.warning("Uploading repeatedly until a failure; press Ctrl-C to stop");
        let e = walker.walk_loop_until(&bucket, &root, interrupt).await;
        formatter.error(&format!(
            "Failed to upload files from {} to bucket {bucket}: {e}",
            root.display()
        ));
        return ExitCode::from_transfer_error(&e);
    }

    match walker.walk_until(&bucket, &root, interrupt).await {
        Ok(uploaded) => {
            if formatter.is_json() {
                formatter.json(&PutsOutput {
                    bucket,
                    path: root.display().to_string(),
                    uploaded,
                });
            } else {
                formatter.success(&format!(
                    "Uploaded {uploaded} file(s) from {} to bucket {}",
                    root.display(),
                    formatter.style_name(&bucket)
                ));
            }
            ExitCode::Success
        }
        Err(e) => {
            formatter.error(&format!(
                "Failed to upload files from {} to bucket {bucket}: {e}",
                root.display()
            ));
            ExitCode::from_transfer_error(&e)
        }
    }
}
