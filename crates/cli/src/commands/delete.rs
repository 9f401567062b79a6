//! delete command - Remove an object

use clap::Args;
use mineral_core::RemotePath;
use serde::Serialize;

use super::Context;
use crate::exit_code::ExitCode;

/// Delete an object
#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Key of the object to delete
    #[arg(short, long)]
    pub key: String,

    #[arg(short, long, env = "AWS_DEFAULT_BUCKET")]
    pub bucket: Option<String>,
}

#[derive(Debug, Serialize)]
struct DeleteOutput {
    bucket: String,
    key: String,
    deleted: bool,
}

/// Execute the delete command
pub async fn execute(args: DeleteArgs, ctx: &Context) -> ExitCode {
    let formatter = &ctx.formatter;

    let bucket = match ctx.bucket(args.bucket) {
        Ok(bucket) => bucket,
        Err(code) => return code,
    };
    let path = RemotePath::new(&bucket, &args.key);

    if let Err(e) = ctx.store.delete_object(&path).await {
        formatter.error(&format!("Failed to delete {path}: {e}"));
        return ExitCode::from_error(&e);
    }

    if formatter.is_json() {
        formatter.json(&DeleteOutput {
            bucket,
            key: args.key,
            deleted: true,
        });
    } else {
        formatter.success(&format!(
            "Deleted {} from {}",
            formatter.style_file(&args.key),
            formatter.style_name(&bucket)
        ));
    }

    ExitCode::Success
}
