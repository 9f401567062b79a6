//! bucket command - List and create buckets

use clap::{Args, Subcommand};
use mineral_core::ObjectInfo;
use serde::Serialize;

use super::Context;
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// List or create buckets
#[derive(Args, Debug)]
pub struct BucketArgs {
    #[command(subcommand)]
    pub command: BucketCommands,
}

#[derive(Subcommand, Debug)]
pub enum BucketCommands {
    /// List all buckets
    Ls,

    /// Create a bucket
    Create(CreateArgs),
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Name of the bucket to create
    #[arg(short, long)]
    pub bucket: String,
}

#[derive(Debug, Serialize)]
struct BucketListOutput {
    buckets: Vec<ObjectInfo>,
    total: usize,
}

#[derive(Debug, Serialize)]
struct BucketCreateOutput {
    bucket: String,
    created: bool,
}

/// Execute the bucket command
pub async fn execute(args: BucketArgs, ctx: &Context) -> ExitCode {
    match args.command {
        BucketCommands::Ls => execute_list(ctx).await,
        BucketCommands::Create(create) => execute_create(create, ctx).await,
    }
}

async fn execute_list(ctx: &Context) -> ExitCode {
    let formatter = &ctx.formatter;

    let buckets = match ctx.store.list_buckets().await {
        Ok(buckets) => buckets,
        Err(e) => {
            formatter.error(&format!("Failed to list buckets: {e}"));
            return ExitCode::from_error(&e);
        }
    };

    if formatter.is_json() {
        formatter.json(&BucketListOutput {
            total: buckets.len(),
            buckets,
        });
    } else {
        for bucket in &buckets {
            formatter.println(&format_bucket_line(formatter, bucket));
        }
        formatter.println(&format!("Total buckets: {}", buckets.len()));
    }

    ExitCode::Success
}

async fn execute_create(args: CreateArgs, ctx: &Context) -> ExitCode {
    let formatter = &ctx.formatter;

    match ctx.store.create_bucket(&args.bucket).await {
        Ok(()) => {
            if formatter.is_json() {
                formatter.json(&BucketCreateOutput {
                    bucket: args.bucket,
                    created: true,
                });
            } else {
                formatter.success(&format!(
                    "Created bucket {}",
                    formatter.style_name(&args.bucket)
                ));
            }
            ExitCode::Success
        }
        Err(e) => {
            formatter.error(&format!("Failed to create bucket {}: {e}", args.bucket));
            ExitCode::from_error(&e)
        }
    }
}

/// `- <name>: <YYYY-mm-dd HH:MM:SS Weekday>`
fn format_bucket_line(formatter: &Formatter, bucket: &ObjectInfo) -> String {
    let created = bucket
        .last_modified
        .map(|ts| ts.strftime("%Y-%m-%d %H:%M:%S %A").to_string())
        .unwrap_or_default();
    format!(
        "- {}: {}",
        formatter.style_name(&bucket.key),
        formatter.style_date(&created)
    )
}
