//! ls command - List every object in a bucket

use clap::Args;
use mineral_core::{ListOptions, ObjectInfo, ObjectStore, Result};
use serde::Serialize;

use super::Context;
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// List objects in a bucket
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Bucket to list
    #[arg(short, long, env = "AWS_DEFAULT_BUCKET")]
    pub bucket: Option<String>,

    /// Only list keys starting with this prefix
    #[arg(long)]
    pub prefix: Option<String>,
}

#[derive(Debug, Serialize)]
struct LsOutput {
    bucket: String,
    objects: Vec<ObjectInfo>,
    total: usize,
}

/// Execute the ls command
pub async fn execute(args: LsArgs, ctx: &Context) -> ExitCode {
    let formatter = &ctx.formatter;

    let bucket = match ctx.bucket(args.bucket) {
        Ok(bucket) => bucket,
        Err(code) => return code,
    };

    let objects = match list_all(ctx.store.as_ref(), &bucket, args.prefix).await {
        Ok(objects) => objects,
        Err(e) => {
            formatter.error(&format!("Failed to list objects in {bucket}: {e}"));
            return ExitCode::from_error(&e);
        }
    };

    if formatter.is_json() {
        formatter.json(&LsOutput {
            bucket,
            total: objects.len(),
            objects,
        });
    } else {
        for object in &objects {
            formatter.println(&format_object_line(formatter, object));
        }
        formatter.println(&format!("Total objects: {}", objects.len()));
    }

    ExitCode::Success
}

/// Follow continuation tokens until the listing is exhausted
async fn list_all(
    store: &dyn ObjectStore,
    bucket: &str,
    prefix: Option<String>,
) -> Result<Vec<ObjectInfo>> {
    let mut objects = Vec::new();
    let mut continuation_token = None;

    loop {
        let page = store
            .list_objects(
                bucket,
                ListOptions {
                    prefix: prefix.clone(),
                    max_keys: None,
                    continuation_token: continuation_token.take(),
                },
            )
            .await?;

        tracing::debug!(bucket, items = page.items.len(), "Listed page");
        objects.extend(page.items);

        match page.continuation_token {
            Some(token) if page.truncated => continuation_token = Some(token),
            _ => break,
        }
    }

    Ok(objects)
}

/// `- key=<key> size=<bytes>`
fn format_object_line(formatter: &Formatter, object: &ObjectInfo) -> String {
    format!(
        "- key={} size={}",
        formatter.style_file(&object.key),
        formatter.style_size(&object.size_bytes.unwrap_or(0).to_string())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_context;
    use crate::commands::testing::MemoryStore;
    use crate::output::OutputConfig;
    use std::sync::Arc;

    #[test]
    fn test_object_line() {
        let formatter = Formatter::new(OutputConfig {
            no_color: true,
            ..Default::default()
        });
        let object = ObjectInfo::file("videos/intro.mp4", 15_000_000);

        insta::assert_snapshot!(
            format_object_line(&formatter, &object),
            @"- key=videos/intro.mp4 size=15000000"
        );
    }

    #[tokio::test]
    async fn test_list_all_follows_every_page() {
        let store = MemoryStore {
            page_size: 2,
            ..MemoryStore::with_bucket("media")
        };
        for key in ["a", "b", "c", "d", "e"] {
            store.insert("media", key, b"x");
        }

        let objects = list_all(&store, "media", None).await.unwrap();

        let keys: Vec<_> = objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(*store.list_calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_missing_bucket_is_not_found() {
        let ctx = test_context(Arc::new(MemoryStore::default()));

        let code = execute(
            LsArgs {
                bucket: Some("nope".to_string()),
                prefix: None,
            },
            &ctx,
        )
        .await;

        assert_eq!(code, ExitCode::NotFound);
    }
}
