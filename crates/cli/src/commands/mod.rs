//! Command definitions and dispatch
//!
//! The dispatcher loads configuration, builds one storage client for the
//! whole process and hands it to the selected command.

use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use mineral_core::{Config, ConfigManager, ObjectStore};
use mineral_s3::S3Client;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

mod bucket;
mod completions;
mod delete;
mod get;
mod ls;
mod put;
mod puts;

#[cfg(test)]
pub(crate) mod testing;

/// Move files to and from S3-compatible object storage
#[derive(Parser, Debug)]
#[command(name = "mineral", version, about, propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Print machine-readable JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Connection settings; each overrides the config file
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Service endpoint URL
    #[arg(long, env = "AWS_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    #[arg(long, env = "AWS_REGION", global = true)]
    pub region: Option<String>,

    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true, global = true)]
    pub access_key: Option<String>,

    #[arg(
        long,
        env = "AWS_SECRET_ACCESS_KEY",
        hide_env_values = true,
        global = true
    )]
    pub secret_key: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List or create buckets
    Bucket(bucket::BucketArgs),

    /// List objects in a bucket
    Ls(ls::LsArgs),

    /// Upload a file
    Put(put::PutArgs),

    /// Upload every file under a directory
    Puts(puts::PutsArgs),

    /// Download an object
    Get(get::GetArgs),

    /// Delete an object
    Delete(delete::DeleteArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Everything a command needs to run
pub struct Context {
    pub store: Arc<dyn ObjectStore>,
    pub config: Config,
    pub formatter: Formatter,
}

impl Context {
    /// Bucket from the command line, else the configured default
    pub fn bucket(&self, arg: Option<String>) -> Result<String, ExitCode> {
        match arg.or_else(|| self.config.connection.default_bucket.clone()) {
            Some(bucket) if !bucket.is_empty() => Ok(bucket),
            _ => {
                self.formatter.error(
                    "No bucket given; pass --bucket or set AWS_DEFAULT_BUCKET",
                );
                Err(ExitCode::UsageError)
            }
        }
    }
}

/// Parse-independent entry point used by `main`
pub async fn execute(cli: Cli) -> ExitCode {
    let output_config = OutputConfig {
        json: cli.global.json,
        no_color: cli.global.no_color,
        quiet: cli.global.quiet,
    };
    let formatter = Formatter::new(output_config);
    if !formatter.colors_enabled() {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    let command = match cli.command {
        Commands::Completions(args) => return completions::execute(args),
        command => command,
    };

    let config = match load_config(&cli.connection) {
        Ok(config) => config,
        Err(e) => {
            formatter.error(&format!("Failed to load configuration: {e}"));
            return ExitCode::from_error(&e);
        }
    };

    let store: Arc<dyn ObjectStore> = match S3Client::new(&config.connection).await {
        Ok(client) => Arc::new(client),
        Err(e) => {
            formatter.error(&format!("Failed to create client: {e}"));
            return ExitCode::from_error(&e);
        }
    };

    let ctx = Context {
        store,
        config,
        formatter,
    };

    match command {
        Commands::Bucket(args) => bucket::execute(args, &ctx).await,
        Commands::Ls(args) => ls::execute(args, &ctx).await,
        Commands::Put(args) => put::execute(args, &ctx).await,
        Commands::Puts(args) => puts::execute(args, &ctx).await,
        Commands::Get(args) => get::execute(args, &ctx).await,
        Commands::Delete(args) => delete::execute(args, &ctx).await,
        Commands::Completions(_) => ExitCode::Success,
    }
}

fn load_config(args: &ConnectionArgs) -> mineral_core::Result<Config> {
    let mut config = ConfigManager::new()?.load()?;
    apply_connection_args(&mut config, args);
    config.connection.validate()?;
    Ok(config)
}

fn apply_connection_args(config: &mut Config, args: &ConnectionArgs) {
    let connection = &mut config.connection;
    if let Some(endpoint) = &args.endpoint {
        connection.endpoint = Some(endpoint.clone());
    }
    if let Some(region) = &args.region {
        connection.region = region.clone();
    }
    if let Some(access_key) = &args.access_key {
        connection.access_key = Some(access_key.clone());
    }
    if let Some(secret_key) = &args.secret_key {
        connection.secret_key = Some(secret_key.clone());
    }
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
pub(crate) async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Unable to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Stand-in for a storage client in command tests
#[cfg(test)]
pub(crate) fn test_context(store: Arc<dyn ObjectStore>) -> Context {
    Context {
        store,
        config: Config::default(),
        formatter: Formatter::new(OutputConfig {
            quiet: true,
            ..Default::default()
        }),
    }
}
