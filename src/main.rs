//! Skyline CLI
//!
//! Entry point for the `sky` command-line tool.

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use skyline_cli::client::{ApiClient, ApiClientConfig, ClientResult, HttpLogClient, LogClientConfig};
use skyline_cli::config::{CliConfig, ConfigError};
use skyline_cli::migrate::{run_migrate, MigrateOptions};
use skyline_cli::plan::{run_plan, PlanOptions};
use skyline_cli::progress::Progress;
use skyline_cli::signal;

#[derive(Parser)]
#[command(name = "sky")]
#[command(about = "Skyline remote execution and registry client", version)]
struct Cli {
    /// Path to a profile file (default: ~/.config/skyline/config.toml)
    #[arg(long, global = true)]
    profile: Option<PathBuf>,

    /// Suppress progress output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a remote plan against a workspace
    Plan {
        /// Workspace to execute against
        #[arg(long)]
        workspace_id: String,

        /// Organization scope override
        #[arg(long)]
        org_id: Option<String>,

        /// Project scope override
        #[arg(long)]
        project_id: Option<String>,

        /// Limit the operation to a resource (repeatable)
        #[arg(long = "target")]
        targets: Vec<String>,

        /// Force replacement of a resource (repeatable)
        #[arg(long = "replace")]
        replace: Vec<String>,

        /// Skip the confirmation prompt
        #[arg(long)]
        auto_approve: bool,
    },

    /// Artifact registry commands
    Registry {
        #[command(subcommand)]
        action: RegistryCommands,
    },
}

#[derive(Subcommand)]
enum RegistryCommands {
    /// Migrate artifacts between registries
    Migrate {
        /// Path to the YAML mapping config
        #[arg(long, short = 'c')]
        config: PathBuf,

        /// Registry service URL override
        #[arg(long)]
        pkg_url: Option<String>,

        /// Pool width override
        #[arg(long)]
        concurrency: Option<i64>,

        /// Overwrite artifacts already present in the destination
        #[arg(long)]
        overwrite: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("skyline_cli=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let config = match load_config(cli.profile.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err}");
            process::exit(err.exit_code());
        }
    };

    let progress = if cli.quiet {
        Progress::quiet()
    } else {
        Progress::new()
    };

    let cancel = CancellationToken::new();
    if let Err(err) = signal::install(cancel.clone()) {
        eprintln!("Error: failed to install signal handler: {err}");
        process::exit(1);
    }

    match cli.command {
        Commands::Plan {
            workspace_id,
            org_id,
            project_id,
            targets,
            replace,
            auto_approve,
        } => {
            let api = match build_api_client(&config, None, org_id, project_id) {
                Ok(api) => api,
                Err(err) => {
                    eprintln!("Error: failed to initialize client: {err}");
                    process::exit(20);
                }
            };
            let logs = match HttpLogClient::new(LogClientConfig {
                base_url: config.log_service_url.clone(),
                ..LogClientConfig::default()
            }) {
                Ok(logs) => logs,
                Err(err) => {
                    eprintln!("Error: failed to initialize log client: {err}");
                    process::exit(20);
                }
            };

            let options = PlanOptions {
                workspace_id,
                targets,
                replace,
                auto_approve,
            };
            if let Err(err) =
                run_plan(Arc::new(api), Arc::new(logs), progress, cancel, options).await
            {
                eprintln!("Error: {err}");
                process::exit(err.exit_code());
            }
        }

        Commands::Registry { action } => match action {
            RegistryCommands::Migrate {
                config: config_path,
                pkg_url,
                concurrency,
                overwrite,
            } => {
                let api = match build_api_client(&config, pkg_url, None, None) {
                    Ok(api) => api,
                    Err(err) => {
                        eprintln!("Error: failed to initialize client: {err}");
                        process::exit(20);
                    }
                };

                let options = MigrateOptions {
                    config_path,
                    concurrency,
                    overwrite,
                };
                if let Err(err) = run_migrate(Arc::new(api), progress, cancel, options).await {
                    eprintln!("Error: {err}");
                    process::exit(err.exit_code());
                }
            }
        },
    }
}

fn load_config(profile: Option<&Path>) -> Result<CliConfig, ConfigError> {
    match profile {
        Some(path) => CliConfig::load_from(path),
        None => CliConfig::load(),
    }
}

fn build_api_client(
    config: &CliConfig,
    base_url: Option<String>,
    org_id: Option<String>,
    project_id: Option<String>,
) -> ClientResult<ApiClient> {
    ApiClient::new(ApiClientConfig {
        base_url: base_url.unwrap_or_else(|| config.base_url.clone()),
        api_key: config.api_key.clone(),
        org_id: org_id.or_else(|| config.org_id.clone()),
        project_id: project_id.or_else(|| config.project_id.clone()),
        ..ApiClientConfig::default()
    })
}
