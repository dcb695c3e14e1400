//! Skyline CLI - remote execution and artifact migration client
//!
//! This crate implements the `sky` command-line client for the Skyline
//! platform: it drives remote infrastructure-automation executions
//! (create, upload source, execute, then walk the pipeline graph with
//! live log attachment) and migrates artifacts between registries under
//! bounded concurrency.

pub mod archive;
pub mod client;
pub mod config;
pub mod migrate;
pub mod mock;
pub mod plan;
pub mod progress;
pub mod signal;
pub mod walk;
pub mod workspace;

pub use archive::{sha256_hex, ArchiveError, Archiver};
pub use client::{ApiClient, ClientError, HttpLogClient, JobClient, LogClient, RegistryClient};
pub use config::{CliConfig, ConfigError};
pub use migrate::{run_migrate, MigrateError, MigrateOptions};
pub use plan::{run_plan, PlanError, PlanOptions};
pub use progress::Progress;
pub use walk::{WalkError, Walker};
