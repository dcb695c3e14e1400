//! Skyline API wire types
//!
//! Defines the JSON shapes exchanged with the Skyline platform services:
//! workspaces, remote executions, pipeline execution graphs, and the
//! artifact registry. Pure data, no I/O.

pub mod envelope;
pub mod execution;
pub mod graph;
pub mod registry;
pub mod status;
pub mod workspace;

pub use envelope::ApiEnvelope;
pub use execution::{CustomArgs, ExecutionSummary, LogToken, PipelineExecution, RemoteExecution};
pub use graph::{AdjacencyList, AsyncDetails, ExecutableResponse, ExecutionGraph, ExecutionNode, LayoutNode};
pub use registry::{Artifact, MigrationStatus, MigrationStatusUpdate};
pub use status::NodeStatus;
pub use workspace::{DefaultPipelineOverride, Workspace};
