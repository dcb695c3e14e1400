//! Workspace-derived resolution.
//!
//! Two checks run before anything remote is created: which pipeline the
//! operation should use, and which local directory must be uploaded.

use std::path::{Path, PathBuf};

use thiserror::Error;

use skyline_api::Workspace;

/// Errors for workspace resolution.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("The workspace has no configured default pipeline")]
    NoDefaultPipeline,

    #[error("repository folder path {path} was not found under the current directory")]
    RepositoryPathNotFound { path: String },
}

/// Resolve the pipeline to run for `operation` (e.g. "plan").
///
/// The workspace-level override wins over the project-level one. Empty
/// strings count as unset.
pub fn resolve_default_pipeline(
    workspace: &Workspace,
    operation: &str,
) -> Result<String, WorkspaceError> {
    let overrides = workspace
        .default_pipelines
        .get(operation)
        .ok_or(WorkspaceError::NoDefaultPipeline)?;
    overrides
        .workspace_pipeline
        .clone()
        .filter(|p| !p.is_empty())
        .or_else(|| {
            overrides
                .project_pipeline
                .clone()
                .filter(|p| !p.is_empty())
        })
        .ok_or(WorkspaceError::NoDefaultPipeline)
}

/// Result of repository-root resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRoot {
    /// Directory to archive and upload.
    pub root: PathBuf,
    /// Advisory to show when a repository path is configured.
    pub warning: Option<String>,
}

/// Decide the upload root for a workspace with an optional repository
/// path.
///
/// Three outcomes: no path configured, the working directory is the
/// root; the working directory already ends with the configured path,
/// the suffix is stripped so the surrounding repository is uploaded;
/// the configured path exists under the working directory, the working
/// directory is the root. A configured path found neither way is an
/// error.
pub fn resolve_repository_root(
    working_dir: &Path,
    repository_path: Option<&str>,
) -> Result<RepoRoot, WorkspaceError> {
    let path = match repository_path {
        Some(p) if !p.is_empty() => p,
        _ => {
            return Ok(RepoRoot {
                root: working_dir.to_path_buf(),
                warning: None,
            })
        }
    };

    if working_dir.ends_with(path) {
        let mut root = working_dir.to_path_buf();
        for _ in Path::new(path).components() {
            root.pop();
        }
        let warning = repository_path_warning(path, &root);
        return Ok(RepoRoot {
            root,
            warning: Some(warning),
        });
    }

    if working_dir.join(path).is_dir() {
        return Ok(RepoRoot {
            root: working_dir.to_path_buf(),
            warning: Some(repository_path_warning(path, working_dir)),
        });
    }

    Err(WorkspaceError::RepositoryPathNotFound {
        path: path.to_string(),
    })
}

/// Advisory produced whenever a configured repository path shifts the
/// upload root.
pub fn repository_path_warning(path: &str, root: &Path) -> String {
    format!(
        "repository folder path {path} is configured for this workspace, uploading from {}",
        root.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyline_api::DefaultPipelineOverride;

    fn workspace_with(operation: &str, overrides: DefaultPipelineOverride) -> Workspace {
        let mut workspace = Workspace::default();
        workspace
            .default_pipelines
            .insert(operation.to_string(), overrides);
        workspace
    }

    // =========================================================================
    // Default pipeline resolution
    // =========================================================================

    #[test]
    fn test_workspace_override_wins() {
        let workspace = workspace_with(
            "plan",
            DefaultPipelineOverride {
                project_pipeline: Some("project-level".to_string()),
                workspace_pipeline: Some("workspace-level".to_string()),
            },
        );

        let pipeline = resolve_default_pipeline(&workspace, "plan").unwrap();
        assert_eq!(pipeline, "workspace-level");
    }

    #[test]
    fn test_project_pipeline_used_when_workspace_unset() {
        let workspace = workspace_with(
            "plan",
            DefaultPipelineOverride {
                project_pipeline: Some("project-level".to_string()),
                workspace_pipeline: None,
            },
        );

        let pipeline = resolve_default_pipeline(&workspace, "plan").unwrap();
        assert_eq!(pipeline, "project-level");
    }

    #[test]
    fn test_no_pipeline_configured_is_an_error() {
        let workspace = workspace_with("plan", DefaultPipelineOverride::default());
        let err = resolve_default_pipeline(&workspace, "plan").unwrap_err();
        assert_eq!(
            err.to_string(),
            "The workspace has no configured default pipeline"
        );

        let empty = Workspace::default();
        let err = resolve_default_pipeline(&empty, "plan").unwrap_err();
        assert_eq!(
            err.to_string(),
            "The workspace has no configured default pipeline"
        );
    }

    #[test]
    fn test_empty_strings_count_as_unset() {
        let workspace = workspace_with(
            "plan",
            DefaultPipelineOverride {
                project_pipeline: Some("project-level".to_string()),
                workspace_pipeline: Some(String::new()),
            },
        );

        let pipeline = resolve_default_pipeline(&workspace, "plan").unwrap();
        assert_eq!(pipeline, "project-level");
    }

    // =========================================================================
    // Repository root resolution
    // =========================================================================

    #[test]
    fn test_missing_repository_path_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();

        let err = resolve_repository_root(tmp.path(), Some("tf/aws")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "repository folder path tf/aws was not found under the current directory"
        );
    }

    #[test]
    fn test_subdirectory_match_keeps_working_dir_as_root() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("tf/a3ws")).unwrap();

        let repo = resolve_repository_root(tmp.path(), Some("tf/a3ws")).unwrap();
        assert_eq!(repo.root, tmp.path());
        assert_eq!(
            repo.warning.as_deref(),
            Some(repository_path_warning("tf/a3ws", tmp.path()).as_str())
        );
    }

    #[test]
    fn test_suffix_match_strips_the_configured_path() {
        let tmp = tempfile::tempdir().unwrap();
        let working_dir = tmp.path().join("tf/aws");
        std::fs::create_dir_all(&working_dir).unwrap();

        let repo = resolve_repository_root(&working_dir, Some("tf/aws")).unwrap();
        assert_eq!(repo.root, tmp.path());
        assert_eq!(
            repo.warning.as_deref(),
            Some(repository_path_warning("tf/aws", tmp.path()).as_str())
        );
    }

    #[test]
    fn test_no_configured_path_uses_working_dir() {
        let tmp = tempfile::tempdir().unwrap();

        let repo = resolve_repository_root(tmp.path(), None).unwrap();
        assert_eq!(repo.root, tmp.path());
        assert!(repo.warning.is_none());

        let repo = resolve_repository_root(tmp.path(), Some("")).unwrap();
        assert_eq!(repo.root, tmp.path());
        assert!(repo.warning.is_none());
    }
}
