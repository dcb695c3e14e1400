//! Source archiving.
//!
//! Packs the upload root into an in-memory tar archive with default
//! excludes plus optional `.skyignore` patterns, and computes the sha256
//! digest the platform echoes back after upload. The archive format is
//! opaque to the rest of the flow: callers get bytes or an error.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use sha2::{Digest, Sha256};
use tar::Builder;
use thiserror::Error;
use walkdir::WalkDir;

/// Patterns always excluded from the upload.
const DEFAULT_EXCLUDES: &[&str] = &[
    ".git",
    ".git/**",
    "**/.DS_Store",
    ".terraform",
    ".terraform/**",
    "**/.terraform",
    "**/.terraform/**",
    "**/*.tfstate",
    "**/*.tfstate.backup",
    ".skyline",
    ".skyline/**",
];

/// Optional ignore file at the upload root.
const IGNORE_FILE: &str = ".skyignore";

/// Errors for archiving operations.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("glob pattern error: {0}")]
    Glob(#[from] globset::Error),
}

/// Archives one directory tree.
pub struct Archiver {
    root: PathBuf,
    extra_patterns: Vec<String>,
}

impl Archiver {
    /// Create an archiver for the given upload root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extra_patterns: Vec::new(),
        }
    }

    /// Add exclusion patterns on top of the defaults.
    pub fn with_patterns(mut self, patterns: &[&str]) -> Self {
        self.extra_patterns
            .extend(patterns.iter().map(|p| p.to_string()));
        self
    }

    /// Produce the tar archive.
    ///
    /// Entries are added in sorted walk order so the same tree yields
    /// the same bytes. Symlinks are not followed and not included.
    pub fn create(&self) -> Result<Vec<u8>, ArchiveError> {
        let excludes = self.build_excludes()?;
        let mut tar = Builder::new(Vec::new());

        let walker = WalkDir::new(&self.root).sort_by_file_name().into_iter();
        for entry in walker.filter_entry(|entry| {
            let rel = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());
            rel.as_os_str().is_empty() || !excludes.is_match(rel)
        }) {
            let entry = entry?;
            let rel = match entry.path().strip_prefix(&self.root) {
                Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
                _ => continue,
            };
            if entry.file_type().is_dir() {
                tar.append_dir(&rel, entry.path())?;
            } else if entry.file_type().is_file() {
                let mut file = fs::File::open(entry.path())?;
                tar.append_file(&rel, &mut file)?;
            }
        }

        Ok(tar.into_inner()?)
    }

    fn build_excludes(&self) -> Result<GlobSet, ArchiveError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in DEFAULT_EXCLUDES {
            builder.add(Glob::new(pattern)?);
        }
        for pattern in &self.extra_patterns {
            builder.add(Glob::new(pattern)?);
        }
        for pattern in self.ignore_file_patterns()? {
            builder.add(Glob::new(&pattern)?);
        }
        Ok(builder.build()?)
    }

    fn ignore_file_patterns(&self) -> Result<Vec<String>, ArchiveError> {
        let path = self.root.join(IGNORE_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(path)?;
        Ok(contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect())
    }
}

/// Hex sha256 of an archive.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
