//! Console progress reporting.
//!
//! Progress lines go to stderr so stdout stays reserved for step log
//! content. Cheap to clone; spawned tasks carry their own copy.

/// Stderr progress reporter shared by the orchestration flows.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    /// Suppress non-error output.
    quiet: bool,
}

impl Progress {
    /// Create a reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a reporter that only prints errors.
    pub fn quiet() -> Self {
        Self { quiet: true }
    }

    /// Announce the start of a phase.
    pub fn start(&self, msg: &str) {
        if !self.quiet {
            eprintln!("{msg}...");
        }
    }

    /// Report an intermediate step within a phase.
    pub fn step(&self, msg: &str) {
        if !self.quiet {
            eprintln!("  {msg}");
        }
    }

    /// Report a completed phase.
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            eprintln!("{msg}");
        }
    }

    /// Report a non-fatal error.
    pub fn error(&self, msg: &str) {
        eprintln!("Error: {msg}");
    }
}
