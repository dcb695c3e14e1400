//! Signal handling for graceful shutdown (SIGINT/SIGTERM).
//!
//! On the first signal: print a notice and cancel the shared token so
//! every poll loop and in-flight request winds down. On the second
//! signal: exit immediately with the cancellation exit code. No cleanup
//! of partially-created remote jobs is attempted; the remote side keeps
//! whatever state it reached.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// Exit code for cancelled runs.
pub const EXIT_CODE_CANCELLED: i32 = 80;

/// Action taken after receiving a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// First signal: initiate graceful cancellation.
    InitiateCancellation,
    /// Second signal: exit immediately.
    ImmediateExit,
    /// Third and later signals: ignore.
    Ignore,
}

/// Signal counter shared with the ctrlc handler thread.
#[derive(Debug, Default)]
pub struct SignalState {
    signal_count: AtomicU8,
}

impl SignalState {
    /// Create a new signal state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one received signal and decide what to do.
    pub fn handle_signal(&self) -> SignalAction {
        let count = self.signal_count.fetch_add(1, Ordering::SeqCst);
        match count {
            0 => SignalAction::InitiateCancellation,
            1 => SignalAction::ImmediateExit,
            _ => SignalAction::Ignore,
        }
    }

    /// Number of signals received so far.
    pub fn signal_count(&self) -> u8 {
        self.signal_count.load(Ordering::SeqCst)
    }
}

/// Install the SIGINT/SIGTERM handler.
///
/// Must be called once at program startup, before the orchestration
/// flow begins.
pub fn install(cancel: CancellationToken) -> Result<(), ctrlc::Error> {
    let state = Arc::new(SignalState::new());
    ctrlc::set_handler(move || match state.handle_signal() {
        SignalAction::InitiateCancellation => {
            eprintln!("Interrupted, cleaning up...");
            cancel.cancel();
        }
        SignalAction::ImmediateExit => {
            std::process::exit(EXIT_CODE_CANCELLED);
        }
        SignalAction::Ignore => {}
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_escalation() {
        let state = SignalState::new();
        assert_eq!(state.handle_signal(), SignalAction::InitiateCancellation);
        assert_eq!(state.handle_signal(), SignalAction::ImmediateExit);
        assert_eq!(state.handle_signal(), SignalAction::Ignore);
        assert_eq!(state.signal_count(), 3);
    }
}
