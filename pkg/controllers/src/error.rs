use thiserror::Error;

/// Outcome classification of one reconciliation pass.
///
/// Everything except `Fatal` is retryable: the dispatcher requeues the
/// key with backoff. A deleted endpoints object is not an error at all;
/// it selects the deregistration-only path.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// One or more agent-scoped operations failed. Operations already
    /// applied are not rolled back; the next pass converges the rest.
    #[error("{failed}/{total} agent operations failed for {key}: {details}")]
    PartialFailure {
        key: String,
        failed: usize,
        total: usize,
        details: String,
    },

    /// Orchestration-state read failed; transient.
    #[error("state read failed: {0}")]
    Store(#[source] anyhow::Error),

    /// Malformed static input (undecodable orchestration object).
    /// Retrying cannot fix it.
    #[error("fatal: {reason}")]
    Fatal { reason: String },

    /// The dispatcher cancelled the pass (shutdown). Already-issued
    /// agent calls stand; nothing is rolled back.
    #[error("reconciliation cancelled")]
    Cancelled,
}

impl ReconcileError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ReconcileError::Fatal { .. })
    }
}
