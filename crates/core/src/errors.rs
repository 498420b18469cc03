use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Recoverable and unrecoverable failure taxonomy for a single `CheckRun`
/// tick. Recoverable variants are folded into the
/// `ReconcileReport`/`DesiredState` rather than returned as `Err` from
/// `CheckRun::run_once` — only unrecoverable faults propagate.
#[derive(Error, Debug)]
pub enum CheckRunError {
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    #[error("issue tracker error for {0}: {1}")]
    IssueTrackerError(String, String),

    #[error("VCS error: {0}")]
    VcsError(String),

    #[error("failed to apply forge mutation: {0}")]
    ForgeMutationFailed(String),

    #[error("command {0} rejected: {1}")]
    AuthorizationFailed(String, String),

    #[error("adapter error: {0}")]
    AdapterError(#[from] jcheck_platforms::errors::Error),

    #[error("regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("invalid jcheck configuration: {0}")]
    InvalidConfig(#[from] toml::de::Error),

    #[error("unrecoverable error: {0}")]
    Unrecoverable(String),
}

impl CheckRunError {
    /// Whether this failure class is captured as observable state (spec
    /// §7) rather than aborting the work item.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, CheckRunError::Unrecoverable(_))
    }
}
