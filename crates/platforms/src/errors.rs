#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors an adapter (forge, issue tracker, VCS, census, jcheck) can report
/// back to the core crate. Transient errors (`RateLimitExceeded`,
/// `NotFound` on a ref that may simply not have replicated yet) are
/// retried with bounded backoff by the caller per spec §5/§7; the rest are
/// folded into observable bot state (comments, labels, check summary).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("API request failed")]
    ApiError(),

    #[error("Approval attempted - blocked by policy")]
    ApprovalProhibited,

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Failed to create an app access token for repository: {0}/{1}. For app with ID: {2}")]
    FailedToCreateAccessToken(String, String, u64),

    #[error("Failed to find installation for repository: {0}/{1} with ID: {2}")]
    FailedToFindAppInstallation(String, String, u64),

    #[error("Failed to update the PR.")]
    FailedToUpdatePullRequest(String),

    #[error("Invalid response format")]
    InvalidResponse,

    #[error("Invalid review state transition attempted")]
    InvalidStateTransition,

    #[error("Requested resource was not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Review operation conflict: {0}")]
    ReviewConflict(String),
}

impl Error {
    /// Whether the failure is worth a bounded retry rather
    /// than an immediate conversion into observable bot state.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::RateLimitExceeded | Error::ApiError())
    }
}
