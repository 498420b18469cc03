use thiserror::Error;

/// Failures this process entry point can surface before handing off to
/// `jcheck_core`, which folds its own recoverable failures into the
/// reconciliation report rather than an `Err`.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("reconciliation error: {0}")]
    Reconcile(#[from] jcheck_core::errors::CheckRunError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}
