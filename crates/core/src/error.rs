use thiserror::Error;

/// Invariant violations and capability-trait failures. Transient upstream
/// failures and timeouts are handled at the call site per the error-handling
/// design (fallback text, terminal outcome) and never reach this type.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("no active exchange to resolve")]
    NoActiveExchange,

    #[error("agent {0} is already in the hand-raise queue")]
    AlreadyQueued(String),

    #[error("exchange {0} already has an outcome")]
    AlreadyResolved(String),

    #[error("capability call failed: {0}")]
    Capability(String),
}
