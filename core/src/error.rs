use std::io;

use thiserror::Error;

/// Everything that can go wrong while decoding, dispatching or mutating
/// world state. The runtime (not this type) decides what to do about a
/// given variant — see `CoreError::action`.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("role violation: {0}")]
    RoleViolation(String),

    #[error("unknown target: {0}")]
    UnknownTarget(String),

    #[error("permission denied")]
    PermissionDenied,

    #[error("dataset load failure: {0}")]
    DatasetLoadFailure(String),

    #[error("anchor failure: {0}")]
    AnchorFailure(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// What the runtime should do in response to a `CoreError`, per the
/// error-handling table. `canModify` failures never produce a
/// `CoreError` at all — they are handled as a silent no-op at the call
/// site, so `PermissionDenied` only appears here for completeness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    CloseConnection,
    WarnAndDrop,
    Ignore,
}

impl CoreError {
    pub fn action(&self) -> ErrorAction {
        match self {
            CoreError::Protocol(_) => ErrorAction::CloseConnection,
            CoreError::RoleViolation(_) => ErrorAction::CloseConnection,
            CoreError::UnknownTarget(_) => ErrorAction::WarnAndDrop,
            CoreError::PermissionDenied => ErrorAction::Ignore,
            CoreError::DatasetLoadFailure(_) => ErrorAction::WarnAndDrop,
            CoreError::AnchorFailure(_) => ErrorAction::WarnAndDrop,
            CoreError::Io(_) => ErrorAction::CloseConnection,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
