use std::time::Duration;
use thiserror::Error;

/// Errors raised by futures, ports and the port registries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FutureError {
    #[error("Unknown port: {0}")]
    UnknownPort(String),

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Future {0} was already consumed")]
    UseAfterConsume(String),

    #[error("Promise {0} already holds a value")]
    AlreadySet(String),

    #[error("Timed out after {timeout:?} waiting for {target}")]
    Timeout { target: String, timeout: Duration },

    #[error("Cannot wait on an empty future group")]
    EmptyGroup,

    #[error("Duplicate port name: {0}")]
    DuplicatePort(String),

    #[error("Invalid port name: {0:?}")]
    InvalidPortName(String),

    #[error("Port count mismatch: {futures} futures, {names} names")]
    NameCountMismatch { futures: usize, names: usize },
}

pub type FutureResult<T> = std::result::Result<T, FutureError>;
