//! # Error Types
//!
//! Error handling for the dispatch core.
//!
//! This module defines the error variants surfaced by hook registration,
//! version negotiation, system-message handling, and configuration loading.
//!
//! ## Error Categories
//! - **Registration Errors**: bad hook parameters, unmapped names, stale or
//!   unknown definition versions
//! - **Codec Errors**: parse/serialize failures reported by the protocol codec
//! - **Callback Errors**: hook callbacks that panicked, with hook identity
//! - **Configuration Errors**: TOML and environment parsing failures
//!
//! Runtime errors inside the handler pipeline are never propagated to the
//! wire path; they are logged with structured context and swallowed so a
//! buggy module cannot take down the proxy. Only registration-time errors
//! reach callers as `Err`.

use thiserror::Error;

/// Error message constants reused across the crate.
pub mod constants {
    /// Hook registration errors
    pub const ERR_WILDCARD_VERSIONED: &str =
        "wildcard hooks accept only `Any` or `Raw` definition versions";
    pub const ERR_ZERO_VERSION: &str = "definition version must be a positive integer";

    /// System message errors
    pub const ERR_SYSMSG_LEADING_AT: &str = "system message must start with '@'";
    pub const ERR_SYSMSG_EMPTY_ID: &str = "system message id is empty";
    pub const ERR_SYSMSG_NO_TABLE: &str = "no system-message table selected";

    /// Version negotiation errors
    pub const ERR_BAD_REVISION: &str = "malformed protocol revision string";
}

/// Primary error type for dispatch operations.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Message name not mapped by current protocol: {0}")]
    UnmappedName(String),

    #[error("Obsolete definition for {name}: requested {requested}, latest is {latest}")]
    ObsoleteDefinition {
        name: String,
        requested: u32,
        latest: u32,
    },

    #[error("Unknown definition for {name}: requested {requested}, latest known {latest:?}")]
    UnknownDefinition {
        name: String,
        requested: String,
        latest: Option<u32>,
    },

    #[error("Codec failure while {context}: {source}")]
    Codec {
        context: String,
        #[source]
        source: CodecError,
    },

    #[error("Hook callback failed in module '{namespace}' ({hook}): {message}")]
    Callback {
        namespace: String,
        hook: String,
        message: String,
    },

    #[error("Module error: {0}")]
    Module(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Failure reported by a [`ProtocolCodec`](crate::codec::ProtocolCodec)
/// implementation. The inner string is the codec's own diagnostic.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct CodecError(pub String);

impl CodecError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Type alias for Results using DispatchError
pub type Result<T> = std::result::Result<T, DispatchError>;
