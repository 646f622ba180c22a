//! Error types for capres-core and the crates built on it.
//!
//! Errors carry a stable kind so that callers (resolver engines, reporters)
//! can decide whether a failure is recoverable. Filtering problems are
//! normally consumed where they happen; the kinds here are the ones that
//! cross an API boundary.

use thiserror::Error;

/// Result alias used across capres.
pub type CapresResult<T> = Result<T, CapresError>;

/// Errors produced by capres.
#[derive(Debug, Error)]
pub enum CapresError {
    /// A caller supplied a value that cannot be used.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An internal invariant was violated.
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// An LDAP filter expression could not be parsed.
    #[error("invalid filter: {0}")]
    Filter(String),

    /// A version or version range literal could not be parsed.
    #[error("invalid version: {0}")]
    Version(String),

    /// A manifest or header could not be parsed.
    #[error("invalid manifest: {0}")]
    Manifest(String),

    /// An attribute value could not be converted to the requested type.
    #[error("conversion failed: {0}")]
    Conversion(String),

    /// The resolve context failed to initialize. The session cannot continue.
    #[error("initialization failed: {0}")]
    Init(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CapresError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }

    pub fn filter(msg: impl Into<String>) -> Self {
        Self::Filter(msg.into())
    }

    pub fn version(msg: impl Into<String>) -> Self {
        Self::Version(msg.into())
    }

    pub fn manifest(msg: impl Into<String>) -> Self {
        Self::Manifest(msg.into())
    }

    pub fn conversion(msg: impl Into<String>) -> Self {
        Self::Conversion(msg.into())
    }

    pub fn init(msg: impl Into<String>) -> Self {
        Self::Init(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Returns true for errors after which a resolve session must be abandoned.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Init(_) | Self::Conversion(_) | Self::Invariant(_))
    }
}
