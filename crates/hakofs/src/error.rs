//! Filesystem error types.

use std::io;
use thiserror::Error;

/// Filesystem error type.
///
/// Every recoverable failure an operation can produce maps to exactly one
/// variant, so a host can translate each kind to its own failure-reporting
/// convention. Conditions that indicate a broken invariant (a dangling
/// [`NodeId`](crate::NodeId), a counter underflow) are not represented here:
/// they are host bugs and panic instead.
#[derive(Debug, Error)]
pub enum FsError {
    /// No identifiers or backing memory left for the requested growth.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Name exceeds the maximum length.
    #[error("name too long: {0} bytes (max {max})", max = crate::NAME_MAX)]
    NameTooLong(usize),

    /// Name already bound in the directory.
    #[error("name already exists: {0}")]
    NameExists(String),

    /// Entry absent where the caller required presence.
    #[error("not found: {0}")]
    NotFound(String),

    /// Directory removal blocked by live children.
    #[error("directory not empty: {0}")]
    NotEmpty(String),

    /// Malformed offset, length, or name.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Bad mount configuration.
    #[error("misconfigured: {0}")]
    Misconfigured(String),

    /// Instance was mounted read-only.
    #[error("filesystem is read-only")]
    ReadOnly,

    /// Expected a directory.
    #[error("not a directory")]
    NotADirectory,

    /// Expected anything but a directory.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// Expected a regular file.
    #[error("not a regular file")]
    NotARegularFile,
}

impl FsError {
    /// Create a ResourceExhausted error.
    pub fn exhausted(what: impl Into<String>) -> Self {
        Self::ResourceExhausted(what.into())
    }

    /// Create a NameExists error.
    pub fn name_exists(name: impl Into<String>) -> Self {
        Self::NameExists(name.into())
    }

    /// Create a NotFound error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    /// Create a NotEmpty error.
    pub fn not_empty(name: impl Into<String>) -> Self {
        Self::NotEmpty(name.into())
    }

    /// Create an InvalidArgument error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a Misconfigured error.
    pub fn misconfigured(msg: impl Into<String>) -> Self {
        Self::Misconfigured(msg.into())
    }

    /// Create an IsADirectory error.
    pub fn is_a_directory(name: impl Into<String>) -> Self {
        Self::IsADirectory(name.into())
    }
}

/// Convert FsError to std::io::Error for hosts speaking io conventions.
impl From<FsError> for io::Error {
    fn from(e: FsError) -> Self {
        match e {
            FsError::ResourceExhausted(msg) => {
                io::Error::new(io::ErrorKind::StorageFull, msg)
            }
            FsError::NameTooLong(len) => io::Error::new(
                io::ErrorKind::InvalidFilename,
                format!("name too long: {len} bytes"),
            ),
            FsError::NameExists(msg) => io::Error::new(io::ErrorKind::AlreadyExists, msg),
            FsError::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            FsError::NotEmpty(msg) => io::Error::new(io::ErrorKind::DirectoryNotEmpty, msg),
            FsError::InvalidArgument(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            FsError::Misconfigured(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            FsError::ReadOnly => {
                io::Error::new(io::ErrorKind::ReadOnlyFilesystem, "filesystem is read-only")
            }
            FsError::NotADirectory => {
                io::Error::new(io::ErrorKind::NotADirectory, "not a directory")
            }
            FsError::IsADirectory(msg) => io::Error::new(io::ErrorKind::IsADirectory, msg),
            FsError::NotARegularFile => {
                io::Error::new(io::ErrorKind::InvalidInput, "not a regular file")
            }
        }
    }
}

/// Filesystem result type.
pub type FsResult<T> = Result<T, FsError>;
