//! Error types for shared state and channel operations

use thiserror::Error;

/// Errors that can occur during shared memory and queue operations
#[derive(Error, Debug)]
pub enum ShmError {
    /// Resource is owned by a live process
    #[error("Resource already exists: {name}")]
    AlreadyExists {
        /// Resource name
        name: String,
    },

    /// Resource has not been created
    #[error("Resource not found: {name}")]
    NotFound {
        /// Resource name
        name: String,
    },

    /// Region magic or payload layout differs from this build
    #[error("Layout mismatch in {name}: {reason}")]
    LayoutMismatch {
        /// Region name
        name: String,
        /// What did not match
        reason: &'static str,
    },

    /// Name cannot be passed to the OS
    #[error("Invalid resource name: {name:?}")]
    InvalidName {
        /// Offending name
        name: String,
    },

    /// Queue is full, message dropped
    #[error("Channel full: {name}")]
    ChannelFull {
        /// Queue name
        name: String,
    },

    /// Encoded message exceeds the queue message size
    #[error("Message of {size} bytes exceeds limit of {limit}")]
    MessageTooLarge {
        /// Encoded size
        size: usize,
        /// Queue message size
        limit: usize,
    },

    /// IO error
    #[error("IO error: {source}")]
    Io {
        /// Source IO error
        #[from]
        source: std::io::Error,
    },

    /// Nix system call error
    #[error("System call error: {source}")]
    Nix {
        /// Source nix error
        #[from]
        source: nix::Error,
    },

    /// Message encoding error
    #[error("Codec error: {source}")]
    Codec {
        /// Source bincode error
        #[from]
        source: bincode::Error,
    },
}

/// Result type for shared memory operations
pub type ShmResult<T> = Result<T, ShmError>;
