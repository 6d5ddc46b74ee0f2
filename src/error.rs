//! Error types for channel-dl
//!
//! This module provides the error taxonomy for the library:
//! - Pre-batch errors (configuration, channel lookup, enumeration) that halt a run
//! - Per-item errors (stream fetch, merge) that are contained by the item pipeline
//! - Exit code mapping for the command-line front end

use crate::types::StreamKind;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for channel-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for channel-dl
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "api.page_size")
        key: Option<String>,
    },

    /// Channel or collection could not be resolved
    #[error("lookup error: {0}")]
    Lookup(#[from] LookupError),

    /// A listing page request failed
    #[error("enumeration error: {0}")]
    Enumeration(#[from] EnumerationError),

    /// Stream resolution or transfer failed
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// External muxer failed
    #[error("merge error: {0}")]
    Merge(#[from] MergeError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Catalog API answered with a non-success status
    #[error("catalog API returned HTTP {status} for {endpoint}")]
    Api {
        /// HTTP status code
        status: u16,
        /// The endpoint that was queried (e.g., "playlistItems")
        endpoint: String,
    },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// External tool execution failed (yt-dlp, ffmpeg)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Operation not supported (missing binary, not implemented, etc.)
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Channel lookup errors
#[derive(Debug, Error)]
pub enum LookupError {
    /// Neither a username nor a channel id matched
    #[error("channel id or username '{channel}' not found")]
    ChannelNotFound {
        /// The identifier or handle that was searched for
        channel: String,
    },
}

/// Collection enumeration errors
#[derive(Debug, Error)]
pub enum EnumerationError {
    /// A listing page could not be fetched
    #[error("failed to fetch page {page} of collection {collection_id}: {reason}")]
    PageFailed {
        /// The collection being enumerated
        collection_id: String,
        /// 1-based page number that failed
        page: usize,
        /// The underlying failure
        reason: String,
    },
}

/// Stream fetch errors
#[derive(Debug, Error)]
pub enum FetchError {
    /// No representation in the expected container was offered
    #[error("no {kind} stream in a {container} container for video {video_id}")]
    NoMatchingFormat {
        /// The stream kind that was requested
        kind: StreamKind,
        /// The container that was required
        container: &'static str,
        /// The video whose formats were searched
        video_id: String,
    },

    /// Stream representations could not be resolved
    #[error("failed to resolve streams for {url}: {reason}")]
    Resolve {
        /// The watch URL handed to the resolver
        url: String,
        /// The reason resolution failed
        reason: String,
    },

    /// The stream URL was refused with a client error that another attempt cannot fix
    #[error("{kind} stream refused with HTTP {status}")]
    Rejected {
        /// The stream kind being transferred
        kind: StreamKind,
        /// HTTP status code of the response
        status: u16,
    },

    /// The byte stream failed before completion
    #[error("{kind} transfer to {path} failed after {received} bytes: {reason}")]
    Transfer {
        /// The stream kind being transferred
        kind: StreamKind,
        /// The destination file (left on disk for the caller)
        path: PathBuf,
        /// Bytes written before the failure
        received: u64,
        /// The reason the transfer failed
        reason: String,
    },

    /// No data arrived within the configured stall timeout
    #[error("{kind} transfer stalled for {after:?} after {received} bytes")]
    Stalled {
        /// The stream kind being transferred
        kind: StreamKind,
        /// Bytes written before the stall
        received: u64,
        /// The stall timeout that elapsed
        after: Duration,
    },
}

/// Muxer errors
#[derive(Debug, Error)]
pub enum MergeError {
    /// The muxer exited with a non-zero status
    #[error("muxer exited with status {code}")]
    ExitStatus {
        /// Process exit code
        code: i32,
    },

    /// The muxer was terminated by a signal
    #[error("muxer terminated without an exit code")]
    Terminated,

    /// The muxer could not be started
    #[error("failed to start muxer {binary}: {reason}")]
    Spawn {
        /// The binary that was executed
        binary: PathBuf,
        /// The reason the spawn failed
        reason: String,
    },

    /// The muxer did not finish within the configured timeout
    #[error("muxer did not finish within {after:?}")]
    TimedOut {
        /// The timeout that elapsed
        after: Duration,
    },
}

impl Error {
    /// Create a configuration error for a specific key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Process exit code for the command-line front end
    ///
    /// - 2: configuration error
    /// - 3: channel not found
    /// - 4: enumeration failure
    /// - 1: anything else
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config { .. } => 2,
            Error::NotSupported(_) => 2,
            Error::Lookup(LookupError::ChannelNotFound { .. }) => 3,
            Error::Enumeration(_) => 4,
            Error::Fetch(_)
            | Error::Merge(_)
            | Error::Io(_)
            | Error::Network(_)
            | Error::Api { .. }
            | Error::Serialization(_)
            | Error::ExternalTool(_)
            | Error::Other(_) => 1,
        }
    }
}
