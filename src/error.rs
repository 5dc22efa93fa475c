//! Error taxonomy shared by the upsert clients and the orchestrator.
//!
//! The extractor and both translators never fail; everything here comes from
//! credential resolution, identifier parsing or a remote call.

use std::fmt;

/// Result type for library operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// The remote knowledge base a call was aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Notion,
    Confluence,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Notion => f.write_str("Notion"),
            Platform::Confluence => f.write_str("Confluence"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// No usable client or credential.
    #[error("{platform} not authenticated: {message}")]
    Authentication { platform: Platform, message: String },

    /// A required identifier is missing or cannot be parsed.
    #[error("{platform} configuration error: {message}")]
    Configuration { platform: Platform, message: String },

    /// Transport or API-level failure, carrying the platform's status when one was received.
    #[error("{platform} request failed{}: {message}", status_suffix(.status))]
    RemoteRequest {
        platform: Platform,
        status: Option<u16>,
        message: String,
    },

    /// Both the database create and the child-page fallback failed.
    #[error("Notion page fallback failed: {page_error} (database attempt: {database_error})")]
    FallbackExhausted {
        database_error: Box<SyncError>,
        page_error: Box<SyncError>,
    },
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (status {code})"),
        None => String::new(),
    }
}

impl SyncError {
    pub fn authentication(platform: Platform, message: impl Into<String>) -> Self {
        Self::Authentication {
            platform,
            message: message.into(),
        }
    }

    pub fn configuration(platform: Platform, message: impl Into<String>) -> Self {
        Self::Configuration {
            platform,
            message: message.into(),
        }
    }

    pub fn remote(platform: Platform, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::RemoteRequest {
            platform,
            status,
            message: message.into(),
        }
    }

    /// Wraps a transport error from `reqwest`.
    pub fn transport(platform: Platform, err: reqwest::Error) -> Self {
        Self::RemoteRequest {
            platform,
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, SyncError::RemoteRequest { .. })
    }
}
