//! Error type definitions for the badge service
//!
//! Every boundary adds a short label describing what was attempted, so a
//! failed upstream call surfaces as e.g.
//! `executing service aur: fetching AUR info: https://... returned HTTP 502`.

use thiserror::Error;

/// Top-level application error type
///
/// Raised while the process starts up: loading configuration, parsing the
/// embedded assets, opening the cache and registering service handlers.
/// All of these are fatal.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Embedded asset is missing or unusable
    #[error("Asset error: {path} - {message}")]
    Asset { path: String, message: String },

    /// Font asset could not be loaded
    #[error("Font error: {0}")]
    Font(#[from] FontError),

    /// Service registration errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Cache backend errors
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client construction errors
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Font loading errors
#[derive(Error, Debug)]
pub enum FontError {
    #[error("failed to parse font: {0}")]
    Parse(#[from] ttf_parser::FaceParsingError),

    #[error("font reports zero units per em")]
    InvalidUnitsPerEm,
}

/// Service registry errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// A handler was registered twice under the same name
    #[error("Duplicate service handler: {name}")]
    Duplicate { name: String },
}

/// Result cache errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// The cache URI names a backend that does not exist
    #[error("Unsupported cache scheme: {scheme}")]
    UnsupportedScheme { scheme: String },

    /// The cache URI could not be parsed
    #[error("Invalid cache URI '{uri}': {message}")]
    InvalidUri { uri: String, message: String },

    /// A writer panicked while holding the lock
    #[error("Cache lock poisoned during {operation}")]
    Poisoned { operation: &'static str },
}

/// Errors raised while talking to a third-party API
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// Transport level failure (DNS, connect, reset, body read)
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx response
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The API refused the request because the rate limit is exhausted
    #[error("rate limit exceeded for {url}")]
    RateLimited { url: String },

    /// The response body did not have the expected shape
    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    /// The API answered but had nothing to report
    #[error("{message}")]
    Empty { message: String },

    /// The request deadline expired before the call completed
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Errors returned by a service handler
#[derive(Error, Debug)]
pub enum HandlerError {
    /// Missing or malformed path parameters
    #[error("{message}")]
    InvalidParameters { message: String },

    /// The first parameter named a sub-command the handler does not know
    #[error("An unknown service command was called: {command}")]
    UnknownCommand { command: String },

    /// An upstream call failed; `context` names the step that was attempted
    #[error("{context}: {source}")]
    Upstream {
        context: String,
        #[source]
        source: UpstreamError,
    },

    /// The request deadline expired while the handler was running
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Errors surfaced by the registry to the HTTP layer
#[derive(Error, Debug)]
pub enum DispatchError {
    /// No enabled handler is registered under this name
    #[error("Service not found: {name}")]
    NotFound { name: String },

    /// The handler ran and failed
    #[error("executing service {service}: {source}")]
    Failed {
        service: String,
        #[source]
        source: HandlerError,
    },
}

impl AppError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an asset error
    pub fn asset<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::Asset {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl UpstreamError {
    pub fn decode<U: Into<String>, M: ToString>(url: U, message: M) -> Self {
        Self::Decode {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn empty<S: Into<String>>(message: S) -> Self {
        Self::Empty {
            message: message.into(),
        }
    }
}

impl HandlerError {
    /// Create a parameter validation error
    pub fn invalid_parameters<S: Into<String>>(message: S) -> Self {
        Self::InvalidParameters {
            message: message.into(),
        }
    }

    /// Create an unknown sub-command error
    pub fn unknown_command<S: Into<String>>(command: S) -> Self {
        Self::UnknownCommand {
            command: command.into(),
        }
    }

    /// Wrap an upstream failure with the step that was attempted
    pub fn upstream<S: Into<String>>(context: S, source: UpstreamError) -> Self {
        Self::Upstream {
            context: context.into(),
            source,
        }
    }

    /// Whether the failure was caused by the request rather than the upstream
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameters { .. } | Self::UnknownCommand { .. }
        )
    }
}

impl DispatchError {
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Failed { source, .. } => source.is_client_error(),
        }
    }
}

/// Attach a "what was attempted" label to upstream results
pub trait UpstreamContext<T> {
    fn context<S: Into<String>>(self, context: S) -> Result<T, HandlerError>;
}

impl<T> UpstreamContext<T> for Result<T, UpstreamError> {
    fn context<S: Into<String>>(self, context: S) -> Result<T, HandlerError> {
        self.map_err(|source| HandlerError::upstream(context, source))
    }
}
