use miette::Diagnostic;
use thiserror::Error;

use crate::components::remote::RemoteError;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Environment error: {0}")]
    #[diagnostic(code(outlook_sync::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(outlook_sync::config),
        help("check the .env file, config/sync.toml and the command line flags")
    )]
    Config(String),

    #[error("Input error: {0}")]
    #[diagnostic(code(outlook_sync::input))]
    Input(String),

    #[error("Authentication error: {0}")]
    #[diagnostic(
        code(outlook_sync::auth),
        help("run `get_calendar_token` to authorize access to Google Calendar")
    )]
    Auth(String),

    #[error("Google Calendar API error: {0}")]
    #[diagnostic(code(outlook_sync::google_calendar))]
    GoogleCalendar(String),

    #[error("Remote calendar error: {0}")]
    #[diagnostic(code(outlook_sync::remote))]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    #[diagnostic(code(outlook_sync::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(outlook_sync::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(outlook_sync::other))]
    Other(String),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::GoogleCalendar(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type SyncResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create input errors
pub fn input_error(message: &str) -> Error {
    Error::Input(message.to_string())
}

/// Helper to create authentication errors
pub fn auth_error(message: &str) -> Error {
    Error::Auth(message.to_string())
}

/// Helper to create Google Calendar errors
pub fn google_calendar_error(message: &str) -> Error {
    Error::GoogleCalendar(message.to_string())
}

/// Helper to create other errors
pub fn other_error(message: &str) -> Error {
    Error::Other(message.to_string())
}
