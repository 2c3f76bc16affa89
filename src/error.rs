use thiserror::Error;

/// Errors raised while reading an orchestration file.
///
/// These are the only fatal errors in the crate: once a `ProcessFlow` exists,
/// every later stage degrades instead of failing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedSource {
    #[error("Designer data start marker '{0}' not found")]
    MissingStartMarker(&'static str),

    #[error("Designer data end sentinel '{0}' not found after the start marker")]
    MissingEndSentinel(&'static str),

    #[error("Embedded designer metadata is not well-formed: {0}")]
    InvalidMetadata(String),

    #[error("Orchestration does not declare a named service")]
    MissingFlowName,
}

/// Errors that can occur when loading binding metadata.
#[derive(Error, Debug, Clone)]
pub enum BindingError {
    #[error("Failed to parse binding JSON: {0}")]
    JsonParseError(String),

    #[error("Could not read binding file '{path}': {message}")]
    Io { path: String, message: String },
}

/// Errors that can occur when loading transformation options.
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("Failed to parse options TOML: {0}")]
    TomlParseError(String),

    #[error("Could not read options file '{path}': {message}")]
    Io { path: String, message: String },

    #[error("Invalid option '{name}': {message}")]
    InvalidValue { name: &'static str, message: String },
}
