//! Error types for the dwsgen conversion pipeline.
//!
//! - [`CsvError`] - CSV reading and decoding errors
//! - [`ConfigError`] - Invalid or unsupported conversion options
//! - [`ValidationError`] - A resolved command failed its required-field check
//! - [`PipelineError`] - Top-level orchestration errors
//! - [`ServerError`] - HTTP API errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// CSV Parsing Errors
// =============================================================================

/// Errors while reading a CSV protocol sheet.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Malformed CSV record.
    #[error("{source_name}, line {line}: {message}")]
    Parse {
        source_name: String,
        line: usize,
        message: String,
    },

    /// Empty file.
    #[error("CSV file '{0}' is empty")]
    EmptyFile(String),

    /// No headers found.
    #[error("No headers found in '{0}'")]
    NoHeaders(String),

    /// A column every protocol sheet must carry is absent.
    #[error("'{source_name}' has no '{column}' column")]
    MissingColumn { source_name: String, column: String },
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors in [`crate::config::ConversionOptions`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Only strict merging (template keys only) is supported.
    #[error("Permissive merge mode is not supported; set strict_mode = true")]
    PermissiveModeUnsupported,

    /// The robot rejects method names longer than 20 characters.
    #[error("Method name '{0}' is longer than {max} characters", max = crate::config::MAX_METHOD_NAME_LEN)]
    MethodNameTooLong(String),

    /// The packed-value separator cannot be `=`.
    #[error("Invalid packed-value separator {0:?}")]
    InvalidSeparator(char),

    /// An environment variable could not be parsed.
    #[error("Invalid value for {var}: '{value}'")]
    InvalidEnv { var: String, value: String },

    /// Failed to read a config file.
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON.
    #[error("Invalid config file: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Validation Errors
// =============================================================================

/// A resolved command that cannot be loaded by the robot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Required field is absent or empty.
    #[error("Opcode {opcode}: required field '{field}' is empty")]
    MissingField { opcode: String, field: String },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// Returned by [`crate::transform::pipeline::convert_files`]. Per-row problems
/// never surface here; they are logged and the row is skipped.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// CSV reading error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Writing the DWS file failed.
    #[error("Failed to write '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// No input files given.
    #[error("No input files")]
    NoInput,
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Failed to bind or serve.
    #[error("Server IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for configuration.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let csv_err = CsvError::EmptyFile("protocol.csv".into());
        let pipeline_err: PipelineError = csv_err.into();
        assert!(pipeline_err.to_string().contains("protocol.csv"));

        let config_err = ConfigError::PermissiveModeUnsupported;
        let pipeline_err: PipelineError = config_err.into();
        assert!(pipeline_err.to_string().contains("strict_mode"));
    }

    #[test]
    fn test_validation_error_format() {
        let err = ValidationError::MissingField {
            opcode: "101".into(),
            field: "TransferVolumenNanoliter".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("101"));
        assert!(msg.contains("TransferVolumenNanoliter"));
    }

    #[test]
    fn test_method_name_error_mentions_limit() {
        let err = ConfigError::MethodNameTooLong("a_very_long_method_name_indeed".into());
        assert!(err.to_string().contains("20"));
    }
}
