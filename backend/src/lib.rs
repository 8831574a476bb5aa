//! # dwsgen - CSV protocol sheets to epMotion DWS method files
//!
//! Each CSV row describes one robot command. dwsgen fills in the command's
//! default fields, expands packed multi-value cells, drops rows that leave
//! required fields empty, and writes the result as numbered DWS sections.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV sheets │────▶│   Parser    │────▶│   Merger    │────▶│  Validator  │────▶│  DWS file   │
//! │ (in order)  │     │ (auto-enc)  │     │ (templates) │     │ (required)  │     │ (sections)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dwsgen::{convert_and_write, ConversionOptions};
//! use std::path::PathBuf;
//!
//! let (result, path) = convert_and_write(&[PathBuf::from("protocol.csv")], &ConversionOptions::default())?;
//! println!("{} sections written to {}", result.sections().len(), path.display());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types
//! - [`config`] - Conversion options
//! - [`models`] - Opcode, parameter set, rows and resolved commands
//! - [`parser`] - CSV reading with auto-detection
//! - [`transform`] - Opcode table, packed columns, merging and the pipeline
//! - [`validation`] - Required-field checks
//! - [`dws`] - DWS rendering
//! - [`api`] - HTTP API server and log channel

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Resolution
pub mod transform;

// Validation
pub mod validation;

// Output
pub mod dws;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Errors and configuration
// =============================================================================

pub use config::ConversionOptions;
pub use error::{ConfigError, CsvError, PipelineError, ServerError, ValidationError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Opcode, ParameterSet, RawRow, ResolvedCommand, RowOrigin};

// =============================================================================
// Re-exports - Core
// =============================================================================

pub use transform::{
    defaults_for,
    expand_imploded,
    implosion_rules_for,
    opcode_of,
    required_fields_for,
    resolve,
};

pub use validation::{accept, is_valid, validate};

// =============================================================================
// Re-exports - Parser, output and pipeline
// =============================================================================

pub use parser::{parse_bytes_auto, parse_csv_file_auto, ParsedSheet};

pub use dws::{DwsDocument, SectionList};

pub use transform::pipeline::{
    convert_and_write,
    convert_bytes,
    convert_files,
    convert_sheets,
    ConversionResult,
    CsvInfo,
    FallbackRow,
    RejectedRow,
};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
