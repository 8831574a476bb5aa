//! REST API types.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::transform::opcodes::OpcodeSpec;
use crate::transform::pipeline::{ConversionResult, CsvInfo, RejectedRow};

/// Response sent after a CSV upload is converted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    /// Unique job identifier
    pub job_id: String,

    /// Status: "ready" (every row accepted), "warning" (some rows rejected)
    pub status: String,

    /// Suggested file name for the method
    pub file_name: String,

    /// DWS file content
    pub dws: String,

    /// Metadata about the conversion
    pub metadata: ResponseMetadata,
}

/// Metadata about the conversion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    /// Number of command sections, trailers included
    pub section_count: usize,

    /// Rows turned into sections
    pub accepted: usize,

    /// Rows dropped by validation
    pub rejected: Vec<RejectedRowInfo>,

    /// Rows that used the fallback opcode
    pub fallback_count: usize,

    /// Uploaded sheets, in processing order
    pub sources: Vec<CsvMetadata>,
}

/// A rejected row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedRowInfo {
    pub source: String,
    pub line: usize,
    pub opcode: String,
    pub reason: String,
}

/// CSV file metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvMetadata {
    pub source: String,
    pub encoding: String,
    pub delimiter: String,
    pub row_count: usize,
    pub columns: Vec<String>,
}

/// One entry of `GET /api/opcodes`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpcodeInfo {
    pub code: String,
    pub name: String,
    pub required: Vec<String>,
    pub packed_columns: Vec<String>,
}

impl From<&RejectedRow> for RejectedRowInfo {
    fn from(row: &RejectedRow) -> Self {
        Self {
            source: row.origin.source.clone(),
            line: row.origin.line,
            opcode: row.opcode.clone(),
            reason: row.reason.clone(),
        }
    }
}

impl From<&CsvInfo> for CsvMetadata {
    fn from(info: &CsvInfo) -> Self {
        Self {
            source: info.source.clone(),
            encoding: info.encoding.clone(),
            delimiter: info.delimiter.to_string(),
            row_count: info.row_count,
            columns: info.headers.clone(),
        }
    }
}

impl From<&OpcodeSpec> for OpcodeInfo {
    fn from(spec: &OpcodeSpec) -> Self {
        Self {
            code: spec.opcode.code().to_string(),
            name: spec.name.to_string(),
            required: spec.required.iter().map(|f| f.to_string()).collect(),
            packed_columns: spec.implosion.iter().map(|(col, _)| col.to_string()).collect(),
        }
    }
}

impl From<&ConversionResult> for ConvertResponse {
    fn from(result: &ConversionResult) -> Self {
        ConvertResponse {
            job_id: Uuid::new_v4().to_string(),
            status: if result.rejected.is_empty() { "ready" } else { "warning" }.to_string(),
            file_name: result.file_name.clone(),
            dws: result.document.render(),
            metadata: ResponseMetadata {
                section_count: result.sections().len(),
                accepted: result.accepted,
                rejected: result.rejected.iter().map(RejectedRowInfo::from).collect(),
                fallback_count: result.fallbacks.len(),
                sources: result.sources.iter().map(CsvMetadata::from).collect(),
            },
        }
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
        "dws": "",
        "metadata": {
            "sectionCount": 0,
            "accepted": 0,
            "rejected": [],
            "fallbackCount": 0,
            "sources": []
        }
    })
}
