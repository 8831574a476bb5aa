//! Domain models for the dwsgen conversion pipeline.
//!
//! - [`Opcode`] - The closed set of epMotion command kinds
//! - [`ParameterSet`] - Ordered field → value mapping for one command
//! - [`RawRow`] - One CSV record with its origin
//! - [`ResolvedCommand`] - A validated parameter set, ready to be emitted

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Opcode
// =============================================================================

/// Command kind understood by the robot.
///
/// The discriminant is the numeric code written to the `Opcode` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    SampleTransfer,
    Wait,
    Comment,
    UserIntervention,
    PlaceIt,
    PreRun,
    PostRun,
    NumberOfSamples,
    Thermomixer,
    End,
}

impl Opcode {
    /// Every known opcode, in code order.
    pub const ALL: [Opcode; 10] = [
        Opcode::SampleTransfer,
        Opcode::Wait,
        Opcode::Comment,
        Opcode::UserIntervention,
        Opcode::PlaceIt,
        Opcode::PreRun,
        Opcode::PostRun,
        Opcode::NumberOfSamples,
        Opcode::Thermomixer,
        Opcode::End,
    ];

    /// Opcode substituted for unrecognized codes.
    pub const FALLBACK: Opcode = Opcode::SampleTransfer;

    /// The string code as it appears in CSV and DWS files.
    pub fn code(self) -> &'static str {
        match self {
            Opcode::SampleTransfer => "101",
            Opcode::Wait => "112",
            Opcode::Comment => "113",
            Opcode::UserIntervention => "114",
            Opcode::PlaceIt => "115",
            Opcode::PreRun => "116",
            Opcode::PostRun => "117",
            Opcode::NumberOfSamples => "118",
            Opcode::Thermomixer => "123",
            Opcode::End => "129",
        }
    }

    /// Look up a known code. Surrounding whitespace is ignored.
    pub fn from_code(code: &str) -> Option<Opcode> {
        let code = code.trim();
        Opcode::ALL.into_iter().find(|op| op.code() == code)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// =============================================================================
// Parameter Set
// =============================================================================

/// Ordered mapping from field name to value.
///
/// Values are always strings; `""` means "unset". Insertion order is kept
/// so emitted sections read in template order, but it carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(IndexMap<String, String>);

impl ParameterSet {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Get a field value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Insert or overwrite a field. Overwriting keeps the original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Merge every pair of `other` into `self`; `other` wins on collision.
    pub fn merge(&mut self, other: ParameterSet) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

// =============================================================================
// Raw Row
// =============================================================================

/// Where a row came from, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowOrigin {
    /// File name (or upload name) of the CSV sheet
    pub source: String,
    /// 1-based line number in the sheet (the header is line 1)
    pub line: usize,
}

impl fmt::Display for RowOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, line {}", self.source, self.line)
    }
}

/// One CSV record: column header → cell, in column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawRow {
    pub origin: RowOrigin,
    pub cells: IndexMap<String, String>,
}

impl RawRow {
    pub fn new(origin: RowOrigin, cells: IndexMap<String, String>) -> Self {
        Self { origin, cells }
    }

    /// Build a row from `(column, cell)` pairs. Mostly useful in tests.
    pub fn from_pairs<K, V>(source: &str, line: usize, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            origin: RowOrigin {
                source: source.to_string(),
                line,
            },
            cells: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Cell value, or `""` if the column is absent.
    pub fn cell(&self, column: &str) -> &str {
        self.cells.get(column).map(String::as_str).unwrap_or("")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

// =============================================================================
// Resolved Command
// =============================================================================

/// A parameter set that passed validation.
///
/// Only the validator constructs these; the fields are read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedCommand {
    opcode: Opcode,
    params: ParameterSet,
    /// `None` for synthetic trailer commands
    origin: Option<RowOrigin>,
}

impl ResolvedCommand {
    pub(crate) fn new(opcode: Opcode, params: ParameterSet, origin: Option<RowOrigin>) -> Self {
        Self {
            opcode,
            params,
            origin,
        }
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn origin(&self) -> Option<&RowOrigin> {
        self.origin.as_ref()
    }

    pub fn is_trailer(&self) -> bool {
        self.origin.is_none()
    }
}
