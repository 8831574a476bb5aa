//! Merge a CSV row into its opcode's template.

use super::implosion::expand_imploded;
use super::opcodes::{lookup, opcode_by_name, spec};
use crate::config::ConversionOptions;
use crate::models::{Opcode, ParameterSet, RawRow};

/// Column holding the numeric opcode.
pub const OPCODE_COLUMN: &str = "Opcode";
/// Column holding the opcode's display name.
pub const OPCODE_LABEL_COLUMN: &str = "OpcodeStr";

/// How a row's opcode was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpcodeSource {
    /// The `Opcode` cell holds a known code
    Code,
    /// The `Opcode` cell is empty and `OpcodeStr` names a known opcode
    Label,
    /// Neither identifies an opcode; [`Opcode::FALLBACK`] is used
    Fallback,
}

/// Determine the opcode of a row.
pub fn opcode_of(row: &RawRow) -> (Opcode, OpcodeSource) {
    let code = row.cell(OPCODE_COLUMN).trim();
    if let Some(op) = Opcode::from_code(code) {
        return (op, OpcodeSource::Code);
    }
    if code.is_empty() {
        if let Some(op) = opcode_by_name(row.cell(OPCODE_LABEL_COLUMN)) {
            return (op, OpcodeSource::Label);
        }
    }
    (Opcode::FALLBACK, OpcodeSource::Fallback)
}

/// Resolve a row into a candidate parameter set.
///
/// Starting from the template of `code` (or the fallback template), each
/// column of the row, in row order:
///
/// - overwrites the template key of the same name if the cell is non-empty;
/// - otherwise, if it is a packed column of the opcode, contributes its
///   expanded pairs, which win over template keys;
/// - otherwise has no effect.
///
/// `Opcode` always holds the code of the template actually used.
pub fn resolve(row: &RawRow, code: &str, options: &ConversionOptions) -> ParameterSet {
    let entry = spec(lookup(code).0);
    let rules = entry.implosion_rules();
    let mut params = entry.template();

    for (column, cell) in row.iter() {
        if params.contains_key(column) {
            if !cell.is_empty() {
                params.insert(column, cell);
            }
        } else if rules.contains_key(column) {
            params.merge(expand_imploded(&rules, column, cell, options.separator));
        }
    }

    params.insert(OPCODE_COLUMN, entry.opcode.code());
    params
}
