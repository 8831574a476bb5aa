//! Command-option resolution.
//!
//! - Opcodes: per-opcode templates, required fields and packed columns
//! - Implosion: packed column expansion
//! - Merger: row + template → candidate parameter set
//! - Pipeline: sheets → validated sections → DWS document

pub mod implosion;
pub mod merger;
pub mod opcodes;
pub mod pipeline;

pub use implosion::{expand_imploded, DEFAULT_SEPARATOR};
pub use merger::{opcode_of, resolve, OpcodeSource};
pub use opcodes::{defaults_for, implosion_rules_for, required_fields_for, ImplosionRules, OpcodeSpec};
pub use pipeline::*;
