//! DWS method file rendering.
//!
//! A DWS file is INI-like:
//!
//! ```text
//! [Properties]
//! Name=DWSoutput
//! Comment=
//! DWS-ability=0x0000FF06
//!
//! [Version]
//! Name=DWSoutput240101-0930.dws
//! Struktur=PrgStruc 0.21
//!
//! [001]
//! OpcodeStr=Comment
//! Opcode=113
//! Bezeichner=Start
//!
//! ```
//!
//! Command sections are numbered from the configured start index and
//! zero-padded to three digits.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

use crate::config::ConversionOptions;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Opcode, ParameterSet, ResolvedCommand};
use crate::transform::opcodes::spec;

pub const DWS_ABILITY: &str = "0x0000FF06";
pub const STRUCTURE_VERSION: &str = "PrgStruc 0.21";

/// Ordered command sections of one method.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionList {
    start_index: u32,
    commands: Vec<ResolvedCommand>,
}

impl SectionList {
    pub fn new(start_index: u32) -> Self {
        Self {
            start_index,
            commands: Vec::new(),
        }
    }

    pub fn push(&mut self, command: ResolvedCommand) {
        self.commands.push(command);
    }

    /// Append the PostRun and End trailers.
    pub fn push_trailers(&mut self) {
        for opcode in [Opcode::PostRun, Opcode::End] {
            self.commands
                .push(ResolvedCommand::new(opcode, spec(opcode).template(), None));
        }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn start_index(&self) -> u32 {
        self.start_index
    }

    pub fn commands(&self) -> &[ResolvedCommand] {
        &self.commands
    }

    /// `(section number, command)` pairs in output order.
    ///
    /// Numbers are widened to `u64` so a start index near `u32::MAX` keeps
    /// counting up instead of wrapping.
    pub fn numbered(&self) -> impl Iterator<Item = (u64, &ResolvedCommand)> {
        (u64::from(self.start_index)..).zip(self.commands.iter())
    }
}

/// A complete method file.
#[derive(Debug, Clone)]
pub struct DwsDocument {
    pub properties: ParameterSet,
    pub version: ParameterSet,
    pub sections: SectionList,
}

impl DwsDocument {
    /// Build the document, taking `[Version] Name` from `file_name`.
    pub fn new(options: &ConversionOptions, file_name: &str, sections: SectionList) -> Self {
        let properties = [
            ("Name", options.method_name.as_str()),
            ("Comment", options.method_comment.as_str()),
            ("DWS-ability", DWS_ABILITY),
        ]
        .into_iter()
        .collect();

        let version = [("Name", file_name), ("Struktur", STRUCTURE_VERSION)]
            .into_iter()
            .collect();

        Self {
            properties,
            version,
            sections,
        }
    }

    /// Render the whole file.
    pub fn render(&self) -> String {
        let mut out = String::new();
        render_section(&mut out, "Properties", &self.properties);
        render_section(&mut out, "Version", &self.version);
        for (number, command) in self.sections.numbered() {
            render_section(&mut out, &section_name(number), command.params());
        }
        out
    }

    /// Render and write to `path`.
    pub fn write_to(&self, path: &Path) -> PipelineResult<()> {
        std::fs::write(path, self.render()).map_err(|source| PipelineError::Write {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Section header name for a command number: `7` → `"007"`.
pub fn section_name(number: u64) -> String {
    format!("{:03}", number)
}

/// Append `[name]`, one `key=value` line per field and a blank line.
pub fn render_section(out: &mut String, name: &str, params: &ParameterSet) {
    let _ = writeln!(out, "[{}]", name);
    for (key, value) in params.iter() {
        let _ = writeln!(out, "{}={}", key, value);
    }
    out.push('\n');
}

/// Default output file name: `<method><yymmdd-HHMM>.dws`.
pub fn default_file_name(method_name: &str, now: DateTime<Local>) -> String {
    format!("{}{}.dws", method_name, now.format("%y%m%d-%H%M"))
}
