//! High-level pipeline: CSV sheets in, DWS method out.
//!
//! Sheets are processed strictly in the given order, rows in file order.
//! Each row goes through [`resolve`] and [`accept`]; accepted commands are
//! appended to the [`SectionList`], rejected rows are logged and reported
//! in [`ConversionResult::rejected`]. After the last sheet the PostRun and
//! End trailers are appended.
//!
//! # Example
//!
//! ```rust,ignore
//! use dwsgen::{convert_files, ConversionOptions};
//! use std::path::PathBuf;
//!
//! let result = convert_files(&[PathBuf::from("protocol.csv")], &ConversionOptions::default())?;
//! result.document.write_to(&result.output_path())?;
//! ```

use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::merger::{opcode_of, resolve, OpcodeSource};
use crate::api::logs::{log_error, log_info, log_info_indent, log_success, log_warning};
use crate::config::ConversionOptions;
use crate::dws::{default_file_name, DwsDocument, SectionList};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Opcode, RawRow, RowOrigin};
use crate::parser::{parse_bytes_auto, parse_csv_file_auto, ParsedSheet};
use crate::transform::opcodes::spec;
use crate::validation::accept;

/// CSV sheet information
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvInfo {
    pub source: String,
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub row_count: usize,
}

impl From<&ParsedSheet> for CsvInfo {
    fn from(sheet: &ParsedSheet) -> Self {
        Self {
            source: sheet.source.clone(),
            encoding: sheet.encoding.clone(),
            delimiter: sheet.delimiter,
            headers: sheet.headers.clone(),
            row_count: sheet.rows.len(),
        }
    }
}

/// A row left out of the method.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedRow {
    pub origin: RowOrigin,
    pub opcode: String,
    pub reason: String,
}

/// A row whose opcode was not recognized and got the fallback template.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackRow {
    pub origin: RowOrigin,
    /// The unrecognized `Opcode` cell
    pub opcode: String,
}

/// Result of a complete conversion
#[derive(Debug, Clone)]
pub struct ConversionResult {
    /// The method file, ready to be written
    pub document: DwsDocument,
    /// Output file name (also written to `[Version] Name`)
    pub file_name: String,
    /// Output path requested in the options, if any
    pub output: Option<PathBuf>,
    /// Rows turned into sections (trailers excluded)
    pub accepted: usize,
    /// Rows dropped by validation
    pub rejected: Vec<RejectedRow>,
    /// Rows that fell back to the default opcode
    pub fallbacks: Vec<FallbackRow>,
    /// Per-sheet metadata, in processing order
    pub sources: Vec<CsvInfo>,
}

impl ConversionResult {
    /// Where to write the document: the configured output, or the
    /// generated file name in the current directory.
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(&self.file_name))
    }

    pub fn sections(&self) -> &SectionList {
        &self.document.sections
    }
}

/// Convert CSV files, in order, into one method.
pub fn convert_files(paths: &[PathBuf], options: &ConversionOptions) -> PipelineResult<ConversionResult> {
    if paths.is_empty() {
        return Err(PipelineError::NoInput);
    }
    options.validate()?;

    let mut sheets = Vec::with_capacity(paths.len());
    for path in paths {
        log_info(format!("📖 Reading {}", path.display()));
        sheets.push(parse_csv_file_auto(path)?);
    }
    convert_sheets(sheets, options)
}

/// Convert in-memory CSV uploads, in order, into one method.
pub fn convert_bytes(uploads: &[(String, Vec<u8>)], options: &ConversionOptions) -> PipelineResult<ConversionResult> {
    if uploads.is_empty() {
        return Err(PipelineError::NoInput);
    }
    options.validate()?;

    let sheets = uploads
        .iter()
        .map(|(name, bytes)| parse_bytes_auto(name, bytes))
        .collect::<Result<Vec<_>, _>>()?;
    convert_sheets(sheets, options)
}

/// Convert already-parsed sheets.
pub fn convert_sheets(sheets: Vec<ParsedSheet>, options: &ConversionOptions) -> PipelineResult<ConversionResult> {
    options.validate()?;

    let mut sections = SectionList::new(options.start_index);
    let mut rejected = Vec::new();
    let mut fallbacks = Vec::new();
    let mut sources = Vec::with_capacity(sheets.len());

    for sheet in &sheets {
        let info = CsvInfo::from(sheet);
        log_success(format!(
            "{}: {} rows, encoding {}, separator '{}'",
            info.source,
            info.row_count,
            info.encoding,
            format_delimiter(info.delimiter)
        ));
        log_info_indent(format!("columns: {}", info.headers.join(", ")), 1);
        sources.push(info);

        for row in &sheet.rows {
            let (opcode, how) = opcode_of(row);
            if how == OpcodeSource::Fallback {
                warn_fallback(row, opcode);
                fallbacks.push(FallbackRow {
                    origin: row.origin.clone(),
                    opcode: row.cell("Opcode").to_string(),
                });
            }

            let candidate = resolve(row, opcode.code(), options);
            match accept(opcode, candidate, Some(row.origin.clone())) {
                Ok(command) => sections.push(command),
                Err(err) => {
                    log_warning(format!("{}: not added to the method ({})", row.origin, err));
                    rejected.push(RejectedRow {
                        origin: row.origin.clone(),
                        opcode: opcode.code().to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }
    }

    let accepted = sections.len();
    sections.push_trailers();
    print_summary(accepted, &rejected, &fallbacks);

    let file_name = default_file_name(&options.method_name, Local::now());
    let document = DwsDocument::new(options, &file_name, sections);

    Ok(ConversionResult {
        document,
        file_name,
        output: options.output.clone(),
        accepted,
        rejected,
        fallbacks,
        sources,
    })
}

/// Convert files and write the method to disk. Returns the written path.
pub fn convert_and_write(paths: &[PathBuf], options: &ConversionOptions) -> PipelineResult<(ConversionResult, PathBuf)> {
    let result = convert_files(paths, options)?;
    let path = result.output_path();
    write_result(&result, &path)?;
    Ok((result, path))
}

/// Write a conversion result.
pub fn write_result(result: &ConversionResult, path: &Path) -> PipelineResult<()> {
    log_info(format!("💾 Writing {} sections to {}", result.sections().len(), path.display()));
    result.document.write_to(path)
}

fn warn_fallback(row: &RawRow, opcode: Opcode) {
    log_warning(format!(
        "{}: opcode '{}' not recognized, using {} ({}) defaults",
        row.origin,
        row.cell("Opcode"),
        opcode.code(),
        spec(opcode).name
    ));
}

fn print_summary(accepted: usize, rejected: &[RejectedRow], fallbacks: &[FallbackRow]) {
    log_success(format!("{} rows accepted", accepted));
    if !fallbacks.is_empty() {
        log_warning(format!("{} rows used the fallback opcode", fallbacks.len()));
    }
    if !rejected.is_empty() {
        log_error(format!("{} rows rejected", rejected.len()));
    }
}

/// Format delimiter for display
fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "TAB".to_string(),
        c => c.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSFER_HEADER: &str = "Opcode,OpcodeStr,Source1,Source_Pat_Z1,Source_Pat_S1,Destination1,Destination_Pat_Z1,Destination_Pat_S1,TransferVolumenNanoliter";

    fn upload(name: &str, content: &str) -> (String, Vec<u8>) {
        (name.to_string(), content.as_bytes().to_vec())
    }

    fn opts(start_index: u32) -> ConversionOptions {
        ConversionOptions {
            start_index,
            ..Default::default()
        }
    }

    #[test]
    fn test_comment_row_passes() {
        let csv = "Opcode,OpcodeStr\n113,Comment\n";
        let result = convert_bytes(&[upload("s.csv", csv)], &opts(1)).unwrap();

        assert_eq!(result.accepted, 1);
        let first = &result.sections().commands()[0];
        assert_eq!(first.params(), &spec(Opcode::Comment).template());
    }

    #[test]
    fn test_missing_volume_rejected() {
        let csv = format!("{}\n101,SampleTransfer,Reservoir,A,1,Plate,B,2,\n", TRANSFER_HEADER);
        let result = convert_bytes(&[upload("s.csv", &csv)], &opts(1)).unwrap();

        assert_eq!(result.accepted, 0);
        assert_eq!(result.rejected.len(), 1);
        assert_eq!(result.rejected[0].origin.line, 2);
        assert!(result.rejected[0].reason.contains("TransferVolumenNanoliter"));
        // only the trailers are left
        assert_eq!(result.sections().len(), 2);
    }

    #[test]
    fn test_two_rows_plus_trailers() {
        let csv = format!(
            "{}\n101,SampleTransfer,Reservoir,A,1,Plate,B,2,20000\n113,Comment,,,,,,,\n",
            TRANSFER_HEADER
        );
        let result = convert_bytes(&[upload("s.csv", &csv)], &opts(5)).unwrap();

        assert_eq!(result.sections().len(), 4);
        let numbers: Vec<u64> = result.sections().numbered().map(|(n, _)| n).collect();
        assert_eq!(numbers, vec![5, 6, 7, 8]);

        let opcodes: Vec<Opcode> = result.sections().commands().iter().map(|c| c.opcode()).collect();
        assert_eq!(
            opcodes,
            vec![Opcode::SampleTransfer, Opcode::Comment, Opcode::PostRun, Opcode::End]
        );
        assert!(result.document.render().contains("[008]\nOpcodeStr=End\nOpcode=129\n"));
    }

    #[test]
    fn test_place_it_packed_reagents() {
        let csv = "Opcode;OpcodeStr;MatDatei;MatName;BehaelterName;EnumMatType;EnumSlotNr;ReagenzNamen\n\
                   115;Place it;./top/dws/trth/SAR_Rack_1_5ml;SAR_Rack_1_5ml;Stocks;512;152;0=Foo|1=Bar\n";
        let result = convert_bytes(&[upload("s.csv", csv)], &opts(1)).unwrap();

        assert_eq!(result.accepted, 1);
        let params = result.sections().commands()[0].params();
        assert_eq!(params.get("ReagenzName_0"), Some("Foo"));
        assert_eq!(params.get("ReagenzName_1"), Some("Bar"));
        assert_eq!(params.get("EnumSlotNr"), Some("152"));
    }

    #[test]
    fn test_label_selects_template_when_code_empty() {
        let csv = "Opcode,OpcodeStr,MatDatei,MatName,BehaelterName,EnumMatType,EnumSlotNr,ReagenzNamen\n\
                   ,Place It,./top/dws/trth/Rack,Rack,Stocks,512,152,0=Foo\n";
        let result = convert_bytes(&[upload("s.csv", csv)], &opts(1)).unwrap();

        assert!(result.fallbacks.is_empty());
        let command = &result.sections().commands()[0];
        assert_eq!(command.opcode(), Opcode::PlaceIt);
        assert_eq!(command.params().get("Opcode"), Some("115"));
        assert_eq!(command.params().get("Stapelindex"), Some("0"));
        assert_eq!(command.params().get("ReagenzName_0"), Some("Foo"));
        assert!(!command.params().contains_key("Source1"));
    }

    #[test]
    fn test_unknown_opcode_falls_back() {
        let csv = format!("{}\n999,Mystery,Reservoir,A,1,Plate,B,2,20000\n", TRANSFER_HEADER);
        let result = convert_bytes(&[upload("s.csv", &csv)], &opts(1)).unwrap();

        assert_eq!(result.fallbacks.len(), 1);
        assert_eq!(result.fallbacks[0].opcode, "999");
        let command = &result.sections().commands()[0];
        assert_eq!(command.opcode(), Opcode::SampleTransfer);
        assert_eq!(command.params().get("Opcode"), Some("101"));
    }

    #[test]
    fn test_rejection_does_not_stop_batch() {
        let csv = format!(
            "{}\n113,Comment,,,,,,,\n101,SampleTransfer,,,,,,,\n112,Wait,,,,,,,\n",
            TRANSFER_HEADER
        );
        let result = convert_bytes(&[upload("s.csv", &csv)], &opts(1)).unwrap();

        assert_eq!(result.accepted, 2);
        assert_eq!(result.rejected.len(), 1);
        assert_eq!(result.rejected[0].origin.line, 3);
        let opcodes: Vec<Opcode> = result.sections().commands().iter().map(|c| c.opcode()).collect();
        assert_eq!(opcodes[..2], [Opcode::Comment, Opcode::Wait]);
    }

    #[test]
    fn test_sheets_processed_in_order() {
        let workspace = "Opcode,OpcodeStr,MatDatei,MatName,BehaelterName,EnumMatType,EnumSlotNr\n\
                         115,Place it,./top/dws/trth/Rack,Rack,Stocks,512,152\n";
        let protocol = "Opcode,OpcodeStr\n116,PreRun\n113,Comment\n";
        let result = convert_bytes(
            &[upload("workspace.csv", workspace), upload("protocol.csv", protocol)],
            &opts(1),
        )
        .unwrap();

        let opcodes: Vec<Opcode> = result.sections().commands().iter().map(|c| c.opcode()).collect();
        assert_eq!(
            opcodes,
            vec![Opcode::PlaceIt, Opcode::PreRun, Opcode::Comment, Opcode::PostRun, Opcode::End]
        );
        assert_eq!(result.sources.len(), 2);
        assert_eq!(result.sources[0].source, "workspace.csv");
        assert_eq!(result.sections().commands()[1].origin().unwrap().source, "protocol.csv");
    }

    #[test]
    fn test_empty_sheet_only_trailers() {
        let result = convert_bytes(&[upload("s.csv", "Opcode,OpcodeStr\n")], &opts(0)).unwrap();
        assert_eq!(result.accepted, 0);
        assert_eq!(result.sections().len(), 2);
        assert!(result.document.render().contains("[000]\nOpcodeStr=PostRun"));
    }

    #[test]
    fn test_max_start_index_keeps_increasing() {
        let csv = "Opcode,OpcodeStr\n113,Comment\n";
        let result = convert_bytes(&[upload("s.csv", csv)], &opts(u32::MAX)).unwrap();

        let numbers: Vec<u64> = result.sections().numbered().map(|(n, _)| n).collect();
        assert!(numbers.windows(2).all(|w| w[1] == w[0] + 1));
        assert!(result.document.render().contains("[4294967297]\nOpcodeStr=End"));
    }

    #[test]
    fn test_no_input() {
        assert!(matches!(
            convert_bytes(&[], &opts(1)),
            Err(PipelineError::NoInput)
        ));
        assert!(matches!(
            convert_files(&[], &opts(1)),
            Err(PipelineError::NoInput)
        ));
    }

    #[test]
    fn test_permissive_mode_refused() {
        let options = ConversionOptions {
            strict_mode: false,
            ..Default::default()
        };
        let result = convert_bytes(&[upload("s.csv", "Opcode,OpcodeStr\n113,Comment\n")], &options);
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_convert_and_write() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("protocol.csv");
        std::fs::write(&input, "Opcode,OpcodeStr,Bezeichner\n113,Comment,Hello\n").unwrap();

        let options = ConversionOptions {
            output: Some(dir.path().join("method.dws")),
            method_name: "Demo".into(),
            ..Default::default()
        };
        let (result, path) = convert_and_write(&[input], &options).unwrap();

        assert_eq!(path, dir.path().join("method.dws"));
        assert!(result.file_name.starts_with("Demo"));
        assert!(result.file_name.ends_with(".dws"));

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("[Properties]\nName=Demo\n"));
        assert!(written.contains(&format!("[Version]\nName={}\n", result.file_name)));
        assert!(written.contains("[001]\nOpcodeStr=Comment\nOpcode=113\nBezeichner=Hello\n"));
    }

    #[test]
    fn test_missing_input_file_is_fatal() {
        let err = convert_files(&[PathBuf::from("/nonexistent/protocol.csv")], &opts(1)).unwrap_err();
        assert!(matches!(err, PipelineError::Csv(_)));
    }
}
