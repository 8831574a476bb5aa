//! dwsgen CLI - Convert CSV protocol sheets to epMotion DWS method files
//!
//! # Main Commands
//!
//! ```bash
//! dwsgen convert workspace.csv protocol.csv   # Write a DWS method file
//! dwsgen serve                                # Start HTTP server (port 3000)
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! dwsgen resolve protocol.csv    # Show resolved sections and rejected rows as JSON
//! dwsgen parse protocol.csv      # Just parse CSV to JSON
//! dwsgen opcodes                 # Show the opcode table
//! ```

use clap::{Args, Parser, Subcommand};
use dwsgen::api::logs::LOG_BROADCASTER;
use dwsgen::transform::opcodes::all_specs;
use dwsgen::transform::pipeline::write_result;
use dwsgen::{convert_files, parse_csv_file_auto, ConversionOptions};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "dwsgen")]
#[command(about = "Convert CSV protocol sheets to epMotion DWS method files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert CSV sheets (in the given order) into one DWS file
    Convert {
        /// Input CSV files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output file (default: <method name><yymmdd-HHMM>.dws)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        options: OptionArgs,
    },

    /// Show resolved sections and rejected rows as JSON
    Resolve {
        /// Input CSV files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        options: OptionArgs,
    },

    /// Parse a CSV file and output its rows as JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show known opcodes, their required fields and packed columns
    Opcodes,

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        #[command(flatten)]
        options: OptionArgs,
    },
}

/// Flags layered over config file and environment.
#[derive(Args)]
struct OptionArgs {
    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of the first command section
    #[arg(long)]
    start_index: Option<u32>,

    /// Separator between packed key=value pairs
    #[arg(long)]
    separator: Option<char>,

    /// Method name (max 20 characters)
    #[arg(long)]
    method_name: Option<String>,

    /// Method comment
    #[arg(long)]
    comment: Option<String>,

    /// Only print warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl OptionArgs {
    fn load(self) -> Result<ConversionOptions, Box<dyn std::error::Error>> {
        LOG_BROADCASTER.set_quiet(self.quiet);

        let mut options = match self.config {
            Some(ref path) => ConversionOptions::from_file(path)?,
            None => ConversionOptions::default(),
        };
        options.apply_env()?;

        if let Some(start_index) = self.start_index {
            options.start_index = start_index;
        }
        if let Some(separator) = self.separator {
            options.separator = separator;
        }
        if let Some(method_name) = self.method_name {
            options.method_name = method_name;
        }
        if let Some(comment) = self.comment {
            options.method_comment = comment;
        }
        options.validate()?;
        Ok(options)
    }
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Convert {
            inputs,
            output,
            options,
        } => cmd_convert(&inputs, output, options),

        Commands::Resolve {
            inputs,
            output,
            options,
        } => cmd_resolve(&inputs, output.as_deref(), options),

        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

        Commands::Opcodes => cmd_opcodes(),

        Commands::Serve { port, options } => cmd_serve(port, options).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_convert(
    inputs: &[PathBuf],
    output: Option<PathBuf>,
    args: OptionArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut options = args.load()?;
    if output.is_some() {
        options.output = output;
    }

    eprintln!("📄 Converting {} sheet(s)", inputs.len());
    let result = convert_files(inputs, &options)?;
    let path = result.output_path();
    write_result(&result, &path)?;

    eprintln!("\n📊 Results:");
    eprintln!("   Sections: {} ({} rows + PostRun + End)", result.sections().len(), result.accepted);
    if !result.fallbacks.is_empty() {
        eprintln!("   ⚠️  Fallback opcode: {} rows", result.fallbacks.len());
    }
    if !result.rejected.is_empty() {
        eprintln!("   ❌ Rejected: {} rows", result.rejected.len());
        for row in result.rejected.iter().take(5) {
            eprintln!("     - {}: {}", row.origin, row.reason);
        }
    }
    eprintln!("\n✨ Done! {}", path.display());
    Ok(())
}

fn cmd_resolve(
    inputs: &[PathBuf],
    output: Option<&Path>,
    args: OptionArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = args.load()?;
    let result = convert_files(inputs, &options)?;

    let sections: Vec<_> = result
        .sections()
        .numbered()
        .map(|(number, command)| {
            json!({
                "section": dwsgen::dws::section_name(number),
                "opcode": command.opcode(),
                "origin": command.origin(),
                "params": command.params(),
            })
        })
        .collect();

    let report = json!({
        "sections": sections,
        "rejected": result.rejected,
        "fallbacks": result.fallbacks,
        "sources": result.sources,
    });

    write_output(&serde_json::to_string_pretty(&report)?, output)
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing CSV: {}", input.display());

    let sheet = parse_csv_file_auto(input)?;
    eprintln!("   Encoding: {}", sheet.encoding);
    eprintln!("   Delimiter: '{}'", format_delimiter(sheet.delimiter));
    eprintln!("   Columns: {}", sheet.headers.join(", "));
    eprintln!("✅ Parsed {} rows", sheet.rows.len());

    let rows: Vec<_> = sheet.rows.iter().map(|row| &row.cells).collect();
    let json = serde_json::to_string_pretty(&rows)?;
    write_output(&json, output)
}

fn cmd_opcodes() -> Result<(), Box<dyn std::error::Error>> {
    for spec in all_specs() {
        println!("{} {}", spec.opcode.code(), spec.name);
        println!("    required: {}", spec.required.join(", "));
        if !spec.implosion.is_empty() {
            let packed: Vec<String> = spec
                .implosion
                .iter()
                .map(|(column, prefix)| format!("{} → {}*", column, prefix))
                .collect();
            println!("    packed:   {}", packed.join(", "));
        }
    }
    Ok(())
}

async fn cmd_serve(port: u16, args: OptionArgs) -> Result<(), Box<dyn std::error::Error>> {
    let options = args.load()?;
    dwsgen::server::start_server(port, options).await?;
    Ok(())
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
