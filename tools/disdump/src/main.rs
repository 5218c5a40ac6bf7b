//! pydis-dump — print the disassembly of a code object bundle.
//!
//! Reads a JSON code object (see `pydis_core::code`), decodes it with
//! the builtin opcode table or one loaded with `--opcodes`, and prints
//! the listing or the rows as JSON.

use std::env;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::process;

use anyhow::{bail, Context as _, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use pydis_core::{CodeObject, OpcodeSpec, OpcodeTable};
use pydis_disas::{write_listing, Disassembler, ListingConfig};

struct Args {
    bundle_path: String,
    opcodes: Option<String>,
    output: Option<String>,
    json: bool,
    listing: ListingConfig,
}

const USAGE: &str = "\
usage: pydis-dump <bundle.json> [options]

Options:
  --opcodes <file>     Opcode table spec (JSON, default: builtin)
  -o <file>            Output to file
  --json               Emit rows as JSON instead of a listing
  --line-width <n>     Width of the line-number column (default: 8)
  --no-separators      Do not separate line groups with blank lines
  -h, --help           Show this help

Set RUST_LOG=debug for decoder diagnostics on stderr.";

fn parse_args(args: &[String]) -> Result<Args> {
    let mut a = Args {
        bundle_path: String::new(),
        opcodes: None,
        output: None,
        json: false,
        listing: ListingConfig::default(),
    };

    let mut i = 1;
    while i < args.len() {
        let value = |i: usize| -> Result<String> {
            args.get(i + 1)
                .cloned()
                .with_context(|| format!("{} expects a value", args[i]))
        };
        match args[i].as_str() {
            "--opcodes" => {
                a.opcodes = Some(value(i)?);
                i += 1;
            }
            "-o" => {
                a.output = Some(value(i)?);
                i += 1;
            }
            "--json" => a.json = true,
            "--line-width" => {
                a.listing.line_width = value(i)?
                    .parse()
                    .context("invalid --line-width")?;
                i += 1;
            }
            "--no-separators" => a.listing.separators = false,
            other if other.starts_with('-') => bail!("unknown option: {other}"),
            path => {
                if !a.bundle_path.is_empty() {
                    bail!("unexpected argument: {path}");
                }
                a.bundle_path = path.to_string();
            }
        }
        i += 1;
    }

    if a.bundle_path.is_empty() {
        bail!("missing <bundle.json>");
    }
    Ok(a)
}

fn load_table(path: Option<&str>) -> Result<OpcodeTable> {
    let Some(path) = path else {
        return Ok(OpcodeTable::cpython35());
    };
    let text = fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    let spec: OpcodeSpec =
        serde_json::from_str(&text).with_context(|| format!("invalid opcode spec {path}"))?;
    let table = OpcodeTable::from_spec(spec).with_context(|| format!("bad opcode table {path}"))?;
    info!(path, opcodes = table.len(), "loaded opcode table");
    Ok(table)
}

fn run(args: Args) -> Result<()> {
    let table = load_table(args.opcodes.as_deref())?;

    let text = fs::read_to_string(&args.bundle_path)
        .with_context(|| format!("failed to read {}", args.bundle_path))?;
    let code: CodeObject = serde_json::from_str(&text)
        .with_context(|| format!("invalid code object {}", args.bundle_path))?;
    info!(name = %code.name, bytes = code.raw_code.len(), "loaded code object");

    let rows = Disassembler::new(&table)
        .disassemble(&code)
        .with_context(|| format!("cannot disassemble {}", code.name))?;

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => {
            let f = fs::File::create(path).with_context(|| format!("cannot create {path}"))?;
            Box::new(BufWriter::new(f))
        }
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    if args.json {
        serde_json::to_writer_pretty(&mut out, &rows)?;
        writeln!(out)?;
    } else {
        write_listing(&rows, &table, &args.listing, &mut out)?;
    }
    out.flush()?;
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let argv: Vec<String> = env::args().collect();
    if argv.iter().skip(1).any(|a| a == "-h" || a == "--help") {
        eprintln!("{USAGE}");
        process::exit(0);
    }
    let args = match parse_args(&argv) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{e}\n\n{USAGE}");
            process::exit(1);
        }
    };

    if let Err(e) = run(args) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}
