//! Text listing of disassembled rows.
//!
//! Layout per instruction row:
//!
//! ```text
//! <line>  <offset> <MNEMONIC>          <operand> (<annotation>)
//! ```
//!
//! The line column is `line_width` wide and blank on continuation rows.
//! The operand column starts at `line_width + max_name_len`, so operands
//! line up for every mnemonic in the table.

use std::fmt::Write as _;
use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use pydis_core::OpcodeTable;

use crate::{InsnRow, Row};

/// Listing layout options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Width of the line-number column.
    pub line_width: usize,
    /// Emit a blank line between line groups.
    pub separators: bool,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            line_width: 8,
            separators: true,
        }
    }
}

/// Format one instruction row into `buf` (no trailing newline).
fn fmt_insn(row: &InsnRow<'_>, operand_col: usize, config: &ListingConfig, buf: &mut String) {
    let line = if row.starts_line {
        row.line.to_string()
    } else {
        String::new()
    };
    let width = config.line_width;
    // Writing into a String cannot fail.
    let _ = write!(buf, "{line:<width$}{} {}", row.offset, row.mnemonic);

    if let Some(arg) = row.operand {
        while buf.len() < operand_col {
            buf.push(' ');
        }
        let _ = write!(buf, "{arg}");
        if let Some(anno) = &row.annotation {
            let _ = write!(buf, " ({anno})");
        }
    }
}

/// Write `rows` to `w` as a text listing.
pub fn write_listing(
    rows: &[Row<'_>],
    table: &OpcodeTable,
    config: &ListingConfig,
    w: &mut impl Write,
) -> io::Result<()> {
    let operand_col = config.line_width + table.max_name_len();
    let mut buf = String::with_capacity(128);

    for row in rows {
        match row {
            Row::Separator => {
                if config.separators {
                    writeln!(w)?;
                }
            }
            Row::Insn(insn) => {
                buf.clear();
                fmt_insn(insn, operand_col, config, &mut buf);
                writeln!(w, "{buf}")?;
            }
        }
    }
    Ok(())
}

/// Render `rows` to a string.
pub fn render_listing(rows: &[Row<'_>], table: &OpcodeTable, config: &ListingConfig) -> String {
    let mut out = Vec::new();
    // Vec<u8> as io::Write is infallible.
    let _ = write_listing(rows, table, config, &mut out);
    String::from_utf8_lossy(&out).into_owned()
}
