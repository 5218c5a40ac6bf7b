//! Disassembly driver.
//!
//! Merges the decoded instruction stream, the line table and operand
//! annotations of one code object into listing rows, grouped by source
//! line. The output mirrors the classic `dis` listing: the line number
//! is printed on the first instruction of each line, and a blank row
//! separates consecutive line groups.

pub mod listing;

use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use pydis_core::{
    CodeObject, Compiler, Decoder, DisError, LineCursor, LineTable, OpcodeTable, OperandError,
    Resolver, Target,
};

pub use listing::{render_listing, write_listing, ListingConfig};

/// Resolved operand text, or why it could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Annotation {
    Resolved(String),
    Unresolved(OperandError),
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Annotation::Resolved(text) => f.write_str(text),
            // Placeholder: the raw index.
            Annotation::Unresolved(e) => write!(f, "{}", e.index),
        }
    }
}

/// One decoded instruction with its line and annotation attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsnRow<'t> {
    pub line: u32,
    /// First instruction of its line group.
    pub starts_line: bool,
    pub offset: usize,
    pub opcode: u8,
    pub mnemonic: &'t str,
    pub operand: Option<u32>,
    pub annotation: Option<Annotation>,
}

/// A listing row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Row<'t> {
    /// Blank row between line groups.
    Separator,
    Insn(InsnRow<'t>),
}

impl<'t> Row<'t> {
    pub fn insn(&self) -> Option<&InsnRow<'t>> {
        match self {
            Row::Insn(r) => Some(r),
            Row::Separator => None,
        }
    }
}

/// Disassembler bound to one opcode table.
#[derive(Debug, Clone, Copy)]
pub struct Disassembler<'t> {
    table: &'t OpcodeTable,
}

impl<'t> Disassembler<'t> {
    pub fn new(table: &'t OpcodeTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &'t OpcodeTable {
        self.table
    }

    /// Lazy row stream over `code`. Fails up front only if the line
    /// table is malformed; decode errors surface from the iterator.
    pub fn rows<'c>(&self, code: &'c CodeObject) -> Result<Rows<'c, 't>, DisError> {
        let lines = LineTable::decode(&code.line_table, code.first_line)?;
        debug!(
            name = %code.name,
            bytes = code.raw_code.len(),
            line_starts = lines.starts().len(),
            "disassembling code object"
        );
        Ok(Rows {
            decoder: Decoder::new(&code.raw_code, self.table),
            resolver: Resolver::new(code, self.table),
            lines: lines.into_cursor(),
            last_line: None,
            pending: None,
        })
    }

    /// Disassemble `code` into rows. A decode error discards all output.
    pub fn disassemble(&self, code: &CodeObject) -> Result<Vec<Row<'t>>, DisError> {
        let rows = self.rows(code)?.collect::<Result<Vec<_>, _>>()?;
        debug!(name = %code.name, rows = rows.len(), "disassembly complete");
        Ok(rows)
    }

    /// Disassemble a code object, function-like value or source string.
    pub fn disassemble_target(
        &self,
        target: Target<'_>,
        compiler: &dyn Compiler,
    ) -> Result<Vec<Row<'t>>, DisError> {
        let code = target.code_object(compiler)?;
        self.disassemble(&code)
    }
}

/// Row iterator produced by [`Disassembler::rows`].
pub struct Rows<'c, 't> {
    decoder: Decoder<'c, 't>,
    resolver: Resolver<'c, 't>,
    lines: LineCursor,
    /// Line of the previous instruction row.
    last_line: Option<u32>,
    /// Instruction row held back while its separator is yielded.
    pending: Option<InsnRow<'t>>,
}

impl<'t> Iterator for Rows<'_, 't> {
    type Item = Result<Row<'t>, DisError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(row) = self.pending.take() {
            return Some(Ok(Row::Insn(row)));
        }

        let insn = match self.decoder.next()? {
            Ok(insn) => insn,
            Err(e) => return Some(Err(e)),
        };

        // A boundary crossed mid-instruction can land back on the same
        // line; only a changed line opens a new group.
        let line = match (self.lines.advance(insn.offset), self.last_line) {
            (Some(start), _) => start.line,
            (None, Some(line)) => line,
            (None, None) => self.lines.table().line_at(insn.offset),
        };
        let prev_line = self.last_line.replace(line);

        let annotation = match self.resolver.resolve(&insn) {
            Ok(text) => text.map(Annotation::Resolved),
            Err(e) => {
                warn!(error = %e, mnemonic = %insn.mnemonic(), "unresolved operand");
                Some(Annotation::Unresolved(e))
            }
        };

        let row = InsnRow {
            line,
            starts_line: prev_line != Some(line),
            offset: insn.offset,
            opcode: insn.opcode,
            mnemonic: insn.def.name.as_ref(),
            operand: insn.arg,
            annotation,
        };

        if row.starts_line && prev_line.is_some() {
            self.pending = Some(row);
            Some(Ok(Row::Separator))
        } else {
            Some(Ok(Row::Insn(row)))
        }
    }
}
