//! Instruction stream decoder.
//!
//! Walks `raw_code` left to right: read one opcode byte, look up its
//! operand class, then read a 16-bit little-endian operand if the class
//! carries one. `EXTENDED_ARG` prefixes are folded into the operand of
//! the instruction that follows them.

use tracing::trace;

use crate::error::DisError;
use crate::opcode::{OpDef, OpcodeTable, OPERAND_SIZE};

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction<'t> {
    /// Offset of the opcode byte.
    pub offset: usize,
    pub opcode: u8,
    pub def: &'t OpDef,
    /// Present iff the opcode carries an operand. Includes any pending
    /// `EXTENDED_ARG` high bits.
    pub arg: Option<u32>,
    /// Encoded width in bytes.
    pub size: usize,
}

impl Instruction<'_> {
    pub fn mnemonic(&self) -> &str {
        &self.def.name
    }

    pub fn has_operand(&self) -> bool {
        self.arg.is_some()
    }

    /// Offset of the following instruction.
    pub fn next_offset(&self) -> usize {
        self.offset + self.size
    }
}

/// Lazy decoder over a code object's instruction stream.
///
/// Yields instructions in offset order. After the first error the
/// iterator is exhausted: instruction boundaries past a bad opcode or a
/// truncated operand are meaningless.
#[derive(Debug, Clone)]
pub struct Decoder<'a, 't> {
    code: &'a [u8],
    table: &'t OpcodeTable,
    pos: usize,
    /// High bits carried by a preceding `EXTENDED_ARG`.
    extended: u32,
    failed: bool,
}

impl<'a, 't> Decoder<'a, 't> {
    pub fn new(code: &'a [u8], table: &'t OpcodeTable) -> Self {
        Self {
            code,
            table,
            pos: 0,
            extended: 0,
            failed: false,
        }
    }

    /// Offset of the next opcode to be read.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn decode_one(&mut self) -> Result<Instruction<'t>, DisError> {
        let offset = self.pos;
        let opcode = self.code[offset];
        let def = self.table.lookup(opcode, offset)?;

        if !def.has_operand() {
            self.pos += 1;
            return Ok(Instruction {
                offset,
                opcode,
                def,
                arg: None,
                size: 1,
            });
        }

        let start = offset + 1;
        let available = self.code.len() - start;
        if available < OPERAND_SIZE {
            return Err(DisError::TruncatedStream {
                offset,
                mnemonic: def.name.to_string(),
                needed: OPERAND_SIZE,
                available,
            });
        }
        let low = u16::from_le_bytes([self.code[start], self.code[start + 1]]) as u32;
        let arg = low | self.extended;
        self.extended = if Some(opcode) == self.table.extended_arg() {
            arg << 16
        } else {
            0
        };
        self.pos = start + OPERAND_SIZE;

        Ok(Instruction {
            offset,
            opcode,
            def,
            arg: Some(arg),
            size: 1 + OPERAND_SIZE,
        })
    }
}

impl<'t> Iterator for Decoder<'_, 't> {
    type Item = Result<Instruction<'t>, DisError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.code.len() {
            return None;
        }
        let result = self.decode_one();
        match &result {
            Ok(insn) => trace!(
                offset = insn.offset,
                mnemonic = %insn.mnemonic(),
                arg = ?insn.arg,
                "decoded instruction"
            ),
            Err(_) => self.failed = true,
        }
        Some(result)
    }
}

impl std::iter::FusedIterator for Decoder<'_, '_> {}

/// Decode the whole stream, stopping at the first error.
pub fn decode_all<'t>(
    code: &[u8],
    table: &'t OpcodeTable,
) -> Result<Vec<Instruction<'t>>, DisError> {
    Decoder::new(code, table).collect()
}
