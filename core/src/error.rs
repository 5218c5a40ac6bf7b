//! Error taxonomy for decoding and resolving bytecode.
//!
//! Stream-integrity failures ([`DisError`]) abort a disassembly because
//! offsets after the failure point cannot be trusted. Operand failures
//! ([`OperandError`]) only affect the annotation of one instruction.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::source::CompileError;

/// Fatal errors raised while decoding a code object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisError {
    /// Opcode byte has no entry in the opcode table; its width is unknown.
    #[error("unknown opcode {opcode} at offset {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },

    /// The stream ended inside an instruction's operand.
    #[error(
        "truncated stream at offset {offset}: {mnemonic} needs {needed} operand bytes, {available} left"
    )]
    TruncatedStream {
        offset: usize,
        mnemonic: String,
        needed: usize,
        available: usize,
    },

    /// The compressed line table cannot be decoded.
    #[error("malformed line table at byte {offset}: {reason}")]
    MalformedLineTable { offset: usize, reason: &'static str },

    /// The host compiler rejected a source string.
    #[error(transparent)]
    Compilation(#[from] CompileError),
}

impl DisError {
    /// Offset the error refers to, if any.
    ///
    /// For line-table errors this is the byte index into the table,
    /// not a bytecode offset.
    pub fn offset(&self) -> Option<usize> {
        match self {
            DisError::UnknownOpcode { offset, .. }
            | DisError::TruncatedStream { offset, .. }
            | DisError::MalformedLineTable { offset, .. } => Some(*offset),
            DisError::Compilation(_) => None,
        }
    }
}

/// Symbol table an operand indexes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolTable {
    Constants,
    Varnames,
    Names,
    /// `varnames` followed by `freevars`.
    Cells,
    CompareOps,
}

impl SymbolTable {
    pub fn name(self) -> &'static str {
        match self {
            SymbolTable::Constants => "constants",
            SymbolTable::Varnames => "varnames",
            SymbolTable::Names => "names",
            SymbolTable::Cells => "cells",
            SymbolTable::CompareOps => "compare_ops",
        }
    }
}

impl fmt::Display for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An operand index that falls outside its symbol table.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{table} index {index} out of range (len {len}) at offset {offset}")]
pub struct OperandError {
    pub offset: usize,
    pub table: SymbolTable,
    pub index: u32,
    pub len: usize,
}

/// Errors raised while building an opcode table from a spec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpcodeTableError {
    #[error("opcode {code} defined twice ({first} and {second})")]
    Duplicate {
        code: u8,
        first: String,
        second: String,
    },

    #[error("opcode {code} ({name}) has operand class {class:?} but HAVE_ARGUMENT is {have_argument}")]
    ClassMismatch {
        code: u8,
        name: String,
        class: crate::opcode::OperandClass,
        have_argument: u8,
    },

    #[error("extended-arg opcode {code} is not defined with an operand")]
    BadExtendedArg { code: u8 },

    #[error("opcode {code} has an empty name")]
    EmptyName { code: u8 },
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, DisError>;
