use crate::code::CodeObject;
use crate::decode::Instruction;
use crate::error::{OperandError, SymbolTable};
use crate::opcode::{OpcodeTable, OperandClass};

/// Resolves raw operands against one code object's symbol tables.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'c, 't> {
    code: &'c CodeObject,
    table: &'t OpcodeTable,
}

impl<'c, 't> Resolver<'c, 't> {
    pub fn new(code: &'c CodeObject, table: &'t OpcodeTable) -> Self {
        Self { code, table }
    }

    /// Human-readable annotation for `insn`'s operand.
    ///
    /// Returns `Ok(None)` for instructions without an operand.
    pub fn resolve(&self, insn: &Instruction<'_>) -> Result<Option<String>, OperandError> {
        let Some(arg) = insn.arg else {
            return Ok(None);
        };
        self.annotate(insn.def.class, arg, insn.offset, insn.size)
            .map(Some)
    }

    /// Annotation for a raw operand of the given class at `offset`.
    pub fn annotate(
        &self,
        class: OperandClass,
        arg: u32,
        offset: usize,
        size: usize,
    ) -> Result<String, OperandError> {
        let index = arg as usize;
        let oob = |table: SymbolTable, len: usize| OperandError {
            offset,
            table,
            index: arg,
            len,
        };

        match class {
            OperandClass::None | OperandClass::Plain => Ok(arg.to_string()),
            OperandClass::Const => self
                .code
                .constants
                .get(index)
                .map(|c| c.to_string())
                .ok_or_else(|| oob(SymbolTable::Constants, self.code.constants.len())),
            OperandClass::Local => self
                .code
                .varnames
                .get(index)
                .cloned()
                .ok_or_else(|| oob(SymbolTable::Varnames, self.code.varnames.len())),
            OperandClass::Name => self
                .code
                .names
                .get(index)
                .cloned()
                .ok_or_else(|| oob(SymbolTable::Names, self.code.names.len())),
            OperandClass::Free => self
                .code
                .cell_name(index)
                .map(str::to_string)
                .ok_or_else(|| oob(SymbolTable::Cells, self.code.cell_count())),
            OperandClass::JumpRel => Ok((offset + size + index).to_string()),
            OperandClass::JumpAbs => Ok(arg.to_string()),
            OperandClass::Compare => {
                let ops = self.table.compare_ops();
                ops.get(index)
                    .map(|op| op.to_string())
                    .ok_or_else(|| oob(SymbolTable::CompareOps, ops.len()))
            }
            OperandClass::CallArgs => {
                let positional = arg & 0xff;
                let keyword = (arg >> 8) & 0xff;
                Ok(format!("{positional} positional, {keyword} keyword pair"))
            }
        }
    }
}

/// Shorthand for a one-off resolution.
pub fn resolve(
    insn: &Instruction<'_>,
    code: &CodeObject,
    table: &OpcodeTable,
) -> Result<Option<String>, OperandError> {
    Resolver::new(code, table).resolve(insn)
}
