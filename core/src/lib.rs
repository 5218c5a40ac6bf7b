//! Bytecode decoding core.
//!
//! Decodes a code object's instruction stream against an explicit
//! [`OpcodeTable`], reconstructs source lines from the compressed line
//! table and resolves operands into the code object's symbol tables.

pub mod code;
pub mod decode;
pub mod error;
pub mod linetable;
pub mod opcode;
pub mod resolve;
pub mod source;

pub use code::{CodeObject, Constant};
pub use decode::{decode_all, Decoder, Instruction};
pub use error::{DisError, OpcodeTableError, OperandError, SymbolTable};
pub use linetable::{LineCursor, LineStart, LineTable};
pub use opcode::{OpDef, OpcodeSpec, OpcodeTable, OperandClass};
pub use resolve::{resolve, Resolver};
pub use source::{CompileError, Compiler, HasCode, NoCompiler, Target};
