use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::error::{DisError, OpcodeTableError};

/// How an instruction's operand is interpreted.
///
/// Every opcode is assigned exactly one class when the table is built;
/// nothing is inferred from operand values at decode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperandClass {
    /// No operand follows the opcode.
    None,
    /// Index into `constants`.
    Const,
    /// Index into `varnames`.
    Local,
    /// Index into `names` (globals, attributes, imports).
    Name,
    /// Index into `varnames ++ freevars`.
    Free,
    /// Jump relative to the end of the instruction.
    JumpRel,
    /// Jump to an absolute offset.
    JumpAbs,
    /// Index into the comparison operator list.
    Compare,
    /// Positional count in the low byte, keyword pairs in the high byte.
    CallArgs,
    /// Any other operand, shown as a bare number.
    Plain,
}

impl OperandClass {
    pub const fn has_operand(self) -> bool {
        !matches!(self, OperandClass::None)
    }

    pub const fn is_jump(self) -> bool {
        matches!(self, OperandClass::JumpRel | OperandClass::JumpAbs)
    }
}

/// Static definition of one opcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpDef {
    pub code: u8,
    pub name: Cow<'static, str>,
    pub class: OperandClass,
}

impl OpDef {
    pub fn has_operand(&self) -> bool {
        self.class.has_operand()
    }

    /// Encoded width in bytes, opcode included.
    pub fn size(&self) -> usize {
        if self.has_operand() {
            1 + OPERAND_SIZE
        } else {
            1
        }
    }
}

/// Operand width: a 16-bit little-endian word.
pub const OPERAND_SIZE: usize = 2;

/// First opcode that carries an operand in the builtin table.
pub const HAVE_ARGUMENT: u8 = 90;

/// Prefix opcode supplying the high 16 bits of the next operand.
pub const EXTENDED_ARG: u8 = 144;

/// Comparison operator names indexed by `COMPARE_OP`'s operand.
pub const CMP_OP: [&str; 12] = [
    "<",
    "<=",
    "==",
    "!=",
    ">",
    ">=",
    "in",
    "not in",
    "is",
    "is not",
    "exception match",
    "BAD",
];

use OperandClass as C;

/// Builtin opcode set, pinned to the CPython 3.5 instruction encoding.
static CPYTHON35: &[(u8, &str, OperandClass)] = &[
    // -- Stack manipulation --
    (1, "POP_TOP", C::None),
    (2, "ROT_TWO", C::None),
    (3, "ROT_THREE", C::None),
    (4, "DUP_TOP", C::None),
    (5, "DUP_TOP_TWO", C::None),
    (9, "NOP", C::None),
    // -- Unary --
    (10, "UNARY_POSITIVE", C::None),
    (11, "UNARY_NEGATIVE", C::None),
    (12, "UNARY_NOT", C::None),
    (15, "UNARY_INVERT", C::None),
    // -- Binary / in-place --
    (16, "BINARY_MATRIX_MULTIPLY", C::None),
    (17, "INPLACE_MATRIX_MULTIPLY", C::None),
    (19, "BINARY_POWER", C::None),
    (20, "BINARY_MULTIPLY", C::None),
    (22, "BINARY_MODULO", C::None),
    (23, "BINARY_ADD", C::None),
    (24, "BINARY_SUBTRACT", C::None),
    (25, "BINARY_SUBSCR", C::None),
    (26, "BINARY_FLOOR_DIVIDE", C::None),
    (27, "BINARY_TRUE_DIVIDE", C::None),
    (28, "INPLACE_FLOOR_DIVIDE", C::None),
    (29, "INPLACE_TRUE_DIVIDE", C::None),
    // -- Async --
    (50, "GET_AITER", C::None),
    (51, "GET_ANEXT", C::None),
    (52, "BEFORE_ASYNC_WITH", C::None),
    (55, "INPLACE_ADD", C::None),
    (56, "INPLACE_SUBTRACT", C::None),
    (57, "INPLACE_MULTIPLY", C::None),
    (59, "INPLACE_MODULO", C::None),
    (60, "STORE_SUBSCR", C::None),
    (61, "DELETE_SUBSCR", C::None),
    (62, "BINARY_LSHIFT", C::None),
    (63, "BINARY_RSHIFT", C::None),
    (64, "BINARY_AND", C::None),
    (65, "BINARY_XOR", C::None),
    (66, "BINARY_OR", C::None),
    (67, "INPLACE_POWER", C::None),
    (68, "GET_ITER", C::None),
    (69, "GET_YIELD_FROM_ITER", C::None),
    (70, "PRINT_EXPR", C::None),
    (71, "LOAD_BUILD_CLASS", C::None),
    (72, "YIELD_FROM", C::None),
    (73, "GET_AWAITABLE", C::None),
    (75, "INPLACE_LSHIFT", C::None),
    (76, "INPLACE_RSHIFT", C::None),
    (77, "INPLACE_AND", C::None),
    (78, "INPLACE_XOR", C::None),
    (79, "INPLACE_OR", C::None),
    // -- Blocks and returns --
    (80, "BREAK_LOOP", C::None),
    (81, "WITH_CLEANUP_START", C::None),
    (82, "WITH_CLEANUP_FINISH", C::None),
    (83, "RETURN_VALUE", C::None),
    (84, "IMPORT_STAR", C::None),
    (86, "YIELD_VALUE", C::None),
    (87, "POP_BLOCK", C::None),
    (88, "END_FINALLY", C::None),
    (89, "POP_EXCEPT", C::None),
    // -- HAVE_ARGUMENT and above --
    (90, "STORE_NAME", C::Name),
    (91, "DELETE_NAME", C::Name),
    (92, "UNPACK_SEQUENCE", C::Plain),
    (93, "FOR_ITER", C::JumpRel),
    (94, "UNPACK_EX", C::Plain),
    (95, "STORE_ATTR", C::Name),
    (96, "DELETE_ATTR", C::Name),
    (97, "STORE_GLOBAL", C::Name),
    (98, "DELETE_GLOBAL", C::Name),
    (100, "LOAD_CONST", C::Const),
    (101, "LOAD_NAME", C::Name),
    (102, "BUILD_TUPLE", C::Plain),
    (103, "BUILD_LIST", C::Plain),
    (104, "BUILD_SET", C::Plain),
    (105, "BUILD_MAP", C::Plain),
    (106, "LOAD_ATTR", C::Name),
    (107, "COMPARE_OP", C::Compare),
    (108, "IMPORT_NAME", C::Name),
    (109, "IMPORT_FROM", C::Name),
    (110, "JUMP_FORWARD", C::JumpRel),
    (111, "JUMP_IF_FALSE_OR_POP", C::JumpAbs),
    (112, "JUMP_IF_TRUE_OR_POP", C::JumpAbs),
    (113, "JUMP_ABSOLUTE", C::JumpAbs),
    (114, "POP_JUMP_IF_FALSE", C::JumpAbs),
    (115, "POP_JUMP_IF_TRUE", C::JumpAbs),
    (116, "LOAD_GLOBAL", C::Name),
    (119, "CONTINUE_LOOP", C::JumpAbs),
    (120, "SETUP_LOOP", C::JumpRel),
    (121, "SETUP_EXCEPT", C::JumpRel),
    (122, "SETUP_FINALLY", C::JumpRel),
    (124, "LOAD_FAST", C::Local),
    (125, "STORE_FAST", C::Local),
    (126, "DELETE_FAST", C::Local),
    (130, "RAISE_VARARGS", C::Plain),
    (131, "CALL_FUNCTION", C::CallArgs),
    (132, "MAKE_FUNCTION", C::Plain),
    (133, "BUILD_SLICE", C::Plain),
    (134, "MAKE_CLOSURE", C::Plain),
    (135, "LOAD_CLOSURE", C::Free),
    (136, "LOAD_DEREF", C::Free),
    (137, "STORE_DEREF", C::Free),
    (138, "DELETE_DEREF", C::Free),
    (140, "CALL_FUNCTION_VAR", C::CallArgs),
    (141, "CALL_FUNCTION_KW", C::CallArgs),
    (142, "CALL_FUNCTION_VAR_KW", C::CallArgs),
    (143, "SETUP_WITH", C::JumpRel),
    (144, "EXTENDED_ARG", C::Plain),
    (145, "LIST_APPEND", C::Plain),
    (146, "SET_ADD", C::Plain),
    (147, "MAP_ADD", C::Plain),
    (148, "LOAD_CLASSDEREF", C::Free),
    (149, "BUILD_LIST_UNPACK", C::Plain),
    (150, "BUILD_MAP_UNPACK", C::Plain),
    (151, "BUILD_MAP_UNPACK_WITH_CALL", C::Plain),
    (152, "BUILD_TUPLE_UNPACK", C::Plain),
    (153, "BUILD_SET_UNPACK", C::Plain),
    (154, "SETUP_ASYNC_WITH", C::JumpRel),
];

/// One opcode entry of an [`OpcodeSpec`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpcodeEntry {
    pub code: u8,
    pub name: String,
    /// Defaults to `none` below `have_argument` and `plain` above it.
    #[serde(default)]
    pub class: Option<OperandClass>,
}

/// Declarative description of an instruction set, loadable from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpcodeSpec {
    pub have_argument: u8,
    #[serde(default)]
    pub extended_arg: Option<u8>,
    #[serde(default = "default_compare_ops")]
    pub compare_ops: Vec<String>,
    pub opcodes: Vec<OpcodeEntry>,
}

fn default_compare_ops() -> Vec<String> {
    CMP_OP.iter().map(|s| s.to_string()).collect()
}

/// Immutable opcode lookup table.
///
/// Built once and passed to the decoder and driver by reference; it is
/// never mutated afterwards, so a single table may serve concurrent
/// disassemblies.
#[derive(Debug, Clone)]
pub struct OpcodeTable {
    defs: Vec<Option<OpDef>>,
    have_argument: u8,
    extended_arg: Option<u8>,
    compare_ops: Vec<Cow<'static, str>>,
    max_name_len: usize,
}

impl OpcodeTable {
    /// The builtin table for the pinned CPython 3.5 encoding.
    pub fn cpython35() -> Self {
        let mut defs = vec![None; 256];
        for &(code, name, class) in CPYTHON35 {
            defs[code as usize] = Some(OpDef {
                code,
                name: Cow::Borrowed(name),
                class,
            });
        }
        Self::with_defs(
            defs,
            HAVE_ARGUMENT,
            Some(EXTENDED_ARG),
            CMP_OP.iter().map(|&s| Cow::Borrowed(s)).collect(),
        )
    }

    /// Build a table from an explicit spec, checking that every class
    /// agrees with the `have_argument` threshold.
    pub fn from_spec(spec: OpcodeSpec) -> Result<Self, OpcodeTableError> {
        let mut defs: Vec<Option<OpDef>> = vec![None; 256];
        for entry in spec.opcodes {
            if entry.name.is_empty() {
                return Err(OpcodeTableError::EmptyName { code: entry.code });
            }
            let above = entry.code >= spec.have_argument;
            let class = entry.class.unwrap_or(if above {
                OperandClass::Plain
            } else {
                OperandClass::None
            });
            if class.has_operand() != above {
                return Err(OpcodeTableError::ClassMismatch {
                    code: entry.code,
                    name: entry.name,
                    class,
                    have_argument: spec.have_argument,
                });
            }
            let slot = &mut defs[entry.code as usize];
            if let Some(prev) = slot {
                return Err(OpcodeTableError::Duplicate {
                    code: entry.code,
                    first: prev.name.to_string(),
                    second: entry.name,
                });
            }
            *slot = Some(OpDef {
                code: entry.code,
                name: Cow::Owned(entry.name),
                class,
            });
        }
        if let Some(code) = spec.extended_arg {
            match &defs[code as usize] {
                Some(def) if def.has_operand() => {}
                _ => return Err(OpcodeTableError::BadExtendedArg { code }),
            }
        }
        let compare_ops = spec.compare_ops.into_iter().map(Cow::Owned).collect();
        Ok(Self::with_defs(
            defs,
            spec.have_argument,
            spec.extended_arg,
            compare_ops,
        ))
    }

    fn with_defs(
        defs: Vec<Option<OpDef>>,
        have_argument: u8,
        extended_arg: Option<u8>,
        compare_ops: Vec<Cow<'static, str>>,
    ) -> Self {
        let max_name_len = defs
            .iter()
            .flatten()
            .map(|d| d.name.len())
            .max()
            .unwrap_or(0);
        Self {
            defs,
            have_argument,
            extended_arg,
            compare_ops,
            max_name_len,
        }
    }

    /// Definition for `opcode`, if the table knows it.
    pub fn get(&self, opcode: u8) -> Option<&OpDef> {
        self.defs[opcode as usize].as_ref()
    }

    /// Like [`get`](Self::get), but an unknown opcode is an error
    /// tagged with the offset it was read from.
    pub fn lookup(&self, opcode: u8, offset: usize) -> Result<&OpDef, DisError> {
        self.get(opcode)
            .ok_or(DisError::UnknownOpcode { opcode, offset })
    }

    /// Find an opcode by mnemonic.
    pub fn by_name(&self, name: &str) -> Option<&OpDef> {
        self.iter().find(|d| d.name == name)
    }

    /// All defined opcodes in numeric order.
    pub fn iter(&self) -> impl Iterator<Item = &OpDef> {
        self.defs.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn have_argument(&self) -> u8 {
        self.have_argument
    }

    pub fn extended_arg(&self) -> Option<u8> {
        self.extended_arg
    }

    pub fn compare_ops(&self) -> &[Cow<'static, str>] {
        &self.compare_ops
    }

    /// Length of the longest mnemonic, used to align listings.
    pub fn max_name_len(&self) -> usize {
        self.max_name_len
    }
}

impl Default for OpcodeTable {
    fn default() -> Self {
        Self::cpython35()
    }
}
