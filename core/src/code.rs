//! Code object bundle: the read-only input to a disassembly.
//!
//! Byte fields travel as lowercase hex strings when serialized, so a
//! bundle reads as plain JSON:
//!
//! ```json
//! { "raw_code": "640100530000", "constants": [null, 1], "first_line": 1 }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Compiled function body plus the symbol tables its operands index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeObject {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_filename")]
    pub filename: String,
    #[serde(with = "hex_bytes")]
    pub raw_code: Vec<u8>,
    #[serde(default)]
    pub constants: Vec<Constant>,
    #[serde(default)]
    pub varnames: Vec<String>,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub freevars: Vec<String>,
    #[serde(default, with = "hex_bytes")]
    pub line_table: Vec<u8>,
    #[serde(default)]
    pub first_line: u32,
}

fn default_name() -> String {
    "<module>".to_string()
}

fn default_filename() -> String {
    "<string>".to_string()
}

impl CodeObject {
    /// A bare code object with empty symbol tables.
    pub fn new(raw_code: Vec<u8>) -> Self {
        Self {
            name: default_name(),
            filename: default_filename(),
            raw_code,
            constants: Vec::new(),
            varnames: Vec::new(),
            names: Vec::new(),
            freevars: Vec::new(),
            line_table: Vec::new(),
            first_line: 0,
        }
    }

    /// Name at `index` in `varnames ++ freevars`.
    pub fn cell_name(&self, index: usize) -> Option<&str> {
        self.varnames
            .iter()
            .chain(self.freevars.iter())
            .nth(index)
            .map(String::as_str)
    }

    /// Length of `varnames ++ freevars`.
    pub fn cell_count(&self) -> usize {
        self.varnames.len() + self.freevars.len()
    }
}

/// A literal from the constant pool.
///
/// Deserialized untagged: JSON `null`, booleans, numbers, strings and
/// arrays map directly; bytes and nested code objects are wrapped as
/// `{"bytes": "<hex>"}` and `{"code": {...}}`. Integers outside the
/// 64-bit range travel as decimal text, `{"int": "<digits>"}`, since a
/// bare JSON number that large only survives as a float.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Constant {
    None,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Tuple(Vec<Constant>),
    Bytes {
        #[serde(with = "hex_bytes")]
        bytes: Vec<u8>,
    },
    BigInt {
        #[serde(deserialize_with = "int_digits")]
        int: String,
    },
    Code {
        code: Box<CodeObject>,
    },
}

impl From<i64> for Constant {
    fn from(v: i64) -> Self {
        Constant::Int(v)
    }
}

impl From<&str> for Constant {
    fn from(v: &str) -> Self {
        Constant::Str(v.to_string())
    }
}

impl From<CodeObject> for Constant {
    fn from(code: CodeObject) -> Self {
        Constant::Code {
            code: Box::new(code),
        }
    }
}

/// Renders the literal the way the source runtime's `repr` does.
impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::None => f.write_str("None"),
            Constant::Bool(true) => f.write_str("True"),
            Constant::Bool(false) => f.write_str("False"),
            Constant::Int(v) => write!(f, "{v}"),
            Constant::UInt(v) => write!(f, "{v}"),
            Constant::BigInt { int } => f.write_str(int),
            Constant::Float(v) => fmt_float(*v, f),
            Constant::Str(s) => fmt_str(s, f),
            Constant::Bytes { bytes } => fmt_bytes(bytes, f),
            Constant::Tuple(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            Constant::Code { code } => write!(
                f,
                "<code object {}, file \"{}\", line {}>",
                code.name, code.filename, code.first_line
            ),
        }
    }
}

fn int_digits<'de, D: serde::Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let text = String::deserialize(d)?;
    let digits = text.strip_prefix('-').unwrap_or(&text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(serde::de::Error::custom(format!(
            "invalid integer literal {text:?}"
        )));
    }
    Ok(text)
}

fn fmt_float(v: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if v.is_nan() {
        f.write_str("nan")
    } else if v.is_infinite() {
        f.write_str(if v > 0.0 { "inf" } else { "-inf" })
    } else {
        // Debug keeps a trailing `.0` on integral values and switches to
        // exponent form at the same magnitudes; only the exponent differs.
        let text = format!("{v:?}");
        match text.split_once('e') {
            Some((mantissa, exp)) => {
                let (sign, digits) = match exp.strip_prefix('-') {
                    Some(digits) => ('-', digits),
                    None => ('+', exp),
                };
                write!(f, "{mantissa}e{sign}{digits:0>2}")
            }
            None => f.write_str(&text),
        }
    }
}

fn fmt_str(s: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    use fmt::Write;
    f.write_char(quote)?;
    for c in s.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c == quote => write!(f, "\\{c}")?,
            c if c.is_control() => write!(f, "\\x{:02x}", c as u32)?,
            c => f.write_char(c)?,
        }
    }
    f.write_char(quote)
}

fn fmt_bytes(bytes: &[u8], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let quote = if bytes.contains(&b'\'') && !bytes.contains(&b'"') {
        b'"'
    } else {
        b'\''
    };
    write!(f, "b{}", quote as char)?;
    for &b in bytes {
        match b {
            b'\\' => f.write_str("\\\\")?,
            b'\n' => f.write_str("\\n")?,
            b'\r' => f.write_str("\\r")?,
            b'\t' => f.write_str("\\t")?,
            b if b == quote => write!(f, "\\{}", b as char)?,
            0x20..=0x7e => write!(f, "{}", b as char)?,
            b => write!(f, "\\x{b:02x}")?,
        }
    }
    write!(f, "{}", quote as char)
}

/// Serde adapter for hex-encoded byte strings.
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(d)?;
        let text = text.trim_start_matches("0x");
        hex::decode(text).map_err(serde::de::Error::custom)
    }
}
