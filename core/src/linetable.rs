//! Compressed line-number table decoding.
//!
//! The table is a flat run of `(Δbyte, Δline)` byte pairs. `Δbyte` is
//! unsigned; `Δline` is a two's-complement `i8`, so raw values from
//! `0x80` up step the line backwards. A pair with `Δbyte == 0` only
//! moves the line, which is how deltas wider than one byte are spread
//! over several pairs.

use crate::error::DisError;

/// First bytecode offset of a source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineStart {
    pub offset: usize,
    pub line: u32,
}

/// Decoded line table: offset -> source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineTable {
    /// Sorted by offset, strictly increasing. Never empty: offset 0
    /// always opens the first line.
    starts: Vec<LineStart>,
}

impl LineTable {
    pub fn decode(table: &[u8], first_line: u32) -> Result<Self, DisError> {
        if table.len() % 2 != 0 {
            return Err(DisError::MalformedLineTable {
                offset: table.len() - 1,
                reason: "odd number of bytes",
            });
        }

        let mut starts = Vec::with_capacity(table.len() / 2 + 1);
        let mut last_line: Option<u32> = None;
        let mut line = first_line;
        let mut addr = 0usize;

        for (i, pair) in table.chunks_exact(2).enumerate() {
            let byte_incr = pair[0] as usize;
            let line_incr = pair[1] as i8;

            if byte_incr != 0 {
                // The run [addr, addr + byte_incr) belongs to the line
                // held before this pair's line delta.
                if last_line != Some(line) {
                    starts.push(LineStart { offset: addr, line });
                    last_line = Some(line);
                }
                addr += byte_incr;
            }

            line = line.checked_add_signed(line_incr as i32).ok_or(
                DisError::MalformedLineTable {
                    offset: i * 2 + 1,
                    reason: "line number below zero",
                },
            )?;
        }

        if last_line != Some(line) {
            starts.push(LineStart { offset: addr, line });
        }

        Ok(Self { starts })
    }

    /// Source line that `offset` belongs to.
    pub fn line_at(&self, offset: usize) -> u32 {
        let idx = self.starts.partition_point(|s| s.offset <= offset);
        // starts[0].offset == 0, so idx >= 1 for every offset.
        self.starts[idx.saturating_sub(1)].line
    }

    /// Whether a source line begins exactly at `offset`.
    pub fn starts_line(&self, offset: usize) -> bool {
        self.starts
            .binary_search_by_key(&offset, |s| s.offset)
            .is_ok()
    }

    pub fn starts(&self) -> &[LineStart] {
        &self.starts
    }

    /// Consume the table into a cursor for one forward pass over
    /// increasing offsets.
    pub fn into_cursor(self) -> LineCursor {
        LineCursor {
            table: self,
            next: 0,
        }
    }
}

/// Forward-only walk over line starts.
///
/// Tracks which starts have been passed so a caller stepping through
/// instructions learns when it has crossed into a new line, even if a
/// boundary does not fall exactly on an instruction offset.
#[derive(Debug, Clone)]
pub struct LineCursor {
    table: LineTable,
    next: usize,
}

impl LineCursor {
    /// Advance to `offset`; returns the last line start crossed since the
    /// previous call, if any.
    pub fn advance(&mut self, offset: usize) -> Option<LineStart> {
        let mut crossed = None;
        while let Some(&start) = self.table.starts.get(self.next) {
            if start.offset > offset {
                break;
            }
            crossed = Some(start);
            self.next += 1;
        }
        crossed
    }

    pub fn table(&self) -> &LineTable {
        &self.table
    }
}
