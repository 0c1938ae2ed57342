//! PGC command tables.
//!
//! A PGC stores its pre-commands, post-commands and cell commands in one
//! table: an 8-byte header followed by the three lists back to back. The
//! player addresses at most 128 commands per table, shared by all three.

use crate::instruction::{self, Instruction, MAX_BLOCK_INSTRUCTIONS};

const HEADER_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    #[error("{count} commands exceed the limit of {limit} per PGC")]
    TooManyCommands { count: usize, limit: usize },
    #[error("command table is truncated: header needs {needed} bytes, got {got}")]
    Truncated { needed: usize, got: usize },
    #[error("command table end address {0} does not match its command counts")]
    BadEndAddress(u16),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandTable {
    pub pre: Vec<Instruction>,
    pub post: Vec<Instruction>,
    pub cell: Vec<Instruction>,
}

impl CommandTable {
    pub fn new(pre: Vec<Instruction>, post: Vec<Instruction>, cell: Vec<Instruction>) -> Result<Self, TableError> {
        let table = CommandTable { pre, post, cell };
        table.check()?;
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.pre.len() + self.post.len() + self.cell.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self) -> Result<(), TableError> {
        if self.len() > MAX_BLOCK_INSTRUCTIONS {
            return Err(TableError::TooManyCommands { count: self.len(), limit: MAX_BLOCK_INSTRUCTIONS });
        }
        Ok(())
    }

    /// Appends a cell command and returns its 1-based number, which is what
    /// a cell's command field refers to.
    pub fn push_cell(&mut self, ins: Instruction) -> Result<u8, TableError> {
        self.cell.push(ins);
        if let Err(e) = self.check() {
            self.cell.pop();
            return Err(e);
        }
        u8::try_from(self.cell.len()).map_err(|_| TableError::TooManyCommands {
            count: self.len(),
            limit: MAX_BLOCK_INSTRUCTIONS,
        })
    }

    /// Serializes the table. The end address is that of the last byte,
    /// relative to the start of the header.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TableError> {
        self.check()?;
        let count = |list: &[Instruction]| u16::try_from(list.len()).unwrap_or(u16::MAX);
        let end = u16::try_from(HEADER_LEN + 8 * self.len() - 1).unwrap_or(u16::MAX);
        let mut out = Vec::with_capacity(HEADER_LEN + 8 * self.len());
        for field in [count(&self.pre), count(&self.post), count(&self.cell), end] {
            out.extend_from_slice(&field.to_be_bytes());
        }
        for list in [&self.pre, &self.post, &self.cell] {
            out.extend(instruction::to_bytes(list));
        }
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TableError> {
        let Some(header) = bytes.get(..HEADER_LEN) else {
            return Err(TableError::Truncated { needed: HEADER_LEN, got: bytes.len() });
        };
        let field = |i: usize| usize::from(u16::from_be_bytes([header[2 * i], header[2 * i + 1]]));
        let (pre, post, cell, end) = (field(0), field(1), field(2), field(3));
        let total = pre + post + cell;
        if total > MAX_BLOCK_INSTRUCTIONS {
            return Err(TableError::TooManyCommands { count: total, limit: MAX_BLOCK_INSTRUCTIONS });
        }
        let needed = HEADER_LEN + 8 * total;
        if end + 1 != needed {
            return Err(TableError::BadEndAddress(u16::try_from(end).unwrap_or(u16::MAX)));
        }
        if bytes.len() < needed {
            return Err(TableError::Truncated { needed, got: bytes.len() });
        }
        let mut commands = instruction::from_bytes(&bytes[HEADER_LEN..needed]);
        let cell_list = commands.split_off(pre + post);
        let post_list = commands.split_off(pre);
        Ok(CommandTable { pre: commands, post: post_list, cell: cell_list })
    }
}
