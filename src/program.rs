use std::io;
use std::path::Path;

/// Upper bound on program length, in bytes. Longer input is truncated.
pub const MAX_PROGRAM: usize = 1 << 24;

pub const INC: u8 = b'+';
pub const DEC: u8 = b'-';
pub const LEFT: u8 = b'<';
pub const RIGHT: u8 = b'>';
pub const READ: u8 = b',';
pub const WRITE: u8 = b'.';
pub const OPEN: u8 = b'[';
pub const CLOSE: u8 = b']';
pub const DUMP_CELL: u8 = b'#';
pub const DUMP_TAPE: u8 = b'@';

/// The source of one run: an immutable byte sequence, fixed once loaded.
///
/// Any byte outside the instruction set is treated as a comment by every
/// consumer, so a `Program` accepts arbitrary bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    bytes: Vec<u8>,
}

impl Program {
    /// Wrap raw source bytes, truncating at [`MAX_PROGRAM`].
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let mut bytes = bytes.into();
        bytes.truncate(MAX_PROGRAM);
        Self { bytes }
    }

    /// Read a whole source file, truncating at [`MAX_PROGRAM`].
    pub fn from_file(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::from_bytes(std::fs::read(path)?))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
