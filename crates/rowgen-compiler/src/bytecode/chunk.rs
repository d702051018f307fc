//! Assembled bytecode for one compiled expression.
//!
//! A `BytecodeChunk` is the flat byte encoding of a [`CodeUnit`]. Labels have
//! been resolved to forward offsets and binding tokens written inline.
//!
//! [`CodeUnit`]: super::CodeUnit

use std::fmt;

use super::OpCode;

/// A chunk of assembled bytecode.
///
/// Constants and bound targets live beside the chunk in the compiled unit;
/// the chunk refers to them by index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BytecodeChunk {
    code: Vec<u8>,
}

/// Failure to patch a forward jump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchError {
    /// The target lies before the jump operand.
    Backward { offset: usize, target: usize },
    /// The distance does not fit in the 16-bit operand.
    TooFar { distance: usize },
}

impl BytecodeChunk {
    /// Create a new empty bytecode chunk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bytecode chunk with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            code: Vec::with_capacity(capacity),
        }
    }

    /// Write an opcode.
    pub fn write_op(&mut self, op: OpCode) {
        self.code.push(op.into());
    }

    /// Write a byte operand.
    pub fn write_byte(&mut self, byte: u8) {
        self.code.push(byte);
    }

    /// Write a 16-bit operand (big-endian).
    pub fn write_u16(&mut self, value: u16) {
        self.code.extend_from_slice(&value.to_be_bytes());
    }

    /// Get current code offset (for jump patching).
    pub fn current_offset(&self) -> usize {
        self.code.len()
    }

    /// Emit a jump instruction and return the offset of its operand.
    ///
    /// The operand is initialized to 0xFFFF as a placeholder.
    pub fn emit_jump(&mut self, op: OpCode) -> usize {
        self.write_op(op);
        let offset = self.code.len();
        self.write_u16(0xFFFF);
        offset
    }

    /// Patch the jump operand at `offset` so that it lands on `target`.
    ///
    /// Distances are measured from the end of the operand and only forward
    /// jumps are encodable.
    pub fn patch_jump_to(&mut self, offset: usize, target: usize) -> Result<(), PatchError> {
        let after = offset + 2;
        if target < after {
            return Err(PatchError::Backward { offset, target });
        }
        let distance = target - after;
        let encoded = u16::try_from(distance).map_err(|_| PatchError::TooFar { distance })?;
        self.code[offset..after].copy_from_slice(&encoded.to_be_bytes());
        Ok(())
    }

    /// Get the bytecode.
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Get the length of the bytecode.
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// Check if the chunk is empty.
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Read a byte at the given offset.
    pub fn read_byte(&self, offset: usize) -> Option<u8> {
        self.code.get(offset).copied()
    }

    /// Read a u16 at the given offset (big-endian).
    pub fn read_u16(&self, offset: usize) -> Option<u16> {
        match self.code.get(offset..offset + 2) {
            Some(&[hi, lo]) => Some(u16::from_be_bytes([hi, lo])),
            _ => None,
        }
    }

    /// Read an opcode at the given offset.
    pub fn read_op(&self, offset: usize) -> Option<OpCode> {
        self.code.get(offset).and_then(|&b| OpCode::from_u8(b))
    }

    /// Extract all opcodes from the chunk, skipping operands.
    ///
    /// This is useful for testing bytecode sequences without worrying about
    /// specific operand values or instruction offsets.
    pub fn opcodes(&self) -> Vec<OpCode> {
        let mut ops = Vec::new();
        let mut offset = 0;

        while offset < self.code.len() {
            if let Some(op) = self.read_op(offset) {
                ops.push(op);
                offset += 1 + op.operand_size();
            } else {
                // Invalid opcode, skip one byte
                offset += 1;
            }
        }

        ops
    }

    /// Check if this chunk contains exactly the given opcode sequence.
    ///
    /// This ignores operand values, only checking the opcodes themselves.
    /// Panics with a descriptive message if the sequences don't match.
    #[track_caller]
    pub fn assert_opcodes(&self, expected: &[OpCode]) {
        let actual = self.opcodes();
        assert_eq!(
            actual,
            expected,
            "Bytecode mismatch.\nExpected: {:?}\nActual:   {:?}",
            expected.iter().map(|op| op.name()).collect::<Vec<_>>(),
            actual.iter().map(|op| op.name()).collect::<Vec<_>>(),
        );
    }
}

/// One instruction per line: `offset NAME operands`.
impl fmt::Display for BytecodeChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut offset = 0;
        while offset < self.code.len() {
            let Some(op) = self.read_op(offset) else {
                writeln!(f, "{offset:04} <invalid {:#04x}>", self.code[offset])?;
                offset += 1;
                continue;
            };
            write!(f, "{offset:04} {}", op.name())?;
            let operand = offset + 1;
            match op.operand_size() {
                1 => {
                    if let Some(byte) = self.read_byte(operand) {
                        write!(f, " {byte}")?;
                    }
                }
                2 => {
                    if let Some(value) = self.read_u16(operand) {
                        if op.is_jump() {
                            write!(f, " -> {:04}", operand + 2 + value as usize)?;
                        } else {
                            write!(f, " {value}")?;
                        }
                    }
                }
                4 => {
                    if let (Some(token), Some(argc), Some(flags)) = (
                        self.read_u16(operand),
                        self.read_byte(operand + 2),
                        self.read_byte(operand + 3),
                    ) {
                        write!(f, " #{token} argc={argc} flags={flags:#04b}")?;
                    }
                }
                _ => {}
            }
            writeln!(f)?;
            offset += 1 + op.operand_size();
        }
        Ok(())
    }
}
