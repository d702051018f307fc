//! Symbolic, composable code.
//!
//! A [`CodeUnit`] is the output of generating one expression node: a
//! sequence of instructions whose jumps refer to [`Label`]s rather than
//! offsets. Units are immutable once built and compose by appending, so a
//! call site can embed its argument units verbatim. [`CodeUnit::assemble`]
//! lowers a finished unit into a [`BytecodeChunk`].

use std::fmt;

use bitflags::bitflags;
use rowgen_core::CompilationError;
use rustc_hash::FxHashMap;

use super::{BytecodeChunk, OpCode, PatchError};
use crate::binder::BindingToken;

/// A jump target within a compiled unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(u32);

impl Label {
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Hands out labels in allocation order.
///
/// One allocator serves a whole compiled unit, so labels never collide when
/// units are composed.
#[derive(Debug, Default)]
pub struct LabelAllocator {
    next: u32,
}

impl LabelAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_label(&mut self) -> Label {
        let label = Label(self.next);
        self.next += 1;
        label
    }

    /// Number of labels handed out so far.
    pub fn allocated(&self) -> u32 {
        self.next
    }
}

bitflags! {
    /// Flags carried by `Invoke` and `InvokeNullable`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CallFlags: u8 {
        /// The first argument slot holds the execution context.
        const CONTEXT = 0b0000_0001;
    }
}

/// Operands of an invocation instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallSite {
    /// `Invoke` or `InvokeNullable`.
    pub op: OpCode,
    pub token: BindingToken,
    /// Arguments passed to the target, the context included.
    pub argc: u8,
    pub flags: CallFlags,
}

/// One symbolic instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    /// An opcode without operands.
    Op(OpCode),
    /// An opcode with a single byte operand.
    Byte(OpCode, u8),
    /// An opcode with a 16-bit operand.
    Short(OpCode, u16),
    /// A forward jump to a label.
    Jump(OpCode, Label),
    /// An invocation of a bound target.
    Call(CallSite),
    /// Places a label at this position. Encodes to nothing.
    Label(Label),
}

impl Instruction {
    /// The opcode, or `None` for a label placement.
    pub fn opcode(&self) -> Option<OpCode> {
        match *self {
            Instruction::Op(op)
            | Instruction::Byte(op, _)
            | Instruction::Short(op, _)
            | Instruction::Jump(op, _) => Some(op),
            Instruction::Call(site) => Some(site.op),
            Instruction::Label(_) => None,
        }
    }

    /// Encoded size in bytes.
    pub fn encoded_len(&self) -> usize {
        self.opcode().map_or(0, |op| 1 + op.operand_size())
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Op(op) => write!(f, "    {}", op.name()),
            Instruction::Byte(op, value) => write!(f, "    {} {value}", op.name()),
            Instruction::Short(op, value) => write!(f, "    {} {value}", op.name()),
            Instruction::Jump(op, label) => write!(f, "    {} {label}", op.name()),
            Instruction::Call(site) => write!(
                f,
                "    {} {} argc={} flags={:#04b}",
                site.op.name(),
                site.token,
                site.argc,
                site.flags.bits()
            ),
            Instruction::Label(label) => write!(f, "{label}:"),
        }
    }
}

/// An immutable sequence of symbolic instructions.
///
/// Built with a [`CodeBuilder`](crate::emit::CodeBuilder).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeUnit {
    instructions: Vec<Instruction>,
}

impl CodeUnit {
    pub(crate) fn from_instructions(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    pub(crate) fn into_instructions(self) -> Vec<Instruction> {
        self.instructions
    }

    /// A unit with no instructions.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// This unit followed by `next`.
    pub fn then(mut self, next: CodeUnit) -> CodeUnit {
        self.instructions.extend(next.instructions);
        self
    }

    /// Opcodes in order, label placements skipped.
    pub fn opcodes(&self) -> Vec<OpCode> {
        self.instructions
            .iter()
            .filter_map(Instruction::opcode)
            .collect()
    }

    /// Every invocation in the unit, in emission order.
    pub fn call_sites(&self) -> impl Iterator<Item = CallSite> + '_ {
        self.instructions
            .iter()
            .filter_map(|instruction| match instruction {
                Instruction::Call(site) => Some(*site),
                _ => None,
            })
    }

    /// Encoded size in bytes.
    pub fn encoded_len(&self) -> usize {
        self.instructions.iter().map(Instruction::encoded_len).sum()
    }

    /// Lower to bytecode, resolving every label to a forward offset.
    ///
    /// Fails with [`CompilationError::Internal`] if a label is placed twice,
    /// a jump targets a label that is never placed or lies behind it, or a
    /// jump spans more than 65535 bytes.
    pub fn assemble(&self) -> Result<BytecodeChunk, CompilationError> {
        let mut chunk = BytecodeChunk::with_capacity(self.encoded_len());
        let mut placed: FxHashMap<Label, usize> = FxHashMap::default();
        let mut fixups: Vec<(usize, Label)> = Vec::new();

        for instruction in &self.instructions {
            match *instruction {
                Instruction::Op(op) => chunk.write_op(op),
                Instruction::Byte(op, value) => {
                    chunk.write_op(op);
                    chunk.write_byte(value);
                }
                Instruction::Short(op, value) => {
                    chunk.write_op(op);
                    chunk.write_u16(value);
                }
                Instruction::Jump(op, label) => {
                    let operand = chunk.emit_jump(op);
                    fixups.push((operand, label));
                }
                Instruction::Call(site) => {
                    chunk.write_op(site.op);
                    chunk.write_u16(site.token.get());
                    chunk.write_byte(site.argc);
                    chunk.write_byte(site.flags.bits());
                }
                Instruction::Label(label) => {
                    if placed.insert(label, chunk.current_offset()).is_some() {
                        return Err(CompilationError::internal(format!(
                            "label {label} placed twice"
                        )));
                    }
                }
            }
        }

        for (operand, label) in fixups {
            let target = *placed.get(&label).ok_or_else(|| {
                CompilationError::internal(format!("jump to unplaced label {label}"))
            })?;
            chunk
                .patch_jump_to(operand, target)
                .map_err(|err| match err {
                    PatchError::Backward { .. } => {
                        CompilationError::internal(format!("backward jump to {label}"))
                    }
                    PatchError::TooFar { distance } => CompilationError::internal(format!(
                        "jump to {label} spans {distance} bytes"
                    )),
                })?;
        }

        Ok(chunk)
    }
}

impl fmt::Display for CodeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instruction in &self.instructions {
            writeln!(f, "{instruction}")?;
        }
        Ok(())
    }
}
