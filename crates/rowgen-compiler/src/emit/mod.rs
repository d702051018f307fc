//! Code builder for the rowgen compiler.
//!
//! The [`CodeBuilder`] provides a high-level API for producing a
//! [`CodeUnit`]: constants, temporaries, labelled jumps and invocations.
//!
//! # Example
//!
//! ```
//! use rowgen_compiler::bytecode::{LabelAllocator, OpCode};
//! use rowgen_compiler::emit::CodeBuilder;
//!
//! let mut labels = LabelAllocator::new();
//! let end = labels.next_label();
//!
//! let mut builder = CodeBuilder::new();
//! builder.emit_get_input(0);
//! builder.emit_jump(OpCode::JumpIfTrue, end);
//! builder.emit_pop();
//! builder.emit_null_pair();
//! builder.mark(end);
//!
//! let code = builder.finish();
//! assert_eq!(code.opcodes().len(), 5);
//! ```

use crate::binder::BindingToken;
use crate::bytecode::{CallFlags, CallSite, CodeUnit, Instruction, Label, OpCode};

/// Accumulates instructions for one [`CodeUnit`].
#[derive(Debug, Default)]
pub struct CodeBuilder {
    instructions: Vec<Instruction>,
}

impl CodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    // ==========================================================================
    // Basic Emission
    // ==========================================================================

    /// Emit a single opcode with no operands.
    pub fn emit(&mut self, op: OpCode) {
        self.instructions.push(Instruction::Op(op));
    }

    /// Emit opcode with 8-bit operand.
    pub fn emit_byte(&mut self, op: OpCode, byte: u8) {
        self.instructions.push(Instruction::Byte(op, byte));
    }

    /// Emit opcode with 16-bit operand.
    pub fn emit_u16(&mut self, op: OpCode, value: u16) {
        self.instructions.push(Instruction::Short(op, value));
    }

    /// Append a finished unit verbatim.
    pub fn append(&mut self, code: CodeUnit) {
        self.instructions.extend(code.into_instructions());
    }

    // ==========================================================================
    // Constants
    // ==========================================================================

    /// Emit a constant load by pool index.
    ///
    /// Uses narrow (8-bit) or wide (16-bit) index based on the index.
    pub fn emit_constant(&mut self, index: u16) {
        if index < 256 {
            self.emit_byte(OpCode::Constant, index as u8);
        } else {
            self.emit_u16(OpCode::ConstantWide, index);
        }
    }

    /// Emit boolean.
    pub fn emit_bool(&mut self, value: bool) {
        self.emit(if value {
            OpCode::PushTrue
        } else {
            OpCode::PushFalse
        });
    }

    /// Emit the placeholder value paired with a set null flag.
    pub fn emit_undefined(&mut self) {
        self.emit(OpCode::PushUndefined);
    }

    /// Emit a complete null result: placeholder value, null flag set.
    pub fn emit_null_pair(&mut self) {
        self.emit_undefined();
        self.emit_bool(true);
    }

    // ==========================================================================
    // Temporaries
    // ==========================================================================

    /// Emit get temporary.
    ///
    /// Uses narrow (8-bit) or wide (16-bit) slot index based on slot number.
    pub fn emit_get_local(&mut self, slot: u16) {
        if slot < 256 {
            self.emit_byte(OpCode::GetLocal, slot as u8);
        } else {
            self.emit_u16(OpCode::GetLocalWide, slot);
        }
    }

    /// Emit set temporary.
    ///
    /// Uses narrow (8-bit) or wide (16-bit) slot index based on slot number.
    pub fn emit_set_local(&mut self, slot: u16) {
        if slot < 256 {
            self.emit_byte(OpCode::SetLocal, slot as u8);
        } else {
            self.emit_u16(OpCode::SetLocalWide, slot);
        }
    }

    // ==========================================================================
    // Row Access
    // ==========================================================================

    /// Emit a load of an input field's `(value, is_null)` pair.
    pub fn emit_get_input(&mut self, field: u16) {
        self.emit_u16(OpCode::GetInput, field);
    }

    pub fn emit_push_context(&mut self) {
        self.emit(OpCode::PushContext);
    }

    // ==========================================================================
    // Control Flow
    // ==========================================================================

    /// Emit a forward jump to `label`.
    pub fn emit_jump(&mut self, op: OpCode, label: Label) {
        debug_assert!(op.is_jump(), "{} is not a jump", op.name());
        self.instructions.push(Instruction::Jump(op, label));
    }

    /// Place `label` at the current position.
    pub fn mark(&mut self, label: Label) {
        self.instructions.push(Instruction::Label(label));
    }

    // ==========================================================================
    // Invocation
    // ==========================================================================

    /// Emit a strict invocation. Leaves only the result value.
    pub fn emit_invoke(&mut self, token: BindingToken, argc: u8, flags: CallFlags) {
        self.instructions.push(Instruction::Call(CallSite {
            op: OpCode::Invoke,
            token,
            argc,
            flags,
        }));
    }

    /// Emit a null-aware invocation. Leaves a `(value, is_null)` pair.
    pub fn emit_invoke_nullable(&mut self, token: BindingToken, argc: u8, flags: CallFlags) {
        self.instructions.push(Instruction::Call(CallSite {
            op: OpCode::InvokeNullable,
            token,
            argc,
            flags,
        }));
    }

    // ==========================================================================
    // Stack Operations
    // ==========================================================================

    /// Emit pop (discard top of stack).
    pub fn emit_pop(&mut self) {
        self.emit(OpCode::Pop);
    }

    // ==========================================================================
    // Finalization
    // ==========================================================================

    /// Number of instructions emitted so far, label placements included.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Finish building and return the unit.
    pub fn finish(self) -> CodeUnit {
        CodeUnit::from_instructions(self.instructions)
    }
}
