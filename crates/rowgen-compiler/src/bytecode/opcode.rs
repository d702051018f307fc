//! Bytecode operation codes.
//!
//! This module defines the instruction set executed for a compiled row
//! expression. Each opcode is a single byte, with operands following inline.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Bytecode operation codes.
///
/// The machine is stack based. Every compiled expression leaves a
/// `(value, is_null)` pair on the stack, the null flag on top as a boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum OpCode {
    // =========================================================================
    // Constants
    // =========================================================================
    /// Push constant from pool (8-bit index).
    /// Operand: u8 constant index
    Constant = 0,
    /// Push constant from pool (16-bit index).
    /// Operand: u16 constant index (big-endian)
    ConstantWide,
    /// Push the placeholder value that accompanies a set null flag.
    PushUndefined,
    /// Push boolean true.
    PushTrue,
    /// Push boolean false.
    PushFalse,

    // =========================================================================
    // Stack Operations
    // =========================================================================
    /// Pop top of stack.
    Pop,

    // =========================================================================
    // Temporaries
    // =========================================================================
    /// Push a temporary (8-bit slot).
    /// Operand: u8 slot index
    GetLocal,
    /// Pop into a temporary (8-bit slot).
    /// Operand: u8 slot index
    SetLocal,
    /// Push a temporary (16-bit slot).
    /// Operand: u16 slot index (big-endian)
    GetLocalWide,
    /// Pop into a temporary (16-bit slot).
    /// Operand: u16 slot index (big-endian)
    SetLocalWide,

    // =========================================================================
    // Row Access
    // =========================================================================
    /// Push the `(value, is_null)` pair of an input field.
    /// Operand: u16 field index
    GetInput,
    /// Push the active execution context.
    PushContext,

    // =========================================================================
    // Control Flow
    // =========================================================================
    /// Unconditional forward jump.
    /// Operand: u16 offset (big-endian)
    Jump,
    /// Pop a boolean, jump forward if it is false.
    /// Operand: u16 offset (big-endian)
    JumpIfFalse,
    /// Pop a boolean, jump forward if it is true.
    /// Operand: u16 offset (big-endian)
    JumpIfTrue,

    // =========================================================================
    // Invocation
    // =========================================================================
    /// Invoke a bound target with non-null argument values.
    /// Stack: [context?, v1, ..., vn] -> [result]
    /// Operands: u16 binding token, u8 argument count, u8 call flags
    Invoke,
    /// Invoke a bound target with full `(value, is_null)` argument pairs.
    /// Stack: [context?, v1, n1, ..., vn, nn] -> [result, is_null]
    /// Operands: u16 binding token, u8 argument count, u8 call flags
    InvokeNullable,

    /// Pop the final `(value, is_null)` pair and finish evaluation.
    Return,
}

impl OpCode {
    /// Decode an opcode byte.
    pub fn from_u8(value: u8) -> Option<Self> {
        OpCode::try_from(value).ok()
    }

    /// Get the size of operands for this opcode in bytes.
    ///
    /// This does NOT include the opcode byte itself.
    pub fn operand_size(&self) -> usize {
        match self {
            OpCode::PushUndefined
            | OpCode::PushTrue
            | OpCode::PushFalse
            | OpCode::Pop
            | OpCode::PushContext
            | OpCode::Return => 0,

            OpCode::Constant | OpCode::GetLocal | OpCode::SetLocal => 1,

            OpCode::ConstantWide
            | OpCode::GetLocalWide
            | OpCode::SetLocalWide
            | OpCode::GetInput
            | OpCode::Jump
            | OpCode::JumpIfFalse
            | OpCode::JumpIfTrue => 2,

            // token(2) + argc(1) + flags(1)
            OpCode::Invoke | OpCode::InvokeNullable => 4,
        }
    }

    /// Whether this opcode transfers control to a label.
    pub fn is_jump(&self) -> bool {
        matches!(self, Self::Jump | Self::JumpIfFalse | Self::JumpIfTrue)
    }

    /// Get the name of this opcode for debugging.
    pub fn name(&self) -> &'static str {
        match self {
            OpCode::Constant => "CONSTANT",
            OpCode::ConstantWide => "CONSTANT_WIDE",
            OpCode::PushUndefined => "PUSH_UNDEFINED",
            OpCode::PushTrue => "PUSH_TRUE",
            OpCode::PushFalse => "PUSH_FALSE",
            OpCode::Pop => "POP",
            OpCode::GetLocal => "GET_LOCAL",
            OpCode::SetLocal => "SET_LOCAL",
            OpCode::GetLocalWide => "GET_LOCAL_WIDE",
            OpCode::SetLocalWide => "SET_LOCAL_WIDE",
            OpCode::GetInput => "GET_INPUT",
            OpCode::PushContext => "PUSH_CONTEXT",
            OpCode::Jump => "JUMP",
            OpCode::JumpIfFalse => "JUMP_IF_FALSE",
            OpCode::JumpIfTrue => "JUMP_IF_TRUE",
            OpCode::Invoke => "INVOKE",
            OpCode::InvokeNullable => "INVOKE_NULLABLE",
            OpCode::Return => "RETURN",
        }
    }
}
