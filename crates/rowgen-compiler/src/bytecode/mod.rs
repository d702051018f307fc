//! Bytecode types for the rowgen compiler.
//!
//! This module contains the core bytecode types:
//!
//! - [`OpCode`] - The instruction set for the executor
//! - [`CodeUnit`] and [`Instruction`] - Symbolic, composable code with labels
//! - [`BytecodeChunk`] - Assembled bytecode for one compiled expression
//! - [`ConstantPool`] - Per-unit literal storage

mod chunk;
mod code_unit;
mod constant;
mod opcode;

pub use chunk::{BytecodeChunk, PatchError};
pub use code_unit::{CallFlags, CallSite, CodeUnit, Instruction, Label, LabelAllocator};
pub use constant::ConstantPool;
pub use opcode::OpCode;
