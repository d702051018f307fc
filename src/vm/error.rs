//! Runtime errors raised while executing a compiled unit.

use rowgen_core::NativeError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("stack underflow at offset {offset}")]
    StackUnderflow { offset: usize },

    #[error("invalid opcode at offset {offset}")]
    InvalidOpcode { offset: usize },

    #[error("truncated operand at offset {offset}")]
    TruncatedOperand { offset: usize },

    #[error("execution ran past the end of the chunk")]
    MissingReturn,

    #[error("constant #{index} is not in the pool")]
    UnknownConstant { index: usize },

    #[error("row has no field #{field}")]
    MissingInput { field: usize },

    #[error("temporary slot {slot} is outside the frame")]
    InvalidLocal { slot: usize },

    #[error("token #{token} is not bound in this unit")]
    UnboundToken { token: u16 },

    #[error("malformed call at offset {offset}")]
    MalformedCall { offset: usize },

    #[error("expected {expected} on the stack, found {found}")]
    TypeError {
        expected: &'static str,
        found: String,
    },

    #[error("{function} failed: {source}")]
    Native {
        function: String,
        #[source]
        source: NativeError,
    },

    #[error("{function} returned null under the null-on-null convention")]
    NullResult { function: String },

    #[error("{remaining} value(s) left on the stack at return")]
    UnbalancedStack { remaining: usize },
}
