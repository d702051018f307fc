//! Error types for rowgen.
//!
//! ```text
//! RegistrationError - function registry population
//! CompilationError  - resolving and generating code for one expression tree
//! NativeError       - failures raised by an invocation target while running
//! ```
//!
//! Every `CompilationError` is fatal to the unit being compiled: the compiler
//! never hands out a partial unit alongside one.

use thiserror::Error;

use crate::SqlType;

// ============================================================================
// Registration Errors
// ============================================================================

/// Errors raised while populating a function registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// A function with the same name and argument types is already registered.
    #[error("duplicate function: {signature}")]
    DuplicateFunction { signature: String },

    /// The signature declares more arguments than an invocation can encode.
    #[error("function '{name}' declares {count} argument(s), at most {max} supported")]
    TooManyArguments {
        name: String,
        count: usize,
        max: usize,
    },
}

// ============================================================================
// Compilation Errors
// ============================================================================

/// Errors raised while compiling one expression tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompilationError {
    /// No registered function matches the name and argument types.
    #[error("unresolved function '{name}({})'", SqlType::list(.argument_types))]
    UnresolvedFunction {
        /// The function name as written in the expression.
        name: String,
        /// The argument types the call site supplied.
        argument_types: Vec<SqlType>,
    },

    /// `generate_call` received a different number of argument units than the
    /// descriptor declares.
    #[error("{name} expects {expected} argument(s), got {got}")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    /// The descriptor has no invocable target to bind.
    #[error("cannot bind '{name}': {reason}")]
    InvalidBinding { name: String, reason: String },

    /// A node's declared type disagrees with what was resolved or required.
    #[error("{message}")]
    TypeMismatch { message: String },

    /// An input reference points outside the row layout.
    #[error("input reference #{index} is outside the row layout ({width} field(s))")]
    UnknownInput { index: usize, width: usize },

    /// The unit binds more distinct targets than a token can address.
    #[error("compiled unit exceeds {max} distinct call targets")]
    TooManyBindings { max: usize },

    /// The unit holds more constants than an index can address.
    #[error("compiled unit exceeds {max} constants")]
    TooManyConstants { max: usize },

    /// The unit needs more temporaries than a slot can address.
    #[error("compiled unit exceeds {max} temporaries")]
    TooManyLocals { max: usize },

    /// A call carries more arguments than an invocation can encode.
    #[error("{name} called with {count} argument(s), at most {max} supported")]
    TooManyArguments {
        name: String,
        count: usize,
        max: usize,
    },

    /// A compiler invariant was broken (unplaced label, oversized jump, ...).
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl CompilationError {
    /// Shorthand for an [`CompilationError::Internal`] error.
    pub fn internal(message: impl Into<String>) -> Self {
        CompilationError::Internal {
            message: message.into(),
        }
    }
}

// ============================================================================
// Native Errors
// ============================================================================

/// Errors raised by an invocation target while it runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NativeError {
    /// The frame has fewer arguments than the target reads.
    #[error("missing argument {index}")]
    MissingArgument { index: usize },

    /// An argument has the wrong type.
    #[error("argument {index}: expected {expected}, got {got}")]
    ArgumentType {
        index: usize,
        expected: SqlType,
        got: String,
    },

    /// A strict target read a null argument.
    #[error("argument {index} is null")]
    NullArgument { index: usize },

    /// The target requires an execution context but none was supplied.
    #[error("no execution context available")]
    MissingContext,

    #[error("division by zero")]
    DivisionByZero,

    #[error("{operation} overflowed")]
    Overflow { operation: &'static str },

    /// Any other failure reported by a target.
    #[error("{0}")]
    Other(String),
}
