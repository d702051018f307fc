//! Core types for the rowgen expression compiler.
//!
//! This crate holds everything the compiler, the function registry and the
//! executor agree on:
//!
//! - [`SqlType`], [`Value`] and [`Datum`] - the scalar type system
//! - [`FunctionDescriptor`] - an immutable, resolved function signature
//! - [`InvocationTarget`] - the runtime-invocable reference behind a descriptor
//! - [`Session`] - the execution context injected into context-aware functions
//! - Error types for registration, compilation and native execution

mod error;
mod function;
mod native_fn;
mod session;
mod signature_hash;
mod sql_type;

pub use error::{CompilationError, NativeError, RegistrationError};
pub use function::{FunctionDescriptor, FunctionDescriptorBuilder, NullConvention};
pub use native_fn::{
    BoundClosure, CallFrame, ClosureBody, InvocationTarget, NativeCallable, NativeFn, TargetId,
    TargetIdentity,
};
pub use session::Session;
pub use signature_hash::SignatureHash;
pub use sql_type::{Datum, SqlType, Value};

/// Largest number of arguments a single invocation can carry.
///
/// Argument counts are encoded as a single byte in the instruction stream,
/// and the execution context, when injected, takes one of those slots.
pub const MAX_ARGUMENTS: usize = u8::MAX as usize - 1;
