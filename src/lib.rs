//! rowgen
//!
//! Compiles typed SQL row expressions into compact bytecode. Every function
//! call in an expression is bound to a per-unit token, wrapped in SQL null
//! semantics according to the function's null convention, and handed the
//! session when the function asks for one.
//!
//! ## Crates
//!
//! - [`rowgen_core`]: types, values, function descriptors, invocation targets
//! - [`rowgen_registry`]: function registry and built-in functions
//! - [`rowgen_compiler`]: expression compiler, binder and invocation codegen
//!
//! This crate re-exports the public surface of all three and adds [`vm`], a
//! reference executor for compiled units.
//!
//! # Example
//!
//! ```
//! use rowgen::{Compiler, Executor, FunctionRegistry, RowExpression, SqlType, Value};
//!
//! let registry = FunctionRegistry::with_builtins();
//! let expr = RowExpression::call(
//!     "plus",
//!     SqlType::Bigint,
//!     vec![RowExpression::input(0, SqlType::Bigint), RowExpression::constant(5_i64)],
//! );
//! let unit = Compiler::compile(&registry, &[SqlType::Bigint], &expr).unwrap();
//! let executor = Executor::new(&unit, None);
//!
//! assert_eq!(executor.evaluate(&[Some(Value::Bigint(2))]), Ok(Some(Value::Bigint(7))));
//! assert_eq!(executor.evaluate(&[None]), Ok(None));
//! ```

pub mod vm;

pub use rowgen_compiler::bytecode;

pub use rowgen_compiler::{
    BindingToken, CallSiteBinder, CompilationError, CompiledUnit, Compiler, GenerationContext,
    RowExpression, RowExpressionCompiler, RowExpressionVisitor, SpecialForm,
};
pub use rowgen_core::{
    BoundClosure, CallFrame, Datum, FunctionDescriptor, InvocationTarget, NativeError, NativeFn,
    NullConvention, RegistrationError, Session, SqlType, Value,
};
pub use rowgen_registry::FunctionRegistry;

pub use vm::{Executor, RuntimeError};
