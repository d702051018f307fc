//! rowgen Compiler
//!
//! Compiles row expressions into bytecode, binding every called function to
//! a per-unit token and weaving SQL null semantics and context parameters
//! into each call.
//!
//! ## Architecture
//!
//! - **Traversal**: [`expr::RowExpressionCompiler`] walks the tree and
//!   resolves each call against a [`FunctionRegistry`]
//! - **Binding**: [`binder::CallSiteBinder`] gives each distinct target one
//!   token per unit
//! - **Invocation**: [`invoke::generate_invocation`] emits the null
//!   short-circuit and context injection around each call
//! - **Assembly**: [`bytecode::CodeUnit::assemble`] resolves labels into a
//!   [`bytecode::BytecodeChunk`]
//!
//! ## Modules
//!
//! - [`binder`]: Per-unit target binding table
//! - [`bytecode`]: Bytecode types (OpCode, CodeUnit, BytecodeChunk, ConstantPool)
//! - [`context`]: Per-unit generation state
//! - [`emit`]: Code builder
//! - [`expr`]: Row expressions and the default traversal
//! - [`invoke`]: Invocation codegen
//! - [`scope`]: Temporary slot management

pub mod binder;
pub mod bytecode;
pub mod context;
pub mod emit;
pub mod expr;
pub mod invoke;
pub mod scope;

pub use binder::{BindingToken, CallSiteBinder};
pub use context::GenerationContext;
pub use expr::{RowExpression, RowExpressionCompiler, RowExpressionVisitor, SpecialForm};

// Re-export CompilationError from core for convenience
pub use rowgen_core::CompilationError;

use rowgen_core::{InvocationTarget, SqlType, Value};
use rowgen_registry::FunctionRegistry;

use bytecode::{BytecodeChunk, CodeUnit};

/// The output of compiling one expression tree.
///
/// Holds the symbolic code, its assembled bytecode and the tables the
/// bytecode indexes into. The binding table is indexed by
/// [`BindingToken`].
#[derive(Debug, Clone)]
pub struct CompiledUnit {
    code: CodeUnit,
    chunk: BytecodeChunk,
    constants: Vec<Value>,
    bindings: Vec<InvocationTarget>,
    local_count: usize,
    return_type: SqlType,
}

impl CompiledUnit {
    pub(crate) fn new(
        code: CodeUnit,
        chunk: BytecodeChunk,
        constants: Vec<Value>,
        bindings: Vec<InvocationTarget>,
        local_count: usize,
        return_type: SqlType,
    ) -> Self {
        Self {
            code,
            chunk,
            constants,
            bindings,
            local_count,
            return_type,
        }
    }

    /// Symbolic code for the expression, without the trailing `Return`.
    pub fn code(&self) -> &CodeUnit {
        &self.code
    }

    /// Assembled bytecode, ending in `Return`.
    pub fn chunk(&self) -> &BytecodeChunk {
        &self.chunk
    }

    pub fn constants(&self) -> &[Value] {
        &self.constants
    }

    /// Bound targets, indexed by token.
    pub fn bindings(&self) -> &[InvocationTarget] {
        &self.bindings
    }

    pub fn binding(&self, token: BindingToken) -> Option<&InvocationTarget> {
        self.bindings.get(token.index())
    }

    /// Number of temporary slots the executor must provide.
    pub fn local_count(&self) -> usize {
        self.local_count
    }

    pub fn return_type(&self) -> SqlType {
        self.return_type
    }
}

/// The main compiler entry point.
pub struct Compiler;

impl Compiler {
    /// Compile `expression` over rows shaped like `layout`.
    ///
    /// Each call gets a fresh [`GenerationContext`]; on error nothing of the
    /// unit is returned.
    #[cfg_attr(feature = "profiling", profiling::function)]
    #[tracing::instrument(level = "debug", skip_all, fields(return_type = %expression.sql_type()))]
    pub fn compile(
        registry: &FunctionRegistry,
        layout: &[SqlType],
        expression: &RowExpression,
    ) -> Result<CompiledUnit, CompilationError> {
        let traversal = RowExpressionCompiler::new(layout);
        let mut ctx = GenerationContext::new(&traversal, registry);
        let code = ctx.generate(expression)?;
        let unit = ctx.finish(code, expression.sql_type())?;

        tracing::debug!(
            bindings = unit.bindings().len(),
            constants = unit.constants().len(),
            bytes = unit.chunk().len(),
            "compiled expression"
        );
        Ok(unit)
    }
}
