//! GenerationContext - per-unit state threaded through code generation.
//!
//! One context exists per compiled expression tree. It owns the unit's
//! binder, constant pool, temporary scope and label allocator, and holds
//! read-only references to the function registry and to the traversal that
//! drives generation. Nested generation re-enters the same context, so every
//! call site in the tree shares one binding table.
//!
//! The context is consumed by [`GenerationContext::finish`], which hands its
//! tables to the [`CompiledUnit`].

use rowgen_core::{CompilationError, FunctionDescriptor, MAX_ARGUMENTS, SqlType, Value};
use rowgen_registry::FunctionRegistry;

use crate::CompiledUnit;
use crate::binder::CallSiteBinder;
use crate::bytecode::{CodeUnit, ConstantPool, Label, LabelAllocator, OpCode};
use crate::emit::CodeBuilder;
use crate::expr::{RowExpression, RowExpressionVisitor};
use crate::invoke;
use crate::scope::LocalScope;

type Result<T> = std::result::Result<T, CompilationError>;

/// Maximum number of constants a unit can address.
pub const MAX_CONSTANTS: usize = u16::MAX as usize + 1;

/// Per-unit code generation state.
pub struct GenerationContext<'a> {
    traversal: &'a dyn RowExpressionVisitor,
    registry: &'a FunctionRegistry,
    binder: CallSiteBinder,
    constants: ConstantPool,
    scope: LocalScope,
    labels: LabelAllocator,
}

impl<'a> GenerationContext<'a> {
    /// Create a fresh context for one unit.
    pub fn new(traversal: &'a dyn RowExpressionVisitor, registry: &'a FunctionRegistry) -> Self {
        Self {
            traversal,
            registry,
            binder: CallSiteBinder::new(),
            constants: ConstantPool::new(),
            scope: LocalScope::new(),
            labels: LabelAllocator::new(),
        }
    }

    // ==========================================================================
    // Generation
    // ==========================================================================

    /// Generate code for `expression` through the traversal.
    pub fn generate(&mut self, expression: &RowExpression) -> Result<CodeUnit> {
        let traversal = self.traversal;
        traversal.visit(expression, self)
    }

    /// Generate the call of `descriptor` over already generated arguments.
    ///
    /// The arity and the encodable argument count are checked before the
    /// target is bound, so a rejected call leaves the binder untouched.
    pub fn generate_call(
        &mut self,
        descriptor: &FunctionDescriptor,
        arguments: Vec<CodeUnit>,
    ) -> Result<CodeUnit> {
        let expected = descriptor.argument_types().len();
        if arguments.len() != expected {
            return Err(CompilationError::ArityMismatch {
                name: descriptor.name().to_string(),
                expected,
                got: arguments.len(),
            });
        }

        // One slot is held back for the context.
        if arguments.len() > MAX_ARGUMENTS {
            return Err(CompilationError::TooManyArguments {
                name: descriptor.name().to_string(),
                count: arguments.len(),
                max: MAX_ARGUMENTS,
            });
        }

        let token = self.binder.bind_function(descriptor)?;
        Ok(invoke::generate_invocation(&mut self.labels, descriptor, token, arguments))
    }

    // ==========================================================================
    // Read Accessors
    // ==========================================================================

    /// The registry calls resolve against.
    ///
    /// The returned reference outlives this borrow of the context, so a
    /// resolved descriptor can be held while the context generates its
    /// arguments.
    pub fn registry(&self) -> &'a FunctionRegistry {
        self.registry
    }

    pub fn binder(&self) -> &CallSiteBinder {
        &self.binder
    }

    pub fn constants(&self) -> &ConstantPool {
        &self.constants
    }

    pub fn scope(&self) -> &LocalScope {
        &self.scope
    }

    // ==========================================================================
    // Allocation
    // ==========================================================================

    pub fn new_label(&mut self) -> Label {
        self.labels.next_label()
    }

    /// Add a literal to the pool, returning its index.
    pub fn add_constant(&mut self, value: Value) -> Result<u16> {
        let index = self.constants.add(value);
        let max = MAX_CONSTANTS;
        u16::try_from(index).map_err(|_| CompilationError::TooManyConstants { max })
    }

    /// Enter a block for temporaries.
    pub fn enter_block(&mut self) {
        self.scope.push_scope();
    }

    /// Leave the current block, releasing its temporaries.
    pub fn exit_block(&mut self) {
        self.scope.pop_scope();
    }

    /// Allocate a temporary in the current block.
    pub fn allocate_temp(&mut self, sql_type: SqlType) -> Result<u16> {
        self.scope.allocate(sql_type)
    }

    // ==========================================================================
    // Finalization
    // ==========================================================================

    /// Consume the context and assemble `code` into a compiled unit.
    pub fn finish(self, code: CodeUnit, return_type: SqlType) -> Result<CompiledUnit> {
        let mut tail = CodeBuilder::new();
        tail.emit(OpCode::Return);
        let chunk = code.clone().then(tail.finish()).assemble()?;

        Ok(CompiledUnit::new(
            code,
            chunk,
            self.constants.into_constants(),
            self.binder.into_table(),
            self.scope.frame_size(),
            return_type,
        ))
    }
}

impl std::fmt::Debug for GenerationContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationContext")
            .field("bindings", &self.binder.len())
            .field("constants", &self.constants.len())
            .field("scope_depth", &self.scope.depth())
            .field("labels", &self.labels.allocated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::RowExpressionCompiler;
    use rowgen_core::{CallFrame, Datum, NativeError};

    fn one(_: &CallFrame<'_>) -> std::result::Result<Datum, NativeError> {
        Ok(Some(Value::Bigint(1)))
    }

    fn unary(name: &str) -> FunctionDescriptor {
        FunctionDescriptor::builder(name, SqlType::Bigint)
            .argument(SqlType::Bigint)
            .native(one)
            .build()
    }

    fn input(field: u16) -> CodeUnit {
        let mut builder = CodeBuilder::new();
        builder.emit_get_input(field);
        builder.finish()
    }

    #[test]
    fn arity_mismatch_binds_nothing() {
        let registry = FunctionRegistry::new();
        let traversal = RowExpressionCompiler::new(&[SqlType::Bigint]);
        let mut ctx = GenerationContext::new(&traversal, &registry);

        let err = ctx
            .generate_call(&unary("f"), vec![input(0), input(0)])
            .unwrap_err();
        assert_eq!(
            err,
            CompilationError::ArityMismatch {
                name: "f".to_string(),
                expected: 1,
                got: 2
            }
        );
        assert!(ctx.binder().is_empty());
    }

    #[test]
    fn repeated_descriptor_shares_token() {
        let registry = FunctionRegistry::new();
        let traversal = RowExpressionCompiler::new(&[SqlType::Bigint]);
        let mut ctx = GenerationContext::new(&traversal, &registry);
        let f = unary("f");

        let a = ctx.generate_call(&f, vec![input(0)]).unwrap();
        let b = ctx.generate_call(&f, vec![input(0)]).unwrap();

        let ta = a.call_sites().next().unwrap().token;
        let tb = b.call_sites().next().unwrap().token;
        assert_eq!(ta, tb);
        assert_eq!(ctx.binder().len(), 1);
    }

    #[test]
    fn labels_never_collide_across_calls() {
        let registry = FunctionRegistry::new();
        let traversal = RowExpressionCompiler::new(&[SqlType::Bigint]);
        let mut ctx = GenerationContext::new(&traversal, &registry);
        let f = unary("f");

        let inner = ctx.generate_call(&f, vec![input(0)]).unwrap();
        let outer = ctx.generate_call(&f, vec![inner]).unwrap();
        assert!(outer.assemble().is_ok());
    }

    #[test]
    fn declared_only_descriptor_fails_binding() {
        let registry = FunctionRegistry::new();
        let traversal = RowExpressionCompiler::new(&[]);
        let mut ctx = GenerationContext::new(&traversal, &registry);
        let declared = FunctionDescriptor::builder("random", SqlType::Double).build();

        assert!(matches!(
            ctx.generate_call(&declared, vec![]),
            Err(CompilationError::InvalidBinding { .. })
        ));
    }

    #[test]
    fn too_many_arguments_binds_nothing() {
        let registry = FunctionRegistry::new();
        let traversal = RowExpressionCompiler::new(&[SqlType::Bigint]);
        let mut ctx = GenerationContext::new(&traversal, &registry);
        let wide = FunctionDescriptor::builder("wide", SqlType::Bigint)
            .arguments(std::iter::repeat_n(SqlType::Bigint, 255))
            .native(one)
            .build();
        let arguments = (0..255).map(|_| input(0)).collect();

        assert_eq!(
            ctx.generate_call(&wide, arguments),
            Err(CompilationError::TooManyArguments {
                name: "wide".to_string(),
                count: 255,
                max: MAX_ARGUMENTS,
            })
        );
        assert!(ctx.binder().is_empty());
    }

    #[test]
    fn constants_are_deduplicated() {
        let registry = FunctionRegistry::new();
        let traversal = RowExpressionCompiler::new(&[]);
        let mut ctx = GenerationContext::new(&traversal, &registry);

        let a = ctx.add_constant(Value::varchar("x")).unwrap();
        let b = ctx.add_constant(Value::Bigint(3)).unwrap();
        let c = ctx.add_constant(Value::varchar("x")).unwrap();
        assert_eq!((a, b, c), (0, 1, 0));
        assert_eq!(ctx.constants().len(), 2);
    }

    #[test]
    fn temporaries_follow_blocks() {
        let registry = FunctionRegistry::new();
        let traversal = RowExpressionCompiler::new(&[]);
        let mut ctx = GenerationContext::new(&traversal, &registry);

        ctx.enter_block();
        assert_eq!(ctx.allocate_temp(SqlType::Boolean).unwrap(), 0);
        ctx.enter_block();
        assert_eq!(ctx.allocate_temp(SqlType::Boolean).unwrap(), 1);
        ctx.exit_block();
        assert_eq!(ctx.scope().live_count(), 1);
        ctx.exit_block();
        assert_eq!(ctx.scope().depth(), 0);
        assert_eq!(ctx.scope().frame_size(), 2);
    }

    #[test]
    fn finish_appends_return() {
        let registry = FunctionRegistry::new();
        let traversal = RowExpressionCompiler::new(&[SqlType::Bigint]);
        let mut ctx = GenerationContext::new(&traversal, &registry);
        let code = ctx.generate_call(&unary("f"), vec![input(0)]).unwrap();

        let unit = ctx.finish(code.clone(), SqlType::Bigint).unwrap();
        assert_eq!(unit.code(), &code);
        assert_eq!(unit.chunk().opcodes().last(), Some(&OpCode::Return));
        assert_eq!(unit.bindings().len(), 1);
        assert_eq!(unit.return_type(), SqlType::Bigint);
    }
}
