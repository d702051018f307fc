//! Function call compilation.
//!
//! A call node is resolved against the registry by name and the types of
//! its arguments, the arguments are generated left to right through the
//! shared context, and the context emits the invocation.

use rowgen_core::{CompilationError, SqlType};

use crate::bytecode::CodeUnit;
use crate::context::GenerationContext;

use super::{CallExpression, RowExpression, expect_type};

type Result<T> = std::result::Result<T, CompilationError>;

/// Compile a call expression.
pub fn compile_call(ctx: &mut GenerationContext<'_>, call: &CallExpression) -> Result<CodeUnit> {
    let argument_types: Vec<_> = call.arguments.iter().map(RowExpression::sql_type).collect();

    let registry = ctx.registry();
    let descriptor = registry
        .resolve(&call.name, &argument_types)
        .ok_or_else(|| CompilationError::UnresolvedFunction {
            name: call.name.clone(),
            argument_types: argument_types.clone(),
        })?;
    expect_type(
        format_args!("return type of {}", descriptor.signature()),
        call.return_type,
        descriptor.return_type(),
    )?;

    let arguments = call
        .arguments
        .iter()
        .map(|argument| ctx.generate(argument))
        .collect::<Result<Vec<_>>>()?;

    ctx.generate_call(descriptor, arguments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::OpCode;
    use crate::expr::RowExpressionCompiler;
    use rowgen_registry::FunctionRegistry;

    fn compile(
        registry: &FunctionRegistry,
        layout: &[SqlType],
        expr: &RowExpression,
    ) -> (Result<CodeUnit>, usize) {
        let traversal = RowExpressionCompiler::new(layout);
        let mut ctx = GenerationContext::new(&traversal, registry);
        let result = ctx.generate(expr);
        (result, ctx.binder().len())
    }

    #[test]
    fn unresolved_function() {
        let registry = FunctionRegistry::with_builtins();
        let expr = RowExpression::call(
            "nosuch",
            SqlType::Bigint,
            vec![RowExpression::constant(1_i64)],
        );
        let (result, bound) = compile(&registry, &[], &expr);
        assert_eq!(
            result.unwrap_err(),
            CompilationError::UnresolvedFunction {
                name: "nosuch".to_string(),
                argument_types: vec![SqlType::Bigint],
            }
        );
        assert_eq!(bound, 0);
    }

    #[test]
    fn wrong_argument_types_do_not_resolve() {
        let registry = FunctionRegistry::with_builtins();
        let expr = RowExpression::call(
            "plus",
            SqlType::Bigint,
            vec![RowExpression::constant(1_i64), RowExpression::constant("x")],
        );
        let (result, _) = compile(&registry, &[], &expr);
        assert!(matches!(result, Err(CompilationError::UnresolvedFunction { .. })));
    }

    #[test]
    fn declared_return_type_must_match() {
        let registry = FunctionRegistry::with_builtins();
        let a = RowExpression::constant("a");
        let expr = RowExpression::call("upper", SqlType::Bigint, vec![a]);
        let (result, bound) = compile(&registry, &[], &expr);
        assert!(matches!(result, Err(CompilationError::TypeMismatch { .. })));
        assert_eq!(bound, 0);
    }

    #[test]
    fn nested_calls_share_binder() {
        let registry = FunctionRegistry::with_builtins();
        let x = || RowExpression::input(0, SqlType::Bigint);
        // plus(plus(x, x), x)
        let inner = RowExpression::call("plus", SqlType::Bigint, vec![x(), x()]);
        let expr = RowExpression::call("plus", SqlType::Bigint, vec![inner, x()]);
        let (result, bound) = compile(&registry, &[SqlType::Bigint], &expr);
        let code = result.unwrap();
        assert_eq!(code.call_sites().count(), 2);
        assert_eq!(bound, 1);
    }

    #[test]
    fn failing_argument_keeps_completed_siblings_only() {
        let registry = FunctionRegistry::with_builtins();
        // concat(upper(x), nosuch(x)): upper binds, nosuch fails, concat never binds
        let x = || RowExpression::input(0, SqlType::Varchar);
        let expr = RowExpression::call(
            "concat",
            SqlType::Varchar,
            vec![
                RowExpression::call("upper", SqlType::Varchar, vec![x()]),
                RowExpression::call("nosuch", SqlType::Varchar, vec![x()]),
            ],
        );
        let traversal = RowExpressionCompiler::new(&[SqlType::Varchar]);
        let mut ctx = GenerationContext::new(&traversal, &registry);

        let err = ctx.generate(&expr).unwrap_err();
        assert_eq!(
            err,
            CompilationError::UnresolvedFunction {
                name: "nosuch".to_string(),
                argument_types: vec![SqlType::Varchar],
            }
        );
        assert_eq!(ctx.binder().len(), 1);
        assert_eq!(ctx.binder().targets()[0].name(), "upper");
    }

    #[test]
    fn context_function_loads_context() {
        let registry = FunctionRegistry::with_builtins();
        let expr = RowExpression::call("current_user", SqlType::Varchar, vec![]);
        let (result, _) = compile(&registry, &[], &expr);
        assert_eq!(
            result.unwrap().opcodes(),
            vec![OpCode::PushContext, OpCode::Invoke, OpCode::PushFalse]
        );
    }
}
