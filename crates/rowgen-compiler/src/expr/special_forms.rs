//! Special form compilation.
//!
//! Each form leaves the usual `(value, is_null)` pair. All jumps are
//! forward; forms that must remember something across operands keep it in
//! a temporary allocated in their own block.

use rowgen_core::{CompilationError, SqlType};

use crate::bytecode::{CodeUnit, OpCode};
use crate::context::GenerationContext;
use crate::emit::CodeBuilder;

use super::{SpecialForm, SpecialFormExpression, expect_type};

type Result<T> = std::result::Result<T, CompilationError>;

/// Compile a special form.
pub fn compile_special_form(
    ctx: &mut GenerationContext<'_>,
    expr: &SpecialFormExpression,
) -> Result<CodeUnit> {
    match expr.form {
        SpecialForm::If => compile_if(ctx, expr),
        SpecialForm::IsNull => compile_is_null(ctx, expr),
        SpecialForm::Coalesce => compile_coalesce(ctx, expr),
        SpecialForm::And => compile_logical(ctx, expr, false),
        SpecialForm::Or => compile_logical(ctx, expr, true),
    }
}

fn check_arity(expr: &SpecialFormExpression, min: usize, max: usize) -> Result<()> {
    let got = expr.arguments.len();
    if got < min || got > max {
        return Err(CompilationError::ArityMismatch {
            name: expr.form.name().to_string(),
            expected: if got < min { min } else { max },
            got,
        });
    }
    Ok(())
}

/// Run `f` inside a fresh temporary block.
fn in_block<'a, T>(
    ctx: &mut GenerationContext<'a>,
    f: impl FnOnce(&mut GenerationContext<'a>) -> Result<T>,
) -> Result<T> {
    ctx.enter_block();
    let result = f(ctx);
    ctx.exit_block();
    result
}

/// `IF(condition, then[, else])`
///
/// ```text
///     <condition>
///     JUMP_IF_TRUE cond_null
///     JUMP_IF_FALSE otherwise
///     <then>
///     JUMP end
/// cond_null:
///     POP
/// otherwise:
///     <else>                 (or the null pair)
/// end:
/// ```
fn compile_if(ctx: &mut GenerationContext<'_>, expr: &SpecialFormExpression) -> Result<CodeUnit> {
    check_arity(expr, 2, 3)?;
    let condition = &expr.arguments[0];
    let then = &expr.arguments[1];
    let otherwise = expr.arguments.get(2);

    expect_type("IF condition", SqlType::Boolean, condition.sql_type())?;
    expect_type("IF result", expr.return_type, then.sql_type())?;
    if let Some(otherwise) = otherwise {
        expect_type("IF else branch", expr.return_type, otherwise.sql_type())?;
    }

    let cond_null = ctx.new_label();
    let else_label = ctx.new_label();
    let end = ctx.new_label();

    let mut builder = CodeBuilder::new();
    builder.append(ctx.generate(condition)?);
    builder.emit_jump(OpCode::JumpIfTrue, cond_null);
    builder.emit_jump(OpCode::JumpIfFalse, else_label);
    builder.append(ctx.generate(then)?);
    builder.emit_jump(OpCode::Jump, end);
    builder.mark(cond_null);
    builder.emit_pop();
    builder.mark(else_label);
    match otherwise {
        Some(otherwise) => builder.append(ctx.generate(otherwise)?),
        None => builder.emit_null_pair(),
    }
    builder.mark(end);
    Ok(builder.finish())
}

/// `operand IS NULL`
///
/// The operand's null flag is parked in a temporary while its value is
/// dropped, then reloaded as the (never null) result.
fn compile_is_null(
    ctx: &mut GenerationContext<'_>,
    expr: &SpecialFormExpression,
) -> Result<CodeUnit> {
    check_arity(expr, 1, 1)?;
    expect_type("IS NULL result", SqlType::Boolean, expr.return_type)?;
    let operand = &expr.arguments[0];

    in_block(ctx, |ctx| {
        let flag = ctx.allocate_temp(SqlType::Boolean)?;

        let mut builder = CodeBuilder::new();
        builder.append(ctx.generate(operand)?);
        builder.emit_set_local(flag);
        builder.emit_pop();
        builder.emit_get_local(flag);
        builder.emit_bool(false);
        Ok(builder.finish())
    })
}

/// `COALESCE(a, b, ...)`
///
/// ```text
///     <a>
///     JUMP_IF_TRUE next_0
///     PUSH_FALSE
///     JUMP end
/// next_0:
///     POP
///     ...
///     <last>
/// end:
/// ```
fn compile_coalesce(
    ctx: &mut GenerationContext<'_>,
    expr: &SpecialFormExpression,
) -> Result<CodeUnit> {
    check_arity(expr, 1, usize::MAX)?;
    for operand in &expr.arguments {
        expect_type("COALESCE operand", expr.return_type, operand.sql_type())?;
    }

    let end = ctx.new_label();
    let mut builder = CodeBuilder::new();

    let (last, leading) = expr
        .arguments
        .split_last()
        .ok_or_else(|| CompilationError::internal("COALESCE without operands"))?;
    for operand in leading {
        let next = ctx.new_label();
        builder.append(ctx.generate(operand)?);
        builder.emit_jump(OpCode::JumpIfTrue, next);
        builder.emit_bool(false);
        builder.emit_jump(OpCode::Jump, end);
        builder.mark(next);
        builder.emit_pop();
    }
    builder.append(ctx.generate(last)?);
    builder.mark(end);
    Ok(builder.finish())
}

/// Three-valued `AND` (`decides_on = false`) or `OR` (`decides_on = true`).
///
/// The first operand equal to `decides_on` settles the result. Otherwise the
/// result is NULL if any operand was NULL, else `!decides_on`.
///
/// ```text
///     PUSH_FALSE
///     SET_LOCAL seen
///     for each operand:
///         <operand>
///         JUMP_IF_TRUE op_null
///         JUMP_IF_FALSE/TRUE decided
///         JUMP next
///     op_null:
///         POP
///         PUSH_TRUE
///         SET_LOCAL seen
///     next:
///     GET_LOCAL seen
///     JUMP_IF_TRUE result_null
///     PUSH !decides_on
///     PUSH_FALSE
///     JUMP end
/// result_null:
///     PUSH_UNDEFINED
///     PUSH_TRUE
///     JUMP end
/// decided:
///     PUSH decides_on
///     PUSH_FALSE
/// end:
/// ```
fn compile_logical(
    ctx: &mut GenerationContext<'_>,
    expr: &SpecialFormExpression,
    decides_on: bool,
) -> Result<CodeUnit> {
    check_arity(expr, 1, usize::MAX)?;
    expect_type(
        format_args!("{} result", expr.form),
        SqlType::Boolean,
        expr.return_type,
    )?;
    for operand in &expr.arguments {
        expect_type(
            format_args!("{} operand", expr.form),
            SqlType::Boolean,
            operand.sql_type(),
        )?;
    }
    let decide_op = if decides_on {
        OpCode::JumpIfTrue
    } else {
        OpCode::JumpIfFalse
    };

    in_block(ctx, |ctx| {
        let seen = ctx.allocate_temp(SqlType::Boolean)?;
        let decided = ctx.new_label();
        let result_null = ctx.new_label();
        let end = ctx.new_label();

        let mut builder = CodeBuilder::new();
        builder.emit_bool(false);
        builder.emit_set_local(seen);

        for operand in &expr.arguments {
            let operand_null = ctx.new_label();
            let next = ctx.new_label();
            builder.append(ctx.generate(operand)?);
            builder.emit_jump(OpCode::JumpIfTrue, operand_null);
            builder.emit_jump(decide_op, decided);
            builder.emit_jump(OpCode::Jump, next);
            builder.mark(operand_null);
            builder.emit_pop();
            builder.emit_bool(true);
            builder.emit_set_local(seen);
            builder.mark(next);
        }

        builder.emit_get_local(seen);
        builder.emit_jump(OpCode::JumpIfTrue, result_null);
        builder.emit_bool(!decides_on);
        builder.emit_bool(false);
        builder.emit_jump(OpCode::Jump, end);

        builder.mark(result_null);
        builder.emit_null_pair();
        builder.emit_jump(OpCode::Jump, end);

        builder.mark(decided);
        builder.emit_bool(decides_on);
        builder.emit_bool(false);
        builder.mark(end);
        Ok(builder.finish())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{RowExpression, RowExpressionCompiler};
    use rowgen_registry::FunctionRegistry;

    fn generate(layout: &[SqlType], expr: &RowExpression) -> Result<CodeUnit> {
        let registry = FunctionRegistry::with_builtins();
        let traversal = RowExpressionCompiler::new(layout);
        let mut ctx = GenerationContext::new(&traversal, &registry);
        let code = ctx.generate(expr)?;
        assert_eq!(ctx.scope().depth(), 0);
        Ok(code)
    }

    fn flag(field: usize) -> RowExpression {
        RowExpression::input(field, SqlType::Boolean)
    }

    #[test]
    fn if_shape() {
        let expr = RowExpression::if_then_else(
            flag(0),
            RowExpression::constant(1_i64),
            RowExpression::constant(2_i64),
        );
        let code = generate(&[SqlType::Boolean], &expr).unwrap();
        assert_eq!(
            code.opcodes(),
            vec![
                OpCode::GetInput,
                OpCode::JumpIfTrue,
                OpCode::JumpIfFalse,
                OpCode::Constant,
                OpCode::PushFalse,
                OpCode::Jump,
                OpCode::Pop,
                OpCode::Constant,
                OpCode::PushFalse,
            ]
        );
        assert!(code.assemble().is_ok());
    }

    #[test]
    fn if_without_else_yields_null() {
        let expr = RowExpression::special_form(
            SpecialForm::If,
            SqlType::Bigint,
            vec![flag(0), RowExpression::constant(1_i64)],
        );
        let ops = generate(&[SqlType::Boolean], &expr).unwrap().opcodes();
        assert_eq!(
            &ops[ops.len() - 2..],
            &[OpCode::PushUndefined, OpCode::PushTrue]
        );
    }

    #[test]
    fn if_condition_must_be_boolean() {
        let expr = RowExpression::if_then_else(
            RowExpression::constant(1_i64),
            RowExpression::constant(1_i64),
            RowExpression::constant(2_i64),
        );
        assert!(matches!(
            generate(&[], &expr),
            Err(CompilationError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn if_branches_must_agree() {
        let expr = RowExpression::if_then_else(
            flag(0),
            RowExpression::constant(1_i64),
            RowExpression::constant("two"),
        );
        assert!(matches!(
            generate(&[SqlType::Boolean], &expr),
            Err(CompilationError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn is_null_uses_temporary() {
        let registry = FunctionRegistry::new();
        let traversal = RowExpressionCompiler::new(&[SqlType::Varchar]);
        let mut ctx = GenerationContext::new(&traversal, &registry);

        let expr = RowExpression::is_null(RowExpression::input(0, SqlType::Varchar));
        let code = ctx.generate(&expr).unwrap();
        assert_eq!(
            code.opcodes(),
            vec![
                OpCode::GetInput,
                OpCode::SetLocal,
                OpCode::Pop,
                OpCode::GetLocal,
                OpCode::PushFalse,
            ]
        );
        assert_eq!(ctx.scope().live_count(), 0);
        assert_eq!(ctx.scope().frame_size(), 1);
    }

    #[test]
    fn coalesce_single_operand_is_plain() {
        let expr = RowExpression::coalesce(vec![RowExpression::input(0, SqlType::Bigint)]);
        let code = generate(&[SqlType::Bigint], &expr).unwrap();
        assert_eq!(code.opcodes(), vec![OpCode::GetInput]);
    }

    #[test]
    fn coalesce_requires_operands() {
        let expr = RowExpression::special_form(SpecialForm::Coalesce, SqlType::Bigint, vec![]);
        assert!(matches!(
            generate(&[], &expr),
            Err(CompilationError::ArityMismatch { .. })
        ));
    }

    #[test]
    fn coalesce_shape() {
        let expr = RowExpression::coalesce(vec![
            RowExpression::input(0, SqlType::Bigint),
            RowExpression::constant(0_i64),
        ]);
        let code = generate(&[SqlType::Bigint], &expr).unwrap();
        assert_eq!(
            code.opcodes(),
            vec![
                OpCode::GetInput,
                OpCode::JumpIfTrue,
                OpCode::PushFalse,
                OpCode::Jump,
                OpCode::Pop,
                OpCode::Constant,
                OpCode::PushFalse,
            ]
        );
        assert!(code.assemble().is_ok());
    }

    #[test]
    fn nested_logic_uses_distinct_temporaries() {
        let registry = FunctionRegistry::new();
        let traversal = RowExpressionCompiler::new(&[SqlType::Boolean; 3]);
        let mut ctx = GenerationContext::new(&traversal, &registry);

        let expr = RowExpression::and(vec![flag(0), RowExpression::or(vec![flag(1), flag(2)])]);
        let code = ctx.generate(&expr).unwrap();
        assert!(code.assemble().is_ok());
        assert_eq!(ctx.scope().frame_size(), 2);
        assert_eq!(ctx.scope().live_count(), 0);
    }

    #[test]
    fn logical_operands_must_be_boolean() {
        let expr = RowExpression::or(vec![flag(0), RowExpression::constant(1_i64)]);
        assert!(matches!(
            generate(&[SqlType::Boolean], &expr),
            Err(CompilationError::TypeMismatch { .. })
        ));
    }
}
