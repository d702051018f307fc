//! Constant and input reference compilation.

use rowgen_core::{CompilationError, SqlType, Value};

use crate::bytecode::CodeUnit;
use crate::context::GenerationContext;
use crate::emit::CodeBuilder;

use super::expect_type;

type Result<T> = std::result::Result<T, CompilationError>;

/// Compile a literal.
///
/// Booleans load directly; every other value goes through the unit's
/// constant pool. A NULL literal is the null pair.
pub fn compile_constant(
    ctx: &mut GenerationContext<'_>,
    value: Option<&Value>,
    sql_type: SqlType,
) -> Result<CodeUnit> {
    let mut builder = CodeBuilder::new();
    match value {
        None => builder.emit_null_pair(),
        Some(value) => {
            expect_type("constant", sql_type, value.sql_type())?;
            match value {
                Value::Boolean(b) => builder.emit_bool(*b),
                other => {
                    let index = ctx.add_constant(other.clone())?;
                    builder.emit_constant(index);
                }
            }
            builder.emit_bool(false);
        }
    }
    Ok(builder.finish())
}

/// Compile a reference to field `field` of the input row.
pub fn compile_input(layout: &[SqlType], field: usize, sql_type: SqlType) -> Result<CodeUnit> {
    let declared = layout
        .get(field)
        .copied()
        .ok_or(CompilationError::UnknownInput {
            index: field,
            width: layout.len(),
        })?;
    expect_type(format_args!("input #{field}"), declared, sql_type)?;

    let index = u16::try_from(field).map_err(|_| CompilationError::UnknownInput {
        index: field,
        width: layout.len(),
    })?;

    let mut builder = CodeBuilder::new();
    builder.emit_get_input(index);
    Ok(builder.finish())
}
