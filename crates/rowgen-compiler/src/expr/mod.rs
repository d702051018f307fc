//! Row expressions and their default traversal.
//!
//! A [`RowExpression`] is a typed tree over one input row: constants, input
//! field references, function calls and a handful of special forms whose
//! evaluation is not a plain call (conditionals, null tests, three-valued
//! logic). Every node compiles to code leaving a `(value, is_null)` pair.
//!
//! [`RowExpressionCompiler`] is the default [`RowExpressionVisitor`]. It
//! dispatches each node kind to its own submodule, and re-enters the
//! [`GenerationContext`] for children so that every call site in the tree
//! shares one binder.
//!
//! # Example
//!
//! ```
//! use rowgen_compiler::expr::{RowExpression, RowExpressionCompiler};
//! use rowgen_compiler::GenerationContext;
//! use rowgen_core::SqlType;
//! use rowgen_registry::FunctionRegistry;
//!
//! let registry = FunctionRegistry::with_builtins();
//! let traversal = RowExpressionCompiler::new(&[SqlType::Bigint]);
//! let mut ctx = GenerationContext::new(&traversal, &registry);
//!
//! let expr = RowExpression::call(
//!     "plus",
//!     SqlType::Bigint,
//!     vec![RowExpression::input(0, SqlType::Bigint), RowExpression::constant(5_i64)],
//! );
//! let code = ctx.generate(&expr).unwrap();
//! assert_eq!(code.call_sites().count(), 1);
//! ```

mod calls;
mod literals;
mod special_forms;

use std::fmt;

use rowgen_core::{CompilationError, Datum, SqlType, Value};

use crate::bytecode::CodeUnit;
use crate::context::GenerationContext;

type Result<T> = std::result::Result<T, CompilationError>;

// ============================================================================
// Tree
// ============================================================================

/// A typed scalar expression over one input row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowExpression {
    /// A literal. `None` is a typed NULL.
    Constant { value: Datum, sql_type: SqlType },
    /// A field of the input row.
    InputRef { field: usize, sql_type: SqlType },
    /// A call of a registered function.
    Call(CallExpression),
    /// A form with its own evaluation rules.
    SpecialForm(SpecialFormExpression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpression {
    pub name: String,
    /// Return type the tree expects; checked against the resolved function.
    pub return_type: SqlType,
    pub arguments: Vec<RowExpression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpecialFormExpression {
    pub form: SpecialForm,
    pub return_type: SqlType,
    pub arguments: Vec<RowExpression>,
}

/// Forms compiled inline rather than through a function call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialForm {
    /// `IF(condition, then[, else])`; a NULL condition takes the else branch.
    If,
    /// `operand IS NULL`; never NULL itself.
    IsNull,
    /// First non-NULL operand, or NULL.
    Coalesce,
    /// Three-valued conjunction.
    And,
    /// Three-valued disjunction.
    Or,
}

impl SpecialForm {
    pub fn name(&self) -> &'static str {
        match self {
            SpecialForm::If => "IF",
            SpecialForm::IsNull => "IS_NULL",
            SpecialForm::Coalesce => "COALESCE",
            SpecialForm::And => "AND",
            SpecialForm::Or => "OR",
        }
    }
}

impl fmt::Display for SpecialForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl RowExpression {
    /// A non-null literal.
    pub fn constant(value: impl Into<Value>) -> Self {
        let value = value.into();
        RowExpression::Constant {
            sql_type: value.sql_type(),
            value: Some(value),
        }
    }

    /// A typed NULL literal.
    pub fn null(sql_type: SqlType) -> Self {
        RowExpression::Constant {
            value: None,
            sql_type,
        }
    }

    pub fn input(field: usize, sql_type: SqlType) -> Self {
        RowExpression::InputRef { field, sql_type }
    }

    pub fn call(
        name: impl Into<String>,
        return_type: SqlType,
        arguments: Vec<RowExpression>,
    ) -> Self {
        RowExpression::Call(CallExpression {
            name: name.into(),
            return_type,
            arguments,
        })
    }

    pub fn special_form(
        form: SpecialForm,
        return_type: SqlType,
        arguments: Vec<RowExpression>,
    ) -> Self {
        RowExpression::SpecialForm(SpecialFormExpression {
            form,
            return_type,
            arguments,
        })
    }

    /// `IF(condition, then, otherwise)`, typed after `then`.
    pub fn if_then_else(
        condition: RowExpression,
        then: RowExpression,
        otherwise: RowExpression,
    ) -> Self {
        let return_type = then.sql_type();
        let operands = vec![condition, then, otherwise];
        Self::special_form(SpecialForm::If, return_type, operands)
    }

    pub fn is_null(operand: RowExpression) -> Self {
        Self::special_form(SpecialForm::IsNull, SqlType::Boolean, vec![operand])
    }

    /// `COALESCE(operands...)`, typed after the first operand.
    pub fn coalesce(operands: Vec<RowExpression>) -> Self {
        let return_type = operands
            .first()
            .map_or(SqlType::Boolean, RowExpression::sql_type);
        Self::special_form(SpecialForm::Coalesce, return_type, operands)
    }

    pub fn and(operands: Vec<RowExpression>) -> Self {
        Self::special_form(SpecialForm::And, SqlType::Boolean, operands)
    }

    pub fn or(operands: Vec<RowExpression>) -> Self {
        Self::special_form(SpecialForm::Or, SqlType::Boolean, operands)
    }

    /// The type this node evaluates to.
    pub fn sql_type(&self) -> SqlType {
        match self {
            RowExpression::Constant { sql_type, .. } | RowExpression::InputRef { sql_type, .. } => {
                *sql_type
            }
            RowExpression::Call(call) => call.return_type,
            RowExpression::SpecialForm(form) => form.return_type,
        }
    }
}

// ============================================================================
// Traversal
// ============================================================================

/// Generates code for one node, re-entering `ctx` for its children.
///
/// Implementations must not keep state between calls; everything a unit
/// accumulates lives in the [`GenerationContext`].
pub trait RowExpressionVisitor {
    fn visit(
        &self,
        expression: &RowExpression,
        ctx: &mut GenerationContext<'_>,
    ) -> Result<CodeUnit>;
}

/// The default traversal, checking input references against a row layout.
#[derive(Debug, Clone, Default)]
pub struct RowExpressionCompiler {
    layout: Vec<SqlType>,
}

impl RowExpressionCompiler {
    pub fn new(layout: &[SqlType]) -> Self {
        Self {
            layout: layout.to_vec(),
        }
    }

    pub fn layout(&self) -> &[SqlType] {
        &self.layout
    }
}

impl RowExpressionVisitor for RowExpressionCompiler {
    fn visit(
        &self,
        expression: &RowExpression,
        ctx: &mut GenerationContext<'_>,
    ) -> Result<CodeUnit> {
        match expression {
            RowExpression::Constant { value, sql_type } => {
                literals::compile_constant(ctx, value.as_ref(), *sql_type)
            }
            RowExpression::InputRef { field, sql_type } => {
                literals::compile_input(&self.layout, *field, *sql_type)
            }
            RowExpression::Call(call) => calls::compile_call(ctx, call),
            RowExpression::SpecialForm(form) => special_forms::compile_special_form(ctx, form),
        }
    }
}

/// Fail unless `actual` is `expected`.
fn expect_type(what: impl fmt::Display, expected: SqlType, actual: SqlType) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(CompilationError::TypeMismatch {
            message: format!("{what}: expected {expected}, got {actual}"),
        })
    }
}
