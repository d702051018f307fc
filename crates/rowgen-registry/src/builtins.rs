//! Built-in scalar functions.
//!
//! | Group      | Functions                                             | Convention       |
//! |------------|-------------------------------------------------------|------------------|
//! | arithmetic | `plus`/`add`, `minus`, `multiply`, `divide`, `negate` | strict           |
//! | comparison | `equal`, `less_than`, `greater_than`                  | strict           |
//! | varchar    | `concat`, `upper`, `lower`, `length`                  | strict           |
//! | null-aware | `is_distinct_from`, `nullif`                          | null flags       |
//! | session    | `current_timestamp`, `current_user`, `local_day`      | strict, context  |
//! | constants  | `pi`, `e`                                             | bound closures   |
//!
//! `add(bigint, bigint)` shares its target with `plus(bigint, bigint)`, so a
//! unit calling both binds a single target.

use rowgen_core::{
    CallFrame, Datum, FunctionDescriptor, FunctionDescriptorBuilder, InvocationTarget, NativeError,
    NativeFn, SqlType, Value,
};

use SqlType::{Bigint, Boolean, Double, Timestamp, Varchar};

const MILLIS_PER_DAY: i64 = 86_400_000;
const MILLIS_PER_MINUTE: i64 = 60_000;

/// Every built-in function descriptor.
pub fn all() -> Vec<FunctionDescriptor> {
    let plus_target = InvocationTarget::from(NativeFn::new("plus", plus_bigint));

    vec![
        // Arithmetic
        binary("plus", Bigint, Bigint)
            .target(plus_target.clone())
            .build(),
        binary("add", Bigint, Bigint).target(plus_target).build(),
        strict2("plus", Double, Double, plus_double),
        strict2("minus", Bigint, Bigint, minus_bigint),
        strict2("minus", Double, Double, minus_double),
        strict2("multiply", Bigint, Bigint, multiply_bigint),
        strict2("multiply", Double, Double, multiply_double),
        strict2("divide", Bigint, Bigint, divide_bigint),
        strict2("divide", Double, Double, divide_double),
        strict1("negate", Bigint, Bigint, negate_bigint),
        strict1("negate", Double, Double, negate_double),
        // Comparison
        strict2("equal", Bigint, Boolean, equal),
        strict2("equal", Double, Boolean, equal),
        strict2("equal", Varchar, Boolean, equal),
        strict2("equal", Boolean, Boolean, equal),
        strict2("less_than", Bigint, Boolean, less_than_bigint),
        strict2("less_than", Double, Boolean, less_than_double),
        strict2("greater_than", Bigint, Boolean, greater_than_bigint),
        strict2("greater_than", Double, Boolean, greater_than_double),
        // Varchar
        strict2("concat", Varchar, Varchar, concat),
        strict1("upper", Varchar, Varchar, upper),
        strict1("lower", Varchar, Varchar, lower),
        strict1("length", Varchar, Bigint, length),
        // Null-aware
        binary("is_distinct_from", Bigint, Boolean)
            .receives_null_flags()
            .native(is_distinct_from)
            .build(),
        binary("is_distinct_from", Varchar, Boolean)
            .receives_null_flags()
            .native(is_distinct_from)
            .build(),
        binary("nullif", Bigint, Bigint)
            .receives_null_flags()
            .native(nullif)
            .build(),
        binary("nullif", Varchar, Varchar)
            .receives_null_flags()
            .native(nullif)
            .build(),
        // Session
        FunctionDescriptor::builder("current_timestamp", Timestamp)
            .requires_context()
            .native(current_timestamp)
            .build(),
        FunctionDescriptor::builder("current_user", Varchar)
            .requires_context()
            .native(current_user)
            .build(),
        unary("local_day", Timestamp, Bigint)
            .requires_context()
            .native(local_day)
            .build(),
        // Constants
        FunctionDescriptor::builder("pi", Double)
            .closure(vec![Value::Double(std::f64::consts::PI)], captured_constant)
            .build(),
        FunctionDescriptor::builder("e", Double)
            .closure(vec![Value::Double(std::f64::consts::E)], captured_constant)
            .build(),
    ]
}

fn unary(name: &str, argument: SqlType, returns: SqlType) -> FunctionDescriptorBuilder {
    FunctionDescriptor::builder(name, returns).argument(argument)
}

/// Both arguments share one type.
fn binary(name: &str, arguments: SqlType, returns: SqlType) -> FunctionDescriptorBuilder {
    FunctionDescriptor::builder(name, returns).arguments([arguments, arguments])
}

type Native = fn(&CallFrame<'_>) -> Result<Datum, NativeError>;

fn strict1(name: &str, argument: SqlType, returns: SqlType, f: Native) -> FunctionDescriptor {
    unary(name, argument, returns).native(f).build()
}

fn strict2(name: &str, arguments: SqlType, returns: SqlType, f: Native) -> FunctionDescriptor {
    binary(name, arguments, returns).native(f).build()
}

// ============================================================================
// Arithmetic
// ============================================================================

fn plus_bigint(frame: &CallFrame<'_>) -> Result<Datum, NativeError> {
    frame
        .bigint(0)?
        .checked_add(frame.bigint(1)?)
        .map(|v| Some(Value::Bigint(v)))
        .ok_or(NativeError::Overflow { operation: "plus" })
}

fn minus_bigint(frame: &CallFrame<'_>) -> Result<Datum, NativeError> {
    frame
        .bigint(0)?
        .checked_sub(frame.bigint(1)?)
        .map(|v| Some(Value::Bigint(v)))
        .ok_or(NativeError::Overflow { operation: "minus" })
}

fn multiply_bigint(frame: &CallFrame<'_>) -> Result<Datum, NativeError> {
    frame
        .bigint(0)?
        .checked_mul(frame.bigint(1)?)
        .map(|v| Some(Value::Bigint(v)))
        .ok_or(NativeError::Overflow {
            operation: "multiply",
        })
}

fn divide_bigint(frame: &CallFrame<'_>) -> Result<Datum, NativeError> {
    let divisor = frame.bigint(1)?;
    if divisor == 0 {
        return Err(NativeError::DivisionByZero);
    }
    frame
        .bigint(0)?
        .checked_div(divisor)
        .map(|v| Some(Value::Bigint(v)))
        .ok_or(NativeError::Overflow {
            operation: "divide",
        })
}

fn negate_bigint(frame: &CallFrame<'_>) -> Result<Datum, NativeError> {
    frame
        .bigint(0)?
        .checked_neg()
        .map(|v| Some(Value::Bigint(v)))
        .ok_or(NativeError::Overflow {
            operation: "negate",
        })
}

fn plus_double(frame: &CallFrame<'_>) -> Result<Datum, NativeError> {
    Ok(Some(Value::Double(frame.double(0)? + frame.double(1)?)))
}

fn minus_double(frame: &CallFrame<'_>) -> Result<Datum, NativeError> {
    Ok(Some(Value::Double(frame.double(0)? - frame.double(1)?)))
}

fn multiply_double(frame: &CallFrame<'_>) -> Result<Datum, NativeError> {
    Ok(Some(Value::Double(frame.double(0)? * frame.double(1)?)))
}

fn divide_double(frame: &CallFrame<'_>) -> Result<Datum, NativeError> {
    Ok(Some(Value::Double(frame.double(0)? / frame.double(1)?)))
}

fn negate_double(frame: &CallFrame<'_>) -> Result<Datum, NativeError> {
    Ok(Some(Value::Double(-frame.double(0)?)))
}

// ============================================================================
// Comparison
// ============================================================================

fn equal(frame: &CallFrame<'_>) -> Result<Datum, NativeError> {
    Ok(Some(Value::Boolean(frame.value(0)? == frame.value(1)?)))
}

fn less_than_bigint(frame: &CallFrame<'_>) -> Result<Datum, NativeError> {
    Ok(Some(Value::Boolean(frame.bigint(0)? < frame.bigint(1)?)))
}

fn less_than_double(frame: &CallFrame<'_>) -> Result<Datum, NativeError> {
    Ok(Some(Value::Boolean(frame.double(0)? < frame.double(1)?)))
}

fn greater_than_bigint(frame: &CallFrame<'_>) -> Result<Datum, NativeError> {
    Ok(Some(Value::Boolean(frame.bigint(0)? > frame.bigint(1)?)))
}

fn greater_than_double(frame: &CallFrame<'_>) -> Result<Datum, NativeError> {
    Ok(Some(Value::Boolean(frame.double(0)? > frame.double(1)?)))
}

// ============================================================================
// Varchar
// ============================================================================

fn concat(frame: &CallFrame<'_>) -> Result<Datum, NativeError> {
    let mut out = String::from(frame.varchar(0)?);
    out.push_str(frame.varchar(1)?);
    Ok(Some(Value::varchar(out)))
}

fn upper(frame: &CallFrame<'_>) -> Result<Datum, NativeError> {
    Ok(Some(Value::varchar(frame.varchar(0)?.to_uppercase())))
}

fn lower(frame: &CallFrame<'_>) -> Result<Datum, NativeError> {
    Ok(Some(Value::varchar(frame.varchar(0)?.to_lowercase())))
}

fn length(frame: &CallFrame<'_>) -> Result<Datum, NativeError> {
    let chars = frame.varchar(0)?.chars().count();
    Ok(Some(Value::Bigint(chars as i64)))
}

// ============================================================================
// Null-aware
// ============================================================================

/// Never null: two nulls are not distinct, a null and a value are.
fn is_distinct_from(frame: &CallFrame<'_>) -> Result<Datum, NativeError> {
    Ok(Some(Value::Boolean(frame.arg(0)? != frame.arg(1)?)))
}

/// Null when the first argument is null or both are equal.
fn nullif(frame: &CallFrame<'_>) -> Result<Datum, NativeError> {
    let first = frame.arg(0)?;
    if first == frame.arg(1)? {
        return Ok(None);
    }
    Ok(first.clone())
}

// ============================================================================
// Session
// ============================================================================

fn current_timestamp(frame: &CallFrame<'_>) -> Result<Datum, NativeError> {
    let session = frame.session()?;
    Ok(Some(Value::Timestamp(session.start_time_millis())))
}

fn current_user(frame: &CallFrame<'_>) -> Result<Datum, NativeError> {
    let session = frame.session()?;
    Ok(Some(Value::varchar(session.user())))
}

/// Days since the epoch in the session's local time.
fn local_day(frame: &CallFrame<'_>) -> Result<Datum, NativeError> {
    let offset = i64::from(frame.session()?.utc_offset_minutes()) * MILLIS_PER_MINUTE;
    let local = frame
        .timestamp(0)?
        .checked_add(offset)
        .ok_or(NativeError::Overflow {
            operation: "local_day",
        })?;
    Ok(Some(Value::Bigint(local.div_euclid(MILLIS_PER_DAY))))
}

// ============================================================================
// Constants
// ============================================================================

fn captured_constant(captured: &[Value], _frame: &CallFrame<'_>) -> Result<Datum, NativeError> {
    Ok(captured.first().cloned())
}
