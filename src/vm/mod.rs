//! Reference executor for compiled units.
//!
//! Runs the bytecode of a [`CompiledUnit`] against one input row. Every
//! expression leaves a `(value, is_null)` pair on the stack, so the final
//! `Return` pops the flag and then the value. Null slots hold
//! [`Slot::Undefined`], which only ever sits under a `true` flag.
//!
//! The executor is stateless between rows; each [`Executor::evaluate`] call
//! gets a fresh stack and a fresh set of temporaries.

mod error;

pub use error::RuntimeError;

use rowgen_compiler::CompiledUnit;
use rowgen_compiler::binder::BindingToken;
use rowgen_compiler::bytecode::{BytecodeChunk, CallFlags, OpCode};
use rowgen_core::{CallFrame, Datum, InvocationTarget, Session, Value};

type Result<T> = std::result::Result<T, RuntimeError>;

/// A stack or temporary slot.
#[derive(Debug, Clone, PartialEq)]
enum Slot {
    /// Placeholder under a null flag, or an unwritten temporary.
    Undefined,
    Value(Value),
    /// The execution context, pushed ahead of a context-aware call.
    Context,
}

impl Slot {
    fn describe(&self) -> String {
        match self {
            Slot::Undefined => "undefined".to_string(),
            Slot::Value(value) => value.sql_type().name().to_string(),
            Slot::Context => "context".to_string(),
        }
    }
}

/// Executes one compiled unit against rows.
#[derive(Debug, Clone, Copy)]
pub struct Executor<'a> {
    unit: &'a CompiledUnit,
    session: Option<&'a Session>,
}

impl<'a> Executor<'a> {
    /// Create an executor. `session` is handed to context-aware functions;
    /// without one they fail with a missing-context error.
    pub fn new(unit: &'a CompiledUnit, session: Option<&'a Session>) -> Self {
        Self { unit, session }
    }

    pub fn unit(&self) -> &'a CompiledUnit {
        self.unit
    }

    /// Evaluate the unit over `row`. `None` is SQL NULL.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn evaluate(&self, row: &[Datum]) -> Result<Datum> {
        let chunk = self.unit.chunk();
        let mut stack: Vec<Slot> = Vec::with_capacity(16);
        let mut locals = vec![Slot::Undefined; self.unit.local_count()];
        let mut ip = 0;

        loop {
            if ip >= chunk.len() {
                return Err(RuntimeError::MissingReturn);
            }
            let op = chunk
                .read_op(ip)
                .ok_or(RuntimeError::InvalidOpcode { offset: ip })?;
            let operand = ip + 1;
            let next = operand + op.operand_size();

            match op {
                OpCode::Constant => {
                    let index = usize::from(read_byte(chunk, operand)?);
                    stack.push(Slot::Value(self.constant(index)?));
                }
                OpCode::ConstantWide => {
                    let index = usize::from(read_u16(chunk, operand)?);
                    stack.push(Slot::Value(self.constant(index)?));
                }
                OpCode::PushUndefined => stack.push(Slot::Undefined),
                OpCode::PushTrue => stack.push(Slot::Value(Value::Boolean(true))),
                OpCode::PushFalse => stack.push(Slot::Value(Value::Boolean(false))),
                OpCode::Pop => {
                    pop(&mut stack, ip)?;
                }
                OpCode::GetLocal | OpCode::GetLocalWide => {
                    let slot = local_operand(chunk, op, operand)?;
                    let value = locals
                        .get(slot)
                        .cloned()
                        .ok_or(RuntimeError::InvalidLocal { slot })?;
                    stack.push(value);
                }
                OpCode::SetLocal | OpCode::SetLocalWide => {
                    let slot = local_operand(chunk, op, operand)?;
                    let value = pop(&mut stack, ip)?;
                    let target = locals
                        .get_mut(slot)
                        .ok_or(RuntimeError::InvalidLocal { slot })?;
                    *target = value;
                }
                OpCode::GetInput => {
                    let field = usize::from(read_u16(chunk, operand)?);
                    match row.get(field).ok_or(RuntimeError::MissingInput { field })? {
                        Some(value) => {
                            stack.push(Slot::Value(value.clone()));
                            stack.push(Slot::Value(Value::Boolean(false)));
                        }
                        None => {
                            stack.push(Slot::Undefined);
                            stack.push(Slot::Value(Value::Boolean(true)));
                        }
                    }
                }
                OpCode::PushContext => stack.push(Slot::Context),
                OpCode::Jump => {
                    ip = next + usize::from(read_u16(chunk, operand)?);
                    continue;
                }
                OpCode::JumpIfTrue | OpCode::JumpIfFalse => {
                    let distance = usize::from(read_u16(chunk, operand)?);
                    let condition = pop_bool(&mut stack, ip)?;
                    if condition == (op == OpCode::JumpIfTrue) {
                        ip = next + distance;
                        continue;
                    }
                }
                OpCode::Invoke | OpCode::InvokeNullable => {
                    self.invoke(chunk, op, ip, &mut stack)?;
                }
                OpCode::Return => {
                    let is_null = pop_bool(&mut stack, ip)?;
                    let value = pop(&mut stack, ip)?;
                    if !stack.is_empty() {
                        return Err(RuntimeError::UnbalancedStack {
                            remaining: stack.len(),
                        });
                    }
                    return if is_null {
                        Ok(None)
                    } else {
                        expect_value(value).map(Some)
                    };
                }
            }

            ip = next;
        }
    }

    fn constant(&self, index: usize) -> Result<Value> {
        self.unit
            .constants()
            .get(index)
            .cloned()
            .ok_or(RuntimeError::UnknownConstant { index })
    }

    /// Execute an `Invoke`/`InvokeNullable` at `ip`.
    ///
    /// Strict calls find bare values on the stack and push a bare value;
    /// null-flag calls find `(value, is_null)` pairs and push a pair.
    fn invoke(
        &self,
        chunk: &BytecodeChunk,
        op: OpCode,
        ip: usize,
        stack: &mut Vec<Slot>,
    ) -> Result<()> {
        let token = read_u16(chunk, ip + 1)?;
        let argc = usize::from(read_byte(chunk, ip + 3)?);
        let flags = CallFlags::from_bits_truncate(read_byte(chunk, ip + 4)?);

        let target = self
            .unit
            .binding(BindingToken::new(token))
            .ok_or(RuntimeError::UnboundToken { token })?;

        let with_context = flags.contains(CallFlags::CONTEXT);
        let sql_argc = argc
            .checked_sub(usize::from(with_context))
            .ok_or(RuntimeError::MalformedCall { offset: ip })?;

        let mut args: Vec<Datum> = Vec::with_capacity(sql_argc);
        for _ in 0..sql_argc {
            let arg = match op {
                OpCode::InvokeNullable => pop_datum(stack, ip)?,
                _ => Some(expect_value(pop(stack, ip)?)?),
            };
            args.push(arg);
        }
        args.reverse();

        if with_context {
            match pop(stack, ip)? {
                Slot::Context => {}
                other => {
                    return Err(RuntimeError::TypeError {
                        expected: "context",
                        found: other.describe(),
                    });
                }
            }
        }

        let session = if with_context { self.session } else { None };
        let result = call(target, &CallFrame::new(session, &args))?;

        match (op, result) {
            (OpCode::InvokeNullable, Some(value)) => {
                stack.push(Slot::Value(value));
                stack.push(Slot::Value(Value::Boolean(false)));
            }
            (OpCode::InvokeNullable, None) => {
                stack.push(Slot::Undefined);
                stack.push(Slot::Value(Value::Boolean(true)));
            }
            (_, Some(value)) => stack.push(Slot::Value(value)),
            (_, None) => {
                return Err(RuntimeError::NullResult {
                    function: target.name().to_string(),
                });
            }
        }
        Ok(())
    }
}

fn call(target: &InvocationTarget, frame: &CallFrame<'_>) -> Result<Datum> {
    tracing::trace!(target = target.name(), argc = frame.args().len(), "invoke");
    target.invoke(frame).map_err(|source| RuntimeError::Native {
        function: target.name().to_string(),
        source,
    })
}

fn read_byte(chunk: &BytecodeChunk, offset: usize) -> Result<u8> {
    chunk
        .read_byte(offset)
        .ok_or(RuntimeError::TruncatedOperand { offset })
}

fn read_u16(chunk: &BytecodeChunk, offset: usize) -> Result<u16> {
    chunk
        .read_u16(offset)
        .ok_or(RuntimeError::TruncatedOperand { offset })
}

fn local_operand(chunk: &BytecodeChunk, op: OpCode, offset: usize) -> Result<usize> {
    match op {
        OpCode::GetLocalWide | OpCode::SetLocalWide => read_u16(chunk, offset).map(usize::from),
        _ => read_byte(chunk, offset).map(usize::from),
    }
}

fn pop(stack: &mut Vec<Slot>, offset: usize) -> Result<Slot> {
    stack.pop().ok_or(RuntimeError::StackUnderflow { offset })
}

fn pop_bool(stack: &mut Vec<Slot>, offset: usize) -> Result<bool> {
    match pop(stack, offset)? {
        Slot::Value(Value::Boolean(b)) => Ok(b),
        other => Err(RuntimeError::TypeError {
            expected: "boolean",
            found: other.describe(),
        }),
    }
}

/// Pop a `(value, is_null)` pair.
fn pop_datum(stack: &mut Vec<Slot>, offset: usize) -> Result<Datum> {
    if pop_bool(stack, offset)? {
        pop(stack, offset)?;
        Ok(None)
    } else {
        expect_value(pop(stack, offset)?).map(Some)
    }
}

fn expect_value(slot: Slot) -> Result<Value> {
    match slot {
        Slot::Value(value) => Ok(value),
        other => Err(RuntimeError::TypeError {
            expected: "value",
            found: other.describe(),
        }),
    }
}
