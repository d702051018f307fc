//! Invocation targets: the runtime-invocable references behind descriptors.
//!
//! A target is either a [`NativeFn`] (a plain callable) or a
//! [`BoundClosure`] (a callable plus constants captured when it was built).
//! Both are handled uniformly through [`InvocationTarget`].
//!
//! # Identity
//!
//! Every target receives a fresh [`TargetId`] when it is created. Clones share
//! the id. Two targets are the same target exactly when their
//! [`TargetIdentity`] (variant tag plus id) matches, so two closures that
//! capture equal constants remain distinct targets.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{Datum, NativeError, Session, SqlType, Value};

static NEXT_TARGET_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique id assigned to a target when it is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(u64);

impl TargetId {
    fn next() -> Self {
        TargetId(NEXT_TARGET_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Identity key of an [`InvocationTarget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetIdentity {
    Native(TargetId),
    Closure(TargetId),
}

// ============================================================================
// Call Frame
// ============================================================================

/// The arguments and context handed to a target for one invocation.
///
/// For targets using the null-returning convention every argument is
/// `Some`. Targets that receive null flags see `None` for null arguments.
#[derive(Debug, Clone, Copy)]
pub struct CallFrame<'a> {
    session: Option<&'a Session>,
    args: &'a [Datum],
}

impl<'a> CallFrame<'a> {
    pub fn new(session: Option<&'a Session>, args: &'a [Datum]) -> Self {
        Self { session, args }
    }

    /// The injected execution context.
    pub fn session(&self) -> Result<&'a Session, NativeError> {
        self.session.ok_or(NativeError::MissingContext)
    }

    /// All SQL-visible arguments, in source order.
    pub fn args(&self) -> &'a [Datum] {
        self.args
    }

    /// Argument `index`, which may be null.
    pub fn arg(&self, index: usize) -> Result<&'a Datum, NativeError> {
        self.args
            .get(index)
            .ok_or(NativeError::MissingArgument { index })
    }

    /// Argument `index`, which must not be null.
    pub fn value(&self, index: usize) -> Result<&'a Value, NativeError> {
        self.arg(index)?
            .as_ref()
            .ok_or(NativeError::NullArgument { index })
    }

    pub fn boolean(&self, index: usize) -> Result<bool, NativeError> {
        let value = self.value(index)?;
        value
            .as_bool()
            .ok_or_else(|| mismatch(index, SqlType::Boolean, value))
    }

    pub fn bigint(&self, index: usize) -> Result<i64, NativeError> {
        let value = self.value(index)?;
        value
            .as_bigint()
            .ok_or_else(|| mismatch(index, SqlType::Bigint, value))
    }

    pub fn double(&self, index: usize) -> Result<f64, NativeError> {
        let value = self.value(index)?;
        value
            .as_double()
            .ok_or_else(|| mismatch(index, SqlType::Double, value))
    }

    pub fn varchar(&self, index: usize) -> Result<&'a str, NativeError> {
        let value = self.value(index)?;
        value
            .as_str()
            .ok_or_else(|| mismatch(index, SqlType::Varchar, value))
    }

    pub fn timestamp(&self, index: usize) -> Result<i64, NativeError> {
        let value = self.value(index)?;
        value
            .as_timestamp()
            .ok_or_else(|| mismatch(index, SqlType::Timestamp, value))
    }
}

fn mismatch(index: usize, expected: SqlType, got: &Value) -> NativeError {
    NativeError::ArgumentType {
        index,
        expected,
        got: got.sql_type().name().to_string(),
    }
}

// ============================================================================
// Native Functions
// ============================================================================

/// Trait for callable native functions.
pub trait NativeCallable {
    fn call(&self, frame: &CallFrame<'_>) -> Result<Datum, NativeError>;
}

impl<F> NativeCallable for F
where
    F: Fn(&CallFrame<'_>) -> Result<Datum, NativeError>,
{
    fn call(&self, frame: &CallFrame<'_>) -> Result<Datum, NativeError> {
        (self)(frame)
    }
}

/// Type-erased native function.
///
/// The callable is shared behind an `Arc`, so clones are cheap and keep the
/// same [`TargetId`].
#[derive(Clone)]
pub struct NativeFn {
    id: TargetId,
    name: Arc<str>,
    inner: Arc<dyn NativeCallable + Send + Sync>,
}

impl NativeFn {
    pub fn new<F>(name: impl Into<Arc<str>>, f: F) -> Self
    where
        F: NativeCallable + Send + Sync + 'static,
    {
        Self {
            id: TargetId::next(),
            name: name.into(),
            inner: Arc::new(f),
        }
    }

    pub fn id(&self) -> TargetId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, frame: &CallFrame<'_>) -> Result<Datum, NativeError> {
        self.inner.call(frame)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFn")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Bound Closures
// ============================================================================

/// Body of a [`BoundClosure`]: receives the captured constants first.
pub trait ClosureBody {
    fn call(&self, captured: &[Value], frame: &CallFrame<'_>) -> Result<Datum, NativeError>;
}

impl<F> ClosureBody for F
where
    F: Fn(&[Value], &CallFrame<'_>) -> Result<Datum, NativeError>,
{
    fn call(&self, captured: &[Value], frame: &CallFrame<'_>) -> Result<Datum, NativeError> {
        (self)(captured, frame)
    }
}

/// A callable together with constants captured when it was built.
///
/// Used for functions specialized at registration time, e.g. a pattern
/// matcher closed over its pattern.
#[derive(Clone)]
pub struct BoundClosure {
    id: TargetId,
    name: Arc<str>,
    captured: Arc<[Value]>,
    body: Arc<dyn ClosureBody + Send + Sync>,
}

impl BoundClosure {
    pub fn new<F>(name: impl Into<Arc<str>>, captured: Vec<Value>, body: F) -> Self
    where
        F: ClosureBody + Send + Sync + 'static,
    {
        Self {
            id: TargetId::next(),
            name: name.into(),
            captured: captured.into(),
            body: Arc::new(body),
        }
    }

    pub fn id(&self) -> TargetId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn captured(&self) -> &[Value] {
        &self.captured
    }

    pub fn call(&self, frame: &CallFrame<'_>) -> Result<Datum, NativeError> {
        self.body.call(&self.captured, frame)
    }
}

impl fmt::Debug for BoundClosure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundClosure")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("captured", &self.captured)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Invocation Target
// ============================================================================

/// A runtime-invocable reference, compared by identity.
#[derive(Debug, Clone)]
pub enum InvocationTarget {
    Native(NativeFn),
    Closure(BoundClosure),
}

impl InvocationTarget {
    /// The identity key used for deduplication.
    pub fn identity(&self) -> TargetIdentity {
        match self {
            InvocationTarget::Native(f) => TargetIdentity::Native(f.id()),
            InvocationTarget::Closure(c) => TargetIdentity::Closure(c.id()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            InvocationTarget::Native(f) => f.name(),
            InvocationTarget::Closure(c) => c.name(),
        }
    }

    pub fn invoke(&self, frame: &CallFrame<'_>) -> Result<Datum, NativeError> {
        match self {
            InvocationTarget::Native(f) => f.call(frame),
            InvocationTarget::Closure(c) => c.call(frame),
        }
    }
}

impl PartialEq for InvocationTarget {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for InvocationTarget {}

impl From<NativeFn> for InvocationTarget {
    fn from(f: NativeFn) -> Self {
        InvocationTarget::Native(f)
    }
}

impl From<BoundClosure> for InvocationTarget {
    fn from(c: BoundClosure) -> Self {
        InvocationTarget::Closure(c)
    }
}
