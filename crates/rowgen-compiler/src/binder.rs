//! Per-unit binding of invocation targets to tokens.
//!
//! Generated code never holds a target directly. Each distinct target a
//! unit calls is stored once in the [`CallSiteBinder`] and referenced by a
//! [`BindingToken`]; the binder's table is shipped with the compiled unit
//! and the executor resolves tokens through it.
//!
//! Distinctness is identity: two descriptors sharing one target (for
//! example `plus` and its alias `add`) get the same token, while two
//! closures over equal captured values are still two targets.

use std::fmt;

use rowgen_core::{CompilationError, FunctionDescriptor, InvocationTarget, TargetIdentity};
use rustc_hash::FxHashMap;

/// Maximum number of distinct targets one unit can bind.
pub const MAX_BINDINGS: usize = u16::MAX as usize + 1;

/// Index of a bound target within one compiled unit.
///
/// Tokens are dense, start at 0 and follow first-binding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingToken(u16);

impl BindingToken {
    pub fn new(index: u16) -> Self {
        Self(index)
    }

    pub fn get(self) -> u16 {
        self.0
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BindingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Deduplicating table of the targets one unit invokes.
#[derive(Debug, Default)]
pub struct CallSiteBinder {
    /// Bound targets, indexed by token.
    targets: Vec<InvocationTarget>,
    /// Identity -> token.
    tokens: FxHashMap<TargetIdentity, BindingToken>,
}

impl CallSiteBinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `target`, returning its token.
    ///
    /// A target bound before gets its existing token; a new one gets the
    /// next token in sequence.
    pub fn bind(&mut self, target: &InvocationTarget) -> Result<BindingToken, CompilationError> {
        let identity = target.identity();
        if let Some(&token) = self.tokens.get(&identity) {
            return Ok(token);
        }

        let index = u16::try_from(self.targets.len())
            .map_err(|_| CompilationError::TooManyBindings { max: MAX_BINDINGS })?;
        let token = BindingToken(index);
        tracing::debug!(%token, target = target.name(), "bound new call target");

        self.targets.push(target.clone());
        self.tokens.insert(identity, token);
        Ok(token)
    }

    /// Bind the target behind `descriptor`.
    ///
    /// Fails with [`CompilationError::InvalidBinding`] if the descriptor was
    /// declared without one.
    pub fn bind_function(
        &mut self,
        descriptor: &FunctionDescriptor,
    ) -> Result<BindingToken, CompilationError> {
        let target =
            descriptor
                .invocation_target()
                .ok_or_else(|| CompilationError::InvalidBinding {
                    name: descriptor.signature(),
                    reason: "function has no invocation target".to_string(),
                })?;
        self.bind(target)
    }

    /// The token already assigned to `target`, if any.
    pub fn token_of(&self, target: &InvocationTarget) -> Option<BindingToken> {
        self.tokens.get(&target.identity()).copied()
    }

    pub fn get(&self, token: BindingToken) -> Option<&InvocationTarget> {
        self.targets.get(token.index())
    }

    /// Bound targets in token order.
    pub fn targets(&self) -> &[InvocationTarget] {
        &self.targets
    }

    /// Snapshot of the table, indexed by token.
    pub fn export_table(&self) -> Vec<InvocationTarget> {
        self.targets.clone()
    }

    /// Consume the binder, keeping the table.
    pub fn into_table(self) -> Vec<InvocationTarget> {
        self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowgen_core::{BoundClosure, CallFrame, Datum, NativeError, NativeFn, SqlType, Value};

    fn one(_: &CallFrame<'_>) -> Result<Datum, NativeError> {
        Ok(Some(Value::Bigint(1)))
    }

    fn captured_first(captured: &[Value], _: &CallFrame<'_>) -> Result<Datum, NativeError> {
        Ok(captured.first().cloned())
    }

    #[test]
    fn tokens_follow_first_binding_order() {
        let mut binder = CallSiteBinder::new();
        let a = InvocationTarget::from(NativeFn::new("a", one));
        let b = InvocationTarget::from(NativeFn::new("b", one));

        assert_eq!(binder.bind(&a).unwrap(), BindingToken(0));
        assert_eq!(binder.bind(&b).unwrap(), BindingToken(1));
        assert_eq!(binder.len(), 2);
    }

    #[test]
    fn same_target_binds_once() {
        let mut binder = CallSiteBinder::new();
        let a = InvocationTarget::from(NativeFn::new("a", one));

        let first = binder.bind(&a).unwrap();
        let second = binder.bind(&a.clone()).unwrap();
        assert_eq!(first, second);
        assert_eq!(binder.len(), 1);
        assert_eq!(binder.token_of(&a), Some(first));
    }

    #[test]
    fn equal_closures_are_distinct_targets() {
        let mut binder = CallSiteBinder::new();
        let x = InvocationTarget::from(BoundClosure::new(
            "k",
            vec![Value::Bigint(7)],
            captured_first,
        ));
        let y = InvocationTarget::from(BoundClosure::new(
            "k",
            vec![Value::Bigint(7)],
            captured_first,
        ));

        let tx = binder.bind(&x).unwrap();
        let ty = binder.bind(&y).unwrap();
        assert_ne!(tx, ty);
        assert_eq!(binder.len(), 2);
    }

    #[test]
    fn declared_only_function_is_invalid_binding() {
        let mut binder = CallSiteBinder::new();
        let descriptor = FunctionDescriptor::builder("random", SqlType::Double).build();

        let err = binder.bind_function(&descriptor).unwrap_err();
        assert!(matches!(err, CompilationError::InvalidBinding { .. }));
        assert!(binder.is_empty());
    }

    #[test]
    fn export_table_is_indexed_by_token() {
        let mut binder = CallSiteBinder::new();
        let a = InvocationTarget::from(NativeFn::new("a", one));
        let b = InvocationTarget::from(NativeFn::new("b", one));
        let tb = binder.bind(&b).unwrap();
        let ta = binder.bind(&a).unwrap();

        let table = binder.export_table();
        assert_eq!(table[tb.index()], b);
        assert_eq!(table[ta.index()], a);
        assert_eq!(binder.get(ta), Some(&a));
        assert_eq!(binder.get(BindingToken(9)), None);
    }

    #[test]
    fn token_space_is_bounded() {
        let mut binder = CallSiteBinder::new();
        let target = InvocationTarget::from(NativeFn::new("f", one));
        for _ in 0..MAX_BINDINGS {
            binder
                .bind(&InvocationTarget::from(NativeFn::new("f", one)))
                .unwrap();
        }
        assert_eq!(
            binder.bind(&target),
            Err(CompilationError::TooManyBindings { max: MAX_BINDINGS })
        );
        assert_eq!(binder.len(), MAX_BINDINGS);
    }
}
