//! Resolved function descriptors.

use std::fmt;
use std::sync::Arc;

use crate::{
    BoundClosure, ClosureBody, InvocationTarget, NativeCallable, NativeFn, SignatureHash, SqlType,
    Value,
};

/// How null arguments are handled for a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NullConvention {
    /// Any null argument makes the result null; the target is never invoked
    /// with a null argument.
    #[default]
    ReturnNullOnNullArgument,
    /// The target receives every argument with its nullness and decides the
    /// nullness of its result itself.
    ReceivesNullFlags,
}

/// Immutable description of one resolvable function.
///
/// Built once by whoever populates the registry and shared by every call
/// site that resolves to it.
#[derive(Debug, Clone)]
pub struct FunctionDescriptor {
    name: String,
    signature_hash: SignatureHash,
    argument_types: Vec<SqlType>,
    return_type: SqlType,
    null_convention: NullConvention,
    requires_context: bool,
    invocation_target: Option<InvocationTarget>,
}

impl FunctionDescriptor {
    /// Start building a descriptor for `name` returning `return_type`.
    pub fn builder(name: impl Into<String>, return_type: SqlType) -> FunctionDescriptorBuilder {
        FunctionDescriptorBuilder {
            name: name.into(),
            argument_types: Vec::new(),
            return_type,
            null_convention: NullConvention::default(),
            requires_context: false,
            invocation_target: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature_hash(&self) -> SignatureHash {
        self.signature_hash
    }

    pub fn argument_types(&self) -> &[SqlType] {
        &self.argument_types
    }

    pub fn return_type(&self) -> SqlType {
        self.return_type
    }

    pub fn null_convention(&self) -> NullConvention {
        self.null_convention
    }

    /// Whether the execution context is spliced in front of the arguments.
    pub fn requires_context(&self) -> bool {
        self.requires_context
    }

    /// The target to invoke, or `None` for a declared-only signature.
    pub fn invocation_target(&self) -> Option<&InvocationTarget> {
        self.invocation_target.as_ref()
    }

    /// `name(type, type, ...)`.
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, SqlType::list(&self.argument_types))
    }
}

impl fmt::Display for FunctionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.signature(), self.return_type)
    }
}

/// Builder for [`FunctionDescriptor`].
#[derive(Debug)]
pub struct FunctionDescriptorBuilder {
    name: String,
    argument_types: Vec<SqlType>,
    return_type: SqlType,
    null_convention: NullConvention,
    requires_context: bool,
    invocation_target: Option<InvocationTarget>,
}

impl FunctionDescriptorBuilder {
    pub fn argument(mut self, ty: SqlType) -> Self {
        self.argument_types.push(ty);
        self
    }

    pub fn arguments(mut self, types: impl IntoIterator<Item = SqlType>) -> Self {
        self.argument_types.extend(types);
        self
    }

    pub fn null_convention(mut self, convention: NullConvention) -> Self {
        self.null_convention = convention;
        self
    }

    /// Shorthand for [`NullConvention::ReceivesNullFlags`].
    pub fn receives_null_flags(self) -> Self {
        self.null_convention(NullConvention::ReceivesNullFlags)
    }

    pub fn requires_context(mut self) -> Self {
        self.requires_context = true;
        self
    }

    /// Use an existing target. Descriptors sharing a target share its
    /// binding within a compiled unit.
    pub fn target(mut self, target: impl Into<InvocationTarget>) -> Self {
        self.invocation_target = Some(target.into());
        self
    }

    /// Wrap `f` in a fresh [`NativeFn`] named after the function.
    pub fn native<F>(self, f: F) -> Self
    where
        F: NativeCallable + Send + Sync + 'static,
    {
        let name: Arc<str> = self.name.as_str().into();
        self.target(NativeFn::new(name, f))
    }

    /// Wrap `body` in a fresh [`BoundClosure`] over `captured`.
    pub fn closure<F>(self, captured: Vec<Value>, body: F) -> Self
    where
        F: ClosureBody + Send + Sync + 'static,
    {
        let name: Arc<str> = self.name.as_str().into();
        self.target(BoundClosure::new(name, captured, body))
    }

    pub fn build(self) -> FunctionDescriptor {
        FunctionDescriptor {
            signature_hash: SignatureHash::from_signature(&self.name, &self.argument_types),
            name: self.name,
            argument_types: self.argument_types,
            return_type: self.return_type,
            null_convention: self.null_convention,
            requires_context: self.requires_context,
            invocation_target: self.invocation_target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CallFrame, Datum, NativeError};

    fn negate(frame: &CallFrame<'_>) -> Result<Datum, NativeError> {
        Ok(Some(Value::Bigint(-frame.bigint(0)?)))
    }

    #[test]
    fn builder_defaults() {
        let desc = FunctionDescriptor::builder("negate", SqlType::Bigint)
            .argument(SqlType::Bigint)
            .native(negate)
            .build();

        assert_eq!(desc.name(), "negate");
        assert_eq!(desc.argument_types(), &[SqlType::Bigint]);
        assert_eq!(
            desc.null_convention(),
            NullConvention::ReturnNullOnNullArgument
        );
        assert!(!desc.requires_context());
        assert!(desc.invocation_target().is_some());
        assert_eq!(desc.to_string(), "negate(bigint) -> bigint");
    }

    #[test]
    fn declared_only_descriptor_has_no_target() {
        let desc = FunctionDescriptor::builder("rand", SqlType::Double).build();
        assert!(desc.invocation_target().is_none());
    }

    #[test]
    fn shared_target_keeps_identity() {
        let target = InvocationTarget::from(NativeFn::new("negate", negate));
        let a = FunctionDescriptor::builder("negate", SqlType::Bigint)
            .argument(SqlType::Bigint)
            .target(target.clone())
            .build();
        let b = FunctionDescriptor::builder("neg", SqlType::Bigint)
            .argument(SqlType::Bigint)
            .target(target)
            .build();
        assert_eq!(a.invocation_target(), b.invocation_target());
        assert_ne!(a.signature_hash(), b.signature_hash());
    }
}
