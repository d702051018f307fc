//! FunctionRegistry - resolvable scalar functions.
//!
//! # Storage Model
//!
//! - **Functions**: every descriptor stored once, keyed by its
//!   [`SignatureHash`] (lowercase name plus ordered argument types).
//! - **Overloads**: lowercase name -> signature hashes, in registration order.
//!
//! # Thread Safety
//!
//! The registry is populated single-threaded, then shared read-only. Once
//! populated it is `Sync`, so independent expression trees may be compiled
//! against it from several threads at once.
//!
//! # Example
//!
//! ```
//! use rowgen_core::SqlType;
//! use rowgen_registry::FunctionRegistry;
//!
//! let registry = FunctionRegistry::with_builtins();
//! let plus = registry.resolve("plus", &[SqlType::Bigint, SqlType::Bigint]);
//! assert!(plus.is_some());
//! assert!(registry.resolve("plus", &[SqlType::Bigint, SqlType::Varchar]).is_none());
//! ```

use rustc_hash::FxHashMap;

use rowgen_core::{FunctionDescriptor, MAX_ARGUMENTS, RegistrationError, SignatureHash, SqlType};

use crate::builtins;

/// Registry of resolvable functions.
#[derive(Default)]
pub struct FunctionRegistry {
    /// Descriptors by signature hash (primary storage).
    functions: FxHashMap<SignatureHash, FunctionDescriptor>,

    /// Lowercase name -> overloads in registration order.
    by_name: FxHashMap<String, Vec<SignatureHash>>,
}

impl FunctionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the [`builtins`].
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for descriptor in builtins::all() {
            if let Err(err) = registry.register(descriptor) {
                tracing::error!(%err, "skipping built-in function");
            }
        }
        registry
    }

    // ==========================================================================
    // Registration
    // ==========================================================================

    /// Register a function.
    ///
    /// Fails if a function with the same name and argument types exists, or
    /// if the signature has more arguments than an invocation can encode.
    pub fn register(&mut self, descriptor: FunctionDescriptor) -> Result<(), RegistrationError> {
        let count = descriptor.argument_types().len();
        if count > MAX_ARGUMENTS {
            return Err(RegistrationError::TooManyArguments {
                name: descriptor.name().to_string(),
                count,
                max: MAX_ARGUMENTS,
            });
        }

        let hash = descriptor.signature_hash();
        if self.functions.contains_key(&hash) {
            return Err(RegistrationError::DuplicateFunction {
                signature: descriptor.signature(),
            });
        }

        tracing::trace!(
            signature = %descriptor.signature(),
            %hash,
            "registering function"
        );

        self.by_name
            .entry(descriptor.name().to_ascii_lowercase())
            .or_default()
            .push(hash);
        self.functions.insert(hash, descriptor);
        Ok(())
    }

    // ==========================================================================
    // Lookup
    // ==========================================================================

    /// Resolve `name(argument_types...)` to its descriptor.
    ///
    /// Names are case-insensitive; argument types must match exactly.
    pub fn resolve(&self, name: &str, argument_types: &[SqlType]) -> Option<&FunctionDescriptor> {
        let hash = SignatureHash::from_signature(name, argument_types);
        self.functions.get(&hash).filter(|descriptor| {
            descriptor.name().eq_ignore_ascii_case(name)
                && descriptor.argument_types() == argument_types
        })
    }

    /// All overloads registered under `name`, in registration order.
    pub fn overloads<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a FunctionDescriptor> {
        self.by_name
            .get(&name.to_ascii_lowercase())
            .into_iter()
            .flatten()
            .filter_map(|hash| self.functions.get(hash))
    }

    /// All registered functions, in no particular order.
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDescriptor> {
        self.functions.values()
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.functions.len())
            .field("names", &self.by_name.len())
            .finish()
    }
}
