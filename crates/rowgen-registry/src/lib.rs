//! Function registry for the rowgen expression compiler.
//!
//! [`FunctionRegistry`] stores [`FunctionDescriptor`]s and answers the one
//! question the compiler asks of it: which descriptor does `name(types...)`
//! resolve to. Resolution is exact on argument types; coercion is left to
//! whoever builds the expression tree.
//!
//! [`builtins`] provides a small library of scalar functions covering every
//! combination of null convention and context requirement.
//!
//! [`FunctionDescriptor`]: rowgen_core::FunctionDescriptor

pub mod builtins;
mod registry;

pub use registry::FunctionRegistry;
