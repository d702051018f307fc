//! Constant pool for a compiled unit.
//!
//! Literal values referenced by `Constant`/`ConstantWide` instructions are
//! stored once per unit, deduplicated by value.

use std::sync::Arc;

use rowgen_core::Value;
use rustc_hash::FxHashMap;

/// Per-unit constant pool with deduplication.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    /// The actual constants.
    constants: Vec<Value>,
    /// Deduplication index: maps constant to its index.
    index: FxHashMap<ConstantKey, u32>,
}

/// Key for constant deduplication (hashable version of `Value`).
///
/// The SQL type is part of the key, so `BIGINT 5` and `TIMESTAMP 5` stay
/// distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ConstantKey {
    Boolean(bool),
    Bigint(i64),
    Double(u64), // Bit pattern for hashing
    Varchar(Arc<str>),
    Timestamp(i64),
}

impl ConstantPool {
    /// Create a new empty constant pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or get existing constant, returns index.
    pub fn add(&mut self, value: Value) -> u32 {
        let key = Self::to_key(&value);

        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }

        let idx = self.constants.len() as u32;
        self.constants.push(value);
        self.index.insert(key, idx);
        idx
    }

    /// Get constant by index.
    pub fn get(&self, index: u32) -> Option<&Value> {
        self.constants.get(index as usize)
    }

    pub fn constants(&self) -> &[Value] {
        &self.constants
    }

    /// Consume the pool, keeping the constants in index order.
    pub fn into_constants(self) -> Vec<Value> {
        self.constants
    }

    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    fn to_key(value: &Value) -> ConstantKey {
        match value {
            Value::Boolean(v) => ConstantKey::Boolean(*v),
            Value::Bigint(v) => ConstantKey::Bigint(*v),
            Value::Double(v) => ConstantKey::Double(v.to_bits()),
            Value::Varchar(s) => ConstantKey::Varchar(Arc::clone(s)),
            Value::Timestamp(v) => ConstantKey::Timestamp(*v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_pool_is_empty() {
        let pool = ConstantPool::new();
        assert!(pool.is_empty());
        assert_eq!(pool.len(), 0);
    }

    #[test]
    fn deduplication() {
        let mut pool = ConstantPool::new();

        let idx1 = pool.add(Value::Bigint(100));
        let idx2 = pool.add(Value::Bigint(200));
        let idx3 = pool.add(Value::Bigint(100)); // Duplicate

        assert_eq!(idx1, 0);
        assert_eq!(idx2, 1);
        assert_eq!(idx3, 0);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn same_bits_different_types_stay_distinct() {
        let mut pool = ConstantPool::new();
        let a = pool.add(Value::Bigint(5));
        let b = pool.add(Value::Timestamp(5));
        assert_ne!(a, b);
        assert_eq!(pool.get(b), Some(&Value::Timestamp(5)));
    }

    #[test]
    fn double_deduplication_by_bits() {
        let mut pool = ConstantPool::new();
        assert_eq!(pool.add(Value::Double(1.0)), pool.add(Value::Double(1.0)));
        // 0.0 and -0.0 differ in bits
        assert_ne!(pool.add(Value::Double(0.0)), pool.add(Value::Double(-0.0)));
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn varchar_deduplication() {
        let mut pool = ConstantPool::new();
        let idx1 = pool.add(Value::varchar("test"));
        let idx2 = pool.add(Value::varchar("other"));
        let idx3 = pool.add(Value::varchar("test"));

        assert_eq!(idx1, idx3);
        assert_ne!(idx1, idx2);
        assert_eq!(
            pool.into_constants(),
            vec![Value::varchar("test"), Value::varchar("other")]
        );
    }

    #[test]
    fn get_out_of_bounds() {
        let pool = ConstantPool::new();
        assert_eq!(pool.get(0), None);
    }
}
