//! The `Array` and `Object` hash containers that back Apex's `Arr`/`Obj`/`Type` values.
//!
//! Grounded in `original_source/apexVal.c`/`apexVal.h`: `Array` there keeps a
//! bucketed hash map plus a parallel insertion-ordered vector of entry
//! pointers so that iteration order is observable and stable; `Object` is a
//! plain linked-list field map with no iteration guarantee. Rust's
//! `indexmap::IndexMap` already provides exactly the "hash lookup + stable
//! insertion order, O(1) deletion without reordering survivors" contract the
//! original hand-rolls with its `entries`/`iter` vectors, so `Array` is built
//! on it directly rather than reimplementing a bucket table.

use std::hash::{Hash, Hasher};

use ahash::AHashMap;
use indexmap::IndexMap;

use crate::intern::{Interner, StringId};
use crate::value::Value;

/// A key usable in an `Array`. Spec.md §3: "Keys may be Int, Flt, Dbl, Bool,
/// Str (hashed by content or bit pattern)". Floats hash/compare by bit
/// pattern so that `NaN`-bearing keys behave consistently rather than never
/// matching themselves.
#[derive(Debug, Clone, Copy)]
pub enum ArrayKey {
    Int(i64),
    Flt(f32),
    Dbl(f64),
    Bool(bool),
    Str(StringId),
}

impl PartialEq for ArrayKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Flt(a), Self::Flt(b)) => a.to_bits() == b.to_bits(),
            (Self::Dbl(a), Self::Dbl(b)) => a.to_bits() == b.to_bits(),
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ArrayKey {}

impl Hash for ArrayKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Int(v) => v.hash(state),
            Self::Flt(v) => v.to_bits().hash(state),
            Self::Dbl(v) => v.to_bits().hash(state),
            Self::Bool(v) => v.hash(state),
            Self::Str(v) => v.hash(state),
        }
    }
}

impl ArrayKey {
    /// Builds the lookup key for a `Value` used as an array subscript, or
    /// `None` if the value isn't a valid key type.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match *value {
            Value::Int(i) => Some(Self::Int(i)),
            Value::Flt(f) => Some(Self::Flt(f)),
            Value::Dbl(d) => Some(Self::Dbl(d)),
            Value::Bool(b) => Some(Self::Bool(b)),
            Value::Str(s) => Some(Self::Str(s)),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_value(self) -> Value {
        match self {
            Self::Int(i) => Value::Int(i),
            Self::Flt(f) => Value::Flt(f),
            Self::Dbl(d) => Value::Dbl(d),
            Self::Bool(b) => Value::Bool(b),
            Self::Str(s) => Value::Str(s),
        }
    }
}

/// An ordered hash container: O(1) keyed lookup, stable first-insertion
/// iteration order, in-place re-assignment, and deletion that does not
/// disturb the relative order of surviving entries.
#[derive(Debug, Clone, Default)]
pub struct Array {
    entries: IndexMap<ArrayKey, Value, ahash::RandomState>,
    /// Counter used by the compiler to assign synthetic keys to bare
    /// (non-`key => value`) array-literal elements; exposed so `CREATE_ARRAY`
    /// can hand out sequential indices within one literal.
    next_index: i64,
}

impl Array {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: IndexMap::with_hasher(ahash::RandomState::new()),
            next_index: 0,
        }
    }

    /// Sets `key` to `value`. Re-assigning an existing key keeps its position
    /// in iteration order (spec.md §8: "re-assignment does not change order").
    /// An explicit integer key advances the synthetic-index counter past
    /// itself, so a later bare-element append (`push_synthetic`) never
    /// collides with a key an array literal or `SET_ELEMENT` already used.
    pub fn set(&mut self, key: ArrayKey, value: Value) {
        if let ArrayKey::Int(i) = key {
            if i >= self.next_index {
                self.next_index = i + 1;
            }
        }
        self.entries.insert(key, value);
    }

    /// Inserts `value` under the next synthetic integer key and returns that key.
    pub fn push_synthetic(&mut self, value: Value) -> ArrayKey {
        let key = ArrayKey::Int(self.next_index);
        self.next_index += 1;
        self.entries.insert(key, value);
        key
    }

    #[must_use]
    pub fn get(&self, key: &ArrayKey) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Removes `key`, shifting later entries down one slot so iteration order
    /// among survivors is unchanged (spec.md §8: "deletion removes from both views").
    pub fn remove(&mut self, key: &ArrayKey) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the `(key, value)` pair at first-insertion position `index`, if any.
    #[must_use]
    pub fn entry_at(&self, index: usize) -> Option<(ArrayKey, Value)> {
        self.entries.get_index(index).map(|(k, v)| (*k, *v))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ArrayKey, &Value)> {
        self.entries.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.values()
    }
}

/// A field map used both as a `Type` (class, holding methods) and an `Obj`
/// (instance, holding fields). No ordered-iteration guarantee per spec.md §3.
#[derive(Debug, Clone, Default)]
pub struct ApexObject {
    pub name: StringId,
    fields: AHashMap<StringId, Value>,
}

impl ApexObject {
    #[must_use]
    pub fn new(name: StringId) -> Self {
        Self {
            name,
            fields: AHashMap::new(),
        }
    }

    pub fn set(&mut self, key: StringId, value: Value) {
        self.fields.insert(key, value);
    }

    #[must_use]
    pub fn get(&self, key: StringId) -> Option<&Value> {
        self.fields.get(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StringId, &Value)> {
        self.fields.iter()
    }

    /// Deep-copies field entries for `OP_NEW`'s instance construction (spec.md
    /// §4.3): the fresh instance gets its own field map, so later mutation of
    /// one does not affect the other. Caller is responsible for retaining any
    /// heap values copied across (`heap::retain`), since a plain field-map
    /// clone does not bump refcounts by itself.
    #[must_use]
    pub fn shallow_clone_fields(&self, name: StringId) -> Self {
        Self {
            name,
            fields: self.fields.clone(),
        }
    }
}

/// Formats a `Value` the way `apexVal_tostr` formats members of a container,
/// used by `str:` helpers that need to render array/object contents. Lives
/// here (not in `value.rs`) to avoid a dependency cycle, since it needs the
/// interner to resolve string keys.
#[must_use]
pub fn key_display(key: ArrayKey, interner: &Interner) -> String {
    match key {
        ArrayKey::Int(i) => i.to_string(),
        ArrayKey::Flt(f) => f.to_string(),
        ArrayKey::Dbl(d) => d.to_string(),
        ArrayKey::Bool(b) => b.to_string(),
        ArrayKey::Str(s) => interner.resolve(s).to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::{Array, ArrayKey};
    use crate::value::Value;

    #[test]
    fn iteration_order_matches_first_insertion() {
        let mut arr = Array::new();
        arr.push_synthetic(Value::Int(10));
        arr.push_synthetic(Value::Int(20));
        arr.set(ArrayKey::Int(5), Value::Int(99));
        let keys: Vec<_> = arr.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![ArrayKey::Int(0), ArrayKey::Int(1), ArrayKey::Int(5)]);
    }

    #[test]
    fn reassignment_keeps_position() {
        let mut arr = Array::new();
        arr.set(ArrayKey::Int(0), Value::Int(1));
        arr.set(ArrayKey::Int(1), Value::Int(2));
        arr.set(ArrayKey::Int(0), Value::Int(42));
        let values: Vec<_> = arr.values().copied().collect();
        assert_eq!(values, vec![Value::Int(42), Value::Int(2)]);
    }

    #[test]
    fn deletion_removes_from_both_views() {
        let mut arr = Array::new();
        arr.set(ArrayKey::Int(0), Value::Int(1));
        arr.set(ArrayKey::Int(1), Value::Int(2));
        arr.remove(&ArrayKey::Int(0));
        assert!(arr.get(&ArrayKey::Int(0)).is_none());
        assert_eq!(arr.len(), 1);
        let keys: Vec<_> = arr.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![ArrayKey::Int(1)]);
    }
}
