//! Identity-compared string interning.
//!
//! Grounded in `original_source/apexStr.c`: the original keeps a linked list
//! of unique strings and hands back pointers, so that two occurrences of the
//! same literal share one allocation and can be compared by pointer identity.
//! This interner reproduces that guarantee with an index (`StringId`) instead
//! of a raw pointer, following the teacher's `StringId`-over-`Rc<str>` choice
//! (`ouros/src/intern.rs`) to keep `Value` cheap to copy.

use ahash::AHashMap;

/// Index into the interner's storage. Two `StringId`s are equal iff the
/// underlying bytes are equal, because the interner never stores duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StringId(u32);

impl StringId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Process-wide-shaped but explicitly owned string table (spec.md §9 "Global
/// state": the interner is encapsulated behind a handle instead of living in
/// a `static`, so multiple `Interner`s - and therefore multiple VMs - can
/// coexist).
#[derive(Debug, Default)]
pub struct Interner {
    strings: Vec<Box<str>>,
    ids: AHashMap<Box<str>, StringId>,
}

impl Interner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `s`, returning the existing id if this content has been seen before.
    pub fn intern(&mut self, s: &str) -> StringId {
        if let Some(&id) = self.ids.get(s) {
            return id;
        }
        let id = StringId(self.strings.len() as u32);
        let boxed: Box<str> = s.into();
        self.strings.push(boxed.clone());
        self.ids.insert(boxed, id);
        id
    }

    #[must_use]
    pub fn resolve(&self, id: StringId) -> &str {
        &self.strings[id.index()]
    }

    /// Concatenates two interned strings and interns the result, as `apexStr_cat` does.
    pub fn concat(&mut self, a: StringId, b: StringId) -> StringId {
        let mut combined = String::with_capacity(self.resolve(a).len() + self.resolve(b).len());
        combined.push_str(self.resolve(a));
        combined.push_str(self.resolve(b));
        self.intern(&combined)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::Interner;

    #[test]
    fn identical_content_shares_one_id() {
        let mut interner = Interner::new();
        let a = interner.intern("ab");
        let b = interner.intern("a");
        let c = interner.intern("b");
        let concatenated = interner.concat(b, c);
        assert_eq!(a, concatenated, "concatenation result must be interned identically");
    }

    #[test]
    fn distinct_content_gets_distinct_ids() {
        let mut interner = Interner::new();
        let a = interner.intern("foo");
        let b = interner.intern("bar");
        assert_ne!(a, b);
    }
}
