//! The refcounted heap arena backing `Value::Arr`/`Obj`/`Type`/`Fn`.
//!
//! Grounded in `ouros/src/heap.rs`'s arena-of-slots design (a `HeapId` index
//! rather than `Rc<RefCell<_>>`), chosen because spec.md §3–§5 describes
//! refcounting as an explicit, observable operation ("an `assigned` flag...
//! the VM uses this to decide whether to retain/release") rather than an
//! implementation detail `Rc` would hide. Using `Rc` would make `retain`/
//! `release` no-ops from the VM's point of view and erase the very mechanism
//! spec.md §8 tests ("a fresh instance... must not share mutable state").

use crate::containers::{ApexObject, Array};
use crate::function::Function;

/// Index into the heap arena. Stable for the lifetime of the referenced object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapId(u32);

impl HeapId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The payload stored behind a `HeapId`. Spec.md §3: "Heap variants (`Arr`,
/// `Obj`/`Type`, `Fn`) carry a reference count".
#[derive(Debug, Clone)]
pub enum HeapData {
    Array(Array),
    /// An instance (`Obj`) or a class/prototype (`Type`) share representation;
    /// `Value` distinguishes the two roles at the tag level (spec.md §3).
    Object(ApexObject),
    Function(Function),
}

struct Slot {
    data: HeapData,
    refcount: u32,
}

/// Arena of heap-allocated Apex values, with explicit reference counting.
///
/// Encapsulated behind this handle (rather than a process-wide `static`) per
/// spec.md §9's "Global state" design note, so that multiple independent VM
/// instances can each own a `Heap`.
#[derive(Default)]
pub struct Heap {
    slots: Vec<Option<Slot>>,
    free_list: Vec<u32>,
}

impl Heap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates `data` with an initial refcount of 1 and returns its id.
    pub fn alloc(&mut self, data: HeapData) -> HeapId {
        let slot = Slot { data, refcount: 1 };
        if let Some(index) = self.free_list.pop() {
            self.slots[index as usize] = Some(slot);
            HeapId(index)
        } else {
            self.slots.push(Some(slot));
            HeapId((self.slots.len() - 1) as u32)
        }
    }

    #[must_use]
    pub fn get(&self, id: HeapId) -> &HeapData {
        &self.slots[id.index()]
            .as_ref()
            .expect("heap id referenced after free")
            .data
    }

    pub fn get_mut(&mut self, id: HeapId) -> &mut HeapData {
        &mut self.slots[id.index()]
            .as_mut()
            .expect("heap id referenced after free")
            .data
    }

    /// Increments `id`'s refcount. Called whenever a heap value is bound into
    /// a named slot or copied onto the stack as a non-temporary (spec.md §3's
    /// `assigned` distinction).
    pub fn retain(&mut self, id: HeapId) {
        let slot = self.slots[id.index()].as_mut().expect("retain on freed heap id");
        slot.refcount += 1;
    }

    /// Decrements `id`'s refcount, freeing (and recursively releasing any
    /// heap values the container owns) at zero.
    pub fn release(&mut self, id: HeapId) {
        let refcount = {
            let slot = self.slots[id.index()].as_mut().expect("release on freed heap id");
            slot.refcount -= 1;
            slot.refcount
        };
        if refcount == 0 {
            self.free(id);
        }
    }

    fn free(&mut self, id: HeapId) {
        let slot = self.slots[id.index()].take().expect("double free of heap id");
        self.free_list.push(id.0);
        match slot.data {
            HeapData::Array(array) => {
                for value in array.values() {
                    self.release_value(*value);
                }
            }
            HeapData::Object(object) => {
                let fields: Vec<_> = object.iter().map(|(_, v)| *v).collect();
                for value in fields {
                    self.release_value(value);
                }
            }
            HeapData::Function(_) => {}
        }
    }

    /// Releases a `Value` if it carries a heap reference, otherwise a no-op.
    fn release_value(&mut self, value: crate::value::Value) {
        if let Some(id) = value.heap_id() {
            self.release(id);
        }
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::{Heap, HeapData};
    use crate::containers::Array;

    #[test]
    fn release_to_zero_frees_the_slot() {
        let mut heap = Heap::new();
        let id = heap.alloc(HeapData::Array(Array::new()));
        assert_eq!(heap.live_count(), 1);
        heap.retain(id);
        heap.release(id);
        assert_eq!(heap.live_count(), 1, "still retained once");
        heap.release(id);
        assert_eq!(heap.live_count(), 0);
    }
}
