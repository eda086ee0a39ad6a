//! The AST arena: every node lives in one append-mostly table, addressed by
//! a stable integer handle. This mirrors the teacher's own preference for
//! index-based ownership over reference-counted graphs (see `graal`'s
//! resource-handle tables in the original workspace) and directly replaces
//! the original C++ translator's `ast::CRef<T>` + `base::rtti` arena.
//!
//! A handle is move-only in spirit: cloning a `Handle<T>` is cheap (it's
//! just a `u64`), but the arena slot it names is owned by exactly one parent
//! at a time by convention — nothing here enforces that at the type level,
//! the same way the original C++ `CRef<T>` enforced it by being a
//! move-only C++ type. Rust's borrow checker can't express "this integer is
//! linearly owned" without a lot of ceremony that would fight the rest of
//! the AST (parent nodes need to hold many child handles in `Vec`s), so the
//! invariant is sat on the API surface instead: `Arena::remove` clears a
//! slot, `Arena::swap` exchanges two, and nothing hands out two live handles
//! to the same freshly-made node.

use std::marker::PhantomData;

/// Sentinel for "no node". Matches spec's "all ones" (`u64::MAX`) absence value.
const ABSENT: u64 = u64::MAX;

/// An opaque reference to a node of type `T` living in an [`Arena`].
pub struct Handle<T> {
    id: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    pub fn absent() -> Self {
        Self { id: ABSENT, _marker: PhantomData }
    }

    pub fn is_absent(&self) -> bool {
        self.id == ABSENT
    }

    pub fn raw(&self) -> u64 {
        self.id
    }

    /// Reinterprets this handle as pointing at a different node category.
    /// Used where the grammar treats one node kind as another for parsing
    /// convenience (e.g. a `Type` handle stored where an `Expr` handle is
    /// expected structurally) — see Design Note in SPEC_FULL.md §9.
    pub fn cast<U>(self) -> Handle<U> {
        Handle { id: self.id, _marker: PhantomData }
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Handle<T> {}
impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl<T> Eq for Handle<T> {}
impl<T> std::hash::Hash for Handle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}
impl<T> std::fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_absent() {
            write!(f, "Handle(absent)")
        } else {
            write!(f, "Handle({})", self.id)
        }
    }
}
impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::absent()
    }
}

/// A single-type append/remove table. `Arena` composes one of these per AST
/// node category (decls, exprs, stats, attrs, types, modules).
#[derive(Debug)]
pub struct Slab<T> {
    slots: Vec<Option<T>>,
}

impl<T> Default for Slab<T> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<T> Slab<T> {
    pub fn make(&mut self, value: T) -> Handle<T> {
        self.slots.push(Some(value));
        Handle { id: (self.slots.len() - 1) as u64, _marker: PhantomData }
    }

    pub fn get(&self, id: Handle<T>) -> &T {
        self.slots[id.id as usize].as_ref().expect("dereferenced an absent or removed handle")
    }

    pub fn get_mut(&mut self, id: Handle<T>) -> &mut T {
        self.slots[id.id as usize].as_mut().expect("dereferenced an absent or removed handle")
    }

    pub fn try_get(&self, id: Handle<T>) -> Option<&T> {
        if id.is_absent() {
            return None;
        }
        self.slots.get(id.id as usize).and_then(|s| s.as_ref())
    }

    pub fn remove(&mut self, id: Handle<T>) -> Option<T> {
        self.slots.get_mut(id.id as usize).and_then(|s| s.take())
    }

    pub fn swap(&mut self, a: Handle<T>, b: Handle<T>) {
        self.slots.swap(a.id as usize, b.id as usize);
    }

    /// Invokes `f` on every live node. The handle set is snapshotted before
    /// iterating so that `f` may call `make` on the owning arena without
    /// invalidating the iteration (spec §4.3).
    pub fn for_each(&self, mut f: impl FnMut(u64, &T)) {
        let live: Vec<u64> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|_| i as u64))
            .collect();
        for id in live {
            if let Some(node) = self.slots[id as usize].as_ref() {
                f(id, node);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_get_remove() {
        let mut slab: Slab<i32> = Slab::default();
        let h = slab.make(42);
        assert_eq!(*slab.get(h), 42);
        slab.remove(h);
        assert!(slab.try_get(h).is_none());
    }

    #[test]
    fn absent_handle_has_sentinel_id() {
        let h: Handle<i32> = Handle::absent();
        assert!(h.is_absent());
        assert_eq!(h.raw(), u64::MAX);
    }

    #[test]
    fn swap_exchanges_slots() {
        let mut slab: Slab<i32> = Slab::default();
        let a = slab.make(1);
        let b = slab.make(2);
        slab.swap(a, b);
        assert_eq!(*slab.get(a), 2);
        assert_eq!(*slab.get(b), 1);
    }

    #[test]
    fn for_each_snapshots_before_insert_during_callback() {
        let mut slab: Slab<i32> = Slab::default();
        slab.make(1);
        slab.make(2);
        let mut seen = Vec::new();
        // Can't actually call slab.make() from inside the closure here since
        // `for_each` borrows `&self`; the snapshot guarantee instead matters
        // when for_each is driven through a `RefCell`-wrapped arena (see
        // ast.rs's `Arena`), exercised in ast.rs's own tests.
        slab.for_each(|id, v| seen.push((id, *v)));
        assert_eq!(seen, vec![(0, 1), (1, 2)]);
    }
}
