use std::rc::Rc;

use crate::term::Term;

/// One bound variable: its declared type, and (for `let`-bound entries) the
/// value it's transparent to during convertibility checks.
#[derive(Debug, Clone)]
pub struct CtxEntry {
    pub ty: Term,
    pub value: Option<Term>,
}

struct CtxNode {
    entry: CtxEntry,
    depth: usize,
    parent: Option<Ctx>,
}

/// A persistent, prefix-shared typing context: a cons-list over `Rc` rather
/// than a `Vec`. `with_var` pushes a new frame in O(1) and shares every
/// ancestor frame with whoever held the parent `Ctx`, which lets
/// `tc.rs::infer`'s `with_var` save, clear, and restore its per-context memo
/// table around a pushed frame without ever truncating and restoring a
/// backing vector on pop.
///
/// `Ctx::len()` is the de Bruijn depth: `get(i)` reads the entry bound `i`
/// binders back from the current position, i.e. index `0` is the most
/// recently pushed variable.
#[derive(Clone)]
pub struct Ctx(Option<Rc<CtxNode>>);

impl Ctx {
    pub fn empty() -> Self {
        Ctx(None)
    }

    pub fn len(&self) -> usize {
        match &self.0 {
            Some(node) => node.depth,
            None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Push a new innermost binding, returning the extended context. The
    /// receiver is left untouched: callers hold on to their `Ctx` across the
    /// call and simply drop the extension when they pop back out, exactly
    /// the shape `tc.rs`'s `infer_lambda`/`infer_pi` need around a recursive
    /// `infer` call on the body.
    pub fn with_var(&self, ty: Term) -> Ctx {
        self.with_entry(CtxEntry { ty, value: None })
    }

    pub fn with_let(&self, ty: Term, value: Term) -> Ctx {
        self.with_entry(CtxEntry {
            ty,
            value: Some(value),
        })
    }

    fn with_entry(&self, entry: CtxEntry) -> Ctx {
        Ctx(Some(Rc::new(CtxNode {
            entry,
            depth: self.len() + 1,
            parent: Some(self.clone()),
        })))
    }

    /// The entry bound at de Bruijn index `i`, counting from the innermost
    /// binding (`i = 0`) outward. Panics (internal-invariant violation, not a
    /// user-facing `TCError`) if `i >= len()`: callers only ever reach here
    /// after `are_convertible`/`infer` has already confirmed the index is in
    /// range via `FreeVars`.
    pub fn get(&self, i: usize) -> CtxEntry {
        let mut node = self
            .0
            .as_ref()
            .unwrap_or_else(|| panic!("Ctx::get({}) on empty context", i));
        let mut remaining = i;
        loop {
            if remaining == 0 {
                return node.entry.clone();
            }
            remaining -= 1;
            node = node
                .parent
                .as_ref()
                .and_then(|p| p.0.as_ref())
                .unwrap_or_else(|| panic!("Ctx::get({}) out of range", i));
        }
    }

    pub fn get_ty(&self, i: usize) -> Term {
        self.get(i).ty
    }
}

impl Default for Ctx {
    fn default() -> Self {
        Ctx::empty()
    }
}

#[cfg(test)]
mod ctx_tests {
    use super::*;
    use crate::sort::Sort;
    use crate::term::mk_sort;

    #[test]
    fn empty_has_zero_length() {
        let c = Ctx::empty();
        assert_eq!(c.len(), 0);
        assert!(c.is_empty());
    }

    #[test]
    fn push_then_get_innermost() {
        let c = Ctx::empty().with_var(mk_sort(Sort(0)));
        let c = c.with_var(mk_sort(Sort(1)));
        assert_eq!(c.len(), 2);
        assert_eq!(c.get_ty(0), mk_sort(Sort(1)));
        assert_eq!(c.get_ty(1), mk_sort(Sort(0)));
    }

    #[test]
    fn branches_share_prefix_independently() {
        let base = Ctx::empty().with_var(mk_sort(Sort(0)));
        let left = base.with_var(mk_sort(Sort(1)));
        let right = base.with_var(mk_sort(Sort(2)));
        assert_eq!(left.get_ty(1), mk_sort(Sort(0)));
        assert_eq!(right.get_ty(1), mk_sort(Sort(0)));
        assert_ne!(left.get_ty(0), right.get_ty(0));
        // `base` itself is unaffected by either extension.
        assert_eq!(base.len(), 1);
    }

    #[test]
    fn let_entry_carries_a_value() {
        let c = Ctx::empty().with_let(mk_sort(Sort(0)), mk_sort(Sort(0)));
        let entry = c.get(0);
        assert!(entry.value.is_some());
    }
}
