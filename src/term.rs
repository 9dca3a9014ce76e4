use std::sync::Arc;

use fxhash::hash64;

use crate::freevars::FreeVars;
use crate::name::Ident;
use crate::sort::Sort;

// Distinguishing tags so that two different constructors with the same
// arity and equal-digest children don't accidentally collide.
const TAG_LOCAL_VAR: u64 = 2;
const TAG_LAMBDA: u64 = 3;
const TAG_PI: u64 = 5;
const TAG_LET: u64 = 7;
const TAG_APP: u64 = 11;
const TAG_CONSTANT: u64 = 13;
const TAG_GLOBAL_DEF: u64 = 17;
const TAG_SORT: u64 = 19;
const TAG_NAT_LIT: u64 = 23;
const TAG_STRING_LIT: u64 = 29;
const TAG_ARRAY_VALUE: u64 = 31;
const TAG_EXT_CNS: u64 = 37;
const TAG_UNIT_TYPE: u64 = 41;
const TAG_UNIT_VALUE: u64 = 43;
const TAG_PAIR_TYPE: u64 = 47;
const TAG_PAIR_VALUE: u64 = 53;
const TAG_PAIR_LEFT: u64 = 59;
const TAG_PAIR_RIGHT: u64 = 61;
const TAG_EMPTY_RECORD_TYPE: u64 = 67;
const TAG_EMPTY_RECORD_VALUE: u64 = 71;
const TAG_FIELD_TYPE: u64 = 73;
const TAG_FIELD_VALUE: u64 = 79;
const TAG_RECORD_SELECTOR: u64 = 83;
const TAG_CTOR_APP: u64 = 89;
const TAG_DATATYPE_APP: u64 = 97;
const TAG_RECURSOR_APP: u64 = 101;

/// A single binding in a `Let` telescope: `name := val : ty`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LetDef {
    pub name: Ident,
    pub ty: Term,
    pub val: Term,
}

/// A hash-consed term representation, paired with `Term` below: the factory
/// (`mk_*`) functions build a `Term`/`TermKind` node carrying a cached
/// digest and free-variable bitset.
///
/// Nodes are content-addressed rather than kept in one global intern table:
/// each `mk_*` function computes a digest from its already-computed children
/// in O(children) time and wraps the result in `Arc`. Two structurally equal
/// subtrees built from separate allocations still compare equal (`PartialEq`
/// does a real structural comparison) and hash equal (`Hash` uses only the
/// cached digest), which is what lets every memo table in `tc.rs` key off
/// `Term` directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermKind {
    LocalVar(usize),
    Lambda(Ident, Term, Term),
    Pi(Ident, Term, Term),
    /// `n = defs.len()` mutually-recursive bindings, body under all `n`.
    /// See `subst.rs` for the exact scoping convention.
    Let(Arc<[LetDef]>, Term),
    App(Term, Term),
    /// An opaque, closed term carrying its own declared type.
    Constant(Ident, Term, Term),
    GlobalDef(Ident),
    Sort(Sort),
    NatLit(u64),
    StringLit(Arc<str>),
    ArrayValue(Term, Arc<[Term]>),
    ExtCns(usize, Ident, Term),
    UnitType,
    UnitValue,
    PairType(Term, Term),
    PairValue(Term, Term),
    PairLeft(Term),
    PairRight(Term),
    EmptyRecordType,
    EmptyRecordValue,
    FieldType(Ident, Term, Term),
    FieldValue(Ident, Term, Term),
    RecordSelector(Term, Ident),
    /// Constructor application, params and args pre-split.
    CtorApp(Ident, Arc<[Term]>, Arc<[Term]>),
    DataTypeApp(Ident, Arc<[Term]>, Arc<[Term]>),
    RecursorApp {
        data_id: Ident,
        params: Arc<[Term]>,
        motive: Term,
        cases: Arc<[(Ident, Term)]>,
        indices: Arc<[Term]>,
        scrutinee: Term,
    },
}

struct Node {
    cache_digest: u64,
    free: FreeVars,
    kind: TermKind,
}

/// A hash-consed term. Cheap to clone (`Arc`); `PartialEq` is a real
/// structural comparison (with a pointer-equality fast path), `Hash` only
/// touches the cached digest.
#[derive(Clone)]
pub struct Term(Arc<Node>);

impl Term {
    pub fn kind(&self) -> &TermKind {
        &self.0.kind
    }

    pub fn free_vars(&self) -> &FreeVars {
        &self.0.free
    }

    pub fn digest(&self) -> u64 {
        self.0.cache_digest
    }

    pub fn is_closed(&self) -> bool {
        self.0.free.is_empty()
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Term) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
            || (self.0.cache_digest == other.0.cache_digest && self.0.kind == other.0.kind)
    }
}
impl Eq for Term {}

impl std::hash::Hash for Term {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.cache_digest.hash(state);
    }
}

impl std::fmt::Debug for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        crate::pretty::dump(self, f)
    }
}

fn mk(kind: TermKind, digest: u64, free: FreeVars) -> Term {
    Term(Arc::new(Node {
        cache_digest: digest,
        free,
        kind,
    }))
}

fn digest_of(tag: u64, parts: &[u64]) -> u64 {
    hash64(&(tag, parts))
}

fn digests<'a>(ts: impl IntoIterator<Item = &'a Term>) -> Vec<u64> {
    ts.into_iter().map(Term::digest).collect()
}

pub fn mk_local_var(i: usize) -> Term {
    mk(
        TermKind::LocalVar(i),
        digest_of(TAG_LOCAL_VAR, &[i as u64]),
        FreeVars::single(i),
    )
}

pub fn mk_lambda(name: Ident, ty: Term, body: Term) -> Term {
    let digest = digest_of(TAG_LAMBDA, &[ty.digest(), body.digest()]);
    let free = ty.free_vars().union(&body.free_vars().shift_down(1));
    mk(TermKind::Lambda(name, ty, body), digest, free)
}

pub fn mk_pi(name: Ident, ty: Term, body: Term) -> Term {
    let digest = digest_of(TAG_PI, &[ty.digest(), body.digest()]);
    let free = ty.free_vars().union(&body.free_vars().shift_down(1));
    mk(TermKind::Pi(name, ty, body), digest, free)
}

pub fn mk_let(defs: Vec<LetDef>, body: Term) -> Term {
    let n = defs.len();
    let mut digest_parts = Vec::with_capacity(defs.len() * 2 + 1);
    let mut free = FreeVars::empty();
    for d in &defs {
        digest_parts.push(d.ty.digest());
        digest_parts.push(d.val.digest());
        free = free.union(d.ty.free_vars());
        free = free.union(&d.val.free_vars().shift_down(n));
    }
    digest_parts.push(body.digest());
    free = free.union(&body.free_vars().shift_down(n));
    let digest = digest_of(TAG_LET, &digest_parts);
    mk(TermKind::Let(Arc::from(defs), body), digest, free)
}

pub fn mk_app(f: Term, x: Term) -> Term {
    let digest = digest_of(TAG_APP, &[f.digest(), x.digest()]);
    let free = f.free_vars().union(x.free_vars());
    mk(TermKind::App(f, x), digest, free)
}

/// Iterated application: `applyAll(f, [a, b, c]) = App(App(App(f, a), b), c)`.
pub fn apply_all(f: Term, args: impl IntoIterator<Item = Term>) -> Term {
    args.into_iter().fold(f, mk_app)
}

pub fn mk_constant(name: Ident, definition: Term, declared_type: Term) -> Term {
    let digest = digest_of(
        TAG_CONSTANT,
        &[definition.digest(), declared_type.digest()],
    );
    // Definitions are assumed closed; treated as an opaque leaf by
    // substitution and free-variable analysis regardless.
    mk(
        TermKind::Constant(name, definition, declared_type),
        digest,
        FreeVars::empty(),
    )
}

pub fn mk_global(id: Ident) -> Term {
    let digest = digest_of(TAG_GLOBAL_DEF, &[hash64(&id.to_string())]);
    mk(TermKind::GlobalDef(id), digest, FreeVars::empty())
}

pub fn mk_sort(s: Sort) -> Term {
    let digest = digest_of(TAG_SORT, &[s.0 as u64]);
    mk(TermKind::Sort(s), digest, FreeVars::empty())
}

pub fn mk_nat_lit(n: u64) -> Term {
    let digest = digest_of(TAG_NAT_LIT, &[n]);
    mk(TermKind::NatLit(n), digest, FreeVars::empty())
}

pub fn mk_string_lit(s: impl Into<Arc<str>>) -> Term {
    let s = s.into();
    let digest = digest_of(TAG_STRING_LIT, &[hash64(&s)]);
    mk(TermKind::StringLit(s), digest, FreeVars::empty())
}

pub fn mk_array_value(elem_ty: Term, vs: Vec<Term>) -> Term {
    let mut parts = vec![elem_ty.digest()];
    parts.extend(digests(&vs));
    let digest = digest_of(TAG_ARRAY_VALUE, &parts);
    let free = vs
        .iter()
        .fold(elem_ty.free_vars().clone(), |acc, v| acc.union(v.free_vars()));
    mk(TermKind::ArrayValue(elem_ty, Arc::from(vs)), digest, free)
}

pub fn mk_ext_cns(var_ix: usize, name: Ident, ty: Term) -> Term {
    let digest = digest_of(TAG_EXT_CNS, &[var_ix as u64, hash64(&name.to_string()), ty.digest()]);
    let free = ty.free_vars().clone();
    mk(TermKind::ExtCns(var_ix, name, ty), digest, free)
}

pub fn mk_unit_type() -> Term {
    mk(TermKind::UnitType, digest_of(TAG_UNIT_TYPE, &[]), FreeVars::empty())
}

pub fn mk_unit_value() -> Term {
    mk(TermKind::UnitValue, digest_of(TAG_UNIT_VALUE, &[]), FreeVars::empty())
}

pub fn mk_pair_type(a: Term, b: Term) -> Term {
    let digest = digest_of(TAG_PAIR_TYPE, &[a.digest(), b.digest()]);
    let free = a.free_vars().union(b.free_vars());
    mk(TermKind::PairType(a, b), digest, free)
}

pub fn mk_pair_value(a: Term, b: Term) -> Term {
    let digest = digest_of(TAG_PAIR_VALUE, &[a.digest(), b.digest()]);
    let free = a.free_vars().union(b.free_vars());
    mk(TermKind::PairValue(a, b), digest, free)
}

pub fn mk_pair_left(e: Term) -> Term {
    let digest = digest_of(TAG_PAIR_LEFT, &[e.digest()]);
    let free = e.free_vars().clone();
    mk(TermKind::PairLeft(e), digest, free)
}

pub fn mk_pair_right(e: Term) -> Term {
    let digest = digest_of(TAG_PAIR_RIGHT, &[e.digest()]);
    let free = e.free_vars().clone();
    mk(TermKind::PairRight(e), digest, free)
}

pub fn mk_empty_record_type() -> Term {
    mk(TermKind::EmptyRecordType, digest_of(TAG_EMPTY_RECORD_TYPE, &[]), FreeVars::empty())
}

pub fn mk_empty_record_value() -> Term {
    mk(TermKind::EmptyRecordValue, digest_of(TAG_EMPTY_RECORD_VALUE, &[]), FreeVars::empty())
}

pub fn mk_field_type(name: Ident, ty: Term, rest: Term) -> Term {
    let digest = digest_of(TAG_FIELD_TYPE, &[hash64(&name.to_string()), ty.digest(), rest.digest()]);
    let free = ty.free_vars().union(rest.free_vars());
    mk(TermKind::FieldType(name, ty, rest), digest, free)
}

pub fn mk_field_value(name: Ident, val: Term, rest: Term) -> Term {
    let digest = digest_of(TAG_FIELD_VALUE, &[hash64(&name.to_string()), val.digest(), rest.digest()]);
    let free = val.free_vars().union(rest.free_vars());
    mk(TermKind::FieldValue(name, val, rest), digest, free)
}

pub fn mk_record_selector(record: Term, field: Ident) -> Term {
    let digest = digest_of(TAG_RECORD_SELECTOR, &[record.digest(), hash64(&field.to_string())]);
    let free = record.free_vars().clone();
    mk(TermKind::RecordSelector(record, field), digest, free)
}

pub fn mk_ctor_app(id: Ident, params: Vec<Term>, args: Vec<Term>) -> Term {
    let mut parts = vec![hash64(&id.to_string())];
    parts.extend(digests(&params));
    parts.extend(digests(&args));
    let digest = digest_of(TAG_CTOR_APP, &parts);
    let free = params
        .iter()
        .chain(args.iter())
        .fold(FreeVars::empty(), |acc, t| acc.union(t.free_vars()));
    mk(TermKind::CtorApp(id, Arc::from(params), Arc::from(args)), digest, free)
}

pub fn mk_datatype_app(id: Ident, params: Vec<Term>, indices: Vec<Term>) -> Term {
    let mut parts = vec![hash64(&id.to_string())];
    parts.extend(digests(&params));
    parts.extend(digests(&indices));
    let digest = digest_of(TAG_DATATYPE_APP, &parts);
    let free = params
        .iter()
        .chain(indices.iter())
        .fold(FreeVars::empty(), |acc, t| acc.union(t.free_vars()));
    mk(TermKind::DataTypeApp(id, Arc::from(params), Arc::from(indices)), digest, free)
}

pub fn mk_recursor_app(
    data_id: Ident,
    params: Vec<Term>,
    motive: Term,
    cases: Vec<(Ident, Term)>,
    indices: Vec<Term>,
    scrutinee: Term,
) -> Term {
    let mut parts = vec![hash64(&data_id.to_string()), motive.digest(), scrutinee.digest()];
    parts.extend(digests(&params));
    for (n, c) in &cases {
        parts.push(hash64(&n.to_string()));
        parts.push(c.digest());
    }
    parts.extend(digests(&indices));
    let digest = digest_of(TAG_RECURSOR_APP, &parts);
    let mut free = motive.free_vars().union(scrutinee.free_vars());
    for t in params.iter().chain(indices.iter()) {
        free = free.union(t.free_vars());
    }
    for (_, c) in &cases {
        free = free.union(c.free_vars());
    }
    mk(
        TermKind::RecursorApp {
            data_id,
            params: Arc::from(params),
            motive,
            cases: Arc::from(cases),
            indices: Arc::from(indices),
            scrutinee,
        },
        digest,
        free,
    )
}

#[cfg(test)]
mod term_tests {
    use super::*;
    use crate::sort::Sort;

    #[test]
    fn structural_sharing_equality() {
        let a = mk_app(mk_local_var(0), mk_sort(Sort(0)));
        let b = mk_app(mk_local_var(0), mk_sort(Sort(0)));
        assert_eq!(a, b);
        assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn free_vars_lambda_shifts_body() {
        // Lambda(_, Sort 0, LocalVar(0)) is closed: the bound occurrence of 0
        // is shifted out of range by the binder.
        let lam = mk_lambda(Ident::local("x"), mk_sort(Sort(0)), mk_local_var(0));
        assert!(lam.is_closed());
    }

    #[test]
    fn free_vars_app_picks_up_dangling_var() {
        let t = mk_app(mk_local_var(2), mk_local_var(0));
        assert!(t.free_vars().contains(2));
        assert!(t.free_vars().contains(0));
        assert!(!t.free_vars().contains(1));
    }

    #[test]
    fn constant_is_closed_regardless_of_definition() {
        let def = mk_local_var(5);
        let ty = mk_sort(Sort(0));
        let c = mk_constant(Ident::new("m", "c"), def, ty);
        assert!(c.is_closed());
    }
}
