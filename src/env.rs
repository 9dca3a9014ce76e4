use hashbrown::HashMap;
use once_cell::sync::Lazy;

use crate::name::Ident;
use crate::term::Term;

/// A global definition or axiom. `value` is `None` for an axiom (nothing to
/// delta-unfold) and `Some` for a definition.
#[derive(Debug, Clone)]
pub struct GlobalInfo {
    pub name: Ident,
    pub ty: Term,
    pub value: Option<Term>,
}

/// A datatype's signature: name, fully-quantified type, arities, and its
/// constructor set. `ty` is the fully-quantified `Pi` over params then indices, ending
/// in a `Sort`; `num_params`/`num_indices` are the arities used to split a
/// `DataTypeApp`'s argument vectors, and `ctors` records declaration order
/// (case-name matching in `tc.rs`'s recursor check is order-independent, but
/// `recursor.rs` reports missing/extra constructors in this order).
#[derive(Debug, Clone)]
pub struct DataTypeInfo {
    pub name: Ident,
    pub ty: Term,
    pub num_params: usize,
    pub num_indices: usize,
    pub ctors: Vec<Ident>,
    pub is_primitive: bool,
}

/// `{name, type, numParams, numArgs}` where `type` is a closed
/// `∀params. ∀args. DataTypeApp(d, params, indices)`.
#[derive(Debug, Clone)]
pub struct CtorInfo {
    pub name: Ident,
    pub ty: Term,
    pub num_params: usize,
    pub num_args: usize,
    pub data_type: Ident,
}

/// Module environment: read-mostly lookup tables for datatypes,
/// constructors, and global definitions, keyed by qualified name. There is
/// no parser or module loader in this crate, so callers populate it with
/// already-checked datatypes and definitions via `insert_*` and the engine
/// only ever reads it back through `find_*`.
///
/// Meant to be shared across inference calls as
/// `Arc<parking_lot::RwLock<Env>>`: every inference call takes a read guard,
/// and only whatever populates the environment up front ever takes a write
/// guard.
#[derive(Debug, Clone, Default)]
pub struct Env {
    globals: HashMap<Ident, GlobalInfo>,
    datatypes: HashMap<Ident, DataTypeInfo>,
    ctors: HashMap<Ident, CtorInfo>,
}

/// Well-known identifiers for the primitive globals the checker and the
/// type-checking WHNF simpset reference by name (`Nat`, `String`, `Vec`, and
/// the successor/arithmetic globals). Lazily built once per process.
pub static NAT: Lazy<Ident> = Lazy::new(|| Ident::new("core", "Nat"));
pub static STRING: Lazy<Ident> = Lazy::new(|| Ident::new("core", "String"));
pub static VEC: Lazy<Ident> = Lazy::new(|| Ident::new("core", "Vec"));
pub static SUCC: Lazy<Ident> = Lazy::new(|| Ident::new("core", "succ"));
pub static ADD: Lazy<Ident> = Lazy::new(|| Ident::new("core", "add"));
pub static MUL: Lazy<Ident> = Lazy::new(|| Ident::new("core", "mul"));

impl Env {
    /// An environment pre-populated with the primitive globals always
    /// assumed available (`Nat`, `String`, `Vec`) plus the arithmetic
    /// globals the nat-literal simpset recognizes by name. Callers add their
    /// own datatypes/constants on top via `insert_*`.
    pub fn new() -> Self {
        let mut env = Env {
            globals: HashMap::new(),
            datatypes: HashMap::new(),
            ctors: HashMap::new(),
        };
        env.register_builtins();
        env
    }

    fn register_builtins(&mut self) {
        use crate::sort::PROP;
        use crate::term::{mk_pi, mk_sort};

        let sort0 = mk_sort(PROP.succ());
        self.insert_global(GlobalInfo {
            name: NAT.clone(),
            ty: sort0.clone(),
            value: None,
        });
        self.insert_global(GlobalInfo {
            name: STRING.clone(),
            ty: sort0.clone(),
            value: None,
        });

        let nat_ty = crate::term::mk_global(NAT.clone());
        // Vec : Nat -> Sort(0) -> Sort(0), applied as `Vec n elemTy`.
        let vec_ty = mk_pi(
            Ident::local("n"),
            nat_ty.clone(),
            mk_pi(Ident::local("a"), sort0.clone(), sort0.clone()),
        );
        self.insert_global(GlobalInfo {
            name: VEC.clone(),
            ty: vec_ty,
            value: None,
        });

        // succ : Nat -> Nat; add, mul : Nat -> Nat -> Nat. Their reduction
        // behavior (literal folding) lives in reduction.rs, keyed on these
        // same identifiers; the types here only support `infer`.
        let succ_ty = mk_pi(Ident::local("n"), nat_ty.clone(), nat_ty.clone());
        self.insert_global(GlobalInfo {
            name: SUCC.clone(),
            ty: succ_ty,
            value: None,
        });
        let binop_ty = mk_pi(
            Ident::local("n"),
            nat_ty.clone(),
            mk_pi(Ident::local("m"), nat_ty.clone(), nat_ty.clone()),
        );
        self.insert_global(GlobalInfo {
            name: ADD.clone(),
            ty: binop_ty.clone(),
            value: None,
        });
        self.insert_global(GlobalInfo {
            name: MUL.clone(),
            ty: binop_ty,
            value: None,
        });
    }

    pub fn insert_global(&mut self, info: GlobalInfo) {
        self.globals.insert(info.name.clone(), info);
    }

    pub fn insert_datatype(&mut self, info: DataTypeInfo) {
        self.datatypes.insert(info.name.clone(), info);
    }

    pub fn insert_ctor(&mut self, info: CtorInfo) {
        self.ctors.insert(info.name.clone(), info);
    }

    pub fn find_global(&self, name: &Ident) -> Option<&GlobalInfo> {
        self.globals.get(name)
    }

    pub fn find_datatype(&self, name: &Ident) -> Option<&DataTypeInfo> {
        self.datatypes.get(name)
    }

    pub fn find_ctor(&self, name: &Ident) -> Option<&CtorInfo> {
        self.ctors.get(name)
    }

    pub fn num_globals(&self) -> usize {
        self.globals.len()
    }
}
