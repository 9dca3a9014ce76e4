use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::ctx::Ctx;
use crate::env::{Env, NAT, STRING, VEC};
use crate::errors::{Pos, TCError, TCResult};
use crate::name::Ident;
use crate::reduction::whnf;
use crate::recursor::{allowed_elim_sort, recursor_elim_types, recursor_ret_type_type};
use crate::sort::Sort;
use crate::subst::{inc_vars, instantiate_one, instantiate_var_list};
use crate::term::{
    apply_all, mk_datatype_app, mk_field_type, mk_global, mk_nat_lit, mk_pair_type, mk_pi, mk_sort,
    LetDef, Term, TermKind,
};

/// Knobs that change how strictly `infer` checks a term, for callers who
/// have already elaborated and checked `t` by other means.
#[derive(Debug, Clone, Copy)]
pub struct CheckerOptions {
    /// When set, `infer` trusts that `t` was already checked elsewhere and
    /// skips the subtype/convertibility side conditions that don't affect
    /// the type it returns (the declared-vs-inferred check on `Constant`,
    /// the element-subtype check on `ArrayValue`, the recursor's motive and
    /// case-type checks, and so on). The shape of the computation is
    /// unchanged; only the validating comparisons are skipped. Reduction
    /// (`whnf`) still runs, since the returned type must still be in WHNF
    /// regardless of how much validation ran to find it.
    pub assume_checked: bool,
}

impl Default for CheckerOptions {
    fn default() -> Self {
        CheckerOptions { assume_checked: false }
    }
}

/// The type-checking engine: convertibility, subtyping, `infer`, and the
/// recursor well-formedness procedure.
///
/// One instance is built per top-level call (`sc_type_check`/
/// `sc_type_check_in_ctx`); `ctx` grows as `infer` descends under binders
/// and the per-term memo table is cleared whenever `ctx` changes, since a
/// cached type is only valid for the context it was computed under.
/// `with_var`/`at_pos` are the scoping helpers that wrap errors with context
/// as they unwind. There is no definitional-equality cache or unfold-hint
/// plumbing here: convertibility is cheap enough (content-addressed terms,
/// no named substitution) that the extra bookkeeping isn't worth its keep.
pub struct TypeChecker {
    options: CheckerOptions,
    env: Arc<RwLock<Env>>,
    mod_name: Option<Ident>,
    ctx: Ctx,
    memo: HashMap<Term, Term>,
}

impl TypeChecker {
    pub fn new(options: CheckerOptions, env: Arc<RwLock<Env>>, mod_name: Option<Ident>) -> Self {
        TypeChecker::with_ctx(options, env, mod_name, Ctx::empty())
    }

    pub fn with_ctx(options: CheckerOptions, env: Arc<RwLock<Env>>, mod_name: Option<Ident>, ctx: Ctx) -> Self {
        TypeChecker {
            options,
            env,
            mod_name,
            ctx,
            memo: HashMap::new(),
        }
    }

    pub fn ctx(&self) -> &Ctx {
        &self.ctx
    }

    pub fn mod_name(&self) -> Option<&Ident> {
        self.mod_name.as_ref()
    }

    fn should_check(&self) -> bool {
        !self.options.assume_checked
    }

    /// Run `body` with `self.ctx` extended by `(name, ty)`, restoring both
    /// the context and the memo table on the way back out (a cached type
    /// computed under one context is meaningless under another). Errors
    /// raised inside `body` are wrapped with `(name, ty)` as they unwind,
    /// forming the "while checking under x : T" stack trace.
    fn with_var<T>(&mut self, name: Ident, ty: Term, body: impl FnOnce(&mut Self) -> TCResult<T>) -> TCResult<T> {
        let saved_memo = std::mem::replace(&mut self.memo, HashMap::new());
        let saved_ctx = self.ctx.clone();
        self.ctx = self.ctx.with_var(ty.clone());
        let result = body(self);
        self.ctx = saved_ctx;
        self.memo = saved_memo;
        result.map_err(|e| e.wrap_ctx(name, ty))
    }

    /// Run `body`, wrapping any error it raises with `pos` (idempotently:
    /// an error that already carries a position is left alone).
    pub fn at_pos<T>(&mut self, pos: Pos, body: impl FnOnce(&mut Self) -> TCResult<T>) -> TCResult<T> {
        body(self).map_err(|e| e.wrap_pos(pos))
    }

    pub fn are_convertible(&self, a: &Term, b: &Term) -> bool {
        are_convertible(&self.env.read(), a, b)
    }

    pub fn is_subtype(&self, a: &Term, b: &Term) -> bool {
        is_subtype(&self.env.read(), a, b)
    }

    pub fn whnf(&self, t: &Term) -> Term {
        whnf(&self.env.read(), t)
    }

    fn global_type(&self, id: &Ident) -> TCResult<Term> {
        self.env
            .read()
            .find_global(id)
            .map(|g| g.ty.clone())
            .ok_or_else(|| TCError::UnboundName(id.clone()))
    }

    fn ensure_sort(&mut self, t: &Term) -> TCResult<Sort> {
        let ty = self.infer(t)?;
        match ty.kind() {
            TermKind::Sort(s) => Ok(*s),
            _ => Err(TCError::NotSort(ty)),
        }
    }

    /// The most general type of `t`, in WHNF. Results are memoized per-term
    /// for the lifetime of the current context.
    pub fn infer(&mut self, t: &Term) -> TCResult<Term> {
        if let Some(cached) = self.memo.get(t) {
            return Ok(cached.clone());
        }
        let raw = self.infer_uncached(t)?;
        let ty = self.whnf(&raw);
        self.memo.insert(t.clone(), ty.clone());
        Ok(ty)
    }

    fn infer_uncached(&mut self, t: &Term) -> TCResult<Term> {
        match t.kind() {
            TermKind::LocalVar(i) => self.infer_local_var(*i),
            TermKind::Lambda(name, a, body) => self.infer_lambda(name, a, body),
            TermKind::Pi(name, a, b) => self.infer_pi(name, a, b).map(mk_sort),
            TermKind::Let(defs, body) => self.infer_let(defs, body),
            TermKind::App(f, x) => self.infer_app(f, x),
            TermKind::Constant(name, defn, decl_ty) => self.infer_constant(name, defn, decl_ty),
            TermKind::GlobalDef(id) => self.global_type(id),
            TermKind::Sort(s) => Ok(mk_sort(s.succ())),
            TermKind::NatLit(_) => Ok(mk_global(NAT.clone())),
            TermKind::StringLit(_) => Ok(mk_global(STRING.clone())),
            TermKind::ArrayValue(elem_ty, vals) => self.infer_array(elem_ty, vals),
            TermKind::ExtCns(_, _, ty) => Ok(ty.clone()),
            TermKind::UnitType => Ok(mk_sort(Sort(0))),
            TermKind::UnitValue => Ok(crate::term::mk_unit_type()),
            TermKind::PairType(a, b) => self.infer_pair_type(a, b),
            TermKind::PairValue(a, b) => self.infer_pair_value(a, b),
            TermKind::PairLeft(e) => self.infer_pair_proj(e, true),
            TermKind::PairRight(e) => self.infer_pair_proj(e, false),
            TermKind::EmptyRecordType => Ok(mk_sort(Sort(0))),
            TermKind::EmptyRecordValue => Ok(crate::term::mk_empty_record_type()),
            TermKind::FieldType(name, ty, rest) => self.infer_field_type(name, ty, rest),
            TermKind::FieldValue(name, val, rest) => self.infer_field_value(name, val, rest),
            TermKind::RecordSelector(rec, field) => self.infer_record_selector(rec, field),
            TermKind::CtorApp(id, params, args) => self.infer_ctor_app(id, params, args),
            TermKind::DataTypeApp(id, params, indices) => self.infer_datatype_app(id, params, indices),
            TermKind::RecursorApp { .. } => self.infer_recursor(t),
        }
    }

    /// `LocalVar(i)`: the context stores unlifted types (`ctx.get_ty(i)` is
    /// the type as it reads at the point it was bound), so the index-`i`
    /// occurrence's type is that declaration lifted across the `i` binders
    /// introduced since.
    fn infer_local_var(&self, i: usize) -> TCResult<Term> {
        if i >= self.ctx.len() {
            return Err(TCError::DanglingVar(i));
        }
        let ty = self.ctx.get_ty(i);
        Ok(inc_vars(0, i + 1, &ty))
    }

    fn infer_lambda(&mut self, name: &Ident, a: &Term, body: &Term) -> TCResult<Term> {
        self.ensure_sort(a)?;
        let a_whnf = self.whnf(a);
        let b_ty = self.with_var(name.clone(), a_whnf.clone(), |tc| tc.infer(body))?;
        Ok(mk_pi(name.clone(), a_whnf, b_ty))
    }

    /// `Pi(x, a, b)`'s own sort: `s2` when `s2` is `propSort` (impredicative
    /// codomain: a proposition-valued function type is itself a
    /// proposition regardless of its domain's size), else `max(s1, s2)`.
    fn infer_pi(&mut self, name: &Ident, a: &Term, b: &Term) -> TCResult<Sort> {
        let s1 = self.ensure_sort(a)?;
        let a_whnf = self.whnf(a);
        let s2 = self.with_var(name.clone(), a_whnf, |tc| tc.ensure_sort(b))?;
        Ok(if s2.is_prop() { s2 } else { s1.max(s2) })
    }

    /// Not exercised by recursor/datatype inference (those never build a
    /// `Let`), so rather than derive a dedicated typing rule for a
    /// mutually-recursive telescope, this just zeta-reduces and infers the
    /// result (sufficient for `whnf`-before-`infer` callers and for terms
    /// built directly with `mk_let`).
    fn infer_let(&mut self, defs: &Arc<[LetDef]>, body: &Term) -> TCResult<Term> {
        let vals: Vec<Term> = defs.iter().map(|d| d.val.clone()).collect();
        let reduced = instantiate_var_list(0, &vals, body);
        self.infer(&reduced)
    }

    fn infer_app(&mut self, f: &Term, x: &Term) -> TCResult<Term> {
        let fty = self.infer(f)?;
        let (arg_ty, ret_ty) = match fty.kind() {
            TermKind::Pi(_, arg_ty, ret_ty) => (arg_ty.clone(), ret_ty.clone()),
            _ => return Err(TCError::NotFuncType(fty)),
        };
        let xty = self.infer(x)?;
        if self.should_check() && !self.is_subtype(&xty, &arg_ty) {
            return Err(TCError::SubtypeFailure(xty, arg_ty));
        }
        Ok(instantiate_one(&ret_ty, x))
    }

    fn infer_constant(&mut self, name: &Ident, defn: &Term, decl_ty: &Term) -> TCResult<Term> {
        self.ensure_sort(decl_ty)?;
        if self.should_check() {
            let inferred = self.infer(defn)?;
            let decl_whnf = self.whnf(decl_ty);
            if !self.is_subtype(&inferred, &decl_whnf) {
                return Err(TCError::BadConstType {
                    name: name.clone(),
                    inferred,
                    declared: decl_whnf,
                });
            }
        }
        Ok(decl_ty.clone())
    }

    fn infer_pair_type(&mut self, a: &Term, b: &Term) -> TCResult<Term> {
        let sa = self.ensure_sort(a)?;
        let sb = self.ensure_sort(b)?;
        Ok(mk_sort(sa.max(sb)))
    }

    fn infer_pair_value(&mut self, a: &Term, b: &Term) -> TCResult<Term> {
        let ta = self.infer(a)?;
        let tb = self.infer(b)?;
        Ok(mk_pair_type(ta, tb))
    }

    fn infer_pair_proj(&mut self, e: &Term, is_left: bool) -> TCResult<Term> {
        let ety = self.infer(e)?;
        match ety.kind() {
            TermKind::PairType(a, b) => Ok(if is_left { a.clone() } else { b.clone() }),
            _ => Err(TCError::NotTupleType(ety)),
        }
    }

    /// `FieldType(name, ty, rest)`'s own sort: `max(propSort, sortOf(ty),
    /// sortOf(rest))`, where `sortOf(rest)` is itself this same computation
    /// one level down the chain (the `propSort` floor falls out of
    /// `EmptyRecordType`'s base-case sort rather than being applied here
    /// explicitly).
    fn infer_field_type(&mut self, _name: &Ident, ty: &Term, rest: &Term) -> TCResult<Term> {
        let s_ty = self.ensure_sort(ty)?;
        let s_rest = self.ensure_sort(rest)?;
        Ok(mk_sort(s_ty.max(s_rest)))
    }

    fn infer_field_value(&mut self, name: &Ident, val: &Term, rest: &Term) -> TCResult<Term> {
        let val_ty = self.infer(val)?;
        let rest_ty = self.infer(rest)?;
        Ok(mk_field_type(name.clone(), val_ty, rest_ty))
    }

    fn infer_record_selector(&mut self, rec: &Term, field: &Ident) -> TCResult<Term> {
        let rec_ty = self.infer(rec)?;
        self.find_field(&rec_ty, field)
    }

    fn find_field(&mut self, ty: &Term, field: &Ident) -> TCResult<Term> {
        let w = self.whnf(ty);
        match w.kind() {
            TermKind::FieldType(name, fty, rest) => {
                if name == field {
                    Ok(fty.clone())
                } else {
                    self.find_field(rest, field)
                }
            }
            TermKind::EmptyRecordType => Err(TCError::BadRecordField(field.clone())),
            _ => Err(TCError::NotRecordType(w)),
        }
    }

    /// `ArrayValue(elemTy, vs)`'s type is `Vec |vs| whnf(elemTy)`, the global
    /// `Vec` applied to the literal length and the normalized element type,
    /// not `Vec`'s own declared type (`Nat -> Sort(0) -> Sort(0)`, which is
    /// what `infer(GlobalDef(Vec))` returns).
    fn infer_array(&mut self, elem_ty: &Term, vals: &[Term]) -> TCResult<Term> {
        self.ensure_sort(elem_ty)?;
        let elem_whnf = self.whnf(elem_ty);
        if self.should_check() {
            for v in vals {
                let vty = self.infer(v)?;
                if !self.is_subtype(&vty, &elem_whnf) {
                    return Err(TCError::SubtypeFailure(vty, elem_whnf));
                }
            }
        }
        Ok(apply_all(
            mk_global(VEC.clone()),
            vec![mk_nat_lit(vals.len() as u64), elem_whnf],
        ))
    }

    /// Fold `apply_pi_typed` over `args` starting from `start_ty`, as both
    /// `DataTypeApp` and `CtorApp` inference do over their params-then-rest
    /// telescopes.
    fn fold_apply_pi(&mut self, mut acc: Term, args: &[Term]) -> TCResult<Term> {
        for a in args {
            let a_ty = self.infer(a)?;
            acc = self.apply_pi_typed(&acc, a, &a_ty)?;
        }
        Ok(acc)
    }

    /// Given `funTy` (not necessarily WHNF) known to be a `Pi`, and
    /// `arg : argTy`, check `argTy <: domain` and return `whnf(codomain[arg])`.
    pub fn apply_pi_typed(&mut self, fun_ty: &Term, arg_value: &Term, arg_ty: &Term) -> TCResult<Term> {
        let fty_whnf = self.whnf(fun_ty);
        let (dom, cod) = match fty_whnf.kind() {
            TermKind::Pi(_, dom, cod) => (dom.clone(), cod.clone()),
            _ => return Err(TCError::NotFuncType(fty_whnf)),
        };
        if self.should_check() && !self.is_subtype(arg_ty, &dom) {
            return Err(TCError::SubtypeFailure(arg_ty.clone(), dom));
        }
        Ok(self.whnf(&instantiate_one(&cod, arg_value)))
    }

    fn infer_datatype_app(&mut self, id: &Ident, params: &[Term], indices: &[Term]) -> TCResult<Term> {
        let dt = self
            .env
            .read()
            .find_datatype(id)
            .cloned()
            .ok_or_else(|| TCError::NoSuchDataType(id.clone()))?;
        if params.len() != dt.num_params {
            return Err(TCError::BadParamsOrArgsLength {
                is_data_type: true,
                id: id.clone(),
                expected: dt.num_params,
                got: params.len(),
            });
        }
        if indices.len() != dt.num_indices {
            return Err(TCError::BadParamsOrArgsLength {
                is_data_type: true,
                id: id.clone(),
                expected: dt.num_indices,
                got: indices.len(),
            });
        }
        let all: Vec<Term> = params.iter().cloned().chain(indices.iter().cloned()).collect();
        self.fold_apply_pi(dt.ty.clone(), &all)
    }

    fn infer_ctor_app(&mut self, id: &Ident, params: &[Term], args: &[Term]) -> TCResult<Term> {
        let ctor = self
            .env
            .read()
            .find_ctor(id)
            .cloned()
            .ok_or_else(|| TCError::NoSuchCtor(id.clone()))?;
        if params.len() != ctor.num_params {
            return Err(TCError::BadParamsOrArgsLength {
                is_data_type: false,
                id: id.clone(),
                expected: ctor.num_params,
                got: params.len(),
            });
        }
        if args.len() != ctor.num_args {
            return Err(TCError::BadParamsOrArgsLength {
                is_data_type: false,
                id: id.clone(),
                expected: ctor.num_args,
                got: args.len(),
            });
        }
        let all: Vec<Term> = params.iter().cloned().chain(args.iter().cloned()).collect();
        self.fold_apply_pi(ctor.ty.clone(), &all)
    }

    /// Peel `Pi`s off a (whnf'd as needed) motive type until a `Sort` is
    /// reached. The binders peeled don't need instantiating: `Sort` carries
    /// no subterms, so the literal return-sort at the end of the chain never
    /// actually depends on the index/major-premise values those binders
    /// would have bound.
    fn strip_pis_to_sort(&mut self, motive_ty: &Term) -> TCResult<Sort> {
        let mut cur = self.whnf(motive_ty);
        loop {
            match cur.kind() {
                TermKind::Pi(_, _, body) => cur = self.whnf(body),
                TermKind::Sort(s) => return Ok(*s),
                _ => {
                    return Err(TCError::MalformedRecursor {
                        term: motive_ty.clone(),
                        reason: "motive does not return a sort".into(),
                    })
                }
            }
        }
    }

    /// The seven-step recursor well-formedness procedure: arity check,
    /// motive-type check, elimination-sort discipline, per-constructor case
    /// check, scrutinee-type check, and finally the inferred type itself
    /// (the motive applied to the indices and scrutinee, which is also what
    /// `reduction.rs`'s iota step produces in the scrutinee's stead once
    /// reduced).
    fn infer_recursor(&mut self, t: &Term) -> TCResult<Term> {
        let (data_id, params, motive, cases, indices, scrutinee) = match t.kind() {
            TermKind::RecursorApp {
                data_id,
                params,
                motive,
                cases,
                indices,
                scrutinee,
            } => (data_id, params, motive, cases, indices, scrutinee),
            _ => unreachable!("infer_recursor called on a non-RecursorApp term"),
        };

        let dt = self
            .env
            .read()
            .find_datatype(data_id)
            .cloned()
            .ok_or_else(|| TCError::NoSuchDataType(data_id.clone()))?;

        if params.len() != dt.num_params || indices.len() != dt.num_indices {
            return Err(TCError::MalformedRecursor {
                term: t.clone(),
                reason: format!(
                    "expected {} parameter(s) and {} index/indices, got {} and {}",
                    dt.num_params,
                    dt.num_indices,
                    params.len(),
                    indices.len()
                ),
            });
        }

        // 1-2: params ++ indices must actually apply against dt.ty.
        let all_pi_args: Vec<Term> = params.iter().cloned().chain(indices.iter().cloned()).collect();
        self.fold_apply_pi(dt.ty.clone(), &all_pi_args)?;

        // 3: the motive's type, after stripping Pis, names the return sort.
        let motive_ty = self.infer(motive)?;
        let s_ret = self.strip_pis_to_sort(&motive_ty)?;
        if self.should_check() {
            let motive_req_ty = recursor_ret_type_type(&dt, params, s_ret);
            if !self.is_subtype(&motive_ty, &motive_req_ty) {
                return Err(TCError::MalformedRecursor {
                    term: t.clone(),
                    reason: "motive does not match the required motive type".into(),
                });
            }
        }

        // 4: elimination-sort discipline.
        if !allowed_elim_sort(&dt, s_ret) {
            return Err(TCError::MalformedRecursor {
                term: t.clone(),
                reason: "disallowed elimination into propSort for a multi-constructor datatype".into(),
            });
        }

        // 5: every constructor has exactly one case, of the required type.
        if self.should_check() {
            let required = recursor_elim_types(&self.env.read(), &dt, params, motive);
            let provided: HashMap<&Ident, &Term> = cases.iter().map(|(n, t)| (n, t)).collect();
            for (name, _) in &required {
                if !provided.contains_key(name) {
                    return Err(TCError::MalformedRecursor {
                        term: t.clone(),
                        reason: format!("missing case for constructor {}", name),
                    });
                }
            }
            let required_names: hashbrown::HashSet<&Ident> = required.iter().map(|(n, _)| n).collect();
            for (name, _) in cases.iter() {
                if !required_names.contains(name) {
                    return Err(TCError::MalformedRecursor {
                        term: t.clone(),
                        reason: format!("case given for constructor {} not belonging to {}", name, data_id),
                    });
                }
            }
            for (name, req_ty) in &required {
                let case_term = provided.get(name).unwrap();
                let case_ty = self.infer(case_term)?;
                if !self.is_subtype(&case_ty, req_ty) {
                    return Err(TCError::MalformedRecursor {
                        term: t.clone(),
                        reason: format!("case for constructor {} does not match its required type", name),
                    });
                }
            }
        }

        // 6: the scrutinee must inhabit DataTypeApp(data_id, params, indices).
        let scrut_ty = self.infer(scrutinee)?;
        if self.should_check() {
            let expected = mk_datatype_app(data_id.clone(), params.to_vec(), indices.to_vec());
            if !self.is_subtype(&scrut_ty, &expected) {
                return Err(TCError::SubtypeFailure(scrut_ty, expected));
            }
        }

        // 7: the recursor application's type.
        Ok(apply_all(
            motive.clone(),
            indices.iter().cloned().chain(std::iter::once(scrutinee.clone())),
        ))
    }

    /// Infer and WHNF a telescope of entries left to right, permanently
    /// extending `self.ctx` by each in turn (unlike `with_var`, there is no
    /// restore: this builds up the context a caller goes on to use, rather
    /// than scoping a nested call).
    pub fn type_infer_ctx(&mut self, entries: &[(Ident, Term)]) -> TCResult<Vec<(Ident, Term, Sort)>> {
        let mut out = Vec::with_capacity(entries.len());
        for (name, a) in entries {
            let s = self.ensure_sort(a)?;
            let a_whnf = self.whnf(a);
            out.push((name.clone(), a_whnf.clone(), s));
            self.ctx = self.ctx.with_var(a_whnf);
            self.memo.clear();
        }
        Ok(out)
    }
}

/// Definitional equality: structural equality up to WHNF, recursing
/// congruently through every term former. Context-free by
/// construction: comparing two terms' subterms never needs to know what a
/// bound variable's own type is, only that the two sides line up, so this
/// takes no typing context at all.
pub fn are_convertible(env: &Env, t1: &Term, t2: &Term) -> bool {
    if t1 == t2 {
        return true;
    }
    let w1 = whnf(env, t1);
    let w2 = whnf(env, t2);
    if w1 == w2 {
        return true;
    }
    match (w1.kind(), w2.kind()) {
        (TermKind::Sort(s1), TermKind::Sort(s2)) => s1 == s2,
        (TermKind::LocalVar(i1), TermKind::LocalVar(i2)) => i1 == i2,
        (TermKind::GlobalDef(a), TermKind::GlobalDef(b)) => a == b,
        (TermKind::NatLit(a), TermKind::NatLit(b)) => a == b,
        (TermKind::StringLit(a), TermKind::StringLit(b)) => a == b,
        (TermKind::ExtCns(i1, _, _), TermKind::ExtCns(i2, _, _)) => i1 == i2,
        (TermKind::Constant(n1, _, _), TermKind::Constant(n2, _, _)) => n1 == n2,
        (TermKind::UnitType, TermKind::UnitType)
        | (TermKind::UnitValue, TermKind::UnitValue)
        | (TermKind::EmptyRecordType, TermKind::EmptyRecordType)
        | (TermKind::EmptyRecordValue, TermKind::EmptyRecordValue) => true,
        (TermKind::Lambda(_, a1, b1), TermKind::Lambda(_, a2, b2))
        | (TermKind::Pi(_, a1, b1), TermKind::Pi(_, a2, b2))
        | (TermKind::PairType(a1, b1), TermKind::PairType(a2, b2))
        | (TermKind::PairValue(a1, b1), TermKind::PairValue(a2, b2))
        | (TermKind::App(a1, b1), TermKind::App(a2, b2)) => are_convertible(env, a1, a2) && are_convertible(env, b1, b2),
        (TermKind::PairLeft(a), TermKind::PairLeft(b)) | (TermKind::PairRight(a), TermKind::PairRight(b)) => {
            are_convertible(env, a, b)
        }
        (TermKind::FieldType(n1, t1_, r1), TermKind::FieldType(n2, t2_, r2))
        | (TermKind::FieldValue(n1, t1_, r1), TermKind::FieldValue(n2, t2_, r2)) => {
            n1 == n2 && are_convertible(env, t1_, t2_) && are_convertible(env, r1, r2)
        }
        (TermKind::RecordSelector(r1, f1), TermKind::RecordSelector(r2, f2)) => f1 == f2 && are_convertible(env, r1, r2),
        (TermKind::CtorApp(id1, p1, a1), TermKind::CtorApp(id2, p2, a2))
        | (TermKind::DataTypeApp(id1, p1, a1), TermKind::DataTypeApp(id2, p2, a2)) => {
            id1 == id2
                && p1.len() == p2.len()
                && a1.len() == a2.len()
                && p1.iter().zip(p2.iter()).all(|(x, y)| are_convertible(env, x, y))
                && a1.iter().zip(a2.iter()).all(|(x, y)| are_convertible(env, x, y))
        }
        (TermKind::ArrayValue(e1, v1), TermKind::ArrayValue(e2, v2)) => {
            are_convertible(env, e1, e2)
                && v1.len() == v2.len()
                && v1.iter().zip(v2.iter()).all(|(x, y)| are_convertible(env, x, y))
        }
        (
            TermKind::RecursorApp {
                data_id: d1,
                params: p1,
                motive: m1,
                cases: c1,
                indices: i1,
                scrutinee: s1,
            },
            TermKind::RecursorApp {
                data_id: d2,
                params: p2,
                motive: m2,
                cases: c2,
                indices: i2,
                scrutinee: s2,
            },
        ) => {
            d1 == d2
                && p1.len() == p2.len()
                && i1.len() == i2.len()
                && c1.len() == c2.len()
                && are_convertible(env, m1, m2)
                && are_convertible(env, s1, s2)
                && p1.iter().zip(p2.iter()).all(|(x, y)| are_convertible(env, x, y))
                && i1.iter().zip(i2.iter()).all(|(x, y)| are_convertible(env, x, y))
                && c1
                    .iter()
                    .zip(c2.iter())
                    .all(|((n1, t1_), (n2, t2_))| n1 == n2 && are_convertible(env, t1_, t2_))
        }
        _ => false,
    }
}

/// Subtyping: `Pi`s are compared contravariantly in the domain and
/// covariantly in the codomain, `Sort`s by universe ordering, everything
/// else falls back to convertibility.
pub fn is_subtype(env: &Env, a: &Term, b: &Term) -> bool {
    match (a.kind(), b.kind()) {
        (TermKind::Pi(_, a1, b1), TermKind::Pi(_, a2, b2)) => are_convertible(env, a1, a2) && is_subtype(env, b1, b2),
        (TermKind::Sort(s1), TermKind::Sort(s2)) => s1.leq(*s2),
        _ => are_convertible(env, a, b),
    }
}

/// Type-check `term` in the empty context under `env`.
pub fn sc_type_check(env: Arc<RwLock<Env>>, mod_name: Option<Ident>, term: &Term) -> TCResult<Term> {
    sc_type_check_in_ctx(env, mod_name, Ctx::empty(), term)
}

/// Infer `term`'s type under a caller-supplied context, e.g. one built incrementally via
/// `TypeChecker::type_infer_ctx`.
pub fn sc_type_check_in_ctx(env: Arc<RwLock<Env>>, mod_name: Option<Ident>, ctx: Ctx, term: &Term) -> TCResult<Term> {
    let mut tc = TypeChecker::with_ctx(CheckerOptions::default(), env, mod_name, ctx);
    tc.infer(term)
}

/// Are `t1` and `t2` the same term up to WHNF, under `env`'s global
/// definitions?
pub fn sc_convertible(env: &Arc<RwLock<Env>>, t1: &Term, t2: &Term) -> bool {
    are_convertible(&env.read(), t1, t2)
}

#[cfg(test)]
mod tc_tests {
    use super::*;
    use crate::env::{CtorInfo, DataTypeInfo};
    use crate::name::Ident;
    use crate::sort::PROP;
    use crate::term::{mk_ctor_app, mk_lambda, mk_local_var, mk_nat_lit, mk_pi, mk_recursor_app, mk_sort};

    fn fresh_env() -> Arc<RwLock<Env>> {
        Arc::new(RwLock::new(Env::new()))
    }

    #[test]
    fn identity_lambda_infers_expected_pi() {
        let env = fresh_env();
        let lam = mk_lambda(Ident::local("x"), mk_sort(PROP), mk_local_var(0));
        let ty = sc_type_check(env, None, &lam).expect("should type-check");
        assert_eq!(ty, mk_pi(Ident::local("x"), mk_sort(PROP), mk_sort(PROP)));
    }

    #[test]
    fn applying_a_non_function_is_rejected() {
        let env = fresh_env();
        let bad = crate::term::mk_app(mk_nat_lit(1), mk_nat_lit(2));
        let err = sc_type_check(env, None, &bad).unwrap_err();
        assert!(matches!(err, TCError::NotFuncType(_)));
    }

    #[test]
    fn dangling_local_var_is_rejected() {
        let env = fresh_env();
        let err = sc_type_check(env, None, &mk_local_var(0)).unwrap_err();
        assert!(matches!(err, TCError::DanglingVar(0)));
    }

    #[test]
    fn empty_array_literal_type_checks_to_vec_zero() {
        let env = fresh_env();
        let arr = crate::term::mk_array_value(mk_global(NAT.clone()), vec![]);
        let ty = sc_type_check(env, None, &arr).expect("should type-check");
        let expected = apply_all(mk_global(VEC.clone()), vec![mk_nat_lit(0), mk_global(NAT.clone())]);
        assert_eq!(ty, expected);
    }

    #[test]
    fn array_literal_rejects_mismatched_element_type() {
        let env = fresh_env();
        let arr = crate::term::mk_array_value(mk_global(NAT.clone()), vec![mk_global(STRING.clone())]);
        let err = sc_type_check(env, None, &arr).unwrap_err();
        assert!(matches!(err, TCError::SubtypeFailure(..)));
    }

    fn nat2_env() -> (Arc<RwLock<Env>>, Ident, Ident, Ident) {
        let mut env = Env::new();
        let data_name = Ident::new("nat2", "Nat2");
        let zero_name = Ident::new("nat2", "zero");
        let succ_name = Ident::new("nat2", "succ");
        env.insert_datatype(DataTypeInfo {
            name: data_name.clone(),
            ty: mk_sort(PROP.succ()),
            num_params: 0,
            num_indices: 0,
            ctors: vec![zero_name.clone(), succ_name.clone()],
            is_primitive: false,
        });
        let self_ty = mk_datatype_app(data_name.clone(), vec![], vec![]);
        env.insert_ctor(CtorInfo {
            name: zero_name.clone(),
            ty: self_ty.clone(),
            num_params: 0,
            num_args: 0,
            data_type: data_name.clone(),
        });
        env.insert_ctor(CtorInfo {
            name: succ_name.clone(),
            ty: mk_pi(Ident::local("n"), self_ty.clone(), self_ty),
            num_params: 0,
            num_args: 1,
            data_type: data_name.clone(),
        });
        (Arc::new(RwLock::new(env)), data_name, zero_name, succ_name)
    }

    #[test]
    fn nullary_ctor_app_infers_its_datatype() {
        let (env, data_name, zero_name, _) = nat2_env();
        let zero = mk_ctor_app(zero_name, vec![], vec![]);
        let ty = sc_type_check(env, None, &zero).expect("should type-check");
        assert_eq!(ty, mk_datatype_app(data_name, vec![], vec![]));
    }

    #[test]
    fn recursor_with_missing_case_is_malformed() {
        let (env, data_name, zero_name, _) = nat2_env();
        let motive = mk_pi(
            Ident::local("_"),
            mk_datatype_app(data_name.clone(), vec![], vec![]),
            mk_sort(PROP.succ()),
        );
        let zero = mk_ctor_app(zero_name, vec![], vec![]);
        let rec = mk_recursor_app(data_name, vec![], motive, vec![], vec![], zero);
        let err = sc_type_check(env, None, &rec).unwrap_err();
        assert!(matches!(err, TCError::MalformedRecursor { .. }));
    }

    #[test]
    fn disallowed_prop_elimination_on_multi_ctor_datatype() {
        let (env, data_name, zero_name, _succ_name) = nat2_env();
        let motive = mk_pi(
            Ident::local("_"),
            mk_datatype_app(data_name.clone(), vec![], vec![]),
            mk_sort(PROP),
        );
        let zero = mk_ctor_app(zero_name, vec![], vec![]);
        let rec = mk_recursor_app(data_name, vec![], motive, vec![], vec![], zero);
        let err = sc_type_check(env, None, &rec).unwrap_err();
        assert!(matches!(err, TCError::MalformedRecursor { .. }));
    }
}
