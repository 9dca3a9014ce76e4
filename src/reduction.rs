use crate::env::{Env, ADD, MUL, SUCC};
use crate::name::Ident;
use crate::recursor::ctor_recursive_mask;
use crate::subst::{instantiate_one, instantiate_var_list};
use crate::term::{apply_all, mk_nat_lit, mk_recursor_app, Term, TermKind};

/// Reduce `t` to weak-head normal form: beta, zeta (`Let`), iota
/// (projections, record selectors, and the recursor), delta (`GlobalDef` /
/// `Constant`), first folding the fixed natural-number simpset
/// (`succ`/`add`/`mul` over already-reduced `NatLit`s) at the head whenever
/// it applies, then continuing with plain beta/zeta/iota/delta reduction.
/// This is the WHNF the rest of the engine calls throughout; there is no
/// separate "plain" WHNF exposed since nothing in this crate ever wants
/// reduction without the arithmetic simpset.
///
/// There are no user-supplied simp lemmas here, only a fixed set of
/// arithmetic identities, so folding them in is a plain recursive function
/// rather than a memoized rewrite-rule table: there is nothing left to
/// memoize beyond what hash-consing already gives for free.
pub fn whnf(env: &Env, t: &Term) -> Term {
    let mut cur = t.clone();
    loop {
        let reduced = whnf_core(env, &cur);
        match try_nat_rewrite(env, &reduced) {
            Some(rewritten) if rewritten != reduced => cur = rewritten,
            _ => return reduced,
        }
    }
}

/// Beta/zeta/iota/delta only, no simpset. Exposed for `recursor.rs`'s
/// recursive-call reduction, which only ever needs to expose a `CtorApp`
/// head and would otherwise pay for simpset probes it can't use.
pub fn whnf_core(env: &Env, t: &Term) -> Term {
    let mut cur = t.clone();
    while let Some(next) = whnf_step(env, &cur) {
        cur = next;
    }
    cur
}

fn whnf_step(env: &Env, t: &Term) -> Option<Term> {
    match t.kind() {
        TermKind::App(f, x) => {
            let f_whnf = whnf(env, f);
            match f_whnf.kind() {
                TermKind::Lambda(_, _, body) => Some(instantiate_one(body, x)),
                _ if &f_whnf != f => Some(apply_all(f_whnf, std::iter::once(x.clone()))),
                _ => None,
            }
        }
        TermKind::Let(defs, body) => {
            let vals: Vec<Term> = defs.iter().map(|d| d.val.clone()).collect();
            Some(instantiate_var_list(0, &vals, body))
        }
        TermKind::GlobalDef(id) => env.find_global(id).and_then(|g| g.value.clone()),
        TermKind::Constant(_, defn, _) => Some(defn.clone()),
        TermKind::PairLeft(e) => {
            let ew = whnf(env, e);
            match ew.kind() {
                TermKind::PairValue(a, _) => Some(a.clone()),
                _ if &ew != e => Some(crate::term::mk_pair_left(ew)),
                _ => None,
            }
        }
        TermKind::PairRight(e) => {
            let ew = whnf(env, e);
            match ew.kind() {
                TermKind::PairValue(_, b) => Some(b.clone()),
                _ if &ew != e => Some(crate::term::mk_pair_right(ew)),
                _ => None,
            }
        }
        TermKind::RecordSelector(rec, field) => {
            let rw = whnf(env, rec);
            match find_field(&rw, field) {
                Some(v) => Some(v),
                None if &rw != rec => Some(crate::term::mk_record_selector(rw, field.clone())),
                None => None,
            }
        }
        TermKind::RecursorApp {
            data_id,
            params,
            motive,
            cases,
            indices,
            scrutinee,
        } => {
            let scrut_whnf = whnf(env, scrutinee);
            match try_iota(env, data_id, params, motive, cases, &scrut_whnf) {
                Some(reduced) => Some(reduced),
                None if &scrut_whnf != scrutinee => Some(mk_recursor_app(
                    data_id.clone(),
                    params.to_vec(),
                    motive.clone(),
                    cases.to_vec(),
                    indices.to_vec(),
                    scrut_whnf,
                )),
                None => None,
            }
        }
        _ => None,
    }
}

fn find_field(rec: &Term, field: &Ident) -> Option<Term> {
    match rec.kind() {
        TermKind::FieldValue(name, val, rest) => {
            if name == field {
                Some(val.clone())
            } else {
                find_field(rest, field)
            }
        }
        _ => None,
    }
}

/// One iota step given an already-whnf `scrutinee`: if it is a `CtorApp`,
/// apply the matching case to its arguments interleaved with the induction
/// hypotheses `recursor::ctor_recursive_mask` says are needed. Returns `None`
/// (stuck) for anything else: a `LocalVar`/`ExtCns` scrutinee, or a `CtorApp`
/// whose constructor has no entry in `cases` (shouldn't happen for a
/// well-typed recursor, since `tc.rs` already checked every constructor is
/// covered).
fn try_iota(
    env: &Env,
    data_id: &Ident,
    params: &[Term],
    motive: &Term,
    cases: &[(Ident, Term)],
    scrutinee_whnf: &Term,
) -> Option<Term> {
    let (ctor_id, ctor_params, ctor_args) = match scrutinee_whnf.kind() {
        TermKind::CtorApp(id, p, a) => (id, p, a),
        _ => return None,
    };
    let case_term = cases.iter().find(|(n, _)| n == ctor_id)?.1.clone();
    let ctor_info = env.find_ctor(ctor_id)?;
    let mask = ctor_recursive_mask(data_id, ctor_info, ctor_params);
    let mut full_args = Vec::with_capacity(ctor_args.len() * 2);
    for (arg, is_rec) in ctor_args.iter().zip(mask.iter()) {
        full_args.push(arg.clone());
        if *is_rec {
            full_args.push(compute_ih(env, data_id, params, motive, cases, arg));
        }
    }
    Some(apply_all(case_term, full_args))
}

/// The induction-hypothesis value for a recursive constructor argument:
/// iota-reduce the recursive call on `arg` as far as it goes. The indices of
/// the inner recursor application are cosmetic once reduction is under way
/// (iota only ever inspects the scrutinee's head), so a stuck result is
/// rebuilt with an empty index list rather than re-deriving the real ones.
fn compute_ih(
    env: &Env,
    data_id: &Ident,
    params: &[Term],
    motive: &Term,
    cases: &[(Ident, Term)],
    arg: &Term,
) -> Term {
    let arg_whnf = whnf(env, arg);
    match try_iota(env, data_id, params, motive, cases, &arg_whnf) {
        Some(reduced) => reduced,
        None => mk_recursor_app(
            data_id.clone(),
            params.to_vec(),
            motive.clone(),
            cases.to_vec(),
            vec![],
            arg_whnf,
        ),
    }
}

/// `succ n`, `add n m`, `mul n m` over `NatLit`s fold to a single `NatLit`.
/// Operands are whnf'd first so e.g. `add (succ zero) one` is recognized.
fn try_nat_rewrite(env: &Env, t: &Term) -> Option<Term> {
    if let TermKind::App(f, x) = t.kind() {
        if let TermKind::GlobalDef(id) = f.kind() {
            if *id == *SUCC {
                if let TermKind::NatLit(n) = whnf(env, x).kind() {
                    return Some(mk_nat_lit(n + 1));
                }
            }
            return None;
        }
        if let TermKind::App(f2, n) = f.kind() {
            if let TermKind::GlobalDef(id) = f2.kind() {
                if *id == *ADD || *id == *MUL {
                    let nw = whnf(env, n);
                    let mw = whnf(env, x);
                    if let (TermKind::NatLit(a), TermKind::NatLit(b)) = (nw.kind(), mw.kind()) {
                        let result = if *id == *ADD { a + b } else { a * b };
                        return Some(mk_nat_lit(result));
                    }
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod reduction_tests {
    use super::*;
    use crate::env::{Env, ADD, MUL, SUCC};
    use crate::name::Ident;
    use crate::sort::PROP;
    use crate::term::{mk_app, mk_global, mk_lambda, mk_local_var, mk_nat_lit, mk_sort};

    #[test]
    fn beta_reduces_application() {
        let env = Env::new();
        let lam = mk_lambda(Ident::local("x"), mk_sort(PROP), mk_local_var(0));
        let applied = mk_app(lam, mk_nat_lit(7));
        assert_eq!(whnf(&env, &applied), mk_nat_lit(7));
    }

    #[test]
    fn succ_folds_nat_literal() {
        let env = Env::new();
        let t = mk_app(mk_global(SUCC.clone()), mk_nat_lit(4));
        assert_eq!(whnf(&env, &t), mk_nat_lit(5));
    }

    #[test]
    fn add_and_mul_fold_nat_literals() {
        let env = Env::new();
        let add_t = mk_app(mk_app(mk_global(ADD.clone()), mk_nat_lit(2)), mk_nat_lit(3));
        assert_eq!(whnf(&env, &add_t), mk_nat_lit(5));
        let mul_t = mk_app(mk_app(mk_global(MUL.clone()), mk_nat_lit(2)), mk_nat_lit(3));
        assert_eq!(whnf(&env, &mul_t), mk_nat_lit(6));
    }

    #[test]
    fn nested_arithmetic_normalizes_under_simpset() {
        let env = Env::new();
        // add (succ zero) (mul two three) = add 1 6 = 7
        let one = mk_app(mk_global(SUCC.clone()), mk_nat_lit(0));
        let six = mk_app(mk_app(mk_global(MUL.clone()), mk_nat_lit(2)), mk_nat_lit(3));
        let t = mk_app(mk_app(mk_global(ADD.clone()), one), six);
        assert_eq!(whnf(&env, &t), mk_nat_lit(7));
    }

    #[test]
    fn global_def_without_value_is_stuck() {
        let env = Env::new();
        let t = mk_global(crate::env::NAT.clone());
        assert_eq!(whnf(&env, &t), t);
    }

    #[test]
    fn pair_left_projects_through_pair_value() {
        let env = Env::new();
        let pair = crate::term::mk_pair_value(mk_nat_lit(1), mk_nat_lit(2));
        let proj = crate::term::mk_pair_left(pair);
        assert_eq!(whnf(&env, &proj), mk_nat_lit(1));
    }

    #[test]
    fn record_selector_finds_named_field() {
        let env = Env::new();
        let rec = crate::term::mk_field_value(
            Ident::local("a"),
            mk_nat_lit(1),
            crate::term::mk_field_value(Ident::local("b"), mk_nat_lit(2), crate::term::mk_empty_record_value()),
        );
        let sel = crate::term::mk_record_selector(rec, Ident::local("b"));
        assert_eq!(whnf(&env, &sel), mk_nat_lit(2));
    }
}
