use hashbrown::HashMap;

use crate::term::{
    mk_app, mk_array_value, mk_ctor_app, mk_datatype_app, mk_ext_cns, mk_field_type,
    mk_field_value, mk_lambda, mk_let, mk_local_var, mk_pair_left, mk_pair_right, mk_pair_type,
    mk_pair_value, mk_pi, mk_record_selector, mk_recursor_app, LetDef, Term, TermKind,
};

/// Shift every free `LocalVar(i)` with `i >= cutoff` up by `delta`. No-op when
/// `delta == 0`. `Constant` nodes are returned unchanged (assumed closed).
///
/// This and `instantiate_vars`/`instantiate_var_list` below all consult the
/// subject term's cached free-variable bitset before recursing; a subtree
/// with no index in the affected range is returned unchanged without
/// reallocation.
pub fn inc_vars(cutoff: usize, delta: usize, t: &Term) -> Term {
    if delta == 0 {
        return t.clone();
    }
    inc_vars_core(cutoff, delta, t)
}

fn inc_vars_core(cutoff: usize, delta: usize, t: &Term) -> Term {
    if !t.free_vars().has_index_at_least(cutoff) {
        return t.clone();
    }
    match t.kind() {
        TermKind::LocalVar(i) => {
            if *i >= cutoff {
                mk_local_var(i + delta)
            } else {
                t.clone()
            }
        }
        TermKind::Lambda(n, ty, body) => mk_lambda(
            n.clone(),
            inc_vars_core(cutoff, delta, ty),
            inc_vars_core(cutoff + 1, delta, body),
        ),
        TermKind::Pi(n, ty, body) => mk_pi(
            n.clone(),
            inc_vars_core(cutoff, delta, ty),
            inc_vars_core(cutoff + 1, delta, body),
        ),
        TermKind::Let(defs, body) => {
            let n = defs.len();
            let new_defs = defs
                .iter()
                .map(|d| LetDef {
                    name: d.name.clone(),
                    ty: inc_vars_core(cutoff, delta, &d.ty),
                    val: inc_vars_core(cutoff + n, delta, &d.val),
                })
                .collect();
            mk_let(new_defs, inc_vars_core(cutoff + n, delta, body))
        }
        TermKind::App(f, x) => mk_app(inc_vars_core(cutoff, delta, f), inc_vars_core(cutoff, delta, x)),
        TermKind::Constant(..) => t.clone(),
        TermKind::GlobalDef(_)
        | TermKind::Sort(_)
        | TermKind::NatLit(_)
        | TermKind::StringLit(_)
        | TermKind::UnitType
        | TermKind::UnitValue
        | TermKind::EmptyRecordType
        | TermKind::EmptyRecordValue => t.clone(),
        TermKind::ArrayValue(elem_ty, vals) => mk_array_value(
            inc_vars_core(cutoff, delta, elem_ty),
            vals.iter().map(|v| inc_vars_core(cutoff, delta, v)).collect(),
        ),
        TermKind::ExtCns(ix, name, ty) => mk_ext_cns(*ix, name.clone(), inc_vars_core(cutoff, delta, ty)),
        TermKind::PairType(a, b) => mk_pair_type(inc_vars_core(cutoff, delta, a), inc_vars_core(cutoff, delta, b)),
        TermKind::PairValue(a, b) => {
            mk_pair_value(inc_vars_core(cutoff, delta, a), inc_vars_core(cutoff, delta, b))
        }
        TermKind::PairLeft(e) => mk_pair_left(inc_vars_core(cutoff, delta, e)),
        TermKind::PairRight(e) => mk_pair_right(inc_vars_core(cutoff, delta, e)),
        TermKind::FieldType(n, ty, rest) => mk_field_type(
            n.clone(),
            inc_vars_core(cutoff, delta, ty),
            inc_vars_core(cutoff, delta, rest),
        ),
        TermKind::FieldValue(n, v, rest) => mk_field_value(
            n.clone(),
            inc_vars_core(cutoff, delta, v),
            inc_vars_core(cutoff, delta, rest),
        ),
        TermKind::RecordSelector(r, n) => mk_record_selector(inc_vars_core(cutoff, delta, r), n.clone()),
        TermKind::CtorApp(id, params, args) => mk_ctor_app(
            id.clone(),
            params.iter().map(|p| inc_vars_core(cutoff, delta, p)).collect(),
            args.iter().map(|a| inc_vars_core(cutoff, delta, a)).collect(),
        ),
        TermKind::DataTypeApp(id, params, indices) => mk_datatype_app(
            id.clone(),
            params.iter().map(|p| inc_vars_core(cutoff, delta, p)).collect(),
            indices.iter().map(|i| inc_vars_core(cutoff, delta, i)).collect(),
        ),
        TermKind::RecursorApp {
            data_id,
            params,
            motive,
            cases,
            indices,
            scrutinee,
        } => mk_recursor_app(
            data_id.clone(),
            params.iter().map(|p| inc_vars_core(cutoff, delta, p)).collect(),
            inc_vars_core(cutoff, delta, motive),
            cases
                .iter()
                .map(|(n, c)| (n.clone(), inc_vars_core(cutoff, delta, c)))
                .collect(),
            indices.iter().map(|i| inc_vars_core(cutoff, delta, i)).collect(),
            inc_vars_core(cutoff, delta, scrutinee),
        ),
    }
}

/// Substitute each dangling `LocalVar(j)` (`j >= level`) by `f(level', j)`,
/// where `level'` is the number of binders surrounding the occurrence.
/// `Constant` is left unchanged.
pub fn instantiate_vars(f: &impl Fn(usize, usize) -> Term, level: usize, t: &Term) -> Term {
    if !t.free_vars().has_index_at_least(level) {
        return t.clone();
    }
    match t.kind() {
        TermKind::LocalVar(j) => {
            if *j >= level {
                f(level, *j)
            } else {
                t.clone()
            }
        }
        TermKind::Lambda(n, ty, body) => mk_lambda(
            n.clone(),
            instantiate_vars(f, level, ty),
            instantiate_vars(f, level + 1, body),
        ),
        TermKind::Pi(n, ty, body) => mk_pi(
            n.clone(),
            instantiate_vars(f, level, ty),
            instantiate_vars(f, level + 1, body),
        ),
        TermKind::Let(defs, body) => {
            let n = defs.len();
            let new_defs = defs
                .iter()
                .map(|d| LetDef {
                    name: d.name.clone(),
                    ty: instantiate_vars(f, level, &d.ty),
                    val: instantiate_vars(f, level + n, &d.val),
                })
                .collect();
            mk_let(new_defs, instantiate_vars(f, level + n, body))
        }
        TermKind::App(g, x) => mk_app(instantiate_vars(f, level, g), instantiate_vars(f, level, x)),
        TermKind::Constant(..) => t.clone(),
        TermKind::GlobalDef(_)
        | TermKind::Sort(_)
        | TermKind::NatLit(_)
        | TermKind::StringLit(_)
        | TermKind::UnitType
        | TermKind::UnitValue
        | TermKind::EmptyRecordType
        | TermKind::EmptyRecordValue => t.clone(),
        TermKind::ArrayValue(elem_ty, vals) => mk_array_value(
            instantiate_vars(f, level, elem_ty),
            vals.iter().map(|v| instantiate_vars(f, level, v)).collect(),
        ),
        TermKind::ExtCns(ix, name, ty) => mk_ext_cns(*ix, name.clone(), instantiate_vars(f, level, ty)),
        TermKind::PairType(a, b) => mk_pair_type(instantiate_vars(f, level, a), instantiate_vars(f, level, b)),
        TermKind::PairValue(a, b) => mk_pair_value(instantiate_vars(f, level, a), instantiate_vars(f, level, b)),
        TermKind::PairLeft(e) => mk_pair_left(instantiate_vars(f, level, e)),
        TermKind::PairRight(e) => mk_pair_right(instantiate_vars(f, level, e)),
        TermKind::FieldType(n, ty, rest) => mk_field_type(
            n.clone(),
            instantiate_vars(f, level, ty),
            instantiate_vars(f, level, rest),
        ),
        TermKind::FieldValue(n, v, rest) => mk_field_value(
            n.clone(),
            instantiate_vars(f, level, v),
            instantiate_vars(f, level, rest),
        ),
        TermKind::RecordSelector(r, n) => mk_record_selector(instantiate_vars(f, level, r), n.clone()),
        TermKind::CtorApp(id, params, args) => mk_ctor_app(
            id.clone(),
            params.iter().map(|p| instantiate_vars(f, level, p)).collect(),
            args.iter().map(|a| instantiate_vars(f, level, a)).collect(),
        ),
        TermKind::DataTypeApp(id, params, indices) => mk_datatype_app(
            id.clone(),
            params.iter().map(|p| instantiate_vars(f, level, p)).collect(),
            indices.iter().map(|i| instantiate_vars(f, level, i)).collect(),
        ),
        TermKind::RecursorApp {
            data_id,
            params,
            motive,
            cases,
            indices,
            scrutinee,
        } => mk_recursor_app(
            data_id.clone(),
            params.iter().map(|p| instantiate_vars(f, level, p)).collect(),
            instantiate_vars(f, level, motive),
            cases
                .iter()
                .map(|(n, c)| (n.clone(), instantiate_vars(f, level, c)))
                .collect(),
            indices.iter().map(|i| instantiate_vars(f, level, i)).collect(),
            instantiate_vars(f, level, scrutinee),
        ),
    }
}

/// `instantiateVarList(k, ts, t)`: substitute `ts[0..n-1]` for
/// `LocalVar(k..k+n-1)` and shift every higher free variable down by `n`.
///
/// Law: `instantiate_var_list(0, [x, y, z], t)` is the beta-normal form of
/// `(lam. lam. lam. t) z y x`.
pub fn instantiate_var_list(k: usize, ts: &[Term], t: &Term) -> Term {
    if ts.is_empty() {
        return t.clone();
    }
    let mut shifted: HashMap<(usize, usize), Term> = HashMap::new();
    instantiate_var_list_core(k, 0, ts, &mut shifted, t)
}

/// `off` is the number of binders traversed since entering the call; the
/// variables currently being substituted sit at `k + off .. k + off + n`.
fn instantiate_var_list_core(
    k: usize,
    off: usize,
    ts: &[Term],
    shifted: &mut HashMap<(usize, usize), Term>,
    t: &Term,
) -> Term {
    let n = ts.len();
    if !t.free_vars().has_index_at_least(k + off) {
        return t.clone();
    }
    match t.kind() {
        TermKind::LocalVar(i) => {
            let i = *i;
            if i < k + off {
                t.clone()
            } else if i < k + off + n {
                let j = i - (k + off);
                shifted
                    .entry((j, off))
                    .or_insert_with(|| inc_vars(0, off, &ts[j]))
                    .clone()
            } else {
                mk_local_var(i - n)
            }
        }
        TermKind::Lambda(name, ty, body) => mk_lambda(
            name.clone(),
            instantiate_var_list_core(k, off, ts, shifted, ty),
            instantiate_var_list_core(k, off + 1, ts, shifted, body),
        ),
        TermKind::Pi(name, ty, body) => mk_pi(
            name.clone(),
            instantiate_var_list_core(k, off, ts, shifted, ty),
            instantiate_var_list_core(k, off + 1, ts, shifted, body),
        ),
        TermKind::Let(defs, body) => {
            let m = defs.len();
            let new_defs = defs
                .iter()
                .map(|d| LetDef {
                    name: d.name.clone(),
                    ty: instantiate_var_list_core(k, off, ts, shifted, &d.ty),
                    val: instantiate_var_list_core(k, off + m, ts, shifted, &d.val),
                })
                .collect();
            mk_let(new_defs, instantiate_var_list_core(k, off + m, ts, shifted, body))
        }
        TermKind::App(f, x) => mk_app(
            instantiate_var_list_core(k, off, ts, shifted, f),
            instantiate_var_list_core(k, off, ts, shifted, x),
        ),
        TermKind::Constant(..) => t.clone(),
        TermKind::GlobalDef(_)
        | TermKind::Sort(_)
        | TermKind::NatLit(_)
        | TermKind::StringLit(_)
        | TermKind::UnitType
        | TermKind::UnitValue
        | TermKind::EmptyRecordType
        | TermKind::EmptyRecordValue => t.clone(),
        TermKind::ArrayValue(elem_ty, vals) => mk_array_value(
            instantiate_var_list_core(k, off, ts, shifted, elem_ty),
            vals.iter()
                .map(|v| instantiate_var_list_core(k, off, ts, shifted, v))
                .collect(),
        ),
        TermKind::ExtCns(ix, name, ty) => {
            mk_ext_cns(*ix, name.clone(), instantiate_var_list_core(k, off, ts, shifted, ty))
        }
        TermKind::PairType(a, b) => mk_pair_type(
            instantiate_var_list_core(k, off, ts, shifted, a),
            instantiate_var_list_core(k, off, ts, shifted, b),
        ),
        TermKind::PairValue(a, b) => mk_pair_value(
            instantiate_var_list_core(k, off, ts, shifted, a),
            instantiate_var_list_core(k, off, ts, shifted, b),
        ),
        TermKind::PairLeft(e) => mk_pair_left(instantiate_var_list_core(k, off, ts, shifted, e)),
        TermKind::PairRight(e) => mk_pair_right(instantiate_var_list_core(k, off, ts, shifted, e)),
        TermKind::FieldType(name, ty, rest) => mk_field_type(
            name.clone(),
            instantiate_var_list_core(k, off, ts, shifted, ty),
            instantiate_var_list_core(k, off, ts, shifted, rest),
        ),
        TermKind::FieldValue(name, v, rest) => mk_field_value(
            name.clone(),
            instantiate_var_list_core(k, off, ts, shifted, v),
            instantiate_var_list_core(k, off, ts, shifted, rest),
        ),
        TermKind::RecordSelector(r, name) => {
            mk_record_selector(instantiate_var_list_core(k, off, ts, shifted, r), name.clone())
        }
        TermKind::CtorApp(id, params, args) => mk_ctor_app(
            id.clone(),
            params
                .iter()
                .map(|p| instantiate_var_list_core(k, off, ts, shifted, p))
                .collect(),
            args.iter()
                .map(|a| instantiate_var_list_core(k, off, ts, shifted, a))
                .collect(),
        ),
        TermKind::DataTypeApp(id, params, indices) => mk_datatype_app(
            id.clone(),
            params
                .iter()
                .map(|p| instantiate_var_list_core(k, off, ts, shifted, p))
                .collect(),
            indices
                .iter()
                .map(|i| instantiate_var_list_core(k, off, ts, shifted, i))
                .collect(),
        ),
        TermKind::RecursorApp {
            data_id,
            params,
            motive,
            cases,
            indices,
            scrutinee,
        } => mk_recursor_app(
            data_id.clone(),
            params
                .iter()
                .map(|p| instantiate_var_list_core(k, off, ts, shifted, p))
                .collect(),
            instantiate_var_list_core(k, off, ts, shifted, motive),
            cases
                .iter()
                .map(|(name, c)| (name.clone(), instantiate_var_list_core(k, off, ts, shifted, c)))
                .collect(),
            indices
                .iter()
                .map(|i| instantiate_var_list_core(k, off, ts, shifted, i))
                .collect(),
            instantiate_var_list_core(k, off, ts, shifted, scrutinee),
        ),
    }
}

/// Convenience for the one-argument case used throughout `tc.rs`'s inference
/// rules (`App`, `applyPiTyped`, recursor iota-reduction).
pub fn instantiate_one(t: &Term, arg: &Term) -> Term {
    instantiate_var_list(0, std::slice::from_ref(arg), t)
}

#[cfg(test)]
mod subst_tests {
    use super::*;
    use crate::name::Ident;
    use crate::sort::Sort;
    use crate::term::{mk_app, mk_lambda, mk_local_var, mk_sort};

    #[test]
    fn inc_vars_zero_delta_is_identity() {
        let t = mk_app(mk_local_var(0), mk_local_var(1));
        assert_eq!(inc_vars(0, 0, &t), t);
    }

    #[test]
    fn inc_vars_composes() {
        let t = mk_app(mk_local_var(0), mk_local_var(3));
        let once = inc_vars(1, 5, &t);
        let composed = inc_vars(1, 2, &inc_vars(1, 3, &t));
        assert_eq!(once, composed);
    }

    #[test]
    fn inc_vars_respects_binder_cutoff() {
        let body = mk_local_var(0); // bound by the lambda
        let lam = mk_lambda(Ident::local("x"), mk_sort(Sort(0)), body);
        // shifting free vars at cutoff 0 must not touch the bound occurrence
        let shifted = inc_vars(0, 7, &lam);
        assert_eq!(shifted, lam);
    }

    #[test]
    fn instantiate_var_list_beta_law() {
        // instantiate_var_list(0, [z, y, x], t) == (lam lam lam t) x y z whnf'd by hand:
        // substituting LocalVar(0)->z, LocalVar(1)->y, LocalVar(2)->x.
        let t = mk_app(mk_local_var(0), mk_local_var(2));
        let x = mk_nat_lit_helper(10);
        let y = mk_nat_lit_helper(20);
        let z = mk_nat_lit_helper(30);
        let result = instantiate_var_list(0, &[z.clone(), y, x.clone()], &t);
        assert_eq!(result, mk_app(z, x));
    }

    fn mk_nat_lit_helper(n: u64) -> Term {
        crate::term::mk_nat_lit(n)
    }

    #[test]
    fn instantiate_var_list_shifts_dangling_vars_down() {
        let t = mk_local_var(5);
        let result = instantiate_var_list(0, &[mk_nat_lit_helper(1), mk_nat_lit_helper(2)], &t);
        assert_eq!(result, mk_local_var(3));
    }
}
