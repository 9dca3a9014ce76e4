use crate::env::{CtorInfo, DataTypeInfo, Env};
use crate::errors::unknown_ctor_in_recursor;
use crate::name::Ident;
use crate::sort::Sort;
use crate::subst::{inc_vars, instantiate_one, instantiate_vars};
use crate::term::{apply_all, mk_ctor_app, mk_datatype_app, mk_local_var, mk_pi, mk_sort, Term, TermKind};

/// Recursor schema construction: the motive's required type, each
/// constructor's required case (minor premise) type with induction
/// hypotheses threaded in, the recursive-argument mask iota-reduction
/// consults, and the large-elimination restriction.
///
/// Constructor telescopes are positional de Bruijn binders, so inserting an
/// induction-hypothesis binder after a recursive argument means recomputing
/// every later reference's index rather than simply renaming a bound local.
///
/// A datatype is "small enough" to eliminate into `Prop` exactly when it is
/// empty or has a single constructor (a subsingleton). Predicative targets
/// (`s_ret != propSort`) are always allowed and never consult this.
pub fn allowed_elim_sort(dt: &DataTypeInfo, s_ret: Sort) -> bool {
    if !s_ret.is_prop() {
        true
    } else {
        dt.ctors.len() <= 1
    }
}

/// Peel `args.len()` leading `Pi`s off `ty`, instantiating each domain with
/// the corresponding entry of `args` in turn (so later domains that depend
/// on earlier ones see the right value). Stops early (returning whatever is
/// left) if `ty` runs out of `Pi`s first; callers that rely on an exact
/// arity have already checked it via `BadParamsOrArgsLength`.
fn peel_pis(mut ty: Term, args: &[Term]) -> Term {
    for a in args {
        match ty.kind() {
            TermKind::Pi(_, _, body) => ty = instantiate_one(body, a),
            _ => break,
        }
    }
    ty
}

/// `recursorRetTypeType(dt, params, s_ret)`: the schematic motive type
/// `∀indices. ∀x:(DataTypeApp d params indices). Sort(s_ret)`, built by
/// peeling `dt.ty`'s parameter `Pi`s with the caller's concrete `params`
/// and replacing the remaining index telescope's terminal `Sort` with a
/// fresh major-premise `Pi`. No reindexing is needed here (unlike
/// `recursor_elim_types`): the major premise is appended at the very end of
/// the index telescope, so every existing binder keeps its original index.
pub fn recursor_ret_type_type(dt: &DataTypeInfo, params: &[Term], s_ret: Sort) -> Term {
    let index_telescope = peel_pis(dt.ty.clone(), &params[..dt.num_params.min(params.len())]);
    build_major_premise(&index_telescope, dt.num_indices, 0, &dt.name, params, s_ret)
}

fn build_major_premise(
    telescope: &Term,
    remaining: usize,
    depth: usize,
    data_name: &Ident,
    params: &[Term],
    s_ret: Sort,
) -> Term {
    if remaining == 0 {
        let shifted_params: Vec<Term> = params.iter().map(|p| inc_vars(0, depth, p)).collect();
        let index_vars: Vec<Term> = (0..depth).rev().map(mk_local_var).collect();
        let major_ty = mk_datatype_app(data_name.clone(), shifted_params, index_vars);
        return mk_pi(Ident::local("x"), major_ty, mk_sort(s_ret));
    }
    match telescope.kind() {
        TermKind::Pi(name, domain, body) => mk_pi(
            name.clone(),
            domain.clone(),
            build_major_premise(body, remaining - 1, depth + 1, data_name, params, s_ret),
        ),
        // `dt.ty` is assumed well-formed (checked when the datatype was
        // registered), so it always has exactly `num_indices` more `Pi`s
        // here; falling off the chain early is an environment invariant
        // violation, not a user-facing error.
        _ => panic!("datatype {} declares fewer index binders than num_indices", data_name),
    }
}

/// Renumber the free de Bruijn references in `t` (which is expressed as if
/// only the first `src_scope` constructor-argument binders existed, with no
/// induction-hypothesis binders interleaved) into the frame that has
/// `dst_depth` binders in scope at the point `t` will be written, given
/// `final_pos[k]` = the final position (0 = outermost) of original argument
/// `k` once induction hypotheses are interleaved.
fn reindex(t: &Term, src_scope: usize, dst_depth: usize, final_pos: &[usize]) -> Term {
    instantiate_vars(
        &|level, idx| {
            let m = idx - level;
            let k = src_scope - 1 - m;
            let new_m = dst_depth - 1 - final_pos[k];
            mk_local_var(new_m + level)
        },
        0,
        t,
    )
}

/// `recursorElimTypes(d, params, motive)`: the required minor-premise
/// (case) type for every constructor of `d`, in declaration order.
///
/// For each constructor `c` with arguments `a_0..a_{n-1}` (params already
/// substituted), the required type is
/// `∀a_0, [ih_0], a_1, [ih_1], ..., a_{n-1}, [ih_{n-1}], motive indices (c params a_0..a_{n-1})`
/// where `ih_i` (present only when `a_i : DataTypeApp(d, params, _)`, i.e.
/// `a_i` is a direct recursive occurrence) has type `motive indices_i a_i`.
/// Only direct recursive occurrences get an induction hypothesis; datatypes
/// are assumed already checked for positivity and termination upstream, so
/// higher-order or nested recursive arguments are not threaded through here.
pub fn recursor_elim_types(env: &Env, dt: &DataTypeInfo, params: &[Term], motive: &Term) -> Vec<(Ident, Term)> {
    dt.ctors
        .iter()
        .map(|ctor_name| {
            let ctor = env
                .find_ctor(ctor_name)
                .unwrap_or_else(|| unknown_ctor_in_recursor(ctor_name));
            (ctor_name.clone(), required_case_type(dt, ctor, params, motive))
        })
        .collect()
}

fn required_case_type(dt: &DataTypeInfo, ctor: &CtorInfo, params: &[Term], motive: &Term) -> Term {
    let n = ctor.num_args;
    let arg_telescope = peel_pis(ctor.ty.clone(), &params[..ctor.num_params.min(params.len())]);

    // Walk the argument telescope once, collecting each domain (in its own
    // original j-binder frame) and whether it is a direct recursive
    // occurrence of `dt`.
    let mut domains: Vec<(Ident, Term, bool)> = Vec::with_capacity(n);
    let mut telescope = arg_telescope;
    for _ in 0..n {
        match telescope.kind() {
            TermKind::Pi(name, domain, body) => {
                let is_rec = matches!(domain.kind(), TermKind::DataTypeApp(id, ..) if *id == dt.name);
                domains.push((name.clone(), domain.clone(), is_rec));
                telescope = body.clone();
            }
            _ => panic!(
                "constructor {} declares fewer argument binders than num_args",
                ctor.name
            ),
        }
    }
    // `telescope` is now the tail `DataTypeApp(d, params, indices)`.
    let tail_indices: Vec<Term> = match telescope.kind() {
        TermKind::DataTypeApp(_, _, indices) => indices.to_vec(),
        _ => panic!("constructor {} type does not end in its datatype", ctor.name),
    };

    // `final_pos[j]` = number of slots (arguments + induction hypotheses)
    // preceding argument `j` in the final case type.
    let mut final_pos = vec![0usize; n];
    let mut slot = 0usize;
    for j in 0..n {
        final_pos[j] = slot;
        slot += 1;
        if domains[j].2 {
            slot += 1;
        }
    }
    let total_slots = slot;

    let conclusion = {
        let indices_final: Vec<Term> = tail_indices
            .iter()
            .map(|ix| reindex(ix, n, total_slots, &final_pos))
            .collect();
        let ctor_params_final: Vec<Term> = params.iter().map(|p| inc_vars(0, total_slots, p)).collect();
        let ctor_args_final: Vec<Term> = (0..n)
            .map(|k| mk_local_var(total_slots - 1 - final_pos[k]))
            .collect();
        let ctor_app = mk_ctor_app(ctor.name.clone(), ctor_params_final, ctor_args_final);
        let motive_shifted = inc_vars(0, total_slots, motive);
        apply_all(motive_shifted, indices_final.into_iter().chain(std::iter::once(ctor_app)))
    };

    let mut acc = conclusion;
    for j in (0..n).rev() {
        let (name, domain, is_rec) = &domains[j];
        let p_j = final_pos[j];
        if *is_rec {
            let rec_indices = match domain.kind() {
                TermKind::DataTypeApp(_, _, indices) => indices.clone(),
                _ => unreachable!(),
            };
            let ih_scope = p_j + 1;
            let indices_for_ih: Vec<Term> = rec_indices
                .iter()
                .map(|ix| reindex(ix, j, ih_scope, &final_pos))
                .collect();
            let motive_shifted = inc_vars(0, ih_scope, motive);
            let ih_ty = apply_all(
                motive_shifted,
                indices_for_ih.into_iter().chain(std::iter::once(mk_local_var(0))),
            );
            acc = mk_pi(Ident::local("ih"), ih_ty, acc);
        }
        let domain_final = reindex(domain, j, p_j, &final_pos);
        acc = mk_pi(name.clone(), domain_final, acc);
    }
    acc
}

/// For the constructor applied with these concrete `ctor_params`, which of
/// its argument positions are direct recursive occurrences of `data_id`?
/// Consulted by `reduction.rs`'s iota step to know which case arguments need
/// an induction-hypothesis value interleaved.
pub fn ctor_recursive_mask(data_id: &Ident, ctor_info: &CtorInfo, ctor_params: &[Term]) -> Vec<bool> {
    let mut telescope = peel_pis(ctor_info.ty.clone(), &ctor_params[..ctor_info.num_params.min(ctor_params.len())]);
    let mut mask = Vec::with_capacity(ctor_info.num_args);
    for _ in 0..ctor_info.num_args {
        match telescope.kind() {
            TermKind::Pi(_, domain, body) => {
                mask.push(matches!(domain.kind(), TermKind::DataTypeApp(id, ..) if id == data_id));
                telescope = body.clone();
            }
            _ => break,
        }
    }
    mask
}

#[cfg(test)]
mod recursor_tests {
    use super::*;
    use crate::env::{DataTypeInfo, Env};
    use crate::sort::PROP;
    use crate::term::{mk_pi, mk_sort};

    fn nat_like_env() -> (Env, Ident, Ident, Ident) {
        let mut env = Env::new();
        let data_name = Ident::new("nat2", "Nat2");
        let zero_name = Ident::new("nat2", "zero");
        let succ_name = Ident::new("nat2", "succ");

        let dt_ty = mk_sort(PROP.succ());
        env.insert_datatype(DataTypeInfo {
            name: data_name.clone(),
            ty: dt_ty,
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
        let succ_ty = mk_pi(Ident::local("n"), self_ty.clone(), self_ty.clone());
        env.insert_ctor(CtorInfo {
            name: succ_name.clone(),
            ty: succ_ty,
            num_params: 0,
            num_args: 1,
            data_type: data_name.clone(),
        });

        (env, data_name, zero_name, succ_name)
    }

    #[test]
    fn allowed_elim_sort_rejects_multi_ctor_into_prop() {
        let (env, data_name, ..) = nat_like_env();
        let dt = env.find_datatype(&data_name).unwrap();
        assert!(!allowed_elim_sort(dt, PROP));
        assert!(allowed_elim_sort(dt, PROP.succ()));
    }

    #[test]
    fn single_ctor_datatype_allows_prop_elim() {
        let mut env = Env::new();
        let data_name = Ident::new("unit2", "Unit2");
        let star_name = Ident::new("unit2", "star");
        env.insert_datatype(DataTypeInfo {
            name: data_name.clone(),
            ty: mk_sort(PROP.succ()),
            num_params: 0,
            num_indices: 0,
            ctors: vec![star_name],
            is_primitive: false,
        });
        let dt = env.find_datatype(&data_name).unwrap();
        assert!(allowed_elim_sort(dt, PROP));
    }

    #[test]
    fn succ_case_type_has_one_ih() {
        let (env, data_name, zero_name, succ_name) = nat_like_env();
        let dt = env.find_datatype(&data_name).unwrap();
        let motive = mk_pi(
            Ident::local("_"),
            mk_datatype_app(data_name.clone(), vec![], vec![]),
            mk_sort(PROP),
        );
        let required = recursor_elim_types(&env, dt, &[], &motive);
        assert_eq!(required.len(), 2);
        let (name0, _) = &required[0];
        assert_eq!(*name0, zero_name);
        let (name1, succ_case_ty) = &required[1];
        assert_eq!(*name1, succ_name);
        // succ case: Pi(n, Nat2, Pi(ih, motive n, motive (succ n))), two
        // nested Pi's before the conclusion.
        match succ_case_ty.kind() {
            TermKind::Pi(_, _, body) => match body.kind() {
                TermKind::Pi(..) => {}
                other => panic!("expected nested ih Pi, got {:?}", other),
            },
            other => panic!("expected outer arg Pi, got {:?}", other),
        }
    }

    #[test]
    fn ctor_recursive_mask_flags_self_referential_arg() {
        let (env, data_name, _zero, succ_name) = nat_like_env();
        let ctor = env.find_ctor(&succ_name).unwrap();
        let mask = ctor_recursive_mask(&data_name, ctor, &[]);
        assert_eq!(mask, vec![true]);
    }
}
