use std::sync::Arc;

use dtlc_core::env::{CtorInfo, DataTypeInfo};
use dtlc_core::name::Ident;
use dtlc_core::sort::{Sort, PROP};
use dtlc_core::subst::inc_vars;
use dtlc_core::term::{
    apply_all, mk_array_value, mk_ctor_app, mk_datatype_app, mk_global, mk_lambda, mk_local_var,
    mk_nat_lit, mk_pi, mk_recursor_app, mk_sort, mk_string_lit,
};
use dtlc_core::{sc_convertible, sc_type_check, Env, TCError, TermKind};
use parking_lot::RwLock;

fn fresh_env() -> Arc<RwLock<Env>> {
    Arc::new(RwLock::new(Env::new()))
}

// A two-constructor Peano-style datatype, built directly against the
// `Env` builder API the way an upstream elaborator would populate it.
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

// --- Universal properties -----------------------------------------------

#[test]
fn sharing_equality_implies_convertibility() {
    let env = fresh_env();
    let a = mk_lambda(Ident::local("x"), mk_sort(PROP), mk_local_var(0));
    let b = mk_lambda(Ident::local("y"), mk_sort(PROP), mk_local_var(0));
    assert_eq!(a, b);
    assert!(sc_convertible(&env, &a, &b));
}

#[test]
fn inc_vars_zero_delta_is_identity() {
    let t = apply_all(mk_local_var(3), vec![mk_local_var(1), mk_nat_lit(7)]);
    assert_eq!(inc_vars(0, 0, &t), t);
}

#[test]
fn inc_vars_composes_additively() {
    let t = apply_all(mk_local_var(0), vec![mk_local_var(4)]);
    let composed = inc_vars(1, 2, &inc_vars(1, 3, &t));
    let direct = inc_vars(1, 5, &t);
    assert_eq!(composed, direct);
}

#[test]
fn well_formedness_of_results_type_of_type_is_a_sort() {
    let env = fresh_env();
    let lam = mk_lambda(Ident::local("x"), mk_sort(PROP), mk_local_var(0));
    let ty = sc_type_check(env.clone(), None, &lam).expect("lambda should type-check");
    // `ty` must itself be in WHNF (a Pi whose codomain is a Sort already)
    // and type-check to a Sort.
    assert!(matches!(ty.kind(), TermKind::Pi(..)));
    let ty_of_ty = sc_type_check(env, None, &ty).expect("the inferred type must itself type-check");
    assert!(matches!(ty_of_ty.kind(), TermKind::Sort(_)));
}

#[test]
fn subtyping_is_reflexive_and_transitive_via_pi_variance() {
    use dtlc_core::check_subtype;
    let env = fresh_env();
    let a = mk_sort(Sort(1));
    let guard = env.read();
    assert!(check_subtype(&*guard, &a, &a));

    let lo = mk_sort(Sort(0));
    let mid = mk_sort(Sort(1));
    let hi = mk_sort(Sort(2));
    assert!(check_subtype(&*guard, &lo, &mid));
    assert!(check_subtype(&*guard, &mid, &hi));
    assert!(check_subtype(&*guard, &lo, &hi));
}

// --- Concrete scenarios --------------------------------------------------

#[test]
fn scenario_1_identity_lambda_infers_endo_pi() {
    let env = fresh_env();
    let lam = mk_lambda(Ident::local("x"), mk_sort(PROP), mk_local_var(0));
    let ty = sc_type_check(env, None, &lam).expect("should type-check");
    assert_eq!(ty, mk_pi(Ident::local("x"), mk_sort(PROP), mk_sort(PROP)));
}

#[test]
fn scenario_2_beta_reduced_application_of_nat_identity() {
    let env = fresh_env();
    let nat = mk_global(dtlc_core::env::NAT.clone());
    let id_nat = mk_lambda(Ident::local("x"), nat.clone(), mk_local_var(0));
    let applied = dtlc_core::term::mk_app(id_nat, mk_nat_lit(3));
    let ty = sc_type_check(env, None, &applied).expect("should type-check");
    assert_eq!(ty, nat);
}

#[test]
fn scenario_3_pi_of_two_sorts_lands_in_their_successor_max() {
    let env = fresh_env();
    let pi = mk_pi(Ident::local("_"), mk_sort(Sort(0)), mk_sort(Sort(1)));
    let ty = sc_type_check(env, None, &pi).expect("should type-check");
    assert_eq!(ty, mk_sort(Sort(2)));
}

#[test]
fn scenario_4_prop_codomain_pi_is_impredicative() {
    let env = fresh_env();
    let pi = mk_pi(Ident::local("_"), mk_sort(Sort(3)), mk_sort(PROP));
    let ty = sc_type_check(env, None, &pi).expect("should type-check");
    assert_eq!(ty, mk_sort(PROP));
}

#[test]
fn scenario_5_recursor_missing_a_case_is_malformed() {
    let (env, data_name, zero_name, _succ_name) = nat2_env();
    let motive = mk_pi(
        Ident::local("_"),
        mk_datatype_app(data_name.clone(), vec![], vec![]),
        mk_sort(PROP.succ()),
    );
    let zero = mk_ctor_app(zero_name, vec![], vec![]);
    // Only one of the two required cases is supplied.
    let rec = mk_recursor_app(data_name, vec![], motive, vec![], vec![], zero);
    let err = sc_type_check(env, None, &rec).unwrap_err();
    assert!(matches!(err, TCError::MalformedRecursor { .. }));
}

#[test]
fn scenario_6_array_literal_element_mismatch_vs_success() {
    let env = fresh_env();
    let nat = mk_global(dtlc_core::env::NAT.clone());

    let bad = mk_array_value(nat.clone(), vec![mk_nat_lit(1), mk_string_lit("x")]);
    let err = sc_type_check(env.clone(), None, &bad).unwrap_err();
    assert!(matches!(err, TCError::SubtypeFailure(..)));

    let good = mk_array_value(nat.clone(), vec![mk_nat_lit(1), mk_nat_lit(2)]);
    let ty = sc_type_check(env, None, &good).expect("matching element types should type-check");
    let expected = apply_all(mk_global(dtlc_core::env::VEC.clone()), vec![mk_nat_lit(2), nat]);
    assert_eq!(ty, expected);
}
