use std::fmt;

use crate::term::{Term, TermKind};

/// Minimal term dumper backing `Term`'s `Debug` impl. There is no
/// concrete/surface syntax here, so this only needs to be readable enough
/// for test failure output and panic messages, not round-trippable. Binders
/// print their de Bruijn index directly rather than inventing a display
/// name, since this crate has no notion of a name being "in scope".
pub fn dump(t: &Term, f: &mut fmt::Formatter) -> fmt::Result {
    match t.kind() {
        TermKind::LocalVar(i) => write!(f, "#{}", i),
        TermKind::Lambda(name, ty, body) => {
            write!(f, "(λ {}:", name)?;
            dump(ty, f)?;
            write!(f, ". ")?;
            dump(body, f)?;
            write!(f, ")")
        }
        TermKind::Pi(name, ty, body) => {
            write!(f, "(Π {}:", name)?;
            dump(ty, f)?;
            write!(f, ". ")?;
            dump(body, f)?;
            write!(f, ")")
        }
        TermKind::Let(defs, body) => {
            write!(f, "(let ")?;
            for d in defs.iter() {
                write!(f, "{}:", d.name)?;
                dump(&d.ty, f)?;
                write!(f, " := ")?;
                dump(&d.val, f)?;
                write!(f, "; ")?;
            }
            write!(f, "in ")?;
            dump(body, f)?;
            write!(f, ")")
        }
        TermKind::App(fun, arg) => {
            write!(f, "(")?;
            dump(fun, f)?;
            write!(f, " ")?;
            dump(arg, f)?;
            write!(f, ")")
        }
        TermKind::Constant(name, ..) => write!(f, "{}", name),
        TermKind::GlobalDef(id) => write!(f, "{}", id),
        TermKind::Sort(s) => write!(f, "{}", s),
        TermKind::NatLit(n) => write!(f, "{}", n),
        TermKind::StringLit(s) => write!(f, "{:?}", s),
        TermKind::ArrayValue(elem_ty, vs) => {
            write!(f, "#[")?;
            dump(elem_ty, f)?;
            write!(f, "; ")?;
            for (i, v) in vs.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                dump(v, f)?;
            }
            write!(f, "]")
        }
        TermKind::ExtCns(ix, name, _) => write!(f, "?{}#{}", name, ix),
        TermKind::UnitType => write!(f, "Unit"),
        TermKind::UnitValue => write!(f, "()"),
        TermKind::PairType(a, b) => {
            write!(f, "(")?;
            dump(a, f)?;
            write!(f, " × ")?;
            dump(b, f)?;
            write!(f, ")")
        }
        TermKind::PairValue(a, b) => {
            write!(f, "(")?;
            dump(a, f)?;
            write!(f, ", ")?;
            dump(b, f)?;
            write!(f, ")")
        }
        TermKind::PairLeft(e) => {
            dump(e, f)?;
            write!(f, ".1")
        }
        TermKind::PairRight(e) => {
            dump(e, f)?;
            write!(f, ".2")
        }
        TermKind::EmptyRecordType => write!(f, "{{}}"),
        TermKind::EmptyRecordValue => write!(f, "{{}}"),
        TermKind::FieldType(name, ty, rest) => {
            write!(f, "{{{}: ", name)?;
            dump(ty, f)?;
            write!(f, ", ")?;
            dump(rest, f)?;
            write!(f, "}}")
        }
        TermKind::FieldValue(name, val, rest) => {
            write!(f, "{{{} = ", name)?;
            dump(val, f)?;
            write!(f, ", ")?;
            dump(rest, f)?;
            write!(f, "}}")
        }
        TermKind::RecordSelector(rec, field) => {
            dump(rec, f)?;
            write!(f, ".{}", field)
        }
        TermKind::CtorApp(id, params, args) => {
            write!(f, "({}", id)?;
            for p in params.iter() {
                write!(f, " @")?;
                dump(p, f)?;
            }
            for a in args.iter() {
                write!(f, " ")?;
                dump(a, f)?;
            }
            write!(f, ")")
        }
        TermKind::DataTypeApp(id, params, indices) => {
            write!(f, "({}", id)?;
            for p in params.iter() {
                write!(f, " @")?;
                dump(p, f)?;
            }
            for i in indices.iter() {
                write!(f, " ")?;
                dump(i, f)?;
            }
            write!(f, ")")
        }
        TermKind::RecursorApp {
            data_id,
            motive,
            cases,
            indices,
            scrutinee,
            ..
        } => {
            write!(f, "({}.rec ", data_id)?;
            dump(motive, f)?;
            for (name, case) in cases.iter() {
                write!(f, " | {} => ", name)?;
                dump(case, f)?;
            }
            for ix in indices.iter() {
                write!(f, " ")?;
                dump(ix, f)?;
            }
            write!(f, " ")?;
            dump(scrutinee, f)?;
            write!(f, ")")
        }
    }
}

#[cfg(test)]
mod pretty_tests {
    use super::*;
    use crate::name::Ident;
    use crate::sort::PROP;
    use crate::term::{mk_lambda, mk_local_var, mk_sort};

    #[test]
    fn dump_does_not_panic_on_a_lambda() {
        let lam = mk_lambda(Ident::local("x"), mk_sort(PROP), mk_local_var(0));
        let rendered = format!("{:?}", lam);
        assert!(rendered.contains("λ"));
        assert!(rendered.contains("#0"));
    }
}
