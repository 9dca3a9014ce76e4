use std::fmt;

use crate::name::Ident;
use crate::term::Term;

pub type TCResult<T> = Result<T, TCError>;

/// The closed error taxonomy. All user-facing failures the engine can
/// report. Carries enough of the offending term(s) to build a useful
/// message without re-deriving them.
///
/// Failures split into two buckets: a caller handed the engine a malformed
/// term (`TCError`, returned through the `Result` chain) versus an internal
/// invariant broke (a bug in this crate, not in the input, handled near the
/// bottom of this file). A library must never terminate its host process,
/// so the latter bucket is always a `panic!`/`unreachable!` rather than a
/// process exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TCError {
    NotSort(Term),
    NotFuncType(Term),
    NotTupleType(Term),
    BadTupleIndex,
    NotStringLit(Term),
    NotRecordType(Term),
    BadRecordField(Ident),
    DanglingVar(usize),
    UnboundName(Ident),
    SubtypeFailure(Term, Term),
    EmptyVectorLit,
    NoSuchDataType(Ident),
    NoSuchCtor(Ident),
    NotFullyAppliedRec,
    BadParamsOrArgsLength {
        is_data_type: bool,
        id: Ident,
        expected: usize,
        got: usize,
    },
    BadConstType {
        name: Ident,
        inferred: Term,
        declared: Term,
    },
    MalformedRecursor {
        term: Term,
        reason: String,
    },
    DeclError {
        name: Ident,
        reason: String,
    },

    /// Wraps `inner` with the position at which it was raised, unless
    /// `inner` already carries one (wrapping is idempotent).
    ErrorPos(Pos, Box<TCError>),
    /// Wraps `inner` raised while type-checking under `(var_name, var_type)`,
    /// forming a stack trace as the error unwinds through nested `withVar`s.
    ErrorCtx(Ident, Term, Box<TCError>),
}

/// An opaque source position. The core never constructs these itself (there
/// is no parser in this crate); callers that do have a surface syntax pass
/// one in through `at_pos`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pos {
    pub line: u32,
    pub col: u32,
}

impl TCError {
    /// True iff this error (at any nesting depth through `ErrorPos`) already
    /// carries a position, so a further `at_pos` wrap is a no-op.
    fn has_pos(&self) -> bool {
        match self {
            TCError::ErrorPos(..) => true,
            TCError::ErrorCtx(_, _, inner) => inner.has_pos(),
            _ => false,
        }
    }

    pub fn wrap_pos(self, pos: Pos) -> TCError {
        if self.has_pos() {
            self
        } else {
            TCError::ErrorPos(pos, Box::new(self))
        }
    }

    pub fn wrap_ctx(self, var_name: Ident, var_type: Term) -> TCError {
        TCError::ErrorCtx(var_name, var_type, Box::new(self))
    }
}

impl fmt::Display for TCError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TCError::NotSort(t) => write!(f, "expected a Sort, got {:?}", t),
            TCError::NotFuncType(t) => write!(f, "expected a Pi type, got {:?}", t),
            TCError::NotTupleType(t) => write!(f, "expected a PairType, got {:?}", t),
            TCError::BadTupleIndex => write!(f, "tuple projection out of range"),
            TCError::NotStringLit(t) => write!(f, "expected a string literal, got {:?}", t),
            TCError::NotRecordType(t) => write!(f, "expected a record type, got {:?}", t),
            TCError::BadRecordField(name) => write!(f, "no field named {} in record type", name),
            TCError::DanglingVar(i) => write!(f, "variable {} has no binder in the ambient context", i),
            TCError::UnboundName(name) => write!(f, "unbound name {}", name),
            TCError::SubtypeFailure(a, b) => write!(f, "{:?} is not a subtype of {:?}", a, b),
            TCError::EmptyVectorLit => write!(f, "cannot infer element type of an empty vector literal"),
            TCError::NoSuchDataType(id) => write!(f, "no datatype named {} in the environment", id),
            TCError::NoSuchCtor(id) => write!(f, "no constructor named {} in the environment", id),
            TCError::NotFullyAppliedRec => write!(f, "recursor application is missing its scrutinee"),
            TCError::BadParamsOrArgsLength {
                is_data_type,
                id,
                expected,
                got,
            } => write!(
                f,
                "{} {} expects {} parameters/arguments, got {}",
                if *is_data_type { "datatype" } else { "constructor" },
                id,
                expected,
                got
            ),
            TCError::BadConstType { name, inferred, declared } => write!(
                f,
                "constant {} has declared type {:?} but its definition infers to {:?}",
                name, declared, inferred
            ),
            TCError::MalformedRecursor { term, reason } => {
                write!(f, "malformed recursor application ({}): {:?}", reason, term)
            }
            TCError::DeclError { name, reason } => write!(f, "declaration {} rejected: {}", name, reason),
            TCError::ErrorPos(pos, inner) => write!(f, "{}:{}: {}", pos.line, pos.col, inner),
            TCError::ErrorCtx(name, ty, inner) => {
                write!(f, "while checking under {} : {:?}:\n  {}", name, ty, inner)
            }
        }
    }
}

impl std::error::Error for TCError {}

// --- internal invariant violations (panics, never exposed as `TCError`) ---
//
// A library crate must not terminate its host process, so these panic
// instead of exiting; any caller that hits one should treat it as a bug in
// this crate, not a malformed-input path.

/// `recursor.rs` was asked for the required case type of a constructor the
/// environment does not know about. By the time `recursor_elim_types` is
/// called from `tc.rs`, constructor membership has already been checked, so
/// this only fires if `recursor.rs` is called directly, bypassing the engine.
pub(crate) fn unknown_ctor_in_recursor(id: &Ident) -> ! {
    panic!(
        "recursor_elim_types called with constructor {} absent from its datatype's ctor list",
        id
    )
}

#[cfg(test)]
mod error_tests {
    use super::*;
    use crate::sort::Sort;

    #[test]
    fn wrap_pos_is_idempotent() {
        let inner = TCError::DanglingVar(3);
        let once = inner.clone().wrap_pos(Pos { line: 1, col: 1 });
        let twice = once.clone().wrap_pos(Pos { line: 2, col: 2 });
        assert_eq!(once, twice);
    }

    #[test]
    fn wrap_ctx_always_adds_a_frame() {
        let inner = TCError::DanglingVar(0);
        let name = Ident::local("x");
        let ty = crate::term::mk_sort(Sort(0));
        let wrapped = inner.wrap_ctx(name.clone(), ty.clone());
        match wrapped {
            TCError::ErrorCtx(n, t, _) => {
                assert_eq!(n, name);
                assert_eq!(t, ty);
            }
            _ => panic!("expected ErrorCtx"),
        }
    }

    #[test]
    fn display_renders_without_panicking() {
        let e = TCError::BadParamsOrArgsLength {
            is_data_type: true,
            id: Ident::new("nat", "Nat"),
            expected: 0,
            got: 1,
        };
        let _ = format!("{}", e);
    }
}
