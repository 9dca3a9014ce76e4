#![forbid(unsafe_code)]

pub mod ctx;
pub mod env;
pub mod errors;
pub mod freevars;
pub mod name;
pub mod pretty;
pub mod recursor;
pub mod reduction;
pub mod sort;
pub mod subst;
pub mod tc;
pub mod term;

pub use ctx::Ctx;
pub use env::Env;
pub use errors::{Pos, TCError, TCResult};
pub use name::Ident;
pub use sort::Sort;
pub use tc::{are_convertible as check_convertible, is_subtype as check_subtype, sc_convertible, sc_type_check, sc_type_check_in_ctx, CheckerOptions, TypeChecker};
pub use term::{Term, TermKind};
