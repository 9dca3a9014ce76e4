use std::fmt;
use std::sync::Arc;

/// A qualified `(module, local)` name used to name globals, datatypes,
/// constructors and record fields throughout the term language, interned
/// behind an `Arc` so cloning is cheap and equal names share an allocation
/// once hash-consed by a caller.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ident(Arc<InnerIdent>);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct InnerIdent {
    module: Option<String>,
    local: String,
}

impl Ident {
    pub fn new(module: impl Into<String>, local: impl Into<String>) -> Self {
        Ident(Arc::new(InnerIdent {
            module: Some(module.into()),
            local: local.into(),
        }))
    }

    /// A name with no module qualifier, e.g. a locally-bound binder name used only
    /// for pretty-printing (binder names never participate in equality of terms).
    pub fn local(local: impl Into<String>) -> Self {
        Ident(Arc::new(InnerIdent {
            module: None,
            local: local.into(),
        }))
    }

    pub fn module(&self) -> Option<&str> {
        self.0.module.as_deref()
    }

    pub fn local_part(&self) -> &str {
        &self.0.local
    }

    pub fn is_qualified(&self) -> bool {
        self.0.module.is_some()
    }
}

impl fmt::Debug for Ident {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.0.module {
            Some(m) => write!(f, "{}.{}", m, self.0.local),
            None => write!(f, "{}", self.0.local),
        }
    }
}

impl From<&str> for Ident {
    fn from(s: &str) -> Ident {
        Ident::local(s)
    }
}

#[cfg(test)]
mod ident_tests {
    use super::*;

    #[test]
    fn qualified_display() {
        let n = Ident::new("list", "map");
        assert_eq!(format!("{}", n), "list.map");
    }

    #[test]
    fn local_display_unqualified() {
        let n = Ident::local("x");
        assert_eq!(format!("{}", n), "x");
        assert!(!n.is_qualified());
    }

    #[test]
    fn equality_is_by_value() {
        let a = Ident::new("nat", "succ");
        let b = Ident::new("nat", "succ");
        assert_eq!(a, b);
        assert_ne!(a, Ident::new("nat", "zero"));
    }
}
