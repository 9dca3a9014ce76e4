use std::sync::Arc;

const WORD_BITS: usize = 64;

/// An exact free-variable bitset over de Bruijn indices. Bit `i` is set iff
/// de Bruijn index `i` occurs free in the term this bitset was computed for.
/// Every shared term caches one of these, not merely an upper bound: since
/// `LocalVar` is addressed directly by index (see `ctx.rs`), substitution
/// needs to know precisely which indices occur free in order to skip
/// subtrees that can't contain the variable being substituted. Structurally
/// shared (`Arc`) so cloning is O(1), matching every other cached field on a
/// term node.
#[derive(Clone, Eq, Debug, Default)]
pub struct FreeVars(Arc<[u64]>);

impl PartialEq for FreeVars {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl std::hash::Hash for FreeVars {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl FreeVars {
    pub fn empty() -> Self {
        FreeVars(Arc::from(Vec::new()))
    }

    pub fn single(i: usize) -> Self {
        let mut words = vec![0u64; i / WORD_BITS + 1];
        words[i / WORD_BITS] |= 1u64 << (i % WORD_BITS);
        FreeVars(Arc::from(words))
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|w| *w == 0)
    }

    pub fn contains(&self, i: usize) -> bool {
        self.0
            .get(i / WORD_BITS)
            .map_or(false, |w| w & (1u64 << (i % WORD_BITS)) != 0)
    }

    pub fn union(&self, other: &FreeVars) -> FreeVars {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }
        let (longer, shorter) = if self.0.len() >= other.0.len() {
            (&self.0, &other.0)
        } else {
            (&other.0, &self.0)
        };
        let mut words: Vec<u64> = longer.to_vec();
        for (w, s) in words.iter_mut().zip(shorter.iter()) {
            *w |= s;
        }
        FreeVars(Arc::from(words))
    }

    pub fn union_all<'a>(sets: impl IntoIterator<Item = &'a FreeVars>) -> FreeVars {
        sets.into_iter().fold(FreeVars::empty(), |acc, s| acc.union(s))
    }

    /// Shift every index down by `n`, dropping indices `< n`. Used when a subtree
    /// exits `n` binders (`free(body) ≫ n`).
    pub fn shift_down(&self, n: usize) -> FreeVars {
        if n == 0 || self.is_empty() {
            return self.clone();
        }
        let mut out = FreeVars::empty();
        for i in self.iter() {
            if i >= n {
                out = out.union(&FreeVars::single(i - n));
            }
        }
        out
    }

    pub fn shift_up(&self, delta: usize) -> FreeVars {
        if delta == 0 || self.is_empty() {
            return self.clone();
        }
        let mut out = FreeVars::empty();
        for i in self.iter() {
            out = out.union(&FreeVars::single(i + delta));
        }
        out
    }

    /// True iff some free index is `>= lo`. Substitution/shifting primitives use
    /// this to skip subtrees that the operation cannot possibly touch.
    pub fn has_index_at_least(&self, lo: usize) -> bool {
        self.iter().any(|i| i >= lo)
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().enumerate().flat_map(|(wi, w)| {
            let w = *w;
            (0..WORD_BITS).filter_map(move |b| {
                if w & (1u64 << b) != 0 {
                    Some(wi * WORD_BITS + b)
                } else {
                    None
                }
            })
        })
    }
}

#[cfg(test)]
mod freevars_tests {
    use super::*;

    #[test]
    fn single_and_contains() {
        let fv = FreeVars::single(3);
        assert!(fv.contains(3));
        assert!(!fv.contains(2));
        assert!(!fv.contains(4));
    }

    #[test]
    fn union_is_commutative_and_complete() {
        let a = FreeVars::single(1).union(&FreeVars::single(70));
        let b = FreeVars::single(70).union(&FreeVars::single(1));
        assert_eq!(a, b);
        assert!(a.contains(1));
        assert!(a.contains(70));
        assert!(!a.contains(2));
    }

    #[test]
    fn shift_down_drops_below_threshold() {
        let fv = FreeVars::single(0).union(&FreeVars::single(2));
        let shifted = fv.shift_down(1);
        assert!(!shifted.contains(usize::MAX.wrapping_sub(0))); // no spurious bits
        assert!(shifted.contains(1));
        assert!(!shifted.contains(0));
    }

    #[test]
    fn shift_up_then_down_is_identity_above_threshold() {
        let fv = FreeVars::single(5);
        let up = fv.shift_up(3);
        assert!(up.contains(8));
        let down = up.shift_down(3);
        assert_eq!(down, fv);
    }

    #[test]
    fn has_index_at_least() {
        let fv = FreeVars::single(4);
        assert!(fv.has_index_at_least(0));
        assert!(fv.has_index_at_least(4));
        assert!(!fv.has_index_at_least(5));
        assert!(!FreeVars::empty().has_index_at_least(0));
    }
}
