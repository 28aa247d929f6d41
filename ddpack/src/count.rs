/// Quantitative queries: node counts, cardinality, literal count, member
/// length.
///
/// Node counting walks the graph once, marking visited nodes through the
/// scratch bit of the `next` field and unmarking on a second pass, so shared
/// subgraphs count once even across a vector of roots. Cardinality and its
/// relatives run through the counting codes of `apply`, saturating at the
/// null value; the exact big-integer variant accumulates limb records in the
/// multi-precision arena.
use common::prelude::*;

use crate::cache::Operation;
use crate::manager::DdManager;
use crate::mp::{mp_add, mp_to_decimal, MpArena, MP_NULL};

const NULLV: u64 = Edge::NULL.raw();

impl DdManager {
    fn count_nodes(&mut self, f: Edge) -> u64 {
        if f.is_const() {
            return 0;
        }
        let ix = f.index();
        if self.marked(ix) {
            return 0;
        }
        let (slo, shi) = self.raw_children(ix);
        self.recur_inc();
        let c = self.count_nodes(slo) + self.count_nodes(shi) + 1;
        self.recur_dec();
        self.set_mark(ix);
        c
    }

    pub(crate) fn reset_marks(&mut self, f: Edge) {
        if f.is_const() {
            return;
        }
        let ix = f.index();
        if !self.marked(ix) {
            return;
        }
        self.clear_mark(ix);
        let (slo, shi) = self.raw_children(ix);
        self.recur_inc();
        self.reset_marks(slo);
        self.reset_marks(shi);
        self.recur_dec();
    }

    /// Number of non-terminal nodes reachable from `f`.
    pub fn size(&mut self, f: Edge) -> u64 {
        if f.is_null() || f.is_const() {
            return 0;
        }
        let _ = self.node(f);
        let n = self.count_nodes(f);
        self.reset_marks(f);
        n
    }

    /// Number of distinct non-terminal nodes reachable from a vector of
    /// roots; shared subgraphs count once. Stops at the first null root.
    pub fn multi_size(&mut self, roots: &[Edge]) -> u64 {
        let mut n = roots.len();
        for (i, &p) in roots.iter().enumerate() {
            if p.is_null() {
                n = i;
                break;
            }
        }
        let mut num = 0;
        for &p in &roots[..n] {
            num += self.count_nodes(p);
        }
        for &p in &roots[..n] {
            self.reset_marks(p);
        }
        num
    }

    /// Number of members of the family `f`, saturating at `u64::MAX`.
    pub fn cardinality(&mut self, f: Edge) -> u64 {
        if f.is_null() {
            return 0;
        }
        let h = self.apply(Operation::Card, f, Edge::FALSE, false);
        if h.is_null() {
            u64::MAX
        } else {
            h.raw()
        }
    }

    /// Exact number of members of the family `f` rendered as decimal, or
    /// `None` when the count exceeds the multi-precision range.
    pub fn cardinality_big(&mut self, f: Edge) -> Option<String> {
        if f.is_null() {
            return None;
        }
        if f.is_const() {
            return Some(if f == Edge::TRUE { "1" } else { "0" }.to_string());
        }
        let h = self.card_mp(f.abs());
        if h == MP_NULL {
            return None;
        }
        let mut limbs = if MpArena::is_handle(h) {
            self.mp.get(h).to_vec()
        } else {
            vec![h]
        };
        if self.contains_empty(f) {
            mp_add(&mut limbs, &[1]);
        }
        Some(mp_to_decimal(limbs))
    }

    /// Counting recursion over complement-stripped edges. Returns either a
    /// plain value below the null boundary or an arena handle; shares cache
    /// entries with the saturating counter.
    fn card_mp(&mut self, f: Edge) -> u64 {
        if f.is_const() {
            return if f == Edge::FALSE { 0 } else { 1 };
        }
        let use_cache = !self.rfc_one(f.index());
        if use_cache {
            if let Some(h) = self.cache_lookup(Operation::Card, f, Edge::FALSE) {
                // A saturated plain entry is useless here; recompute exactly.
                if h.raw() != NULLV {
                    return h.raw();
                }
            }
        }

        let fnode = self.node(f);
        let mut f0 = fnode.lo;
        let f1 = fnode.hi;
        if f.neg() != f0.neg() {
            f0 = f0.flip();
        }

        self.recur_inc();
        let h0 = self.card_mp(f0.abs());
        let h1 = self.card_mp(f1.abs());
        self.recur_dec();
        if h0 == MP_NULL || h1 == MP_NULL {
            return MP_NULL;
        }

        let mut acc = vec![(f0.neg() as u64) + (f1.neg() as u64)];
        for h in [h0, h1] {
            if MpArena::is_handle(h) {
                let limbs = self.mp.get(h).to_vec();
                mp_add(&mut acc, &limbs);
            } else {
                mp_add(&mut acc, &[h]);
            }
        }

        let h = if acc.len() == 1 && acc[0] < NULLV {
            acc[0]
        } else {
            self.mp.alloc(&acc)
        };
        if h == MP_NULL {
            return MP_NULL;
        }
        if use_cache {
            self.cache_store(Operation::Card, f, Edge::FALSE, Edge::from_raw(h));
        }
        h
    }

    /// Sum of the member sizes of the family `f`.
    pub fn literal_count(&mut self, f: Edge) -> u64 {
        if f.is_null() {
            return 0;
        }
        if f.is_const() {
            return 0;
        }
        let h = self.apply(Operation::Lit, f, Edge::FALSE, false);
        if h.is_null() {
            u64::MAX
        } else {
            h.raw()
        }
    }

    /// Size of the largest member of the family `f`.
    pub fn max_length(&mut self, f: Edge) -> u64 {
        if f.is_null() || f.is_const() {
            return 0;
        }
        let h = self.apply(Operation::Len, f, Edge::FALSE, false);
        if h.is_null() {
            u64::MAX
        } else {
            h.raw()
        }
    }
}

#[cfg(test)]
mod tests {
    use common::prelude::*;

    use crate::manager::DdManager;

    fn three_pairs(dd: &mut DdManager) -> Edge {
        // {{1,2}, {1,3}, {2,3}} over fresh variables.
        let v1 = dd.new_var();
        let v2 = dd.new_var();
        let v3 = dd.new_var();
        let s1 = dd.zvar(v1);
        let s2 = dd.zvar(v2);
        let s3 = dd.zvar(v3);
        let p12 = dd.product(s1, s2);
        let p13 = dd.product(s1, s3);
        let p23 = dd.product(s2, s3);
        let u1 = dd.union(p12, p13);
        let f = dd.union(u1, p23);
        for e in [s1, s2, s3, p12, p13, p23, u1] {
            dd.release(e);
        }
        f
    }

    #[test]
    fn pair_family_counts() {
        let mut dd = DdManager::default();
        let f = three_pairs(&mut dd);
        assert_eq!(dd.cardinality(f), 3);
        assert_eq!(dd.literal_count(f), 6);
        assert_eq!(dd.max_length(f), 2);
        assert_eq!(dd.cardinality_big(f).as_deref(), Some("3"));
        dd.release(f);
    }

    #[test]
    fn counts_with_empty_member() {
        let mut dd = DdManager::default();
        let f = three_pairs(&mut dd);
        let g = dd.union(f, Edge::TRUE);
        assert_eq!(dd.cardinality(g), 4);
        assert_eq!(dd.literal_count(g), 6);
        assert_eq!(dd.cardinality_big(g).as_deref(), Some("4"));
        dd.release(f);
        dd.release(g);
    }

    #[test]
    fn size_counts_shared_nodes_once() {
        let mut dd = DdManager::default();
        let f = three_pairs(&mut dd);
        let n = dd.size(f);
        assert!(n >= 3);
        assert_eq!(dd.multi_size(&[f, f]), n);
        dd.release(f);
    }

    #[test]
    fn big_cardinality_of_power_family() {
        let mut dd = DdManager::default();
        // Family of all subsets of 70 elements: 2^70 members.
        let mut f = Edge::TRUE;
        for _ in 0..70 {
            let v = dd.new_var();
            let s = dd.zvar(v);
            let p = dd.product(f, s);
            let u = dd.union(f, p);
            dd.release(f);
            dd.release(p);
            dd.release(s);
            f = u;
        }
        assert_eq!(dd.cardinality(f), u64::MAX);
        assert_eq!(
            dd.cardinality_big(f).as_deref(),
            Some("1180591620717411303424")
        );
        dd.release(f);
    }
}
