/// Per-level cost table and bounded member selection.
///
/// `cost_le` selects the members of a family whose summed per-level costs
/// stay within a bound. Two caches back it: a bound cache mapping a root to
/// a sorted map over negated accepted-worst costs, which lets a stored
/// result answer every bound between its accepted-worst and the best
/// rejected cost recorded next to it, and a direct min/max-cost cache used
/// by the pruning variant to cut subtrees that are wholly accepted or
/// wholly rejected.
///
/// The bound cache keys roots weakly but holds strong references to its
/// result edges; call `clear_cache` before expecting a collection to
/// reclaim them.
use std::collections::BTreeMap;

use common::prelude::*;
use num_traits::{PrimInt, Signed};

use crate::manager::DdManager;

const MIN_OP: u8 = 4;
const MAX_OP: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CleEntry {
    Hit(Edge),
    Reject,
}

pub struct CostTable<C = i32> {
    cost_of_lev: Vec<C>,
    bound_cache: DdHashMap<u64, BTreeMap<C, CleEntry>>,
    minmax: DdHashMap<(u8, u64), C>,
}

impl<C: PrimInt + Signed> CostTable<C> {
    /// A table for `levels` levels, each with `default_cost`.
    pub fn new(levels: usize, default_cost: C) -> Self {
        Self {
            cost_of_lev: vec![default_cost; levels + 1],
            bound_cache: DdHashMap::default(),
            minmax: DdHashMap::default(),
        }
    }

    /// The sentinel meaning "no cost" / "unknown".
    pub fn null_cost() -> C {
        C::max_value()
    }

    pub fn levels(&self) -> usize {
        self.cost_of_lev.len() - 1
    }

    pub fn cost_of_lev(&self, lev: Level) -> C {
        self.cost_of_lev[lev]
    }

    pub fn set_cost_of_lev(&mut self, lev: Level, cost: C) {
        self.cost_of_lev[lev] = cost;
    }

    /// Releases every edge held by the bound cache and empties both caches.
    pub fn clear_cache(&mut self, dd: &mut DdManager) {
        for (_, zm) in self.bound_cache.drain() {
            for (_, e) in zm {
                if let CleEntry::Hit(h) = e {
                    dd.release(h);
                }
            }
        }
        self.minmax.clear();
    }

    fn cache_ref(&self, dd: &mut DdManager, f: Edge, bound: C) -> Option<(Edge, C, C)> {
        let zm = self.bound_cache.get(&f.raw())?;
        // Keys are negated accepted-worst costs, so the first key at or
        // above `-bound` is the largest accepted-worst not exceeding the
        // bound; a rejected-cost sentinel there means the stored results
        // are stale for this bound.
        match zm.range(-bound..).next() {
            None => {
                let mut back = zm.iter().rev();
                let (_, v1) = back.next()?;
                if *v1 != CleEntry::Hit(Edge::FALSE) {
                    return None;
                }
                let (k2, _) = back.next()?;
                Some((Edge::FALSE, Self::null_cost(), -*k2))
            }
            Some((k, CleEntry::Hit(h))) => {
                let acc = if *k == C::max_value() {
                    Self::null_cost()
                } else {
                    -*k
                };
                let rej = match zm.range(..*k).next_back() {
                    Some((k2, _)) => -*k2,
                    None => Self::null_cost(),
                };
                Some((dd.acquire(*h), acc, rej))
            }
            Some((_, CleEntry::Reject)) => None,
        }
    }

    fn cache_ent(&mut self, dd: &mut DdManager, f: Edge, h: Edge, acc: C, rej: C) {
        if h.is_null() {
            return;
        }
        let zm = self.bound_cache.entry(f.raw()).or_default();
        if acc != Self::null_cost() {
            dd.acquire(h);
            if let Some(CleEntry::Hit(old)) = zm.insert(-acc, CleEntry::Hit(h)) {
                dd.release(old);
            }
        } else if h == Edge::FALSE {
            zm.entry(C::max_value()).or_insert(CleEntry::Hit(Edge::FALSE));
        }
        if rej != Self::null_cost() {
            zm.entry(-rej).or_insert(CleEntry::Reject);
        }
    }

    /// Members of `f` whose cost is at most `bound`.
    pub fn cost_le(&mut self, dd: &mut DdManager, f: Edge, bound: C) -> Edge {
        self.cost_le_full(dd, f, bound).0
    }

    /// As `cost_le`, also reporting the worst accepted and best rejected
    /// costs (null when the respective side is empty).
    pub fn cost_le_full(&mut self, dd: &mut DdManager, f: Edge, bound: C) -> (Edge, C, C) {
        if f.is_null() {
            return (Edge::NULL, Self::null_cost(), Self::null_cost());
        }
        self.cle(dd, f, bound)
    }

    fn cle(&mut self, dd: &mut DdManager, f: Edge, bound: C) -> (Edge, C, C) {
        let null = Self::null_cost();
        if f == Edge::FALSE {
            return (Edge::FALSE, null, null);
        }
        if f == Edge::TRUE {
            return if bound >= C::zero() {
                (Edge::TRUE, C::zero(), null)
            } else {
                (Edge::FALSE, null, C::zero())
            };
        }
        if let Some(hit) = self.cache_ref(dd, f, bound) {
            return hit;
        }

        let top = dd.top(f);
        let cost = self.cost_of_lev[dd.lev_of_var(top)];
        let f1 = dd.onset0(f, top);
        let (h1, aw1, rb1) = self.cle(dd, f1, bound - cost);
        dd.release(f1);
        let hc = dd.change(h1, top);
        dd.release(h1);
        let f0 = dd.offset(f, top);
        let (h0, aw0, rb0) = self.cle(dd, f0, bound);
        dd.release(f0);
        let h = dd.union(hc, h0);
        dd.release(hc);
        dd.release(h0);

        let acc = if aw1 == null {
            aw0
        } else {
            let a1 = aw1 + cost;
            if aw0 == null || a1 > aw0 {
                a1
            } else {
                aw0
            }
        };
        let rej = if rb1 == null {
            rb0
        } else {
            let r1 = rb1 + cost;
            if rb0 == null || r1 < rb0 {
                r1
            } else {
                rb0
            }
        };
        self.cache_ent(dd, f, h, acc, rej);
        (h, acc, rej)
    }

    /// Smallest member cost of `f`, or null for the empty family.
    pub fn min_cost(&mut self, dd: &mut DdManager, f: Edge) -> C {
        let null = Self::null_cost();
        if f.is_null() || f == Edge::FALSE {
            return null;
        }
        if f == Edge::TRUE {
            return C::zero();
        }
        if let Some(c) = self.minmax.get(&(MIN_OP, f.raw())) {
            return *c;
        }
        let top = dd.top(f);
        let cost = self.cost_of_lev[dd.lev_of_var(top)];
        let f0 = dd.offset(f, top);
        let m0 = self.min_cost(dd, f0);
        dd.release(f0);
        let f1 = dd.onset0(f, top);
        let m1 = self.min_cost(dd, f1) + cost;
        dd.release(f1);
        let m = if m0 != null && m0 < m1 { m0 } else { m1 };
        self.minmax.insert((MIN_OP, f.raw()), m);
        m
    }

    /// Largest member cost of `f`, or null for the empty family.
    pub fn max_cost(&mut self, dd: &mut DdManager, f: Edge) -> C {
        let null = Self::null_cost();
        if f.is_null() || f == Edge::FALSE {
            return null;
        }
        if f == Edge::TRUE {
            return C::zero();
        }
        if let Some(c) = self.minmax.get(&(MAX_OP, f.raw())) {
            return *c;
        }
        let top = dd.top(f);
        let cost = self.cost_of_lev[dd.lev_of_var(top)];
        let f0 = dd.offset(f, top);
        let m0 = self.max_cost(dd, f0);
        dd.release(f0);
        let f1 = dd.onset0(f, top);
        let m1 = self.max_cost(dd, f1) + cost;
        dd.release(f1);
        let m = if m0 != null && m0 > m1 { m0 } else { m1 };
        self.minmax.insert((MAX_OP, f.raw()), m);
        m
    }

    /// Bounded selection that prunes through the min/max cache: a subtree
    /// whose cheapest completion already busts the bound is rejected whole,
    /// one whose costliest completion fits is accepted whole.
    pub fn cost_le0(&mut self, dd: &mut DdManager, f: Edge, bound: C) -> Edge {
        if f.is_null() {
            return Edge::NULL;
        }
        self.cle0(dd, f, C::zero(), bound).0
    }

    fn cle0(&mut self, dd: &mut DdManager, f: Edge, spent: C, bound: C) -> (Edge, C, C) {
        let null = Self::null_cost();
        if f == Edge::FALSE {
            return (Edge::FALSE, null, null);
        }
        if f == Edge::TRUE {
            let h = if bound >= spent { Edge::TRUE } else { Edge::FALSE };
            return (h, C::zero(), C::zero());
        }
        let min = self.minmax.get(&(MIN_OP, f.raw())).copied().unwrap_or(null);
        let max = self.minmax.get(&(MAX_OP, f.raw())).copied().unwrap_or(null);
        if min != null && bound < min + spent {
            return (Edge::FALSE, min, max);
        }
        if max != null && bound >= max + spent {
            return (dd.acquire(f), min, max);
        }

        let top = dd.top(f);
        let cost = self.cost_of_lev[dd.lev_of_var(top)];
        let f0 = dd.offset(f, top);
        let (h0, min0, max0) = self.cle0(dd, f0, spent, bound);
        dd.release(f0);
        let f1 = dd.onset0(f, top);
        let (h1, min1, max1) = self.cle0(dd, f1, spent + cost, bound);
        dd.release(f1);
        let hc = dd.change(h1, top);
        dd.release(h1);
        let h = dd.union(h0, hc);
        dd.release(h0);
        dd.release(hc);

        let min = if min == null && min1 != null {
            let mut m = min1 + cost;
            if min0 != null && min0 <= m {
                m = min0;
            }
            self.minmax.insert((MIN_OP, f.raw()), m);
            m
        } else {
            min
        };
        let max = if max == null && max1 != null {
            let mut m = max1 + cost;
            if max0 != null && max0 >= m {
                m = max0;
            }
            self.minmax.insert((MAX_OP, f.raw()), m);
            m
        } else {
            max
        };
        (h, min, max)
    }
}

#[cfg(test)]
mod tests {
    use common::prelude::*;

    use super::CostTable;
    use crate::manager::DdManager;

    /// {{1,2}, {3}, {2,3}} with costs 5, 3, 1 for levels 3, 2, 1.
    fn setup(dd: &mut DdManager) -> (Edge, CostTable<i32>) {
        let v1 = dd.new_var();
        let v2 = dd.new_var();
        let v3 = dd.new_var();
        let s1 = dd.zvar(v1);
        let s2 = dd.zvar(v2);
        let s3 = dd.zvar(v3);
        let p12 = dd.product(s1, s2);
        let p23 = dd.product(s2, s3);
        let u = dd.union(p12, s3);
        let f = dd.union(u, p23);
        for e in [s1, s2, s3, p12, p23, u] {
            dd.release(e);
        }
        let mut ct = CostTable::new(3, 1);
        ct.set_cost_of_lev(dd.lev_of_var(v1), 5);
        ct.set_cost_of_lev(dd.lev_of_var(v2), 3);
        ct.set_cost_of_lev(dd.lev_of_var(v3), 1);
        (f, ct)
    }

    #[test]
    fn min_max_costs() {
        let mut dd = DdManager::default();
        let (f, mut ct) = setup(&mut dd);
        // costs: {1,2} = 8, {3} = 1, {2,3} = 4
        assert_eq!(ct.min_cost(&mut dd, f), 1);
        assert_eq!(ct.max_cost(&mut dd, f), 8);
        ct.clear_cache(&mut dd);
        dd.release(f);
    }

    #[test]
    fn bounded_selection() {
        let mut dd = DdManager::default();
        let (f, mut ct) = setup(&mut dd);
        let h4 = ct.cost_le(&mut dd, f, 4);
        assert_eq!(dd.cardinality(h4), 2);
        let h0 = ct.cost_le(&mut dd, f, 0);
        assert_eq!(h0, Edge::FALSE);
        let h8 = ct.cost_le(&mut dd, f, 8);
        assert_eq!(h8, f);
        // Interpolation: a nearby bound answers from the bound cache.
        let h5 = ct.cost_le(&mut dd, f, 5);
        assert_eq!(h5, h4);
        for e in [h4, h0, h8, h5] {
            dd.release(e);
        }
        ct.clear_cache(&mut dd);
        dd.release(f);
    }

    #[test]
    fn pruning_variant_agrees() {
        let mut dd = DdManager::default();
        let (f, mut ct) = setup(&mut dd);
        for bound in [0, 1, 3, 4, 5, 7, 8, 9] {
            let a = ct.cost_le(&mut dd, f, bound);
            let b = ct.cost_le0(&mut dd, f, bound);
            assert_eq!(a, b, "bound {}", bound);
            dd.release(a);
            dd.release(b);
        }
        ct.clear_cache(&mut dd);
        dd.release(f);
    }
}
