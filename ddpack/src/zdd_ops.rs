/// Set operations over ZDD edges.
///
/// The primitive family (union, intersection, subtraction, change, onset,
/// offset) runs through the shared `apply` routine. The algebraic family
/// (product, weak division, meet, permit, restrict, symmetry and implication
/// sets) is built recursively on top of the primitives, cached in the
/// user-extension code range.
///
/// The complement bit of a ZDD edge records that the family contains the
/// empty set; `contains_empty` decodes it.
use common::prelude::*;

use crate::cache::Operation;
use crate::manager::DdManager;

/// Stride of the level-skip cache: how far below `lev` a skip entry aims.
/// Grows as a clamped power of two so deep 0-edge chains shorten
/// geometrically.
fn zskip_target(lev: Level) -> Level {
    let mut step = 4;
    while step << 3 <= lev && step < 8192 {
        step <<= 1;
    }
    lev.saturating_sub(step)
}

impl DdManager {
    fn check_zdd(&self, name: &str, f: Edge) {
        if f.is_const() {
            if f.abs() != Edge::FALSE {
                panic!("{}: invalid edge {:#x}", name, f.raw());
            }
        } else if !self.node(f).is_zdd() {
            panic!("{}: applying a non-ZDD node", name);
        }
    }

    /// Whether the family denoted by `f` contains the empty set.
    pub fn contains_empty(&self, f: Edge) -> bool {
        if f.is_const() {
            f == Edge::TRUE
        } else {
            f.neg()
        }
    }

    /// The singleton family `{{v}}`.
    pub fn zvar(&mut self, v: VarId) -> Edge {
        if v == 0 || v > self.var_count() {
            panic!("zvar: invalid variable id {}", v);
        }
        self.make_zdd(v, Edge::FALSE, Edge::TRUE)
    }

    /// Members of `f` not containing `v`.
    pub fn offset(&mut self, f: Edge, v: VarId) -> Edge {
        if v == 0 || v > self.var_count() {
            panic!("offset: invalid variable id {}", v);
        }
        if f.is_null() {
            return Edge::NULL;
        }
        if f.is_const() {
            return f;
        }
        self.check_zdd("offset", f);
        self.apply(Operation::Offset, f, Edge::from_raw(v as u64), false)
    }

    /// Members of `f` containing `v`, with `v` removed.
    pub fn onset0(&mut self, f: Edge, v: VarId) -> Edge {
        if v == 0 || v > self.var_count() {
            panic!("onset0: invalid variable id {}", v);
        }
        if f.is_null() {
            return Edge::NULL;
        }
        if f.is_const() {
            return Edge::FALSE;
        }
        self.check_zdd("onset0", f);
        self.apply(Operation::Onset, f, Edge::from_raw(v as u64), false)
    }

    /// Members of `f` containing `v`.
    pub fn onset(&mut self, f: Edge, v: VarId) -> Edge {
        let g = self.onset0(f, v);
        let h = self.change(g, v);
        self.release(g);
        h
    }

    /// Toggles the presence of `v` in every member of `f`.
    pub fn change(&mut self, f: Edge, v: VarId) -> Edge {
        if v == 0 || v > self.var_count() {
            panic!("change: invalid variable id {}", v);
        }
        if f.is_null() {
            return Edge::NULL;
        }
        if !f.is_const() {
            self.check_zdd("change", f);
        }
        self.apply(Operation::Change, f, Edge::from_raw(v as u64), false)
    }

    /// Set union. Also usable on BDD edges, where the complement bit keeps
    /// its negation meaning.
    pub fn union(&mut self, f: Edge, g: Edge) -> Edge {
        if f.is_null() || g.is_null() {
            return Edge::NULL;
        }
        self.apply(Operation::Union, f, g, false)
    }

    /// Set intersection.
    pub fn intersec(&mut self, f: Edge, g: Edge) -> Edge {
        if f.is_null() || g.is_null() {
            return Edge::NULL;
        }
        self.apply(Operation::Intersec, f, g, false)
    }

    /// Set difference `f ∖ g`.
    pub fn subtract(&mut self, f: Edge, g: Edge) -> Edge {
        if f.is_null() || g.is_null() {
            return Edge::NULL;
        }
        self.apply(Operation::Subtract, f, g, false)
    }

    /// Element-wise union of every pair of members (set multiplication).
    pub fn product(&mut self, f: Edge, g: Edge) -> Edge {
        if f.is_null() || g.is_null() {
            return Edge::NULL;
        }
        if f == Edge::FALSE || g == Edge::FALSE {
            return Edge::FALSE;
        }
        if f == Edge::TRUE {
            return self.acquire(g);
        }
        if g == Edge::TRUE {
            return self.acquire(f);
        }
        let mut f = f;
        let mut g = g;
        if self.edge_lev(f) < self.edge_lev(g) {
            std::mem::swap(&mut f, &mut g);
        }
        let ftop = self.top(f);
        if self.top(g) == ftop && f.raw() < g.raw() {
            std::mem::swap(&mut f, &mut g);
        }
        if let Some(h) = self.cache_lookup(Operation::Product, f, g) {
            return self.acquire(h);
        }

        self.recur_inc();
        let f1 = self.onset0(f, ftop);
        let f0 = self.offset(f, ftop);
        let h = if self.top(g) != ftop {
            let t1 = self.product(f1, g);
            let c = self.change(t1, ftop);
            self.release(t1);
            let t0 = self.product(f0, g);
            let h = self.union(c, t0);
            self.release(c);
            self.release(t0);
            h
        } else {
            let g1 = self.onset0(g, ftop);
            let g0 = self.offset(g, ftop);
            let a = self.product(f1, g1);
            let b = self.product(f1, g0);
            let c = self.product(f0, g1);
            let ab = self.union(a, b);
            self.release(a);
            self.release(b);
            let abc = self.union(ab, c);
            self.release(ab);
            self.release(c);
            let hi = self.change(abc, ftop);
            self.release(abc);
            let d = self.product(f0, g0);
            let h = self.union(hi, d);
            self.release(hi);
            self.release(d);
            self.release(g1);
            self.release(g0);
            h
        };
        self.release(f1);
        self.release(f0);
        self.recur_dec();

        if !h.is_null() {
            self.cache_store(Operation::Product, f, g, h);
        }
        h
    }

    /// Weak division: the unique maximum `h` with `h · p ⊆ f`.
    pub fn quotient(&mut self, f: Edge, p: Edge) -> Edge {
        if f.is_null() || p.is_null() {
            return Edge::NULL;
        }
        if p == Edge::TRUE {
            return self.acquire(f);
        }
        if f == p {
            return Edge::TRUE;
        }
        if p == Edge::FALSE {
            panic!("quotient: divided by the empty family");
        }
        let top = self.top(p);
        if self.edge_lev(f) < self.edge_lev(p) {
            return Edge::FALSE;
        }
        if let Some(h) = self.cache_lookup(Operation::Quotient, f, p) {
            return self.acquire(h);
        }

        self.recur_inc();
        let f1 = self.onset0(f, top);
        let p1 = self.onset0(p, top);
        let mut q = self.quotient(f1, p1);
        self.release(f1);
        self.release(p1);
        if q != Edge::FALSE && !q.is_null() {
            let p0 = self.offset(p, top);
            if p0 != Edge::FALSE {
                let f0 = self.offset(f, top);
                let q0 = self.quotient(f0, p0);
                self.release(f0);
                let t = self.intersec(q, q0);
                self.release(q);
                self.release(q0);
                q = t;
            }
            self.release(p0);
        }
        self.recur_dec();

        if !q.is_null() {
            self.cache_store(Operation::Quotient, f, p, q);
        }
        q
    }

    /// Element-wise intersection of every pair of members.
    pub fn meet(&mut self, f: Edge, g: Edge) -> Edge {
        if f.is_null() || g.is_null() {
            return Edge::NULL;
        }
        if f == Edge::FALSE || g == Edge::FALSE {
            return Edge::FALSE;
        }
        if f == Edge::TRUE || g == Edge::TRUE {
            return Edge::TRUE;
        }
        let mut f = f;
        let mut g = g;
        if self.edge_lev(f) < self.edge_lev(g) {
            std::mem::swap(&mut f, &mut g);
        }
        let ftop = self.top(f);
        if self.top(g) == ftop && f.raw() < g.raw() {
            std::mem::swap(&mut f, &mut g);
        }
        if let Some(h) = self.cache_lookup(Operation::Meet, f, g) {
            return self.acquire(h);
        }

        self.recur_inc();
        let f1 = self.onset0(f, ftop);
        let f0 = self.offset(f, ftop);
        let h = if self.top(g) != ftop {
            let a = self.meet(f0, g);
            let b = self.meet(f1, g);
            let h = self.union(a, b);
            self.release(a);
            self.release(b);
            h
        } else {
            let g1 = self.onset0(g, ftop);
            let g0 = self.offset(g, ftop);
            let a = self.meet(f1, g1);
            let ac = self.change(a, ftop);
            self.release(a);
            let b = self.meet(f0, g0);
            let c = self.meet(f1, g0);
            let d = self.meet(f0, g1);
            let ab = self.union(ac, b);
            self.release(ac);
            self.release(b);
            let abc = self.union(ab, c);
            self.release(ab);
            self.release(c);
            let h = self.union(abc, d);
            self.release(abc);
            self.release(d);
            self.release(g1);
            self.release(g0);
            h
        };
        self.release(f1);
        self.release(f0);
        self.recur_dec();

        if !h.is_null() {
            self.cache_store(Operation::Meet, f, g, h);
        }
        h
    }

    /// Members of `f` that contain some member of `g`.
    pub fn restrict(&mut self, f: Edge, g: Edge) -> Edge {
        if f.is_null() || g.is_null() {
            return Edge::NULL;
        }
        if f == Edge::FALSE || g == Edge::FALSE {
            return Edge::FALSE;
        }
        if f == g {
            return self.acquire(g);
        }
        if self.contains_empty(g) {
            return self.acquire(f);
        }
        // The empty member of f never contains a member of g here.
        let fm = self.subtract(f, Edge::TRUE);
        if fm.is_null() {
            return Edge::NULL;
        }
        let mut top = self.top(fm);
        if self.edge_lev(fm) < self.edge_lev(g) {
            top = self.top(g);
        }
        if let Some(h) = self.cache_lookup(Operation::Restrict, fm, g) {
            self.release(fm);
            return self.acquire(h);
        }

        self.recur_inc();
        let f1 = self.onset0(fm, top);
        let f0 = self.offset(fm, top);
        let g1 = self.onset0(g, top);
        let g0 = self.offset(g, top);
        let g01 = self.union(g1, g0);
        let a = self.restrict(f1, g01);
        let ac = self.change(a, top);
        self.release(a);
        let b = self.restrict(f0, g0);
        let h = self.union(ac, b);
        self.release(ac);
        self.release(b);
        self.release(g01);
        self.release(g1);
        self.release(g0);
        self.release(f1);
        self.release(f0);
        self.recur_dec();

        if !h.is_null() {
            self.cache_store(Operation::Restrict, fm, g, h);
        }
        self.release(fm);
        h
    }

    /// Members of `f` that are subsets of some member of `g`.
    pub fn permit(&mut self, f: Edge, g: Edge) -> Edge {
        if f.is_null() || g.is_null() {
            return Edge::NULL;
        }
        if f == Edge::FALSE || g == Edge::FALSE {
            return Edge::FALSE;
        }
        if f == g {
            return self.acquire(f);
        }
        if g == Edge::TRUE {
            return if self.contains_empty(f) { Edge::TRUE } else { Edge::FALSE };
        }
        if f == Edge::TRUE {
            return Edge::TRUE;
        }
        let mut top = self.top(f);
        if self.edge_lev(f) < self.edge_lev(g) {
            top = self.top(g);
        }
        if let Some(h) = self.cache_lookup(Operation::Permit, f, g) {
            return self.acquire(h);
        }

        self.recur_inc();
        let f1 = self.onset0(f, top);
        let f0 = self.offset(f, top);
        let g1 = self.onset0(g, top);
        let g0 = self.offset(g, top);
        let a = self.permit(f1, g1);
        let ac = self.change(a, top);
        self.release(a);
        let g01 = self.union(g0, g1);
        let b = self.permit(f0, g01);
        self.release(g01);
        let h = self.union(ac, b);
        self.release(ac);
        self.release(b);
        self.release(g1);
        self.release(g0);
        self.release(f1);
        self.release(f0);
        self.recur_dec();

        if !h.is_null() {
            self.cache_store(Operation::Permit, f, g, h);
        }
        h
    }

    /// Members of `f` of size at most `k`.
    pub fn permit_sym(&mut self, f: Edge, k: u64) -> Edge {
        if f.is_null() {
            return Edge::NULL;
        }
        if f == Edge::FALSE {
            return Edge::FALSE;
        }
        if f == Edge::TRUE {
            return Edge::TRUE;
        }
        if k < 1 {
            return if self.contains_empty(f) { Edge::TRUE } else { Edge::FALSE };
        }
        let kk = Edge::from_raw(k);
        if let Some(h) = self.cache_lookup(Operation::PermitSym, f, kk) {
            return self.acquire(h);
        }

        self.recur_inc();
        let top = self.top(f);
        let f1 = self.onset0(f, top);
        let f0 = self.offset(f, top);
        let a = self.permit_sym(f1, k - 1);
        let ac = self.change(a, top);
        self.release(a);
        let b = self.permit_sym(f0, k);
        let h = self.union(ac, b);
        self.release(ac);
        self.release(b);
        self.release(f1);
        self.release(f0);
        self.recur_dec();

        if !h.is_null() {
            self.cache_store(Operation::PermitSym, f, kk, h);
        }
        h
    }

    /// ZDD of the variables present in every member of `f`.
    pub fn always(&mut self, f: Edge) -> Edge {
        if f.is_null() {
            return Edge::NULL;
        }
        if f == Edge::FALSE || f == Edge::TRUE {
            return Edge::FALSE;
        }
        if let Some(h) = self.cache_lookup(Operation::Always, f, Edge::FALSE) {
            return self.acquire(h);
        }

        self.recur_inc();
        let t = self.top(f);
        let f1 = self.onset0(f, t);
        let f0 = self.offset(f, t);
        let mut h = self.always(f1);
        if f0 == Edge::FALSE {
            let s = self.zvar(t);
            let u = self.union(h, s);
            self.release(h);
            self.release(s);
            h = u;
        } else if h != Edge::FALSE {
            let a = self.always(f0);
            let u = self.intersec(h, a);
            self.release(h);
            self.release(a);
            h = u;
        }
        self.release(f1);
        self.release(f0);
        self.recur_dec();

        if !h.is_null() {
            self.cache_store(Operation::Always, f, Edge::FALSE, h);
        }
        h
    }

    /// Whether swapping `v1` and `v2` maps `f` onto itself.
    pub fn sym_check(&mut self, f: Edge, v1: VarId, v2: VarId) -> bool {
        if v1 == 0 || v1 > self.var_count() {
            panic!("sym_check: invalid variable id {}", v1);
        }
        if v2 == 0 || v2 > self.var_count() {
            panic!("sym_check: invalid variable id {}", v2);
        }
        if f.is_null() {
            return false;
        }
        if f.is_const() || v1 == v2 {
            return true;
        }
        let (v1, v2) = if v1 < v2 { (v2, v1) } else { (v1, v2) };

        let s1 = self.zvar(v1);
        let s2 = self.zvar(v2);
        let s = self.union(s1, s2);
        self.release(s1);
        self.release(s2);
        if let Some(h) = self.cache_lookup(Operation::SymChk, f, s) {
            self.release(s);
            return h.raw() != 0;
        }

        self.recur_inc();
        let t = self.top(f);
        let y = if self.lev_of_var(t) > self.lev_of_var(v1) {
            let f1 = self.onset0(f, t);
            let mut y = self.sym_check(f1, v1, v2);
            self.release(f1);
            if y {
                let f0 = self.offset(f, t);
                y = self.sym_check(f0, v1, v2);
                self.release(f0);
            }
            y
        } else {
            let f0 = self.offset(f, v1);
            let f1 = self.onset0(f, v1);
            let t0 = self.top(f0);
            let t1 = self.top(f1);
            let t2 = if self.edge_lev(f0) > self.edge_lev(f1) { t0 } else { t1 };
            let y = if t2 == 0 || self.lev_of_var(t2) <= self.lev_of_var(v2) {
                let a = self.onset0(f0, v2);
                let b = self.offset(f1, v2);
                let y = a == b;
                self.release(a);
                self.release(b);
                y
            } else {
                let a = self.offset(f0, t2);
                let b = self.offset(f1, t2);
                let bc = self.change(b, t2);
                self.release(b);
                let g0 = self.union(a, bc);
                self.release(a);
                self.release(bc);
                let c = self.onset0(f0, t2);
                let d = self.onset0(f1, t2);
                let dc = self.change(d, t2);
                self.release(d);
                let g1 = self.union(c, dc);
                self.release(c);
                self.release(dc);
                let mut y = self.sym_check(g1, t2, v2);
                if y {
                    y = self.sym_check(g0, t2, v2);
                }
                self.release(g0);
                self.release(g1);
                y
            };
            self.release(f0);
            self.release(f1);
            y
        };
        self.recur_dec();

        self.cache_store(Operation::SymChk, f, s, Edge::from_raw(y as u64));
        self.release(s);
        y
    }

    fn symset_pair(&mut self, f0: Edge, f1: Edge) -> Edge {
        if f0.is_null() || f1.is_null() {
            return Edge::NULL;
        }
        if f1 == Edge::FALSE {
            return Edge::FALSE;
        }
        if f1 == Edge::TRUE && f0.is_const() {
            return Edge::FALSE;
        }
        if let Some(h) = self.cache_lookup(Operation::SymSet, f0, f1) {
            return self.acquire(h);
        }

        self.recur_inc();
        let t = if self.edge_lev(f0) > self.edge_lev(f1) {
            self.top(f0)
        } else {
            self.top(f1)
        };
        let f00 = self.offset(f0, t);
        let f01 = self.onset0(f0, t);
        let f10 = self.offset(f1, t);
        let f11 = self.onset0(f1, t);

        let mut h = if f11 == Edge::FALSE {
            let a = self.symset_pair(f00, f10);
            let sup = self.support(f01);
            let h = self.subtract(a, sup);
            self.release(a);
            self.release(sup);
            h
        } else if f10 == Edge::FALSE {
            let a = self.symset_pair(f01, f11);
            let sup = self.support(f00);
            let h = self.subtract(a, sup);
            self.release(a);
            self.release(sup);
            h
        } else {
            let mut h = self.symset_pair(f01, f11);
            if h != Edge::FALSE && !h.is_null() {
                let b = self.symset_pair(f00, f10);
                let t2 = self.intersec(h, b);
                self.release(h);
                self.release(b);
                h = t2;
            }
            h
        };
        if f10 == f01 {
            let s = self.zvar(t);
            let u = self.union(h, s);
            self.release(h);
            self.release(s);
            h = u;
        }
        self.release(f00);
        self.release(f01);
        self.release(f10);
        self.release(f11);
        self.recur_dec();

        if !h.is_null() {
            self.cache_store(Operation::SymSet, f0, f1, h);
        }
        h
    }

    /// Variables symmetric to `v` in `f`.
    pub fn symset(&mut self, f: Edge, v: VarId) -> Edge {
        if v == 0 || v > self.var_count() {
            panic!("symset: invalid variable id {}", v);
        }
        if f.is_null() {
            return Edge::NULL;
        }
        let f0 = self.offset(f, v);
        let f1 = self.onset0(f, v);
        let h = self.symset_pair(f0, f1);
        self.release(f0);
        self.release(f1);
        h
    }

    /// Whether the presence of `v1` implies the presence of `v2` in every
    /// member of `f`.
    pub fn imply_chk(&mut self, f: Edge, v1: VarId, v2: VarId) -> bool {
        if f.is_null() {
            return false;
        }
        if v1 == v2 || f.is_const() {
            return true;
        }
        let a = self.onset0(f, v1);
        let f10 = self.offset(a, v2);
        self.release(a);
        let y = f10 == Edge::FALSE;
        self.release(f10);
        y
    }

    /// Variables implied by `v` in `f`.
    pub fn imply_set(&mut self, f: Edge, v: VarId) -> Edge {
        if f.is_null() {
            return Edge::NULL;
        }
        let f1 = self.onset0(f, v);
        if f1 == Edge::FALSE {
            return self.support(f);
        }
        let h = self.always(f1);
        self.release(f1);
        h
    }

    /// Whether every member of `f` without `v1` but with `v2` has a
    /// counterpart with `v1` and without `v2`.
    pub fn coimply_chk(&mut self, f: Edge, v1: VarId, v2: VarId) -> bool {
        if f.is_null() {
            return false;
        }
        if v1 == v2 || f.is_const() {
            return true;
        }
        let a = self.onset0(f, v1);
        let f10 = self.offset(a, v2);
        self.release(a);
        if f10 == Edge::FALSE {
            return true;
        }
        let b = self.offset(f, v1);
        let f01 = self.onset0(b, v2);
        self.release(b);
        let chk = self.subtract(f10, f01);
        let y = chk == Edge::FALSE;
        self.release(chk);
        self.release(f10);
        self.release(f01);
        y
    }

    fn coimply_pair(&mut self, f0: Edge, f1: Edge) -> Edge {
        if f0.is_null() || f1.is_null() {
            return Edge::NULL;
        }
        if f1 == Edge::FALSE {
            return Edge::FALSE;
        }
        if f1 == Edge::TRUE && f0.is_const() {
            return Edge::FALSE;
        }
        if let Some(h) = self.cache_lookup(Operation::CoImplySet, f0, f1) {
            return self.acquire(h);
        }

        self.recur_inc();
        let t = if self.edge_lev(f0) > self.edge_lev(f1) {
            self.top(f0)
        } else {
            self.top(f1)
        };
        let f00 = self.offset(f0, t);
        let f01 = self.onset0(f0, t);
        let f10 = self.offset(f1, t);
        let f11 = self.onset0(f1, t);

        let mut h = if f11 == Edge::FALSE {
            self.coimply_pair(f00, f10)
        } else if f10 == Edge::FALSE {
            self.coimply_pair(f01, f11)
        } else {
            let mut h = self.coimply_pair(f01, f11);
            if h != Edge::FALSE && !h.is_null() {
                let b = self.coimply_pair(f00, f10);
                let t2 = self.intersec(h, b);
                self.release(h);
                self.release(b);
                h = t2;
            }
            h
        };
        let d = self.subtract(f10, f01);
        if d == Edge::FALSE {
            let s = self.zvar(t);
            let u = self.union(h, s);
            self.release(h);
            self.release(s);
            h = u;
        }
        self.release(d);
        self.release(f00);
        self.release(f01);
        self.release(f10);
        self.release(f11);
        self.recur_dec();

        if !h.is_null() {
            self.cache_store(Operation::CoImplySet, f0, f1, h);
        }
        h
    }

    /// Variables co-implied by `v` in `f`.
    pub fn coimply_set(&mut self, f: Edge, v: VarId) -> Edge {
        if f.is_null() {
            return Edge::NULL;
        }
        let f0 = self.offset(f, v);
        let f1 = self.onset0(f, v);
        if f1 == Edge::FALSE {
            self.release(f0);
            return self.support(f);
        }
        let h = self.coimply_pair(f0, f1);
        self.release(f0);
        self.release(f1);
        h
    }

    /// Swaps variables `v1` and `v2` in every member of `f`.
    pub fn swap_vars(&mut self, f: Edge, v1: VarId, v2: VarId) -> Edge {
        if f.is_null() {
            return Edge::NULL;
        }
        if v1 == v2 {
            return self.acquire(f);
        }
        let a = self.offset(f, v1);
        let f00 = self.offset(a, v2);
        self.release(a);
        let b = self.onset(f, v1);
        let f11 = self.onset(b, v2);
        self.release(b);
        let c = self.subtract(f, f00);
        let d = self.subtract(c, f11);
        self.release(c);
        let e = self.change(d, v1);
        self.release(d);
        let e2 = self.change(e, v2);
        self.release(e);
        let u = self.union(e2, f00);
        self.release(e2);
        let h = self.union(u, f11);
        self.release(u);
        self.release(f00);
        self.release(f11);
        h
    }

    // ---------- level-skip cache ----------

    /// The deepest descendant reached from `f` through 0-edges whose level
    /// is still at least `lev`. With `last` set, returns the last node
    /// strictly above `lev` when no node sits exactly at `lev`. Consults the
    /// `ZSkip` cache for long descents.
    pub fn zlev(&mut self, f: Edge, lev: Level, last: bool) -> Edge {
        if f.is_null() {
            return Edge::NULL;
        }
        if lev == 0 {
            return if self.contains_empty(f) { Edge::TRUE } else { Edge::FALSE };
        }
        let mut f = self.acquire(f);
        let mut u = if self.contains_empty(f) { Edge::TRUE } else { Edge::FALSE };
        loop {
            let flev = self.edge_lev(f);
            if flev <= lev {
                break;
            }
            if flev - lev >= 5 {
                let g = self.cache_read(Operation::ZSkip as u8, f, f);
                if !g.is_null() {
                    let glev = self.edge_lev(g);
                    if glev >= lev {
                        self.acquire(g);
                        self.release(f);
                        f = g;
                        continue;
                    }
                }
            }
            let ftop = self.top(f);
            self.release(u);
            u = f;
            f = self.offset(u, ftop);
        }
        if !last || lev == self.edge_lev(f) {
            self.release(u);
            f
        } else {
            self.release(f);
            u
        }
    }

    /// Populates the level-skip cache for every node reachable from `f`,
    /// post-order. Entries are weak; garbage collection scrubs them.
    pub fn set_zskip(&mut self, f: Edge) {
        if f.is_null() || f.is_const() {
            return;
        }
        let t = self.top(f);
        let lev = self.lev_of_var(t);
        if lev <= 4 {
            return;
        }
        if !self.cache_read(Operation::ZSkip as u8, f, f).is_null() {
            return;
        }
        self.recur_inc();
        let f0 = self.offset(f, t);
        self.set_zskip(f0);
        let g = self.zlev(f, zskip_target(lev), true);
        let g = if g == f {
            self.release(g);
            f0
        } else {
            self.release(f0);
            g
        };
        self.cache_store(Operation::ZSkip, f, f, g);
        self.release(g);
        let f1 = self.onset0(f, t);
        self.set_zskip(f1);
        self.release(f1);
        self.recur_dec();
    }

    /// Intersection variant that hops over long 0-edge chains using the
    /// level-skip cache.
    pub fn intersec_with_skip(&mut self, f: Edge, g: Edge) -> Edge {
        if f.is_null() || g.is_null() {
            return Edge::NULL;
        }
        if g == Edge::FALSE {
            return Edge::FALSE;
        }
        if g == Edge::TRUE {
            return if self.contains_empty(f) { Edge::TRUE } else { Edge::FALSE };
        }
        if f.is_const() {
            return self.intersec(f, g);
        }
        let (kf, kg) = if f.raw() < g.raw() { (g, f) } else { (f, g) };
        if let Some(h) = self.cache_lookup(Operation::IntersecSkip, kf, kg) {
            return self.acquire(h);
        }

        self.recur_inc();
        let ftop = self.top(f);
        let gtop = self.top(g);
        let flev = self.lev_of_var(ftop);
        let glev = self.lev_of_var(gtop);
        let h = if flev > glev {
            let fz = self.zlev(f, glev, false);
            let h = self.intersec_with_skip(fz, g);
            self.release(fz);
            h
        } else if flev < glev {
            let g0 = self.offset(g, gtop);
            let h = self.intersec_with_skip(f, g0);
            self.release(g0);
            h
        } else {
            let f1 = self.onset0(f, ftop);
            let g1 = self.onset0(g, ftop);
            let a = self.intersec_with_skip(f1, g1);
            self.release(f1);
            self.release(g1);
            let ac = self.change(a, ftop);
            self.release(a);
            let f0 = self.offset(f, ftop);
            let g0 = self.offset(g, ftop);
            let b = self.intersec_with_skip(f0, g0);
            self.release(f0);
            self.release(g0);
            let h = self.union(ac, b);
            self.release(ac);
            self.release(b);
            h
        };
        self.recur_dec();

        if !h.is_null() {
            self.cache_store(Operation::IntersecSkip, kf, kg, h);
        }
        h
    }
}
