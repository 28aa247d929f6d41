/// Core recursive operation over the shared store.
///
/// Every kernel operation follows the same shape: terminal shortcuts,
/// operand canonicalisation for cache-key stability, cache lookup,
/// decomposition at the higher top variable, recursion on the cofactors,
/// recomposition through the canonical constructors, cache insert.
///
/// Operands are borrowed; results are owned (one reference transferred to
/// the caller). `Edge::NULL` propagates out of memory: every level releases
/// its partial results before returning it.
///
/// The quantitative codes (`Card`, `Lit`, `Len`) run through the same
/// routine but their "edges" are raw counters saturating at the null value.
use common::prelude::*;

use crate::cache::Operation;
use crate::manager::DdManager;

const NULLV: u64 = Edge::NULL.raw();

impl DdManager {
    pub(crate) fn apply(&mut self, op: Operation, f: Edge, g: Edge, skip: bool) -> Edge {
        use Operation as Op;
        let mut f = f;
        let mut g = g;

        if !skip {
            match op {
                Op::And => {
                    if f == Edge::FALSE || g == Edge::FALSE || f == g.flip() {
                        return Edge::FALSE;
                    }
                    if f == g {
                        return self.acquire(f);
                    }
                    if f == Edge::TRUE {
                        return self.acquire(g);
                    }
                    if g == Edge::TRUE {
                        return self.acquire(f);
                    }
                    if f.raw() < g.raw() {
                        std::mem::swap(&mut f, &mut g);
                    }
                }
                Op::Xor => {
                    if f == g {
                        return Edge::FALSE;
                    }
                    if f == g.flip() {
                        return Edge::TRUE;
                    }
                    if f == Edge::FALSE {
                        return self.acquire(g);
                    }
                    if g == Edge::FALSE {
                        return self.acquire(f);
                    }
                    if f == Edge::TRUE {
                        return self.acquire(g).flip();
                    }
                    if g == Edge::TRUE {
                        return self.acquire(f).flip();
                    }
                    // XOR is polarity-symmetric up to output negation: push
                    // complement bits out of the operands.
                    if f.neg() && g.neg() {
                        f = f.flip();
                        g = g.flip();
                    } else if f.neg() || g.neg() {
                        f = f.abs();
                        g = g.abs();
                        let h = if f.raw() < g.raw() {
                            self.apply(op, g, f, true)
                        } else {
                            self.apply(op, f, g, true)
                        };
                        if h.is_null() {
                            return Edge::NULL;
                        }
                        return h.flip();
                    }
                    if f.raw() < g.raw() {
                        std::mem::swap(&mut f, &mut g);
                    }
                }
                Op::Cofactor => {
                    if f.is_const() {
                        return f;
                    }
                    if g == Edge::FALSE || f == g.flip() {
                        return Edge::FALSE;
                    }
                    if f == g {
                        return Edge::TRUE;
                    }
                    if g == Edge::TRUE {
                        return self.acquire(f);
                    }
                }
                Op::Univ => {
                    if f.is_const() {
                        return f;
                    }
                    if g.is_const() {
                        return self.acquire(f);
                    }
                    if g.neg() {
                        g = g.flip();
                    }
                }
                Op::Support => {
                    if f.is_const() {
                        return Edge::FALSE;
                    }
                    if f.neg() {
                        f = f.abs();
                    }
                }
                Op::Intersec => {
                    if f == Edge::FALSE || g == Edge::FALSE {
                        return Edge::FALSE;
                    }
                    if f == Edge::TRUE {
                        return if g.neg() { Edge::TRUE } else { Edge::FALSE };
                    }
                    if g == Edge::TRUE {
                        return if f.neg() { Edge::TRUE } else { Edge::FALSE };
                    }
                    if f == g {
                        return self.acquire(f);
                    }
                    if f == g.flip() {
                        return self.acquire(f).abs();
                    }
                    if f.raw() < g.raw() {
                        std::mem::swap(&mut f, &mut g);
                    }
                }
                Op::Union => {
                    if f == Edge::FALSE {
                        return self.acquire(g);
                    }
                    if f == Edge::TRUE {
                        let h = self.acquire(g);
                        return if h.neg() { h } else { h.flip() };
                    }
                    if g == Edge::FALSE || f == g {
                        return self.acquire(f);
                    }
                    if g == Edge::TRUE || f == g.flip() {
                        let h = self.acquire(f);
                        return if h.neg() { h } else { h.flip() };
                    }
                    if f.raw() < g.raw() {
                        std::mem::swap(&mut f, &mut g);
                    }
                }
                Op::Subtract => {
                    if f == Edge::FALSE || f == g {
                        return Edge::FALSE;
                    }
                    if f == Edge::TRUE || f == g.flip() {
                        return if g.neg() { Edge::FALSE } else { Edge::TRUE };
                    }
                    if g == Edge::FALSE {
                        return self.acquire(f);
                    }
                    if g == Edge::TRUE {
                        return self.acquire(f).abs();
                    }
                }
                Op::At0 | Op::At1 | Op::Offset => {
                    if f.is_const() {
                        return f;
                    }
                    let flev = self.edge_lev(f);
                    let glev = self.lev_of_var(g.raw() as VarId);
                    if flev < glev {
                        return self.acquire(f);
                    }
                    if flev == glev {
                        let (slo, shi) = self.raw_children(f.index());
                        let h = if op != Op::At1 {
                            if f.neg() != slo.neg() {
                                slo.flip()
                            } else {
                                slo
                            }
                        } else if f.neg() {
                            shi.flip()
                        } else {
                            shi
                        };
                        return self.acquire(h);
                    }
                    if f.neg() {
                        let h = self.apply(op, f.flip(), g, true);
                        if h.is_null() {
                            return Edge::NULL;
                        }
                        return h.flip();
                    }
                }
                Op::Onset => {
                    if f.is_const() {
                        return Edge::FALSE;
                    }
                    let flev = self.edge_lev(f);
                    let glev = self.lev_of_var(g.raw() as VarId);
                    if flev < glev {
                        return Edge::FALSE;
                    }
                    if flev == glev {
                        let (_, shi) = self.raw_children(f.index());
                        return self.acquire(shi);
                    }
                    if f.neg() {
                        f = f.abs();
                    }
                }
                Op::Change => {
                    if f == Edge::FALSE {
                        return f;
                    }
                    let v = g.raw() as VarId;
                    if f.is_const() {
                        return self.make_zdd(v, Edge::FALSE, f);
                    }
                    let flev = self.edge_lev(f);
                    let glev = self.lev_of_var(v);
                    if flev < glev {
                        self.acquire(f);
                        let h = self.make_zdd(v, Edge::FALSE, f);
                        if h.is_null() {
                            self.release(f);
                        }
                        return h;
                    }
                    if flev == glev {
                        let (slo, shi) = self.raw_children(f.index());
                        let h0 = shi;
                        let h1 = if f.neg() != slo.neg() { slo.flip() } else { slo };
                        self.acquire(h0);
                        self.acquire(h1);
                        let h = self.make_zdd(v, h0, h1);
                        if h.is_null() {
                            self.release(h0);
                            self.release(h1);
                        }
                        return h;
                    }
                }
                Op::LShift | Op::RShift => {
                    if f.is_const() {
                        return f;
                    }
                    if f.neg() {
                        let h = self.apply(op, f.flip(), g, true);
                        if h.is_null() {
                            return Edge::NULL;
                        }
                        return h.flip();
                    }
                }
                Op::Card => {
                    if f.is_const() {
                        return Edge::from_raw(if f == Edge::FALSE { 0 } else { 1 });
                    }
                    if f.neg() {
                        let h = self.apply(op, f.abs(), g, true);
                        let x = h.raw().saturating_add(1);
                        return if x >= NULLV { Edge::NULL } else { Edge::from_raw(x) };
                    }
                }
                Op::Lit | Op::Len => {
                    if f.is_const() {
                        return Edge::from_raw(0);
                    }
                    if f.neg() {
                        f = f.abs();
                    }
                }
                _ => panic!("apply: unexpected operation {:?}", op),
            }
        }

        match op {
            Op::And
            | Op::Xor
            | Op::Cofactor
            | Op::Univ
            | Op::Intersec
            | Op::Union
            | Op::Subtract => self.apply_binary(op, f, g),
            Op::At0
            | Op::At1
            | Op::LShift
            | Op::RShift
            | Op::Support
            | Op::Offset
            | Op::Onset
            | Op::Change => self.apply_unary(op, f, g),
            Op::Card | Op::Lit | Op::Len => self.apply_count(op, f),
            _ => panic!("apply: unexpected operation {:?}", op),
        }
    }

    fn apply_binary(&mut self, op: Operation, f: Edge, g: Edge) -> Edge {
        use Operation as Op;
        // Operands with a single owner cannot recur, so a cache entry would
        // never be hit again.
        let use_cache = !((f.is_const() || self.rfc_one(f.index()))
            && (g.is_const() || self.rfc_one(g.index())));
        if use_cache {
            if let Some(h) = self.cache_lookup(op, f, g) {
                return self.acquire(h);
            }
        }

        let mut z = false;
        let flev = self.edge_lev(f);
        let glev = self.edge_lev(g);
        let (mut f0, mut f1) = (f, f);
        let (mut g0, mut g1) = (g, g);
        let mut v: VarId = 0;

        if flev <= glev {
            let gn = self.node(g);
            v = gn.var();
            let (slo, shi) = (gn.lo, gn.hi);
            if gn.is_zdd() {
                z = true;
                if flev < glev {
                    // The lower operand does not split on a ZDD variable.
                    f1 = Edge::FALSE;
                }
            }
            g0 = slo;
            g1 = shi;
            if g.neg() != g0.neg() {
                g0 = g0.flip();
            }
            if g.neg() && !z {
                g1 = g1.flip();
            }
        }
        if flev >= glev {
            let fnode = self.node(f);
            v = fnode.var();
            let (slo, shi) = (fnode.lo, fnode.hi);
            if fnode.is_zdd() {
                z = true;
                if flev > glev {
                    g1 = Edge::FALSE;
                }
            }
            f0 = slo;
            f1 = shi;
            if f.neg() != f0.neg() {
                f0 = f0.flip();
            }
            if f.neg() && !z {
                f1 = f1.flip();
            }
        }

        self.recur_inc();
        let h = match op {
            Op::Cofactor => {
                if g0 == Edge::FALSE && g1 != Edge::FALSE {
                    self.apply(op, f1, g1, false)
                } else if g1 == Edge::FALSE && g0 != Edge::FALSE {
                    self.apply(op, f0, g0, false)
                } else {
                    self.compose(op, v, z, f0, g0, f1, g1)
                }
            }
            Op::Univ => {
                if g0 != g1 {
                    let h0 = self.apply(op, f0, g0, false);
                    if h0.is_null() {
                        Edge::NULL
                    } else {
                        let h1 = self.apply(op, f1, g0, false);
                        if h1.is_null() {
                            self.release(h0);
                            Edge::NULL
                        } else {
                            let h = self.apply(Op::And, h0, h1, false);
                            self.release(h0);
                            self.release(h1);
                            h
                        }
                    }
                } else {
                    self.compose(op, v, z, f0, g0, f1, g1)
                }
            }
            _ => self.compose(op, v, z, f0, g0, f1, g1),
        };
        self.recur_dec();

        if use_cache && !h.is_null() {
            self.cache_store(op, f, g, h);
        }
        h
    }

    /// Recurses on both cofactors and rebuilds a node of the requested kind.
    fn compose(
        &mut self,
        op: Operation,
        v: VarId,
        z: bool,
        f0: Edge,
        g0: Edge,
        f1: Edge,
        g1: Edge,
    ) -> Edge {
        let h0 = self.apply(op, f0, g0, false);
        if h0.is_null() {
            return Edge::NULL;
        }
        let h1 = self.apply(op, f1, g1, false);
        if h1.is_null() {
            self.release(h0);
            return Edge::NULL;
        }
        let h = if z {
            self.make_zdd(v, h0, h1)
        } else {
            self.make_bdd(v, h0, h1)
        };
        if h.is_null() {
            self.release(h0);
            self.release(h1);
        }
        h
    }

    fn apply_unary(&mut self, op: Operation, f: Edge, g: Edge) -> Edge {
        use Operation as Op;
        let use_cache = !self.rfc_one(f.index());
        if use_cache {
            if let Some(h) = self.cache_lookup(op, f, g) {
                return self.acquire(h);
            }
        }

        let fnode = self.node(f);
        let mut v = fnode.var();
        let z = fnode.is_zdd();
        let mut f0 = fnode.lo;
        let mut f1 = fnode.hi;
        if f.neg() != f0.neg() {
            f0 = f0.flip();
        }
        if f.neg() && !z {
            f1 = f1.flip();
        }

        self.recur_inc();
        let h = match op {
            Op::Support => {
                let h0 = self.apply(op, f0, Edge::FALSE, false);
                if h0.is_null() {
                    Edge::NULL
                } else {
                    let h1 = self.apply(op, f1, Edge::FALSE, false);
                    if h1.is_null() {
                        self.release(h0);
                        Edge::NULL
                    } else {
                        let s = if z {
                            self.apply(Op::Union, h0, h1, false)
                        } else {
                            self.apply(Op::And, h0.flip(), h1.flip(), false)
                        };
                        self.release(h0);
                        self.release(h1);
                        if s.is_null() {
                            Edge::NULL
                        } else {
                            let h = if z {
                                self.make_zdd(v, s, Edge::TRUE)
                            } else {
                                self.make_bdd(v, s.flip(), Edge::TRUE)
                            };
                            if h.is_null() {
                                self.release(s);
                            }
                            h
                        }
                    }
                }
            }
            Op::LShift | Op::RShift => {
                let flev = self.lev_of_var(v);
                let shift = g.raw() as Level;
                let newlev = if op == Op::LShift {
                    let nl = flev + shift;
                    if nl > self.var_count() {
                        panic!("shift: level {} out of range", nl);
                    }
                    nl
                } else {
                    if shift >= flev {
                        panic!("shift: level underflow at variable {}", v);
                    }
                    flev - shift
                };
                v = self.var_of_lev(newlev);
                self.compose_unary(op, v, z, f0, f1, g)
            }
            _ => self.compose_unary(op, v, z, f0, f1, g),
        };
        self.recur_dec();

        if use_cache && !h.is_null() {
            self.cache_store(op, f, g, h);
            // A fixed point under one restriction is a fixed point under the
            // other, so record the twin entry as well.
            if h == f {
                match op {
                    Op::At0 => self.cache_store(Op::At1, f, g, h),
                    Op::At1 => self.cache_store(Op::At0, f, g, h),
                    Op::Offset => self.cache_store(Op::Onset, f, g, Edge::FALSE),
                    _ => {}
                }
            }
            if h == Edge::FALSE && op == Op::Onset {
                self.cache_store(Op::Offset, f, g, f);
            }
        }
        h
    }

    fn compose_unary(
        &mut self,
        op: Operation,
        v: VarId,
        z: bool,
        f0: Edge,
        f1: Edge,
        g: Edge,
    ) -> Edge {
        let h0 = self.apply(op, f0, g, false);
        if h0.is_null() {
            return Edge::NULL;
        }
        let h1 = self.apply(op, f1, g, false);
        if h1.is_null() {
            self.release(h0);
            return Edge::NULL;
        }
        let h = if z {
            self.make_zdd(v, h0, h1)
        } else {
            self.make_bdd(v, h0, h1)
        };
        if h.is_null() {
            self.release(h0);
            self.release(h1);
        }
        h
    }

    fn apply_count(&mut self, op: Operation, f: Edge) -> Edge {
        use Operation as Op;
        let use_cache = !self.rfc_one(f.index());
        if use_cache {
            if let Some(h) = self.cache_lookup(op, f, Edge::FALSE) {
                return h;
            }
        }

        let fnode = self.node(f);
        let mut f0 = fnode.lo;
        let f1 = fnode.hi;
        if f.neg() != f0.neg() {
            f0 = f0.flip();
        }

        self.recur_inc();
        let h = match op {
            Op::Card => {
                let h0 = self.apply(op, f0, Edge::FALSE, false);
                let h1 = self.apply(op, f1, Edge::FALSE, false);
                let s = h0.raw().saturating_add(h1.raw());
                if s >= NULLV {
                    Edge::NULL
                } else {
                    Edge::from_raw(s)
                }
            }
            Op::Lit => {
                let h0 = self.apply(op, f0, Edge::FALSE, false);
                let h1 = self.apply(op, f1, Edge::FALSE, false);
                let c1 = self.apply(Op::Card, f1, Edge::FALSE, false);
                let s = h0
                    .raw()
                    .saturating_add(h1.raw())
                    .saturating_add(c1.raw());
                if s >= NULLV {
                    Edge::NULL
                } else {
                    Edge::from_raw(s)
                }
            }
            Op::Len => {
                let h0 = self.apply(op, f0, Edge::FALSE, false);
                let h1 = self.apply(op, f1, Edge::FALSE, false);
                Edge::from_raw(h0.raw().max(h1.raw().saturating_add(1)))
            }
            _ => unreachable!(),
        };
        self.recur_dec();

        if use_cache {
            self.cache_store(op, f, Edge::FALSE, h);
        }
        h
    }

    /// Apply-style search deciding whether `f ∧ g` is satisfiable without
    /// materialising a node. Only unsatisfiable results are cached (they
    /// coincide with ordinary `And` entries).
    pub(crate) fn and_false(&mut self, f: Edge, g: Edge) -> bool {
        use Operation as Op;
        if f == Edge::FALSE || g == Edge::FALSE || f == g.flip() {
            return false;
        }
        if f == Edge::TRUE || g == Edge::TRUE || f == g {
            return true;
        }
        let mut f = f;
        let mut g = g;
        if f.raw() > g.raw() {
            std::mem::swap(&mut f, &mut g);
        }

        let use_cache = !((f.is_const() || self.rfc_one(f.index()))
            && (g.is_const() || self.rfc_one(g.index())));
        if use_cache {
            if let Some(h) = self.cache_lookup(Op::And, f, g) {
                return h != Edge::FALSE;
            }
        }

        let flev = self.edge_lev(f);
        let glev = self.edge_lev(g);
        let (mut f0, mut f1) = (f, f);
        let (mut g0, mut g1) = (g, g);
        if flev <= glev {
            let gn = self.node(g);
            g0 = gn.lo;
            g1 = gn.hi;
            if g.neg() {
                g0 = g0.flip();
                g1 = g1.flip();
            }
        }
        if flev >= glev {
            let fnode = self.node(f);
            f0 = fnode.lo;
            f1 = fnode.hi;
            if f.neg() {
                f0 = f0.flip();
                f1 = f1.flip();
            }
        }

        self.recur_inc();
        let sat = self.and_false(f0, g0) || self.and_false(f1, g1);
        self.recur_dec();

        if !sat && use_cache {
            self.cache_store(Op::And, f, g, Edge::FALSE);
        }
        sat
    }
}
