/// Boolean operations over BDD edges.
///
/// Negation lives in the edge (O(1), no allocation); the binary connectives
/// reduce to `And` / `Xor` applies plus complement arithmetic. Quantification
/// takes a cube edge (a BDD describing the set of variables). Out-of-memory
/// propagates as `Edge::NULL`; applying a ZDD-marked node is a program error.
use common::prelude::*;

use crate::cache::Operation;
use crate::manager::DdManager;

impl DdManager {
    fn check_bdd(&self, name: &str, f: Edge) {
        if f.is_const() {
            if f.abs() != Edge::FALSE {
                panic!("{}: invalid edge {:#x}", name, f.raw());
            }
        } else if self.node(f).is_zdd() {
            panic!("{}: applying a ZDD node", name);
        }
    }

    fn check_var(&self, name: &str, v: VarId) {
        if v == 0 || v > self.var_count() {
            panic!("{}: invalid variable id {}", name, v);
        }
    }

    /// BDD projection of variable `v`.
    pub fn var(&mut self, v: VarId) -> Edge {
        self.check_var("var", v);
        self.make_bdd(v, Edge::FALSE, Edge::TRUE)
    }

    /// Negation: flips the complement bit of a fresh reference.
    pub fn not(&mut self, f: Edge) -> Edge {
        if f.is_null() {
            return Edge::NULL;
        }
        self.acquire(f).flip()
    }

    pub fn and(&mut self, f: Edge, g: Edge) -> Edge {
        if f.is_null() || g.is_null() {
            return Edge::NULL;
        }
        self.check_bdd("and", f);
        self.check_bdd("and", g);
        self.apply(Operation::And, f, g, false)
    }

    pub fn or(&mut self, f: Edge, g: Edge) -> Edge {
        if f.is_null() || g.is_null() {
            return Edge::NULL;
        }
        let h = self.and(f.flip(), g.flip());
        if h.is_null() {
            return Edge::NULL;
        }
        h.flip()
    }

    pub fn xor(&mut self, f: Edge, g: Edge) -> Edge {
        if f.is_null() || g.is_null() {
            return Edge::NULL;
        }
        self.check_bdd("xor", f);
        self.check_bdd("xor", g);
        self.apply(Operation::Xor, f, g, false)
    }

    pub fn nand(&mut self, f: Edge, g: Edge) -> Edge {
        let h = self.and(f, g);
        if h.is_null() {
            return Edge::NULL;
        }
        h.flip()
    }

    pub fn nor(&mut self, f: Edge, g: Edge) -> Edge {
        if f.is_null() || g.is_null() {
            return Edge::NULL;
        }
        self.and(f.flip(), g.flip())
    }

    pub fn xnor(&mut self, f: Edge, g: Edge) -> Edge {
        if g.is_null() {
            return Edge::NULL;
        }
        self.xor(f, g.flip())
    }

    /// If-then-else over BDDs.
    pub fn ite(&mut self, f: Edge, g: Edge, h: Edge) -> Edge {
        let x1 = self.and(f, g);
        let x2 = self.and(f.flip(), h);
        let r = self.or(x1, x2);
        self.release(x1);
        self.release(x2);
        r
    }

    /// Substitution `v := 0`.
    pub fn at0(&mut self, f: Edge, v: VarId) -> Edge {
        self.check_var("at0", v);
        if f.is_null() {
            return Edge::NULL;
        }
        if f.is_const() {
            return f;
        }
        self.apply(Operation::At0, f, Edge::from_raw(v as u64), false)
    }

    /// Substitution `v := 1`.
    pub fn at1(&mut self, f: Edge, v: VarId) -> Edge {
        self.check_var("at1", v);
        if f.is_null() {
            return Edge::NULL;
        }
        if f.is_const() {
            return f;
        }
        self.apply(Operation::At1, f, Edge::from_raw(v as u64), false)
    }

    /// Generalised cofactor of `f` by the cube `g`.
    pub fn cofactor(&mut self, f: Edge, g: Edge) -> Edge {
        if f.is_null() || g.is_null() {
            return Edge::NULL;
        }
        self.check_bdd("cofactor", f);
        self.check_bdd("cofactor", g);
        self.apply(Operation::Cofactor, f, g, false)
    }

    /// Universal quantification over the variables of the cube `g`.
    pub fn universal(&mut self, f: Edge, g: Edge) -> Edge {
        if f.is_null() || g.is_null() {
            return Edge::NULL;
        }
        self.check_bdd("universal", f);
        self.check_bdd("universal", g);
        self.apply(Operation::Univ, f, g, false)
    }

    /// Existential quantification over the variables of the cube `g`.
    pub fn exist(&mut self, f: Edge, g: Edge) -> Edge {
        if f.is_null() || g.is_null() {
            return Edge::NULL;
        }
        let h = self.universal(f.flip(), g);
        if h.is_null() {
            return Edge::NULL;
        }
        h.flip()
    }

    /// Whether `f → g`, decided by a non-materialising search for a
    /// satisfying leaf of `f ∧ ¬g`.
    pub fn imply(&mut self, f: Edge, g: Edge) -> bool {
        if f.is_null() || g.is_null() {
            return false;
        }
        self.check_bdd("imply", f);
        self.check_bdd("imply", g);
        !self.and_false(f, g.flip())
    }

    /// Cube of the variables appearing in `f`. Works for both kinds; the
    /// result kind follows the operand.
    pub fn support(&mut self, f: Edge) -> Edge {
        if f.is_null() {
            return Edge::NULL;
        }
        if f.is_const() {
            return Edge::FALSE;
        }
        self.apply(Operation::Support, f, Edge::FALSE, false)
    }

    /// Moves every variable of `f` up by `shift` levels.
    pub fn lshift(&mut self, f: Edge, shift: Level) -> Edge {
        if f.is_null() {
            return Edge::NULL;
        }
        if f.is_const() || shift == 0 {
            return self.acquire(f);
        }
        self.apply(Operation::LShift, f, Edge::from_raw(shift as u64), false)
    }

    /// Moves every variable of `f` down by `shift` levels.
    pub fn rshift(&mut self, f: Edge, shift: Level) -> Edge {
        if f.is_null() {
            return Edge::NULL;
        }
        if f.is_const() || shift == 0 {
            return self.acquire(f);
        }
        self.apply(Operation::RShift, f, Edge::from_raw(shift as u64), false)
    }

    /// Signed level shift; preserves the kind of the diagram.
    pub fn shift(&mut self, f: Edge, k: isize) -> Edge {
        if k >= 0 {
            self.lshift(f, k as Level)
        } else {
            self.rshift(f, (-k) as Level)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_or_basics() {
        let mut dd = DdManager::default();
        let va = dd.new_var();
        let vb = dd.new_var();
        let a = dd.var(va);
        let b = dd.var(vb);
        let ab = dd.and(a, b);
        let ba = dd.and(b, a);
        assert_eq!(ab, ba);
        let na = dd.not(a);
        let contradiction = dd.and(a, na);
        assert_eq!(contradiction, Edge::FALSE);
        let tautology = dd.or(a, na);
        assert_eq!(tautology, Edge::TRUE);
        for e in [a, b, ab, ba, na] {
            dd.release(e);
        }
    }

    #[test]
    fn de_morgan() {
        let mut dd = DdManager::default();
        let va = dd.new_var();
        let vb = dd.new_var();
        let a = dd.var(va);
        let b = dd.var(vb);
        let lhs = dd.nand(a, b);
        let rhs = dd.or(a.flip(), b.flip());
        assert_eq!(lhs, rhs);
        for e in [a, b, lhs, rhs] {
            dd.release(e);
        }
    }

    #[test]
    fn double_negation() {
        let mut dd = DdManager::default();
        let v = dd.new_var();
        let a = dd.var(v);
        let na = dd.not(a);
        let nna = dd.not(na);
        assert_eq!(nna, a);
        for e in [a, na, nna] {
            dd.release(e);
        }
    }

    #[test]
    fn imply_matches_and() {
        let mut dd = DdManager::default();
        let va = dd.new_var();
        let vb = dd.new_var();
        let a = dd.var(va);
        let b = dd.var(vb);
        let ab = dd.and(a, b);
        assert!(dd.imply(ab, a));
        assert!(!dd.imply(a, b));
        for e in [a, b, ab] {
            dd.release(e);
        }
    }
}
