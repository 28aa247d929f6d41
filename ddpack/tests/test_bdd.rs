use ddpack::prelude::*;

#[test]
fn tiny_and_or() {
    let mut dd = DdManager::default();
    let vc = dd.new_var();
    let vb = dd.new_var();
    let va = dd.new_var();
    // a above b above c
    assert!(dd.lev_of_var(va) > dd.lev_of_var(vb));
    let a = dd.var(va);
    let b = dd.var(vb);
    let c = dd.var(vc);
    let bc = dd.or(b, c);
    let f = dd.and(a, bc);
    assert_eq!(dd.size(f), 3);
    let at1 = dd.at1(f, va);
    assert_eq!(at1, bc);
    let at0 = dd.at0(f, va);
    assert_eq!(at0, Edge::FALSE);
    for e in [a, b, c, bc, f, at1, at0] {
        dd.release(e);
    }
}

#[test]
fn complement_edges_are_canonical() {
    let mut dd = DdManager::default();
    let va = dd.new_var();
    let vb = dd.new_var();
    let a = dd.var(va);
    let b = dd.var(vb);
    // not(and(a, b)) built two ways must be bit-identical.
    let ab = dd.and(a, b);
    let lhs = dd.not(ab);
    let rhs = dd.or(a.flip(), b.flip());
    assert_eq!(lhs, rhs);
    for e in [a, b, ab, lhs, rhs] {
        dd.release(e);
    }
}

#[test]
fn xor_and_derivatives() {
    let mut dd = DdManager::default();
    let va = dd.new_var();
    let vb = dd.new_var();
    let a = dd.var(va);
    let b = dd.var(vb);
    let x1 = dd.xor(a, b);
    let x2 = dd.xor(b, a);
    assert_eq!(x1, x2);
    let xn = dd.xnor(a, b);
    assert_eq!(xn, x1.flip());
    let self_xor = dd.xor(a, a);
    assert_eq!(self_xor, Edge::FALSE);
    for e in [a, b, x1, x2, xn] {
        dd.release(e);
    }
}

#[test]
fn cofactor_by_cube() {
    let mut dd = DdManager::default();
    let vc = dd.new_var();
    let vb = dd.new_var();
    let va = dd.new_var();
    let a = dd.var(va);
    let b = dd.var(vb);
    let c = dd.var(vc);
    let bc = dd.and(b, c);
    let f = dd.or(a, bc);
    // Restricting to a = 1 collapses to true.
    let h = dd.cofactor(f, a);
    assert_eq!(h, Edge::TRUE);
    for e in [a, b, c, bc, f, h] {
        dd.release(e);
    }
}

#[test]
fn quantification() {
    let mut dd = DdManager::default();
    let vb = dd.new_var();
    let va = dd.new_var();
    let a = dd.var(va);
    let b = dd.var(vb);
    let f = dd.and(a, b);
    let cube = dd.support(f);
    let all = dd.universal(f, cube);
    assert_eq!(all, Edge::FALSE);
    let some = dd.exist(f, cube);
    assert_eq!(some, Edge::TRUE);
    let ex_a = dd.support(a);
    let g = dd.exist(f, ex_a);
    assert_eq!(g, b);
    for e in [a, b, f, cube, all, some, ex_a, g] {
        dd.release(e);
    }
}

#[test]
fn shift_moves_levels() {
    let mut dd = DdManager::default();
    let v1 = dd.new_var();
    let v2 = dd.new_var();
    let f = dd.var(v1);
    let g = dd.lshift(f, 1);
    let expect = dd.var(v2);
    assert_eq!(g, expect);
    let back = dd.rshift(g, 1);
    assert_eq!(back, f);
    for e in [f, g, expect, back] {
        dd.release(e);
    }
}

#[test]
fn imply_is_and_false_check() {
    let mut dd = DdManager::default();
    let va = dd.new_var();
    let vb = dd.new_var();
    let a = dd.var(va);
    let b = dd.var(vb);
    let ab = dd.and(a, b);
    let or = dd.or(a, b);
    assert!(dd.imply(ab, or));
    assert!(!dd.imply(or, ab));
    let and_not = dd.and(ab, or.flip());
    assert_eq!(and_not, Edge::FALSE);
    for e in [a, b, ab, or] {
        dd.release(e);
    }
}

#[test]
fn gc_reclaims_everything() {
    let mut dd = DdManager::new(256, 1024);
    for round in 0..50 {
        let mut acc = Edge::FALSE;
        for i in 0..20 {
            let v = if dd.var_count() < 20 {
                dd.new_var()
            } else {
                (i % 20) + 1
            };
            let x = dd.var(v);
            let t = dd.or(acc, x);
            dd.release(acc);
            dd.release(x);
            acc = t;
            assert!(!acc.is_null(), "round {} ran out of nodes", round);
        }
        dd.release(acc);
    }
    dd.gc();
    assert_eq!(dd.node_used(), 0);
}
