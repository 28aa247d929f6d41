use ddpack::prelude::*;
use frontier::prelude::*;

/// Subsets of {1..n} with at most k elements; state is the running count.
struct UpperBound {
    n: usize,
    k: u32,
}

impl DdSpec for UpperBound {
    fn state_size(&self) -> usize {
        4
    }

    fn get_root(&mut self, state: &mut [u8]) -> i32 {
        state.copy_from_slice(&0u32.to_ne_bytes());
        self.n as i32
    }

    fn get_child(&mut self, state: &mut [u8], level: i32, branch: u8) -> i32 {
        let mut count = u32::from_ne_bytes(state[..4].try_into().unwrap());
        count += branch as u32;
        if count > self.k {
            return 0;
        }
        state.copy_from_slice(&count.to_ne_bytes());
        if level == 1 {
            -1
        } else {
            level - 1
        }
    }
}

/// Subsets of {1..n} containing at least one of the lowest `need` elements.
struct NeedsLowElement {
    n: usize,
    need: usize,
}

impl DdSpec for NeedsLowElement {
    fn state_size(&self) -> usize {
        1
    }

    fn get_root(&mut self, state: &mut [u8]) -> i32 {
        state[0] = 0;
        self.n as i32
    }

    fn get_child(&mut self, state: &mut [u8], level: i32, branch: u8) -> i32 {
        if branch == 1 && (level as usize) <= self.need {
            state[0] = 1;
        }
        if level == 1 {
            if state[0] == 1 {
                -1
            } else {
                0
            }
        } else {
            level - 1
        }
    }
}

fn binomial(n: u64, k: u64) -> u64 {
    let mut r = 1;
    for i in 0..k {
        r = r * (n - i) / (i + 1);
    }
    r
}

#[test]
fn bounded_subsets_cardinality() {
    let mut spec = UpperBound { n: 6, k: 3 };
    let (mut table, mut root) = DdBuilder::new(&mut spec, 2).build();
    let mut roots = [root];
    reduce(&mut table, &mut roots, ReduceKind::Zdd);
    root = roots[0];

    let mut dd = DdManager::default();
    let f = to_zdd(&mut dd, &table, root);
    let expect: u64 = (0..=3).map(|k| binomial(6, k)).sum();
    assert_eq!(expect, 42);
    assert_eq!(dd.cardinality(f), expect);
    assert_eq!(dd.max_length(f), 3);
    dd.release(f);
}

#[test]
fn reduction_is_deterministic() {
    let run = || {
        let mut spec = UpperBound { n: 9, k: 4 };
        let (mut table, root) = DdBuilder::new(&mut spec, 2).build();
        let mut roots = [root];
        reduce(&mut table, &mut roots, ReduceKind::Zdd);
        let mut dd = DdManager::default();
        let f = to_zdd(&mut dd, &table, roots[0]);
        let mut buf = Vec::new();
        dd.export_one(&mut buf, f).unwrap();
        dd.release(f);
        buf
    };
    assert_eq!(run(), run());
}

/// Exactly `k` elements, all chosen above level `cut`; a node reaching the
/// cut with the wrong count dies there, several levels above the terminals.
struct Checkpoint {
    n: usize,
    cut: i32,
    k: u32,
}

impl DdSpec for Checkpoint {
    fn state_size(&self) -> usize {
        4
    }

    fn get_root(&mut self, state: &mut [u8]) -> i32 {
        state.copy_from_slice(&0u32.to_ne_bytes());
        self.n as i32
    }

    fn get_child(&mut self, state: &mut [u8], level: i32, branch: u8) -> i32 {
        let mut count = u32::from_ne_bytes(state[..4].try_into().unwrap());
        if level > self.cut {
            count += branch as u32;
            if count > self.k {
                return 0;
            }
            state.copy_from_slice(&count.to_ne_bytes());
        } else {
            if level == self.cut && count != self.k {
                return 0;
            }
            if branch == 1 {
                return 0;
            }
        }
        if level == 1 {
            -1
        } else {
            level - 1
        }
    }
}

#[test]
fn sweeper_drops_dead_subgraphs() {
    // Three quarters of the checkpoint row is dead on arrival; the sweep
    // must drop it (and everything above that only led there) without
    // disturbing the surviving paths.
    let mut spec = Checkpoint { n: 14, cut: 7, k: 3 };
    let (mut table, mut root) = DdBuilder::new(&mut spec, 2).build();
    let mut roots = [root];
    reduce(&mut table, &mut roots, ReduceKind::Zdd);
    root = roots[0];

    let mut dd = DdManager::default();
    let f = to_zdd(&mut dd, &table, root);
    assert_eq!(dd.cardinality(f), binomial(7, 3));
    assert_eq!(dd.max_length(f), 3);
    dd.release(f);
}

#[test]
fn sweeping_and_not_sweeping_agree() {
    let build = |sweep: bool| {
        let mut spec = Checkpoint { n: 12, cut: 5, k: 4 };
        let b = DdBuilder::new(&mut spec, 2);
        let b = if sweep { b } else { b.without_sweeping() };
        let (mut table, root) = b.build();
        let mut roots = [root];
        reduce(&mut table, &mut roots, ReduceKind::Zdd);
        let mut dd = DdManager::default();
        let f = to_zdd(&mut dd, &table, roots[0]);
        let card = dd.cardinality(f);
        dd.release(f);
        card
    };
    assert_eq!(build(true), build(false));
    assert_eq!(build(true), binomial(7, 4));
}

#[test]
fn subsetter_intersects_with_spec() {
    // Base: subsets of {1..6} of size <= 3; spec: subsets with a low element.
    let mut base_spec = UpperBound { n: 6, k: 3 };
    let (mut base, mut base_root) = DdBuilder::new(&mut base_spec, 2).build();
    let mut roots = [base_root];
    reduce(&mut base, &mut roots, ReduceKind::Zdd);
    base_root = roots[0];

    let mut spec = NeedsLowElement { n: 6, need: 1 };
    let (mut sub, mut sub_root) = ZddSubsetter::new(&base, &mut spec).run(base_root);
    let mut roots = [sub_root];
    reduce(&mut sub, &mut roots, ReduceKind::Zdd);
    sub_root = roots[0];

    let mut dd = DdManager::default();
    let f = to_zdd(&mut dd, &sub, sub_root);
    // Size <= 3 subsets containing element 1: choose up to 2 from the
    // other 5.
    let expect: u64 = (0..=2).map(|k| binomial(5, k)).sum();
    assert_eq!(dd.cardinality(f), expect);
    dd.release(f);
}

#[test]
fn subsetter_against_package_diagram() {
    // Build a family in the package, encode it, then subset it.
    let mut dd = DdManager::default();
    for _ in 0..4 {
        dd.new_var();
    }
    // All subsets of {1..4}.
    let mut f = Edge::TRUE;
    for lev in 1..=4 {
        let v = dd.var_of_lev(lev);
        let s = dd.zvar(v);
        let p = dd.product(f, s);
        let u = dd.union(f, p);
        dd.release(f);
        dd.release(p);
        dd.release(s);
        f = u;
    }
    assert_eq!(dd.cardinality(f), 16);

    let (base, base_root) = from_zdd(&mut dd, f);
    let mut spec = UpperBound { n: 4, k: 1 };
    let (mut sub, root) = ZddSubsetter::new(&base, &mut spec).run(base_root);
    let mut roots = [root];
    reduce(&mut sub, &mut roots, ReduceKind::Zdd);
    let g = to_zdd(&mut dd, &sub, roots[0]);
    assert_eq!(dd.cardinality(g), 5);
    dd.release(f);
    dd.release(g);
}
