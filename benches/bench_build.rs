use setdd::prelude::*;

fn clock<F>(s: &str, f: F)
where
    F: FnOnce(),
{
    let start = std::time::Instant::now();
    f();
    let end = start.elapsed();
    println!("{}: time {}", s, end.as_secs_f64());
}

/// Subsets of {1..n} with at most k elements.
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

fn bench_build(n: usize, k: u32) {
    let mut spec = UpperBound { n, k };
    let (mut table, root) = DdBuilder::new(&mut spec, 2).build();
    let mut roots = [root];
    reduce(&mut table, &mut roots, ReduceKind::Zdd);
    let mut dd = DdManager::new(1 << 16, 1 << 24);
    let f = to_zdd(&mut dd, &table, roots[0]);
    println!("n={} k={} card={} size={}", n, k, dd.cardinality(f), dd.size(f));
    dd.release(f);
}

fn bench_algebra(n: usize) {
    let mut dd = DdManager::new(1 << 16, 1 << 24);
    for _ in 0..n {
        dd.new_var();
    }
    let mut f = Edge::TRUE;
    for lev in 1..=n {
        let v = dd.var_of_lev(lev);
        let s = dd.zvar(v);
        let p = dd.product(f, s);
        let u = dd.union(f, p);
        dd.release(f);
        dd.release(p);
        dd.release(s);
        f = u;
    }
    let even = dd.permit_sym(f, (n / 2) as u64);
    println!(
        "n={} card={} half={}",
        n,
        dd.cardinality_big(f).unwrap(),
        dd.cardinality(even)
    );
    dd.release(even);
    dd.release(f);
}

fn main() {
    clock("build 100 choose <=10", || bench_build(100, 10));
    clock("build 500 choose <=5", || bench_build(500, 5));
    clock("power-set algebra n=64", || bench_algebra(64));
}
