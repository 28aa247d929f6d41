/// In-level parallel variant of the top-down builder.
///
/// The node store of a level is still committed single-threaded; only the
/// child expansion fans out. Workers get a clone of the specification and a
/// disjoint chunk of the deduplicated states, emit proposals into
/// thread-local buffers, and the commit stage drains the buffers in chunk
/// order, so frontier insertion order (and therefore canonical state
/// numbering) is identical to the serial builder's.
use hashbrown::HashMap;

use crate::builder::{Frontier, WriteBack};
use crate::spec::DdSpec;
use crate::sweeper::DdSweeper;
use crate::table::{DdTable, Nid};

struct Proposal {
    col: usize,
    b: usize,
    level: i32,
    state: Vec<u8>,
}

pub struct ParallelDdBuilder<'a, S: DdSpec + Clone + Send + Sync> {
    spec: &'a mut S,
    arity: usize,
    threads: usize,
    state_size: usize,
    table: DdTable,
    frontiers: Vec<Frontier>,
    root: Nid,
    sweeper: Option<DdSweeper>,
}

impl<'a, S: DdSpec + Clone + Send + Sync> ParallelDdBuilder<'a, S> {
    pub fn new(spec: &'a mut S, arity: usize, threads: usize) -> Self {
        let state_size = spec.state_size();
        Self {
            spec,
            arity,
            threads: threads.max(1),
            state_size,
            table: DdTable::new(arity),
            frontiers: Vec::new(),
            root: Nid::ZERO,
            sweeper: Some(DdSweeper::default()),
        }
    }

    pub fn without_sweeping(mut self) -> Self {
        self.sweeper = None;
        self
    }

    pub fn build(mut self) -> (DdTable, Nid) {
        let n = self.initialize();
        for i in (1..=n).rev() {
            self.construct(i);
        }
        (self.table, self.root)
    }

    fn initialize(&mut self) -> usize {
        let ss = self.state_size;
        let mut tmp = vec![0u8; ss];
        let n = self.spec.get_root(&mut tmp);
        if n <= 0 {
            self.root = Nid::terminal(n != 0);
            self.spec.destruct(&mut tmp);
            self.table.init(1);
            return 0;
        }
        let n = n as usize;
        self.table.init(n + 1);
        self.frontiers = (0..=n).map(|_| Frontier::default()).collect();
        let slot = self.frontiers[n].alloc(ss, WriteBack::Root);
        self.spec.copy(slot, &tmp);
        self.spec.destruct(&mut tmp);
        n
    }

    fn construct(&mut self, i: usize) {
        let ss = self.state_size;
        let mut fr = std::mem::take(&mut self.frontiers[i]);
        let m_states = fr.len();

        let mut uniq: HashMap<u64, Vec<u32>> = HashMap::with_capacity(m_states * 2);
        let mut col_of = vec![usize::MAX; m_states];
        let mut canon: Vec<u32> = Vec::new();
        for j in 0..m_states {
            let st = &fr.data[j * ss..(j + 1) * ss];
            let h = self.spec.hash(st);
            let cands = uniq.entry(h).or_default();
            let mut found = None;
            for &j0 in cands.iter() {
                let st0 = &fr.data[j0 as usize * ss..(j0 as usize + 1) * ss];
                if self.spec.equal(st0, st) {
                    found = Some(col_of[j0 as usize]);
                    break;
                }
            }
            match found {
                Some(c) => col_of[j] = c,
                None => {
                    col_of[j] = canon.len();
                    cands.push(j as u32);
                    canon.push(j as u32);
                }
            }
        }

        let m = canon.len();
        self.table.init_row(i, m);
        for j in 0..m_states {
            let nid = Nid::new(i, col_of[j]);
            match fr.srcs[j] {
                WriteBack::Root => self.root = nid,
                WriteBack::Branch { row, col, b } => {
                    self.table.set_branch(Nid::new(row, col), b, nid);
                }
            }
        }

        // Fan the expansion out over worker clones of the specification.
        let arity = self.arity;
        let chunk_len = (m + self.threads - 1) / self.threads.max(1);
        let chunk_len = chunk_len.max(1);
        let data = &fr.data;
        let spec_ref = &*self.spec;
        let chunks: Vec<(usize, &[u32])> = canon
            .chunks(chunk_len)
            .enumerate()
            .map(|(c, s)| (c * chunk_len, s))
            .collect();
        let results: Vec<Vec<Proposal>> = crossbeam::thread::scope(|scope| {
            let handles: Vec<_> = chunks
                .into_iter()
                .map(|(col0, chunk)| {
                    let mut spec = spec_ref.clone();
                    scope.spawn(move |_| {
                        let mut out = Vec::with_capacity(chunk.len() * arity);
                        for (d, &j) in chunk.iter().enumerate() {
                            let col = col0 + d;
                            let st = &data[j as usize * ss..(j as usize + 1) * ss];
                            for b in 0..arity {
                                let mut tmp = vec![0u8; ss];
                                spec.copy(&mut tmp, st);
                                let level = spec.get_child(&mut tmp, i as i32, b as u8);
                                if level <= 0 {
                                    spec.destruct(&mut tmp);
                                    tmp.clear();
                                }
                                out.push(Proposal { col, b, level, state: tmp });
                            }
                        }
                        out
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        })
        .unwrap();

        // Single-threaded commit in deterministic chunk order.
        let mut alive = vec![false; m];
        let mut child_low = i;
        for out in results {
            for mut p in out {
                if p.level <= 0 {
                    self.table
                        .set_branch(Nid::new(i, p.col), p.b, Nid::terminal(p.level != 0));
                    if p.level != 0 {
                        alive[p.col] = true;
                    }
                } else {
                    let ii = p.level as usize;
                    assert!(ii < i, "child level {} not below parent level {}", ii, i);
                    let src = WriteBack::Branch { row: i, col: p.col, b: p.b };
                    let slot = self.frontiers[ii].alloc(ss, src);
                    self.spec.copy(slot, &p.state);
                    self.spec.destruct(&mut p.state);
                    alive[p.col] = true;
                    child_low = child_low.min(ii);
                }
            }
        }
        let dead = alive.iter().filter(|&&a| !a).count();

        for j in 0..m_states {
            self.spec.destruct(&mut fr.data[j * ss..(j + 1) * ss]);
        }
        drop(fr);
        self.spec.destruct_level(i as i32);

        if let Some(sweeper) = self.sweeper.as_mut() {
            sweeper.update(
                &mut self.table,
                &mut self.frontiers,
                &mut self.root,
                i,
                child_low,
                dead,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::DdBuilder;
    use crate::reducer::{reduce, ReduceKind};

    /// Subsets of {1..n} with at most k elements.
    #[derive(Clone)]
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

    #[test]
    fn parallel_matches_serial() {
        let mut serial_spec = UpperBound { n: 10, k: 4 };
        let (mut st, mut sroot) = DdBuilder::new(&mut serial_spec, 2).build();
        let mut roots = [sroot];
        reduce(&mut st, &mut roots, ReduceKind::Zdd);
        sroot = roots[0];

        let mut par_spec = UpperBound { n: 10, k: 4 };
        let (mut pt, mut proot) = ParallelDdBuilder::new(&mut par_spec, 2, 4).build();
        let mut roots = [proot];
        reduce(&mut pt, &mut roots, ReduceKind::Zdd);
        proot = roots[0];

        assert_eq!(sroot, proot);
        assert_eq!(st.size(), pt.size());
        for r in 1..st.num_rows() {
            assert_eq!(st.rows[r], pt.rows[r], "row {}", r);
        }
    }
}
