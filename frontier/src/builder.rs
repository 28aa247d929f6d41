/// Top-down breadth-first DD builder.
///
/// One frontier per level: a byte arena of pending states plus, for each
/// state, a write-back slot naming the parent branch that will receive the
/// node handle once the state's level is processed. Processing a level
/// deduplicates its states (first inserted wins, so equivalent rebuilds
/// number nodes identically), allocates the row, resolves the write-backs,
/// and expands each distinct state through the specification. Terminal
/// children are routed directly; the rest migrate into lower frontiers.
///
/// The arena of a completed level is dropped wholesale. The sweeper is
/// consulted after every level and may compact the table, rewriting pending
/// write-backs and the root.
use hashbrown::HashMap;

use crate::spec::DdSpec;
use crate::sweeper::DdSweeper;
use crate::table::{DdTable, Nid};

#[derive(Debug, Clone, Copy)]
pub(crate) enum WriteBack {
    Root,
    Branch { row: usize, col: usize, b: usize },
}

#[derive(Debug, Default)]
pub(crate) struct Frontier {
    pub data: Vec<u8>,
    pub srcs: Vec<WriteBack>,
}

impl Frontier {
    /// Reserves a zeroed state slot and registers its write-back; returns
    /// the slot for the caller to fill through the specification's copy.
    pub fn alloc(&mut self, state_size: usize, src: WriteBack) -> &mut [u8] {
        let off = self.data.len();
        self.data.resize(off + state_size, 0);
        self.srcs.push(src);
        &mut self.data[off..]
    }

    pub fn len(&self) -> usize {
        self.srcs.len()
    }
}

pub struct DdBuilder<'a, S: DdSpec> {
    spec: &'a mut S,
    arity: usize,
    state_size: usize,
    table: DdTable,
    frontiers: Vec<Frontier>,
    root: Nid,
    sweeper: Option<DdSweeper>,
}

impl<'a, S: DdSpec> DdBuilder<'a, S> {
    pub fn new(spec: &'a mut S, arity: usize) -> Self {
        let state_size = spec.state_size();
        Self {
            spec,
            arity,
            state_size,
            table: DdTable::new(arity),
            frontiers: Vec::new(),
            root: Nid::ZERO,
            sweeper: Some(DdSweeper::default()),
        }
    }

    /// Disables on-the-fly sweeping of dead subgraphs.
    pub fn without_sweeping(mut self) -> Self {
        self.sweeper = None;
        self
    }

    /// Materialises the whole diagram and returns the table with its root.
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

        // Deduplicate; the first occurrence of a state becomes canonical.
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

        // Expand the distinct states; duplicates are only destructed.
        let mut tmp = vec![0u8; ss];
        let mut dead = 0usize;
        let mut child_low = i;
        let mut is_canon = vec![false; m_states];
        for &j in &canon {
            is_canon[j as usize] = true;
        }
        for j in 0..m_states {
            if !is_canon[j] {
                self.spec.destruct(&mut fr.data[j * ss..(j + 1) * ss]);
                continue;
            }
            let col = col_of[j];
            let mut alive = false;
            for b in 0..self.arity {
                self.spec.copy(&mut tmp, &fr.data[j * ss..(j + 1) * ss]);
                let ii = self.spec.get_child(&mut tmp, i as i32, b as u8);
                if ii <= 0 {
                    self.spec.destruct(&mut tmp);
                    self.table
                        .set_branch(Nid::new(i, col), b, Nid::terminal(ii != 0));
                    if ii != 0 {
                        alive = true;
                    }
                } else {
                    let ii = ii as usize;
                    assert!(ii < i, "child level {} not below parent level {}", ii, i);
                    let src = WriteBack::Branch { row: i, col, b };
                    let slot = self.frontiers[ii].alloc(ss, src);
                    self.spec.copy(slot, &tmp);
                    self.spec.destruct(&mut tmp);
                    alive = true;
                    child_low = child_low.min(ii);
                }
            }
            self.spec.destruct(&mut fr.data[j * ss..(j + 1) * ss]);
            if !alive {
                dead += 1;
            }
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
    use crate::spec::DdSpec;

    /// All subsets of {1..n} with at most k elements, as a ZDD-style spec.
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
    fn builds_one_node_per_distinct_count() {
        let mut spec = UpperBound { n: 4, k: 2 };
        let (table, root) = DdBuilder::new(&mut spec, 2).build();
        assert_eq!(root.row, 4);
        // Level 4 has one state, level 3 two, levels below at most k+1.
        assert_eq!(table.row_size(4), 1);
        assert_eq!(table.row_size(3), 2);
        assert_eq!(table.row_size(2), 3);
    }

    #[test]
    fn terminal_root() {
        struct Empty;
        impl DdSpec for Empty {
            fn state_size(&self) -> usize {
                0
            }
            fn get_root(&mut self, _state: &mut [u8]) -> i32 {
                0
            }
            fn get_child(&mut self, _state: &mut [u8], _level: i32, _branch: u8) -> i32 {
                unreachable!()
            }
        }
        let mut spec = Empty;
        let (_, root) = DdBuilder::new(&mut spec, 2).build();
        assert_eq!(root, Nid::ZERO);
    }
}
