/// Intersection of a reduced table with a specification.
///
/// The construction state is a pair of a base-table node and a spec state;
/// descending a branch descends both sides in lock-step, each side skipping
/// through 0-edges over the levels the other side has already left behind
/// (the zero-suppressed convention, which is why the base table must be
/// ZDD-reduced). Pending pair states are kept in per-base-node work lists,
/// deduplicated with the specification's own hash and equality.
use hashbrown::HashMap;

use crate::spec::DdSpec;
use crate::table::{DdTable, Nid};

#[derive(Debug, Clone, Copy)]
enum Target {
    Root,
    Branch { row: usize, col: usize, b: usize },
}

struct PairEntry {
    state: Vec<u8>,
    src: Target,
}

pub struct ZddSubsetter<'a, S: DdSpec> {
    base: &'a DdTable,
    spec: &'a mut S,
    state_size: usize,
    result: DdTable,
    /// `work[row][col]` holds the pending spec states paired with that base
    /// node.
    work: Vec<Vec<Vec<PairEntry>>>,
    root: Nid,
}

impl<'a, S: DdSpec> ZddSubsetter<'a, S> {
    pub fn new(base: &'a DdTable, spec: &'a mut S) -> Self {
        assert_eq!(base.arity(), 2, "subsetting is defined for binary tables");
        let state_size = spec.state_size();
        Self {
            base,
            spec,
            state_size,
            result: DdTable::new(2),
            work: Vec::new(),
            root: Nid::ZERO,
        }
    }

    /// Runs the whole subset construction against `base_root`.
    pub fn run(mut self, base_root: Nid) -> (DdTable, Nid) {
        let n = self.initialize(base_root);
        for i in (1..=n).rev() {
            self.subset(i);
        }
        (self.result, self.root)
    }

    fn initialize(&mut self, base_root: Nid) -> usize {
        let ss = self.state_size;
        let mut tmp = vec![0u8; ss];
        let mut n = self.spec.get_root(&mut tmp);

        let mut f = base_root;
        let mut k = if f == Nid::ONE { -1 } else { f.row as i32 };

        while n != 0 && k != 0 && n != k {
            if n < k {
                k = self.down_table(&mut f, 0, n);
            } else {
                n = self.down_spec(&mut tmp, n, 0, k);
            }
        }

        if n <= 0 || k <= 0 {
            self.root = Nid::terminal(n != 0 && k != 0);
            self.spec.destruct(&mut tmp);
            self.result.init(1);
            return 0;
        }
        debug_assert_eq!(n, k);
        let n = n as usize;
        self.result.init(n + 1);
        self.work = (0..self.base.num_rows())
            .map(|r| (0..self.base.row_size(r)).map(|_| Vec::new()).collect())
            .collect();
        let mut state = vec![0u8; ss];
        self.spec.copy(&mut state, &tmp);
        self.spec.destruct(&mut tmp);
        self.work[f.row][f.col].push(PairEntry { state, src: Target::Root });
        n
    }

    fn subset(&mut self, i: usize) {
        let ss = self.state_size;
        let m = self.base.row_size(i);

        // Deduplicate each base node's list; the first occurrence becomes
        // canonical and the columns follow list order.
        let mut mm = 0;
        let mut keep: Vec<Vec<PairEntry>> = Vec::with_capacity(m);
        for j in 0..m {
            let list = std::mem::take(&mut self.work[i][j]);
            let base_col = mm;
            let mut uniq: HashMap<u64, Vec<usize>> = HashMap::default();
            let mut kept: Vec<PairEntry> = Vec::new();
            for entry in list {
                let h = self.spec.hash(&entry.state);
                let mut found = None;
                if let Some(cands) = uniq.get(&h) {
                    for &c in cands {
                        if self.spec.equal(&kept[c].state, &entry.state) {
                            found = Some(c);
                            break;
                        }
                    }
                }
                match found {
                    Some(c) => {
                        self.write_back(entry.src, Nid::new(i, base_col + c));
                        let mut state = entry.state;
                        self.spec.destruct(&mut state);
                    }
                    None => {
                        uniq.entry(h).or_default().push(kept.len());
                        self.write_back(entry.src, Nid::new(i, base_col + kept.len()));
                        kept.push(entry);
                    }
                }
            }
            mm += kept.len();
            keep.push(kept);
        }
        self.result.init_row(i, mm);

        // Expand each surviving pair: branch in the base and the spec,
        // then let the two sides chase each other down through 0-edges.
        let mut col = 0;
        let mut tmp = vec![0u8; ss];
        for (j, kept) in keep.into_iter().enumerate() {
            for mut entry in kept {
                for b in 0..2usize {
                    self.spec.copy(&mut tmp, &entry.state);
                    let mut f = Nid::new(i, j);
                    let mut kk = self.down_table(&mut f, b, i as i32 - 1);
                    let mut ii = self.down_spec(&mut tmp, i as i32, b as u8, kk);
                    while ii != 0 && kk != 0 && ii != kk {
                        if ii < kk {
                            kk = self.down_table(&mut f, 0, ii);
                        } else {
                            ii = self.down_spec(&mut tmp, ii, 0, kk);
                        }
                    }

                    if ii <= 0 || kk <= 0 {
                        let val = ii != 0 && kk != 0;
                        self.result
                            .set_branch(Nid::new(i, col), b, Nid::terminal(val));
                        self.spec.destruct(&mut tmp);
                    } else {
                        debug_assert_eq!(ii as usize, f.row);
                        let mut state = vec![0u8; ss];
                        self.spec.copy(&mut state, &tmp);
                        self.spec.destruct(&mut tmp);
                        self.work[f.row][f.col].push(PairEntry {
                            state,
                            src: Target::Branch { row: i, col, b },
                        });
                    }
                }
                self.spec.destruct(&mut entry.state);
                col += 1;
            }
        }
        debug_assert_eq!(col, mm);
        self.spec.destruct_level(i as i32);
    }

    fn write_back(&mut self, src: Target, nid: Nid) {
        match src {
            Target::Root => self.root = nid,
            Target::Branch { row, col, b } => {
                self.result.set_branch(Nid::new(row, col), b, nid);
            }
        }
    }

    /// Takes branch `b` in the base table, then follows 0-edges down to
    /// `zerosup_level`; returns the reached level (`-1` for the 1-terminal).
    fn down_table(&self, f: &mut Nid, b: usize, zerosup_level: i32) -> i32 {
        let zs = zerosup_level.max(0) as usize;
        *f = self.base.branch(*f, b);
        while f.row > zs {
            *f = self.base.branch(*f, 0);
        }
        if *f == Nid::ONE {
            -1
        } else {
            f.row as i32
        }
    }

    /// Takes branch `b` in the spec, then follows its 0-children down to
    /// `zerosup_level`.
    fn down_spec(&mut self, state: &mut [u8], level: i32, b: u8, zerosup_level: i32) -> i32 {
        let zs = zerosup_level.max(0);
        debug_assert!(level > zs);
        let i = self.spec.get_child(state, level, b);
        self.skip_spec(state, i, zs)
    }

    fn skip_spec(&mut self, state: &mut [u8], mut level: i32, zerosup_level: i32) -> i32 {
        let zs = zerosup_level.max(0);
        while level > zs {
            level = self.spec.get_child(state, level, 0);
        }
        level
    }
}
