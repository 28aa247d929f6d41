/// On-the-fly cleaner for top-down construction.
///
/// Nodes whose branches all resolved to the 0-terminal are dead weight:
/// nothing below them can reach 1 any more. The builder reports the dead
/// count after each level; once the accumulated dead share passes the sweep
/// ratio the table is compacted, rewriting every branch, every pending
/// write-back and the root. Nodes still awaited by pending write-backs are
/// kept alive regardless of their current branches.
use common::prelude::DdHashSet;

use crate::builder::{Frontier, WriteBack};
use crate::table::{DdTable, Nid};

const SWEEP_RATIO: usize = 20;

#[derive(Debug, Default)]
pub struct DdSweeper {
    dead: usize,
    all: usize,
    max: usize,
}

impl DdSweeper {
    pub(crate) fn update(
        &mut self,
        table: &mut DdTable,
        frontiers: &mut [Frontier],
        root: &mut Nid,
        current: usize,
        _child: usize,
        count: usize,
    ) {
        if current <= 1 {
            return;
        }
        self.dead += count;
        self.all += table.row_size(current);
        if self.all > self.max {
            self.max = self.all;
        }
        if self.dead * SWEEP_RATIO < self.max {
            return;
        }

        let mut pending: DdHashSet<(usize, usize)> = DdHashSet::default();
        for fr in frontiers.iter() {
            for src in &fr.srcs {
                if let WriteBack::Branch { row, col, .. } = *src {
                    pending.insert((row, col));
                }
            }
        }

        let arity = table.arity();
        let mut new_id: Vec<Vec<Nid>> = Vec::with_capacity(table.num_rows());
        new_id.push(vec![Nid::ZERO, Nid::ONE]);
        for r in 1..table.num_rows() {
            let m = table.row_size(r);
            let mut ids = vec![Nid::ZERO; m];
            let mut jj = 0;
            for j in 0..m {
                let mut live = pending.contains(&(r, j));
                for b in 0..arity {
                    let mut t = table.branch(Nid::new(r, j), b);
                    if t.row >= 1 {
                        t = new_id[t.row][t.col];
                        table.set_branch(Nid::new(r, j), b, t);
                    }
                    if t != Nid::ZERO {
                        live = true;
                    }
                }
                if live {
                    ids[j] = Nid::new(r, jj);
                    if jj != j {
                        for b in 0..arity {
                            let t = table.branch(Nid::new(r, j), b);
                            table.set_branch(Nid::new(r, jj), b, t);
                        }
                    }
                    jj += 1;
                }
            }
            table.rows[r].truncate(jj * arity);
            new_id.push(ids);
        }

        for fr in frontiers.iter_mut() {
            for src in fr.srcs.iter_mut() {
                if let WriteBack::Branch { row, col, .. } = src {
                    if *row >= 1 {
                        let n = new_id[*row][*col];
                        debug_assert!(n != Nid::ZERO, "swept a node with pending edges");
                        *row = n.row;
                        *col = n.col;
                    }
                }
            }
        }
        if root.row >= 1 {
            *root = new_id[root.row][root.col];
        }

        self.dead = 0;
        self.all = table.size();
    }
}
