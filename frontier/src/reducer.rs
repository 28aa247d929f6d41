/// Bottom-up canonicalisation of a built table.
///
/// Binary tables run Algorithm-R: a pre-pass applies the configured node
/// deletion rule through child edges, then each level merges equivalent
/// nodes by threading intrusive lists through the scratch slots of their
/// 0-children, so no per-level hash table is needed. Wider tables fall back
/// to a per-level hash table keyed by the canonical child tuple. Root
/// handles are rewritten as their levels complete. The pass is
/// single-threaded, so equal inputs reduce to identically numbered tables.
use common::prelude::DdHashMap;

use crate::table::{DdTable, Nid};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceKind {
    /// Merge duplicate nodes only (quasi-reduction).
    Plain,
    /// Also delete nodes whose children are all equal.
    Bdd,
    /// Also delete nodes whose 1-edge is the 0-terminal.
    Zdd,
}

pub fn reduce(table: &mut DdTable, roots: &mut [Nid], kind: ReduceKind) {
    if table.arity() == 2 {
        algorithm_r(table, roots, kind);
    } else {
        reduce_hash(table, roots, kind);
    }
}

/// One-step deletion applied through every child edge, bottom row first, so
/// chains of deletable nodes collapse and lower-level columns stay stable
/// during the in-place merge.
fn delete_through_edges(table: &mut DdTable, kind: ReduceKind) {
    let arity = table.arity();
    for i in 2..table.num_rows() {
        for j in 0..table.row_size(i) {
            for b in 0..arity {
                let f = table.branch(Nid::new(i, j), b);
                if f.row == 0 {
                    continue;
                }
                let f0 = table.branch(f, 0);
                let deletable = if kind == ReduceKind::Bdd { f0 } else { Nid::ZERO };
                let from = if kind == ReduceKind::Plain { 0 } else { 1 };
                let mut del = true;
                for bb in from..arity {
                    if table.branch(f, bb) != deletable {
                        del = false;
                    }
                }
                if del {
                    table.set_branch(Nid::new(i, j), b, f0);
                }
            }
        }
    }
}

fn algorithm_r(table: &mut DdTable, roots: &mut [Nid], kind: ReduceKind) {
    debug_assert_eq!(table.arity(), 2);
    let bdd = kind == ReduceKind::Bdd;
    let zdd = kind == ReduceKind::Zdd;
    delete_through_edges(table, kind);

    let num_rows = table.num_rows();
    let mut new_id: Vec<Vec<Nid>> = Vec::with_capacity(num_rows);
    new_id.push(vec![Nid::ZERO, Nid::ONE]);
    let mut out_rows: Vec<Vec<Nid>> = vec![Vec::new(); num_rows];

    for i in 1..num_rows {
        let m = table.row_size(i);
        let mark = Nid::new(i, m);
        let mut ids = vec![Nid::ZERO; m];

        // Phase 1 (last column first): rewrite children to their reduced
        // ids, apply the deletion rule, and thread every surviving node
        // into the equivalence list of its 0-child, using that child's
        // branch slots as scratch. The tail of a list is marked with a
        // column one past the row end.
        for j in (0..m).rev() {
            let mut f0 = table.branch(Nid::new(i, j), 0);
            if f0.row != 0 {
                f0 = new_id[f0.row][f0.col];
                table.set_branch(Nid::new(i, j), 0, f0);
            }
            let mut f1 = table.branch(Nid::new(i, j), 1);
            if f1.row != 0 {
                f1 = new_id[f1.row][f1.col];
                table.set_branch(Nid::new(i, j), 1, f1);
            }

            if (bdd && f1 == f0) || (zdd && f1 == Nid::ZERO) {
                ids[j] = f0;
            } else {
                let f01 = table.branch(f0, 1);
                if f01 != mark {
                    table.set_branch(f0, 1, mark);
                    ids[j] = Nid::new(i + 1, m);
                } else {
                    ids[j] = table.branch(f0, 0);
                }
                table.set_branch(f0, 0, Nid::new(i + 1, j));
            }
        }

        // Phase 2: walk each 0-child list; within a list, the first node
        // carrying a given 1-child becomes canonical, recorded in the
        // 1-child's scratch slots; later carriers forward to it.
        let mut mm = 0;
        for j in 0..m {
            if ids[j].row <= i {
                continue;
            }
            let head = Nid::new(i, j);
            let mut k = j;
            while k < m {
                let g = Nid::new(i, k);
                let g1 = table.branch(g, 1);
                let next = ids[k].col;
                if table.branch(g1, 1) != head {
                    table.set_branch(g1, 1, head);
                    table.set_branch(g1, 0, g);
                    ids[k] = Nid::new(i, mm);
                    mm += 1;
                } else {
                    let canonical = table.branch(g1, 0);
                    table.set_branch(g, 0, canonical);
                    table.set_branch(g, 1, mark);
                    ids[k] = Nid::ZERO;
                }
                k = next;
            }
        }

        // Phase 3: emit the survivors and resolve forwarded ids.
        let mut out = vec![Nid::ZERO; mm * 2];
        for j in 0..m {
            let f0 = table.branch(Nid::new(i, j), 0);
            let f1 = table.branch(Nid::new(i, j), 1);
            if f1 == mark {
                ids[j] = ids[f0.col];
            } else if (bdd && f1 == f0) || (zdd && f1 == Nid::ZERO) {
                debug_assert!(ids[j].row < i);
            } else {
                let k = ids[j].col;
                out[k * 2] = f0;
                out[k * 2 + 1] = f1;
            }
        }
        out_rows[i] = out;

        for r in roots.iter_mut() {
            if r.row == i {
                *r = ids[r.col];
            }
        }
        new_id.push(ids);
    }

    for i in 1..num_rows {
        table.rows[i] = std::mem::take(&mut out_rows[i]);
    }
    // Restore the terminal row scribbled on by the scratch phase.
    let arity = table.arity();
    let mut row0 = Vec::with_capacity(2 * arity);
    for t in 0..2 {
        for _ in 0..arity {
            row0.push(Nid::new(0, t));
        }
    }
    table.rows[0] = row0;
}

fn reduce_hash(table: &mut DdTable, roots: &mut [Nid], kind: ReduceKind) {
    let arity = table.arity();
    let bdd = kind == ReduceKind::Bdd;
    let zdd = kind == ReduceKind::Zdd;
    let num_rows = table.num_rows();
    let mut new_id: Vec<Vec<Nid>> = Vec::with_capacity(num_rows);
    new_id.push(vec![Nid::ZERO, Nid::ONE]);

    for i in 1..num_rows {
        let m = table.row_size(i);
        let mut ids = vec![Nid::ZERO; m];
        let mut uniq: DdHashMap<Vec<Nid>, Nid> = DdHashMap::default();
        let mut out: Vec<Nid> = Vec::new();
        let mut jj = 0;

        for j in 0..m {
            let mut node = Vec::with_capacity(arity);
            for b in 0..arity {
                let mut t = table.branch(Nid::new(i, j), b);
                if t.row != 0 {
                    t = new_id[t.row][t.col];
                }
                node.push(t);
            }
            let deletable = if bdd { node[0] } else { Nid::ZERO };
            let mut del = bdd || zdd || node[0] == Nid::ZERO;
            for &t in &node[1..] {
                if t != deletable {
                    del = false;
                }
            }
            if del {
                ids[j] = node[0];
            } else if let Some(&id) = uniq.get(&node) {
                ids[j] = id;
            } else {
                let id = Nid::new(i, jj);
                jj += 1;
                out.extend_from_slice(&node);
                uniq.insert(node, id);
                ids[j] = id;
            }
        }

        table.rows[i] = out;
        for r in roots.iter_mut() {
            if r.row == i {
                *r = ids[r.col];
            }
        }
        new_id.push(ids);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Unreduced two-level table for {{2}, {1,2}} with a redundant split at
    /// level 1.
    fn sample() -> (DdTable, Nid) {
        let mut t = DdTable::new(2);
        t.init(3);
        // level 1: two copies of the same node (0-edge 1, 1-edge 1)
        t.push_node(1, &[Nid::ONE, Nid::ONE]);
        t.push_node(1, &[Nid::ONE, Nid::ONE]);
        // level 2: node branching to the two copies
        t.push_node(2, &[Nid::ZERO, Nid::new(1, 1)]);
        t.push_node(2, &[Nid::ZERO, Nid::new(1, 0)]);
        (t, Nid::new(2, 0))
    }

    #[test]
    fn zdd_reduction_merges_duplicates() {
        let (mut t, mut root) = sample();
        let mut roots = [root];
        reduce(&mut t, &mut roots, ReduceKind::Zdd);
        root = roots[0];
        assert_eq!(t.row_size(1), 1);
        assert_eq!(t.row_size(2), 1);
        assert_eq!(root, Nid::new(2, 0));
        assert_eq!(t.branch(root, 0), Nid::ZERO);
        assert_eq!(t.branch(root, 1), Nid::new(1, 0));
    }

    #[test]
    fn bdd_reduction_deletes_equal_children() {
        let mut t = DdTable::new(2);
        t.init(3);
        // level 1 node with both branches to 1: redundant for BDDs.
        t.push_node(1, &[Nid::ONE, Nid::ONE]);
        t.push_node(2, &[Nid::new(1, 0), Nid::ZERO]);
        let mut roots = [Nid::new(2, 0)];
        reduce(&mut t, &mut roots, ReduceKind::Bdd);
        assert_eq!(t.row_size(1), 0);
        assert_eq!(t.branch(roots[0], 0), Nid::ONE);
        assert_eq!(t.branch(roots[0], 1), Nid::ZERO);
    }

    #[test]
    fn whole_diagram_can_collapse() {
        let mut t = DdTable::new(2);
        t.init(2);
        t.push_node(1, &[Nid::ONE, Nid::ZERO]);
        let mut roots = [Nid::new(1, 0)];
        reduce(&mut t, &mut roots, ReduceKind::Zdd);
        assert_eq!(roots[0], Nid::ONE);
        assert_eq!(t.row_size(1), 0);
    }

    #[test]
    fn hash_fallback_matches_for_wide_tables() {
        let mut t = DdTable::new(3);
        t.init(2);
        t.push_node(1, &[Nid::ONE, Nid::ZERO, Nid::ONE]);
        t.push_node(1, &[Nid::ONE, Nid::ZERO, Nid::ONE]);
        let mut roots = [Nid::new(1, 0), Nid::new(1, 1)];
        reduce(&mut t, &mut roots, ReduceKind::Plain);
        assert_eq!(t.row_size(1), 1);
        assert_eq!(roots[0], roots[1]);
    }
}
