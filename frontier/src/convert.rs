/// Conversions between the construction tables and the shared package.
///
/// A reduced binary table evaluates bottom-up into the node manager: for
/// ZDD semantics an edge skipping levels means those elements are absent,
/// for BDD semantics it means they are don't-care, so both conversions are
/// single post-order passes over the rows with no padding. The reverse
/// direction encodes a live package diagram into a table so it can feed the
/// subsetter.
use common::prelude::*;
use ddpack::prelude::*;

use crate::table::{DdTable, Nid};

fn terminal_edge(n: Nid) -> Edge {
    if n == Nid::ONE {
        Edge::TRUE
    } else {
        Edge::FALSE
    }
}

fn eval_table(
    dd: &mut DdManager,
    table: &DdTable,
    root: Nid,
    zdd: bool,
) -> Edge {
    assert_eq!(table.arity(), 2, "package conversion is defined for binary tables");
    while dd.var_count() + 1 < table.num_rows() {
        dd.new_var();
    }

    let mut vals: Vec<Vec<Edge>> = (0..table.num_rows())
        .map(|r| vec![Edge::FALSE; table.row_size(r)])
        .collect();
    let val_of = |vals: &Vec<Vec<Edge>>, n: Nid| {
        if n.is_terminal() {
            terminal_edge(n)
        } else {
            vals[n.row][n.col]
        }
    };

    let mut failed = false;
    for r in 1..table.num_rows() {
        if failed {
            break;
        }
        let v = dd.var_of_lev(r);
        for j in 0..table.row_size(r) {
            let c0 = table.branch(Nid::new(r, j), 0);
            let c1 = table.branch(Nid::new(r, j), 1);
            let e0 = dd.acquire(val_of(&vals, c0));
            let e1 = dd.acquire(val_of(&vals, c1));
            let e = if zdd {
                dd.make_zdd(v, e0, e1)
            } else {
                dd.make_bdd(v, e0, e1)
            };
            if e.is_null() {
                dd.release(e0);
                dd.release(e1);
                failed = true;
                break;
            }
            vals[r][j] = e;
        }
    }

    let result = if failed {
        Edge::NULL
    } else {
        dd.acquire(val_of(&vals, root))
    };
    for row in vals {
        for e in row {
            dd.release(e);
        }
    }
    result
}

/// Evaluates a ZDD-reduced table into the package; returns an owned edge or
/// `Edge::NULL` on exhaustion.
pub fn to_zdd(dd: &mut DdManager, table: &DdTable, root: Nid) -> Edge {
    eval_table(dd, table, root, true)
}

/// Evaluates a BDD-reduced table into the package.
pub fn to_bdd(dd: &mut DdManager, table: &DdTable, root: Nid) -> Edge {
    eval_table(dd, table, root, false)
}

/// Encodes a live package ZDD into a table, level for row, so the subsetter
/// can intersect it with a specification.
pub fn from_zdd(dd: &mut DdManager, f: Edge) -> (DdTable, Nid) {
    let mut table = DdTable::new(2);
    let n = dd.edge_lev(f);
    table.init(n + 1);
    let mut memo: DdHashMap<u64, Nid> = DdHashMap::default();
    let root = encode(dd, f, &mut table, &mut memo);
    (table, root)
}

fn encode(dd: &mut DdManager, f: Edge, table: &mut DdTable, memo: &mut DdHashMap<u64, Nid>) -> Nid {
    if f == Edge::FALSE {
        return Nid::ZERO;
    }
    if f == Edge::TRUE {
        return Nid::ONE;
    }
    if let Some(&n) = memo.get(&f.raw()) {
        return n;
    }
    let (f0, f1) = dd.children(f);
    let c0 = encode(dd, f0, table, memo);
    let c1 = encode(dd, f1, table, memo);
    let r = dd.edge_lev(f);
    let col = table.push_node(r, &[c0, c1]);
    let n = Nid::new(r, col);
    memo.insert(f.raw(), n);
    n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_to_zdd_and_back() {
        let mut dd = DdManager::default();
        let mut t = DdTable::new(2);
        t.init(3);
        // {{2}, {1,2}}
        let low = t.push_node(1, &[Nid::ONE, Nid::ONE]);
        let top = t.push_node(2, &[Nid::ZERO, Nid::new(1, low)]);
        let root = Nid::new(2, top);
        let f = to_zdd(&mut dd, &t, root);
        assert_eq!(dd.cardinality(f), 2);
        assert_eq!(dd.max_length(f), 2);

        let (t2, r2) = from_zdd(&mut dd, f);
        let g = to_zdd(&mut dd, &t2, r2);
        assert_eq!(g, f);
        dd.release(f);
        dd.release(g);
    }

    #[test]
    fn skipped_levels_are_dont_care_for_bdds() {
        let mut dd = DdManager::default();
        let mut t = DdTable::new(2);
        t.init(3);
        // Level-2 variable decides alone: node jumps over level 1.
        let top = t.push_node(2, &[Nid::ZERO, Nid::ONE]);
        let root = Nid::new(2, top);
        let f = to_bdd(&mut dd, &t, root);
        let v2 = dd.var_of_lev(2);
        let expect = dd.var(v2);
        assert_eq!(f, expect);
        dd.release(f);
        dd.release(expect);
    }
}
