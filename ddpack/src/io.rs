/// Textual export/import of one or more diagrams sharing a node set.
///
/// Format, one whitespace-separated token per field:
///
/// ```text
/// _i <max_level>
/// _o <root_count>
/// _n <node_count>
/// <id> <level> <lo> <hi>     (node_count lines, children first)
/// <root>                     (root_count lines)
/// ```
///
/// Node ids are positive even integers (the complement-stripped edge word,
/// offset past the reserved values); an odd reference denotes the
/// complemented form of the node with the low bit cleared. `F` and `T` are
/// the terminals. Export is deterministic: post-order, 0-edge first, so a
/// stream re-exported after an import into an empty manager reproduces
/// itself byte for byte. Import failures leave no live nodes behind
/// (everything built up to the failure point is released); variables created
/// for the header remain.
use std::io::{self, BufRead, Write};

use common::prelude::*;

use crate::manager::DdManager;

fn next_token<R: BufRead>(r: &mut R) -> io::Result<Option<String>> {
    let mut tok = Vec::new();
    loop {
        let (done, used) = {
            let buf = r.fill_buf()?;
            if buf.is_empty() {
                break;
            }
            let mut used = 0;
            let mut done = false;
            for &b in buf {
                if b.is_ascii_whitespace() {
                    used += 1;
                    if !tok.is_empty() {
                        done = true;
                        break;
                    }
                } else {
                    tok.push(b);
                    used += 1;
                }
            }
            (done, used)
        };
        r.consume(used);
        if done {
            break;
        }
    }
    if tok.is_empty() {
        Ok(None)
    } else {
        Ok(Some(String::from_utf8_lossy(&tok).into_owned()))
    }
}

impl DdManager {
    /// Exports a vector of roots; stops at the first null root, as the
    /// vector-size query does.
    pub fn export_many<W: Write>(&mut self, w: &mut W, roots: &[Edge]) -> io::Result<()> {
        let mut n = roots.len();
        for (i, &p) in roots.iter().enumerate() {
            if p.is_null() {
                n = i;
                break;
            }
            if !p.is_const() {
                let _ = self.node(p);
            }
        }
        let roots = &roots[..n];
        let mut maxlev = 0;
        for &p in roots {
            maxlev = maxlev.max(self.edge_lev(p));
        }
        let count = self.multi_size(roots);

        writeln!(w, "_i {}", maxlev)?;
        writeln!(w, "_o {}", n)?;
        writeln!(w, "_n {}", count)?;

        for &p in roots {
            self.export_node(w, p)?;
        }
        for &p in roots {
            self.reset_marks(p);
        }
        for &p in roots {
            if p == Edge::FALSE {
                writeln!(w, "F")?;
            } else if p == Edge::TRUE {
                writeln!(w, "T")?;
            } else {
                writeln!(w, "{}", p.raw() + 2)?;
            }
        }
        Ok(())
    }

    pub fn export_one<W: Write>(&mut self, w: &mut W, f: Edge) -> io::Result<()> {
        self.export_many(w, &[f])
    }

    fn export_node<W: Write>(&mut self, w: &mut W, f: Edge) -> io::Result<()> {
        if f.is_const() {
            return Ok(());
        }
        let ix = f.index();
        if self.marked(ix) {
            return Ok(());
        }
        self.set_mark(ix);

        let node = &self.nodes[ix];
        let v = node.var();
        let lev = self.lev_of_var(v);
        let (slo, shi) = self.raw_children(ix);
        let f0 = slo.abs();
        let f1 = shi;

        self.recur_inc();
        self.export_node(w, f0)?;
        self.export_node(w, f1)?;
        self.recur_dec();

        write!(w, "{} {} ", f.abs().raw() + 2, lev)?;
        if f0 == Edge::FALSE {
            write!(w, "F")?;
        } else if f0 == Edge::TRUE {
            write!(w, "T")?;
        } else {
            write!(w, "{}", f0.raw() + 2)?;
        }
        write!(w, " ")?;
        if f1 == Edge::FALSE {
            writeln!(w, "F")?;
        } else if f1 == Edge::TRUE {
            writeln!(w, "T")?;
        } else {
            writeln!(w, "{}", f1.raw() + 2)?;
        }
        Ok(())
    }

    /// Reads a stream written by `export_many`, recomposing BDD nodes.
    pub fn import_bdd<R: BufRead>(&mut self, r: &mut R) -> Result<Vec<Edge>, String> {
        self.import(r, false)
    }

    /// Reads a stream written by `export_many`, recomposing ZDD nodes.
    pub fn import_zdd<R: BufRead>(&mut self, r: &mut R) -> Result<Vec<Edge>, String> {
        self.import(r, true)
    }

    fn import<R: BufRead>(&mut self, r: &mut R, z: bool) -> Result<Vec<Edge>, String> {
        let mut map: DdHashMap<u64, Edge> = DdHashMap::default();
        let result = self.import_inner(r, z, &mut map);
        // The id map holds one reference per recomposed node; the surviving
        // diagram is pinned by the root references (or by nothing, on error).
        for (_, e) in map.drain() {
            self.release(e);
        }
        result
    }

    fn import_inner<R: BufRead>(
        &mut self,
        r: &mut R,
        z: bool,
        map: &mut DdHashMap<u64, Edge>,
    ) -> Result<Vec<Edge>, String> {
        fn fail<T>() -> Result<T, String> {
            Err("import failed".to_string())
        }
        fn tok<R: BufRead>(r: &mut R) -> Result<String, String> {
            match next_token(r) {
                Ok(Some(t)) => Ok(t),
                _ => Err("import failed".to_string()),
            }
        }

        if tok(r)? != "_i" {
            return fail();
        }
        let maxlev: usize = tok(r)?.parse().map_err(|_| "import failed".to_string())?;
        while self.var_count() < maxlev {
            self.new_var();
        }

        if tok(r)? != "_o" {
            return fail();
        }
        let m: usize = tok(r)?.parse().map_err(|_| "import failed".to_string())?;

        if tok(r)? != "_n" {
            return fail();
        }
        let n_nd: u64 = tok(r)?.parse().map_err(|_| "import failed".to_string())?;

        for _ in 0..n_nd {
            let nd: u64 = tok(r)?.parse().map_err(|_| "import failed".to_string())?;
            let lev: usize = tok(r)?.parse().map_err(|_| "import failed".to_string())?;
            if lev == 0 || lev > self.var_count() {
                return fail();
            }
            let v = self.var_of_lev(lev);

            let t0 = tok(r)?;
            let f0 = match t0.as_str() {
                "F" => Edge::FALSE,
                "T" => Edge::TRUE,
                s => {
                    let id: u64 = s.parse().map_err(|_| "import failed".to_string())?;
                    match map.get(&id) {
                        Some(&e) => self.acquire(e),
                        None => return fail(),
                    }
                }
            };

            let t1 = tok(r).map_err(|e| {
                self.release(f0);
                e
            })?;
            let f1 = match t1.as_str() {
                "F" => Edge::FALSE,
                "T" => Edge::TRUE,
                s => {
                    let id: u64 = match s.parse() {
                        Ok(x) => x,
                        Err(_) => {
                            self.release(f0);
                            return fail();
                        }
                    };
                    let (id, inv) = (id & !1, id & 1 != 0);
                    match map.get(&id) {
                        Some(&e) => {
                            let e = self.acquire(e);
                            if inv {
                                e.flip()
                            } else {
                                e
                            }
                        }
                        None => {
                            self.release(f0);
                            return fail();
                        }
                    }
                }
            };

            let f = if z {
                self.make_zdd(v, f0, f1)
            } else {
                self.make_bdd(v, f0, f1)
            };
            if f.is_null() {
                self.release(f0);
                self.release(f1);
                return fail();
            }
            if let Some(old) = map.insert(nd, f) {
                // Duplicate id; the displaced node lost its map slot.
                self.release(old);
                return fail();
            }
        }

        let mut roots = Vec::with_capacity(m);
        for _ in 0..m {
            let t = match tok(r) {
                Ok(t) => t,
                Err(e) => {
                    for p in roots {
                        self.release(p);
                    }
                    return Err(e);
                }
            };
            let p = match t.as_str() {
                "F" => Edge::FALSE,
                "T" => Edge::TRUE,
                s => {
                    let id: u64 = match s.parse() {
                        Ok(x) => x,
                        Err(_) => {
                            for p in roots {
                                self.release(p);
                            }
                            return fail();
                        }
                    };
                    let (id, inv) = (id & !1, id & 1 != 0);
                    match map.get(&id) {
                        Some(&e) => {
                            let e = self.acquire(e);
                            if inv {
                                e.flip()
                            } else {
                                e
                            }
                        }
                        None => {
                            for p in roots {
                                self.release(p);
                            }
                            return fail();
                        }
                    }
                }
            };
            roots.push(p);
        }
        Ok(roots)
    }
}

#[cfg(test)]
mod tests {
    use common::prelude::*;

    use crate::manager::DdManager;

    fn pair_family(dd: &mut DdManager) -> Edge {
        let v1 = dd.new_var();
        let v2 = dd.new_var();
        let v3 = dd.new_var();
        let s1 = dd.zvar(v1);
        let s2 = dd.zvar(v2);
        let s3 = dd.zvar(v3);
        let p12 = dd.product(s1, s2);
        let p13 = dd.product(s1, s3);
        let p23 = dd.product(s2, s3);
        let u1 = dd.union(p12, p13);
        let f = dd.union(u1, p23);
        for e in [s1, s2, s3, p12, p13, p23, u1] {
            dd.release(e);
        }
        f
    }

    #[test]
    fn zdd_round_trip() {
        let mut dd = DdManager::default();
        let f = pair_family(&mut dd);
        let mut buf = Vec::new();
        dd.export_one(&mut buf, f).unwrap();

        // Importing into the same manager hash-conses onto the existing
        // nodes: the handle comes back bit-identical.
        let back = dd.import_zdd(&mut buf.as_slice()).unwrap();
        assert_eq!(back, vec![f]);
        dd.release(back[0]);

        let mut dd2 = DdManager::default();
        let roots = dd2.import_zdd(&mut buf.as_slice()).unwrap();
        assert_eq!(roots.len(), 1);
        let g = roots[0];
        assert_eq!(dd2.cardinality(g), dd.cardinality(f));
        assert_eq!(dd2.literal_count(g), dd.literal_count(f));
        assert_eq!(dd2.size(g), dd.size(f));

        // A stream produced from an import-ordered manager is a fixed point.
        let mut buf2 = Vec::new();
        dd2.export_one(&mut buf2, g).unwrap();
        let mut dd3 = DdManager::default();
        let roots3 = dd3.import_zdd(&mut buf2.as_slice()).unwrap();
        let mut buf3 = Vec::new();
        dd3.export_one(&mut buf3, roots3[0]).unwrap();
        assert_eq!(buf2, buf3);
        dd3.release(roots3[0]);
        dd2.release(g);
        dd.release(f);
    }

    #[test]
    fn bdd_round_trip_with_complement_refs() {
        let mut dd = DdManager::default();
        let va = dd.new_var();
        let vb = dd.new_var();
        let a = dd.var(va);
        let b = dd.var(vb);
        let ab = dd.and(a, b);
        let f = dd.not(ab);
        let mut buf = Vec::new();
        dd.export_one(&mut buf, f).unwrap();

        let mut dd2 = DdManager::default();
        let roots = dd2.import_bdd(&mut buf.as_slice()).unwrap();
        let g = roots[0];
        assert_eq!(dd2.size(g), dd.size(f));
        let a2 = dd2.var(va);
        let b2 = dd2.var(vb);
        let ab2 = dd2.and(a2, b2);
        let expect = dd2.not(ab2);
        assert_eq!(g, expect);
        for e in [a, b, ab, f] {
            dd.release(e);
        }
        for e in [a2, b2, ab2, expect, g] {
            dd2.release(e);
        }
    }

    #[test]
    fn import_rejects_malformed_stream() {
        let mut dd = DdManager::default();
        let used = dd.node_used();
        assert!(dd.import_zdd(&mut "_x 3".as_bytes()).is_err());
        assert!(dd.import_zdd(&mut "_i 1\n_o 1\n_n 1\n4 1 F".as_bytes()).is_err());
        // Dangling child reference.
        assert!(dd
            .import_zdd(&mut "_i 1\n_o 1\n_n 1\n4 1 8 T\n4".as_bytes())
            .is_err());
        assert_eq!(dd.node_used(), used);
    }

    #[test]
    fn export_many_shares_nodes() {
        let mut dd = DdManager::default();
        let f = pair_family(&mut dd);
        let v1 = dd.var_of_lev(3);
        let on = dd.onset0(f, v1);
        let mut buf = Vec::new();
        dd.export_many(&mut buf, &[f, on]).unwrap();

        let mut dd2 = DdManager::default();
        let roots = dd2.import_zdd(&mut buf.as_slice()).unwrap();
        assert_eq!(roots.len(), 2);
        assert_eq!(dd2.cardinality(roots[0]), 3);
        assert_eq!(dd2.cardinality(roots[1]), 2);
        for e in roots {
            dd2.release(e);
        }
        dd.release(on);
        dd.release(f);
    }
}
