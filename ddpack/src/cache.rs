/// Operation cache.
///
/// A fixed-capacity direct-mapped table keyed by an operation code and the
/// two operand words. There is no collision resolution: a mismatched entry
/// is a miss and an insert overwrites whatever was in the slot. Entries hold
/// no reference counts; they are weakly associated with nodes, so the
/// garbage collector scrubs every entry naming a dead node and every hit
/// must re-acquire the returned edge before handing it out.
use common::prelude::*;

use crate::manager::DdManager;

/// Operation codes. Codes 20 and above form the user-extension range also
/// reachable through `cache_read` / `cache_write`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Operation {
    Null = 0,
    And = 1,
    Xor = 2,
    At0 = 3,
    At1 = 4,
    LShift = 5,
    RShift = 6,
    Cofactor = 7,
    Univ = 8,
    Support = 9,
    Intersec = 10,
    Union = 11,
    Subtract = 12,
    Offset = 13,
    Onset = 14,
    Change = 15,
    Card = 16,
    Lit = 17,
    Len = 18,
    Product = 20,
    Quotient = 21,
    Restrict = 22,
    Permit = 23,
    PermitSym = 24,
    SymChk = 25,
    Always = 26,
    SymSet = 27,
    CoImplySet = 28,
    Meet = 29,
    ZSkip = 65,
    IntersecSkip = 66,
}

#[derive(Debug, Clone)]
pub(crate) struct CacheEntry {
    pub op: u8,
    pub f: Edge,
    pub g: Edge,
    pub h: Edge,
}

impl Default for CacheEntry {
    fn default() -> Self {
        Self {
            op: Operation::Null as u8,
            f: Edge::NULL,
            g: Edge::NULL,
            h: Edge::NULL,
        }
    }
}

impl DdManager {
    #[inline]
    pub(crate) fn cache_lookup(&self, op: Operation, f: Edge, g: Edge) -> Option<Edge> {
        let slot = hash_triple(op as u8, f.raw(), g.raw(), self.cache.len());
        let e = &self.cache[slot];
        if e.op == op as u8 && e.f == f && e.g == g {
            Some(e.h)
        } else {
            None
        }
    }

    #[inline]
    pub(crate) fn cache_store(&mut self, op: Operation, f: Edge, g: Edge, h: Edge) {
        let slot = hash_triple(op as u8, f.raw(), g.raw(), self.cache.len());
        self.cache[slot] = CacheEntry { op: op as u8, f, g, h };
    }

    /// User-extension cache read; returns `Edge::NULL` on a miss. The caller
    /// must re-acquire the returned edge before using it as a live handle.
    pub fn cache_read(&self, op: u8, f: Edge, g: Edge) -> Edge {
        let slot = hash_triple(op, f.raw(), g.raw(), self.cache.len());
        let e = &self.cache[slot];
        if e.op == op && e.f == f && e.g == g {
            e.h
        } else {
            Edge::NULL
        }
    }

    /// User-extension cache write. Codes below 20 are reserved for the
    /// kernels.
    pub fn cache_write(&mut self, op: u8, f: Edge, g: Edge, h: Edge) {
        if op < 20 {
            panic!("cache_write: reserved operation code {}", op);
        }
        if h.is_null() {
            return;
        }
        let slot = hash_triple(op, f.raw(), g.raw(), self.cache.len());
        self.cache[slot] = CacheEntry { op, f, g, h };
    }

    /// Drops every cache entry that names a dead node. Quantitative entries
    /// (`Card`, `Lit`, `Len`) also drop when their payload is a
    /// multi-precision handle, since the arena is reset in the same sweep.
    /// Entries outside the explicitly handled codes are dropped wholesale;
    /// that covers the user-extension range and the level-skip cache.
    pub(crate) fn cache_sweep_dead(&mut self) {
        const MP_BASE: u64 = 1 << 63;
        for i in 0..self.cache.len() {
            let (op, f, g, h) = {
                let e = &self.cache[i];
                (e.op, e.f, e.g, e.h)
            };
            let drop = if op == Operation::Null as u8 {
                false
            } else if op == Operation::And as u8
                || op == Operation::Xor as u8
                || op == Operation::Intersec as u8
                || op == Operation::Union as u8
                || op == Operation::Subtract as u8
                || op == Operation::Change as u8
            {
                self.edge_dead(f) || self.edge_dead(g) || self.edge_dead(h)
            } else if op == Operation::At0 as u8
                || op == Operation::At1 as u8
                || op == Operation::Offset as u8
                || op == Operation::Onset as u8
            {
                self.edge_dead(f) || self.edge_dead(h)
            } else if op == Operation::Card as u8
                || op == Operation::Lit as u8
                || op == Operation::Len as u8
            {
                self.edge_dead(f) || h.raw() >= MP_BASE
            } else {
                true
            };
            if drop {
                self.cache[i] = CacheEntry::default();
            }
        }
    }

    /// Empties the whole cache.
    pub fn clear_cache(&mut self) {
        for e in self.cache.iter_mut() {
            *e = CacheEntry::default();
        }
    }
}
