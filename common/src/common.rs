use std::hash::BuildHasherDefault;
use wyhash::WyHash;

pub type VarId = usize;
pub type NodeId = usize;
pub type Level = usize;

// pub type DdHashMap<T,U> = std::collections::HashMap<T,U>;
// pub type DdHashMap<T,U> = hashbrown::HashMap<T,U>;

pub type DdHashMap<T, U> = std::collections::HashMap<T, U, BuildHasherDefault<WyHash>>;
pub type DdHashSet<T> = std::collections::HashSet<T, BuildHasherDefault<WyHash>>;

/// Hashes a byte string with the same function used by the map aliases above.
#[inline]
pub fn hash_bytes(bytes: &[u8], seed: u64) -> u64 {
    wyhash::wyhash(bytes, seed)
}

/// Hashes a pair of raw edge words into a bucket index for a
/// power-of-two-sized table.
#[inline]
pub fn hash_pair(a: u64, b: u64, size: usize) -> usize {
    let mut buf = [0u8; 16];
    buf[..8].copy_from_slice(&a.to_le_bytes());
    buf[8..].copy_from_slice(&b.to_le_bytes());
    (wyhash::wyhash(&buf, 0x9e37_79b9_7f4a_7c15) as usize) & (size - 1)
}

/// Hashes an operation code together with its two operands into a slot of a
/// power-of-two-sized direct-mapped cache.
#[inline]
pub fn hash_triple(op: u8, a: u64, b: u64, size: usize) -> usize {
    let mut buf = [0u8; 17];
    buf[0] = op;
    buf[1..9].copy_from_slice(&a.to_le_bytes());
    buf[9..].copy_from_slice(&b.to_le_bytes());
    (wyhash::wyhash(&buf, 0xc2b2_ae3d_27d4_eb4f) as usize) & (size - 1)
}
