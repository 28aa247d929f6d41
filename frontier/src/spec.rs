/// Specification contract for top-down construction.
///
/// A specification describes a decision diagram implicitly through state
/// transitions over an opaque per-node state block. The builder materialises
/// the diagram level by level, deduplicating states with the hash and
/// equality supplied here.
use common::prelude::hash_bytes;

/// Level returned for the false terminal.
pub const LEVEL_FALSE: i32 = 0;
/// Level returned for the true terminal.
pub const LEVEL_TRUE: i32 = -1;

/// Caller-supplied diagram description.
///
/// `get_root` initialises the state block and returns the root's level
/// (`0` for the false terminal, `-1` for the true terminal). `get_child`
/// mutates the state to the child along `branch` from a node at `level` and
/// returns that child's level, which must be strictly below the parent's;
/// violations are fatal.
///
/// The default hash/equality/copy treat the state as plain bytes, which is
/// right for any `repr`-stable value encoded into the block; specifications
/// owning out-of-line resources override them together with `destruct`.
pub trait DdSpec {
    /// Byte size of the per-node state block.
    fn state_size(&self) -> usize;

    fn get_root(&mut self, state: &mut [u8]) -> i32;

    fn get_child(&mut self, state: &mut [u8], level: i32, branch: u8) -> i32;

    fn hash(&self, state: &[u8]) -> u64 {
        hash_bytes(state, 0x5bd1_e995_9e37_79b9)
    }

    fn equal(&self, a: &[u8], b: &[u8]) -> bool {
        a == b
    }

    fn copy(&self, dst: &mut [u8], src: &[u8]) {
        dst.copy_from_slice(src);
    }

    fn destruct(&self, state: &mut [u8]) {
        let _ = state;
    }

    /// Called when a level has been fully processed so the specification can
    /// drop its per-level caches.
    fn destruct_level(&mut self, level: i32) {
        let _ = level;
    }
}
