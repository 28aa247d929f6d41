pub mod common;
pub mod edge;

pub mod prelude {
    pub use crate::common::{hash_bytes, hash_pair, hash_triple};
    pub use crate::common::{DdHashMap, DdHashSet};
    pub use crate::common::{Level, NodeId, VarId};
    pub use crate::edge::Edge;
}
