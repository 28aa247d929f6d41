pub mod spec;
pub mod table;

pub mod builder;
pub mod par;
pub mod reducer;
pub mod subsetter;
pub mod sweeper;

pub mod convert;

pub mod prelude {
    pub use crate::builder::DdBuilder;
    pub use crate::convert::{from_zdd, to_bdd, to_zdd};
    pub use crate::par::ParallelDdBuilder;
    pub use crate::reducer::{reduce, ReduceKind};
    pub use crate::spec::{DdSpec, LEVEL_FALSE, LEVEL_TRUE};
    pub use crate::subsetter::ZddSubsetter;
    pub use crate::sweeper::DdSweeper;
    pub use crate::table::{DdTable, Nid};
}
