pub mod manager;

pub mod apply;
pub mod bdd_ops;
pub mod cache;
pub mod zdd_ops;

pub mod cost;
pub mod count;
pub mod io;
mod mp;

pub mod prelude {
    pub use common::prelude::*;

    pub use crate::cache::Operation;
    pub use crate::cost::CostTable;
    pub use crate::manager::DdManager;
}
