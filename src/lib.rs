/// Decision-diagram engine for graph-subset enumeration.
///
/// Two subsystems share this workspace: `ddpack`, a reference-counted
/// BDD/ZDD package with a unique-table-backed node manager, and `frontier`,
/// a top-down breadth-first construction framework driven by caller
/// specifications. Higher-level enumerators implement
/// `frontier::spec::DdSpec`, materialise and reduce a table, and evaluate it
/// into the package for set algebra, counting and serialisation.
pub use common;
pub use ddpack;
pub use frontier;

pub mod prelude {
    pub use common::prelude::*;
    pub use ddpack::prelude::*;
    pub use frontier::prelude::*;
}
