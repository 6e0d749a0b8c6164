// Source backends
// One engine per backend family; both implement SourceEngine.

pub mod relational;
pub mod warehouse;

pub use relational::RelationalEngine;
pub use warehouse::WarehouseEngine;
