//! Repository layer: entity-scoped database operations on a `Connection`.

mod report;

pub use report::*;
