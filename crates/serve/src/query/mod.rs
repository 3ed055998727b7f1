// crates/serve/src/query/mod.rs

pub mod ast;
pub mod eval;
pub mod plan;

pub use ast::{DateRange, ItemQuery, Order, OrderBy, StatusFilter, TaxClause, TaxOp, IMPOSSIBLE_ID};
pub use eval::matches;
pub use plan::{execute, QueryPage};
