//! Filter tree compilation: wire types → abstract predicates → dialect SQL.

mod compiler;
mod dialect;
mod filter;
mod predicate;
mod render;

pub use compiler::compile;
pub use dialect::{Dialect, DialectAdapter};
pub use filter::{Combinator, FieldQueryFilter, FilterChild, ModifyQuery, QueryFilterSchema, QueryOperator};
pub use predicate::{Comparison, Predicate, WhereClause};
pub use render::{OrderBy, Page, QueryBuf, SortDirection, SqlRenderer};
