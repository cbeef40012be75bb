pub mod ast;
pub mod builder;
pub mod columns;
pub mod descriptor;
pub mod literal;
pub mod mem;
pub mod tables;
pub mod translator;
pub mod where_clause;

pub use ast::*;
pub use builder::*;
pub use columns::{ColumnMapping, ValueKind};
pub use descriptor::*;
pub use literal::*;
pub use mem::*;
pub use tables::*;
pub use translator::*;
pub use where_clause::*;
