mod alias;
pub mod ast;
pub mod backend;
pub mod coerce;
pub mod compiler;
pub mod config;
mod context;
mod display;
pub mod error;
pub mod model;
pub mod query_api;

pub use backend::{HierarchicalBuilder, QueryBuilder, RelationalBuilder, Sql2Query, SqlQuery};
pub use coerce::Value;
pub use compiler::{Collaborators, OrderBy, QueryCompiler};
pub use config::CompilerConfig;
pub use error::{Error, ErrorKind, Result};
pub use model::ConstraintTree;
pub use query_api::{PreparedQuery, compile, prepare};
