pub mod cursor;
pub mod errors;
pub mod mapper;
pub mod model;
pub mod pagination;
pub mod predicate;
pub mod query;
pub mod sql;

pub use cursor::*;
pub use errors::*;
pub use model::*;
pub use pagination::paginate;
pub use predicate::*;
pub use query::*;
pub use sql::*;
