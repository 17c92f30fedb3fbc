pub mod loader;
pub mod mem;
pub mod service;
pub mod sql;
pub mod traits;

pub use loader::{load_documents, read_documents, LoadError};
pub use mem::InMemoryStore;
pub use service::{explain, paginated_filters, SearchRequest, SearchService, TokenPage};
pub use sql::SqlStore;
pub use traits::*;
