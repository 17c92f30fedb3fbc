use textseek_core::{Param, Result, Row, SearchQuery};

/// Executes a built query and returns rows in the query's order.
///
/// One call is one round trip; adapters must not issue follow-up queries.
#[async_trait::async_trait]
pub trait Store: Send + Sync + 'static {
    async fn execute(&self, query: &SearchQuery) -> Result<Vec<Row>>;

    /// Adapter name for logs.
    fn name(&self) -> &'static str;
}

/// A pool or connector handing out one connection per request.
///
/// The connection is returned by dropping it, so every exit path releases it.
#[async_trait::async_trait]
pub trait ConnectionSource: Send + Sync + 'static {
    type Conn: SqlConnection;

    async fn acquire(&self) -> Result<Self::Conn>;
}

#[async_trait::async_trait]
pub trait SqlConnection: Send {
    async fn query(&mut self, sql: &str, params: &[Param]) -> Result<Vec<Row>>;
}
