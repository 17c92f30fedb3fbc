use crate::traits::{ConnectionSource, SqlConnection, Store};
use textseek_core::{Dialect, Result, Row, SearchQuery};

/// Store adapter for SQL engines: renders the query for `dialect` and runs it
/// on a connection acquired for this call only.
pub struct SqlStore<S: ConnectionSource> {
    source: S,
    dialect: Dialect,
}

impl<S: ConnectionSource> SqlStore<S> {
    pub fn new(source: S, dialect: Dialect) -> Self {
        Self { source, dialect }
    }
}

#[async_trait::async_trait]
impl<S: ConnectionSource> Store for SqlStore<S> {
    async fn execute(&self, query: &SearchQuery) -> Result<Vec<Row>> {
        let rendered = query.to_sql(&self.dialect);
        tracing::debug!(sql = %rendered.sql, params = rendered.params.len(), "sql query");
        // Dropped at the end of this scope on success and error alike.
        let mut conn = self.source.acquire().await?;
        conn.query(&rendered.sql, &rendered.params).await
    }

    fn name(&self) -> &'static str {
        "sql"
    }
}
