//! The four search operations, each one store round trip.

use crate::traits::Store;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use textseek_core::{
    mapper, paginate, Cursor, Dialect, Document, PredicateSet, QueryBuilder, RenderedQuery,
    Result, ResultPage, SearchError, SearchQuery, SortSpec, DEFAULT_PAGE_SIZE,
    DEFAULT_SUGGEST_LIMIT,
};

#[derive(Clone)]
pub struct SearchService {
    store: Arc<dyn Store>,
}

/// A page whose continuation is an opaque cursor token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenPage {
    pub results: Vec<Document>,
    pub has_next: bool,
    pub next_cursor: Option<String>,
    pub last_id: Option<i64>,
    pub last_published_at: Option<DateTime<Utc>>,
}

impl TokenPage {
    /// Encode the continuation of `page` for the filters it was fetched with.
    pub fn from_page(page: ResultPage<Document>, filters: &PredicateSet) -> Self {
        let last = page.items.last().map(|d| (d.id, d.published_at));
        Self {
            next_cursor: page.next_cursor.map(|c| c.encode(filters)),
            has_next: page.has_next,
            last_id: last.map(|(id, _)| id),
            last_published_at: last.map(|(_, at)| at),
            results: page.items,
        }
    }
}

/// Any of the four operations, as accepted by `explain`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SearchRequest {
    Search {
        keyword: String,
        #[serde(default)]
        min_views: Option<u64>,
        #[serde(default)]
        limit: Option<usize>,
    },
    SearchPaginated {
        keyword: String,
        #[serde(default)]
        cursor: Option<String>,
        #[serde(default)]
        limit: Option<usize>,
    },
    SearchByTags {
        tag: String,
        #[serde(default)]
        keyword: Option<String>,
        #[serde(default)]
        limit: Option<usize>,
    },
    Suggest {
        prefix: String,
        #[serde(default)]
        limit: Option<usize>,
    },
}

impl SearchRequest {
    pub fn to_query(&self) -> Result<SearchQuery> {
        match self {
            Self::Search {
                keyword,
                min_views,
                limit,
            } => ranked_query(keyword, *min_views, limit.unwrap_or(DEFAULT_PAGE_SIZE)),
            Self::SearchPaginated {
                keyword,
                cursor,
                limit,
            } => {
                let cursor = cursor
                    .as_deref()
                    .map(|t| Cursor::decode(t, &paginated_filters(keyword)))
                    .transpose()?;
                paginated_query(keyword, cursor, limit.unwrap_or(DEFAULT_PAGE_SIZE))
            }
            Self::SearchByTags {
                tag,
                keyword,
                limit,
            } => tag_query(tag, keyword.as_deref(), limit.unwrap_or(DEFAULT_PAGE_SIZE)),
            Self::Suggest { prefix, limit } => {
                QueryBuilder::suggest(prefix, limit.unwrap_or(DEFAULT_SUGGEST_LIMIT))
            }
        }
    }
}

/// Filters a paginated keyword search binds its cursors to.
pub fn paginated_filters(keyword: &str) -> PredicateSet {
    PredicateSet::keyword(keyword)
}

fn ranked_query(keyword: &str, min_views: Option<u64>, limit: usize) -> Result<SearchQuery> {
    QueryBuilder::search(PredicateSet::keyword(keyword).with_min_views(min_views))
        .sort(SortSpec::Popularity)
        .limit(limit)
        .build()
}

fn paginated_query(keyword: &str, cursor: Option<Cursor>, limit: usize) -> Result<SearchQuery> {
    QueryBuilder::search(paginated_filters(keyword))
        .sort(SortSpec::Recency)
        .cursor(cursor)
        .limit(limit)
        .build()
}

fn tag_query(tag: &str, keyword: Option<&str>, limit: usize) -> Result<SearchQuery> {
    // The keyword is optional here; a blank one means "no keyword".
    let keyword = keyword
        .filter(|k| !k.trim().is_empty())
        .map(str::to_string);
    QueryBuilder::tagged(PredicateSet::tag(tag).with_keyword(keyword))
        .sort(SortSpec::Popularity)
        .limit(limit)
        .build()
}

/// Render the query `request` would run, without executing it.
pub fn explain(request: &SearchRequest, dialect: &Dialect) -> Result<RenderedQuery> {
    Ok(request.to_query()?.to_sql(dialect))
}

impl SearchService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Keyword search ranked by popularity.
    pub async fn search(
        &self,
        keyword: &str,
        min_views: Option<u64>,
        limit: usize,
    ) -> Result<Vec<Document>> {
        let query = ranked_query(keyword, min_views, limit)?;
        Ok(self.fetch_page(&query).await?.items)
    }

    /// Keyword search in recency order with keyset pagination.
    pub async fn search_paginated(
        &self,
        keyword: &str,
        cursor: Option<Cursor>,
        limit: usize,
    ) -> Result<ResultPage<Document>> {
        let query = paginated_query(keyword, cursor, limit)?;
        self.fetch_page(&query).await
    }

    /// Like [`Self::search_paginated`], with the cursor carried as an opaque token.
    pub async fn search_paginated_token(
        &self,
        keyword: &str,
        token: Option<&str>,
        limit: usize,
    ) -> Result<TokenPage> {
        let filters = paginated_filters(keyword);
        let cursor = token.map(|t| Cursor::decode(t, &filters)).transpose()?;
        let page = self.search_paginated(keyword, cursor, limit).await?;
        Ok(TokenPage::from_page(page, &filters))
    }

    /// Tag containment ranked by popularity, optionally narrowed by keyword.
    pub async fn search_by_tags(
        &self,
        tag: &str,
        keyword: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Document>> {
        let query = tag_query(tag, keyword, limit)?;
        Ok(self.fetch_page(&query).await?.items)
    }

    /// Distinct titles starting with `prefix`.
    pub async fn suggest(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        let query = QueryBuilder::suggest(prefix, limit)?;
        let rows = self.run(&query).await?;
        let mut seen = HashSet::new();
        let titles: Vec<String> = mapper::to_titles(&rows)?
            .into_iter()
            .filter(|t| seen.insert(t.clone()))
            .take(limit)
            .collect();
        Ok(titles)
    }

    async fn fetch_page(&self, query: &SearchQuery) -> Result<ResultPage<Document>> {
        let rows = self.run(query).await?;
        let docs = mapper::to_documents(&rows)?;
        Ok(paginate(docs, query.page_size()))
    }

    async fn run(&self, query: &SearchQuery) -> Result<Vec<textseek_core::Row>> {
        tracing::debug!(
            store = self.store.name(),
            shape = ?query.shape(),
            sort = query.sort().order_by(),
            predicates = query.predicates().len(),
            fetch_limit = query.fetch_limit(),
            "executing search query"
        );
        match self.store.execute(query).await {
            Ok(rows) => Ok(rows),
            Err(e) => {
                tracing::warn!(store = self.store.name(), error = %e, "search query failed");
                Err(match e {
                    SearchError::StorageFailure(_) => e,
                    other => SearchError::storage(other.to_string()),
                })
            }
        }
    }
}
