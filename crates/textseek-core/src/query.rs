use crate::cursor::Cursor;
use crate::errors::{Result, SearchError};
use crate::model::Param;
use crate::predicate::{Predicate, PredicateSet};
use crate::sql::{Binder, Dialect};
use serde::{Deserialize, Serialize};

pub const MAX_PAGE_SIZE: usize = 100;
pub const MAX_SUGGEST_LIMIT: usize = 20;
pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_SUGGEST_LIMIT: usize = 5;

pub const DOCUMENT_COLUMNS: &str = "id, title, author, content, tags, view_count, published_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortSpec {
    /// `view_count DESC, id DESC`, ranked queries.
    Popularity,
    /// `published_at DESC, id DESC`, a total order; the only sort a cursor may use.
    Recency,
    /// `title ASC`, suggestions only.
    Title,
}

impl SortSpec {
    pub const fn order_by(self) -> &'static str {
        match self {
            Self::Popularity => "view_count DESC, id DESC",
            Self::Recency => "published_at DESC, id DESC",
            Self::Title => "title ASC",
        }
    }

    /// Identifier embedded in cursor tokens.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Popularity => "view_count_desc",
            Self::Recency => "published_at_desc,id_desc",
            Self::Title => "title_asc",
        }
    }

    pub const fn supports_cursor(self) -> bool {
        matches!(self, Self::Recency)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryShape {
    /// Full document rows, over-fetched by one.
    Documents,
    /// Distinct titles for autocomplete; single-shot, never paginated.
    Suggest,
}

/// A fully validated query, independent of any SQL dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    shape: QueryShape,
    predicates: Vec<Predicate>,
    sort: SortSpec,
    page_size: usize,
}

/// SQL text plus its parameters in placeholder order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedQuery {
    pub sql: String,
    pub params: Vec<Param>,
}

impl SearchQuery {
    pub fn shape(&self) -> QueryShape {
        self.shape
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn sort(&self) -> SortSpec {
        self.sort
    }

    /// Rows the caller will receive at most.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Rows requested from the store.
    pub fn fetch_limit(&self) -> usize {
        match self.shape {
            QueryShape::Documents => self.page_size + 1,
            QueryShape::Suggest => self.page_size,
        }
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.predicates.iter().find_map(|p| match p {
            Predicate::SeekBefore(c) => Some(c),
            _ => None,
        })
    }

    pub fn to_sql(&self, dialect: &Dialect) -> RenderedQuery {
        let mut binder = Binder::new(dialect.placeholders);
        let clauses: Vec<String> = self
            .predicates
            .iter()
            .map(|p| p.render(dialect, &mut binder))
            .collect();
        let select = match self.shape {
            QueryShape::Documents => format!("SELECT {DOCUMENT_COLUMNS}"),
            QueryShape::Suggest => "SELECT DISTINCT title".to_string(),
        };
        let where_str = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        let limit = binder.bind(Param::Int(
            i64::try_from(self.fetch_limit()).unwrap_or(i64::MAX),
        ));
        let sql = format!(
            "{select} FROM {}{where_str} ORDER BY {} LIMIT {limit}",
            dialect.table,
            self.sort.order_by()
        );
        RenderedQuery {
            sql,
            params: binder.into_params(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Requirement {
    /// keyword or prefix must be present.
    TextIndex,
    /// tag must be present; text criteria are optional.
    Tag,
}

/// Assembles a [`PredicateSet`], sort, optional cursor and page size into a [`SearchQuery`].
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    filters: PredicateSet,
    requirement: Requirement,
    sort: SortSpec,
    cursor: Option<Cursor>,
    limit: usize,
}

impl QueryBuilder {
    /// Primary search: at least one of keyword or prefix is required.
    pub fn search(filters: PredicateSet) -> Self {
        Self {
            filters,
            requirement: Requirement::TextIndex,
            sort: SortSpec::Popularity,
            cursor: None,
            limit: DEFAULT_PAGE_SIZE,
        }
    }

    /// Tag search: the tag is required and a keyword is optional.
    pub fn tagged(filters: PredicateSet) -> Self {
        Self {
            requirement: Requirement::Tag,
            ..Self::search(filters)
        }
    }

    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }

    pub fn cursor(mut self, cursor: Option<Cursor>) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn build(self) -> Result<SearchQuery> {
        self.filters.validate()?;
        match self.requirement {
            Requirement::TextIndex if !self.filters.has_text_criterion() => {
                return Err(SearchError::invalid(
                    "at least one of keyword or prefix is required",
                ));
            }
            Requirement::Tag if self.filters.tag.is_none() => {
                return Err(SearchError::invalid("tag is required"));
            }
            _ => {}
        }
        check_limit(self.limit, MAX_PAGE_SIZE)?;
        if self.sort == SortSpec::Title {
            return Err(SearchError::invalid("title order is reserved for suggestions"));
        }
        let mut predicates = self.filters.predicates();
        if let Some(cursor) = self.cursor {
            if !self.sort.supports_cursor() {
                return Err(SearchError::invalid(format!(
                    "cursor pagination requires `{}` order",
                    SortSpec::Recency.order_by()
                )));
            }
            predicates.push(Predicate::SeekBefore(cursor));
        }
        Ok(SearchQuery {
            shape: QueryShape::Documents,
            predicates,
            sort: self.sort,
            page_size: self.limit,
        })
    }

    /// Prefix-only suggestion query. It takes no other filters and no cursor.
    pub fn suggest(prefix: &str, limit: usize) -> Result<SearchQuery> {
        if prefix.trim().is_empty() {
            return Err(SearchError::invalid("prefix is required"));
        }
        check_limit(limit, MAX_SUGGEST_LIMIT)?;
        Ok(SearchQuery {
            shape: QueryShape::Suggest,
            predicates: vec![Predicate::TitlePrefix(prefix.to_string())],
            sort: SortSpec::Title,
            page_size: limit,
        })
    }
}

fn check_limit(limit: usize, max: usize) -> Result<()> {
    if (1..=max).contains(&limit) {
        Ok(())
    } else {
        Err(SearchError::invalid(format!(
            "limit must be between 1 and {max}, got {limit}"
        )))
    }
}
