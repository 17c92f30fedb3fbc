use crate::cursor::Cursor;
use crate::errors::{Result, SearchError};
use crate::model::Param;
use crate::sql::{Binder, Dialect, OperatorStyle, TupleCompare};
use serde::{Deserialize, Serialize};

/// One AND-ed clause of a search query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `tags` contains the value.
    Tag(String),
    /// Full-text match on `title OR content`.
    FullText(String),
    /// `view_count >= n`
    MinViews(u64),
    /// Prefix match on `title`.
    TitlePrefix(String),
    /// Keyset seek: rows strictly after the cursor in recency order.
    SeekBefore(Cursor),
}

impl Predicate {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Tag(_) => "tag",
            Self::FullText(_) => "keyword",
            Self::MinViews(_) => "min_views",
            Self::TitlePrefix(_) => "prefix",
            Self::SeekBefore(_) => "cursor",
        }
    }

    /// Render this clause, binding its parameters in placeholder order.
    pub fn render(&self, dialect: &Dialect, binder: &mut Binder) -> String {
        match self {
            Self::Tag(tag) => {
                let ph = binder.bind(Param::Text(tag.clone()));
                match dialect.operators {
                    OperatorStyle::PGroonga => format!("{ph} = ANY(tags)"),
                    OperatorStyle::Functions => format!("tag_contains(tags, {ph})"),
                }
            }
            Self::FullText(term) => {
                let phs = binder.bind_repeated(Param::Text(term.clone()), 2);
                match dialect.operators {
                    OperatorStyle::PGroonga => {
                        format!("(title &@~ {} OR content &@~ {})", phs[0], phs[1])
                    }
                    OperatorStyle::Functions => format!(
                        "(fulltext_match(title, {}) OR fulltext_match(content, {}))",
                        phs[0], phs[1]
                    ),
                }
            }
            Self::MinViews(min) => {
                let ph = binder.bind(Param::Int(i64::try_from(*min).unwrap_or(i64::MAX)));
                format!("view_count >= {ph}")
            }
            Self::TitlePrefix(prefix) => {
                let ph = binder.bind(Param::Text(prefix.clone()));
                match dialect.operators {
                    OperatorStyle::PGroonga => format!("title &^ {ph}"),
                    OperatorStyle::Functions => format!("prefix_match(title, {ph})"),
                }
            }
            Self::SeekBefore(cursor) => match dialect.tuple_compare {
                TupleCompare::RowValue => {
                    let ts = binder.bind(Param::Timestamp(cursor.published_at));
                    let id = binder.bind(Param::Int(cursor.id));
                    format!("(published_at, id) < ({ts}, {id})")
                }
                TupleCompare::Expanded => {
                    let ts = binder.bind_repeated(Param::Timestamp(cursor.published_at), 2);
                    let id = binder.bind(Param::Int(cursor.id));
                    format!(
                        "(published_at < {} OR (published_at = {} AND id < {id}))",
                        ts[0], ts[1]
                    )
                }
            },
        }
    }
}

/// The caller-supplied filters of a search request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateSet {
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub min_views: Option<u64>,
    #[serde(default)]
    pub prefix: Option<String>,
}

impl PredicateSet {
    pub fn keyword(keyword: impl Into<String>) -> Self {
        Self {
            keyword: Some(keyword.into()),
            ..Default::default()
        }
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            ..Default::default()
        }
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            ..Default::default()
        }
    }

    pub fn with_keyword(mut self, keyword: Option<String>) -> Self {
        self.keyword = keyword;
        self
    }

    pub fn with_min_views(mut self, min_views: Option<u64>) -> Self {
        self.min_views = min_views;
        self
    }

    /// True when the set would hit the text index.
    pub fn has_text_criterion(&self) -> bool {
        self.keyword.is_some() || self.prefix.is_some()
    }

    /// Reject present-but-blank text filters.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("keyword", &self.keyword),
            ("tag", &self.tag),
            ("prefix", &self.prefix),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(SearchError::invalid(format!("{name} must not be blank")));
            }
        }
        Ok(())
    }

    /// Active filters in clause order: tag, keyword, min_views, prefix.
    pub fn predicates(&self) -> Vec<Predicate> {
        let mut out = Vec::with_capacity(4);
        if let Some(tag) = &self.tag {
            out.push(Predicate::Tag(tag.clone()));
        }
        if let Some(keyword) = &self.keyword {
            out.push(Predicate::FullText(keyword.clone()));
        }
        if let Some(min) = self.min_views {
            out.push(Predicate::MinViews(min));
        }
        if let Some(prefix) = &self.prefix {
            out.push(Predicate::TitlePrefix(prefix.clone()));
        }
        out
    }

    /// Short stable hash of the filters, used to scope cursor tokens.
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        let hash = blake3::hash(&canonical);
        hash.to_hex().as_str()[..16].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::PlaceholderStyle;
    use chrono::{TimeZone, Utc};

    fn render(p: &Predicate, dialect: &Dialect) -> (String, Vec<Param>) {
        let mut b = Binder::new(dialect.placeholders);
        let sql = p.render(dialect, &mut b);
        (sql, b.into_params())
    }

    #[test]
    fn predicates_follow_clause_order() {
        let set = PredicateSet {
            keyword: Some("go".into()),
            tag: Some("lang".into()),
            min_views: Some(10),
            prefix: Some("Go".into()),
        };
        let labels: Vec<_> = set.predicates().iter().map(Predicate::label).collect();
        assert_eq!(labels, ["tag", "keyword", "min_views", "prefix"]);
        assert!(PredicateSet::default().predicates().is_empty());
    }

    #[test]
    fn fulltext_binds_once_with_numbered_placeholders() {
        let (sql, params) = render(&Predicate::FullText("go".into()), &Dialect::pgroonga());
        assert_eq!(sql, "(title &@~ $1 OR content &@~ $1)");
        assert_eq!(params, vec![Param::Text("go".into())]);

        let (sql, params) = render(&Predicate::FullText("go".into()), &Dialect::generic());
        assert_eq!(
            sql,
            "(fulltext_match(title, ?) OR fulltext_match(content, ?))"
        );
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn seek_clause_renders_both_tuple_modes() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let seek = Predicate::SeekBefore(Cursor::new(at, 9));

        let (sql, params) = render(&seek, &Dialect::pgroonga());
        assert_eq!(sql, "(published_at, id) < ($1, $2)");
        assert_eq!(params, vec![Param::Timestamp(at), Param::Int(9)]);

        let expanded = Dialect::pgroonga().with_tuple_compare(TupleCompare::Expanded);
        let (sql, params) = render(&seek, &expanded);
        assert_eq!(sql, "(published_at < $1 OR (published_at = $1 AND id < $2))");
        assert_eq!(params.len(), 2);

        let (sql, params) = render(&seek, &Dialect::generic());
        assert_eq!(sql, "(published_at < ? OR (published_at = ? AND id < ?))");
        assert_eq!(
            params,
            vec![Param::Timestamp(at), Param::Timestamp(at), Param::Int(9)]
        );
        assert_eq!(Dialect::generic().placeholders, PlaceholderStyle::Anonymous);
    }

    #[test]
    fn blank_filters_are_invalid() {
        assert!(PredicateSet::keyword("  ").validate().is_err());
        assert!(PredicateSet::tag("").validate().is_err());
        assert!(PredicateSet::keyword("go").validate().is_ok());
    }

    #[test]
    fn fingerprint_tracks_every_filter() {
        let base = PredicateSet::keyword("go");
        assert_eq!(base.fingerprint(), PredicateSet::keyword("go").fingerprint());
        assert_ne!(base.fingerprint(), PredicateSet::keyword("rust").fingerprint());
        assert_ne!(
            base.fingerprint(),
            base.clone().with_min_views(Some(1)).fingerprint()
        );
        assert_eq!(base.fingerprint().len(), 16);
    }
}
