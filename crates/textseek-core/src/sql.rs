//! SQL dialect settings and positional parameter binding.

use crate::errors::{Result, SearchError};
use crate::model::Param;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderStyle {
    /// `$1`, `$2`, ... A value used twice is bound once and referenced twice.
    Numbered,
    /// `?` for every occurrence; repeated values are bound again.
    Anonymous,
}

/// How the seek clause compares `(published_at, id)` against the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TupleCompare {
    /// `(published_at, id) < ($a, $b)`
    RowValue,
    /// `(published_at < $a OR (published_at = $a AND id < $b))` for stores
    /// without row-value comparison.
    Expanded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorStyle {
    /// `&@~` full-text, `&^` prefix, `= ANY(tags)` containment.
    PGroonga,
    /// `fulltext_match(col, ?)`, `prefix_match(col, ?)`, `tag_contains(tags, ?)`.
    Functions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialect {
    pub table: String,
    pub placeholders: PlaceholderStyle,
    pub tuple_compare: TupleCompare,
    pub operators: OperatorStyle,
}

impl Dialect {
    pub fn pgroonga() -> Self {
        Self {
            table: "documents".to_string(),
            placeholders: PlaceholderStyle::Numbered,
            tuple_compare: TupleCompare::RowValue,
            operators: OperatorStyle::PGroonga,
        }
    }

    pub fn generic() -> Self {
        Self {
            table: "documents".to_string(),
            placeholders: PlaceholderStyle::Anonymous,
            tuple_compare: TupleCompare::Expanded,
            operators: OperatorStyle::Functions,
        }
    }

    /// Target another table. The name lands in SQL text, so only plain
    /// (optionally schema-qualified) identifiers are accepted.
    pub fn with_table(mut self, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        if !is_identifier(&table) {
            return Err(SearchError::invalid(format!(
                "table `{table}` is not a plain identifier"
            )));
        }
        self.table = table;
        Ok(self)
    }

    pub fn with_tuple_compare(mut self, mode: TupleCompare) -> Self {
        self.tuple_compare = mode;
        self
    }

    /// Look up a preset by name (`pgroonga` or `generic`).
    pub fn named(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "pgroonga" | "postgres" => Some(Self::pgroonga()),
            "generic" => Some(Self::generic()),
            _ => None,
        }
    }
}

impl Default for Dialect {
    fn default() -> Self {
        Self::pgroonga()
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// Collects parameters in placeholder order.
#[derive(Debug)]
pub struct Binder {
    style: PlaceholderStyle,
    params: Vec<Param>,
}

impl Binder {
    pub fn new(style: PlaceholderStyle) -> Self {
        Self {
            style,
            params: Vec::new(),
        }
    }

    pub fn bind(&mut self, param: Param) -> String {
        self.params.push(param);
        self.placeholder()
    }

    /// Bind `param` for `uses` occurrences and return one placeholder per use.
    pub fn bind_repeated(&mut self, param: Param, uses: usize) -> Vec<String> {
        match self.style {
            PlaceholderStyle::Numbered => {
                let ph = self.bind(param);
                vec![ph; uses]
            }
            PlaceholderStyle::Anonymous => (0..uses).map(|_| self.bind(param.clone())).collect(),
        }
    }

    fn placeholder(&self) -> String {
        match self.style {
            PlaceholderStyle::Numbered => format!("${}", self.params.len()),
            PlaceholderStyle::Anonymous => "?".to_string(),
        }
    }

    pub fn into_params(self) -> Vec<Param> {
        self.params
    }
}
