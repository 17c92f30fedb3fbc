use crate::cursor::{Cursor, CursorKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub type DocumentId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub view_count: u64,
    pub published_at: DateTime<Utc>,
}

impl CursorKey for Document {
    fn cursor_key(&self) -> Cursor {
        Cursor::new(self.published_at, self.id)
    }
}

/// A single column value as returned by a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Int(i64),
    Text(String),
    TextList(Vec<String>),
    Timestamp(DateTime<Utc>),
}

/// Raw row keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row(pub BTreeMap<String, Value>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: Value) -> Self {
        self.0.insert(column.to_string(), value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }
}

impl From<&Document> for Row {
    fn from(doc: &Document) -> Self {
        Row::new()
            .with("id", Value::Int(doc.id))
            .with("title", Value::Text(doc.title.clone()))
            .with("author", Value::Text(doc.author.clone()))
            .with("content", Value::Text(doc.content.clone()))
            .with("tags", Value::TextList(doc.tags.iter().cloned().collect()))
            .with(
                "view_count",
                Value::Int(i64::try_from(doc.view_count).unwrap_or(i64::MAX)),
            )
            .with("published_at", Value::Timestamp(doc.published_at))
    }
}

/// Bound query parameter, in placeholder order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Param {
    Text(String),
    Int(i64),
    Timestamp(DateTime<Utc>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultPage<T> {
    pub items: Vec<T>,
    pub has_next: bool,
    pub next_cursor: Option<Cursor>,
}

