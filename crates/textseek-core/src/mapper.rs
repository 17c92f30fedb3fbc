use crate::errors::{Result, SearchError};
use crate::model::{Document, Row, Value};
use chrono::{DateTime, Utc};

pub fn to_document(row: &Row) -> Result<Document> {
    Ok(Document {
        id: int(row, "id")?,
        title: text(row, "title")?,
        author: optional_text(row, "author")?,
        content: optional_text(row, "content")?,
        tags: match row.get("tags") {
            None | Some(Value::Null) => Default::default(),
            Some(Value::TextList(tags)) => tags.iter().cloned().collect(),
            Some(other) => return Err(mismatch("tags", other)),
        },
        view_count: u64::try_from(int(row, "view_count")?)
            .map_err(|_| SearchError::storage("column `view_count` is negative"))?,
        published_at: timestamp(row, "published_at")?,
    })
}

pub fn to_documents(rows: &[Row]) -> Result<Vec<Document>> {
    rows.iter().map(to_document).collect()
}

/// Suggestion rows carry only `title`.
pub fn to_titles(rows: &[Row]) -> Result<Vec<String>> {
    rows.iter().map(|r| text(r, "title")).collect()
}

fn required<'a>(row: &'a Row, column: &str) -> Result<&'a Value> {
    match row.get(column) {
        None | Some(Value::Null) => Err(SearchError::storage(format!(
            "row is missing column `{column}`"
        ))),
        Some(v) => Ok(v),
    }
}

fn mismatch(column: &str, got: &Value) -> SearchError {
    SearchError::storage(format!("column `{column}` has unexpected value {got:?}"))
}

fn int(row: &Row, column: &str) -> Result<i64> {
    match required(row, column)? {
        Value::Int(v) => Ok(*v),
        other => Err(mismatch(column, other)),
    }
}

fn text(row: &Row, column: &str) -> Result<String> {
    match required(row, column)? {
        Value::Text(v) => Ok(v.clone()),
        other => Err(mismatch(column, other)),
    }
}

fn optional_text(row: &Row, column: &str) -> Result<String> {
    match row.get(column) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::Text(v)) => Ok(v.clone()),
        Some(other) => Err(mismatch(column, other)),
    }
}

fn timestamp(row: &Row, column: &str) -> Result<DateTime<Utc>> {
    match required(row, column)? {
        Value::Timestamp(v) => Ok(*v),
        other => Err(mismatch(column, other)),
    }
}
