use crate::traits::Store;
use parking_lot::RwLock;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use textseek_core::{
    Document, DocumentId, Predicate, QueryShape, Result, Row, SearchQuery, SortSpec, Value,
};

/// Store adapter that evaluates queries directly over documents held in memory.
///
/// Full-text matching follows the PGroonga query syntax closely enough for
/// tests and small datasets: whitespace-separated terms are AND-ed, `OR`
/// separates alternatives, `-term` excludes and `"..."` groups a phrase.
/// Matching is case-insensitive substring matching per column.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    docs: BTreeMap<DocumentId, Document>,
    // tag -> ids carrying it
    tag_index: HashMap<String, BTreeSet<DocumentId>>,
}

impl Inner {
    fn unindex(&mut self, doc: &Document) {
        for tag in &doc.tags {
            if let Some(ids) = self.tag_index.get_mut(tag) {
                ids.remove(&doc.id);
                if ids.is_empty() {
                    self.tag_index.remove(tag);
                }
            }
        }
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_documents(docs: impl IntoIterator<Item = Document>) -> Self {
        let store = Self::new();
        for d in docs {
            store.insert(d);
        }
        store
    }

    /// Insert or replace a document by id.
    pub fn insert(&self, doc: Document) {
        let mut inner = self.inner.write();
        if let Some(old) = inner.docs.remove(&doc.id) {
            inner.unindex(&old);
        }
        for tag in &doc.tags {
            inner
                .tag_index
                .entry(tag.clone())
                .or_default()
                .insert(doc.id);
        }
        inner.docs.insert(doc.id, doc);
    }

    pub fn remove(&self, id: DocumentId) -> Option<Document> {
        let mut inner = self.inner.write();
        let doc = inner.docs.remove(&id)?;
        inner.unindex(&doc);
        Some(doc)
    }

    pub fn len(&self) -> usize {
        self.inner.read().docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evaluate(&self, query: &SearchQuery) -> Vec<Row> {
        let inner = self.inner.read();
        let tag = query.predicates().iter().find_map(|p| match p {
            Predicate::Tag(t) => Some(t.as_str()),
            _ => None,
        });
        let mut hits: Vec<&Document> = match tag {
            Some(t) => inner
                .tag_index
                .get(t)
                .into_iter()
                .flatten()
                .filter_map(|id| inner.docs.get(id))
                .collect(),
            None => inner.docs.values().collect(),
        };
        hits.retain(|d| query.predicates().iter().all(|p| satisfies(p, d)));
        match query.sort() {
            // id breaks view_count ties so repeated calls return the same order
            SortSpec::Popularity => hits.sort_by_key(|d| Reverse((d.view_count, d.id))),
            SortSpec::Recency => hits.sort_by_key(|d| Reverse((d.published_at, d.id))),
            SortSpec::Title => hits.sort_by(|a, b| a.title.cmp(&b.title)),
        }
        match query.shape() {
            QueryShape::Documents => hits
                .into_iter()
                .take(query.fetch_limit())
                .map(Row::from)
                .collect(),
            QueryShape::Suggest => {
                let mut titles: Vec<&str> = hits.iter().map(|d| d.title.as_str()).collect();
                titles.dedup();
                titles
                    .into_iter()
                    .take(query.fetch_limit())
                    .map(|t| Row::new().with("title", Value::Text(t.to_string())))
                    .collect()
            }
        }
    }
}

#[async_trait::async_trait]
impl Store for InMemoryStore {
    async fn execute(&self, query: &SearchQuery) -> Result<Vec<Row>> {
        Ok(self.evaluate(query))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

fn satisfies(p: &Predicate, doc: &Document) -> bool {
    match p {
        Predicate::Tag(t) => doc.tags.contains(t),
        Predicate::FullText(q) => fulltext_match(&doc.title, q) || fulltext_match(&doc.content, q),
        Predicate::MinViews(min) => doc.view_count >= *min,
        Predicate::TitlePrefix(prefix) => prefix_match(&doc.title, prefix),
        Predicate::SeekBefore(c) => (doc.published_at, doc.id) < (c.published_at, c.id),
    }
}

fn prefix_match(text: &str, prefix: &str) -> bool {
    text.to_lowercase().starts_with(&prefix.to_lowercase())
}

#[derive(Debug, PartialEq)]
enum Term {
    Include(String),
    Exclude(String),
}

/// Parse into OR-separated groups of AND-ed terms.
fn parse_fulltext(query: &str) -> Vec<Vec<Term>> {
    let mut groups = vec![Vec::new()];
    let mut chars = query.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let negate = c == '-';
        if negate {
            chars.next();
        }
        let mut word = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            for c in chars.by_ref() {
                if c == '"' {
                    break;
                }
                word.push(c);
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                word.push(c);
                chars.next();
            }
        }
        if !negate && word == "OR" {
            groups.push(Vec::new());
            continue;
        }
        if word.is_empty() {
            continue;
        }
        let word = word.to_lowercase();
        if let Some(group) = groups.last_mut() {
            group.push(if negate {
                Term::Exclude(word)
            } else {
                Term::Include(word)
            });
        }
    }
    groups.retain(|g| !g.is_empty());
    groups
}

fn fulltext_match(text: &str, query: &str) -> bool {
    let haystack = text.to_lowercase();
    parse_fulltext(query).iter().any(|group| {
        group.iter().any(|t| matches!(t, Term::Include(_)))
            && group.iter().all(|t| match t {
                Term::Include(w) => haystack.contains(w.as_str()),
                Term::Exclude(w) => !haystack.contains(w.as_str()),
            })
    })
}
