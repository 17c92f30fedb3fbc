//! Keyset cursor and its opaque wire token.
//!
//! A token is URL-safe base64 (no padding) over a small JSON envelope:
//!
//! ```text
//! {"v":1,"sort":"published_at_desc,id_desc","scope":"<fingerprint>","ts":"<rfc3339>","id":42}
//! ```
//!
//! `scope` is the fingerprint of the predicate set the cursor was issued for,
//! so a token replayed against different filters fails to decode instead of
//! seeking into an unrelated result set.

use crate::errors::{Result, SearchError};
use crate::predicate::PredicateSet;
use crate::query::SortSpec;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub const CURSOR_VERSION: u32 = 1;

// Untrusted input bound.
const MAX_TOKEN_LEN: usize = 1024;

/// Position of the last row of a page under `SortSpec::Recency`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cursor {
    pub published_at: DateTime<Utc>,
    pub id: i64,
}

/// Anything that can report its position in the recency order.
pub trait CursorKey {
    fn cursor_key(&self) -> Cursor;
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    v: u32,
    sort: String,
    scope: String,
    ts: String,
    id: i64,
}

impl Cursor {
    pub const fn new(published_at: DateTime<Utc>, id: i64) -> Self {
        Self { published_at, id }
    }

    /// Encode as an opaque token bound to `filters`.
    pub fn encode(&self, filters: &PredicateSet) -> String {
        let env = Envelope {
            v: CURSOR_VERSION,
            sort: SortSpec::Recency.label().to_string(),
            scope: filters.fingerprint(),
            ts: self.published_at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            id: self.id,
        };
        // Serializing a struct of strings and integers cannot fail.
        let json = serde_json::to_vec(&env).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Decode a token previously produced by [`Cursor::encode`] for the same filters.
    pub fn decode(token: &str, filters: &PredicateSet) -> Result<Self> {
        let token = token.trim();
        if token.is_empty() {
            return Err(SearchError::encoding("cursor token is empty"));
        }
        if token.len() > MAX_TOKEN_LEN {
            return Err(SearchError::encoding(format!(
                "cursor token exceeds {MAX_TOKEN_LEN} bytes"
            )));
        }
        let raw = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|e| SearchError::encoding(format!("cursor token is not base64: {e}")))?;
        let env: Envelope = serde_json::from_slice(&raw)
            .map_err(|e| SearchError::encoding(format!("cursor payload unreadable: {e}")))?;
        if env.v != CURSOR_VERSION {
            return Err(SearchError::encoding(format!(
                "unsupported cursor version {}",
                env.v
            )));
        }
        if env.sort != SortSpec::Recency.label() {
            return Err(SearchError::encoding(format!(
                "cursor was issued for sort `{}`",
                env.sort
            )));
        }
        if env.scope != filters.fingerprint() {
            return Err(SearchError::encoding(
                "cursor was issued for a different set of filters",
            ));
        }
        let published_at = DateTime::parse_from_rfc3339(&env.ts)
            .map_err(|e| SearchError::encoding(format!("cursor timestamp: {e}")))?
            .with_timezone(&Utc);
        Ok(Self::new(published_at, env.id))
    }
}
