//! Over-fetch pagination.
//!
//! The query asks the store for `limit + 1` rows. The extra row only signals
//! that another page exists and is never handed to the caller.

use crate::cursor::CursorKey;
use crate::model::ResultPage;

/// Turn an over-fetched row sequence into a page of at most `limit` items.
pub fn paginate<T: CursorKey>(mut rows: Vec<T>, limit: usize) -> ResultPage<T> {
    if rows.len() > limit.saturating_add(1) {
        tracing::warn!(
            rows = rows.len(),
            limit,
            "store returned more rows than requested; discarding the excess"
        );
    }
    let has_next = rows.len() > limit;
    rows.truncate(limit);
    let next_cursor = if has_next {
        rows.last().map(CursorKey::cursor_key)
    } else {
        None
    };
    ResultPage {
        items: rows,
        has_next,
        next_cursor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::Cursor;
    use chrono::{DateTime, TimeZone, Utc};
    use proptest::prelude::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item(i64);

    fn at(id: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 - id * 60, 0).single().unwrap()
    }

    impl CursorKey for Item {
        fn cursor_key(&self) -> Cursor {
            Cursor::new(at(self.0), self.0)
        }
    }

    fn items(n: i64) -> Vec<Item> {
        (0..n).map(Item).collect()
    }

    #[test]
    fn zero_rows() {
        let page = paginate(Vec::<Item>::new(), 10);
        assert!(page.items.is_empty());
        assert!(!page.has_next);
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn exactly_limit_rows_is_last_page() {
        let page = paginate(items(10), 10);
        assert_eq!(page.items.len(), 10);
        assert!(!page.has_next);
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn overfetched_row_is_trimmed() {
        let page = paginate(items(11), 10);
        assert_eq!(page.items.len(), 10);
        assert!(page.has_next);
        assert_eq!(page.next_cursor, Some(Cursor::new(at(9), 9)));
        assert!(!page.items.contains(&Item(10)));
    }

    #[test]
    fn store_over_delivery_is_discarded() {
        let page = paginate(items(30), 10);
        assert_eq!(page.items.len(), 10);
        assert!(page.has_next);
    }

    #[test]
    fn unbounded_limit_keeps_everything() {
        let page = paginate(items(3), usize::MAX);
        assert_eq!(page.items.len(), 3);
        assert!(!page.has_next);
        assert!(page.next_cursor.is_none());
    }

    proptest! {
        #[test]
        fn page_invariants(n in 0i64..250, limit in 1usize..=100) {
            let fetched: Vec<Item> = items(n).into_iter().take(limit + 1).collect();
            let page = paginate(fetched, limit);
            prop_assert!(page.items.len() <= limit);
            prop_assert_eq!(page.has_next, n as usize > limit);
            prop_assert_eq!(page.next_cursor.is_some(), page.has_next);
            if let Some(c) = page.next_cursor {
                prop_assert_eq!(c, page.items.last().unwrap().cursor_key());
            }
        }
    }
}
