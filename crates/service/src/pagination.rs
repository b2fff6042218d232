//! Cursor pagination utilities for service layer
//!
//! Lists are ordered by the caller; the cursor is the id of the last item
//! handed out, so a page keeps its position even when newer items arrive.

use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

pub const DEFAULT_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 50;

/// Pagination parameters as received from clients
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl PageRequest {
    pub fn new(cursor: Option<String>, limit: Option<u32>) -> Self { Self { cursor, limit } }

    /// Clamp the limit to `1..=MAX_LIMIT`, defaulting to `DEFAULT_LIMIT`.
    /// Blank cursors count as absent.
    pub fn normalize(&self) -> (Option<&str>, usize) {
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT) as usize;
        let cursor = self.cursor.as_deref().map(str::trim).filter(|c| !c.is_empty());
        (cursor, limit)
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CursorPage<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> CursorPage<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> CursorPage<U> {
        CursorPage { items: self.items.into_iter().map(f).collect(), next_cursor: self.next_cursor }
    }
}

/// Slice one page out of an already-ordered list.
pub fn paginate<T, F>(ordered: Vec<T>, req: &PageRequest, id_of: F) -> Result<CursorPage<T>, ServiceError>
where
    F: Fn(&T) -> &str,
{
    let (cursor, limit) = req.normalize();
    let start = match cursor {
        None => 0,
        Some(c) => ordered
            .iter()
            .position(|item| id_of(item) == c)
            .map(|i| i + 1)
            .ok_or_else(|| ServiceError::validation("invalid cursor"))?,
    };

    let remaining = ordered.len().saturating_sub(start);
    let items: Vec<T> = ordered.into_iter().skip(start).take(limit).collect();
    let next_cursor = if remaining > limit {
        items.last().map(|last| id_of(last).to_string())
    } else {
        None
    };
    Ok(CursorPage { items, next_cursor })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<String> { (0..n).map(|i| format!("id{i}")).collect() }

    #[test]
    fn normalize_clamps_limit() {
        assert_eq!(PageRequest::new(None, Some(0)).normalize().1, 1);
        assert_eq!(PageRequest::new(None, Some(1000)).normalize().1, 50);
        assert_eq!(PageRequest::default().normalize().1, 20);
        assert_eq!(PageRequest::new(Some("  ".into()), None).normalize().0, None);
    }

    #[test]
    fn walks_pages_until_exhausted() {
        let all = ids(5);
        let first = paginate(all.clone(), &PageRequest::new(None, Some(2)), |s| s.as_str()).unwrap();
        assert_eq!(first.items, vec!["id0", "id1"]);
        assert_eq!(first.next_cursor.as_deref(), Some("id1"));

        let second = paginate(all.clone(), &PageRequest::new(first.next_cursor, Some(2)), |s| s.as_str()).unwrap();
        assert_eq!(second.items, vec!["id2", "id3"]);

        let third = paginate(all, &PageRequest::new(second.next_cursor, Some(2)), |s| s.as_str()).unwrap();
        assert_eq!(third.items, vec!["id4"]);
        assert_eq!(third.next_cursor, None);
    }

    #[test]
    fn exact_fit_has_no_next_cursor() {
        let page = paginate(ids(2), &PageRequest::new(None, Some(2)), |s| s.as_str()).unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn unknown_cursor_is_rejected() {
        let err = paginate(ids(3), &PageRequest::new(Some("ghost".into()), None), |s| s.as_str()).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
