//! Entity operations.
//!
//! Each operation is a method on [`Client`](crate::Client) that builds one
//! GraphQL [`Operation`](crate::graphql::Operation), sends it to the right
//! service and converts the response into an entity from
//! [`types`](crate::types). Validation happens before anything is sent.

mod meta;
mod paste;
mod repository;

use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::graphql::Page;

/// Upper bound on pages followed by a single list scan.
pub(crate) const MAX_PAGES: usize = 64;

/// Walk a cursor-paginated list until `matches` finds an item.
///
/// `fetch` receives the cursor of the page to load (`None` for the first).
pub(crate) fn find_in_pages<T, F, P>(
    ctx: &RequestContext,
    what: &str,
    mut fetch: F,
    matches: P,
) -> Result<T>
where
    F: FnMut(Option<String>) -> Result<Page<T>>,
    P: Fn(&T) -> bool,
{
    let mut cursor = None;
    for _ in 0..MAX_PAGES {
        ctx.check()?;
        let page = fetch(cursor)?;
        if let Some(found) = page.results.into_iter().find(|item| matches(item)) {
            return Ok(found);
        }
        match page.cursor {
            Some(next) => cursor = Some(next),
            None => return Err(Error::not_found(what)),
        }
    }
    Err(gave_up(what))
}

/// Collect every item of a cursor-paginated list.
///
/// A list longer than [`MAX_PAGES`] is an error rather than a truncated result.
pub(crate) fn collect_pages<T, F>(ctx: &RequestContext, what: &str, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(Option<String>) -> Result<Page<T>>,
{
    let mut items = Vec::new();
    let mut cursor = None;
    for _ in 0..MAX_PAGES {
        ctx.check()?;
        let page = fetch(cursor)?;
        items.extend(page.results);
        match page.cursor {
            Some(next) => cursor = Some(next),
            None => return Ok(items),
        }
    }
    Err(gave_up(what))
}

/// The pager still had a cursor after [`MAX_PAGES`]; nothing is known about the rest.
fn gave_up(what: &str) -> Error {
    log::warn!("Gave up paging {what} after {MAX_PAGES} pages");
    Error::InvalidResponse(format!("gave up paging {what} after {MAX_PAGES} pages"))
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn page(items: &[i64], cursor: Option<&str>) -> Page<i64> {
        Page {
            results: items.to_vec(),
            cursor: cursor.map(String::from),
        }
    }

    #[test]
    fn test_find_follows_cursor() {
        let mut seen = Vec::new();
        let found = find_in_pages(
            &RequestContext::background(),
            "item 5",
            |cursor| {
                seen.push(cursor.clone());
                Ok(match cursor.as_deref() {
                    None => page(&[1, 2], Some("c1")),
                    Some("c1") => page(&[3, 5], None),
                    _ => unreachable!(),
                })
            },
            |n| *n == 5,
        )
        .unwrap();

        assert_eq!(found, 5);
        assert_eq!(seen, vec![None, Some("c1".to_string())]);
    }

    #[test]
    fn test_find_missing_is_not_found() {
        let err = find_in_pages(
            &RequestContext::background(),
            "item 9",
            |_| Ok(page(&[1, 2], None)),
            |n| *n == 9,
        )
        .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_find_stops_at_page_limit() {
        let mut calls = 0;
        let err = find_in_pages(
            &RequestContext::background(),
            "item 9",
            |_| {
                calls += 1;
                Ok(page(&[1], Some("again")))
            },
            |n| *n == 9,
        )
        .unwrap_err();
        assert!(!err.is_not_found());
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert_eq!(calls, MAX_PAGES);
    }

    #[test]
    fn test_collect_stops_at_page_limit() {
        let mut calls = 0;
        let err = collect_pages(&RequestContext::background(), "items", |_| {
            calls += 1;
            Ok(page(&[1], Some("again")))
        })
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert!(err.to_string().contains("items"));
        assert_eq!(calls, MAX_PAGES);
    }

    #[test]
    fn test_collect_pages() {
        let items = collect_pages(&RequestContext::background(), "items", |cursor| {
            Ok(match cursor.as_deref() {
                None => page(&[1, 2], Some("c1")),
                _ => page(&[3], None),
            })
        })
        .unwrap();
        assert_eq!(items, vec![1, 2, 3]);
    }
}
