use std::collections::HashSet;
use std::ops::ControlFlow;

use crate::store::{Page, StoreError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub pages: usize,
    pub items: usize,
    pub stopped_early: bool,
}

/// Drives a cursor listing to exhaustion, one page at a time.
///
/// `fetch` receives the cursor from the previous page (`None` on the first
/// call). `visit` receives each page's items and may return
/// `ControlFlow::Break` to end the walk before the next fetch. Pages are
/// consumed strictly sequentially. Any cursor handed back twice in one walk
/// is a `CursorStalled` error.
pub fn walk_pages<T, F, V>(mut fetch: F, mut visit: V) -> Result<WalkStats, StoreError>
where
    F: FnMut(Option<&str>) -> Result<Page<T>, StoreError>,
    V: FnMut(Vec<T>) -> Result<ControlFlow<()>, StoreError>,
{
    let mut stats = WalkStats::default();
    let mut cursor: Option<String> = None;
    let mut seen_cursors: HashSet<String> = HashSet::new();

    loop {
        let page = fetch(cursor.as_deref())?;
        stats.pages += 1;
        stats.items += page.items.len();

        let next = match (page.complete, page.cursor) {
            (true, _) => None,
            (false, Some(next)) => {
                if !seen_cursors.insert(next.clone()) {
                    return Err(StoreError::CursorStalled { cursor: next });
                }
                Some(next)
            }
            (false, None) => {
                tracing::warn!(
                    pages = stats.pages,
                    "listing reported more results without a cursor; treating as exhausted"
                );
                None
            }
        };

        if visit(page.items)?.is_break() {
            stats.stopped_early = next.is_some();
            return Ok(stats);
        }

        match next {
            Some(next) => cursor = Some(next),
            None => return Ok(stats),
        }
    }
}
