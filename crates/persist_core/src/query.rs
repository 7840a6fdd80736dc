//! Query iterators.

use crate::database::Database;
use crate::document::Document;
use crate::error::PersistResult;
use crate::last_error::fail;
use persist_driver::Cursor;
use std::iter::FusedIterator;
use std::marker::PhantomData;
use tracing::warn;

/// Iterator over the documents matched by [`Collection::query`].
///
/// Yields documents until the driver reports exhaustion, after which it
/// keeps yielding nothing. The driver cursor is released by
/// [`QueryIter::close`] or, failing that, on drop.
///
/// [`Collection::query`]: crate::Collection::query
pub struct QueryIter<'db> {
    collection: String,
    cursor: Box<dyn Cursor>,
    exhausted: bool,
    closed: bool,
    _db: PhantomData<&'db Database>,
}

impl<'db> QueryIter<'db> {
    pub(crate) fn new(collection: &str, cursor: Box<dyn Cursor>) -> Self {
        Self {
            collection: collection.to_string(),
            cursor,
            exhausted: false,
            closed: false,
            _db: PhantomData,
        }
    }

    /// Returns the collection this iterator reads from.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Fetches the next document.
    ///
    /// `Ok(None)` means the query is exhausted; it is not an error, and
    /// calling again keeps returning `Ok(None)`. After the driver cursor
    /// fails, the error is returned once and the iterator is finished.
    pub fn next_document(&mut self) -> PersistResult<Option<Document>> {
        if self.exhausted {
            return Ok(None);
        }
        match self.cursor.next() {
            Ok(Some((id, value))) => Document::from_stored(&id, value).map(Some).map_err(fail),
            Ok(None) => {
                self.exhausted = true;
                Ok(None)
            }
            Err(err) => {
                // A failed cursor is not polled again
                self.exhausted = true;
                Err(fail(err))
            }
        }
    }

    /// Releases the driver cursor.
    pub fn close(mut self) -> PersistResult<()> {
        self.closed = true;
        self.cursor.close().map_err(fail)
    }
}

impl Iterator for QueryIter<'_> {
    type Item = PersistResult<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_document().transpose()
    }
}

impl FusedIterator for QueryIter<'_> {}

impl Drop for QueryIter<'_> {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(err) = self.cursor.close() {
                warn!(collection = %self.collection, error = %err, "failed to close cursor on drop");
            }
        }
    }
}

impl std::fmt::Debug for QueryIter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryIter")
            .field("collection", &self.collection)
            .field("exhausted", &self.exhausted)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use persist_driver::{DriverError, DriverResult};
    use persist_value::{dict, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Scripted {
        rows: Vec<(String, Value)>,
        pulls: Arc<AtomicUsize>,
        closes: Arc<AtomicUsize>,
    }

    impl Cursor for Scripted {
        fn next(&mut self) -> DriverResult<Option<(String, Value)>> {
            self.pulls.fetch_add(1, Ordering::SeqCst);
            if self.rows.is_empty() {
                Ok(None)
            } else {
                Ok(Some(self.rows.remove(0)))
            }
        }

        fn close(&mut self) -> DriverResult<()> {
            if self.closes.fetch_add(1, Ordering::SeqCst) > 0 {
                return Err(DriverError::Closed);
            }
            Ok(())
        }
    }

    fn scripted(rows: Vec<(String, Value)>) -> (QueryIter<'static>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let pulls = Arc::new(AtomicUsize::new(0));
        let closes = Arc::new(AtomicUsize::new(0));
        let cursor = Scripted {
            rows,
            pulls: Arc::clone(&pulls),
            closes: Arc::clone(&closes),
        };
        (QueryIter::new("docs", Box::new(cursor)), pulls, closes)
    }

    #[test]
    fn exhaustion_is_sticky() {
        let (mut iter, pulls, _) = scripted(vec![("1".into(), dict! { "n" => 1 })]);

        let doc = iter.next_document().unwrap().unwrap();
        assert_eq!(doc, dict! { "id" => "1", "n" => 1 });

        assert!(iter.next_document().unwrap().is_none());
        assert!(iter.next_document().unwrap().is_none());
        assert!(iter.next().is_none());
        assert_eq!(pulls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn non_dict_row_is_invalid_type() {
        let (mut iter, _, _) = scripted(vec![("1".into(), Value::from("oops"))]);
        let err = iter.next_document().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidType);
    }

    struct Broken {
        pulls: Arc<AtomicUsize>,
    }

    impl Cursor for Broken {
        fn next(&mut self) -> DriverResult<Option<(String, Value)>> {
            self.pulls.fetch_add(1, Ordering::SeqCst);
            Err(DriverError::other("cursor lost"))
        }

        fn close(&mut self) -> DriverResult<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_cursor_ends_iteration() {
        let pulls = Arc::new(AtomicUsize::new(0));
        let iter = QueryIter::new(
            "docs",
            Box::new(Broken {
                pulls: Arc::clone(&pulls),
            }),
        );

        let results: Vec<_> = iter.collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_ref().unwrap_err().kind(), ErrorKind::DriverError);
        assert_eq!(pulls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn explicit_close_releases_once() {
        let (iter, _, closes) = scripted(Vec::new());
        iter.close().unwrap();
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_releases_cursor() {
        let (mut iter, _, closes) = scripted(vec![("1".into(), dict! {})]);
        assert!(iter.next().is_some());
        drop(iter);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn collects_through_iterator() {
        let rows = vec![("a".into(), dict! {}), ("b".into(), dict! {})];
        let (iter, _, _) = scripted(rows);
        let ids: Vec<String> = iter
            .map(|doc| doc.map(|d| d.id().to_string()))
            .collect::<PersistResult<_>>()
            .unwrap();
        assert_eq!(ids, ["a", "b"]);
    }
}
