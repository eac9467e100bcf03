//! Lazily fetched, restartable sequences over server-side paged collections.
//!
//! A [`PagedSequence`] wraps a page-fetch callback `(skip) -> Option<Vec<T>>`.
//! Every traversal starts a fresh [`PageCursor`] at offset 0; the sequence
//! itself keeps no traversal state. A traversal ends only when the callback
//! returns no page or an empty page; a short page still triggers another
//! fetch at the advanced offset.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::stream::{self, Stream};
use tokio_util::sync::CancellationToken;

use crate::error::{LuisError, Result};

/// Boxed future produced by a page fetch.
pub type PageFuture<T> = Pin<Box<dyn Future<Output = Result<Option<Vec<T>>>> + Send>>;

/// Source of pages for a [`PagedSequence`].
pub trait PageSource<T>: Send + Sync {
    /// Fetches the page starting at `skip`. `None` or an empty page ends the sequence.
    fn fetch_page(&self, skip: usize, cancel: CancellationToken) -> PageFuture<T>;
}

impl<T, F, Fut> PageSource<T> for F
where
    F: Fn(usize, CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<Vec<T>>>> + Send + 'static,
{
    fn fetch_page(&self, skip: usize, cancel: CancellationToken) -> PageFuture<T> {
        Box::pin(self(skip, cancel))
    }
}

/// Restartable sequence of items spread over remote pages.
pub struct PagedSequence<T> {
    source: Arc<dyn PageSource<T>>,
    cancel: CancellationToken,
}

impl<T> Clone for PagedSequence<T> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            cancel: self.cancel.clone(),
        }
    }
}

impl<T> std::fmt::Debug for PagedSequence<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PagedSequence").finish_non_exhaustive()
    }
}

impl<T: Send + 'static> PagedSequence<T> {
    pub fn new(source: impl PageSource<T> + 'static, cancel: CancellationToken) -> Self {
        Self {
            source: Arc::new(source),
            cancel,
        }
    }

    /// Starts a new traversal at offset 0.
    pub fn cursor(&self) -> PageCursor<T> {
        PageCursor {
            source: Arc::clone(&self.source),
            cancel: self.cancel.clone(),
            skip: 0,
            page: Vec::new().into_iter(),
            finished: false,
        }
    }

    /// First item satisfying `predicate`; stops fetching once found.
    pub async fn find_first<P>(&self, mut predicate: P) -> Result<Option<T>>
    where
        P: FnMut(&T) -> bool,
    {
        let mut cursor = self.cursor();
        while let Some(page) = cursor.next_page().await? {
            if let Some(found) = page.into_iter().find(|item| predicate(item)) {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// Every item satisfying `predicate` across all pages.
    pub async fn collect_matching<P>(&self, mut predicate: P) -> Result<Vec<T>>
    where
        P: FnMut(&T) -> bool,
    {
        let mut cursor = self.cursor();
        let mut matched = Vec::new();
        while let Some(page) = cursor.next_page().await? {
            matched.extend(page.into_iter().filter(|item| predicate(item)));
        }
        Ok(matched)
    }

    pub async fn collect_all(&self) -> Result<Vec<T>> {
        self.collect_matching(|_| true).await
    }

    /// Adapts a fresh traversal into a [`Stream`].
    pub fn stream(&self) -> impl Stream<Item = Result<T>> + Send {
        stream::try_unfold(self.cursor(), |mut cursor| async move {
            let item = cursor.next().await?;
            Ok::<_, LuisError>(item.map(|item| (item, cursor)))
        })
    }
}

/// Single traversal over a [`PagedSequence`].
pub struct PageCursor<T> {
    source: Arc<dyn PageSource<T>>,
    cancel: CancellationToken,
    skip: usize,
    page: std::vec::IntoIter<T>,
    finished: bool,
}

impl<T: Send + 'static> PageCursor<T> {
    /// Next item, fetching the next page when the current one is exhausted.
    pub async fn next(&mut self) -> Result<Option<T>> {
        loop {
            if let Some(item) = self.page.next() {
                return Ok(Some(item));
            }
            match self.next_page().await? {
                Some(page) => self.page = page.into_iter(),
                None => return Ok(None),
            }
        }
    }

    /// Fetches the page at the current offset and advances past it.
    ///
    /// Items still buffered from a previous page are discarded.
    pub async fn next_page(&mut self) -> Result<Option<Vec<T>>> {
        if self.finished {
            return Ok(None);
        }
        if self.cancel.is_cancelled() {
            return Err(LuisError::Cancelled);
        }

        let page = self
            .source
            .fetch_page(self.skip, self.cancel.clone())
            .await?;

        match page {
            Some(page) if !page.is_empty() => {
                self.skip += page.len();
                self.page = Vec::new().into_iter();
                Ok(Some(page))
            }
            _ => {
                self.finished = true;
                Ok(None)
            }
        }
    }

    /// Returns the cursor to offset 0 and drops the buffered page.
    pub fn reset(&mut self) {
        self.skip = 0;
        self.page = Vec::new().into_iter();
        self.finished = false;
    }

    /// Cumulative number of items fetched so far.
    pub const fn offset(&self) -> usize {
        self.skip
    }
}
