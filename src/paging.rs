//! Lazy traversal of paginated Graph API collections.
//!
//! List endpoints answer with one page of results plus a cursor to the next:
//!
//! ```json
//! { "data": [ {...}, {...} ], "paging": { "next": "https://graph...&after=QVFI" } }
//! ```
//!
//! [`PaginatedCollection`] buffers the pages it has seen and fetches the next
//! one only when the caller moves past the last buffered page. Traversal ends
//! when a page has no `paging.next` or a fetched page has an empty `data`
//! array. Each fetch is a fresh authenticated GET; pages are discovered one
//! at a time, so there is no way to fetch them in parallel.
//!
//! The collection can be read page by page ([`next_page`], [`previous_page`],
//! [`rewind`]) or item by item through its [`Iterator`] impl. Both share one
//! cursor.
//!
//! [`next_page`]: PaginatedCollection::next_page
//! [`previous_page`]: PaginatedCollection::previous_page
//! [`rewind`]: PaginatedCollection::rewind

use std::collections::VecDeque;

use serde_json::Value;

use crate::dispatch::RequestDispatcher;
use crate::error::Result;
use crate::object::{GraphObject, ObjectFactory};

/// A lazily fetched, restartable sequence of objects spread over pages.
pub struct PaginatedCollection<'a> {
    factory: &'a ObjectFactory,
    dispatcher: &'a RequestDispatcher,
    access_token: Option<String>,
    kind: String,
    /// Non-empty pages fetched so far, in order.
    pages: Vec<Vec<GraphObject>>,
    /// Cursor to the page after the last buffered one.
    next_url: Option<String>,
    /// Index of the page most recently handed out.
    current: Option<usize>,
    /// Items of the current page not yet yielded by the iterator.
    pending: VecDeque<GraphObject>,
    failed: bool,
}

impl<'a> PaginatedCollection<'a> {
    /// Starts a collection at `first`, following its `paging.next` cursor.
    pub(crate) fn from_first_page(
        factory: &'a ObjectFactory,
        dispatcher: &'a RequestDispatcher,
        access_token: Option<&str>,
        kind: &str,
        first: &GraphObject,
    ) -> Self {
        let next_url = next_link(first.value());
        Self::build(factory, dispatcher, access_token, kind, first, next_url)
    }

    /// A collection holding just `obj`'s `data` array, for responses that
    /// carry no `paging` block. It never touches the network.
    pub fn single_page(
        factory: &'a ObjectFactory,
        dispatcher: &'a RequestDispatcher,
        kind: &str,
        obj: &GraphObject,
    ) -> Self {
        Self::build(factory, dispatcher, None, kind, obj, None)
    }

    fn build(
        factory: &'a ObjectFactory,
        dispatcher: &'a RequestDispatcher,
        access_token: Option<&str>,
        kind: &str,
        first: &GraphObject,
        next_url: Option<String>,
    ) -> Self {
        let items = factory.data_items(first, kind);
        let (pages, next_url) = if items.is_empty() {
            (Vec::new(), None)
        } else {
            (vec![items], next_url)
        };
        PaginatedCollection {
            factory,
            dispatcher,
            access_token: access_token.map(str::to_owned),
            kind: kind.to_string(),
            pages,
            next_url,
            current: None,
            pending: VecDeque::new(),
            failed: false,
        }
    }

    /// The kind every item is materialized as.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Number of pages fetched so far.
    pub fn buffered_pages(&self) -> usize {
        self.pages.len()
    }

    /// Whether another page may follow the current one.
    pub fn has_more(&self) -> bool {
        let next = self.current.map_or(0, |c| c + 1);
        next < self.pages.len() || self.next_url.is_some()
    }

    /// Advances to the next page, fetching it if it is not buffered yet.
    /// Returns `None` once the collection is exhausted.
    ///
    /// # Errors
    ///
    /// - `GraphError::Api`: the fetched page is an error envelope.
    /// - `GraphError::Parse`: the fetched page is not JSON.
    /// - `GraphError::Authentication` / `GraphError::Transport`: from the
    ///   dispatcher.
    pub fn next_page(&mut self) -> Result<Option<Vec<GraphObject>>> {
        let index = self.current.map_or(0, |c| c + 1);
        if index >= self.pages.len() && !self.fetch_next()? {
            return Ok(None);
        }
        self.current = Some(index);
        Ok(self.pages.get(index).cloned())
    }

    /// Steps back to the page before the current one. Before the first page
    /// this returns an empty page and resets the cursor to the start.
    pub fn previous_page(&mut self) -> Vec<GraphObject> {
        self.pending.clear();
        match self.current {
            Some(c) if c > 0 => {
                self.current = Some(c - 1);
                self.pages[c - 1].clone()
            }
            _ => {
                self.current = None;
                Vec::new()
            }
        }
    }

    /// Restarts traversal from the first page. Buffered pages are replayed
    /// without refetching.
    pub fn rewind(&mut self) {
        self.current = None;
        self.pending.clear();
        self.failed = false;
    }

    /// The cursor is only consumed once the fetched page passes the error
    /// check, so a failed fetch can be retried after [`rewind`](Self::rewind).
    fn fetch_next(&mut self) -> Result<bool> {
        let Some(url) = self.next_url.clone() else {
            return Ok(false);
        };

        tracing::debug!(page = self.pages.len() + 1, kind = %self.kind, "fetching next page");
        let payload = self
            .dispatcher
            .follow_paging_url(self.access_token.as_deref(), &url)?;
        let page = self
            .factory
            .wrap(&self.kind, self.factory.parse(&payload)?)
            .check()?;

        let items = self.factory.data_items(&page, &self.kind);
        if items.is_empty() {
            tracing::debug!(kind = %self.kind, "empty page, collection exhausted");
            self.next_url = None;
            return Ok(false);
        }
        self.next_url = next_link(page.value());
        self.pages.push(items);
        Ok(true)
    }
}

impl Iterator for PaginatedCollection<'_> {
    type Item = Result<GraphObject>;

    /// Yields items across pages. After an error the iterator is fused
    /// until [`PaginatedCollection::rewind`], which replays the buffered
    /// pages and then retries the page that failed.
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some(Ok(item));
            }
            if self.failed {
                return None;
            }
            match self.next_page() {
                Ok(Some(page)) => self.pending.extend(page),
                Ok(None) => return None,
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

fn next_link(value: &Value) -> Option<String> {
    value
        .pointer("/paging/next")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;
    use crate::transport::testing::ScriptedTransport;
    use serde_json::json;
    use std::sync::Arc;

    fn dispatcher(transport: Arc<ScriptedTransport>) -> RequestDispatcher {
        RequestDispatcher::new(Box::new(transport), "https://graph.example/v5.0/")
    }

    fn ids(items: &[GraphObject]) -> Vec<&str> {
        items.iter().filter_map(|i| i.str_field("id")).collect()
    }

    fn first_page() -> GraphObject {
        GraphObject::new(
            "photos",
            json!({"data":[{"id":"a"},{"id":"b"}],"paging":{"next":"https://graph.example/v5.0/me/photos?access_token=tok&after=U2"}}),
        )
    }

    #[test]
    fn iterates_across_pages_then_terminates() {
        let transport = ScriptedTransport::replying(&[r#"{"data":[{"id":"c"}],"paging":{}}"#]);
        let d = dispatcher(transport.clone());
        let factory = ObjectFactory::default();
        let first = first_page();
        let collection = factory
            .make_paginated_collection(&first, "photos", &d, Some("tok"))
            .expect("paging block present");

        let items: Vec<GraphObject> = collection.collect::<Result<_>>().unwrap();
        assert_eq!(ids(&items), ["a", "b", "c"]);
        assert!(items.iter().all(|i| i.kind() == Some("photos")));

        let sent = transport.requests();
        assert_eq!(sent.len(), 1, "exactly one page fetch");
        assert_eq!(sent[0].url, "https://graph.example/v5.0/me/photos");
        assert!(sent[0].params.contains(&("after".to_string(), "U2".to_string())));
    }

    #[test]
    fn empty_fetched_page_ends_traversal_even_with_cursor() {
        let transport = ScriptedTransport::replying(&[
            r#"{"data":[],"paging":{"next":"https://graph.example/v5.0/me/photos?after=U3"}}"#,
        ]);
        let d = dispatcher(transport.clone());
        let factory = ObjectFactory::default();
        let first = first_page();
        let mut collection = factory
            .make_paginated_collection(&first, "photos", &d, Some("tok"))
            .unwrap();

        assert_eq!(ids(&collection.next_page().unwrap().unwrap()), ["a", "b"]);
        assert!(collection.next_page().unwrap().is_none());
        assert!(collection.next_page().unwrap().is_none());
        assert!(!collection.has_more());
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn object_without_paging_is_not_paginated() {
        let d = dispatcher(ScriptedTransport::replying(&[]));
        let factory = ObjectFactory::default();
        let legacy = GraphObject::new("friends", json!({"data":[{"id":"f1"}]}));
        assert!(factory
            .make_paginated_collection(&legacy, "friends", &d, Some("tok"))
            .is_none());

        let single = PaginatedCollection::single_page(&factory, &d, "friends", &legacy);
        let items: Vec<GraphObject> = single.collect::<Result<_>>().unwrap();
        assert_eq!(ids(&items), ["f1"]);
    }

    #[test]
    fn previous_and_rewind_replay_buffered_pages() {
        let transport = ScriptedTransport::replying(&[r#"{"data":[{"id":"c"}]}"#]);
        let d = dispatcher(transport.clone());
        let factory = ObjectFactory::default();
        let first = first_page();
        let mut collection = factory
            .make_paginated_collection(&first, "photos", &d, Some("tok"))
            .unwrap();

        let page1 = collection.next_page().unwrap().unwrap();
        let page2 = collection.next_page().unwrap().unwrap();
        assert_eq!(ids(&page2), ["c"]);
        assert_eq!(collection.previous_page(), page1);
        assert!(collection.previous_page().is_empty(), "nothing before page 1");

        collection.rewind();
        let replayed: Vec<GraphObject> = collection.by_ref().collect::<Result<_>>().unwrap();
        assert_eq!(ids(&replayed), ["a", "b", "c"]);
        assert_eq!(collection.buffered_pages(), 2);
        assert_eq!(transport.requests().len(), 1, "replay must not refetch");
    }

    #[test]
    fn error_page_surfaces_api_error_and_stops() {
        let transport = ScriptedTransport::replying(&[
            r#"{"error":{"message":"Error validating access token","code":190}}"#,
        ]);
        let d = dispatcher(transport);
        let factory = ObjectFactory::default();
        let first = first_page();
        let mut collection = factory
            .make_paginated_collection(&first, "photos", &d, Some("tok"))
            .unwrap();

        assert!(collection.next().unwrap().is_ok());
        assert!(collection.next().unwrap().is_ok());
        match collection.next() {
            Some(Err(GraphError::Api { message, .. })) => {
                assert_eq!(message, "Error validating access token")
            }
            other => panic!("expected API error, got {other:?}"),
        }
        assert!(collection.next().is_none());
    }

    #[test]
    fn rewind_after_failed_fetch_retries_the_same_cursor() {
        let transport = ScriptedTransport::replying(&[
            r#"{"error":{"message":"temporarily unavailable","code":2}}"#,
            r#"{"data":[{"id":"c"}]}"#,
        ]);
        let d = dispatcher(transport.clone());
        let factory = ObjectFactory::default();
        let first = first_page();
        let mut collection = factory
            .make_paginated_collection(&first, "photos", &d, Some("tok"))
            .unwrap();

        let first_pass: Vec<Result<GraphObject>> = collection.by_ref().collect();
        assert_eq!(first_pass.len(), 3);
        assert!(matches!(first_pass[2], Err(GraphError::Api { .. })));
        assert!(collection.has_more(), "cursor survives the failed fetch");

        collection.rewind();
        let items: Vec<GraphObject> = collection.collect::<Result<_>>().unwrap();
        assert_eq!(ids(&items), ["a", "b", "c"]);

        let sent = transport.requests();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], sent[1], "retry targets the same page");
    }
}
