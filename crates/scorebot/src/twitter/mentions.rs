//! Mention source: a cursor-carrying, lazily paginated stream of mentions.

use futures::stream::{self, Stream};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::client::TwitterApi;
use super::parser::parse_mentions_page;
use super::types::MentionEvent;
use crate::error::Result;

/// Walks the mentions timeline page by page.
///
/// The cursor lives only in memory. A restarted process starts again from the
/// newest page and relies on the dedup store to skip work it already did.
pub struct MentionSource {
    api: Arc<dyn TwitterApi>,
    cursor: Option<String>,
}

impl MentionSource {
    /// Create a source starting without a cursor.
    #[must_use]
    pub fn new(api: Arc<dyn TwitterApi>) -> Self {
        Self { api, cursor: None }
    }

    /// Current pagination cursor.
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// Fetch the next page and advance the cursor.
    pub async fn next_page(&mut self) -> Result<Vec<MentionEvent>> {
        let body = self.api.fetch_mentions(self.cursor.as_deref()).await?;
        let page = parse_mentions_page(&body)?;
        tracing::debug!(
            cursor = %page.cursor,
            mentions = page.events.len(),
            "Fetched mentions page"
        );
        self.cursor = Some(page.cursor);
        Ok(page.events)
    }

    /// Turn the source into an endless stream of mentions in page order.
    ///
    /// The stream ends when `stop` is cancelled (checked between pages and
    /// while a fetch is in flight) or right after yielding a fetch error.
    pub fn into_stream(self, stop: CancellationToken) -> impl Stream<Item = Result<MentionEvent>> {
        let state = StreamState {
            source: self,
            buffer: VecDeque::new(),
            stop,
            failed: false,
        };

        stream::unfold(state, |mut state| async move {
            loop {
                if state.failed {
                    return None;
                }
                if let Some(event) = state.buffer.pop_front() {
                    return Some((Ok(event), state));
                }
                if state.stop.is_cancelled() {
                    return None;
                }

                let page = tokio::select! {
                    biased;
                    () = state.stop.cancelled() => return None,
                    page = state.source.next_page() => page,
                };
                match page {
                    Ok(events) => state.buffer.extend(events),
                    Err(e) => {
                        state.failed = true;
                        return Some((Err(e), state));
                    }
                }
            }
        })
    }
}

struct StreamState {
    source: MentionSource,
    buffer: VecDeque<MentionEvent>,
    stop: CancellationToken,
    failed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BotError;
    use crate::twitter::parser::fixtures::{mentions_body, notification};
    use async_trait::async_trait;
    use futures::StreamExt;
    use serde_json::Value;
    use std::sync::Mutex;

    /// Serves canned pages and records the cursor of each request.
    struct PagedApi {
        pages: Mutex<VecDeque<Value>>,
        cursors: Mutex<Vec<Option<String>>>,
    }

    impl PagedApi {
        fn new(pages: Vec<Value>) -> Arc<Self> {
            Arc::new(Self {
                pages: Mutex::new(pages.into()),
                cursors: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TwitterApi for PagedApi {
        async fn fetch_mentions(&self, cursor: Option<&str>) -> Result<Value> {
            self.cursors.lock().unwrap().push(cursor.map(str::to_string));
            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| BotError::malformed("no more pages"))
        }

        async fn fetch_tweet_detail(&self, _tweet_id: &str) -> Result<Value> {
            unreachable!()
        }

        async fn create_reply(&self, _in_reply_to: &str, _text: &str) -> Result<Value> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn test_cursor_carried_between_pages() {
        let api = PagedApi::new(vec![
            mentions_body(Some("c1"), vec![notification(Some("1"), "10")]),
            mentions_body(Some("c2"), vec![notification(Some("2"), "20")]),
        ]);
        let mut source = MentionSource::new(api.clone());
        assert!(source.cursor().is_none());

        let first = source.next_page().await.unwrap();
        assert_eq!(first, vec![MentionEvent::reply("1", "10")]);
        assert_eq!(source.cursor(), Some("c1"));

        source.next_page().await.unwrap();
        assert_eq!(source.cursor(), Some("c2"));
        assert_eq!(
            *api.cursors.lock().unwrap(),
            vec![None, Some("c1".to_string())]
        );
    }

    #[tokio::test]
    async fn test_missing_cursor_keeps_previous_and_fails() {
        let api = PagedApi::new(vec![
            mentions_body(Some("c1"), vec![]),
            mentions_body(None, vec![notification(Some("1"), "10")]),
        ]);
        let mut source = MentionSource::new(api);
        source.next_page().await.unwrap();
        assert!(source.next_page().await.is_err());
        assert_eq!(source.cursor(), Some("c1"));
    }

    #[tokio::test]
    async fn test_stream_yields_in_page_order_then_error() {
        let api = PagedApi::new(vec![
            mentions_body(
                Some("c1"),
                vec![notification(Some("1"), "10"), notification(Some("2"), "20")],
            ),
            mentions_body(Some("c2"), vec![notification(Some("3"), "30")]),
        ]);
        let stream = MentionSource::new(api).into_stream(CancellationToken::new());
        let items: Vec<_> = stream.collect().await;

        assert_eq!(items.len(), 4);
        let ids: Vec<_> = items[..3]
            .iter()
            .map(|r| r.as_ref().unwrap().root_tweet_id.clone().unwrap())
            .collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert!(items[3].is_err());
    }

    #[tokio::test]
    async fn test_stream_stops_on_cancel() {
        let api = PagedApi::new(vec![mentions_body(
            Some("c1"),
            vec![notification(Some("1"), "10")],
        )]);
        let stop = CancellationToken::new();
        let mut stream = Box::pin(MentionSource::new(api.clone()).into_stream(stop.clone()));

        assert!(stream.next().await.unwrap().is_ok());
        stop.cancel();
        assert!(stream.next().await.is_none());
        assert_eq!(api.cursors.lock().unwrap().len(), 1);
    }
}
