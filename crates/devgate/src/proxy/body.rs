//! Response body wrapper that reports the outcome once streaming ends.

use crate::outcome::{OutcomeSink, ResponseOutcome};
use chrono::Utc;
use hyper::body::{Body, Frame, SizeHint};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Passes frames through untouched and hands the outcome to the sink exactly
/// once: when the stream ends, errors, or the body is dropped early (client
/// went away).
pub struct CompletionBody<B> {
    inner: B,
    pending: Option<(ResponseOutcome, Arc<dyn OutcomeSink>)>,
}

impl<B> CompletionBody<B> {
    pub fn new(inner: B, outcome: ResponseOutcome, sink: Arc<dyn OutcomeSink>) -> Self {
        Self {
            inner,
            pending: Some((outcome, sink)),
        }
    }

    fn finish(&mut self) {
        if let Some((outcome, sink)) = self.pending.take() {
            sink.record(outcome.finished_at(Utc::now()));
        }
    }
}

impl<B> Body for CompletionBody<B>
where
    B: Body + Unpin,
{
    type Data = B::Data;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);
        if matches!(polled, Poll::Ready(None) | Poll::Ready(Some(Err(_)))) {
            this.finish();
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl<B> Drop for CompletionBody<B> {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::MemorySink;
    use hyper::body::Bytes;
    use http_body_util::{BodyExt, Full};
    use hyper::Method;

    fn outcome(status: u16) -> ResponseOutcome {
        ResponseOutcome::completed(Method::GET, "/api/v1/crates", Some(status), "OK")
    }

    #[tokio::test]
    async fn test_records_once_after_stream_ends() {
        let sink = Arc::new(MemorySink::new());
        let body = CompletionBody::new(
            Full::new(Bytes::from_static(b"{\"crates\":[]}")),
            outcome(200),
            sink.clone(),
        );

        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(collected, Bytes::from_static(b"{\"crates\":[]}"));
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.outcomes()[0].status_code, Some(200));
    }

    #[test]
    fn test_records_on_drop_without_polling() {
        let sink = Arc::new(MemorySink::new());
        let body = CompletionBody::new(Full::new(Bytes::new()), outcome(404), sink.clone());
        assert!(sink.is_empty());
        drop(body);
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test]
    async fn test_passes_size_hint_through() {
        let sink = Arc::new(MemorySink::new());
        let body = CompletionBody::new(
            Full::new(Bytes::from_static(b"hello")),
            outcome(200),
            sink.clone(),
        );
        assert_eq!(body.size_hint().exact(), Some(5));
        assert!(!body.is_end_stream());
        drop(body);
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test]
    async fn test_completion_time_is_not_before_response_time() {
        let sink = Arc::new(MemorySink::new());
        let started = outcome(200);
        let headers_at = started.completed_at;
        let body = CompletionBody::new(Full::new(Bytes::from_static(b"x")), started, sink.clone());
        body.collect().await.unwrap();
        assert!(sink.outcomes()[0].completed_at >= headers_at);
    }
}
