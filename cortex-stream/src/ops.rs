//! Stream combinators: transform, filter, tap, buffer, tee, merge, collect.

use crate::chunk::{StreamChunk, StreamError};
use cortex_llm::provider::{Provider, ProviderError};
use cortex_llm::{ProviderRequest, StopReason, TokenUsage};
use futures::Stream;
use futures_util::future::BoxFuture;
use futures_util::StreamExt;
use std::collections::HashSet;
use std::pin::Pin;
use std::time::Duration;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Boxed, owned stream of chunks. Lazy, finite, single-pass — the same
/// contract as the provider SSE stream it is ultimately derived from.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, StreamError>> + Send>>;

/// Result of [`collect_content`]: the concatenated text plus final metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectedContent {
    /// Concatenation of every `Content` delta in arrival order.
    pub content: String,
    /// Token usage from the terminal `Done` chunk, if present.
    pub usage: Option<TokenUsage>,
    /// Finish reason from the terminal `Done` chunk, if present.
    pub finish_reason: Option<StopReason>,
}

/// Terminal operation: drains the stream, concatenating `Content` deltas
/// and recording the final usage/finish reason from the `Done` chunk.
pub async fn collect_content(mut stream: ChunkStream) -> Result<CollectedContent, StreamError> {
    let mut out = CollectedContent::default();
    while let Some(item) = stream.next().await {
        match item? {
            StreamChunk::Content { delta, .. } => out.content.push_str(&delta),
            StreamChunk::Done {
                finish_reason,
                usage,
            } => {
                out.finish_reason = finish_reason;
                out.usage = usage;
            }
            _ => {}
        }
    }
    Ok(out)
}

/// Map every chunk through `f`. Errors pass through untouched.
pub fn transform_stream(
    stream: ChunkStream,
    f: impl Fn(StreamChunk) -> StreamChunk + Send + 'static,
) -> ChunkStream {
    Box::pin(stream.map(move |item| item.map(&f)))
}

/// Keep only chunks whose [`StreamChunk::kind`] is in `kinds`. Errors always
/// pass through, since a consumer filtering for `content` still needs to
/// learn the stream failed.
pub fn filter_stream(stream: ChunkStream, kinds: HashSet<&'static str>) -> ChunkStream {
    Box::pin(stream.filter(move |item| {
        let keep = match item {
            Ok(chunk) => kinds.contains(chunk.kind()),
            Err(_) => true,
        };
        futures_util::future::ready(keep)
    }))
}

/// Run an async side-effect on every item before yielding it unchanged.
pub fn tap_stream<F>(stream: ChunkStream, cb: F) -> ChunkStream
where
    F: Fn(&Result<StreamChunk, StreamError>) -> BoxFuture<'static, ()> + Send + Sync + 'static,
{
    Box::pin(stream.then(move |item| {
        let fut = cb(&item);
        async move {
            fut.await;
            item
        }
    }))
}

/// Batch chunks, flushing whenever `max_size` items have accumulated or
/// `max_wait` has elapsed since the first item in the current batch,
/// whichever comes first.
pub fn buffer_stream(stream: ChunkStream, max_size: usize, max_wait: Duration) -> BufferedStream {
    BufferedStream {
        inner: stream,
        max_size,
        max_wait,
        pending: Vec::new(),
        deadline: None,
    }
}

/// Stream adapter returned by [`buffer_stream`].
pub struct BufferedStream {
    inner: ChunkStream,
    max_size: usize,
    max_wait: Duration,
    pending: Vec<Result<StreamChunk, StreamError>>,
    deadline: Option<std::pin::Pin<Box<tokio::time::Sleep>>>,
}

impl Stream for BufferedStream {
    type Item = Vec<Result<StreamChunk, StreamError>>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        use std::task::Poll;

        loop {
            if self.pending.len() >= self.max_size && !self.pending.is_empty() {
                self.deadline = None;
                return Poll::Ready(Some(std::mem::take(&mut self.pending)));
            }

            match self.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(item)) => {
                    if self.pending.is_empty() {
                        let max_wait = self.max_wait;
                        self.deadline = Some(Box::pin(tokio::time::sleep(max_wait)));
                    }
                    self.pending.push(item);
                    continue;
                }
                Poll::Ready(None) => {
                    self.deadline = None;
                    if self.pending.is_empty() {
                        return Poll::Ready(None);
                    }
                    return Poll::Ready(Some(std::mem::take(&mut self.pending)));
                }
                Poll::Pending => {
                    if let Some(deadline) = self.deadline.as_mut() {
                        if deadline.as_mut().poll(cx).is_ready() {
                            self.deadline = None;
                            if !self.pending.is_empty() {
                                return Poll::Ready(Some(std::mem::take(&mut self.pending)));
                            }
                        }
                    }
                    return Poll::Pending;
                }
            }
        }
    }
}

/// Split one stream into two independent readers. The slower reader bounds
/// memory use only by its own lag — the producer task keeps draining the
/// source regardless of whether either reader has caught up.
pub fn tee_stream(stream: ChunkStream) -> (ChunkStream, ChunkStream) {
    let (tx_a, rx_a) = tokio::sync::mpsc::unbounded_channel();
    let (tx_b, rx_b) = tokio::sync::mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut stream = stream;
        while let Some(item) = stream.next().await {
            let a_alive = tx_a.send(item.clone()).is_ok();
            let b_alive = tx_b.send(item).is_ok();
            if !a_alive && !b_alive {
                break;
            }
        }
    });

    (
        Box::pin(UnboundedReceiverStream::new(rx_a)),
        Box::pin(UnboundedReceiverStream::new(rx_b)),
    )
}

/// Race-style merge across sources: preserves each source's own chunk
/// order, but interleaves across sources on a best-effort-fair basis
/// (whichever source's next chunk becomes ready first is yielded next).
pub fn merge_streams(streams: Vec<ChunkStream>) -> ChunkStream {
    Box::pin(futures::stream::select_all(streams))
}

/// Dispatch `request` to `provider.chat` and adapt its
/// `ProviderStreamEvent`s into a [`ChunkStream`] of [`StreamChunk`]s.
///
/// This is the bridge consumers (`cortex-react`, `cortex-workflow`'s LLM
/// node) use to turn a provider's native stream into the wire chunk type
/// this crate defines, since `cortex-llm` can't depend on this crate to
/// produce `StreamChunk` itself.
pub async fn chat_stream<P: Provider>(
    provider: &P,
    request: ProviderRequest,
) -> Result<ChunkStream, ProviderError> {
    let events = provider.chat(request).await?;
    Ok(Box::pin(events.map(|item| item.map(StreamChunk::from).map_err(|e| StreamError::Upstream(e.to_string())))))
}
