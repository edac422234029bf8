//! Chunked relay of a streamed upstream body to the client.

use bytes::Bytes;
use futures::Stream;
use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::sync::OwnedSemaphorePermit;
use tokio_util::io::{ReaderStream, StreamReader};
use yanktube_core::OperationKind;
use yanktube_upstream::ByteStream;

/// Upper bound on the size of one chunk written to the client.
pub const RELAY_CHUNK_SIZE: usize = 8 * 1024;

/// Re-frames an upstream body into chunks of at most [`RELAY_CHUNK_SIZE`] bytes.
///
/// Each chunk is handed to the server as soon as it is read, so memory stays bounded by one
/// chunk no matter how large the download is. An upstream error mid-body is returned to the
/// server, which aborts the response. Dropping the stream before the end (client went away)
/// drops the upstream body and with it the upstream connection. A relay slot attached with
/// [`RelayStream::holding`] is released at the same moment.
pub struct RelayStream {
    inner: ReaderStream<StreamReader<ByteStream, Bytes>>,
    operation: OperationKind,
    request_id: Option<String>,
    bytes_sent: u64,
    finished: bool,
    permit: Option<OwnedSemaphorePermit>,
}

impl RelayStream {
    pub fn new(upstream: ByteStream, operation: OperationKind, request_id: Option<String>) -> Self {
        Self {
            inner: ReaderStream::with_capacity(StreamReader::new(upstream), RELAY_CHUNK_SIZE),
            operation,
            request_id,
            bytes_sent: 0,
            finished: false,
            permit: None,
        }
    }

    /// Keeps `permit` until the body is done.
    pub fn holding(mut self, permit: OwnedSemaphorePermit) -> Self {
        self.permit = Some(permit);
        self
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }
}

impl Stream for RelayStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.finished {
            return Poll::Ready(None);
        }

        match ready!(Pin::new(&mut this.inner).poll_next(cx)) {
            Some(Ok(chunk)) => {
                this.bytes_sent += chunk.len() as u64;
                Poll::Ready(Some(Ok(chunk)))
            }
            Some(Err(e)) => {
                this.finished = true;
                this.permit = None;
                tracing::warn!(
                    operation = %this.operation,
                    request_id = this.request_id.as_deref().unwrap_or("-"),
                    bytes_sent = this.bytes_sent,
                    timed_out = e.kind() == io::ErrorKind::TimedOut,
                    error = %e,
                    "Upstream stream interrupted, aborting response"
                );
                Poll::Ready(Some(Err(e)))
            }
            None => {
                this.finished = true;
                this.permit = None;
                tracing::debug!(
                    operation = %this.operation,
                    request_id = this.request_id.as_deref().unwrap_or("-"),
                    bytes_sent = this.bytes_sent,
                    "Download relayed"
                );
                Poll::Ready(None)
            }
        }
    }
}

impl Drop for RelayStream {
    fn drop(&mut self) {
        if !self.finished {
            tracing::info!(
                operation = %self.operation,
                request_id = self.request_id.as_deref().unwrap_or("-"),
                bytes_sent = self.bytes_sent,
                "Client disconnected, upstream download released"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{stream, StreamExt};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::sync::Semaphore;

    fn upstream(chunks: Vec<io::Result<Bytes>>) -> ByteStream {
        stream::iter(chunks).boxed()
    }

    #[tokio::test]
    async fn test_large_upstream_chunks_are_split() {
        let payload = Bytes::from(vec![1u8; 3 * RELAY_CHUNK_SIZE + 100]);
        let mut relay = RelayStream::new(
            upstream(vec![Ok(payload.clone())]),
            OperationKind::SingleVideo,
            None,
        );

        let mut received = Vec::new();
        while let Some(chunk) = relay.next().await {
            let chunk = chunk.unwrap();
            assert!(!chunk.is_empty());
            assert!(chunk.len() <= RELAY_CHUNK_SIZE);
            received.extend_from_slice(&chunk);
        }

        assert_eq!(received.len(), payload.len());
        assert_eq!(relay.bytes_sent(), payload.len() as u64);
    }

    #[tokio::test]
    async fn test_empty_body_yields_nothing() {
        let mut relay = RelayStream::new(upstream(vec![]), OperationKind::SingleAudio, None);
        assert!(relay.next().await.is_none());
        assert_eq!(relay.bytes_sent(), 0);
    }

    #[tokio::test]
    async fn test_upstream_error_is_propagated_then_stream_ends() {
        let mut relay = RelayStream::new(
            upstream(vec![
                Ok(Bytes::from_static(b"partial")),
                Err(io::Error::new(io::ErrorKind::TimedOut, "read timed out")),
                Ok(Bytes::from_static(b"never sent")),
            ]),
            OperationKind::SingleVideo,
            Some("req-1".to_string()),
        );

        assert_eq!(&relay.next().await.unwrap().unwrap()[..], b"partial");
        let err = relay.next().await.unwrap().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert!(relay.next().await.is_none());
        assert_eq!(relay.bytes_sent(), 7);
    }

    #[tokio::test]
    async fn test_dropping_relay_drops_upstream() {
        struct Guard(Arc<AtomicBool>);
        impl Drop for Guard {
            fn drop(&mut self) {
                self.0.store(true, Ordering::SeqCst);
            }
        }

        let released = Arc::new(AtomicBool::new(false));
        let guard = Guard(released.clone());
        let body = stream::repeat_with(move || {
            let _held = &guard;
            Ok::<_, io::Error>(Bytes::from_static(&[0u8; 1024]))
        })
        .boxed();

        let mut relay = RelayStream::new(body, OperationKind::SingleVideo, None);
        relay.next().await.unwrap().unwrap();
        assert!(!released.load(Ordering::SeqCst));

        drop(relay);
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_slot_is_held_until_body_ends() {
        let slots = Arc::new(Semaphore::new(1));
        let permit = slots.clone().acquire_owned().await.unwrap();
        let mut relay = RelayStream::new(
            upstream(vec![Ok(Bytes::from_static(b"abc")), Ok(Bytes::from_static(b"def"))]),
            OperationKind::SingleAudio,
            None,
        )
        .holding(permit);

        relay.next().await.unwrap().unwrap();
        assert_eq!(slots.available_permits(), 0);

        while relay.next().await.is_some() {}
        assert_eq!(slots.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_slot_is_released_when_client_goes_away() {
        let slots = Arc::new(Semaphore::new(1));
        let permit = slots.clone().acquire_owned().await.unwrap();
        let body =
            stream::repeat_with(|| Ok::<_, io::Error>(Bytes::from_static(&[0u8; 512]))).boxed();
        let mut relay = RelayStream::new(body, OperationKind::SingleVideo, None).holding(permit);

        relay.next().await.unwrap().unwrap();
        assert_eq!(slots.available_permits(), 0);

        drop(relay);
        assert_eq!(slots.available_permits(), 1);
    }
}
