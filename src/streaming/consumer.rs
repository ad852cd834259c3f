//! Background reader for the streaming chat endpoint

use super::{
    decode_block, ChatStreamRequest, EventFramer, FrameError, StreamError, StreamObserver,
    StreamOutcome, StreamSession, StreamUpdate,
};
use crate::api::{extract_detail, ApiClient};
use crate::config::StreamSettings;
use futures_util::StreamExt;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tracing::{debug, error, info, warn};

struct ActiveStream {
    id: u64,
    cancelled: Arc<AtomicBool>,
    session: Arc<Mutex<StreamSession>>,
    abort: AbortHandle,
}

type Slot = Arc<Mutex<Option<ActiveStream>>>;

/// Runs at most one streaming request at a time.
///
/// A second [`begin_stream`](Self::begin_stream) while a stream is still
/// producing output is rejected; use one consumer per concurrent stream.
pub struct StreamConsumer {
    client: Arc<ApiClient>,
    url: String,
    idle_timeout: Duration,
    capacity: usize,
    active: Slot,
    latest: Mutex<Option<Arc<Mutex<StreamSession>>>>,
    next_id: AtomicU64,
}

impl StreamConsumer {
    pub fn new(client: Arc<ApiClient>, settings: &StreamSettings) -> Self {
        Self {
            url: client.url(&settings.endpoint),
            client,
            idle_timeout: settings.idle_timeout(),
            capacity: settings.channel_capacity.max(1),
            active: Arc::new(Mutex::new(None)),
            latest: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Start streaming the answer to `request.question`.
    ///
    /// Returns immediately; the request and every read happen on a spawned
    /// task. A failing initial response arrives as a single
    /// [`StreamUpdate::Error`].
    pub fn begin_stream(&self, request: ChatStreamRequest) -> Result<StreamHandle, StreamError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| StreamError::NoRuntime)?;

        let mut active = self.active.lock();
        if let Some(existing) = active.as_ref() {
            // a stream past its terminal event is only waiting to be reaped
            if existing.session.lock().is_active() {
                return Err(StreamError::AlreadyActive);
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancelled = Arc::new(AtomicBool::new(false));
        let session = Arc::new(Mutex::new(StreamSession::new()));
        *self.latest.lock() = Some(session.clone());

        let (tx, rx) = mpsc::channel(self.capacity);
        info!(
            "Streaming answer for conversation {} (stream #{})",
            request.conversation_id, id
        );

        let task = StreamTask {
            id,
            client: self.client.clone(),
            url: self.url.clone(),
            request,
            idle_timeout: self.idle_timeout,
            cancelled: cancelled.clone(),
            session: session.clone(),
            slot: self.active.clone(),
        };
        let join = runtime.spawn(task.run(tx));

        *active = Some(ActiveStream {
            id,
            cancelled: cancelled.clone(),
            session,
            abort: join.abort_handle(),
        });

        Ok(StreamHandle { rx, cancelled })
    }

    /// Abort the active stream, if any. The handle yields nothing further.
    pub fn stop_stream(&self) -> bool {
        let taken = self.active.lock().take();
        match taken {
            Some(stream) => {
                stream.cancelled.store(true, Ordering::SeqCst);
                stream.session.lock().stop();
                stream.abort.abort();
                info!("Stopped stream #{}", stream.id);
                true
            }
            None => false,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.latest
            .lock()
            .as_ref()
            .map(|s| s.lock().is_active())
            .unwrap_or(false)
    }

    /// Answer text accumulated by the most recent stream
    pub fn streaming_content(&self) -> String {
        self.latest
            .lock()
            .as_ref()
            .map(|s| s.lock().accumulated().to_string())
            .unwrap_or_default()
    }
}

impl Drop for StreamConsumer {
    fn drop(&mut self) {
        self.stop_stream();
    }
}

/// Receiving end of one stream
pub struct StreamHandle {
    rx: mpsc::Receiver<StreamUpdate>,
    cancelled: Arc<AtomicBool>,
}

impl StreamHandle {
    /// Next update, or `None` once the stream is over or was stopped
    pub async fn next(&mut self) -> Option<StreamUpdate> {
        if self.is_stopped() {
            return None;
        }
        let update = self.rx.recv().await?;
        if self.is_stopped() {
            return None;
        }
        Some(update)
    }

    pub fn is_stopped(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Drive `observer` until the stream ends
    pub async fn observe<O>(mut self, observer: &mut O) -> StreamOutcome
    where
        O: StreamObserver + ?Sized,
    {
        while let Some(update) = self.next().await {
            match update {
                StreamUpdate::Chunk {
                    fragment,
                    accumulated,
                } => observer.on_chunk(&fragment, &accumulated),
                StreamUpdate::Complete(payload) => {
                    observer.on_complete(&payload);
                    return StreamOutcome::Completed(payload);
                }
                StreamUpdate::Error(message) => {
                    observer.on_error(&message);
                    return StreamOutcome::Failed(message);
                }
            }
        }
        StreamOutcome::Ended
    }

    /// Wait for the end of the stream, ignoring fragments
    pub async fn finish(self) -> StreamOutcome {
        self.observe(&mut ()).await
    }

    /// The updates as a `Stream`
    pub fn into_stream(self) -> impl Stream<Item = StreamUpdate> {
        let cancelled = self.cancelled;
        tokio_stream::StreamExt::take_while(ReceiverStream::new(self.rx), move |_| {
            !cancelled.load(Ordering::SeqCst)
        })
    }
}

/// Frees the consumer's slot when the task ends, however it ends
struct SlotRelease {
    slot: Slot,
    id: u64,
    session: Arc<Mutex<StreamSession>>,
}

impl Drop for SlotRelease {
    fn drop(&mut self) {
        self.session.lock().stop();
        let mut slot = self.slot.lock();
        if slot.as_ref().map(|s| s.id) == Some(self.id) {
            *slot = None;
        }
    }
}

struct StreamTask {
    id: u64,
    client: Arc<ApiClient>,
    url: String,
    request: ChatStreamRequest,
    idle_timeout: Duration,
    cancelled: Arc<AtomicBool>,
    session: Arc<Mutex<StreamSession>>,
    slot: Slot,
}

impl StreamTask {
    async fn run(self, tx: mpsc::Sender<StreamUpdate>) {
        let _release = SlotRelease {
            slot: self.slot.clone(),
            id: self.id,
            session: self.session.clone(),
        };
        self.pump(&tx).await;
        debug!("Stream #{} finished", self.id);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    async fn pump(&self, tx: &mpsc::Sender<StreamUpdate>) {
        let notifier = self.client.notifier().clone();

        let builder = self
            .client
            .streaming_http()
            .post(&self.url)
            .json(&self.request);
        let (builder, token) = self.client.authorize(builder);

        let sent = match tokio::time::timeout(self.idle_timeout, builder.send()).await {
            Ok(sent) => sent.map_err(|e| e.to_string()),
            Err(_) => Err(format!(
                "No response received for {}s",
                self.idle_timeout.as_secs()
            )),
        };
        let response = match sent {
            Ok(response) => response,
            Err(message) => {
                error!("Streaming request failed: {}", message);
                self.deliver_failure(tx, message.clone()).await;
                notifier.error(&format!("Connection failed: {}", message));
                return;
            }
        };

        let status = response.status();
        if !status.is_success() {
            let message = format!("HTTP error! status: {}", status.as_u16());
            warn!("Streaming endpoint answered {}", status);
            if status.as_u16() == 401 {
                let body = response.text().await.unwrap_or_default();
                self.client
                    .handle_unauthorized(token.as_deref(), extract_detail(&body).as_deref());
            }
            self.deliver_failure(tx, message.clone()).await;
            notifier.error(&format!("Connection failed: {}", message));
            return;
        }

        let mut body = Box::pin(response.bytes_stream());
        let mut framer = EventFramer::new();

        loop {
            if self.is_cancelled() {
                debug!("Stream #{} cancelled before next read", self.id);
                return;
            }

            let read = match tokio::time::timeout(self.idle_timeout, body.next()).await {
                Ok(read) => read,
                Err(_) => {
                    let message =
                        format!("No data received for {}s", self.idle_timeout.as_secs());
                    warn!("Stream #{}: {}", self.id, message);
                    self.deliver_failure(tx, message).await;
                    notifier.error("Connection interrupted");
                    return;
                }
            };

            let bytes = match read {
                Some(Ok(bytes)) => bytes,
                Some(Err(e)) => {
                    error!("Stream #{} read failed: {}", self.id, e);
                    self.deliver_failure(tx, e.to_string()).await;
                    notifier.error("Connection interrupted");
                    return;
                }
                None => {
                    if framer.pending() > 0 {
                        debug!(
                            "Dropping {} bytes of unterminated event at end of stream",
                            framer.pending()
                        );
                    }
                    self.session.lock().stop();
                    return;
                }
            };

            framer.push(&bytes);

            while let Some(block) = framer.next_block() {
                if self.is_cancelled() {
                    return;
                }

                let event = match decode_block(&block) {
                    Ok(Some(event)) => event,
                    Ok(None) => continue,
                    Err(FrameError::MissingPrefix) => {
                        debug!("Skipping non-data block");
                        continue;
                    }
                    Err(e @ FrameError::UnknownType(_)) => {
                        warn!("Protocol error, skipping event: {}", e);
                        continue;
                    }
                    Err(e) => {
                        error!("Parse SSE data error: {}", e);
                        continue;
                    }
                };

                let update = self.session.lock().apply(event);
                let Some(update) = update else {
                    continue;
                };

                let terminal = update.is_terminal();
                if let StreamUpdate::Error(message) = &update {
                    notifier.error(message);
                }
                if tx.send(update).await.is_err() {
                    debug!("Receiver dropped, abandoning stream #{}", self.id);
                    self.session.lock().stop();
                    return;
                }
                if terminal {
                    // anything still buffered after a terminal event is ignored
                    return;
                }
            }
        }
    }

    async fn deliver_failure(&self, tx: &mpsc::Sender<StreamUpdate>, message: String) {
        let update = self.session.lock().fail(message);
        if let Some(update) = update {
            let _ = tx.send(update).await;
        }
    }
}
