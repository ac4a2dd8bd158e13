use crate::backend::BackendClient;
use crate::io_struct::{ConversationHistory, InferenceChunk, OutboundEvent};
use crate::line_parser::LineParser;
use crate::sse;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use tokio::sync::mpsc;

pub const CONNECT_ERROR: &str = "Failed to connect to Ollama";
pub const STREAM_ERROR: &str = "Stream error";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayStatus {
    /// `[DONE]` was sent, either on the backend's final record or at end of stream.
    Completed,
    /// A single error event was sent.
    Failed,
    /// The client went away; nothing more was written.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayOutcome {
    pub status: RelayStatus,
    pub deltas: usize,
    pub discarded: u64,
}

/// Receiver side of the client channel was dropped.
#[derive(Debug)]
struct ClientGone;

/// State of one relay: the line parser residue and whether a terminal
/// frame has gone out. After termination every emit is a no-op.
struct RelaySession {
    tx: mpsc::Sender<Bytes>,
    parser: LineParser,
    terminated: bool,
    deltas: usize,
}

impl RelaySession {
    fn new(tx: mpsc::Sender<Bytes>) -> Self {
        Self {
            tx,
            parser: LineParser::new(),
            terminated: false,
            deltas: 0,
        }
    }

    async fn emit(&mut self, event: OutboundEvent) -> Result<(), ClientGone> {
        if self.terminated {
            return Ok(());
        }
        if event.is_terminal() {
            self.terminated = true;
        } else {
            self.deltas += 1;
        }
        // Bounded channel: waits here while the client is slow.
        self.tx.send(sse::encode(&event)).await.map_err(|_| ClientGone)
    }

    async fn forward(&mut self, record: InferenceChunk) -> Result<(), ClientGone> {
        if let Some(content) = record.content() {
            self.emit(OutboundEvent::Content(content.to_string()))
                .await?;
        }
        if record.is_final {
            self.emit(OutboundEvent::Done).await?;
        }
        Ok(())
    }

    fn outcome(&self, status: RelayStatus) -> RelayOutcome {
        RelayOutcome {
            status,
            deltas: self.deltas,
            discarded: self.parser.discarded(),
        }
    }

    fn finish(&self, sent: Result<(), ClientGone>, status: RelayStatus) -> RelayOutcome {
        match sent {
            Ok(()) => self.outcome(status),
            Err(ClientGone) => self.outcome(RelayStatus::Cancelled),
        }
    }
}

/// Relays an already-open backend body to the client channel.
///
/// Records are forwarded as soon as they are decoded. Exactly one of
/// `[DONE]` or an error frame is written, unless the client disconnects
/// first, in which case the backend stream is dropped without writing.
pub async fn relay_stream<S, E>(mut backend: S, tx: mpsc::Sender<Bytes>) -> RelayOutcome
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    let mut session = RelaySession::new(tx);
    loop {
        let next = tokio::select! {
            biased;
            _ = session.tx.closed() => return session.outcome(RelayStatus::Cancelled),
            next = backend.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                for record in session.parser.push(&chunk) {
                    if session.forward(record).await.is_err() {
                        return session.outcome(RelayStatus::Cancelled);
                    }
                    if session.terminated {
                        return session.outcome(RelayStatus::Completed);
                    }
                }
            }
            Some(Err(e)) => {
                log::error!("Stream error: {}", e);
                let sent = session
                    .emit(OutboundEvent::Error(STREAM_ERROR.to_string()))
                    .await;
                return session.finish(sent, RelayStatus::Failed);
            }
            None => {
                if let Some(record) = session.parser.finish() {
                    if session.forward(record).await.is_err() {
                        return session.outcome(RelayStatus::Cancelled);
                    }
                }
                let sent = session.emit(OutboundEvent::Done).await;
                return session.finish(sent, RelayStatus::Completed);
            }
        }
    }
}

/// Writes the single error frame of a relay whose backend never answered.
pub async fn relay_connect_failure(tx: mpsc::Sender<Bytes>) -> RelayOutcome {
    let mut session = RelaySession::new(tx);
    let sent = session
        .emit(OutboundEvent::Error(CONNECT_ERROR.to_string()))
        .await;
    session.finish(sent, RelayStatus::Failed)
}

/// Opens a streaming chat against the backend and relays it on a spawned
/// task. The returned receiver is the client body; dropping it cancels the
/// backend request.
pub fn spawn_relay(
    backend: BackendClient,
    model: String,
    messages: ConversationHistory,
    buffer: usize,
) -> mpsc::Receiver<Bytes> {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    tokio::spawn(async move {
        let opened = tokio::select! {
            biased;
            _ = tx.closed() => {
                log::debug!("Client left before the backend answered");
                return;
            }
            opened = backend.open_chat_stream(&model, &messages) => opened,
        };

        let outcome = match opened {
            Ok(stream) => relay_stream(stream, tx).await,
            Err(e) => {
                log::error!("Stream chat error: {}", e);
                relay_connect_failure(tx).await
            }
        };

        match outcome.status {
            RelayStatus::Cancelled => log::info!(
                "Relay cancelled by client after {} deltas (model {})",
                outcome.deltas,
                model
            ),
            status => log::info!(
                "Relay {:?}: {} deltas, {} malformed lines discarded (model {})",
                status,
                outcome.deltas,
                outcome.discarded,
                model
            ),
        }
    });
    rx
}
