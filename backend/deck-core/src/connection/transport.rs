//! Per-connection transport task.
//!
//! Each connect attempt runs in its own task that owns the socket, so the
//! manager loop never waits on a handshake or a write. The manager hands
//! outgoing frames over through a small bounded outbox and drops them when it
//! is full. The task reports what happens on the socket back to the manager,
//! tagged with the generation it was spawned for; the manager drops reports
//! from generations it has already replaced.
//!
//! Dropping the outbox sender closes the connection: the task sends a close
//! frame and exits.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use log::{debug, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

const OUTBOX_CAPACITY: usize = 8;
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);
const CLOSE_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(1);

pub(crate) enum TransportEvent {
    Opened,
    Message(String),
    /// Connect failed, the peer closed, a write stalled, or the read side errored.
    Closed,
}

impl TransportEvent {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            TransportEvent::Opened => "open",
            TransportEvent::Message(_) => "message",
            TransportEvent::Closed => "close",
        }
    }
}

pub(crate) struct TransportReport {
    pub(crate) generation: u64,
    pub(crate) event: TransportEvent,
}

/// The manager's side of one connection attempt.
pub(crate) struct Transport {
    pub(crate) outbox: mpsc::Sender<String>,
    pub(crate) task: JoinHandle<()>,
}

pub(crate) fn spawn_connection(
    generation: u64,
    url: Url,
    reports: mpsc::Sender<TransportReport>,
) -> Transport {
    let (outbox, outgoing) = mpsc::channel(OUTBOX_CAPACITY);
    let task = tokio::spawn(run_connection(generation, url, outgoing, reports));
    Transport { outbox, task }
}

async fn run_connection(
    generation: u64,
    url: Url,
    mut outgoing: mpsc::Receiver<String>,
    reports: mpsc::Sender<TransportReport>,
) {
    let report = |event| TransportReport { generation, event };

    let mut ws = match connect_async(url.as_str()).await {
        Ok((ws_stream, _response)) => ws_stream,
        Err(e) => {
            debug!("Deck connect to {url} failed: {e}");
            let _ = reports.send(report(TransportEvent::Closed)).await;
            return;
        }
    };

    if reports.send(report(TransportEvent::Opened)).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            frame = ws.next() => {
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text.as_str().to_owned(),
                    Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                        Ok(text) => text.to_owned(),
                        Err(_) => {
                            warn!("Dropping non-UTF-8 binary frame from deck ({} bytes)", data.len());
                            continue;
                        }
                    },
                    Some(Ok(Message::Close(frame))) => {
                        debug!("Deck sent close frame: {frame:?}");
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!("Deck transport error, closing connection: {e}");
                        break;
                    }
                    None => break,
                };

                if reports
                    .send(report(TransportEvent::Message(text)))
                    .await
                    .is_err()
                {
                    return;
                }
            }
            next = outgoing.recv() => match next {
                Some(text) => match timeout(WRITE_TIMEOUT, ws.send(Message::Text(text.into()))).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        warn!("Deck send failed, closing connection: {e}");
                        break;
                    }
                    Err(_) => {
                        warn!("Deck stopped reading for {WRITE_TIMEOUT:?}, closing connection");
                        break;
                    }
                },
                None => {
                    debug!("Closing deck connection {generation}");
                    match timeout(CLOSE_HANDSHAKE_TIMEOUT, ws.close(None)).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => debug!("Deck close frame not delivered: {e}"),
                        Err(_) => debug!("Deck close frame timed out"),
                    }
                    return;
                }
            },
        }
    }

    let _ = reports.send(report(TransportEvent::Closed)).await;
}
