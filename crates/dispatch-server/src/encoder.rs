//! Frames dispatch events for the caller-facing event stream.

use actix_web::web::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use dispatch_core::StreamEvent;

/// One framed record: header line with the event kind, one JSON payload
/// line, blank-line terminator.
pub fn frame_event(event: &StreamEvent) -> Bytes {
    let payload = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    Bytes::from(format!("event: {}\ndata: {}\n\n", event.kind(), payload))
}

/// Bridge the dispatch loop's event channel to the HTTP byte stream.
///
/// Events are framed in arrival order. When the sink is slow, adjacent
/// `delta` events that have already queued up are coalesced into one frame;
/// nothing else is ever merged or reordered. The task ends after the `done`
/// event or when the byte receiver goes away, which in turn closes the event
/// channel and surfaces as `WriterGone` inside the loop.
pub fn spawn_stream_encoder(
    mut rx: mpsc::Receiver<StreamEvent>,
    tx: mpsc::Sender<Bytes>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut carry: Option<StreamEvent> = None;
        loop {
            let next = match carry.take() {
                Some(event) => Some(event),
                None => rx.recv().await,
            };
            let Some(event) = next else {
                break;
            };

            let event = if let StreamEvent::Delta { mut text } = event {
                loop {
                    match rx.try_recv() {
                        Ok(StreamEvent::Delta { text: more }) => text.push_str(&more),
                        Ok(other) => {
                            carry = Some(other);
                            break;
                        }
                        Err(_) => break,
                    }
                }
                StreamEvent::Delta { text }
            } else {
                event
            };

            let is_done = event.is_done();
            if tx.send(frame_event(&event)).await.is_err() {
                break;
            }
            if is_done {
                break;
            }
        }
    })
}

/// [`spawn_stream_encoder`] plus cancellation: `cancel` fires when encoding
/// ends, so a dispatch with an in-flight LLM read or tool call is
/// interrupted as soon as the caller disconnects instead of running until
/// its next sink write.
pub fn spawn_stream_encoder_with_cancel(
    rx: mpsc::Receiver<StreamEvent>,
    tx: mpsc::Sender<Bytes>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let encoder = spawn_stream_encoder(rx, tx);
    tokio::spawn(async move {
        let _ = encoder.await;
        cancel.cancel();
    })
}
