use actix_web::http::header;
use actix_web::{web, HttpResponse, Responder};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use dispatch_core::{EventSink, StreamEvent};
use dispatch_loop::run_dispatch;

use crate::encoder::spawn_stream_encoder_with_cancel;
use crate::handlers::QueryRequest;
use crate::state::AppState;

/// Streaming variant: framed events over an event-stream response.
///
/// When the caller disconnects, the response stream drops, the encoder
/// exits and fires the dispatch's cancellation token, so in-flight work
/// (including a pending tool call) is abandoned right away.
pub async fn handler(state: web::Data<AppState>, body: web::Json<QueryRequest>) -> impl Responder {
    let question = body.into_inner().question;
    log::info!("Stream query: {}", question);

    let (byte_tx, mut byte_rx) = mpsc::channel::<web::Bytes>(100);
    let (event_tx, event_rx) = mpsc::channel::<StreamEvent>(100);
    let cancel = CancellationToken::new();

    spawn_stream_encoder_with_cancel(event_rx, byte_tx, cancel.clone());

    let state = state.get_ref().clone();
    tokio::spawn(async move {
        let outcome = run_dispatch(
            &question,
            EventSink::new(event_tx),
            state.llm.clone(),
            state.tools.clone(),
            cancel,
            state.dispatch.clone(),
        )
        .await;
        log::info!("Stream dispatch finished: {:?}", outcome.reason);
    });

    HttpResponse::Ok()
        .append_header((header::CONTENT_TYPE, "text/event-stream"))
        .append_header((header::CACHE_CONTROL, "no-cache"))
        .append_header((header::CONNECTION, "keep-alive"))
        .streaming(async_stream::stream! {
            while let Some(item) = byte_rx.recv().await {
                yield Ok::<_, actix_web::Error>(item);
            }
        })
}
