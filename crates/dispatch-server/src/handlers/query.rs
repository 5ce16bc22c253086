use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use dispatch_core::{EventSink, StreamEvent};
use dispatch_loop::run_dispatch;

use crate::handlers::QueryRequest;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct QueryResponse {
    answer: String,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Non-streaming variant: run the dispatch to completion and return one
/// JSON body. `success` is false only when the loop errored before
/// producing any text.
pub async fn handler(state: web::Data<AppState>, body: web::Json<QueryRequest>) -> impl Responder {
    let question = body.into_inner().question;
    log::info!("Query: {}", question);

    let (event_tx, mut event_rx) = mpsc::channel::<StreamEvent>(100);

    let drain = tokio::spawn(async move {
        let mut error = None;
        while let Some(event) = event_rx.recv().await {
            if let StreamEvent::Error { kind, message } = event {
                error = Some(format!("{kind}: {message}"));
            }
        }
        error
    });

    let outcome = run_dispatch(
        &question,
        EventSink::new(event_tx),
        state.llm.clone(),
        state.tools.clone(),
        CancellationToken::new(),
        state.dispatch.clone(),
    )
    .await;

    let error = drain.await.unwrap_or(None);
    let success = error.is_none() || !outcome.answer.is_empty();

    log::info!("Query finished: {:?}", outcome.reason);
    HttpResponse::Ok().json(QueryResponse {
        answer: outcome.answer,
        success,
        error,
    })
}
