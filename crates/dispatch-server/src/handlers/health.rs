use actix_web::{web, HttpResponse, Responder};

use crate::state::AppState;

pub async fn handler(state: web::Data<AppState>) -> impl Responder {
    let stats = state.session.stats().await;
    HttpResponse::Ok().json(stats)
}
