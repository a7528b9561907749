use actix_web::{get, http::header, post, web, HttpResponse};
use serde::Deserialize;

use crate::services::AppContext;

#[get("/records")]
pub async fn records(context: web::Data<AppContext>) -> HttpResponse {
    match context.store.list_records().await {
        Ok(records) => HttpResponse::Ok().json(records),
        Err(e) => {
            log::error!("Failed to load records: {}", e);
            HttpResponse::InternalServerError().body("Could not load stored results.")
        }
    }
}

#[derive(Deserialize)]
pub struct ResetRecordBody {
    entity_key: String,
}

#[post("/records/reset")]
pub async fn reset_record(
    context: web::Data<AppContext>,
    body: web::Form<ResetRecordBody>,
) -> HttpResponse {
    match context.store.reset_extracted(&body.entity_key).await {
        Ok(true) => HttpResponse::SeeOther()
            .insert_header((header::LOCATION, "/app/dashboard"))
            .finish(),
        Ok(false) => HttpResponse::NotFound().body(format!("No record for {}", body.entity_key)),
        Err(e) => {
            log::error!("Failed to reset {}: {}", body.entity_key, e);
            HttpResponse::InternalServerError().body("Could not reset the record.")
        }
    }
}
