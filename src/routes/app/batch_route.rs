use actix_web::{get, http::header, post, web, HttpRequest, HttpResponse};
use askama::Template;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    domain::batch_report::{BatchReport, EntityFailure},
    routes::render_page,
    services::{AppContext, RunState},
};

#[derive(Deserialize)]
pub struct StartBatchBody {
    template: String,
    /// The selected column, one entity per line.
    entities: String,
}

#[post("/batch")]
pub async fn start_batch(
    context: web::Data<AppContext>,
    body: web::Form<StartBatchBody>,
) -> HttpResponse {
    let entities: Vec<String> = body.entities.lines().map(|l| l.to_string()).collect();
    let context = context.into_inner();

    match context.start_batch(&body.template, entities).await {
        Ok(id) => HttpResponse::SeeOther()
            .insert_header((header::LOCATION, format!("/app/batch/{}", id)))
            .finish(),
        Err(e) => {
            log::warn!("Rejected batch: {}", e);
            HttpResponse::BadRequest().body(e.to_string())
        }
    }
}

struct FailureRow {
    entity_key: String,
    stage: &'static str,
    kind: &'static str,
    message: String,
}

impl From<&EntityFailure> for FailureRow {
    fn from(value: &EntityFailure) -> Self {
        Self {
            entity_key: value.entity_key.clone(),
            stage: value.stage.as_str(),
            kind: value.kind,
            message: value.message.clone(),
        }
    }
}

#[derive(Template)]
#[template(path = "batch.html")]
struct BatchTemplate {
    id: String,
    template: String,
    state: &'static str,
    error: String,
    fetched: usize,
    extracted: usize,
    unresolved: usize,
    interrupted: bool,
    failures: Vec<FailureRow>,
}

#[get("/batch/{id}")]
pub async fn batch_status(context: web::Data<AppContext>, path: web::Path<Uuid>) -> HttpResponse {
    let id = path.into_inner();
    let Some(run) = context.runs.get(&id).await else {
        return HttpResponse::NotFound().body(format!("No batch with id {}", id));
    };

    let empty = BatchReport::default();
    let (state, report, error) = match &run.state {
        RunState::Running => ("running", &empty, String::new()),
        RunState::Finished { report } => ("finished", report, String::new()),
        RunState::Failed { error } => ("failed", &empty, error.clone()),
    };

    render_page(BatchTemplate {
        id: run.id.to_string(),
        template: run.template.clone(),
        state,
        error,
        fetched: report.fetch.succeeded,
        extracted: report.extraction.succeeded,
        unresolved: report.extraction.unresolved,
        interrupted: report.interrupted(),
        failures: report.failures().map(FailureRow::from).collect(),
    })
}

fn wants_json(req: &HttpRequest) -> bool {
    req.headers()
        .get(header::ACCEPT)
        .and_then(|accept| accept.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"))
}

/// Answers JSON clients with the report; browsers are sent back to the dashboard.
#[post("/extract")]
pub async fn run_extraction(req: HttpRequest, context: web::Data<AppContext>) -> HttpResponse {
    match context.run_extraction().await {
        Ok(report) if wants_json(&req) => HttpResponse::Ok().json(report),
        Ok(report) => {
            log::info!(
                "Extraction pass from dashboard: {} extracted, {} unresolved",
                report.extraction.succeeded,
                report.extraction.unresolved
            );
            HttpResponse::SeeOther()
                .insert_header((header::LOCATION, "/app/dashboard"))
                .finish()
        }
        Err(e) => {
            log::error!("Extraction pass aborted: {}", e);
            HttpResponse::InternalServerError().body("Extraction pass aborted, see server logs.")
        }
    }
}
