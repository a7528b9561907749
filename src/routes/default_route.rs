use actix_web::{get, HttpResponse, Responder};

#[get("/")]
pub async fn default() -> impl Responder {
    HttpResponse::Ok().body("Fetchify is up. Head to /app/dashboard to start a batch.")
}
