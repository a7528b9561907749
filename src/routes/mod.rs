pub mod app;
pub mod default_route;

pub use app::*;

use actix_web::HttpResponse;
use askama::Template;

pub fn render_page<T: Template>(template: T) -> HttpResponse {
    match template.render() {
        Ok(body) => HttpResponse::Ok().content_type("text/html").body(body),
        Err(e) => {
            log::error!("Failed to render template: {:?}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}
