use std::{net::TcpListener, sync::Arc, time::Duration};

use actix_web::{dev::Server, middleware::Logger, web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;

use crate::{
    configuration::DatabaseSettings,
    dal::result_store::{MemoryResultStore, PgResultStore, ResultStore},
    errors::StoreError,
    routes::{batch_route, dashboard_route, default_route, record_route},
    services::AppContext,
};

/// Postgres with migrations applied, or an in-memory store when `in_memory` is set.
pub async fn build_result_store(
    database: &DatabaseSettings,
) -> Result<Arc<dyn ResultStore>, StoreError> {
    if database.in_memory {
        log::warn!("Using the in-memory result store, results are lost on exit");
        return Ok(Arc::new(MemoryResultStore::new()));
    }

    let pool_options = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(15 * 60)) // 15 minutes
        .max_lifetime(None);

    let store = PgResultStore::new(pool_options.connect_lazy_with(database.with_db()));
    store.migrate().await?;

    Ok(Arc::new(store))
}

pub fn run(listener: TcpListener, context: web::Data<AppContext>) -> Result<Server, std::io::Error> {
    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .service(default_route::default)
            .service(
                web::scope("/app")
                    .service(dashboard_route::dashboard)
                    .service(batch_route::start_batch)
                    .service(batch_route::batch_status)
                    .service(batch_route::run_extraction)
                    .service(record_route::records)
                    .service(record_route::reset_record),
            )
            .app_data(context.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
