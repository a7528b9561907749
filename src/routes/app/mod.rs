pub mod batch_route;
pub mod dashboard_route;
pub mod record_route;
