pub mod batch_report;
pub mod query_template;
pub mod rate_window;
pub mod search_record;
