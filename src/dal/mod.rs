pub mod result_store;
pub mod search_record_db;
