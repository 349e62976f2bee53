pub mod config;
pub mod csv_writer;
pub mod fetch_error;
pub mod history_client;
pub mod scheduler;
pub mod station_resolver;
pub mod table_extractor;
pub mod url_builder;
pub mod utils;
