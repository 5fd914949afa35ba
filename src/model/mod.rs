pub mod config;
pub mod errors;
pub mod metrics;
pub mod record;
pub mod schema;
pub mod summary;
