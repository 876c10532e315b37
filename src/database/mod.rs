pub mod connection;
pub mod operations;

pub use operations::{ensure_schema, fetch_readings, store_reading};
