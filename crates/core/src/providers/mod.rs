pub mod traits;

// Provider implementations
pub mod app_store_connect;
pub mod frankfurter;
pub mod itunes;
