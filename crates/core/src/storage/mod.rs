pub mod account_store;
pub mod cache;
