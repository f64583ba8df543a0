pub mod account;
pub mod app;
pub mod dataset;
pub mod event;
pub mod settings;
pub mod summary;
