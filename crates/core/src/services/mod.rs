pub mod analytics_service;
pub mod coordinator;
pub mod currency_service;
pub mod report_service;
