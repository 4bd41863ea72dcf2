pub mod clients;
pub mod models;
pub mod service;

pub use service::create_app;
