pub mod api_types;
pub mod cache;
pub mod client;
pub mod manager;
pub mod mirror;
pub mod types;
