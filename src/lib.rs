pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod logger;
pub mod model;
pub mod queries;
pub mod recorder;
pub mod store;
pub mod time;
