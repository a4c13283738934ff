pub mod config;
pub mod database;
pub mod entities;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{AppError, AppResult};
