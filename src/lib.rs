pub mod config;
pub mod constants;
pub mod logging;
pub mod repository;
pub mod services;
pub mod state;
pub mod store;
pub mod transfer;
pub mod validation;
