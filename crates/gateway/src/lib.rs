pub mod config;
pub mod routes;
pub mod saving;
pub mod state;
