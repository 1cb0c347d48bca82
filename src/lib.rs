pub mod auth;
pub mod baht_text;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod numbering;
pub mod routes;
pub mod services;
pub mod stats;
