// Library exports for the forum
// This allows integration tests and external code to use forum modules

pub mod auth;
pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;
pub mod uploads;
