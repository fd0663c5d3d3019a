// Library exports for the social network service
// This allows integration tests and external code to use its modules

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod likes;
pub mod routes;
pub mod state;
