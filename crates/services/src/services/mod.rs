pub mod auth;
pub mod config;
pub mod family;
pub mod hosted_store;
pub mod sample;
