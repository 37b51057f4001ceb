pub mod auth;
pub mod budget;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod input;
pub mod notify;
pub mod pipeline;
pub mod youtube;
