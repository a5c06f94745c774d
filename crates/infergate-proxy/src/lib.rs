#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

pub mod backend;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod server;

#[cfg(test)]
mod testing;

pub use backend::{BackendPort, BackendResponse, HttpBackend};
pub use config::{ConfigError, GatewayConfig};
pub use error::GatewayError;
pub use gateway::Gateway;
pub use server::{create_router, serve};
