//! Empresa Gerência — company and accessory-obligation registry.

pub mod config;
pub mod empresas;
pub mod error;
pub mod server;
pub mod store;
