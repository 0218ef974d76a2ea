//! Empresa registry — companies and their accessory obligations over HTTP.

pub mod error;
pub mod model;
pub mod routes;

pub use error::ApiError;
pub use model::{DeleteMessage, Email, Empresa, NewEmpresa, NewObrigacao, Obrigacao};
pub use routes::{AppState, empresa_routes};
