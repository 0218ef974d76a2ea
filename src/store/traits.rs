//! `Database` trait — single async interface for empresa persistence.

use async_trait::async_trait;

use crate::empresas::model::{Empresa, NewEmpresa, NewObrigacao, Obrigacao};
use crate::error::DatabaseError;

/// Backend-agnostic database trait covering empresas and their obrigações.
///
/// Lookups return `Ok(None)` / `Ok(false)` for unknown ids; callers decide
/// how absence is reported.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    // ── Empresas ────────────────────────────────────────────────────

    /// Insert a new empresa. The returned record has a fresh id and no obligations.
    async fn create_empresa(&self, empresa: &NewEmpresa) -> Result<Empresa, DatabaseError>;

    /// Get an empresa by id, with its obligations.
    async fn get_empresa(&self, id: i64) -> Result<Option<Empresa>, DatabaseError>;

    /// List every empresa ordered by id, each with its obligations.
    async fn list_empresas(&self) -> Result<Vec<Empresa>, DatabaseError>;

    /// Replace all mutable attributes of an empresa.
    async fn update_empresa(
        &self,
        id: i64,
        empresa: &NewEmpresa,
    ) -> Result<Option<Empresa>, DatabaseError>;

    /// Delete an empresa and, atomically, all of its obligations.
    async fn delete_empresa(&self, id: i64) -> Result<bool, DatabaseError>;

    // ── Obrigações ──────────────────────────────────────────────────

    /// Create an obligation owned by `empresa_id`.
    /// Returns `None` and persists nothing when the empresa does not exist.
    async fn create_obrigacao(
        &self,
        empresa_id: i64,
        obrigacao: &NewObrigacao,
    ) -> Result<Option<Obrigacao>, DatabaseError>;

    /// Get an obligation by id.
    async fn get_obrigacao(&self, id: i64) -> Result<Option<Obrigacao>, DatabaseError>;

    /// Delete a single obligation.
    async fn delete_obrigacao(&self, id: i64) -> Result<bool, DatabaseError>;
}
