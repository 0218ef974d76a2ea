//! libSQL backend — async `Database` trait implementation.
//!
//! File-backed databases hand out a fresh connection per session, so each
//! request works on its own connection. In-memory databases only exist for
//! the lifetime of one connection, so that connection is pinned and shared.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::config::DatabaseTarget;
use crate::empresas::model::{Email, Empresa, NewEmpresa, NewObrigacao, Obrigacao};
use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::Database;

/// libSQL database backend.
pub struct LibSqlBackend {
    db: LibSqlDatabase,
    pinned: Option<Connection>,
}

impl LibSqlBackend {
    /// Open the backend described by `target` and run migrations.
    pub async fn open(target: &DatabaseTarget) -> Result<Self, DatabaseError> {
        match target {
            DatabaseTarget::File(path) => Self::new_local(path).await,
            DatabaseTarget::Memory => Self::new_memory().await,
        }
    }

    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self { db, pinned: None };
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db,
            pinned: Some(conn),
        };
        backend.run_migrations().await?;
        Ok(backend)
    }

    /// Acquire a storage session.
    ///
    /// The returned connection is dropped by the caller when the operation
    /// finishes, success or failure.
    async fn session(&self) -> Result<Connection, DatabaseError> {
        let conn = match &self.pinned {
            Some(conn) => conn.clone(),
            None => self
                .db
                .connect()
                .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?,
        };

        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to enable foreign keys: {e}")))?;

        // Concurrent per-request connections contend for the write lock.
        let mut rows = conn
            .query("PRAGMA busy_timeout = 5000", ())
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to set busy timeout: {e}")))?;
        rows.next()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to set busy timeout: {e}")))?;

        Ok(conn)
    }
}

// ── Helper functions ────────────────────────────────────────────────

const EMPRESA_COLUMNS: &str = "id, nome, cnpj, endereco, email, telefone";

const OBRIGACAO_COLUMNS: &str = "id, nome, periodicidade";

/// Map a libsql Row to an Empresa with an empty obligation list.
///
/// Column order matches EMPRESA_COLUMNS.
fn row_to_empresa(row: &libsql::Row) -> Result<Empresa, DatabaseError> {
    let parse = |e: libsql::Error| DatabaseError::Query(format!("empresa row parse: {e}"));
    let email: String = row.get(4).map_err(parse)?;

    Ok(Empresa {
        id: row.get(0).map_err(parse)?,
        nome: row.get(1).map_err(parse)?,
        cnpj: row.get(2).map_err(parse)?,
        endereco: row.get(3).map_err(parse)?,
        email: Email::from_stored(email),
        telefone: row.get(5).map_err(parse)?,
        obrigacoes: Vec::new(),
    })
}

/// Map a libsql Row to an Obrigacao.
///
/// Column order matches OBRIGACAO_COLUMNS.
fn row_to_obrigacao(row: &libsql::Row) -> Result<Obrigacao, DatabaseError> {
    let parse = |e: libsql::Error| DatabaseError::Query(format!("obrigacao row parse: {e}"));

    Ok(Obrigacao {
        id: row.get(0).map_err(parse)?,
        nome: row.get(1).map_err(parse)?,
        periodicidade: row.get(2).map_err(parse)?,
    })
}

/// Load one empresa and its obligations on an open session.
async fn fetch_empresa(conn: &Connection, id: i64) -> Result<Option<Empresa>, DatabaseError> {
    let mut rows = conn
        .query(
            &format!("SELECT {EMPRESA_COLUMNS} FROM empresas WHERE id = ?1"),
            params![id],
        )
        .await
        .map_err(|e| DatabaseError::from_libsql("get_empresa", e))?;

    let mut empresa = match rows.next().await {
        Ok(Some(row)) => row_to_empresa(&row)?,
        Ok(None) => return Ok(None),
        Err(e) => return Err(DatabaseError::from_libsql("get_empresa", e)),
    };

    let mut rows = conn
        .query(
            &format!(
                "SELECT {OBRIGACAO_COLUMNS} FROM obrigacoes_acessorias WHERE empresa_id = ?1 ORDER BY id ASC"
            ),
            params![id],
        )
        .await
        .map_err(|e| DatabaseError::from_libsql("get_empresa obrigacoes", e))?;

    while let Some(row) = rows
        .next()
        .await
        .map_err(|e| DatabaseError::from_libsql("get_empresa obrigacoes", e))?
    {
        empresa.obrigacoes.push(row_to_obrigacao(&row)?);
    }

    Ok(Some(empresa))
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        let conn = self.session().await?;
        migrations::run_migrations(&conn).await
    }

    // ── Empresas ────────────────────────────────────────────────────

    async fn create_empresa(&self, empresa: &NewEmpresa) -> Result<Empresa, DatabaseError> {
        let conn = self.session().await?;
        let mut rows = conn
            .query(
                "INSERT INTO empresas (nome, cnpj, endereco, email, telefone)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 RETURNING id",
                params![
                    empresa.nome.as_str(),
                    empresa.cnpj.as_str(),
                    empresa.endereco.as_str(),
                    empresa.email.as_str(),
                    empresa.telefone.as_str(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::from_libsql("create_empresa", e))?;

        let id: i64 = match rows.next().await {
            Ok(Some(row)) => row
                .get(0)
                .map_err(|e| DatabaseError::Query(format!("create_empresa id: {e}")))?,
            Ok(None) => {
                return Err(DatabaseError::Query(
                    "create_empresa: insert returned no id".into(),
                ));
            }
            Err(e) => return Err(DatabaseError::from_libsql("create_empresa", e)),
        };

        debug!(id, cnpj = %empresa.cnpj, "Empresa created");
        Ok(Empresa {
            id,
            nome: empresa.nome.clone(),
            cnpj: empresa.cnpj.clone(),
            endereco: empresa.endereco.clone(),
            email: empresa.email.clone(),
            telefone: empresa.telefone.clone(),
            obrigacoes: Vec::new(),
        })
    }

    async fn get_empresa(&self, id: i64) -> Result<Option<Empresa>, DatabaseError> {
        let conn = self.session().await?;
        fetch_empresa(&conn, id).await
    }

    async fn list_empresas(&self) -> Result<Vec<Empresa>, DatabaseError> {
        let conn = self.session().await?;

        let mut rows = conn
            .query(
                "SELECT id, empresa_id, nome, periodicidade FROM obrigacoes_acessorias ORDER BY id ASC",
                (),
            )
            .await
            .map_err(|e| DatabaseError::from_libsql("list_empresas obrigacoes", e))?;

        let mut by_empresa: HashMap<i64, Vec<Obrigacao>> = HashMap::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::from_libsql("list_empresas obrigacoes", e))?
        {
            let parse = |e: libsql::Error| DatabaseError::Query(format!("obrigacao row parse: {e}"));
            let empresa_id: i64 = row.get(1).map_err(parse)?;
            by_empresa.entry(empresa_id).or_default().push(Obrigacao {
                id: row.get(0).map_err(parse)?,
                nome: row.get(2).map_err(parse)?,
                periodicidade: row.get(3).map_err(parse)?,
            });
        }

        let mut rows = conn
            .query(
                &format!("SELECT {EMPRESA_COLUMNS} FROM empresas ORDER BY id ASC"),
                (),
            )
            .await
            .map_err(|e| DatabaseError::from_libsql("list_empresas", e))?;

        let mut empresas = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::from_libsql("list_empresas", e))?
        {
            let mut empresa = row_to_empresa(&row)?;
            empresa.obrigacoes = by_empresa.remove(&empresa.id).unwrap_or_default();
            empresas.push(empresa);
        }
        Ok(empresas)
    }

    async fn update_empresa(
        &self,
        id: i64,
        empresa: &NewEmpresa,
    ) -> Result<Option<Empresa>, DatabaseError> {
        let conn = self.session().await?;
        let count = conn
            .execute(
                "UPDATE empresas
                 SET nome = ?1, cnpj = ?2, endereco = ?3, email = ?4, telefone = ?5
                 WHERE id = ?6",
                params![
                    empresa.nome.as_str(),
                    empresa.cnpj.as_str(),
                    empresa.endereco.as_str(),
                    empresa.email.as_str(),
                    empresa.telefone.as_str(),
                    id,
                ],
            )
            .await
            .map_err(|e| DatabaseError::from_libsql("update_empresa", e))?;

        if count == 0 {
            return Ok(None);
        }
        debug!(id, "Empresa updated");
        fetch_empresa(&conn, id).await
    }

    async fn delete_empresa(&self, id: i64) -> Result<bool, DatabaseError> {
        let conn = self.session().await?;
        // Obligations go with it through ON DELETE CASCADE, inside this one statement.
        let count = conn
            .execute("DELETE FROM empresas WHERE id = ?1", params![id])
            .await
            .map_err(|e| DatabaseError::from_libsql("delete_empresa", e))?;

        if count > 0 {
            debug!(id, "Empresa deleted");
        }
        Ok(count > 0)
    }

    // ── Obrigações ──────────────────────────────────────────────────

    async fn create_obrigacao(
        &self,
        empresa_id: i64,
        obrigacao: &NewObrigacao,
    ) -> Result<Option<Obrigacao>, DatabaseError> {
        let conn = self.session().await?;
        // Existence check and insert are one statement: no row, no obligation.
        let mut rows = conn
            .query(
                &format!(
                    "INSERT INTO obrigacoes_acessorias (nome, periodicidade, empresa_id)
                     SELECT ?1, ?2, id FROM empresas WHERE id = ?3
                     RETURNING {OBRIGACAO_COLUMNS}"
                ),
                params![
                    obrigacao.nome.as_str(),
                    obrigacao.periodicidade.as_str(),
                    empresa_id,
                ],
            )
            .await
            .map_err(|e| DatabaseError::from_libsql("create_obrigacao", e))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let created = row_to_obrigacao(&row)?;
                debug!(id = created.id, empresa_id, "Obrigacao created");
                Ok(Some(created))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::from_libsql("create_obrigacao", e)),
        }
    }

    async fn get_obrigacao(&self, id: i64) -> Result<Option<Obrigacao>, DatabaseError> {
        let conn = self.session().await?;
        let mut rows = conn
            .query(
                &format!("SELECT {OBRIGACAO_COLUMNS} FROM obrigacoes_acessorias WHERE id = ?1"),
                params![id],
            )
            .await
            .map_err(|e| DatabaseError::from_libsql("get_obrigacao", e))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_obrigacao(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::from_libsql("get_obrigacao", e)),
        }
    }

    async fn delete_obrigacao(&self, id: i64) -> Result<bool, DatabaseError> {
        let conn = self.session().await?;
        let count = conn
            .execute(
                "DELETE FROM obrigacoes_acessorias WHERE id = ?1",
                params![id],
            )
            .await
            .map_err(|e| DatabaseError::from_libsql("delete_obrigacao", e))?;

        if count > 0 {
            debug!(id, "Obrigacao deleted");
        }
        Ok(count > 0)
    }
}
