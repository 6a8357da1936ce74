//! Expediente DB - Backend local do expediente sobre SQLite
//!
//! Esta biblioteca fornece:
//! - Tabelas de médicos, pacientes e consultas com migrações automáticas
//! - Autenticação por senha (Argon2id) com sessões JWT
//! - Armazenamento de anexos em disco com buckets
//! - Implementação do trait `Backend` do núcleo sobre esses recursos

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::info;

pub mod backend;
pub mod crypto;
pub mod error;
pub mod migrations;
pub mod models;
pub mod storage;

pub use backend::SqliteBackend;
pub use error::DbError;

/// Configuração do backend local
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Caminho para o arquivo SQLite
    pub db_path: String,
    /// Diretório raiz dos buckets de anexos
    pub storage_dir: String,
    /// Segredo de assinatura das sessões
    /// Vazio gera um segredo aleatório a cada inicialização
    pub jwt_secret: String,
    /// Número máximo de conexões no pool
    pub max_connections: u32,
    /// Validade das sessões em segundos
    pub session_ttl_secs: i64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            db_path: "data/expediente.db".to_string(),
            storage_dir: "data/storage".to_string(),
            jwt_secret: "".to_string(),
            max_connections: 5,
            session_ttl_secs: 3600,
        }
    }
}

impl DbConfig {
    /// Configuração com banco e anexos dentro de `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            db_path: dir.join("expediente.db").to_string_lossy().into_owned(),
            storage_dir: dir.join("storage").to_string_lossy().into_owned(),
            ..Self::default()
        }
    }
}

/// Inicializa o pool de conexões SQLite e aplica as migrações
pub async fn init_db_pool(config: &DbConfig) -> Result<SqlitePool> {
    let db_path = Path::new(&config.db_path);

    // Verifica se o diretório pai existe
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .context("Falha ao criar diretório para banco de dados")?;
        }
    }

    let connection_options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .foreign_keys(true)
        .pragma("synchronous", "NORMAL");

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(connection_options)
        .await
        .context("Falha ao conectar ao banco de dados SQLite")?;

    migrations::run_migrations(&pool)
        .await
        .context("Falha ao aplicar migrações")?;

    info!("Banco de dados inicializado com sucesso: {}", config.db_path);
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_db_connection() -> Result<()> {
        let temp_dir = tempdir()?;
        let config = DbConfig {
            max_connections: 2,
            ..DbConfig::in_dir(temp_dir.path().join("nested"))
        };

        let pool = init_db_pool(&config).await?;

        let result: (i64,) = sqlx::query_as("SELECT 1").fetch_one(&pool).await?;
        assert_eq!(result.0, 1);

        let foreign_keys: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await?;
        assert_eq!(foreign_keys, 1);

        Ok(())
    }
}
