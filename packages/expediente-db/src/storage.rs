//! Armazenamento de objetos em disco
//!
//! Cada bucket é um diretório sob a raiz configurada; os metadados ficam
//! nas tabelas `storage_buckets` e `storage_objects`.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use expediente_core::models::{Bucket, BucketOptions, FileDescriptor};
use sqlx::{Row, SqlitePool};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::error::DbError;

/// Armazenamento de objetos sobre um diretório local
#[derive(Debug, Clone)]
pub struct ObjectStore {
    root: PathBuf,
}

/// Recusa chaves vazias, absolutas ou com `..`
fn validate_key(key: &str) -> Result<(), DbError> {
    let path = Path::new(key);
    let safe = !key.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if !safe {
        return Err(DbError::StorageError(format!("Chave de objeto inválida: {}", key)));
    }
    Ok(())
}

impl ObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, DbError> {
        validate_key(bucket)?;
        validate_key(key)?;
        Ok(self.root.join(bucket).join(key))
    }

    pub async fn list_buckets(&self, pool: &SqlitePool) -> Result<Vec<Bucket>, DbError> {
        let rows = sqlx::query("SELECT name, public FROM storage_buckets ORDER BY name")
            .fetch_all(pool)
            .await?;

        rows.iter()
            .map(|row| {
                Ok(Bucket {
                    name: row.try_get("name")?,
                    public: row.try_get("public")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(DbError::from)
    }

    pub async fn create_bucket(
        &self,
        pool: &SqlitePool,
        name: &str,
        options: BucketOptions,
    ) -> Result<(), DbError> {
        validate_key(name)?;
        sqlx::query(
            "INSERT INTO storage_buckets (name, public, file_size_limit, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(name)
        .bind(options.public)
        .bind(options.file_size_limit as i64)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        tokio::fs::create_dir_all(self.root.join(name)).await?;
        Ok(())
    }

    /// Decodifica o conteúdo em base64 e grava o objeto
    pub async fn upload(
        &self,
        pool: &SqlitePool,
        bucket: &str,
        key: &str,
        content_base64: &str,
        content_type: &str,
        upsert: bool,
    ) -> Result<(), DbError> {
        let path = self.object_path(bucket, key)?;

        let limit: Option<i64> =
            sqlx::query_scalar("SELECT file_size_limit FROM storage_buckets WHERE name = ?")
                .bind(bucket)
                .fetch_optional(pool)
                .await?;
        let limit = limit.ok_or_else(|| DbError::NotFound(format!("Bucket não encontrado: {}", bucket)))?;

        let content = STANDARD
            .decode(content_base64)
            .map_err(|e| DbError::StorageError(format!("Conteúdo base64 inválido: {}", e)))?;
        if content.len() as i64 > limit {
            return Err(DbError::StorageError(format!(
                "Objeto excede o limite do bucket ({} > {} bytes)",
                content.len(),
                limit
            )));
        }

        let exists: Option<String> =
            sqlx::query_scalar("SELECT name FROM storage_objects WHERE bucket = ? AND name = ?")
                .bind(bucket)
                .bind(key)
                .fetch_optional(pool)
                .await?;
        if exists.is_some() && !upsert {
            return Err(DbError::ConstraintViolation(format!("Objeto já existe: {}", key)));
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &content).await?;

        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO storage_objects (bucket, name, content_type, size, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (bucket, name) DO UPDATE SET
                content_type = excluded.content_type,
                size = excluded.size,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(bucket)
        .bind(key)
        .bind(content_type)
        .bind(content.len() as i64)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        debug!("Objeto gravado: {}/{} ({} bytes)", bucket, key, content.len());
        Ok(())
    }

    /// Objetos imediatamente abaixo de `prefix`, em ordem de nome
    pub async fn list(
        &self,
        pool: &SqlitePool,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<FileDescriptor>, DbError> {
        let folder = format!("{}/", prefix.trim_end_matches('/'));
        let rows = sqlx::query(
            "SELECT name, content_type, size, created_at FROM storage_objects \
             WHERE bucket = ? AND substr(name, 1, length(?)) = ? ORDER BY name",
        )
        .bind(bucket)
        .bind(&folder)
        .bind(&folder)
        .fetch_all(pool)
        .await?;

        let mut files = Vec::new();
        for row in rows {
            let name: String = row.try_get("name")?;
            let Some(relative) = name.strip_prefix(&folder) else {
                continue;
            };
            if relative.contains('/') {
                continue;
            }
            let size: i64 = row.try_get("size")?;
            let created_at: DateTime<Utc> = row.try_get("created_at")?;
            files.push(FileDescriptor {
                name: relative.to_string(),
                size: Some(size as u64),
                content_type: Some(row.try_get("content_type")?),
                created_at: Some(created_at),
            });
        }
        Ok(files)
    }

    /// Lê o conteúdo de um objeto
    pub async fn read(&self, bucket: &str, key: &str) -> Result<Vec<u8>, DbError> {
        let path = self.object_path(bucket, key)?;
        Ok(tokio::fs::read(path).await?)
    }
}
