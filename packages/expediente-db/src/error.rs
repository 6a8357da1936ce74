//! Definições de erro para a biblioteca expediente-db
//!
//! Este módulo define os tipos de erro usados pelo backend local e sua
//! conversão para os erros de backend do núcleo

use expediente_core::BackendError;
use thiserror::Error;

/// Erros específicos para operações do backend local
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Erro de conexão com banco de dados: {0}")]
    ConnectionError(String),

    #[error("Erro de consulta: {0}")]
    QueryError(String),

    #[error("Entidade não encontrada: {0}")]
    NotFound(String),

    #[error("Violação de restrição: {0}")]
    ConstraintViolation(String),

    #[error("Erro de autenticação: {0}")]
    AuthError(String),

    #[error("Erro de armazenamento: {0}")]
    StorageError(String),

    #[error("Erro interno: {0}")]
    InternalError(String),
}

/// Conversão de erros específicos do SQLx para nossos tipos de erro
impl From<sqlx::Error> for DbError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => DbError::NotFound("Registro não encontrado".to_string()),
            sqlx::Error::Database(dbe) => {
                if dbe.is_unique_violation() || dbe.is_foreign_key_violation() || dbe.is_check_violation() {
                    return DbError::ConstraintViolation(dbe.message().to_string());
                }
                DbError::QueryError(dbe.message().to_string())
            }
            sqlx::Error::ColumnNotFound(col) => {
                DbError::QueryError(format!("Coluna não encontrada: {}", col))
            }
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::QueryError(format!("Erro ao decodificar coluna {}: {}", index, source))
            }
            sqlx::Error::Io(io_err) => DbError::ConnectionError(io_err.to_string()),
            sqlx::Error::Configuration(conf_err) => DbError::ConnectionError(conf_err.to_string()),
            sqlx::Error::PoolClosed => {
                DbError::ConnectionError("Pool de conexões fechado".to_string())
            }
            sqlx::Error::PoolTimedOut => {
                DbError::ConnectionError("Timeout no pool de conexões".to_string())
            }
            sqlx::Error::WorkerCrashed => {
                DbError::InternalError("Worker do banco de dados falhou".to_string())
            }
            _ => DbError::InternalError(format!("Erro inesperado: {:?}", error)),
        }
    }
}

impl From<std::io::Error> for DbError {
    fn from(error: std::io::Error) -> Self {
        DbError::StorageError(error.to_string())
    }
}

impl From<DbError> for BackendError {
    fn from(error: DbError) -> Self {
        match error {
            DbError::ConnectionError(msg) => BackendError::Network(msg),
            DbError::QueryError(msg) => BackendError::Query(msg),
            DbError::NotFound(msg) => BackendError::NotFound(msg),
            DbError::ConstraintViolation(msg) => BackendError::Constraint(msg),
            DbError::AuthError(msg) => BackendError::Auth(msg),
            DbError::StorageError(msg) => BackendError::Storage(msg),
            DbError::InternalError(msg) => BackendError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: BackendError = DbError::from(sqlx::Error::RowNotFound).into();
        assert!(matches!(err, BackendError::NotFound(_)));
    }

    #[test]
    fn test_pool_errors_are_connection_errors() {
        let err: BackendError = DbError::from(sqlx::Error::PoolTimedOut).into();
        assert!(err.is_network());
    }
}
