//! Definições de erro para a biblioteca expediente-supabase
//!
//! Falhas de transporte e respostas de erro das APIs hospedadas, e sua
//! conversão para os erros de backend do núcleo

use expediente_core::BackendError;
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Grupo de APIs que produziu a resposta
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Api {
    Auth,
    Rest,
    Storage,
}

/// Erros específicos das chamadas HTTP
#[derive(Error, Debug)]
pub enum SupabaseError {
    #[error("Erro de conexão: {0}")]
    ConnectionError(String),

    #[error("Erro de autenticação: {0}")]
    AuthError(String),

    #[error("Entidade não encontrada: {0}")]
    NotFound(String),

    #[error("Violação de restrição: {0}")]
    ConstraintViolation(String),

    #[error("Erro de requisição ({status}): {message}")]
    RequestError { status: u16, message: String },

    #[error("Erro de armazenamento: {0}")]
    StorageError(String),

    #[error("Resposta inesperada: {0}")]
    DecodeError(String),
}

impl From<reqwest::Error> for SupabaseError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            return SupabaseError::DecodeError(error.to_string());
        }
        if error.is_connect() || error.is_timeout() || error.is_request() {
            // Mantém "network" na mensagem, como o cliente oficial
            return SupabaseError::ConnectionError(format!("Network request failed: {}", error));
        }
        match error.status() {
            Some(status) => SupabaseError::RequestError {
                status: status.as_u16(),
                message: error.to_string(),
            },
            None => SupabaseError::ConnectionError(format!("Network request failed: {}", error)),
        }
    }
}

impl From<SupabaseError> for BackendError {
    fn from(error: SupabaseError) -> Self {
        match error {
            SupabaseError::ConnectionError(msg) => BackendError::Network(msg),
            SupabaseError::AuthError(msg) => BackendError::Auth(msg),
            SupabaseError::NotFound(msg) => BackendError::NotFound(msg),
            SupabaseError::ConstraintViolation(msg) => BackendError::Constraint(msg),
            SupabaseError::RequestError { message, .. } => BackendError::Query(message),
            SupabaseError::StorageError(msg) => BackendError::Storage(msg),
            SupabaseError::DecodeError(msg) => BackendError::Internal(msg),
        }
    }
}

/// Mensagem legível do corpo de erro
///
/// Cada API usa um campo diferente; o corpo bruto é usado quando nenhum
/// deles existe.
pub fn error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|value| {
            ["msg", "message", "error_description", "error"]
                .iter()
                .find_map(|field| value.get(field).and_then(Value::as_str))
        })
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string())
}

/// Código efetivo da resposta
///
/// A API de armazenamento responde 400 com o código real em `statusCode`.
fn effective_status(status: StatusCode, body: &str) -> u16 {
    let embedded = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| match value.get("statusCode") {
            Some(Value::String(code)) => code.parse::<u16>().ok(),
            Some(Value::Number(code)) => code.as_u64().and_then(|c| u16::try_from(c).ok()),
            _ => None,
        });
    embedded.unwrap_or(status.as_u16())
}

/// Converte uma resposta de erro no erro correspondente
pub fn status_error(api: Api, status: StatusCode, body: &str) -> SupabaseError {
    let message = error_message(body);
    match (api, effective_status(status, body)) {
        (Api::Auth, 400 | 401 | 403 | 422) => SupabaseError::AuthError(message),
        (_, 401 | 403) => SupabaseError::AuthError(message),
        (_, 404) => SupabaseError::NotFound(message),
        (_, 409) => SupabaseError::ConstraintViolation(message),
        (Api::Storage, 413) => SupabaseError::StorageError(message),
        (_, 502..=504) => SupabaseError::ConnectionError(format!("Network error: {}", message)),
        (_, code) => SupabaseError::RequestError {
            status: code,
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_fields() {
        assert_eq!(
            error_message(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#),
            "Invalid login credentials"
        );
        assert_eq!(
            error_message(r#"{"code":"23505","message":"duplicate key value"}"#),
            "duplicate key value"
        );
        assert_eq!(error_message(r#"{"msg":"User already registered"}"#), "User already registered");
        assert_eq!(error_message("Bad Gateway\n"), "Bad Gateway");
    }

    #[test]
    fn test_auth_statuses() {
        let err = status_error(
            Api::Auth,
            StatusCode::BAD_REQUEST,
            r#"{"error_description":"Invalid login credentials"}"#,
        );
        assert!(matches!(err, SupabaseError::AuthError(ref m) if m == "Invalid login credentials"));

        let err: BackendError = status_error(Api::Rest, StatusCode::BAD_REQUEST, "{}").into();
        assert!(matches!(err, BackendError::Query(_)));
    }

    #[test]
    fn test_storage_embedded_status() {
        let body = r#"{"statusCode":"409","error":"Duplicate","message":"The resource already exists"}"#;
        let err: BackendError = status_error(Api::Storage, StatusCode::BAD_REQUEST, body).into();
        assert_eq!(err, BackendError::Constraint("The resource already exists".to_string()));

        let body = r#"{"statusCode":"404","error":"Bucket not found","message":"Bucket not found"}"#;
        let err: BackendError = status_error(Api::Storage, StatusCode::BAD_REQUEST, body).into();
        assert!(matches!(err, BackendError::NotFound(_)));
    }

    #[test]
    fn test_gateway_errors_are_network() {
        let err: BackendError = status_error(Api::Rest, StatusCode::BAD_GATEWAY, "").into();
        assert!(err.is_network());
    }
}
