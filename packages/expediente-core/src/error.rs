//! Definições de erro do expediente
//!
//! Três camadas: validação local de formulários, falhas reportadas pelo
//! backend e o erro de alto nível que a fachada entrega às telas.

use thiserror::Error;

/// Erros de validação detectados antes de qualquer chamada ao backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Campos obrigatórios ausentes: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Formato de data inválido (esperado DD/MM/AAAA)")]
    InvalidDateFormat,

    #[error("Sexo inválido: {0}")]
    InvalidSex(String),

    #[error("Status de paciente inválido: {0}")]
    InvalidStatus(String),

    #[error("E-mail inválido")]
    InvalidEmail,

    #[error("Senha deve ter pelo menos {min} caracteres")]
    WeakPassword { min: u64 },
}

/// Falhas reportadas por uma implementação de [`crate::backend::Backend`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Erro de rede: {0}")]
    Network(String),

    #[error("Erro de autenticação: {0}")]
    Auth(String),

    #[error("Entidade não encontrada: {0}")]
    NotFound(String),

    #[error("Violação de restrição: {0}")]
    Constraint(String),

    #[error("Erro de consulta: {0}")]
    Query(String),

    #[error("Erro de armazenamento: {0}")]
    Storage(String),

    #[error("Erro interno: {0}")]
    Internal(String),
}

impl BackendError {
    /// Indica falhas de transporte, inclusive mensagens do backend que
    /// mencionam a rede
    pub fn is_network(&self) -> bool {
        match self {
            BackendError::Network(_) => true,
            BackendError::Auth(msg) | BackendError::Internal(msg) => {
                msg.to_lowercase().contains("network")
            }
            _ => false,
        }
    }
}

/// Erro entregue pela fachada [`crate::client::ClinicClient`]
#[derive(Error, Debug)]
pub enum ClinicError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Sem conexão com o backend")]
    Connectivity,

    #[error("Erro de autenticação: {0}")]
    Auth(String),

    #[error("Não encontrado: {0}")]
    NotFound(String),

    #[error("Falha no envio de arquivo: {0}")]
    Upload(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl ClinicError {
    /// Texto do alerta exibido ao usuário (interface em espanhol)
    pub fn user_message(&self) -> String {
        match self {
            ClinicError::Validation(ValidationError::MissingFields(_)) => {
                "Por favor completa los campos obligatorios".to_string()
            }
            ClinicError::Validation(ValidationError::InvalidDateFormat) => {
                "Formato de fecha inválido. Use DD/MM/AAAA".to_string()
            }
            ClinicError::Validation(ValidationError::InvalidSex(_)) => {
                "Indica el sexo como Masculino o Femenino".to_string()
            }
            ClinicError::Validation(ValidationError::InvalidStatus(_)) => {
                "Estado de paciente no válido".to_string()
            }
            ClinicError::Validation(ValidationError::InvalidEmail) => {
                "Por favor ingresa un correo electrónico válido".to_string()
            }
            ClinicError::Validation(ValidationError::WeakPassword { min }) => {
                format!("La contraseña debe tener al menos {} caracteres", min)
            }
            ClinicError::Connectivity => {
                "Error de conexión. Por favor verifica tu conexión a internet.".to_string()
            }
            ClinicError::Auth(msg) => msg.clone(),
            ClinicError::NotFound(_) => "No encontrado".to_string(),
            ClinicError::Upload(_) => "No se pudo subir el archivo".to_string(),
            ClinicError::Backend(_) => "Ocurrió un error. Intenta de nuevo.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_detection() {
        assert!(BackendError::Network("connection refused".into()).is_network());
        assert!(BackendError::Auth("Network request failed".into()).is_network());
        assert!(!BackendError::Auth("Invalid login credentials".into()).is_network());
        assert!(!BackendError::Query("network".into()).is_network());
    }

    #[test]
    fn test_missing_fields_message() {
        let err = ValidationError::MissingFields(vec!["full_name".into(), "sex".into()]);
        assert_eq!(err.to_string(), "Campos obrigatórios ausentes: full_name, sex");
    }

    #[test]
    fn test_connectivity_user_message() {
        assert_eq!(
            ClinicError::Connectivity.user_message(),
            "Error de conexión. Por favor verifica tu conexión a internet."
        );
        assert_eq!(
            ClinicError::Auth("Invalid login credentials".into()).user_message(),
            "Invalid login credentials"
        );
    }
}
