//! Expediente Supabase - Backend do expediente sobre o serviço hospedado
//!
//! Esta biblioteca fornece:
//! - Autenticação por e-mail e senha pela API `auth/v1`
//! - Tabelas de médicos, pacientes e consultas pela API REST
//! - Envio e listagem de anexos pela API de armazenamento
//! - Implementação do trait `Backend` do núcleo sobre essas APIs

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

pub mod backend;
pub mod error;
pub mod wire;

pub use backend::SupabaseBackend;
pub use error::SupabaseError;

/// Configuração de acesso ao projeto hospedado
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// URL base do projeto (ex.: `https://xyz.supabase.co`)
    pub url: String,
    /// Chave pública do projeto
    pub anon_key: String,
    /// Tempo máximo por requisição
    pub timeout_secs: Option<u64>,
}

impl SupabaseConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            timeout_secs: None,
        }
    }

    /// Lê `SUPABASE_URL`, `SUPABASE_ANON_KEY` e `SUPABASE_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self> {
        let url = env::var("SUPABASE_URL").context("SUPABASE_URL não definida")?;
        let anon_key = env::var("SUPABASE_ANON_KEY").context("SUPABASE_ANON_KEY não definida")?;
        let timeout_secs = match env::var("SUPABASE_TIMEOUT_SECS") {
            Ok(value) => Some(
                value
                    .trim()
                    .parse()
                    .context("SUPABASE_TIMEOUT_SECS deve ser um número de segundos")?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            url,
            anon_key,
            timeout_secs,
        })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// URL completa de um caminho da API
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.url.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let config = SupabaseConfig::new("https://demo.supabase.co/", "anon");
        assert_eq!(
            config.endpoint("/rest/v1/patients"),
            "https://demo.supabase.co/rest/v1/patients"
        );
        assert!(config.timeout().is_none());
    }
}
