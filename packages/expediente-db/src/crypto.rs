//! Primitivas de autenticação do backend local
//!
//! Hash de senhas com Argon2id, tokens de sessão JWT (HS256) e tokens de
//! recuperação de senha.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DbError;

/// Tamanho dos segredos e tokens aleatórios
const TOKEN_LEN: usize = 48;

/// Gera o hash Argon2id de uma senha, no formato PHC
pub fn hash_password(password: &str) -> Result<String, DbError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DbError::InternalError(format!("Falha ao gerar hash da senha: {}", e)))
}

/// Confere uma senha contra o hash armazenado
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Texto aleatório alfanumérico
pub fn random_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Conteúdo do token de sessão
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Id do usuário
    pub sub: Uuid,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Emite e confere tokens de sessão
#[derive(Clone)]
pub struct SessionSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionSigner {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    /// Emite um token para o usuário; devolve o token e sua expiração
    pub fn issue(&self, user_id: Uuid, email: &str) -> Result<(String, DateTime<Utc>), DbError> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = SessionClaims {
            sub: user_id,
            email: email.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| DbError::InternalError(format!("Falha ao emitir token: {}", e)))?;

        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .unwrap_or(expires_at);
        Ok((token, expires_at))
    }

    /// Confere assinatura e expiração
    pub fn verify(&self, token: &str) -> Result<SessionClaims, DbError> {
        decode::<SessionClaims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| DbError::AuthError(format!("Sessão inválida: {}", e)))
    }
}
