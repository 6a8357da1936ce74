//! Formatos de requisição e resposta das APIs hospedadas

use chrono::{DateTime, Duration, TimeZone, Utc};
use expediente_core::models::{AuthUser, FileDescriptor, PatientStatus, Session};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SupabaseError;

/// Credenciais de `signup` e `token?grant_type=password`
#[derive(Debug, Serialize)]
pub struct Credentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RecoverRequest<'a> {
    pub email: &'a str,
}

/// Resposta de login com senha
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl TokenResponse {
    pub fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or_else(|| Utc::now() + Duration::seconds(self.expires_in.unwrap_or(3600)));
        Session {
            access_token: self.access_token,
            expires_at,
            user: self.user,
        }
    }
}

/// Resposta do cadastro
///
/// Com confirmação de e-mail ativa o corpo é o próprio usuário; sem ela
/// vem uma sessão completa com o usuário em `user`.
pub fn parse_sign_up(body: Value) -> Result<(AuthUser, Option<Session>), SupabaseError> {
    let decode = |e: serde_json::Error| SupabaseError::DecodeError(e.to_string());

    if body.get("access_token").is_some() {
        let token: TokenResponse = serde_json::from_value(body).map_err(decode)?;
        let session = token.into_session();
        return Ok((session.user.clone(), Some(session)));
    }

    let user = match body.get("user") {
        Some(user) => serde_json::from_value(user.clone()).map_err(decode)?,
        None => serde_json::from_value(body).map_err(decode)?,
    };
    Ok((user, None))
}

#[derive(Debug, Serialize)]
pub struct StatusPatch {
    pub status: PatientStatus,
}

#[derive(Debug, Serialize)]
pub struct CreateBucketRequest<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub public: bool,
    pub file_size_limit: u64,
}

#[derive(Debug, Serialize)]
pub struct SortBy {
    pub column: &'static str,
    pub order: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ListObjectsRequest<'a> {
    pub prefix: &'a str,
    pub limit: u32,
    pub offset: u32,
    #[serde(rename = "sortBy")]
    pub sort_by: SortBy,
}

impl<'a> ListObjectsRequest<'a> {
    pub fn by_name(prefix: &'a str) -> Self {
        Self {
            prefix,
            limit: 100,
            offset: 0,
            sort_by: SortBy {
                column: "name",
                order: "asc",
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ObjectMetadata {
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub mimetype: Option<String>,
}

/// Entrada da listagem de objetos; pastas vêm com `id` nulo
#[derive(Debug, Deserialize)]
pub struct ObjectEntry {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Option<ObjectMetadata>,
}

impl ObjectEntry {
    pub fn is_folder(&self) -> bool {
        self.id.is_none()
    }

    pub fn into_descriptor(self) -> FileDescriptor {
        let metadata = self.metadata.unwrap_or_default();
        FileDescriptor {
            name: self.name,
            size: metadata.size,
            content_type: metadata.mimetype,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sign_up_without_session() {
        let body = json!({
            "id": "6c1f4d5e-2a3b-4c5d-8e9f-0a1b2c3d4e5f",
            "email": "dra.lopez@clinica.mx",
            "confirmation_sent_at": "2024-03-15T12:00:00Z"
        });
        let (user, session) = parse_sign_up(body).unwrap();
        assert_eq!(user.email, "dra.lopez@clinica.mx");
        assert!(session.is_none());
    }

    #[test]
    fn test_sign_up_with_session() {
        let body = json!({
            "access_token": "jwt",
            "expires_in": 3600,
            "expires_at": 1710504000,
            "refresh_token": "r",
            "user": {"id": "6c1f4d5e-2a3b-4c5d-8e9f-0a1b2c3d4e5f", "email": "dra.lopez@clinica.mx"}
        });
        let (user, session) = parse_sign_up(body).unwrap();
        let session = session.unwrap();
        assert_eq!(session.user, user);
        assert_eq!(session.expires_at.timestamp(), 1710504000);
    }

    #[test]
    fn test_sign_up_wrapped_user() {
        let body = json!({
            "user": {"id": "6c1f4d5e-2a3b-4c5d-8e9f-0a1b2c3d4e5f", "email": "dra.lopez@clinica.mx"},
            "session": null
        });
        let (user, session) = parse_sign_up(body).unwrap();
        assert_eq!(user.email, "dra.lopez@clinica.mx");
        assert!(session.is_none());
    }

    #[test]
    fn test_object_entries() {
        let entries: Vec<ObjectEntry> = serde_json::from_value(json!([
            {"name": "sub", "id": null, "metadata": null},
            {
                "name": "1710504000000.pdf",
                "id": "b6f1",
                "created_at": "2024-03-15T12:00:00Z",
                "metadata": {"size": 1024, "mimetype": "application/pdf"}
            }
        ]))
        .unwrap();

        assert!(entries[0].is_folder());
        let file = entries.into_iter().nth(1).unwrap().into_descriptor();
        assert_eq!(file.size, Some(1024));
        assert_eq!(file.content_type.as_deref(), Some("application/pdf"));
    }
}
