//! Backend sobre as APIs HTTP do serviço hospedado
//!
//! Toda requisição leva a chave pública em `apikey` e um token bearer: o da
//! sessão aberta, ou a própria chave pública quando não há sessão.

use anyhow::Context;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use expediente_core::models::{
    AuthUser, Bucket, BucketOptions, Doctor, FileDescriptor, NewDoctor, NewPatient, NewVisit,
    Patient, PatientStatus, Session, Visit,
};
use expediente_core::{Backend, BackendResult};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{status_error, Api, SupabaseError};
use crate::wire::{
    parse_sign_up, CreateBucketRequest, Credentials, ListObjectsRequest, ObjectEntry,
    RecoverRequest, StatusPatch, TokenResponse,
};
use crate::SupabaseConfig;

const RETURN_REPRESENTATION: (&str, &str) = ("Prefer", "return=representation");

/// Filtro de igualdade da API REST
fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{}", value)
}

pub struct SupabaseBackend {
    http: reqwest::Client,
    config: SupabaseConfig,
    session: Mutex<Option<Session>>,
}

impl SupabaseBackend {
    pub fn new(config: SupabaseConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Falha ao criar cliente HTTP")?;

        info!("Backend hospedado configurado: {}", config.url);
        Ok(Self {
            http,
            config,
            session: Mutex::new(None),
        })
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Self::new(SupabaseConfig::from_env()?)
    }

    pub fn config(&self) -> &SupabaseConfig {
        &self.config
    }

    /// Sessão aberta, se houver
    pub fn session(&self) -> Option<Session> {
        self.session_slot().clone()
    }

    fn session_slot(&self) -> MutexGuard<'_, Option<Session>> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn bearer(&self) -> String {
        self.session_slot()
            .as_ref()
            .map(|s| s.access_token.clone())
            .unwrap_or_else(|| self.config.anon_key.clone())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.config.endpoint(path))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(self.bearer())
    }

    /// Envia a requisição e converte respostas de erro
    async fn execute(&self, api: Api, request: RequestBuilder) -> Result<Response, SupabaseError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = status_error(api, status, &body);
        debug!("Resposta {} da API {:?}: {}", status, api, err);
        Err(err)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        api: Api,
        request: RequestBuilder,
    ) -> Result<T, SupabaseError> {
        Ok(self.execute(api, request).await?.json().await?)
    }

    /// Primeira linha de uma resposta da API REST
    async fn fetch_one<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<Option<T>, SupabaseError> {
        let rows: Vec<T> = self.fetch(Api::Rest, request).await?;
        let row = rows.into_iter().next();
        if row.is_none() {
            debug!("Nenhuma linha devolvida para {}", what);
        }
        Ok(row)
    }

    async fn insert_row<B, T>(&self, table: &str, body: &B) -> Result<T, SupabaseError>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .request(Method::POST, &format!("/rest/v1/{}", table))
            .header(RETURN_REPRESENTATION.0, RETURN_REPRESENTATION.1)
            .json(body);
        self.fetch_one(request, table)
            .await?
            .ok_or_else(|| SupabaseError::DecodeError(format!("Inserção em {} sem retorno", table)))
    }

    async fn select_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>, SupabaseError> {
        let request = self
            .request(Method::GET, &format!("/rest/v1/{}", table))
            .query(&[("select", "*")])
            .query(filters);
        self.fetch(Api::Rest, request).await
    }

    fn store_session(&self, session: Option<Session>) {
        *self.session_slot() = session;
    }
}

impl Backend for SupabaseBackend {
    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<AuthUser> {
        let request = self
            .request(Method::POST, "/auth/v1/signup")
            .json(&Credentials { email, password });
        let body: Value = self.fetch(Api::Auth, request).await?;

        let (user, session) = parse_sign_up(body)?;
        if session.is_some() {
            self.store_session(session);
        }
        Ok(user)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> BackendResult<Session> {
        let request = self
            .request(Method::POST, "/auth/v1/token")
            .query(&[("grant_type", "password")])
            .json(&Credentials { email, password });
        let token: TokenResponse = self.fetch(Api::Auth, request).await?;

        let session = token.into_session();
        self.store_session(Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> BackendResult<()> {
        let Some(session) = self.session_slot().take() else {
            return Ok(());
        };

        let request = self
            .http
            .post(self.config.endpoint("/auth/v1/logout"))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(&session.access_token);
        match self.execute(Api::Auth, request).await {
            Ok(_) => Ok(()),
            // Sessão já expirada no servidor
            Err(SupabaseError::AuthError(msg)) => {
                debug!("Logout com sessão inválida: {}", msg);
                Ok(())
            }
            Err(e) => {
                // Sessão continua válida no servidor
                let mut slot = self.session_slot();
                if slot.is_none() {
                    *slot = Some(session);
                }
                Err(e.into())
            }
        }
    }

    async fn reset_password_for_email(&self, email: &str) -> BackendResult<()> {
        let request = self
            .request(Method::POST, "/auth/v1/recover")
            .json(&RecoverRequest { email });
        self.execute(Api::Auth, request).await?;
        Ok(())
    }

    async fn current_user(&self) -> BackendResult<Option<AuthUser>> {
        if self.session_slot().is_none() {
            return Ok(None);
        }

        let request = self.request(Method::GET, "/auth/v1/user");
        match self.fetch::<AuthUser>(Api::Auth, request).await {
            Ok(user) => Ok(Some(user)),
            Err(SupabaseError::AuthError(msg)) => {
                warn!("Sessão recusada pelo servidor: {}", msg);
                self.store_session(None);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn insert_doctor(&self, doctor: &NewDoctor) -> BackendResult<Doctor> {
        Ok(self.insert_row("doctors", doctor).await?)
    }

    async fn select_doctor_by_email(&self, email: &str) -> BackendResult<Option<Doctor>> {
        let doctors: Vec<Doctor> = self.select_rows("doctors", &[("email", eq(email))]).await?;
        Ok(doctors.into_iter().next())
    }

    async fn insert_patient(&self, patient: &NewPatient) -> BackendResult<Patient> {
        Ok(self.insert_row("patients", patient).await?)
    }

    async fn select_patients(&self, doctor_id: Uuid) -> BackendResult<Vec<Patient>> {
        Ok(self
            .select_rows(
                "patients",
                &[("doctor_id", eq(doctor_id)), ("order", "created_at.desc".to_string())],
            )
            .await?)
    }

    async fn select_patient(&self, id: Uuid) -> BackendResult<Option<Patient>> {
        let patients: Vec<Patient> = self.select_rows("patients", &[("id", eq(id))]).await?;
        Ok(patients.into_iter().next())
    }

    async fn update_patient_status(
        &self,
        id: Uuid,
        status: PatientStatus,
    ) -> BackendResult<Patient> {
        let request = self
            .request(Method::PATCH, "/rest/v1/patients")
            .query(&[("id", eq(id))])
            .header(RETURN_REPRESENTATION.0, RETURN_REPRESENTATION.1)
            .json(&StatusPatch { status });

        self.fetch_one(request, "patients")
            .await?
            .ok_or_else(|| SupabaseError::NotFound(format!("Paciente não encontrado: {}", id)).into())
    }

    async fn insert_visit(&self, visit: &NewVisit) -> BackendResult<Visit> {
        Ok(self.insert_row("visits", visit).await?)
    }

    async fn select_visits(&self, patient_id: Uuid) -> BackendResult<Vec<Visit>> {
        Ok(self
            .select_rows(
                "visits",
                &[("patient_id", eq(patient_id)), ("order", "visit_date.desc".to_string())],
            )
            .await?)
    }

    async fn select_visits_by_doctor(&self, doctor_id: Uuid) -> BackendResult<Vec<Visit>> {
        Ok(self
            .select_rows(
                "visits",
                &[("doctor_id", eq(doctor_id)), ("order", "visit_date.desc".to_string())],
            )
            .await?)
    }

    async fn select_visit(&self, id: Uuid) -> BackendResult<Option<Visit>> {
        let visits: Vec<Visit> = self.select_rows("visits", &[("id", eq(id))]).await?;
        Ok(visits.into_iter().next())
    }

    async fn list_buckets(&self) -> BackendResult<Vec<Bucket>> {
        let request = self.request(Method::GET, "/storage/v1/bucket");
        Ok(self.fetch(Api::Storage, request).await?)
    }

    async fn create_bucket(&self, name: &str, options: BucketOptions) -> BackendResult<()> {
        let request = self
            .request(Method::POST, "/storage/v1/bucket")
            .json(&CreateBucketRequest {
                id: name,
                name,
                public: options.public,
                file_size_limit: options.file_size_limit,
            });
        self.execute(Api::Storage, request).await?;
        Ok(())
    }

    async fn upload_object(
        &self,
        bucket: &str,
        key: &str,
        content_base64: &str,
        content_type: &str,
        upsert: bool,
    ) -> BackendResult<()> {
        let content = STANDARD.decode(content_base64).map_err(|e| {
            SupabaseError::StorageError(format!("Conteúdo base64 inválido: {}", e))
        })?;
        let size = content.len();

        let request = self
            .request(Method::POST, &format!("/storage/v1/object/{}/{}", bucket, key))
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", if upsert { "true" } else { "false" })
            .body(content);
        self.execute(Api::Storage, request).await?;

        debug!("Objeto enviado: {}/{} ({} bytes)", bucket, key, size);
        Ok(())
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> BackendResult<Vec<FileDescriptor>> {
        let request = self
            .request(Method::POST, &format!("/storage/v1/object/list/{}", bucket))
            .json(&ListObjectsRequest::by_name(prefix));
        let entries: Vec<ObjectEntry> = self.fetch(Api::Storage, request).await?;

        Ok(entries
            .into_iter()
            .filter(|entry| !entry.is_folder())
            .map(ObjectEntry::into_descriptor)
            .collect())
    }
}
