//! Capacidades exigidas do backend
//!
//! Autenticação, tabelas de médicos/pacientes/consultas e armazenamento de
//! objetos. A fachada [`crate::client::ClinicClient`] só conversa com o
//! backend por este trait, o que permite trocar o serviço hospedado por
//! uma implementação local ou por um dublê de teste.

use uuid::Uuid;

use crate::error::BackendError;
use crate::models::{
    AuthUser, Bucket, BucketOptions, Doctor, FileDescriptor, NewDoctor, NewPatient, NewVisit,
    Patient, PatientStatus, Session, Visit,
};

pub type BackendResult<T> = Result<T, BackendError>;

#[allow(async_fn_in_trait)]
pub trait Backend {
    // Autenticação

    /// Cria o usuário de autenticação
    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<AuthUser>;

    /// Abre uma sessão com e-mail e senha
    async fn sign_in_with_password(&self, email: &str, password: &str) -> BackendResult<Session>;

    async fn sign_out(&self) -> BackendResult<()>;

    /// Solicita a recuperação de senha
    async fn reset_password_for_email(&self, email: &str) -> BackendResult<()>;

    /// Usuário da sessão atual, se houver
    async fn current_user(&self) -> BackendResult<Option<AuthUser>>;

    // Tabelas

    async fn insert_doctor(&self, doctor: &NewDoctor) -> BackendResult<Doctor>;

    async fn select_doctor_by_email(&self, email: &str) -> BackendResult<Option<Doctor>>;

    async fn insert_patient(&self, patient: &NewPatient) -> BackendResult<Patient>;

    /// Pacientes do médico, mais recentes primeiro
    async fn select_patients(&self, doctor_id: Uuid) -> BackendResult<Vec<Patient>>;

    async fn select_patient(&self, id: Uuid) -> BackendResult<Option<Patient>>;

    async fn update_patient_status(&self, id: Uuid, status: PatientStatus)
        -> BackendResult<Patient>;

    async fn insert_visit(&self, visit: &NewVisit) -> BackendResult<Visit>;

    /// Consultas do paciente, mais recentes primeiro
    async fn select_visits(&self, patient_id: Uuid) -> BackendResult<Vec<Visit>>;

    /// Consultas de todos os pacientes do médico, mais recentes primeiro
    async fn select_visits_by_doctor(&self, doctor_id: Uuid) -> BackendResult<Vec<Visit>>;

    async fn select_visit(&self, id: Uuid) -> BackendResult<Option<Visit>>;

    // Armazenamento

    async fn list_buckets(&self) -> BackendResult<Vec<Bucket>>;

    async fn create_bucket(&self, name: &str, options: BucketOptions) -> BackendResult<()>;

    /// Grava um objeto; `content_base64` é o conteúdo codificado em base64
    async fn upload_object(
        &self,
        bucket: &str,
        key: &str,
        content_base64: &str,
        content_type: &str,
        upsert: bool,
    ) -> BackendResult<()>;

    /// Lista os objetos imediatamente abaixo de `prefix`
    async fn list_objects(&self, bucket: &str, prefix: &str) -> BackendResult<Vec<FileDescriptor>>;
}
