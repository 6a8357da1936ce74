//! Fachada do backend usada pelas telas
//!
//! Cada operação valida a entrada localmente, chama o backend e traduz as
//! falhas para [`ClinicError`]. O cliente é criado uma única vez na
//! inicialização do aplicativo e repassado por referência às telas.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{Local, Utc};
use std::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::backend::Backend;
use crate::date::MonthLocale;
use crate::error::{BackendError, ClinicError};
use crate::forms::{PatientForm, SignUpForm, VisitForm};
use crate::models::{
    AuthUser, BucketOptions, Doctor, FileDescriptor, NewDoctor, Patient, PatientStatus,
    PickedFile, Session, StoredFile, Visit, VISIT_FILES_BUCKET, VISIT_FILES_SIZE_LIMIT,
};
use crate::stats::{compute_stats, PracticeStats};

/// Anexo que não pôde ser enviado
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedUpload {
    pub file_name: String,
    pub reason: String,
}

/// Resultado do registro de uma consulta com anexos
///
/// A consulta permanece gravada mesmo que algum anexo falhe.
#[derive(Debug, Clone)]
pub struct VisitOutcome {
    pub visit: Visit,
    pub uploaded: Vec<StoredFile>,
    pub failed: Vec<FailedUpload>,
}

impl VisitOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Aviso para o usuário quando algum anexo falhou
    pub fn warning(&self) -> Option<String> {
        if self.failed.is_empty() {
            return None;
        }
        let names: Vec<&str> = self.failed.iter().map(|f| f.file_name.as_str()).collect();
        Some(format!(
            "La consulta se guardó, pero {} archivo(s) no se pudieron subir: {}",
            self.failed.len(),
            names.join(", ")
        ))
    }
}

/// Extensão usada na chave do objeto: o texto após o último ponto
fn file_extension(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// Traduz falhas de autenticação; falhas de rede viram mensagem de conexão
fn auth_error(err: BackendError) -> ClinicError {
    if err.is_network() {
        return ClinicError::Connectivity;
    }
    match err {
        BackendError::Auth(msg) | BackendError::Constraint(msg) => ClinicError::Auth(msg),
        other => ClinicError::Backend(other),
    }
}

fn data_error(operation: &str, err: BackendError) -> ClinicError {
    error!("Falha em {}: {}", operation, err);
    match err {
        BackendError::NotFound(what) => ClinicError::NotFound(what),
        other => ClinicError::Backend(other),
    }
}

/// Cliente do expediente sobre um [`Backend`]
pub struct ClinicClient<B> {
    backend: B,
    locale: MonthLocale,
    /// Último carimbo de tempo usado em nome de anexo
    last_upload_millis: Mutex<i64>,
}

impl<B: Backend> ClinicClient<B> {
    pub fn new(backend: B) -> Self {
        Self::with_locale(backend, MonthLocale::default())
    }

    pub fn with_locale(backend: B, locale: MonthLocale) -> Self {
        Self {
            backend,
            locale,
            last_upload_millis: Mutex::new(0),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn locale(&self) -> MonthLocale {
        self.locale
    }

    // ------------------------------------------------------------------
    // Autenticação
    // ------------------------------------------------------------------

    /// Cadastra o usuário e cria o perfil de médico
    pub async fn sign_up(&self, form: &SignUpForm) -> Result<Doctor, ClinicError> {
        form.check()?;
        let email = form.email.trim();

        let user = self
            .backend
            .sign_up(email, &form.password)
            .await
            .map_err(|e| {
                error!("Falha no cadastro de usuário: {}", e);
                auth_error(e)
            })?;

        let profile = NewDoctor {
            id: user.id,
            email: email.to_string(),
            full_name: form.full_name.trim().to_string(),
            specialty: String::new(),
            phone: None,
        };
        let doctor = self
            .backend
            .insert_doctor(&profile)
            .await
            .map_err(|e| data_error("criação do perfil de médico", e))?;

        info!("Médico cadastrado: {}", doctor.id);
        Ok(doctor)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ClinicError> {
        match self
            .backend
            .sign_in_with_password(email.trim(), password)
            .await
        {
            Ok(session) => {
                info!("Sessão iniciada: {}", session.user.id);
                Ok(session)
            }
            Err(e) => {
                error!("Falha no login: {}", e);
                Err(auth_error(e))
            }
        }
    }

    pub async fn sign_out(&self) -> Result<(), ClinicError> {
        self.backend.sign_out().await.map_err(|e| {
            error!("Falha ao encerrar sessão: {}", e);
            auth_error(e)
        })
    }

    /// Solicita a recuperação de senha
    ///
    /// Sempre responde com sucesso para não revelar quais e-mails têm conta.
    pub async fn reset_password(&self, email: &str) -> Result<(), ClinicError> {
        if let Err(e) = self.backend.reset_password_for_email(email.trim()).await {
            warn!("Falha na solicitação de recuperação de senha: {}", e);
        }
        Ok(())
    }

    /// Usuário da sessão atual
    pub async fn current_user(&self) -> Result<Option<AuthUser>, ClinicError> {
        self.backend.current_user().await.map_err(auth_error)
    }

    /// Perfil de médico cadastrado com o e-mail
    pub async fn find_doctor(&self, email: &str) -> Result<Option<Doctor>, ClinicError> {
        self.backend
            .select_doctor_by_email(email.trim())
            .await
            .map_err(|e| data_error("busca de médico", e))
    }

    // ------------------------------------------------------------------
    // Pacientes
    // ------------------------------------------------------------------

    /// Valida a ficha e cadastra o paciente
    pub async fn create_patient(
        &self,
        doctor_id: Uuid,
        form: &PatientForm,
    ) -> Result<Patient, ClinicError> {
        let new_patient = form.to_new_patient(doctor_id, Local::now().date_naive())?;
        let patient = self
            .backend
            .insert_patient(&new_patient)
            .await
            .map_err(|e| data_error("cadastro de paciente", e))?;

        info!("Paciente cadastrado: {}", patient.id);
        Ok(patient)
    }

    /// Pacientes do médico, mais recentes primeiro
    pub async fn list_patients(&self, doctor_id: Uuid) -> Result<Vec<Patient>, ClinicError> {
        self.backend
            .select_patients(doctor_id)
            .await
            .map_err(|e| data_error("listagem de pacientes", e))
    }

    pub async fn get_patient(&self, id: Uuid) -> Result<Patient, ClinicError> {
        self.backend
            .select_patient(id)
            .await
            .map_err(|e| data_error("consulta de paciente", e))?
            .ok_or_else(|| ClinicError::NotFound(format!("paciente {}", id)))
    }

    pub async fn update_patient_status(
        &self,
        id: Uuid,
        status: PatientStatus,
    ) -> Result<Patient, ClinicError> {
        let patient = self
            .backend
            .update_patient_status(id, status)
            .await
            .map_err(|e| data_error("atualização de status", e))?;

        info!("Status do paciente {} alterado para {}", id, status);
        Ok(patient)
    }

    // ------------------------------------------------------------------
    // Consultas
    // ------------------------------------------------------------------

    /// Valida o formulário e grava a consulta, sem enviar anexos
    pub async fn create_visit(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
        form: &VisitForm,
    ) -> Result<Visit, ClinicError> {
        let new_visit = form.to_new_visit(patient_id, doctor_id, Utc::now())?;
        let visit = self
            .backend
            .insert_visit(&new_visit)
            .await
            .map_err(|e| data_error("registro de consulta", e))?;

        info!("Consulta registrada: {} (paciente {})", visit.id, patient_id);
        Ok(visit)
    }

    /// Grava a consulta e envia os anexos do formulário, um de cada vez
    ///
    /// Falhas de envio não desfazem a consulta nem são repetidas; ficam em
    /// [`VisitOutcome::failed`].
    pub async fn record_visit(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
        form: &VisitForm,
    ) -> Result<VisitOutcome, ClinicError> {
        let visit = self.create_visit(patient_id, doctor_id, form).await?;

        let mut uploaded = Vec::new();
        let mut failed = Vec::new();
        for file in &form.attachments {
            match self.upload_visit_file(visit.id, patient_id, file).await {
                Ok(stored) => uploaded.push(stored),
                Err(e) => failed.push(FailedUpload {
                    file_name: file.name.clone(),
                    reason: e.to_string(),
                }),
            }
        }

        if !failed.is_empty() {
            warn!(
                "Consulta {} gravada com {} anexo(s) não enviados",
                visit.id,
                failed.len()
            );
        }

        Ok(VisitOutcome {
            visit,
            uploaded,
            failed,
        })
    }

    /// Consultas do paciente; qualquer falha resulta em lista vazia
    pub async fn list_visits(&self, patient_id: Uuid) -> Vec<Visit> {
        match self.backend.select_visits(patient_id).await {
            Ok(visits) => visits,
            Err(e) => {
                warn!("Consultas do paciente {} indisponíveis: {}", patient_id, e);
                Vec::new()
            }
        }
    }

    pub async fn get_visit(&self, id: Uuid) -> Result<Visit, ClinicError> {
        self.backend
            .select_visit(id)
            .await
            .map_err(|e| data_error("consulta de atendimento", e))?
            .ok_or_else(|| ClinicError::NotFound(format!("consulta {}", id)))
    }

    // ------------------------------------------------------------------
    // Anexos
    // ------------------------------------------------------------------

    /// Carimbo em milissegundos, estritamente crescente neste cliente
    fn next_upload_stamp(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut last = self
            .last_upload_millis
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let stamp = if now > *last { now } else { *last + 1 };
        *last = stamp;
        stamp
    }

    /// Cria o bucket de anexos na primeira utilização
    async fn ensure_visit_bucket(&self) -> Result<(), BackendError> {
        let buckets = self.backend.list_buckets().await?;
        if buckets.iter().any(|b| b.name == VISIT_FILES_BUCKET) {
            return Ok(());
        }

        let options = BucketOptions {
            public: false,
            file_size_limit: VISIT_FILES_SIZE_LIMIT,
        };
        match self.backend.create_bucket(VISIT_FILES_BUCKET, options).await {
            Ok(()) => {
                info!("Bucket {} criado", VISIT_FILES_BUCKET);
                Ok(())
            }
            // Criado por outro cliente entre a listagem e a criação
            Err(BackendError::Constraint(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Envia um anexo para `paciente/consulta/millis.ext`
    pub async fn upload_visit_file(
        &self,
        visit_id: Uuid,
        patient_id: Uuid,
        file: &PickedFile,
    ) -> Result<StoredFile, ClinicError> {
        let upload_error = |reason: String| {
            error!("Falha ao enviar {}: {}", file.name, reason);
            ClinicError::Upload(format!("{}: {}", file.name, reason))
        };

        self.ensure_visit_bucket()
            .await
            .map_err(|e| upload_error(e.to_string()))?;

        let content = tokio::fs::read(&file.uri)
            .await
            .map_err(|e| upload_error(e.to_string()))?;
        if content.len() as u64 > VISIT_FILES_SIZE_LIMIT {
            return Err(upload_error(format!(
                "arquivo excede o limite de {} bytes",
                VISIT_FILES_SIZE_LIMIT
            )));
        }

        let key = format!(
            "{}/{}/{}.{}",
            patient_id,
            visit_id,
            self.next_upload_stamp(),
            file_extension(&file.name)
        );
        let encoded = STANDARD.encode(&content);

        self.backend
            .upload_object(VISIT_FILES_BUCKET, &key, &encoded, &file.mime_type, true)
            .await
            .map_err(|e| upload_error(e.to_string()))?;

        debug!("Anexo gravado em {} ({} bytes)", key, content.len());
        Ok(StoredFile { stored_name: key })
    }

    /// Arquivos anexados a uma consulta
    pub async fn list_visit_files(
        &self,
        visit_id: Uuid,
        patient_id: Uuid,
    ) -> Result<Vec<FileDescriptor>, ClinicError> {
        let prefix = format!("{}/{}", patient_id, visit_id);
        self.backend
            .list_objects(VISIT_FILES_BUCKET, &prefix)
            .await
            .map_err(|e| data_error("listagem de anexos", e))
    }

    // ------------------------------------------------------------------
    // Estatísticas
    // ------------------------------------------------------------------

    pub async fn practice_stats(&self, doctor_id: Uuid) -> Result<PracticeStats, ClinicError> {
        let patients = self.list_patients(doctor_id).await?;
        let visits = self
            .backend
            .select_visits_by_doctor(doctor_id)
            .await
            .map_err(|e| data_error("listagem de consultas do médico", e))?;

        Ok(compute_stats(&patients, &visits, self.locale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::fixtures::{self, MemoryBackend};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn picked(file: &NamedTempFile, name: &str, mime: &str) -> PickedFile {
        PickedFile {
            name: name.to_string(),
            uri: file.path().to_path_buf(),
            mime_type: mime.to_string(),
        }
    }

    async fn signed_up(client: &ClinicClient<MemoryBackend>) -> Doctor {
        let form = SignUpForm {
            email: "dra.lopez@clinica.mx".to_string(),
            password: "secreto123".to_string(),
            full_name: "Dra. Laura López".to_string(),
        };
        client.sign_up(&form).await.unwrap()
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("receta.final.pdf"), "pdf");
        assert_eq!(file_extension("foto"), "foto");
    }

    #[tokio::test]
    async fn test_sign_up_trims_email() {
        let client = ClinicClient::new(MemoryBackend::default());
        let form = SignUpForm {
            email: " dra.lopez@clinica.mx ".to_string(),
            password: "secreto123".to_string(),
            full_name: "Dra. Laura López".to_string(),
        };
        let doctor = client.sign_up(&form).await.unwrap();
        assert_eq!(doctor.email, "dra.lopez@clinica.mx");

        let found = client.find_doctor("  dra.lopez@clinica.mx").await.unwrap();
        assert_eq!(found.map(|d| d.id), Some(doctor.id));
        assert!(client.find_doctor("otro@clinica.mx").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_name_never_reaches_backend() {
        let client = ClinicClient::new(MemoryBackend::default());
        let doctor = signed_up(&client).await;
        let writes_before = client.backend().writes();

        let mut form = fixtures::demo_patient_form("Ana García");
        form.full_name = String::new();

        let err = client.create_patient(doctor.id, &form).await.unwrap_err();
        assert!(matches!(
            err,
            ClinicError::Validation(ValidationError::MissingFields(ref f)) if f == &["full_name"]
        ));
        assert_eq!(client.backend().writes(), writes_before);
    }

    #[tokio::test]
    async fn test_sign_in_network_failure() {
        let backend = MemoryBackend::default();
        backend.set_offline(true);
        let client = ClinicClient::new(backend);

        let err = client.sign_in("dra.lopez@clinica.mx", "secreto123").await.unwrap_err();
        assert!(matches!(err, ClinicError::Connectivity));
    }

    #[tokio::test]
    async fn test_sign_in_wrong_password_keeps_message() {
        let client = ClinicClient::new(MemoryBackend::default());
        signed_up(&client).await;

        let err = client.sign_in("dra.lopez@clinica.mx", "otra").await.unwrap_err();
        match err {
            ClinicError::Auth(msg) => assert_eq!(msg, "Invalid login credentials"),
            other => panic!("erro inesperado: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reset_password_never_fails() {
        let backend = MemoryBackend::default();
        backend.set_offline(true);
        let client = ClinicClient::new(backend);

        assert!(client.reset_password("nadie@clinica.mx").await.is_ok());
    }

    #[tokio::test]
    async fn test_list_visits_degrades_to_empty() {
        let backend = MemoryBackend::default();
        let client = ClinicClient::new(backend);
        let doctor = signed_up(&client).await;
        let patient = client
            .create_patient(doctor.id, &fixtures::demo_patient_form("Ana García"))
            .await
            .unwrap();
        client
            .create_visit(patient.id, doctor.id, &fixtures::demo_visit_form())
            .await
            .unwrap();
        assert_eq!(client.list_visits(patient.id).await.len(), 1);

        client.backend().set_offline(true);
        assert!(client.list_visits(patient.id).await.is_empty());
    }

    #[tokio::test]
    async fn test_partial_upload_keeps_visit() {
        let client = ClinicClient::new(MemoryBackend::default());
        let doctor = signed_up(&client).await;
        let patient = client
            .create_patient(doctor.id, &fixtures::demo_patient_form("Ana García"))
            .await
            .unwrap();

        let mut receta = NamedTempFile::new().unwrap();
        receta.write_all(b"%PDF-1.4 receta").unwrap();

        let mut form = fixtures::demo_visit_form();
        form.add_attachment(picked(&receta, "receta.pdf", "application/pdf"));
        form.add_attachment(PickedFile {
            name: "perdido.png".to_string(),
            uri: "/nonexistent/perdido.png".into(),
            mime_type: "image/png".to_string(),
        });

        let outcome = client.record_visit(patient.id, doctor.id, &form).await.unwrap();
        assert!(!outcome.is_complete());
        assert_eq!(outcome.uploaded.len(), 1);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].file_name, "perdido.png");
        assert!(outcome.warning().unwrap().contains("perdido.png"));

        let stored = client.get_visit(outcome.visit.id).await.unwrap();
        assert_eq!(stored.id, outcome.visit.id);

        let files = client.list_visit_files(stored.id, patient.id).await.unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].name.ends_with(".pdf"));
    }

    #[tokio::test]
    async fn test_upload_creates_private_bucket_once() {
        let client = ClinicClient::new(MemoryBackend::default());
        let (patient_id, visit_id) = (Uuid::new_v4(), Uuid::new_v4());

        let mut foto = NamedTempFile::new().unwrap();
        foto.write_all(&[0x89, b'P', b'N', b'G']).unwrap();
        let file = picked(&foto, "radiografia.png", "image/png");

        let first = client.upload_visit_file(visit_id, patient_id, &file).await.unwrap();
        let second = client.upload_visit_file(visit_id, patient_id, &file).await.unwrap();
        assert_ne!(first.stored_name, second.stored_name);
        assert!(first
            .stored_name
            .starts_with(&format!("{}/{}/", patient_id, visit_id)));

        let buckets = client.backend().list_buckets().await.unwrap();
        assert_eq!(buckets.len(), 1);
        assert!(!buckets[0].public);

        let object = client
            .backend()
            .object(VISIT_FILES_BUCKET, &first.stored_name)
            .unwrap();
        assert_eq!(object.content_type, "image/png");
        assert_eq!(object.content_base64, STANDARD.encode([0x89, b'P', b'N', b'G']));
    }

    #[tokio::test]
    async fn test_missing_patient_is_not_found() {
        let client = ClinicClient::new(MemoryBackend::default());
        let err = client.get_patient(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ClinicError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_status_update_and_stats() {
        let client = ClinicClient::new(MemoryBackend::default());
        let doctor = signed_up(&client).await;
        let patient = client
            .create_patient(doctor.id, &fixtures::demo_patient_form("Ana García"))
            .await
            .unwrap();
        assert_eq!(patient.status, PatientStatus::Neutral);

        let updated = client
            .update_patient_status(patient.id, PatientStatus::Urgent)
            .await
            .unwrap();
        assert_eq!(updated.status, PatientStatus::Urgent);

        let mut form = fixtures::demo_visit_form();
        form.lab_request = "Biometría hemática".to_string();
        client.create_visit(patient.id, doctor.id, &form).await.unwrap();

        let stats = client.practice_stats(doctor.id).await.unwrap();
        assert_eq!(stats.total_patients, 1);
        assert_eq!(stats.total_consults, 1);
        assert_eq!(stats.total_exams, 1);
        assert_eq!(stats.total_prescriptions, 1);
        assert_eq!(stats.recent_documents.len(), 2);
    }
}
