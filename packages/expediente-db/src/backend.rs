//! Backend local do expediente
//!
//! Implementa o trait `Backend` do núcleo sobre SQLite (tabelas e
//! autenticação) e um diretório em disco (anexos).

use chrono::{Duration, Utc};
use expediente_core::models::{
    AuthUser, Bucket, BucketOptions, Doctor, FileDescriptor, NewDoctor, NewPatient, NewVisit,
    Patient, PatientStatus, Session, Visit,
};
use expediente_core::{Backend, BackendResult};
use sqlx::types::Json;
use sqlx::{Row, SqlitePool};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::crypto::{hash_password, random_token, verify_password, SessionSigner};
use crate::error::DbError;
use crate::models::{DoctorRow, PatientRow, VisitRow};
use crate::storage::ObjectStore;
use crate::{init_db_pool, DbConfig};

const INVALID_CREDENTIALS: &str = "Invalid login credentials";
const USER_ALREADY_REGISTERED: &str = "User already registered";

/// Backend local: SQLite + anexos em disco + sessões JWT
pub struct SqliteBackend {
    pool: SqlitePool,
    store: ObjectStore,
    signer: SessionSigner,
    session: Mutex<Option<Session>>,
}

impl SqliteBackend {
    /// Abre o banco, aplica as migrações e prepara o armazenamento
    pub async fn connect(config: &DbConfig) -> anyhow::Result<Self> {
        let pool = init_db_pool(config).await?;
        tokio::fs::create_dir_all(&config.storage_dir).await?;
        Ok(Self::with_pool(pool, config))
    }

    /// Usa um pool já inicializado
    pub fn with_pool(pool: SqlitePool, config: &DbConfig) -> Self {
        let secret = if config.jwt_secret.is_empty() {
            warn!("Segredo de sessão não configurado; usando segredo aleatório");
            random_token()
        } else {
            config.jwt_secret.clone()
        };

        Self {
            pool,
            store: ObjectStore::new(&config.storage_dir),
            signer: SessionSigner::new(secret.as_bytes(), Duration::seconds(config.session_ttl_secs)),
            session: Mutex::new(None),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    fn session_slot(&self) -> Result<MutexGuard<'_, Option<Session>>, DbError> {
        self.session
            .lock()
            .map_err(|_| DbError::InternalError("Estado da sessão corrompido".to_string()))
    }

    /// Número de solicitações de recuperação registradas para o e-mail
    pub async fn recovery_requests(&self, email: &str) -> Result<i64, DbError> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM password_recoveries r \
             JOIN auth_users u ON u.id = r.user_id WHERE u.email = ?",
        )
        .bind(email.trim())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

impl Backend for SqliteBackend {
    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<AuthUser> {
        let email = email.trim();
        let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM auth_users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?;
        if existing.is_some() {
            return Err(DbError::AuthError(USER_ALREADY_REGISTERED.to_string()).into());
        }

        let user = AuthUser {
            id: Uuid::new_v4(),
            email: email.to_string(),
        };
        let password_hash = hash_password(password)?;

        sqlx::query("INSERT INTO auth_users (id, email, password_hash, created_at) VALUES (?, ?, ?, ?)")
            .bind(user.id)
            .bind(&user.email)
            .bind(password_hash)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::ConstraintViolation(_) => {
                    DbError::AuthError(USER_ALREADY_REGISTERED.to_string())
                }
                other => other,
            })?;

        info!("Usuário registrado: {}", user.id);
        Ok(user)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> BackendResult<Session> {
        let row = sqlx::query("SELECT id, email, password_hash FROM auth_users WHERE email = ?")
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?;

        let Some(row) = row else {
            return Err(DbError::AuthError(INVALID_CREDENTIALS.to_string()).into());
        };
        let stored_hash: String = row.try_get("password_hash").map_err(DbError::from)?;
        if !verify_password(password, &stored_hash) {
            return Err(DbError::AuthError(INVALID_CREDENTIALS.to_string()).into());
        }

        let user = AuthUser {
            id: row.try_get("id").map_err(DbError::from)?,
            email: row.try_get("email").map_err(DbError::from)?,
        };
        let (access_token, expires_at) = self.signer.issue(user.id, &user.email)?;
        let session = Session {
            access_token,
            expires_at,
            user,
        };

        *self.session_slot()? = Some(session.clone());
        debug!("Sessão aberta para {}", session.user.id);
        Ok(session)
    }

    async fn sign_out(&self) -> BackendResult<()> {
        self.session_slot()?.take();
        Ok(())
    }

    async fn reset_password_for_email(&self, email: &str) -> BackendResult<()> {
        let user_id: Option<Uuid> = sqlx::query_scalar("SELECT id FROM auth_users WHERE email = ?")
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?;

        // E-mail desconhecido não é revelado ao chamador
        let Some(user_id) = user_id else {
            debug!("Recuperação solicitada para e-mail não cadastrado");
            return Ok(());
        };

        sqlx::query("INSERT INTO password_recoveries (id, user_id, requested_at) VALUES (?, ?, ?)")
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;

        info!("Recuperação de senha registrada para o usuário {}", user_id);
        Ok(())
    }

    async fn current_user(&self) -> BackendResult<Option<AuthUser>> {
        let mut slot = self.session_slot()?;
        let Some(session) = slot.as_ref() else {
            return Ok(None);
        };

        match self.signer.verify(&session.access_token) {
            Ok(claims) => Ok(Some(AuthUser {
                id: claims.sub,
                email: claims.email,
            })),
            Err(e) => {
                debug!("Sessão descartada: {}", e);
                *slot = None;
                Ok(None)
            }
        }
    }

    async fn insert_doctor(&self, doctor: &NewDoctor) -> BackendResult<Doctor> {
        let row: DoctorRow = sqlx::query_as(
            "INSERT INTO doctors (id, created_at, email, full_name, specialty, phone) \
             VALUES (?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(doctor.id)
        .bind(Utc::now())
        .bind(&doctor.email)
        .bind(&doctor.full_name)
        .bind(&doctor.specialty)
        .bind(&doctor.phone)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(row.0)
    }

    async fn select_doctor_by_email(&self, email: &str) -> BackendResult<Option<Doctor>> {
        let row: Option<DoctorRow> =
            sqlx::query_as("SELECT * FROM doctors WHERE email = ? COLLATE NOCASE")
                .bind(email.trim())
                .fetch_optional(&self.pool)
                .await
                .map_err(DbError::from)?;
        Ok(row.map(|r| r.0))
    }

    async fn insert_patient(&self, patient: &NewPatient) -> BackendResult<Patient> {
        let row: PatientRow = sqlx::query_as(
            r#"
            INSERT INTO patients (
                id, doctor_id, full_name, date_of_birth, sex, phone, email, address,
                id_number, civil_status, nationality, occupation, consult_reason,
                pathological_history, family_history, habits, current_medications,
                allergies, vital_signs, physical_exam, lab_results, diagnosis,
                treatment, prognosis, status, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(patient.doctor_id)
        .bind(&patient.full_name)
        .bind(patient.date_of_birth)
        .bind(patient.sex.as_str())
        .bind(&patient.phone)
        .bind(&patient.email)
        .bind(&patient.address)
        .bind(&patient.id_number)
        .bind(&patient.civil_status)
        .bind(&patient.nationality)
        .bind(&patient.occupation)
        .bind(&patient.consult_reason)
        .bind(&patient.pathological_history)
        .bind(&patient.family_history)
        .bind(&patient.habits)
        .bind(&patient.current_medications)
        .bind(&patient.allergies)
        .bind(Json(&patient.vital_signs))
        .bind(&patient.physical_exam)
        .bind(&patient.lab_results)
        .bind(&patient.diagnosis)
        .bind(&patient.treatment)
        .bind(&patient.prognosis)
        .bind(patient.status.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)?;

        debug!("Paciente criado: {}", row.0.id);
        Ok(row.0)
    }

    async fn select_patients(&self, doctor_id: Uuid) -> BackendResult<Vec<Patient>> {
        let rows: Vec<PatientRow> = sqlx::query_as(
            "SELECT * FROM patients WHERE doctor_id = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(doctor_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    async fn select_patient(&self, id: Uuid) -> BackendResult<Option<Patient>> {
        let row: Option<PatientRow> = sqlx::query_as("SELECT * FROM patients WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?;
        Ok(row.map(|r| r.0))
    }

    async fn update_patient_status(
        &self,
        id: Uuid,
        status: PatientStatus,
    ) -> BackendResult<Patient> {
        let row: Option<PatientRow> =
            sqlx::query_as("UPDATE patients SET status = ? WHERE id = ? RETURNING *")
                .bind(status.as_str())
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(DbError::from)?;

        row.map(|r| r.0)
            .ok_or_else(|| DbError::NotFound(format!("Paciente não encontrado: {}", id)).into())
    }

    async fn insert_visit(&self, visit: &NewVisit) -> BackendResult<Visit> {
        let row: VisitRow = sqlx::query_as(
            r#"
            INSERT INTO visits (
                id, created_at, patient_id, doctor_id, visit_date, visit_type, symptoms,
                diagnosis, treatment_plan, notes, prescription, lab_request, status
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(Utc::now())
        .bind(visit.patient_id)
        .bind(visit.doctor_id)
        .bind(visit.visit_date)
        .bind(&visit.visit_type)
        .bind(&visit.symptoms)
        .bind(&visit.diagnosis)
        .bind(&visit.treatment_plan)
        .bind(&visit.notes)
        .bind(&visit.prescription)
        .bind(&visit.lab_request)
        .bind(&visit.status)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)?;

        debug!("Consulta criada: {}", row.0.id);
        Ok(row.0)
    }

    async fn select_visits(&self, patient_id: Uuid) -> BackendResult<Vec<Visit>> {
        let rows: Vec<VisitRow> = sqlx::query_as(
            "SELECT * FROM visits WHERE patient_id = ? ORDER BY visit_date DESC, rowid DESC",
        )
        .bind(patient_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    async fn select_visits_by_doctor(&self, doctor_id: Uuid) -> BackendResult<Vec<Visit>> {
        let rows: Vec<VisitRow> = sqlx::query_as(
            "SELECT * FROM visits WHERE doctor_id = ? ORDER BY visit_date DESC, rowid DESC",
        )
        .bind(doctor_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    async fn select_visit(&self, id: Uuid) -> BackendResult<Option<Visit>> {
        let row: Option<VisitRow> = sqlx::query_as("SELECT * FROM visits WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?;
        Ok(row.map(|r| r.0))
    }

    async fn list_buckets(&self) -> BackendResult<Vec<Bucket>> {
        Ok(self.store.list_buckets(&self.pool).await?)
    }

    async fn create_bucket(&self, name: &str, options: BucketOptions) -> BackendResult<()> {
        Ok(self.store.create_bucket(&self.pool, name, options).await?)
    }

    async fn upload_object(
        &self,
        bucket: &str,
        key: &str,
        content_base64: &str,
        content_type: &str,
        upsert: bool,
    ) -> BackendResult<()> {
        Ok(self
            .store
            .upload(&self.pool, bucket, key, content_base64, content_type, upsert)
            .await?)
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> BackendResult<Vec<FileDescriptor>> {
        Ok(self.store.list(&self.pool, bucket, prefix).await?)
    }
}
