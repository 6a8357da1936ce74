//! Dados de demonstração para testes
//!
//! As mesmas fichas de exemplo usadas nas telas estáticas do aplicativo, e
//! um backend em memória que serve de dublê da fachada.

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::backend::{Backend, BackendResult};
use crate::error::BackendError;
use crate::forms::{PatientForm, VisitForm, VitalField};
use crate::models::{
    AuthUser, Bucket, BucketOptions, Doctor, FileDescriptor, NewDoctor, NewPatient, NewVisit,
    Patient, PatientStatus, Session, Sex, Visit, VitalSigns, DEFAULT_VISIT_STATUS,
};

fn patient(
    doctor_id: Uuid,
    full_name: &str,
    birth: (i32, u32, u32),
    sex: Sex,
    status: PatientStatus,
    created_day: u32,
) -> Patient {
    Patient {
        id: Uuid::new_v4(),
        doctor_id,
        full_name: full_name.to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(birth.0, birth.1, birth.2)
            .expect("data de demonstração válida"),
        sex,
        phone: String::new(),
        email: String::new(),
        address: String::new(),
        id_number: String::new(),
        civil_status: String::new(),
        nationality: String::new(),
        occupation: String::new(),
        consult_reason: String::new(),
        pathological_history: String::new(),
        family_history: String::new(),
        habits: String::new(),
        current_medications: String::new(),
        allergies: String::new(),
        vital_signs: VitalSigns::default(),
        physical_exam: String::new(),
        lab_results: String::new(),
        diagnosis: String::new(),
        treatment: String::new(),
        prognosis: String::new(),
        status,
        created_at: Utc
            .with_ymd_and_hms(2024, 1, created_day, 12, 0, 0)
            .unwrap(),
    }
}

/// Ana García, Carlos Rodríguez e María López, nesta ordem
pub fn demo_patients(doctor_id: Uuid) -> Vec<Patient> {
    let mut ana = patient(
        doctor_id,
        "Ana García",
        (1990, 5, 15),
        Sex::Female,
        PatientStatus::Stable,
        10,
    );
    ana.phone = "+52 555 123 4567".to_string();
    ana.email = "ana.garcia@email.com".to_string();
    ana.address = "Av. Insurgentes Sur 1234, CDMX".to_string();
    ana.pathological_history = "Hipertensión arterial controlada".to_string();
    ana.allergies = "Penicilina".to_string();

    vec![
        ana,
        patient(
            doctor_id,
            "Carlos Rodríguez",
            (1978, 11, 2),
            Sex::Male,
            PatientStatus::FollowUp,
            12,
        ),
        patient(
            doctor_id,
            "María López",
            (1985, 7, 23),
            Sex::Female,
            PatientStatus::Neutral,
            14,
        ),
    ]
}

fn visit(patient: &Patient, date: (u32, u32), visit_type: &str) -> Visit {
    // Meio-dia no relógio local, para que a data exibida não dependa do fuso
    let when = Local
        .with_ymd_and_hms(2024, date.0, date.1, 12, 0, 0)
        .unwrap()
        .with_timezone(&Utc);
    Visit {
        id: Uuid::new_v4(),
        created_at: when,
        patient_id: patient.id,
        doctor_id: patient.doctor_id,
        visit_date: when,
        visit_type: visit_type.to_string(),
        symptoms: String::new(),
        diagnosis: String::new(),
        treatment_plan: None,
        notes: None,
        prescription: None,
        lab_request: None,
        status: DEFAULT_VISIT_STATUS.to_string(),
    }
}

/// Histórico de consultas dos pacientes de [`demo_patients`]
pub fn demo_visits(patients: &[Patient]) -> Vec<Visit> {
    let (ana, carlos, maria) = (&patients[0], &patients[1], &patients[2]);

    let mut flu = visit(ana, (3, 15), "Consulta General");
    flu.symptoms = "Fiebre alta (39°C), dolor de garganta y congestión nasal".to_string();
    flu.diagnosis = "Gripe estacional".to_string();
    flu.prescription = Some("Antigripal".to_string());
    flu.lab_request = Some("Análisis de Sangre".to_string());

    let mut labs = visit(carlos, (3, 14), "Control");
    labs.symptoms = "Fatiga".to_string();
    labs.diagnosis = "En estudio".to_string();
    labs.lab_request = Some("Análisis de Sangre".to_string());

    let mut antibiotic = visit(maria, (3, 13), "Consulta General");
    antibiotic.symptoms = "Dolor de oído".to_string();
    antibiotic.diagnosis = "Otitis media".to_string();
    antibiotic.prescription = Some("Antibiótico".to_string());

    let mut routine = visit(ana, (2, 1), "Control Rutinario");
    routine.symptoms = "Sin síntomas".to_string();
    routine.diagnosis = "Valores normales".to_string();
    routine.prescription = Some("Vitaminas".to_string());
    routine.notes = Some("Continuar con dieta actual".to_string());

    vec![flu, labs, antibiotic, routine]
}

/// Ficha de cadastro preenchida como na tela de exemplo
pub fn demo_patient_form(full_name: &str) -> PatientForm {
    let mut form = PatientForm {
        full_name: full_name.to_string(),
        birth_date: "15/05/1990".to_string(),
        sex: "Femenino".to_string(),
        id_number: "GALA900515".to_string(),
        civil_status: "Casada".to_string(),
        nationality: "Mexicana".to_string(),
        occupation: "Diseñadora Gráfica".to_string(),
        family_history: "Madre con diabetes tipo 2".to_string(),
        habits: "No fuma, ejercicio 3 veces por semana".to_string(),
        allergies: "Penicilina".to_string(),
        ..Default::default()
    };
    form.set_vital(VitalField::BloodPressure, "120/80");
    form.set_vital(VitalField::HeartRate, "72");
    form
}

/// Consulta preenchida como na tela de exemplo
pub fn demo_visit_form() -> VisitForm {
    VisitForm {
        visit_type: "Consulta General".to_string(),
        symptoms: "Fiebre alta (39°C), dolor de garganta".to_string(),
        diagnosis: "Gripe estacional".to_string(),
        treatment: "Paracetamol 500mg cada 8 horas".to_string(),
        prescription: "Paracetamol 500mg".to_string(),
        ..Default::default()
    }
}

/// Objeto gravado no [`MemoryBackend`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub content_base64: String,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
struct MemoryState {
    users: Vec<(AuthUser, String)>,
    session: Option<Session>,
    doctors: Vec<Doctor>,
    patients: Vec<Patient>,
    visits: Vec<Visit>,
    buckets: Vec<(Bucket, BucketOptions)>,
    objects: BTreeMap<(String, String), StoredObject>,
}

/// Backend em memória para testes da fachada
///
/// Conta as escritas e pode simular a perda de conexão.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    writes: AtomicUsize,
    offline: AtomicBool,
}

impl MemoryBackend {
    /// Faz todas as chamadas seguintes falharem com erro de rede
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Número de escritas aceitas (inserções, atualizações e envios)
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.lock()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn online(&self) -> BackendResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BackendError::Network("Network request failed".to_string()));
        }
        Ok(())
    }

    fn wrote(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

fn newest_first<T, F>(mut items: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> DateTime<Utc>,
{
    items.reverse();
    items.sort_by_key(|item| std::cmp::Reverse(key(item)));
    items
}

impl Backend for MemoryBackend {
    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<AuthUser> {
        self.online()?;
        let mut state = self.lock();
        if state.users.iter().any(|(u, _)| u.email == email) {
            return Err(BackendError::Auth("User already registered".to_string()));
        }
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: email.to_string(),
        };
        state.users.push((user.clone(), password.to_string()));
        self.wrote();
        Ok(user)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> BackendResult<Session> {
        self.online()?;
        let mut state = self.lock();
        let user = state
            .users
            .iter()
            .find(|(u, p)| u.email == email && p == password)
            .map(|(u, _)| u.clone())
            .ok_or_else(|| BackendError::Auth("Invalid login credentials".to_string()))?;
        let session = Session {
            access_token: Uuid::new_v4().to_string(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
            user,
        };
        state.session = Some(session.clone());
        Ok(session)
    }

    async fn sign_out(&self) -> BackendResult<()> {
        self.online()?;
        self.lock().session = None;
        Ok(())
    }

    async fn reset_password_for_email(&self, _email: &str) -> BackendResult<()> {
        self.online()
    }

    async fn current_user(&self) -> BackendResult<Option<AuthUser>> {
        self.online()?;
        Ok(self.lock().session.as_ref().map(|s| s.user.clone()))
    }

    async fn insert_doctor(&self, doctor: &NewDoctor) -> BackendResult<Doctor> {
        self.online()?;
        let row = Doctor {
            id: doctor.id,
            created_at: Utc::now(),
            email: doctor.email.clone(),
            full_name: doctor.full_name.clone(),
            specialty: doctor.specialty.clone(),
            phone: doctor.phone.clone(),
        };
        self.lock().doctors.push(row.clone());
        self.wrote();
        Ok(row)
    }

    async fn select_doctor_by_email(&self, email: &str) -> BackendResult<Option<Doctor>> {
        self.online()?;
        Ok(self.lock().doctors.iter().find(|d| d.email == email).cloned())
    }

    async fn insert_patient(&self, patient: &NewPatient) -> BackendResult<Patient> {
        self.online()?;
        let p = patient.clone();
        let row = Patient {
            id: Uuid::new_v4(),
            doctor_id: p.doctor_id,
            full_name: p.full_name,
            date_of_birth: p.date_of_birth,
            sex: p.sex,
            phone: p.phone,
            email: p.email,
            address: p.address,
            id_number: p.id_number,
            civil_status: p.civil_status,
            nationality: p.nationality,
            occupation: p.occupation,
            consult_reason: p.consult_reason,
            pathological_history: p.pathological_history,
            family_history: p.family_history,
            habits: p.habits,
            current_medications: p.current_medications,
            allergies: p.allergies,
            vital_signs: p.vital_signs,
            physical_exam: p.physical_exam,
            lab_results: p.lab_results,
            diagnosis: p.diagnosis,
            treatment: p.treatment,
            prognosis: p.prognosis,
            status: p.status,
            created_at: Utc::now(),
        };
        self.lock().patients.push(row.clone());
        self.wrote();
        Ok(row)
    }

    async fn select_patients(&self, doctor_id: Uuid) -> BackendResult<Vec<Patient>> {
        self.online()?;
        let rows: Vec<Patient> = self
            .lock()
            .patients
            .iter()
            .filter(|p| p.doctor_id == doctor_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |p| p.created_at))
    }

    async fn select_patient(&self, id: Uuid) -> BackendResult<Option<Patient>> {
        self.online()?;
        Ok(self.lock().patients.iter().find(|p| p.id == id).cloned())
    }

    async fn update_patient_status(
        &self,
        id: Uuid,
        status: PatientStatus,
    ) -> BackendResult<Patient> {
        self.online()?;
        let mut state = self.lock();
        let patient = state
            .patients
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| BackendError::NotFound(format!("paciente {}", id)))?;
        patient.status = status;
        let updated = patient.clone();
        self.wrote();
        Ok(updated)
    }

    async fn insert_visit(&self, visit: &NewVisit) -> BackendResult<Visit> {
        self.online()?;
        let v = visit.clone();
        let row = Visit {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            patient_id: v.patient_id,
            doctor_id: v.doctor_id,
            visit_date: v.visit_date,
            visit_type: v.visit_type,
            symptoms: v.symptoms,
            diagnosis: v.diagnosis,
            treatment_plan: v.treatment_plan,
            notes: v.notes,
            prescription: v.prescription,
            lab_request: v.lab_request,
            status: v.status,
        };
        self.lock().visits.push(row.clone());
        self.wrote();
        Ok(row)
    }

    async fn select_visits(&self, patient_id: Uuid) -> BackendResult<Vec<Visit>> {
        self.online()?;
        let rows: Vec<Visit> = self
            .lock()
            .visits
            .iter()
            .filter(|v| v.patient_id == patient_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |v| v.visit_date))
    }

    async fn select_visits_by_doctor(&self, doctor_id: Uuid) -> BackendResult<Vec<Visit>> {
        self.online()?;
        let rows: Vec<Visit> = self
            .lock()
            .visits
            .iter()
            .filter(|v| v.doctor_id == doctor_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |v| v.visit_date))
    }

    async fn select_visit(&self, id: Uuid) -> BackendResult<Option<Visit>> {
        self.online()?;
        Ok(self.lock().visits.iter().find(|v| v.id == id).cloned())
    }

    async fn list_buckets(&self) -> BackendResult<Vec<Bucket>> {
        self.online()?;
        Ok(self.lock().buckets.iter().map(|(b, _)| b.clone()).collect())
    }

    async fn create_bucket(&self, name: &str, options: BucketOptions) -> BackendResult<()> {
        self.online()?;
        let mut state = self.lock();
        if state.buckets.iter().any(|(b, _)| b.name == name) {
            return Err(BackendError::Constraint(format!("bucket {} já existe", name)));
        }
        let bucket = Bucket {
            name: name.to_string(),
            public: options.public,
        };
        state.buckets.push((bucket, options));
        self.wrote();
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
        self.online()?;
        let mut state = self.lock();
        if !state.buckets.iter().any(|(b, _)| b.name == bucket) {
            return Err(BackendError::NotFound(format!("bucket {}", bucket)));
        }
        let id = (bucket.to_string(), key.to_string());
        if !upsert && state.objects.contains_key(&id) {
            return Err(BackendError::Constraint(format!("objeto {} já existe", key)));
        }
        state.objects.insert(
            id,
            StoredObject {
                content_base64: content_base64.to_string(),
                content_type: content_type.to_string(),
                created_at: Utc::now(),
            },
        );
        self.wrote();
        Ok(())
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> BackendResult<Vec<FileDescriptor>> {
        self.online()?;
        let folder = format!("{}/", prefix.trim_end_matches('/'));
        Ok(self
            .lock()
            .objects
            .iter()
            .filter(|((b, _), _)| b == bucket)
            .filter_map(|((_, key), object)| {
                let name = key.strip_prefix(&folder)?;
                (!name.contains('/')).then(|| FileDescriptor {
                    name: name.to_string(),
                    size: None,
                    content_type: Some(object.content_type.clone()),
                    created_at: Some(object.created_at),
                })
            })
            .collect())
    }
}
