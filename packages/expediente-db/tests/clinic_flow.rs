//! Fluxo completo da fachada sobre o backend local

use expediente_core::date::MonthLocale;
use expediente_core::fixtures::{demo_patient_form, demo_visit_form};
use expediente_core::forms::{PatientForm, SignUpForm};
use expediente_core::models::{Doctor, PatientStatus, PickedFile, Sex, VISIT_FILES_BUCKET};
use expediente_core::{Backend, ClinicClient, ClinicError, ValidationError};
use expediente_db::{DbConfig, SqliteBackend};
use std::io::Write;
use tempfile::{tempdir, NamedTempFile, TempDir};
use uuid::Uuid;

async fn client() -> (TempDir, ClinicClient<SqliteBackend>) {
    let dir = tempdir().unwrap();
    let config = DbConfig {
        jwt_secret: "segredo-de-teste".to_string(),
        max_connections: 2,
        ..DbConfig::in_dir(dir.path())
    };
    let backend = SqliteBackend::connect(&config).await.unwrap();
    (dir, ClinicClient::with_locale(backend, MonthLocale::Es))
}

async fn sign_up(client: &ClinicClient<SqliteBackend>) -> Doctor {
    let form = SignUpForm {
        email: "dra.lopez@clinica.mx".to_string(),
        password: "secreto123".to_string(),
        full_name: "Dra. Laura López".to_string(),
    };
    client.sign_up(&form).await.unwrap()
}

#[tokio::test]
async fn test_sign_up_sign_in_sign_out() {
    let (_dir, client) = client().await;
    let doctor = sign_up(&client).await;
    assert_eq!(doctor.full_name, "Dra. Laura López");
    assert_eq!(doctor.specialty, "");

    let stored = client
        .find_doctor("dra.lopez@clinica.mx")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.id, doctor.id);

    let err = client
        .sign_in("dra.lopez@clinica.mx", "incorrecta")
        .await
        .unwrap_err();
    assert!(matches!(err, ClinicError::Auth(ref msg) if msg == "Invalid login credentials"));

    let session = client
        .sign_in("  dra.lopez@clinica.mx ", "secreto123")
        .await
        .unwrap();
    assert_eq!(session.user.id, doctor.id);
    assert_eq!(client.current_user().await.unwrap().map(|u| u.id), Some(doctor.id));

    client.sign_out().await.unwrap();
    assert!(client.current_user().await.unwrap().is_none());

    client.reset_password("dra.lopez@clinica.mx").await.unwrap();
    client.reset_password("desconocido@clinica.mx").await.unwrap();
}

#[tokio::test]
async fn test_sign_up_validation_happens_before_backend() {
    let (_dir, client) = client().await;
    let form = SignUpForm {
        email: "no-es-un-correo".to_string(),
        password: "secreto123".to_string(),
        full_name: "Dra. Laura López".to_string(),
    };
    let err = client.sign_up(&form).await.unwrap_err();
    assert!(matches!(err, ClinicError::Validation(ValidationError::InvalidEmail)));

    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM auth_users")
        .fetch_one(client.backend().pool())
        .await
        .unwrap();
    assert_eq!(users, 0);
}

#[tokio::test]
async fn test_patients_newest_first_and_not_found() {
    let (_dir, client) = client().await;
    let doctor = sign_up(&client).await;

    let ana = client
        .create_patient(doctor.id, &demo_patient_form("Ana García"))
        .await
        .unwrap();
    let maria = client
        .create_patient(doctor.id, &demo_patient_form("María López"))
        .await
        .unwrap();

    assert_eq!(ana.sex, Sex::Female);
    assert_eq!(ana.date_of_birth.to_string(), "1990-05-15");
    assert_eq!(ana.vital_signs.blood_pressure, "120/80");
    assert_eq!(ana.status, PatientStatus::Neutral);

    let patients = client.list_patients(doctor.id).await.unwrap();
    let names: Vec<&str> = patients.iter().map(|p| p.full_name.as_str()).collect();
    assert_eq!(names, vec!["María López", "Ana García"]);

    let updated = client
        .update_patient_status(maria.id, PatientStatus::FollowUp)
        .await
        .unwrap();
    assert_eq!(updated.status, PatientStatus::FollowUp);

    assert!(matches!(
        client.get_patient(Uuid::new_v4()).await,
        Err(ClinicError::NotFound(_))
    ));
    assert!(matches!(
        client.get_visit(Uuid::new_v4()).await,
        Err(ClinicError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_invalid_patient_form_never_reaches_database() {
    let (_dir, client) = client().await;
    let doctor = sign_up(&client).await;

    let form = PatientForm {
        birth_date: "31/02/1990".to_string(),
        ..demo_patient_form("Ana García")
    };
    let err = client.create_patient(doctor.id, &form).await.unwrap_err();
    assert!(matches!(err, ClinicError::Validation(ValidationError::InvalidDateFormat)));
    assert!(client.list_patients(doctor.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_visit_with_partial_upload_is_kept() {
    let (_dir, client) = client().await;
    let doctor = sign_up(&client).await;
    let patient = client
        .create_patient(doctor.id, &demo_patient_form("Ana García"))
        .await
        .unwrap();

    let mut receta = NamedTempFile::new().unwrap();
    receta.write_all(b"%PDF-1.4 receta").unwrap();

    let mut form = demo_visit_form();
    form.lab_request = "Biometría hemática".to_string();
    form.add_attachment(PickedFile {
        name: "receta.pdf".to_string(),
        uri: receta.path().to_path_buf(),
        mime_type: "application/pdf".to_string(),
    });
    form.add_attachment(PickedFile {
        name: "radiografia.jpg".to_string(),
        uri: receta.path().with_extension("inexistente"),
        mime_type: "image/jpeg".to_string(),
    });

    let outcome = client.record_visit(patient.id, doctor.id, &form).await.unwrap();
    assert_eq!(outcome.uploaded.len(), 1);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].file_name, "radiografia.jpg");
    assert!(!outcome.is_complete());
    assert!(outcome
        .warning()
        .unwrap()
        .contains("1 archivo(s) no se pudieron subir: radiografia.jpg"));

    let stored_key = &outcome.uploaded[0].stored_name;
    let prefix = format!("{}/{}/", patient.id, outcome.visit.id);
    assert!(stored_key.starts_with(&prefix));
    assert!(stored_key.ends_with(".pdf"));

    // A consulta continua gravada
    let visits = client.list_visits(patient.id).await;
    assert_eq!(visits.len(), 1);
    assert_eq!(visits[0].id, outcome.visit.id);
    assert_eq!(visits[0].status, "completada");

    let files = client
        .list_visit_files(outcome.visit.id, patient.id)
        .await
        .unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].content_type.as_deref(), Some("application/pdf"));

    let content = client
        .backend()
        .store()
        .read(VISIT_FILES_BUCKET, stored_key)
        .await
        .unwrap();
    assert_eq!(content, b"%PDF-1.4 receta");

    let buckets = client.backend().list_buckets().await.unwrap();
    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0].name, VISIT_FILES_BUCKET);
    assert!(!buckets[0].public);
}

#[tokio::test]
async fn test_practice_stats() {
    let (_dir, client) = client().await;
    let doctor = sign_up(&client).await;
    let ana = client
        .create_patient(doctor.id, &demo_patient_form("Ana García"))
        .await
        .unwrap();
    client
        .create_patient(doctor.id, &demo_patient_form("Carlos Rodríguez"))
        .await
        .unwrap();

    let mut form = demo_visit_form();
    client.create_visit(ana.id, doctor.id, &form).await.unwrap();
    form.prescription.clear();
    form.lab_request = "Química sanguínea".to_string();
    client.create_visit(ana.id, doctor.id, &form).await.unwrap();

    let stats = client.practice_stats(doctor.id).await.unwrap();
    assert_eq!(stats.total_patients, 2);
    assert_eq!(stats.total_consults, 2);
    assert_eq!(stats.total_prescriptions, 1);
    assert_eq!(stats.total_exams, 1);
    assert_eq!(stats.recent_documents.len(), 2);
    assert!(stats
        .recent_documents
        .iter()
        .all(|d| d.patient_name == "Ana García"));
}
