//! Decodificação das linhas do SQLite nos modelos do núcleo
//!
//! Os modelos vivem em `expediente-core`; aqui ficam os envelopes que
//! implementam `FromRow` para cada tabela.

use expediente_core::models::{Doctor, Patient, PatientStatus, Sex, Visit, VitalSigns};
use sqlx::sqlite::SqliteRow;
use sqlx::types::Json;
use sqlx::{FromRow, Row};
use std::str::FromStr;

/// Converte um texto da coluna em enum, reportando erro de decodificação
fn decode_enum<T: FromStr>(row: &SqliteRow, column: &str) -> sqlx::Result<T> {
    let value: String = row.try_get(column)?;
    value.parse().map_err(|_| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Valor inválido para {}: {}", column, value),
        )),
    })
}

/// Linha da tabela `doctors`
pub struct DoctorRow(pub Doctor);

impl FromRow<'_, SqliteRow> for DoctorRow {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self(Doctor {
            id: row.try_get("id")?,
            created_at: row.try_get("created_at")?,
            email: row.try_get("email")?,
            full_name: row.try_get("full_name")?,
            specialty: row.try_get("specialty")?,
            phone: row.try_get("phone")?,
        }))
    }
}

/// Linha da tabela `patients`
pub struct PatientRow(pub Patient);

impl FromRow<'_, SqliteRow> for PatientRow {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let vital_signs: Json<VitalSigns> = row.try_get("vital_signs")?;

        Ok(Self(Patient {
            id: row.try_get("id")?,
            doctor_id: row.try_get("doctor_id")?,
            full_name: row.try_get("full_name")?,
            date_of_birth: row.try_get("date_of_birth")?,
            sex: decode_enum::<Sex>(row, "sex")?,
            phone: row.try_get("phone")?,
            email: row.try_get("email")?,
            address: row.try_get("address")?,
            id_number: row.try_get("id_number")?,
            civil_status: row.try_get("civil_status")?,
            nationality: row.try_get("nationality")?,
            occupation: row.try_get("occupation")?,
            consult_reason: row.try_get("consult_reason")?,
            pathological_history: row.try_get("pathological_history")?,
            family_history: row.try_get("family_history")?,
            habits: row.try_get("habits")?,
            current_medications: row.try_get("current_medications")?,
            allergies: row.try_get("allergies")?,
            vital_signs: vital_signs.0,
            physical_exam: row.try_get("physical_exam")?,
            lab_results: row.try_get("lab_results")?,
            diagnosis: row.try_get("diagnosis")?,
            treatment: row.try_get("treatment")?,
            prognosis: row.try_get("prognosis")?,
            status: decode_enum::<PatientStatus>(row, "status")?,
            created_at: row.try_get("created_at")?,
        }))
    }
}

/// Linha da tabela `visits`
pub struct VisitRow(pub Visit);

impl FromRow<'_, SqliteRow> for VisitRow {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self(Visit {
            id: row.try_get("id")?,
            created_at: row.try_get("created_at")?,
            patient_id: row.try_get("patient_id")?,
            doctor_id: row.try_get("doctor_id")?,
            visit_date: row.try_get("visit_date")?,
            visit_type: row.try_get("visit_type")?,
            symptoms: row.try_get("symptoms")?,
            diagnosis: row.try_get("diagnosis")?,
            treatment_plan: row.try_get("treatment_plan")?,
            notes: row.try_get("notes")?,
            prescription: row.try_get("prescription")?,
            lab_request: row.try_get("lab_request")?,
            status: row.try_get("status")?,
        }))
    }
}
