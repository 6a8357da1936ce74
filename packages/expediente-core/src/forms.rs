//! Formulários de cadastro
//!
//! Guardam os valores digitados nas telas de cadastro de paciente, nova
//! consulta e registro de médico, e os convertem nos dados de inserção
//! depois de validados.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::date;
use crate::error::ValidationError;
use crate::models::{
    NewPatient, NewVisit, PatientStatus, PickedFile, Sex, VitalSigns, DEFAULT_VISIT_STATUS,
};

/// Tamanho mínimo de senha exigido no cadastro
pub const MIN_PASSWORD_LEN: u64 = 6;

fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("blank"));
    }
    Ok(())
}

fn trimmed_email(value: &str) -> Result<(), validator::ValidationError> {
    if !validator::validate_email(value.trim()) {
        return Err(validator::ValidationError::new("email"));
    }
    Ok(())
}

/// Campos com erro, na ordem em que aparecem no formulário
fn missing_fields(errors: &ValidationErrors, order: &[&str]) -> ValidationError {
    let failed = errors.field_errors();
    let fields = order
        .iter()
        .filter(|name| failed.contains_key(*name))
        .map(|name| name.to_string())
        .collect();
    ValidationError::MissingFields(fields)
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Sinal vital editável no formulário
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VitalField {
    BloodPressure,
    HeartRate,
    Temperature,
    RespiratoryRate,
    Weight,
    Height,
}

/// Ficha de cadastro de paciente
#[derive(Debug, Clone, Default, Validate)]
pub struct PatientForm {
    // Dados de identificação
    #[validate(custom = "not_blank")]
    pub full_name: String,
    /// Data digitada (DD/MM/AAAA)
    #[validate(custom = "not_blank")]
    pub birth_date: String,
    #[validate(custom = "not_blank")]
    pub sex: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub id_number: String,
    pub civil_status: String,
    pub nationality: String,
    pub occupation: String,

    // Histórico médico
    pub consult_reason: String,
    pub pathological_history: String,
    pub family_history: String,
    pub habits: String,
    pub current_medications: String,
    pub allergies: String,

    // Exploração física
    pub vital_signs: VitalSigns,
    pub physical_exam: String,

    // Informação adicional
    pub lab_results: String,
    pub diagnosis: String,
    pub treatment: String,
    pub prognosis: String,

    pub status: PatientStatus,
}

impl PatientForm {
    const REQUIRED: [&'static str; 3] = ["full_name", "birth_date", "sex"];

    /// Atualiza um sinal vital sem tocar nos demais
    pub fn set_vital(&mut self, field: VitalField, value: impl Into<String>) {
        let value = value.into();
        let vitals = &mut self.vital_signs;
        match field {
            VitalField::BloodPressure => vitals.blood_pressure = value,
            VitalField::HeartRate => vitals.heart_rate = value,
            VitalField::Temperature => vitals.temperature = value,
            VitalField::RespiratoryRate => vitals.respiratory_rate = value,
            VitalField::Weight => vitals.weight = value,
            VitalField::Height => vitals.height = value,
        }
    }

    /// Verifica somente os campos obrigatórios
    pub fn check_required(&self) -> Result<(), ValidationError> {
        self.validate()
            .map_err(|errors| missing_fields(&errors, &Self::REQUIRED))
    }

    /// Valida e converte nos dados de inserção
    ///
    /// A data de nascimento precisa existir no calendário e não pode ser
    /// posterior ao ano de `today`.
    pub fn to_new_patient(
        &self,
        doctor_id: Uuid,
        today: NaiveDate,
    ) -> Result<NewPatient, ValidationError> {
        self.check_required()?;
        let date_of_birth = date::parse_calendar_date_on(&self.birth_date, today)?;
        let sex: Sex = self.sex.parse()?;

        let text = |value: &String| value.trim().to_string();
        let vitals = &self.vital_signs;

        Ok(NewPatient {
            doctor_id,
            full_name: text(&self.full_name),
            date_of_birth,
            sex,
            phone: text(&self.phone),
            email: text(&self.email),
            address: text(&self.address),
            id_number: text(&self.id_number),
            civil_status: text(&self.civil_status),
            nationality: text(&self.nationality),
            occupation: text(&self.occupation),
            consult_reason: text(&self.consult_reason),
            pathological_history: text(&self.pathological_history),
            family_history: text(&self.family_history),
            habits: text(&self.habits),
            current_medications: text(&self.current_medications),
            allergies: text(&self.allergies),
            vital_signs: VitalSigns {
                blood_pressure: text(&vitals.blood_pressure),
                heart_rate: text(&vitals.heart_rate),
                temperature: text(&vitals.temperature),
                respiratory_rate: text(&vitals.respiratory_rate),
                weight: text(&vitals.weight),
                height: text(&vitals.height),
            },
            physical_exam: text(&self.physical_exam),
            lab_results: text(&self.lab_results),
            diagnosis: text(&self.diagnosis),
            treatment: text(&self.treatment),
            prognosis: text(&self.prognosis),
            status: self.status,
        })
    }
}

/// Formulário de nova consulta
#[derive(Debug, Clone, Default, Validate)]
pub struct VisitForm {
    #[validate(custom = "not_blank")]
    pub visit_type: String,
    #[validate(custom = "not_blank")]
    pub symptoms: String,
    #[validate(custom = "not_blank")]
    pub diagnosis: String,
    pub treatment: String,
    pub notes: String,
    /// Receita médica
    pub prescription: String,
    /// Solicitação de exames
    pub lab_request: String,
    /// Arquivos a enviar depois de criada a consulta
    pub attachments: Vec<PickedFile>,
}

impl VisitForm {
    const REQUIRED: [&'static str; 3] = ["visit_type", "symptoms", "diagnosis"];

    pub fn add_attachment(&mut self, file: PickedFile) {
        self.attachments.push(file);
    }

    /// Remove o anexo na posição indicada, se existir
    pub fn remove_attachment(&mut self, index: usize) -> Option<PickedFile> {
        (index < self.attachments.len()).then(|| self.attachments.remove(index))
    }

    pub fn check_required(&self) -> Result<(), ValidationError> {
        self.validate()
            .map_err(|errors| missing_fields(&errors, &Self::REQUIRED))
    }

    /// Valida e converte nos dados de inserção
    pub fn to_new_visit(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
        visit_date: DateTime<Utc>,
    ) -> Result<NewVisit, ValidationError> {
        self.check_required()?;

        Ok(NewVisit {
            patient_id,
            doctor_id,
            visit_date,
            visit_type: self.visit_type.trim().to_string(),
            symptoms: self.symptoms.trim().to_string(),
            diagnosis: self.diagnosis.trim().to_string(),
            treatment_plan: optional(&self.treatment),
            notes: optional(&self.notes),
            prescription: optional(&self.prescription),
            lab_request: optional(&self.lab_request),
            status: DEFAULT_VISIT_STATUS.to_string(),
        })
    }
}

/// Cadastro de médico
#[derive(Debug, Clone, Default, Validate)]
pub struct SignUpForm {
    #[validate(custom = "trimmed_email")]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
    #[validate(custom = "not_blank")]
    pub full_name: String,
}

impl SignUpForm {
    pub fn check(&self) -> Result<(), ValidationError> {
        let Err(errors) = self.validate() else {
            return Ok(());
        };
        let failed = errors.field_errors();

        if failed.contains_key("full_name") {
            return Err(ValidationError::MissingFields(vec!["full_name".to_string()]));
        }
        if failed.contains_key("email") {
            return Err(ValidationError::InvalidEmail);
        }
        Err(ValidationError::WeakPassword {
            min: MIN_PASSWORD_LEN,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    fn filled_patient() -> PatientForm {
        PatientForm {
            full_name: "  Ana María García López ".to_string(),
            birth_date: "15/05/1990".to_string(),
            sex: "Femenino".to_string(),
            allergies: "Penicilina".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_patient_form_conversion() {
        let doctor_id = Uuid::new_v4();
        let mut form = filled_patient();
        form.set_vital(VitalField::BloodPressure, "120/80");
        form.set_vital(VitalField::Weight, "62 kg");

        let new = form.to_new_patient(doctor_id, today()).unwrap();
        assert_eq!(new.doctor_id, doctor_id);
        assert_eq!(new.full_name, "Ana María García López");
        assert_eq!(new.date_of_birth, NaiveDate::from_ymd_opt(1990, 5, 15).unwrap());
        assert_eq!(new.sex, Sex::Female);
        assert_eq!(new.vital_signs.blood_pressure, "120/80");
        assert_eq!(new.vital_signs.weight, "62 kg");
        assert_eq!(new.vital_signs.height, "");
        assert_eq!(new.phone, "");
        assert_eq!(new.status, PatientStatus::Neutral);
    }

    #[test]
    fn test_patient_form_required_fields() {
        let form = PatientForm {
            full_name: "   ".to_string(),
            sex: "M".to_string(),
            ..Default::default()
        };
        assert_eq!(
            form.to_new_patient(Uuid::new_v4(), today()),
            Err(ValidationError::MissingFields(vec![
                "full_name".to_string(),
                "birth_date".to_string()
            ]))
        );
    }

    #[test]
    fn test_patient_form_rejects_impossible_date() {
        let mut form = filled_patient();
        form.birth_date = "31/02/1990".to_string();
        assert_eq!(
            form.to_new_patient(Uuid::new_v4(), today()),
            Err(ValidationError::InvalidDateFormat)
        );
    }

    #[test]
    fn test_patient_form_rejects_unknown_sex() {
        let mut form = filled_patient();
        form.sex = "X".to_string();
        assert!(matches!(
            form.to_new_patient(Uuid::new_v4(), today()),
            Err(ValidationError::InvalidSex(_))
        ));
    }

    #[test]
    fn test_visit_form_conversion() {
        let mut form = VisitForm {
            visit_type: "Consulta General".to_string(),
            symptoms: "Fiebre".to_string(),
            diagnosis: "Gripe estacional".to_string(),
            prescription: "Paracetamol 500mg".to_string(),
            notes: "   ".to_string(),
            ..Default::default()
        };
        form.add_attachment(PickedFile {
            name: "receta.pdf".to_string(),
            uri: "/tmp/receta.pdf".into(),
            mime_type: "application/pdf".to_string(),
        });
        assert!(form.remove_attachment(3).is_none());
        assert_eq!(form.attachments.len(), 1);

        let when = Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 0).unwrap();
        let new = form
            .to_new_visit(Uuid::new_v4(), Uuid::new_v4(), when)
            .unwrap();
        assert_eq!(new.visit_date, when);
        assert_eq!(new.prescription.as_deref(), Some("Paracetamol 500mg"));
        assert_eq!(new.notes, None);
        assert_eq!(new.treatment_plan, None);
        assert_eq!(new.status, DEFAULT_VISIT_STATUS);
    }

    #[test]
    fn test_visit_form_required_fields() {
        let form = VisitForm {
            visit_type: "Control".to_string(),
            ..Default::default()
        };
        assert_eq!(
            form.check_required(),
            Err(ValidationError::MissingFields(vec![
                "symptoms".to_string(),
                "diagnosis".to_string()
            ]))
        );
    }

    #[test]
    fn test_sign_up_form() {
        let mut form = SignUpForm {
            email: "dra.lopez@clinica.mx".to_string(),
            password: "secreto123".to_string(),
            full_name: "Dra. López".to_string(),
        };
        assert!(form.check().is_ok());

        form.password = "123".to_string();
        assert_eq!(form.check(), Err(ValidationError::WeakPassword { min: 6 }));

        form.password = "secreto123".to_string();
        form.email = " dra.lopez@clinica.mx ".to_string();
        assert!(form.check().is_ok());

        form.password = "123".to_string();
        form.email = "no-es-correo".to_string();
        assert_eq!(form.check(), Err(ValidationError::InvalidEmail));

        form.full_name = String::new();
        assert_eq!(
            form.check(),
            Err(ValidationError::MissingFields(vec!["full_name".to_string()]))
        );
    }
}
