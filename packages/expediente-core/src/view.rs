//! Derivações de exibição consumidas pelas telas

use chrono::NaiveDate;
use uuid::Uuid;

use crate::date::{compute_age, format_timestamp, MonthLocale};
use crate::filter::HasFullName;
use crate::models::{Patient, PatientStatus, Visit};

/// Texto exibido quando o paciente ainda não tem consultas
pub const NO_VISITS_LABEL: &str = "Sin consultas";

/// Resumo de um paciente na lista
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientCard {
    pub id: Uuid,
    pub name: String,
    pub age: u32,
    pub last_visit: String,
    pub status: PatientStatus,
    pub status_label: &'static str,
    pub status_color: &'static str,
}

impl PatientCard {
    pub fn build(
        patient: &Patient,
        last_visit: Option<&Visit>,
        today: NaiveDate,
        locale: MonthLocale,
    ) -> Self {
        Self {
            id: patient.id,
            name: patient.full_name.clone(),
            age: compute_age(patient.date_of_birth, today),
            last_visit: last_visit
                .map(|v| format_timestamp(&v.visit_date, locale))
                .unwrap_or_else(|| NO_VISITS_LABEL.to_string()),
            status: patient.status,
            status_label: patient.status.label(),
            status_color: patient.status.color(),
        }
    }
}

impl HasFullName for PatientCard {
    fn full_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::filter_by_name;
    use crate::fixtures;

    #[test]
    fn test_card_from_demo_patient() {
        let patients = fixtures::demo_patients(Uuid::new_v4());
        let visits = fixtures::demo_visits(&patients);
        let today = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();

        let card = PatientCard::build(&patients[0], visits.first(), today, MonthLocale::Es);
        assert_eq!(card.name, "Ana García");
        assert_eq!(card.age, 33);
        assert_eq!(card.last_visit, "15 Mar 2024");
        assert_eq!(card.status_label, "Estable");
        assert_eq!(card.status_color, "#27AE60");

        let empty = PatientCard::build(&patients[2], None, today, MonthLocale::Es);
        assert_eq!(empty.last_visit, NO_VISITS_LABEL);
    }

    #[test]
    fn test_cards_are_filterable() {
        let patients = fixtures::demo_patients(Uuid::new_v4());
        let today = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        let cards: Vec<PatientCard> = patients
            .iter()
            .map(|p| PatientCard::build(p, None, today, MonthLocale::Es))
            .collect();

        let found = filter_by_name(&cards, "lópez");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "María López");
    }
}
