//! Estatísticas do consultório

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::date::{format_timestamp, MonthLocale};
use crate::models::{Patient, Visit};

/// Quantidade de documentos recentes exibidos
pub const RECENT_DOCUMENTS: usize = 5;

/// Tipo de documento gerado em uma consulta
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Prescription,
    LabRequest,
}

impl DocumentKind {
    pub fn title(self) -> &'static str {
        match self {
            DocumentKind::Prescription => "Receta Médica",
            DocumentKind::LabRequest => "Solicitud de Estudios",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentDocument {
    pub visit_id: Uuid,
    pub kind: DocumentKind,
    pub title: String,
    pub patient_name: String,
    /// Data da consulta já formatada
    pub date: String,
    #[serde(skip)]
    pub visit_date: DateTime<Utc>,
}

/// Totais exibidos na tela de estatísticas
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PracticeStats {
    pub total_patients: usize,
    pub total_consults: usize,
    /// Consultas com solicitação de exames
    pub total_exams: usize,
    /// Consultas com receita
    pub total_prescriptions: usize,
    pub recent_documents: Vec<RecentDocument>,
}

fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// Calcula os totais a partir das listas já carregadas
pub fn compute_stats(patients: &[Patient], visits: &[Visit], locale: MonthLocale) -> PracticeStats {
    let names: HashMap<Uuid, &str> = patients
        .iter()
        .map(|p| (p.id, p.full_name.as_str()))
        .collect();

    let mut ordered: Vec<&Visit> = visits.iter().collect();
    ordered.sort_by(|a, b| b.visit_date.cmp(&a.visit_date));

    let recent_documents = ordered
        .iter()
        .flat_map(|visit| {
            let kinds = [
                (has_text(&visit.prescription), DocumentKind::Prescription),
                (has_text(&visit.lab_request), DocumentKind::LabRequest),
            ];
            kinds
                .into_iter()
                .filter(|(present, _)| *present)
                .map(move |(_, kind)| (*visit, kind))
        })
        .take(RECENT_DOCUMENTS)
        .map(|(visit, kind)| RecentDocument {
            visit_id: visit.id,
            kind,
            title: kind.title().to_string(),
            patient_name: names.get(&visit.patient_id).copied().unwrap_or_default().to_string(),
            date: format_timestamp(&visit.visit_date, locale),
            visit_date: visit.visit_date,
        })
        .collect();

    PracticeStats {
        total_patients: patients.len(),
        total_consults: visits.len(),
        total_exams: visits.iter().filter(|v| has_text(&v.lab_request)).count(),
        total_prescriptions: visits.iter().filter(|v| has_text(&v.prescription)).count(),
        recent_documents,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_demo_stats() {
        let doctor_id = Uuid::new_v4();
        let patients = fixtures::demo_patients(doctor_id);
        let visits = fixtures::demo_visits(&patients);

        let stats = compute_stats(&patients, &visits, MonthLocale::Es);
        assert_eq!(stats.total_patients, 3);
        assert_eq!(stats.total_consults, visits.len());
        assert_eq!(stats.total_prescriptions, 3);
        assert_eq!(stats.total_exams, 2);

        assert_eq!(stats.recent_documents.len(), RECENT_DOCUMENTS);
        let first = &stats.recent_documents[0];
        assert_eq!(first.kind, DocumentKind::Prescription);
        assert_eq!(first.patient_name, "Ana García");
        assert_eq!(first.date, "15 Mar 2024");
        assert!(stats
            .recent_documents
            .windows(2)
            .all(|w| w[0].visit_date >= w[1].visit_date));
    }

    #[test]
    fn test_empty_practice() {
        let stats = compute_stats(&[], &[], MonthLocale::Es);
        assert_eq!(stats, PracticeStats::default());
    }
}
