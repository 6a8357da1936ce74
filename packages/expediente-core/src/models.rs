//! Modelos de dados do expediente
//!
//! Estruturas persistidas pelo backend (médicos, pacientes, consultas e
//! arquivos anexos) e os valores de sessão devolvidos pela autenticação.
//! Os nomes dos campos seguem as colunas das tabelas remotas.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ValidationError;

/// Nome do bucket onde ficam os anexos das consultas
pub const VISIT_FILES_BUCKET: &str = "visit_files";

/// Tamanho máximo de arquivo aceito pelo bucket de anexos (50 MiB)
pub const VISIT_FILES_SIZE_LIMIT: u64 = 52_428_800;

/// Status padrão gravado em novas consultas
pub const DEFAULT_VISIT_STATUS: &str = "completada";

/// Converte `null` em valor padrão ao decodificar linhas do backend
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Paleta usada para colorir o status
///
/// A tela de detalhe e o cartão da lista usam tons diferentes para
/// "seguimiento"; as duas variantes são mantidas até a paleta ser definida.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusPalette {
    /// Cartão da lista de pacientes
    #[default]
    Card,
    /// Cabeçalho da tela de detalhe
    Detail,
}

/// Status de triagem de um paciente
///
/// Persistido com os tokens em espanhol; os tokens em inglês são aceitos
/// na entrada e convertidos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PatientStatus {
    #[default]
    #[serde(rename = "neutro", alias = "neutral")]
    Neutral,
    #[serde(rename = "estable", alias = "stable")]
    Stable,
    #[serde(rename = "seguimiento", alias = "follow-up")]
    FollowUp,
    #[serde(rename = "urgente", alias = "urgent")]
    Urgent,
}

impl PatientStatus {
    /// Todos os status, na ordem do seletor
    pub const ALL: [PatientStatus; 4] = [
        PatientStatus::Neutral,
        PatientStatus::Stable,
        PatientStatus::FollowUp,
        PatientStatus::Urgent,
    ];

    /// Token persistido no backend
    pub fn as_str(self) -> &'static str {
        match self {
            PatientStatus::Neutral => "neutro",
            PatientStatus::Stable => "estable",
            PatientStatus::FollowUp => "seguimiento",
            PatientStatus::Urgent => "urgente",
        }
    }

    /// Rótulo exibido
    pub fn label(self) -> &'static str {
        match self {
            PatientStatus::Neutral => "Neutro",
            PatientStatus::Stable => "Estable",
            PatientStatus::FollowUp => "Seguimiento",
            PatientStatus::Urgent => "Urgente",
        }
    }

    /// Cor do status na paleta do cartão
    pub fn color(self) -> &'static str {
        self.color_in(StatusPalette::Card)
    }

    pub fn color_in(self, palette: StatusPalette) -> &'static str {
        match (self, palette) {
            (PatientStatus::Neutral, _) => "#666666",
            (PatientStatus::Stable, _) => "#27AE60",
            (PatientStatus::FollowUp, StatusPalette::Card) => "#F2994A",
            (PatientStatus::FollowUp, StatusPalette::Detail) => "#F2C94C",
            (PatientStatus::Urgent, _) => "#EB5757",
        }
    }
}

impl std::fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatientStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "neutro" | "neutral" => Ok(PatientStatus::Neutral),
            "estable" | "stable" => Ok(PatientStatus::Stable),
            "seguimiento" | "follow-up" => Ok(PatientStatus::FollowUp),
            "urgente" | "urgent" => Ok(PatientStatus::Urgent),
            _ => Err(ValidationError::InvalidStatus(s.to_string())),
        }
    }
}

/// Sexo registrado na ficha
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Sex {
    pub fn as_str(self) -> &'static str {
        match self {
            Sex::Male => "M",
            Sex::Female => "F",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Sex::Male => "Masculino",
            Sex::Female => "Femenino",
        }
    }
}

impl FromStr for Sex {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "m" | "masculino" | "hombre" => Ok(Sex::Male),
            "f" | "femenino" | "mujer" => Ok(Sex::Female),
            _ => Err(ValidationError::InvalidSex(s.to_string())),
        }
    }
}

/// Sinais vitais registrados na primeira consulta (texto livre)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VitalSigns {
    #[serde(deserialize_with = "null_as_default")]
    pub blood_pressure: String,
    #[serde(deserialize_with = "null_as_default")]
    pub heart_rate: String,
    #[serde(deserialize_with = "null_as_default")]
    pub temperature: String,
    #[serde(deserialize_with = "null_as_default")]
    pub respiratory_rate: String,
    #[serde(deserialize_with = "null_as_default")]
    pub weight: String,
    #[serde(deserialize_with = "null_as_default")]
    pub height: String,
}

impl VitalSigns {
    pub fn is_empty(&self) -> bool {
        [
            &self.blood_pressure,
            &self.heart_rate,
            &self.temperature,
            &self.respiratory_rate,
            &self.weight,
            &self.height,
        ]
        .iter()
        .all(|v| v.trim().is_empty())
    }
}

/// Perfil do médico, vinculado ao usuário de autenticação
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    /// Mesmo identificador do usuário de autenticação
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub email: String,
    pub full_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub specialty: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Dados para inserir um perfil de médico
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDoctor {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub specialty: String,
    pub phone: Option<String>,
}

/// Ficha de paciente como persistida
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    /// Médico responsável
    pub doctor_id: Uuid,
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub sex: Sex,

    // Contato e dados demográficos
    #[serde(default, deserialize_with = "null_as_default")]
    pub phone: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub id_number: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub civil_status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub nationality: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub occupation: String,

    // Histórico clínico
    #[serde(default, deserialize_with = "null_as_default")]
    pub consult_reason: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pathological_history: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub family_history: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub habits: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub current_medications: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub allergies: String,

    // Exploração física
    #[serde(default, deserialize_with = "null_as_default")]
    pub vital_signs: VitalSigns,
    #[serde(default, deserialize_with = "null_as_default")]
    pub physical_exam: String,

    // Informação adicional
    #[serde(default, deserialize_with = "null_as_default")]
    pub lab_results: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub diagnosis: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub treatment: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub prognosis: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub status: PatientStatus,
    pub created_at: DateTime<Utc>,
}

/// Dados para inserir um paciente, produzidos por [`crate::forms::PatientForm`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPatient {
    pub doctor_id: Uuid,
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub sex: Sex,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub id_number: String,
    pub civil_status: String,
    pub nationality: String,
    pub occupation: String,
    pub consult_reason: String,
    pub pathological_history: String,
    pub family_history: String,
    pub habits: String,
    pub current_medications: String,
    pub allergies: String,
    pub vital_signs: VitalSigns,
    pub physical_exam: String,
    pub lab_results: String,
    pub diagnosis: String,
    pub treatment: String,
    pub prognosis: String,
    pub status: PatientStatus,
}

/// Consulta registrada
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub visit_date: DateTime<Utc>,
    /// Tipo de consulta (geral, controle, emergência...)
    pub visit_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub symptoms: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub diagnosis: String,
    #[serde(default)]
    pub treatment_plan: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub prescription: Option<String>,
    #[serde(default)]
    pub lab_request: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
}

/// Dados para inserir uma consulta, produzidos por [`crate::forms::VisitForm`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVisit {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub visit_date: DateTime<Utc>,
    pub visit_type: String,
    pub symptoms: String,
    pub diagnosis: String,
    pub treatment_plan: Option<String>,
    pub notes: Option<String>,
    pub prescription: Option<String>,
    pub lab_request: Option<String>,
    pub status: String,
}

/// Usuário autenticado
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

/// Sessão aberta por login com senha
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: AuthUser,
}

/// Bucket do armazenamento de objetos
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub name: String,
    #[serde(default)]
    pub public: bool,
}

/// Opções de criação de bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketOptions {
    pub public: bool,
    /// Limite de tamanho por arquivo, em bytes
    pub file_size_limit: u64,
}

/// Entrada devolvida pela listagem de arquivos de uma consulta
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// Nome relativo à pasta da consulta
    pub name: String,
    pub size: Option<u64>,
    pub content_type: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Resultado de um envio de anexo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    /// Chave completa no bucket (`paciente/consulta/millis.ext`)
    pub stored_name: String,
}

/// Arquivo escolhido pelo usuário para anexar à consulta
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedFile {
    /// Nome original do arquivo
    pub name: String,
    /// Caminho local de onde o conteúdo será lido
    pub uri: PathBuf,
    /// Tipo MIME informado pelo seletor
    pub mime_type: String,
}
