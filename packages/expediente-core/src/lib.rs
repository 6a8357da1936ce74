//! Expediente Core - Núcleo do expediente clínico do consultório
//!
//! Esta biblioteca fornece:
//! - Modelos de médicos, pacientes, consultas e anexos
//! - Validação e formatação de datas e cálculo de idade
//! - Filtro da lista de pacientes por nome
//! - Formulários de cadastro com validação
//! - O trait `Backend` e a fachada `ClinicClient` usada pelas telas
//! - Estatísticas do consultório

pub mod backend;
pub mod client;
pub mod date;
pub mod error;
pub mod filter;
pub mod forms;
pub mod models;
pub mod stats;
pub mod view;

#[cfg(any(test, feature = "test-utils"))]
pub mod fixtures;

pub use backend::{Backend, BackendResult};
pub use client::{ClinicClient, FailedUpload, VisitOutcome};
pub use error::{BackendError, ClinicError, ValidationError};
