//! # Tipos y Estructuras para el Sistema de Jobs
//! src/jobs/types.rs
//!
//! Define los tipos fundamentales para el manejo de trabajos asíncronos.

use crate::error::JobError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identificador de un job
///
/// Estrictamente creciente en orden de aceptación, nunca se reutiliza.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(JobId)
    }
}

/// Estado de un job registrado
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Aceptado y pendiente o ejecutándose
    Running,

    /// Resultado persistido y legible
    Done,

    /// La tarea falló; el error quedó persistido como resultado
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Running => "running",
            JobState::Done => "done",
            JobState::Failed => "failed",
        }
    }

    /// Verifica si el job está en estado terminal
    #[cfg(test)]
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed)
    }
}

/// Respuesta de `JobService::status`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    NotFound,
    Running,
    Done,
    Failed,
}

impl From<JobState> for JobStatus {
    fn from(state: JobState) -> Self {
        match state {
            JobState::Running => JobStatus::Running,
            JobState::Done => JobStatus::Done,
            JobState::Failed => JobStatus::Failed,
        }
    }
}

/// Unidad de trabajo diferido
///
/// El motor no sabe qué calcula cada tarea: solo la ejecuta en un worker
/// y persiste el JSON que devuelve.
pub trait Task: Send + 'static {
    /// Nombre corto para logs
    fn name(&self) -> &str;

    /// Ejecuta la tarea de forma síncrona en el thread actual
    fn execute(self) -> Result<serde_json::Value, JobError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_state_serialization() {
        let json = serde_json::to_string(&JobState::Running).unwrap();
        assert_eq!(json, "\"running\"");
        let json = serde_json::to_string(&JobState::Done).unwrap();
        assert_eq!(json, "\"done\"");
    }

    #[test]
    fn test_job_id_parse() {
        assert_eq!("17".parse::<JobId>().unwrap(), JobId(17));
        assert!("abc".parse::<JobId>().is_err());
        assert!("-1".parse::<JobId>().is_err());
    }

    #[test]
    fn test_job_id_ordering() {
        assert!(JobId(1) < JobId(2));
        assert_eq!(JobId(3).to_string(), "3");
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobState::Running.is_terminal());
        assert!(JobState::Done.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert_eq!(JobStatus::from(JobState::Done), JobStatus::Done);
    }
}
