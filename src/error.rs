//! # Errores del Servidor
//! src/error.rs
//!
//! Errores tipados del motor de jobs y de la carga del dataset.

use crate::jobs::types::JobId;
use thiserror::Error;

/// Errores visibles para quien usa el motor de jobs
#[derive(Error, Debug)]
pub enum JobError {
    /// El servicio ya inició (o terminó) el graceful shutdown
    #[error("Thread pool was shut down.")]
    Rejected,

    /// El id nunca fue asignado
    #[error("Invalid job_id: {0}")]
    NotFound(JobId),

    /// El job existe pero todavía no terminó
    #[error("Job {0} is still running")]
    NotReady(JobId),

    /// La tarea falló durante su ejecución
    #[error("Job execution failed: {0}")]
    Execution(String),

    /// Los datos que necesita la tarea no están cargados
    #[error("Dataset is not loaded")]
    DataUnavailable,

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errores al leer el dataset CSV
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Cannot open dataset: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing column in dataset: {0}")]
    MissingColumn(&'static str),
}

pub type Result<T> = std::result::Result<T, JobError>;
