//! # Carga del Dataset
//! src/data/dataset.rs
//!
//! Lee el CSV de nutrición/actividad física/obesidad y lo publica para los
//! workers. Al terminar la carga libera la compuerta de disponibilidad.

use crate::error::DataError;
use crate::jobs::gate::ReadinessGate;
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{error, info};

/// Preguntas donde un valor menor es mejor
pub const QUESTIONS_BEST_IS_MIN: [&str; 5] = [
    "Percent of adults aged 18 years and older who have an overweight classification",
    "Percent of adults aged 18 years and older who have obesity",
    "Percent of adults who engage in no leisure-time physical activity",
    "Percent of adults who report consuming fruit less than one time daily",
    "Percent of adults who report consuming vegetables less than one time daily",
];

/// Preguntas donde un valor mayor es mejor
pub const QUESTIONS_BEST_IS_MAX: [&str; 4] = [
    "Percent of adults who achieve at least 150 minutes a week of moderate-intensity aerobic physical activity or 75 minutes a week of vigorous-intensity aerobic activity (or an equivalent combination)",
    "Percent of adults who achieve at least 150 minutes a week of moderate-intensity aerobic physical activity or 75 minutes a week of vigorous-intensity aerobic physical activity and engage in muscle-strengthening activities on 2 or more days a week",
    "Percent of adults who achieve at least 300 minutes a week of moderate-intensity aerobic physical activity or 150 minutes a week of vigorous-intensity aerobic activity (or an equivalent combination)",
    "Percent of adults who engage in muscle-strengthening activities on 2 or more days a week",
];

const REQUIRED_COLUMNS: [&str; 5] = [
    "Question",
    "LocationDesc",
    "Data_Value",
    "StratificationCategory1",
    "Stratification1",
];

pub fn is_best_min(question: &str) -> bool {
    QUESTIONS_BEST_IS_MIN.contains(&question)
}

pub fn is_best_max(question: &str) -> bool {
    QUESTIONS_BEST_IS_MAX.contains(&question)
}

/// Fila tal como viene en el CSV (columnas extra se ignoran)
#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(rename = "Question")]
    question: String,

    #[serde(rename = "LocationDesc")]
    location: String,

    #[serde(rename = "Data_Value", deserialize_with = "csv::invalid_option")]
    data_value: Option<f64>,

    #[serde(rename = "StratificationCategory1")]
    category: Option<String>,

    #[serde(rename = "Stratification1")]
    stratification: Option<String>,
}

/// Observación con valor numérico
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub question: String,
    pub location: String,
    pub value: f64,
    pub category: Option<String>,
    pub stratification: Option<String>,
}

/// Dataset en memoria, inmutable después de cargado
#[derive(Debug, Default)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Parsea CSV con encabezados. Las filas sin `Data_Value` se descartan.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DataError> {
        let mut csv_reader = csv::Reader::from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == column) {
                return Err(DataError::MissingColumn(column));
            }
        }

        let mut records = Vec::new();
        for row in csv_reader.deserialize::<RawRecord>() {
            let raw = row?;
            let Some(value) = raw.data_value else {
                continue;
            };
            records.push(Record {
                question: raw.question,
                location: raw.location,
                value,
                category: raw.category.filter(|s| !s.is_empty()),
                stratification: raw.stratification.filter(|s| !s.is_empty()),
            });
        }

        Ok(Self { records })
    }

    /// Abre y parsea un archivo CSV
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Filas de una pregunta
    pub fn by_question<'a>(&'a self, question: &'a str) -> impl Iterator<Item = &'a Record> + 'a {
        self.records.iter().filter(move |r| r.question == question)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Punto de acceso compartido al dataset
///
/// Los handlers HTTP crean jobs con una referencia a este ingestor aunque
/// los datos todavía no estén cargados; los workers no ejecutan nada hasta
/// que `publish` libera la compuerta.
pub struct DataIngestor {
    data: OnceLock<Dataset>,
    gate: Arc<ReadinessGate>,
}

impl DataIngestor {
    pub fn new(gate: Arc<ReadinessGate>) -> Self {
        Self {
            data: OnceLock::new(),
            gate,
        }
    }

    /// Publica el dataset y libera la compuerta. Solo la primera llamada
    /// tiene efecto.
    pub fn publish(&self, dataset: Dataset) {
        let rows = dataset.len();
        if self.data.set(dataset).is_ok() {
            info!(rows, "dataset published");
        }
        self.gate.release();
    }

    /// Carga el CSV en un thread aparte y publica el resultado
    ///
    /// Si la carga falla la compuerta queda cerrada y el error se retorna
    /// por el `JoinHandle`.
    pub fn spawn_load(self: &Arc<Self>, path: impl Into<PathBuf>) -> JoinHandle<Result<(), DataError>> {
        let ingestor = Arc::clone(self);
        let path = path.into();

        thread::spawn(move || {
            let start = Instant::now();
            match Dataset::load(&path) {
                Ok(dataset) => {
                    info!(
                        path = %path.display(),
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "dataset loaded"
                    );
                    ingestor.publish(dataset);
                    Ok(())
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "failed to load dataset");
                    Err(e)
                }
            }
        })
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.data.get()
    }

    #[cfg(test)]
    pub fn is_loaded(&self) -> bool {
        self.data.get().is_some()
    }
}
