//! # Datos y Estadísticas
//! src/data/mod.rs
//!
//! - `dataset`: carga del CSV y publicación para los workers
//! - `stats`: agregaciones que ejecutan los jobs

pub mod dataset;
pub mod stats;

pub use dataset::{DataIngestor, Dataset, Record};
pub use stats::{Aggregation, StatsJob, StatsQuery};
