//! # Stats Server
//! src/lib.rs
//!
//! Servidor HTTP/1.0 concurrente que calcula estadísticas sobre un dataset
//! de nutrición y obesidad mediante jobs asíncronos: el cliente encola una
//! consulta, recibe un id al instante y luego consulta el resultado.
//!
//! ## Arquitectura
//!
//! - `http`: parsing y construcción de mensajes HTTP/1.0
//! - `router`: enrutamiento por método y path
//! - `server`: listener TCP, un thread por conexión
//! - `api`: endpoints `/api/*`
//! - `jobs`: motor de jobs (cola, registro, pool de workers, resultados)
//! - `data`: carga del CSV y las agregaciones
//! - `config`: CLI y variables de entorno
//! - `error`: errores tipados
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use std::sync::Arc;
//! use stats_server::api::{build_router, ApiState};
//! use stats_server::config::Config;
//! use stats_server::data::DataIngestor;
//! use stats_server::jobs::{FileResultStore, JobService, ReadinessGate};
//! use stats_server::server::Server;
//!
//! let config = Config::default();
//! let gate = Arc::new(ReadinessGate::new());
//! let store = Arc::new(FileResultStore::new(&config.results_dir).unwrap());
//! let service = Arc::new(JobService::new(config.worker_count(), Arc::clone(&gate), store).unwrap());
//!
//! let data = Arc::new(DataIngestor::new(gate));
//! data.spawn_load(config.data_path.clone());
//!
//! let router = build_router(Arc::new(ApiState::new(service, data)));
//! Server::from_config(&config, router).unwrap().run().unwrap();
//! ```

pub mod api;
pub mod config;
pub mod data;
pub mod error;
pub mod http;
pub mod jobs;
pub mod router;
pub mod server;
