//! # Stats Server - Entry Point
//! src/main.rs
//!
//! Inicializa logging y configuración, arranca el motor de jobs, lanza la
//! carga del dataset en segundo plano y atiende conexiones.

use stats_server::api::{build_router, ApiState};
use stats_server::config::Config;
use stats_server::data::DataIngestor;
use stats_server::jobs::{FileResultStore, JobService, ReadinessGate};
use stats_server::server::Server;
use std::sync::Arc;
use std::thread;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stats_server=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn main() {
    init_tracing();

    let config = Config::new();
    if let Err(e) = config.validate() {
        error!(error = %e, "invalid configuration");
        std::process::exit(2);
    }
    config.log_summary();

    if let Err(e) = run(config) {
        error!(error = %e, "fatal error");
        std::process::exit(1);
    }
}

fn run(config: Config) -> std::io::Result<()> {
    let gate = Arc::new(ReadinessGate::new());
    let store = Arc::new(FileResultStore::new(&config.results_dir)?);
    let service = Arc::new(JobService::new(config.worker_count(), Arc::clone(&gate), store)?);
    info!(workers = service.workers(), results_dir = %config.results_dir.display(), "job service started");

    // Los handlers aceptan jobs mientras el dataset carga; los workers
    // esperan a la compuerta.
    let data = Arc::new(DataIngestor::new(gate));
    let loader = data.spawn_load(config.data_path.clone());
    thread::Builder::new()
        .name("dataset-watch".to_string())
        .spawn(move || match loader.join() {
            Ok(Ok(())) => info!("workers released"),
            Ok(Err(_)) | Err(_) => {
                error!("dataset could not be loaded, exiting");
                std::process::exit(1);
            }
        })?;

    let router = build_router(Arc::new(ApiState::new(service, data)));
    let server = Server::from_config(&config, router)?;
    server.run()
}
