//! # Configuración del Servidor
//! src/config.rs
//!
//! Este módulo define la configuración del servidor con soporte completo
//! para argumentos CLI y variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./stats_server --port 5000 \
//!   --threads 4 \
//!   --data-path ./nutrition_activity_obesity_usa_subset.csv \
//!   --results-dir ./results
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! TP_NUM_OF_THREADS=8 HTTP_PORT=5000 ./stats_server
//! ```

use clap::Parser;
use std::path::PathBuf;
use tracing::info;

/// Configuración del servidor
#[derive(Debug, Clone, Parser)]
#[command(name = "stats_server")]
#[command(about = "Servidor HTTP/1.0 con jobs asíncronos sobre el dataset de nutrición y obesidad")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "5000", env = "HTTP_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "HTTP_HOST")]
    pub host: String,

    /// Archivo CSV con el dataset
    #[arg(long = "data-path", default_value = "./nutrition_activity_obesity_usa_subset.csv", env = "DATA_PATH")]
    pub data_path: PathBuf,

    /// Directorio donde se guarda un archivo por resultado de job
    #[arg(long = "results-dir", default_value = "./results", env = "RESULTS_DIR")]
    pub results_dir: PathBuf,

    // === Workers ===

    /// Número de workers del pool (por defecto, la concurrencia del hardware)
    #[arg(long = "threads", env = "TP_NUM_OF_THREADS")]
    pub threads: Option<usize>,

    // === Requests ===

    /// Tamaño máximo del body de un request en bytes
    #[arg(long = "max-body-bytes", default_value = "65536", env = "MAX_BODY_BYTES")]
    pub max_body_bytes: usize,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Número de workers: `threads` si está definido, si no la
    /// concurrencia disponible del hardware
    pub fn worker_count(&self) -> usize {
        self.threads.unwrap_or_else(hardware_concurrency)
    }

    /// Valida la configuración
    ///
    /// Retorna errores si hay valores inválidos
    pub fn validate(&self) -> Result<(), String> {
        if self.threads == Some(0) {
            return Err("Worker threads must be >= 1".to_string());
        }

        if self.host.trim().is_empty() {
            return Err("Host must not be empty".to_string());
        }

        if self.data_path.as_os_str().is_empty() {
            return Err("Data path must not be empty".to_string());
        }

        if self.results_dir.as_os_str().is_empty() {
            return Err("Results dir must not be empty".to_string());
        }

        if self.max_body_bytes == 0 {
            return Err("Max body bytes must be > 0".to_string());
        }

        Ok(())
    }

    /// Registra un resumen de la configuración
    pub fn log_summary(&self) {
        info!(
            address = %self.address(),
            data_path = %self.data_path.display(),
            results_dir = %self.results_dir.display(),
            workers = self.worker_count(),
            workers_from = if self.threads.is_some() { "config" } else { "hardware" },
            max_body_bytes = self.max_body_bytes,
            "server configuration"
        );
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            port: 5000,
            host: "127.0.0.1".to_string(),
            data_path: PathBuf::from("./nutrition_activity_obesity_usa_subset.csv"),
            results_dir: PathBuf::from("./results"),
            threads: None,
            max_body_bytes: 64 * 1024,
        }
    }
}

/// Concurrencia del hardware, 1 si no se puede determinar
pub fn hardware_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 5000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.results_dir, PathBuf::from("./results"));
        assert_eq!(config.threads, None);
    }

    #[test]
    fn test_address() {
        let config = Config::default();
        assert_eq!(config.address(), "127.0.0.1:5000");
    }

    #[test]
    fn test_address_custom() {
        let mut config = Config::default();
        config.host = "0.0.0.0".to_string();
        config.port = 3000;
        assert_eq!(config.address(), "0.0.0.0:3000");
    }

    #[test]
    fn test_validate_success() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    // ==================== Workers ====================

    #[test]
    fn test_worker_count_explicit() {
        let mut config = Config::default();
        config.threads = Some(3);
        assert_eq!(config.worker_count(), 3);
    }

    #[test]
    fn test_worker_count_falls_back_to_hardware() {
        let config = Config::default();
        assert_eq!(config.worker_count(), hardware_concurrency());
        assert!(config.worker_count() >= 1);
    }

    #[test]
    fn test_validate_zero_threads() {
        let mut config = Config::default();
        config.threads = Some(0);
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Worker threads"));
    }

    // ==================== Paths ====================

    #[test]
    fn test_validate_empty_data_path() {
        let mut config = Config::default();
        config.data_path = PathBuf::new();
        assert!(config.validate().unwrap_err().contains("Data path"));
    }

    #[test]
    fn test_validate_empty_results_dir() {
        let mut config = Config::default();
        config.results_dir = PathBuf::new();
        assert!(config.validate().unwrap_err().contains("Results dir"));
    }

    #[test]
    fn test_validate_zero_body_limit() {
        let mut config = Config::default();
        config.max_body_bytes = 0;
        assert!(config.validate().unwrap_err().contains("Max body bytes"));
    }

    // ==================== CLI ====================

    #[test]
    fn test_parse_cli_flags() {
        let config = Config::try_parse_from([
            "stats_server",
            "--port",
            "8081",
            "--threads",
            "6",
            "--results-dir",
            "/tmp/out",
        ])
        .unwrap();

        assert_eq!(config.port, 8081);
        assert_eq!(config.threads, Some(6));
        assert_eq!(config.results_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_log_summary_does_not_panic() {
        Config::default().log_summary();
    }
}
