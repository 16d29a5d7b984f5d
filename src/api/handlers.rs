//! # Handlers HTTP de la API
//! src/api/handlers.rs
//!
//! Implementa los endpoints `/api/*`:
//! - `POST /api/<agregación>`: encola un job
//! - `GET /api/get_results/<id>`
//! - `GET /api/jobs`
//! - `GET /api/num_jobs`
//! - `GET /api/graceful_shutdown`
//!
//! Los errores de negocio se responden con 200 y `{"status": "error", ...}`;
//! los códigos 4xx quedan para errores de protocolo.

use crate::data::{Aggregation, DataIngestor, StatsJob};
use crate::error::JobError;
use crate::http::{Request, Response, StatusCode};
use crate::jobs::{JobId, JobService, JobStatus};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Estado compartido por todos los handlers
pub struct ApiState {
    pub service: Arc<JobService<StatsJob>>,
    pub data: Arc<DataIngestor>,
}

impl ApiState {
    pub fn new(service: Arc<JobService<StatsJob>>, data: Arc<DataIngestor>) -> Self {
        Self { service, data }
    }
}

/// Body de los POST de agregaciones
#[derive(Debug, Deserialize)]
struct QueryBody {
    question: Option<String>,
    state: Option<String>,
}

/// Prefijo de la ruta de resultados
pub const RESULTS_PREFIX: &str = "/api/get_results/";

fn invalid_format(body: &str, detail: &str) -> Response {
    warn!(body, detail, "invalid request body");
    Response::json(&json!({
        "status": "error",
        "reason": format!("Invalid format of {} => {}", body, detail),
    }))
}

/// Handler para `POST /api/<agregación>`
///
/// Body: `{"question": "...", "state": "..."}` (`state` solo para las
/// consultas por estado).
///
/// # Ejemplo de response
/// ```json
/// {"status": "success", "job_id": 1}
/// ```
pub fn submit_handler(req: &Request, state: &ApiState, aggregation: Aggregation) -> Response {
    let raw = String::from_utf8_lossy(req.body());

    let body: QueryBody = match req.json() {
        Ok(body) => body,
        Err(e) => return invalid_format(&raw, &e.to_string()),
    };

    let question = match body.question {
        Some(q) => q,
        None => return invalid_format(&raw, "missing field `question`"),
    };

    let query = match aggregation.query(question, body.state) {
        Some(query) => query,
        None => return invalid_format(&raw, "missing field `state`"),
    };

    info!(endpoint = aggregation.name(), "received job request");

    match state.service.submit(StatsJob::new(Arc::clone(&state.data), query)) {
        Ok(id) => Response::json(&json!({ "status": "success", "job_id": id })),
        Err(JobError::Rejected) => {
            error!(endpoint = aggregation.name(), "thread pool is shutting down or already shut down");
            Response::json(&json!({
                "status": "error",
                "reason": JobError::Rejected.to_string(),
            }))
        }
        Err(e) => Response::error(StatusCode::InternalServerError, &e.to_string()),
    }
}

/// Handler para `GET /api/get_results/<id>`
///
/// # Ejemplo de response
/// - id desconocido: `{"status": "error", "reason": "Invalid job_id"}`
/// - en ejecución: `{"status": "running"}`
/// - terminado: `{"status": "done", "data": {...}}`
/// - fallido: `{"status": "error", "reason": "..."}`
pub fn results_handler(req: &Request, state: &ApiState) -> Response {
    let raw_id = req.path().trim_start_matches(RESULTS_PREFIX);

    let id = match raw_id.parse::<JobId>() {
        Ok(id) => id,
        Err(_) => return invalid_job_id(raw_id),
    };

    // El estado solo avanza, así que un Done/Failed leído aquí sigue
    // siéndolo en el fetch.
    let status = state.service.status(id);
    if status == JobStatus::NotFound {
        return invalid_job_id(raw_id);
    }
    if status == JobStatus::Running {
        info!(job_id = %id, "job is still running");
        return Response::json(&json!({ "status": "running" }));
    }

    match state.service.fetch(id) {
        Ok(data) if status == JobStatus::Failed => {
            let reason = data
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("Job failed")
                .to_string();
            Response::json(&json!({ "status": "error", "reason": reason }))
        }
        Ok(data) => {
            info!(job_id = %id, "returning job result");
            Response::json(&json!({ "status": "done", "data": data }))
        }
        Err(e) if status == JobStatus::Failed => {
            // Falló también la escritura del motivo
            warn!(job_id = %id, error = %e, "failed job has no stored reason");
            Response::json(&json!({ "status": "error", "reason": "Job failed" }))
        }
        Err(e) => {
            error!(job_id = %id, error = %e, "cannot read job result");
            Response::error(StatusCode::InternalServerError, &e.to_string())
        }
    }
}

fn invalid_job_id(raw_id: &str) -> Response {
    warn!(job_id = raw_id, "invalid job_id");
    Response::json(&json!({ "status": "error", "reason": "Invalid job_id" }))
}

/// Handler para `GET /api/jobs`
///
/// # Ejemplo de response
/// ```json
/// {"status": "done", "jobs": [{"job_id_1": "done"}, {"job_id_2": "running"}]}
/// ```
pub fn jobs_handler(_req: &Request, state: &ApiState) -> Response {
    let jobs: Vec<Value> = state
        .service
        .list_jobs()
        .into_iter()
        .map(|record| {
            let mut entry = Map::new();
            entry.insert(format!("job_id_{}", record.id), json!(record.state.as_str()));
            Value::Object(entry)
        })
        .collect();

    Response::json(&json!({ "status": "done", "jobs": jobs }))
}

/// Handler para `GET /api/num_jobs`: jobs que todavía esperan un worker
pub fn num_jobs_handler(_req: &Request, state: &ApiState) -> Response {
    Response::json(&json!({ "status": "done", "num_jobs": state.service.num_pending() }))
}

/// Handler para `GET /api/graceful_shutdown`
///
/// Bloquea hasta que la cola se drena y los workers terminan.
pub fn shutdown_handler(_req: &Request, state: &ApiState) -> Response {
    state.service.shutdown();
    info!("webserver shutdown");
    Response::json(&json!({ "status": "success" }))
}

/// Página de bienvenida con las rutas definidas
pub fn index_page(routes: &[String]) -> String {
    let mut msg = String::from(
        "Hello, World!\n Interact with the webserver using one of the defined routes:\n",
    );
    for route in routes {
        msg.push_str(&format!("<p>{}</p>", route));
    }
    msg
}
