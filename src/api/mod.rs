//! # API de Estadísticas
//! src/api/mod.rs
//!
//! Une la capa HTTP con el motor de jobs: cada agregación tiene su
//! endpoint `POST /api/<nombre>` y el resto son consultas `GET`.

pub mod handlers;

pub use handlers::ApiState;

use crate::data::Aggregation;
use crate::http::{Method, Request, Response};
use crate::router::Router;
use std::sync::Arc;

/// Construye el router con todas las rutas de la API
pub fn build_router(state: Arc<ApiState>) -> Router {
    let mut router = Router::new();

    for aggregation in Aggregation::ALL {
        let state = Arc::clone(&state);
        router.register(
            Method::POST,
            &format!("/api/{}", aggregation.name()),
            move |req: &Request| handlers::submit_handler(req, &state, aggregation),
        );
    }

    let s = Arc::clone(&state);
    router.register_prefix(Method::GET, handlers::RESULTS_PREFIX, move |req: &Request| {
        handlers::results_handler(req, &s)
    });

    let s = Arc::clone(&state);
    router.register(Method::GET, "/api/jobs", move |req: &Request| {
        handlers::jobs_handler(req, &s)
    });

    let s = Arc::clone(&state);
    router.register(Method::GET, "/api/num_jobs", move |req: &Request| {
        handlers::num_jobs_handler(req, &s)
    });

    let s = Arc::clone(&state);
    router.register(Method::GET, "/api/graceful_shutdown", move |req: &Request| {
        handlers::shutdown_handler(req, &s)
    });

    // La página de índice lista las rutas, incluidas las suyas
    let mut routes = router.describe();
    routes.push("GET /".to_string());
    routes.push("GET /index".to_string());
    let page = Arc::new(handlers::index_page(&routes));

    for path in ["/", "/index"] {
        let page = Arc::clone(&page);
        router.register(Method::GET, path, move |_req: &Request| Response::html(&page));
    }

    router
}
