//! Tests de integración de la API HTTP
//! tests/api_tests.rs
//!
//! Levantan el servidor completo en un puerto efímero, con un CSV pequeño
//! en un directorio temporal, y le hablan por `TcpStream`.

use serde_json::{json, Value};
use stats_server::api::{build_router, ApiState};
use stats_server::data::DataIngestor;
use stats_server::jobs::{FileResultStore, JobService, ReadinessGate};
use stats_server::server::Server;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

const OBESITY: &str = "Percent of adults aged 18 years and older who have obesity";

const CSV: &str = "\
YearStart,LocationDesc,Question,Data_Value,StratificationCategory1,Stratification1
2020,Ohio,Percent of adults aged 18 years and older who have obesity,30,Gender,Male
2020,Ohio,Percent of adults aged 18 years and older who have obesity,40,Gender,Female
2020,Utah,Percent of adults aged 18 years and older who have obesity,20,Gender,Male
2020,Utah,Percent of adults aged 18 years and older who have obesity,30,Gender,Female
2020,Utah,Percent of adults aged 18 years and older who have obesity,,Gender,Female
";

struct TestServer {
    addr: SocketAddr,
    dir: TempDir,
}

/// Arranca un servidor completo y espera a que el dataset esté cargado
fn start_server() -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("data.csv");
    std::fs::write(&csv_path, CSV).unwrap();

    let gate = Arc::new(ReadinessGate::new());
    let store = Arc::new(FileResultStore::new(dir.path().join("results")).unwrap());
    let service = Arc::new(JobService::new(2, Arc::clone(&gate), store).unwrap());
    let data = Arc::new(DataIngestor::new(gate));
    data.spawn_load(csv_path).join().unwrap().unwrap();

    let router = build_router(Arc::new(ApiState::new(service, data)));
    let server = Server::bind("127.0.0.1:0", router, 4096).unwrap();
    let addr = server.local_addr().unwrap();
    thread::spawn(move || server.run());

    TestServer { addr, dir }
}

/// Envía un request crudo y retorna (código, body)
fn send(addr: SocketAddr, raw: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
    stream.write_all(raw.as_bytes()).unwrap();
    stream.flush().unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();

    let status = response
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    let body = response
        .find("\r\n\r\n")
        .map(|pos| response[pos + 4..].to_string())
        .unwrap_or_default();
    (status, body)
}

fn get(addr: SocketAddr, path: &str) -> (u16, Value) {
    let (status, body) = send(addr, &format!("GET {} HTTP/1.0\r\n\r\n", path));
    (status, serde_json::from_str(&body).unwrap())
}

fn post(addr: SocketAddr, path: &str, body: &Value) -> (u16, Value) {
    let body = body.to_string();
    let raw = format!(
        "POST {} HTTP/1.0\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        path,
        body.len(),
        body
    );
    let (status, body) = send(addr, &raw);
    (status, serde_json::from_str(&body).unwrap())
}

/// Espera a que el job deje de estar "running" y retorna la respuesta
fn wait_result(addr: SocketAddr, job_id: u64) -> Value {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let (_, body) = get(addr, &format!("/api/get_results/{}", job_id));
        if body["status"] != "running" {
            return body;
        }
        assert!(Instant::now() < deadline, "job {} never finished", job_id);
        thread::sleep(Duration::from_millis(5));
    }
}

fn submit(addr: SocketAddr, endpoint: &str, body: Value) -> Value {
    let (status, response) = post(addr, &format!("/api/{}", endpoint), &body);
    assert_eq!(status, 200);
    assert_eq!(response["status"], "success", "{}", response);
    let job_id = response["job_id"].as_u64().unwrap();
    wait_result(addr, job_id)
}

// ==================== Agregaciones ====================

#[test]
fn test_global_mean() {
    let server = start_server();
    let result = submit(server.addr, "global_mean", json!({"question": OBESITY}));
    assert_eq!(result, json!({"status": "done", "data": {"global_mean": 30.0}}));
}

#[test]
fn test_states_mean_order() {
    let server = start_server();
    let result = submit(server.addr, "states_mean", json!({"question": OBESITY}));

    let data = result["data"].as_object().unwrap();
    let keys: Vec<&String> = data.keys().collect();
    assert_eq!(keys, vec!["Utah", "Ohio"]);
    assert_eq!(data["Utah"], 25.0);
    assert_eq!(data["Ohio"], 35.0);
}

#[test]
fn test_state_queries() {
    let server = start_server();

    let mean = submit(server.addr, "state_mean", json!({"question": OBESITY, "state": "Ohio"}));
    assert_eq!(mean["data"], json!({"Ohio": 35.0}));

    let diff = submit(
        server.addr,
        "state_diff_from_mean",
        json!({"question": OBESITY, "state": "Ohio"}),
    );
    assert_eq!(diff["data"], json!({"Ohio": -5.0}));

    let by_category = submit(
        server.addr,
        "state_mean_by_category",
        json!({"question": OBESITY, "state": "Utah"}),
    );
    assert_eq!(
        by_category["data"],
        json!({"Utah": {"('Gender', 'Female')": 30.0, "('Gender', 'Male')": 20.0}})
    );
}

#[test]
fn test_best5_and_worst5() {
    let server = start_server();

    let best = submit(server.addr, "best5", json!({"question": OBESITY}));
    let keys: Vec<&String> = best["data"].as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["Utah", "Ohio"]);

    let worst = submit(server.addr, "worst5", json!({"question": OBESITY}));
    let keys: Vec<&String> = worst["data"].as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["Ohio", "Utah"]);
}

#[test]
fn test_mean_by_category() {
    let server = start_server();
    let result = submit(server.addr, "mean_by_category", json!({"question": OBESITY}));

    let data = result["data"].as_object().unwrap();
    assert_eq!(data.len(), 4);
    assert_eq!(data["('Ohio', 'Gender', 'Female')"], 40.0);
    assert_eq!(data.keys().next().unwrap(), "('Ohio', 'Gender', 'Female')");
}

// ==================== Errores de la API ====================

#[test]
fn test_invalid_body() {
    let server = start_server();

    let (status, body) = post(server.addr, "/api/state_mean", &json!({"question": OBESITY}));
    assert_eq!(status, 200);
    assert_eq!(body["status"], "error");
    assert!(body["reason"].as_str().unwrap().starts_with("Invalid format of"));

    let (_, jobs) = get(server.addr, "/api/jobs");
    assert_eq!(jobs, json!({"status": "done", "jobs": []}));
}

#[test]
fn test_invalid_job_id() {
    let server = start_server();
    let (status, body) = get(server.addr, "/api/get_results/123");

    assert_eq!(status, 200);
    assert_eq!(body, json!({"status": "error", "reason": "Invalid job_id"}));
}

#[test]
fn test_method_not_allowed() {
    let server = start_server();

    let (status, body) = get(server.addr, "/api/global_mean");
    assert_eq!(status, 405);
    assert_eq!(body, json!({"error": "Method not allowed"}));
}

#[test]
fn test_unknown_route_and_bad_request() {
    let server = start_server();

    let (status, _) = get(server.addr, "/nope");
    assert_eq!(status, 404);

    let (status, _) = send(server.addr, "NOT-HTTP\r\n\r\n");
    assert_eq!(status, 400);
}

#[test]
fn test_body_too_large() {
    let server = start_server();
    let raw = "POST /api/best5 HTTP/1.0\r\nContent-Length: 100000\r\n\r\n";
    let (status, _) = send(server.addr, raw);
    assert_eq!(status, 413);
}

#[test]
fn test_index_lists_routes() {
    let server = start_server();
    let (status, body) = send(server.addr, "GET / HTTP/1.0\r\n\r\n");

    assert_eq!(status, 200);
    assert!(body.starts_with("Hello, World!"));
    assert!(body.contains("POST /api/global_mean"));
}

// ==================== Ciclo de vida ====================

#[test]
fn test_jobs_num_jobs_and_shutdown() {
    let server = start_server();

    let first = submit(server.addr, "global_mean", json!({"question": OBESITY}));
    assert_eq!(first["status"], "done");
    submit(server.addr, "diff_from_mean", json!({"question": OBESITY}));

    let (_, jobs) = get(server.addr, "/api/jobs");
    assert_eq!(
        jobs,
        json!({"status": "done", "jobs": [{"job_id_1": "done"}, {"job_id_2": "done"}]})
    );

    let (_, num) = get(server.addr, "/api/num_jobs");
    assert_eq!(num, json!({"status": "done", "num_jobs": 0}));

    let (_, shutdown) = get(server.addr, "/api/graceful_shutdown");
    assert_eq!(shutdown, json!({"status": "success"}));

    let (_, rejected) = post(server.addr, "/api/global_mean", &json!({"question": OBESITY}));
    assert_eq!(
        rejected,
        json!({"status": "error", "reason": "Thread pool was shut down."})
    );

    // Los resultados siguen disponibles después del shutdown
    let (_, result) = get(server.addr, "/api/get_results/1");
    assert_eq!(result["data"], json!({"global_mean": 30.0}));
    assert!(server.dir.path().join("results").join("job_1").exists());
}
