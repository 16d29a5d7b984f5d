//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! Servidor TCP que atiende múltiples conexiones simultáneas usando threads.
//! Cada conexión se procesa en su propio thread: se lee un request completo
//! (headers + body según `Content-Length`), se enruta y se cierra.

use crate::config::Config;
use crate::http::request::{content_length, find_head_end};
use crate::http::{Request, Response, StatusCode};
use crate::router::{add_common_headers, Router};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info, warn};

/// Límite para la sección de headers
const MAX_HEAD_BYTES: usize = 16 * 1024;

/// Tiempo máximo sin recibir datos de un cliente
const READ_TIMEOUT: Duration = Duration::from_secs(30);

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Servidor HTTP/1.0 concurrente
pub struct Server {
    listener: TcpListener,
    router: Arc<Router>,
    max_body_bytes: usize,
}

/// Resultado de leer un request del socket
#[derive(Debug)]
enum Incoming {
    /// El peer cerró sin enviar nada
    Closed,
    Request(Vec<u8>),
    /// Rechazado antes de parsear
    Rejected(StatusCode, String),
}

impl Server {
    /// Abre el listener en `address`
    pub fn bind(address: &str, router: Router, max_body_bytes: usize) -> io::Result<Self> {
        let listener = TcpListener::bind(address)?;
        Ok(Self {
            listener,
            router: Arc::new(router),
            max_body_bytes,
        })
    }

    /// Abre el listener en la dirección configurada
    pub fn from_config(config: &Config, router: Router) -> io::Result<Self> {
        Self::bind(&config.address(), router, config.max_body_bytes)
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Acepta conexiones indefinidamente, un thread por conexión
    pub fn run(&self) -> io::Result<()> {
        info!(address = %self.local_addr()?, "server listening (one thread per connection)");

        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    let router = Arc::clone(&self.router);
                    let max_body_bytes = self.max_body_bytes;

                    let peer = stream
                        .peer_addr()
                        .map(|addr| addr.to_string())
                        .unwrap_or_else(|_| "unknown".to_string());
                    debug!(peer = %peer, "new connection");

                    let spawned = thread::Builder::new()
                        .name("http-conn".to_string())
                        .spawn(move || {
                            if let Err(e) = handle_connection(stream, &router, max_body_bytes, READ_TIMEOUT) {
                                warn!(peer = %peer, error = %e, "connection error");
                            }
                        });

                    if let Err(e) = spawned {
                        error!(error = %e, "cannot spawn connection thread");
                    }
                }
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                }
            }
        }

        Ok(())
    }
}

/// Atiende un request completo sobre `stream`
///
/// Un cliente que deja de enviar datos durante `read_timeout` pierde la
/// conexión sin respuesta.
pub(crate) fn handle_connection(
    mut stream: TcpStream,
    router: &Router,
    max_body_bytes: usize,
    read_timeout: Duration,
) -> io::Result<()> {
    let start = Instant::now();
    let request_id = next_request_id();
    stream.set_read_timeout(Some(read_timeout))?;

    let incoming = match read_request(&mut stream, max_body_bytes) {
        Ok(incoming) => incoming,
        Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
            warn!(request_id = %request_id, "read timed out, dropping connection");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let (response, method, path) = match incoming {
        Incoming::Closed => {
            debug!("connection closed without a request");
            return Ok(());
        }
        Incoming::Rejected(status, reason) => {
            warn!(request_id = %request_id, status = status.as_u16(), reason = %reason, "request rejected");
            let mut response = Response::error(status, &reason);
            add_common_headers(&mut response);
            (response, "-".to_string(), "-".to_string())
        }
        Incoming::Request(buffer) => match Request::parse(&buffer) {
            Ok(request) => {
                let response = router.route(&request);
                (response, request.method().as_str().to_string(), request.path().to_string())
            }
            Err(e) => {
                warn!(request_id = %request_id, error = %e, "parse error");
                let mut response = Response::error(StatusCode::BadRequest, &format!("Invalid request: {}", e));
                add_common_headers(&mut response);
                (response, "-".to_string(), "-".to_string())
            }
        },
    };

    let mut response = response;
    response.add_header("X-Request-Id", &request_id);

    stream.write_all(&response.to_bytes())?;
    stream.flush()?;

    info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = %format!("{:.2}", start.elapsed().as_secs_f64() * 1000.0),
        "request handled"
    );

    Ok(())
}

/// Lee headers hasta `\r\n\r\n` y luego el body según `Content-Length`
fn read_request<R: Read>(stream: &mut R, max_body_bytes: usize) -> io::Result<Incoming> {
    let mut buffer = Vec::with_capacity(1024);
    let mut chunk = [0u8; 4096];

    // Headers
    let head_end = loop {
        if let Some(end) = find_head_end(&buffer) {
            break end;
        }
        if buffer.len() > MAX_HEAD_BYTES {
            return Ok(Incoming::Rejected(
                StatusCode::BadRequest,
                "Request headers too large".to_string(),
            ));
        }

        let n = stream.read(&mut chunk)?;
        if n == 0 {
            // EOF: el parser decide si lo recibido es válido
            return Ok(if buffer.is_empty() {
                Incoming::Closed
            } else {
                Incoming::Request(buffer)
            });
        }
        buffer.extend_from_slice(&chunk[..n]);
    };

    // Body
    let expected = content_length(&buffer[..head_end]).unwrap_or(0);
    if expected > max_body_bytes {
        return Ok(Incoming::Rejected(
            StatusCode::PayloadTooLarge,
            format!("Request body exceeds {} bytes", max_body_bytes),
        ));
    }

    let total = head_end + 4 + expected;
    while buffer.len() < total {
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            return Ok(Incoming::Rejected(
                StatusCode::BadRequest,
                "Incomplete HTTP request".to_string(),
            ));
        }
        buffer.extend_from_slice(&chunk[..n]);
    }
    buffer.truncate(total);

    Ok(Incoming::Request(buffer))
}

/// Id corto para correlacionar logs y respuesta
fn next_request_id() -> String {
    let mut hasher = DefaultHasher::new();
    REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed).hash(&mut hasher);
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0)
        .hash(&mut hasher);
    thread::current().id().hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;
    use std::io::Cursor;
    use std::net::Shutdown;

    fn ephemeral_listener() -> TcpListener {
        TcpListener::bind("127.0.0.1:0").expect("bind")
    }

    fn echo_router() -> Router {
        let mut router = Router::new();
        router.register(Method::GET, "/hello", |_req: &Request| Response::text("hello"));
        router.register(Method::POST, "/echo", |req: &Request| {
            Response::new(StatusCode::Ok).with_body(req.body().to_vec())
        });
        router
    }

    /// Atiende una conexión en un thread y devuelve la respuesta cruda
    fn roundtrip(raw: &[u8], max_body_bytes: usize) -> String {
        let listener = ephemeral_listener();
        let addr = listener.local_addr().unwrap();
        let router = echo_router();

        let t = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            handle_connection(stream, &router, max_body_bytes, READ_TIMEOUT).unwrap();
        });

        let mut client = TcpStream::connect(addr).unwrap();
        client.write_all(raw).unwrap();
        client.shutdown(Shutdown::Write).unwrap();

        let mut buf = Vec::new();
        client.read_to_end(&mut buf).unwrap();
        t.join().unwrap();
        String::from_utf8_lossy(&buf).to_string()
    }

    #[test]
    fn test_handle_connection_ok() {
        let text = roundtrip(b"GET /hello HTTP/1.0\r\n\r\n", 1024);

        assert!(text.starts_with("HTTP/1.0 200 OK"));
        assert!(text.contains("X-Request-Id:"));
        assert!(text.contains("Connection: close"));
        assert!(text.ends_with("hello"));
    }

    #[test]
    fn test_handle_connection_reads_body() {
        let text = roundtrip(b"POST /echo HTTP/1.0\r\nContent-Length: 11\r\n\r\n{\"a\": true}", 1024);
        assert!(text.ends_with("{\"a\": true}"));
    }

    #[test]
    fn test_handle_connection_body_too_large() {
        let text = roundtrip(b"POST /echo HTTP/1.0\r\nContent-Length: 100\r\n\r\n", 10);
        assert!(text.starts_with("HTTP/1.0 413 Payload Too Large"));
    }

    #[test]
    fn test_handle_connection_parse_error() {
        let text = roundtrip(b"\x00\x01\x02\x03garbage", 1024);

        assert!(text.contains("400 Bad Request"));
        assert!(text.contains("Invalid request:"));
    }

    #[test]
    fn test_handle_connection_truncated_body() {
        let text = roundtrip(b"POST /echo HTTP/1.0\r\nContent-Length: 50\r\n\r\nshort", 1024);
        assert!(text.contains("400 Bad Request"));
    }

    #[test]
    fn test_handle_connection_peer_closed_immediately() {
        let listener = ephemeral_listener();
        let addr = listener.local_addr().unwrap();
        let router = echo_router();

        let t = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            handle_connection(stream, &router, 1024, READ_TIMEOUT).unwrap();
        });

        drop(TcpStream::connect(addr).unwrap());
        t.join().unwrap();
    }

    #[test]
    fn test_handle_connection_idle_client_times_out() {
        let listener = ephemeral_listener();
        let addr = listener.local_addr().unwrap();
        let router = echo_router();

        let t = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let start = Instant::now();
            handle_connection(stream, &router, 1024, Duration::from_millis(100)).unwrap();
            start.elapsed()
        });

        // Conecta y no envía nada, sin cerrar el socket
        let mut client = TcpStream::connect(addr).unwrap();
        let elapsed = t.join().unwrap();
        assert!(elapsed < Duration::from_secs(5));

        // El servidor cerró sin responder
        client.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let mut buf = Vec::new();
        client.read_to_end(&mut buf).unwrap();
        assert!(buf.is_empty());
    }

    #[test]
    fn test_handle_connection_partial_head_times_out() {
        let listener = ephemeral_listener();
        let addr = listener.local_addr().unwrap();
        let router = echo_router();

        let t = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            handle_connection(stream, &router, 1024, Duration::from_millis(100)).unwrap();
        });

        let mut client = TcpStream::connect(addr).unwrap();
        client.write_all(b"GET /hello HTTP/1.0\r\n").unwrap();
        t.join().unwrap();
    }

    #[test]
    fn test_read_request_split_chunks() {
        let mut cursor = Cursor::new(b"POST /echo HTTP/1.0\r\nContent-Length: 3\r\n\r\nabcEXTRA".to_vec());
        match read_request(&mut cursor, 1024).unwrap() {
            Incoming::Request(buffer) => assert!(buffer.ends_with(b"\r\n\r\nabc")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = next_request_id();
        let b = next_request_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn test_server_bind_ephemeral() {
        let server = Server::bind("127.0.0.1:0", echo_router(), 1024).unwrap();
        assert_ne!(server.local_addr().unwrap().port(), 0);
    }
}
