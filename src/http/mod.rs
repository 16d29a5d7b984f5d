//! # Módulo HTTP
//! src/http/mod.rs
//!
//! Protocolo HTTP/1.0 implementado sobre `TcpStream`:
//!
//! - Parsing de requests (request line, headers y body por `Content-Length`)
//! - Construcción de responses con bodies JSON
//! - Códigos de estado
//!
//! Cada conexión atiende un solo request y se cierra (`Connection: close`).

pub mod request;
pub mod response;
pub mod status;

pub use request::{Method, ParseError, Request};
pub use response::Response;
pub use status::StatusCode;
