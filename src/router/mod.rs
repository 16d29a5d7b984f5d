//! # Sistema de Routing
//! src/router/mod.rs
//!
//! Mapea (método, path) a handlers.
//!
//! ```text
//! Request → Router → Handler → Response
//! ```
//!
//! Hay dos tipos de ruta:
//! - exacta: `/api/num_jobs`
//! - por prefijo: `/api/get_results/` atiende `/api/get_results/{id}`
//!
//! Si el path existe pero con otro método se responde 405; si no existe, 404.

use crate::http::{Method, Request, Response, StatusCode};

/// Un handler recibe un Request y retorna una Response.
///
/// Son closures para que puedan capturar el estado compartido del servidor.
pub type Handler = Box<dyn Fn(&Request) -> Response + Send + Sync>;

/// Valor del header `Server`
pub const SERVER_NAME: &str = "StatsServer-HTTP/1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Matcher {
    Exact,
    Prefix,
}

struct Route {
    method: Method,
    path: String,
    matcher: Matcher,
    handler: Handler,
}

impl Route {
    fn matches_path(&self, path: &str) -> bool {
        match self.matcher {
            Matcher::Exact => self.path == path,
            Matcher::Prefix => path.starts_with(&self.path) && path.len() > self.path.len(),
        }
    }
}

/// Router que mapea métodos y paths a handlers
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Registra una ruta exacta
    ///
    /// # Ejemplo
    /// ```
    /// use stats_server::router::Router;
    /// use stats_server::http::{Method, Request, Response, StatusCode};
    ///
    /// let mut router = Router::new();
    /// router.register(Method::GET, "/hello", |_req: &Request| Response::text("hello"));
    ///
    /// let request = Request::parse(b"GET /hello HTTP/1.0\r\n\r\n").unwrap();
    /// assert_eq!(router.route(&request).status(), StatusCode::Ok);
    /// ```
    pub fn register<F>(&mut self, method: Method, path: &str, handler: F)
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        self.push(method, path, Matcher::Exact, Box::new(handler));
    }

    /// Registra una ruta que atiende todo path que empiece con `prefix`
    /// y tenga al menos un carácter más. El handler extrae el resto.
    pub fn register_prefix<F>(&mut self, method: Method, prefix: &str, handler: F)
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        self.push(method, prefix, Matcher::Prefix, Box::new(handler));
    }

    fn push(&mut self, method: Method, path: &str, matcher: Matcher, handler: Handler) {
        self.routes.push(Route {
            method,
            path: path.to_string(),
            matcher,
            handler,
        });
    }

    /// Ejecuta el handler que corresponde al request
    pub fn route(&self, request: &Request) -> Response {
        let path = request.path();
        let mut path_known = false;

        for route in &self.routes {
            if !route.matches_path(path) {
                continue;
            }
            if route.method == request.method() {
                let mut response = (route.handler)(request);
                add_common_headers(&mut response);
                return response;
            }
            path_known = true;
        }

        let mut response = if path_known {
            Response::error(StatusCode::MethodNotAllowed, "Method not allowed")
        } else {
            Response::error(StatusCode::NotFound, &format!("Route not found: {}", path))
        };
        add_common_headers(&mut response);
        response
    }

    /// Lista `METHOD path` de las rutas registradas, en orden de registro
    pub fn describe(&self) -> Vec<String> {
        self.routes
            .iter()
            .map(|route| match route.matcher {
                Matcher::Exact => format!("{} {}", route.method.as_str(), route.path),
                Matcher::Prefix => format!("{} {}<id>", route.method.as_str(), route.path),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Headers comunes a todas las respuestas
pub fn add_common_headers(response: &mut Response) {
    response.add_header("Server", SERVER_NAME);
    response.add_header("Connection", "close");
}
