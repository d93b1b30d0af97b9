//! Detection API.
//!
//! Serves `GET /api/detections` with the most recently published detection set
//! as a JSON array. Cross-origin reads are allowed from any origin, GET only,
//! with any request headers. Each connection is handled on its own thread.

use crate::store::DetectionStore;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

const MAX_REQUEST_BYTES: usize = 8192;
const DETECTIONS_PATH: &str = "/api/detections";
const CORS_MAX_AGE_SECS: u32 = 600;

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub addr: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8500".to_string(),
        }
    }
}

#[derive(Debug)]
pub struct ApiHandle {
    pub addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl ApiHandle {
    /// Stop accepting connections. In-flight requests finish on their own threads.
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("api server thread panicked"))?;
        }
        Ok(())
    }
}

pub struct ApiServer {
    cfg: ApiConfig,
    store: Arc<DetectionStore>,
}

impl ApiServer {
    pub fn new(cfg: ApiConfig, store: Arc<DetectionStore>) -> Self {
        Self { cfg, store }
    }

    pub fn spawn(self) -> Result<ApiHandle> {
        let configured_addr: SocketAddr = self
            .cfg
            .addr
            .parse()
            .map_err(|e| anyhow!("invalid api addr '{}': {}", self.cfg.addr, e))?;
        let listener = TcpListener::bind(configured_addr)?;
        let addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_thread = shutdown.clone();
        let store = self.store;
        let join = std::thread::Builder::new()
            .name("api".to_string())
            .spawn(move || {
                if let Err(err) = run_api(listener, store, shutdown_thread) {
                    log::error!("detection api stopped: {}", err);
                }
            })?;

        Ok(ApiHandle {
            addr,
            shutdown,
            join: Some(join),
        })
    }
}

fn run_api(
    listener: TcpListener,
    store: Arc<DetectionStore>,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match listener.accept() {
            Ok((stream, peer)) => {
                let store = store.clone();
                std::thread::spawn(move || {
                    if let Err(err) = handle_connection(stream, &store) {
                        log::warn!("detection api request from {} rejected: {}", peer, err);
                    }
                });
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(20));
                continue;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn handle_connection(mut stream: TcpStream, store: &DetectionStore) -> Result<()> {
    // Some platforms hand out accepted sockets inheriting the listener's non-blocking mode.
    stream.set_nonblocking(false)?;
    let request = read_request(&mut stream)?;
    let response = route(&request, store)?;
    response.write_to(&mut stream)
}

fn route(request: &HttpRequest, store: &DetectionStore) -> Result<Response> {
    if request.method == "OPTIONS" && request.header("access-control-request-method").is_some() {
        return Ok(preflight(request));
    }

    let mut response = if request.path != DETECTIONS_PATH {
        Response::json(404, r#"{"error":"not_found"}"#.as_bytes().to_vec())
    } else if request.method != "GET" {
        Response::json(405, r#"{"error":"method_not_allowed"}"#.as_bytes().to_vec())
            .with_header("Allow", "GET")
    } else {
        let snapshot = store.snapshot();
        Response::json(200, serde_json::to_vec(&*snapshot)?)
    };

    if request.header("origin").is_some() {
        response = response.with_header("Access-Control-Allow-Origin", "*");
    }
    Ok(response)
}

fn preflight(request: &HttpRequest) -> Response {
    let requested_method = request
        .header("access-control-request-method")
        .unwrap_or_default();
    if !requested_method.eq_ignore_ascii_case("GET") {
        return Response::text(400, "Disallowed CORS method");
    }
    let mut response = Response::text(200, "OK")
        .with_header("Access-Control-Allow-Origin", "*")
        .with_header("Access-Control-Allow-Methods", "GET")
        .with_header("Access-Control-Max-Age", &CORS_MAX_AGE_SECS.to_string());
    if let Some(headers) = request.header("access-control-request-headers") {
        response = response.with_header("Access-Control-Allow-Headers", headers);
    }
    response
}

fn read_request(stream: &mut TcpStream) -> Result<HttpRequest> {
    stream.set_read_timeout(Some(Duration::from_secs(2)))?;
    let mut buf = [0u8; 1024];
    let mut data = Vec::new();
    loop {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
        if data.len() > MAX_REQUEST_BYTES {
            Response::json(413, r#"{"error":"request_too_large"}"#.as_bytes().to_vec())
                .write_to(stream)?;
            return Err(anyhow!("request too large"));
        }
        if data.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    parse_request(&data)
}

fn parse_request(data: &[u8]) -> Result<HttpRequest> {
    let text = String::from_utf8_lossy(data);
    let mut lines = text.split("\r\n");
    let request_line = lines.next().ok_or_else(|| anyhow!("empty request"))?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().ok_or_else(|| anyhow!("missing method"))?;
    let raw_path = parts.next().ok_or_else(|| anyhow!("missing path"))?;
    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((k, v)) = line.split_once(':') {
            headers.insert(k.trim().to_lowercase(), v.trim().to_string());
        }
    }
    let path = raw_path.split('?').next().unwrap_or(raw_path).to_string();
    Ok(HttpRequest {
        method: method.to_string(),
        path,
        headers,
    })
}

#[derive(Debug)]
struct HttpRequest {
    method: String,
    path: String,
    headers: HashMap<String, String>,
}

impl HttpRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

#[derive(Debug)]
struct Response {
    status: u16,
    content_type: &'static str,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Response {
    fn json(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type: "application/json",
            headers: Vec::new(),
            body,
        }
    }

    fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            headers: Vec::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    fn write_to(&self, stream: &mut TcpStream) -> Result<()> {
        let status_line = match self.status {
            200 => "HTTP/1.1 200 OK",
            400 => "HTTP/1.1 400 Bad Request",
            404 => "HTTP/1.1 404 Not Found",
            405 => "HTTP/1.1 405 Method Not Allowed",
            413 => "HTTP/1.1 413 Payload Too Large",
            _ => "HTTP/1.1 500 Internal Server Error",
        };
        let mut header = format!(
            "{status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {len}\r\nCache-Control: no-store\r\nConnection: close\r\n",
            status_line = status_line,
            content_type = self.content_type,
            len = self.body.len()
        );
        for (name, value) in &self.headers {
            header.push_str(&format!("{}: {}\r\n", name, value));
        }
        header.push_str("\r\n");
        stream.write_all(header.as_bytes())?;
        stream.write_all(&self.body)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{ColorClass, Detection};

    fn request(raw: &str) -> HttpRequest {
        parse_request(raw.as_bytes()).unwrap()
    }

    fn header<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
        response
            .headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn parses_method_path_and_headers() {
        let req = request("GET /api/detections?x=1 HTTP/1.1\r\nHost: a\r\nOrigin: http://ui\r\n\r\n");
        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/api/detections");
        assert_eq!(req.header("origin"), Some("http://ui"));
        assert_eq!(req.header("host"), Some("a"));
    }

    #[test]
    fn rejects_empty_request() {
        assert!(parse_request(b"").is_err());
    }

    #[test]
    fn get_returns_current_snapshot() {
        let store = DetectionStore::new();
        store.publish(vec![Detection {
            id: "red_5".to_string(),
            color: ColorClass::Red,
            confidence: 95.0,
            x: 1,
            y: 2,
            width: 3,
            height: 4,
            timestamp: "01:02:03".to_string(),
        }]);
        let response = route(&request("GET /api/detections HTTP/1.1\r\n\r\n"), &store).unwrap();
        assert_eq!(response.status, 200);
        let value: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(value[0]["id"], "red_5");
        assert_eq!(header(&response, "Access-Control-Allow-Origin"), None);
    }

    #[test]
    fn cross_origin_get_is_allowed() {
        let store = DetectionStore::new();
        let response = route(
            &request("GET /api/detections HTTP/1.1\r\nOrigin: http://localhost:3000\r\n\r\n"),
            &store,
        )
        .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"[]");
        assert_eq!(header(&response, "Access-Control-Allow-Origin"), Some("*"));
    }

    #[test]
    fn preflight_allows_get_with_any_headers() {
        let store = DetectionStore::new();
        let response = route(
            &request(
                "OPTIONS /api/detections HTTP/1.1\r\nOrigin: http://ui\r\nAccess-Control-Request-Method: GET\r\nAccess-Control-Request-Headers: x-custom, content-type\r\n\r\n",
            ),
            &store,
        )
        .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(header(&response, "Access-Control-Allow-Methods"), Some("GET"));
        assert_eq!(
            header(&response, "Access-Control-Allow-Headers"),
            Some("x-custom, content-type")
        );
    }

    #[test]
    fn preflight_rejects_other_methods() {
        let store = DetectionStore::new();
        let response = route(
            &request(
                "OPTIONS /api/detections HTTP/1.1\r\nOrigin: http://ui\r\nAccess-Control-Request-Method: POST\r\n\r\n",
            ),
            &store,
        )
        .unwrap();
        assert_eq!(response.status, 400);
    }

    #[test]
    fn non_get_methods_are_not_allowed() {
        let store = DetectionStore::new();
        let response = route(&request("POST /api/detections HTTP/1.1\r\n\r\n"), &store).unwrap();
        assert_eq!(response.status, 405);
        assert_eq!(header(&response, "Allow"), Some("GET"));
    }

    #[test]
    fn unknown_paths_are_not_found() {
        let store = DetectionStore::new();
        let response = route(&request("GET /events HTTP/1.1\r\n\r\n"), &store).unwrap();
        assert_eq!(response.status, 404);
    }
}
