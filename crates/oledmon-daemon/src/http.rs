//! HTTP monitor
//!
//! Minimal HTTP/1.1 over a tokio TCP listener: one request per connection,
//! answered and closed. Routes:
//!
//! - `GET /` - registered displays as `[{name, id}]`
//! - `GET /devices/<id>` - status JSON
//! - `GET /devices/<id>/screen` - 64 lines of 128 `#`/`.` characters, with
//!   the capture time of that same snapshot in `X-Snapshot-Timestamp`
//! - `POST /devices/<id>/contrast/<0-255>` - set contrast, returns status
//! - `POST /devices/<id>/invert/<true|false>` - set polarity, returns status

use crate::monitor::{MonitorError, Registry};
use oledmon_hal::{Bus, DisplayError};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

/// Longest request or header line accepted
const MAX_LINE: u64 = 8 * 1024;
/// Headers read (and discarded) before giving up on a request
const MAX_HEADERS: usize = 64;
/// Time a client gets to send its request line and headers
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl Response {
    pub fn json<T: Serialize>(value: &T) -> Self {
        match serde_json::to_string_pretty(value) {
            Ok(body) => Self {
                status: 200,
                content_type: "application/json",
                headers: Vec::new(),
                body,
            },
            Err(e) => Self::error(500, &e.to_string()),
        }
    }

    pub fn text(body: String) -> Self {
        Self {
            status: 200,
            content_type: "text/plain; charset=utf-8",
            headers: Vec::new(),
            body,
        }
    }

    pub fn with_header(mut self, name: &'static str, value: String) -> Self {
        self.headers.push((name, value));
        self
    }

    pub fn error(status: u16, message: &str) -> Self {
        let body = serde_json::to_string(&ErrorBody { error: message })
            .unwrap_or_else(|_| String::from("{}"));
        Self {
            status,
            content_type: "application/json",
            headers: Vec::new(),
            body,
        }
    }

    fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            400 => "Bad Request",
            404 => "Not Found",
            405 => "Method Not Allowed",
            408 => "Request Timeout",
            409 => "Conflict",
            500 => "Internal Server Error",
            502 => "Bad Gateway",
            503 => "Service Unavailable",
            _ => "Unknown",
        }
    }

    /// Serialized status line, headers and body
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\n",
            self.status,
            self.reason(),
            self.content_type,
            self.body.len(),
        );
        for (name, value) in &self.headers {
            head.push_str(&format!("{}: {}\r\n", name, value));
        }
        head.push_str("Connection: close\r\n\r\n");
        head.push_str(&self.body);
        head.into_bytes()
    }
}

impl From<MonitorError> for Response {
    fn from(err: MonitorError) -> Self {
        let status = match &err {
            MonitorError::UnknownDevice(_) => 404,
            MonitorError::InvalidRequest(_) => 400,
            MonitorError::Display(DisplayError::InvalidArgument(_)) => 400,
            MonitorError::Display(DisplayError::Transport(_)) => 502,
            MonitorError::Display(DisplayError::NotInitialized(_)) => 409,
            MonitorError::DuplicateDevice(_) => 409,
            MonitorError::Unavailable(_) => 503,
        };
        Response::error(status, &err.to_string())
    }
}

fn parse_invert(value: &str) -> Result<bool, MonitorError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "on" => Ok(true),
        "false" | "0" | "off" => Ok(false),
        _ => Err(MonitorError::InvalidRequest(format!(
            "invert must be true or false, got {:?}",
            value
        ))),
    }
}

fn parse_level(value: &str) -> Result<u8, MonitorError> {
    value.parse::<u8>().map_err(|_| {
        MonitorError::InvalidRequest(format!("contrast must be 0-255, got {:?}", value))
    })
}

/// Run a blocking registry mutation off the async workers
async fn mutate<B, F>(registry: Arc<Registry<B>>, f: F) -> Response
where
    B: Bus + Send + 'static,
    F: FnOnce(&Registry<B>) -> Result<crate::monitor::DeviceStatus, MonitorError> + Send + 'static,
{
    match tokio::task::spawn_blocking(move || f(&registry)).await {
        Ok(Ok(status)) => Response::json(&status),
        Ok(Err(e)) => e.into(),
        Err(e) => Response::error(500, &e.to_string()),
    }
}

/// Dispatch one request
pub async fn route<B: Bus + Send + 'static>(
    registry: Arc<Registry<B>>,
    method: &str,
    path: &str,
) -> Response {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match (method, segments.as_slice()) {
        ("GET", []) => Response::json(&registry.devices()),
        ("GET", ["devices", id]) => match registry.status(id) {
            Ok(status) => Response::json(&status),
            Err(e) => e.into(),
        },
        ("GET", ["devices", id, "screen"]) => match registry.screen(id) {
            Ok(Some(snapshot)) => Response::text(snapshot.to_ascii())
                .with_header("X-Snapshot-Timestamp", snapshot.timestamp_ms.to_string()),
            Ok(None) => Response::error(503, &format!("No frame pushed to {} yet", id)),
            Err(e) => e.into(),
        },
        ("POST", ["devices", id, "contrast", value]) => {
            let level = match parse_level(value) {
                Ok(level) => level,
                Err(e) => return e.into(),
            };
            let id = id.to_string();
            mutate(registry, move |r| r.set_contrast(&id, level)).await
        }
        ("POST", ["devices", id, "invert", value]) => {
            let invert = match parse_invert(value) {
                Ok(invert) => invert,
                Err(e) => return e.into(),
            };
            let id = id.to_string();
            mutate(registry, move |r| r.set_invert(&id, invert)).await
        }
        (_, [] | ["devices", _] | ["devices", _, "screen"])
        | (_, ["devices", _, "contrast" | "invert", _]) => {
            Response::error(405, &format!("{} not allowed on {}", method, path))
        }
        _ => Response::error(404, &format!("No route for {}", path)),
    }
}

async fn read_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> std::io::Result<String> {
    let mut line = String::new();
    (&mut *reader).take(MAX_LINE).read_line(&mut line).await?;
    Ok(line)
}

enum Request {
    /// Peer closed without sending anything
    Closed,
    Malformed,
    Line { method: String, path: String },
}

/// Read the request line and skip the headers
async fn read_request<R: AsyncBufRead + Unpin>(reader: &mut R) -> std::io::Result<Request> {
    let request_line = read_line(reader).await?;
    if request_line.is_empty() {
        return Ok(Request::Closed);
    }

    let mut headers_ok = request_line.ends_with('\n');
    for _ in 0..MAX_HEADERS {
        let line = read_line(reader).await?;
        if line.is_empty() || line == "\r\n" || line == "\n" {
            break;
        }
        if !line.ends_with('\n') {
            headers_ok = false;
            break;
        }
    }

    let mut parts = request_line.split_whitespace();
    Ok(match (parts.next(), parts.next(), parts.next()) {
        (Some(method), Some(path), Some(version)) if headers_ok && version.starts_with("HTTP/") => {
            Request::Line {
                method: method.to_string(),
                path: path.to_string(),
            }
        }
        _ => Request::Malformed,
    })
}

/// Read one request from `stream`, answer it and close
async fn handle_connection<B: Bus + Send + 'static>(
    registry: Arc<Registry<B>>,
    stream: TcpStream,
    timeout: Duration,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream);

    let response = match tokio::time::timeout(timeout, read_request(&mut reader)).await {
        Ok(Ok(Request::Closed)) => return Ok(()),
        Ok(Ok(Request::Malformed)) => Response::error(400, "Malformed request"),
        Ok(Ok(Request::Line { method, path })) => {
            tracing::debug!("{} {}", method, path);
            route(registry, &method, &path).await
        }
        Ok(Err(e)) => return Err(e),
        Err(_) => Response::error(408, "Request not received in time"),
    };

    let mut stream = reader.into_inner();
    stream.write_all(&response.to_bytes()).await?;
    stream.shutdown().await
}

/// Accept connections until `shutdown` turns true or its sender is dropped
pub async fn serve<B: Bus + Send + 'static>(
    registry: Arc<Registry<B>>,
    listener: TcpListener,
    shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    serve_with_timeout(registry, listener, shutdown, REQUEST_TIMEOUT).await
}

/// [`serve`] with a custom deadline for reading each request
pub async fn serve_with_timeout<B: Bus + Send + 'static>(
    registry: Arc<Registry<B>>,
    listener: TcpListener,
    mut shutdown: watch::Receiver<bool>,
    timeout: Duration,
) -> std::io::Result<()> {
    tracing::info!("Monitor listening on http://{}", listener.local_addr()?);

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let registry = Arc::clone(&registry);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(registry, stream, timeout).await {
                            tracing::debug!("Connection from {} failed: {}", peer, e);
                        }
                    });
                }
                Err(e) => tracing::warn!("Accept failed: {}", e),
            },
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    tracing::info!("Monitor stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use oledmon_hal::mock::MockBus;
    use oledmon_hal::{FRAME_BYTES, Ssd1306};
    use std::sync::Mutex;

    fn registry() -> (Arc<Registry<MockBus>>, String, crate::SharedDisplay<MockBus>) {
        let mut display = Ssd1306::new(MockBus::named("panel"));
        display.init().unwrap();
        let display = Arc::new(Mutex::new(display));
        let mut registry = Registry::new();
        let id = registry.register(Arc::clone(&display)).unwrap();
        (Arc::new(registry), id, display)
    }

    #[tokio::test]
    async fn test_list_devices() {
        let (registry, id, _) = registry();
        let response = route(registry, "GET", "/").await;
        assert_eq!(response.status, 200);

        let list: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(list[0]["name"], "panel");
        assert_eq!(list[0]["id"], id.as_str());
    }

    #[tokio::test]
    async fn test_status_and_unknown() {
        let (registry, id, _) = registry();

        let response = route(Arc::clone(&registry), "GET", &format!("/devices/{}", id)).await;
        assert_eq!(response.status, 200);
        let status: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(status["invert"], false);

        let response = route(registry, "GET", "/devices/00000000").await;
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_screen() {
        let (registry, id, display) = registry();
        let path = format!("/devices/{}/screen", id);

        assert_eq!(route(Arc::clone(&registry), "GET", &path).await.status, 503);

        display.lock().unwrap().push_frame(&[0xFF; FRAME_BYTES]).unwrap();
        let response = route(registry, "GET", &path).await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body.lines().count(), 64);
        assert!(response.body.lines().all(|l| l == "#".repeat(128)));

        let snapshot = display.lock().unwrap().telemetry().screen().unwrap();
        assert_eq!(
            response.headers,
            vec![("X-Snapshot-Timestamp", snapshot.timestamp_ms.to_string())]
        );
    }

    #[tokio::test]
    async fn test_mutations() {
        let (registry, id, display) = registry();

        let response = route(
            Arc::clone(&registry),
            "POST",
            &format!("/devices/{}/contrast/255", id),
        )
        .await;
        assert_eq!(response.status, 200);
        assert_eq!(display.lock().unwrap().contrast(), 1.0);

        let response = route(
            Arc::clone(&registry),
            "POST",
            &format!("/devices/{}/invert/true", id),
        )
        .await;
        assert_eq!(response.status, 200);
        assert!(display.lock().unwrap().invert());
    }

    #[tokio::test]
    async fn test_bad_values() {
        let (registry, id, display) = registry();
        display.lock().unwrap().bus_mut().clear();

        for path in [
            format!("/devices/{}/contrast/256", id),
            format!("/devices/{}/contrast/-1", id),
            format!("/devices/{}/invert/maybe", id),
        ] {
            let response = route(Arc::clone(&registry), "POST", &path).await;
            assert_eq!(response.status, 400, "{}", path);
        }
        assert!(display.lock().unwrap().bus().frames().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_is_bad_gateway() {
        let (registry, id, display) = registry();
        display.lock().unwrap().bus_mut().fail_on(1);

        let response = route(registry, "POST", &format!("/devices/{}/invert/1", id)).await;
        assert_eq!(response.status, 502);
    }

    #[tokio::test]
    async fn test_method_and_route_errors() {
        let (registry, id, _) = registry();
        assert_eq!(route(Arc::clone(&registry), "POST", "/").await.status, 405);
        assert_eq!(
            route(Arc::clone(&registry), "GET", &format!("/devices/{}/invert/1", id))
                .await
                .status,
            405
        );
        assert_eq!(route(registry, "GET", "/nope").await.status, 404);
    }

    #[test]
    fn test_response_bytes() {
        let response = Response::text("hi".to_string());
        let raw = String::from_utf8(response.to_bytes()).unwrap();
        assert!(raw.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(raw.contains("Content-Length: 2\r\n"));
        assert!(raw.ends_with("\r\n\r\nhi"));

        let raw = String::from_utf8(
            Response::text(String::new())
                .with_header("X-Snapshot-Timestamp", "42".to_string())
                .to_bytes(),
        )
        .unwrap();
        assert!(raw.contains("\r\nX-Snapshot-Timestamp: 42\r\n"));
    }

    #[tokio::test]
    async fn test_idle_client_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut client = TcpStream::connect(addr).await.unwrap();
        let (stream, _) = listener.accept().await.unwrap();

        // Request line without the terminating blank line, then silence
        client.write_all(b"GET / HTTP/1.1\r\n").await.unwrap();
        let registry: Arc<Registry<MockBus>> = Arc::new(Registry::new());
        handle_connection(registry, stream, Duration::from_millis(50))
            .await
            .unwrap();

        let mut raw = String::new();
        client.read_to_string(&mut raw).await.unwrap();
        assert!(raw.starts_with("HTTP/1.1 408"));
    }
}
