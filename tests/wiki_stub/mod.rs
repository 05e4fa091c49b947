use std::collections::HashMap;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

pub static PIXEL_PNG: &[u8] = &[
    137, 80, 78, 71, 13, 10, 26, 10, 0, 0, 0, 13, 73, 72, 68, 82, 0, 0, 0, 1, 0, 0, 0, 1, 8, 4, 0,
    0, 0, 181, 28, 12, 2, 0, 0, 0, 11, 73, 68, 65, 84, 120, 218, 99, 252, 255, 23, 0, 2, 3, 1, 128,
    110, 220, 25, 0, 0, 0, 0, 73, 69, 78, 68, 174, 66, 96, 130,
];

#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status: u16,
    pub body: Vec<u8>,
    pub content_type: &'static str,
}

impl StubResponse {
    pub fn json(value: serde_json::Value) -> Self {
        Self {
            status: 200,
            body: value.to_string().into_bytes(),
            content_type: "application/json",
        }
    }

    pub fn png(bytes: &[u8]) -> Self {
        Self {
            status: 200,
            body: bytes.to_vec(),
            content_type: "image/png",
        }
    }

    /// Arbitrary status with a raw body, for error and garbage responses.
    pub fn raw(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.as_bytes().to_vec(),
            content_type: "application/json",
        }
    }
}

/// One received request: URL (with query) and its `Authorization` header.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub authorization: Option<String>,
}

type Routes = Arc<Mutex<HashMap<String, StubResponse>>>;

/// Minimal wiki REST API: fixed routes keyed by path (query ignored), and a
/// 401 for any request without the expected bearer token. A public stub
/// (no expected token) plays a third-party image host.
pub struct WikiStub {
    pub base_url: String,
    routes: Routes,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl WikiStub {
    pub fn spawn(expected_token: &str) -> Self {
        Self::start(Some(format!("Bearer {expected_token}")))
    }

    pub fn spawn_public() -> Self {
        Self::start(None)
    }

    fn start(expected_auth: Option<String>) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start wiki stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}");

        let routes: Routes = Arc::new(Mutex::new(HashMap::new()));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let thread_routes = Arc::clone(&routes);
        let thread_requests = Arc::clone(&requests);
        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let url = request.url().to_string();
                let authorization = request
                    .headers()
                    .iter()
                    .find(|header| header.field.equiv("Authorization"))
                    .map(|header| header.value.as_str().to_owned());
                thread_requests
                    .lock()
                    .expect("lock requests")
                    .push(RecordedRequest {
                        url: url.clone(),
                        authorization: authorization.clone(),
                    });

                let authorized = match &expected_auth {
                    Some(expected) => authorization.as_deref() == Some(expected.as_str()),
                    None => true,
                };
                if !authorized {
                    let _ = request.respond(
                        tiny_http::Response::from_string(r#"{"message":"unauthorized"}"#)
                            .with_status_code(401),
                    );
                    continue;
                }

                let path = url.split('?').next().unwrap_or(&url).to_owned();
                let route = thread_routes.lock().expect("lock routes").get(&path).cloned();
                let Some(route) = route else {
                    let _ = request.respond(
                        tiny_http::Response::from_string("not found").with_status_code(404),
                    );
                    continue;
                };

                let header = tiny_http::Header::from_bytes(
                    &b"Content-Type"[..],
                    route.content_type.as_bytes(),
                )
                .expect("build header");
                let response = tiny_http::Response::from_data(route.body)
                    .with_status_code(route.status)
                    .with_header(header);
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            routes,
            requests,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn route(&self, path: &str, response: StubResponse) {
        self.routes
            .lock()
            .expect("lock routes")
            .insert(path.to_owned(), response);
    }

    /// Serves `GET /rest/api/content/{id}` with a rendered body.
    pub fn page(&self, id: &str, title: &str, view_html: &str) {
        self.route(
            &format!("/rest/api/content/{id}"),
            StubResponse::json(serde_json::json!({
                "id": id,
                "type": "page",
                "title": title,
                "body": {
                    "storage": { "value": "<p>storage</p>", "representation": "storage" },
                    "view": { "value": view_html, "representation": "view" }
                },
                "version": { "number": 1 }
            })),
        );
    }

    pub fn page_url(&self, id: &str) -> String {
        format!("{}/pages/viewpage.action?pageId={id}", self.base_url)
    }

    pub fn requests(&self) -> Vec<String> {
        self.recorded()
            .into_iter()
            .map(|request| request.url)
            .collect()
    }

    pub fn recorded(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("lock requests").clone()
    }
}

impl Drop for WikiStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
