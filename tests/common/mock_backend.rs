use actix_web::dev::ServerHandle;
use actix_web::http::StatusCode;
use actix_web::{App, HttpResponse, HttpServer, web};
use bytes::Bytes;
use futures::StreamExt;
use futures::stream;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Behaviour of the mock inference server.
#[derive(Clone)]
pub struct MockBackendConfig {
    /// Raw body chunks of a streaming `/api/chat` reply, sent as-is.
    pub chunks: Vec<String>,
    /// Abort the connection after the last chunk instead of ending cleanly.
    pub drop_after_chunks: bool,
    /// Status of every `/api/chat` and `/api/tags` reply.
    pub status: u16,
    /// Content of a non-streaming `/api/chat` reply.
    pub reply: String,
    pub models: Vec<String>,
}

impl Default for MockBackendConfig {
    fn default() -> Self {
        Self {
            chunks: vec![
                "{\"message\":{\"content\":\"Hel\"},\"done\":false}\n".to_string(),
                "{\"message\":{\"content\":\"lo\"},\"done\":false}\n".to_string(),
                "{\"done\":true}\n".to_string(),
            ],
            drop_after_chunks: false,
            status: 200,
            reply: "Hello".to_string(),
            models: vec!["deepseek-coder".to_string(), "llama3".to_string()],
        }
    }
}

struct MockState {
    config: MockBackendConfig,
    requests: Arc<Mutex<Vec<Value>>>,
}

pub struct MockBackend {
    pub url: String,
    requests: Arc<Mutex<Vec<Value>>>,
    handle: ServerHandle,
}

impl MockBackend {
    pub async fn start(config: MockBackendConfig) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = web::Data::new(MockState {
            config,
            requests: requests.clone(),
        });

        let server = HttpServer::new(move || {
            App::new()
                .app_data(state.clone())
                .route("/api/chat", web::post().to(chat_handler))
                .route("/api/tags", web::get().to(tags_handler))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
        let port = server.addrs()[0].port();
        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);

        Self {
            url: format!("http://127.0.0.1:{}", port),
            requests,
            handle,
        }
    }

    /// Bodies of every `/api/chat` request received so far.
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }

    pub async fn stop(self) {
        self.handle.stop(false).await;
    }
}

async fn chat_handler(body: web::Json<Value>, state: web::Data<MockState>) -> HttpResponse {
    state.requests.lock().unwrap().push(body.0.clone());
    let config = &state.config;
    if config.status != 200 {
        return HttpResponse::build(StatusCode::from_u16(config.status).unwrap())
            .json(json!({ "error": "mock failure" }));
    }

    if !body["stream"].as_bool().unwrap_or(false) {
        return HttpResponse::Ok().json(json!({
            "model": body["model"],
            "message": { "role": "assistant", "content": config.reply },
            "done": true,
        }));
    }

    let mut items: Vec<Result<Bytes, actix_web::Error>> = config
        .chunks
        .iter()
        .map(|c| Ok(Bytes::from(c.clone())))
        .collect();
    if config.drop_after_chunks {
        items.push(Err(actix_web::error::ErrorInternalServerError(
            "backend crashed",
        )));
    }
    // Pause between chunks so each one is flushed on its own.
    let body = stream::iter(items).then(|item| async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        item
    });
    HttpResponse::Ok()
        .content_type("application/x-ndjson")
        .streaming(body)
}

async fn tags_handler(state: web::Data<MockState>) -> HttpResponse {
    if state.config.status != 200 {
        return HttpResponse::build(StatusCode::from_u16(state.config.status).unwrap()).finish();
    }
    let models: Vec<Value> = state
        .config
        .models
        .iter()
        .map(|name| json!({ "name": name, "size": 1 }))
        .collect();
    HttpResponse::Ok().json(json!({ "models": models }))
}
