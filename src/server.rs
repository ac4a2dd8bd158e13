use crate::app_state::{AppState, RelayConfig};
use crate::code_gen;
use crate::io_struct::{
    ChatMessage, ChatReqInput, GenerateCodeInput, PreviewCodeInput, SaveCodeInput, SetModelInput,
};
use crate::relay;
use crate::upload::{self, UploadError};
use actix_multipart::Multipart;
use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, HttpServer, get, post, web};
use bytes::Bytes;
use futures::StreamExt;
use serde_json::json;
use std::io::Write;
use tokio_stream::wrappers::ReceiverStream;

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn error_response(message: &str) -> HttpResponse {
    HttpResponse::InternalServerError().json(json!({ "error": message }))
}

#[post("/api/chat")]
pub async fn chat(req: web::Json<ChatReqInput>, app_state: web::Data<AppState>) -> HttpResponse {
    let model = app_state.current_model();
    match app_state.backend.chat(&model, &req.messages).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => {
            log::error!("Chat error: {}", e);
            error_response("Failed to get response from Ollama")
        }
    }
}

#[post("/api/chat/stream")]
pub async fn chat_stream(
    req: web::Json<ChatReqInput>,
    app_state: web::Data<AppState>,
) -> HttpResponse {
    let model = app_state.current_model();
    let rx = relay::spawn_relay(
        app_state.backend.clone(),
        model,
        req.into_inner().messages,
        app_state.stream_buffer,
    );
    // actix drops this stream when the client disconnects, which closes
    // the channel and stops the relay task.
    let body = ReceiverStream::new(rx).map(Ok::<Bytes, actix_web::Error>);
    // No Connection header: actix owns it on HTTP/1 and keeps streams alive.
    HttpResponse::Ok()
        .content_type("text/plain")
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .insert_header((header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
        .insert_header((header::ACCESS_CONTROL_ALLOW_HEADERS, "Cache-Control"))
        .streaming(body)
}

#[get("/api/health")]
pub async fn health(app_state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "OK",
        "model": app_state.current_model(),
        "ollama_host": app_state.backend.host(),
        "timestamp": timestamp(),
    }))
}

#[get("/api/health/models")]
pub async fn list_models(app_state: web::Data<AppState>) -> HttpResponse {
    match app_state.backend.list_models().await {
        Ok(models) => HttpResponse::Ok().json(json!({ "models": models })),
        Err(e) => {
            log::error!("Failed to fetch models: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to fetch models",
                "models": [],
            }))
        }
    }
}

#[get("/api/health/model")]
pub async fn get_model(app_state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "model": app_state.current_model() }))
}

#[post("/api/health/model")]
pub async fn set_model(
    req: web::Json<SetModelInput>,
    app_state: web::Data<AppState>,
) -> HttpResponse {
    let model = match req.into_inner().model {
        Some(serde_json::Value::String(model)) if !model.trim().is_empty() => model,
        _ => {
            return HttpResponse::BadRequest().json(json!({ "error": "Model name is required" }));
        }
    };
    app_state.set_model(model.clone());
    HttpResponse::Ok().json(json!({ "success": true, "model": model }))
}

#[post("/api/code/generate")]
pub async fn generate_code(
    req: web::Json<GenerateCodeInput>,
    app_state: web::Data<AppState>,
) -> HttpResponse {
    let GenerateCodeInput { prompt, language } = req.into_inner();
    let messages = [ChatMessage::user(code_gen::generation_prompt(
        &prompt, &language,
    ))];
    let model = app_state.current_model();
    let response = match app_state.backend.chat(&model, &messages).await {
        Ok(response) => response,
        Err(e) => {
            log::error!("Code generation error: {}", e);
            return error_response("Failed to generate code");
        }
    };
    let Some(code) = response["message"]["content"].as_str() else {
        log::error!("Code generation error: backend reply carries no message content");
        return error_response("Failed to generate code");
    };
    HttpResponse::Ok().json(json!({
        "code": code,
        "language": language,
        "timestamp": timestamp(),
    }))
}

#[post("/api/code/preview")]
pub async fn preview_code(
    req: web::Json<PreviewCodeInput>,
    app_state: web::Data<AppState>,
) -> HttpResponse {
    match code_gen::write_preview(&app_state.generated_dir, &req.code, &req.language).await {
        Ok(Some(preview)) => HttpResponse::Ok().json(json!({
            "previewId": preview.id,
            "previewUrl": preview.url,
            "success": true,
        })),
        Ok(None) => HttpResponse::Ok().json(json!({
            "message": "Preview not available for this language",
            "success": false,
        })),
        Err(e) => {
            log::error!("Preview error: {}", e);
            error_response("Failed to create preview")
        }
    }
}

#[post("/api/code/save")]
pub async fn save_code(
    req: web::Json<SaveCodeInput>,
    app_state: web::Data<AppState>,
) -> HttpResponse {
    let SaveCodeInput {
        code,
        filename,
        language,
    } = req.into_inner();
    match code_gen::save_code(&app_state.generated_dir, &filename, &code, &language).await {
        Ok(saved) => HttpResponse::Ok().json(json!({
            "filename": saved.filename,
            "path": saved.path.display().to_string(),
            "success": true,
        })),
        Err(e) => {
            log::error!("Save error: {}", e);
            error_response("Failed to save code")
        }
    }
}

#[post("/api/upload")]
pub async fn upload_file(
    req: HttpRequest,
    payload: Multipart,
    app_state: web::Data<AppState>,
) -> HttpResponse {
    let is_form = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"));
    if !is_form {
        return HttpResponse::BadRequest().json(json!({ "error": "No file uploaded" }));
    }

    match upload::store_upload(&app_state.upload_dir, payload).await {
        Ok(stored) => {
            log::info!(
                "File uploaded: {} ({})",
                stored.original_name,
                stored.path.display()
            );
            HttpResponse::Ok().json(json!({ "filename": stored.original_name }))
        }
        Err(e @ (UploadError::NoFile | UploadError::InvalidType)) => {
            HttpResponse::BadRequest().json(json!({ "error": e.to_string() }))
        }
        Err(e) => {
            log::error!("Upload error: {}", e);
            error_response("File upload failed")
        }
    }
}

#[get("/generated/{name}")]
pub async fn serve_generated(
    name: web::Path<String>,
    app_state: web::Data<AppState>,
) -> HttpResponse {
    let Ok(name) = code_gen::plain_file_name(&name) else {
        return HttpResponse::NotFound().finish();
    };
    match tokio::fs::read(app_state.generated_dir.join(name)).await {
        Ok(content) => {
            let content_type = if name.ends_with(".html") {
                "text/html; charset=utf-8"
            } else {
                "text/plain; charset=utf-8"
            };
            HttpResponse::Ok().content_type(content_type).body(content)
        }
        Err(_) => HttpResponse::NotFound().finish(),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(chat)
        .service(chat_stream)
        .service(health)
        .service(list_models)
        .service(get_model)
        .service(set_model)
        .service(generate_code)
        .service(preview_code)
        .service(save_code)
        .service(upload_file)
        .service(serve_generated);
}

/// Sets up `env_logger` with timestamped lines. `RUST_LOG` overrides `level`.
pub fn init_logging(level: log::LevelFilter) {
    let _ = env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, level)
        .parse_default_env()
        .try_init();
}

pub async fn startup(config: RelayConfig, app_state: AppState) -> std::io::Result<()> {
    let app_state = web::Data::new(app_state);

    log::info!("Starting server at {}:{}", config.host, config.port);
    log::info!("Ollama host: {}", config.backend_host);
    log::info!("Model: {}", config.model);

    HttpServer::new(move || {
        actix_web::App::new()
            .wrap(actix_web::middleware::Logger::default())
            .app_data(app_state.clone())
            .configure(configure)
    })
    .bind((config.host, config.port))?
    .run()
    .await
}
