pub mod mock_backend;

use sgl_chat_relay_rs::app_state::{AppState, RelayConfig};
use std::path::Path;

/// App state pointed at `backend_host`, writing generated files below
/// `generated_dir` and uploads to its `uploads` subdirectory.
pub fn test_state(backend_host: &str, generated_dir: &Path) -> AppState {
    AppState::new(RelayConfig {
        backend_host: backend_host.to_string(),
        timeout: 5,
        stream_buffer: 8,
        generated_dir: generated_dir.to_path_buf(),
        upload_dir: generated_dir.join("uploads"),
        ..RelayConfig::default()
    })
    .unwrap()
}

/// A local URL nothing is listening on.
pub fn unreachable_backend() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}
