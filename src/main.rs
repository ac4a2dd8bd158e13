use clap::Parser;
use sgl_chat_relay_rs::app_state::{AppState, RelayConfig};
use sgl_chat_relay_rs::server::{init_logging, startup};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sgl-chat-relay")]
#[command(about = "Chat relay between a browser front-end and a local inference server")]
struct CliArgs {
    /// Address to listen on
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3001)]
    port: u16,

    /// Base URL of the inference server
    #[arg(long, env = "OLLAMA_HOST", default_value = "http://localhost:11434")]
    backend_host: String,

    /// Model used until one is selected through the API
    #[arg(long, env = "MODEL", default_value = "deepseek-coder")]
    model: String,

    /// Upper bound in seconds for one whole backend exchange
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,

    /// Encoded events buffered per stream before the backend is paused
    #[arg(long, default_value_t = 32)]
    stream_buffer: usize,

    /// Directory for previews and saved code
    #[arg(long, default_value = "generated")]
    generated_dir: PathBuf,

    /// Directory receiving uploaded files
    #[arg(long, default_value = "uploads")]
    upload_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl CliArgs {
    fn to_relay_config(&self) -> RelayConfig {
        RelayConfig {
            host: self.host.clone(),
            port: self.port,
            backend_host: self.backend_host.clone(),
            model: self.model.clone(),
            timeout: self.timeout_secs,
            stream_buffer: self.stream_buffer,
            generated_dir: self.generated_dir.clone(),
            upload_dir: self.upload_dir.clone(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let level = args
        .log_level
        .parse::<log::LevelFilter>()
        .map_err(|_| anyhow::anyhow!("Invalid log level: {}", args.log_level))?;
    init_logging(level);

    let config = args.to_relay_config();
    let app_state = AppState::new(config.clone())?;

    actix_web::rt::System::new().block_on(startup(config, app_state))?;
    Ok(())
}
