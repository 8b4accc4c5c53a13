//! SheetRun Server

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sheetrun_server::http;
use sheetrun_server::{AppState, CommandDelegate, ModuleRegistry, ServerConfig, UploadLayout};

/// Spreadsheet processing server.
#[derive(Parser, Debug)]
#[command(name = "sheetrun-server", about = "Upload spreadsheets, run a module, download the result")]
struct Args {
    /// HTTP server address
    #[arg(long, default_value = "127.0.0.1:8000")]
    http_addr: String,

    /// Base directory for uploads, output and logs
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,

    /// Uploads directory (default: <data-dir>/uploads)
    #[arg(long)]
    upload_dir: Option<PathBuf>,

    /// Output directory (default: <data-dir>/output)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Run log directory (default: <data-dir>/logs)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Directory served under /static
    #[arg(long, default_value = "static")]
    static_dir: PathBuf,

    /// Where uploads of a run are stored
    #[arg(long, value_enum, default_value_t = UploadLayout::RunScoped)]
    upload_layout: UploadLayout,

    /// Processor timeout in seconds
    #[arg(long, default_value = "300")]
    delegate_timeout_secs: u64,

    /// Maximum request body size in bytes
    #[arg(long, default_value = "67108864")]
    max_upload_bytes: usize,

    /// Processor program for a module, as MODULE=PROGRAM (repeatable)
    #[arg(long = "processor", value_parser = parse_key_value)]
    processors: Vec<(String, String)>,

    /// Extra leading argument for a module's processor, as MODULE=ARG (repeatable)
    #[arg(long = "processor-arg", value_parser = parse_key_value)]
    processor_args: Vec<(String, String)>,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() && !value.is_empty() => {
            Ok((key.to_string(), value.to_string()))
        }
        _ => Err(format!("expected MODULE=VALUE, got '{}'", s)),
    }
}

impl Args {
    fn config(&self) -> ServerConfig {
        let defaults = ServerConfig::with_data_dir(&self.data_dir);
        ServerConfig {
            http_addr: self.http_addr.clone(),
            upload_dir: self.upload_dir.clone().unwrap_or(defaults.upload_dir),
            output_dir: self.output_dir.clone().unwrap_or(defaults.output_dir),
            log_dir: self.log_dir.clone().unwrap_or(defaults.log_dir),
            static_dir: self.static_dir.clone(),
            upload_layout: self.upload_layout,
            delegate_timeout_secs: self.delegate_timeout_secs,
            max_upload_bytes: self.max_upload_bytes,
        }
    }

    fn modules(&self) -> Result<ModuleRegistry, Box<dyn std::error::Error>> {
        let mut modules = ModuleRegistry::builtin()?;
        for (module, program) in &self.processors {
            let delegate = self
                .processor_args
                .iter()
                .filter(|(m, _)| m == module)
                .fold(CommandDelegate::new(program.as_str()), |d, (_, arg)| {
                    d.with_arg(arg.as_str())
                });
            if !modules.set_delegate(module, Arc::new(delegate)) {
                return Err(format!("--processor given for unknown module '{}'", module).into());
            }
            info!(module = %module, program = %program, "Processor registered");
        }
        Ok(modules)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize tracing
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("info")
            .add_directive("sheetrun=info".parse()?)
            .add_directive("tower_http=info".parse()?),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let config = args.config();
    let http_addr: SocketAddr = config.http_addr.parse()?;
    config.ensure_dirs().map_err(|e| {
        format!(
            "Failed to create data directories under '{}': {}",
            args.data_dir.display(),
            e
        )
    })?;

    let modules = args.modules()?;
    info!(
        upload_dir = %config.upload_dir.display(),
        output_dir = %config.output_dir.display(),
        log_dir = %config.log_dir.display(),
        layout = ?config.upload_layout,
        modules = modules.len(),
        "Starting SheetRun server"
    );

    let state = AppState::new(config, modules);
    let router = http::create_router(state);

    let listener = TcpListener::bind(http_addr).await?;
    info!("HTTP server listening on {}", http_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown requested");
            }
        })
        .await?;

    Ok(())
}
