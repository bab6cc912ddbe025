use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod aadhaar;
mod config;
mod document;
mod engine;
mod engines;
mod error;
mod preprocessing;
mod server;
mod uploads;

#[derive(Parser, Debug)]
#[command(name = "aadhaar-verify-server")]
#[command(about = "Aadhaar card verification server (QR decoding with OCR fallback)")]
#[command(version)]
pub struct Args {
    /// Host address to bind to
    #[arg(long, env = "VERIFY_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "VERIFY_PORT", default_value = "8000")]
    pub port: u16,

    /// Maximum upload size in bytes (default: 10MB)
    #[arg(long, env = "VERIFY_MAX_FILE_SIZE", default_value = "10485760")]
    pub max_file_size: usize,

    /// OCR engine used when a request does not name one ("tesseract", "ocrs")
    #[arg(long, env = "VERIFY_ENGINE")]
    pub engine: Option<String>,

    /// Tesseract language code
    #[arg(long, env = "VERIFY_LANGUAGE", default_value = "eng")]
    pub language: String,

    /// Preprocessing preset (none, standard, aggressive)
    #[arg(long, env = "VERIFY_PREPROCESS", default_value = "standard")]
    pub preprocess: String,

    /// Path to the tesseract executable
    #[arg(long, env = "TESSERACT_PATH", default_value = "tesseract")]
    pub tesseract_path: String,

    /// Path to poppler's pdftoppm executable
    #[arg(long, env = "PDFTOPPM_PATH", default_value = "pdftoppm")]
    pub pdftoppm_path: String,

    /// Resolution used when rasterizing PDF pages
    #[arg(long, env = "VERIFY_PDF_DPI", default_value = "200")]
    pub pdf_dpi: u32,

    /// Upper bound on the time spent analysing one upload
    #[arg(long, env = "VERIFY_REQUEST_TIMEOUT_SECS", default_value = "120")]
    pub request_timeout_secs: u64,

    /// Number of uploads analysed at the same time
    #[arg(long, env = "VERIFY_MAX_CONCURRENT", default_value = "4")]
    pub max_concurrent: usize,

    /// Keep a copy of every accepted upload in this directory
    #[arg(long, env = "VERIFY_UPLOAD_DIR")]
    pub upload_dir: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::try_from(args)?;

    tracing::info!(
        "Starting aadhaar-verify-server v{}",
        env!("CARGO_PKG_VERSION")
    );
    tracing::info!("Binding to {}:{}", config.host, config.port);

    server::run(config).await
}
