use crate::aadhaar::{Verification, Verifier, VerifyOptions};
use crate::config::Config;
use crate::document::{DocumentKind, DocumentLoader};
use crate::engines::{EngineInfo, EngineRegistry};
use crate::error::VerifyError;
use crate::preprocessing::{Pipeline, Preset};
use crate::uploads;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tower_http::trace::TraceLayer;

/// Room for multipart boundaries and part headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engines: Arc<EngineRegistry>,
    pub verifier: Arc<Verifier>,
    pub config: Arc<Config>,
    /// Bounds the analyses running on the blocking pool
    pub analysis_slots: Arc<Semaphore>,
}

impl AppState {
    pub fn new(config: Config, engines: EngineRegistry) -> Self {
        let verifier = Verifier::new(DocumentLoader::new(&config));
        Self {
            engines: Arc::new(engines),
            verifier: Arc::new(verifier),
            analysis_slots: Arc::new(Semaphore::new(config.max_concurrent)),
            config: Arc::new(config),
        }
    }
}

/// Optional per-request overrides
#[derive(Debug, Default, Deserialize)]
pub struct VerifyParams {
    pub engine: Option<String>,
    pub preprocess: Option<String>,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub default_engine: String,
    pub available_engines: Vec<EngineInfo>,
    pub supported_formats: Vec<String>,
    pub max_file_size_bytes: usize,
    pub preprocess: String,
}

/// Run the HTTP server until SIGINT/SIGTERM
pub async fn run(config: Config) -> anyhow::Result<()> {
    let engines = EngineRegistry::new(&config)?;
    tracing::info!(
        "OCR engines: {:?} (default: {})",
        engines.info().iter().map(|e| e.name).collect::<Vec<_>>(),
        engines.default_name()
    );

    let addr = format!("{}:{}", config.host, config.port);
    let app = router(AppState::new(config, engines));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_file_size.saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/aadhaar/verify-aadhaar", post(handle_verify))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handle verification uploads
async fn handle_verify(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
    mut multipart: Multipart,
) -> Result<Json<Verification>, VerifyError> {
    let engine = state.engines.resolve(params.engine.as_deref())?;
    let preset = match params.preprocess.as_deref() {
        Some(name) => Preset::parse(name).ok_or_else(|| {
            VerifyError::InvalidRequest(format!("Unknown preprocessing preset: {}", name))
        })?,
        None => state.config.preset,
    };

    let (data, kind) = read_upload(&mut multipart, state.config.max_file_size).await?;
    tracing::info!(
        "Received {} upload ({} bytes)",
        kind.content_type(),
        data.len()
    );

    if let Some(dir) = &state.config.upload_dir {
        match uploads::archive(dir, &data, kind).await {
            Ok(path) => tracing::debug!("Archived upload to {:?}", path),
            Err(e) => tracing::warn!("Failed to archive upload: {}", e),
        }
    }

    let options = VerifyOptions {
        engine,
        pipeline: Pipeline::new(preset),
        today: chrono::Local::now().date_naive(),
    };
    let verifier = state.verifier.clone();
    let slots = state.analysis_slots.clone();
    let analysis = async move {
        let permit = slots
            .acquire_owned()
            .await
            .map_err(|e| VerifyError::Internal(format!("Analysis slots closed: {}", e)))?;
        // The permit travels with the job so a timed-out analysis still holds its slot
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            verifier.verify(&data, kind, &options)
        })
        .await
        .map_err(|e| VerifyError::Internal(format!("Verification task failed: {}", e)))
    };

    let verification = match tokio::time::timeout(state.config.request_timeout, analysis).await {
        Ok(result) => result?,
        Err(_) => {
            tracing::warn!(
                "Verification exceeded {:?}, answering without a result",
                state.config.request_timeout
            );
            Verification::failed("Verification timed out")
        }
    };

    Ok(Json(verification))
}

/// Pull the `file` part out of the form, validating type and size
async fn read_upload(
    multipart: &mut Multipart,
    max_file_size: usize,
) -> Result<(Bytes, DocumentKind), VerifyError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_file_size))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let kind = field
            .content_type()
            .and_then(DocumentKind::from_content_type)
            .ok_or(VerifyError::InvalidFileType)?;

        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, max_file_size))?;

        if data.len() > max_file_size {
            return Err(VerifyError::FileTooLarge { max: max_file_size });
        }

        return Ok((data, kind));
    }

    Err(VerifyError::MissingFile)
}

fn multipart_error(e: axum::extract::multipart::MultipartError, max: usize) -> VerifyError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        VerifyError::FileTooLarge { max }
    } else {
        VerifyError::InvalidRequest(format!("Failed to parse multipart: {}", e))
    }
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        default_engine: state.engines.default_name().to_string(),
        available_engines: state.engines.info(),
        supported_formats: DocumentKind::all()
            .iter()
            .map(|kind| kind.content_type().to_string())
            .collect(),
        max_file_size_bytes: state.config.max_file_size,
        preprocess: state.config.preset.as_str().to_string(),
    })
}

/// Completes when the process is asked to stop
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    res = tokio::signal::ctrl_c() => {
                        if let Err(err) = res {
                            tracing::error!("Failed to listen for Ctrl-C: {}", err);
                        }
                    },
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {}", err);
                wait_for_ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        wait_for_ctrl_c().await;
    }
    tracing::info!("Shutdown signal received");
}

async fn wait_for_ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", err);
    }
}
