//! HTTP routes: the request form, file downloads, and the JSON API.

use std::sync::Arc;

use axum::{
    extract::{Form, Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use super::form::{self, GenerateForm, Notice, PresentationRequest, SlideStyle};
use super::types::{CreateTaskRequest, CreateTaskResponse, HealthResponse, TaskStatus};
use crate::agent::{artifact, PresentationAgent};
use crate::config::Config;
use crate::llm::OpenAiClient;

pub const PPTX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// Shared application state.
pub struct AppState {
    pub agent: Arc<PresentationAgent>,
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let llm = Arc::new(OpenAiClient::new(&config)?);
    let state = Arc::new(AppState {
        agent: Arc::new(PresentationAgent::new(config, llm)),
    });

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);
    axum::serve(listener, router(state)).await?;

    Ok(())
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/generate", post(generate))
        .route("/download/:file_name", get(download))
        .route("/api/tasks", post(create_task))
        .route("/api/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct IndexParams {
    pub examples: Option<String>,
}

async fn index(Query(params): Query<IndexParams>) -> Html<String> {
    let request = GenerateForm::default().into_request();
    let notice = match params.examples.as_deref() {
        Some("1") | Some("true") => Notice::Examples,
        _ => Notice::None,
    };
    Html(form::render_page(&request, &notice))
}

async fn generate(
    State(state): State<Arc<AppState>>,
    Form(body): Form<GenerateForm>,
) -> Html<String> {
    let request = body.into_request();
    if request.is_blank() {
        return Html(form::render_page(&request, &Notice::BlankTask));
    }

    info!(
        slides = request.slide_count,
        style = %request.style,
        theme = %request.color_theme,
        "Generating presentation from form"
    );

    let notice = match state.agent.generate(&request.instruction()).await {
        Some(path) => match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => Notice::Success {
                download_href: download_href(name, &request),
            },
            None => Notice::Failure,
        },
        None => Notice::Failure,
    };

    Html(form::render_page(&request, &notice))
}

fn download_href(file_name: &str, request: &PresentationRequest) -> String {
    format!(
        "/download/{}?style={}",
        urlencoding::encode(file_name),
        urlencoding::encode(&request.style.lowercase())
    )
}

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    pub style: Option<String>,
}

async fn download(
    State(state): State<Arc<AppState>>,
    Path(file_name): Path<String>,
    Query(params): Query<DownloadParams>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if !artifact::is_output_file_name(&file_name) {
        return Err((StatusCode::NOT_FOUND, "Presentation not found".to_string()));
    }

    let path = state.agent.config().workspace_path.join(&file_name);
    let data = tokio::fs::read(&path).await.map_err(|e| {
        warn!(path = %path.display(), "Download failed: {}", e);
        (StatusCode::NOT_FOUND, "Presentation not found".to_string())
    })?;

    let attachment = match params.style.as_deref().map(str::parse::<SlideStyle>) {
        Some(Ok(style)) => format!("presentation_{}.pptx", style.lowercase()),
        _ => file_name,
    };

    Ok((
        [
            (header::CONTENT_TYPE, PPTX_MIME.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", attachment),
            ),
        ],
        data,
    ))
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<Json<CreateTaskResponse>, (StatusCode, String)> {
    let style = parse_choice(req.style.as_deref(), "style")?;
    let color_theme = parse_choice(req.color_theme.as_deref(), "color_theme")?;
    let request = PresentationRequest::new(
        req.task,
        req.slide_count.unwrap_or(form::DEFAULT_SLIDES),
        style,
        color_theme,
    );
    if request.is_blank() {
        return Err((StatusCode::BAD_REQUEST, "task is required".to_string()));
    }

    let response = match state.agent.run(&request.instruction()).await {
        Ok(outcome) => CreateTaskResponse {
            id: outcome.run_id,
            status: TaskStatus::Completed,
            path: Some(outcome.path.display().to_string()),
            error: None,
            steps: outcome.steps(),
            exit: Some(outcome.exit),
            usage: outcome.usage,
            log: outcome.log,
        },
        Err(failure) => {
            error!(run_id = %failure.run_id, "Presentation task failed: {}", failure);
            CreateTaskResponse {
                id: failure.run_id,
                status: TaskStatus::Failed,
                path: None,
                error: Some(failure.cause.to_string()),
                steps: failure.cause.steps(),
                exit: failure.cause.exit(),
                usage: failure.usage,
                log: failure.log,
            }
        }
    };

    Ok(Json(response))
}

fn parse_choice<T>(value: Option<&str>, field: &str) -> Result<T, (StatusCode, String)>
where
    T: std::str::FromStr<Err = String> + Default,
{
    match value {
        None => Ok(T::default()),
        Some(v) => v
            .parse()
            .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid {}: {}", field, e))),
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
