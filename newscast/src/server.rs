use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rocket::fairing::{Fairing, Info, Kind};
use rocket::figment::Figment;
use rocket::http::{ContentType, Header, Status};
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::{get, options, post, routes, Build, Request, Response, Rocket, State};
use serde::{Deserialize, Serialize};

use common::Config;

use crate::ingestion::FeedSource;
use crate::llm::AiService;
use crate::processing::{self, Article, BatchOptions};
use crate::voice;

/// Application state stored inside Rocket managed state.
#[derive(Clone)]
pub struct AppState {
    pub started_at: DateTime<Utc>,
    pub ai: Arc<AiService>,
    pub feed: Arc<dyn FeedSource>,
    pub news_limit: usize,
    pub batch: BatchOptions,
}

impl AppState {
    pub fn new(ai: Arc<AiService>, feed: Arc<dyn FeedSource>, news_limit: usize, batch: BatchOptions) -> Self {
        Self {
            started_at: Utc::now(),
            ai,
            feed,
            news_limit,
            batch,
        }
    }
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

/// Response structure for `/api/status`.
#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    provider: &'static str,
    uptime_seconds: i64,
}

/// Error body, `{"detail": "..."}`
#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

type ApiError = Custom<Json<ErrorBody>>;

fn internal_error(detail: impl Into<String>) -> ApiError {
    Custom(
        Status::InternalServerError,
        Json(ErrorBody {
            detail: detail.into(),
        }),
    )
}

/// Request body shared by `/api/chat` and `/api/voice-chat`.
#[derive(Deserialize)]
struct ArticleRequest {
    content: String,
    query: String,
}

#[derive(Serialize)]
struct ChatResponse {
    answer: String,
}

#[derive(Deserialize)]
struct SpeakRequest {
    text: String,
}

#[get("/")]
fn index() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "News Assistant API is running",
    })
}

#[get("/api/status")]
fn status(state: &State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        provider: state.ai.provider_name(),
        uptime_seconds: (Utc::now() - state.started_at).num_seconds(),
    })
}

/// Latest feed entries, each summarized by the active provider.
#[get("/api/news")]
async fn news(state: &State<AppState>) -> Result<Json<Vec<Article>>, ApiError> {
    let entries = state.feed.fetch(state.news_limit).await.map_err(|e| {
        tracing::error!("failed to fetch news: {}", e);
        internal_error(e.to_string())
    })?;

    let articles = processing::summarize_articles(state.ai.clone(), entries, &state.batch).await;
    Ok(Json(articles))
}

#[post("/api/chat", data = "<body>")]
async fn chat(state: &State<AppState>, body: Json<ArticleRequest>) -> Json<ChatResponse> {
    let answer = state.ai.chat(&body.content, &body.query).await;
    Json(ChatResponse { answer })
}

#[post("/api/voice-chat", data = "<body>")]
async fn voice_chat(
    state: &State<AppState>,
    body: Json<ArticleRequest>,
) -> Result<(ContentType, Vec<u8>), ApiError> {
    match voice::voice_response(&state.ai, &body.content, &body.query).await {
        Some(wav) => Ok((ContentType::WAV, wav)),
        None => Err(internal_error("Failed to generate voice response")),
    }
}

#[post("/api/speak", data = "<body>")]
async fn speak(state: &State<AppState>, body: Json<SpeakRequest>) -> Result<(ContentType, Vec<u8>), ApiError> {
    match state.ai.synthesize_speech(&body.text).await {
        Some(wav) => Ok((ContentType::WAV, wav)),
        None => Err(internal_error("Failed to generate audio")),
    }
}

/// CORS preflight for every path; headers are added by [`Cors`].
#[options("/<_..>")]
fn preflight() -> Status {
    Status::NoContent
}

/// Response fairing adding CORS headers for the configured origins.
pub struct Cors {
    origins: Vec<String>,
}

impl Cors {
    pub fn new(origins: Vec<String>) -> Self {
        Self { origins }
    }

    /// Value for `Access-Control-Allow-Origin`, if the origin is allowed.
    /// With credentials allowed, a concrete request origin is echoed back instead of `*`.
    fn allowed_origin(&self, origin: Option<&str>) -> Option<String> {
        let any = self.origins.iter().any(|o| o == "*");
        match origin {
            Some(origin) if any || self.origins.iter().any(|o| o == origin) => Some(origin.to_string()),
            None if any => Some("*".to_string()),
            _ => None,
        }
    }
}

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "CORS headers",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let Some(allow_origin) = self.allowed_origin(request.headers().get_one("Origin")) else {
            return;
        };
        let allow_headers = request
            .headers()
            .get_one("Access-Control-Request-Headers")
            .unwrap_or("*")
            .to_string();

        response.set_header(Header::new("Access-Control-Allow-Origin", allow_origin));
        response.set_header(Header::new("Access-Control-Allow-Methods", "GET, POST, OPTIONS"));
        response.set_header(Header::new("Access-Control-Allow-Headers", allow_headers));
        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
        response.set_header(Header::new("Vary", "Origin"));
    }
}

/// Assemble the Rocket application around `state`.
pub fn build_rocket(figment: Figment, state: AppState, cors: Cors) -> Rocket<Build> {
    rocket::custom(figment).manage(state).attach(cors).mount(
        "/",
        routes![index, status, news, chat, voice_chat, speak, preflight],
    )
}

/// Build and launch a Rocket server.
///
/// `[server] bind` and `port` from the configuration are merged into Rocket's default
/// figment. This function blocks until the Rocket server shuts down and returns an
/// error if Rocket fails to start.
pub async fn launch_rocket(state: AppState, config: &Config) -> Result<()> {
    let mut fig = rocket::Config::figment();
    if let Some(bind) = &config.server.bind {
        fig = fig.merge(("address", bind.clone()));
    }
    if let Some(port) = config.server.port {
        fig = fig.merge(("port", port));
    }

    let origins = config
        .server
        .cors_origins
        .clone()
        .unwrap_or_else(|| vec!["*".to_string()]);

    tracing::info!("Starting Rocket HTTP server");
    build_rocket(fig, state, Cors::new(origins))
        .launch()
        .await
        .map_err(|e| anyhow!("Rocket failed: {}", e))?;

    tracing::info!("Rocket HTTP server has shut down");
    Ok(())
}
