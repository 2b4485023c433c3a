//! HTTP API server: axum router and request handlers.
//!
//! The server runs on the tokio async runtime while the render thread
//! runs on a plain `std::thread`. Commands go over `std::sync::mpsc`;
//! status and the published frame are read back through `Arc<Mutex<_>>`.
//!
//! Pure lookups (pixel mapping, leg angles, layer previews) are answered
//! directly by the handlers without involving the render thread.
//!
//! ## Rust concepts
//! - axum extractors: `State`, `Path`, `Query`, `Json`
//! - `Result<_, (StatusCode, String)>` as a handler return type
//! - `Sender::send` failing once the receiving thread is gone

use crate::Color;
use crate::band::frame_to_bytes;
use crate::cube::{COLON_GLYPH, UpdateMode, glyph_for};
use crate::geometry::{Axis, CubeGeometry};
use crate::kinematics::{JointAngles, KinematicsError, Leg, LegGeometry, servo_pulse_us};
use crate::preview;
use crate::render::{CubeState, CubeStatus, RenderCommand};
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// ── App State ────────────────────────────────────────────────────────

/// Shared application state, passed to every handler via axum's `State` extractor.
///
/// Rust concept: CLONE for Arc
/// axum clones the state for each request. `Sender` and the `Arc`s are
/// cheap handles, and the geometry types are small `Copy` values.
#[derive(Clone)]
pub struct AppState {
    /// Channel to send commands to the render thread
    pub command_tx: Sender<RenderCommand>,
    /// Shared cube status (render thread writes, handlers read)
    pub status: Arc<Mutex<CubeStatus>>,
    /// Last published frame, brightness applied
    pub frame: Arc<Mutex<Vec<Color>>>,
    /// Cube shape
    pub geometry: CubeGeometry,
    /// Segment lengths used by the leg solver
    pub legs: LegGeometry,
}

type ApiError = (StatusCode, String);

// ── OpenAPI Documentation ────────────────────────────────────────────

#[derive(OpenApi)]
#[openapi(
    paths(
        get_status,
        get_map,
        get_frame,
        get_layer,
        post_pixel,
        post_index,
        post_fill,
        post_clear,
        post_plane,
        post_char,
        post_text,
        post_rainbow,
        post_rotate,
        post_shift,
        post_animate,
        post_stop,
        post_brightness,
        post_mode,
        post_show,
        post_leg_solve,
    ),
    components(schemas(
        CubeStatus,
        CubeState,
        crate::geometry::Topology,
        Axis,
        UpdateMode,
        Leg,
        JointAngles,
        MapResponse,
        PixelRequest,
        IndexRequest,
        ColorRequest,
        PlaneRequest,
        CharRequest,
        TextRequest,
        AnimateRequest,
        BrightnessRequest,
        ModeRequest,
        LegRequest,
        LegResponse,
    )),
    tags(
        (name = "cube", description = "Cube drawing endpoints"),
        (name = "geometry", description = "Pixel mapping and previews"),
        (name = "legs", description = "Leg kinematics"),
        (name = "system", description = "System status endpoints"),
    ),
    info(
        title = "LED Cube API",
        version = env!("CARGO_PKG_VERSION"),
        description = "HTTP API for driving an addressable LED cube"
    )
)]
pub struct ApiDoc;

// ── Request/Response types ───────────────────────────────────────────

fn default_color() -> (u8, u8, u8) {
    (255, 255, 255)
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MapQuery {
    x: i32,
    y: i32,
    z: i32,
}

#[derive(Debug, PartialEq, Serialize, utoipa::ToSchema)]
pub struct MapResponse {
    /// Strip index of the LED, or the sentinel when out of range
    index: usize,
    /// Whether the coordinate is inside the cube
    in_bounds: bool,
    /// Index used for out-of-range coordinates (one past the last LED)
    sentinel: usize,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct PixelRequest {
    x: i32,
    y: i32,
    z: i32,
    /// RGB color array [red, green, blue], each 0-255
    #[serde(default = "default_color")]
    #[schema(value_type = Vec<u8>, example = "[255, 0, 0]")]
    color: (u8, u8, u8),
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct IndexRequest {
    /// Strip index; indices past the end are ignored
    index: usize,
    #[serde(default = "default_color")]
    #[schema(value_type = Vec<u8>, example = "[255, 0, 0]")]
    color: (u8, u8, u8),
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ColorRequest {
    #[serde(default = "default_color")]
    #[schema(value_type = Vec<u8>, example = "[0, 0, 255]")]
    color: (u8, u8, u8),
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct PlaneRequest {
    /// Plane number from 0
    plane: i32,
    axis: Axis,
    #[serde(default = "default_color")]
    #[schema(value_type = Vec<u8>, example = "[0, 255, 0]")]
    color: (u8, u8, u8),
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CharRequest {
    /// Digit 0-9, or 10 for a colon
    #[schema(minimum = 0, maximum = 10)]
    digit: u8,
    plane: i32,
    axis: Axis,
    #[serde(default = "default_color")]
    #[schema(value_type = Vec<u8>, example = "[255, 255, 255]")]
    color: (u8, u8, u8),
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct TextRequest {
    /// Digits and colons, e.g. "12:30"
    #[schema(example = "12:30")]
    text: String,
    plane: i32,
    axis: Axis,
    #[serde(default = "default_color")]
    #[schema(value_type = Vec<u8>, example = "[255, 255, 255]")]
    color: (u8, u8, u8),
    /// Pause after each glyph in milliseconds
    #[serde(default = "default_delay_ms")]
    #[schema(example = 500, default = 500)]
    delay_ms: u64,
}

fn default_delay_ms() -> u64 {
    500
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct AnimateRequest {
    /// Milliseconds between rotation steps
    #[serde(default = "default_interval_ms")]
    #[schema(example = 100, default = 100)]
    interval_ms: u64,
}

fn default_interval_ms() -> u64 {
    100
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct BrightnessRequest {
    /// Strip brightness (0-255)
    #[schema(example = 40, minimum = 0, maximum = 255)]
    value: u8,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ModeRequest {
    mode: UpdateMode,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct LegRequest {
    leg: Leg,
    /// Forward offset of the foot from the hip shaft
    x: f64,
    /// Height of the hip shaft above the foot
    h: f64,
}

#[derive(Debug, PartialEq, Serialize, utoipa::ToSchema)]
pub struct LegResponse {
    angles: JointAngles,
    /// Servo pulse widths in microseconds
    hip_pulse_us: u32,
    knee_pulse_us: u32,
}

// ── Router ───────────────────────────────────────────────────────────

/// Build the axum router with all API endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(
            SwaggerUi::new("/docs")
                .url("/api-docs/openapi.json", ApiDoc::openapi())
                .config(
                    utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
                        .validator_url("none"),
                ),
        )
        .route("/api/v1/status", get(get_status))
        .route("/api/v1/map", get(get_map))
        .route("/api/v1/frame", get(get_frame))
        .route("/api/v1/layer/{z}", get(get_layer))
        .route("/api/v1/pixel", post(post_pixel))
        .route("/api/v1/index", post(post_index))
        .route("/api/v1/fill", post(post_fill))
        .route("/api/v1/clear", post(post_clear))
        .route("/api/v1/plane", post(post_plane))
        .route("/api/v1/char", post(post_char))
        .route("/api/v1/text", post(post_text))
        .route("/api/v1/rainbow", post(post_rainbow))
        .route("/api/v1/rotate", post(post_rotate))
        .route("/api/v1/shift", post(post_shift))
        .route("/api/v1/animate", post(post_animate))
        .route("/api/v1/stop", post(post_stop))
        .route("/api/v1/brightness", post(post_brightness))
        .route("/api/v1/mode", post(post_mode))
        .route("/api/v1/show", post(post_show))
        .route("/api/v1/leg/solve", post(post_leg_solve))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Hand a command to the render thread.
fn send(state: &AppState, cmd: RenderCommand) -> Result<StatusCode, ApiError> {
    state.command_tx.send(cmd).map_err(|_| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "Render thread gone".to_string(),
        )
    })?;
    Ok(StatusCode::OK)
}

// ── Status and geometry ──────────────────────────────────────────────

/// GET /api/v1/status — current cube state
#[utoipa::path(
    get,
    path = "/api/v1/status",
    tag = "system",
    responses(
        (status = 200, description = "Current cube status", body = CubeStatus)
    )
)]
async fn get_status(State(state): State<AppState>) -> Json<CubeStatus> {
    let status = state.status.lock().unwrap().clone();
    Json(status)
}

/// GET /api/v1/map — strip index for a coordinate
#[utoipa::path(
    get,
    path = "/api/v1/map",
    tag = "geometry",
    params(MapQuery),
    responses(
        (status = 200, description = "Strip index for the coordinate", body = MapResponse)
    )
)]
async fn get_map(State(state): State<AppState>, Query(q): Query<MapQuery>) -> Json<MapResponse> {
    let geometry = state.geometry;
    Json(MapResponse {
        index: geometry.map_pixel(q.x, q.y, q.z),
        in_bounds: geometry.contains(q.x, q.y, q.z),
        sentinel: geometry.sentinel(),
    })
}

/// GET /api/v1/frame — last published frame as raw RGB bytes
#[utoipa::path(
    get,
    path = "/api/v1/frame",
    tag = "geometry",
    responses(
        (status = 200, description = "pixel_count*3 bytes in strip order", body = Vec<u8>, content_type = "application/octet-stream")
    )
)]
async fn get_frame(State(state): State<AppState>) -> impl IntoResponse {
    let bytes = frame_to_bytes(&state.frame.lock().unwrap());
    ([(header::CONTENT_TYPE, "application/octet-stream")], bytes)
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LayerQuery {
    /// Pixels per LED in the preview
    #[serde(default = "default_scale")]
    scale: u32,
}

fn default_scale() -> u32 {
    16
}

/// GET /api/v1/layer/{z} — PNG preview of one layer
#[utoipa::path(
    get,
    path = "/api/v1/layer/{z}",
    tag = "geometry",
    params(("z" = i32, Path, description = "Layer number from 0"), LayerQuery),
    responses(
        (status = 200, description = "PNG image", body = Vec<u8>, content_type = "image/png"),
        (status = 404, description = "Layer outside the cube")
    )
)]
async fn get_layer(
    State(state): State<AppState>,
    Path(z): Path<i32>,
    Query(q): Query<LayerQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if !(0..state.geometry.height() as i32).contains(&z) {
        return Err((StatusCode::NOT_FOUND, format!("No layer {z}")));
    }

    let img = {
        let frame = state.frame.lock().unwrap();
        preview::render_layer(&state.geometry, &frame, z, q.scale)
    };
    let png = preview::encode_png(&img)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}

// ── Drawing ──────────────────────────────────────────────────────────

/// POST /api/v1/pixel — set one LED by coordinate
#[utoipa::path(
    post,
    path = "/api/v1/pixel",
    tag = "cube",
    request_body = PixelRequest,
    responses(
        (status = 200, description = "Pixel set (out-of-range coordinates are ignored)")
    )
)]
async fn post_pixel(
    State(state): State<AppState>,
    Json(req): Json<PixelRequest>,
) -> Result<StatusCode, ApiError> {
    send(
        &state,
        RenderCommand::SetPixel {
            x: req.x,
            y: req.y,
            z: req.z,
            color: req.color.into(),
        },
    )
}

/// POST /api/v1/index — set one LED by strip index
#[utoipa::path(
    post,
    path = "/api/v1/index",
    tag = "cube",
    request_body = IndexRequest,
    responses(
        (status = 200, description = "Pixel set (indices past the end are ignored)")
    )
)]
async fn post_index(
    State(state): State<AppState>,
    Json(req): Json<IndexRequest>,
) -> Result<StatusCode, ApiError> {
    send(
        &state,
        RenderCommand::SetIndex {
            index: req.index,
            color: req.color.into(),
        },
    )
}

/// POST /api/v1/fill — set every LED
#[utoipa::path(
    post,
    path = "/api/v1/fill",
    tag = "cube",
    request_body = ColorRequest,
    responses(
        (status = 200, description = "Cube filled")
    )
)]
async fn post_fill(
    State(state): State<AppState>,
    Json(req): Json<ColorRequest>,
) -> Result<StatusCode, ApiError> {
    send(&state, RenderCommand::Fill(req.color.into()))
}

/// POST /api/v1/clear — all LEDs off
#[utoipa::path(
    post,
    path = "/api/v1/clear",
    tag = "cube",
    responses(
        (status = 200, description = "Cube cleared")
    )
)]
async fn post_clear(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    send(&state, RenderCommand::Clear)
}

/// POST /api/v1/plane — fill one plane
#[utoipa::path(
    post,
    path = "/api/v1/plane",
    tag = "cube",
    request_body = PlaneRequest,
    responses(
        (status = 200, description = "Plane filled")
    )
)]
async fn post_plane(
    State(state): State<AppState>,
    Json(req): Json<PlaneRequest>,
) -> Result<StatusCode, ApiError> {
    send(
        &state,
        RenderCommand::Plane {
            plane: req.plane,
            axis: req.axis,
            color: req.color.into(),
        },
    )
}

/// POST /api/v1/char — draw a digit or colon on a plane
#[utoipa::path(
    post,
    path = "/api/v1/char",
    tag = "cube",
    request_body = CharRequest,
    responses(
        (status = 200, description = "Glyph drawn"),
        (status = 400, description = "Digit above 10")
    )
)]
async fn post_char(
    State(state): State<AppState>,
    Json(req): Json<CharRequest>,
) -> Result<StatusCode, ApiError> {
    if req.digit > COLON_GLYPH {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("No glyph {}, expected 0-{COLON_GLYPH}", req.digit),
        ));
    }

    send(
        &state,
        RenderCommand::ShowChar {
            glyph: req.digit,
            plane: req.plane,
            axis: req.axis,
            color: req.color.into(),
        },
    )
}

/// POST /api/v1/text — draw digits one after another
#[utoipa::path(
    post,
    path = "/api/v1/text",
    tag = "cube",
    request_body = TextRequest,
    responses(
        (status = 200, description = "Text started"),
        (status = 400, description = "Empty text or characters without a glyph")
    )
)]
async fn post_text(
    State(state): State<AppState>,
    Json(req): Json<TextRequest>,
) -> Result<StatusCode, ApiError> {
    if req.text.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Text is empty".to_string()));
    }
    if let Some(c) = req.text.chars().find(|&c| glyph_for(c).is_none()) {
        return Err((StatusCode::BAD_REQUEST, format!("No glyph for {c:?}")));
    }

    send(
        &state,
        RenderCommand::ShowText {
            text: req.text,
            plane: req.plane,
            axis: req.axis,
            color: req.color.into(),
            delay_ms: req.delay_ms,
        },
    )
}

/// POST /api/v1/rainbow — hue sweep along the strip
#[utoipa::path(
    post,
    path = "/api/v1/rainbow",
    tag = "cube",
    responses(
        (status = 200, description = "Rainbow drawn")
    )
)]
async fn post_rainbow(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    send(&state, RenderCommand::Rainbow)
}

/// POST /api/v1/rotate — rotate the strip one LED
#[utoipa::path(
    post,
    path = "/api/v1/rotate",
    tag = "cube",
    responses(
        (status = 200, description = "Strip rotated")
    )
)]
async fn post_rotate(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    send(&state, RenderCommand::Rotate)
}

/// POST /api/v1/shift — shift the strip one LED
#[utoipa::path(
    post,
    path = "/api/v1/shift",
    tag = "cube",
    responses(
        (status = 200, description = "Strip shifted")
    )
)]
async fn post_shift(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    send(&state, RenderCommand::Shift)
}

/// POST /api/v1/animate — keep rotating until another command arrives
#[utoipa::path(
    post,
    path = "/api/v1/animate",
    tag = "cube",
    request_body = AnimateRequest,
    responses(
        (status = 200, description = "Animation started")
    )
)]
async fn post_animate(
    State(state): State<AppState>,
    Json(req): Json<AnimateRequest>,
) -> Result<StatusCode, ApiError> {
    send(
        &state,
        RenderCommand::Animate {
            interval_ms: req.interval_ms,
        },
    )
}

/// POST /api/v1/stop — stop text or animation
#[utoipa::path(
    post,
    path = "/api/v1/stop",
    tag = "cube",
    responses(
        (status = 200, description = "Stopped")
    )
)]
async fn post_stop(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    send(&state, RenderCommand::Stop)
}

/// POST /api/v1/brightness — set strip brightness (0-255)
#[utoipa::path(
    post,
    path = "/api/v1/brightness",
    tag = "cube",
    request_body = BrightnessRequest,
    responses(
        (status = 200, description = "Brightness updated")
    )
)]
async fn post_brightness(
    State(state): State<AppState>,
    Json(req): Json<BrightnessRequest>,
) -> Result<StatusCode, ApiError> {
    send(&state, RenderCommand::SetBrightness(req.value))
}

/// POST /api/v1/mode — switch between auto and manual updates
#[utoipa::path(
    post,
    path = "/api/v1/mode",
    tag = "cube",
    request_body = ModeRequest,
    responses(
        (status = 200, description = "Update mode set")
    )
)]
async fn post_mode(
    State(state): State<AppState>,
    Json(req): Json<ModeRequest>,
) -> Result<StatusCode, ApiError> {
    send(&state, RenderCommand::SetUpdateMode(req.mode))
}

/// POST /api/v1/show — publish pending changes
#[utoipa::path(
    post,
    path = "/api/v1/show",
    tag = "cube",
    responses(
        (status = 200, description = "Frame published")
    )
)]
async fn post_show(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    send(&state, RenderCommand::Show)
}

// ── Legs ─────────────────────────────────────────────────────────────

/// POST /api/v1/leg/solve — servo angles for a foot position
#[utoipa::path(
    post,
    path = "/api/v1/leg/solve",
    tag = "legs",
    request_body = LegRequest,
    responses(
        (status = 200, description = "Joint angles", body = LegResponse),
        (status = 422, description = "Target out of reach"),
        (status = 500, description = "Leg geometry misconfigured")
    )
)]
async fn post_leg_solve(
    State(state): State<AppState>,
    Json(req): Json<LegRequest>,
) -> Result<Json<LegResponse>, ApiError> {
    let angles = state
        .legs
        .solve_for(req.leg, req.x, req.h)
        .map_err(|e| match e {
            KinematicsError::Unreachable { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
            }
            KinematicsError::InvalidGeometry => {
                tracing::error!("Leg solver misconfigured: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        })?;

    Ok(Json(LegResponse {
        angles,
        hip_pulse_us: servo_pulse_us(angles.hip),
        knee_pulse_us: servo_pulse_us(angles.knee),
    }))
}
