//! LED Cube HTTP API Server
//!
//! Runs a web server that drives a software LED cube. Any device on the
//! LAN can set pixels, fill planes, show digits, run animations, read the
//! published frame back, or ask the leg solver for servo angles.
//!
//! ## Architecture
//! - **Render thread** (std::thread): owns the cube, processes commands
//! - **HTTP server** (tokio/axum): accepts API requests, sends commands via channel
//!
//! ## Rust concepts
//! - `#[tokio::main]` async entry point
//! - `std::thread::spawn` for the render thread
//! - `std::sync::mpsc` channel between async and sync worlds
//!
//! ## Usage
//! ```sh
//! ./target/release/ledcube-rs --side 5 --port 8080
//! ./target/release/ledcube-rs --tiled --height 8
//! ```

use clap::Parser;
use ledcube_rs::cube::UpdateMode;
use ledcube_rs::kinematics::LegGeometry;
use ledcube_rs::render::{CubeStatus, render_loop};
use ledcube_rs::server::{self, AppState};
use ledcube_rs::{CubeConfig, create_cube};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

/// LED Cube HTTP API Server
#[derive(Parser)]
#[command(name = "ledcube-rs")]
#[command(about = "HTTP API server for driving an addressable LED cube")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(long, default_value = "8080")]
    port: u16,

    /// LEDs along each edge (clamped to 3-8)
    #[arg(long, default_value = "3")]
    side: u32,

    /// Number of layers, up to 64 (defaults to the side length, or 8 when tiled)
    #[arg(long)]
    height: Option<u32>,

    /// 8-wide cube assembled from four 4-wide tiles
    #[arg(long)]
    tiled: bool,

    /// Strip brightness (0-255)
    #[arg(long, default_value = "40")]
    brightness: u8,

    /// Start in manual update mode (changes need POST /api/v1/show)
    #[arg(long)]
    manual: bool,

    /// Upper leg segment length for the leg solver
    #[arg(long, default_value = "50.0")]
    upper: f64,

    /// Lower leg segment length for the leg solver
    #[arg(long, default_value = "50.0")]
    lower: f64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_ansi(false) // Disable ANSI color codes for systemd/journald
        .compact()
        .init();

    let args = Args::parse();

    let config = CubeConfig {
        side: args.side,
        height: args.height,
        tiled: args.tiled,
        brightness: args.brightness,
        update_mode: if args.manual {
            UpdateMode::Manual
        } else {
            UpdateMode::Auto
        },
    };
    let cube = create_cube(config);
    let geometry = *cube.geometry();
    let legs = LegGeometry::new(args.upper, args.lower);

    tracing::info!("LED Cube HTTP Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Cube: {}x{}x{} ({:?}, {} LEDs)",
        geometry.side(),
        geometry.side(),
        geometry.height(),
        geometry.topology(),
        geometry.pixel_count()
    );
    tracing::info!("Legs: upper={} lower={}", legs.upper, legs.lower);
    tracing::info!("Port: {}", args.port);

    // Channel for sending commands to the render thread.
    let (tx, rx) = mpsc::channel();

    // Shared status and published frame — render thread writes, HTTP handlers read.
    let status = Arc::new(Mutex::new(CubeStatus::new(&cube)));
    let frame = Arc::new(Mutex::new(cube.frame().to_vec()));

    let render_status = status.clone();
    let render_frame = frame.clone();
    let render_handle = std::thread::spawn(move || {
        render_loop(rx, render_status, render_frame, cube);
    });

    let app_state = AppState {
        command_tx: tx,
        status,
        frame,
        geometry,
        legs,
    };

    let app = server::create_router(app_state);

    let addr = format!("0.0.0.0:{}", args.port);
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("API Documentation: http://localhost:{}/docs", args.port);
    tracing::info!(
        "Try: curl 'http://localhost:{}/api/v1/map?x=0&y=0&z=0'",
        args.port
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app).await.expect("Server error");

    drop(render_handle);
}
