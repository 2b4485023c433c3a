//! Render thread: owns the cube and processes commands via a channel.
//!
//! All cube mutation happens on a single dedicated thread. The async HTTP
//! server talks to it by sending `RenderCommand` values through an `mpsc`
//! channel, and reads back the shared `CubeStatus` and published frame.
//!
//! Long-running commands (text, animation) wait on the channel with
//! `recv_timeout()` between steps. A new command interrupts them at once,
//! except brightness changes which are applied in place.
//!
//! ## Rust concepts
//! - `std::sync::mpsc` channels between the async server and this thread
//! - `recv_timeout()` as an interruptible sleep
//! - `Arc<Mutex<T>>` for the status and frame shared with the handlers

use crate::Color;
use crate::cube::{Cube, UpdateMode, glyph_for};
use crate::geometry::{Axis, Topology};
use serde::Serialize;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// ── Commands ─────────────────────────────────────────────────────────

/// Commands sent from the HTTP server to the render thread.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderCommand {
    /// Set one LED by cube coordinate
    SetPixel { x: i32, y: i32, z: i32, color: Color },
    /// Set one LED by strip index
    SetIndex { index: usize, color: Color },
    /// Set every LED
    Fill(Color),
    /// All LEDs off
    Clear,
    /// Fill one plane
    Plane { plane: i32, axis: Axis, color: Color },
    /// Draw one glyph on a plane
    ShowChar {
        glyph: u8,
        plane: i32,
        axis: Axis,
        color: Color,
    },
    /// Draw glyphs one after another with a pause between them
    ShowText {
        text: String,
        plane: i32,
        axis: Axis,
        color: Color,
        delay_ms: u64,
    },
    /// Hue sweep along the strip
    Rainbow,
    /// Rotate the strip one LED
    Rotate,
    /// Shift the strip one LED
    Shift,
    /// Keep rotating the strip until interrupted
    Animate { interval_ms: u64 },
    /// Stop text or animation and go idle
    Stop,
    /// Strip brightness (0-255)
    SetBrightness(u8),
    SetUpdateMode(UpdateMode),
    /// Publish pending changes (manual mode)
    Show,
}

// ── Status ───────────────────────────────────────────────────────────

/// What the render thread is currently doing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CubeState {
    Idle,
    ShowingText,
    Animating,
}

/// Shared status that the HTTP server reads to report current state.
///
/// Rust concept: Arc<Mutex<T>>
/// The render thread holds one `Arc` and writes after every step; each
/// handler locks its own clone just long enough to copy the fields out.
#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
pub struct CubeStatus {
    /// Current render state
    pub state: CubeState,
    /// Text being shown (if any)
    pub current_text: Option<String>,
    /// Edge length in LEDs
    pub side: u32,
    /// Number of layers
    pub height: u32,
    /// Strip routing
    pub topology: Topology,
    /// Strip brightness (0-255)
    pub brightness: u8,
    /// Update mode
    pub update_mode: UpdateMode,
    /// Frames published so far
    pub shows: u64,
    /// Server version
    pub version: String,
}

impl CubeStatus {
    pub fn new(cube: &Cube) -> Self {
        let geometry = cube.geometry();
        Self {
            state: CubeState::Idle,
            current_text: None,
            side: geometry.side(),
            height: geometry.height(),
            topology: geometry.topology(),
            brightness: cube.band().brightness(),
            update_mode: cube.update_mode(),
            shows: cube.shows(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn set_idle(&mut self) {
        self.state = CubeState::Idle;
        self.current_text = None;
    }
}

/// Copies cube state out to the shared status and frame after each step.
struct Publisher {
    status: Arc<Mutex<CubeStatus>>,
    frame: Arc<Mutex<Vec<Color>>>,
    last_shows: u64,
}

impl Publisher {
    fn sync(&mut self, cube: &Cube) {
        if cube.shows() != self.last_shows {
            self.last_shows = cube.shows();
            *self.frame.lock().unwrap() = cube.frame().to_vec();
        }

        let mut s = self.status.lock().unwrap();
        s.brightness = cube.band().brightness();
        s.update_mode = cube.update_mode();
        s.shows = cube.shows();
    }

    fn set_state(&self, state: CubeState, text: Option<String>) {
        let mut s = self.status.lock().unwrap();
        s.state = state;
        s.current_text = text;
    }

    fn set_idle(&self) {
        self.status.lock().unwrap().set_idle();
    }
}

/// Apply a command that finishes immediately.
///
/// Returns the command back if it needs the render loop's attention.
fn apply(cube: &mut Cube, cmd: RenderCommand) -> Option<RenderCommand> {
    match cmd {
        RenderCommand::SetPixel { x, y, z, color } => cube.set_pixel_at(x, y, z, color),
        RenderCommand::SetIndex { index, color } => cube.set_pixel(index, color),
        RenderCommand::Fill(color) => cube.fill(color),
        RenderCommand::Clear => cube.clear(),
        RenderCommand::Plane { plane, axis, color } => cube.set_plane(plane, axis, color),
        RenderCommand::ShowChar {
            glyph,
            plane,
            axis,
            color,
        } => cube.show_char(glyph, plane, axis, color),
        RenderCommand::Rainbow => cube.rainbow(),
        RenderCommand::Rotate => cube.rotate(),
        RenderCommand::Shift => cube.shift(),
        RenderCommand::SetBrightness(value) => cube.set_brightness(value),
        RenderCommand::SetUpdateMode(mode) => cube.set_update_mode(mode),
        RenderCommand::Show => {
            cube.show();
        }
        other => return Some(other),
    }
    None
}

/// What a long-running step found when it checked the channel.
enum Interrupt {
    None,
    Command(RenderCommand),
    Closed,
}

/// Wait up to `wait` for a command during a long-running step.
///
/// Brightness changes are applied in place and the wait goes on. Anything
/// else ends the wait early and is returned so the caller can stop and
/// hand it to the main loop.
fn poll_interrupt(
    rx: &Receiver<RenderCommand>,
    cube: &mut Cube,
    publisher: &mut Publisher,
    wait: Duration,
) -> Interrupt {
    // A wait too long to represent as an Instant just blocks until a command.
    let deadline = Instant::now().checked_add(wait);
    loop {
        let received = match deadline {
            Some(deadline) => rx.recv_timeout(deadline.saturating_duration_since(Instant::now())),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(RenderCommand::SetBrightness(value)) => {
                cube.set_brightness(value);
                publisher.sync(cube);
            }
            Ok(cmd) => return Interrupt::Command(cmd),
            Err(RecvTimeoutError::Timeout) => return Interrupt::None,
            Err(RecvTimeoutError::Disconnected) => return Interrupt::Closed,
        }
    }
}

// ── Render loop ──────────────────────────────────────────────────────

/// Main render loop. Runs on a dedicated thread and owns the cube.
///
/// Returns when the channel is closed (all senders dropped).
pub fn render_loop(
    rx: Receiver<RenderCommand>,
    status: Arc<Mutex<CubeStatus>>,
    frame: Arc<Mutex<Vec<Color>>>,
    mut cube: Cube,
) {
    let mut publisher = Publisher {
        status,
        frame,
        last_shows: u64::MAX,
    };
    publisher.sync(&cube);

    // Pending command, set when text or animation is interrupted
    let mut pending_cmd: Option<RenderCommand> = None;

    tracing::info!(
        "Render thread started ({} LEDs), waiting for commands...",
        cube.geometry().pixel_count()
    );

    loop {
        let cmd = if let Some(cmd) = pending_cmd.take() {
            cmd
        } else {
            match rx.recv() {
                Ok(cmd) => cmd,
                Err(_) => {
                    tracing::info!("Render thread: channel closed, shutting down.");
                    break;
                }
            }
        };

        tracing::debug!("Render command: {:?}", cmd);

        let Some(cmd) = apply(&mut cube, cmd) else {
            publisher.sync(&cube);
            continue;
        };

        match cmd {
            RenderCommand::Stop => publisher.set_idle(),

            RenderCommand::ShowText {
                text,
                plane,
                axis,
                color,
                delay_ms,
            } => {
                publisher.set_state(CubeState::ShowingText, Some(text.clone()));
                let delay = Duration::from_millis(delay_ms);

                for c in text.chars() {
                    let Some(glyph) = glyph_for(c) else {
                        tracing::warn!("No glyph for {:?}, skipping", c);
                        continue;
                    };

                    cube.show_char(glyph, plane, axis, color);
                    publisher.sync(&cube);

                    // Text is finite, so a closed channel just lets it finish.
                    if let Interrupt::Command(new_cmd) =
                        poll_interrupt(&rx, &mut cube, &mut publisher, delay)
                    {
                        pending_cmd = Some(new_cmd);
                        break;
                    }
                }

                publisher.set_idle();
                tracing::info!("Finished showing {:?}", text);
            }

            RenderCommand::Animate { interval_ms } => {
                publisher.set_state(CubeState::Animating, None);
                let interval = Duration::from_millis(interval_ms.max(1));
                tracing::info!("Animating: rotate every {}ms", interval.as_millis());

                loop {
                    cube.rotate();
                    publisher.sync(&cube);

                    match poll_interrupt(&rx, &mut cube, &mut publisher, interval) {
                        Interrupt::Command(new_cmd) => {
                            pending_cmd = Some(new_cmd);
                            break;
                        }
                        Interrupt::Closed => break,
                        Interrupt::None => {}
                    }
                }

                publisher.set_idle();
            }

            other => tracing::error!("Unhandled render command: {:?}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::CubeGeometry;
    use pretty_assertions::assert_eq;
    use std::sync::mpsc;
    use std::thread;

    struct Harness {
        status: Arc<Mutex<CubeStatus>>,
        frame: Arc<Mutex<Vec<Color>>>,
    }

    /// Run the render loop over `commands` until the channel closes.
    fn run(cube: Cube, commands: Vec<RenderCommand>) -> Harness {
        let (tx, rx) = mpsc::channel();
        let status = Arc::new(Mutex::new(CubeStatus::new(&cube)));
        let frame = Arc::new(Mutex::new(Vec::new()));

        let (s, f) = (status.clone(), frame.clone());
        let handle = thread::spawn(move || render_loop(rx, s, f, cube));
        for cmd in commands {
            tx.send(cmd).unwrap();
        }
        drop(tx);
        handle.join().unwrap();

        Harness { status, frame }
    }

    fn bright_cube(side: u32) -> Cube {
        let mut cube = Cube::new(CubeGeometry::cube(side));
        cube.set_brightness(255);
        cube
    }

    #[test]
    fn set_pixel_is_published() {
        let h = run(
            bright_cube(3),
            vec![RenderCommand::SetPixel {
                x: 0,
                y: 1,
                z: 0,
                color: Color::RED,
            }],
        );
        let frame = h.frame.lock().unwrap();
        assert_eq!(frame.len(), 27);
        assert_eq!(frame[5], Color::RED);
    }

    #[test]
    fn manual_mode_publishes_on_show_only() {
        let h = run(
            bright_cube(3),
            vec![
                RenderCommand::SetUpdateMode(UpdateMode::Manual),
                RenderCommand::Fill(Color::BLUE),
            ],
        );
        assert!(h.frame.lock().unwrap().iter().all(|c| c.is_black()));

        let h = run(
            bright_cube(3),
            vec![
                RenderCommand::SetUpdateMode(UpdateMode::Manual),
                RenderCommand::Fill(Color::BLUE),
                RenderCommand::Show,
            ],
        );
        assert_eq!(*h.frame.lock().unwrap(), vec![Color::BLUE; 27]);
        assert_eq!(h.status.lock().unwrap().update_mode, UpdateMode::Manual);
    }

    #[test]
    fn brightness_is_reported() {
        let h = run(bright_cube(3), vec![RenderCommand::SetBrightness(12)]);
        assert_eq!(h.status.lock().unwrap().brightness, 12);
    }

    #[test]
    fn text_runs_to_completion_and_goes_idle() {
        let h = run(
            bright_cube(5),
            vec![RenderCommand::ShowText {
                text: "1x:".to_string(),
                plane: 0,
                axis: Axis::YZ,
                color: Color::WHITE,
                delay_ms: 0,
            }],
        );
        let status = h.status.lock().unwrap();
        assert_eq!(status.state, CubeState::Idle);
        assert_eq!(status.current_text, None);

        // Colon was drawn last: its middle rows are lit at bit 3.
        let geometry = CubeGeometry::cube(5);
        let frame = h.frame.lock().unwrap();
        assert_eq!(frame[geometry.map_pixel(0, 1, 3)], Color::WHITE);
        assert_eq!(frame[geometry.map_pixel(0, 0, 3)], Color::BLACK);
    }

    #[test]
    fn animation_is_interrupted_by_next_command() {
        let h = run(
            bright_cube(3),
            vec![
                RenderCommand::Animate { interval_ms: 1 },
                RenderCommand::Fill(Color::GREEN),
            ],
        );
        assert_eq!(*h.frame.lock().unwrap(), vec![Color::GREEN; 27]);
        assert_eq!(h.status.lock().unwrap().state, CubeState::Idle);
    }

    fn publisher_for(cube: &Cube) -> Publisher {
        Publisher {
            status: Arc::new(Mutex::new(CubeStatus::new(cube))),
            frame: Arc::new(Mutex::new(Vec::new())),
            last_shows: u64::MAX,
        }
    }

    #[test]
    fn brightness_during_wait_does_not_interrupt() {
        let mut cube = bright_cube(3);
        let mut publisher = publisher_for(&cube);
        let (tx, rx) = mpsc::channel();
        tx.send(RenderCommand::SetBrightness(7)).unwrap();
        tx.send(RenderCommand::Fill(Color::RED)).unwrap();

        let result = poll_interrupt(&rx, &mut cube, &mut publisher, Duration::ZERO);

        assert!(matches!(result, Interrupt::Command(RenderCommand::Fill(Color::RED))));
        assert_eq!(cube.band().brightness(), 7);
        assert_eq!(publisher.status.lock().unwrap().brightness, 7);
    }

    #[test]
    fn brightness_alone_lets_the_wait_run_out() {
        let mut cube = bright_cube(3);
        let mut publisher = publisher_for(&cube);
        let (tx, rx) = mpsc::channel();
        tx.send(RenderCommand::SetBrightness(9)).unwrap();

        let result = poll_interrupt(&rx, &mut cube, &mut publisher, Duration::from_millis(1));

        assert!(matches!(result, Interrupt::None));
        assert_eq!(cube.band().brightness(), 9);
        drop(tx);
    }

    #[test]
    fn brightness_change_keeps_animation_running() {
        let h = run(
            bright_cube(3),
            vec![
                RenderCommand::Fill(Color::BLUE),
                RenderCommand::SetIndex {
                    index: 0,
                    color: Color::RED,
                },
                RenderCommand::Animate {
                    interval_ms: u64::MAX,
                },
                RenderCommand::SetBrightness(255),
                RenderCommand::Stop,
            ],
        );
        // The red LED moved one step: the animation was still running when
        // brightness arrived, and only Stop ended it.
        let frame = h.frame.lock().unwrap();
        assert_eq!(frame[1], Color::RED);
        assert_eq!(frame[0], Color::BLUE);
        assert_eq!(h.status.lock().unwrap().state, CubeState::Idle);
    }

    #[test]
    fn stop_cuts_short_a_long_text_delay() {
        let h = run(
            bright_cube(5),
            vec![
                RenderCommand::ShowText {
                    text: "1:".to_string(),
                    plane: 0,
                    axis: Axis::YZ,
                    color: Color::WHITE,
                    delay_ms: u64::MAX,
                },
                RenderCommand::Stop,
            ],
        );
        let status = h.status.lock().unwrap();
        assert_eq!(status.state, CubeState::Idle);
        assert_eq!(status.current_text, None);

        // Only the first glyph was drawn; the colon's middle row stays dark.
        let geometry = CubeGeometry::cube(5);
        let frame = h.frame.lock().unwrap();
        assert_eq!(frame[geometry.map_pixel(0, 1, 2)], Color::WHITE);
        assert_eq!(frame[geometry.map_pixel(0, 1, 3)], Color::BLACK);
    }

    #[test]
    fn long_animation_interval_is_interrupted() {
        let h = run(
            bright_cube(3),
            vec![
                RenderCommand::Animate {
                    interval_ms: u64::MAX,
                },
                RenderCommand::Fill(Color::GREEN),
            ],
        );
        assert_eq!(*h.frame.lock().unwrap(), vec![Color::GREEN; 27]);
        assert_eq!(h.status.lock().unwrap().state, CubeState::Idle);
    }

    #[test]
    fn stop_goes_idle() {
        let h = run(bright_cube(3), vec![RenderCommand::Stop]);
        assert_eq!(h.status.lock().unwrap().state, CubeState::Idle);
    }

    #[test]
    fn status_reports_geometry() {
        let cube = Cube::new(CubeGeometry::tiled(8));
        let status = CubeStatus::new(&cube);
        assert_eq!(status.side, 8);
        assert_eq!(status.height, 8);
        assert_eq!(status.topology, Topology::Tiled);
        assert_eq!(status.state, CubeState::Idle);
    }

    #[test]
    fn status_serializes_snake_case() {
        let cube = Cube::new(CubeGeometry::cube(3));
        let json = serde_json::to_value(CubeStatus::new(&cube)).unwrap();
        assert_eq!(json["state"], "idle");
        assert_eq!(json["topology"], "serpentine");
        assert_eq!(json["update_mode"], "auto");
    }
}
