//! Shared types for the LED cube library and the HTTP server.
//!
//! This module provides:
//! - Cube configuration and construction with our defaults
//! - The `Color` type and its 24-bit packing helpers
//! - Signal handling for clean shutdown
//!
//! It also re-exports the geometry, band, cube, kinematics, render,
//! preview and server modules used by the main binary.

pub mod band;
pub mod cube;
pub mod geometry;
pub mod kinematics;
pub mod preview;
pub mod render;
pub mod server;

use cube::{Cube, CubeSlot, UpdateMode};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

// ── Cube configuration ─────────────────────────────────────────────

/// How the cube should be built at startup.
///
/// `height` of `None` means "same as the side". `tiled` selects the
/// 8-wide cube assembled from four 4-wide tiles, in which case `side`
/// is ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CubeConfig {
    pub side: u32,
    pub height: Option<u32>,
    pub tiled: bool,
    pub brightness: u8,
    pub update_mode: UpdateMode,
}

impl CubeConfig {
    pub fn new(side: u32) -> Self {
        Self {
            side,
            ..Self::default()
        }
    }

    pub fn with_height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    pub fn tiled(mut self) -> Self {
        self.tiled = true;
        self
    }
}

impl Default for CubeConfig {
    fn default() -> Self {
        Self {
            side: 3,
            height: None,
            tiled: false,
            brightness: band::DEFAULT_BRIGHTNESS,
            update_mode: UpdateMode::Auto,
        }
    }
}

/// Build a cube from a configuration.
///
/// Goes through a fresh `CubeSlot`, so the same clamping and height
/// defaulting rules apply as for the first `create` call on a slot.
pub fn create_cube(config: CubeConfig) -> Cube {
    let mut slot = CubeSlot::default();
    if let Some(height) = config.height {
        slot.set_height(height);
    }
    if config.tiled {
        slot.create_tiled();
    } else {
        slot.create(config.side);
    }

    let mut cube = slot
        .into_cube()
        .unwrap_or_else(|| Cube::new(geometry::CubeGeometry::cube(config.side)));
    cube.set_update_mode(config.update_mode);
    cube.set_brightness(config.brightness);
    cube
}

// ── Color ──────────────────────────────────────────────────────────

/// One LED's color, independent of any strip driver's representation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const RED: Color = Color::from_rgb24(0xff0000);
    pub const ORANGE: Color = Color::from_rgb24(0xffa500);
    pub const YELLOW: Color = Color::from_rgb24(0xffff00);
    pub const GREEN: Color = Color::from_rgb24(0x00ff00);
    pub const BLUE: Color = Color::from_rgb24(0x0000ff);
    pub const INDIGO: Color = Color::from_rgb24(0x4b0082);
    pub const VIOLET: Color = Color::from_rgb24(0x8a2be2);
    pub const PURPLE: Color = Color::from_rgb24(0xff00ff);
    pub const WHITE: Color = Color::from_rgb24(0xffffff);
    pub const BLACK: Color = Color::from_rgb24(0x000000);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Unpack a `0xRRGGBB` value. Bits above 24 are ignored.
    pub const fn from_rgb24(rgb: u32) -> Self {
        Self {
            r: ((rgb >> 16) & 0xff) as u8,
            g: ((rgb >> 8) & 0xff) as u8,
            b: (rgb & 0xff) as u8,
        }
    }

    /// Pack into `0xRRGGBB`.
    pub const fn to_rgb24(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    /// Create a color from a hue value (0-360), with full saturation and brightness.
    /// Useful for rainbow effects.
    pub fn from_hue(hue: u16) -> Self {
        let hue = hue % 360;
        let sector = hue / 60;
        let fraction = ((hue % 60) as f32) / 60.0;
        let rising = (fraction * 255.0) as u8;
        let falling = ((1.0 - fraction) * 255.0) as u8;

        match sector {
            0 => Self::new(255, rising, 0),  // Red → Yellow
            1 => Self::new(falling, 255, 0), // Yellow → Green
            2 => Self::new(0, 255, rising),  // Green → Cyan
            3 => Self::new(0, falling, 255), // Cyan → Blue
            4 => Self::new(rising, 0, 255),  // Blue → Magenta
            5 => Self::new(255, 0, falling), // Magenta → Red
            _ => Self::new(255, 0, 0),
        }
    }

    /// Scale by a strip brightness level (0-255, 255 is identity).
    pub fn scale(self, level: u8) -> Self {
        if level == u8::MAX {
            return self;
        }
        let level = level as u16;
        Self {
            r: ((self.r as u16 * level) / 255) as u8,
            g: ((self.g as u16 * level) / 255) as u8,
            b: ((self.b as u16 * level) / 255) as u8,
        }
    }

    pub fn is_black(self) -> bool {
        self == Self::BLACK
    }
}

impl From<(u8, u8, u8)> for Color {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self::new(r, g, b)
    }
}

/// Pack separate channels into a `0xRRGGBB` value.
pub fn convert_rgb(r: u8, g: u8, b: u8) -> u32 {
    Color::new(r, g, b).to_rgb24()
}

// ── Shutdown ───────────────────────────────────────────────────────

/// Set up a Ctrl+C handler that sets `running` to false.
pub fn setup_signal_handler() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl-C handler");

    running
}

/// Check if the main loop should keep running.
pub fn is_running(running: &AtomicBool) -> bool {
    running.load(Ordering::SeqCst)
}

// ── Tests ──────────────────────────────────────────────────────────
