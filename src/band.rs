//! The linear LED buffer behind a cube.
//!
//! A `Band` is what an addressable-LED strip driver owns: one color per
//! LED in wiring order, plus a global brightness applied on output.
//! Writes past the end are dropped, which is what makes the geometry's
//! sentinel index safe to use.

use crate::Color;

/// Brightness a new band starts at (0-255).
pub const DEFAULT_BRIGHTNESS: u8 = 40;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Band {
    pixels: Vec<Color>,
    brightness: u8,
}

impl Band {
    pub fn new(len: usize) -> Self {
        Self {
            pixels: vec![Color::BLACK; len],
            brightness: DEFAULT_BRIGHTNESS,
        }
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Set one LED. Indices past the end are ignored.
    pub fn set_pixel(&mut self, index: usize, color: Color) {
        if let Some(pixel) = self.pixels.get_mut(index) {
            *pixel = color;
        }
    }

    pub fn pixel(&self, index: usize) -> Option<Color> {
        self.pixels.get(index).copied()
    }

    /// Raw colors, before brightness.
    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    pub fn fill(&mut self, color: Color) {
        self.pixels.fill(color);
    }

    pub fn clear(&mut self) {
        self.fill(Color::BLACK);
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    pub fn set_brightness(&mut self, brightness: u8) {
        self.brightness = brightness;
    }

    /// Move every LED one place along the strip; the first LED goes dark.
    pub fn shift(&mut self) {
        if self.pixels.is_empty() {
            return;
        }
        self.pixels.rotate_right(1);
        self.pixels[0] = Color::BLACK;
    }

    /// Move every LED one place along the strip; the last LED wraps to the first.
    pub fn rotate(&mut self) {
        self.pixels.rotate_right(1);
    }

    /// One full hue sweep from the first LED to the last.
    pub fn rainbow(&mut self) {
        let len = self.pixels.len().max(1);
        for (i, pixel) in self.pixels.iter_mut().enumerate() {
            let hue = (i * 360 / len) as u16;
            *pixel = Color::from_hue(hue);
        }
    }

    /// Colors as they would be sent to the LEDs, brightness applied.
    pub fn frame(&self) -> Vec<Color> {
        self.pixels
            .iter()
            .map(|c| c.scale(self.brightness))
            .collect()
    }

    /// [`Self::frame`] as packed RGB bytes, three per LED.
    pub fn frame_bytes(&self) -> Vec<u8> {
        frame_to_bytes(&self.frame())
    }
}

/// Flatten a frame into RGB bytes.
pub fn frame_to_bytes(frame: &[Color]) -> Vec<u8> {
    frame.iter().flat_map(|c| [c.r, c.g, c.b]).collect()
}
