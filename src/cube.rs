//! A cube: fixed geometry plus the band it addresses.
//!
//! Drawing happens in `(x, y, z)` space and lands in the band through
//! [`CubeGeometry::map_pixel`]. In [`UpdateMode::Auto`] every change is
//! published straight away; in [`UpdateMode::Manual`] changes collect
//! in the band until [`Cube::show`] is called.

use crate::Color;
use crate::band::Band;
use crate::geometry::{Axis, CubeGeometry, MAX_HEIGHT, MAX_SIDE, MIN_SIDE};
use serde::{Deserialize, Serialize};

/// When band changes reach the published frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    Manual,
    #[default]
    Auto,
}

// 5x5 glyphs for 0-9 and ':'. Five bytes per glyph, first byte is the
// top line, LSB is the rightmost column.
const FONT: [u8; 55] = [
    0x0c, 0x12, 0x12, 0x12, 0x0c, // 0
    0x04, 0x0c, 0x04, 0x04, 0x0e, // 1
    0x1c, 0x02, 0x0c, 0x10, 0x1e, // 2
    0x1e, 0x02, 0x04, 0x12, 0x0c, // 3
    0x06, 0x0a, 0x12, 0x1f, 0x02, // 4
    0x1f, 0x10, 0x1e, 0x01, 0x1e, // 5
    0x02, 0x04, 0x0e, 0x11, 0x0e, // 6
    0x1f, 0x02, 0x04, 0x08, 0x10, // 7
    0x0e, 0x11, 0x0e, 0x11, 0x0e, // 8
    0x0e, 0x11, 0x0e, 0x04, 0x08, // 9
    0x00, 0x08, 0x00, 0x08, 0x00, // :
];

const GLYPH_ROWS: i32 = 5;

/// Index of the colon glyph.
pub const COLON_GLYPH: u8 = 10;

/// Glyph index for a character, if the font has one.
pub fn glyph_for(c: char) -> Option<u8> {
    match c {
        '0'..='9' => c.to_digit(10).map(|d| d as u8),
        ':' => Some(COLON_GLYPH),
        _ => None,
    }
}

/// Whether bit `bit` of row `row` (counted from the bottom) is lit.
fn glyph_bit(glyph: u8, row: i32, bit: i32) -> bool {
    if !(0..GLYPH_ROWS).contains(&row) || !(0..8).contains(&bit) {
        return false;
    }
    let byte = FONT[glyph as usize * 5 + (GLYPH_ROWS - 1 - row) as usize];
    (byte >> bit) & 1 == 1
}

#[derive(Clone, Debug)]
pub struct Cube {
    geometry: CubeGeometry,
    band: Band,
    mode: UpdateMode,
    frame: Vec<Color>,
    shows: u64,
}

impl Cube {
    pub fn new(geometry: CubeGeometry) -> Self {
        let band = Band::new(geometry.pixel_count());
        let frame = band.frame();
        Self {
            geometry,
            band,
            mode: UpdateMode::Auto,
            frame,
            shows: 0,
        }
    }

    pub fn geometry(&self) -> &CubeGeometry {
        &self.geometry
    }

    pub fn band(&self) -> &Band {
        &self.band
    }

    pub fn update_mode(&self) -> UpdateMode {
        self.mode
    }

    pub fn set_update_mode(&mut self, mode: UpdateMode) {
        self.mode = mode;
    }

    /// The last published frame.
    pub fn frame(&self) -> &[Color] {
        &self.frame
    }

    /// How many times a frame has been published.
    pub fn shows(&self) -> u64 {
        self.shows
    }

    /// Publish the band, brightness applied.
    pub fn show(&mut self) -> &[Color] {
        self.frame = self.band.frame();
        self.shows += 1;
        &self.frame
    }

    fn changed(&mut self) {
        if self.mode == UpdateMode::Auto {
            self.show();
        }
    }

    pub fn map_pixel(&self, x: i32, y: i32, z: i32) -> usize {
        self.geometry.map_pixel(x, y, z)
    }

    /// Set the LED at `(x, y, z)`. Out-of-range coordinates change nothing.
    pub fn set_pixel_at(&mut self, x: i32, y: i32, z: i32, color: Color) {
        let index = self.map_pixel(x, y, z);
        self.band.set_pixel(index, color);
        self.changed();
    }

    /// Set an LED by strip index.
    pub fn set_pixel(&mut self, index: usize, color: Color) {
        self.band.set_pixel(index, color);
        self.changed();
    }

    pub fn fill(&mut self, color: Color) {
        self.band.fill(color);
        self.changed();
    }

    pub fn clear(&mut self) {
        self.band.clear();
        self.changed();
    }

    pub fn rainbow(&mut self) {
        self.band.rainbow();
        self.changed();
    }

    pub fn rotate(&mut self) {
        self.band.rotate();
        self.changed();
    }

    pub fn shift(&mut self) {
        self.band.shift();
        self.changed();
    }

    pub fn set_brightness(&mut self, brightness: u8) {
        self.band.set_brightness(brightness);
        self.changed();
    }

    pub fn set_plane(&mut self, plane: i32, axis: Axis, color: Color) {
        for index in self.geometry.plane_indices(plane, axis) {
            self.band.set_pixel(index, color);
        }
        self.changed();
    }

    /// Draw a glyph on one plane. Lit bits get `color`, the rest go dark.
    ///
    /// On the vertical planes the glyph's rows run along the horizontal
    /// axis and its bits climb in z; on the XY plane bits run along y.
    /// `glyph` is clamped to the colon.
    pub fn show_char(&mut self, glyph: u8, plane: i32, axis: Axis, color: Color) {
        let glyph = glyph.min(COLON_GLYPH);
        let side = self.geometry.side() as i32;
        let height = self.geometry.height() as i32;

        for row in 0..side {
            let bits = if axis == Axis::XY { side } else { height };
            for bit in 0..bits {
                let (x, y, z) = match axis {
                    Axis::YZ => (plane, row, bit),
                    Axis::XZ => (row, plane, bit),
                    Axis::XY => (row, bit, plane),
                };
                let lit = glyph_bit(glyph, row, bit);
                let index = self.geometry.map_pixel(x, y, z);
                self.band
                    .set_pixel(index, if lit { color } else { Color::BLACK });
            }
        }
        self.changed();
    }
}

/// Holds at most one cube and hands back the first one created.
///
/// `set_height` only takes effect before the first `create`, and only
/// the first time it is called. Later `create` calls with other sizes
/// return the cube that already exists.
#[derive(Debug, Default)]
pub struct CubeSlot {
    height: Option<u32>,
    cube: Option<Cube>,
}

impl CubeSlot {
    pub fn set_height(&mut self, height: u32) {
        if self.height.is_none() && self.cube.is_none() {
            self.height = Some(height.clamp(1, MAX_HEIGHT));
        }
    }

    /// Create a serpentine cube with `side` clamped to 3-8, unless one exists.
    pub fn create(&mut self, side: u32) -> &mut Cube {
        let side = side.clamp(MIN_SIDE, MAX_SIDE);
        let height = *self.height.get_or_insert(side);
        self.cube
            .get_or_insert_with(|| Cube::new(CubeGeometry::new(side, height)))
    }

    /// Create an 8-wide tiled cube, unless one exists.
    pub fn create_tiled(&mut self) -> &mut Cube {
        let height = *self.height.get_or_insert(MAX_SIDE);
        self.cube
            .get_or_insert_with(|| Cube::new(CubeGeometry::tiled(height)))
    }

    pub fn get(&self) -> Option<&Cube> {
        self.cube.as_ref()
    }

    pub fn into_cube(self) -> Option<Cube> {
        self.cube
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Topology;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn lit_cube(side: u32) -> Cube {
        let mut cube = Cube::new(CubeGeometry::cube(side));
        cube.set_brightness(255);
        cube
    }

    // ── Cube ───────────────────────────────────────────────────────

    #[test]
    fn set_pixel_at_writes_mapped_index() {
        let mut cube = lit_cube(3);
        cube.set_pixel_at(0, 1, 0, Color::RED);
        assert_eq!(cube.band().pixel(5), Some(Color::RED));
        assert_eq!(cube.frame()[5], Color::RED);
    }

    #[test]
    fn set_pixel_at_out_of_range_is_a_no_op() {
        let mut cube = lit_cube(3);
        cube.set_pixel_at(3, 0, 0, Color::RED);
        cube.set_pixel_at(-1, -1, -1, Color::RED);
        assert!(cube.band().pixels().iter().all(|c| c.is_black()));
    }

    #[test]
    fn auto_mode_publishes_every_change() {
        let mut cube = lit_cube(3);
        let before = cube.shows();
        cube.fill(Color::GREEN);
        cube.rotate();
        assert_eq!(cube.shows(), before + 2);
        assert_eq!(cube.frame(), &[Color::GREEN; 27]);
    }

    #[test]
    fn manual_mode_waits_for_show() {
        let mut cube = lit_cube(3);
        cube.set_update_mode(UpdateMode::Manual);
        let before = cube.shows();
        cube.fill(Color::BLUE);
        assert_eq!(cube.shows(), before);
        assert!(cube.frame().iter().all(|c| c.is_black()));

        cube.show();
        assert_eq!(cube.shows(), before + 1);
        assert_eq!(cube.frame(), &[Color::BLUE; 27]);
    }

    #[test]
    fn published_frame_applies_brightness() {
        let mut cube = Cube::new(CubeGeometry::cube(3));
        cube.fill(Color::WHITE);
        assert_eq!(cube.frame()[0], Color::WHITE.scale(40));
    }

    #[rstest]
    #[case(Axis::XY, 9)]
    #[case(Axis::XZ, 9)]
    #[case(Axis::YZ, 9)]
    fn set_plane_lights_one_slice(#[case] axis: Axis, #[case] expected: usize) {
        let mut cube = lit_cube(3);
        cube.set_plane(1, axis, Color::YELLOW);
        let lit = cube.band().pixels().iter().filter(|c| !c.is_black()).count();
        assert_eq!(lit, expected);
    }

    #[test]
    fn set_plane_xy_matches_coordinates() {
        let mut cube = lit_cube(4);
        cube.set_plane(2, Axis::XY, Color::PURPLE);
        for (x, y, z) in cube.geometry().iter_coordinates() {
            let c = cube.band().pixel(cube.map_pixel(x, y, z));
            let expected = if z == 2 { Color::PURPLE } else { Color::BLACK };
            assert_eq!(c, Some(expected), "at ({x}, {y}, {z})");
        }
    }

    #[test]
    fn show_char_draws_one_on_yz_plane() {
        let mut cube = lit_cube(5);
        cube.fill(Color::RED);
        cube.show_char(1, 0, Axis::YZ, Color::WHITE);

        // Bottom line of '1' is 0x0e: bits 1, 2 and 3.
        let bottom: Vec<bool> = (0..5)
            .map(|z| cube.band().pixel(cube.map_pixel(0, 0, z)) == Some(Color::WHITE))
            .collect();
        assert_eq!(bottom, vec![false, true, true, true, false]);

        // Top line of '1' is 0x04: bit 2 only.
        let top: Vec<bool> = (0..5)
            .map(|z| cube.band().pixel(cube.map_pixel(0, 4, z)) == Some(Color::WHITE))
            .collect();
        assert_eq!(top, vec![false, false, true, false, false]);

        // Unlit glyph pixels are blacked, other planes untouched.
        assert_eq!(cube.band().pixel(cube.map_pixel(0, 0, 0)), Some(Color::BLACK));
        assert_eq!(cube.band().pixel(cube.map_pixel(1, 0, 0)), Some(Color::RED));
    }

    #[test]
    fn show_char_clamps_glyph() {
        let mut a = lit_cube(5);
        let mut b = lit_cube(5);
        a.show_char(200, 2, Axis::XZ, Color::GREEN);
        b.show_char(COLON_GLYPH, 2, Axis::XZ, Color::GREEN);
        assert_eq!(a.band(), b.band());
    }

    #[test]
    fn show_char_on_larger_cube_leaves_extra_rows_dark() {
        let mut cube = lit_cube(8);
        cube.show_char(8, 0, Axis::YZ, Color::WHITE);
        for y in 5..8 {
            for z in 0..8 {
                let c = cube.band().pixel(cube.map_pixel(0, y, z));
                assert_eq!(c, Some(Color::BLACK));
            }
        }
    }

    #[rstest]
    #[case('0', Some(0))]
    #[case('7', Some(7))]
    #[case(':', Some(10))]
    #[case('a', None)]
    #[case('@', None)]
    fn test_glyph_for(#[case] c: char, #[case] expected: Option<u8>) {
        assert_eq!(glyph_for(c), expected);
    }

    // ── CubeSlot ───────────────────────────────────────────────────

    #[test]
    fn first_create_wins() {
        let mut slot = CubeSlot::default();
        slot.create(3);
        let cube = slot.create(5);
        assert_eq!(cube.geometry().side(), 3);
        assert_eq!(cube.geometry().height(), 3);
    }

    #[test]
    fn create_keeps_existing_pixels() {
        let mut slot = CubeSlot::default();
        slot.create(4).set_pixel(0, Color::RED);
        assert_eq!(slot.create(4).band().pixel(0), Some(Color::RED));
    }

    #[test]
    fn height_set_before_create_is_used() {
        let mut slot = CubeSlot::default();
        slot.set_height(6);
        slot.set_height(2);
        let cube = slot.create(4);
        assert_eq!(cube.geometry().height(), 6);
        assert_eq!(cube.geometry().pixel_count(), 96);
    }

    #[test]
    fn height_set_after_create_is_ignored() {
        let mut slot = CubeSlot::default();
        slot.create(3);
        slot.set_height(7);
        assert_eq!(slot.get().map(|c| c.geometry().height()), Some(3));
    }

    #[rstest]
    #[case(0, 1)]
    #[case(MAX_HEIGHT, MAX_HEIGHT)]
    #[case(MAX_HEIGHT + 1, MAX_HEIGHT)]
    #[case(40_000_000, MAX_HEIGHT)]
    fn set_height_is_bounded(#[case] height: u32, #[case] expected: u32) {
        let mut slot = CubeSlot::default();
        slot.set_height(height);
        let cube = slot.create(8);
        assert_eq!(cube.geometry().height(), expected);
        assert_eq!(cube.band().len(), 64 * expected as usize);
    }

    #[rstest]
    #[case(0, 3)]
    #[case(9, 8)]
    #[case(5, 5)]
    fn create_clamps_side(#[case] side: u32, #[case] expected: u32) {
        let mut slot = CubeSlot::default();
        assert_eq!(slot.create(side).geometry().side(), expected);
    }

    #[test]
    fn tiled_slot_ignores_later_serpentine_create() {
        let mut slot = CubeSlot::default();
        slot.create_tiled();
        let cube = slot.create(3);
        assert_eq!(cube.geometry().topology(), Topology::Tiled);
        assert_eq!(cube.geometry().pixel_count(), 512);
    }

    #[test]
    fn empty_slot_has_no_cube() {
        let slot = CubeSlot::default();
        assert!(slot.get().is_none());
        assert!(slot.into_cube().is_none());
    }
}
