//! Cube geometry: map logical (x, y, z) coordinates to strip indices.
//!
//! A cube is a single LED strip folded into layers. Within a layer the
//! strip snakes back and forth (serpentine wiring), and consecutive
//! layers alternate between row-major and column-major order so the
//! strip can climb to the next layer without a long jumper.
//!
//! Coordinates are signed: shape drawing near the edges routinely
//! computes positions outside the cube. Every such coordinate maps to
//! the cube's [`CubeGeometry::sentinel`] index, one past the last LED,
//! so callers can write there without bounds checks.

use serde::{Deserialize, Serialize};

/// Smallest side length a cube can be created with.
pub const MIN_SIDE: u32 = 3;
/// Largest side length a cube can be created with.
pub const MAX_SIDE: u32 = 8;
/// Side length of one pre-wired tile in a tiled cube.
pub const TILE_SIDE: u32 = 4;
/// Side length of a cube assembled from four tiles.
pub const TILED_SIDE: u32 = 2 * TILE_SIDE;
/// Tallest cube that can be created. Keeps every index well inside `i32`.
pub const MAX_HEIGHT: u32 = 64;

/// How the strip is routed through the cube.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    /// One continuous strip snaking through every layer.
    Serpentine,
    /// Four 4-wide tiles side by side, each with its own serpentine.
    Tiled,
}

/// The plane orientation used by plane fills and glyphs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Horizontal layer at `z = plane`.
    XY,
    /// Vertical slice at `y = plane`.
    XZ,
    /// Vertical slice at `x = plane`.
    YZ,
}

/// Fixed shape of a cube. Built once, never mutated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CubeGeometry {
    side: u32,
    height: u32,
    topology: Topology,
}

impl CubeGeometry {
    /// A serpentine cube with `side` clamped to `MIN_SIDE..=MAX_SIDE`
    /// and `height` to `1..=MAX_HEIGHT`.
    pub fn new(side: u32, height: u32) -> Self {
        Self {
            side: side.clamp(MIN_SIDE, MAX_SIDE),
            height: height.clamp(1, MAX_HEIGHT),
            topology: Topology::Serpentine,
        }
    }

    /// A serpentine cube as tall as it is wide.
    pub fn cube(side: u32) -> Self {
        let side = side.clamp(MIN_SIDE, MAX_SIDE);
        Self::new(side, side)
    }

    /// An 8-wide cube made of four 4-wide tiles.
    pub fn tiled(height: u32) -> Self {
        Self {
            side: TILED_SIDE,
            height: height.clamp(1, MAX_HEIGHT),
            topology: Topology::Tiled,
        }
    }

    pub fn side(&self) -> u32 {
        self.side
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// LEDs in one horizontal layer.
    pub fn layer_len(&self) -> usize {
        (self.side * self.side) as usize
    }

    /// Total LEDs in the cube.
    pub fn pixel_count(&self) -> usize {
        self.layer_len() * self.height as usize
    }

    /// Index returned for any out-of-range coordinate.
    pub fn sentinel(&self) -> usize {
        self.pixel_count()
    }

    pub fn contains(&self, x: i32, y: i32, z: i32) -> bool {
        let side = self.side as i32;
        (0..side).contains(&x) && (0..side).contains(&y) && (0..self.height as i32).contains(&z)
    }

    /// Strip index of the LED at `(x, y, z)`, or [`Self::sentinel`].
    pub fn map_pixel(&self, x: i32, y: i32, z: i32) -> usize {
        let index = match self.topology {
            Topology::Serpentine => {
                serpentine_index(x, y, z, self.side as i32, self.height as i32)
            }
            Topology::Tiled => tiled_index(x, y, z, self.height as i32),
        };
        index.unwrap_or_else(|| self.sentinel())
    }

    /// Inverse of [`Self::map_pixel`].
    pub fn coordinates(&self, index: usize) -> Option<(i32, i32, i32)> {
        if index >= self.pixel_count() {
            return None;
        }
        self.iter_coordinates()
            .find(|&(x, y, z)| self.map_pixel(x, y, z) == index)
    }

    /// Every valid coordinate, x fastest then y then z.
    pub fn iter_coordinates(&self) -> impl Iterator<Item = (i32, i32, i32)> {
        let side = self.side as i32;
        let height = self.height as i32;
        (0..height).flat_map(move |z| {
            (0..side).flat_map(move |y| (0..side).map(move |x| (x, y, z)))
        })
    }

    /// Strip indices of every LED on one plane, in drawing order.
    ///
    /// A plane outside the cube yields nothing.
    pub fn plane_indices(&self, plane: i32, axis: Axis) -> Vec<usize> {
        let side = self.side as i32;
        let height = self.height as i32;
        let coords: Vec<(i32, i32, i32)> = match axis {
            Axis::YZ => (0..side)
                .flat_map(|y| (0..height).map(move |z| (plane, y, z)))
                .collect(),
            Axis::XZ => (0..side)
                .flat_map(|x| (0..height).map(move |z| (x, plane, z)))
                .collect(),
            Axis::XY => (0..side)
                .flat_map(|x| (0..side).map(move |y| (x, y, plane)))
                .collect(),
        };

        coords
            .into_iter()
            .filter(|&(x, y, z)| self.contains(x, y, z))
            .map(|(x, y, z)| self.map_pixel(x, y, z))
            .collect()
    }
}

/// Index of `(x, y, z)` in a cube wired as one serpentine strip.
///
/// Even layers run row by row, reversing direction on odd rows. Odd
/// layers run column by column from the far side back, and on even
/// sides the rows are mirrored as well so the strip stays continuous
/// where it climbs between layers.
pub fn serpentine_index(x: i32, y: i32, z: i32, side: i32, height: i32) -> Option<usize> {
    if !(0..side).contains(&x) || !(0..side).contains(&y) || !(0..height).contains(&z) {
        return None;
    }

    let q = if z % 2 == 0 {
        if y % 2 == 0 {
            y * side + x
        } else {
            y * side + side - 1 - x
        }
    } else {
        let y = if side % 2 == 0 { side - 1 - y } else { y };
        if x % 2 == 0 {
            side * (side - x) - 1 - y
        } else {
            (side - 1 - x) * side + y
        }
    };

    Some((z * side * side + q) as usize)
}

/// Index of `(x, y, z)` in an 8-wide cube built from four 4-wide tiles.
///
/// Each tile keeps its own serpentine and is mounted rotated, so the
/// local coordinate is reflected or transposed before lookup. Two of
/// the tiles are wired end-first and count down from the top of their
/// index range. With 8 layers the tile ranges start at 0, 128, 256 and
/// 384, and the origin LED sits at index 268.
pub fn tiled_index(x: i32, y: i32, z: i32, height: i32) -> Option<usize> {
    let side = TILED_SIDE as i32;
    if !(0..side).contains(&x) || !(0..side).contains(&y) || !(0..height).contains(&z) {
        return None;
    }

    let tile_side = TILE_SIDE as i32;
    let tile_len = (tile_side * tile_side * height) as usize;
    let local = |x: i32, y: i32| serpentine_index(x, y, z, tile_side, height);
    let even_layer = z % 2 == 0;

    let index = match (x < tile_side, y < tile_side) {
        // front left
        (true, true) => 2 * tile_len + local(3 - x, 3 - y)?,
        // front right
        (false, true) => {
            let p = if even_layer {
                local(y, x - 4)?
            } else {
                local(3 - y, 7 - x)?
            };
            2 * tile_len - 1 - p
        }
        // back left
        (true, false) => {
            let p = if even_layer {
                local(7 - y, 3 - x)?
            } else {
                local(y - 4, x)?
            };
            4 * tile_len - 1 - p
        }
        // back right
        (false, false) => local(x - 4, y - 4)?,
    };

    Some(index)
}
