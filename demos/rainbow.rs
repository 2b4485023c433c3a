//! # Rotating Rainbow Demo
//!
//! Builds a cube, paints a rainbow along its strip and rotates it,
//! printing the bottom layer to the terminal each frame. No server,
//! no render thread: just the library.
//!
//! ## Run it
//! ```sh
//! cargo run --example rainbow -- 4
//! ```

use ledcube_rs::geometry::Axis;
use ledcube_rs::{Color, CubeConfig, create_cube, is_running, setup_signal_handler};
use std::thread;
use std::time::Duration;

fn block(c: Color) -> String {
    format!("\x1b[48;2;{};{};{}m  \x1b[0m", c.r, c.g, c.b)
}

fn main() {
    let side = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(4);

    let mut cube = create_cube(CubeConfig {
        brightness: 255,
        ..CubeConfig::new(side)
    });
    let running = setup_signal_handler();
    let geometry = *cube.geometry();
    let side = geometry.side() as i32;

    cube.rainbow();
    cube.set_plane(side - 1, Axis::XY, Color::WHITE);

    while is_running(&running) {
        // Move the cursor home and redraw layer 0 as seen from above.
        print!("\x1b[H");
        for y in (0..side).rev() {
            let row: String = (0..side)
                .map(|x| block(cube.frame()[geometry.map_pixel(x, y, 0)]))
                .collect();
            println!("{row}");
        }

        cube.rotate();
        thread::sleep(Duration::from_millis(100));
    }

    println!("\nShutting down cleanly.");
}
