//! Top-down map rendering of a [`TickSnapshot`].
//!
//! The map is centred on the sensor and spans `map_extent` metres in every
//! direction, north up.

use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage};

use super::TickSnapshot;

const SIZE: u32 = 640;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const GRID: Rgb<u8> = Rgb([225, 225, 225]);
const SENSOR: Rgb<u8> = Rgb([20, 60, 200]);
const OTHER_PLATFORM: Rgb<u8> = Rgb([0, 150, 60]);
const ESTIMATE: Rgb<u8> = Rgb([0, 0, 0]);
const TARGET_COLOURS: [Rgb<u8>; 4] = [
    Rgb([220, 50, 47]),
    Rgb([211, 54, 130]),
    Rgb([203, 75, 22]),
    Rgb([108, 113, 196]),
];

struct Canvas {
    img: RgbImage,
    centre: (f64, f64),
    scale: f64,
}

impl Canvas {
    fn new(centre: (f64, f64), extent: f64) -> Self {
        let extent = if extent > 0.0 { extent } else { 1.0 };
        Self {
            img: RgbImage::from_pixel(SIZE, SIZE, BACKGROUND),
            centre,
            scale: SIZE as f64 / (2.0 * extent),
        }
    }

    fn to_pixel(&self, at: (f64, f64)) -> (i64, i64) {
        let half = SIZE as f64 / 2.0;
        let x = half + (at.0 - self.centre.0) * self.scale;
        let y = half - (at.1 - self.centre.1) * self.scale;
        (x.round() as i64, y.round() as i64)
    }

    fn put(&mut self, x: i64, y: i64, colour: Rgb<u8>) {
        if (0..SIZE as i64).contains(&x) && (0..SIZE as i64).contains(&y) {
            self.img.put_pixel(x as u32, y as u32, colour);
        }
    }

    fn dot(&mut self, at: (f64, f64), radius: i64, colour: Rgb<u8>) {
        let (cx, cy) = self.to_pixel(at);
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= radius * radius {
                    self.put(cx + dx, cy + dy, colour);
                }
            }
        }
    }

    fn cross(&mut self, at: (f64, f64), arm: i64, colour: Rgb<u8>) {
        let (cx, cy) = self.to_pixel(at);
        for d in -arm..=arm {
            self.put(cx + d, cy + d, colour);
            self.put(cx + d, cy - d, colour);
        }
    }

    fn line(&mut self, from: (f64, f64), to: (f64, f64), colour: Rgb<u8>) {
        let (x0, y0) = self.to_pixel(from);
        let (x1, y1) = self.to_pixel(to);
        let steps = (x1 - x0).abs().max((y1 - y0).abs()).max(1);
        for i in 0..=steps {
            let x = x0 + (x1 - x0) * i / steps;
            let y = y0 + (y1 - y0) * i / steps;
            self.put(x, y, colour);
        }
    }

    fn grid(&mut self, spacing_px: u32) {
        for i in (0..SIZE).step_by(spacing_px.max(1) as usize) {
            for j in 0..SIZE {
                self.img.put_pixel(i, j, GRID);
                self.img.put_pixel(j, i, GRID);
            }
        }
    }
}

/// Draw the snapshot as an RGB frame.
pub fn render_frame(snapshot: &TickSnapshot) -> RgbImage {
    let sensor = (snapshot.sensor.east, snapshot.sensor.north);
    let mut canvas = Canvas::new(sensor, snapshot.map_extent);
    canvas.grid(SIZE / 8);

    for (t, cloud) in snapshot.particles.iter().enumerate() {
        let colour = TARGET_COLOURS[t % TARGET_COLOURS.len()];
        for &p in cloud {
            canvas.dot(p, 1, colour);
        }
    }
    for estimate in &snapshot.belief.targets {
        canvas.cross(estimate.mean, 6, ESTIMATE);
    }
    if let Some(other) = snapshot.other_platform {
        canvas.dot(other, 4, OTHER_PLATFORM);
    }

    let heading = snapshot.sensor.heading.to_radians();
    let arrow = snapshot.map_extent.abs() * 0.1;
    let tip = (
        sensor.0 + arrow * heading.cos(),
        sensor.1 + arrow * heading.sin(),
    );
    canvas.line(sensor, tip, SENSOR);
    canvas.dot(sensor, 5, SENSOR);
    canvas.img
}

/// Draw the snapshot as a PNG.
pub fn render_png(snapshot: &TickSnapshot) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    render_frame(snapshot).write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}
