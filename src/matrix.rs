/*
 *  matrix.rs
 *
 *  LyRing - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Pixel frame for the 25x25 circular matrix, mask and primitives
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use core::convert::Infallible;
use embedded_graphics::geometry::{OriginDimensions, Size};
use embedded_graphics::pixelcolor::{Gray8, GrayColor};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Circle, Line, PrimitiveStyle};
use std::fmt;
use thiserror::Error;

/// Cells per row/column of the addressable grid.
pub const GRID_SIZE: usize = 25;
/// Total addressable cells (25 x 25).
pub const PIXEL_COUNT: usize = GRID_SIZE * GRID_SIZE;
/// Row/column index of the centre cell.
pub const CENTER: i32 = 12;
/// Visible radius measured from the centre cell.
pub const RADIUS: f32 = 12.5;

// 12.5^2 = 156.25 and squared cell distances are integers, so <= 156 is exact
const RADIUS_SQ_CELLS: i32 = 156;

const fn build_mask() -> [bool; PIXEL_COUNT] {
    let mut mask = [false; PIXEL_COUNT];
    let mut i = 0;
    while i < PIXEL_COUNT {
        let dr = (i / GRID_SIZE) as i32 - CENTER;
        let dc = (i % GRID_SIZE) as i32 - CENTER;
        mask[i] = dr * dr + dc * dc <= RADIUS_SQ_CELLS;
        i += 1;
    }
    mask
}

/// Physically visible cells; true when the cell lies within the circular face.
pub static VISIBLE_MASK: [bool; PIXEL_COUNT] = build_mask();

/// Returns true when the cell at `(row, col)` is physically present on the ring.
#[inline]
pub fn is_visible(row: usize, col: usize) -> bool {
    row < GRID_SIZE && col < GRID_SIZE && VISIBLE_MASK[row * GRID_SIZE + col]
}

/// Number of visible cells on the face.
pub fn visible_count() -> usize {
    VISIBLE_MASK.iter().filter(|v| **v).count()
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame length mismatch: expected {expected} pixels, got {actual}")]
    Length { expected: usize, actual: usize },
}

/// One still image for the matrix; index `i` is cell `(i / 25, i % 25)`.
///
/// Off-mask cells are conventionally zero, [`PixelFrame::apply_mask`] enforces it
/// on request only.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelFrame {
    pixels: [u8; PIXEL_COUNT],
}

impl Default for PixelFrame {
    fn default() -> Self {
        Self::blank()
    }
}

impl fmt::Debug for PixelFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelFrame")
            .field("lit", &self.lit_count())
            .field("peak", &self.peak())
            .finish()
    }
}

impl PixelFrame {
    /// All cells off.
    pub const fn blank() -> Self {
        Self { pixels: [0; PIXEL_COUNT] }
    }

    /// Every visible cell at `level`, off-mask cells stay zero.
    pub fn filled(level: u8) -> Self {
        let mut frame = Self::blank();
        for (px, visible) in frame.pixels.iter_mut().zip(VISIBLE_MASK.iter()) {
            if *visible {
                *px = level;
            }
        }
        frame
    }

    pub const fn from_array(pixels: [u8; PIXEL_COUNT]) -> Self {
        Self { pixels }
    }

    /// Build from raw theme data, rejecting anything that is not exactly 625 cells.
    pub fn from_slice(raw: &[u8]) -> Result<Self, FrameError> {
        let pixels: [u8; PIXEL_COUNT] = raw.try_into().map_err(|_| FrameError::Length {
            expected: PIXEL_COUNT,
            actual: raw.len(),
        })?;
        Ok(Self { pixels })
    }

    #[inline]
    pub fn index_of(row: usize, col: usize) -> usize {
        row * GRID_SIZE + col
    }

    /// Cell value, zero when outside the grid.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u8 {
        if row >= GRID_SIZE || col >= GRID_SIZE {
            return 0;
        }
        self.pixels[Self::index_of(row, col)]
    }

    /// Sets a cell, ignoring coordinates outside the grid.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, level: u8) {
        if row < GRID_SIZE && col < GRID_SIZE {
            self.pixels[Self::index_of(row, col)] = level;
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.pixels
    }

    pub fn as_array(&self) -> &[u8; PIXEL_COUNT] {
        &self.pixels
    }

    pub fn as_mut_array(&mut self) -> &mut [u8; PIXEL_COUNT] {
        &mut self.pixels
    }

    pub fn lit_count(&self) -> usize {
        self.pixels.iter().filter(|p| **p > 0).count()
    }

    pub fn peak(&self) -> u8 {
        self.pixels.iter().copied().max().unwrap_or(0)
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|p| *p == 0)
    }

    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// Zero every off-mask cell.
    pub fn apply_mask(&mut self) {
        for (px, visible) in self.pixels.iter_mut().zip(VISIBLE_MASK.iter()) {
            if !*visible {
                *px = 0;
            }
        }
    }

    /// Consuming variant of [`PixelFrame::apply_mask`].
    pub fn masked(mut self) -> Self {
        self.apply_mask();
        self
    }

    /// Per-cell transform, used by the brightness mapping.
    pub fn map<F: Fn(u8) -> u8>(&self, f: F) -> Self {
        let mut out = Self::blank();
        for (dst, src) in out.pixels.iter_mut().zip(self.pixels.iter()) {
            *dst = f(*src);
        }
        out
    }

    /// Outline of a circle centred on the matrix.
    pub fn ring(&mut self, radius: u32, level: u8, stroke: u32) {
        let _ = Circle::with_center(centre_point(), radius * 2 + 1)
            .into_styled(PrimitiveStyle::with_stroke(Gray8::new(level), stroke.max(1)))
            .draw(self);
    }

    /// Filled circle centred on the matrix.
    pub fn disc(&mut self, radius: u32, level: u8) {
        let _ = Circle::with_center(centre_point(), radius * 2 + 1)
            .into_styled(PrimitiveStyle::with_fill(Gray8::new(level)))
            .draw(self);
    }

    /// Straight line between two grid points, `x` is the column and `y` the row.
    pub fn line(&mut self, from: Point, to: Point, level: u8) {
        let _ = Line::new(from, to)
            .into_styled(PrimitiveStyle::with_stroke(Gray8::new(level), 1))
            .draw(self);
    }

    /// Line from the centre at `angle_deg` (0 = up, clockwise) reaching `length` cells.
    pub fn spoke(&mut self, angle_deg: f32, length: f32, level: u8) {
        let end = polar_point(angle_deg, length);
        self.line(centre_point(), end, level);
    }
}

/// Centre cell as an embedded-graphics point.
pub fn centre_point() -> Point {
    Point::new(CENTER, CENTER)
}

/// Grid point at `radius` cells from the centre, 0 degrees pointing up, clockwise.
pub fn polar_point(angle_deg: f32, radius: f32) -> Point {
    let rad = angle_deg.to_radians();
    let x = CENTER as f32 + radius * rad.sin();
    let y = CENTER as f32 - radius * rad.cos();
    Point::new(x.round() as i32, y.round() as i32)
}

impl OriginDimensions for PixelFrame {
    fn size(&self) -> Size {
        Size::new(GRID_SIZE as u32, GRID_SIZE as u32)
    }
}

impl DrawTarget for PixelFrame {
    type Color = Gray8;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x < 0 || point.y < 0 {
                continue;
            }
            self.set(point.y as usize, point.x as usize, color.luma());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_geometry() {
        assert!(is_visible(12, 12));
        assert!(is_visible(0, 12));
        assert!(is_visible(12, 24));
        assert!(!is_visible(0, 0));
        assert!(!is_visible(24, 24));
        assert!(!is_visible(25, 12));

        // symmetric about both axes
        for row in 0..GRID_SIZE {
            for col in 0..GRID_SIZE {
                assert_eq!(is_visible(row, col), is_visible(GRID_SIZE - 1 - row, col));
                assert_eq!(is_visible(row, col), is_visible(row, GRID_SIZE - 1 - col));
            }
        }
        assert!(visible_count() > 450 && visible_count() < PIXEL_COUNT);
    }

    #[test]
    fn test_from_slice_length() {
        assert!(PixelFrame::from_slice(&[0u8; PIXEL_COUNT]).is_ok());
        assert_eq!(
            PixelFrame::from_slice(&[1u8; 10]),
            Err(FrameError::Length { expected: PIXEL_COUNT, actual: 10 })
        );
    }

    #[test]
    fn test_filled_respects_mask() {
        let frame = PixelFrame::filled(200);
        assert_eq!(frame.lit_count(), visible_count());
        assert_eq!(frame.get(0, 0), 0);
        assert_eq!(frame.get(12, 12), 200);
    }

    #[test]
    fn test_apply_mask() {
        let mut frame = PixelFrame::from_array([255; PIXEL_COUNT]);
        frame.apply_mask();
        assert_eq!(frame.lit_count(), visible_count());
    }

    #[test]
    fn test_ring_and_disc() {
        let mut ring = PixelFrame::blank();
        ring.ring(6, 180, 1);
        assert_eq!(ring.get(12, 12), 0);
        assert!(ring.get(6, 12) == 180 || ring.get(7, 12) == 180);
        assert!(ring.get(18, 12) == 180 || ring.get(17, 12) == 180);
        assert_eq!(ring.get(12, 10), 0);

        let mut disc = PixelFrame::blank();
        disc.disc(3, 90);
        assert_eq!(disc.get(12, 12), 90);
        assert_eq!(disc.get(12, 20), 0);
        assert!(disc.lit_count() > ring.lit_count() / 4);
    }

    #[test]
    fn test_spoke_points_up() {
        let mut frame = PixelFrame::blank();
        frame.spoke(0.0, 10.0, 255);
        assert_eq!(frame.get(12, 12), 255);
        assert_eq!(frame.get(2, 12), 255);
        assert_eq!(frame.get(20, 12), 0);
        assert_eq!(polar_point(90.0, 10.0), Point::new(22, 12));
    }

    #[test]
    fn test_map() {
        let mut a = PixelFrame::blank();
        a.set(1, 12, 10);
        let b = a.map(|v| v.saturating_mul(2));
        assert_eq!(b.get(1, 12), 20);
        a.set(40, 40, 9);
        assert_eq!(a.get(40, 40), 0);
    }
}
