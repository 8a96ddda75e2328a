/*
 *  brightness.rs
 *
 *  LyRing - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Brightness transfer model - theme brightness to hardware value and
 *  to the perceptual alpha used by previews
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

use crate::matrix::PixelFrame;

/// Lowest alpha a lit cell can have in a preview; the panel stays clearly
/// visible at the bottom of its range.
pub const PREVIEW_ALPHA_FLOOR: f32 = 0.5;

/// Hardware value for a raw pixel under the theme brightness.
///
/// Zero stays zero, otherwise `round(pixel * brightness / 255)`.
#[inline]
pub fn final_brightness(pixel_value: u8, theme_brightness: u8) -> u8 {
    if pixel_value == 0 {
        return 0;
    }
    let scaled = (pixel_value as f32 * theme_brightness as f32 / 255.0).round();
    scaled.clamp(0.0, 255.0) as u8
}

/// Perceptual alpha (0..1) a preview should draw the cell with so it
/// matches the square-root response of the physical panel.
pub fn preview_alpha(pixel_value: u8, theme_brightness: u8) -> f32 {
    if pixel_value == 0 {
        return 0.0;
    }
    let normalized = final_brightness(pixel_value, theme_brightness) as f32 / 255.0;
    let alpha = PREVIEW_ALPHA_FLOOR + normalized.sqrt() * (1.0 - PREVIEW_ALPHA_FLOOR);
    alpha.clamp(0.0, 1.0)
}

/// 0.0..=1.0 multiplier to a 0..=255 brightness.
pub fn multiplier_to_brightness(multiplier: f32) -> u8 {
    (multiplier.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Inverse of [`multiplier_to_brightness`].
pub fn brightness_to_multiplier(brightness: u8) -> f32 {
    (brightness as f32 / 255.0).clamp(0.0, 1.0)
}

/// Frame with every cell passed through [`final_brightness`].
pub fn apply_to_frame(frame: &PixelFrame, theme_brightness: u8) -> PixelFrame {
    frame.map(|px| final_brightness(px, theme_brightness))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_pixel_is_always_off() {
        for b in 0..=255u8 {
            assert_eq!(final_brightness(0, b), 0);
            assert_eq!(preview_alpha(0, b), 0.0);
        }
    }

    #[test]
    fn test_half_brightness_scenario() {
        assert_eq!(final_brightness(255, 128), 128);
        assert_eq!(final_brightness(255, 255), 255);
        assert_eq!(final_brightness(100, 0), 0);
    }

    #[test]
    fn test_monotonic_in_both_arguments() {
        for b in (0..=255u8).step_by(5) {
            let mut prev = 0;
            for p in 0..=255u8 {
                let v = final_brightness(p, b);
                assert!(v >= prev, "pixel {} brightness {}", p, b);
                prev = v;
            }
        }
        for p in (0..=255u8).step_by(5) {
            let mut prev = 0;
            for b in 0..=255u8 {
                let v = final_brightness(p, b);
                assert!(v >= prev, "pixel {} brightness {}", p, b);
                prev = v;
            }
        }
    }

    #[test]
    fn test_preview_alpha_curve() {
        assert_eq!(preview_alpha(255, 255), 1.0);
        // lit but rounded to zero by a zero brightness sits on the floor
        assert_eq!(preview_alpha(200, 0), PREVIEW_ALPHA_FLOOR);
        let quarter = preview_alpha(255, 64);
        assert!(quarter > 0.7 && quarter < 0.8, "{}", quarter);
    }

    #[test]
    fn test_multiplier_conversions() {
        assert_eq!(multiplier_to_brightness(0.0), 0);
        assert_eq!(multiplier_to_brightness(1.0), 255);
        assert_eq!(multiplier_to_brightness(0.5), 128);
        assert_eq!(multiplier_to_brightness(3.0), 255);
        assert_eq!(multiplier_to_brightness(-1.0), 0);
        assert_eq!(brightness_to_multiplier(255), 1.0);
        assert_eq!(multiplier_to_brightness(brightness_to_multiplier(77)), 77);
    }

    #[test]
    fn test_apply_to_frame() {
        let frame = PixelFrame::filled(255);
        let out = apply_to_frame(&frame, 128);
        assert_eq!(out.get(12, 12), 128);
        assert_eq!(out.get(0, 0), 0);
    }
}
