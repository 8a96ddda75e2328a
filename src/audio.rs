/*
 *  audio.rs
 *
 *  LyRing - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Audio feature fusion - weighted intensity, tiers, beat detection
 *  and easing for audio driven scale values
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

use arrayvec::ArrayVec;
use std::f32::consts::PI;

/// Samples kept by [`BeatDetector`].
pub const BEAT_HISTORY_CAPACITY: usize = 8;
/// Samples required before [`detect_beat`] will report anything.
pub const BEAT_MIN_HISTORY: usize = 4;

/// One sampling tick from the visualizer; every level is 0..=1.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AudioData {
    pub beat_intensity: f32,
    pub bass_level: f32,
    pub mid_level: f32,
    pub treble_level: f32,
    pub is_playing: bool,
}

impl AudioData {
    pub fn new(beat: f32, bass: f32, mid: f32, treble: f32, is_playing: bool) -> Self {
        Self {
            beat_intensity: beat.clamp(0.0, 1.0),
            bass_level: bass.clamp(0.0, 1.0),
            mid_level: mid.clamp(0.0, 1.0),
            treble_level: treble.clamp(0.0, 1.0),
            is_playing,
        }
    }

    pub fn silent() -> Self {
        Self::default()
    }
}

/// Relative weights a theme applies to the four features.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureWeights {
    pub beat: f32,
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
}

impl FeatureWeights {
    /// Bass forward mix for pulsing visuals.
    pub const BASS_PULSE: FeatureWeights = FeatureWeights { beat: 0.3, bass: 0.4, mid: 0.2, treble: 0.1 };
    pub const EVEN: FeatureWeights = FeatureWeights { beat: 1.0, bass: 1.0, mid: 1.0, treble: 1.0 };

    pub fn intensity(&self, data: &AudioData) -> f32 {
        weighted_intensity(data, self.bass, self.mid, self.treble, self.beat)
    }
}

impl Default for FeatureWeights {
    fn default() -> Self {
        Self::BASS_PULSE
    }
}

/// Normalised weighted mean of the four features, clamped to 0..=1.
/// A zero weight sum yields 0.
pub fn weighted_intensity(
    data: &AudioData,
    bass_weight: f32,
    mid_weight: f32,
    treble_weight: f32,
    beat_weight: f32,
) -> f32 {
    let total = beat_weight + bass_weight + mid_weight + treble_weight;
    if total <= f32::EPSILON {
        return 0.0;
    }
    let sum = data.beat_intensity * beat_weight
        + data.bass_level * bass_weight
        + data.mid_level * mid_weight
        + data.treble_level * treble_weight;
    (sum / total).clamp(0.0, 1.0)
}

/// Tier index for `value`: the number of ascending `thresholds` it strictly exceeds.
pub fn classify_intensity(value: f32, thresholds: &[f32]) -> usize {
    for (i, threshold) in thresholds.iter().enumerate() {
        if value <= *threshold {
            return i;
        }
    }
    thresholds.len()
}

/// Default tier boundaries, quiet to maximum.
pub const DEFAULT_TIER_THRESHOLDS: [f32; 4] = [0.15, 0.4, 0.7, 0.85];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IntensityTier {
    Silent,
    Quiet,
    Moderate,
    Loud,
    VeryLoud,
}

impl IntensityTier {
    /// Tier for an index from [`classify_intensity`], saturating at `VeryLoud`.
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => IntensityTier::Silent,
            1 => IntensityTier::Quiet,
            2 => IntensityTier::Moderate,
            3 => IntensityTier::Loud,
            _ => IntensityTier::VeryLoud,
        }
    }

    pub fn classify(value: f32, thresholds: &[f32]) -> Self {
        Self::from_index(classify_intensity(value, thresholds))
    }
}

/// Beat test over a window of recent intensities.
///
/// Needs at least [`BEAT_MIN_HISTORY`] samples; `current` must clear both the
/// static threshold and the window mean scaled by `relative_multiplier`.
pub fn detect_beat(
    history: &[f32],
    current: f32,
    static_threshold: f32,
    relative_multiplier: f32,
) -> bool {
    if history.len() < BEAT_MIN_HISTORY {
        return false;
    }
    let mean = history.iter().sum::<f32>() / history.len() as f32;
    current > static_threshold && current > mean * relative_multiplier
}

/// Per-theme rolling beat detector, oldest sample dropped once full.
#[derive(Debug, Clone)]
pub struct BeatDetector {
    history: ArrayVec<f32, BEAT_HISTORY_CAPACITY>,
    static_threshold: f32,
    relative_multiplier: f32,
}

impl BeatDetector {
    pub fn new(static_threshold: f32, relative_multiplier: f32) -> Self {
        Self {
            history: ArrayVec::new(),
            static_threshold,
            relative_multiplier,
        }
    }

    pub fn push(&mut self, sample: f32) {
        if self.history.is_full() {
            self.history.remove(0);
        }
        self.history.push(sample);
    }

    /// Tests `current` against the window, then records it.
    pub fn observe(&mut self, current: f32) -> bool {
        let beat = detect_beat(&self.history, current, self.static_threshold, self.relative_multiplier);
        self.push(current);
        beat
    }

    pub fn history(&self) -> &[f32] {
        &self.history
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}

impl Default for BeatDetector {
    fn default() -> Self {
        Self::new(0.3, 1.3)
    }
}

/// Curves for moving a scale value toward its target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Easing {
    Linear,
    CubicInOut,
    /// Damped sinusoidal overshoot with period `period`.
    ElasticOut { period: f32 },
}

impl Easing {
    pub const ELASTIC: Easing = Easing::ElasticOut { period: 0.3 };

    /// Shaping factor for `t` in 0..=1.
    pub fn factor(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match *self {
            Easing::Linear => t,
            Easing::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = -2.0 * t + 2.0;
                    1.0 - u * u * u / 2.0
                }
            }
            Easing::ElasticOut { period } => {
                if t == 0.0 || t == 1.0 {
                    return t;
                }
                let s = period / 4.0;
                2f32.powf(-10.0 * t) * ((t - s) * (2.0 * PI) / period).sin() + 1.0
            }
        }
    }

    /// `current + (target - current) * factor(t)`.
    pub fn apply(&self, current: f32, target: f32, t: f32) -> f32 {
        current + (target - current) * self.factor(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_intensity_bounds() {
        let silent = AudioData::silent();
        assert_eq!(weighted_intensity(&silent, 0.4, 0.2, 0.1, 0.3), 0.0);

        let full = AudioData::new(1.0, 1.0, 1.0, 1.0, true);
        for (bass, mid, treble, beat) in [(0.4, 0.2, 0.1, 0.3), (5.0, 1.0, 1.0, 1.0), (0.0, 0.0, 2.0, 0.0)] {
            let v = weighted_intensity(&full, bass, mid, treble, beat);
            assert!((v - 1.0).abs() < 1e-6, "{}", v);
        }
        assert_eq!(weighted_intensity(&full, 0.0, 0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_weighted_intensity_mix() {
        let bass_only = AudioData::new(0.0, 1.0, 0.0, 0.0, true);
        let v = FeatureWeights::BASS_PULSE.intensity(&bass_only);
        assert!((v - 0.4).abs() < 1e-6);
        let v = FeatureWeights::EVEN.intensity(&bass_only);
        assert!((v - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_classify_intensity() {
        let th = DEFAULT_TIER_THRESHOLDS;
        assert_eq!(classify_intensity(0.72, &th), 3);
        assert_eq!(IntensityTier::classify(0.72, &th), IntensityTier::Loud);
        assert_eq!(classify_intensity(0.0, &th), 0);
        assert_eq!(classify_intensity(0.15, &th), 0);
        assert_eq!(classify_intensity(0.16, &th), 1);
        assert_eq!(classify_intensity(0.9, &th), 4);
        assert_eq!(IntensityTier::classify(1.0, &th), IntensityTier::VeryLoud);
        assert_eq!(classify_intensity(0.5, &[]), 0);
    }

    #[test]
    fn test_detect_beat_needs_history() {
        assert!(!detect_beat(&[], 1.0, 0.0, 0.0));
        assert!(!detect_beat(&[0.1, 0.1, 0.1], 1.0, 0.3, 1.3));
        assert!(detect_beat(&[0.1, 0.1, 0.1, 0.1], 1.0, 0.3, 1.3));
        // loud but not above the running mean
        assert!(!detect_beat(&[0.9, 0.9, 0.9, 0.9], 0.95, 0.3, 1.3));
        // above mean but under static floor
        assert!(!detect_beat(&[0.01, 0.01, 0.01, 0.01], 0.2, 0.3, 1.3));
    }

    #[test]
    fn test_beat_detector_ring() {
        let mut det = BeatDetector::default();
        for _ in 0..3 {
            assert!(!det.observe(0.9));
        }
        for _ in 0..10 {
            det.observe(0.1);
        }
        assert_eq!(det.history().len(), BEAT_HISTORY_CAPACITY);
        assert!(det.history().iter().all(|v| *v == 0.1));
        assert!(det.observe(0.8));

        let mut other = BeatDetector::default();
        assert!(!other.observe(0.8));
    }

    #[test]
    fn test_easing_endpoints() {
        for e in [Easing::Linear, Easing::CubicInOut, Easing::ELASTIC] {
            assert_eq!(e.apply(2.0, 6.0, 0.0), 2.0);
            assert_eq!(e.apply(2.0, 6.0, 1.0), 6.0);
        }
        assert_eq!(Easing::Linear.apply(0.0, 10.0, 0.25), 2.5);
        assert!((Easing::CubicInOut.factor(0.5) - 0.5).abs() < 1e-6);
        assert!(Easing::CubicInOut.factor(0.25) < 0.25);
    }

    #[test]
    fn test_elastic_overshoots() {
        let e = Easing::ELASTIC;
        let peak = (1..100)
            .map(|i| e.factor(i as f32 / 100.0))
            .fold(f32::MIN, f32::max);
        assert!(peak > 1.0);
        assert!((e.factor(0.99) - 1.0).abs() < 0.01);
    }
}
