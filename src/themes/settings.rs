/*
 *  themes/settings.rs
 *
 *  LyRing - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Opaque key/value settings and the typed readers themes use to
 *  reinterpret them
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

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::time::Duration;

use super::{ThemeError, MAX_SPEED_MS, MIN_SPEED_MS};
use crate::sequence::FrameTransition;

/// Settings as delivered by the settings store; meaning is up to the theme.
pub type Settings = BTreeMap<String, Value>;

fn invalid(key: &str, reason: impl Into<String>) -> ThemeError {
    ThemeError::InvalidSetting { key: key.to_string(), reason: reason.into() }
}

/// `brightness` (0..=255), `default` when absent.
pub fn brightness(settings: &Settings, default: u8) -> Result<u8, ThemeError> {
    match settings.get("brightness") {
        None | Some(Value::Null) => Ok(default),
        Some(v) => {
            let b = v.as_i64().ok_or_else(|| invalid("brightness", "expected an integer"))?;
            u8::try_from(b).map_err(|_| ThemeError::BrightnessOutOfRange(b))
        }
    }
}

/// `speed_ms` (50..=2000), `default` when absent.
pub fn speed(settings: &Settings, default: Duration) -> Result<Duration, ThemeError> {
    match settings.get("speed_ms") {
        None | Some(Value::Null) => Ok(default),
        Some(v) => {
            let ms = v.as_u64().ok_or_else(|| invalid("speed_ms", "expected a positive integer"))?;
            if !(MIN_SPEED_MS..=MAX_SPEED_MS).contains(&ms) {
                return Err(ThemeError::SpeedOutOfRange(ms));
            }
            Ok(Duration::from_millis(ms))
        }
    }
}

/// A float setting constrained to `range`.
pub fn float(
    settings: &Settings,
    key: &str,
    default: f32,
    range: RangeInclusive<f32>,
) -> Result<f32, ThemeError> {
    match settings.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(v) => {
            let f = v.as_f64().ok_or_else(|| invalid(key, "expected a number"))? as f32;
            if !range.contains(&f) {
                return Err(invalid(key, format!("{} outside {:?}", f, range)));
            }
            Ok(f)
        }
    }
}

/// Strictly ascending list of floats, used for tier thresholds.
pub fn ascending_floats(settings: &Settings, key: &str) -> Result<Option<Vec<f32>>, ThemeError> {
    let Some(v) = settings.get(key) else { return Ok(None) };
    let list: Vec<f32> = serde_json::from_value(v.clone())
        .map_err(|e| invalid(key, e.to_string()))?;
    if list.is_empty() {
        return Err(invalid(key, "list is empty"));
    }
    if list.windows(2).any(|w| w[1] <= w[0]) {
        return Err(invalid(key, "values must be strictly ascending"));
    }
    Ok(Some(list))
}

/// Per-frame durations in ms, each 50..=2000.
pub fn durations(settings: &Settings, key: &str) -> Result<Option<Vec<Duration>>, ThemeError> {
    let Some(v) = settings.get(key) else { return Ok(None) };
    let list: Vec<u64> = serde_json::from_value(v.clone())
        .map_err(|e| invalid(key, e.to_string()))?;
    list.into_iter()
        .map(|ms| {
            if (MIN_SPEED_MS..=MAX_SPEED_MS).contains(&ms) {
                Ok(Duration::from_millis(ms))
            } else {
                Err(ThemeError::SpeedOutOfRange(ms))
            }
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

/// Either `[from, to, repetitions, duration_ms]` or the named form.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TransitionSetting {
    Tuple(usize, usize, u32, u64),
    Named {
        from: usize,
        to: usize,
        #[serde(default = "one")]
        repetitions: u32,
        duration_ms: u64,
    },
}

fn one() -> u32 {
    1
}

/// Transition list; bounds are checked here, frame indices when the sequencer is built.
pub fn transitions(settings: &Settings, key: &str) -> Result<Option<Vec<FrameTransition>>, ThemeError> {
    let Some(v) = settings.get(key) else { return Ok(None) };
    let raw: Vec<TransitionSetting> = serde_json::from_value(v.clone())
        .map_err(|e| invalid(key, e.to_string()))?;
    let list = raw
        .into_iter()
        .map(|t| match t {
            TransitionSetting::Tuple(from, to, reps, ms) => FrameTransition::new(from, to, reps, ms),
            TransitionSetting::Named { from, to, repetitions, duration_ms } => {
                FrameTransition::new(from, to, repetitions, duration_ms)
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(list))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::SequenceError;
    use serde_json::json;

    fn settings(v: Value) -> Settings {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_brightness_and_speed() {
        let s = settings(json!({"brightness": 128, "speed_ms": 120}));
        assert_eq!(brightness(&s, 255).unwrap(), 128);
        assert_eq!(speed(&s, Duration::from_millis(80)).unwrap(), Duration::from_millis(120));

        let empty = Settings::new();
        assert_eq!(brightness(&empty, 200).unwrap(), 200);

        let s = settings(json!({"brightness": 300, "speed_ms": 5}));
        assert_eq!(brightness(&s, 0).unwrap_err(), ThemeError::BrightnessOutOfRange(300));
        assert_eq!(speed(&s, Duration::ZERO).unwrap_err(), ThemeError::SpeedOutOfRange(5));

        let s = settings(json!({"brightness": "bright"}));
        assert!(matches!(brightness(&s, 0), Err(ThemeError::InvalidSetting { .. })));
    }

    #[test]
    fn test_float_range() {
        let s = settings(json!({"bass_weight": 0.6, "beat_multiplier": 9.0}));
        assert_eq!(float(&s, "bass_weight", 0.4, 0.0..=1.0).unwrap(), 0.6);
        assert_eq!(float(&s, "mid_weight", 0.2, 0.0..=1.0).unwrap(), 0.2);
        assert!(float(&s, "beat_multiplier", 1.3, 1.0..=4.0).is_err());
    }

    #[test]
    fn test_thresholds_must_ascend() {
        let s = settings(json!({"thresholds": [0.1, 0.5, 0.9]}));
        assert_eq!(ascending_floats(&s, "thresholds").unwrap(), Some(vec![0.1, 0.5, 0.9]));
        let s = settings(json!({"thresholds": [0.5, 0.1]}));
        assert!(ascending_floats(&s, "thresholds").is_err());
        let s = settings(json!({"thresholds": []}));
        assert!(ascending_floats(&s, "thresholds").is_err());
    }

    #[test]
    fn test_transitions_both_forms() {
        let s = settings(json!({
            "transitions": [[0, 1, 3, 100], {"from": 2, "to": 3, "duration_ms": 250}]
        }));
        let list = transitions(&s, "transitions").unwrap().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].repetitions(), 3);
        assert_eq!(list[1].repetitions(), 1);
        assert_eq!(list[1].duration(), Duration::from_millis(250));

        let s = settings(json!({"transitions": [[0, 1, 0, 100]]}));
        assert_eq!(
            transitions(&s, "transitions").unwrap_err(),
            ThemeError::Sequence(SequenceError::ZeroRepetitions)
        );
        assert!(transitions(&Settings::new(), "transitions").unwrap().is_none());
    }

    #[test]
    fn test_durations() {
        let s = settings(json!({"durations": [100, 200]}));
        assert_eq!(
            durations(&s, "durations").unwrap().unwrap(),
            vec![Duration::from_millis(100), Duration::from_millis(200)]
        );
        let s = settings(json!({"durations": [10]}));
        assert_eq!(durations(&s, "durations").unwrap_err(), ThemeError::SpeedOutOfRange(10));
    }
}
