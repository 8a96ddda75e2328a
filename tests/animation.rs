// Animation driver against the built-in themes

use std::time::{Duration, Instant};

use lyring::audio::AudioData;
use lyring::brightness::final_brightness;
use lyring::driver::{AnimationDriver, DriverTiming, Reconcile};
use lyring::matrix::{is_visible, GRID_SIZE};
use lyring::player::{PlaybackStatus, PlayerState, SourceError};
use lyring::sequence::{FrameTransition, FrameTransitionSequence};
use lyring::themes::{build_theme, Settings};
use serde_json::json;

fn driver_for(name: &str, settings: serde_json::Value) -> AnimationDriver {
    let settings: Settings = serde_json::from_value(settings).unwrap();
    let theme = build_theme(name, &settings).unwrap();
    AnimationDriver::new(theme, DriverTiming::default()).unwrap()
}

fn assert_masked(frame: &lyring::PixelFrame) {
    for row in 0..GRID_SIZE {
        for col in 0..GRID_SIZE {
            if !is_visible(row, col) {
                assert_eq!(frame.get(row, col), 0, "off-mask cell ({row},{col}) lit");
            }
        }
    }
}

#[test]
fn test_every_rendered_frame_is_masked_and_dimmed() {
    let now = Instant::now();
    let loud = AudioData::new(0.9, 1.0, 0.8, 0.7, true);
    for name in lyring::themes::available_themes() {
        let mut d = driver_for(name, json!({"brightness": 128}));
        d.reconcile(Ok(PlaybackStatus::PLAYING), now);
        for _ in 0..40 {
            let f = d.render(Some(&loud), now);
            assert_masked(&f.pixels);
            assert!(f.pixels.peak() <= 128, "{name} exceeded theme brightness");
            assert_eq!(f.brightness, 128);
            d.advance(now);
        }
    }
}

#[test]
fn test_orbit_plays_opening_then_pauses_on_state_frame() {
    let now = Instant::now();
    let mut d = driver_for("orbit", json!({}));
    d.reconcile(Ok(PlaybackStatus::PLAYING), now);
    assert!(d.in_opening());
    assert_eq!(d.frame_duration(None, now), Duration::from_millis(140));

    let mut seen = Vec::new();
    for _ in 0..6 {
        seen.push(d.frame_index());
        d.advance(now);
    }
    assert_eq!(seen, vec![8, 9, 10, 0, 0, 1]);

    d.reconcile(Ok(PlaybackStatus::PAUSED), now);
    let paused = d.render(None, now);
    assert_eq!(paused.state, PlayerState::Paused);
    assert_eq!(paused.pixels.peak(), final_brightness(50, 220));

    // resume from pause replays the opening
    d.reconcile(Ok(PlaybackStatus::PLAYING), now);
    assert!(d.in_opening());
    assert_eq!(d.frame_index(), 8);
}

#[test]
fn test_pulse_resumes_at_captured_frame() {
    let now = Instant::now();
    let mut d = driver_for("pulse", json!({}));
    d.reconcile(Ok(PlaybackStatus::PLAYING), now);
    for _ in 0..7 {
        d.advance(now);
    }
    d.reconcile(Ok(PlaybackStatus::PAUSED), now);
    assert_eq!(d.resume_index(), Some(7));
    d.reconcile(Ok(PlaybackStatus::PLAYING), now);
    assert_eq!(d.frame_index(), 7);

    // offline then playing starts over
    d.reconcile(Ok(PlaybackStatus::OFFLINE), now);
    d.reconcile(Ok(PlaybackStatus::PLAYING), now);
    assert_eq!(d.frame_index(), 0);
}

#[test]
fn test_pulse_audio_frames_differ_from_standard_frames() {
    let now = Instant::now();
    let mut with_audio = driver_for("pulse", json!({}));
    let mut without = driver_for("pulse", json!({}));
    with_audio.reconcile(Ok(PlaybackStatus::PLAYING), now);
    without.reconcile(Ok(PlaybackStatus::PLAYING), now);

    let audio = AudioData::new(0.5, 0.9, 0.6, 0.3, true);
    let mut differs = false;
    for _ in 0..6 {
        let a = with_audio.render(Some(&audio), now);
        let b = without.render(None, now);
        differs |= a.pixels != b.pixels;
        with_audio.advance(now);
        without.advance(now);
    }
    assert!(differs);
}

#[test]
fn test_breathe_uses_duration_table_and_freezes_when_paused() {
    let now = Instant::now();
    let mut d = driver_for("breathe", json!({"speed_ms": 100}));
    d.reconcile(Ok(PlaybackStatus::PLAYING), now);
    assert_eq!(d.frame_duration(None, now), Duration::from_millis(300));
    d.advance(now);
    assert_eq!(d.frame_duration(None, now), Duration::from_millis(100));

    let last = d.render(None, now);
    d.reconcile(Ok(PlaybackStatus::PAUSED), now);
    let frozen = d.render(None, now);
    assert_eq!(frozen.pixels, last.pixels);
    assert_eq!(frozen.state, PlayerState::Paused);
}

#[test]
fn test_prediction_lifecycle_with_real_theme() {
    let start = Instant::now();
    let mut d = driver_for("pulse", json!({}));
    d.reconcile(Ok(PlaybackStatus::PAUSED), start);

    assert_eq!(d.request_toggle(start), Some(PlayerState::Playing));
    assert_eq!(d.render(None, start).state, PlayerState::Playing);

    // remote has not caught up yet
    let t = start + Duration::from_millis(300);
    assert_eq!(d.reconcile(Ok(PlaybackStatus::PAUSED), t), Reconcile::Suppressed);
    assert!(d.is_animating(t));

    // and never does
    let t = start + Duration::from_millis(1001);
    assert_eq!(
        d.reconcile(Ok(PlaybackStatus::PAUSED), t),
        Reconcile::Expired { predicted: PlayerState::Playing, observed: PlayerState::Paused }
    );
    assert_eq!(d.render(None, t).state, PlayerState::Paused);

    // failure path: toggle, command fails, revert
    assert_eq!(d.request_toggle(t), Some(PlayerState::Playing));
    assert!(d.revert_prediction());
    assert_eq!(d.state(t), PlayerState::Paused);
    assert_eq!(d.frame_duration(None, t), DriverTiming::default().idle_fast);

    let r = d.reconcile(Err(SourceError::Status("gone".into())), t);
    assert_eq!(r, Reconcile::Changed { from: PlayerState::Paused, to: PlayerState::Error });
    assert_eq!(d.frame_duration(None, t), DriverTiming::default().idle_slow);
}

#[test]
fn test_sequencer_alternates_and_reports_wrap() {
    let main = vec![FrameTransition::new(0, 1, 3, 100).unwrap()];
    let mut seq = FrameTransitionSequence::new(main, None, 2).unwrap();
    let mut frames = vec![seq.current_frame_index()];
    let mut results = Vec::new();
    for _ in 0..6 {
        results.push(seq.advance());
        frames.push(seq.current_frame_index());
    }
    assert_eq!(&frames[..6], &[0, 1, 0, 1, 0, 1]);
    assert_eq!(results[5], false);
    assert!(results[..5].iter().all(|&r| r));
}
