/*
 *  service.rs
 *
 *  LyRing - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Animation service - control loop, audio sampler, playback control
 *  and presentation tasks
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

use log::{debug, error, info, trace, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::audio::AudioData;
use crate::display::{BoxedDriver, DisplayError};
use crate::driver::{AnimationDriver, DriverTiming, RenderedFrame};
use crate::player::{AudioSource, PlaybackControl, PlaybackSource, SourceError};
use crate::themes::{ThemeError, ThemeManager};

/// Loop timings, resolved from configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServiceTiming {
    /// Minimum gap between playback status polls.
    pub poll: Duration,
    /// Audio sampling period while animating.
    pub audio_sample: Duration,
    /// Audio sampler nap while idle.
    pub audio_idle: Duration,
    pub driver: DriverTiming,
}

impl Default for ServiceTiming {
    fn default() -> Self {
        Self {
            poll: Duration::from_millis(10),
            audio_sample: Duration::from_millis(20),
            audio_idle: Duration::from_millis(250),
            driver: DriverTiming::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("theme could not be activated: {0}")]
    Theme(#[from] ThemeError),
    #[error("display initialization failed: {0}")]
    Display(#[from] DisplayError),
    #[error("service task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceCommand {
    /// User long press: play/pause.
    TogglePlayback,
}

/// Outcome of one playback command, tagged with the toggle that issued it.
type ToggleResult = (u64, Result<(), SourceError>);

/// Handle to a running animation service.
pub struct AnimationService {
    name: String,
    cmd_tx: Sender<ServiceCommand>,
    shutdown_tx: watch::Sender<bool>,
    frame_rx: watch::Receiver<Option<RenderedFrame>>,
    tasks: Vec<JoinHandle<()>>,
}

impl AnimationService {
    /// Validates the selected theme, initializes `display` and starts the
    /// control loop, optional audio sampler, playback control worker and
    /// presenter.
    pub fn spawn<P, C, A>(
        name: &str,
        themes: Arc<ThemeManager>,
        playback: P,
        control: C,
        audio: Option<A>,
        mut display: BoxedDriver,
        timing: ServiceTiming,
    ) -> Result<Self, ServiceError>
    where
        P: PlaybackSource,
        C: PlaybackControl,
        A: AudioSource,
    {
        let (generation, theme) = themes.build_active();
        let driver = AnimationDriver::new(theme?, timing.driver)?;
        display.init()?;
        info!(
            "{}: starting on {} display with theme '{}'",
            name,
            display.capabilities().name,
            driver.theme().name()
        );

        // small bounded queues, frames and audio are last-write-wins
        let (cmd_tx, cmd_rx) = mpsc::channel::<ServiceCommand>(16);
        let (toggle_tx, toggle_rx) = mpsc::channel::<u64>(4);
        let (result_tx, result_rx) = mpsc::channel::<ToggleResult>(4);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (frame_tx, frame_rx) = watch::channel::<Option<RenderedFrame>>(None);
        let (audio_tx, audio_rx) = watch::channel::<Option<AudioData>>(None);
        let (playing_tx, playing_rx) = watch::channel(false);

        let mut tasks = Vec::with_capacity(4);

        let control_loop = ControlLoop {
            name: name.to_string(),
            driver,
            themes,
            generation,
            playback,
            cmd_rx,
            toggle_tx,
            result_rx,
            audio_rx,
            frame_tx,
            playing_tx,
            shutdown_rx: shutdown_rx.clone(),
            poll: timing.poll,
            last_poll: None,
        };
        tasks.push(tokio::spawn(control_loop.run()));

        tasks.push(tokio::spawn(control_worker(
            control,
            toggle_rx,
            result_tx,
            shutdown_rx.clone(),
        )));

        if let Some(source) = audio {
            tasks.push(tokio::spawn(audio_sampler(
                source,
                audio_tx,
                playing_rx,
                shutdown_rx.clone(),
                timing,
            )));
        }

        tasks.push(tokio::spawn(presenter(display, frame_rx.clone(), shutdown_rx)));

        Ok(Self {
            name: name.to_string(),
            cmd_tx,
            shutdown_tx,
            frame_rx,
            tasks,
        })
    }

    /// Long press. Best effort, returns false if the service is gone or busy.
    pub fn toggle(&self) -> bool {
        self.cmd_tx.try_send(ServiceCommand::TogglePlayback).is_ok()
    }

    /// Latest rendered frame, for observers other than the display.
    pub fn frames(&self) -> watch::Receiver<Option<RenderedFrame>> {
        self.frame_rx.clone()
    }

    /// Stops every task and waits for them. No frame reaches the display
    /// after this returns.
    pub async fn shutdown(mut self) -> Result<(), ServiceError> {
        info!("{}: shutting down", self.name);
        let _ = self.shutdown_tx.send(true);
        let mut first_err = None;
        for handle in self.tasks.drain(..) {
            if let Err(e) = handle.await {
                error!("{}: task ended abnormally: {}", self.name, e);
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

impl Drop for AnimationService {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        for handle in self.tasks.drain(..) {
            handle.abort();
        }
    }
}

struct ControlLoop<P: PlaybackSource> {
    name: String,
    driver: AnimationDriver,
    themes: Arc<ThemeManager>,
    generation: u64,
    playback: P,
    cmd_rx: Receiver<ServiceCommand>,
    toggle_tx: Sender<u64>,
    result_rx: Receiver<ToggleResult>,
    audio_rx: watch::Receiver<Option<AudioData>>,
    frame_tx: watch::Sender<Option<RenderedFrame>>,
    playing_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    poll: Duration,
    last_poll: Option<Instant>,
}

impl<P: PlaybackSource> ControlLoop<P> {
    async fn run(mut self) {
        debug!("{}: control loop started", self.name);
        loop {
            if *self.shutdown_rx.borrow() {
                break;
            }

            self.refresh_theme();

            while let Ok(cmd) = self.cmd_rx.try_recv() {
                self.handle_command(cmd);
            }
            while let Ok(result) = self.result_rx.try_recv() {
                self.handle_toggle_result(result);
            }

            let due = self
                .last_poll
                .is_none_or(|t| t.elapsed() >= self.poll);
            if due {
                let status = tokio::select! {
                    s = self.playback.status() => s,
                    _ = self.shutdown_rx.changed() => break,
                };
                self.last_poll = Some(Instant::now());
                self.driver.reconcile(status, Instant::now());
            }

            let now = Instant::now();
            let animating = self.driver.is_animating(now);
            self.playing_tx.send_if_modified(|playing| {
                let changed = *playing != animating;
                *playing = animating;
                changed
            });

            let audio = *self.audio_rx.borrow();
            let frame = self.driver.render(audio.as_ref(), now);
            self.frame_tx.send_if_modified(|slot| {
                if slot.as_ref() == Some(&frame) {
                    false
                } else {
                    *slot = Some(frame);
                    true
                }
            });

            let wait = self.driver.frame_duration(audio.as_ref(), now);
            trace!("{}: holding frame {} for {:?}", self.name, self.driver.frame_index(), wait);

            tokio::select! {
                _ = sleep(wait) => {
                    self.driver.advance(Instant::now());
                }
                Some(cmd) = self.cmd_rx.recv() => {
                    self.handle_command(cmd);
                }
                Some(result) = self.result_rx.recv() => {
                    self.handle_toggle_result(result);
                }
                _ = self.shutdown_rx.changed() => {
                    break;
                }
            }
        }
        debug!("{}: control loop stopped", self.name);
    }

    /// Rebuilds theme and sequencer when the shared selection moved.
    fn refresh_theme(&mut self) {
        if self.themes.generation() == self.generation {
            return;
        }
        let (generation, built) = self.themes.build_active();
        self.generation = generation;
        if let Err(e) = built.and_then(|theme| self.driver.set_theme(theme)) {
            warn!(
                "{}: theme change rejected, keeping '{}': {}",
                self.name,
                self.driver.theme().name(),
                e
            );
        }
    }

    fn handle_command(&mut self, cmd: ServiceCommand) {
        match cmd {
            ServiceCommand::TogglePlayback => {
                let Some(id) = self
                    .driver
                    .request_toggle(Instant::now())
                    .and_then(|_| self.driver.prediction())
                    .map(|p| p.id)
                else {
                    return;
                };
                if self.toggle_tx.try_send(id).is_err() {
                    warn!("{}: playback control busy, toggle #{} dropped", self.name, id);
                    self.driver.revert_toggle(id);
                }
            }
        }
    }

    fn handle_toggle_result(&mut self, (id, result): ToggleResult) {
        if let Err(e) = result {
            warn!("{}: toggle #{}: {}", self.name, id, e);
            self.driver.revert_toggle(id);
        }
    }
}

/// Issues playback toggles one at a time so a slow media session never
/// stalls the animation.
async fn control_worker<C: PlaybackControl>(
    mut control: C,
    mut toggle_rx: Receiver<u64>,
    result_tx: Sender<ToggleResult>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    while let Some(id) = toggle_rx.recv().await {
        let result = tokio::select! {
            r = control.toggle_playback() => r,
            _ = shutdown_rx.changed() => break,
        };
        if result_tx.send((id, result)).await.is_err() {
            break;
        }
    }
}

/// Samples audio quickly while animating and naps otherwise. Failed samples
/// publish None so the themes fall back to their standard frames.
async fn audio_sampler<A: AudioSource>(
    mut source: A,
    audio_tx: watch::Sender<Option<AudioData>>,
    mut playing_rx: watch::Receiver<bool>,
    mut shutdown_rx: watch::Receiver<bool>,
    timing: ServiceTiming,
) {
    loop {
        let playing = *playing_rx.borrow_and_update();
        let wait = if playing {
            let sample = tokio::select! {
                s = source.sample() => s,
                _ = shutdown_rx.changed() => break,
            };
            let value = match sample {
                Ok(data) => Some(data),
                Err(e) => {
                    trace!("{}", e);
                    None
                }
            };
            audio_tx.send_replace(value);
            timing.audio_sample
        } else {
            audio_tx.send_if_modified(|slot| slot.take().is_some());
            timing.audio_idle
        };

        tokio::select! {
            _ = sleep(wait) => {}
            changed = playing_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = shutdown_rx.changed() => break,
        }
    }
}

/// Pushes each new frame to the display. Display errors are logged and the
/// frame skipped.
async fn presenter(
    mut display: BoxedDriver,
    mut frame_rx: watch::Receiver<Option<RenderedFrame>>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let supports_brightness = display.capabilities().supports_brightness;
    let mut brightness: Option<u8> = None;

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.changed() => break,
            changed = frame_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
        if *shutdown_rx.borrow() {
            break;
        }

        let Some(frame) = frame_rx.borrow_and_update().clone() else {
            continue;
        };

        if supports_brightness && brightness != Some(frame.brightness) {
            match display.set_brightness(frame.brightness) {
                Ok(()) => brightness = Some(frame.brightness),
                Err(e) => warn!("display brightness: {}", e),
            }
        }
        if let Err(e) = display.write_frame(&frame).and_then(|_| display.flush()) {
            warn!("display frame skipped: {}", e);
        }
    }

    if let Err(e) = display.clear() {
        warn!("display clear on shutdown failed: {}", e);
    }
}
