/*
 *  main.rs
 *
 *  LyRing - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Demo front end: simulated player, keyboard long press, device and
 *  optional console preview
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

use anyhow::{Context, Result};
use env_logger::Env;
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal::unix::{signal, SignalKind};

use lyring::config::{self, DriverKind};
use lyring::demo::{SimulatedAudio, SimulatedPlayer};
use lyring::display::DisplayDriverFactory;
use lyring::service::AnimationService;
use lyring::themes::{available_themes, ThemeManager};

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// How long the simulated session takes to act on a command.
const COMMAND_LAG: Duration = Duration::from_millis(250);
/// Simulated audio beat period, in samples.
const BEAT_EVERY: u64 = 12;

/// One line from stdin.
#[derive(Debug, PartialEq)]
enum Input {
    /// bare Enter is the long press
    Toggle,
    Media,
    Theme(String),
    Setting(String, serde_json::Value),
    Quit,
    Unknown(String),
}

impl Input {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        let mut words = line.splitn(3, char::is_whitespace);
        match (words.next(), words.next(), words.next()) {
            (None, ..) | (Some(""), ..) => Input::Toggle,
            (Some("o"), None, _) => Input::Media,
            (Some("q"), None, _) => Input::Quit,
            (Some("t"), Some(name), None) => Input::Theme(name.to_string()),
            (Some("s"), Some(key), Some(raw)) => {
                // JSON when it parses, plain string otherwise
                let value = serde_json::from_str(raw.trim())
                    .unwrap_or_else(|_| serde_json::Value::String(raw.trim().to_string()));
                Input::Setting(key.to_string(), value)
            }
            _ => Input::Unknown(line.to_string()),
        }
    }
}

/// Asynchronously waits for a SIGINT, SIGTERM, or SIGHUP signal.
async fn signal_handler() -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

/// Reads commands until `q` or end of input.
async fn keyboard(device: &AnimationService, player: &SimulatedPlayer, themes: &ThemeManager) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("stdin: {}", e);
                break;
            }
        };
        match Input::parse(&line) {
            Input::Toggle => {
                if !device.toggle() {
                    warn!("toggle dropped, service busy");
                }
            }
            Input::Media => {
                let available = player.toggle_media();
                info!("media {}", if available { "available" } else { "offline" });
            }
            Input::Theme(name) => {
                if available_themes().contains(&name.as_str()) {
                    themes.select_theme(&name);
                } else {
                    warn!("unknown theme '{}', try one of {:?}", name, available_themes());
                }
            }
            Input::Setting(key, value) => themes.set_setting(&key, value),
            Input::Quit => break,
            Input::Unknown(text) => {
                warn!("unknown command '{}' (Enter, o, t <theme>, s <key> <value>, q)", text)
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = config::load().context("loading configuration")?;

    env_logger::Builder::from_env(Env::default().default_filter_or(cfg.log_level()))
        .format_timestamp_secs()
        .init();

    info!("This {} worth the Squeeze", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);

    let themes = Arc::new(ThemeManager::new(cfg.theme(), cfg.settings()));
    if let Some(e) = themes.ensure_valid() {
        warn!("configured theme unusable ({}), running '{}'", e, themes.snapshot().name);
    }
    let timing = cfg.timing();
    let player = SimulatedPlayer::new(COMMAND_LAG);

    let display_cfg = cfg.display.clone().unwrap_or_default();
    let device_display = DisplayDriverFactory::create_from_config(&display_cfg)
        .context("creating device display")?;
    let device = AnimationService::spawn(
        "device",
        Arc::clone(&themes),
        player.clone(),
        player.clone(),
        Some(SimulatedAudio::new(BEAT_EVERY).follow(player.clone())),
        device_display,
        timing,
    )
    .context("starting device service")?;

    let preview = if cfg.preview() && cfg.driver() != DriverKind::Console {
        let preview_display = DisplayDriverFactory::create(DriverKind::Console)
            .context("creating preview display")?;
        Some(
            AnimationService::spawn(
                "preview",
                Arc::clone(&themes),
                player.clone(),
                player.clone(),
                Some(SimulatedAudio::new(BEAT_EVERY).follow(player.clone())),
                preview_display,
                timing,
            )
            .context("starting preview service")?,
        )
    } else {
        None
    };

    info!("Enter toggles play/pause, 'o' toggles media, 't <theme>' switches theme, 'q' quits");

    tokio::select! {
        res = signal_handler() => {
            if let Err(e) = res {
                error!("signal handler failed: {}", e);
            }
        }
        _ = keyboard(&device, &player, &themes) => {
            info!("Closed keyboard loop.");
        }
    }

    info!("Main application exiting. Clearing display and stopping services.");
    if let Some(preview) = preview {
        preview.shutdown().await?;
    }
    device.shutdown().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_input_parse() {
        assert_eq!(Input::parse(""), Input::Toggle);
        assert_eq!(Input::parse("  \n"), Input::Toggle);
        assert_eq!(Input::parse("o"), Input::Media);
        assert_eq!(Input::parse("q"), Input::Quit);
        assert_eq!(Input::parse("t orbit"), Input::Theme("orbit".into()));
        assert_eq!(Input::parse("s brightness 90"), Input::Setting("brightness".into(), json!(90)));
        assert_eq!(
            Input::parse("s transitions [[0,1,2,100]]"),
            Input::Setting("transitions".into(), json!([[0, 1, 2, 100]]))
        );
        assert_eq!(Input::parse("s easing cubic"), Input::Setting("easing".into(), json!("cubic")));
        assert!(matches!(Input::parse("t"), Input::Unknown(_)));
        assert!(matches!(Input::parse("dance"), Input::Unknown(_)));
    }
}
