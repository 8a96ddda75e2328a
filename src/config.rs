/*
 *  config.rs
 *
 *  LyRing - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Layered configuration: defaults, YAML file, command line
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

use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}, time::Duration};
use thiserror::Error;

use crate::driver::DriverTiming;
use crate::service::ServiceTiming;
use crate::themes::Settings;

pub use crate::themes::DEFAULT_THEME;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub log_level: Option<String>,     // e.g., "info" | "debug"
    pub theme: Option<String>,         // catalog name
    /// opaque theme settings, each theme reads what it understands
    pub settings: Option<Settings>,
    pub timing: Option<TimingConfig>,
    pub display: Option<DisplayConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TimingConfig {
    pub poll_ms: Option<u64>,
    pub prediction_timeout_ms: Option<u64>,
    pub min_frame_ms: Option<u64>,
    pub idle_fast_ms: Option<u64>,
    pub idle_slow_ms: Option<u64>,
    pub audio_sample_ms: Option<u64>,
    pub audio_idle_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DisplayConfig {
    pub driver: Option<DriverKind>,
    pub brightness: Option<u8>,   // 0-255, overrides the theme
    pub preview: Option<bool>,    // second service rendering to the console
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    Console,
    Mock,
}

impl Config {
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    pub fn theme(&self) -> &str {
        self.theme.as_deref().unwrap_or(DEFAULT_THEME)
    }

    pub fn settings(&self) -> Settings {
        let mut settings = self.settings.clone().unwrap_or_default();
        if let Some(b) = self.display.as_ref().and_then(|d| d.brightness) {
            settings.insert("brightness".to_string(), serde_json::Value::from(b));
        }
        settings
    }

    pub fn driver(&self) -> DriverKind {
        self.display.as_ref().and_then(|d| d.driver).unwrap_or(DriverKind::Console)
    }

    pub fn preview(&self) -> bool {
        self.display.as_ref().and_then(|d| d.preview).unwrap_or(false)
    }

    /// Resolved timings with defaults filled in.
    pub fn timing(&self) -> ServiceTiming {
        let t = self.timing.clone().unwrap_or_default();
        let base = ServiceTiming::default();
        let ms = |v: Option<u64>, d: Duration| v.map(Duration::from_millis).unwrap_or(d);
        ServiceTiming {
            poll: ms(t.poll_ms, base.poll),
            audio_sample: ms(t.audio_sample_ms, base.audio_sample),
            audio_idle: ms(t.audio_idle_ms, base.audio_idle),
            driver: DriverTiming {
                prediction_timeout: ms(t.prediction_timeout_ms, base.driver.prediction_timeout),
                min_frame: ms(t.min_frame_ms, base.driver.min_frame),
                idle_fast: ms(t.idle_fast_ms, base.driver.idle_fast),
                idle_slow: ms(t.idle_slow_ms, base.driver.idle_slow),
                ..base.driver
            },
        }
    }
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "lyring", about = "LyRing - circular matrix animations", disable_help_flag = false)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    /// theme to start with (pulse, orbit, breathe)
    #[arg(long)]
    pub theme: Option<String>,
    #[arg(long, value_parser = ["console", "mock"])]
    pub driver: Option<String>,
    #[arg(long)]
    pub brightness: Option<u8>,
    #[arg(long, action = ArgAction::Set)]
    pub preview: Option<bool>,
    #[arg(long)]
    pub prediction_timeout_ms: Option<u64>,
    #[arg(long)]
    pub min_frame_ms: Option<u64>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Public entry point: parse CLI, read YAML, merge, validate.
pub fn load() -> Result<Config, ConfigError> {
    let cli = Cli::parse();
    let cfg = resolve(&cli)?;

    if cli.dump_config {
        // Pretty YAML of effective config
        let s = serde_yaml::to_string(&cfg)?;
        println!("{s}");
        std::process::exit(0);
    }

    Ok(cfg)
}

/// Layers defaults, YAML and `cli`, then validates.
pub fn resolve(cli: &Cli) -> Result<Config, ConfigError> {
    let mut cfg = Config::default();

    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    apply_cli_overrides(&mut cfg, cli);
    validate(&cfg)?;
    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/lyring/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/lyring/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/lyring.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["lyring.yaml", "config.yaml", "config/lyring.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    parse_yaml(&s)
}

pub fn parse_yaml(s: &str) -> Result<Config, ConfigError> {
    let cfg: Config = serde_yaml::from_str(s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some() { dst.log_level = src.log_level; }
    if src.theme.is_some()     { dst.theme = src.theme; }
    if src.settings.is_some()  { dst.settings = src.settings; }
    match (&mut dst.timing, src.timing) {
        (None, Some(t)) => dst.timing = Some(t),
        (Some(d), Some(s)) => merge_timing(d, s),
        _ => {}
    }
    match (&mut dst.display, src.display) {
        (None, Some(c)) => dst.display = Some(c),
        (Some(d), Some(s)) => merge_display(d, s),
        _ => {}
    }
}

fn merge_timing(dst: &mut TimingConfig, src: TimingConfig) {
    if src.poll_ms.is_some()               { dst.poll_ms = src.poll_ms; }
    if src.prediction_timeout_ms.is_some() { dst.prediction_timeout_ms = src.prediction_timeout_ms; }
    if src.min_frame_ms.is_some()          { dst.min_frame_ms = src.min_frame_ms; }
    if src.idle_fast_ms.is_some()          { dst.idle_fast_ms = src.idle_fast_ms; }
    if src.idle_slow_ms.is_some()          { dst.idle_slow_ms = src.idle_slow_ms; }
    if src.audio_sample_ms.is_some()       { dst.audio_sample_ms = src.audio_sample_ms; }
    if src.audio_idle_ms.is_some()         { dst.audio_idle_ms = src.audio_idle_ms; }
}

fn merge_display(dst: &mut DisplayConfig, src: DisplayConfig) {
    if src.driver.is_some()     { dst.driver = src.driver; }
    if src.brightness.is_some() { dst.brightness = src.brightness; }
    if src.preview.is_some()    { dst.preview = src.preview; }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some() { cfg.log_level = cli.log_level.clone(); }
    if cli.theme.is_some()     { cfg.theme = cli.theme.clone(); }

    if cli.prediction_timeout_ms.is_some() || cli.min_frame_ms.is_some() {
        let timing = cfg.timing.get_or_insert_with(TimingConfig::default);
        if cli.prediction_timeout_ms.is_some() { timing.prediction_timeout_ms = cli.prediction_timeout_ms; }
        if cli.min_frame_ms.is_some()          { timing.min_frame_ms = cli.min_frame_ms; }
    }

    let driver = match cli.driver.as_deref() {
        Some("mock") => Some(DriverKind::Mock),
        Some("console") => Some(DriverKind::Console),
        _ => None,
    };
    if driver.is_some() || cli.brightness.is_some() || cli.preview.is_some() {
        let display = cfg.display.get_or_insert_with(DisplayConfig::default);
        if driver.is_some()         { display.driver = driver; }
        if cli.brightness.is_some() { display.brightness = cli.brightness; }
        if cli.preview.is_some()    { display.preview = cli.preview; }
    }
}

/// Put any invariants here (required fields, ranges, etc.)
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(t) = cfg.timing.as_ref() {
        let all = [
            ("poll_ms", t.poll_ms),
            ("prediction_timeout_ms", t.prediction_timeout_ms),
            ("min_frame_ms", t.min_frame_ms),
            ("idle_fast_ms", t.idle_fast_ms),
            ("idle_slow_ms", t.idle_slow_ms),
            ("audio_sample_ms", t.audio_sample_ms),
            ("audio_idle_ms", t.audio_idle_ms),
        ];
        for (name, value) in all {
            if value == Some(0) {
                return Err(ConfigError::Validation(format!("timing {name} must be > 0")));
            }
        }
        if t.min_frame_ms.is_some_and(|v| v > 2000) {
            return Err(ConfigError::Validation("timing min_frame_ms must be <= 2000".into()));
        }
        if t.prediction_timeout_ms.is_some_and(|v| !(100..=10_000).contains(&v)) {
            return Err(ConfigError::Validation(
                "timing prediction_timeout_ms must be 100..=10000".into(),
            ));
        }
    }
    if let Some(name) = cfg.theme.as_deref() {
        if !crate::themes::available_themes().contains(&name) {
            return Err(ConfigError::Validation(format!("unknown theme '{name}'")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_fields() {
        let cfg = parse_yaml(
            r#"
log_level: debug
theme: orbit
settings:
  brightness: 120
  transitions:
    - [0, 1, 2, 100]
timing:
  prediction_timeout_ms: 1500
display:
  driver: mock
  preview: true
"#,
        )
        .unwrap();
        assert_eq!(cfg.log_level(), "debug");
        assert_eq!(cfg.theme(), "orbit");
        assert_eq!(cfg.driver(), DriverKind::Mock);
        assert!(cfg.preview());
        let settings = cfg.settings();
        assert_eq!(settings["brightness"], serde_json::json!(120));
        assert!(settings["transitions"].is_array());
        assert_eq!(cfg.timing().driver.prediction_timeout, Duration::from_millis(1500));
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.log_level(), "info");
        assert_eq!(cfg.theme(), DEFAULT_THEME);
        assert_eq!(cfg.driver(), DriverKind::Console);
        assert!(!cfg.preview());
        assert_eq!(cfg.timing(), ServiceTiming::default());
    }

    #[test]
    fn test_cli_overrides_yaml() {
        let mut cfg = parse_yaml("theme: breathe\ndisplay:\n  brightness: 10\n").unwrap();
        let cli = Cli {
            theme: Some("orbit".into()),
            brightness: Some(200),
            driver: Some("mock".into()),
            min_frame_ms: Some(40),
            ..Default::default()
        };
        apply_cli_overrides(&mut cfg, &cli);
        assert_eq!(cfg.theme(), "orbit");
        assert_eq!(cfg.settings()["brightness"], serde_json::json!(200));
        assert_eq!(cfg.driver(), DriverKind::Mock);
        assert_eq!(cfg.timing().driver.min_frame, Duration::from_millis(40));
    }

    #[test]
    fn test_merge_keeps_unset_fields() {
        let mut dst = parse_yaml("timing:\n  poll_ms: 20\n  idle_slow_ms: 250\n").unwrap();
        let src = parse_yaml("timing:\n  poll_ms: 30\n").unwrap();
        merge(&mut dst, src);
        let t = dst.timing.unwrap();
        assert_eq!(t.poll_ms, Some(30));
        assert_eq!(t.idle_slow_ms, Some(250));
    }

    #[test]
    fn test_validation() {
        let bad = [
            "timing:\n  poll_ms: 0\n",
            "timing:\n  min_frame_ms: 5000\n",
            "timing:\n  prediction_timeout_ms: 50\n",
            "theme: disco\n",
        ];
        for yaml in bad {
            let cfg = parse_yaml(yaml).unwrap();
            assert!(matches!(validate(&cfg), Err(ConfigError::Validation(_))), "{yaml}");
        }
        assert!(matches!(parse_yaml("display:\n  driver: ssd1306\n"), Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_missing_explicit_file() {
        let cli = Cli {
            config: Some(PathBuf::from("/nonexistent/lyring.yaml")),
            ..Default::default()
        };
        assert!(matches!(resolve(&cli), Err(ConfigError::Validation(_))));
    }
}
