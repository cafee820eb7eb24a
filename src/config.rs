/*
 *  config.rs
 *
 *  spotify-oled - now playing, at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Configuration: defaults, YAML file, command line overrides
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

use serde::{Deserialize, Serialize};
use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use std::{fs, path::{Path, PathBuf}, time::Duration};
use thiserror::Error;

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

/// Top-level app configuration. Every section falls back to its defaults,
/// so a file only needs the keys it changes.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,     // e.g., "info" | "debug"
    pub credentials: Credentials,
    pub screen: ScreenConfig,
    pub content: ContentConfig,
}

/// Web API application and user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub username: String,
    /// Token cache, `.cache-<username>` when unset
    pub cache_path: Option<PathBuf>,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: "https://no-domain.invalid/".to_string(),
            username: String::new(),
            cache_path: None,
        }
    }
}

impl Credentials {
    pub fn cache_path(&self) -> PathBuf {
        self.cache_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!(".cache-{}", self.username)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScreenConfig {
    pub device: DriverKind,
    pub bus: String,        // e.g. "/dev/i2c-1"
    pub address: u8,        // e.g. 0x3C (I2C addresses are 7-bit, stored in u8)
    pub width: u32,
    pub height: u32,
    pub rotate_deg: Option<u16>,
    pub brightness: Option<u8>,     // 0-255
    pub invert: Option<bool>,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            device: DriverKind::Ssd1306,
            bus: "/dev/i2c-1".to_string(),
            address: 0x3C,
            width: 128,
            height: 64,
            rotate_deg: None,
            brightness: None,
            invert: None,
        }
    }
}

/// Animation, fonts and timing. Speeds are pixels per second, times are ms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContentConfig {
    pub scroll_speed: u32,
    pub scroll_back_speed: u32,
    pub scroll_rest_time: u64,
    pub song_font_size: u32,
    pub artist_font_size: u32,
    pub seek_font_size: u32,
    pub min_frame_time: u64,
    pub data_poll_sleep: u64,
    pub request_timeout: u64,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            scroll_speed: 30,
            scroll_back_speed: 0,
            scroll_rest_time: 1500,
            song_font_size: 22,
            artist_font_size: 18,
            seek_font_size: 10,
            min_frame_time: 200,
            data_poll_sleep: 2000,
            request_timeout: 10_000,
        }
    }
}

impl ContentConfig {
    pub fn min_frame(&self) -> Duration {
        Duration::from_millis(self.min_frame_time)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.data_poll_sleep)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout)
    }
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "spotify-oled", about = "Spotify now playing on a small OLED", disable_help_flag = false)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    /// shorthand for --log-level debug
    #[arg(long, action = ArgAction::SetTrue)]
    pub debug: bool,
    /// authorize against the Web API interactively, write the token cache and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub auth: bool,
    /// draw frames without a panel attached
    #[arg(long, action = ArgAction::SetTrue)]
    pub headless: bool,
    #[arg(long)]
    pub screen_width: Option<u32>,
    #[arg(long)]
    pub screen_height: Option<u32>,
    #[arg(long)]
    pub screen_rotate_deg: Option<u16>,
    #[arg(long, action = ArgAction::Set)]
    pub screen_invert: Option<bool>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Read YAML, merge, validate.
pub fn load_from(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) YAML file (explicit path or search), defaults fill the gaps
    let mut cfg = match cli.config.as_ref() {
        Some(p) if p.exists() => read_yaml(p)?,
        Some(p) => {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
        None => match find_config_file() {
            Some(p) => read_yaml(&p)?,
            None => Config::default(),
        },
    };

    // 2) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 3) Validate
    validate(&cfg)?;

    Ok(cfg)
}

impl Config {
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        if s.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(s)?)
    }

    /// Pretty YAML of effective config (nice for debugging)
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn effective_log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/spotify-oled/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/spotify-oled/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/spotify-oled.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["spotify-oled.yaml", "config.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    Config::from_yaml_str(&s)
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some()       { cfg.log_level = cli.log_level.clone(); }
    if cli.debug                     { cfg.log_level = Some("debug".to_string()); }

    let screen = &mut cfg.screen;
    if let Some(w) = cli.screen_width            { screen.width = w; }
    if let Some(h) = cli.screen_height           { screen.height = h; }
    if cli.screen_rotate_deg.is_some()           { screen.rotate_deg = cli.screen_rotate_deg; }
    if cli.screen_invert.is_some()               { screen.invert = cli.screen_invert; }
}

/// Put any invariants here (required fields, ranges, etc.)
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    let screen = &cfg.screen;
    if screen.width == 0 || screen.height == 0 {
        return Err(ConfigError::Validation("screen width/height must be > 0".into()));
    }
    if let Some(rot) = screen.rotate_deg {
        match rot {
            0 | 90 | 180 | 270 => {},
            _ => return Err(ConfigError::Validation("screen rotate_deg must be 0|90|180|270".into()))
        }
    }
    if screen.address > 0x7F {
        return Err(ConfigError::Validation(format!(
            "screen address 0x{:02X} is not a 7-bit I2C address", screen.address
        )));
    }

    let content = &cfg.content;
    if content.song_font_size == 0 || content.artist_font_size == 0 || content.seek_font_size == 0 {
        return Err(ConfigError::Validation("content font sizes must be > 0".into()));
    }
    if content.min_frame_time == 0 {
        return Err(ConfigError::Validation("content min_frame_time must be > 0".into()));
    }
    if content.data_poll_sleep == 0 || content.request_timeout == 0 {
        return Err(ConfigError::Validation(
            "content data_poll_sleep and request_timeout must be > 0".into()
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    Ssd1306,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.screen.address, 0x3C);
        assert_eq!(cfg.screen.bus, "/dev/i2c-1");
        assert_eq!(cfg.content.scroll_speed, 30);
        assert_eq!(cfg.content.min_frame(), Duration::from_millis(200));
        assert_eq!(cfg.credentials.redirect_uri, "https://no-domain.invalid/");
        assert_eq!(cfg.effective_log_level(), "info");
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let cfg = Config::from_yaml_str(
            "credentials:\n  username: alice\ncontent:\n  scroll_speed: 45\nscreen:\n  address: 0x3D\n",
        )
        .unwrap();
        assert_eq!(cfg.content.scroll_speed, 45);
        assert_eq!(cfg.content.seek_font_size, 10);
        assert_eq!(cfg.screen.address, 0x3D);
        assert_eq!(cfg.screen.height, 64);
        assert_eq!(cfg.credentials.cache_path(), PathBuf::from(".cache-alice"));
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(Config::from_yaml_str("").unwrap(), Config::default());
    }

    #[test]
    fn test_bad_yaml() {
        assert!(matches!(
            Config::from_yaml_str("content:\n  scroll_speed: fast\n"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "spotify-oled",
            "--debug",
            "--screen-height",
            "32",
            "--screen-invert",
            "true",
        ]);
        let mut cfg = Config::default();
        apply_cli_overrides(&mut cfg, &cli);
        assert_eq!(cfg.effective_log_level(), "debug");
        assert_eq!(cfg.screen.height, 32);
        assert_eq!(cfg.screen.invert, Some(true));
        assert_eq!(cfg.screen.width, 128);
    }

    #[test]
    fn test_validation() {
        let mut cfg = Config::default();
        cfg.screen.rotate_deg = Some(45);
        assert!(matches!(validate(&cfg), Err(ConfigError::Validation(_))));

        let mut cfg = Config::default();
        cfg.content.min_frame_time = 0;
        assert!(validate(&cfg).is_err());

        let mut cfg = Config::default();
        cfg.screen.address = 0x80;
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn test_missing_config_file() {
        let cli = Cli {
            config: Some(PathBuf::from("/nonexistent/spotify-oled.yaml")),
            ..Default::default()
        };
        assert!(matches!(load_from(&cli), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_yaml_round_trip_of_dump() {
        let cfg = Config::default();
        let dumped = cfg.to_yaml().unwrap();
        assert!(dumped.contains("scroll_rest_time: 1500"));
        assert_eq!(Config::from_yaml_str(&dumped).unwrap(), cfg);
    }
}
