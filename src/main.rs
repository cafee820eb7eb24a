/*
 *  main.rs
 *
 *  spotify-oled - now playing, at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Service showing the currently playing Spotify track on an i2c display
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

use std::fmt::Debug;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::DrawTarget;
use env_logger::Env;
use log::{error, info};
use tokio::signal::unix::{signal, SignalKind};

use spotify_oled::config::{self, Cli, Config};
use spotify_oled::display::drivers::headless::HeadlessDriver;
use spotify_oled::display::{now_playing_layout, DisplayDriver, FrameScheduler, MonoMeasure, UiContent};
use spotify_oled::poller::PollLoop;
use spotify_oled::spotify::SpotifyClient;
use spotify_oled::{clock, gpio, BUILD_DATE};

/// Waits for a SIGINT, SIGTERM, or SIGHUP signal and logs which one arrived.
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

/// Lay out the now playing screen and start drawing it on `driver`
fn start_frames<D>(driver: D, cfg: &Config) -> Result<FrameScheduler>
where
    D: DisplayDriver + DrawTarget<Color = BinaryColor> + Send + 'static,
    D::Error: Debug,
{
    let (width, height) = driver.dimensions();
    let elements = now_playing_layout(
        &cfg.content,
        width,
        height,
        Arc::new(MonoMeasure),
        &UiContent::empty(clock::now_ms()),
    );
    Ok(FrameScheduler::spawn(driver, elements, cfg.content.min_frame())?)
}

#[cfg(feature = "driver-ssd1306")]
fn open_panel(cfg: &Config) -> Result<FrameScheduler> {
    use spotify_oled::display::drivers::ssd1306::Ssd1306Driver;

    let driver = Ssd1306Driver::new_i2c(&cfg.screen).context("opening the display")?;
    start_frames(driver, cfg)
}

#[cfg(not(feature = "driver-ssd1306"))]
fn open_panel(_cfg: &Config) -> Result<FrameScheduler> {
    anyhow::bail!("built without a display driver, run with --headless")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_from(&cli)?;

    if cli.dump_config {
        println!("{}", cfg.to_yaml()?);
        return Ok(());
    }

    env_logger::Builder::from_env(Env::default().default_filter_or(cfg.effective_log_level()))
        .format_timestamp_secs()
        .init();

    info!("{} v.{} built {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), BUILD_DATE);

    let mut spotify = SpotifyClient::new(&cfg.credentials, cfg.content.request_timeout())?;

    if cli.auth {
        println!("Ensuring authentication (cache path: {}):", cfg.credentials.cache_path().display());
        spotify.authorize_interactive().await?;
        println!("Authentication successful");
        return Ok(());
    }

    let scheduler = if cli.headless {
        info!("Headless mode, frames are drawn and discarded");
        start_frames(HeadlessDriver::new(cfg.screen.width, cfg.screen.height), &cfg)?
    } else {
        gpio::try_setup();
        open_panel(&cfg)?
    };

    let mut poller = PollLoop::new(spotify, cfg.content.poll_interval(), cfg.content.request_timeout());

    let outcome = tokio::select! {
        result = signal_handler() => result,
        result = poller.run(&scheduler) => result.context("display stopped"),
    };

    if let Err(e) = scheduler.finish() {
        error!("Frame loop ended with an error: {}", e);
    }
    outcome
}
