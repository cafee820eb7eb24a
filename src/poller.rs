/*
 *  poller.rs
 *
 *  spotify-oled - now playing, at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Poll loop, pushes new content to the display only when playback changed
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

use std::future::Future;
use std::time::Duration;

use log::{debug, info, warn};

use crate::clock;
use crate::display::content::UiContent;
use crate::display::error::DisplayError;
use crate::playback::{describe, PlaybackError, PlaybackResult};

/// Where playback state comes from
pub trait PlaybackSource {
    /// One observation. Failures are folded into the result, never raised.
    fn poll(&mut self) -> impl Future<Output = PlaybackResult> + Send;
}

/// Where new content goes
pub trait ContentSink {
    fn push(&self, content: UiContent);

    /// Report a fault latched on the rendering side
    fn check(&self) -> Result<(), DisplayError>;
}

/// Remembers the last outcome and says whether a new one differs
#[derive(Debug, Default)]
pub struct ChangeDetector {
    previous: Option<PlaybackResult>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the new outcome if it differs from the previous one. An equal
    /// outcome is dropped and the previous one kept, so slow drift of the
    /// start instant still adds up to a change eventually.
    pub fn observe(&mut self, next: PlaybackResult) -> Option<&PlaybackResult> {
        if self.previous.as_ref() == Some(&next) {
            return None;
        }
        self.previous = Some(next);
        self.previous.as_ref()
    }

    pub fn previous(&self) -> Option<&PlaybackResult> {
        self.previous.as_ref()
    }
}

pub struct PollLoop<S> {
    source: S,
    detector: ChangeDetector,
    interval: Duration,
    timeout: Duration,
}

impl<S: PlaybackSource> PollLoop<S> {
    pub fn new(source: S, interval: Duration, timeout: Duration) -> Self {
        Self {
            source,
            detector: ChangeDetector::new(),
            interval,
            timeout,
        }
    }

    /// Poll once and push if anything changed. Returns whether it pushed.
    pub async fn step<C: ContentSink>(&mut self, sink: &C) -> bool {
        let result = match tokio::time::timeout(self.timeout, self.source.poll()).await {
            Ok(result) => result,
            Err(_) => Err(PlaybackError::unhandled(format!(
                "poll timed out after {}ms",
                self.timeout.as_millis()
            ))),
        };

        let Some(changed) = self.detector.observe(result) else {
            debug!("Playback unchanged");
            return false;
        };

        match changed {
            Ok(_) => info!("{}", describe(changed)),
            Err(_) => warn!("{}", describe(changed)),
        }
        sink.push(UiContent::from_playback(changed, clock::now_ms()));
        true
    }

    /// Poll forever, sleeping `interval` between polls, until the sink reports
    /// a rendering fault
    pub async fn run<C: ContentSink>(&mut self, sink: &C) -> Result<(), DisplayError> {
        loop {
            self.step(sink).await;
            tokio::time::sleep(self.interval).await;
            sink.check()?;
        }
    }
}
