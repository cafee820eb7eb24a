/*
 *  display/content.rs
 *
 *  spotify-oled - now playing, at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  The view handed from the poller to the frame loop
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

use std::sync::Arc;
use crate::playback::{PlaybackResult, PlaybackSnapshot};

/// Which line of [`UiContent`] a text element shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSource {
    Title,
    Subtitle,
}

/// Everything the elements need for one poll outcome, stamped when it was built.
///
/// Built whole on the poll side and handed over in one piece, so a frame
/// never sees a new title next to an old progress bar.
#[derive(Debug, Clone, Default)]
pub struct UiContent {
    pub title: String,
    pub subtitle: String,
    pub snapshot: Option<Arc<PlaybackSnapshot>>,
    pub now_ms: i64,
}

impl UiContent {
    /// Nothing to show yet
    pub fn empty(now_ms: i64) -> Self {
        Self { now_ms, ..Default::default() }
    }

    pub fn from_playback(result: &PlaybackResult, now_ms: i64) -> Self {
        match result {
            Ok(snapshot) => Self {
                title: snapshot.track.clone(),
                subtitle: snapshot.joined_artists(),
                snapshot: Some(Arc::new(snapshot.clone())),
                now_ms,
            },
            Err(error) => Self {
                title: error.kind.label().to_string(),
                subtitle: error.message.clone(),
                snapshot: None,
                now_ms,
            },
        }
    }

    pub fn text(&self, source: TextSource) -> &str {
        match source {
            TextSource::Title => &self.title,
            TextSource::Subtitle => &self.subtitle,
        }
    }
}
