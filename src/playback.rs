/*
 *  playback.rs
 *
 *  spotify-oled - now playing, at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Playback snapshots, poll errors and the change comparator
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

use std::fmt;
use thiserror::Error;

/// Start instants closer than this are the same playback seen through poll jitter.
pub const STARTED_AT_TOLERANCE_MS: i64 = 150;

/// Where the track is, depending on whether it is moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPosition {
    /// Wall clock instant (ms) at which playback would have begun to reach
    /// the current position now. Recomputed on every poll.
    Playing { started_at_ms: i64 },
    /// Position captured while paused.
    Paused { progress_ms: u64 },
}

/// One observed state of playback. Never mutated, superseded by the next poll.
#[derive(Debug, Clone)]
pub struct PlaybackSnapshot {
    pub track: String,
    pub artists: Vec<String>,
    pub duration_ms: u64,
    pub position: PlaybackPosition,
    pub shuffling: bool,
    pub volume_percent: u8,
}

impl PlaybackSnapshot {
    pub fn is_paused(&self) -> bool {
        matches!(self.position, PlaybackPosition::Paused { .. })
    }

    /// Play position at `now_ms`, clamped to `[0, duration_ms]`.
    pub fn elapsed_ms(&self, now_ms: i64) -> u64 {
        let raw = match self.position {
            PlaybackPosition::Paused { progress_ms } => progress_ms,
            PlaybackPosition::Playing { started_at_ms } => now_ms.saturating_sub(started_at_ms).max(0) as u64,
        };
        raw.min(self.duration_ms)
    }

    pub fn joined_artists(&self) -> String {
        self.artists.join(", ")
    }
}

/// Field-by-field equality, except the start instant which only has to agree
/// to within [`STARTED_AT_TOLERANCE_MS`]. Not transitive, hence no `Eq`.
impl PartialEq for PlaybackSnapshot {
    fn eq(&self, other: &Self) -> bool {
        // cheap comparisons first
        if self.duration_ms != other.duration_ms
            || self.volume_percent != other.volume_percent
            || self.shuffling != other.shuffling
        {
            return false;
        }

        let same_position = match (self.position, other.position) {
            (PlaybackPosition::Paused { progress_ms: a }, PlaybackPosition::Paused { progress_ms: b }) => a == b,
            (PlaybackPosition::Playing { started_at_ms: a }, PlaybackPosition::Playing { started_at_ms: b }) => {
                (a - b).abs() <= STARTED_AT_TOLERANCE_MS
            }
            _ => false,
        };
        if !same_position {
            return false;
        }

        self.track == other.track && self.artists == other.artists
    }
}

impl fmt::Display for PlaybackSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.volume_percent == 0 {
            write!(f, "MUTED - ")?;
        }
        write!(f, "{} »{}« by »{}« ",
            if self.is_paused() { "Paused" } else { "Playing" },
            self.track,
            self.artists.join("«, »"))?;
        match self.position {
            PlaybackPosition::Paused { progress_ms } => write!(f, "at {}", progress_ms),
            PlaybackPosition::Playing { started_at_ms } => write!(f, "since {}", started_at_ms),
        }
    }
}

/// Why a poll produced no snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackErrorKind {
    /// Poll succeeded but nothing is playing
    Stopped,
    /// Credentials need an interactive re-authorization
    AuthRequired,
    /// Anything else
    Unhandled,
}

impl PlaybackErrorKind {
    /// Short label shown as the title line.
    pub fn label(&self) -> &'static str {
        match self {
            PlaybackErrorKind::Stopped => "Stopped",
            PlaybackErrorKind::AuthRequired => "No Auth",
            PlaybackErrorKind::Unhandled => "Unhandled Exception",
        }
    }
}

impl fmt::Display for PlaybackErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("PlaybackError {kind}: {message}")]
pub struct PlaybackError {
    pub kind: PlaybackErrorKind,
    pub message: String,
}

impl PlaybackError {
    pub fn new(kind: PlaybackErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn stopped() -> Self {
        Self::new(PlaybackErrorKind::Stopped, "")
    }

    pub fn auth_required(message: impl Into<String>) -> Self {
        Self::new(PlaybackErrorKind::AuthRequired, message)
    }

    pub fn unhandled(message: impl Into<String>) -> Self {
        Self::new(PlaybackErrorKind::Unhandled, message)
    }
}

/// Outcome of a single poll. An error is a state of its own: it never equals a
/// snapshot, so entering or leaving it always refreshes the display.
pub type PlaybackResult = Result<PlaybackSnapshot, PlaybackError>;

/// Log friendly form of a poll outcome.
pub fn describe(result: &PlaybackResult) -> String {
    match result {
        Ok(snapshot) => snapshot.to_string(),
        Err(error) => error.to_string(),
    }
}
