/*
 *  clock.rs
 *
 *  spotify-oled - now playing, at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Wall clock milliseconds and play time formatting
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

use chrono::Utc;

/// Current wall clock time in milliseconds since the epoch.
///
/// Every animation in the crate is a function of this value, so the poll
/// side and the render side must agree on it.
#[inline]
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Format a play position as `mm:ss`, or `hh:mm:ss` once it reaches an hour.
///
/// Seconds are rounded half up, so 2500 ms shows as `00:03`. Banker's
/// rounding would give `00:02` there.
pub fn format_mm_ss(ms: u64) -> String {
    let total = (ms + 500) / 1000;
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;

    if h > 0 {
        format!("{h:02}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}
