/*
 *  display/components/mod.rs
 *
 *  spotify-oled - now playing, at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Screen elements and the standard now playing layout
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

pub mod scrollers;
pub mod progress;

// Re-exports
pub use scrollers::{ScrollPhase, ScrollSettings, ScrollingText};
pub use progress::{ProgressBar, ProgressView};

use std::sync::Arc;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;

use crate::config::ContentConfig;
use crate::display::content::{TextSource, UiContent};
use crate::display::fonts::font_for_size;
use crate::display::traits::TextMeasure;

/// Distance of the artist line from the bottom edge
const SUBTITLE_FROM_BOTTOM: i32 = 40;

/// Anything drawn on the now playing screen
pub enum Element {
    Scrolling(ScrollingText),
    Progress(ProgressBar),
}

impl Element {
    pub fn update(&mut self, content: &UiContent) {
        match self {
            Element::Scrolling(text) => text.update(content),
            Element::Progress(bar) => bar.update(content),
        }
    }

    pub fn render<D>(&self, target: &mut D, now_ms: i64) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        match self {
            Element::Scrolling(text) => text.render(target, now_ms),
            Element::Progress(bar) => bar.render(target, now_ms),
        }
    }
}

/// Title on top, artists below it and the seek bar along the bottom
pub fn now_playing_layout(
    config: &ContentConfig,
    width: u32,
    height: u32,
    measure: Arc<dyn TextMeasure>,
    initial: &UiContent,
) -> Vec<Element> {
    let settings = ScrollSettings {
        speed: config.scroll_speed,
        back_speed: config.scroll_back_speed,
        rest_ms: config.scroll_rest_time,
    };
    let subtitle_top = (height as i32 - SUBTITLE_FROM_BOTTOM).max(0);

    vec![
        Element::Scrolling(ScrollingText::new(
            TextSource::Title,
            font_for_size(config.song_font_size),
            Point::zero(),
            width,
            settings,
            Arc::clone(&measure),
            initial,
        )),
        Element::Scrolling(ScrollingText::new(
            TextSource::Subtitle,
            font_for_size(config.artist_font_size),
            Point::new(0, subtitle_top),
            width,
            settings,
            measure,
            initial,
        )),
        Element::Progress(ProgressBar::new(config.seek_font_size, 0, width, height)),
    ]
}
