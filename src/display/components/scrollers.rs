/*
 *  display/components/scrollers.rs
 *
 *  spotify-oled - now playing, at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Scrolling text component for the title and artist lines
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

use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};
use log::debug;

use crate::display::content::{TextSource, UiContent};
use crate::display::traits::TextMeasure;

/// Scroll timing, speeds in pixels per second
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollSettings {
    pub speed: u32,
    /// 0 jumps straight back to the start after the end rest
    pub back_speed: u32,
    pub rest_ms: u64,
}

/// Where in the scroll cycle a line is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollPhase {
    /// Fits the display, drawn centered
    Static,
    RestStart,
    Forward,
    RestEnd,
    Backward,
}

/// Per-text animation state, rebuilt whenever the text changes
#[derive(Debug, Clone)]
struct ScrollState {
    text: String,
    text_width: i32,
    cycle_start_ms: i64,
    overflow: bool,
    forward_ms: i64,
    backward_ms: i64,
    cycle_ms: i64,
}

impl ScrollState {
    fn new(text: String, text_width: u32, display_width: u32, settings: &ScrollSettings, now_ms: i64) -> Self {
        let overflow = text_width > display_width;
        let excess = text_width.saturating_sub(display_width) as i64;

        let run_time = |speed: u32| if overflow && speed > 0 { excess * 1000 / speed as i64 } else { 0 };
        let forward_ms = run_time(settings.speed);
        let backward_ms = run_time(settings.back_speed);

        Self {
            text,
            text_width: text_width as i32,
            cycle_start_ms: now_ms,
            overflow,
            forward_ms,
            backward_ms,
            cycle_ms: forward_ms + backward_ms + 2 * settings.rest_ms as i64,
        }
    }

    /// Phase and pixel offset at `now_ms`. Pure in `now_ms`, so the animation
    /// never drifts and restarts cleanly.
    fn at(&self, display_width: u32, settings: &ScrollSettings, now_ms: i64) -> (ScrollPhase, i32) {
        let excess = self.text_width as i64 - display_width as i64;

        if !self.overflow {
            // <= 0, centers the text
            return (ScrollPhase::Static, (excess / 2) as i32);
        }
        if self.cycle_ms == 0 {
            return (ScrollPhase::RestStart, 0);
        }

        let rest = settings.rest_ms as i64;
        let t = (now_ms - self.cycle_start_ms).rem_euclid(self.cycle_ms);

        let (phase, offset) = if t < rest {
            (ScrollPhase::RestStart, 0)
        } else if t < rest + self.forward_ms {
            (ScrollPhase::Forward, (t - rest) * settings.speed as i64 / 1000)
        } else if t < rest + self.forward_ms + rest {
            (ScrollPhase::RestEnd, excess)
        } else {
            let back = (t - self.forward_ms - 2 * rest) * settings.back_speed as i64 / 1000;
            (ScrollPhase::Backward, excess - back)
        };
        (phase, offset as i32)
    }
}

/// One line of text that scrolls when it does not fit
pub struct ScrollingText {
    source: TextSource,
    font: &'static MonoFont<'static>,
    position: Point,
    width: u32,
    settings: ScrollSettings,
    measure: Arc<dyn TextMeasure>,
    state: ScrollState,
}

impl ScrollingText {
    /// Create a line showing `source` of `content`, `width` pixels wide with its
    /// left edge and top at `position`
    pub fn new(
        source: TextSource,
        font: &'static MonoFont<'static>,
        position: Point,
        width: u32,
        settings: ScrollSettings,
        measure: Arc<dyn TextMeasure>,
        content: &UiContent,
    ) -> Self {
        let text = content.text(source).to_string();
        let text_width = measure.text_width(&text, font);
        let state = ScrollState::new(text, text_width, width, &settings, content.now_ms);
        Self { source, font, position, width, settings, measure, state }
    }

    /// Take new content; the cycle restarts only if this line's text changed
    pub fn update(&mut self, content: &UiContent) {
        let current = content.text(self.source);
        if self.state.text == current {
            return;
        }

        let text_width = self.measure.text_width(current, self.font);
        self.state = ScrollState::new(current.to_string(), text_width, self.width, &self.settings, content.now_ms);
        debug!("{:?} line reset: {}px, cycle {}ms", self.source, text_width, self.state.cycle_ms);
    }

    pub fn text(&self) -> &str {
        &self.state.text
    }

    pub fn is_overflowing(&self) -> bool {
        self.state.overflow
    }

    pub fn cycle_ms(&self) -> i64 {
        self.state.cycle_ms
    }

    pub fn phase(&self, now_ms: i64) -> ScrollPhase {
        self.state.at(self.width, &self.settings, now_ms).0
    }

    /// Pixels the text is shifted left by at `now_ms`
    pub fn offset(&self, now_ms: i64) -> i32 {
        self.state.at(self.width, &self.settings, now_ms).1
    }

    pub fn render<D>(&self, target: &mut D, now_ms: i64) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        if self.state.text.is_empty() {
            return Ok(());
        }

        let style = MonoTextStyle::new(self.font, BinaryColor::On);
        let origin = Point::new(self.position.x - self.offset(now_ms), self.position.y);
        Text::with_baseline(&self.state.text, origin, style, Baseline::Top).draw(target)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::fonts::MonoMeasure;
    use crate::display::framebuffer::MonoFrameBuf;
    use embedded_graphics::mono_font::iso_8859_1::FONT_6X10;

    const WIDTH: u32 = 128;

    fn settings(back_speed: u32) -> ScrollSettings {
        ScrollSettings { speed: 30, back_speed, rest_ms: 1500 }
    }

    fn content(title: &str, now_ms: i64) -> UiContent {
        UiContent { title: title.to_string(), now_ms, ..Default::default() }
    }

    fn line(title: &str, back_speed: u32, now_ms: i64) -> ScrollingText {
        ScrollingText::new(
            TextSource::Title,
            &FONT_6X10,
            Point::zero(),
            WIDTH,
            settings(back_speed),
            Arc::new(MonoMeasure),
            &content(title, now_ms),
        )
    }

    // 30 glyphs of 6px = 180px, 52px too wide
    const LONG: &str = "abcdefghijklmnopqrstuvwxyz0123";

    #[test]
    fn test_short_text_is_centered_and_static() {
        let l = line("abc", 20, 1_000);
        assert!(!l.is_overflowing());
        for now in [0, 1_000, 5_000, 123_456_789] {
            assert_eq!(l.offset(now), (18 - 128) / 2);
            assert_eq!(l.phase(now), ScrollPhase::Static);
        }
    }

    #[test]
    fn test_exact_fit_does_not_scroll() {
        let l = line(&"x".repeat(128 / 6), 20, 0);
        assert!(!l.is_overflowing());
        assert!(l.offset(10_000) <= 0);
    }

    #[test]
    fn test_cycle_durations() {
        let l = line(LONG, 0, 0);
        assert!(l.is_overflowing());
        // 52px at 30px/s, no way back, two rests
        assert_eq!(l.cycle_ms(), 52 * 1000 / 30 + 2 * 1500);

        let l = line(LONG, 20, 0);
        assert_eq!(l.cycle_ms(), 52 * 1000 / 30 + 52 * 1000 / 20 + 2 * 1500);
    }

    #[test]
    fn test_cycle_closes() {
        let start = 10_000;
        let l = line(LONG, 20, start);
        assert_eq!(l.offset(start), 0);
        assert_eq!(l.offset(start + l.cycle_ms()), l.offset(start));
        assert_eq!(l.offset(start + 3 * l.cycle_ms() + 400), l.offset(start + 400));
    }

    #[test]
    fn test_phases_in_order() {
        let l = line(LONG, 20, 0);
        let fw = 52 * 1000 / 30;
        assert_eq!(l.phase(0), ScrollPhase::RestStart);
        assert_eq!(l.phase(1_499), ScrollPhase::RestStart);
        assert_eq!(l.phase(1_500), ScrollPhase::Forward);
        assert_eq!(l.phase(1_500 + fw), ScrollPhase::RestEnd);
        assert_eq!(l.offset(1_500 + fw), 52);
        assert_eq!(l.phase(3_000 + fw), ScrollPhase::Backward);
        assert_eq!(l.offset(3_000 + fw), 52);
    }

    #[test]
    fn test_offsets_monotonic_and_bounded() {
        let l = line(LONG, 20, 0);
        let mut last: Option<(ScrollPhase, i32)> = None;
        for now in (0..l.cycle_ms()).step_by(7) {
            let (phase, offset) = (l.phase(now), l.offset(now));
            assert!((0..=52).contains(&offset), "offset {} out of range at {}", offset, now);
            if let Some((last_phase, last_offset)) = last {
                if phase == last_phase && phase == ScrollPhase::Forward {
                    assert!(offset >= last_offset);
                }
                if phase == last_phase && phase == ScrollPhase::Backward {
                    assert!(offset <= last_offset);
                }
            }
            last = Some((phase, offset));
        }
    }

    #[test]
    fn test_zero_back_speed_jumps_home() {
        let l = line(LONG, 0, 0);
        let fw = 52 * 1000 / 30;
        assert_eq!(l.offset(1_500 + fw + 1_499), 52);
        // next cycle starts at rest again
        assert_eq!(l.offset(3_000 + fw), 0);
    }

    #[test]
    fn test_zero_speed_rests_then_sits_at_end() {
        let mut l = line(LONG, 0, 0);
        l.settings.speed = 0;
        l.update(&content("", 0));
        l.update(&content(LONG, 0));
        assert_eq!(l.cycle_ms(), 3_000);
        assert_eq!(l.offset(1_000), 0);
        assert_eq!(l.offset(2_000), 52);
    }

    #[test]
    fn test_update_restarts_only_on_text_change() {
        let mut l = line(LONG, 20, 0);
        let mid = 2_000;
        let before = l.offset(mid);
        assert!(before > 0);

        // same text later on keeps the phase
        l.update(&content(LONG, 1_900));
        assert_eq!(l.offset(mid), before);

        // new text restarts the cycle at the content timestamp
        let other = "zyxwvutsrqponmlkjihgfedcba9876543";
        l.update(&content(other, 1_900));
        assert_eq!(l.text(), other);
        assert_eq!(l.offset(mid), 0);
    }

    #[test]
    fn test_render_shifts_text() {
        let l = line(LONG, 20, 0);
        let mut at_rest = MonoFrameBuf::new(WIDTH, 16);
        l.render(&mut at_rest, 0).unwrap();
        assert!(at_rest.count_on() > 0);

        let mut at_end = MonoFrameBuf::new(WIDTH, 16);
        l.render(&mut at_end, 1_500 + 52 * 1000 / 30 + 10).unwrap();
        assert_ne!(at_rest.as_slice(), at_end.as_slice());
    }

    #[test]
    fn test_empty_text_draws_nothing() {
        let l = line("", 20, 0);
        let mut fb = MonoFrameBuf::new(WIDTH, 16);
        l.render(&mut fb, 0).unwrap();
        assert_eq!(fb.count_on(), 0);
    }
}
