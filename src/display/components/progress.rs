/*
 *  display/components/progress.rs
 *
 *  spotify-oled - now playing, at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Seek bar, extrapolated between polls
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
use embedded_graphics::primitives::{Line, PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Baseline, Text};

use crate::clock::format_mm_ss;
use crate::display::content::UiContent;
use crate::display::fonts::font_for_size;
use crate::playback::PlaybackSnapshot;

/// Muted speaker with a cross, as line segments relative to the glyph anchor
const MUTED_GLYPH: [((i32, i32), (i32, i32)); 8] = [
    ((-9, 3), (-8, 3)),
    ((-9, 3), (-9, 8)),
    ((-9, 8), (-8, 8)),
    ((-8, 3), (-2, 0)),
    ((-2, 0), (-2, 11)),
    ((-8, 8), (-2, 11)),
    ((1, 3), (6, 8)),
    ((1, 8), (6, 3)),
];

/// What the bar shows at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressView {
    /// No track
    Hidden,
    Paused { elapsed_ms: u64 },
    Muted { elapsed_ms: u64 },
    Bar { elapsed_ms: u64, fill_px: u32 },
}

/// Progress bar along the bottom of the screen
///
/// Sized from the seek font: the band is `seek + 2` pixels high and the bar is
/// inset by `floor(seek * 3.3) + 2` on both sides, leaving room for the
/// elapsed time on the left and the track length on the right.
pub struct ProgressBar {
    font: &'static MonoFont<'static>,
    left: i32,
    top: i32,
    width: u32,
    height: u32,
    padding: u32,
    snapshot: Option<Arc<PlaybackSnapshot>>,
    duration_label: String,
}

impl ProgressBar {
    pub fn new(seek_font_size: u32, left: i32, width: u32, screen_height: u32) -> Self {
        let height = seek_font_size + 2;
        let padding = seek_font_size * 33 / 10 + 2;

        Self {
            font: font_for_size(seek_font_size),
            left,
            top: screen_height as i32 - height as i32,
            width,
            height,
            padding,
            snapshot: None,
            duration_label: String::new(),
        }
    }

    pub fn update(&mut self, content: &UiContent) {
        let unchanged = match (&self.snapshot, &content.snapshot) {
            (Some(current), Some(next)) => Arc::ptr_eq(current, next),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return;
        }

        self.duration_label = content
            .snapshot
            .as_ref()
            .map(|snapshot| format_mm_ss(snapshot.duration_ms))
            .unwrap_or_default();
        self.snapshot = content.snapshot.clone();
    }

    pub fn top(&self) -> i32 {
        self.top
    }

    pub fn padding(&self) -> u32 {
        self.padding
    }

    /// Interior length of the bar in pixels
    pub fn bar_length(&self) -> u32 {
        self.width.saturating_sub(2 * (self.padding + 1))
    }

    /// Filled pixels for `elapsed_ms` into a track of `duration_ms`, rounded to
    /// the nearest pixel. A zero length track shows a full bar.
    pub fn fill_px(&self, elapsed_ms: u64, duration_ms: u64) -> u32 {
        let length = self.bar_length() as u64;
        if duration_ms == 0 {
            return length as u32;
        }

        let elapsed = elapsed_ms.min(duration_ms);
        ((2 * elapsed * length + duration_ms) / (2 * duration_ms)) as u32
    }

    pub fn view(&self, now_ms: i64) -> ProgressView {
        let Some(snapshot) = self.snapshot.as_deref() else {
            return ProgressView::Hidden;
        };

        let elapsed_ms = snapshot.elapsed_ms(now_ms);
        if snapshot.is_paused() {
            ProgressView::Paused { elapsed_ms }
        } else if snapshot.volume_percent == 0 {
            ProgressView::Muted { elapsed_ms }
        } else {
            ProgressView::Bar { elapsed_ms, fill_px: self.fill_px(elapsed_ms, snapshot.duration_ms) }
        }
    }

    /// Draw the glyph or bar for the current view, flanked by the elapsed time
    /// and the track length.
    pub fn render<D>(&self, target: &mut D, now_ms: i64) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        let elapsed_ms = match self.view(now_ms) {
            ProgressView::Hidden => return Ok(()),
            ProgressView::Paused { elapsed_ms } => {
                self.draw_paused(target)?;
                elapsed_ms
            }
            ProgressView::Muted { elapsed_ms } => {
                self.draw_muted(target)?;
                elapsed_ms
            }
            ProgressView::Bar { elapsed_ms, fill_px } => {
                self.draw_bar(target, fill_px)?;
                elapsed_ms
            }
        };

        self.draw_labels(target, elapsed_ms)
    }

    fn center(&self) -> i32 {
        self.left + self.width as i32 / 2
    }

    /// Right hand end of the bar outline
    fn right(&self) -> i32 {
        self.left + self.width as i32 - self.padding as i32
    }

    fn draw_paused<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        let center = self.center();
        let stroke = self.height as i32 / 4;
        let bottom = self.top + self.height as i32 - 1;
        let style = PrimitiveStyle::with_fill(BinaryColor::On);

        Rectangle::with_corners(
            Point::new(center - 2 * stroke, self.top),
            Point::new(center - stroke, bottom),
        )
        .into_styled(style)
        .draw(target)?;
        Rectangle::with_corners(
            Point::new(center + stroke, self.top),
            Point::new(center + 2 * stroke, bottom),
        )
        .into_styled(style)
        .draw(target)
    }

    fn draw_muted<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        let center = self.center();
        let style = PrimitiveStyle::with_stroke(BinaryColor::On, 1);
        for ((x0, y0), (x1, y1)) in MUTED_GLYPH {
            Line::new(
                Point::new(center + x0, self.top + y0),
                Point::new(center + x1, self.top + y1),
            )
            .into_styled(style)
            .draw(target)?;
        }
        Ok(())
    }

    fn draw_bar<D>(&self, target: &mut D, fill_px: u32) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        let padding = self.padding as i32;
        let height = self.height as i32;

        Rectangle::with_corners(
            Point::new(self.left + padding, self.top + 3),
            Point::new(self.right(), self.top + height - 4),
        )
        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
        .draw(target)?;

        if fill_px > 0 {
            Rectangle::new(
                Point::new(self.left + padding + 1, self.top + 3),
                Size::new(fill_px, self.height.saturating_sub(6)),
            )
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(target)?;
        }
        Ok(())
    }

    fn draw_labels<D>(&self, target: &mut D, elapsed_ms: u64) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        let style = MonoTextStyle::new(self.font, BinaryColor::On);
        Text::with_baseline(&format_mm_ss(elapsed_ms), Point::new(self.left, self.top), style, Baseline::Top)
            .draw(target)?;
        Text::with_baseline(&self.duration_label, Point::new(self.right() + 5, self.top), style, Baseline::Top)
            .draw(target)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::framebuffer::MonoFrameBuf;
    use crate::playback::PlaybackPosition;

    fn snapshot(position: PlaybackPosition, volume_percent: u8) -> Arc<PlaybackSnapshot> {
        Arc::new(PlaybackSnapshot {
            track: "Song".into(),
            artists: vec!["Artist".into()],
            duration_ms: 200_000,
            position,
            shuffling: false,
            volume_percent,
        })
    }

    fn bar_with(snapshot: Arc<PlaybackSnapshot>) -> ProgressBar {
        let mut bar = ProgressBar::new(10, 0, 128, 64);
        bar.update(&UiContent { snapshot: Some(snapshot), ..Default::default() });
        bar
    }

    #[test]
    fn test_geometry_from_font_size() {
        let bar = ProgressBar::new(10, 0, 128, 64);
        assert_eq!(bar.padding(), 35);
        assert_eq!(bar.top(), 52);
        assert_eq!(bar.bar_length(), 128 - 72);
    }

    #[test]
    fn test_fill_rounds_and_clamps() {
        let bar = ProgressBar::new(10, 0, 128, 64);
        let length = bar.bar_length();
        // 30000 / 200000 * 56 = 8.4
        assert_eq!(bar.fill_px(30_000, 200_000), 8);
        assert_eq!(bar.fill_px(0, 200_000), 0);
        assert_eq!(bar.fill_px(200_000, 200_000), length);
        assert_eq!(bar.fill_px(900_000, 200_000), length);
        assert_eq!(bar.fill_px(10, 0), length);
    }

    #[test]
    fn test_view_priority() {
        let paused_muted = bar_with(snapshot(PlaybackPosition::Paused { progress_ms: 1 }, 0));
        assert_eq!(paused_muted.view(0), ProgressView::Paused { elapsed_ms: 1 });

        let muted = bar_with(snapshot(PlaybackPosition::Playing { started_at_ms: 0 }, 0));
        assert_eq!(muted.view(1_000), ProgressView::Muted { elapsed_ms: 1_000 });

        let playing = bar_with(snapshot(PlaybackPosition::Playing { started_at_ms: 0 }, 40));
        assert!(matches!(playing.view(1_000), ProgressView::Bar { elapsed_ms: 1_000, .. }));

        let empty = ProgressBar::new(10, 0, 128, 64);
        assert_eq!(empty.view(0), ProgressView::Hidden);
    }

    #[test]
    fn test_elapsed_past_duration_is_duration() {
        let bar = bar_with(snapshot(PlaybackPosition::Playing { started_at_ms: 0 }, 40));
        assert_eq!(
            bar.view(10_000_000),
            ProgressView::Bar { elapsed_ms: 200_000, fill_px: bar.bar_length() }
        );
    }

    #[test]
    fn test_update_keeps_same_snapshot() {
        let shared = snapshot(PlaybackPosition::Playing { started_at_ms: 0 }, 40);
        let mut bar = bar_with(Arc::clone(&shared));
        assert_eq!(bar.duration_label, "03:20");

        bar.update(&UiContent { snapshot: Some(shared), ..Default::default() });
        assert_eq!(bar.duration_label, "03:20");

        bar.update(&UiContent::default());
        assert!(bar.duration_label.is_empty());
        assert_eq!(bar.view(0), ProgressView::Hidden);
    }

    #[test]
    fn test_render_bar_fill_row() {
        let bar = bar_with(snapshot(PlaybackPosition::Playing { started_at_ms: 0 }, 40));
        let mut fb = MonoFrameBuf::new(128, 64);
        bar.render(&mut fb, 100_000).unwrap();

        // middle row of the bar, inside the outline
        let row = (bar.top() + 5) as u32;
        let inside = (36..92).filter(|&x| fb.pixel(x, row) == Some(BinaryColor::On)).count();
        assert_eq!(inside as u32, bar.fill_px(100_000, 200_000));
    }

    /// Lit pixels in columns `xs` of the seek band
    fn lit_in(fb: &MonoFrameBuf, xs: std::ops::Range<u32>) -> Vec<(u32, u32)> {
        xs.flat_map(|x| (52..64).map(move |y| (x, y)))
            .filter(|&(x, y)| fb.pixel(x, y) == Some(BinaryColor::On))
            .collect()
    }

    /// Both time labels on their own, as `render` places them
    fn labels_only(bar: &ProgressBar, elapsed: &str) -> MonoFrameBuf {
        let mut fb = MonoFrameBuf::new(128, 64);
        let style = MonoTextStyle::new(bar.font, BinaryColor::On);
        Text::with_baseline(elapsed, Point::new(0, bar.top()), style, Baseline::Top)
            .draw(&mut fb)
            .unwrap();
        Text::with_baseline(&bar.duration_label, Point::new(bar.right() + 5, bar.top()), style, Baseline::Top)
            .draw(&mut fb)
            .unwrap();
        fb
    }

    #[test]
    fn test_render_paused_glyph_and_labels() {
        let bar = bar_with(snapshot(PlaybackPosition::Paused { progress_ms: 30_000 }, 40));
        let mut fb = MonoFrameBuf::new(128, 64);
        bar.render(&mut fb, 0).unwrap();

        // two 4 x 12 bars either side of the centre
        assert_eq!(lit_in(&fb, 40..88).len(), 2 * 4 * 12);
        assert_eq!(fb.pixel(58, 63), Some(BinaryColor::On));
        assert_eq!(fb.pixel(70, 52), Some(BinaryColor::On));

        let expected = labels_only(&bar, "00:30");
        assert!(!lit_in(&expected, 0..30).is_empty());
        assert!(!lit_in(&expected, 98..128).is_empty());
        assert_eq!(lit_in(&fb, 0..30), lit_in(&expected, 0..30));
        assert_eq!(lit_in(&fb, 98..128), lit_in(&expected, 98..128));
    }

    #[test]
    fn test_render_muted_glyph_and_labels() {
        let bar = bar_with(snapshot(PlaybackPosition::Playing { started_at_ms: 0 }, 0));
        let mut fb = MonoFrameBuf::new(128, 64);
        bar.render(&mut fb, 65_000).unwrap();

        assert!(!lit_in(&fb, 40..88).is_empty());
        assert_eq!(fb.pixel(64 - 2, 52), Some(BinaryColor::On));

        let expected = labels_only(&bar, "01:05");
        assert_eq!(lit_in(&fb, 0..30), lit_in(&expected, 0..30));
        assert_eq!(lit_in(&fb, 98..128), lit_in(&expected, 98..128));
        assert!(!lit_in(&fb, 0..30).is_empty());
    }

    #[test]
    fn test_render_hidden_draws_nothing() {
        let mut fb = MonoFrameBuf::new(128, 64);
        ProgressBar::new(10, 0, 128, 64).render(&mut fb, 0).unwrap();
        assert_eq!(fb.count_on(), 0);
    }
}
