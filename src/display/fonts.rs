/*
 *  display/fonts.rs
 *
 *  spotify-oled - now playing, at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Bitmap font selection and text measurement
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

use embedded_graphics::mono_font::{iso_8859_1::*, MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{renderer::TextRenderer, Baseline};

use crate::display::traits::TextMeasure;

// ascending by glyph height, latin-1 so accented titles render
static FONTS: [&MonoFont<'static>; 11] = [
    &FONT_4X6,
    &FONT_5X7,
    &FONT_5X8,
    &FONT_6X9,
    &FONT_6X10,
    &FONT_6X12,
    &FONT_7X13,
    &FONT_7X14,
    &FONT_9X15,
    &FONT_9X18,
    &FONT_10X20,
];

/// Largest bitmap font whose glyphs fit in `size_px` rows; the smallest font
/// when nothing fits.
pub fn font_for_size(size_px: u32) -> &'static MonoFont<'static> {
    FONTS
        .iter()
        .rev()
        .find(|f| f.character_size.height <= size_px)
        .copied()
        .unwrap_or(FONTS[0])
}

/// Measures with the embedded-graphics mono text renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonoMeasure;

impl TextMeasure for MonoMeasure {
    fn text_width(&self, text: &str, font: &MonoFont<'static>) -> u32 {
        MonoTextStyle::new(font, BinaryColor::On)
            .measure_string(text, Point::zero(), Baseline::Top)
            .bounding_box
            .size
            .width
    }
}
