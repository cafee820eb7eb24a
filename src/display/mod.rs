/*
 *  display/mod.rs
 *
 *  spotify-oled - now playing, at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display subsystem - drivers, elements and the frame loop
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

// Core trait definitions
pub mod traits;
pub mod error;
pub mod framebuffer;
pub mod fonts;

// Display drivers
pub mod drivers;

// What is shown, and the elements that show it
pub mod content;
pub mod components;

// Frame loop
pub mod scheduler;

// Re-exports for convenience
pub use traits::{DisplayCapabilities, DisplayDriver, TextMeasure};
pub use error::DisplayError;
pub use framebuffer::MonoFrameBuf;
pub use fonts::{font_for_size, MonoMeasure};
pub use content::{TextSource, UiContent};
pub use components::{now_playing_layout, Element, ProgressBar, ScrollingText};
pub use scheduler::FrameScheduler;
