/*
 *  display/drivers/headless.rs
 *
 *  spotify-oled - now playing, at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Headless display driver, frames are drawn and then discarded
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

use embedded_graphics::prelude::*;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::geometry::Size;

use crate::display::error::DisplayError;
use crate::display::framebuffer::MonoFrameBuf;
use crate::display::traits::{DisplayCapabilities, DisplayDriver};

use std::sync::{Arc, Mutex};

/// Display driver without a panel
///
/// Used for `--headless` runs and by the tests. Every committed frame is
/// discarded, but the last one is kept in [`HeadlessState`] so tests can look
/// at what would have been shown.
#[derive(Debug, Clone)]
pub struct HeadlessDriver {
    framebuffer: MonoFrameBuf,
    capabilities: DisplayCapabilities,
    state: Arc<Mutex<HeadlessState>>,
}

/// Shared, inspectable driver state
#[derive(Debug, Default)]
pub struct HeadlessState {
    /// Number of frames committed via flush()
    pub flush_count: usize,

    /// Copy of the most recently committed frame
    pub last_frame: Option<MonoFrameBuf>,

    /// Make the next flush() fail
    pub simulate_flush_failure: bool,

    /// Make the next flush() panic
    pub simulate_flush_panic: bool,

    pub last_brightness: Option<u8>,
}

impl HeadlessDriver {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            framebuffer: MonoFrameBuf::new(width, height),
            capabilities: DisplayCapabilities { width, height },
            state: Arc::new(Mutex::new(HeadlessState::default())),
        }
    }

    /// Handle to the shared state, stays valid after the driver moves to the
    /// frame thread
    pub fn state(&self) -> Arc<Mutex<HeadlessState>> {
        Arc::clone(&self.state)
    }

    fn lock_state(&self) -> Result<std::sync::MutexGuard<'_, HeadlessState>, DisplayError> {
        self.state
            .lock()
            .map_err(|_| DisplayError::Other("headless state poisoned".to_string()))
    }
}

impl DisplayDriver for HeadlessDriver {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        Ok(())
    }

    fn set_brightness(&mut self, value: u8) -> Result<(), DisplayError> {
        self.lock_state()?.last_brightness = Some(value);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        let frame = self.framebuffer.clone();
        let mut state = self.lock_state()?;

        if state.simulate_flush_panic {
            drop(state);
            panic!("simulated flush panic");
        }
        if state.simulate_flush_failure {
            return Err(DisplayError::FlushFailed("simulated flush failure".to_string()));
        }

        state.flush_count += 1;
        state.last_frame = Some(frame);
        Ok(())
    }
}

impl DrawTarget for HeadlessDriver {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.framebuffer.draw_iter(pixels)
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        self.framebuffer.fill_solid(area, color)
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.framebuffer.clear(color)
    }
}

impl OriginDimensions for HeadlessDriver {
    fn size(&self) -> Size {
        Size::new(self.capabilities.width, self.capabilities.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::{Line, PrimitiveStyle};

    #[test]
    fn test_headless_creation() {
        let driver = HeadlessDriver::new(128, 64);
        assert_eq!(driver.dimensions(), (128, 64));
        assert!(driver.state().lock().unwrap().last_frame.is_none());
    }

    #[test]
    fn test_flush_keeps_last_frame() {
        let mut driver = HeadlessDriver::new(128, 64);

        Line::new(Point::new(0, 0), Point::new(10, 0))
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
            .draw(&mut driver)
            .unwrap();
        driver.flush().unwrap();

        let state = driver.state();
        let state = state.lock().unwrap();
        assert_eq!(state.flush_count, 1);
        assert_eq!(state.last_frame.as_ref().unwrap().count_on(), 11);
    }

    #[test]
    fn test_simulated_failure() {
        let mut driver = HeadlessDriver::new(128, 64);
        driver.state().lock().unwrap().simulate_flush_failure = true;
        assert!(driver.flush().is_err());

        driver.state().lock().unwrap().simulate_flush_failure = false;
        assert!(driver.flush().is_ok());
    }

    #[test]
    fn test_brightness_recorded() {
        let mut driver = HeadlessDriver::new(128, 64);
        driver.set_brightness(200).unwrap();
        assert_eq!(driver.state().lock().unwrap().last_brightness, Some(200));
    }
}
