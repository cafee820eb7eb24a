/*
 *  display/drivers/ssd1306.rs
 *
 *  spotify-oled - now playing, at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  SSD1306 OLED display driver implementation
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

use linux_embedded_hal::I2cdev;
use ssd1306::{
    mode::BufferedGraphicsMode,
    prelude::*,
    size::{DisplaySize128x64, DisplaySize128x32},
    I2CDisplayInterface,
    Ssd1306,
};

use embedded_graphics::prelude::*;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::geometry::Size;

use crate::config::ScreenConfig;
use crate::display::error::DisplayError;
use crate::display::framebuffer::MonoFrameBuf;
use crate::display::traits::{DisplayCapabilities, DisplayDriver};

use log::info;

/// SSD1306 display driver wrapper
pub struct Ssd1306Driver {
    /// The underlying ssd1306 driver
    display: Ssd1306Variants,

    /// Frames are drawn here and replayed onto the panel buffer on flush
    framebuffer: MonoFrameBuf,

    capabilities: DisplayCapabilities,
}

/// Enum to handle different SSD1306 display sizes
enum Ssd1306Variants {
    Size128x64(Ssd1306<I2CInterface<I2cdev>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>),
    Size128x32(Ssd1306<I2CInterface<I2cdev>, DisplaySize128x32, BufferedGraphicsMode<DisplaySize128x32>>),
}

fn rotation_for(degrees: u16) -> Result<DisplayRotation, DisplayError> {
    match degrees {
        0 => Ok(DisplayRotation::Rotate0),
        90 => Ok(DisplayRotation::Rotate90),
        180 => Ok(DisplayRotation::Rotate180),
        270 => Ok(DisplayRotation::Rotate270),
        _ => Err(DisplayError::InvalidConfiguration(
            format!("Invalid rotation angle: {} (must be 0, 90, 180, or 270)", degrees)
        )),
    }
}

impl Ssd1306Driver {
    /// Open the panel on `screen.bus` at `screen.address`
    pub fn new_i2c(screen: &ScreenConfig) -> Result<Self, DisplayError> {
        info!("Initializing SSD1306 on {} at address 0x{:02X}", screen.bus, screen.address);

        let i2c = I2cdev::new(&screen.bus)
            .map_err(|e| DisplayError::I2cError(format!("Failed to open {}: {}", screen.bus, e)))?;
        let interface = I2CDisplayInterface::new_custom_address(i2c, screen.address);
        let rotation = rotation_for(screen.rotate_deg.unwrap_or(0))?;

        let display = match (screen.width, screen.height) {
            (128, 64) => Ssd1306Variants::Size128x64(
                Ssd1306::new(interface, DisplaySize128x64, rotation).into_buffered_graphics_mode()
            ),
            (128, 32) => Ssd1306Variants::Size128x32(
                Ssd1306::new(interface, DisplaySize128x32, rotation).into_buffered_graphics_mode()
            ),
            (w, h) => {
                return Err(DisplayError::InvalidConfiguration(
                    format!("Unsupported SSD1306 size: {}x{}", w, h)
                ));
            }
        };

        let capabilities = DisplayCapabilities {
            width: screen.width,
            height: screen.height,
        };

        let mut driver = Self {
            display,
            framebuffer: MonoFrameBuf::new(screen.width, screen.height),
            capabilities,
        };

        driver.init()?;

        if let Some(brightness) = screen.brightness {
            driver.set_brightness(brightness)?;
        }
        if let Some(invert) = screen.invert {
            driver.set_invert(invert)?;
        }

        info!("SSD1306 initialized successfully ({}x{})", screen.width, screen.height);

        Ok(driver)
    }
}

fn brightness_for(value: u8) -> Brightness {
    match value {
        0..=63 => Brightness::DIMMEST,
        64..=127 => Brightness::DIM,
        128..=191 => Brightness::NORMAL,
        _ => Brightness::BRIGHTEST,
    }
}

impl DisplayDriver for Ssd1306Driver {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        let result = match &mut self.display {
            Ssd1306Variants::Size128x64(display) => display.init(),
            Ssd1306Variants::Size128x32(display) => display.init(),
        };
        result.map_err(|e| DisplayError::InitializationFailed(format!("{:?}", e)))
    }

    fn set_brightness(&mut self, value: u8) -> Result<(), DisplayError> {
        let brightness = brightness_for(value);
        match &mut self.display {
            Ssd1306Variants::Size128x64(display) => display.set_brightness(brightness)?,
            Ssd1306Variants::Size128x32(display) => display.set_brightness(brightness)?,
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        let pixels = self.framebuffer.lit_pixels();
        match &mut self.display {
            Ssd1306Variants::Size128x64(display) => {
                display.clear_buffer();
                display.draw_iter(pixels)?;
                display.flush()?;
            }
            Ssd1306Variants::Size128x32(display) => {
                display.clear_buffer();
                display.draw_iter(pixels)?;
                display.flush()?;
            }
        }
        Ok(())
    }

    fn set_invert(&mut self, inverted: bool) -> Result<(), DisplayError> {
        match &mut self.display {
            Ssd1306Variants::Size128x64(display) => display.set_invert(inverted)?,
            Ssd1306Variants::Size128x32(display) => display.set_invert(inverted)?,
        }
        Ok(())
    }
}

// Provide direct DrawTarget access on the driver itself
impl DrawTarget for Ssd1306Driver {
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

impl OriginDimensions for Ssd1306Driver {
    fn size(&self) -> Size {
        Size::new(self.capabilities.width, self.capabilities.height)
    }
}
