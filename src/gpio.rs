/*
 *  gpio.rs
 *
 *  spotify-oled - now playing, at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Rotary encoder pins, pulled up so they do not float
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

/// BCM numbers of the encoder clock, data and button
pub const ENCODER_PINS: [u8; 3] = [17, 18, 27];

/// Configure the encoder pins as pulled-up inputs. Failing is logged and
/// otherwise ignored, most setups have no encoder at all.
#[cfg(feature = "gpio")]
pub fn try_setup() {
    use log::{debug, warn};
    use rppal::gpio::Gpio;

    let gpio = match Gpio::new() {
        Ok(gpio) => gpio,
        Err(e) => {
            warn!("Applying GPIO settings failed, but that may be fine: {}", e);
            return;
        }
    };

    for bcm in ENCODER_PINS {
        match gpio.get(bcm) {
            Ok(pin) => {
                let mut input = pin.into_input_pullup();
                // keep the pull-up once the handle is gone
                input.set_reset_on_drop(false);
                debug!("GPIO {} pulled up, reads {:?}", bcm, input.read());
            }
            Err(e) => {
                warn!("Applying GPIO settings failed on pin {}, but that may be fine: {}", bcm, e);
            }
        }
    }
}

#[cfg(not(feature = "gpio"))]
pub fn try_setup() {
    log::debug!("Built without GPIO support, encoder pins {:?} left alone", ENCODER_PINS);
}
