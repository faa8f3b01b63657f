// SPDX-FileCopyrightText: 2025 Roman Valls, 2025
//
// SPDX-License-Identifier: GPL-3.0-or-later

use esp_hal::efuse::Efuse;
use esp_hal::gpio::{Level, Output, OutputConfig, OutputPin};
use esp_hal::rng::Rng;
use esp_hal::system::software_reset;
#[allow(unused_imports)]
use log::{debug, error, info, warn};

use hal::SystemControl;

pub struct EspSystem<'d> {
    rng: Rng,
    psram_bytes: usize,
    led: Option<Output<'d>>,
    led_active_low: bool,
}

impl<'d> EspSystem<'d> {
    /// `psram_bytes` is the external RAM handed to the allocator, 0 if none.
    pub fn new(psram_bytes: usize) -> Self {
        Self {
            rng: Rng::new(),
            psram_bytes,
            led: None,
            led_active_low: false,
        }
    }

    /// ESP32-CAM boards wire the red LED on GPIO33, active low.
    pub fn with_status_led(mut self, pin: impl OutputPin + 'd, active_low: bool) -> Self {
        // start with the LED off
        let off = Level::from(active_low);
        self.led = Some(Output::new(pin, off, OutputConfig::default()));
        self.led_active_low = active_low;
        self
    }
}

impl SystemControl for EspSystem<'_> {
    fn disable_brownout(&mut self) {
        disable_brownout_detector();
    }

    fn mac_address(&self) -> Option<[u8; 6]> {
        let mac = Efuse::mac_address();
        // blank efuse reads as all zeros
        (mac != [0u8; 6]).then_some(mac)
    }

    fn random_u32(&mut self) -> u32 {
        self.rng.random()
    }

    fn has_psram(&self) -> bool {
        self.psram_bytes > 0
    }

    fn set_status_led(&mut self, on: bool) {
        if let Some(led) = self.led.as_mut() {
            led.set_level(Level::from(on != self.led_active_low));
        }
    }

    fn restart(&mut self) {
        info!("software reset");
        software_reset();
    }
}

#[cfg(feature = "esp32")]
fn disable_brownout_detector() {
    esp_hal::peripherals::LPWR::regs()
        .brown_out()
        .modify(|_, w| w.ena().clear_bit().rst_ena().clear_bit());
    debug!("brownout detector disabled");
}

#[cfg(not(feature = "esp32"))]
fn disable_brownout_detector() {
    debug!("brownout detector left at its reset configuration");
}
