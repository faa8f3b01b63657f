// SPDX-FileCopyrightText: 2025 Roman Valls, 2025
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! OV2640 sensor setup over SCCB (I2C compatible).
//!
//! Only the control path lives here: probe, reset, output format. The sensor
//! clock and the parallel capture path belong to the board's video pipeline.

use esp_hal::Blocking;
use esp_hal::delay::Delay;
use esp_hal::i2c::master::I2c;
#[allow(unused_imports)]
use log::{debug, error, info, warn};

use hal::{Camera, CameraPreset, FrameSize, HalError, HalResult};

const SCCB_ADDR: u8 = 0x30;

// Register bank select, 0 = DSP, 1 = sensor
const BANK_SEL: u8 = 0xFF;
const BANK_DSP: u8 = 0x00;
const BANK_SENSOR: u8 = 0x01;

// Sensor bank
const COM7: u8 = 0x12;
const COM7_SRST: u8 = 0x80;
const COM7_UXGA: u8 = 0x00;
const COM7_SVGA: u8 = 0x40;
const PIDH: u8 = 0x0A;
const PIDL: u8 = 0x0B;
const OV2640_PID: u8 = 0x26;

// DSP bank
const QS: u8 = 0x44;

pub struct Ov2640<'d> {
    i2c: I2c<'d, Blocking>,
}

impl<'d> Ov2640<'d> {
    pub fn new(i2c: I2c<'d, Blocking>) -> Self {
        Self { i2c }
    }

    fn write_reg(&mut self, reg: u8, value: u8) -> HalResult<()> {
        self.i2c.write(SCCB_ADDR, &[reg, value]).map_err(|e| {
            warn!("SCCB write 0x{:02x} failed: {:?}", reg, e);
            HalError::CameraConfig
        })
    }

    fn read_reg(&mut self, reg: u8) -> HalResult<u8> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(SCCB_ADDR, &[reg], &mut buf)
            .map_err(|_| HalError::CameraNotFound)?;
        Ok(buf[0])
    }
}

impl Camera for Ov2640<'_> {
    fn init(&mut self, preset: &CameraPreset) -> HalResult<()> {
        self.write_reg(BANK_SEL, BANK_SENSOR)
            .map_err(|_| HalError::CameraNotFound)?;
        let pid = self.read_reg(PIDH)?;
        let ver = self.read_reg(PIDL)?;
        if pid != OV2640_PID {
            error!("unexpected camera sensor PID 0x{:02x}{:02x}", pid, ver);
            return Err(HalError::CameraNotFound);
        }
        info!("OV2640 detected, version 0x{:02x}", ver);

        self.write_reg(COM7, COM7_SRST)?;
        Delay::new().delay_millis(10);

        let com7 = match preset.frame_size {
            FrameSize::Uxga => COM7_UXGA,
            FrameSize::Svga => COM7_SVGA,
        };
        self.write_reg(BANK_SEL, BANK_SENSOR)?;
        self.write_reg(COM7, com7)?;

        self.write_reg(BANK_SEL, BANK_DSP)?;
        self.write_reg(QS, preset.jpeg_quality)?;

        debug!("camera configured {:?}", preset);
        Ok(())
    }
}
