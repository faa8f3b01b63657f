// SPDX-FileCopyrightText: 2025 Roman Valls, 2025
//
// SPDX-License-Identifier: GPL-3.0-or-later

#[allow(unused_imports)]
use log::{debug, error, info, warn};

use embedded_storage::nor_flash::{NorFlash, ReadNorFlash};
use esp_hal::peripherals::FLASH;
use esp_storage::FlashStorage;
use hal::{HalError, HalResult, NvMedium};

/// Start of the sector holding the settings region (last 4 KiB of a 4 MiB part).
pub const CONFIG_OFFSET: u32 = 0x3F_F000;

const SECTOR_SIZE: u32 = FlashStorage::SECTOR_SIZE;

/// Settings region living in a dedicated flash sector.
///
/// A commit erases the whole sector and writes the region back, so a power
/// cut during commit can leave the sector blank. The blank sector then reads
/// as an unmarked record and the next boot reseeds defaults.
#[derive(Debug)]
pub struct FlashMedium<'d> {
    flash: FlashStorage<'d>,
    capacity: usize,
}

impl<'d> FlashMedium<'d> {
    pub fn new(flash: FLASH<'d>) -> Self {
        Self {
            flash: FlashStorage::new(flash),
            capacity: 0,
        }
    }
}

impl NvMedium for FlashMedium<'_> {
    fn open(&mut self, capacity: usize) -> HalResult<()> {
        if capacity as u32 > SECTOR_SIZE || capacity % 4 != 0 {
            error!("settings region of {} bytes does not fit a sector", capacity);
            return Err(HalError::MediumOpen);
        }
        let flash_size = self.flash.capacity() as u32;
        if CONFIG_OFFSET + SECTOR_SIZE > flash_size {
            error!(
                "flash too small for settings at 0x{:x} ({} bytes)",
                CONFIG_OFFSET, flash_size
            );
            return Err(HalError::MediumOpen);
        }
        self.capacity = capacity;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> HalResult<()> {
        if buf.len() > self.capacity {
            return Err(HalError::MediumRead);
        }
        ReadNorFlash::read(&mut self.flash, CONFIG_OFFSET, buf).map_err(|e| {
            error!("flash read error 0x{:x} {:?}", CONFIG_OFFSET, e);
            HalError::MediumRead
        })
    }

    fn program(&mut self, data: &[u8]) -> HalResult<()> {
        if data.len() > self.capacity {
            return Err(HalError::MediumWrite);
        }
        debug!("flash erase");
        NorFlash::erase(&mut self.flash, CONFIG_OFFSET, CONFIG_OFFSET + SECTOR_SIZE).map_err(
            |e| {
                error!("flash erase error {:?}", e);
                HalError::MediumWrite
            },
        )?;
        debug!("flash write");
        NorFlash::write(&mut self.flash, CONFIG_OFFSET, data).map_err(|e| {
            error!("flash write error {:?}", e);
            HalError::MediumWrite
        })?;
        info!("flash save done");
        Ok(())
    }
}
