// SPDX-FileCopyrightText: 2025 Roman Valls, 2025
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Fixed-offset layout of the persisted settings record.
//!
//! | offset | width | field                                |
//! |--------|-------|--------------------------------------|
//! | 0      | 1     | mode (`1` access point, `0` station) |
//! | 1      | 1     | init marker                          |
//! | 2      | 32    | AP SSID                              |
//! | 34     | 32    | AP password                          |
//! | 66     | 32    | station SSID                         |
//! | 98     | 64    | station password                     |
//!
//! Text fields are NUL terminated inside their width, so each holds at most
//! `width - 1` bytes.

use crate::{StoreResult, TextTooLongSnafu};

/// Marker value written by every completed save.
pub const INIT_MARKER: u8 = 0xA5;

pub const MODE_ACCESS_POINT: u8 = 1;
pub const MODE_STATION: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub offset: usize,
    pub width: usize,
}

impl Field {
    const fn after(prev: Field, width: usize) -> Field {
        Field {
            offset: prev.offset + prev.width,
            width,
        }
    }

    pub const fn end(&self) -> usize {
        self.offset + self.width
    }

    /// Longest text the field can hold next to its terminator.
    pub const fn max_text(&self) -> usize {
        self.width - 1
    }
}

pub const MODE: Field = Field {
    offset: 0,
    width: 1,
};
pub const MARKER: Field = Field::after(MODE, 1);
pub const AP_SSID: Field = Field::after(MARKER, 32);
pub const AP_PASSWORD: Field = Field::after(AP_SSID, 32);
pub const STA_SSID: Field = Field::after(AP_PASSWORD, 32);
pub const STA_PASSWORD: Field = Field::after(STA_SSID, 64);

pub const RECORD_LEN: usize = STA_PASSWORD.end();

const _: () = assert!(RECORD_LEN == 162, "record layout changed");

/// Raw record as it sits in the store. Nothing here is validated.
#[derive(Clone, PartialEq, Eq)]
pub struct Record {
    bytes: [u8; RECORD_LEN],
}

impl Record {
    /// All-zero record: mode station, no marker, empty strings.
    pub const fn zeroed() -> Self {
        Self {
            bytes: [0u8; RECORD_LEN],
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut record = Self::zeroed();
        let n = bytes.len().min(RECORD_LEN);
        record.bytes[..n].copy_from_slice(&bytes[..n]);
        record
    }

    pub fn as_bytes(&self) -> &[u8; RECORD_LEN] {
        &self.bytes
    }

    pub fn mode(&self) -> u8 {
        self.bytes[MODE.offset]
    }

    pub fn set_mode(&mut self, mode: u8) {
        self.bytes[MODE.offset] = mode;
    }

    pub fn marker(&self) -> u8 {
        self.bytes[MARKER.offset]
    }

    pub fn set_marker(&mut self, marker: u8) {
        self.bytes[MARKER.offset] = marker;
    }

    /// Text up to the first NUL. Bytes that are not UTF-8 read as empty.
    pub fn text(&self, field: Field) -> &str {
        let raw = &self.bytes[field.offset..field.end()];
        let len = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        core::str::from_utf8(&raw[..len]).unwrap_or("")
    }

    /// Store `value` NUL padded. Fails without touching the field if it
    /// doesn't fit next to its terminator.
    pub fn set_text(&mut self, field: Field, value: &str) -> StoreResult<()> {
        if value.len() > field.max_text() {
            return TextTooLongSnafu {
                max: field.max_text(),
            }
            .fail();
        }
        let slot = &mut self.bytes[field.offset..field.end()];
        slot.fill(0);
        slot[..value.len()].copy_from_slice(value.as_bytes());
        Ok(())
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl core::fmt::Debug for Record {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // passwords stay out of logs
        f.debug_struct("Record")
            .field("mode", &self.mode())
            .field("marker", &self.marker())
            .field("ap_ssid", &self.text(AP_SSID))
            .field("sta_ssid", &self.text(STA_SSID))
            .finish_non_exhaustive()
    }
}
