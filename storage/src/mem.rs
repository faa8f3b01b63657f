// SPDX-FileCopyrightText: 2025 Roman Valls, 2025
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! RAM backed medium.
//!
//! Used by host tests and as a stand-in on boards without a usable flash
//! region. Supports failure injection and counts commits.

use hal::{HalError, HalResult, NvMedium};

use crate::REGION_SIZE;

/// Value of an erased flash cell.
const ERASED: u8 = 0xFF;

#[derive(Debug, Clone)]
pub struct MemMedium {
    cells: [u8; REGION_SIZE],
    opened: bool,
    fail_open: bool,
    fail_program: bool,
    commits: usize,
}

impl MemMedium {
    /// Factory fresh medium, every cell erased.
    pub fn erased() -> Self {
        Self {
            cells: [ERASED; REGION_SIZE],
            opened: false,
            fail_open: false,
            fail_program: false,
            commits: 0,
        }
    }

    /// Medium preloaded with `contents` at the start of the region.
    pub fn with_contents(contents: &[u8]) -> Self {
        let mut medium = Self::erased();
        let n = contents.len().min(REGION_SIZE);
        medium.cells[..n].copy_from_slice(&contents[..n]);
        medium
    }

    pub fn failing_open() -> Self {
        Self {
            fail_open: true,
            ..Self::erased()
        }
    }

    pub fn fail_program(&mut self, fail: bool) {
        self.fail_program = fail;
    }

    pub fn contents(&self) -> &[u8] {
        &self.cells
    }

    /// Successful programs since creation.
    pub fn commits(&self) -> usize {
        self.commits
    }
}

impl NvMedium for MemMedium {
    fn open(&mut self, capacity: usize) -> HalResult<()> {
        if self.fail_open || capacity > REGION_SIZE {
            return Err(HalError::MediumOpen);
        }
        self.opened = true;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> HalResult<()> {
        if !self.opened || buf.len() > REGION_SIZE {
            return Err(HalError::MediumRead);
        }
        buf.copy_from_slice(&self.cells[..buf.len()]);
        Ok(())
    }

    fn program(&mut self, data: &[u8]) -> HalResult<()> {
        if !self.opened || self.fail_program || data.len() > REGION_SIZE {
            return Err(HalError::MediumWrite);
        }
        self.cells[..data.len()].copy_from_slice(data);
        self.commits += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_require_open() {
        let mut medium = MemMedium::erased();
        let mut buf = [0u8; 4];
        assert_eq!(medium.read(&mut buf), Err(HalError::MediumRead));
        medium.open(REGION_SIZE).unwrap();
        medium.read(&mut buf).unwrap();
        assert_eq!(buf, [ERASED; 4]);
    }

    #[test]
    fn oversized_region_is_refused() {
        let mut medium = MemMedium::erased();
        assert_eq!(medium.open(REGION_SIZE + 1), Err(HalError::MediumOpen));
    }

    #[test]
    fn failed_program_is_not_counted() {
        let mut medium = MemMedium::with_contents(&[1, 2, 3]);
        medium.open(REGION_SIZE).unwrap();
        medium.fail_program(true);
        assert_eq!(medium.program(&[9, 9, 9]), Err(HalError::MediumWrite));
        assert_eq!(medium.commits(), 0);
        assert_eq!(&medium.contents()[..3], &[1, 2, 3]);
    }
}
