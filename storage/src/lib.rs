#![cfg_attr(not(test), no_std)]
// SPDX-FileCopyrightText: 2025 Roman Valls, 2025
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Persistent settings store for cam-stamp.
//!
//! [`Store`] keeps a RAM image of the reserved region. Writes are staged into
//! the image and reach the medium only on [`Store::commit`], one program per
//! batch. The store never interprets field contents beyond the init marker.

pub mod mem;
pub mod record;

/// Module defining the ESP32 flash backend for the settings store
#[cfg(target_os = "none")]
pub mod esp;

use hal::{HalError, NvMedium};
#[allow(unused_imports)]
use log::{debug, error, info, warn};
use snafu::{ResultExt, Snafu};

pub use mem::MemMedium;
pub use record::{INIT_MARKER, RECORD_LEN, Record};

/// Bytes reserved on the medium. The record occupies the start of it.
pub const REGION_SIZE: usize = 512;

const _: () = assert!(REGION_SIZE % 4 == 0, "flash writes must be a multiple of 4");
const _: () = assert!(RECORD_LEN <= REGION_SIZE);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StoreError {
    #[snafu(display("could not open storage: {source}"))]
    Open { source: HalError },
    #[snafu(display("could not read storage: {source}"))]
    Read { source: HalError },
    #[snafu(display("commit failed: {source}"))]
    Commit { source: HalError },
    #[snafu(display("no storage attached, settings live in RAM only"))]
    Detached,
    #[snafu(display("text longer than {max} bytes"))]
    TextTooLong { max: usize },
}

pub type StoreResult<T> = Result<T, StoreError>;

pub struct Store<M> {
    medium: Option<M>,
    image: [u8; REGION_SIZE],
}

impl<M: NvMedium> Store<M> {
    /// Open the medium and load the reserved region into RAM.
    pub fn initialize(mut medium: M) -> StoreResult<Self> {
        medium.open(REGION_SIZE).context(OpenSnafu)?;
        let mut image = [0u8; REGION_SIZE];
        medium.read(&mut image).context(ReadSnafu)?;
        debug!("settings region loaded ({} bytes)", REGION_SIZE);
        Ok(Self {
            medium: Some(medium),
            image,
        })
    }

    /// Store with no medium behind it. Reads see an unmarked record and every
    /// commit fails with [`StoreError::Detached`].
    pub fn detached() -> Self {
        Self {
            medium: None,
            image: [0u8; REGION_SIZE],
        }
    }

    pub fn is_attached(&self) -> bool {
        self.medium.is_some()
    }

    /// True only when the marker byte matches [`INIT_MARKER`] exactly.
    pub fn is_initialized(&self) -> bool {
        self.read_record().marker() == INIT_MARKER
    }

    pub fn read_record(&self) -> Record {
        Record::from_bytes(&self.image[..RECORD_LEN])
    }

    /// Stage `record` into the RAM image. Nothing reaches the medium until
    /// [`Store::commit`].
    pub fn write_record(&mut self, record: &Record) {
        self.image[..RECORD_LEN].copy_from_slice(record.as_bytes());
    }

    pub fn commit(&mut self) -> StoreResult<()> {
        let Some(medium) = self.medium.as_mut() else {
            return DetachedSnafu.fail();
        };
        medium.program(&self.image).context(CommitSnafu)?;
        debug!("settings region committed");
        Ok(())
    }

    pub fn medium(&self) -> Option<&M> {
        self.medium.as_ref()
    }

    pub fn medium_mut(&mut self) -> Option<&mut M> {
        self.medium.as_mut()
    }

    pub fn into_medium(self) -> Option<M> {
        self.medium
    }
}
